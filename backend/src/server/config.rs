//! Service settings loaded via OrthoConfig and the server configuration built
//! from them.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use repair_desk::domain::ports::ActorResolver;
use repair_desk::domain::{
    ConfiguredXpPolicy, DEFAULT_CHECKLIST_MIN_ITEMS, DEFAULT_XP_BASE_AMOUNT,
    DEFAULT_XP_FIRST_PASS_BONUS, IntakeRules,
};
use repair_desk::outbound::persistence::DbPool;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Settings read from CLI flags, `REPAIR_DESK_*` variables, or a config file.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "REPAIR_DESK")]
pub struct ServiceSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL. Without it the in-memory store is used.
    pub database_url: Option<String>,
    pub database_max_connections: Option<u32>,
    /// Apply embedded migrations before serving.
    #[ortho_config(default = false)]
    pub run_migrations: bool,
    /// JSON identity registry mapping token digests to actors.
    pub identities_path: Option<PathBuf>,
    pub checklist_min_items: Option<usize>,
    pub xp_base_amount: Option<i64>,
    /// One extra XP point per this many active minutes; unset disables it.
    pub xp_base_divisor_minutes: Option<u32>,
    pub xp_first_pass_bonus: Option<i64>,
}

/// Settings that parse but cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid bind address {value:?}: {source}")]
    BindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("checklist_min_items must be at least 1")]
    ChecklistMinItems,
}

impl ServiceSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|source| SettingsError::BindAddr {
            value: value.to_owned(),
            source,
        })
    }

    pub fn database_max_connections(&self) -> u32 {
        self.database_max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }

    pub fn intake_rules(&self) -> Result<IntakeRules, SettingsError> {
        match self.checklist_min_items {
            Some(0) => Err(SettingsError::ChecklistMinItems),
            Some(checklist_min_items) => Ok(IntakeRules {
                checklist_min_items,
            }),
            None => Ok(IntakeRules {
                checklist_min_items: DEFAULT_CHECKLIST_MIN_ITEMS,
            }),
        }
    }

    pub fn xp_policy(&self) -> ConfiguredXpPolicy {
        ConfiguredXpPolicy::new(
            self.xp_base_amount.unwrap_or(DEFAULT_XP_BASE_AMOUNT),
            self.xp_base_divisor_minutes,
            self.xp_first_pass_bonus
                .unwrap_or(DEFAULT_XP_FIRST_PASS_BONUS),
        )
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) actors: Arc<dyn ActorResolver>,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) intake_rules: IntakeRules,
    pub(crate) xp_policy: ConfiguredXpPolicy,
}

impl ServerConfig {
    #[must_use]
    pub fn new(bind_addr: SocketAddr, actors: Arc<dyn ActorResolver>) -> Self {
        Self {
            bind_addr,
            actors,
            db_pool: None,
            intake_rules: IntakeRules::default(),
            xp_policy: ConfiguredXpPolicy::default(),
        }
    }

    /// Attach a database pool; the server then persists through Diesel.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    #[must_use]
    pub fn with_intake_rules(mut self, rules: IntakeRules) -> Self {
        self.intake_rules = rules;
        self
    }

    #[must_use]
    pub fn with_xp_policy(mut self, policy: ConfiguredXpPolicy) -> Self {
        self.xp_policy = policy;
        self
    }
}
