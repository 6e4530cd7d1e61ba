//! Backend entry-point: loads settings, prepares storage, and serves the API.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use repair_desk::domain::ports::{ActorResolver, FixtureActorResolver};
use repair_desk::inbound::http::health::HealthState;
use repair_desk::outbound::identity::StaticTokenIdentityResolver;
use repair_desk::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use server::{ServerConfig, ServiceSettings, create_server};

fn load_actors(settings: &ServiceSettings) -> Result<Arc<dyn ActorResolver>> {
    match &settings.identities_path {
        Some(path) => {
            let resolver = StaticTokenIdentityResolver::load(path)
                .wrap_err_with(|| format!("loading identities from {}", path.display()))?;
            info!(identities = resolver.len(), "identity registry loaded");
            Ok(Arc::new(resolver))
        }
        None => {
            warn!("no identity registry configured; every bearer token is rejected");
            Ok(Arc::new(FixtureActorResolver))
        }
    }
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServiceSettings::load().map_err(|err| eyre!("loading settings: {err}"))?;
    let bind_addr = settings.bind_addr()?;
    let mut config = ServerConfig::new(bind_addr, load_actors(&settings)?)
        .with_intake_rules(settings.intake_rules()?)
        .with_xp_policy(settings.xp_policy());

    if let Some(database_url) = settings.database_url.clone() {
        if settings.run_migrations {
            run_pending_migrations(database_url.clone()).await?;
        }
        let pool = DbPool::new(
            PoolConfig::new(database_url).with_max_size(settings.database_max_connections()),
        )
        .await?;
        config = config.with_db_pool(pool);
    }

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    server.await?;
    health_state.mark_unhealthy();
    Ok(())
}
