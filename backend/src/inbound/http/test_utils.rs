//! Test helpers for inbound HTTP components.

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::http::header::AUTHORIZATION;
use actix_web::{App, web};
use async_trait::async_trait;

use crate::Trace;
use crate::domain::ports::{ActorResolver, ActorResolverError};
use crate::domain::{Actor, Role, UserId};

use super::configure_api;
use super::state::HttpState;

pub const MASTER_TOKEN: &str = "master-token";
pub const TECHNICIAN_TOKEN: &str = "tech-token";
pub const QC_TOKEN: &str = "qc-token";
pub const OPS_TOKEN: &str = "ops-token";

/// Resolver mapping fixed tokens to one actor per role.
///
/// Technician is user 2, which is also the assignee of fixture tickets.
#[derive(Debug, Clone)]
pub struct TokenTable(HashMap<&'static str, Actor>);

#[async_trait]
impl ActorResolver for TokenTable {
    async fn resolve(&self, token: &str) -> Result<Option<Actor>, ActorResolverError> {
        Ok(self.0.get(token).cloned())
    }
}

pub fn fixture_actor_resolver() -> Arc<dyn ActorResolver> {
    Arc::new(TokenTable(HashMap::from([
        (MASTER_TOKEN, Actor::new(UserId::new(1), [Role::Master])),
        (TECHNICIAN_TOKEN, Actor::new(UserId::new(2), [Role::Technician])),
        (QC_TOKEN, Actor::new(UserId::new(3), [Role::QcInspector])),
        (OPS_TOKEN, Actor::new(UserId::new(4), [Role::OpsManager])),
    ])))
}

pub fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {token}"))
}

/// Fixture-backed state with the token table installed.
pub fn fixture_state() -> HttpState {
    HttpState::default().with_actors(fixture_actor_resolver())
}

/// App serving the full `/api/v1` surface over `state`.
pub fn test_app(
    state: HttpState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(Trace)
        .service(web::scope("/api/v1").configure(configure_api))
}
