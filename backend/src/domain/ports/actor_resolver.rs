//! Port for resolving bearer credentials to actors.

use async_trait::async_trait;

use crate::domain::Actor;

use super::define_port_error;

define_port_error! {
    /// Errors raised while resolving an actor.
    pub enum ActorResolverError {
        /// The identity source could not be reached.
        Unavailable { message: String } =>
            "identity source unavailable: {message}",
    }
}

/// Port for turning a bearer token into the acting user and roles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActorResolver: Send + Sync {
    /// Resolve `token`; `None` when the token is not recognised.
    async fn resolve(&self, token: &str) -> Result<Option<Actor>, ActorResolverError>;
}

/// Fixture resolver that recognises no tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureActorResolver;

#[async_trait]
impl ActorResolver for FixtureActorResolver {
    async fn resolve(&self, _token: &str) -> Result<Option<Actor>, ActorResolverError> {
        Ok(None)
    }
}
