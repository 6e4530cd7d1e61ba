//! Bearer-token authentication for HTTP handlers.
//!
//! Keep the HTTP modules focused on request/response mapping by concentrating
//! credential parsing and actor resolution here. Handlers take an
//! [`AuthenticatedActor`] argument; requests without a resolvable token are
//! rejected with `401` before the handler runs.

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};

use crate::domain::ports::ActorResolverError;
use crate::domain::{Actor, Error};

use super::state::HttpState;

const BEARER_SCHEME: &str = "bearer";

/// Actor resolved from the request's bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedActor(pub Actor);

impl AuthenticatedActor {
    /// Consume the wrapper.
    pub fn into_inner(self) -> Actor {
        self.0
    }
}

impl std::ops::Deref for AuthenticatedActor {
    type Target = Actor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case(BEARER_SCHEME) && !token.is_empty()).then_some(token)
}

fn map_resolver_error(error: ActorResolverError) -> Error {
    warn!(error = %error, "identity source unavailable");
    Error::service_unavailable("identity service unavailable")
}

impl FromRequest for AuthenticatedActor {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let state = req.app_data::<web::Data<HttpState>>().cloned();

        Box::pin(async move {
            let state = state.ok_or_else(|| Error::internal("HTTP state is not configured"))?;
            let header = header.ok_or_else(|| Error::unauthorized("missing bearer token"))?;
            let token = bearer_token(&header)
                .ok_or_else(|| Error::unauthorized("authorization header must use Bearer"))?;
            match state.actors.resolve(token).await.map_err(map_resolver_error)? {
                Some(actor) => Ok(Self(actor)),
                None => {
                    debug!("rejected unknown bearer token");
                    Err(Error::unauthorized("invalid bearer token"))
                }
            }
        })
    }
}
