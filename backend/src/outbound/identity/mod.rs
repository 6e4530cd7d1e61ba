//! Identity adapters resolving bearer tokens to actors.

mod static_token_resolver;

pub use static_token_resolver::{
    IdentityEntry, IdentityRegistryError, StaticTokenIdentityResolver, digest_token,
};
