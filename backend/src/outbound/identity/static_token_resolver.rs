//! Static bearer-token registry.
//!
//! Tokens are never stored in clear: the registry holds SHA-256 digests and
//! looks up the digest of each presented token.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::ports::{ActorResolver, ActorResolverError};
use crate::domain::{Actor, Role, UserId};

/// One registry entry as stored in the identities file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityEntry {
    /// Lowercase hex SHA-256 of the bearer token.
    pub token_sha256: String,
    /// User the token authenticates.
    pub user_id: UserId,
    /// Roles granted to the user.
    pub roles: Vec<Role>,
}

/// Errors raised while loading the registry.
#[derive(Debug, thiserror::Error)]
pub enum IdentityRegistryError {
    /// The identities file could not be read.
    #[error("failed to read identities file {}: {source}", path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The identities file is not valid JSON of the expected shape.
    #[error("invalid identities file: {0}")]
    Parse(#[from] serde_json::Error),
    /// A digest is not 64 hex characters.
    #[error("entry for user {user_id} has a malformed token digest")]
    MalformedDigest {
        /// User owning the entry.
        user_id: UserId,
    },
    /// Two entries share a digest.
    #[error("duplicate token digest for user {user_id}")]
    DuplicateDigest {
        /// User owning the second entry.
        user_id: UserId,
    },
}

/// Hex-encoded SHA-256 digest of `token`.
///
/// ```
/// use repair_desk::outbound::identity::digest_token;
///
/// assert_eq!(
///     digest_token("abc"),
///     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
/// );
/// ```
#[must_use]
pub fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// [`ActorResolver`] backed by a fixed set of token digests.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenIdentityResolver {
    actors: HashMap<String, Actor>,
}

impl StaticTokenIdentityResolver {
    /// Build a registry from parsed entries.
    ///
    /// # Errors
    ///
    /// Rejects malformed or duplicate digests.
    pub fn from_entries(
        entries: impl IntoIterator<Item = IdentityEntry>,
    ) -> Result<Self, IdentityRegistryError> {
        let mut actors = HashMap::new();
        for entry in entries {
            let digest = entry.token_sha256.trim().to_ascii_lowercase();
            let well_formed = digest.len() == 64 && hex::decode(&digest).is_ok();
            if !well_formed {
                return Err(IdentityRegistryError::MalformedDigest {
                    user_id: entry.user_id,
                });
            }
            let actor = Actor::new(entry.user_id, entry.roles);
            if actors.insert(digest, actor).is_some() {
                return Err(IdentityRegistryError::DuplicateDigest {
                    user_id: entry.user_id,
                });
            }
        }
        Ok(Self { actors })
    }

    /// Parse a JSON array of entries.
    ///
    /// # Errors
    ///
    /// Fails on invalid JSON or invalid entries.
    pub fn from_json(json: &str) -> Result<Self, IdentityRegistryError> {
        let entries: Vec<IdentityEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// Load the registry from `path`.
    ///
    /// The file is opened through a capability handle on its parent
    /// directory; a bare file name resolves against the working directory.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not UTF-8, or cannot be parsed.
    pub fn load(path: &Path) -> Result<Self, IdentityRegistryError> {
        let read_error = |source| IdentityRegistryError::Read {
            path: path.to_path_buf(),
            source,
        };
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = path.file_name().ok_or_else(|| {
            read_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "identities path must name a file",
            ))
        })?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
        let payload = dir.read(Path::new(file_name)).map_err(read_error)?;
        let json = String::from_utf8(payload)
            .map_err(|source| read_error(io::Error::new(io::ErrorKind::InvalidData, source)))?;
        Self::from_json(&json)
    }

    /// Number of registered tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Whether no tokens are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

#[async_trait]
impl ActorResolver for StaticTokenIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<Option<Actor>, ActorResolverError> {
        Ok(self.actors.get(&digest_token(token)).cloned())
    }
}
