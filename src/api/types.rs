//! Shared types for the API layer.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use uuid::Uuid;

use crate::config::Config;
use crate::pipeline::extraction::client::VisionClient;
use crate::pipeline::storage::ObjectStore;

/// Shared context for all routes and middleware.
///
/// The SQLite connection is the only shared mutable resource; every access
/// through the repositories is owner-filtered.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<Config>,
    pub db: Arc<Mutex<Connection>>,
    pub store: Arc<ObjectStore>,
    pub vision: Arc<dyn VisionClient>,
}

impl ApiContext {
    pub fn new(config: Config, conn: Connection, vision: Arc<dyn VisionClient>) -> Self {
        let store = ObjectStore::new(config.object_root(), config.public_base_url.clone());
        Self {
            config: Arc::new(config),
            db: Arc::new(Mutex::new(conn)),
            store: Arc::new(store),
            vision,
        }
    }
}

/// Authenticated caller, injected into request extensions by the auth
/// middleware after the bearer token resolves to exactly one user.
#[derive(Debug, Clone, Copy)]
pub struct UserContext {
    pub user_id: Uuid,
}

/// SHA-256 hash of a bearer token; only hashes are stored.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_token_sensitive() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn generated_tokens_are_unique_and_urlsafe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        // 32 bytes of entropy → 43 base64 chars without padding.
        assert_eq!(a.len(), 43);
    }
}
