use std::sync::Arc;

use tracker_logging::tracker_warn;

use crate::store::{LocalStore, AUTH_TOKEN_KEY};

/// Supplies the bearer credential for a tracker. Injected per tracker.
pub trait CredentialProvider: Send + Sync {
    fn credential(&self) -> Option<String>;
}

/// Reads the credential from the local store.
pub struct StoreCredentials {
    store: Arc<dyn LocalStore>,
}

impl StoreCredentials {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }
}

impl CredentialProvider for StoreCredentials {
    fn credential(&self) -> Option<String> {
        match self.store.get(AUTH_TOKEN_KEY) {
            Ok(token) => token
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty()),
            Err(err) => {
                tracker_warn!("Could not read credential: {}", err);
                None
            }
        }
    }
}

/// A fixed credential, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub Option<String>);

impl CredentialProvider for StaticCredentials {
    fn credential(&self) -> Option<String> {
        self.0.clone()
    }
}
