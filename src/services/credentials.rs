use crate::errors::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Credentials the admin console has on file for one courier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Key-value view of the persistence layer. The pipeline only reads it
/// when a descriptor carries a `credential_ref`; writes happen from the
/// admin UI, outside this crate.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, courier_id: &str) -> Result<Option<StoredCredentials>, ApiError>;
    async fn set(&self, courier_id: &str, credentials: StoredCredentials) -> Result<(), ApiError>;
    async fn delete(&self, courier_id: &str) -> Result<(), ApiError>;
}

#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    records: Arc<RwLock<HashMap<String, StoredCredentials>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, courier_id: &str) -> Result<Option<StoredCredentials>, ApiError> {
        let guard = self
            .records
            .read()
            .map_err(|_| ApiError::internal("Credential store lock poisoned"))?;
        Ok(guard.get(courier_id).cloned())
    }

    async fn set(&self, courier_id: &str, credentials: StoredCredentials) -> Result<(), ApiError> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| ApiError::internal("Credential store lock poisoned"))?;
        guard.insert(courier_id.to_string(), credentials);
        Ok(())
    }

    async fn delete(&self, courier_id: &str) -> Result<(), ApiError> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| ApiError::internal("Credential store lock poisoned"))?;
        guard.remove(courier_id);
        Ok(())
    }
}
