use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::gateway::types::{Credential, HotelDescription, IdentityProvider};

/// Document store of the backend: JSON documents keyed by collection and id
#[async_trait]
pub trait DocumentGateway: Send + Sync {
    async fn list(&self, collection: &str) -> Result<Vec<Value>>;

    /// Documents whose `field` equals `value`.
    async fn find_by(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Value>>;

    /// `Ok(None)` when no document has this id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Create or replace a document.
    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<()>;

    /// Merge `patch` into an existing document. Fails if it does not exist.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// File store of the backend
#[async_trait]
pub trait FileGateway: Send + Sync {
    /// Upload `bytes` to `path` and return a URL the file can be fetched from.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
}

/// Identity provider of the backend
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Credential>;

    async fn sign_up_with_password(&self, email: &str, password: &str) -> Result<Credential>;

    async fn sign_in_with_provider(&self, provider: IdentityProvider) -> Result<Credential>;

    async fn sign_out(&self) -> Result<()>;
}

/// Text generation endpoint used by the hotel form
#[async_trait]
pub trait DescriptionGenerator: Send + Sync {
    async fn describe(&self, prompt: &str) -> Result<HotelDescription>;
}
