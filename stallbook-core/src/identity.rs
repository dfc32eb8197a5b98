use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreResult;
use stallbook_shared::models::messages::{CreateIdentityCommand, UpdateIdentityCommand};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub id: Uuid,
    pub username: String,
    pub phone: String,
    pub address: String,
    pub profession: String,
}

/// Seam to the identity service, which owns accounts and roles. All calls
/// cross the message bus; implementations surface `CoreError::Timeout` when
/// no reply arrives in time and `CoreError::Remote` when the downstream
/// explicitly reports failure.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    async fn fetch_profile(&self, username: &str) -> CoreResult<IdentityProfile>;

    /// Returns the downstream status message on success.
    async fn create_identity(&self, cmd: CreateIdentityCommand) -> CoreResult<String>;

    async fn update_identity(&self, cmd: UpdateIdentityCommand) -> CoreResult<String>;

    async fn delete_identity(&self, user_id: Uuid) -> CoreResult<String>;
}
