use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::request::RequestBridge;
use stallbook_core::identity::{IdentityGateway, IdentityProfile};
use stallbook_core::{CoreError, CoreResult};
use stallbook_shared::models::messages::{
    channels, CreateIdentityCommand, DeleteIdentityCommand, IdentityProfileReply, StatusReply,
    UpdateIdentityCommand,
};

/// Identity-service client: every operation is one bridge call over its
/// command/reply channel pair.
pub struct IdentityClient {
    bridge: Arc<RequestBridge>,
}

impl IdentityClient {
    pub fn new(bridge: Arc<RequestBridge>) -> Self {
        Self { bridge }
    }

    async fn status_call<T: serde::Serialize>(&self, channel: &str, kind: &str, cmd: &T) -> CoreResult<String> {
        let payload = serde_json::to_value(cmd)?;
        let body = self.bridge.call(channel, kind, payload).await.map_err(CoreError::from)?;
        let reply: StatusReply = serde_json::from_value(body)?;
        Ok(reply.message)
    }
}

#[async_trait]
impl IdentityGateway for IdentityClient {
    async fn fetch_profile(&self, username: &str) -> CoreResult<IdentityProfile> {
        let body = self
            .bridge
            .call(
                channels::GET_IDENTITY_PROFILE,
                "get-identity-profile",
                json!({ "username": username }),
            )
            .await
            .map_err(CoreError::from)?;

        let reply: IdentityProfileReply = serde_json::from_value(body)?;
        Ok(IdentityProfile {
            id: reply.id,
            username: reply.username,
            phone: reply.phone,
            address: reply.address,
            profession: reply.profession,
        })
    }

    async fn create_identity(&self, cmd: CreateIdentityCommand) -> CoreResult<String> {
        self.status_call(channels::CREATE_IDENTITY, "create-identity", &cmd).await
    }

    async fn update_identity(&self, cmd: UpdateIdentityCommand) -> CoreResult<String> {
        self.status_call(channels::UPDATE_IDENTITY, "update-identity", &cmd).await
    }

    async fn delete_identity(&self, user_id: Uuid) -> CoreResult<String> {
        let cmd = DeleteIdentityCommand { user_id };
        self.status_call(channels::DELETE_IDENTITY, "delete-identity", &cmd).await
    }
}

/// Canned gateway for tests and local development: always returns the same
/// profile and accepts every mutation.
pub struct StaticIdentityGateway {
    pub profile: IdentityProfile,
}

impl StaticIdentityGateway {
    pub fn new(profile: IdentityProfile) -> Self {
        Self { profile }
    }

    pub fn for_user(id: Uuid, username: &str) -> Self {
        Self::new(IdentityProfile {
            id,
            username: username.to_string(),
            phone: "0000000000".to_string(),
            address: "unknown".to_string(),
            profession: "bookseller".to_string(),
        })
    }
}

#[async_trait]
impl IdentityGateway for StaticIdentityGateway {
    async fn fetch_profile(&self, username: &str) -> CoreResult<IdentityProfile> {
        let mut profile = self.profile.clone();
        profile.username = username.to_string();
        Ok(profile)
    }

    async fn create_identity(&self, cmd: CreateIdentityCommand) -> CoreResult<String> {
        Ok(format!("account {} created", cmd.username))
    }

    async fn update_identity(&self, _cmd: UpdateIdentityCommand) -> CoreResult<String> {
        Ok("account updated".to_string())
    }

    async fn delete_identity(&self, _user_id: Uuid) -> CoreResult<String> {
        Ok("account deleted".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::{Correlator, ReplyOutcome};
    use crate::memory::InMemoryBus;
    use serde_json::Value;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fetch_profile_round_trip() {
        let bus = Arc::new(InMemoryBus::new());
        let correlator = Arc::new(Correlator::new());
        let bridge = Arc::new(RequestBridge::new(bus.clone(), correlator.clone(), Duration::from_secs(1)));
        let client = IdentityClient::new(bridge);

        let profile_id = Uuid::new_v4();
        let mut published = bus.subscribe();
        tokio::spawn(async move {
            let msg = published.recv().await.unwrap();
            assert_eq!(msg.channel, channels::GET_IDENTITY_PROFILE);
            let cmd: Value = serde_json::from_str(&msg.payload).unwrap();
            let id = Uuid::parse_str(cmd["correlationId"].as_str().unwrap()).unwrap();
            correlator.resolve(
                id,
                ReplyOutcome::Success(serde_json::json!({
                    "correlationId": id,
                    "id": profile_id,
                    "username": cmd["username"],
                    "phone": "0771234567",
                    "address": "12 Library Lane",
                    "profession": "publisher",
                    "status": "SUCCESS",
                    "message": "ok",
                })),
            );
        });

        let profile = client.fetch_profile("anita").await.unwrap();
        assert_eq!(profile.id, profile_id);
        assert_eq!(profile.username, "anita");
        assert_eq!(profile.profession, "publisher");
    }

    #[tokio::test]
    async fn test_create_identity_remote_failure_passes_message() {
        let bus = Arc::new(InMemoryBus::new());
        let correlator = Arc::new(Correlator::new());
        let bridge = Arc::new(RequestBridge::new(bus.clone(), correlator.clone(), Duration::from_secs(1)));
        let client = IdentityClient::new(bridge);

        let mut published = bus.subscribe();
        tokio::spawn(async move {
            let msg = published.recv().await.unwrap();
            let cmd: Value = serde_json::from_str(&msg.payload).unwrap();
            let id = Uuid::parse_str(cmd["correlationId"].as_str().unwrap()).unwrap();
            correlator.resolve(id, ReplyOutcome::Failure("username already taken".to_string()));
        });

        let cmd = CreateIdentityCommand {
            username: "dupe".to_string(),
            password: stallbook_shared::pii::Masked("secret".to_string()),
            phone: "0770000000".to_string(),
            address: "nowhere".to_string(),
            profession: "printer".to_string(),
        };
        match client.create_identity(cmd).await.unwrap_err() {
            CoreError::Remote(msg) => assert_eq!(msg, "username already taken"),
            other => panic!("expected remote failure, got {:?}", other),
        }
    }
}
