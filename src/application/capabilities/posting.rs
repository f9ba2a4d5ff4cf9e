//! Write-side capabilities: posts, comments, votes, deletion

use super::contract::{InputContract, ValidatedInput};
use super::registry::{Capability, CapabilityError};
use crate::domain::platform::VoteDirection;
use crate::infrastructure::cooldown::{CooldownTracker, human_wait};
use crate::infrastructure::platform::{PlatformTransport, TransportError};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

pub struct CreatePost {
    transport: Arc<PlatformTransport>,
    cooldowns: Arc<CooldownTracker>,
    contract: InputContract,
}

impl CreatePost {
    pub fn new(transport: Arc<PlatformTransport>, cooldowns: Arc<CooldownTracker>) -> Self {
        Self {
            transport,
            cooldowns,
            contract: InputContract::new()
                .require_text("title", "Post title")
                .require_text("content", "Post body text"),
        }
    }
}

#[async_trait]
impl Capability for CreatePost {
    fn name(&self) -> &'static str {
        "create_post"
    }

    fn description(&self) -> &'static str {
        "Publish a new post to the feed. A 30 minute cooldown applies between posts."
    }

    fn contract(&self) -> &InputContract {
        &self.contract
    }

    async fn execute(&self, input: ValidatedInput) -> Result<Value, CapabilityError> {
        if !self.cooldowns.can_post() {
            let wait = self
                .cooldowns
                .post_wait_remaining()
                .map_or_else(|| "a moment".to_string(), human_wait);
            return Err(CapabilityError::Cooldown {
                action: "post",
                wait,
            });
        }

        let body = json!({
            "title": input.text("title"),
            "content": input.text("content"),
        });
        let response = self.transport.post("posts", &body, None).await?;
        self.cooldowns.record_post();
        info!(identity = %response.identity, "Post published");
        Ok(json!({"post": response.payload}))
    }
}

pub struct CreateComment {
    transport: Arc<PlatformTransport>,
    cooldowns: Arc<CooldownTracker>,
    contract: InputContract,
}

impl CreateComment {
    pub fn new(transport: Arc<PlatformTransport>, cooldowns: Arc<CooldownTracker>) -> Self {
        Self {
            transport,
            cooldowns,
            contract: InputContract::new()
                .require_text("post_id", "Post to comment on")
                .require_text("content", "Comment text"),
        }
    }
}

#[async_trait]
impl Capability for CreateComment {
    fn name(&self) -> &'static str {
        "create_comment"
    }

    fn description(&self) -> &'static str {
        "Comment on an existing post. A 20 second cooldown applies between comments."
    }

    fn contract(&self) -> &InputContract {
        &self.contract
    }

    async fn execute(&self, input: ValidatedInput) -> Result<Value, CapabilityError> {
        if !self.cooldowns.can_comment() {
            let wait = self
                .cooldowns
                .comment_wait_remaining()
                .map_or_else(|| "a moment".to_string(), human_wait);
            return Err(CapabilityError::Cooldown {
                action: "comment",
                wait,
            });
        }

        let endpoint = format!("posts/{}/comments", input.text("post_id"));
        let body = json!({"content": input.text("content")});
        let response = self.transport.post(&endpoint, &body, None).await?;
        self.cooldowns.record_comment();
        info!(identity = %response.identity, "Comment published");
        Ok(json!({"comment": response.payload}))
    }
}

pub struct Vote {
    transport: Arc<PlatformTransport>,
    contract: InputContract,
}

impl Vote {
    pub fn new(transport: Arc<PlatformTransport>) -> Self {
        Self {
            transport,
            contract: InputContract::new()
                .require_text("post_id", "Post to vote on")
                .require_one_of("direction", "Vote direction", vec!["up", "down"]),
        }
    }
}

#[async_trait]
impl Capability for Vote {
    fn name(&self) -> &'static str {
        "vote"
    }

    fn description(&self) -> &'static str {
        "Cast an upvote or downvote on a post."
    }

    fn contract(&self) -> &InputContract {
        &self.contract
    }

    async fn execute(&self, input: ValidatedInput) -> Result<Value, CapabilityError> {
        // Contract restricts the field to "up" or "down".
        let direction = match input.text("direction") {
            "down" => VoteDirection::Down,
            _ => VoteDirection::Up,
        };
        let endpoint = format!("posts/{}/vote", input.text("post_id"));
        let body = json!({"direction": direction.as_str()});
        let response = self.transport.post(&endpoint, &body, None).await?;
        Ok(json!({"vote": response.payload, "direction": direction}))
    }
}

pub struct DeletePost {
    transport: Arc<PlatformTransport>,
    contract: InputContract,
}

impl DeletePost {
    pub fn new(transport: Arc<PlatformTransport>) -> Self {
        Self {
            transport,
            contract: InputContract::new().require_text("post_id", "Post to delete"),
        }
    }
}

#[async_trait]
impl Capability for DeletePost {
    fn name(&self) -> &'static str {
        "delete_post"
    }

    fn description(&self) -> &'static str {
        "Delete one of your own posts, then verify it is gone."
    }

    fn contract(&self) -> &InputContract {
        &self.contract
    }

    async fn execute(&self, input: ValidatedInput) -> Result<Value, CapabilityError> {
        let post_id = input.text("post_id");
        let endpoint = format!("posts/{post_id}");
        self.transport.delete(&endpoint, None).await?;

        // Deletion reported success; confirm the post actually stopped
        // resolving before telling the model it is gone.
        match self.transport.get(&endpoint, None).await {
            Err(TransportError::Client { status: 404, .. }) => {
                Ok(json!({"deleted": true, "still_visible": false}))
            }
            Ok(still_there) if !still_there.payload.is_null() => {
                warn!(post_id, "Deleted post still resolves");
                Ok(json!({
                    "deleted": true,
                    "still_visible": true,
                    "note": "The platform still returns this post; deletion may take a moment to propagate.",
                }))
            }
            Ok(_) => Ok(json!({"deleted": true, "still_visible": false})),
            Err(error) => {
                warn!(post_id, error = %error, "Deletion verification fetch failed");
                Ok(json!({
                    "deleted": true,
                    "still_visible": null,
                    "note": "Deletion succeeded but the verification fetch failed.",
                }))
            }
        }
    }
}
