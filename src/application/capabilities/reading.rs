//! Read-side capabilities: feed, posts, comments, profile

use super::contract::{InputContract, ValidatedInput};
use super::registry::{Capability, CapabilityError};
use crate::constants::DEFAULT_FEED_LIMIT;
use crate::domain::platform::{AgentProfile, Comment, FeedPost};
use crate::infrastructure::credentials::CredentialStore;
use crate::infrastructure::platform::PlatformTransport;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

pub struct GetFeed {
    transport: Arc<PlatformTransport>,
    contract: InputContract,
}

impl GetFeed {
    pub fn new(transport: Arc<PlatformTransport>) -> Self {
        Self {
            transport,
            contract: InputContract::new().optional_integer(
                "limit",
                "How many recent posts to fetch",
                1,
                100,
            ),
        }
    }
}

#[async_trait]
impl Capability for GetFeed {
    fn name(&self) -> &'static str {
        "get_feed"
    }

    fn description(&self) -> &'static str {
        "Fetch the most recent posts from the feed."
    }

    fn contract(&self) -> &InputContract {
        &self.contract
    }

    async fn execute(&self, input: ValidatedInput) -> Result<Value, CapabilityError> {
        let limit = input.integer_or("limit", DEFAULT_FEED_LIMIT);
        let response = self
            .transport
            .get_with_query("feed", &[("limit", limit.to_string())], None)
            .await?;
        let posts = FeedPost::list_from_payload(&response.payload);
        Ok(json!({"count": posts.len(), "posts": posts}))
    }
}

pub struct GetPost {
    transport: Arc<PlatformTransport>,
    contract: InputContract,
}

impl GetPost {
    pub fn new(transport: Arc<PlatformTransport>) -> Self {
        Self {
            transport,
            contract: InputContract::new().require_text("post_id", "Post to fetch"),
        }
    }
}

#[async_trait]
impl Capability for GetPost {
    fn name(&self) -> &'static str {
        "get_post"
    }

    fn description(&self) -> &'static str {
        "Fetch a single post with its full content."
    }

    fn contract(&self) -> &InputContract {
        &self.contract
    }

    async fn execute(&self, input: ValidatedInput) -> Result<Value, CapabilityError> {
        let endpoint = format!("posts/{}", input.text("post_id"));
        let response = self.transport.get(&endpoint, None).await?;
        Ok(json!({"post": response.payload}))
    }
}

pub struct ListComments {
    transport: Arc<PlatformTransport>,
    contract: InputContract,
}

impl ListComments {
    pub fn new(transport: Arc<PlatformTransport>) -> Self {
        Self {
            transport,
            contract: InputContract::new().require_text("post_id", "Post whose comments to list"),
        }
    }
}

#[async_trait]
impl Capability for ListComments {
    fn name(&self) -> &'static str {
        "list_comments"
    }

    fn description(&self) -> &'static str {
        "List the comments on a post."
    }

    fn contract(&self) -> &InputContract {
        &self.contract
    }

    async fn execute(&self, input: ValidatedInput) -> Result<Value, CapabilityError> {
        let endpoint = format!("posts/{}/comments", input.text("post_id"));
        let response = self.transport.get(&endpoint, None).await?;
        let comments = Comment::list_from_payload(&response.payload);
        Ok(json!({"count": comments.len(), "comments": comments}))
    }
}

pub struct GetProfile {
    transport: Arc<PlatformTransport>,
    credentials: Arc<CredentialStore>,
    contract: InputContract,
}

impl GetProfile {
    pub fn new(transport: Arc<PlatformTransport>, credentials: Arc<CredentialStore>) -> Self {
        Self {
            transport,
            credentials,
            contract: InputContract::new(),
        }
    }
}

#[async_trait]
impl Capability for GetProfile {
    fn name(&self) -> &'static str {
        "get_profile"
    }

    fn description(&self) -> &'static str {
        "Show the agent profile behind the active credential."
    }

    fn contract(&self) -> &InputContract {
        &self.contract
    }

    async fn execute(&self, _input: ValidatedInput) -> Result<Value, CapabilityError> {
        let identity = self.credentials.active_identity().map(|identity| {
            json!({"name": identity.name, "status": identity.status.as_str()})
        });
        let response = self.transport.get("agents/me", None).await?;
        // Unrecognized shapes read as an empty profile rather than a failure.
        let profile: AgentProfile = serde_json::from_value(response.payload).unwrap_or_default();
        Ok(json!({"identity": identity, "profile": profile}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::capabilities::CapabilityRegistry;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn seeded_store(dir: &TempDir) -> Arc<CredentialStore> {
        let path = dir.path().join("agents.json");
        fs::write(
            &path,
            r#"{"active": "probe", "agents": [{"name": "probe", "api_key": "secret", "status": "claimed"}]}"#,
        )
        .unwrap();
        Arc::new(CredentialStore::load(path))
    }

    /// Echoes the request's first line into `seen` and serves the body.
    async fn stub_recording(
        body: &'static str,
    ) -> (
        std::net::SocketAddr,
        Arc<std::sync::Mutex<Vec<String>>>,
        Arc<AtomicUsize>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let hits = Arc::new(AtomicUsize::new(0));
        let seen_writer = seen.clone();
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buffer = [0u8; 4096];
                let read = socket.read(&mut buffer).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buffer[..read]).to_string();
                if let Some(line) = request.lines().next() {
                    seen_writer.lock().unwrap().push(line.to_string());
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        (addr, seen, hits)
    }

    fn registry_for(
        dir: &TempDir,
        addr: std::net::SocketAddr,
    ) -> (CapabilityRegistry, Arc<CredentialStore>) {
        let store = seeded_store(dir);
        let transport = Arc::new(PlatformTransport::new(
            format!("http://{addr}"),
            store.clone(),
        ));
        let registry = CapabilityRegistry::new()
            .with(Arc::new(GetFeed::new(transport.clone())))
            .with(Arc::new(GetPost::new(transport.clone())))
            .with(Arc::new(ListComments::new(transport.clone())))
            .with(Arc::new(GetProfile::new(transport, store.clone())));
        (registry, store)
    }

    #[tokio::test]
    async fn feed_parses_posts_and_applies_the_default_limit() {
        let dir = TempDir::new().unwrap();
        let (addr, seen, _) = stub_recording(
            r#"{"posts": [{"id": "p1", "title": "One"}, {"id": "p2", "title": "Two"}]}"#,
        )
        .await;
        let (registry, _) = registry_for(&dir, addr);

        let result = registry.dispatch("get_feed", &json!({})).await;
        assert_eq!(result["success"], true);
        assert_eq!(result["count"], 2);
        assert_eq!(result["posts"][1]["id"], "p2");

        let first_line = seen.lock().unwrap()[0].clone();
        assert!(first_line.starts_with("GET /feed?limit=25"));
    }

    #[tokio::test]
    async fn feed_limit_is_range_checked_before_any_request() {
        let dir = TempDir::new().unwrap();
        let (addr, _, hits) = stub_recording("{}").await;
        let (registry, _) = registry_for(&dir, addr);

        let result = registry.dispatch("get_feed", &json!({"limit": 500})).await;
        assert_eq!(result["success"], false);
        assert!(result["error"].as_str().unwrap().contains("between 1 and 100"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn get_post_and_comments_hit_their_endpoints() {
        let dir = TempDir::new().unwrap();
        let (addr, seen, _) = stub_recording(r#"{"comments": [{"id": "c1"}]}"#).await;
        let (registry, _) = registry_for(&dir, addr);

        registry.dispatch("get_post", &json!({"post_id": "p9"})).await;
        let comments = registry
            .dispatch("list_comments", &json!({"post_id": "p9"}))
            .await;

        assert_eq!(comments["count"], 1);
        let lines = seen.lock().unwrap().clone();
        assert!(lines[0].starts_with("GET /posts/p9 "));
        assert!(lines[1].starts_with("GET /posts/p9/comments "));
    }

    #[tokio::test]
    async fn profile_combines_store_identity_with_platform_payload() {
        let dir = TempDir::new().unwrap();
        let (addr, _, _) = stub_recording(r#"{"name": "probe", "post_count": 7}"#).await;
        let (registry, _) = registry_for(&dir, addr);

        let result = registry.dispatch("get_profile", &json!({})).await;
        assert_eq!(result["success"], true);
        assert_eq!(result["identity"]["name"], "probe");
        assert_eq!(result["identity"]["status"], "claimed");
        assert_eq!(result["profile"]["post_count"], 7);
        // Fields the platform omitted fill with typed defaults.
        assert_eq!(result["profile"]["comment_count"], 0);
    }
}
