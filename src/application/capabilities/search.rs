//! Search capability with a degraded client-side fallback
//!
//! Semantic search lives on the platform. When that endpoint fails
//! server-side, the capability scans a recent feed window for substring
//! matches instead of failing outright, and labels everything it
//! returns as approximate.

use super::contract::{InputContract, ValidatedInput};
use super::registry::{Capability, CapabilityError};
use crate::constants::{FALLBACK_RESULT_LIMIT, FALLBACK_SCAN_LIMIT};
use crate::domain::platform::FeedPost;
use crate::infrastructure::platform::PlatformTransport;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::warn;

pub struct SearchPosts {
    transport: Arc<PlatformTransport>,
    contract: InputContract,
}

impl SearchPosts {
    pub fn new(transport: Arc<PlatformTransport>) -> Self {
        Self {
            transport,
            contract: InputContract::new()
                .require_text("query", "What to search for")
                .optional_integer("limit", "Maximum results", 1, 50),
        }
    }

    /// Case-insensitive substring scan over a recent feed window. One
    /// level only: a failure here is terminal, never another search.
    async fn fallback_scan(&self, query: &str) -> Result<Value, CapabilityError> {
        let response = self
            .transport
            .get_with_query(
                "feed",
                &[("limit", FALLBACK_SCAN_LIMIT.to_string())],
                None,
            )
            .await
            .map_err(|error| {
                CapabilityError::failed_with_hint(
                    format!(
                        "search is unavailable and the fallback feed scan also failed: {error}"
                    ),
                    "try again once the platform recovers",
                )
            })?;

        let needle = query.to_lowercase();
        let results: Vec<Value> = FeedPost::list_from_payload(&response.payload)
            .into_iter()
            .filter(|post| {
                post.title.to_lowercase().contains(&needle)
                    || post.content.to_lowercase().contains(&needle)
            })
            .take(FALLBACK_RESULT_LIMIT)
            .map(|post| json!({"post": post, "match": "approximate"}))
            .collect();

        Ok(json!({
            "approximate": true,
            "note": "Semantic search is unavailable; these are approximate keyword matches over the recent feed.",
            "count": results.len(),
            "results": results,
        }))
    }
}

#[async_trait]
impl Capability for SearchPosts {
    fn name(&self) -> &'static str {
        "search_posts"
    }

    fn description(&self) -> &'static str {
        "Search posts by meaning. Falls back to keyword matching when search is down."
    }

    fn contract(&self) -> &InputContract {
        &self.contract
    }

    async fn execute(&self, input: ValidatedInput) -> Result<Value, CapabilityError> {
        let query = input.text("query");
        let limit = input.integer_or("limit", 20);

        match self
            .transport
            .get_with_query(
                "search",
                &[("q", query.to_string()), ("limit", limit.to_string())],
                None,
            )
            .await
        {
            Ok(response) => Ok(json!({
                "approximate": false,
                "results": response.payload,
            })),
            Err(error) if error.is_server_fault() => {
                warn!(error = %error, "Search endpoint failed server-side, scanning the feed instead");
                self.fallback_scan(query).await
            }
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::capabilities::CapabilityRegistry;
    use crate::infrastructure::credentials::CredentialStore;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
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

    /// Routes by path prefix: /search answers with `search_status`,
    /// /feed always answers 200 with `feed_body`.
    async fn routed_stub(
        search_status: u16,
        feed_body: String,
    ) -> (std::net::SocketAddr, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let search_hits = Arc::new(AtomicUsize::new(0));
        let feed_hits = Arc::new(AtomicUsize::new(0));
        let search_counter = search_hits.clone();
        let feed_counter = feed_hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buffer = [0u8; 4096];
                let read = socket.read(&mut buffer).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buffer[..read]).to_string();
                let (status, reason, body) = if request.starts_with("GET /search") {
                    search_counter.fetch_add(1, Ordering::SeqCst);
                    (
                        search_status,
                        if search_status == 200 { "OK" } else { "Error" },
                        r#"{"error": "search backend offline"}"#.to_string(),
                    )
                } else {
                    feed_counter.fetch_add(1, Ordering::SeqCst);
                    (200, "OK", feed_body.clone())
                };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        (addr, search_hits, feed_hits)
    }

    fn registry_for(dir: &TempDir, addr: std::net::SocketAddr) -> CapabilityRegistry {
        let transport = Arc::new(
            PlatformTransport::new(format!("http://{addr}"), seeded_store(dir))
                .with_base_delay(Duration::from_millis(1)),
        );
        CapabilityRegistry::new().with(Arc::new(SearchPosts::new(transport)))
    }

    fn feed_of(count: usize, matching: usize) -> String {
        let posts: Vec<Value> = (0..count)
            .map(|i| {
                let title = if i < matching {
                    format!("rust tip number {i}")
                } else {
                    format!("gardening note {i}")
                };
                json!({"id": format!("p{i}"), "title": title, "content": "body"})
            })
            .collect();
        json!({"posts": posts}).to_string()
    }

    #[tokio::test]
    async fn server_fault_falls_back_to_feed_scan_with_cap_and_tags() {
        let dir = TempDir::new().unwrap();
        let (addr, search_hits, feed_hits) = routed_stub(503, feed_of(40, 25)).await;
        let registry = registry_for(&dir, addr);

        let result = registry
            .dispatch("search_posts", &json!({"query": "Rust"}))
            .await;

        assert_eq!(result["success"], true);
        assert_eq!(result["approximate"], true);
        assert!(result["note"].as_str().unwrap().contains("approximate"));
        // 25 posts match but the fallback caps at 20.
        assert_eq!(result["count"], 20);
        assert_eq!(result["results"][0]["match"], "approximate");
        // Search retried to exhaustion, then exactly one feed fetch.
        assert_eq!(search_hits.load(Ordering::SeqCst), 3);
        assert_eq!(feed_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn match_is_case_insensitive_across_title_and_content() {
        let dir = TempDir::new().unwrap();
        let feed = json!({"posts": [
            {"id": "a", "title": "Big RUST Announcement", "content": "x"},
            {"id": "b", "title": "quiet day", "content": "thinking about rust lately"},
            {"id": "c", "title": "unrelated", "content": "nothing here"},
        ]})
        .to_string();
        let (addr, _, _) = routed_stub(500, feed).await;
        let registry = registry_for(&dir, addr);

        let result = registry
            .dispatch("search_posts", &json!({"query": "rust"}))
            .await;

        assert_eq!(result["count"], 2);
        assert_eq!(result["results"][0]["post"]["id"], "a");
        assert_eq!(result["results"][1]["post"]["id"], "b");
    }

    #[tokio::test]
    async fn client_error_does_not_trigger_the_fallback() {
        let dir = TempDir::new().unwrap();
        let (addr, search_hits, feed_hits) = routed_stub(400, feed_of(5, 5)).await;
        let registry = registry_for(&dir, addr);

        let result = registry
            .dispatch("search_posts", &json!({"query": "rust"}))
            .await;

        assert_eq!(result["success"], false);
        assert_eq!(search_hits.load(Ordering::SeqCst), 1);
        assert_eq!(feed_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_fallback_is_a_terminal_failure() {
        let dir = TempDir::new().unwrap();
        // Every path fails server-side, including the feed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buffer = [0u8; 4096];
                let _ = socket.read(&mut buffer).await;
                let body = r#"{"error": "everything is down"}"#;
                let response = format!(
                    "HTTP/1.1 503 Service Unavailable\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        let registry = registry_for(&dir, addr);

        let result = registry
            .dispatch("search_posts", &json!({"query": "rust"}))
            .await;

        assert_eq!(result["success"], false);
        assert!(result["error"].as_str().unwrap().contains("fallback"));
        assert!(result["hint"].as_str().unwrap().contains("recovers"));
    }

    #[tokio::test]
    async fn successful_search_passes_results_through_untagged() {
        let dir = TempDir::new().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buffer = [0u8; 4096];
            let _ = socket.read(&mut buffer).await;
            let body = r#"{"results": [{"id": "p1", "score": 0.92}]}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });
        let registry = registry_for(&dir, addr);

        let result = registry
            .dispatch("search_posts", &json!({"query": "rust", "limit": 5}))
            .await;

        assert_eq!(result["success"], true);
        assert_eq!(result["approximate"], false);
        assert_eq!(result["results"]["results"][0]["id"], "p1");
    }
}
