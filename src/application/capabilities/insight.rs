//! Feed analysis capabilities
//!
//! Each handler fetches a window of recent posts and runs one of the
//! pure analyses from [`crate::application::analytics`] over it. The
//! window size is caller-tunable through the shared `limit` field.

use super::contract::{InputContract, ValidatedInput};
use super::registry::{Capability, CapabilityError};
use crate::application::analytics;
use crate::constants::DEFAULT_FEED_LIMIT;
use crate::domain::platform::FeedPost;
use crate::infrastructure::platform::PlatformTransport;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

fn window_contract() -> InputContract {
    InputContract::new().optional_integer("limit", "How many recent posts to analyze", 1, 100)
}

async fn fetch_posts(
    transport: &PlatformTransport,
    limit: i64,
) -> Result<Vec<FeedPost>, CapabilityError> {
    let response = transport
        .get_with_query("feed", &[("limit", limit.to_string())], None)
        .await?;
    Ok(FeedPost::list_from_payload(&response.payload))
}

pub struct AnalyzeTrends {
    transport: Arc<PlatformTransport>,
    contract: InputContract,
}

impl AnalyzeTrends {
    pub fn new(transport: Arc<PlatformTransport>) -> Self {
        Self {
            transport,
            contract: window_contract(),
        }
    }
}

#[async_trait]
impl Capability for AnalyzeTrends {
    fn name(&self) -> &'static str {
        "analyze_trends"
    }

    fn description(&self) -> &'static str {
        "Rank recent posts by engagement momentum."
    }

    fn contract(&self) -> &InputContract {
        &self.contract
    }

    async fn execute(&self, input: ValidatedInput) -> Result<Value, CapabilityError> {
        let limit = input.integer_or("limit", DEFAULT_FEED_LIMIT);
        let posts = fetch_posts(&self.transport, limit).await?;
        let trending = analytics::trending(&posts, 10);
        Ok(json!({
            "sample_size": posts.len(),
            "trending": trending,
        }))
    }
}

pub struct AnalyzeSentiment {
    transport: Arc<PlatformTransport>,
    contract: InputContract,
}

impl AnalyzeSentiment {
    pub fn new(transport: Arc<PlatformTransport>) -> Self {
        Self {
            transport,
            contract: window_contract(),
        }
    }
}

#[async_trait]
impl Capability for AnalyzeSentiment {
    fn name(&self) -> &'static str {
        "analyze_sentiment"
    }

    fn description(&self) -> &'static str {
        "Classify recent posts by vote balance and summarize the overall mood."
    }

    fn contract(&self) -> &InputContract {
        &self.contract
    }

    async fn execute(&self, input: ValidatedInput) -> Result<Value, CapabilityError> {
        let limit = input.integer_or("limit", DEFAULT_FEED_LIMIT);
        let posts = fetch_posts(&self.transport, limit).await?;
        let readings = analytics::sentiment_readings(&posts);
        let aggregate = analytics::aggregate_sentiment(&readings);
        Ok(json!({
            "sample_size": posts.len(),
            "aggregate": aggregate.as_str(),
            "posts": readings,
        }))
    }
}

pub struct FindTopics {
    transport: Arc<PlatformTransport>,
    contract: InputContract,
}

impl FindTopics {
    pub fn new(transport: Arc<PlatformTransport>) -> Self {
        Self {
            transport,
            contract: window_contract(),
        }
    }
}

#[async_trait]
impl Capability for FindTopics {
    fn name(&self) -> &'static str {
        "find_topics"
    }

    fn description(&self) -> &'static str {
        "Group recent posts into keyword clusters drawn from their titles."
    }

    fn contract(&self) -> &InputContract {
        &self.contract
    }

    async fn execute(&self, input: ValidatedInput) -> Result<Value, CapabilityError> {
        let limit = input.integer_or("limit", DEFAULT_FEED_LIMIT);
        let posts = fetch_posts(&self.transport, limit).await?;
        let topics = analytics::topic_clusters(&posts);
        Ok(json!({
            "sample_size": posts.len(),
            "topics": topics,
        }))
    }
}

pub struct DetectAnomalies {
    transport: Arc<PlatformTransport>,
    contract: InputContract,
}

impl DetectAnomalies {
    pub fn new(transport: Arc<PlatformTransport>) -> Self {
        Self {
            transport,
            contract: window_contract(),
        }
    }
}

#[async_trait]
impl Capability for DetectAnomalies {
    fn name(&self) -> &'static str {
        "detect_anomalies"
    }

    fn description(&self) -> &'static str {
        "Flag posts whose vote or comment activity is far outside the batch norm."
    }

    fn contract(&self) -> &InputContract {
        &self.contract
    }

    async fn execute(&self, input: ValidatedInput) -> Result<Value, CapabilityError> {
        let limit = input.integer_or("limit", DEFAULT_FEED_LIMIT);
        let posts = fetch_posts(&self.transport, limit).await?;
        let anomalies = analytics::anomaly_flags(&posts);
        Ok(json!({
            "sample_size": posts.len(),
            "count": anomalies.len(),
            "anomalies": anomalies,
        }))
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
    use tokio::sync::Mutex;

    fn seeded_store(dir: &TempDir) -> Arc<CredentialStore> {
        let path = dir.path().join("agents.json");
        fs::write(
            &path,
            r#"{"active": "probe", "agents": [{"name": "probe", "api_key": "secret", "status": "claimed"}]}"#,
        )
        .unwrap();
        Arc::new(CredentialStore::load(path))
    }

    async fn feed_stub(body: String) -> (std::net::SocketAddr, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buffer = [0u8; 4096];
                let read = socket.read(&mut buffer).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buffer[..read]).to_string();
                if let Some(line) = request.lines().next() {
                    log.lock().await.push(line.to_string());
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        (addr, requests)
    }

    fn full_registry(dir: &TempDir, addr: std::net::SocketAddr) -> CapabilityRegistry {
        let transport = Arc::new(
            PlatformTransport::new(format!("http://{addr}"), seeded_store(dir))
                .with_base_delay(Duration::from_millis(1)),
        );
        CapabilityRegistry::new()
            .with(Arc::new(AnalyzeTrends::new(transport.clone())))
            .with(Arc::new(AnalyzeSentiment::new(transport.clone())))
            .with(Arc::new(FindTopics::new(transport.clone())))
            .with(Arc::new(DetectAnomalies::new(transport)))
    }

    fn sample_feed() -> String {
        json!({"posts": [
            {"id": "a", "title": "rust async patterns", "upvotes": 40, "downvotes": 2, "comment_count": 10},
            {"id": "b", "title": "rust error handling", "upvotes": 1, "downvotes": 9, "comment_count": 0},
            {"id": "c", "title": "weekend garden thread", "upvotes": 5, "downvotes": 5, "comment_count": 2},
        ]})
        .to_string()
    }

    #[tokio::test]
    async fn trends_ranks_by_score_and_reports_sample_size() {
        let dir = TempDir::new().unwrap();
        let (addr, requests) = feed_stub(sample_feed()).await;
        let registry = full_registry(&dir, addr);

        let result = registry.dispatch("analyze_trends", &json!({})).await;

        assert_eq!(result["success"], true);
        assert_eq!(result["sample_size"], 3);
        // Scores: a = 40-2+20 = 58, c = 5-5+4 = 4, b = 1-9+0 = -8.
        assert_eq!(result["trending"][0]["post_id"], "a");
        assert_eq!(result["trending"][0]["score"], 58);
        assert_eq!(result["trending"][2]["post_id"], "b");
        let lines = requests.lock().await;
        assert_eq!(lines[0], "GET /feed?limit=25 HTTP/1.1");
    }

    #[tokio::test]
    async fn sentiment_labels_each_post_and_aggregates() {
        let dir = TempDir::new().unwrap();
        let (addr, _) = feed_stub(sample_feed()).await;
        let registry = full_registry(&dir, addr);

        let result = registry.dispatch("analyze_sentiment", &json!({})).await;

        assert_eq!(result["posts"][0]["label"], "positive");
        assert_eq!(result["posts"][1]["label"], "negative");
        assert_eq!(result["posts"][2]["label"], "neutral");
        // One of each class, no strict majority and both poles present.
        assert_eq!(result["aggregate"], "mixed");
    }

    #[tokio::test]
    async fn topics_require_two_posts_per_token() {
        let dir = TempDir::new().unwrap();
        let (addr, _) = feed_stub(sample_feed()).await;
        let registry = full_registry(&dir, addr);

        let result = registry.dispatch("find_topics", &json!({})).await;

        let topics = result["topics"].as_array().unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0]["token"], "rust");
        assert_eq!(topics[0]["post_count"], 2);
    }

    #[tokio::test]
    async fn anomalies_flag_the_spike_and_honor_the_window_override() {
        let dir = TempDir::new().unwrap();
        let posts: Vec<Value> = (0..9)
            .map(|i| json!({"id": format!("q{i}"), "title": "steady", "upvotes": 4, "downvotes": 1, "comment_count": 2}))
            .chain(std::iter::once(
                json!({"id": "spike", "title": "viral", "upvotes": 400, "downvotes": 1, "comment_count": 2}),
            ))
            .collect();
        let (addr, requests) = feed_stub(json!({"posts": posts}).to_string()).await;
        let registry = full_registry(&dir, addr);

        let result = registry
            .dispatch("detect_anomalies", &json!({"limit": 50}))
            .await;

        assert_eq!(result["count"], 1);
        assert_eq!(result["anomalies"][0]["post_id"], "spike");
        let lines = requests.lock().await;
        assert_eq!(lines[0], "GET /feed?limit=50 HTTP/1.1");
    }

    #[tokio::test]
    async fn window_above_the_ceiling_is_rejected_before_any_request() {
        let dir = TempDir::new().unwrap();
        let (addr, requests) = feed_stub(sample_feed()).await;
        let registry = full_registry(&dir, addr);

        let result = registry
            .dispatch("analyze_trends", &json!({"limit": 500}))
            .await;

        assert_eq!(result["success"], false);
        assert!(result["error"].as_str().unwrap().contains("limit"));
        assert!(requests.lock().await.is_empty());
    }
}
