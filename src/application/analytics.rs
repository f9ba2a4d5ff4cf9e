//! Pure analytics over already-fetched posts
//!
//! Everything here is deterministic and does no I/O. Capability
//! handlers fetch the feed window and hand it over, so the math stays
//! trivially testable.

use crate::domain::platform::FeedPost;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "with", "this", "that", "from", "have", "has", "was", "were", "are",
        "you", "your", "not", "its", "what", "when", "how", "why", "who", "will", "can", "just",
        "about", "into", "over", "after", "before", "than", "then", "them", "they", "their",
        "there", "here", "out", "our", "been", "being", "more", "most", "some", "such", "only",
        "very", "all", "any", "each", "few", "other", "own", "same", "too", "also", "does", "did",
        "would", "could", "should", "may", "might", "must", "but", "per", "via",
    ]
    .into_iter()
    .collect()
});

/// One post's trend standing.
#[derive(Debug, Clone, Serialize)]
pub struct TrendEntry {
    pub post_id: String,
    pub title: String,
    pub score: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    pub comment_count: i64,
}

/// Engagement-weighted score; comments count double.
pub fn trend_score(post: &FeedPost) -> i64 {
    post.upvotes - post.downvotes + 2 * post.comment_count
}

/// Posts ranked by trend score, best first. Ties keep feed order.
pub fn trending(posts: &[FeedPost], top: usize) -> Vec<TrendEntry> {
    let mut entries: Vec<TrendEntry> = posts
        .iter()
        .map(|post| TrendEntry {
            post_id: post.id.clone(),
            title: post.title.clone(),
            score: trend_score(post),
            upvotes: post.upvotes,
            downvotes: post.downvotes,
            comment_count: post.comment_count,
        })
        .collect();
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries.truncate(top);
    entries
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Mixed => "mixed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SentimentReading {
    pub post_id: String,
    pub title: String,
    pub ratio: f64,
    pub label: Sentiment,
}

/// Upvote share of all votes. A voteless post reads as the neutral
/// midpoint rather than either pole.
pub fn sentiment_ratio(upvotes: i64, downvotes: i64) -> f64 {
    let total = upvotes + downvotes;
    if total <= 0 {
        return 0.5;
    }
    upvotes as f64 / total as f64
}

pub fn classify_ratio(ratio: f64) -> Sentiment {
    if ratio > 0.6 {
        Sentiment::Positive
    } else if ratio < 0.4 {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

pub fn sentiment_readings(posts: &[FeedPost]) -> Vec<SentimentReading> {
    posts
        .iter()
        .map(|post| {
            let ratio = sentiment_ratio(post.upvotes, post.downvotes);
            SentimentReading {
                post_id: post.id.clone(),
                title: post.title.clone(),
                ratio,
                label: classify_ratio(ratio),
            }
        })
        .collect()
}

/// Majority classification across readings: one class above 60% wins;
/// both poles present without a majority is mixed; anything else is
/// neutral.
pub fn aggregate_sentiment(readings: &[SentimentReading]) -> Sentiment {
    if readings.is_empty() {
        return Sentiment::Neutral;
    }
    let total = readings.len() as f64;
    let count = |label: Sentiment| readings.iter().filter(|r| r.label == label).count();
    let positive = count(Sentiment::Positive);
    let negative = count(Sentiment::Negative);
    let neutral = count(Sentiment::Neutral);

    if positive as f64 / total > 0.6 {
        Sentiment::Positive
    } else if negative as f64 / total > 0.6 {
        Sentiment::Negative
    } else if neutral as f64 / total > 0.6 {
        Sentiment::Neutral
    } else if positive > 0 && negative > 0 {
        Sentiment::Mixed
    } else {
        Sentiment::Neutral
    }
}

/// Posts sharing one title token.
#[derive(Debug, Clone, Serialize)]
pub struct TopicCluster {
    pub token: String,
    pub post_count: usize,
    pub post_ids: Vec<String>,
}

fn title_tokens(title: &str) -> HashSet<String> {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() > 2 && !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Clusters of at least two distinct posts sharing a title token,
/// largest first; ties order alphabetically by token.
pub fn topic_clusters(posts: &[FeedPost]) -> Vec<TopicCluster> {
    let mut by_token: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for post in posts {
        for token in title_tokens(&post.title) {
            by_token.entry(token).or_default().push(post.id.clone());
        }
    }

    let mut clusters: Vec<TopicCluster> = by_token
        .into_iter()
        .filter(|(_, ids)| ids.len() >= 2)
        .map(|(token, post_ids)| TopicCluster {
            token,
            post_count: post_ids.len(),
            post_ids,
        })
        .collect();
    clusters.sort_by(|a, b| {
        b.post_count
            .cmp(&a.post_count)
            .then_with(|| a.token.cmp(&b.token))
    });
    clusters
}

/// One flagged post with every rule it tripped.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyFlag {
    pub post_id: String,
    pub title: String,
    pub severity: u32,
    pub reasons: Vec<String>,
}

/// Absolute floor that keeps a couple of downvotes on a quiet batch
/// from reading as a pile-on.
const DOWNVOTE_FLOOR: i64 = 5;

/// Minimum votes before the downvote-ratio rule applies.
const RATIO_MIN_VOTES: i64 = 10;

/// Posts that stand out from the batch. Severity counts tripped rules;
/// results order by severity, then total engagement.
pub fn anomaly_flags(posts: &[FeedPost]) -> Vec<AnomalyFlag> {
    if posts.is_empty() {
        return Vec::new();
    }
    let count = posts.len() as f64;
    let mean_upvotes = posts.iter().map(|p| p.upvotes).sum::<i64>() as f64 / count;
    let mean_downvotes = posts.iter().map(|p| p.downvotes).sum::<i64>() as f64 / count;
    let mean_comments = posts.iter().map(|p| p.comment_count).sum::<i64>() as f64 / count;

    let mut flagged: Vec<(i64, AnomalyFlag)> = Vec::new();
    for post in posts {
        let mut severity = 0u32;
        let mut reasons = Vec::new();

        if (post.upvotes as f64) > 3.0 * mean_upvotes {
            severity += 1;
            reasons.push(format!(
                "upvotes {} are more than three times the batch mean {:.1}",
                post.upvotes, mean_upvotes
            ));
        }
        if (post.downvotes as f64) > 3.0 * mean_downvotes && post.downvotes > DOWNVOTE_FLOOR {
            severity += 1;
            reasons.push(format!(
                "downvotes {} are more than three times the batch mean {:.1}",
                post.downvotes, mean_downvotes
            ));
        }
        let total_votes = post.upvotes + post.downvotes;
        if total_votes >= RATIO_MIN_VOTES && post.downvotes * 2 > total_votes {
            severity += 1;
            reasons.push(format!(
                "{} of {} votes are downvotes",
                post.downvotes, total_votes
            ));
        }
        if (post.comment_count as f64) > 4.0 * mean_comments {
            severity += 1;
            reasons.push(format!(
                "comment count {} is more than four times the batch mean {:.1}",
                post.comment_count, mean_comments
            ));
        }

        if severity > 0 {
            let engagement = post.upvotes + post.downvotes + post.comment_count;
            flagged.push((
                engagement,
                AnomalyFlag {
                    post_id: post.id.clone(),
                    title: post.title.clone(),
                    severity,
                    reasons,
                },
            ));
        }
    }

    flagged.sort_by(|a, b| b.1.severity.cmp(&a.1.severity).then_with(|| b.0.cmp(&a.0)));
    flagged.into_iter().map(|(_, flag)| flag).collect()
}
