//! In-memory [`Store`] used by the binary.
//!
//! Scores are computed from which profile fields are present and cached for a
//! configurable TTL. Interests live in a map that can be seeded from a JSON file
//! shaped like `{"1": ["cars", "pets"], "2": ["books"]}`.

use crate::fields::Gender;
use crate::store::{ScoreQuery, Store};
use anyhow::Context;
use async_trait::async_trait;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::sync::RwLock;

const SCORE_CACHE_CAPACITY: u64 = 100_000;

pub struct MemoryStore {
    scores: Cache<String, f64>,
    interests: RwLock<HashMap<i64, Vec<String>>>,
}

impl MemoryStore {
    pub fn new(score_ttl: Duration) -> Self {
        Self {
            scores: Cache::builder()
                .time_to_live(score_ttl)
                .max_capacity(SCORE_CACHE_CAPACITY)
                .build(),
            interests: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_interests(mut self, interests: HashMap<i64, Vec<String>>) -> Self {
        self.interests = RwLock::new(interests);
        self
    }

    pub async fn set_interests(&self, client_id: i64, interests: Vec<String>) {
        self.interests.write().await.insert(client_id, interests);
    }

    /// Reads an interests seed file keyed by decimal client id.
    pub async fn load_interests(path: &Path) -> anyhow::Result<HashMap<i64, Vec<String>>> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read interests file {}", path.display()))?;
        parse_interests(&content)
            .with_context(|| format!("Invalid interests file {}", path.display()))
    }
}

fn parse_interests(content: &str) -> anyhow::Result<HashMap<i64, Vec<String>>> {
    let raw: HashMap<String, Vec<String>> = serde_json::from_str(content)?;
    raw.into_iter()
        .map(|(id, interests)| -> anyhow::Result<(i64, Vec<String>)> {
            let id = id
                .parse::<i64>()
                .with_context(|| format!("client id '{}' is not an integer", id))?;
            Ok((id, interests))
        })
        .collect()
}

/// Cache key identifying a profile: name, phone and birthday.
pub fn score_key(query: &ScoreQuery<'_>) -> String {
    let parts = [
        query.first_name.unwrap_or_default().to_string(),
        query.last_name.unwrap_or_default().to_string(),
        query.phone.map(|p| p.digits()).unwrap_or_default(),
        query
            .birthday
            .map(|d| d.format("%Y%m%d").to_string())
            .unwrap_or_default(),
    ];

    let mut hasher = Sha256::new();
    hasher.update(parts.concat().as_bytes());
    format!("uid:{}", hex::encode(hasher.finalize()))
}

/// Sums the weights of the filled-in profile fields.
pub fn compute_score(query: &ScoreQuery<'_>) -> f64 {
    let mut score = 0.0;
    if query.phone.is_some() {
        score += 1.5;
    }
    if query.email.is_some() {
        score += 1.5;
    }
    let known_gender = matches!(query.gender, Some(g) if g != Gender::Unknown);
    if query.birthday.is_some() && known_gender {
        score += 1.5;
    }
    if query.first_name.is_some() && query.last_name.is_some() {
        score += 0.5;
    }
    score
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_score(&self, query: &ScoreQuery<'_>) -> anyhow::Result<f64> {
        let key = score_key(query);
        // A cached zero is recomputed.
        if let Some(cached) = self.scores.get(&key).await.filter(|s| *s != 0.0) {
            tracing::debug!(key = %key, "Score cache HIT");
            return Ok(cached);
        }

        let score = compute_score(query);
        self.scores.insert(key, score).await;
        Ok(score)
    }

    async fn get_interests(&self, client_id: i64) -> anyhow::Result<Vec<String>> {
        Ok(self
            .interests
            .read()
            .await
            .get(&client_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Phone;
    use chrono::NaiveDate;

    #[test]
    fn test_score_weights() {
        let phone = Phone::Text("79175002040".to_string());
        let birthday = NaiveDate::from_ymd_opt(2000, 1, 1);

        let contact = ScoreQuery {
            phone: Some(&phone),
            email: Some("a@b.c"),
            ..ScoreQuery::default()
        };
        assert_eq!(compute_score(&contact), 3.0);

        let full = ScoreQuery {
            phone: Some(&phone),
            email: Some("a@b.c"),
            birthday,
            gender: Some(Gender::Female),
            first_name: Some("A"),
            last_name: Some("B"),
        };
        assert_eq!(compute_score(&full), 5.0);

        let unknown_gender = ScoreQuery {
            birthday,
            gender: Some(Gender::Unknown),
            ..ScoreQuery::default()
        };
        assert_eq!(compute_score(&unknown_gender), 0.0);
    }

    #[test]
    fn test_score_key_ignores_email_and_gender() {
        let phone = Phone::Number(79175002040);
        let a = ScoreQuery {
            phone: Some(&phone),
            email: Some("a@b.c"),
            ..ScoreQuery::default()
        };
        let b = ScoreQuery {
            phone: Some(&phone),
            gender: Some(Gender::Male),
            ..ScoreQuery::default()
        };
        assert_eq!(score_key(&a), score_key(&b));
        assert!(score_key(&a).starts_with("uid:"));
    }

    #[tokio::test]
    async fn test_cached_score_is_reused() {
        let store = MemoryStore::new(Duration::from_secs(60));
        let phone = Phone::Text("79175002040".to_string());
        let first = ScoreQuery {
            phone: Some(&phone),
            email: Some("a@b.c"),
            ..ScoreQuery::default()
        };
        assert_eq!(store.get_score(&first).await.unwrap(), 3.0);

        // Same key, fewer fields: the cached score wins.
        let second = ScoreQuery {
            phone: Some(&phone),
            ..ScoreQuery::default()
        };
        assert_eq!(store.get_score(&second).await.unwrap(), 3.0);
    }

    #[tokio::test]
    async fn test_cached_zero_score_is_recomputed() {
        let store = MemoryStore::new(Duration::from_secs(60));
        let birthday = NaiveDate::from_ymd_opt(2000, 1, 1);

        let unknown = ScoreQuery {
            birthday,
            gender: Some(Gender::Unknown),
            ..ScoreQuery::default()
        };
        assert_eq!(store.get_score(&unknown).await.unwrap(), 0.0);

        // Same key as above; the zero entry must not win.
        let male = ScoreQuery {
            birthday,
            gender: Some(Gender::Male),
            ..ScoreQuery::default()
        };
        assert_eq!(store.get_score(&male).await.unwrap(), 1.5);
    }

    #[tokio::test]
    async fn test_unknown_client_has_no_interests() {
        let store = MemoryStore::new(Duration::from_secs(60))
            .with_interests(HashMap::from([(1, vec!["cars".to_string()])]));
        assert_eq!(store.get_interests(1).await.unwrap(), vec!["cars"]);
        assert!(store.get_interests(2).await.unwrap().is_empty());

        store.set_interests(2, vec!["books".to_string()]).await;
        assert_eq!(store.get_interests(2).await.unwrap(), vec!["books"]);
    }

    #[test]
    fn test_parse_interests() {
        let parsed = parse_interests(r#"{"1": ["cars", "pets"], "7": []}"#).unwrap();
        assert_eq!(parsed[&1], vec!["cars", "pets"]);
        assert!(parsed[&7].is_empty());

        assert!(parse_interests(r#"{"x": ["cars"]}"#).is_err());
        assert!(parse_interests("[]").is_err());
    }
}
