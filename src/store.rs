use crate::fields::{Gender, Phone};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Arguments of a score lookup. Unset fields are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreQuery<'a> {
    pub phone: Option<&'a Phone>,
    pub email: Option<&'a str>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

/// Scoring and interests backend.
///
/// Shared by every request, so implementations must be safe for concurrent use.
/// Retry and caching policy belong to the implementation.
#[async_trait]
pub trait Store: Send + Sync {
    /// Score for the given profile. Same arguments give the same score.
    async fn get_score(&self, query: &ScoreQuery<'_>) -> anyhow::Result<f64>;

    /// Interests of a client; unknown ids yield an empty list.
    async fn get_interests(&self, client_id: i64) -> anyhow::Result<Vec<String>>;
}
