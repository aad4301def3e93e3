//! Wire and domain types for the Threads Graph API

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of media a container carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    Text,
    Image,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Text => "TEXT",
            MediaType::Image => "IMAGE",
        }
    }
}

/// Processing status of a media container, as last observed by polling.
///
/// Transitions are server-driven:
/// - Unknown/InProgress → Finished | Published (publishable)
/// - Unknown/InProgress → Error | Expired (terminal failure)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerStatus {
    InProgress,
    Finished,
    Published,
    Error,
    Expired,
    Unknown,
}

impl ContainerStatus {
    /// Map the API's `status` field. Missing or unrecognized values are
    /// `Unknown`, never an error.
    pub fn from_wire(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return ContainerStatus::Unknown;
        };
        match value.trim().to_ascii_uppercase().as_str() {
            "IN_PROGRESS" => ContainerStatus::InProgress,
            "FINISHED" => ContainerStatus::Finished,
            "PUBLISHED" => ContainerStatus::Published,
            "ERROR" => ContainerStatus::Error,
            "EXPIRED" => ContainerStatus::Expired,
            _ => ContainerStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerStatus::InProgress => "IN_PROGRESS",
            ContainerStatus::Finished => "FINISHED",
            ContainerStatus::Published => "PUBLISHED",
            ContainerStatus::Error => "ERROR",
            ContainerStatus::Expired => "EXPIRED",
            ContainerStatus::Unknown => "UNKNOWN",
        }
    }

    /// Statuses from which a publish is attempted.
    pub fn is_publishable(&self) -> bool {
        matches!(self, ContainerStatus::Finished | ContainerStatus::Published)
    }

    /// Statuses that can never become publishable.
    pub fn is_failed(&self) -> bool {
        matches!(self, ContainerStatus::Error | ContainerStatus::Expired)
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side staging resource for a pending post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Container {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub media_type: MediaType,
    pub status: ContainerStatus,
}

/// Account identity snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(rename = "threads_profile_picture_url", default)]
    pub avatar_url: Option<String>,
    #[serde(rename = "threads_biography", default)]
    pub biography: Option<String>,
}

/// A published thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPost {
    pub id: String,
}

/// Read-back of a published thread with its engagement counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSnapshot {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "likes_count", default)]
    pub like_count: Option<u64>,
    #[serde(rename = "replies_count", default)]
    pub reply_count: Option<u64>,
    #[serde(rename = "retweets_count", default)]
    pub repost_count: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
}

/// Account-level insight counters. A metric the API omitted is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub replies: Option<u64>,
    pub reposts: Option<u64>,
    pub quotes: Option<u64>,
    pub followers_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    #[serde(default)]
    pub status: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DataResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InsightMetric {
    pub name: String,
    #[serde(default)]
    pub values: Vec<InsightValue>,
    #[serde(default)]
    pub total_value: Option<InsightValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InsightValue {
    #[serde(default)]
    pub value: u64,
}

impl InsightMetric {
    /// Aggregate metrics report `total_value`; time series report `values`.
    fn total(&self) -> u64 {
        match &self.total_value {
            Some(total) => total.value,
            None => self.values.iter().map(|v| v.value).sum(),
        }
    }
}

impl MetricsSnapshot {
    pub(crate) fn from_metrics(metrics: &[InsightMetric]) -> Self {
        let mut snapshot = MetricsSnapshot::default();
        for metric in metrics {
            let slot = match metric.name.as_str() {
                "views" => &mut snapshot.views,
                "likes" => &mut snapshot.likes,
                "replies" => &mut snapshot.replies,
                "reposts" => &mut snapshot.reposts,
                "quotes" => &mut snapshot.quotes,
                "followers_count" => &mut snapshot.followers_count,
                _ => continue,
            };
            *slot = Some(metric.total());
        }
        snapshot
    }
}
