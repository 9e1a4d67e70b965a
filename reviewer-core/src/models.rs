//! Domain models for teams, users and pull requests

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A team of users that review each other's pull requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user that can author or review pull requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,
    /// Enrichment only, never persisted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teams: Vec<Team>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pull request lifecycle status
///
/// Stored uppercase (`OPEN`), serialized lowercase (`open`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrStatus {
    Open,
    Merged,
    Closed,
}

impl PrStatus {
    /// Storage representation
    pub fn as_db_str(&self) -> &'static str {
        match self {
            PrStatus::Open => "OPEN",
            PrStatus::Merged => "MERGED",
            PrStatus::Closed => "CLOSED",
        }
    }

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PrStatus::Open => "open",
            PrStatus::Merged => "merged",
            PrStatus::Closed => "closed",
        }
    }

    /// MERGED and CLOSED accept no further transitions
    pub fn is_final(&self) -> bool {
        matches!(self, PrStatus::Merged | PrStatus::Closed)
    }
}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OPEN" => Ok(PrStatus::Open),
            "MERGED" => Ok(PrStatus::Merged),
            "CLOSED" => Ok(PrStatus::Closed),
            other => Err(Error::Validation(format!("unknown status '{}'", other))),
        }
    }
}

/// A pull request with its reviewer set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub id: i64,
    pub title: String,
    pub author_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    pub status: PrStatus,
    pub reviewers: Vec<User>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl PullRequest {
    /// IDs of the currently assigned reviewers
    pub fn reviewer_ids(&self) -> Vec<i64> {
        self.reviewers.iter().map(|r| r.id).collect()
    }

    /// Check whether a user is one of the reviewers
    pub fn has_reviewer(&self, user_id: i64) -> bool {
        self.reviewers.iter().any(|r| r.id == user_id)
    }
}

/// Request to create a team
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    pub name: String,
}

/// Request to create a user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub team_id: Option<i64>,
}

/// Partial user update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.is_active.is_none()
    }
}

/// Request to open a pull request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePullRequestRequest {
    pub title: String,
    pub author_id: i64,
}

/// Request to swap one reviewer for a random teammate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReassignReviewerRequest {
    pub old_reviewer_id: i64,
}

/// Request to deactivate several users of one team
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeactivateRequest {
    pub user_ids: Vec<i64>,
}

/// Outcome of a bulk deactivation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeactivateResponse {
    pub deactivated_count: u64,
    #[serde(rename = "reassignedPRCount")]
    pub reassigned_pr_count: u64,
}

/// Aggregate assignment statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde(rename = "totalPRs")]
    pub total_prs: u64,
    #[serde(rename = "openPRs")]
    pub open_prs: u64,
    #[serde(rename = "mergedPRs")]
    pub merged_prs: u64,
    #[serde(rename = "closedPRs")]
    pub closed_prs: u64,
    pub user_stats: Vec<UserStatistic>,
    pub team_stats: Vec<TeamStatistic>,
}

/// Review assignments per user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatistic {
    pub user_id: i64,
    pub user_name: String,
    pub assignment_count: u64,
}

/// Authored pull requests per team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStatistic {
    pub team_id: i64,
    pub team_name: String,
    #[serde(rename = "prCount")]
    pub pr_count: u64,
}
