use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Challenges
// ---------------------------------------------------------------------------

/// A user's stated annual reading goal, as stored.
///
/// `query_sql` holds the compiled aggregate query and stays null until the
/// first successful compilation; it is regenerated whenever the descriptive
/// fields change.
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeDefinition {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub goal_value: i64,
    pub unit: String,
    pub year: i32,
    pub rule_description: Option<String>,
    pub query_sql: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Incoming challenge fields on create/update. The id and the compiled query
/// are never accepted from the client; name/unit are checked by the service
/// so a missing field yields a proper validation error instead of a
/// deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChallengeDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub goal_value: Option<i64>,
    pub unit: Option<String>,
    pub year: Option<i32>,
    pub rule_description: Option<String>,
}

/// Lifecycle state derived at read time, serialized exactly as the UI shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Expired,
    Error,
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChallengeStatus::Pending => "Pending",
            ChallengeStatus::InProgress => "In Progress",
            ChallengeStatus::Completed => "Completed",
            ChallengeStatus::Expired => "Expired",
            ChallengeStatus::Error => "Error",
        };
        write!(f, "{}", label)
    }
}

/// Read-time projection of one challenge's progress. Recomputed on every
/// evaluation, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChallengeProgress {
    pub current_progress: i64,
    pub status: ChallengeStatus,
}

/// A stored definition together with its live progress, as served to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedChallenge {
    #[serde(flatten)]
    pub definition: ChallengeDefinition,
    pub current_progress: i64,
    pub status: ChallengeStatus,
}

// ---------------------------------------------------------------------------
// Book corpus
// ---------------------------------------------------------------------------

/// A tracked book with its author/genre names resolved.
#[derive(Debug, Clone, Serialize)]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub pages: Option<i64>,
    pub rating: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Incoming book fields. Authors and genres are referenced by name and
/// resolved get-or-create at write time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub pages: Option<i64>,
    pub rating: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Author or genre list entry with how many books reference it.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    pub book_count: i64,
}

/// Books finished and pages read in one calendar year.
#[derive(Debug, Clone, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub books: i64,
    pub pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_with_ui_labels() {
        assert_eq!(
            serde_json::to_string(&ChallengeStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
        assert_eq!(
            serde_json::to_string(&ChallengeStatus::Pending).unwrap(),
            "\"Pending\""
        );
    }

    #[test]
    fn status_display_matches_serialization() {
        for status in [
            ChallengeStatus::Pending,
            ChallengeStatus::InProgress,
            ChallengeStatus::Completed,
            ChallengeStatus::Expired,
            ChallengeStatus::Error,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }
}
