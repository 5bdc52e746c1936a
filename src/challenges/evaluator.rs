use tracing::warn;

use crate::store::SqliteStore;
use crate::types::{ChallengeDefinition, ChallengeProgress, ChallengeStatus};

/// Compute a challenge's progress and status as of `current_year`.
///
/// Never fails: a broken or missing query degrades into a zero-progress
/// status, so one bad challenge cannot take down a whole listing.
pub(crate) async fn evaluate(
    store: &SqliteStore,
    definition: &ChallengeDefinition,
    current_year: i32,
    previous_year: i32,
) -> ChallengeProgress {
    let query_sql = definition
        .query_sql
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    // Rows without a compiled query predate the compiler (or compilation was
    // skipped by a manual insert). They have nothing to execute.
    let Some(query_sql) = query_sql else {
        let status = if definition.year == current_year {
            ChallengeStatus::Pending
        } else {
            ChallengeStatus::Expired
        };
        return ChallengeProgress {
            current_progress: 0,
            status,
        };
    };

    let progress = match store.execute_count_query(query_sql).await {
        Ok(count) => count.max(0),
        Err(e) => {
            warn!(
                challenge_id = definition.id,
                year = definition.year,
                "Challenge query failed: {}",
                e
            );
            // Last year's challenges are over either way; only live ones
            // surface the failure.
            let status = if definition.year == previous_year {
                ChallengeStatus::Expired
            } else {
                ChallengeStatus::Error
            };
            return ChallengeProgress {
                current_progress: 0,
                status,
            };
        }
    };

    let status = if progress >= definition.goal_value {
        ChallengeStatus::Completed
    } else if definition.year == previous_year {
        ChallengeStatus::Expired
    } else {
        ChallengeStatus::InProgress
    };

    ChallengeProgress {
        current_progress: progress,
        status,
    }
}
