use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::store::{NewChallenge, SqliteStore};
use crate::traits::TextGenerator;
use crate::types::{AnnotatedChallenge, ChallengeDefinition, ChallengeDraft};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ChallengeError {
    /// A required field was missing or blank in the submitted draft.
    MissingField(&'static str),
    /// The model failed to produce a usable aggregate query.
    Compilation(String),
    /// No challenge exists with the given id.
    NotFound(i64),
    /// The store failed underneath the operation.
    Storage(anyhow::Error),
}

impl fmt::Display for ChallengeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChallengeError::MissingField(field) => {
                write!(f, "missing required field: {}", field)
            }
            ChallengeError::Compilation(msg) => {
                write!(f, "failed to compile challenge rule: {}", msg)
            }
            ChallengeError::NotFound(id) => write!(f, "challenge {} not found", id),
            ChallengeError::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

impl std::error::Error for ChallengeError {}

impl From<anyhow::Error> for ChallengeError {
    fn from(e: anyhow::Error) -> Self {
        ChallengeError::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Draft validation
// ---------------------------------------------------------------------------

/// Draft fields that survived validation, ready for the compiler.
#[derive(Debug, Clone)]
pub struct ChallengeFields {
    pub name: String,
    pub description: Option<String>,
    pub goal_value: i64,
    pub unit: String,
    pub year: i32,
    pub rule_description: Option<String>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Validate a submitted draft and fill in defaults. Runs before any model
/// call, so a bad draft never costs a provider round trip.
pub fn resolve_draft(
    draft: ChallengeDraft,
    current_year: i32,
) -> Result<ChallengeFields, ChallengeError> {
    let name = blank_to_none(draft.name).ok_or(ChallengeError::MissingField("name"))?;
    let unit = blank_to_none(draft.unit).ok_or(ChallengeError::MissingField("unit"))?;

    Ok(ChallengeFields {
        name,
        description: blank_to_none(draft.description),
        goal_value: draft.goal_value.unwrap_or(0).max(0),
        unit,
        year: draft.year.unwrap_or(current_year),
        rule_description: blank_to_none(draft.rule_description),
    })
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Orchestrates compilation, persistence, and evaluation of reading
/// challenges. Compilation happens before any write, so a challenge row
/// either carries a compiled query or does not exist.
#[derive(Clone)]
pub struct ChallengeService {
    store: Arc<SqliteStore>,
    generator: Arc<dyn TextGenerator>,
}

impl ChallengeService {
    pub fn new(store: Arc<SqliteStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { store, generator }
    }

    /// Every stored challenge, each annotated with progress and status as of
    /// `current_year`.
    pub async fn list_with_progress(
        &self,
        current_year: i32,
    ) -> Result<Vec<AnnotatedChallenge>, ChallengeError> {
        let definitions = self.store.list_challenges().await?;
        let previous_year = current_year - 1;

        let mut annotated = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let progress =
                evaluator::evaluate(&self.store, &definition, current_year, previous_year).await;
            annotated.push(AnnotatedChallenge {
                definition,
                current_progress: progress.current_progress,
                status: progress.status,
            });
        }
        Ok(annotated)
    }

    pub async fn create(
        &self,
        draft: ChallengeDraft,
        current_year: i32,
    ) -> Result<ChallengeDefinition, ChallengeError> {
        let fields = resolve_draft(draft, current_year)?;
        let query_sql = compiler::compile(self.generator.as_ref(), &fields).await?;

        let created = self
            .store
            .insert_challenge(&NewChallenge {
                name: fields.name,
                description: fields.description,
                goal_value: fields.goal_value,
                unit: fields.unit,
                year: fields.year,
                rule_description: fields.rule_description,
                query_sql,
            })
            .await?;
        info!(challenge_id = created.id, year = created.year, "Created challenge");
        Ok(created)
    }

    pub async fn update(
        &self,
        id: i64,
        draft: ChallengeDraft,
        current_year: i32,
    ) -> Result<ChallengeDefinition, ChallengeError> {
        if self.store.get_challenge(id).await?.is_none() {
            return Err(ChallengeError::NotFound(id));
        }

        let fields = resolve_draft(draft, current_year)?;
        let query_sql = compiler::compile(self.generator.as_ref(), &fields).await?;

        let updated = self
            .store
            .update_challenge(
                id,
                &NewChallenge {
                    name: fields.name,
                    description: fields.description,
                    goal_value: fields.goal_value,
                    unit: fields.unit,
                    year: fields.year,
                    rule_description: fields.rule_description,
                    query_sql,
                },
            )
            .await?
            .ok_or(ChallengeError::NotFound(id))?;
        info!(challenge_id = id, "Updated challenge");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, ChallengeError> {
        let deleted = self.store.delete_challenge(id).await?;
        if deleted {
            info!(challenge_id = id, "Deleted challenge");
        }
        Ok(deleted)
    }

    /// The headline challenge for a year, annotated with progress, or None
    /// when the year has no challenges at all.
    pub async fn main_challenge(
        &self,
        year: i32,
        current_year: i32,
    ) -> Result<Option<AnnotatedChallenge>, ChallengeError> {
        let candidates = self.store.list_challenges_for_year(year).await?;
        let Some(chosen) =
            selection::select_main_challenge(self.generator.as_ref(), &candidates).await
        else {
            return Ok(None);
        };

        let previous_year = current_year - 1;
        let progress =
            evaluator::evaluate(&self.store, chosen, current_year, previous_year).await;
        Ok(Some(AnnotatedChallenge {
            definition: chosen.clone(),
            current_progress: progress.current_progress,
            status: progress.status,
        }))
    }
}

pub(crate) mod compiler;
pub(crate) mod evaluator;
pub(crate) mod selection;

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: Option<&str>, unit: Option<&str>) -> ChallengeDraft {
        ChallengeDraft {
            name: name.map(str::to_string),
            unit: unit.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn resolve_draft_requires_name() {
        let err = resolve_draft(draft(None, Some("books")), 2026).unwrap_err();
        assert!(matches!(err, ChallengeError::MissingField("name")));

        let err = resolve_draft(draft(Some("   "), Some("books")), 2026).unwrap_err();
        assert!(matches!(err, ChallengeError::MissingField("name")));
    }

    #[test]
    fn resolve_draft_requires_unit() {
        let err = resolve_draft(draft(Some("Read 30 books"), None), 2026).unwrap_err();
        assert!(matches!(err, ChallengeError::MissingField("unit")));
    }

    #[test]
    fn resolve_draft_fills_defaults() {
        let fields = resolve_draft(draft(Some("Read 30 books"), Some("books")), 2026).unwrap();
        assert_eq!(fields.goal_value, 0);
        assert_eq!(fields.year, 2026);
        assert!(fields.description.is_none());
        assert!(fields.rule_description.is_none());
    }

    #[test]
    fn resolve_draft_clamps_negative_goal() {
        let mut d = draft(Some("Read"), Some("books"));
        d.goal_value = Some(-5);
        let fields = resolve_draft(d, 2026).unwrap();
        assert_eq!(fields.goal_value, 0);
    }

    #[test]
    fn resolve_draft_trims_and_drops_blank_optionals() {
        let mut d = draft(Some("  Read 30 books "), Some(" books "));
        d.description = Some("  ".to_string());
        d.rule_description = Some(" any genre counts ".to_string());
        d.year = Some(2025);

        let fields = resolve_draft(d, 2026).unwrap();
        assert_eq!(fields.name, "Read 30 books");
        assert_eq!(fields.unit, "books");
        assert!(fields.description.is_none());
        assert_eq!(fields.rule_description.as_deref(), Some("any genre counts"));
        assert_eq!(fields.year, 2025);
    }
}
