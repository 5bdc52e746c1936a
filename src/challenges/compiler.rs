use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::challenges::{ChallengeError, ChallengeFields};
use crate::providers::ProviderError;
use crate::traits::{GenerationOptions, TextGenerator};

/// Schema summary embedded in every compilation prompt. Kept in lockstep with
/// the migrations in store/mod.rs.
const SCHEMA_DESCRIPTION: &str = "\
books(id INTEGER, title TEXT, author_id INTEGER, genre_id INTEGER, pages INTEGER, rating REAL, start_date TEXT, end_date TEXT)
authors(id INTEGER, name TEXT)
genres(id INTEGER, name TEXT)

books.author_id joins authors.id and books.genre_id joins genres.id.
Dates are ISO-8601 text (YYYY-MM-DD). end_date is NULL until a book is finished.";

static SQL_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsql\b").expect("sql token regex should compile"));

fn build_prompt(fields: &ChallengeFields) -> String {
    let mut prompt = String::new();
    prompt.push_str("You translate a reader's annual challenge into a SQLite aggregate query.\n\n");
    prompt.push_str("Database schema:\n");
    prompt.push_str(SCHEMA_DESCRIPTION);
    prompt.push_str("\n\nChallenge:\n");
    prompt.push_str(&format!("- Name: {}\n", fields.name));
    if let Some(description) = &fields.description {
        prompt.push_str(&format!("- Description: {}\n", description));
    }
    prompt.push_str(&format!("- Goal: {} {}\n", fields.goal_value, fields.unit));
    prompt.push_str(&format!("- Year: {}\n", fields.year));
    if let Some(rule) = &fields.rule_description {
        prompt.push_str(&format!("- Counting rule: {}\n", rule));
    }
    prompt.push_str("\nRequirements:\n");
    prompt.push_str(
        "- Write exactly one SQLite SELECT statement that computes the progress made so far.\n",
    );
    prompt.push_str("- Expose exactly one output column, aliased AS count.\n");
    prompt.push_str(&format!(
        "- Count finished books only: filter with CAST(substr(end_date, 1, 4) AS INTEGER) = {} AND end_date IS NOT NULL.\n",
        fields.year
    ));
    prompt.push_str("- Join the authors or genres tables only when the counting rule needs them.\n");
    prompt.push_str(
        "- Do not use quote characters or string literals anywhere in the statement.\n",
    );
    prompt.push_str("- Reply with the bare statement only: no markdown, no prose, no semicolon.\n");
    prompt
}

/// Strip the markup models wrap around SQL even when told not to: code
/// fences, a leading language tag, quotes, ragged whitespace, and a trailing
/// semicolon.
fn clean_response(raw: &str) -> String {
    let without_fences = raw.replace('`', " ");
    let without_token = SQL_TOKEN_RE.replace_all(&without_fences, " ");
    let without_quotes: String = without_token
        .chars()
        .filter(|c| *c != '\'' && *c != '"')
        .collect();
    let collapsed = without_quotes
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed.trim_end_matches(';').trim().to_string()
}

/// Structural allow-list applied before a compiled query is persisted. The
/// query still runs against real data later, so this only has to reject the
/// obviously wrong shapes cheaply.
fn validate_query(query: &str) -> Result<(), String> {
    let lowered = query.to_lowercase();
    if lowered.split_whitespace().next() != Some("select") {
        return Err("not a SELECT statement".to_string());
    }
    if query.contains(';') {
        return Err("multiple statements are not allowed".to_string());
    }
    if !lowered.contains("count") {
        return Err("missing a count output column".to_string());
    }
    Ok(())
}

/// Compile a validated draft into an aggregate query. Any failure here is
/// fatal to the create or update that requested it; nothing is persisted on
/// the error path.
pub async fn compile(
    generator: &dyn TextGenerator,
    fields: &ChallengeFields,
) -> Result<String, ChallengeError> {
    let prompt = build_prompt(fields);
    let options = GenerationOptions::default();

    let raw = match generator.complete(&prompt, &options).await {
        Ok(text) => text,
        Err(e) => {
            let provider_error = e.downcast_ref::<ProviderError>();
            warn!(
                challenge = %fields.name,
                retryable = provider_error.is_some_and(|p| p.is_retryable()),
                "Query compilation call failed: {}", e
            );
            let message = match provider_error {
                Some(provider_error) => provider_error.user_message(),
                None => e.to_string(),
            };
            return Err(ChallengeError::Compilation(message));
        }
    };

    let cleaned = clean_response(&raw);
    if cleaned.is_empty() {
        return Err(ChallengeError::Compilation(
            "model returned an empty query".to_string(),
        ));
    }
    if let Err(reason) = validate_query(&cleaned) {
        warn!(challenge = %fields.name, query = %cleaned, "Rejected compiled query: {}", reason);
        return Err(ChallengeError::Compilation(format!(
            "rejected compiled query: {}",
            reason
        )));
    }

    debug!(challenge = %fields.name, query = %cleaned, "Compiled challenge rule");
    Ok(cleaned)
}
