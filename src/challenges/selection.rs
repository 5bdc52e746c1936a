use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::traits::{GenerationOptions, TextGenerator};
use crate::types::ChallengeDefinition;

static ORDINAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").expect("ordinal regex should compile"));

fn build_prompt(candidates: &[ChallengeDefinition]) -> String {
    let mut prompt = String::from(
        "A reader tracks several reading challenges for the same year. Pick the one that is \
         the general annual reading goal, as opposed to a genre-, author-, or theme-scoped \
         side challenge.\n\nChallenges:\n",
    );
    for (index, candidate) in candidates.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {} (goal: {} {})\n",
            index + 1,
            candidate.name,
            candidate.goal_value,
            candidate.unit
        ));
        if let Some(description) = &candidate.description {
            prompt.push_str(&format!("   {}\n", description));
        }
    }
    prompt.push_str("\nReply with the number of that challenge and nothing else.\n");
    prompt
}

/// First integer anywhere in the reply, read as a 1-based ordinal.
fn parse_ordinal(reply: &str) -> Option<usize> {
    ORDINAL_RE
        .find(reply)
        .and_then(|m| m.as_str().parse::<usize>().ok())
}

/// Pick the headline challenge among a year's candidates.
///
/// A single candidate is returned without a model call. Every failure mode
/// falls back to the first candidate; selection is never fatal to the caller.
pub(crate) async fn select_main_challenge<'a>(
    generator: &dyn TextGenerator,
    candidates: &'a [ChallengeDefinition],
) -> Option<&'a ChallengeDefinition> {
    if candidates.len() <= 1 {
        return candidates.first();
    }

    let prompt = build_prompt(candidates);
    let options = GenerationOptions {
        temperature: 0.0,
        max_output_tokens: 16,
    };

    let reply = match generator.complete(&prompt, &options).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Main challenge selection failed, using first candidate: {}", e);
            return candidates.first();
        }
    };

    match parse_ordinal(&reply) {
        Some(ordinal) if ordinal >= 1 && ordinal <= candidates.len() => {
            debug!(ordinal, "Model picked the main challenge");
            candidates.get(ordinal - 1)
        }
        _ => {
            warn!(
                reply = %reply.trim(),
                "Unusable main challenge reply, using first candidate"
            );
            candidates.first()
        }
    }
}
