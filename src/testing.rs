//! Test infrastructure: a scripted stand-in for the text-generation seam.

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::traits::{GenerationOptions, TextGenerator};

/// A recorded call to `MockGenerator::complete()`.
#[derive(Debug, Clone)]
pub struct MockCompletionCall {
    pub prompt: String,
    pub options: GenerationOptions,
}

/// Mock text generator that returns scripted responses.
pub struct MockGenerator {
    responses: Mutex<Vec<anyhow::Result<String>>>,
    pub call_log: Mutex<Vec<MockCompletionCall>>,
}

impl MockGenerator {
    /// Create a generator that always returns "Mock response".
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            call_log: Mutex::new(Vec::new()),
        }
    }

    /// Create a generator with a FIFO queue of scripted responses.
    pub fn with_responses(responses: Vec<anyhow::Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_log: Mutex::new(Vec::new()),
        }
    }

    /// Helper: a generator that returns `value` for its next call.
    pub fn text(value: &str) -> Self {
        Self::with_responses(vec![Ok(value.to_string())])
    }

    /// Helper: a generator whose next call fails with `message`.
    pub fn failure(message: &str) -> Self {
        Self::with_responses(vec![Err(anyhow!(message.to_string()))])
    }

    /// How many times `complete()` was called.
    pub async fn call_count(&self) -> usize {
        self.call_log.lock().await.len()
    }

    /// Snapshot of the recorded calls.
    pub async fn calls(&self) -> Vec<MockCompletionCall> {
        self.call_log.lock().await.clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> anyhow::Result<String> {
        // Record the call
        self.call_log.lock().await.push(MockCompletionCall {
            prompt: prompt.to_string(),
            options: *options,
        });

        // Return next scripted response, or a default
        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            Ok("Mock response".to_string())
        } else {
            responses.remove(0)
        }
    }
}
