use async_trait::async_trait;

/// Sampling controls for one completion call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_output_tokens: 256,
        }
    }
}

/// Sends one prompt to a text model and returns the completion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str, options: &GenerationOptions) -> anyhow::Result<String>;
}
