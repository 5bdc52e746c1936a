mod error;
mod gemini;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use tracing::warn;

pub use error::{ProviderError, ProviderErrorKind};
pub use gemini::GeminiGenerator;

use crate::config::ProviderConfig;
use crate::traits::TextGenerator;

/// Build an HTTP client with a panic-safe fallback when system proxy discovery
/// is unavailable in the runtime environment.
pub(crate) fn build_http_client(timeout: Duration) -> anyhow::Result<Client> {
    // Test environments (and some constrained runtimes) can panic inside
    // macOS system proxy discovery. Skip that code path entirely for tests.
    if cfg!(test)
        || matches!(
            std::env::var("SHELFMARK_DISABLE_SYSTEM_PROXY_DISCOVERY").as_deref(),
            Ok("1") | Ok("true") | Ok("TRUE")
        )
    {
        return Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .context("Failed to build HTTP client");
    }

    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        Client::builder().timeout(timeout).build()
    })) {
        Ok(Ok(client)) => return Ok(client),
        Ok(Err(e)) => {
            warn!(
                error = %e,
                "HTTP client build with system proxy support failed; retrying with proxy discovery disabled"
            );
        }
        Err(_) => {
            warn!(
                "HTTP client build panicked during system proxy discovery; retrying with proxy discovery disabled"
            );
        }
    }

    Client::builder()
        .timeout(timeout)
        .no_proxy()
        .build()
        .context("Failed to build HTTP client")
}

/// Construct the configured text generator.
pub fn build_generator(config: &ProviderConfig) -> anyhow::Result<Arc<dyn TextGenerator>> {
    let generator = GeminiGenerator::new(
        &config.api_key,
        &config.model,
        Some(config.base_url.as_str()),
        Duration::from_secs(config.timeout_secs),
    )?;
    Ok(Arc::new(generator))
}
