use std::fmt;

/// Classified provider error — tells the caller *why* the generation call
/// failed so it can report something more useful than a bare status code.
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// 401/403 — bad API key or permissions.
    Auth,
    /// 429 — rate limited or quota exhausted.
    RateLimit,
    /// 404 or "model not found" — bad model name.
    NotFound,
    /// 408, request timeout, or provider took too long.
    Timeout,
    /// Connection refused, DNS failure, reset, etc.
    Network,
    /// 500/502/503/504 — provider-side outage.
    ServerError,
    /// Response arrived but could not be used (bad JSON, no candidates,
    /// empty text).
    Malformed,
    /// Anything else.
    Unknown,
}

impl ProviderError {
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => ProviderErrorKind::Auth,
            404 => ProviderErrorKind::NotFound,
            408 => ProviderErrorKind::Timeout,
            429 => ProviderErrorKind::RateLimit,
            500 | 502 | 503 | 504 => ProviderErrorKind::ServerError,
            _ => ProviderErrorKind::Unknown,
        };
        Self {
            kind,
            status: Some(status),
            message: truncate_body(body),
        }
    }

    pub fn network(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ProviderErrorKind::Timeout
        } else {
            ProviderErrorKind::Network
        };
        Self {
            kind,
            status: None,
            message: err.to_string(),
        }
    }

    pub fn malformed(message: String) -> Self {
        Self {
            kind: ProviderErrorKind::Malformed,
            status: None,
            message,
        }
    }

    /// User-facing summary suitable for an API error body.
    pub fn user_message(&self) -> String {
        match self.kind {
            ProviderErrorKind::Auth => {
                "Text generation authentication failed. Check the API key in config.toml."
                    .to_string()
            }
            ProviderErrorKind::RateLimit => {
                "Text generation is rate limited or out of quota. Try again later.".to_string()
            }
            ProviderErrorKind::NotFound => {
                "Configured model was not found by the provider.".to_string()
            }
            ProviderErrorKind::Timeout => "Text generation request timed out.".to_string(),
            ProviderErrorKind::Network => {
                "Cannot reach the text generation provider (network error).".to_string()
            }
            ProviderErrorKind::ServerError => {
                "Text generation provider is experiencing issues (server error).".to_string()
            }
            ProviderErrorKind::Malformed => {
                format!("Text generation returned an unusable response: {}", self.message)
            }
            ProviderErrorKind::Unknown => format!("Text generation error: {}", self.message),
        }
    }

    /// Whether the same request is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::RateLimit
                | ProviderErrorKind::Timeout
                | ProviderErrorKind::Network
                | ProviderErrorKind::ServerError
        )
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(status) = self.status {
            write!(f, "Provider error ({}, {:?}): {}", status, self.kind, self.message)
        } else {
            write!(f, "Provider error ({:?}): {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for ProviderError {}

fn truncate_body(body: &str) -> String {
    if body.chars().count() > 300 {
        let head: String = body.chars().take(300).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}
