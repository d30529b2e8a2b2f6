use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("{provider} returned {status} {status_text}")]
    Http {
        provider: &'static str,
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("Request to {provider} failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode {provider} response: {reason}")]
    Decode {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} response is missing {field}")]
    MissingField {
        provider: &'static str,
        field: &'static str,
    },

    #[error("{provider} has no endpoint configured")]
    Unconfigured { provider: &'static str },
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            UpstreamError::Http { provider, .. }
            | UpstreamError::Transport { provider, .. }
            | UpstreamError::Decode { provider, .. }
            | UpstreamError::MissingField { provider, .. }
            | UpstreamError::Unconfigured { provider } => provider,
        }
    }
}
