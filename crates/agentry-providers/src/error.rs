//! Errors returned by provider adapters.

use thiserror::Error;

/// Anything that can go wrong between building a request and getting a usable
/// `LlmResponse` back.
///
/// The orchestrator never propagates these: it turns them into a single
/// assistant error message for the turn.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No API key (or unknown provider name) for the selected backend.
    #[error("provider '{0}' is not configured: set its API key in config.json or the environment")]
    NotConfigured(String),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Transport failure: connect, timeout, TLS, or body read.
    #[error("request to {provider} failed: {source}")]
    Http {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    /// The response body did not match the expected wire format.
    #[error("could not parse {provider} response: {reason}")]
    Malformed { provider: String, reason: String },

    /// The response parsed but contained neither text nor tool calls.
    #[error("{0} returned an empty response")]
    EmptyResponse(String),
}
