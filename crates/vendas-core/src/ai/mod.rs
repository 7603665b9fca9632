pub mod gemini;

pub use gemini::GeminiClient;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

/// Raw provider event-stream chunks, forwarded without buffering.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, GatewayError>> + Send>>;

/// Failure kinds of one outbound generation call.
///
/// Rate limiting is deliberately its own variant so callers can tell the
/// user to retry shortly instead of reporting a generic failure. No variant
/// triggers an automatic retry; that decision stays with the caller.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("model provider rate limit exceeded")]
    RateLimited,
    #[error("model provider returned {status}: {details}")]
    Api { status: u16, details: String },
    #[error("request to model provider timed out")]
    Timeout,
    #[error("could not reach model provider: {0}")]
    Network(#[source] reqwest::Error),
    #[error("model provider returned no content")]
    Empty,
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Network(err)
        }
    }
}

/// Something capable of answering a prompt with a generative model.
///
/// `Send + Sync + Clone` lets one instance be shared across request
/// handlers; tests substitute stubs.
pub trait LlmClient: Send + Sync + Clone + 'static {
    /// Blocking mode: wait for the whole generated text.
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, GatewayError>> + Send;

    /// Streaming mode: the provider's event-stream bytes, verbatim.
    fn generate_stream(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<ByteStream, GatewayError>> + Send;
}
