//! Inference gateway: the seam between the pipeline and the text-inference service.

pub mod error;
pub mod openrouter;
pub mod types;

pub use error::{ErrorContext, ProviderError};
pub use openrouter::OpenRouterAdapter;
pub use types::*;

/// An opaque text-completion capability.
///
/// Implementations return whatever text the model produced; interpreting it is
/// somebody else's job. Tests substitute scripted fakes here.
#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError>;
}
