//! Remote generative-language providers

pub mod gemini;

use async_trait::async_trait;

// Re-export for convenience
pub use gemini::{
  extract_result, GeminiClient, GenerateContentRequest, InvocationResult,
};

/// Upstream operations the pipeline depends on
#[async_trait]
pub trait GenerativeApi: Send + Sync
{   /// All model names the listing endpoint reports
    async fn list_models(&self)
      -> Result<Vec<String>, crate::error::Error>;

    /// One generation call against one named model
    async fn generate(
      &self
    , model: &str
    , request: &GenerateContentRequest
    ) -> Result<InvocationResult, crate::error::Error>;
}
