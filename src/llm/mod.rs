//! Text generation collaborators.

mod openai;

use async_trait::async_trait;

pub use openai::OpenAiCompatClient;

/// Something that turns a prompt plus accumulated context into text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// `prompt` carries the instructions, `context` the conversation so far.
    async fn generate(&self, prompt: &str, context: &str) -> anyhow::Result<String>;
}
