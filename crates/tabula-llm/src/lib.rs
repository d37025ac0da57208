pub mod providers;
pub mod retry;

use tabula_core::config::ModelConfig;
use tabula_core::traits::LlmClient;

pub use providers::gemini::GeminiClient;
pub use providers::openai::OpenAiClient;
pub use retry::RetryingClient;

/// Create an LLM client based on the provider name.
pub fn create_client(config: &ModelConfig) -> Box<dyn LlmClient> {
    let inner: Box<dyn LlmClient> = match config.provider.as_str() {
        "gemini" | "google" => Box::new(GeminiClient::new()),
        // Everything else uses the OpenAI-compatible client
        _ => Box::new(OpenAiClient::new()),
    };

    match &config.retry {
        Some(retry) => Box::new(RetryingClient::new(inner, retry.clone())),
        None => inner,
    }
}
