//! Upstream completion providers.

use async_trait::async_trait;
use db::models::catalog::ModelConfig;
use rand::Rng;

use crate::dtos::completion::{ChatMessage, CompletionRequest};

const CHARS_PER_TOKEN: usize = 4;
const MESSAGE_OVERHEAD_TOKENS: u64 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub finish_reason: &'static str,
}

/// Errors an upstream provider can answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    ServerError,
    Overloaded,
    Unavailable,
}

impl ProviderFailure {
    pub const ALL: [ProviderFailure; 3] = [
        ProviderFailure::ServerError,
        ProviderFailure::Overloaded,
        ProviderFailure::Unavailable,
    ];

    pub fn kind(&self) -> &'static str {
        match self {
            ProviderFailure::ServerError => "server_error",
            ProviderFailure::Overloaded => "overloaded_error",
            ProviderFailure::Unavailable => "unavailable_error",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ProviderFailure::ServerError => 500,
            ProviderFailure::Overloaded => 529,
            ProviderFailure::Unavailable => 503,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ProviderFailure::ServerError => "The model provider failed to process the request",
            ProviderFailure::Overloaded => "The model provider is overloaded, try again later",
            ProviderFailure::Unavailable => "The model provider is temporarily unavailable",
        }
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        model: &ModelConfig,
        request: &CompletionRequest,
    ) -> Result<Completion, ProviderFailure>;
}

/// Answers locally with a canned reply and estimated token counts.
pub struct SimulatedProvider {
    failure_rate: f64,
}

impl SimulatedProvider {
    /// `failure_rate` is the probability of a failed call, clamped to `[0, 1]`.
    pub fn new(failure_rate: f64) -> Self {
        let failure_rate = if failure_rate.is_nan() {
            0.0
        } else {
            failure_rate.clamp(0.0, 1.0)
        };
        SimulatedProvider { failure_rate }
    }

    fn roll_failure(&self) -> Option<ProviderFailure> {
        let mut rng = rand::thread_rng();
        if self.failure_rate > 0.0 && rng.gen_bool(self.failure_rate) {
            Some(ProviderFailure::ALL[rng.gen_range(0..ProviderFailure::ALL.len())])
        } else {
            None
        }
    }
}

#[async_trait]
impl CompletionProvider for SimulatedProvider {
    async fn complete(
        &self,
        model: &ModelConfig,
        request: &CompletionRequest,
    ) -> Result<Completion, ProviderFailure> {
        if let Some(failure) = self.roll_failure() {
            log::warn!("Simulated {} from {}", failure.kind(), model.provider);
            return Err(failure);
        }

        let prompt = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let reply = format!(
            "This is a simulated response from {} to: {}",
            model.id,
            prompt.chars().take(80).collect::<String>()
        );

        let (content, tokens_output, finish_reason) = match request.max_tokens {
            Some(max) if estimate_tokens(&reply) > u64::from(max) => {
                let cut: String = reply.chars().take(max as usize * CHARS_PER_TOKEN).collect();
                (cut, u64::from(max), "length")
            }
            _ => {
                let tokens = estimate_tokens(&reply);
                (reply, tokens, "stop")
            }
        };

        Ok(Completion {
            content,
            tokens_input: prompt_tokens(&request.messages),
            tokens_output,
            finish_reason,
        })
    }
}

/// One token per four characters, at least one.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() / CHARS_PER_TOKEN).max(1) as u64
}

pub fn prompt_tokens(messages: &[ChatMessage]) -> u64 {
    messages
        .iter()
        .map(|m| estimate_tokens(&m.content) + MESSAGE_OVERHEAD_TOKENS)
        .sum()
}
