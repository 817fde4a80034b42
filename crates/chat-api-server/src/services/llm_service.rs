use crate::config::LlmConfig;
use crate::models::chat::{ChatMessage, Role};
use crate::services::company_data::CompanyData;
use crate::services::conversation::{ErrorKind, ModelProvider, ModelReply, ProviderError};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::{debug, warn};

const CONFIG_USER_MESSAGE: &str =
    "Our assistant is not configured yet. Please contact us directly or try again later.";
const AUTH_USER_MESSAGE: &str =
    "Our assistant is temporarily unavailable due to an authentication problem. Please try again later.";
const UPSTREAM_USER_MESSAGE: &str =
    "Our assistant is having trouble reaching the AI service. Please try again in a few minutes.";

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub max_tokens: usize,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

/// Mistral chat completions client
#[derive(Clone)]
pub struct LlmService {
    client: Client,
    config: LlmConfig,
}

impl LlmService {
    pub fn new(config: LlmConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// System prompt describing the company, sent ahead of the history
    pub fn build_system_prompt(company: &CompanyData, language: &str) -> String {
        let mut prompt = String::new();
        let _ = writeln!(
            prompt,
            "You are the customer assistant of {}, \"{}\".",
            company.name, company.tagline
        );
        let _ = writeln!(prompt, "{}", company.description);
        let _ = writeln!(
            prompt,
            "Reply in {} unless the customer writes in another language, then use theirs.",
            language
        );
        let _ = writeln!(
            prompt,
            "Keep answers short and factual. Only quote prices and subsidies listed below."
        );

        if !company.products.is_empty() {
            prompt.push_str("\nProducts:\n");
            for product in &company.products {
                let _ = writeln!(
                    prompt,
                    "- {} ({} kW): {} {} - {}",
                    product.name,
                    product.capacity_kw,
                    company.pricing.currency,
                    product.price,
                    product.description
                );
            }
        }

        if !company.services.is_empty() {
            let _ = writeln!(prompt, "\nServices: {}", company.services.join(", "));
        }

        let pricing = &company.pricing;
        let _ = writeln!(
            prompt,
            "\nPricing: {} {} per kW installed, central subsidy {} per kW up to {}.",
            pricing.currency, pricing.cost_per_kw, pricing.central_subsidy_per_kw, pricing.central_subsidy_cap
        );
        for (state, subsidy) in &pricing.state_subsidy_per_kw {
            let _ = writeln!(prompt, "- {} adds {} per kW", state, subsidy);
        }

        let contact = &company.contact;
        let _ = write!(
            prompt,
            "\nContact: phone {}, email {}, website {}",
            contact.phone, contact.email, contact.website
        );

        prompt
    }

    /// Drop oldest turns, a user/assistant pair at a time. 0 keeps everything.
    pub fn prune_history(mut history: Vec<ChatMessage>, max_messages: usize) -> Vec<ChatMessage> {
        if max_messages == 0 {
            return history;
        }
        while history.len() > max_messages {
            let n = history.len().min(2);
            history.drain(0..n);
        }
        history
    }

    /// Generate completion without streaming (wait for full response)
    pub async fn generate_chat(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let api_key = self.api_key().ok_or_else(|| {
            ProviderError::new(ErrorKind::EnvVarMissing, "MISTRAL_API_KEY is not set")
                .with_user_message(CONFIG_USER_MESSAGE)
        })?;

        debug!("Starting chat generation with {} messages", messages.len());

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let detail = if e.is_timeout() { "timed out" } else { "failed" };
                ProviderError::new(ErrorKind::ApiError, format!("Mistral request {}: {}", detail, e))
                    .with_user_message(UPSTREAM_USER_MESSAGE)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Mistral API returned {}: {}", status, body);
            return Err(Self::classify_status(status, &body));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            ProviderError::new(ErrorKind::ApiError, format!("Failed to parse Mistral response: {}", e))
                .with_user_message(UPSTREAM_USER_MESSAGE)
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                ProviderError::new(ErrorKind::ApiError, "No choices returned from Mistral")
                    .with_user_message(UPSTREAM_USER_MESSAGE)
            })
    }

    fn classify_status(status: StatusCode, body: &str) -> ProviderError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::new(
                ErrorKind::TokenExpired,
                format!("Mistral rejected the API key: {} - {}", status, body),
            )
            .with_user_message(AUTH_USER_MESSAGE),
            _ => ProviderError::new(
                ErrorKind::ApiError,
                format!("Mistral API error: {} - {}", status, body),
            )
            .with_user_message(UPSTREAM_USER_MESSAGE),
        }
    }
}

#[async_trait::async_trait]
impl ModelProvider for LlmService {
    async fn invoke(
        &self,
        message: &str,
        history: &[ChatMessage],
        company: &CompanyData,
        language: &str,
    ) -> Result<ModelReply, ProviderError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(Self::build_system_prompt(company, language)));
        messages.extend(history.iter().filter(|m| m.role != Role::System).cloned());
        messages.push(ChatMessage::user(message));

        let reply_text = self.generate_chat(&messages).await?;

        let mut updated = history.to_vec();
        updated.push(ChatMessage::user(message));
        updated.push(ChatMessage::assistant(reply_text.clone()));

        Ok(ModelReply {
            reply_text,
            updated_history: Self::prune_history(updated, self.config.max_history_messages),
        })
    }
}
