//! External scoring service.
//!
//! [`ScoringService`] is the seam the controller talks to. [`OpenAiClient`]
//! calls an OpenAI-compatible `/chat/completions` endpoint with a blocking
//! HTTP client; [`RetryingService`] optionally retries transport failures.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ServiceError;

/// Something that turns a prompt into completion text.
pub trait ScoringService {
    fn complete(&self, prompt: &str) -> Result<String, ServiceError>;
}

impl<S: ScoringService + ?Sized> ScoringService for &S {
    fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        (**self).complete(prompt)
    }
}

impl<S: ScoringService + ?Sized> ScoringService for Box<S> {
    fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        (**self).complete(prompt)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    fn into_content(self) -> Result<String, ServiceError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ServiceError::EmptyCompletion)
    }
}

/// Blocking client for an OpenAI-compatible chat-completion API.
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(
        api_base: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ScoringService for OpenAiClient {
    fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
        };

        debug!(endpoint = %self.endpoint, prompt_len = prompt.len(), "Sending scoring request");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<ChatResponse>()?.into_content()
    }
}

/// Backoff schedule for transport retries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportRetryPolicy {
    /// Extra attempts after the first one. Zero disables retrying.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for TransportRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl TransportRetryPolicy {
    /// Delay before retry number `retry` (1-based): base, 2×base, 4×base, ... capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Wraps a service and retries retryable failures with exponential backoff.
///
/// Only transport-level problems are retried here. A delivered but malformed
/// response is the controller's business.
#[derive(Debug)]
pub struct RetryingService<S> {
    inner: S,
    policy: TransportRetryPolicy,
}

impl<S> RetryingService<S> {
    pub fn new(inner: S, policy: TransportRetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<S: ScoringService> ScoringService for RetryingService<S> {
    fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        let mut retry = 0;
        loop {
            match self.inner.complete(prompt) {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && retry < self.policy.max_retries => {
                    retry += 1;
                    let delay = self.policy.delay_for(retry);
                    warn!(
                        error = %e,
                        retry,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Scoring service call failed, backing off"
                    );
                    thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct Scripted {
        replies: RefCell<VecDeque<Result<String, ServiceError>>>,
        calls: RefCell<usize>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, ServiceError>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                calls: RefCell::new(0),
            }
        }
    }

    impl ScoringService for Scripted {
        fn complete(&self, _prompt: &str) -> Result<String, ServiceError> {
            *self.calls.borrow_mut() += 1;
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(ServiceError::EmptyCompletion))
        }
    }

    fn unavailable() -> ServiceError {
        ServiceError::Status { status: 503, body: "overloaded".into() }
    }

    fn instant_policy(max_retries: u32) -> TransportRetryPolicy {
        TransportRetryPolicy {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn extracts_first_choice_content() {
        let json = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"cat: 80%"}}]}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_content().unwrap(), "cat: 80%");
    }

    #[test]
    fn missing_choices_is_an_empty_completion() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(response.into_content(), Err(ServiceError::EmptyCompletion)));

        let response: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(matches!(response.into_content(), Err(ServiceError::EmptyCompletion)));
    }

    #[test]
    fn request_body_matches_chat_completion_shape() {
        let body = ChatRequest {
            model: "gpt-3.5-turbo",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }

    #[test]
    fn endpoint_joins_base_without_double_slash() {
        let client =
            OpenAiClient::new("https://api.example.com/v1/", "key", "m", Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.endpoint(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = TransportRetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(4), Duration::from_secs(3));
    }

    #[test]
    fn default_policy_does_not_retry() {
        let service = RetryingService::new(
            Scripted::new(vec![Err(unavailable()), Ok("late".into())]),
            TransportRetryPolicy::default(),
        );
        assert!(service.complete("p").is_err());
        assert_eq!(*service.inner.calls.borrow(), 1);
    }

    #[test]
    fn retries_retryable_failures_until_success() {
        let service = RetryingService::new(
            Scripted::new(vec![Err(unavailable()), Err(unavailable()), Ok("cat: 1%".into())]),
            instant_policy(3),
        );
        assert_eq!(service.complete("p").unwrap(), "cat: 1%");
        assert_eq!(*service.inner.calls.borrow(), 3);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let service = RetryingService::new(
            Scripted::new(vec![Err(unavailable()), Err(unavailable()), Err(unavailable())]),
            instant_policy(2),
        );
        assert!(matches!(service.complete("p"), Err(ServiceError::Status { status: 503, .. })));
        assert_eq!(*service.inner.calls.borrow(), 3);
    }

    #[test]
    fn non_retryable_failures_surface_immediately() {
        let service = RetryingService::new(
            Scripted::new(vec![Err(ServiceError::Status { status: 401, body: "no".into() })]),
            instant_policy(5),
        );
        assert!(matches!(service.complete("p"), Err(ServiceError::Status { status: 401, .. })));
        assert_eq!(*service.inner.calls.borrow(), 1);
    }
}
