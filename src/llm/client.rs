//! Budget/timeout/retry wrapper around a pluggable VLM backend.
//!
//! Concrete provider clients (Anthropic, OpenAI, Qwen, ...) are out of
//! scope here; this module owns only the call discipline every provider
//! needs: a per-session spend cap, a hard per-call deadline, and a
//! bounded retry policy for transient (non-timeout) failures.

use std::time::Duration;

use async_trait::async_trait;
use image::RgbImage;

use crate::error::VlmError;

/// Any backend mapping `(system_prompt?, user_prompt, inline_image?) -> string`.
/// Object-safe so a `Box<dyn VlmBackend>` can be swapped at startup.
#[async_trait]
pub trait VlmBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(&self, messages: &[(String, String)]) -> Result<String, VlmError>;

    async fn chat_with_image(
        &self,
        prompt: &str,
        image: &RgbImage,
        system_prompt: Option<&str>,
    ) -> Result<String, VlmError>;
}

/// Configuration for the budget/timeout/retry wrapper. Provider
/// selection and credentials live in `session::config`; this struct
/// only carries the call-discipline knobs.
#[derive(Debug, Clone, Copy)]
pub struct VlmClientConfig {
    pub budget_per_session: u32,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for VlmClientConfig {
    fn default() -> Self {
        Self { budget_per_session: 50, timeout: Duration::from_secs(30), max_retries: 2 }
    }
}

/// Wraps a `VlmBackend` with budget accounting, a per-attempt timeout,
/// and bounded retries on non-timeout errors.
pub struct VlmClient {
    backend: Box<dyn VlmBackend>,
    config: VlmClientConfig,
    calls_used: u32,
}

impl VlmClient {
    pub fn new(backend: Box<dyn VlmBackend>, config: VlmClientConfig) -> Self {
        Self { backend, config, calls_used: 0 }
    }

    pub fn calls_used(&self) -> u32 {
        self.calls_used
    }

    pub fn budget_remaining(&self) -> u32 {
        self.config.budget_per_session.saturating_sub(self.calls_used)
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub async fn chat(&mut self, messages: &[(String, String)]) -> Result<String, VlmError> {
        self.call(|backend| {
            let messages = messages.to_vec();
            Box::pin(async move { backend.chat(&messages).await })
        })
        .await
    }

    pub async fn chat_with_image(
        &mut self,
        prompt: &str,
        image: &RgbImage,
        system_prompt: Option<&str>,
    ) -> Result<String, VlmError> {
        let prompt = prompt.to_string();
        let system_prompt = system_prompt.map(|s| s.to_string());
        self.call(move |backend| {
            let prompt = prompt.clone();
            let system_prompt = system_prompt.clone();
            let image = image.clone();
            Box::pin(async move { backend.chat_with_image(&prompt, &image, system_prompt.as_deref()).await })
        })
        .await
    }

    /// Runs the shared budget/timeout/retry machinery around one logical
    /// call, expressed as a closure so `chat` and `chat_with_image` don't
    /// duplicate it.
    async fn call<F>(&mut self, make_attempt: F) -> Result<String, VlmError>
    where
        F: for<'a> Fn(
            &'a dyn VlmBackend,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<String, VlmError>> + Send + 'a>>,
    {
        if self.calls_used >= self.config.budget_per_session {
            return Err(VlmError::BudgetExhausted);
        }

        let mut attempt = 0;
        let mut last_error = None;
        loop {
            let fut = make_attempt(self.backend.as_ref());
            match tokio::time::timeout(self.config.timeout, fut).await {
                Ok(Ok(text)) => {
                    self.calls_used += 1;
                    return Ok(text);
                }
                Ok(Err(e)) => {
                    last_error = Some(e);
                    if attempt >= self.config.max_retries {
                        return Err(last_error.unwrap());
                    }
                    attempt += 1;
                }
                Err(_elapsed) => return Err(VlmError::Timeout),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// A canned backend: replays a scripted sequence of results, one per
    /// call, repeating the last entry once exhausted. A `Timeout` entry
    /// never returns (sleeps past any reasonable test timeout) so callers
    /// can exercise the client's own timeout path.
    pub struct MockVlmBackend {
        script: Mutex<Vec<MockOutcome>>,
        calls: AtomicUsize,
    }

    #[derive(Clone)]
    pub enum MockOutcome {
        Ok(String),
        Err(VlmError),
        HangForever,
    }

    impl MockVlmBackend {
        pub fn new(script: Vec<MockOutcome>) -> Self {
            Self { script: Mutex::new(script), calls: AtomicUsize::new(0) }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next_outcome(&self) -> MockOutcome {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            let script = self.script.lock().unwrap();
            script.get(index).cloned().unwrap_or_else(|| script.last().cloned().unwrap())
        }
    }

    #[async_trait]
    impl VlmBackend for MockVlmBackend {
        fn name(&self) -> &str {
            "mock"
        }

        async fn chat(&self, _messages: &[(String, String)]) -> Result<String, VlmError> {
            self.resolve().await
        }

        async fn chat_with_image(
            &self,
            _prompt: &str,
            _image: &RgbImage,
            _system_prompt: Option<&str>,
        ) -> Result<String, VlmError> {
            self.resolve().await
        }
    }

    impl MockVlmBackend {
        async fn resolve(&self) -> Result<String, VlmError> {
            match self.next_outcome() {
                MockOutcome::Ok(s) => Ok(s),
                MockOutcome::Err(e) => Err(e),
                MockOutcome::HangForever => std::future::pending().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::testing::{MockOutcome, MockVlmBackend};
    use super::*;

    fn image_fixture() -> RgbImage {
        RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 0]))
    }

    #[tokio::test]
    async fn budget_exhaustion_stops_after_the_cap() {
        let backend = MockVlmBackend::new(vec![
            MockOutcome::Ok("one".into()),
            MockOutcome::Ok("two".into()),
            MockOutcome::Ok("three".into()),
        ]);
        let config = VlmClientConfig { budget_per_session: 2, timeout: Duration::from_secs(1), max_retries: 0 };
        let mut client = VlmClient::new(Box::new(backend), config);

        assert!(client.chat(&[]).await.is_ok());
        assert!(client.chat(&[]).await.is_ok());
        let third = client.chat(&[]).await;
        assert_eq!(third, Err(VlmError::BudgetExhausted));
        assert_eq!(client.calls_used(), 2);
    }

    #[tokio::test]
    async fn retry_recovers_after_transient_errors() {
        let backend = MockVlmBackend::new(vec![
            MockOutcome::Err(VlmError::BackendError("first".into())),
            MockOutcome::Err(VlmError::BackendError("second".into())),
            MockOutcome::Ok("recovered".into()),
        ]);
        let config = VlmClientConfig { budget_per_session: 10, timeout: Duration::from_secs(1), max_retries: 2 };
        let mut client = VlmClient::new(Box::new(backend), config);

        let result = client.chat(&[]).await;
        assert_eq!(result, Ok("recovered".to_string()));
        assert_eq!(client.calls_used(), 1);
    }

    #[tokio::test]
    async fn exhausting_retries_surfaces_the_final_error() {
        let backend = MockVlmBackend::new(vec![
            MockOutcome::Err(VlmError::BackendError("first".into())),
            MockOutcome::Err(VlmError::BackendError("second".into())),
            MockOutcome::Err(VlmError::BackendError("third".into())),
        ]);
        let config = VlmClientConfig { budget_per_session: 10, timeout: Duration::from_secs(1), max_retries: 2 };
        let mut client = VlmClient::new(Box::new(backend), config);

        let result = client.chat(&[]).await;
        assert_eq!(result, Err(VlmError::BackendError("third".into())));
        assert_eq!(client.calls_used(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_never_increments_the_budget_counter() {
        let backend = MockVlmBackend::new(vec![MockOutcome::HangForever]);
        let config = VlmClientConfig { budget_per_session: 10, timeout: Duration::from_millis(50), max_retries: 3 };
        let mut client = VlmClient::new(Box::new(backend), config);

        let result = client.chat_with_image("describe", &image_fixture(), None).await;
        assert_eq!(result, Err(VlmError::Timeout));
        assert_eq!(client.calls_used(), 0);
    }
}
