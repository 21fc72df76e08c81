/*!
 * Mock provider for testing.
 *
 * The mock answers chat-completion requests in-process and records every
 * request it receives, so tests can assert on assembled prompts:
 * - `MockProvider::uppercase()` - Returns the user message uppercased
 * - `MockProvider::echo(prefix)` - Returns the user message behind a prefix
 * - `MockProvider::fail_on_call(n)` - Fails only the n-th call (1-based)
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::responder(f)` - Delegates to a closure
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider, TokenUsage};

/// Closure used by `MockBehavior::Custom`
pub type Responder = Arc<dyn Fn(&CompletionRequest) -> Result<String, ProviderError> + Send + Sync>;

/// Behavior mode for the mock provider
#[derive(Clone)]
pub enum MockBehavior {
    /// Uppercase the user message
    Uppercase,
    /// Return the user message behind a fixed prefix
    Echo { prefix: String },
    /// Uppercase, except the n-th call (1-based) which fails
    FailOnCall { call: usize },
    /// Uppercase, except calls whose user message contains the marker
    FailWhenContains { marker: String },
    /// Always fail with a server error
    Failing,
    /// Delegate to a closure
    Custom(Responder),
}

impl fmt::Debug for MockBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uppercase => write!(f, "Uppercase"),
            Self::Echo { prefix } => write!(f, "Echo({:?})", prefix),
            Self::FailOnCall { call } => write!(f, "FailOnCall({})", call),
            Self::FailWhenContains { marker } => write!(f, "FailWhenContains({:?})", marker),
            Self::Failing => write!(f, "Failing"),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every request received, in arrival order
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn uppercase() -> Self {
        Self::new(MockBehavior::Uppercase)
    }

    pub fn echo(prefix: impl Into<String>) -> Self {
        Self::new(MockBehavior::Echo { prefix: prefix.into() })
    }

    pub fn fail_on_call(call: usize) -> Self {
        Self::new(MockBehavior::FailOnCall { call })
    }

    pub fn fail_when_contains(marker: impl Into<String>) -> Self {
        Self::new(MockBehavior::FailWhenContains { marker: marker.into() })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock whose answers come from a closure
    pub fn responder<F>(f: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        Self::new(MockBehavior::Custom(Arc::new(f)))
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    fn simulated_failure(call: usize) -> ProviderError {
        ProviderError::ApiError {
            status_code: 500,
            message: format!("Simulated provider failure (request #{})", call),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let call = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push(request.clone());

        let user = request.user_text();
        let text = match &self.behavior {
            MockBehavior::Uppercase => user.to_uppercase(),
            MockBehavior::Echo { prefix } => format!("{}{}", prefix, user),
            MockBehavior::FailOnCall { call: failing } => {
                if call == *failing {
                    return Err(Self::simulated_failure(call));
                }
                user.to_uppercase()
            }
            MockBehavior::FailWhenContains { marker } => {
                if user.contains(marker.as_str()) {
                    return Err(Self::simulated_failure(call));
                }
                user.to_uppercase()
            }
            MockBehavior::Failing => return Err(Self::simulated_failure(call)),
            MockBehavior::Custom(responder) => responder(&request)?,
        };

        let usage = TokenUsage {
            prompt_tokens: (request.system_text().len() + user.len()) as u64 / 4,
            completion_tokens: text.len() as u64 / 4,
        };

        Ok(CompletionResponse { text, usage })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated connection failure".to_string())),
            _ => Ok(()),
        }
    }
}
