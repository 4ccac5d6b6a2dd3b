//! Scripted generation provider.
//!
//! [`ScriptedProvider`] replays queued turns in order and captures every
//! [`ProviderCall`] it receives, so tests can assert both what the gateway
//! returned and exactly what it sent upstream.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use btl_gateway::{GatewayError, GatewayResult, GenerationProvider, ProviderCall, ProviderReply};

/// One scripted upstream reply.
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    /// Return this text.
    Text {
        /// Generated text.
        text: String,
        /// Reported token usage.
        tokens_used: Option<u64>,
    },
    /// Fail as an upstream timeout.
    Timeout,
    /// Fail as an unavailable upstream.
    Unavailable(String),
    /// Fail as rate limited.
    RateLimited,
    /// Sleep, then return this text.
    Delayed {
        /// How long to wait.
        delay: Duration,
        /// Generated text.
        text: String,
    },
}

impl ScriptedTurn {
    /// A text reply reporting 10 tokens.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            tokens_used: Some(10),
        }
    }

    /// A text reply with explicit usage.
    #[must_use]
    pub fn text_with_tokens(text: impl Into<String>, tokens_used: u64) -> Self {
        Self::Text {
            text: text.into(),
            tokens_used: Some(tokens_used),
        }
    }

    /// A JSON value serialized as the reply text.
    #[must_use]
    pub fn json(value: &serde_json::Value) -> Self {
        Self::text(value.to_string())
    }

    /// An unavailable-upstream failure.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Deterministic, queue-based [`GenerationProvider`].
///
/// An exhausted queue yields [`GatewayError::Upstream`].
#[derive(Debug)]
pub struct ScriptedProvider {
    model: String,
    turns: Mutex<VecDeque<ScriptedTurn>>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl ScriptedProvider {
    /// Create a provider preloaded with `turns`.
    #[must_use]
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            model: "scripted-model".to_string(),
            turns: Mutex::new(VecDeque::from(turns)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the model reported as the default.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Queue another turn.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn push(&self, turn: ScriptedTurn) {
        self.turns.lock().expect("lock poisoned").push_back(turn);
    }

    /// Number of `complete` calls so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("lock poisoned").len()
    }

    /// Every call received, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// Turns not yet consumed.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.turns.lock().expect("lock poisoned").len()
    }

    fn next_turn(&self, call: &ProviderCall) -> Option<ScriptedTurn> {
        self.calls.lock().expect("lock poisoned").push(call.clone());
        self.turns.lock().expect("lock poisoned").pop_front()
    }

    fn reply(&self, call: &ProviderCall, text: String, tokens_used: Option<u64>) -> ProviderReply {
        let model = if call.model.is_empty() {
            self.model.clone()
        } else {
            call.model.clone()
        };
        ProviderReply {
            text,
            tokens_used,
            model: Some(model),
        }
    }
}

#[async_trait]
#[allow(clippy::unnecessary_literal_bound)]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, call: &ProviderCall) -> GatewayResult<ProviderReply> {
        match self.next_turn(call) {
            Some(ScriptedTurn::Text { text, tokens_used }) => {
                Ok(self.reply(call, text, tokens_used))
            },
            Some(ScriptedTurn::Delayed { delay, text }) => {
                tokio::time::sleep(delay).await;
                Ok(self.reply(call, text, Some(10)))
            },
            Some(ScriptedTurn::Timeout) => {
                Err(GatewayError::Timeout("scripted timeout".to_string()))
            },
            Some(ScriptedTurn::Unavailable(message)) => Err(GatewayError::Upstream(message)),
            Some(ScriptedTurn::RateLimited) => Err(GatewayError::RateLimited {
                retry_after_secs: Some(1),
            }),
            None => Err(GatewayError::Upstream(
                "ScriptedProvider: no more turns queued".to_string(),
            )),
        }
    }
}
