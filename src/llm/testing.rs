use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{SynthesisRequest, TextGenerator};

/// Canned [`TextGenerator`] for tests.
pub struct StubGenerator {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl StubGenerator {
    /// Always answers with `reply`.
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Always fails, like an unreachable endpoint.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    fn describe(&self) -> String {
        "stub".to_string()
    }

    async fn generate(&self, _request: &SynthesisRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => bail!("connection refused"),
        }
    }
}
