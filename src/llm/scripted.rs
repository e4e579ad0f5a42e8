//! Canned decision maker for simulator runs and tests

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use crate::command::resolver::DecisionResponse;
use crate::core::error::{PilotError, Result};
use crate::llm::client::DecisionMaker;

/// Replays queued responses in order and records every prompt it is shown.
///
/// In cycling mode each response is re-queued after use, so the script
/// never runs out.
#[derive(Debug, Default)]
pub struct ScriptedDecisionMaker {
    responses: Mutex<VecDeque<DecisionResponse>>,
    prompts: Mutex<Vec<String>>,
    cycle: bool,
}

impl ScriptedDecisionMaker {
    pub fn new(responses: Vec<DecisionResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
            cycle: false,
        }
    }

    pub fn cycling(responses: Vec<DecisionResponse>) -> Self {
        Self {
            cycle: true,
            ..Self::new(responses)
        }
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn next(&self, prompt: String) -> Result<DecisionResponse> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt);
        }
        let mut queue = self
            .responses
            .lock()
            .map_err(|_| PilotError::LlmError("script queue poisoned".into()))?;
        let response = queue
            .pop_front()
            .ok_or_else(|| PilotError::LlmError("no scripted response queued".into()))?;
        if self.cycle {
            queue.push_back(response.clone());
        }
        Ok(response)
    }
}

impl DecisionMaker for ScriptedDecisionMaker {
    fn decide<'a>(
        &'a self,
        prompt: String,
    ) -> Pin<Box<dyn Future<Output = Result<DecisionResponse>> + Send + 'a>> {
        Box::pin(async move { self.next(prompt) })
    }
}
