//! LlmAdvisor - advice service backed by an LLM
//!
//! Both operations force a single `submit_*` tool call so the answer comes
//! back as structured JSON. A model that answers in plain text with a JSON
//! body is accepted too.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::error::AdviceError;
use super::service::{AdviceService, BreakdownOutcome, BreakdownRequest, CandidateTask, ParseOutcome};
use crate::domain::{EnergyLevel, MicroStep};
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, Message, ToolDefinition};

const PARSE_TOOL: &str = "submit_tasks";
const BREAKDOWN_TOOL: &str = "submit_steps";

const PARSE_PROMPT: &str = "You help someone with low executive function turn a brain dump into a short list \
of separate, concrete tasks. Keep each task in the user's own words, one action per task. Do not invent tasks \
that are not in the text. Submit the list with the submit_tasks tool.";

const BREAKDOWN_PROMPT: &str = "You break one task into 3 to 6 micro-steps that each take between 2 and 15 \
minutes. The first step must be almost effortless. Every step needs a short due-by label (for example 'now', \
'this morning', 'today') and a time estimate in minutes. Submit the steps with the submit_steps tool.";

#[derive(Debug, Deserialize)]
struct TasksOutput {
    tasks: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StepOutput {
    text: String,
    #[serde(default)]
    due_by: Option<String>,
    #[serde(default)]
    time_estimate_mins: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct StepsOutput {
    steps: Vec<StepOutput>,
}

/// Advice service on top of any `LlmClient`
pub struct LlmAdvisor {
    llm: Arc<dyn LlmClient>,
    max_tokens: u32,
}

impl LlmAdvisor {
    pub fn new(llm: Arc<dyn LlmClient>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    fn parse_tools() -> Vec<ToolDefinition> {
        vec![ToolDefinition::new(
            PARSE_TOOL,
            "Submit the separate tasks found in the brain dump.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "tasks": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "One entry per task, in the order they appeared"
                    }
                },
                "required": ["tasks"]
            }),
        )]
    }

    fn breakdown_tools() -> Vec<ToolDefinition> {
        vec![ToolDefinition::new(
            BREAKDOWN_TOOL,
            "Submit the micro-steps for the task.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "steps": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "text": { "type": "string" },
                                "due_by": { "type": "string" },
                                "time_estimate_mins": { "type": "integer", "minimum": 1 }
                            },
                            "required": ["text"]
                        }
                    }
                },
                "required": ["steps"]
            }),
        )]
    }

    fn breakdown_message(request: &BreakdownRequest) -> String {
        let pacing = match request.energy {
            EnergyLevel::Low => "Energy is low: keep every step tiny and gentle, 2 to 5 minutes each.",
            EnergyLevel::Medium => "Energy is moderate.",
            EnergyLevel::High => "Energy is high: steps can be a little more ambitious.",
        };
        format!(
            "Task: {}\nDue: {}\n{}",
            request.task_name, request.due, pacing
        )
    }

    async fn ask<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        message: String,
        tools: Vec<ToolDefinition>,
        tool: &str,
    ) -> Result<T, AdviceError> {
        let request = CompletionRequest {
            system_prompt: system_prompt.to_string(),
            messages: vec![Message::user(message)],
            tools,
            tool_choice: Some(tool.to_string()),
            max_tokens: self.max_tokens,
        };
        let response = self.llm.complete(request).await?;
        extract(&response, tool)
    }
}

/// Pull the structured answer out of a tool call or a JSON text body
fn extract<T: DeserializeOwned>(response: &CompletionResponse, tool: &str) -> Result<T, AdviceError> {
    if let Some(input) = response.tool_input(tool) {
        debug!(%tool, "extract: using tool call input");
        return serde_json::from_value(input.clone()).map_err(|e| AdviceError::Parse(e.to_string()));
    }

    let content = response
        .content
        .as_deref()
        .ok_or_else(|| AdviceError::Parse(format!("no {} call and no text content", tool)))?;
    let body = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    debug!(%tool, "extract: falling back to text content");
    serde_json::from_str(body).map_err(|e| AdviceError::Parse(e.to_string()))
}

#[async_trait]
impl AdviceService for LlmAdvisor {
    async fn parse(&self, raw_text: &str) -> Result<ParseOutcome, AdviceError> {
        debug!(len = raw_text.len(), "LlmAdvisor::parse: called");
        let output: TasksOutput = self
            .ask(PARSE_PROMPT, raw_text.to_string(), Self::parse_tools(), PARSE_TOOL)
            .await?;

        let tasks: Vec<CandidateTask> = output
            .tasks
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(CandidateTask::new)
            .collect();
        if tasks.is_empty() {
            return Err(AdviceError::Empty);
        }

        info!(count = tasks.len(), "Brain dump parsed into tasks");
        Ok(ParseOutcome::from_ai(tasks))
    }

    async fn breakdown(&self, request: &BreakdownRequest) -> Result<BreakdownOutcome, AdviceError> {
        debug!(task = %request.task_name, "LlmAdvisor::breakdown: called");
        let output: StepsOutput = self
            .ask(
                BREAKDOWN_PROMPT,
                Self::breakdown_message(request),
                Self::breakdown_tools(),
                BREAKDOWN_TOOL,
            )
            .await?;

        let default_due = request.due.to_string();
        let steps: Vec<MicroStep> = output
            .steps
            .into_iter()
            .filter(|s| !s.text.trim().is_empty())
            .map(|s| {
                MicroStep::new(
                    s.text.trim(),
                    s.due_by.unwrap_or_else(|| default_due.clone()),
                    s.time_estimate_mins.unwrap_or(5).max(1),
                )
            })
            .collect();
        if steps.is_empty() {
            return Err(AdviceError::Empty);
        }

        info!(task = %request.task_name, count = steps.len(), "Task broken down");
        Ok(BreakdownOutcome { steps })
    }
}
