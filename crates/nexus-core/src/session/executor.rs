//! Sequential chained task execution.
//!
//! Each bot sees the brief, its own task, and the outputs of every bot that
//! ran before it. Calls are awaited strictly one after another; a failed
//! task is recorded and the run moves on.

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, debug, field, info, info_span, warn};

use nexus_types::bot::BotId;
use nexus_types::config::ExecutionSettings;
use nexus_types::llm::{CompletionRequest, CompletionResponse, LlmError, StopReason};
use nexus_types::session::{ExecutionOutput, OutputStatus};

use crate::llm::box_provider::BoxLlmProvider;

use super::prompt::{PriorContribution, build_chained_messages};

/// Text recorded for a task whose provider returned nothing usable.
pub const EMPTY_OUTPUT: &str = "No response";

/// A task assignment joined with the bot configuration it runs under.
#[derive(Debug, Clone)]
pub struct ResolvedAssignment {
    pub bot_id: BotId,
    pub bot_name: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub task: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Timeout and retry rules applied to every provider call.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub timeout: Duration,
    /// Extra attempts after the first, for transient errors only.
    pub max_retries: u32,
    /// Pause before a retry when the provider gave no `retry_after`.
    pub retry_backoff: Duration,
}

impl CallPolicy {
    pub fn from_settings(settings: &ExecutionSettings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.request_timeout_secs),
            max_retries: settings.max_retries,
            ..Self::default()
        }
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_retries: 1,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Runs provider calls for a session under a shared [`CallPolicy`].
pub struct TaskExecutor {
    provider: Arc<BoxLlmProvider>,
    policy: CallPolicy,
}

impl TaskExecutor {
    pub fn new(provider: Arc<BoxLlmProvider>, policy: CallPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Execute every assignment in order, chaining outputs forward.
    ///
    /// Always returns one output per assignment, in assignment order.
    pub async fn run(&self, brief: &str, assignments: &[ResolvedAssignment]) -> Vec<ExecutionOutput> {
        let mut prior: Vec<PriorContribution> = Vec::with_capacity(assignments.len());
        let mut outputs = Vec::with_capacity(assignments.len());

        for (index, assignment) in assignments.iter().enumerate() {
            let messages = build_chained_messages(
                brief,
                assignment.system_prompt.as_deref(),
                &assignment.task,
                &prior,
            );
            debug!(
                position = index + 1,
                bot = %assignment.bot_name,
                prior = prior.len(),
                prompt_chars = messages.iter().map(|m| m.content.len()).sum::<usize>(),
                "running team task"
            );

            let request = CompletionRequest {
                model: assignment.model.clone(),
                messages,
                max_tokens: assignment.max_tokens,
                temperature: Some(assignment.temperature),
            };

            match self.call(&request).await {
                Ok(response) => {
                    let output = sanitize_output(&response.content);
                    prior.push(PriorContribution {
                        bot_name: assignment.bot_name.clone(),
                        task: assignment.task.clone(),
                        output: output.clone(),
                    });
                    outputs.push(ExecutionOutput {
                        bot_id: assignment.bot_id.clone(),
                        bot_name: assignment.bot_name.clone(),
                        task: assignment.task.clone(),
                        output,
                        status: OutputStatus::Success,
                        error: None,
                    });
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(bot = %assignment.bot_name, error = %message, "team task failed");
                    prior.push(PriorContribution {
                        bot_name: assignment.bot_name.clone(),
                        task: assignment.task.clone(),
                        output: format!("⚠️ Error: {message}"),
                    });
                    outputs.push(ExecutionOutput {
                        bot_id: assignment.bot_id.clone(),
                        bot_name: assignment.bot_name.clone(),
                        task: assignment.task.clone(),
                        output: String::new(),
                        status: OutputStatus::Error,
                        error: Some(message),
                    });
                }
            }
        }

        let failed = outputs.iter().filter(|o| !o.is_success()).count();
        info!(tasks = outputs.len(), failed, "team execution finished");
        outputs
    }

    /// Send one completion request under the call policy.
    ///
    /// `max_tokens` is capped at the provider's output limit. Each attempt
    /// is bounded by `policy.timeout`. Transient errors are retried up to
    /// `policy.max_retries` times; anything else is returned immediately.
    pub async fn call(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let output_cap = self.provider.capabilities().max_output_tokens;
        let clamped;
        let request = if request.max_tokens > output_cap {
            debug!(
                requested = request.max_tokens,
                cap = output_cap,
                "clamping max_tokens to provider output limit"
            );
            clamped = CompletionRequest {
                max_tokens: output_cap,
                ..request.clone()
            };
            &clamped
        } else {
            request
        };

        let mut attempt = 0;
        loop {
            let span = info_span!(
                "gen_ai.complete",
                gen_ai.system = self.provider.name(),
                gen_ai.request.model = %request.model,
                gen_ai.request.max_tokens = request.max_tokens,
                gen_ai.request.temperature = ?request.temperature,
                gen_ai.response.id = field::Empty,
                gen_ai.response.model = field::Empty,
                gen_ai.response.finish_reason = field::Empty,
                gen_ai.usage.input_tokens = field::Empty,
                gen_ai.usage.output_tokens = field::Empty,
                attempt = attempt + 1,
            );

            let result = match tokio::time::timeout(self.policy.timeout, self.provider.complete(request))
                .instrument(span.clone())
                .await
            {
                Ok(result) => result,
                Err(_) => Err(LlmError::Timeout(self.policy.timeout.as_secs())),
            };

            match result {
                Ok(response) => {
                    span.record("gen_ai.response.id", response.id.as_str());
                    span.record("gen_ai.response.model", response.model.as_str());
                    span.record(
                        "gen_ai.response.finish_reason",
                        tracing::field::display(&response.stop_reason),
                    );
                    span.record("gen_ai.usage.input_tokens", response.usage.input_tokens);
                    span.record("gen_ai.usage.output_tokens", response.usage.output_tokens);
                    if response.stop_reason == StopReason::MaxTokens {
                        warn!(
                            model = %request.model,
                            max_tokens = request.max_tokens,
                            "completion truncated at max_tokens"
                        );
                    }
                    return Ok(response);
                }
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let pause = match &e {
                        LlmError::RateLimited {
                            retry_after_ms: Some(ms),
                        } => Duration::from_millis(*ms),
                        _ => self.policy.retry_backoff,
                    };
                    warn!(
                        model = %request.model,
                        error = %e,
                        attempt,
                        "transient provider error, retrying"
                    );
                    tokio::time::sleep(pause).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Remove C0 control characters other than tab, newline and carriage
/// return, plus DEL, then trim surrounding whitespace.
pub fn strip_control_chars(raw: &str) -> String {
    raw.chars()
        .filter(|c| {
            !matches!(c, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{7f}')
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// [`strip_control_chars`], with empty results replaced by [`EMPTY_OUTPUT`].
pub fn sanitize_output(raw: &str) -> String {
    let cleaned = strip_control_chars(raw);
    if cleaned.is_empty() {
        EMPTY_OUTPUT.to_string()
    } else {
        cleaned
    }
}
