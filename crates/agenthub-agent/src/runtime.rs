//! Agent loop - ask the model, dispatch its tool calls, feed results back
//!
//! A run is a lazy stream: each event is yielded before the next step
//! starts, so a consumer that stops polling (or drops the stream) stops the
//! run at the next suspension point. Gateway failures, sanitizer failures
//! and unknown tools end the stream with an `Err`; tool failures do not.

use crate::event::AgentEvent;
use crate::prompts::system_prompt;
use crate::sanitizer::sanitize;
use crate::usage::{Pricing, UsageAccumulator};
use agenthub_core::{AgentType, Error, Message, Result, Role, Settings, UsageTotals};
use agenthub_llm::ModelGateway;
use agenthub_tools::{read_snapshot, ToolContext, ToolRegistry};
use futures::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const MAX_ITERATIONS_MESSAGE: &str = "Max iterations reached — stopping for safety";

/// Tool whose calls produce a `FileChange` event.
const WRITE_TOOL: &str = "write_file";

pub type AgentStream = Pin<Box<dyn Stream<Item = Result<AgentEvent>> + Send>>;

#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Gateway calls allowed per run.
    pub max_iterations: usize,
    pub pricing: Pricing,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            pricing: Pricing::new(5.0, 15.0),
        }
    }
}

impl From<&Settings> for AgentConfig {
    fn from(s: &Settings) -> Self {
        Self {
            max_iterations: s.max_iterations,
            pricing: Pricing::from(s),
        }
    }
}

/// Everything one run needs. The loop owns `history`; the caller's copy is
/// never touched.
#[derive(Clone, Debug)]
pub struct RunRequest {
    pub user_message: String,
    pub workspace: PathBuf,
    pub history: Vec<Message>,
    pub agent_type: AgentType,
    /// Totals carried over from earlier runs in the same session.
    pub usage: UsageTotals,
}

impl RunRequest {
    pub fn new(user_message: impl Into<String>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            user_message: user_message.into(),
            workspace: workspace.into(),
            history: Vec::new(),
            agent_type: AgentType::default(),
            usage: UsageTotals::default(),
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_agent_type(mut self, agent_type: AgentType) -> Self {
        self.agent_type = agent_type;
        self
    }

    pub fn with_usage(mut self, usage: UsageTotals) -> Self {
        self.usage = usage;
        self
    }
}

pub struct AgentLoop {
    gateway: Arc<dyn ModelGateway>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl AgentLoop {
    pub fn new(gateway: Arc<dyn ModelGateway>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            gateway,
            tools,
            config,
        }
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    /// Start a run. Nothing happens until the stream is polled.
    pub fn run(&self, request: RunRequest) -> AgentStream {
        let gateway = self.gateway.clone();
        let tools = self.tools.clone();
        let config = self.config.clone();

        Box::pin(async_stream::stream! {
            let RunRequest { user_message, workspace, history, agent_type, usage } = request;
            let ctx = ToolContext::new(&workspace);
            let specs = tools.specs();
            let mut messages = initial_messages(agent_type, history, user_message);
            let mut usage = UsageAccumulator::seeded(usage);
            let mut finished = false;

            info!(
                agent_type = %agent_type,
                workspace = %workspace.display(),
                history = messages.len(),
                "Agent run started"
            );

            'iterations: for iteration in 1..=config.max_iterations {
                yield Ok(AgentEvent::Status(format!("Thinking... (iteration {})", iteration)));

                if let Err(e) = sanitize(&mut messages) {
                    warn!("Sanitizer rejected history: {}", e);
                    yield Err(e);
                    return;
                }

                let response = match gateway.complete(&messages, &specs).await {
                    Ok(r) => r,
                    Err(e) => {
                        error!(iteration, "Gateway call failed: {}", e);
                        yield Err(Error::from(e));
                        return;
                    }
                };

                if let Some(u) = response.usage {
                    let totals = usage.record(u.prompt_tokens, u.completion_tokens, &config.pricing);
                    yield Ok(AgentEvent::TokenUsage(totals));
                }

                let mut reply = response.message;
                reply.role = Role::Assistant;
                let calls = reply.invocations().to_vec();
                let answer = reply.content.clone();
                messages.push(reply);

                if calls.is_empty() {
                    info!(iterations = iteration, "Agent run finished");
                    yield Ok(AgentEvent::Assistant(answer));
                    finished = true;
                    break 'iterations;
                }

                for call in calls {
                    yield Ok(AgentEvent::ToolCall {
                        id: call.id.clone(),
                        name: call.tool_name.clone(),
                        arguments: call.arguments.clone(),
                    });

                    let write_path = (call.tool_name == WRITE_TOOL).then(|| {
                        call.arguments
                            .get("path")
                            .and_then(|v| v.as_str())
                            .unwrap_or("")
                            .to_string()
                    });
                    let before = match &write_path {
                        Some(path) => read_snapshot(&workspace, path).await,
                        None => None,
                    };

                    let tool = match tools.lookup(&call.tool_name) {
                        Ok(t) => t,
                        Err(e) => {
                            warn!("Model requested unknown tool {}", call.tool_name);
                            yield Err(e);
                            return;
                        }
                    };

                    let content = match agenthub_tools::execute(tool.as_ref(), call.arguments, &ctx).await {
                        Ok(output) => output,
                        Err(e) => {
                            debug!(tool = %call.tool_name, "Tool failed: {}", e);
                            e.to_string()
                        }
                    };

                    yield Ok(AgentEvent::ToolResult {
                        id: call.id.clone(),
                        name: call.tool_name.clone(),
                        content: content.clone(),
                        success: true,
                    });

                    if let Some(path) = write_path {
                        let after = read_snapshot(&workspace, &path).await;
                        yield Ok(AgentEvent::FileChange {
                            action: "write".to_string(),
                            path,
                            tool_name: call.tool_name.clone(),
                            before,
                            after,
                        });
                    }

                    messages.push(Message::tool_result(call.id, content));
                }
            }

            if !finished {
                warn!(max_iterations = config.max_iterations, "Agent run hit iteration limit");
                yield Ok(AgentEvent::Error {
                    message: MAX_ITERATIONS_MESSAGE.to_string(),
                    fatal: true,
                });
            }
        })
    }
}

/// System prompt (unless the history already starts with one), prior
/// history, then the new user turn.
fn initial_messages(agent_type: AgentType, history: Vec<Message>, user_message: String) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    if history.first().map(|m| m.role) != Some(Role::System) {
        messages.push(Message::system(system_prompt(agent_type)));
    }
    messages.extend(history);
    messages.push(Message::user(user_message));
    messages
}
