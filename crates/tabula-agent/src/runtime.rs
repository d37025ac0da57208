//! The agent runtime — a ReAct loop over the database toolset.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use tabula_core::config::AppConfig;
use tabula_core::error::{Result, TabulaError};
use tabula_core::traits::LlmClient;
use tabula_core::types::*;

use crate::prompts;
use crate::registry::ToolRegistry;
use crate::session::SessionStore;

pub struct AgentRuntime {
    config: AppConfig,
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    store: Arc<SessionStore>,
}

impl AgentRuntime {
    pub fn new(
        config: AppConfig,
        llm: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        store: Arc<SessionStore>,
    ) -> Self {
        Self {
            config,
            llm,
            registry,
            store,
        }
    }

    pub fn store(&self) -> Arc<SessionStore> {
        Arc::clone(&self.store)
    }

    /// Run one query to completion.
    pub async fn run(&self, session_id: &SessionId, query: &str) -> Result<AgentReply> {
        self.run_inner(session_id, query, None).await
    }

    /// Like [`run`], but emits tool-call progress on the channel as it
    /// happens. The final reply is both sent and returned.
    ///
    /// [`run`]: AgentRuntime::run
    pub async fn run_streaming(
        &self,
        session_id: &SessionId,
        query: &str,
        progress: mpsc::Sender<AgentProgress>,
    ) -> Result<AgentReply> {
        let reply = self.run_inner(session_id, query, Some(&progress)).await?;
        let _ = progress
            .send(AgentProgress::Final {
                reply: reply.clone(),
            })
            .await;
        Ok(reply)
    }

    async fn run_inner(
        &self,
        session_id: &SessionId,
        query: &str,
        progress: Option<&mpsc::Sender<AgentProgress>>,
    ) -> Result<AgentReply> {
        let max_turns = self.config.agent.max_turns;
        let tool_defs = self.registry.definitions();

        let system = prompts::system_prompt(self.config.agent.system_prompt.as_deref());
        let mut messages = vec![ChatMessage::system(system)];
        messages.extend(self.store.history(session_id));

        let user_msg = ChatMessage::user(query);
        self.store.append(session_id, &[user_msg.clone()]);
        messages.push(user_msg);

        let mut total_usage = Usage::default();

        for turn in 0..max_turns {
            debug!(%session_id, turn, "starting agent turn");

            let reply = self
                .llm
                .chat(&self.config.model, messages.clone(), &tool_defs)
                .await?;
            total_usage.input_tokens += reply.usage.input_tokens;
            total_usage.output_tokens += reply.usage.output_tokens;

            let assistant_msg = ChatMessage {
                role: Role::Assistant,
                content: reply.content.clone(),
                timestamp: Some(chrono::Utc::now()),
            };
            self.store.append(session_id, &[assistant_msg.clone()]);
            messages.push(assistant_msg);

            let tool_uses: Vec<(String, String, serde_json::Value)> = reply
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();

            if tool_uses.is_empty() {
                if reply.stop == StopReason::MaxTokens {
                    warn!(%session_id, "model hit max tokens");
                }
                info!(
                    %session_id,
                    turns = turn + 1,
                    input_tokens = total_usage.input_tokens,
                    output_tokens = total_usage.output_tokens,
                    "agent run complete"
                );
                return Ok(parse_reply(&reply.text()));
            }

            for (id, name, input) in tool_uses {
                if let Some(tx) = progress {
                    let _ = tx
                        .send(AgentProgress::ToolCall {
                            name: name.clone(),
                            input: input.clone(),
                        })
                        .await;
                }

                let result = match self.registry.execute(&name, input).await {
                    Ok(r) => r,
                    Err(e) => {
                        error!(tool = %name, error = %e, "tool execution failed");
                        ToolResult::error(e.to_string())
                    }
                };

                if let Some(tx) = progress {
                    let _ = tx
                        .send(AgentProgress::ToolDone {
                            name: name.clone(),
                            content: result.content.clone(),
                            is_error: result.is_error,
                        })
                        .await;
                }

                let result_msg = ChatMessage::tool_result(id, result.content, result.is_error);
                self.store.append(session_id, &[result_msg.clone()]);
                messages.push(result_msg);
            }
        }

        Err(TabulaError::MaxTurnsExceeded(max_turns))
    }
}

/// Interpret the model's final text as a structured reply.
///
/// The prompt asks for a bare JSON object; models still wrap it in code
/// fences or prose often enough that we dig the last object out of the
/// text. Unparseable text becomes a completed reply verbatim.
pub fn parse_reply(text: &str) -> AgentReply {
    let trimmed = text.trim();

    if let Some(reply) = try_parse_object(trimmed) {
        return reply;
    }
    if let Some(inner) = extract_fenced(trimmed) {
        if let Some(reply) = try_parse_object(inner.trim()) {
            return reply;
        }
    }
    if let Some(obj) = last_json_object(trimmed) {
        if let Some(reply) = try_parse_object(&obj) {
            return reply;
        }
    }

    AgentReply::completed(trimmed)
}

fn try_parse_object(text: &str) -> Option<AgentReply> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let status = match value.get("status")?.as_str()? {
        "completed" => AgentStatus::Completed,
        "input_required" => AgentStatus::InputRequired,
        "error" => AgentStatus::Error,
        _ => return None,
    };
    let message = value.get("message")?.as_str()?.to_string();
    Some(AgentReply { status, message })
}

fn extract_fenced(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let body_start = after.find('\n')?;
    let body = &after[body_start + 1..];
    let end = body.find("```")?;
    Some(&body[..end])
}

/// The last balanced `{...}` region of the text.
fn last_json_object(text: &str) -> Option<String> {
    let close = text.rfind('}')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for i in (0..=close).rev() {
        match bytes[i] {
            b'}' => depth += 1,
            b'{' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[i..=close].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
