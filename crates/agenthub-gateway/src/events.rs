//! Agent events → wire events, and what a finished run leaves in history

use agenthub_agent::AgentEvent;
use agenthub_core::{round_cost, Message, ServerEvent};

/// Map one loop event onto its wire shape.
pub fn to_wire(event: &AgentEvent) -> ServerEvent {
    match event {
        AgentEvent::Status(content) => ServerEvent::status(content.clone()),
        AgentEvent::Thinking(content) => ServerEvent::Thinking {
            content: content.clone(),
        },
        AgentEvent::ToolCall { id, name, arguments } => ServerEvent::ToolCall {
            tool_name: name.clone(),
            arguments: arguments.clone(),
            tool_call_id: Some(id.clone()),
        },
        AgentEvent::ToolResult {
            id,
            name,
            content,
            success,
        } => ServerEvent::ToolResult {
            tool_name: name.clone(),
            content: content.clone(),
            success: *success,
            tool_call_id: Some(id.clone()),
        },
        AgentEvent::FileChange {
            action,
            path,
            tool_name,
            before,
            after,
        } => ServerEvent::FileChange {
            action: action.clone(),
            file_path: path.clone(),
            tool_name: tool_name.clone(),
            content_before: before.clone(),
            content_after: after.clone(),
        },
        AgentEvent::TokenUsage(totals) => ServerEvent::TokenUsage {
            input_tokens: totals.input_tokens,
            output_tokens: totals.output_tokens,
            total_tokens: totals.total_tokens(),
            estimated_cost: round_cost(totals.estimated_cost),
        },
        AgentEvent::Assistant(content) => ServerEvent::Assistant {
            content: content.clone(),
        },
        AgentEvent::Error { message, fatal } => ServerEvent::error(message.clone(), *fatal),
    }
}

/// Append whatever `event` contributes to the session history.
///
/// Only the final answer is kept. Tool exchanges stay out: a `tool` message
/// without the assistant turn that requested it would fail sanitizing on
/// the next run.
pub fn fold_into_history(event: &AgentEvent, history: &mut Vec<Message>) {
    if let AgentEvent::Assistant(content) = event {
        history.push(Message::assistant(content.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenthub_core::UsageTotals;
    use serde_json::json;

    #[test]
    fn token_usage_rounds_cost_and_sums_tokens() {
        let ev = AgentEvent::TokenUsage(UsageTotals {
            input_tokens: 123,
            output_tokens: 45,
            estimated_cost: 0.001290000001,
        });
        assert_eq!(
            to_wire(&ev),
            ServerEvent::TokenUsage {
                input_tokens: 123,
                output_tokens: 45,
                total_tokens: 168,
                estimated_cost: 0.00129,
            }
        );
    }

    #[test]
    fn tool_events_carry_call_id() {
        let call = to_wire(&AgentEvent::ToolCall {
            id: "call_1".into(),
            name: "read_file".into(),
            arguments: json!({"path": "a.txt"}),
        });
        let v = serde_json::to_value(&call).unwrap();
        assert_eq!(v["type"], "tool_call");
        assert_eq!(v["tool_call_id"], "call_1");
        assert_eq!(v["arguments"]["path"], "a.txt");
    }

    #[test]
    fn thinking_matches_pre_turn_frame() {
        let wire = to_wire(&AgentEvent::Thinking(agenthub_core::THINKING_TEXT.into()));
        assert_eq!(wire, ServerEvent::thinking());
    }

    #[test]
    fn only_assistant_is_folded() {
        let mut history = vec![Message::user("hi")];
        fold_into_history(&AgentEvent::Status("Thinking... (iteration 1)".into()), &mut history);
        fold_into_history(
            &AgentEvent::ToolResult {
                id: "c".into(),
                name: "read_file".into(),
                content: "x".into(),
                success: true,
            },
            &mut history,
        );
        fold_into_history(&AgentEvent::Assistant("done".into()), &mut history);
        assert_eq!(history, vec![Message::user("hi"), Message::assistant("done")]);
    }
}
