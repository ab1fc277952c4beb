//! Conversation sanitizer
//!
//! Runs before every gateway call. Tool messages must name the call they
//! answer and must never be empty; nothing is reordered or dropped.
//! [`parse_history`] is the boundary where untyped history (from a client
//! or from storage) becomes typed [`Message`]s.

use agenthub_core::{Error, Message, Result, Role, ToolInvocation, NO_OUTPUT};
use serde_json::Value;

/// Repair message shapes in place. Idempotent.
pub fn sanitize(messages: &mut [Message]) -> Result<()> {
    for (idx, msg) in messages.iter_mut().enumerate() {
        if msg.role != Role::Tool {
            continue;
        }
        if msg.tool_call_id.as_deref().map_or(true, str::is_empty) {
            return Err(Error::validation(format!(
                "tool message at index {} has no tool_call_id",
                idx
            )));
        }
        if msg.content.is_empty() {
            msg.content = NO_OUTPUT.to_string();
        }
    }
    Ok(())
}

/// Convert raw JSON messages into typed ones.
///
/// Absent or null content becomes `""`; non-string content becomes its JSON
/// text. Roles outside the fixed set are rejected. Tool calls are accepted
/// either in the internal shape (`tool_name`, `arguments` object) or in the
/// chat-completions shape (`function.name`, `function.arguments` string).
pub fn parse_history(raw: Vec<Value>) -> Result<Vec<Message>> {
    raw.into_iter()
        .enumerate()
        .map(|(idx, value)| parse_message(idx, value))
        .collect()
}

fn parse_message(idx: usize, value: Value) -> Result<Message> {
    let Value::Object(mut obj) = value else {
        return Err(Error::validation(format!("message {} is not an object", idx)));
    };

    let role_name = obj.get("role").and_then(Value::as_str).unwrap_or("");
    let role = Role::parse(role_name).ok_or_else(|| {
        Error::validation(format!("message {} has invalid role {:?}", idx, role_name))
    })?;

    let content = match obj.remove("content") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    };

    let tool_calls = match obj.remove("tool_calls") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(calls)) => calls
            .into_iter()
            .map(|c| parse_tool_call(idx, c))
            .collect::<Result<Vec<_>>>()?,
        Some(_) => {
            return Err(Error::validation(format!(
                "message {} has non-array tool_calls",
                idx
            )))
        }
    };

    let tool_call_id = obj
        .get("tool_call_id")
        .and_then(Value::as_str)
        .map(String::from);

    Ok(Message {
        role,
        content,
        tool_calls: if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        },
        tool_call_id,
    })
}

fn parse_tool_call(idx: usize, value: Value) -> Result<ToolInvocation> {
    let id = value.get("id").and_then(Value::as_str);
    let function = value.get("function");
    let name = value
        .get("tool_name")
        .or_else(|| function.and_then(|f| f.get("name")))
        .and_then(Value::as_str);

    let (Some(id), Some(name)) = (id, name) else {
        return Err(Error::validation(format!(
            "message {} has a tool call without id or name",
            idx
        )));
    };

    let arguments = match value
        .get("arguments")
        .or_else(|| function.and_then(|f| f.get("arguments")))
    {
        Some(Value::String(s)) => agenthub_llm::decode_arguments(s).map_err(|e| {
            Error::validation(format!("message {} tool call {} arguments: {}", idx, id, e))
        })?,
        Some(v @ Value::Object(_)) => v.clone(),
        _ => Value::Object(Default::default()),
    };

    Ok(ToolInvocation::new(id, name, arguments))
}
