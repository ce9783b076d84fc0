use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::MessageId;

/// Fields shared by every chat envelope, with a payload specific to the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFrame<P> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message_id: MessageId,
    pub payload: P,
}

/// Events exchanged on the chat session channel, discriminated by `type`.
///
/// `User` is the only outbound kind; everything else arrives from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    User(ChatFrame<TextPayload>),
    Partial(ChatFrame<TextPayload>),
    Final(ChatFrame<FinalPayload>),
    ToolRequest(ChatFrame<JsonValue>),
    ToolResult(ChatFrame<JsonValue>),
    Error(ChatFrame<JsonValue>),
}

impl ChatEvent {
    /// Build the outbound envelope for a user prompt.
    pub fn user(session_id: impl Into<String>, message_id: MessageId, text: impl Into<String>) -> Self {
        ChatEvent::User(ChatFrame {
            session_id: Some(session_id.into()),
            message_id,
            payload: TextPayload { text: text.into() },
        })
    }

    pub fn message_id(&self) -> &MessageId {
        match self {
            ChatEvent::User(frame) | ChatEvent::Partial(frame) => &frame.message_id,
            ChatEvent::Final(frame) => &frame.message_id,
            ChatEvent::ToolRequest(frame)
            | ChatEvent::ToolResult(frame)
            | ChatEvent::Error(frame) => &frame.message_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPayload {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalPayload {
    #[serde(default)]
    pub done: bool,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn partial_envelope_decodes() {
        let raw = json!({
            "type": "partial",
            "sessionId": "local",
            "messageId": "m-1",
            "payload": {"text": "Hel"}
        });
        let event: ChatEvent = serde_json::from_value(raw).expect("partial");
        assert_eq!(
            event,
            ChatEvent::Partial(ChatFrame {
                session_id: Some("local".to_string()),
                message_id: MessageId::from("m-1"),
                payload: TextPayload {
                    text: "Hel".to_string()
                },
            })
        );
    }

    #[test]
    fn user_envelope_uses_camel_case_fields() {
        let event = ChatEvent::user("local", MessageId::from("abc"), "hi");
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(
            value,
            json!({
                "type": "user",
                "sessionId": "local",
                "messageId": "abc",
                "payload": {"text": "hi"}
            })
        );
    }

    #[test]
    fn tool_events_keep_arbitrary_payloads() {
        let raw = r#"{"type":"tool_result","sessionId":"s","messageId":"m","payload":{"name":"ls","output":["a","b"]}}"#;
        let event: ChatEvent = serde_json::from_str(raw).expect("tool_result");
        match event {
            ChatEvent::ToolResult(frame) => {
                assert_eq!(frame.payload, json!({"name": "ls", "output": ["a", "b"]}));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let raw = r#"{"type":"event","messageId":"m","payload":{}}"#;
        assert!(serde_json::from_str::<ChatEvent>(raw).is_err());
    }
}
