//! Chat session reducer: folds chat channel events into a transcript.

use serde_json::Value as JsonValue;
use studio_channel::ChannelEvent;
use studio_channel::ConnectionState;
use studio_channel::OutboundSink;
use studio_protocol::MessageId;
use studio_protocol::chat::ChatEvent;
use tracing::debug;
use tracing::warn;

use crate::error::Result;
use crate::error::StudioErr;
use crate::notifications::Notifications;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Prompt text or streamed assistant output.
    Message,
    /// Description of a tool request/result or backend error.
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub kind: EntryKind,
    pub text: String,
}

impl TranscriptEntry {
    fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            kind: EntryKind::Message,
            text: text.into(),
        }
    }

    fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            kind: EntryKind::Message,
            text: text.into(),
        }
    }

    fn synthetic(text: String) -> Self {
        Self {
            role: Role::Assistant,
            kind: EntryKind::Synthetic,
            text,
        }
    }

    fn is_assistant_message(&self) -> bool {
        self.role == Role::Assistant && self.kind == EntryKind::Message
    }
}

/// What applying one inbound event produced, beyond transcript changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatUpdate {
    None,
    Transcript,
    /// A `final` event closed the stream for this message.
    StreamFinished(MessageId),
}

#[derive(Debug)]
pub struct ChatSession {
    session_id: String,
    transcript: Vec<TranscriptEntry>,
    input: String,
    /// A reply is in flight: set by a send or a partial, cleared by `final`.
    streaming: bool,
    /// Index of the entry the view is pinned to.
    scroll_anchor: Option<usize>,
}

impl ChatSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            transcript: Vec::new(),
            input: String::new(),
            streaming: false,
            scroll_anchor: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn scroll_anchor(&self) -> Option<usize> {
        self.scroll_anchor
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Send the current input as a user prompt.
    ///
    /// Appends the user entry and an empty assistant placeholder, sends the
    /// envelope, then clears the input. Refused without side effects when the
    /// input is blank or the channel is not open.
    pub fn send_prompt<S: OutboundSink>(&mut self, sink: &S) -> Result<MessageId> {
        if self.input.trim().is_empty() {
            return Err(StudioErr::EmptyInput);
        }
        if !sink.is_open() {
            return Err(StudioErr::ChannelNotOpen);
        }

        let message_id = MessageId::new();
        let before = self.transcript.len();
        self.transcript.push(TranscriptEntry::user(self.input.clone()));
        self.transcript.push(TranscriptEntry::assistant(""));

        let event = ChatEvent::user(&self.session_id, message_id.clone(), self.input.clone());
        if !sink.send_json(&event) {
            // The socket closed between the state check and the send.
            self.transcript.truncate(before);
            return Err(StudioErr::ChannelNotOpen);
        }

        self.streaming = true;
        self.input.clear();
        self.pin_to_newest();
        Ok(message_id)
    }

    /// Apply one decoded inbound chat event.
    pub fn apply(&mut self, event: ChatEvent) -> ChatUpdate {
        let update = match event {
            ChatEvent::Partial(frame) => {
                self.append_partial(&frame.payload.text);
                ChatUpdate::Transcript
            }
            ChatEvent::Final(frame) => {
                self.streaming = false;
                ChatUpdate::StreamFinished(frame.message_id)
            }
            ChatEvent::ToolRequest(frame) => {
                self.push_synthetic(format!("Tool request: {}", describe(&frame.payload)));
                ChatUpdate::Transcript
            }
            ChatEvent::ToolResult(frame) => {
                self.push_synthetic(format!("Tool result: {}", describe(&frame.payload)));
                ChatUpdate::Transcript
            }
            ChatEvent::Error(frame) => {
                self.push_synthetic(format!("Error: {}", describe(&frame.payload)));
                ChatUpdate::Transcript
            }
            ChatEvent::User(frame) => {
                debug!("ignoring echoed user event {}", frame.message_id);
                ChatUpdate::None
            }
        };
        self.pin_to_newest();
        update
    }

    /// Apply a channel event: decoded events go through [`Self::apply`],
    /// connection changes become notifications.
    pub fn handle_channel_event(
        &mut self,
        event: ChannelEvent<ChatEvent>,
        notifications: &mut Notifications,
    ) -> ChatUpdate {
        match event {
            ChannelEvent::Event(event) => self.apply(event),
            ChannelEvent::Unknown(text) | ChannelEvent::Raw(text) => {
                warn!("ignoring undecodable chat frame: {text}");
                self.pin_to_newest();
                ChatUpdate::None
            }
            ChannelEvent::State(ConnectionState::Open) => {
                notifications.success("Chat connected");
                ChatUpdate::None
            }
            ChannelEvent::State(ConnectionState::Closed) => {
                notifications.error("Chat disconnected");
                ChatUpdate::None
            }
            ChannelEvent::State(ConnectionState::Connecting) => ChatUpdate::None,
            ChannelEvent::ReconnectScheduled { attempt, delay } => {
                notifications.info(format!(
                    "Reconnecting chat in {}s (attempt {attempt})",
                    delay.as_secs_f32()
                ));
                ChatUpdate::None
            }
        }
    }

    /// Partials extend the newest entry iff it is an assistant message.
    fn append_partial(&mut self, text: &str) {
        match self.transcript.last_mut() {
            Some(last) if last.is_assistant_message() => last.text.push_str(text),
            _ => self.transcript.push(TranscriptEntry::assistant(text)),
        }
        self.streaming = true;
    }

    fn push_synthetic(&mut self, text: String) {
        // An untouched placeholder would otherwise linger above the entry.
        if self
            .transcript
            .last()
            .is_some_and(|last| last.is_assistant_message() && last.text.is_empty())
        {
            self.transcript.pop();
        }
        self.transcript.push(TranscriptEntry::synthetic(text));
    }

    fn pin_to_newest(&mut self) {
        self.scroll_anchor = self.transcript.len().checked_sub(1);
    }
}

/// Human-readable rendering of a tool/error payload.
fn describe(payload: &JsonValue) -> String {
    match payload {
        JsonValue::String(text) => text.clone(),
        JsonValue::Object(map) => ["message", "text", "name"]
            .iter()
            .find_map(|key| map.get(*key).and_then(JsonValue::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| payload.to_string()),
        other => other.to_string(),
    }
}
