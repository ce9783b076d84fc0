//! Terminal session adapter: bridges a terminal channel and a rendering
//! surface.

use studio_channel::ChannelEvent;
use studio_channel::ConnectionState;
use studio_channel::OutboundSink;
use studio_protocol::terminal::TerminalFrame;
use studio_protocol::terminal::TerminalSize;
use tracing::debug;
use tracing::info;

/// The widget that renders terminal output.
pub trait TerminalSurface {
    fn write(&mut self, data: &str);

    /// Re-measure the surface and return its new size.
    fn fit(&mut self) -> TerminalSize;

    fn size(&self) -> TerminalSize;
}

pub struct TerminalSession<S> {
    surface: S,
    wake_on_connect: bool,
}

impl<S: TerminalSurface> TerminalSession<S> {
    pub fn new(surface: S, wake_on_connect: bool) -> Self {
        Self {
            surface,
            wake_on_connect,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn handle_channel_event<K: OutboundSink>(
        &mut self,
        event: ChannelEvent<TerminalFrame>,
        sink: &K,
    ) {
        match event {
            ChannelEvent::State(ConnectionState::Open) => self.on_open(sink),
            ChannelEvent::State(state) => debug!("terminal channel {state:?}"),
            ChannelEvent::Event(TerminalFrame::Output { data }) => self.surface.write(&data),
            ChannelEvent::Event(frame @ (TerminalFrame::Input { .. } | TerminalFrame::Resize { .. })) => {
                debug!("ignoring inbound terminal frame {frame:?}");
            }
            ChannelEvent::Unknown(text) => debug!("ignoring unrecognised terminal frame {text}"),
            ChannelEvent::Raw(raw) => self.surface.write(&raw),
            ChannelEvent::ReconnectScheduled { attempt, delay } => {
                info!("terminal reconnect attempt {attempt} in {delay:?}");
            }
        }
    }

    /// Forward a local keystroke. Dropped, not queued, while the channel is
    /// not open.
    pub fn key<K: OutboundSink>(&mut self, data: &str, sink: &K) -> bool {
        sink.send_json(&TerminalFrame::input(data))
    }

    /// The surface was resized locally. Always re-fits; the new size is only
    /// sent while the channel is open.
    pub fn resize<K: OutboundSink>(&mut self, sink: &K) -> TerminalSize {
        let size = self.surface.fit();
        if sink.is_open() {
            sink.send_json(&TerminalFrame::resize(size));
        }
        size
    }

    fn on_open<K: OutboundSink>(&mut self, sink: &K) {
        // Best-effort prompt nudge; the shell never acknowledges it.
        if self.wake_on_connect {
            sink.send_json(&TerminalFrame::input("\n"));
        }
        sink.send_json(&TerminalFrame::resize(self.surface.size()));
    }
}
