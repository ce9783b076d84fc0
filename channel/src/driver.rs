use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::sync::DropGuard;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::BackoffPolicy;
use crate::ChannelError;
use crate::ConnectionState;
use crate::Inbound;
use crate::OutboundSink;
use crate::ReconnectState;
use crate::Socket;
use crate::Transport;
use crate::decode_frame;

/// Everything a channel reports to its owner, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent<E> {
    State(ConnectionState),
    Event(E),
    /// Inbound JSON frame that did not decode as `E`.
    Unknown(String),
    /// Inbound frame that was not JSON.
    Raw(String),
    ReconnectScheduled {
        attempt: u32,
        delay: Duration,
    },
}

/// Cloneable sending half of a [`Channel`].
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    state: watch::Receiver<ConnectionState>,
    outbound: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

impl ChannelHandle {
    /// Explicit close. No reconnect is attempted afterwards.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl OutboundSink for ChannelHandle {
    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn send_text(&self, text: String) -> bool {
        if !self.is_open() {
            debug!("dropping outbound frame: channel not open");
            return false;
        }
        self.outbound.send(text).is_ok()
    }
}

/// A self-reconnecting channel whose inbound frames decode into `E`.
///
/// Dropping the channel stops the background task.
pub struct Channel<E> {
    handle: ChannelHandle,
    events: mpsc::UnboundedReceiver<ChannelEvent<E>>,
    task: JoinHandle<()>,
    _guard: DropGuard,
}

impl<E> Channel<E>
where
    E: DeserializeOwned + Send + 'static,
{
    /// Start connecting immediately. Must be called inside a tokio runtime.
    pub fn open<T: Transport>(transport: T, policy: BackoffPolicy) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let _ = events_tx.send(ChannelEvent::State(ConnectionState::Connecting));
        let driver = Driver {
            transport,
            machine: ReconnectState::new(policy),
            state_tx,
            outbound_rx,
            events_tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(driver.run());

        Self {
            handle: ChannelHandle {
                state: state_rx,
                outbound: outbound_tx,
                cancel: cancel.clone(),
            },
            events,
            task,
            _guard: cancel.drop_guard(),
        }
    }
}

impl<E> Channel<E> {
    pub fn handle(&self) -> ChannelHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.handle.state()
    }

    pub async fn next_event(&mut self) -> Option<ChannelEvent<E>> {
        self.events.recv().await
    }

    /// Close the channel and wait for the background task to finish.
    pub async fn shutdown(self) {
        let Channel {
            handle,
            task,
            _guard,
            ..
        } = self;
        handle.close();
        if let Err(err) = task.await {
            warn!("channel task ended abnormally: {err}");
        }
    }
}

struct Driver<T: Transport, E> {
    transport: T,
    machine: ReconnectState,
    state_tx: watch::Sender<ConnectionState>,
    outbound_rx: mpsc::UnboundedReceiver<String>,
    events_tx: mpsc::UnboundedSender<ChannelEvent<E>>,
    cancel: CancellationToken,
}

impl<T, E> Driver<T, E>
where
    T: Transport,
    E: DeserializeOwned + Send + 'static,
{
    async fn run(mut self) {
        let cancel = self.cancel.clone();
        loop {
            self.set_state(ConnectionState::Connecting);
            let attempt = tokio::select! {
                _ = cancel.cancelled() => break,
                result = establish(&self.transport) => result,
            };

            match attempt {
                Ok(mut socket) => {
                    if self.machine.on_open() {
                        self.drain_outbound();
                        self.set_state(ConnectionState::Open);
                        info!("channel open");
                        self.pump(&mut socket).await;
                    }
                    self.set_state(ConnectionState::Closed);
                    self.drain_outbound();
                    socket.close().await;
                }
                Err(err) => warn!("channel connection attempt failed: {err}"),
            }
            if cancel.is_cancelled() {
                break;
            }

            self.set_state(ConnectionState::Closed);
            let Some(plan) = self.machine.on_close() else {
                break;
            };
            debug!("reconnect attempt {} in {:?}", plan.attempt, plan.delay);
            self.emit(ChannelEvent::ReconnectScheduled {
                attempt: plan.attempt,
                delay: plan.delay,
            });
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(plan.delay) => {}
            }
            if !self.machine.on_timer_fired(plan.timer) {
                break;
            }
        }

        self.machine.shutdown();
        self.set_state(ConnectionState::Closed);
        self.drain_outbound();
        debug!("channel task finished");
    }

    /// Shuttle frames until the socket closes or the channel is cancelled.
    async fn pump(&mut self, socket: &mut T::Socket) {
        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                inbound = socket.recv_text() => match inbound {
                    Some(Ok(text)) => self.dispatch(&text),
                    Some(Err(err)) => {
                        warn!("channel receive failed: {err}");
                        return;
                    }
                    None => {
                        info!("channel closed by peer");
                        return;
                    }
                },
                outbound = self.outbound_rx.recv() => match outbound {
                    Some(text) => {
                        if let Err(err) = socket.send_text(text).await {
                            warn!("channel send failed: {err}");
                            return;
                        }
                    }
                    None => return,
                },
            }
        }
    }

    fn dispatch(&self, text: &str) {
        match decode_frame::<E>(text) {
            Inbound::Event(event) => self.emit(ChannelEvent::Event(event)),
            Inbound::Unknown(text) => self.emit(ChannelEvent::Unknown(text)),
            Inbound::Raw(raw) => self.emit(ChannelEvent::Raw(raw)),
        }
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            self.emit(ChannelEvent::State(next));
        }
    }

    /// Frames queued while the socket was unavailable are discarded.
    fn drain_outbound(&mut self) {
        let mut dropped = 0usize;
        while self.outbound_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!("dropped {dropped} stale outbound frame(s)");
        }
    }

    fn emit(&self, event: ChannelEvent<E>) {
        let _ = self.events_tx.send(event);
    }
}

async fn establish<T: Transport>(transport: &T) -> Result<T::Socket, ChannelError> {
    transport.probe().await?;
    transport.connect().await
}
