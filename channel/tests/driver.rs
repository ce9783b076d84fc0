#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use studio_channel::BackoffPolicy;
use studio_channel::Channel;
use studio_channel::ChannelError;
use studio_channel::ChannelEvent;
use studio_channel::ConnectionState;
use studio_channel::OutboundSink;
use studio_channel::Socket;
use studio_channel::Transport;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::time::timeout;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TestEvent {
    Ping { n: u32 },
}

struct FakeSocket {
    inbound: mpsc::UnboundedReceiver<String>,
    sent: mpsc::UnboundedSender<String>,
}

/// Test-side ends of a [`FakeSocket`].
struct Peer {
    feed: mpsc::UnboundedSender<String>,
    sent: mpsc::UnboundedReceiver<String>,
}

fn socket_pair() -> (FakeSocket, Peer) {
    let (feed, inbound) = mpsc::unbounded_channel();
    let (sent_tx, sent) = mpsc::unbounded_channel();
    (
        FakeSocket {
            inbound,
            sent: sent_tx,
        },
        Peer { feed, sent },
    )
}

#[async_trait]
impl Socket for FakeSocket {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        self.sent.send(text).map_err(|_| ChannelError::Closed)
    }

    async fn recv_text(&mut self) -> Option<Result<String, ChannelError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) {}
}

enum Step {
    Ready(FakeSocket),
    Fail,
    Gate(oneshot::Receiver<FakeSocket>),
}

#[derive(Default)]
struct FakeTransport {
    steps: Mutex<VecDeque<Step>>,
    probe_failures: Mutex<VecDeque<()>>,
    connects: Arc<AtomicUsize>,
}

impl FakeTransport {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            ..Default::default()
        }
    }

    fn failing_probes(self, count: usize) -> Self {
        *self.probe_failures.lock().unwrap() = (0..count).map(|_| ()).collect();
        self
    }
}

#[async_trait]
impl Transport for FakeTransport {
    type Socket = FakeSocket;

    async fn probe(&self) -> Result<(), ChannelError> {
        match self.probe_failures.lock().unwrap().pop_front() {
            Some(()) => Err(ChannelError::Probe("HTTP 503 Service Unavailable".into())),
            None => Ok(()),
        }
    }

    async fn connect(&self) -> Result<FakeSocket, ChannelError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Ready(socket)) => Ok(socket),
            Some(Step::Fail) => Err(ChannelError::Closed),
            Some(Step::Gate(gate)) => gate.await.map_err(|_| ChannelError::Closed),
            None => std::future::pending().await,
        }
    }
}

async fn next(channel: &mut Channel<TestEvent>) -> ChannelEvent<TestEvent> {
    timeout(Duration::from_secs(60), channel.next_event())
        .await
        .expect("event before timeout")
        .expect("channel still running")
}

async fn expect_state(channel: &mut Channel<TestEvent>, state: ConnectionState) {
    assert_eq!(next(channel).await, ChannelEvent::State(state));
}

#[tokio::test(start_paused = true)]
async fn decodes_frames_and_forwards_malformed_ones_raw() {
    let (socket, peer) = socket_pair();
    let mut channel = Channel::open(
        FakeTransport::new(vec![Step::Ready(socket)]),
        BackoffPolicy::default(),
    );
    expect_state(&mut channel, ConnectionState::Connecting).await;
    expect_state(&mut channel, ConnectionState::Open).await;

    peer.feed.send(r#"{"type":"ping","n":7}"#.into()).unwrap();
    peer.feed.send(r#"{"type":"bell"}"#.into()).unwrap();
    peer.feed.send("not json".into()).unwrap();

    assert_eq!(next(&mut channel).await, ChannelEvent::Event(TestEvent::Ping { n: 7 }));
    assert_eq!(
        next(&mut channel).await,
        ChannelEvent::Unknown(r#"{"type":"bell"}"#.into())
    );
    assert_eq!(next(&mut channel).await, ChannelEvent::Raw("not json".into()));
}

#[tokio::test(start_paused = true)]
async fn sends_before_open_are_dropped_not_queued() {
    let (socket, mut peer) = socket_pair();
    let (release, gate) = oneshot::channel();
    let mut channel = Channel::open(
        FakeTransport::new(vec![Step::Gate(gate)]),
        BackoffPolicy::default(),
    );
    let handle = channel.handle();
    expect_state(&mut channel, ConnectionState::Connecting).await;

    assert!(!handle.send_text("early".into()));

    release.send(socket).ok();
    expect_state(&mut channel, ConnectionState::Open).await;
    assert!(handle.send_text("late".into()));

    let delivered = timeout(Duration::from_secs(5), peer.sent.recv())
        .await
        .expect("frame delivered");
    assert_eq!(delivered.as_deref(), Some("late"));
    assert!(peer.sent.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn peer_close_schedules_short_reconnect() {
    let (first, first_peer) = socket_pair();
    let (second, _second_peer) = socket_pair();
    let transport = FakeTransport::new(vec![Step::Ready(first), Step::Ready(second)]);
    let connects = Arc::clone(&transport.connects);
    let policy = BackoffPolicy::default();
    let mut channel = Channel::open(transport, policy);
    expect_state(&mut channel, ConnectionState::Connecting).await;
    expect_state(&mut channel, ConnectionState::Open).await;

    drop(first_peer);

    expect_state(&mut channel, ConnectionState::Closed).await;
    assert_eq!(
        next(&mut channel).await,
        ChannelEvent::ReconnectScheduled {
            attempt: 1,
            delay: policy.short_delay,
        }
    );
    let started = tokio::time::Instant::now();
    expect_state(&mut channel, ConnectionState::Connecting).await;
    assert!(started.elapsed() >= policy.short_delay);
    expect_state(&mut channel, ConnectionState::Open).await;
    assert_eq!(connects.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_probe_skips_connect_and_retries() {
    let (socket, _peer) = socket_pair();
    let transport = FakeTransport::new(vec![Step::Ready(socket)]).failing_probes(1);
    let connects = Arc::clone(&transport.connects);
    let mut channel = Channel::open(transport, BackoffPolicy::default());

    expect_state(&mut channel, ConnectionState::Connecting).await;
    expect_state(&mut channel, ConnectionState::Closed).await;
    assert!(matches!(
        next(&mut channel).await,
        ChannelEvent::ReconnectScheduled { attempt: 1, .. }
    ));
    assert_eq!(connects.load(Ordering::SeqCst), 0);

    expect_state(&mut channel, ConnectionState::Connecting).await;
    expect_state(&mut channel, ConnectionState::Open).await;
    assert_eq!(connects.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn fourth_consecutive_failure_waits_long_delay() {
    let policy = BackoffPolicy::default();
    let mut channel = Channel::<TestEvent>::open(
        FakeTransport::new(vec![Step::Fail, Step::Fail, Step::Fail, Step::Fail]),
        policy,
    );

    let mut delays = Vec::new();
    while delays.len() < 4 {
        if let ChannelEvent::ReconnectScheduled { delay, .. } = next(&mut channel).await {
            delays.push(delay);
        }
    }

    assert_eq!(
        delays,
        vec![
            policy.short_delay,
            policy.short_delay,
            policy.short_delay,
            policy.long_delay,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn close_while_reconnect_pending_stops_for_good() {
    let transport = FakeTransport::new(vec![Step::Fail]);
    let connects = Arc::clone(&transport.connects);
    let mut channel = Channel::<TestEvent>::open(transport, BackoffPolicy::default());

    loop {
        if let ChannelEvent::ReconnectScheduled { .. } = next(&mut channel).await {
            break;
        }
    }
    let handle = channel.handle();
    handle.close();
    channel.shutdown().await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connects.load(Ordering::SeqCst), 1);
    assert_eq!(handle.state(), ConnectionState::Closed);
    assert!(!handle.send_text("after close".into()));
}
