use std::time::Duration;

use crate::BackoffPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Identity of a scheduled reconnect timer. Timers that fire after they were
/// superseded or cancelled are recognised by id and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// What the driver must do after a close: wait `delay`, then report
/// `timer` back through [`ReconnectState::on_timer_fired`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPlan {
    pub timer: TimerId,
    pub delay: Duration,
    /// Consecutive failures so far, including this one.
    pub attempt: u32,
}

/// Reconnect bookkeeping for one channel session.
///
/// Invariants:
/// - at most one reconnect timer is pending at any time;
/// - once [`ReconnectState::shutdown`] has run no transition schedules or
///   accepts a reconnect again.
#[derive(Debug, Clone)]
pub struct ReconnectState {
    policy: BackoffPolicy,
    state: ConnectionState,
    retry_count: u32,
    last_delay: Duration,
    pending_timer: Option<TimerId>,
    next_timer_id: u64,
    shut_down: bool,
}

impl ReconnectState {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Connecting,
            retry_count: 0,
            last_delay: policy.short_delay,
            pending_timer: None,
            next_timer_id: 0,
            shut_down: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn last_delay(&self) -> Duration {
        self.last_delay
    }

    pub fn pending_timer(&self) -> Option<TimerId> {
        self.pending_timer
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// The socket finished its handshake. Returns `false` when the channel
    /// was shut down meanwhile and the socket must be discarded.
    pub fn on_open(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        self.state = ConnectionState::Open;
        self.retry_count = 0;
        self.last_delay = self.policy.short_delay;
        true
    }

    /// The socket closed, failed to connect, or its health probe failed.
    ///
    /// Returns the reconnect to schedule, or `None` when one is already
    /// pending or the channel has been shut down.
    pub fn on_close(&mut self) -> Option<ReconnectPlan> {
        self.state = ConnectionState::Closed;
        if self.shut_down || self.pending_timer.is_some() {
            return None;
        }
        self.retry_count = self.retry_count.saturating_add(1);
        let delay = self.policy.delay_for(self.retry_count);
        self.last_delay = delay;
        let timer = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        self.pending_timer = Some(timer);
        Some(ReconnectPlan {
            timer,
            delay,
            attempt: self.retry_count,
        })
    }

    /// A reconnect timer elapsed. Returns `true` when the driver should
    /// start a new connection attempt.
    pub fn on_timer_fired(&mut self, timer: TimerId) -> bool {
        if self.shut_down || self.pending_timer != Some(timer) {
            return false;
        }
        self.pending_timer = None;
        self.state = ConnectionState::Connecting;
        true
    }

    /// Explicit close. Terminal: the pending timer (if any) is returned so the
    /// caller can cancel it, and no reconnect is ever scheduled afterwards.
    pub fn shutdown(&mut self) -> Option<TimerId> {
        self.shut_down = true;
        self.state = ConnectionState::Closed;
        self.pending_timer.take()
    }
}
