//! Liveness monitoring
//!
//! A single task pings every registered channel once per `ping_period` and
//! disconnects channels whose last-seen time is older than `ping_timeout`.
//! A pong clears the channel's entry, so the next cycle seeds it afresh.
//!
//! Cycles run on absolute deadlines (`next = previous + ping_period`) taken
//! from tokio's monotonic clock, so the time spent inside a cycle does not
//! shift later cycles. If the task falls behind by more than a period the
//! missed deadlines are skipped rather than replayed back to back.

use crate::network::message::Message;
use crate::network::peer::{ChannelId, PeerChannel};
use crate::network::registry::ChannelRegistry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Outcome of checking one channel during a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ping,
    Timeout { elapsed: Duration },
}

/// Last-seen timestamps keyed by channel id
#[derive(Debug, Default)]
pub struct LivenessTable {
    last_seen: HashMap<ChannelId, Instant>,
}

impl LivenessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide what to do with `channel` at `now`. A channel seen for the first
    /// time is seeded with `now`; a timed out channel loses its entry.
    pub fn check(&mut self, channel: ChannelId, now: Instant, timeout: Duration) -> Verdict {
        let seen = *self.last_seen.entry(channel).or_insert(now);
        let elapsed = now.saturating_duration_since(seen);

        if elapsed > timeout {
            self.last_seen.remove(&channel);
            Verdict::Timeout { elapsed }
        } else {
            Verdict::Ping
        }
    }

    /// Clear the entry after a pong. Returns the time since it was seeded.
    pub fn clear(&mut self, channel: ChannelId, now: Instant) -> Option<Duration> {
        self.last_seen
            .remove(&channel)
            .map(|seen| now.saturating_duration_since(seen))
    }

    /// Drop the entry of a channel that went away
    pub fn forget(&mut self, channel: ChannelId) -> bool {
        self.last_seen.remove(&channel).is_some()
    }

    /// Drop entries for channels not in `live`
    pub fn retain_live(&mut self, live: &HashSet<ChannelId>) {
        self.last_seen.retain(|id, _| live.contains(id));
    }

    pub fn last_seen(&self, channel: ChannelId) -> Option<Instant> {
        self.last_seen.get(&channel).copied()
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

/// Notifications delivered to the monitor task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessEvent {
    Pong(ChannelId),
    Forget(ChannelId),
}

/// Summary of one liveness cycle
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub pinged: usize,
    pub disconnected: Vec<ChannelId>,
}

/// Owner of the liveness table. Runs either driven by hand (`run_cycle`,
/// `handle_event`) or as a spawned task.
pub struct LivenessMonitor<C> {
    registry: Arc<ChannelRegistry<C>>,
    table: LivenessTable,
    ping_period: Duration,
    ping_timeout: Duration,
}

impl<C: PeerChannel> LivenessMonitor<C> {
    pub fn new(
        registry: Arc<ChannelRegistry<C>>,
        ping_period: Duration,
        ping_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            table: LivenessTable::new(),
            ping_period,
            ping_timeout,
        }
    }

    pub fn table(&self) -> &LivenessTable {
        &self.table
    }

    /// Ping or disconnect every channel registered at cycle start
    pub async fn run_cycle(&mut self) -> CycleReport {
        let snapshot = self.registry.snapshot().await;
        let live: HashSet<ChannelId> = snapshot.iter().map(|(id, _)| *id).collect();
        self.table.retain_live(&live);

        let mut report = CycleReport::default();

        for (id, channel) in snapshot {
            let now = Instant::now();
            match self.table.check(id, now, self.ping_timeout) {
                Verdict::Timeout { elapsed } => {
                    log::warn!(
                        ">>>> PING [{:>18}] {:.2}s (TIMEOUT), disconnecting {}",
                        channel.connection_id(),
                        elapsed.as_secs_f64(),
                        channel.peer_ip()
                    );
                    self.registry.unregister(id).await;
                    channel.disconnect();
                    report.disconnected.push(id);
                }
                Verdict::Ping => {
                    if let Err(e) = channel.send(Message::ping()) {
                        log::warn!("Failed to ping {}: {}", channel.connection_id(), e);
                    }
                    report.pinged += 1;
                }
            }
        }

        report
    }

    /// Apply a pong or forget notification
    pub fn handle_event(&mut self, event: LivenessEvent) {
        match event {
            LivenessEvent::Pong(id) => {
                if let Some(elapsed) = self.table.clear(id, Instant::now()) {
                    log::trace!(">>>> PONG [{}] {:.2}s", id, elapsed.as_secs_f64());
                }
            }
            LivenessEvent::Forget(id) => {
                self.table.forget(id);
            }
        }
    }

    /// Start the recurring cycle on its own task
    pub fn spawn(self) -> LivenessHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(events_rx, shutdown_rx));

        LivenessHandle {
            events: events_tx,
            shutdown: shutdown_tx,
            task: Mutex::new(Some(task)),
        }
    }

    async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<LivenessEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = interval_at(Instant::now(), self.ping_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!(
            "Liveness monitor started (period {:?}, timeout {:?})",
            self.ping_period,
            self.ping_timeout
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => break,

                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },

                _ = ticker.tick() => {
                    let report = self.run_cycle().await;
                    log::debug!(
                        "Liveness cycle: pinged {}, disconnected {}",
                        report.pinged,
                        report.disconnected.len()
                    );
                }
            }
        }

        log::info!("Liveness monitor stopped");
    }
}

/// Handle to a running liveness monitor
pub struct LivenessHandle {
    events: mpsc::UnboundedSender<LivenessEvent>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LivenessHandle {
    /// Report a pong received on `channel`
    pub fn pong(&self, channel: ChannelId) {
        self.notify(LivenessEvent::Pong(channel));
    }

    /// Report that `channel` is gone
    pub fn forget(&self, channel: ChannelId) {
        self.notify(LivenessEvent::Forget(channel));
    }

    fn notify(&self, event: LivenessEvent) {
        if self.events.send(event).is_err() {
            log::debug!("Liveness monitor not running, dropped {:?}", event);
        }
    }

    /// Stop the cycle and wait for the task to finish
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                log::error!("Liveness monitor task failed: {}", e);
            }
        }
    }

    /// Whether the monitor task is still running
    pub async fn is_running(&self) -> bool {
        match self.task.lock().await.as_ref() {
            Some(task) => !task.is_finished(),
            None => false,
        }
    }
}
