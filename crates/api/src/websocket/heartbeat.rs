//! Heartbeat monitor
//!
//! Periodically probes every connection with a WebSocket ping. A connection
//! that has not answered the previous ping by the next sweep is terminated,
//! so a dead peer is reaped within two periods.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::connection::Probe;
use super::registry::ConnectionRegistry;

/// Default sweep period
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Outcome of a single sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub pinged: usize,
    pub terminated: usize,
}

pub struct HeartbeatMonitor {
    registry: ConnectionRegistry,
    interval: Duration,
}

impl HeartbeatMonitor {
    pub fn new(registry: ConnectionRegistry, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Probe every connection once
    pub async fn sweep(&self) -> SweepStats {
        let mut stats = SweepStats::default();

        self.registry
            .for_each(|conn| match conn.probe() {
                Probe::Pinged => stats.pinged += 1,
                Probe::Terminated => {
                    stats.terminated += 1;
                    tracing::info!(connection_id = %conn.id, "Terminating dead connection");
                }
            })
            .await;

        if stats.terminated > 0 {
            tracing::info!(
                pinged = stats.pinged,
                terminated = stats.terminated,
                "Heartbeat sweep evicted connections"
            );
        } else {
            tracing::trace!(pinged = stats.pinged, "Heartbeat sweep");
        }

        stats
    }

    /// Run sweeps forever. The first sweep happens one full period after start.
    pub async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Heartbeat monitor started"
        );

        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::{Connection, Outbound};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_silent_connection_evicted_on_second_sweep() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = registry.add(Connection::new(tx)).await;
        let monitor = HeartbeatMonitor::new(registry.clone(), DEFAULT_HEARTBEAT_INTERVAL);

        assert_eq!(
            monitor.sweep().await,
            SweepStats {
                pinged: 1,
                terminated: 0
            }
        );
        assert_eq!(rx.recv().await, Some(Outbound::Ping));
        assert!(!conn.is_terminated());

        assert_eq!(
            monitor.sweep().await,
            SweepStats {
                pinged: 0,
                terminated: 1
            }
        );
        assert!(conn.is_terminated());
    }

    #[tokio::test]
    async fn test_responsive_connection_survives_many_sweeps() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = registry.add(Connection::new(tx)).await;
        let monitor = HeartbeatMonitor::new(registry.clone(), DEFAULT_HEARTBEAT_INTERVAL);

        for _ in 0..20 {
            monitor.sweep().await;
            assert_eq!(rx.recv().await, Some(Outbound::Ping));
            conn.mark_alive();
        }
        assert!(!conn.is_terminated());
    }

    #[tokio::test]
    async fn test_sweeps_are_independent_per_connection() {
        let registry = ConnectionRegistry::new();
        let (tx_live, _rx_live) = mpsc::unbounded_channel();
        let (tx_dead, _rx_dead) = mpsc::unbounded_channel();
        let live = registry.add(Connection::new(tx_live)).await;
        let dead = registry.add(Connection::new(tx_dead)).await;
        let monitor = HeartbeatMonitor::new(registry.clone(), DEFAULT_HEARTBEAT_INTERVAL);

        monitor.sweep().await;
        live.mark_alive();
        let stats = monitor.sweep().await;

        assert_eq!(stats.pinged, 1);
        assert_eq!(stats.terminated, 1);
        assert!(dead.is_terminated());
        assert!(!live.is_terminated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_one_period_before_first_sweep() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.add(Connection::new(tx)).await;

        let handle = HeartbeatMonitor::new(registry, Duration::from_secs(10)).spawn();

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.try_recv(), Ok(Outbound::Ping));

        handle.abort();
    }
}
