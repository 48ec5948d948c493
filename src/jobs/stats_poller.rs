//! Gateway stats poller.
//!
//! Refreshes every gateway's reported load on a fixed interval. The first
//! cycle runs as soon as the poller starts. A gateway whose agent cannot be
//! reached is marked unreachable so selection skips it until a later cycle
//! sees it healthy again.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::domain::Gateway;
use crate::errors::AppResult;
use crate::infra::{AgentClient, GatewayRepository};

/// Outcome counts for one poll cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Gateways whose load was updated from a fresh agent reading
    pub refreshed: usize,
    /// Gateways marked unreachable this cycle
    pub unreachable: usize,
    /// Gateways whose result could not be written back
    pub write_failures: usize,
}

enum Outcome {
    Refreshed,
    Unreachable,
    WriteFailed,
}

pub struct StatsPoller {
    gateways: Arc<dyn GatewayRepository>,
    agent: Arc<dyn AgentClient>,
    interval: Duration,
    concurrency: usize,
}

impl StatsPoller {
    pub fn new(
        gateways: Arc<dyn GatewayRepository>,
        agent: Arc<dyn AgentClient>,
        interval: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            gateways,
            agent,
            interval,
            concurrency: concurrency.max(1),
        }
    }

    /// Poll every gateway once.
    ///
    /// Fails only when the gateway list cannot be read, in which case no
    /// record has been touched.
    pub async fn run_cycle(&self) -> AppResult<CycleReport> {
        let gateways = self.gateways.list().await?;
        let total = gateways.len();

        let outcomes: Vec<Outcome> = stream::iter(gateways)
            .map(|gateway| self.poll_gateway(gateway))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = CycleReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Refreshed => report.refreshed += 1,
                Outcome::Unreachable => report.unreachable += 1,
                Outcome::WriteFailed => report.write_failures += 1,
            }
        }

        tracing::info!(
            gateways = total,
            refreshed = report.refreshed,
            unreachable = report.unreachable,
            write_failures = report.write_failures,
            "Stats poll cycle finished"
        );
        Ok(report)
    }

    async fn poll_gateway(&self, gateway: Gateway) -> Outcome {
        match self.agent.get_stats(&gateway).await {
            Ok(stats) => {
                match self
                    .gateways
                    .update_load(gateway.id, stats.active_users, stats.total_peers)
                    .await
                {
                    Ok(()) => {
                        tracing::debug!(
                            gateway = %gateway.name,
                            active_users = stats.active_users,
                            total_peers = stats.total_peers,
                            "Gateway load refreshed"
                        );
                        Outcome::Refreshed
                    }
                    Err(err) => {
                        tracing::error!(gateway = %gateway.name, error = %err, "Failed to store gateway load");
                        Outcome::WriteFailed
                    }
                }
            }
            Err(agent_err) => {
                tracing::warn!(
                    gateway = %gateway.name,
                    error = %agent_err,
                    "Gateway stats unavailable, marking unreachable"
                );
                match self.gateways.mark_unreachable(gateway.id).await {
                    Ok(()) => Outcome::Unreachable,
                    Err(err) => {
                        tracing::error!(gateway = %gateway.name, error = %err, "Failed to mark gateway unreachable");
                        Outcome::WriteFailed
                    }
                }
            }
        }
    }

    /// Poll until `shutdown` is cancelled. A cycle in progress is abandoned
    /// on cancellation.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            concurrency = self.concurrency,
            "Stats poller started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.run_cycle() => {
                    if let Err(err) = result {
                        tracing::error!(error = %err, "Stats poll cycle aborted: could not list gateways");
                    }
                }
            }
        }

        tracing::info!("Stats poller stopped");
    }

    /// Run on a background task.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mockall::predicate::eq;
    use uuid::Uuid;

    use super::*;
    use crate::domain::GatewayHealth;
    use crate::errors::AppError;
    use crate::infra::{AgentError, AgentStats, MockAgentClient, MockGatewayRepository};

    fn gateway(name: &str, load: i32, total_peers: u32) -> Gateway {
        Gateway {
            id: Uuid::new_v4(),
            name: name.to_string(),
            api_endpoint: format!("http://{}.example.com:8000", name),
            api_key: "k".into(),
            subnet: "10.10.0.0/16".parse().unwrap(),
            public_key: "GWPUB=".into(),
            health: GatewayHealth::from_stored(load),
            total_peers,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_timeout_marks_only_that_gateway() {
        let down = gateway("down", 5, 40);
        let up = gateway("up", 1, 3);
        let (down_id, up_id) = (down.id, up.id);
        let listed = vec![down, up];

        let mut gateways = MockGatewayRepository::new();
        gateways
            .expect_list()
            .times(1)
            .returning(move || Ok(listed.clone()));
        gateways
            .expect_mark_unreachable()
            .with(eq(down_id))
            .times(1)
            .returning(|_| Ok(()));
        gateways
            .expect_update_load()
            .with(eq(up_id), eq(4), eq(9))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut agent = MockAgentClient::new();
        agent.expect_get_stats().returning(|gw| {
            if gw.name == "down" {
                Err(AgentError::Timeout)
            } else {
                Ok(AgentStats {
                    active_users: 4,
                    total_peers: 9,
                })
            }
        });

        let poller = StatsPoller::new(
            Arc::new(gateways),
            Arc::new(agent),
            Duration::from_secs(30),
            4,
        );
        let report = poller.run_cycle().await.unwrap();
        assert_eq!(
            report,
            CycleReport {
                refreshed: 1,
                unreachable: 1,
                write_failures: 0
            }
        );
    }

    #[tokio::test]
    async fn test_list_failure_touches_nothing() {
        let mut gateways = MockGatewayRepository::new();
        gateways
            .expect_list()
            .returning(|| Err(AppError::internal("db down")));
        gateways.expect_update_load().never();
        gateways.expect_mark_unreachable().never();

        let mut agent = MockAgentClient::new();
        agent.expect_get_stats().never();

        let poller = StatsPoller::new(
            Arc::new(gateways),
            Arc::new(agent),
            Duration::from_secs(30),
            4,
        );
        assert!(poller.run_cycle().await.is_err());
    }

    #[tokio::test]
    async fn test_write_failure_is_isolated() {
        let a = gateway("a", 0, 0);
        let b = gateway("b", 0, 0);
        let a_id = a.id;
        let listed = vec![a, b];

        let mut gateways = MockGatewayRepository::new();
        gateways.expect_list().returning(move || Ok(listed.clone()));
        gateways.expect_update_load().returning(move |id, _, _| {
            if id == a_id {
                Err(AppError::internal("write failed"))
            } else {
                Ok(())
            }
        });

        let mut agent = MockAgentClient::new();
        agent.expect_get_stats().returning(|_| {
            Ok(AgentStats {
                active_users: 2,
                total_peers: 2,
            })
        });

        let poller = StatsPoller::new(
            Arc::new(gateways),
            Arc::new(agent),
            Duration::from_secs(30),
            1,
        );
        let report = poller.run_cycle().await.unwrap();
        assert_eq!(report.refreshed, 1);
        assert_eq!(report.write_failures, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let mut gateways = MockGatewayRepository::new();
        gateways.expect_list().returning(|| Ok(Vec::new()));

        let poller = StatsPoller::new(
            Arc::new(gateways),
            Arc::new(MockAgentClient::new()),
            Duration::from_secs(3600),
            4,
        );

        let shutdown = CancellationToken::new();
        let handle = poller.spawn(shutdown.clone());
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        let joined = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }
}
