//! Per-endpoint monitoring workers and their supervision.
//!
//! Each active endpoint gets its own tokio task running the
//! check -> record -> evaluate -> sleep cycle, so a slow or failing
//! endpoint never delays the others, and a result is fully persisted and
//! alert-evaluated before the next check of that endpoint starts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::alerting::{AlertCoordinator, EvaluationError};
use crate::db::models::{CheckResult, Endpoint};
use crate::db::services::CheckService;
use crate::db::StoreError;
use crate::probe::Checker;

#[derive(Debug, Error)]
enum PipelineError {
    #[error("failed to record check result: {0}")]
    Record(#[from] StoreError),
    #[error("alert evaluation failed: {0}")]
    Evaluate(#[from] EvaluationError),
}

/// Owns the monitoring workers. Dropping the manager without calling
/// [`shutdown`] detaches the tasks; the binary always shuts down
/// explicitly.
///
/// [`shutdown`]: MonitorManager::shutdown
pub struct MonitorManager {
    checker: Arc<dyn Checker>,
    checks: Arc<CheckService>,
    coordinator: Arc<AlertCoordinator>,
    error_backoff: Duration,
    shutdown_tx: broadcast::Sender<()>,
    workers: HashMap<i64, JoinHandle<()>>,
}

impl MonitorManager {
    pub fn new(
        checker: Arc<dyn Checker>,
        checks: Arc<CheckService>,
        coordinator: Arc<AlertCoordinator>,
        error_backoff: Duration,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            checker,
            checks,
            coordinator,
            error_backoff,
            shutdown_tx,
            workers: HashMap::new(),
        }
    }

    /// Starts one worker per endpoint. An endpoint already being monitored
    /// keeps its existing worker.
    pub fn start_all(&mut self, endpoints: Vec<Endpoint>) {
        for endpoint in endpoints {
            self.spawn(endpoint);
        }
    }

    pub fn spawn(&mut self, endpoint: Endpoint) {
        if self.workers.contains_key(&endpoint.id) {
            return;
        }
        let id = endpoint.id;
        let handle = tokio::spawn(run_endpoint_worker(
            endpoint,
            self.checker.clone(),
            self.checks.clone(),
            self.coordinator.clone(),
            self.error_backoff,
            self.shutdown_tx.subscribe(),
        ));
        self.workers.insert(id, handle);
    }

    /// Workers whose task has not finished.
    pub fn running_workers(&self) -> usize {
        self.workers.values().filter(|h| !h.is_finished()).count()
    }

    /// Signals every worker, waits up to `grace` for them to finish their
    /// current cycle, then aborts stragglers. Sleeping workers wake
    /// immediately; an in-flight check is bounded by its endpoint timeout.
    pub async fn shutdown(mut self, grace: Duration) {
        let _ = self.shutdown_tx.send(());

        let handles: Vec<JoinHandle<()>> = self.workers.drain().map(|(_, h)| h).collect();
        let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        if tokio::time::timeout(grace, futures::future::join_all(handles))
            .await
            .is_err()
        {
            warn!("grace period elapsed, aborting remaining monitor workers");
            for handle in abort_handles {
                handle.abort();
            }
        }
        info!("all monitor workers stopped");
    }
}

async fn run_endpoint_worker(
    endpoint: Endpoint,
    checker: Arc<dyn Checker>,
    checks: Arc<CheckService>,
    coordinator: Arc<AlertCoordinator>,
    error_backoff: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let interval = Duration::from_secs(u64::from(endpoint.check_interval_secs.max(1)));
    info!(
        endpoint = %endpoint.name,
        url = %endpoint.url,
        interval_secs = interval.as_secs(),
        "monitor worker started"
    );

    loop {
        let result = checker.check(&endpoint).await;
        if result.is_up {
            info!(
                endpoint = %endpoint.name,
                status = ?result.status_code,
                latency_ms = result.latency_ms,
                "endpoint is up"
            );
        } else {
            warn!(
                endpoint = %endpoint.name,
                error = result.error.as_deref().unwrap_or("unknown error"),
                "endpoint is down"
            );
        }

        // A failed check is normal operation; only a failure of the
        // pipeline itself triggers the backoff. The worker never exits
        // over a transient internal error.
        let delay = match record_and_evaluate(&endpoint, &result, &checks, &coordinator).await {
            Ok(()) => interval,
            Err(e) => {
                error!(
                    endpoint = %endpoint.name,
                    error = %e,
                    backoff_secs = error_backoff.as_secs(),
                    "monitoring pipeline error, backing off"
                );
                error_backoff
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.recv() => {
                info!(endpoint = %endpoint.name, "monitor worker stopping");
                break;
            }
        }
    }
}

async fn record_and_evaluate(
    endpoint: &Endpoint,
    result: &CheckResult,
    checks: &CheckService,
    coordinator: &AlertCoordinator,
) -> Result<(), PipelineError> {
    checks.record(result).await?;
    coordinator.evaluate(endpoint, result).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewEndpoint;
    use crate::db::open_test_db;
    use crate::db::services::{AlertService, EndpointService};
    use crate::notifications::{NotificationSender, NotificationService, SenderError};
    use async_trait::async_trait;
    use chrono::Utc;
    use sqlx::SqlitePool;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Instant;

    struct NullSender;

    #[async_trait]
    impl NotificationSender for NullSender {
        async fn send(&self, _: &str, _: &str, _: &[String]) -> Result<(), SenderError> {
            Ok(())
        }
    }

    /// Replays a scripted sequence of up/down outcomes, then reports up.
    struct ScriptedChecker {
        script: Mutex<VecDeque<bool>>,
    }

    impl ScriptedChecker {
        fn new(script: impl IntoIterator<Item = bool>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl Checker for ScriptedChecker {
        async fn check(&self, endpoint: &Endpoint) -> CheckResult {
            let is_up = self.script.lock().unwrap().pop_front().unwrap_or(true);
            CheckResult {
                endpoint_id: endpoint.id,
                status_code: if is_up { Some(200) } else { None },
                latency_ms: 1.0,
                is_up,
                error: if is_up {
                    None
                } else {
                    Some("connection refused".to_string())
                },
                checked_at: Utc::now(),
            }
        }
    }

    async fn build_manager(
        pool: &SqlitePool,
        checker: Arc<dyn Checker>,
        error_backoff: Duration,
    ) -> MonitorManager {
        let checks = Arc::new(CheckService::new(pool.clone()));
        let alerts = Arc::new(AlertService::new(pool.clone()));
        let notifications = Arc::new(NotificationService::new(
            Arc::new(NullSender),
            vec!["ops@example.com".to_string()],
        ));
        let coordinator = Arc::new(AlertCoordinator::new(alerts, notifications));
        MonitorManager::new(checker, checks, coordinator, error_backoff)
    }

    #[tokio::test]
    async fn first_check_runs_immediately_and_shutdown_skips_the_sleep() {
        let (pool, _dir) = open_test_db().await;
        let endpoint = EndpointService::new(pool.clone())
            .register(NewEndpoint::new("https://example.com", "Example"))
            .await
            .unwrap();

        // A long interval: only the immediate first check can have run.
        let mut manager = build_manager(
            &pool,
            Arc::new(ScriptedChecker::new([false])),
            Duration::from_secs(60),
        )
        .await;
        manager.start_all(vec![endpoint.clone()]);
        assert_eq!(manager.running_workers(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;

        let checks = CheckService::new(pool.clone());
        let stats = checks
            .uptime_stats(endpoint.id, chrono::Duration::days(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.total_checks, 1);

        let alerts = AlertService::new(pool.clone());
        assert!(alerts.has_open_alert(endpoint.id).await.unwrap());

        // Shutdown returns well before the 300s poll interval elapses.
        let started = Instant::now();
        manager.shutdown(Duration::from_secs(5)).await;
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn workers_run_independently_per_endpoint() {
        let (pool, _dir) = open_test_db().await;
        let endpoints = EndpointService::new(pool.clone());
        let first = endpoints
            .register(NewEndpoint::new("https://a.example.com", "A"))
            .await
            .unwrap();
        let second = endpoints
            .register(NewEndpoint::new("https://b.example.com", "B"))
            .await
            .unwrap();

        let mut manager = build_manager(
            &pool,
            Arc::new(ScriptedChecker::new([])),
            Duration::from_secs(60),
        )
        .await;
        manager.start_all(vec![first.clone(), second.clone()]);
        assert_eq!(manager.running_workers(), 2);

        tokio::time::sleep(Duration::from_millis(200)).await;

        let checks = CheckService::new(pool.clone());
        for endpoint in [&first, &second] {
            let stats = checks
                .uptime_stats(endpoint.id, chrono::Duration::days(1))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(stats.total_checks, 1);
        }

        manager.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn pipeline_errors_do_not_kill_the_worker() {
        let (pool, _dir) = open_test_db().await;
        let endpoint = EndpointService::new(pool.clone())
            .register(NewEndpoint::new("https://example.com", "Example"))
            .await
            .unwrap();

        let mut manager = build_manager(
            &pool,
            Arc::new(ScriptedChecker::new([])),
            Duration::from_millis(50),
        )
        .await;

        // Close the pool out from under the worker: every record attempt
        // now fails, which must put the worker on backoff, not end it.
        pool.close().await;
        manager.start_all(vec![endpoint]);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(manager.running_workers(), 1);

        manager.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn spawning_the_same_endpoint_twice_keeps_one_worker() {
        let (pool, _dir) = open_test_db().await;
        let endpoint = EndpointService::new(pool.clone())
            .register(NewEndpoint::new("https://example.com", "Example"))
            .await
            .unwrap();

        let mut manager = build_manager(
            &pool,
            Arc::new(ScriptedChecker::new([])),
            Duration::from_secs(60),
        )
        .await;
        manager.spawn(endpoint.clone());
        manager.spawn(endpoint);
        assert_eq!(manager.running_workers(), 1);

        manager.shutdown(Duration::from_secs(5)).await;
    }
}
