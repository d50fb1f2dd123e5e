//! Active health checking of outbounds.
//!
//! # Responsibilities
//! - Periodically probe every outbound of every provider
//! - Probe on demand (all, one provider, one outbound)
//! - Record results into the latency stores and the shared history sink
//! - Drop history of outbounds that no longer exist
//!
//! # Probe Flow
//! ```text
//! outbound
//!     → resolve groups to the concrete outbound
//!     → claim the tag in the round's ProbeContext (skip if already claimed)
//!     → URL test bounded by TCP_TIMEOUT
//!         ok  → record latency, report network connected
//!         err → network reachable? record Failed : return NoNetwork
//! ```
//!
//! # Design Decisions
//! - One batch routine serves the timer loop and the on-demand calls
//! - At most `CHECK_CONCURRENCY` probes in flight per round
//! - A failing outbound never aborts the rest of its round
//! - `close` stops new rounds; probes already running finish on their deadline

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::HealthCheckConfig;
use crate::health::context::ProbeContext;
use crate::health::error::{HealthError, HealthResult};
use crate::health::history::{History, HistorySink};
use crate::health::registry::{lock, StorageRegistry};
use crate::health::storage::Rtt;
use crate::lifecycle::Shutdown;
use crate::observability::metrics::{self, ProbeOutcome};
use crate::outbound::{resolve, Outbound, OutboundProvider, Router, UrlTester};
use crate::resilience::timeouts::{with_deadline, TCP_TIMEOUT};

/// Shortest accepted interval between check rounds.
pub const MIN_INTERVAL: Duration = Duration::from_secs(10);

/// Longest accepted interval between check rounds.
pub const MAX_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Samples kept per outbound when the configuration asks for none.
pub const DEFAULT_SAMPLING: usize = 10;

/// Most samples kept per outbound.
pub const MAX_SAMPLING: usize = 10_000;

/// Probe destination when the configuration leaves it empty.
pub const DEFAULT_DESTINATION: &str = "http://www.gstatic.com/generate_204";

/// Interval of the stale history cleanup.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(8 * 60 * 60);

/// Probes in flight per round.
pub const CHECK_CONCURRENCY: usize = 10;

/// Health checker for the outbounds of a set of providers.
pub struct HealthCheck {
    checker: Arc<Checker>,
    running: Mutex<Option<Shutdown>>,
}

struct Checker {
    storage: StorageRegistry,
    router: Arc<dyn Router>,
    providers: Vec<Arc<dyn OutboundProvider>>,
    providers_by_tag: HashMap<String, Arc<dyn OutboundProvider>>,
    tester: Arc<dyn UrlTester>,
    history: Option<Arc<dyn HistorySink>>,
    options: HealthCheckConfig,
    interval: Duration,
}

impl HealthCheck {
    /// Create a checker for `providers`.
    ///
    /// Empty destination, zero sampling and intervals below [`MIN_INTERVAL`]
    /// are replaced by their defaults; interval and sampling are capped at
    /// [`MAX_INTERVAL`] and [`MAX_SAMPLING`]. Samples stay valid for
    /// `(sampling + 1) * interval`. The router's history sink, if any, is
    /// captured here.
    pub fn new(
        router: Arc<dyn Router>,
        providers: Vec<Arc<dyn OutboundProvider>>,
        mut options: HealthCheckConfig,
        tester: Arc<dyn UrlTester>,
    ) -> Self {
        if options.destination.is_empty() {
            options.destination = DEFAULT_DESTINATION.to_string();
        }
        let interval =
            Duration::from_secs(options.interval_secs).clamp(MIN_INTERVAL, MAX_INTERVAL);
        options.interval_secs = interval.as_secs();
        if options.sampling == 0 {
            options.sampling = DEFAULT_SAMPLING;
        }
        options.sampling = options.sampling.min(MAX_SAMPLING);
        let validity = u32::try_from(options.sampling + 1)
            .ok()
            .and_then(|windows| interval.checked_mul(windows))
            .unwrap_or(MAX_INTERVAL);

        let providers_by_tag = providers
            .iter()
            .map(|p| (p.tag().to_string(), Arc::clone(p)))
            .collect();
        let history = router.history_sink();

        Self {
            checker: Arc::new(Checker {
                storage: StorageRegistry::new(options.sampling, validity),
                router,
                providers,
                providers_by_tag,
                tester,
                history,
                options,
                interval,
            }),
            running: Mutex::new(None),
        }
    }

    /// Latency history of the checked outbounds.
    pub fn storage(&self) -> &StorageRegistry {
        &self.checker.storage
    }

    /// Effective options after defaults were applied.
    pub fn options(&self) -> &HealthCheckConfig {
        &self.checker.options
    }

    pub fn is_running(&self) -> bool {
        self.running_guard().is_some()
    }

    /// Start the background loops; a no-op while already running.
    ///
    /// Must be called within a Tokio runtime. The loops begin once every
    /// provider is ready.
    pub fn start(&self) {
        let mut running = self.running_guard();
        if running.is_some() {
            return;
        }
        let shutdown = Shutdown::new();
        let mut cancelled = shutdown.subscribe();
        let check_shutdown = shutdown.subscribe();
        let cleanup_shutdown = shutdown.subscribe();
        *running = Some(shutdown);

        let checker = Arc::clone(&self.checker);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.recv() => return,
                _ = checker.wait_providers() => {}
            }
            tokio::spawn(Arc::clone(&checker).check_loop(check_shutdown));
            tokio::spawn(checker.cleanup_loop(cleanup_shutdown, CLEANUP_INTERVAL));
        });

        tracing::info!(
            interval_secs = self.checker.options.interval_secs,
            sampling = self.checker.options.sampling,
            destination = %self.checker.options.destination,
            "Health check started"
        );
    }

    /// Stop the background loops; safe to call repeatedly.
    pub fn close(&self) {
        if let Some(shutdown) = self.running_guard().take() {
            shutdown.trigger();
            tracing::info!("Health check stopped");
        }
    }

    /// Probe every outbound of every provider and wait for the results.
    pub async fn check_all(&self) {
        self.checker.check_all().await;
    }

    /// Probe the outbounds of provider `tag`; unknown providers are ignored.
    pub async fn check_provider(&self, tag: &str) {
        let Some(provider) = self.checker.providers_by_tag.get(tag) else {
            tracing::debug!(provider = %tag, "Provider not found, nothing to check");
            return;
        };
        let ctx = Arc::new(self.checker.new_context());
        self.checker.run_batch(provider.outbounds(), ctx).await;
    }

    /// Probe one outbound with a context of its own.
    ///
    /// Returns the measured latency in ms.
    pub async fn check_outbound(&self, tag: &str) -> HealthResult<u16> {
        let outbound = self
            .checker
            .find_outbound(tag)
            .ok_or_else(|| HealthError::OutboundNotFound(tag.to_string()))?;
        let ctx = self.checker.new_context();
        self.checker.probe(outbound, &ctx).await
    }

    /// Record a failure observed outside the checker (e.g. a broken
    /// connection on the data path).
    ///
    /// Groups are ignored. Nothing is written if the latest sample is already
    /// a failure, so consecutive-failure counts stay meaningful.
    pub fn report_failure(&self, outbound: &Outbound) {
        if outbound.is_group() {
            return;
        }
        let tag = outbound.tag();
        let shared = self.checker.storage.get_or_create(tag);
        let mut store = lock(&shared);
        let known_failed = store.latest().is_some_and(|s| s.delay.is_failed());
        if !known_failed {
            store.put(Rtt::Failed);
            metrics::record_failure_report(tag);
            tracing::debug!(outbound = %tag, "Failure reported");
        }
    }

    /// Drop history of outbounds no provider knows anymore.
    pub fn cleanup(&self) {
        self.checker.cleanup();
    }

    fn running_guard(&self) -> MutexGuard<'_, Option<Shutdown>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Checker {
    fn new_context(&self) -> ProbeContext {
        ProbeContext::new(&self.options.connectivity)
    }

    async fn wait_providers(&self) {
        for provider in &self.providers {
            provider.wait().await;
        }
    }

    async fn check_loop(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::debug!("Check loop exiting");
                    break;
                }
                _ = ticker.tick() => {
                    self.check_all().await;
                }
            }
        }
    }

    async fn cleanup_loop(
        self: Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
        period: Duration,
    ) {
        let mut ticker = time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::debug!("Cleanup loop exiting");
                    break;
                }
                _ = ticker.tick() => {
                    self.cleanup();
                }
            }
        }
    }

    async fn check_all(self: &Arc<Self>) {
        // one context for the whole round: a success anywhere settles connectivity
        let ctx = Arc::new(self.new_context());
        let outbounds = self
            .providers
            .iter()
            .flat_map(|provider| provider.outbounds())
            .collect();
        self.run_batch(outbounds, ctx).await;
    }

    async fn run_batch(self: &Arc<Self>, outbounds: Vec<Arc<Outbound>>, ctx: Arc<ProbeContext>) {
        let round = Uuid::new_v4();
        let span = tracing::info_span!("check_round", %round);
        let total = outbounds.len();
        let semaphore = Arc::new(Semaphore::new(CHECK_CONCURRENCY));
        let mut tasks = JoinSet::new();

        for outbound in outbounds {
            let checker = Arc::clone(self);
            let ctx = Arc::clone(&ctx);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(
                async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return;
                    };
                    let tag = outbound.tag().to_string();
                    if let Err(e) = checker.probe(outbound, &ctx).await {
                        tracing::debug!(outbound = %tag, error = %e, "Check failed");
                    }
                }
                .instrument(span.clone()),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Check task aborted");
            }
        }
        span.in_scope(|| tracing::debug!(outbounds = total, "Check round finished"));
        metrics::record_check_round();
    }

    async fn probe(&self, outbound: Arc<Outbound>, ctx: &ProbeContext) -> HealthResult<u16> {
        let outbound = resolve(self.router.as_ref(), outbound)?;
        let tag = outbound.tag();
        if !ctx.claim(tag) {
            // another outbound of this round resolved to the same one; its
            // result may not be stored yet, callers read the store instead
            return Ok(0);
        }

        let result = with_deadline(
            TCP_TIMEOUT,
            self.tester.test(&self.options.destination, &outbound),
        )
        .await;

        match result {
            Ok(delay) => {
                tracing::debug!(outbound = %tag, rtt_ms = delay, "Outbound available");
                ctx.report_connected().await;
                self.storage.put(tag, Rtt::Millis(delay));
                metrics::record_probe(tag, ProbeOutcome::Success, Some(delay));
                self.mirror(tag, delay);
                Ok(delay)
            }
            Err(e) => {
                if !ctx.connected().await {
                    metrics::record_probe(tag, ProbeOutcome::NoNetwork, None);
                    return Err(HealthError::NoNetwork);
                }
                tracing::debug!(outbound = %tag, error = %e, "Outbound unavailable");
                self.storage.put(tag, Rtt::Failed);
                metrics::record_probe(tag, ProbeOutcome::Failure, None);
                self.mirror(tag, 0);
                Err(e.into())
            }
        }
    }

    fn mirror(&self, tag: &str, delay: u16) {
        if let Some(history) = &self.history {
            history.store(
                tag,
                History {
                    time: SystemTime::now(),
                    delay,
                },
            );
        }
    }

    fn find_outbound(&self, tag: &str) -> Option<Arc<Outbound>> {
        self.providers
            .iter()
            .find_map(|provider| provider.outbound(tag))
    }

    fn cleanup(&self) {
        for tag in self.storage.list() {
            if self.find_outbound(&tag).is_none() {
                self.storage.delete(&tag);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::error::ProbeError;
    use crate::outbound::{StaticProvider, StaticRouter};
    use async_trait::async_trait;

    struct FixedTester(u16);

    #[async_trait]
    impl UrlTester for FixedTester {
        async fn test(&self, _destination: &str, _outbound: &Outbound) -> Result<u16, ProbeError> {
            Ok(self.0)
        }
    }

    fn checker(options: HealthCheckConfig) -> HealthCheck {
        let provider: Arc<dyn OutboundProvider> = Arc::new(StaticProvider::ready(
            "sub",
            vec![Arc::new(Outbound::direct("a"))],
        ));
        let router = Arc::new(StaticRouter::new(Vec::new(), vec![provider.clone()]));
        HealthCheck::new(router, vec![provider], options, Arc::new(FixedTester(25)))
    }

    #[test]
    fn test_options_defaults_applied() {
        let hc = checker(HealthCheckConfig {
            destination: String::new(),
            interval_secs: 1,
            sampling: 0,
            connectivity: String::new(),
        });
        assert_eq!(hc.options().destination, DEFAULT_DESTINATION);
        assert_eq!(hc.options().interval_secs, 10);
        assert_eq!(hc.options().sampling, DEFAULT_SAMPLING);
        assert_eq!(hc.storage().capacity(), 10);
        assert_eq!(hc.storage().validity(), Duration::from_secs(110));
    }

    #[test]
    fn test_oversized_options_are_capped() {
        let hc = checker(HealthCheckConfig {
            interval_secs: u64::MAX,
            sampling: usize::MAX,
            ..HealthCheckConfig::default()
        });
        assert_eq!(hc.options().interval_secs, MAX_INTERVAL.as_secs());
        assert_eq!(hc.options().sampling, MAX_SAMPLING);
        assert_eq!(hc.storage().validity(), MAX_INTERVAL * (MAX_SAMPLING as u32 + 1));
    }

    #[test]
    fn test_validity_follows_interval() {
        let hc = checker(HealthCheckConfig {
            interval_secs: 60,
            sampling: 5,
            ..HealthCheckConfig::default()
        });
        assert_eq!(hc.storage().validity(), Duration::from_secs(360));
    }

    #[tokio::test]
    async fn test_check_outbound_records_latency() {
        let hc = checker(HealthCheckConfig::default());
        assert_eq!(hc.check_outbound("a").await.unwrap(), 25);
        assert_eq!(hc.storage().latest("a").unwrap().delay, Rtt::Millis(25));

        let err = hc.check_outbound("ghost").await.unwrap_err();
        assert!(matches!(err, HealthError::OutboundNotFound(tag) if tag == "ghost"));
    }

    #[tokio::test]
    async fn test_start_and_close_are_idempotent() {
        let hc = checker(HealthCheckConfig::default());
        assert!(!hc.is_running());
        hc.start();
        hc.start();
        assert!(hc.is_running());
        hc.close();
        hc.close();
        assert!(!hc.is_running());
    }
}
