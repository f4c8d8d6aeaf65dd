use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dom::DomProvider;
use crate::drift::DriftDetector;
use crate::models::{ConfigDiff, LogEntry, LogKind, PlatformId, PlatformInspection, SiteConfig};
use crate::platforms::{self, PlatformSpec};
use crate::probe::SelectorProbe;
use crate::refresher::{DataRefresher, RefreshReport};
use crate::scheduler::CycleCallback;
use crate::store::ConfigStore;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CyclePhase {
    Idle,
    Probing,
    Diffing,
    Persisting,
    Refreshing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Succeeded(RefreshReport),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Another cycle was already running; nothing was done.
    Skipped,
    /// Probing produced nothing usable; the store was left untouched.
    Aborted { reason: String },
    Completed {
        diff: ConfigDiff,
        persisted: bool,
        refresh: RefreshOutcome,
    },
}

#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Pause between platform probes.
    pub platform_delay: Duration,
    pub sample_markup_limit: usize,
}

impl LoopSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            platform_delay: Duration::from_millis(config.scheduler.platform_delay_ms),
            sample_markup_limit: config.probe.sample_markup_limit,
        }
    }
}

/// Resets the phase to `Idle` however the cycle ends.
struct PhaseGuard<'a> {
    phase: &'a Mutex<CyclePhase>,
}

impl PhaseGuard<'_> {
    fn set(&self, next: CyclePhase) {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        tracing::debug!("{:?} -> {:?}", *phase, next);
        *phase = next;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.set(CyclePhase::Idle);
    }
}

/// Probe, diff, persist and refresh as one single-flight cycle.
pub struct ReconciliationLoop {
    platforms: Vec<PlatformSpec>,
    probe: SelectorProbe,
    detector: DriftDetector,
    dom: Arc<dyn DomProvider>,
    store: ConfigStore,
    refresher: Arc<dyn DataRefresher>,
    platform_delay: Duration,
    phase: Mutex<CyclePhase>,
    last_config: RwLock<Option<SiteConfig>>,
}

impl ReconciliationLoop {
    /// Builds a loop over the platform catalog, using whatever the store
    /// holds as the baseline.
    pub fn new(
        dom: Arc<dyn DomProvider>,
        store: ConfigStore,
        refresher: Arc<dyn DataRefresher>,
        settings: LoopSettings,
    ) -> Self {
        let baseline = store.load();
        if baseline.is_none() {
            tracing::warn!("No config found, will create on first run");
        }

        Self {
            platforms: platforms::catalog(),
            probe: SelectorProbe::new(settings.sample_markup_limit),
            detector: DriftDetector::new(),
            dom,
            store,
            refresher,
            platform_delay: settings.platform_delay,
            phase: Mutex::new(CyclePhase::Idle),
            last_config: RwLock::new(baseline),
        }
    }

    pub fn with_platforms(mut self, platforms: Vec<PlatformSpec>) -> Self {
        self.platforms = platforms;
        self
    }

    pub fn phase(&self) -> CyclePhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub async fn current_config(&self) -> Option<SiteConfig> {
        self.last_config.read().await.clone()
    }

    /// A trigger callback that runs one cycle per invocation.
    pub fn cycle_callback(self: &Arc<Self>) -> CycleCallback {
        let this = Arc::clone(self);
        Arc::new(move || {
            let this = Arc::clone(&this);
            Box::pin(async move {
                this.run_cycle().await;
            })
        })
    }

    fn try_begin(&self) -> Option<PhaseGuard<'_>> {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        if *phase != CyclePhase::Idle {
            return None;
        }
        *phase = CyclePhase::Probing;
        Some(PhaseGuard { phase: &self.phase })
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        let Some(guard) = self.try_begin() else {
            tracing::warn!("Cycle already in progress, dropping trigger");
            metrics::counter!("drift_watcher_cycles_total", "outcome" => "skipped").increment(1);
            return CycleOutcome::Skipped;
        };

        let span = tracing::info_span!("cycle", id = %Uuid::new_v4());
        let outcome = self.execute(&guard).instrument(span).await;

        let label = match &outcome {
            CycleOutcome::Skipped => "skipped",
            CycleOutcome::Aborted { .. } => "aborted",
            CycleOutcome::Completed { diff, .. } if diff.changed => "changed",
            CycleOutcome::Completed { .. } => "no_change",
        };
        metrics::counter!("drift_watcher_cycles_total", "outcome" => label).increment(1);
        tracing::info!("Auto-update cycle complete");

        outcome
    }

    async fn execute(&self, guard: &PhaseGuard<'_>) -> CycleOutcome {
        tracing::info!("Running HTML inspection");

        let (platforms, failures) = self.probe_platforms().await;
        for failure in &failures {
            self.store.record(LogEntry::new(LogKind::Error, failure.to_string()).with_details(json!({
                "platform": failure_platform(failure),
            })));
        }

        if platforms.is_empty() {
            let reason = if failures.is_empty() {
                "no platforms configured".to_string()
            } else {
                failures.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
            };
            self.store
                .record(LogEntry::new(LogKind::Error, format!("Inspection failed: {}", reason)));
            tracing::error!("Inspection failed, skipping update");
            return CycleOutcome::Aborted { reason };
        }
        let probed = SiteConfig::new(platforms);

        guard.set(CyclePhase::Diffing);
        let previous = self.current_config().await;
        let diff = self.detector.compare(previous.as_ref(), &probed);

        let (current, persisted) = if diff.changed {
            guard.set(CyclePhase::Persisting);
            tracing::info!("Changes detected: {}", diff.summary());

            match self.store.persist(&probed) {
                Ok(()) => {
                    let mut entry = LogEntry::new(LogKind::ChangeDetected, diff.summary());
                    match serde_json::to_value(&diff) {
                        Ok(details) => entry = entry.with_details(details),
                        Err(e) => tracing::error!("Failed to serialize selector diff: {}", e),
                    }
                    self.store.record(entry);
                    report_changes(&diff);
                    metrics::counter!("drift_watcher_selector_changes_total").increment(diff.count as u64);

                    *self.last_config.write().await = Some(probed.clone());
                    (probed, true)
                }
                Err(e) => {
                    self.store.record(LogEntry::new(
                        LogKind::Error,
                        format!("Failed to persist selector configuration: {}", e),
                    ));
                    (previous.unwrap_or(probed), false)
                }
            }
        } else {
            self.store
                .record(LogEntry::new(LogKind::NoChange, "Selectors unchanged"));
            // Unchanged implies a baseline exists
            (previous.unwrap_or(probed), false)
        };

        guard.set(CyclePhase::Refreshing);
        let refresh = self.refresh(&current).await;

        CycleOutcome::Completed {
            diff,
            persisted,
            refresh,
        }
    }

    /// Probes every platform in catalog order, pausing between them.
    /// Returns what succeeded and the per-platform failures.
    pub async fn probe_platforms(&self) -> (BTreeMap<PlatformId, PlatformInspection>, Vec<AppError>) {
        let mut inspections = BTreeMap::new();
        let mut failures = Vec::new();

        for (index, spec) in self.platforms.iter().enumerate() {
            if index > 0 && !self.platform_delay.is_zero() {
                tokio::time::sleep(self.platform_delay).await;
            }

            match self.probe.probe(spec, self.dom.as_ref()) {
                Ok(inspection) => {
                    inspections.insert(spec.id, inspection);
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    failures.push(e);
                }
            }
        }

        (inspections, failures)
    }

    async fn refresh(&self, config: &SiteConfig) -> RefreshOutcome {
        tracing::info!("Running scraper with current configuration");

        match self.refresher.refresh(config).await {
            Ok(report) if report.count > 0 => {
                self.store.record(LogEntry::new(
                    LogKind::Success,
                    format!("Scraped {} products", report.count),
                ));
                RefreshOutcome::Succeeded(report)
            }
            Ok(report) => {
                self.store
                    .record(LogEntry::new(LogKind::Warning, "Scraper returned no products"));
                RefreshOutcome::Succeeded(report)
            }
            Err(e) => {
                metrics::counter!("drift_watcher_refresh_failures_total").increment(1);
                self.store
                    .record(LogEntry::new(LogKind::Error, format!("Scraper failed: {}", e)));
                RefreshOutcome::Failed(e.to_string())
            }
        }
    }
}

fn failure_platform(error: &AppError) -> Option<&str> {
    match error {
        AppError::Inspection { platform, .. } => Some(platform.as_str()),
        _ => None,
    }
}

fn report_changes(diff: &ConfigDiff) {
    for change in &diff.changes {
        tracing::info!(
            platform = %change.platform,
            field = %change.field,
            "old: {:?}, new: {:?}",
            change.old.as_ref().map(|v| v.selector()),
            change.new.as_ref().map(|v| v.selector())
        );
    }
}
