// Integration tests for Drift Watcher
// These tests drive whole reconciliation cycles against static pages

pub mod refresh_tests;
pub mod service_tests;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

use drift_watcher::{
    dom::{DomProvider, StaticPages},
    models::{LogKind, SiteConfig},
    platforms,
    reconciler::{LoopSettings, ReconciliationLoop},
    refresher::{DataRefresher, RefreshReport},
    scheduler::{CycleCallback, Trigger},
    store::ConfigStore,
    AppError,
};

pub const AMAZON_PAGE: &str = r#"
    <html><body>
        <div id="g1" class="p13n-grid" data-asin="B001">
            <a class="a-link-normal" href="/dp/B001"><img alt="Echo Dot" src="https://img/1.jpg"></a>
            <span class="p13n-sc-price">$49.99</span>
        </div>
        <div id="g2" class="p13n-grid" data-asin="B002">
            <a class="a-link-normal" href="/dp/B002"><img alt="Kindle" src="https://img/2.jpg"></a>
            <span class="p13n-sc-price">$99.99</span>
        </div>
        <div id="g3" class="p13n-grid" data-asin="B003">
            <a class="a-link-normal" href="/dp/B003"><img alt="Fire TV" src="https://img/3.jpg"></a>
        </div>
    </body></html>
"#;

/// Same listing after a redesign that gives titles their own element.
pub const AMAZON_PAGE_NEW_TITLES: &str = r#"
    <html><body>
        <div id="g1" class="p13n-grid" data-asin="B001">
            <a class="a-link-normal" href="/dp/B001"><img alt="Echo Dot" src="https://img/1.jpg"></a>
            <span class="p13n-sc-truncate">Echo Dot (5th Gen)</span>
            <span class="p13n-sc-price">$49.99</span>
        </div>
        <div id="g2" class="p13n-grid" data-asin="B002">
            <a class="a-link-normal" href="/dp/B002"><img alt="Kindle" src="https://img/2.jpg"></a>
            <span class="p13n-sc-truncate">Kindle Paperwhite</span>
            <span class="p13n-sc-price">$99.99</span>
        </div>
        <div id="g3" class="p13n-grid" data-asin="B003">
            <a class="a-link-normal" href="/dp/B003"><img alt="Fire TV" src="https://img/3.jpg"></a>
            <span class="p13n-sc-truncate">Fire TV Stick</span>
        </div>
    </body></html>
"#;

/// One more listing: container counts move, selectors do not.
pub const AMAZON_PAGE_MORE_ITEMS: &str = r#"
    <html><body>
        <div id="g1" class="p13n-grid" data-asin="B001">
            <a class="a-link-normal" href="/dp/B001"><img alt="Echo Dot" src="https://img/1.jpg"></a>
            <span class="p13n-sc-price">$49.99</span>
        </div>
        <div id="g2" class="p13n-grid" data-asin="B002">
            <a class="a-link-normal" href="/dp/B002"><img alt="Kindle" src="https://img/2.jpg"></a>
            <span class="p13n-sc-price">$99.99</span>
        </div>
        <div id="g3" class="p13n-grid" data-asin="B003">
            <a class="a-link-normal" href="/dp/B003"><img alt="Fire TV" src="https://img/3.jpg"></a>
        </div>
        <div id="g4" class="p13n-grid" data-asin="B004">
            <a class="a-link-normal" href="/dp/B004"><img alt="Ring" src="https://img/4.jpg"></a>
        </div>
    </body></html>
"#;

pub const PRODUCT_HUNT_PAGE: &str = r#"
    <html><body>
        <section>
            <article><h3>Cursor</h3><p>The AI code editor</p><a href="/posts/cursor">view</a></article>
            <article><h3>Linear</h3><p>Plan and build products</p><a href="/posts/linear">view</a></article>
        </section>
    </body></html>
"#;

/// A temporary store directory plus swappable pages for every platform.
pub struct Harness {
    pub dir: TempDir,
    pub pages: Arc<StaticPages>,
}

impl Harness {
    pub fn new() -> anyhow::Result<Self> {
        let pages = StaticPages::new()
            .with_page(platforms::amazon().url, AMAZON_PAGE)
            .with_page(platforms::product_hunt().url, PRODUCT_HUNT_PAGE);

        Ok(Self {
            dir: TempDir::new()?,
            pages: Arc::new(pages),
        })
    }

    pub fn store(&self) -> ConfigStore {
        ConfigStore::new(
            self.dir.path().join("selector_config.json"),
            self.dir.path().join("update_log.json"),
        )
    }

    pub fn dom(&self) -> Arc<dyn DomProvider> {
        self.pages.clone()
    }

    /// A loop over the full catalog, picking up whatever baseline is on disk.
    pub fn watcher(&self, refresher: Arc<dyn DataRefresher>) -> ReconciliationLoop {
        ReconciliationLoop::new(self.dom(), self.store(), refresher, test_settings())
    }

    pub fn log_kinds(&self) -> Vec<LogKind> {
        self.store().read_log().into_iter().map(|e| e.kind).collect()
    }
}

pub fn test_settings() -> LoopSettings {
    LoopSettings {
        platform_delay: Duration::ZERO,
        sample_markup_limit: 800,
    }
}

/// Counts refreshes and remembers the configuration it was handed.
#[derive(Default)]
pub struct RecordingRefresher {
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<SiteConfig>>,
    pub fail: bool,
}

impl RecordingRefresher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_seen(&self) -> Option<SiteConfig> {
        self.seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DataRefresher for RecordingRefresher {
    async fn refresh(&self, config: &SiteConfig) -> drift_watcher::Result<RefreshReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(config.clone());

        if self.fail {
            return Err(AppError::Refresh("feed unavailable".to_string()));
        }
        Ok(RefreshReport {
            count: config.platforms.len(),
            success: true,
        })
    }
}

/// Blocks inside `refresh` until released, so a cycle can be held open.
#[derive(Default)]
pub struct GatedRefresher {
    pub started: Notify,
    pub release: Notify,
}

#[async_trait]
impl DataRefresher for GatedRefresher {
    async fn refresh(&self, _config: &SiteConfig) -> drift_watcher::Result<RefreshReport> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(RefreshReport {
            count: 1,
            success: true,
        })
    }
}

/// Runs the immediate callback and keeps the periodic one for the test to fire.
#[derive(Default)]
pub struct ManualTrigger {
    pub periodic: Mutex<Option<(u64, CycleCallback)>>,
    pub shut_down: Mutex<bool>,
}

impl ManualTrigger {
    pub async fn fire(&self) {
        let callback = self.periodic.lock().unwrap().as_ref().map(|(_, cb)| Arc::clone(cb));
        if let Some(callback) = callback {
            callback().await;
        }
    }
}

#[async_trait]
impl Trigger for ManualTrigger {
    async fn run_immediately_once(&self, callback: CycleCallback) -> drift_watcher::Result<()> {
        callback().await;
        Ok(())
    }

    async fn register_periodic(&self, interval_hours: u64, callback: CycleCallback) -> drift_watcher::Result<()> {
        *self.periodic.lock().unwrap() = Some((interval_hours, callback));
        Ok(())
    }

    async fn shutdown(&self) -> drift_watcher::Result<()> {
        *self.shut_down.lock().unwrap() = true;
        Ok(())
    }
}
