use super::*;
use drift_watcher::config::RefreshConfig;
use drift_watcher::reconciler::{CycleOutcome, RefreshOutcome};
use drift_watcher::refresher::{ProductFeed, ProductRefresher};
use std::fs;

fn product_refresher(h: &Harness) -> Arc<ProductRefresher> {
    let config = RefreshConfig {
        items_per_platform: 10,
        platform_delay_ms: 0,
    };
    Arc::new(ProductRefresher::new(h.dom(), h.dir.path().join("products.json"), config))
}

fn read_feed(h: &Harness) -> anyhow::Result<ProductFeed> {
    let text = fs::read_to_string(h.dir.path().join("products.json"))?;
    Ok(serde_json::from_str(&text)?)
}

#[tokio::test]
async fn test_cycle_refreshes_product_feed() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let watcher = h.watcher(product_refresher(&h));

    let outcome = watcher.run_cycle().await;
    assert!(matches!(
        outcome,
        CycleOutcome::Completed { refresh: RefreshOutcome::Succeeded(report), .. } if report.count == 5
    ));

    let feed = read_feed(&h)?;
    assert!(feed.success);
    assert_eq!(feed.count, 5);

    let amazon: Vec<_> = feed.products.iter().filter(|p| p.platform == "Amazon").collect();
    assert_eq!(amazon.len(), 3);
    assert_eq!(amazon[0].title, "Echo Dot");
    assert_eq!(amazon[0].price.as_deref(), Some("$49.99"));
    assert_eq!(amazon[0].link.as_deref(), Some("https://www.amazon.com/dp/B001"));
    assert_eq!(amazon[2].price, None);

    let hunted: Vec<_> = feed.products.iter().filter(|p| p.platform == "Product Hunt").collect();
    assert_eq!(hunted.len(), 2);
    assert_eq!(hunted[1].title, "Linear");
    assert_eq!(hunted[1].description.as_deref(), Some("Plan and build products"));

    assert_eq!(h.log_kinds(), vec![LogKind::ChangeDetected, LogKind::Success]);
    println!("✓ Feed written with {} products", feed.count);

    Ok(())
}

#[tokio::test]
async fn test_refresh_follows_drifted_selectors() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let watcher = h.watcher(product_refresher(&h));
    watcher.run_cycle().await;

    h.pages.set_page(platforms::amazon().url, AMAZON_PAGE_NEW_TITLES);
    watcher.run_cycle().await;

    let feed = read_feed(&h)?;
    let titles: Vec<_> = feed
        .products
        .iter()
        .filter(|p| p.platform == "Amazon")
        .map(|p| p.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Echo Dot (5th Gen)", "Kindle Paperwhite", "Fire TV Stick"]);

    Ok(())
}

#[tokio::test]
async fn test_empty_listing_logs_warning() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let watcher = h.watcher(product_refresher(&h));
    watcher.run_cycle().await;
    assert_eq!(read_feed(&h)?.count, 5);

    // Pages still load but no container candidate matches anything
    h.pages.set_page(platforms::amazon().url, "<html><body></body></html>");
    h.pages.set_page(platforms::product_hunt().url, "<html><body></body></html>");
    let outcome = watcher.run_cycle().await;

    let CycleOutcome::Completed { diff, persisted, refresh } = outcome else {
        panic!("reachable pages should not abort the cycle");
    };
    assert!(persisted);
    assert!(diff.changes.iter().all(|c| c.new.is_none()));
    assert!(matches!(refresh, RefreshOutcome::Succeeded(report) if report.count == 0));

    // The last good feed survives a blank page
    let feed = read_feed(&h)?;
    assert_eq!(feed.count, 5);
    assert_eq!(h.store().read_log().last().map(|e| e.kind), Some(LogKind::Warning));

    Ok(())
}
