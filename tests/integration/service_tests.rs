use super::*;
use drift_watcher::reconciler::CyclePhase;
use drift_watcher::service::run_until_stopped;

#[tokio::test]
async fn test_service_runs_immediately_then_on_each_tick() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let refresher = Arc::new(RecordingRefresher::default());
    let watcher = Arc::new(h.watcher(refresher.clone()));
    let trigger = ManualTrigger::default();

    run_until_stopped(Arc::clone(&watcher), &trigger, 48, async {
        // Two scheduled ticks before the stop request arrives
        trigger.fire().await;
        trigger.fire().await;
    })
    .await?;

    let (interval, _) = trigger.periodic.lock().unwrap().take().expect("periodic job registered");
    assert_eq!(interval, 48);
    assert!(*trigger.shut_down.lock().unwrap());
    assert_eq!(refresher.call_count(), 3);
    assert_eq!(watcher.phase(), CyclePhase::Idle);

    assert_eq!(
        h.log_kinds(),
        vec![
            LogKind::ChangeDetected,
            LogKind::Success,
            LogKind::NoChange,
            LogKind::Success,
            LogKind::NoChange,
            LogKind::Success,
            LogKind::Stopped,
        ]
    );
    println!("✓ Service ran three cycles and stopped cleanly");

    Ok(())
}

#[tokio::test]
async fn test_stop_is_logged_even_without_cycles_succeeding() -> anyhow::Result<()> {
    let h = Harness::new()?;
    h.pages.remove_page(platforms::amazon().url);
    h.pages.remove_page(platforms::product_hunt().url);

    let refresher = Arc::new(RecordingRefresher::default());
    let watcher = Arc::new(h.watcher(refresher.clone()));
    let trigger = ManualTrigger::default();

    run_until_stopped(watcher, &trigger, 1, async {}).await?;

    assert_eq!(refresher.call_count(), 0);
    let log = h.store().read_log();
    assert_eq!(log.last().map(|e| e.kind), Some(LogKind::Stopped));
    assert!(log.iter().any(|e| e.message.starts_with("Inspection failed")));

    Ok(())
}

#[tokio::test]
async fn test_stop_during_first_cycle_is_logged() -> anyhow::Result<()> {
    let h = Harness::new()?;
    let refresher = Arc::new(GatedRefresher::default());
    let watcher = Arc::new(h.watcher(refresher.clone()));
    let trigger = ManualTrigger::default();

    // The stop request arrives while the first cycle is still refreshing
    run_until_stopped(Arc::clone(&watcher), &trigger, 48, async {
        refresher.started.notified().await;
    })
    .await?;

    assert!(trigger.periodic.lock().unwrap().is_none());
    assert!(*trigger.shut_down.lock().unwrap());
    assert_eq!(watcher.phase(), CyclePhase::Idle);
    assert_eq!(h.log_kinds(), vec![LogKind::ChangeDetected, LogKind::Stopped]);
    println!("✓ Stop during the first cycle was recorded");

    Ok(())
}
