#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! End-to-end presentation lifecycle against the simulated platform.
//!
//! Drives `PresentationManager` the way a host would: attach, show, hide,
//! transfer, watch hotplug events, detach.

use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

use secondscreen_daemon::manager::{ManagerConfig, Notification, PresentationManager};
use secondscreen_daemon::platform::HostContext;
use secondscreen_daemon::platform::sim::SimulatedPlatform;

async fn attached(sim: &SimulatedPlatform) -> (PresentationManager, mpsc::Receiver<Notification>) {
    let (manager, notifications) = PresentationManager::new(sim.platform(), ManagerConfig::default());
    manager.attach_host(HostContext::new("integration-host")).await;
    (manager, notifications)
}

#[tokio::test]
async fn test_show_list_hide_cycle() {
    let sim = SimulatedPlatform::with_external_displays(2);
    let (manager, _notifications) = attached(&sim).await;

    for tag in ["menu", "receipt"] {
        manager.show(1, tag).await.unwrap();
        let active = manager.list_active().await;
        assert_eq!(active.iter().filter(|t| t.as_str() == tag).count(), 1);

        assert!(manager.hide(None, Some(tag)).await);
        assert!(!manager.list_active().await.contains(&tag.to_string()));
        assert!(!manager.hide(None, Some(tag)).await);
    }
}

#[tokio::test]
async fn test_repeated_context_requests_start_entrypoint_once() {
    let sim = SimulatedPlatform::with_external_displays(2);
    let (manager, _notifications) = attached(&sim).await;

    manager.prewarm(Some("menu")).await.unwrap();
    manager.show(1, "menu").await.unwrap();
    manager.hide(None, Some("menu")).await;
    manager.show(2, "menu").await.unwrap();
    manager.prewarm(Some("menu")).await.unwrap();

    assert_eq!(sim.entrypoint_starts("menu"), 1);
    assert_eq!(sim.runtimes_created(), 1);
    assert_eq!(sim.visible_on("menu"), Some(2));
}

#[tokio::test]
async fn test_exact_match_hide() {
    let sim = SimulatedPlatform::with_external_displays(6);
    let (manager, _notifications) = attached(&sim).await;
    manager.show(5, "menu").await.unwrap();

    assert!(!manager.hide(Some(6), Some("menu")).await);
    assert_eq!(manager.list_active().await, vec!["menu"]);

    assert!(manager.hide(Some(5), Some("menu")).await);
    assert!(manager.list_active().await.is_empty());
}

#[tokio::test]
async fn test_hide_all_three_sessions() {
    let sim = SimulatedPlatform::with_external_displays(3);
    let (manager, _notifications) = attached(&sim).await;
    manager.show(1, "a").await.unwrap();
    manager.show(2, "b").await.unwrap();
    manager.show(3, "c").await.unwrap();
    assert_eq!(manager.list_active().await, vec!["a", "b", "c"]);

    assert_eq!(manager.hide_all().await, 3);
    assert!(manager.list_active().await.is_empty());
    assert_eq!(manager.stats().await.cached_contexts, 3);
}

#[tokio::test]
async fn test_hide_survives_detach_failure() {
    let sim = SimulatedPlatform::with_external_displays(1);
    let (manager, _notifications) = attached(&sim).await;
    manager.show(1, "menu").await.unwrap();
    sim.set_fail_detach(true);

    assert!(manager.hide(None, Some("menu")).await);
    assert!(manager.list_active().await.is_empty());
}

#[tokio::test]
async fn test_transfer_without_destination() {
    let sim = SimulatedPlatform::with_external_displays(1);
    let (manager, _notifications) = attached(&sim).await;

    assert!(!manager.transfer(None, json!({"total": 1})).await);
    assert!(!manager.transfer(Some("ghost"), json!({"total": 1})).await);
    assert!(sim.delivered().is_empty());
}

#[tokio::test]
async fn test_display_event_sequence() {
    let sim = SimulatedPlatform::new();
    let (manager, _notifications) = attached(&sim).await;

    let stale = manager.subscribe_display_events();
    let events = manager.subscribe_display_events();
    assert_eq!(sim.listener_count(), 1);

    let id = sim.connect_display("Projector");
    sim.disconnect_display(id);
    manager.unsubscribe_display_events();

    assert_eq!(events.collect::<Vec<i32>>().await, vec![1, 0]);
    assert!(stale.collect::<Vec<i32>>().await.is_empty());
}

#[tokio::test]
async fn test_list_display_on_empty_platform() {
    let sim = SimulatedPlatform::new();
    sim.clear_displays();
    let (manager, _notifications) = attached(&sim).await;
    assert!(manager.list_displays(None).is_empty());
}

#[tokio::test]
async fn test_ready_notification_after_manual_attach() {
    let sim = SimulatedPlatform::with_external_displays(1);
    sim.set_manual_ready(true);
    let (manager, mut notifications) = attached(&sim).await;

    manager.show(1, "menu").await.unwrap();
    assert!(notifications.try_recv().is_err());

    assert!(sim.attach_content("menu"));
    let notification = notifications.recv().await.unwrap();
    assert_eq!(
        notification,
        Notification::PresentationReady {
            router_name: "menu".to_string()
        }
    );
}

#[tokio::test]
async fn test_detach_host_blocks_new_contexts() {
    let sim = SimulatedPlatform::with_external_displays(1);
    let (manager, _notifications) = attached(&sim).await;
    manager.show(1, "menu").await.unwrap();

    assert_eq!(manager.detach_host().await, 1);
    assert!(manager.show(1, "fresh").await.is_err());
    assert!(manager.prewarm(Some("fresh")).await.is_err());
    // Cached contexts stay addressable by tag.
    assert!(manager.transfer(Some("menu"), json!("still here")).await);
}
