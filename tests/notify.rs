use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_test::{assert_err, assert_ok};

use allot::engine::{EventRequest, Registries, Scheduler};
use allot::model::*;
use allot::notify::{Notification, NotifyHub};

const H: Ms = HOUR_MS;

// ── Test infrastructure ──────────────────────────────────────

fn base() -> Ms {
    (chrono::Utc::now().timestamp_millis() / DAY_MS + 2) * DAY_MS
}

fn start_scheduler() -> Arc<Scheduler> {
    let mut reg = Registries::default();
    for (id, category, capacity) in [
        ("gpu", ResourceCategory::Computational, 2),
        ("lead", ResourceCategory::Human, 1),
        ("room", ResourceCategory::Space, 1),
    ] {
        reg.resources
            .add(Resource::new(Some(id.into()), id, category, capacity).unwrap());
    }
    Arc::new(Scheduler::new(reg, Arc::new(NotifyHub::new())))
}

/// Wait for a notification with timeout.
async fn recv_notification(
    rx: &mut broadcast::Receiver<Notification>,
    timeout: Duration,
) -> Option<Notification> {
    tokio::time::timeout(timeout, rx.recv()).await.ok().and_then(Result::ok)
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn schedule_notifies_every_allocated_resource_once() {
    let s = start_scheduler();
    let mut gpu = s.notify.subscribe(&"gpu".into());
    let mut lead = s.notify.subscribe(&"lead".into());
    let b = base();

    let placed = assert_ok!(
        s.schedule_event(
            EventRequest::new("train", Span::new(b + H, b + 3 * H), EventCategory::Training)
                .with_resource("gpu", 2)
                .with_resource("lead", 1),
        )
        .await
    );
    let event = placed.into_event();
    let expected = Notification::Scheduled {
        event_id: event.id.clone(),
        span: event.span,
    };

    assert_eq!(recv_notification(&mut gpu, Duration::from_secs(1)).await, Some(expected.clone()));
    assert_eq!(recv_notification(&mut lead, Duration::from_secs(1)).await, Some(expected));
    // Two units of gpu still produce a single notification.
    assert!(gpu.try_recv().is_err());
}

#[tokio::test]
async fn rejected_requests_are_silent() {
    let s = start_scheduler();
    let mut room = s.notify.subscribe(&"room".into());
    let b = base();

    assert_ok!(
        s.schedule_event(
            EventRequest::new("standup", Span::new(b + H, b + 2 * H), EventCategory::Meeting)
                .with_resource("room", 1),
        )
        .await
    );
    assert!(recv_notification(&mut room, Duration::from_secs(1)).await.is_some());

    assert_err!(
        s.schedule_event(
            EventRequest::new("clash", Span::new(b + H, b + 2 * H), EventCategory::Meeting)
                .with_resource("room", 1),
        )
        .await
    );
    assert!(recv_notification(&mut room, Duration::from_millis(100)).await.is_none());
}

#[tokio::test]
async fn reschedule_reports_the_committed_window() {
    let s = start_scheduler();
    let mut room = s.notify.subscribe(&"room".into());
    let b = base();

    assert_ok!(
        s.schedule_event(
            EventRequest::new("first", Span::new(b + 10 * H, b + 12 * H), EventCategory::Seminar)
                .with_resource("room", 1),
        )
        .await
    );
    let _ = recv_notification(&mut room, Duration::from_secs(1)).await;

    let placed = assert_ok!(
        s.schedule_event(
            EventRequest::new("second", Span::new(b + 11 * H, b + 13 * H), EventCategory::Seminar)
                .with_resource("room", 1)
                .auto_reschedule(true),
        )
        .await
    );
    assert!(placed.is_rescheduled());

    match recv_notification(&mut room, Duration::from_secs(1)).await {
        Some(Notification::Scheduled { span, .. }) => {
            assert_eq!(span, Span::new(b + 12 * H, b + 14 * H));
        }
        other => panic!("expected a scheduled notification, got {other:?}"),
    }
}

#[tokio::test]
async fn lifecycle_sequence() {
    let s = start_scheduler();
    let mut gpu = s.notify.subscribe(&"gpu".into());
    let b = base();

    let event = assert_ok!(
        s.schedule_event(
            EventRequest::new("infer", Span::new(b + H, b + 2 * H), EventCategory::Inference)
                .with_resource("gpu", 1),
        )
        .await
    )
    .into_event();
    assert_ok!(s.cancel_event(&event.id).await);
    assert_ok!(s.delete_event(&event.id).await);

    let mut seen = Vec::new();
    while let Some(n) = recv_notification(&mut gpu, Duration::from_millis(200)).await {
        assert_eq!(n.event_id(), &event.id);
        seen.push(n);
    }
    assert!(matches!(seen[0], Notification::Scheduled { .. }));
    assert!(matches!(seen[1], Notification::Cancelled { .. }));
    assert!(matches!(seen[2], Notification::Deleted { .. }));
    assert_eq!(seen.len(), 3);
}
