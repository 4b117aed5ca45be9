use super::*;
use uuid::Uuid;

#[tokio::test]
async fn test_publish_subscribe() {
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();

    let shop_id = Uuid::new_v4();
    let session_id = Uuid::new_v4();
    bus.publish(SyncEvent::Progress {
        shop_id,
        session_id,
        sku: "ABC-1".to_string(),
        processed: 0,
        total: 3,
    });

    let event = rx.recv().await.unwrap();
    assert_eq!(event.shop_id(), shop_id);
    match event {
        SyncEvent::Progress { sku, processed, total, .. } => {
            assert_eq!(sku, "ABC-1");
            assert_eq!(processed, 0);
            assert_eq!(total, 3);
        }
        _ => panic!("unexpected event type"),
    }
}

#[tokio::test]
async fn test_multiple_subscribers() {
    let bus = EventBus::new(16);
    let mut rx1 = bus.subscribe();
    let mut rx2 = bus.subscribe();

    assert_eq!(bus.subscriber_count(), 2);

    let shop_id = Uuid::new_v4();
    let count = bus.publish(SyncEvent::Complete {
        shop_id,
        session_id: None,
        status: None,
    });
    assert_eq!(count, 2);

    assert_eq!(rx1.recv().await.unwrap().shop_id(), shop_id);
    assert_eq!(rx2.recv().await.unwrap().shop_id(), shop_id);
}

#[test]
fn test_publish_without_subscribers_is_dropped() {
    let bus = EventBus::new(16);
    let delivered = bus.publish(SyncEvent::Error {
        shop_id: Uuid::new_v4(),
        session_id: None,
        message: "boom".to_string(),
    });
    assert_eq!(delivered, 0);
}

#[test]
fn test_event_serialization() {
    let event = SyncEvent::Progress {
        shop_id: Uuid::nil(),
        session_id: Uuid::nil(),
        sku: "ABC-1".to_string(),
        processed: 1,
        total: 3,
    };
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"type\":\"progress\""));
    assert!(json.contains("\"sku\":\"ABC-1\""));

    let clear = SyncEvent::Complete {
        shop_id: Uuid::nil(),
        session_id: None,
        status: None,
    };
    let json = serde_json::to_string(&clear).unwrap();
    assert!(json.contains("\"type\":\"complete\""));
    // bare clear omits the optional fields entirely
    assert!(!json.contains("session_id"));
}
