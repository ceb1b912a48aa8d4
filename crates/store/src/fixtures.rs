//! Demo catalog and behavior histories.

use chrono::{DateTime, Duration, Utc};
use shelfwise_model::{BehaviorEvent, EventKind, Item};

const HISTORY_DAYS: i64 = 30;

pub(crate) fn demo_items() -> Vec<Item> {
    let mut retired = Item::new("phone_000", "phone", "Nokia", 1299.0, 3.6).with_name("Nokia 8.3");
    retired.active = false;

    vec![
        Item::new("laptop_001", "laptop", "Lenovo", 8999.0, 4.8).with_name("ThinkPad X1 Carbon"),
        Item::new("laptop_002", "laptop", "Apple", 7999.0, 4.9).with_name("MacBook Air M2"),
        Item::new("laptop_003", "laptop", "Lenovo", 5499.0, 4.5).with_name("Xiaoxin Pro 16"),
        Item::new("laptop_004", "laptop", "Asus", 6999.0, 4.6).with_name("TUF Gaming A15"),
        Item::new("laptop_005", "laptop", "Dell", 4599.0, 4.3).with_name("Inspiron 14"),
        Item::new("phone_001", "phone", "Apple", 7999.0, 4.9).with_name("iPhone 15 Pro"),
        Item::new("phone_002", "phone", "Huawei", 6999.0, 4.7).with_name("Mate 60 Pro"),
        Item::new("phone_003", "phone", "Xiaomi", 3999.0, 4.5).with_name("Xiaomi 14"),
        Item::new("tablet_001", "tablet", "Apple", 8999.0, 4.8).with_name("iPad Pro 12.9"),
        Item::new("tablet_002", "tablet", "Microsoft", 7999.0, 4.6).with_name("Surface Pro 9"),
        Item::new("headphone_001", "headphone", "Apple", 1899.0, 4.8).with_name("AirPods Pro 2"),
        Item::new("headphone_002", "headphone", "Sony", 2499.0, 4.9).with_name("WH-1000XM5"),
        Item::new("wearable_001", "wearable", "Apple", 2999.0, 4.7)
            .with_name("Apple Watch Series 9"),
        Item::new("wearable_002", "wearable", "Xiaomi", 249.0, 4.4).with_name("Smart Band 8"),
        Item::new("camera_001", "camera", "Sony", 12999.0, 4.8).with_name("Alpha 7 IV"),
        retired,
    ]
}

/// (user, session, kind, item). Category, brand and price come from the item.
const HISTORY: [(&str, &str, EventKind, &str); 30] = [
    ("user_001", "session_001", EventKind::View, "laptop_001"),
    ("user_001", "session_001", EventKind::Click, "laptop_001"),
    ("user_001", "session_002", EventKind::Search, "laptop"),
    ("user_001", "session_002", EventKind::View, "laptop_003"),
    ("user_001", "session_003", EventKind::View, "phone_002"),
    ("user_001", "session_003", EventKind::Click, "phone_002"),
    ("user_002", "session_004", EventKind::View, "phone_001"),
    ("user_002", "session_004", EventKind::Click, "phone_001"),
    ("user_002", "session_005", EventKind::Purchase, "phone_001"),
    ("user_002", "session_006", EventKind::View, "tablet_001"),
    ("user_002", "session_006", EventKind::Click, "tablet_001"),
    ("user_003", "session_007", EventKind::Search, "headphone"),
    ("user_003", "session_007", EventKind::View, "headphone_002"),
    ("user_003", "session_007", EventKind::Click, "headphone_002"),
    ("user_003", "session_008", EventKind::View, "headphone_001"),
    ("user_003", "session_008", EventKind::Click, "headphone_001"),
    ("user_004", "session_009", EventKind::View, "laptop_002"),
    ("user_004", "session_009", EventKind::Click, "laptop_002"),
    ("user_004", "session_010", EventKind::Search, "laptop"),
    ("user_004", "session_010", EventKind::View, "laptop_004"),
    ("user_004", "session_010", EventKind::Click, "laptop_004"),
    ("user_005", "session_011", EventKind::View, "tablet_002"),
    ("user_005", "session_011", EventKind::Click, "tablet_002"),
    ("user_005", "session_012", EventKind::View, "phone_003"),
    ("user_005", "session_012", EventKind::Click, "phone_003"),
    ("user_005", "session_013", EventKind::Purchase, "phone_003"),
    ("user_006", "session_014", EventKind::Click, "headphone_002"),
    ("user_006", "session_014", EventKind::Click, "phone_001"),
    ("user_006", "session_015", EventKind::View, "wearable_001"),
    ("user_006", "session_015", EventKind::Purchase, "wearable_001"),
];

/// One event per day starting `HISTORY_DAYS` before `now`. Search events
/// carry the searched category in place of an item id.
pub(crate) fn demo_events(now: DateTime<Utc>) -> Vec<BehaviorEvent> {
    let items = demo_items();
    let start = now - Duration::days(HISTORY_DAYS);

    HISTORY
        .iter()
        .enumerate()
        .map(|(day, &(user, session, kind, target))| {
            let timestamp =
                start + Duration::days(day as i64) + Duration::hours(1 + day as i64 % 12);
            let event = BehaviorEvent::new(user, kind, timestamp).with_session(session);

            match items.iter().find(|item| item.id == target) {
                Some(item) => event
                    .with_item(&item.id)
                    .with_category(&item.category)
                    .with_brand(&item.brand)
                    .with_price(item.price),
                None => event.with_category(target),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_within_history_window() {
        let now = Utc::now();
        let events = demo_events(now);

        assert_eq!(events.len(), HISTORY.len());
        for event in &events {
            assert!(event.timestamp > now - Duration::days(HISTORY_DAYS));
            assert!(event.timestamp < now);
        }
    }

    #[test]
    fn test_events_reference_catalog() {
        let items = demo_items();
        for event in demo_events(Utc::now()) {
            match event.kind {
                EventKind::Search => assert!(event.item_id.is_none()),
                _ => {
                    let id = event.item_id.unwrap();
                    assert!(items.iter().any(|item| item.id == id && item.active));
                }
            }
        }
    }
}
