// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn custom(name: &str) -> Event {
    Event::Custom { name: name.to_string(), data: json!({}) }
}

#[test]
fn publish_without_subscribers_is_fine() {
    let bus = EventBus::new();
    assert_eq!(bus.publish(custom("nobody")), 0);
}

#[test]
fn every_subscriber_sees_every_event_in_order() {
    let bus = EventBus::new();
    let mut a = bus.subscribe();
    let mut b = bus.clone().subscribe();

    assert_eq!(bus.publish(custom("one")), 2);
    bus.publish(custom("two"));

    for rx in [&mut a, &mut b] {
        assert_eq!(rx.try_recv().unwrap().name(), "one");
        assert_eq!(rx.try_recv().unwrap().name(), "two");
        assert!(rx.try_recv().is_err());
    }
}

#[test]
fn late_subscriber_misses_earlier_events() {
    let bus = EventBus::new();
    bus.publish(custom("early"));
    let mut rx = bus.subscribe();
    bus.publish(custom("late"));

    assert_eq!(rx.try_recv().unwrap().name(), "late");
}

#[test]
fn dropped_subscribers_are_pruned() {
    let bus = EventBus::new();
    let keep = bus.subscribe();
    drop(bus.subscribe());
    assert_eq!(bus.subscriber_count(), 1);

    assert_eq!(bus.publish(custom("x")), 1);
    drop(keep);
    assert_eq!(bus.publish(custom("y")), 0);
}
