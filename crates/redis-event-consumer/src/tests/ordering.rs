//! Strict arrival order, one unit of work at a time.

use super::harness::{spawn_recording, wait_for, RecordingBus, TestConsumer, UowProbe, OBSERVE_WITHIN};
use crate::dispatcher::FailurePolicy;
use allocation::Command;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn commands_are_handled_in_arrival_order() {
    let bus = RecordingBus::new().with_delay(Duration::from_millis(5));
    let probe = UowProbe::new();
    let (handle, task) = spawn_recording(bus.clone(), probe.clone(), FailurePolicy::FailFast).await;

    for i in 0..10 {
        let channel = if i % 3 == 0 { "change_batch_quantity" } else { "allocate" };
        let payload = if i % 3 == 0 {
            json!({"batchref": format!("b{i}"), "qty": i})
        } else {
            json!({"orderid": format!("o{i}"), "sku": "S1", "qty": i})
        };
        assert_eq!(handle.publish(channel, payload.to_string()), 1);
    }

    let handled = wait_for(OBSERVE_WITHIN, || {
        let handled = bus.handled();
        (handled.len() == 10).then_some(handled)
    })
    .await
    .expect("not every command was handled");

    let keys: Vec<String> = handled
        .iter()
        .map(|command| match command {
            Command::Allocate(c) => c.orderid.clone(),
            Command::ChangeBatchQuantity(c) => c.reference.clone(),
            Command::CreateBatch(c) => c.reference.clone(),
        })
        .collect();
    let expected: Vec<String> = (0..10)
        .map(|i| if i % 3 == 0 { format!("b{i}") } else { format!("o{i}") })
        .collect();
    assert_eq!(keys, expected);

    task.abort();
}

#[tokio::test]
async fn one_unit_of_work_per_command_never_overlapping() {
    let bus = RecordingBus::new().with_delay(Duration::from_millis(5));
    let probe = UowProbe::new();
    let (handle, task) = spawn_recording(bus.clone(), probe.clone(), FailurePolicy::FailFast).await;

    for i in 0..5 {
        handle.publish("allocate", json!({"orderid": format!("o{i}"), "sku": "S1", "qty": 1}).to_string());
    }

    wait_for(OBSERVE_WITHIN, || (bus.handled().len() == 5).then_some(()))
        .await
        .expect("not every command was handled");

    assert_eq!(probe.created(), 5);
    assert_eq!(probe.max_open(), 1);
    assert_eq!(probe.open(), 0);

    task.abort();
}

#[tokio::test]
async fn earlier_command_commits_before_later_one_starts() {
    let consumer = TestConsumer::start(FailurePolicy::FailFast).await;
    consumer.add_batch("batch1", "SMALL-TABLE", 10, None).await;

    // The first order takes all the stock; the second only fits if it ran first.
    consumer.publish("allocate", json!({"orderid": "first", "sku": "SMALL-TABLE", "qty": 10}));
    consumer.publish("allocate", json!({"orderid": "second", "sku": "SMALL-TABLE", "qty": 1}));
    consumer.publish("allocate", json!({"orderid": "marker", "sku": "OTHER", "qty": 1}));

    // The marker fails (unknown sku) once both earlier orders are done.
    let result = super::harness::join_within(consumer.task, OBSERVE_WITHIN).await;
    assert!(result.is_err());

    let allocated: Vec<String> = consumer
        .publisher
        .published_on(allocation::LINE_ALLOCATED_CHANNEL)
        .iter()
        .map(|m| serde_json::from_str::<allocation::Allocated>(&m.payload).unwrap().orderid)
        .collect();
    assert_eq!(allocated, vec!["first".to_string()]);

    let product = consumer.store.get("SMALL-TABLE").unwrap();
    assert_eq!(product.batch("batch1").unwrap().available_quantity(), 0);
}
