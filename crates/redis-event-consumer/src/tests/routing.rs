//! Channel binding and unbound channels.

use super::harness::{
    recording_dispatcher as dispatcher, spawn_recording, wait_for, RecordingBus, UowProbe,
    OBSERVE_WITHIN,
};
use crate::dispatcher::{FailurePolicy, Outcome};
use crate::transport::RawMessage;
use allocation::{Allocate, ChangeBatchQuantity, Command};

#[tokio::test]
async fn allocate_payload_becomes_allocate_command() {
    let bus = RecordingBus::new();
    let probe = UowProbe::new();
    let dispatcher = dispatcher(bus.clone(), &probe, FailurePolicy::FailFast);

    let outcome = dispatcher
        .process_message(RawMessage::message(
            "allocate",
            r#"{"orderid":"o1","sku":"RED-CHAIR","qty":3}"#,
        ))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Handled);
    assert_eq!(
        bus.handled(),
        vec![Command::Allocate(Allocate {
            orderid: "o1".to_string(),
            sku: "RED-CHAIR".to_string(),
            qty: 3,
        })]
    );
    assert_eq!(probe.created(), 1);
    assert_eq!(probe.open(), 0);
}

#[tokio::test]
async fn change_batch_quantity_payload_maps_batchref_to_reference() {
    let bus = RecordingBus::new();
    let probe = UowProbe::new();
    let dispatcher = dispatcher(bus.clone(), &probe, FailurePolicy::FailFast);

    dispatcher
        .process_message(RawMessage::message(
            "change_batch_quantity",
            r#"{"batchref":"batch-001","qty":5}"#,
        ))
        .await
        .unwrap();

    assert_eq!(
        bus.handled(),
        vec![Command::ChangeBatchQuantity(ChangeBatchQuantity {
            reference: "batch-001".to_string(),
            qty: 5,
        })]
    );
}

#[tokio::test]
async fn unbound_channel_is_dropped_without_a_unit_of_work() {
    let bus = RecordingBus::new();
    let probe = UowProbe::new();
    let dispatcher = dispatcher(bus.clone(), &probe, FailurePolicy::FailFast);

    for channel in ["line_allocated", "Allocate", "allocate ", ""] {
        let outcome = dispatcher
            .process_message(RawMessage::message(channel, "not json"))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Unbound, "channel {channel:?}");
    }

    assert!(bus.handled().is_empty());
    assert_eq!(probe.created(), 0);
}

#[tokio::test]
async fn extra_payload_fields_are_ignored() {
    let bus = RecordingBus::new();
    let probe = UowProbe::new();
    let dispatcher = dispatcher(bus.clone(), &probe, FailurePolicy::FailFast);

    let outcome = dispatcher
        .process_message(RawMessage::message(
            "allocate",
            r#"{"orderid":"o1","sku":"S1","qty":1,"source":"api"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Handled);
}

#[tokio::test]
async fn running_loop_survives_unbound_messages() {
    let bus = RecordingBus::new();
    let (handle, task) = spawn_recording(bus.clone(), UowProbe::new(), FailurePolicy::FailFast).await;

    handle.inject(RawMessage::message("line_allocated", r#"{"orderid":"o1"}"#));
    handle.inject(RawMessage::message("unknown", "garbage"));
    handle.publish("allocate", r#"{"orderid":"o2","sku":"S1","qty":1}"#);

    let handled = wait_for(OBSERVE_WITHIN, || {
        let handled = bus.handled();
        (!handled.is_empty()).then_some(handled)
    })
    .await
    .expect("allocate was not handled");

    assert_eq!(handled.len(), 1);
    assert!(!task.is_finished());
    task.abort();
}
