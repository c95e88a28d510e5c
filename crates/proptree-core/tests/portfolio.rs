use proptree_core::{
    ManualClock, PropertyRecord, ReceiverTree, Scalar, SenderProperty, SyncError,
};

fn ticker(name: &str, price: f32, currency: &str, volume: i32) -> Result<SenderProperty, SyncError> {
    SenderProperty::group(
        name,
        [
            SenderProperty::leaf("Price", price),
            SenderProperty::leaf("Currency", currency),
            SenderProperty::leaf("Volume", volume),
        ],
    )
}

fn portfolio() -> SenderProperty {
    SenderProperty::group(
        "Portfolio",
        [
            ticker("TICKER1", 100.0, "USD", 1000).unwrap(),
            ticker("TICKER2", 200.0, "EUR", 2000).unwrap(),
        ],
    )
    .unwrap()
}

fn sync(producer: &mut SenderProperty, consumer: &mut ReceiverTree, clock: &ManualClock) -> Option<PropertyRecord> {
    let record = producer.encode_dirty(clock)?;
    let report = consumer.merge(&record);
    assert!(report.is_clean(), "unexpected merge issues: {:?}", report.issues);
    Some(record)
}

#[test]
fn full_snapshot_reproduces_producer_tree() {
    let clock = ManualClock::new(1_000);
    let mut producer = portfolio();
    let mut consumer = ReceiverTree::new(0);

    sync(&mut producer, &mut consumer, &clock).unwrap();

    assert_eq!(consumer.dump(), producer.describe());
    let dump = consumer.dump();
    assert!(dump.contains("\"TICKER1\""));
    assert!(dump.contains("\"TICKER2\""));
}

#[test]
fn single_leaf_update_changes_only_that_leaf() {
    let clock = ManualClock::new(1_000);
    let mut producer = portfolio();
    let mut consumer = ReceiverTree::new(0);
    sync(&mut producer, &mut consumer, &clock).unwrap();

    let ticker2_before = consumer.get("Portfolio/TICKER2").cloned();
    let currency_before = consumer.get("Portfolio/TICKER1/Currency").cloned();
    let volume_before = consumer.get("Portfolio/TICKER1/Volume").cloned();

    clock.advance(500);
    producer
        .set_value_at("TICKER1/Price", 150.0_f32)
        .unwrap();
    let delta = sync(&mut producer, &mut consumer, &clock).unwrap();

    assert_eq!(delta.count(), 3);
    assert_eq!(consumer.get("Portfolio/TICKER2").cloned(), ticker2_before);
    assert_eq!(consumer.get("Portfolio/TICKER1/Currency").cloned(), currency_before);
    assert_eq!(consumer.get("Portfolio/TICKER1/Volume").cloned(), volume_before);

    let price = consumer.get("Portfolio/TICKER1/Price").unwrap();
    assert_eq!(price.as_scalar(), Some(&Scalar::Float(150.0)));
    assert_eq!(price.timestamp(), 1_500);
    assert_eq!(consumer.dump(), producer.describe());
}

#[test]
fn idle_cycle_sends_nothing() {
    let clock = ManualClock::new(0);
    let mut producer = portfolio();
    let mut consumer = ReceiverTree::new(0);
    sync(&mut producer, &mut consumer, &clock).unwrap();

    assert!(sync(&mut producer, &mut consumer, &clock).is_none());
}

#[test]
fn removal_propagates_as_tombstone() {
    let clock = ManualClock::new(0);
    let mut producer = portfolio();
    let mut consumer = ReceiverTree::new(0);
    sync(&mut producer, &mut consumer, &clock).unwrap();

    producer
        .get_mut("TICKER1")
        .and_then(SenderProperty::as_group_mut)
        .unwrap()
        .remove_child("Volume")
        .unwrap();
    sync(&mut producer, &mut consumer, &clock).unwrap();

    assert!(consumer.get("Portfolio/TICKER1/Volume").is_none());
    assert!(consumer.get("Portfolio/TICKER1/Price").is_some());
    assert_eq!(consumer.dump(), producer.describe());
}

#[test]
fn reconnect_snapshot_rebuilds_fresh_consumer() {
    let clock = ManualClock::new(0);
    let mut producer = portfolio();
    let mut first = ReceiverTree::new(0);
    sync(&mut producer, &mut first, &clock).unwrap();
    producer.set_value_at("TICKER2/Currency", "CHF").unwrap();
    sync(&mut producer, &mut first, &clock).unwrap();

    let mut second = ReceiverTree::new(0);
    producer.mark_all_dirty();
    sync(&mut producer, &mut second, &clock).unwrap();

    assert_eq!(first.dump(), second.dump());
}
