use crate::action_queue::{ACTION_QUEUE_CAPACITY, ActionQueue};

use models::{PendingAction, SensorAction};

fn ack(alert_id: u64) -> SensorAction {
    SensorAction::AcknowledgeAlert { alert_id }
}

fn alert_ids(actions: &[PendingAction]) -> Vec<u64> {
    actions
        .iter()
        .map(|pending| match pending.action {
            SensorAction::AcknowledgeAlert { alert_id } => alert_id,
            ref other => panic!("unexpected action {other:?}"),
        })
        .collect()
}

/// **VALUE**: Verifies queued actions come back out in the order they went in.
///
/// **WHY THIS MATTERS**: Actions taken offline are replayed against the sensor on reconnect.
/// "Trust device" followed by "block device" must not be replayed as "block" then "trust".
///
/// **BUG THIS CATCHES**: Would catch the deque being drained from the wrong end.
#[test]
fn given_three_actions_when_dequeue_all_then_fifo_order() {
    // GIVEN: Three queued acknowledgements
    let queue = ActionQueue::new();
    queue.enqueue(ack(1));
    queue.enqueue(ack(2));
    queue.enqueue(ack(3));

    // WHEN: Draining
    let drained = queue.dequeue_all();

    // THEN: Oldest first, and the queue is empty afterwards
    assert_eq!(alert_ids(&drained), vec![1, 2, 3]);
    assert!(queue.is_empty());
    assert_eq!(queue.count(), 0);
}

/// **VALUE**: Verifies a full queue drops exactly the oldest entry.
///
/// **WHY THIS MATTERS**: The queue is bounded so a long outage cannot grow memory without
/// limit. When it overflows, the newest intent of the user must survive.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Rejecting the new action instead of evicting the old one
/// - Evicting more than one entry per overflow
/// - Capacity being off by one
#[test]
fn given_full_queue_when_enqueue_then_oldest_dropped() {
    // GIVEN: A queue filled with alert ids 0..99
    let queue = ActionQueue::new();
    for alert_id in 0..ACTION_QUEUE_CAPACITY as u64 {
        queue.enqueue(ack(alert_id));
    }
    assert!(queue.is_full());

    // WHEN: One more action arrives
    queue.enqueue(ack(999));

    // THEN: Still at capacity, id 0 is gone, 999 is last
    assert_eq!(queue.count(), ACTION_QUEUE_CAPACITY);
    let ids = alert_ids(&queue.dequeue_all());
    let mut expected: Vec<u64> = (1..ACTION_QUEUE_CAPACITY as u64).collect();
    expected.push(999);
    assert_eq!(ids, expected);
}

/// **VALUE**: Verifies requeued actions go back ahead of anything queued meanwhile.
///
/// **WHY THIS MATTERS**: When a replay is interrupted, the unsent actions are older than
/// whatever the user queued after the drain, so they must stay in front.
#[test]
fn given_requeue_front_when_new_actions_queued_meanwhile_then_requeued_first() {
    // GIVEN: Two actions drained for replay, one new action queued afterwards
    let queue = ActionQueue::new();
    queue.enqueue(ack(1));
    queue.enqueue(ack(2));
    let drained = queue.dequeue_all();
    queue.enqueue(ack(3));

    // WHEN: The drained actions are put back
    queue.requeue_front(drained);

    // THEN: Original order, then the new one
    assert_eq!(alert_ids(&queue.dequeue_all()), vec![1, 2, 3]);
}

/// **VALUE**: Verifies requeueing into a nearly full queue still respects capacity.
#[test]
fn given_small_capacity_when_requeue_front_overflows_then_oldest_dropped() {
    // GIVEN: Capacity 2 with one new entry queued
    let queue = ActionQueue::with_capacity(2);
    queue.enqueue(ack(3));

    // WHEN: Two older actions are requeued in front
    queue.requeue_front(vec![ack(1).into(), ack(2).into()]);

    // THEN: The oldest one is dropped
    assert_eq!(alert_ids(&queue.dequeue_all()), vec![2, 3]);
}

/// **VALUE**: Verifies a zero capacity is clamped so the queue can hold something.
#[test]
fn given_zero_capacity_when_constructed_then_holds_one() {
    // GIVEN/WHEN
    let queue = ActionQueue::with_capacity(0);
    queue.enqueue(ack(1));
    queue.enqueue(ack(2));

    // THEN
    assert_eq!(queue.capacity(), 1);
    assert_eq!(alert_ids(&queue.dequeue_all()), vec![2]);
}

#[test]
fn given_queued_actions_when_clear_then_empty() {
    let queue = ActionQueue::new();
    queue.enqueue(SensorAction::SetLearning { enabled: true });
    queue.enqueue(SensorAction::RemoveDecoy {
        decoy_id: String::from("d-1"),
    });

    queue.clear();

    assert!(queue.is_empty());
    assert!(!queue.is_full());
}
