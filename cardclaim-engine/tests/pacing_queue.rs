mod support;

use std::sync::Arc;
use std::time::Duration;

use cardclaim_engine::{
    ClaimPacingQueue, ClaimTask, FollowUpConfig, FollowUpResponder, Jitter, PacingConfig,
    QueueError, ResponsePools,
};
use support::{GROUP, RecordingTransport, Sent};

fn quiet_config() -> PacingConfig {
    PacingConfig {
        follow_up_chance: 0.0,
        ..PacingConfig::default()
    }
}

fn tasks(n: usize) -> Vec<ClaimTask> {
    (0..n)
        .map(|i| ClaimTask::new(GROUP, format!("ID{i}"), None, "test", 1_500))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn claims_run_in_fifo_order_without_overlap() {
    let transport = Arc::new(RecordingTransport::default());
    let queue = ClaimPacingQueue::spawn(transport.clone(), None, Jitter::from_seed(1), quiet_config());

    for task in tasks(5) {
        queue.enqueue(task).unwrap();
    }
    assert_eq!(queue.depth(), 5);
    queue.wait_idle().await;

    let texts = transport.texts();
    let expected: Vec<String> = (0..5).map(|i| format!(".claim ID{i}")).collect();
    assert_eq!(texts, expected);

    // typing always precedes its claim, and claims never interleave
    let kinds: Vec<bool> = transport
        .events()
        .iter()
        .map(|(_, sent)| matches!(sent, Sent::Typing { .. }))
        .collect();
    assert_eq!(kinds, [true, false].repeat(5));

    // delay 1500 + typing ≥ 500 + buffer 2000 between consecutive claims
    let times = transport.timed_texts();
    for pair in times.windows(2) {
        let gap = pair[1].0 - pair[0].0;
        assert!(gap >= Duration::from_millis(4_000), "gap {gap:?}");
        assert!(gap < Duration::from_millis(4_500), "gap {gap:?}");
    }
    assert_eq!(queue.depth(), 0);
    assert!(!queue.is_processing());
}

#[tokio::test(start_paused = true)]
async fn first_claim_waits_for_configured_delay_and_typing() {
    let transport = Arc::new(RecordingTransport::default());
    let queue = ClaimPacingQueue::spawn(transport.clone(), None, Jitter::from_seed(2), quiet_config());
    let start = tokio::time::Instant::now();

    queue
        .enqueue(ClaimTask::new(GROUP, "SLOW", None, "test", 3_000))
        .unwrap();
    queue.wait_idle().await;

    let events = transport.events();
    let (typing_at, _) = &events[0];
    let (sent_at, _) = &events[1];
    assert_eq!(*typing_at - start, Duration::from_millis(3_000));
    let typing = *sent_at - *typing_at;
    assert!(typing >= Duration::from_millis(500) && typing < Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn failing_claim_does_not_block_later_claims() {
    let transport = Arc::new(RecordingTransport::default());
    transport.fail_on(".claim ID2");
    let queue = ClaimPacingQueue::spawn(transport.clone(), None, Jitter::from_seed(3), quiet_config());

    for task in tasks(5) {
        queue.enqueue(task).unwrap();
    }
    queue.wait_idle().await;

    assert_eq!(
        transport.texts(),
        vec![".claim ID0", ".claim ID1", ".claim ID3", ".claim ID4"]
    );
}

#[tokio::test(start_paused = true)]
async fn panicking_transport_releases_the_gate() {
    let transport = Arc::new(RecordingTransport::default());
    transport.panic_on(".claim ID1");
    let queue = ClaimPacingQueue::spawn(transport.clone(), None, Jitter::from_seed(4), quiet_config());

    for task in tasks(3) {
        queue.enqueue(task).unwrap();
    }
    queue.wait_idle().await;

    assert_eq!(transport.texts(), vec![".claim ID0", ".claim ID2"]);
    assert!(!queue.is_processing());
}

#[tokio::test(start_paused = true)]
async fn bounded_queue_rejects_overflow() {
    let transport = Arc::new(RecordingTransport::default());
    let config = PacingConfig {
        max_depth: Some(2),
        ..quiet_config()
    };
    let queue = ClaimPacingQueue::spawn(transport.clone(), None, Jitter::from_seed(5), config);

    let mut pending = tasks(3).into_iter();
    queue.enqueue(pending.next().unwrap()).unwrap();
    queue.enqueue(pending.next().unwrap()).unwrap();
    assert_eq!(
        queue.enqueue(pending.next().unwrap()),
        Err(QueueError::Full { depth: 2 })
    );

    queue.wait_idle().await;
    assert_eq!(transport.texts().len(), 2);
    // capacity frees up once the backlog drains
    queue.enqueue(ClaimTask::new(GROUP, "LATE", None, "test", 0)).unwrap();
    queue.wait_idle().await;
    assert_eq!(transport.texts().last().map(String::as_str), Some(".claim LATE"));
}

#[tokio::test(start_paused = true)]
async fn gate_is_held_while_a_claim_is_in_flight() {
    let transport = Arc::new(RecordingTransport::default());
    let queue = ClaimPacingQueue::spawn(transport.clone(), None, Jitter::from_seed(6), quiet_config());

    queue.enqueue(tasks(1).remove(0)).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(queue.is_processing());
    assert_eq!(queue.depth(), 1);

    queue.wait_idle().await;
    assert!(!queue.is_processing());
}

#[tokio::test(start_paused = true)]
async fn follow_up_is_sent_after_the_claim() {
    let transport = Arc::new(RecordingTransport::default());
    let responder = FollowUpResponder::new(
        transport.clone(),
        ResponsePools {
            texts: vec!["gg".to_string()],
            stickers: Vec::new(),
        },
        Jitter::from_seed(7),
        FollowUpConfig::default(),
    );
    let config = PacingConfig {
        follow_up_chance: 1.0,
        ..PacingConfig::default()
    };
    let queue = ClaimPacingQueue::spawn(transport.clone(), Some(responder), Jitter::from_seed(7), config);

    queue.enqueue(tasks(1).remove(0)).unwrap();
    queue.wait_idle().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    let times = transport.timed_texts();
    assert_eq!(times.len(), 2);
    assert_eq!(times[0].1, ".claim ID0");
    assert_eq!(times[1].1, "gg");
    // 3–8 s follow-up delay plus 0.5–2 s typing
    let gap = times[1].0 - times[0].0;
    assert!(gap >= Duration::from_millis(3_500) && gap < Duration::from_millis(10_000));
}

#[tokio::test(start_paused = true)]
async fn failed_claim_schedules_no_follow_up() {
    let transport = Arc::new(RecordingTransport::default());
    transport.fail_on(".claim ID0");
    let responder = FollowUpResponder::new(
        transport.clone(),
        ResponsePools {
            texts: vec!["gg".to_string()],
            stickers: Vec::new(),
        },
        Jitter::from_seed(7),
        FollowUpConfig::default(),
    );
    let config = PacingConfig {
        follow_up_chance: 1.0,
        ..PacingConfig::default()
    };
    let queue = ClaimPacingQueue::spawn(transport.clone(), Some(responder), Jitter::from_seed(7), config);

    queue.enqueue(tasks(1).remove(0)).unwrap();
    queue.wait_idle().await;
    tokio::time::sleep(Duration::from_secs(15)).await;

    assert!(transport.texts().is_empty());
    assert!(
        transport
            .events()
            .iter()
            .all(|(_, sent)| matches!(sent, Sent::Typing { .. }))
    );
}
