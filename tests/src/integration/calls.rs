//! Group call completion policies, end to end.

use super::*;
use crate::memchannel::InMemoryCluster;
use groupcall_dispatch::{CallOptions, ReplyStatus, ResponseMode, Termination};
use std::time::Instant;

const SCOPE: ScopeId = ScopeId(1);

#[tokio::test]
async fn test_all_mode_collects_every_destination() {
    init_tracing();
    let cluster = InMemoryCluster::new();

    let (caller_ch, caller_mux) = spawn_node(&cluster, "caller");
    let caller = dispatcher_on(&caller_ch, &caller_mux, SCOPE, "caller");

    let (b_ch, b_mux) = spawn_node(&cluster, "b");
    let b = dispatcher_on(&b_ch, &b_mux, SCOPE, "b");
    b.set_request_handler(Arc::new(NamedHandler("beta")));

    let (c_ch, c_mux) = spawn_node(&cluster, "c");
    let c = dispatcher_on(&c_ch, &c_mux, SCOPE, "c");
    c.set_request_handler(Arc::new(NamedHandler("gamma")));

    let dests = vec![b_ch.local_address(), c_ch.local_address()];
    let result = caller
        .call(
            &dests,
            b"who are you?".to_vec(),
            CallOptions::default().timeout(Duration::from_secs(2)),
        )
        .await
        .unwrap();

    assert_eq!(result.termination, Termination::Satisfied);
    assert_eq!(
        result.replies[&dests[0]].value(),
        Some(b"beta".as_ref())
    );
    assert_eq!(
        result.replies[&dests[1]].value(),
        Some(b"gamma".as_ref())
    );
    assert_eq!(caller.pending_calls(), 0);
}

#[tokio::test]
async fn test_first_mode_does_not_wait_for_slow_responders() {
    init_tracing();
    let cluster = InMemoryCluster::new();

    let (caller_ch, caller_mux) = spawn_node(&cluster, "caller");
    let caller = dispatcher_on(&caller_ch, &caller_mux, SCOPE, "caller");

    let (fast_ch, fast_mux) = spawn_node(&cluster, "fast");
    let fast = dispatcher_on(&fast_ch, &fast_mux, SCOPE, "fast");
    fast.set_request_handler(Arc::new(NamedHandler("fast")));

    let (slow_ch, slow_mux) = spawn_node(&cluster, "slow");
    let slow = dispatcher_on(&slow_ch, &slow_mux, SCOPE, "slow");
    slow.set_request_handler(Arc::new(SlowHandler {
        delay: Duration::from_secs(2),
        reply: "slow",
    }));

    let started = Instant::now();
    let result = caller
        .call(
            &[fast_ch.local_address(), slow_ch.local_address()],
            b"race".to_vec(),
            CallOptions::new(ResponseMode::First).timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();

    assert_eq!(result.termination, Termination::Satisfied);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(result.value_count(), 1);
    assert_eq!(
        result.replies[&fast_ch.local_address()].value(),
        Some(b"fast".as_ref())
    );
}

#[tokio::test]
async fn test_majority_mode_completes_at_two_of_three() {
    init_tracing();
    let cluster = InMemoryCluster::new();

    let (caller_ch, caller_mux) = spawn_node(&cluster, "caller");
    let caller = dispatcher_on(&caller_ch, &caller_mux, SCOPE, "caller");

    let mut dests = Vec::new();
    let mut responders = Vec::new();
    for name in ["r1", "r2"] {
        let (ch, mux) = spawn_node(&cluster, name);
        let d = dispatcher_on(&ch, &mux, SCOPE, name);
        d.set_request_handler(Arc::new(NamedHandler("up")));
        dests.push(ch.local_address());
        responders.push(d);
    }
    // Third destination exists on the wire but never answers.
    let (silent_ch, _silent_mux) = spawn_node(&cluster, "silent");
    dests.push(silent_ch.local_address());

    let started = Instant::now();
    let result = caller
        .call(
            &dests,
            b"vote".to_vec(),
            CallOptions::new(ResponseMode::Majority).timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();

    assert_eq!(result.termination, Termination::Satisfied);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(result.value_count(), 2);
    assert_eq!(result.replies[&dests[2]].status, ReplyStatus::Unresolved);
}

#[tokio::test]
async fn test_timeout_returns_partial_result_without_error() {
    init_tracing();
    let cluster = InMemoryCluster::new();

    let (caller_ch, caller_mux) = spawn_node(&cluster, "caller");
    let caller = dispatcher_on(&caller_ch, &caller_mux, SCOPE, "caller");

    let (b_ch, b_mux) = spawn_node(&cluster, "b");
    let b = dispatcher_on(&b_ch, &b_mux, SCOPE, "b");
    b.set_request_handler(Arc::new(NamedHandler("beta")));

    // This endpoint has no dispatcher on the scope: requests to it vanish.
    let (ghost_ch, _ghost_mux) = spawn_node(&cluster, "ghost");

    let timeout = Duration::from_millis(200);
    let started = Instant::now();
    let result = caller
        .call(
            &[b_ch.local_address(), ghost_ch.local_address()],
            b"anyone?".to_vec(),
            CallOptions::default().timeout(timeout),
        )
        .await
        .unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + Duration::from_secs(1), "bounded slack");
    assert_eq!(result.termination, Termination::TimedOut);
    assert_eq!(
        result.replies[&b_ch.local_address()].value(),
        Some(b"beta".as_ref())
    );
    assert_eq!(
        result.replies[&ghost_ch.local_address()].status,
        ReplyStatus::Unresolved
    );
    assert_eq!(caller.pending_calls(), 0);
}

#[tokio::test]
async fn test_transport_failure_is_that_destinations_error() {
    init_tracing();
    let cluster = InMemoryCluster::new();

    let (caller_ch, caller_mux) = spawn_node(&cluster, "caller");
    let caller = dispatcher_on(&caller_ch, &caller_mux, SCOPE, "caller");

    let (b_ch, b_mux) = spawn_node(&cluster, "b");
    let b = dispatcher_on(&b_ch, &b_mux, SCOPE, "b");
    b.set_request_handler(Arc::new(NamedHandler("beta")));

    let (broken_ch, _broken_mux) = spawn_node(&cluster, "broken");
    cluster.fail_sends_to(broken_ch.local_address());

    let result = caller
        .call(
            &[b_ch.local_address(), broken_ch.local_address()],
            b"hello".to_vec(),
            CallOptions::default().timeout(Duration::from_secs(2)),
        )
        .await
        .unwrap();

    // The failed send is terminal, so ALL mode still completes.
    assert_eq!(result.termination, Termination::Satisfied);
    assert!(matches!(
        result.replies[&broken_ch.local_address()].status,
        ReplyStatus::Error(_)
    ));
    assert_eq!(
        result.replies[&b_ch.local_address()].value(),
        Some(b"beta".as_ref())
    );
}

#[tokio::test]
async fn test_concurrent_calls_do_not_interfere() {
    init_tracing();
    let cluster = InMemoryCluster::new();

    let (caller_ch, caller_mux) = spawn_node(&cluster, "caller");
    let caller = dispatcher_on(&caller_ch, &caller_mux, SCOPE, "caller");

    let (echo_ch, echo_mux) = spawn_node(&cluster, "echo");
    let echo = dispatcher_on(&echo_ch, &echo_mux, SCOPE, "echo");
    echo.set_request_handler(Arc::new(super::RecordingHandler::default()));

    let dest = echo_ch.local_address();
    let mut calls = Vec::new();
    for i in 0..20u8 {
        let caller = caller.clone();
        calls.push(tokio::spawn(async move {
            caller
                .call_one(
                    dest,
                    vec![i],
                    CallOptions::default().timeout(Duration::from_secs(2)),
                )
                .await
        }));
    }

    for call in calls {
        let reply = call.await.unwrap().unwrap();
        assert_eq!(reply.value(), Some(b"ok".as_ref()));
    }
}
