//! Scope isolation: independent services sharing one channel.

use super::*;
use crate::memchannel::InMemoryCluster;
use groupcall_dispatch::{CallOptions, Termination};
use groupcall_types::Message;

const SCOPE_ONE: ScopeId = ScopeId(1);
const SCOPE_TWO: ScopeId = ScopeId(2);

#[tokio::test]
async fn test_dispatchers_on_distinct_scopes_never_cross() {
    init_tracing();
    let cluster = InMemoryCluster::new();

    let (a_ch, a_mux) = spawn_node(&cluster, "a");
    let a_one = dispatcher_on(&a_ch, &a_mux, SCOPE_ONE, "a-one");
    let a_two = dispatcher_on(&a_ch, &a_mux, SCOPE_TWO, "a-two");

    let (b_ch, b_mux) = spawn_node(&cluster, "b");
    let b_one = dispatcher_on(&b_ch, &b_mux, SCOPE_ONE, "b-one");
    let b_two = dispatcher_on(&b_ch, &b_mux, SCOPE_TWO, "b-two");

    let one_handler = Arc::new(RecordingHandler::default());
    let two_handler = Arc::new(RecordingHandler::default());
    b_one.set_request_handler(one_handler.clone());
    b_two.set_request_handler(two_handler.clone());

    let dest = b_ch.local_address();
    let opts = || CallOptions::default().timeout(Duration::from_secs(2));

    let reply = a_one.call_one(dest, b"X".to_vec(), opts()).await.unwrap();
    assert_eq!(reply.value(), Some(b"ok".as_ref()));
    let reply = a_two.call_one(dest, b"Y".to_vec(), opts()).await.unwrap();
    assert_eq!(reply.value(), Some(b"ok".as_ref()));

    // Scope 1's payload never reached scope 2's handler, and vice versa.
    assert_eq!(*one_handler.seen.lock(), vec![b"X".to_vec()]);
    assert_eq!(*two_handler.seen.lock(), vec![b"Y".to_vec()]);
    drop((a_one, a_two, b_one, b_two));
}

#[tokio::test]
async fn test_stray_reply_for_unbound_scope_leaves_other_calls_alone() {
    init_tracing();
    let cluster = InMemoryCluster::new();

    let (a_ch, a_mux) = spawn_node(&cluster, "a");
    let a = dispatcher_on(&a_ch, &a_mux, SCOPE_ONE, "a");

    let (b_ch, b_mux) = spawn_node(&cluster, "b");
    let b = dispatcher_on(&b_ch, &b_mux, SCOPE_ONE, "b");
    b.set_request_handler(Arc::new(SlowHandler {
        delay: Duration::from_millis(100),
        reply: "real",
    }));

    // While a call is pending on scope 1, a reply tagged for an unbound
    // scope arrives at the caller. It must be dropped without touching the
    // pending call's accounting.
    let caller = a.clone();
    let dest = b_ch.local_address();
    let pending = tokio::spawn(async move {
        caller
            .call_one(
                dest,
                b"slow call".to_vec(),
                CallOptions::default().timeout(Duration::from_secs(2)),
            )
            .await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    let mut stray = Message::new(b"bogus".to_vec())
        .with_dest(a_ch.local_address())
        .with_src(b_ch.local_address());
    stray.set_scope(ScopeId(99));
    stray.set_reply(groupcall_types::RequestId(1), false);
    b_ch.send(stray).await.unwrap();

    let reply = pending.await.unwrap().unwrap();
    assert_eq!(reply.value(), Some(b"real".as_ref()));
}

#[tokio::test]
async fn test_request_to_unbound_scope_is_dropped_not_answered() {
    init_tracing();
    let cluster = InMemoryCluster::new();

    let (a_ch, a_mux) = spawn_node(&cluster, "a");
    let a = dispatcher_on(&a_ch, &a_mux, SCOPE_ONE, "a");

    // b exists but has nothing bound on scope 1.
    let (b_ch, _b_mux) = spawn_node(&cluster, "b");

    let result = a
        .call(
            &[b_ch.local_address()],
            b"hello?".to_vec(),
            CallOptions::default().timeout(Duration::from_millis(150)),
        )
        .await
        .unwrap();

    assert_eq!(result.termination, Termination::TimedOut);
}
