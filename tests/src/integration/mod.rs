//! Integration flows over the in-memory channel.

mod calls;
mod scopes;

use crate::memchannel::{InMemoryCluster, MemChannel};
use async_trait::async_trait;
use groupcall_bus::ScopeMultiplexer;
use groupcall_dispatch::{Dispatcher, DispatcherConfig};
use groupcall_types::{Address, Channel, HandlerError, RequestHandler, ScopeId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One endpoint: a channel with its multiplexer attached.
pub fn spawn_node(
    cluster: &Arc<InMemoryCluster>,
    name: &str,
) -> (Arc<MemChannel>, Arc<ScopeMultiplexer>) {
    let channel = cluster.endpoint(name);
    let mux = Arc::new(ScopeMultiplexer::new());
    channel.attach(mux.clone());
    (channel, mux)
}

/// A started dispatcher on the given node and scope.
pub fn dispatcher_on(
    channel: &Arc<MemChannel>,
    mux: &Arc<ScopeMultiplexer>,
    scope: ScopeId,
    name: &str,
) -> Arc<Dispatcher> {
    let dispatcher = Arc::new(Dispatcher::new(
        name,
        scope,
        channel.clone() as Arc<dyn Channel>,
        mux.clone(),
        DispatcherConfig::default(),
    ));
    dispatcher.start().expect("scope must be free");
    dispatcher
}

/// Replies with a fixed name, so callers can tell responders apart.
pub struct NamedHandler(pub &'static str);

#[async_trait]
impl RequestHandler for NamedHandler {
    async fn handle(
        &self,
        _payload: &[u8],
        _src: Option<Address>,
    ) -> Result<Vec<u8>, HandlerError> {
        Ok(self.0.as_bytes().to_vec())
    }
}

/// Sleeps before answering, for ordering-sensitive tests.
pub struct SlowHandler {
    pub delay: Duration,
    pub reply: &'static str,
}

#[async_trait]
impl RequestHandler for SlowHandler {
    async fn handle(
        &self,
        _payload: &[u8],
        _src: Option<Address>,
    ) -> Result<Vec<u8>, HandlerError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.as_bytes().to_vec())
    }
}

/// Records every payload it sees and answers "ok".
#[derive(Default)]
pub struct RecordingHandler {
    pub seen: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl RequestHandler for RecordingHandler {
    async fn handle(
        &self,
        payload: &[u8],
        _src: Option<Address>,
    ) -> Result<Vec<u8>, HandlerError> {
        self.seen.lock().push(payload.to_vec());
        Ok(b"ok".to_vec())
    }
}
