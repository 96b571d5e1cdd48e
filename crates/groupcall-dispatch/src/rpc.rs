//! # RPC Dispatcher
//!
//! Adds call-descriptor marshaling on top of [`Dispatcher`]: the caller
//! names an operation and passes JSON params, the handling side resolves
//! the name against a table of operations built once at startup. Lookups
//! are map reads, not runtime type introspection.

use crate::dispatcher::Dispatcher;
use crate::error::CallError;
use crate::options::CallOptions;
use crate::reply::{CallResult, Reply, ReplyStatus};
use async_trait::async_trait;
use groupcall_types::{Address, HandlerError, RequestHandler};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Wire descriptor of one remote invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodCall {
    /// Operation name, resolved against the receiving side's table.
    pub method: String,
    /// Operation parameters.
    pub params: Value,
}

/// One named operation on the handling side.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Invoke with the call's params.
    async fn invoke(&self, params: Value, src: Option<Address>) -> Result<Value, HandlerError>;
}

/// Adapter for plain closures.
struct FnOperation<F>(F);

#[async_trait]
impl<F> Operation for FnOperation<F>
where
    F: Fn(Value) -> Result<Value, HandlerError> + Send + Sync,
{
    async fn invoke(&self, params: Value, _src: Option<Address>) -> Result<Value, HandlerError> {
        (self.0)(params)
    }
}

/// Explicit name → operation lookup table, built once at startup.
#[derive(Default)]
pub struct MethodTable {
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl MethodTable {
    /// Start building a table.
    #[must_use]
    pub fn builder() -> MethodTableBuilder {
        MethodTableBuilder {
            operations: HashMap::new(),
        }
    }

    /// Names of all bound operations.
    #[must_use]
    pub fn operation_names(&self) -> Vec<&str> {
        self.operations.keys().map(String::as_str).collect()
    }
}

/// Builder for [`MethodTable`].
pub struct MethodTableBuilder {
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl MethodTableBuilder {
    /// Bind an operation under `name`. Later bindings of the same name
    /// replace earlier ones; the table is fixed once built.
    #[must_use]
    pub fn operation(mut self, name: impl Into<String>, op: Arc<dyn Operation>) -> Self {
        self.operations.insert(name.into(), op);
        self
    }

    /// Bind a plain closure under `name`.
    #[must_use]
    pub fn operation_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        self.operation(name, Arc::new(FnOperation(f)))
    }

    /// Finish the table.
    #[must_use]
    pub fn build(self) -> MethodTable {
        MethodTable {
            operations: self.operations,
        }
    }
}

#[async_trait]
impl RequestHandler for MethodTable {
    async fn handle(&self, payload: &[u8], src: Option<Address>) -> Result<Vec<u8>, HandlerError> {
        let call: MethodCall = serde_json::from_slice(payload)
            .map_err(|err| HandlerError::MalformedPayload(err.to_string()))?;

        let operation = self
            .operations
            .get(&call.method)
            .ok_or_else(|| HandlerError::UnknownOperation(call.method.clone()))?;

        debug!(method = %call.method, "Invoking operation");
        let result = operation.invoke(call.params, src).await?;
        serde_json::to_vec(&result).map_err(|err| HandlerError::Failed(err.to_string()))
    }
}

/// Per-destination outcome of one RPC group call.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcReply {
    /// The operation's result.
    Value(Value),
    /// The remote handler failed.
    Error(String),
    /// The destination departed before replying.
    Unreachable,
    /// The dispatcher stopped while the call was pending.
    Stopped,
    /// Nothing arrived before the call retired.
    Unresolved,
}

impl From<Reply> for RpcReply {
    fn from(reply: Reply) -> Self {
        match reply.status {
            ReplyStatus::Value(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => RpcReply::Value(value),
                Err(err) => RpcReply::Error(format!("undecodable result: {err}")),
            },
            ReplyStatus::Error(text) => RpcReply::Error(text),
            ReplyStatus::Unreachable => RpcReply::Unreachable,
            ReplyStatus::Stopped => RpcReply::Stopped,
            ReplyStatus::Unresolved => RpcReply::Unresolved,
        }
    }
}

/// Dispatcher speaking `{method, params}` descriptors.
pub struct RpcDispatcher {
    dispatcher: Dispatcher,
}

impl RpcDispatcher {
    /// Wrap a dispatcher and install `table` as its request handler.
    #[must_use]
    pub fn new(dispatcher: Dispatcher, table: MethodTable) -> Self {
        dispatcher.set_request_handler(Arc::new(table));
        Self { dispatcher }
    }

    /// The wrapped dispatcher, for lifecycle and monitoring.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Register with the multiplexer.
    pub fn start(&self) -> Result<(), CallError> {
        self.dispatcher.start()
    }

    /// Unregister and retire outstanding calls.
    pub fn stop(&self) {
        self.dispatcher.stop();
    }

    fn encode(method: &str, params: Value) -> Result<Vec<u8>, CallError> {
        serde_json::to_vec(&MethodCall {
            method: method.to_string(),
            params,
        })
        .map_err(|err| CallError::Codec(err.to_string()))
    }

    /// Invoke `method` on every destination; returns the decoded outcome
    /// per destination plus the underlying call result.
    pub async fn call_method(
        &self,
        dests: &[Address],
        method: &str,
        params: Value,
        options: CallOptions,
    ) -> Result<(CallResult, BTreeMap<Address, RpcReply>), CallError> {
        let payload = Self::encode(method, params)?;
        let result = self.dispatcher.call(dests, payload, options).await?;
        let decoded = result
            .replies
            .iter()
            .map(|(addr, reply)| (*addr, RpcReply::from(reply.clone())))
            .collect();
        Ok((result, decoded))
    }

    /// Invoke `method` on one destination and return its result value.
    ///
    /// Non-value outcomes map onto [`CallError`]: remote handler failures
    /// to [`CallError::Remote`], departures to [`CallError::Unreachable`],
    /// silence to [`CallError::TimedOut`].
    pub async fn call_method_one(
        &self,
        dest: Address,
        method: &str,
        params: Value,
        options: CallOptions,
    ) -> Result<Value, CallError> {
        let payload = Self::encode(method, params)?;
        let reply = self.dispatcher.call_one(dest, payload, options).await?;
        match RpcReply::from(reply) {
            RpcReply::Value(value) => Ok(value),
            RpcReply::Error(text) => Err(CallError::Remote(text)),
            RpcReply::Unreachable => Err(CallError::Unreachable),
            RpcReply::Stopped => Err(CallError::Stopped),
            RpcReply::Unresolved => Err(CallError::TimedOut),
        }
    }
}
