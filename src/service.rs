use std::{collections::HashMap, fmt, future::Future, pin::Pin};

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{CallError, ErrorCode};

/// A named group of callable methods.
///
/// Implementations are immutable once registered; the dispatcher shares them
/// across concurrent calls.
pub trait Service: Send + Sync + 'static {
    fn resolve(&self, method: &str) -> Option<&RpcCall>;
}

pub trait CallHandler: Send + Sync + 'static {
    fn call(&self, args: Args) -> impl Future<Output = Result<Value, CallError>> + Send;
}
impl<F, Fut> CallHandler for F
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, CallError>> + Send,
{
    fn call(&self, args: Args) -> impl Future<Output = Result<Value, CallError>> + Send {
        self(args)
    }
}

trait DynCallHandler: Send + Sync {
    fn dyn_call(
        &self,
        args: Args,
    ) -> Pin<Box<dyn Future<Output = Result<Value, CallError>> + Send + '_>>;
}
impl<T: CallHandler> DynCallHandler for T {
    fn dyn_call(
        &self,
        args: Args,
    ) -> Pin<Box<dyn Future<Output = Result<Value, CallError>> + Send + '_>> {
        Box::pin(self.call(args))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    name: String,
}
impl ParamDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl From<&str> for ParamDescriptor {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
impl From<String> for ParamDescriptor {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A method: its name, the parameters it declares, and its handler.
pub struct RpcCall {
    name: String,
    params: Vec<ParamDescriptor>,
    handler: Box<dyn DynCallHandler>,
}
impl RpcCall {
    pub fn new<P>(
        name: impl Into<String>,
        params: impl IntoIterator<Item = P>,
        handler: impl CallHandler,
    ) -> Self
    where
        P: Into<ParamDescriptor>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            handler: Box::new(handler),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }
    pub(crate) fn invoke(
        &self,
        args: Args,
    ) -> Pin<Box<dyn Future<Output = Result<Value, CallError>> + Send + '_>> {
        self.handler.dyn_call(args)
    }
}
impl fmt::Debug for RpcCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcCall")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Arguments bound to a call's declared parameters, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn raw(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }
    pub fn get<T>(&self, index: usize) -> Result<T, CallError>
    where
        T: DeserializeOwned,
    {
        let Some(value) = self.0.get(index) else {
            return Err(CallError::public(
                ErrorCode::INVALID_PARAMS,
                format!("missing argument {index}"),
            ));
        };
        T::deserialize(value).map_err(|e| {
            CallError::public(
                ErrorCode::INVALID_PARAMS,
                format!("argument {index}: {e}"),
            )
        })
    }
    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }
}

/// A [`Service`] backed by a table of [`RpcCall`]s keyed by method name.
#[derive(Default)]
pub struct MethodTable {
    calls: HashMap<String, RpcCall>,
}
impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a call. A later call with the same name replaces the earlier one.
    pub fn with(mut self, call: RpcCall) -> Self {
        self.calls.insert(call.name.clone(), call);
        self
    }
    pub fn method<P>(
        self,
        name: impl Into<String>,
        params: impl IntoIterator<Item = P>,
        handler: impl CallHandler,
    ) -> Self
    where
        P: Into<ParamDescriptor>,
    {
        self.with(RpcCall::new(name, params, handler))
    }
    pub fn len(&self) -> usize {
        self.calls.len()
    }
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
impl Service for MethodTable {
    fn resolve(&self, method: &str) -> Option<&RpcCall> {
        self.calls.get(method)
    }
}
impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.calls.keys()).finish()
    }
}
