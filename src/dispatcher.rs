use std::{any::type_name, sync::Arc};

use serde_json::Value;
use tracing::{debug, error, warn};

use super::{
    Args, Batch, BufferPool, Codec, Error, JsonCodec, Outcome, PooledTextBuffer, Request,
    Response, Result, Service, ServiceRegistry, utils::downcast,
};

#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Sends internal error details (handler error text, backtraces) to the
    /// caller. Off by default; details are always logged.
    pub expose_internals: bool,
}

/// A request or response payload, in text or binary form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Text(_) => PayloadKind::Text,
            Payload::Binary(_) => PayloadKind::Binary,
        }
    }
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(bytes) => bytes,
        }
    }
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
    fn as_input(&self) -> Input<'_> {
        match self {
            Payload::Text(text) => Input::Text(text),
            Payload::Binary(bytes) => Input::Binary(bytes),
        }
    }
}
impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}
impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}
impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(bytes)
    }
}
impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Binary(bytes.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Text,
    Binary,
}
impl PayloadKind {
    pub fn empty(self) -> Payload {
        match self {
            PayloadKind::Text => Payload::Text(String::new()),
            PayloadKind::Binary => Payload::Binary(Vec::new()),
        }
    }
    fn from_bytes(self, bytes: Vec<u8>) -> Result<Payload> {
        Ok(match self {
            PayloadKind::Text => Payload::Text(String::from_utf8(bytes)?),
            PayloadKind::Binary => Payload::Binary(bytes),
        })
    }
}

#[derive(Clone, Copy)]
enum Input<'a> {
    Text(&'a str),
    Binary(&'a [u8]),
}
impl Input<'_> {
    fn kind(self) -> PayloadKind {
        match self {
            Input::Text(_) => PayloadKind::Text,
            Input::Binary(_) => PayloadKind::Binary,
        }
    }
}

/// Routes payloads to the services of a [`ServiceRegistry`].
///
/// `Dispatcher` holds no per-call state and can be shared between tasks.
pub struct Dispatcher<C = JsonCodec> {
    registry: Arc<ServiceRegistry>,
    codec: C,
    pool: Arc<BufferPool>,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(registry: impl Into<Arc<ServiceRegistry>>) -> Self {
        Self::with_codec(registry, JsonCodec)
    }
}

impl<C: Codec> Dispatcher<C> {
    pub fn with_codec(registry: impl Into<Arc<ServiceRegistry>>, codec: C) -> Self {
        Self {
            registry: registry.into(),
            codec,
            pool: BufferPool::shared(),
            options: DispatchOptions::default(),
        }
    }
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }
    pub fn with_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = pool;
        self
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }
    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Dispatches a payload and returns the responses in the same form.
    ///
    /// Returns an empty payload when there is nothing to answer (only
    /// notifications) and when the call fails before any request is decoded
    /// (unknown service, malformed payload). Those failures are logged; use
    /// [`try_dispatch`](Self::try_dispatch) to observe them.
    pub async fn dispatch(&self, service: &str, version: &str, payload: Payload) -> Payload {
        let kind = payload.kind();
        self.dispatch_input(service, version, payload.as_input())
            .await
            .unwrap_or_else(|| kind.empty())
    }

    pub async fn try_dispatch(
        &self,
        service: &str,
        version: &str,
        payload: Payload,
    ) -> Result<Option<Payload>> {
        self.try_dispatch_input(service, version, payload.as_input())
            .await
    }

    pub async fn dispatch_text(&self, service: &str, version: &str, text: &str) -> String {
        match self.dispatch_input(service, version, Input::Text(text)).await {
            Some(Payload::Text(text)) => text,
            _ => String::new(),
        }
    }

    pub async fn dispatch_bytes(&self, service: &str, version: &str, bytes: &[u8]) -> Vec<u8> {
        match self.dispatch_input(service, version, Input::Binary(bytes)).await {
            Some(Payload::Binary(bytes)) => bytes,
            _ => Vec::new(),
        }
    }

    /// Dispatches a payload of a type known only at the call site.
    ///
    /// `P` must be `String` or `Vec<u8>`; anything else fails with
    /// [`Error::UnsupportedPayloadType`].
    pub async fn dispatch_as<P: 'static>(
        &self,
        service: &str,
        version: &str,
        payload: P,
    ) -> Result<P> {
        let payload = match downcast::<String, P>(payload) {
            Ok(text) => Payload::Text(text),
            Err(payload) => match downcast::<Vec<u8>, P>(payload) {
                Ok(bytes) => Payload::Binary(bytes),
                Err(_) => {
                    error!(
                        service,
                        version,
                        payload_type = type_name::<P>(),
                        "unsupported payload type"
                    );
                    return Err(Error::UnsupportedPayloadType(type_name::<P>()));
                }
            },
        };
        let output = match self.dispatch(service, version, payload).await {
            Payload::Text(text) => downcast::<P, String>(text).ok(),
            Payload::Binary(bytes) => downcast::<P, Vec<u8>>(bytes).ok(),
        };
        output.ok_or(Error::UnsupportedPayloadType(type_name::<P>()))
    }

    async fn dispatch_input(
        &self,
        service: &str,
        version: &str,
        input: Input<'_>,
    ) -> Option<Payload> {
        match self.try_dispatch_input(service, version, input).await {
            Ok(output) => output,
            Err(e) => {
                error!(service, version, "dispatch failed: {e}");
                None
            }
        }
    }

    async fn try_dispatch_input(
        &self,
        service: &str,
        version: &str,
        input: Input<'_>,
    ) -> Result<Option<Payload>> {
        let target = self.registry.lookup(service, version)?;
        let requests = self.decode(input)?;
        debug!(
            service,
            version,
            count = requests.len(),
            batch = requests.is_batch(),
            "dispatching"
        );
        let Some(responses) = self.handle_batch(target.as_ref(), requests).await else {
            return Ok(None);
        };
        let bytes = self.codec.encode_responses(&responses)?;
        Ok(Some(input.kind().from_bytes(bytes)?))
    }

    fn decode(&self, input: Input<'_>) -> Result<Batch<Request>> {
        match input {
            Input::Text(text) => {
                let buffer = PooledTextBuffer::new(&self.pool, text);
                let requests = self.codec.decode_requests(buffer.as_bytes());
                buffer.release();
                requests
            }
            Input::Binary(bytes) => self.codec.decode_requests(bytes),
        }
    }

    async fn handle_batch(
        &self,
        service: &dyn Service,
        requests: Batch<Request>,
    ) -> Option<Batch<Response>> {
        match requests {
            Batch::Single(request) => self
                .handle_request(service, request)
                .await
                .map(Batch::Single),
            Batch::Many(requests) => {
                let mut responses = Vec::with_capacity(requests.len());
                for request in requests {
                    if let Some(response) = self.handle_request(service, request).await {
                        responses.push(response);
                    }
                }
                if responses.is_empty() {
                    None
                } else {
                    Some(Batch::Many(responses))
                }
            }
        }
    }

    async fn handle_request(&self, service: &dyn Service, request: Request) -> Option<Response> {
        let result = self.invoke(service, &request).await;
        let Some(id) = request.id else {
            if let Err(e) = result {
                warn!(method = %request.method, "notification failed: {e}");
            }
            return None;
        };
        let outcome = match result {
            Ok(value) => Outcome::Result(value),
            Err(e) => {
                warn!(method = %request.method, id = ?id, "request failed: {e}");
                Outcome::Error(e.to_error_object(self.options.expose_internals))
            }
        };
        Some(Response {
            jsonrpc: request.jsonrpc,
            id,
            outcome,
        })
    }

    async fn invoke(&self, service: &dyn Service, request: &Request) -> Result<Value> {
        let Some(call) = service.resolve(&request.method) else {
            return Err(Error::MethodNotFound(request.method.clone()));
        };
        let args = self
            .codec
            .decode_arguments(request.params.as_deref(), call.params())?;
        if args.len() != call.params().len() {
            return Err(Error::ArgumentCountMismatch {
                method: request.method.clone(),
                expected: call.params().len(),
                actual: args.len(),
            });
        }
        call.invoke(Args::new(args))
            .await
            .map_err(Error::Invocation)
    }
}
