//! # jsondispatch
//!
//! An in-process JSON-RPC dispatcher.
//!
//! A [`Dispatcher`] takes a payload (text or bytes), finds the target service
//! in a [`ServiceRegistry`] by name and version, decodes one request or a batch
//! of requests, calls the matching [`RpcCall`] handlers and returns the encoded
//! responses in the same form as the input.
//!
//! - Notifications (requests without an id) are invoked but never answered.
//! - Handler errors become sanitized error responses; details go to `tracing`.
//! - Text payloads are decoded through pooled buffers ([`BufferPool`]).
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use jsondispatch::{Args, CallError, Dispatcher, MethodTable, ServiceRegistry};
//! use serde_json::{Value, json};
//!
//! async fn add(args: Args) -> Result<Value, CallError> {
//!     Ok(json!(args.get::<i64>(0)? + args.get::<i64>(1)?))
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let registry = ServiceRegistry::builder()
//!     .insert("calc", "", Arc::new(MethodTable::new().method("add", ["a", "b"], add)))?
//!     .build();
//! let dispatcher = Dispatcher::new(registry);
//!
//! let output = dispatcher
//!     .dispatch_text("calc", "", r#"{"id":1,"method":"add","params":[2,3]}"#)
//!     .await;
//! assert_eq!(output, r#"{"id":1,"result":5}"#);
//! # Ok(())
//! # }
//! ```

mod buffer;
mod codec;
mod dispatcher;
mod error;
mod message;
mod registry;
mod service;
#[cfg(feature = "stdio")]
mod transport;
mod utils;

pub use buffer::*;
pub use codec::*;
pub use dispatcher::*;
pub use error::*;
pub use message::*;
pub use registry::*;
pub use service::*;
#[cfg(feature = "stdio")]
pub use transport::*;
