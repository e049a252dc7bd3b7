use derive_ex::derive_ex;
use ordered_float::OrderedFloat;
use parse_display::Display;
use serde::{Deserialize, Serialize};
use serde_json::{Value, value::RawValue};

#[cfg(test)]
mod tests;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[derive_ex(Eq, PartialEq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    Float(#[eq(key = OrderedFloat($))] f64),
    String(String),
}
impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Number(id)
    }
}
impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_string())
    }
}
impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId::String(id)
    }
}

/// One JSON value or a JSON array of values at the top level of a payload.
///
/// The shape of the decoded requests decides the shape of the encoded responses:
/// a single request is answered with a bare object, a batch with an array.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Batch<T> {
    Single(T),
    Many(Vec<T>),
}
impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        match self {
            Batch::Single(_) => 1,
            Batch::Many(items) => items.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn is_batch(&self) -> bool {
        matches!(self, Batch::Many(_))
    }
}
impl<T> IntoIterator for Batch<T> {
    type Item = T;
    type IntoIter = BatchIter<T>;
    fn into_iter(self) -> Self::IntoIter {
        match self {
            Batch::Single(item) => BatchIter::One(Some(item)),
            Batch::Many(items) => BatchIter::Many(items.into_iter()),
        }
    }
}

pub enum BatchIter<T> {
    One(Option<T>),
    Many(std::vec::IntoIter<T>),
}
impl<T> Iterator for BatchIter<T> {
    type Item = T;
    fn next(&mut self) -> Option<Self::Item> {
        match self {
            BatchIter::One(item) => item.take(),
            BatchIter::Many(iter) => iter.next(),
        }
    }
}

/// A decoded request whose parameters have not been bound yet.
///
/// A missing or `null` id makes the request a notification.
#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Box<RawValue>>,
}
impl Request {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    pub id: RequestId,
    #[serde(flatten)]
    pub outcome: Outcome,
}
impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: None,
            id,
            outcome: Outcome::Result(result),
        }
    }
    pub fn error(id: RequestId, error: ErrorObject) -> Self {
        Self {
            jsonrpc: None,
            id,
            outcome: Outcome::Error(error),
        }
    }
    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(value) => Some(value),
            Outcome::Error(_) => None,
        }
    }
    pub fn error_object(&self) -> Option<&ErrorObject> {
        match &self.outcome {
            Outcome::Result(_) => None,
            Outcome::Error(e) => Some(e),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(ErrorObject),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorObject {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
impl ErrorObject {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}
impl From<ErrorCode> for ErrorObject {
    fn from(code: ErrorCode) -> Self {
        Self::new(code, code.message())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[serde(transparent)]
#[display("{0}")]
pub struct ErrorCode(pub i64);

impl ErrorCode {
    pub const PARSE_ERROR: Self = Self(-32700);
    pub const INVALID_REQUEST: Self = Self(-32600);
    pub const METHOD_NOT_FOUND: Self = Self(-32601);
    pub const INVALID_PARAMS: Self = Self(-32602);
    pub const INTERNAL_ERROR: Self = Self(-32603);
    pub const SERVER_ERROR_START: Self = Self(-32000);
    pub const SERVER_ERROR_END: Self = Self(-32099);

    pub fn message(self) -> &'static str {
        match self {
            Self::PARSE_ERROR => "Parse error",
            Self::INVALID_REQUEST => "Invalid Request",
            Self::METHOD_NOT_FOUND => "Method not found",
            Self::INVALID_PARAMS => "Invalid params",
            Self::INTERNAL_ERROR => "Internal error",
            _ if self.is_server_error() => "Server error",
            _ => "Unknown error",
        }
    }
    pub fn is_server_error(self) -> bool {
        Self::SERVER_ERROR_END.0 <= self.0 && self.0 <= Self::SERVER_ERROR_START.0
    }
}
