use std::borrow::Cow;

use serde::de::Error as _;
use serde_json::{Value, value::RawValue};

use super::{Batch, Error, ParamDescriptor, Request, Response, Result};

#[cfg(test)]
mod tests;

/// Turns payload bytes into requests and responses into payload bytes.
pub trait Codec: Send + Sync {
    /// Decodes one request or a batch of requests.
    fn decode_requests(&self, bytes: &[u8]) -> Result<Batch<Request>>;

    /// Binds raw params against a call's declared parameters.
    ///
    /// The number of returned arguments is checked by the dispatcher, so an
    /// implementation should not pad or truncate to match `params`.
    fn decode_arguments(
        &self,
        raw: Option<&RawValue>,
        params: &[ParamDescriptor],
    ) -> Result<Vec<Value>>;

    fn encode_responses(&self, responses: &Batch<Response>) -> Result<Vec<u8>>;
}

/// The default [`Codec`], built on `serde_json`.
///
/// - A top-level array is a batch, anything else a single request.
/// - A trailing comma before `]` or `}` is accepted.
/// - Positional params bind in order. Named params bind by parameter name;
///   a missing name leaves the call short (an argument count mismatch) and an
///   unknown name fails the bind.
/// - Output escapes only what JSON requires; non-ASCII text is written as is.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn decode_requests(&self, bytes: &[u8]) -> Result<Batch<Request>> {
        let bytes = strip_trailing_commas(bytes);
        let is_batch = bytes
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|&b| b == b'[');
        if is_batch {
            serde_json::from_slice(&bytes)
                .map(Batch::Many)
                .map_err(Error::PayloadDecode)
        } else {
            serde_json::from_slice(&bytes)
                .map(Batch::Single)
                .map_err(Error::PayloadDecode)
        }
    }

    fn decode_arguments(
        &self,
        raw: Option<&RawValue>,
        params: &[ParamDescriptor],
    ) -> Result<Vec<Value>> {
        let Some(raw) = raw else {
            return Ok(Vec::new());
        };
        let value: Value = serde_json::from_str(raw.get()).map_err(Error::ParamsDecode)?;
        Ok(match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            Value::Object(mut map) => {
                let mut args = Vec::with_capacity(params.len());
                for p in params {
                    if let Some(value) = map.remove(p.name()) {
                        args.push(value);
                    }
                }
                if let Some(name) = map.keys().next() {
                    return Err(Error::ParamsDecode(serde_json::Error::custom(format!(
                        "unknown parameter `{name}`"
                    ))));
                }
                args
            }
            scalar => vec![scalar],
        })
    }

    fn encode_responses(&self, responses: &Batch<Response>) -> Result<Vec<u8>> {
        serde_json::to_vec(responses).map_err(Error::ResponseEncode)
    }
}

/// Removes commas that directly precede `]` or `}` (ignoring whitespace),
/// leaving string contents untouched. Borrows when there is nothing to remove.
pub(crate) fn strip_trailing_commas(bytes: &[u8]) -> Cow<'_, [u8]> {
    let mut out: Option<Vec<u8>> = None;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate() {
        let mut skip = false;
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
        } else if b == b'"' {
            in_string = true;
        } else if b == b',' {
            let next = bytes[i + 1..].iter().find(|b| !b.is_ascii_whitespace());
            skip = matches!(next, Some(&(b']' | b'}')));
        }
        if skip {
            out.get_or_insert_with(|| bytes[..i].to_vec());
        } else if let Some(out) = &mut out {
            out.push(b);
        }
    }
    match out {
        Some(out) => Cow::Owned(out),
        None => Cow::Borrowed(bytes),
    }
}
