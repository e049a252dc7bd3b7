use std::{
    backtrace::Backtrace,
    fmt::{self, Display},
    string::FromUtf8Error,
};

use serde_json::json;

use super::{ErrorCode, ErrorObject, ServiceKey};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("service `{0}` is not registered")]
    ServiceNotFound(ServiceKey),
    #[error("method `{0}` not found")]
    MethodNotFound(String),
    #[error("method `{method}` takes {expected} arguments but {actual} were supplied")]
    ArgumentCountMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },
    #[error("invalid params: {0}")]
    ParamsDecode(#[source] serde_json::Error),
    #[error("{0}")]
    Invocation(CallError),
    #[error("failed to decode payload: {0}")]
    PayloadDecode(#[source] serde_json::Error),
    #[error("unsupported payload type `{0}`")]
    UnsupportedPayloadType(&'static str),
    #[error("failed to encode responses: {0}")]
    ResponseEncode(#[source] serde_json::Error),
    #[error("encoded responses are not valid UTF-8")]
    ResponseText(#[from] FromUtf8Error),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::MethodNotFound(_) => ErrorCode::METHOD_NOT_FOUND,
            Error::ArgumentCountMismatch { .. } | Error::ParamsDecode(_) => {
                ErrorCode::INVALID_PARAMS
            }
            Error::Invocation(e) => e.code(),
            Error::PayloadDecode(_) => ErrorCode::PARSE_ERROR,
            Error::ServiceNotFound(_)
            | Error::UnsupportedPayloadType(_)
            | Error::ResponseEncode(_)
            | Error::ResponseText(_) => ErrorCode::INTERNAL_ERROR,
        }
    }

    /// Builds the error object sent to the caller.
    ///
    /// Unless `expose_internals` is set, only the code and its standard message
    /// go on the wire; the detailed text stays in the log.
    pub fn to_error_object(&self, expose_internals: bool) -> ErrorObject {
        match self {
            Error::Invocation(e) => e.to_error_object(expose_internals),
            _ if expose_internals => ErrorObject::new(self.code(), self.to_string()),
            _ => ErrorObject::from(self.code()),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error returned by a method handler.
///
/// Any [`std::error::Error`] converts into it, so `?` works inside handlers.
/// Such errors are internal: the caller sees only `Internal error`.
/// Use [`CallError::public`] (or [`bail_public!`](crate::bail_public)) for an
/// error whose code and message are meant for the caller.
pub struct CallError {
    public: Option<ErrorObject>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
    message: Option<String>,
    backtrace: Backtrace,
}

impl CallError {
    pub fn public(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(Some(ErrorObject::new(code, message)), None, None)
    }
    pub fn public_with_data(
        code: ErrorCode,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        let mut e = ErrorObject::new(code, message);
        e.data = Some(data);
        Self::new(Some(e), None, None)
    }
    pub fn message(message: impl Display) -> Self {
        Self::new(None, None, Some(message.to_string()))
    }
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::public(ErrorCode::INVALID_PARAMS, message)
    }

    fn new(
        public: Option<ErrorObject>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        message: Option<String>,
    ) -> Self {
        Self {
            public,
            source,
            message,
            backtrace: Backtrace::capture(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.public
            .as_ref()
            .map_or(ErrorCode::INTERNAL_ERROR, |e| e.code)
    }
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
    pub fn source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn to_error_object(&self, expose_internals: bool) -> ErrorObject {
        if let Some(e) = &self.public {
            return e.clone();
        }
        if !expose_internals {
            return ErrorObject::from(ErrorCode::INTERNAL_ERROR);
        }
        let message = self.to_string();
        let mut data = json!({ "source": message });
        if let Some(source) = &self.source {
            data["source"] = json!(source.to_string());
        }
        if self.backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            data["backtrace"] = json!(format!("{:#?}", self.backtrace));
        }
        ErrorObject {
            code: ErrorCode::INTERNAL_ERROR,
            message,
            data: Some(data),
        }
    }
}

impl<E> From<E> for CallError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(e: E) -> Self {
        Self::new(None, Some(Box::new(e)), None)
    }
}

impl Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.public, &self.source, &self.message) {
            (Some(e), _, _) => write!(f, "{} ({})", e.message, e.code),
            (None, _, Some(message)) => write!(f, "{message}"),
            (None, Some(source), None) => write!(f, "{source}"),
            (None, None, None) => write!(f, "{}", ErrorCode::INTERNAL_ERROR.message()),
        }
    }
}
impl fmt::Debug for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallError")
            .field("public", &self.public)
            .field("source", &self.source)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Errors raised while building a [`ServiceRegistry`](crate::ServiceRegistry).
///
/// These are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("service `{0}` is already registered")]
    DuplicateService(ServiceKey),
    #[error("service type `{type_name}` declares {count} registrations, at most one is allowed")]
    MultipleDeclarations {
        type_name: &'static str,
        count: usize,
    },
}

/// Returns an internal [`CallError`] from the current handler.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return ::std::result::Result::Err($crate::CallError::message(::std::format!($($arg)*)))
    };
}

/// Returns a [`CallError`] whose code and message are sent to the caller.
///
/// Pass `_` as the code for `INTERNAL_ERROR`.
#[macro_export]
macro_rules! bail_public {
    (_, $($arg:tt)*) => {
        $crate::bail_public!($crate::ErrorCode::INTERNAL_ERROR, $($arg)*)
    };
    ($code:expr, $($arg:tt)*) => {
        return ::std::result::Result::Err($crate::CallError::public($code, ::std::format!($($arg)*)))
    };
}
