use std::{convert::Infallible, fmt::Display};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The requested number of axes is zero or exceeds what the array (or the
    /// crate) supports.
    #[error("invalid rank {rank}: expected a value in 1..={max}")]
    InvalidRank { rank: usize, max: usize },

    /// A requested extent is not strictly positive.
    #[error("invalid extent {extent} on axis {axis}: extents must be > 0")]
    InvalidShape { axis: usize, extent: usize },

    /// The element count of a shape, or its size in bytes, does not fit
    /// in the address space.
    #[error("shape {shape:?} holds more elements than can be addressed")]
    ElementCountOverflow { shape: Vec<usize> },

    #[error("axis {axis} is out of range for an array of rank {rank}")]
    InvalidAxis { axis: isize, rank: usize },

    #[error("buffer of {len} elements does not match shape {shape:?} ({expected} elements)")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        len: usize,
    },

    #[error("index {index:?} is out of bounds for shape {shape:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        shape: Vec<usize>,
    },

    #[error("key is not included in values")]
    NotFound,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The execution device cannot run kernels against the array's storage.
    #[error("cannot dispatch on {device}: array '{label}' lives on {storage}")]
    DeviceMismatch {
        label: String,
        device: &'static str,
        storage: &'static str,
    },

    /// The backend rejected the allocation or the kernel launch.
    #[error("dispatch of {op} failed on {backend}: {reason}")]
    Dispatch {
        op: &'static str,
        backend: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Cuda(Box<dyn std::error::Error + Send + Sync>),

    #[error("Message: {0}")]
    Msg(String),

    #[error("{inner}\n{backtrace}")]
    WithBacktrace {
        inner: Box<Self>,
        backtrace: Box<std::backtrace::Backtrace>,
    },

    #[error("IO error: {0}")]
    IoError(String),

    /// Arbitrary errors wrapping with context.
    #[error("{wrapped:?}\n{context:?}")]
    WrappedContext {
        wrapped: Box<dyn std::error::Error + Send + Sync>,
        context: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new error based on a printable error message.
    ///
    /// If the message implements `std::error::Error`, prefer using [`Error::wrap`] instead.
    pub fn msg<M: Display>(msg: M) -> Self {
        Self::Msg(msg.to_string()).bt()
    }

    pub fn bt(self) -> Self {
        let backtrace = std::backtrace::Backtrace::capture();
        match backtrace.status() {
            std::backtrace::BacktraceStatus::Disabled
            | std::backtrace::BacktraceStatus::Unsupported => self,
            _ => Self::WithBacktrace {
                inner: Box::new(self),
                backtrace: Box::new(backtrace),
            },
        }
    }

    /// Strip the backtrace wrapper, if any.
    pub fn inner(&self) -> &Self {
        match self {
            Self::WithBacktrace { inner, .. } => inner.inner(),
            other => other,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::IoError(value.to_string())
    }
}

#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::Error::Msg(format!($msg).into()).bt())
    };
    ($err:expr $(,)?) => {
        return Err($crate::Error::Msg(format!($err).into()).bt())
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($fmt, $($arg)*).into()).bt())
    };
}

pub(crate) mod private {
    pub trait Sealed {}

    impl<T, E> Sealed for std::result::Result<T, E> where E: std::error::Error {}
    impl<T> Sealed for Option<T> {}
}

/// Attach more context to an error.
///
/// Inspired by [`anyhow::Context`].
pub trait Context<T, E>: private::Sealed {
    /// Wrap the error value with additional context.
    fn context<C>(self, context: C) -> std::result::Result<T, Error>
    where
        C: Display + Send + Sync + 'static;

    /// Wrap the error value with additional context that is evaluated lazily
    /// only once an error does occur.
    fn with_context<C, F>(self, f: F) -> std::result::Result<T, Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> Context<T, E> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> std::result::Result<T, Error>
    where
        C: Display + Send + Sync + 'static,
    {
        // Not using map_err to save 2 useless frames off the captured backtrace
        // in ext_context.
        match self {
            Ok(ok) => Ok(ok),
            Err(error) => Err(Error::WrappedContext {
                wrapped: Box::new(error),
                context: context.to_string(),
            }),
        }
    }

    fn with_context<C, F>(self, context: F) -> std::result::Result<T, Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        match self {
            Ok(ok) => Ok(ok),
            Err(error) => Err(Error::WrappedContext {
                wrapped: Box::new(error),
                context: context().to_string(),
            }),
        }
    }
}

impl<T> Context<T, Infallible> for Option<T> {
    fn context<C>(self, context: C) -> std::result::Result<T, Error>
    where
        C: Display + Send + Sync + 'static,
    {
        match self {
            Some(ok) => Ok(ok),
            None => Err(Error::msg(context)),
        }
    }

    fn with_context<C, F>(self, context: F) -> std::result::Result<T, Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        match self {
            Some(ok) => Ok(ok),
            None => Err(Error::msg(context())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_strips_backtrace() {
        let err = Error::InvalidRank { rank: 9, max: 8 }.bt();
        assert!(matches!(
            err.inner(),
            Error::InvalidRank { rank: 9, max: 8 }
        ));
    }

    #[test]
    fn option_context_becomes_message() {
        let res: Result<u8> = None.context("missing value");
        let err = res.unwrap_err();
        assert!(matches!(err.inner(), Error::Msg(m) if m == "missing value"));
    }

    #[test]
    fn result_context_keeps_the_source_error() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("disk gone"));
        let err = res.context("writing ptx").unwrap_err();
        match err.inner() {
            Error::WrappedContext { wrapped, context } => {
                assert_eq!(context, "writing ptx");
                assert_eq!(wrapped.to_string(), "disk gone");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
