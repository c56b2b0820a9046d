use core::fmt;
use std::io;

/// A result type whose client error defaults to [`Infallible`].
///
/// Pool construction and other operations that never reach a sync client use
/// the default; everything that forwards to a client carries that client's
/// error type.
///
/// [`Infallible`]: core::convert::Infallible
pub type Result<T, E = core::convert::Infallible> = core::result::Result<T, Error<E>>;

/// All errors that `offload` can produce.
///
/// The generic parameter `E` is the error type of the wrapped sync client. It
/// only appears in [`Error::Client`], which carries the client's error value
/// exactly as the client returned it, so callers can match on the client's own
/// error kinds after the value has crossed the worker pool.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error<E = core::convert::Infallible> {
    /// The sync client returned an error while running an operation, fetching
    /// a page, or building a paginator.
    Client(E),

    /// The requested operation does not exist on the sync client.
    ///
    /// Raised when the name is looked up, before any work is queued.
    UnknownOperation { name: String },

    /// The blocking closure panicked on its worker thread.
    ///
    /// The worker itself survives and keeps serving the queue.
    WorkerPanicked { message: String },

    /// The worker pool was shut down before the work could run.
    PoolShutdown,

    /// A worker pool was requested with a capacity of zero.
    InvalidCapacity,

    /// The operating system refused to spawn a worker thread.
    Spawn(io::Error),
}

impl<E> Error<E> {
    /// Returns the sync client's error, if this is one.
    pub const fn client(&self) -> Option<&E> {
        match self {
            Self::Client(err) => Some(err),
            _ => None,
        }
    }

    /// Consumes `self`, returning the sync client's error, if this is one.
    pub fn into_client(self) -> Option<E> {
        match self {
            Self::Client(err) => Some(err),
            _ => None,
        }
    }

    /// Returns `true` if the error came from the sync client.
    pub const fn is_client(&self) -> bool {
        matches!(self, Self::Client(_))
    }

    /// Returns `true` if the error is an unknown operation lookup.
    pub const fn is_unknown_operation(&self) -> bool {
        matches!(self, Self::UnknownOperation { .. })
    }
}

impl Error {
    /// Re-types a client-free error so it can flow through APIs that carry a
    /// client error type.
    pub fn widen<E>(self) -> Error<E> {
        match self {
            Self::Client(never) => match never {},
            Self::UnknownOperation { name } => Error::UnknownOperation { name },
            Self::WorkerPanicked { message } => Error::WorkerPanicked { message },
            Self::PoolShutdown => Error::PoolShutdown,
            Self::InvalidCapacity => Error::InvalidCapacity,
            Self::Spawn(err) => Error::Spawn(err),
        }
    }
}

impl<E: fmt::Display> fmt::Display for Error<E> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(err) => write!(fmt, "{err}"),
            Self::UnknownOperation { name } => {
                write!(fmt, "client has no operation named `{name}`")
            }
            Self::WorkerPanicked { message } => write!(fmt, "worker panicked: {message}"),
            Self::PoolShutdown => write!(fmt, "worker pool is shut down"),
            Self::InvalidCapacity => write!(fmt, "worker pool capacity must be at least 1"),
            Self::Spawn(err) => write!(fmt, "failed to spawn worker thread: {err}"),
        }
    }
}

impl<E> core::error::Error for Error<E>
where
    E: core::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Client(err) => Some(err),
            Self::Spawn(err) => Some(err),
            _ => None,
        }
    }
}
