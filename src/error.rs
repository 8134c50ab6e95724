//! Error types.
//!
//! Two families live here:
//!
//! - [`Error`] surfaces infrastructure and configuration failures: binding a
//!   port, reading a settings file, building a registrar from bad settings.
//! - [`RouteError`] is what a route "raises". Middlewares and error handlers
//!   inspect it, match on its concrete type and either replace it with a
//!   response or let it propagate to the router.

use std::any::type_name;
use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;

/// The error type returned by routeguard's fallible operations.
///
/// Application-level failures are [`RouteError`]s, not `Error`s.
#[derive(Debug)]
pub enum Error {
    /// Binding a listener, accepting a connection or reading a file failed.
    Io(std::io::Error),
    /// The server address is not a valid `host:port`.
    Address(std::net::AddrParseError),
    /// Settings could not be parsed.
    Settings(toml::de::Error),
    /// Settings parsed, but describe a registrar that cannot be built.
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Address(e) => write!(f, "invalid address: {e}"),
            Self::Settings(e) => write!(f, "settings: {e}"),
            Self::Config(msg) => write!(f, "middleware registrar config: {msg}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Address(e) => Some(e),
            Self::Settings(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<std::net::AddrParseError> for Error {
    fn from(e: std::net::AddrParseError) -> Self {
        Self::Address(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Settings(e)
    }
}

// ── RouteError ────────────────────────────────────────────────────────────────

/// A failure raised by a route.
///
/// Any `std::error::Error + Send + Sync + 'static` converts into a
/// `RouteError` with `?`, so routes return `Result<_, E>` with whatever error
/// type is natural to them. The conversion records the concrete type, which
/// keeps two things available after type erasure:
///
/// - [`type_name`](RouteError::type_name): the short runtime type name
///   (`"ParseIntError"`, not `"core::num::error::ParseIntError"`);
/// - [`is`](RouteError::is) / [`downcast_ref`](RouteError::downcast_ref):
///   matching on the concrete type.
///
/// ```rust
/// use routeguard::RouteError;
///
/// let error = RouteError::from("x".parse::<u8>().unwrap_err());
///
/// assert_eq!(error.type_name(), "ParseIntError");
/// assert!(error.is::<std::num::ParseIntError>());
/// assert_eq!(error.to_string(), "invalid digit found in string");
/// ```
///
/// `RouteError` does not implement `std::error::Error`: the blanket `From`
/// impl would otherwise overlap `From<T> for T`.
pub struct RouteError {
    inner: Box<dyn StdError + Send + Sync + 'static>,
    type_name: &'static str,
}

impl RouteError {
    /// Short runtime type name of the wrapped error.
    pub fn type_name(&self) -> &'static str {
        short_type_name(self.type_name)
    }

    /// Fully qualified type name of the wrapped error.
    pub fn full_type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<E: StdError + 'static>(&self) -> bool {
        self.inner.is::<E>()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Borrow the wrapped error as a trait object.
    pub fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.inner
    }

    pub fn into_inner(self) -> Box<dyn StdError + Send + Sync + 'static> {
        self.inner
    }
}

impl<E> From<E> for RouteError
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self { inner: Box::new(error), type_name: type_name::<E>() }
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl fmt::Debug for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteError")
            .field("type", &self.type_name())
            .field("error", &self.inner)
            .finish()
    }
}

/// Strips the module path and generic arguments from a type name:
/// `alloc::vec::Vec<u8>` becomes `Vec`, `my_app::errors::NotFound` becomes
/// `NotFound`.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ── Abort ─────────────────────────────────────────────────────────────────────

/// Stops a route with a bare status code.
///
/// The router answers an unhandled `Abort` with an empty response carrying
/// its status instead of `500`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abort(StatusCode);

impl Abort {
    pub fn new(status: StatusCode) -> Self {
        Self(status)
    }

    pub fn status(&self) -> StatusCode {
        self.0
    }
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aborted with status {}", self.0)
    }
}

impl StdError for Abort {}

/// `Err(Abort(status))`, ready to be returned from a route or middleware.
pub fn abort<T>(status: StatusCode) -> Result<T, RouteError> {
    Err(Abort(status).into())
}
