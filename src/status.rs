//! Result codes shared by every fallible operation.
//!
//! Failures are reported as [`Error`] through the crate [`Result`] alias.
//! [`Status`] is the flat numeric vocabulary (success included) for callers
//! that need a plain code, e.g. when bridging to C or logging.

/// Failure conditions returned by looper, message and roster operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Error {
    /// Unspecified failure.
    #[error("unknown error")]
    Unknown,
    /// An allocation could not be satisfied.
    #[error("out of memory")]
    OutOfMemory,
    /// The operation is not valid in the current state.
    #[error("invalid operation")]
    InvalidOperation,
    /// An argument had an unacceptable value.
    #[error("bad value")]
    BadValue,
    /// An argument had an unacceptable type.
    #[error("bad type")]
    BadType,
    /// The target (looper, token, entry) does not exist or is gone.
    #[error("not found")]
    NotFound,
    /// The caller is not allowed to perform the operation.
    #[error("permission denied")]
    PermissionDenied,
    /// The object was used before being initialized.
    #[error("not initialized")]
    NotInitialized,
    /// The value was already set.
    #[error("already exists")]
    AlreadyExists,
    /// The remote object died.
    #[error("dead object")]
    DeadObject,
    /// A transaction could not be completed.
    #[error("failed transaction")]
    FailedTransaction,
    /// An index was out of range.
    #[error("bad index")]
    BadIndex,
    /// Not enough data was available.
    #[error("not enough data")]
    NotEnoughData,
    /// The operation would block.
    #[error("would block")]
    WouldBlock,
    /// The operation timed out.
    #[error("timed out")]
    TimedOut,
    /// The transaction code is not recognized.
    #[error("unknown transaction")]
    UnknownTransaction,
    /// File descriptors are not allowed here.
    #[error("file descriptors not allowed")]
    FdsNotAllowed,
    /// A required value was unexpectedly null.
    #[error("unexpected null")]
    UnexpectedNull,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric result codes.
///
/// `Ok` is zero; the error codes start at `i32::MIN` and count upwards.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Operation succeeded.
    Ok = 0,
    /// See [`Error::Unknown`].
    UnknownError = i32::MIN,
    /// See [`Error::OutOfMemory`].
    NoMemory,
    /// See [`Error::InvalidOperation`].
    InvalidOperation,
    /// See [`Error::BadValue`].
    BadValue,
    /// See [`Error::BadType`].
    BadType,
    /// See [`Error::NotFound`].
    NameNotFound,
    /// See [`Error::PermissionDenied`].
    PermissionDenied,
    /// See [`Error::NotInitialized`].
    NoInit,
    /// See [`Error::AlreadyExists`].
    AlreadyExists,
    /// See [`Error::DeadObject`].
    DeadObject,
    /// See [`Error::FailedTransaction`].
    FailedTransaction,
    /// See [`Error::BadIndex`].
    BadIndex,
    /// See [`Error::NotEnoughData`].
    NotEnoughData,
    /// See [`Error::WouldBlock`].
    WouldBlock,
    /// See [`Error::TimedOut`].
    TimedOut,
    /// See [`Error::UnknownTransaction`].
    UnknownTransaction,
    /// See [`Error::FdsNotAllowed`].
    FdsNotAllowed,
    /// See [`Error::UnexpectedNull`].
    UnexpectedNull,
}

impl Status {
    /// The raw integer code.
    #[inline]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Whether this is [`Status::Ok`].
    #[inline]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Convert back into a `Result`, mapping every non-`Ok` code to its error.
    pub const fn into_result(self) -> Result<()> {
        let err = match self {
            Self::Ok => return Ok(()),
            Self::UnknownError => Error::Unknown,
            Self::NoMemory => Error::OutOfMemory,
            Self::InvalidOperation => Error::InvalidOperation,
            Self::BadValue => Error::BadValue,
            Self::BadType => Error::BadType,
            Self::NameNotFound => Error::NotFound,
            Self::PermissionDenied => Error::PermissionDenied,
            Self::NoInit => Error::NotInitialized,
            Self::AlreadyExists => Error::AlreadyExists,
            Self::DeadObject => Error::DeadObject,
            Self::FailedTransaction => Error::FailedTransaction,
            Self::BadIndex => Error::BadIndex,
            Self::NotEnoughData => Error::NotEnoughData,
            Self::WouldBlock => Error::WouldBlock,
            Self::TimedOut => Error::TimedOut,
            Self::UnknownTransaction => Error::UnknownTransaction,
            Self::FdsNotAllowed => Error::FdsNotAllowed,
            Self::UnexpectedNull => Error::UnexpectedNull,
        };
        Err(err)
    }
}

impl Error {
    /// The numeric status for this error.
    pub const fn status(self) -> Status {
        match self {
            Self::Unknown => Status::UnknownError,
            Self::OutOfMemory => Status::NoMemory,
            Self::InvalidOperation => Status::InvalidOperation,
            Self::BadValue => Status::BadValue,
            Self::BadType => Status::BadType,
            Self::NotFound => Status::NameNotFound,
            Self::PermissionDenied => Status::PermissionDenied,
            Self::NotInitialized => Status::NoInit,
            Self::AlreadyExists => Status::AlreadyExists,
            Self::DeadObject => Status::DeadObject,
            Self::FailedTransaction => Status::FailedTransaction,
            Self::BadIndex => Status::BadIndex,
            Self::NotEnoughData => Status::NotEnoughData,
            Self::WouldBlock => Status::WouldBlock,
            Self::TimedOut => Status::TimedOut,
            Self::UnknownTransaction => Status::UnknownTransaction,
            Self::FdsNotAllowed => Status::FdsNotAllowed,
            Self::UnexpectedNull => Status::UnexpectedNull,
        }
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        err.status()
    }
}

impl<T> From<&Result<T>> for Status {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(err) => err.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Ok.code(), 0);
        assert_eq!(Status::UnknownError.code(), i32::MIN);
        assert_eq!(Status::NoMemory.code(), i32::MIN + 1);
        assert_eq!(Status::NameNotFound.code(), i32::MIN + 5);
        assert_eq!(Status::UnexpectedNull.code(), i32::MIN + 17);
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(Error::NotFound.status(), Status::NameNotFound);
        assert_eq!(Status::AlreadyExists.into_result(), Err(Error::AlreadyExists));
        assert_eq!(Status::Ok.into_result(), Ok(()));
        assert!(!Status::from(Error::TimedOut).is_ok());
    }

    #[test]
    fn test_status_from_result() {
        let ok: Result<u32> = Ok(7);
        let err: Result<u32> = Err(Error::InvalidOperation);
        assert_eq!(Status::from(&ok), Status::Ok);
        assert_eq!(Status::from(&err), Status::InvalidOperation);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(Error::AlreadyExists.to_string(), "already exists");
        assert_eq!(Error::FdsNotAllowed.to_string(), "file descriptors not allowed");
    }
}
