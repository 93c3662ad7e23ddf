//! The stable error taxonomy exported by every VOS public operation.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable code to an error variant.
///
/// Mirrors the wider codebase's convention of keeping a numeric/string pair
/// that stays stable across refactors, so logs, metrics, and any eventual
/// FFI boundary can key on the code rather than on the `Display` string.
pub trait ErrorCode {
    /// The stable numeric code exported to callers (see VOS's error table).
    fn code(&self) -> i32;
    /// The stable string mnemonic, used in log lines and metric labels.
    fn mnemonic(&self) -> &'static str;
}

/// Errors returned by every public VOS operation.
///
/// Absence and visible-tombstone are deliberately distinct: `NonExistent`
/// means there is no record at all, while a punched key is reported as an
/// empty, `Ok` result — callers must not conflate the two.
#[derive(Debug, Error)]
pub enum VosError {
    /// No record exists for the requested key/object at any epoch.
    #[error("object/key does not exist")]
    NonExistent,
    /// The request is malformed: bad key length, conflicting feature bits,
    /// a zero-size non-punch update, a negative extent, or similar.
    #[error("invalid argument: {0}")]
    Invalid(String),
    /// Allocation failed inside the PM arena or an in-memory structure.
    #[error("out of memory")]
    NoMemory,
    /// No open handle exists for the pool/container/object named.
    #[error("no handle")]
    NoHandle,
    /// The caller's buffer was too small; `required` carries the size to retry with.
    #[error("buffer overflow, need {required} bytes")]
    Overflow {
        /// The buffer size a retry must provide to succeed.
        required: usize,
    },
    /// A duplicate `(key, epoch)` or `(epoch, [lo,hi])` entry already exists.
    #[error("entry already exists")]
    AlreadyExists,
    /// An I/O error surfaced by the BIO bridge.
    #[error("I/O error: {0}")]
    Io(String),
    /// The IOD/SGL shape supplied to the BIO bridge was invalid.
    #[error("invalid I/O descriptor: {0}")]
    IoInvalid(String),
    /// The caller lacks permission for the requested operation.
    #[error("permission denied")]
    NoPermission,
    /// The PM arena or NVMe blob is out of space.
    #[error("no space left")]
    NoSpace,
    /// The lookup is blocked behind an uncommitted DTX entry.
    #[error("operation in progress")]
    InProgress,
    /// The resource is transiently busy (e.g. held exclusively elsewhere).
    #[error("resource busy")]
    Busy,
    /// The operation was canceled before completion; no partial state persists.
    #[error("operation canceled")]
    Canceled,
    /// A value was truncated relative to what the caller requested.
    #[error("value truncated")]
    Truncated,
    /// A structural/protocol invariant was violated (e.g. out-of-order undo log).
    #[error("protocol violation: {0}")]
    Protocol(String),
    /// The caller should retry; no progress could currently be made.
    #[error("try again")]
    Again,
    /// The component or handle was used before being initialized.
    #[error("uninitialized")]
    Uninit,
}

impl ErrorCode for VosError {
    fn code(&self) -> i32 {
        match self {
            Self::NonExistent => -1001,
            Self::Invalid(_) => -1002,
            Self::NoMemory => -1003,
            Self::NoHandle => -1004,
            Self::Overflow { .. } => -1005,
            Self::AlreadyExists => -1006,
            Self::Io(_) => -1007,
            Self::IoInvalid(_) => -1008,
            Self::NoPermission => -1009,
            Self::NoSpace => -1010,
            Self::InProgress => -1011,
            Self::Busy => -1012,
            Self::Canceled => -1013,
            Self::Truncated => -1014,
            Self::Protocol(_) => -1015,
            Self::Again => -1016,
            Self::Uninit => -1017,
        }
    }

    fn mnemonic(&self) -> &'static str {
        match self {
            Self::NonExistent => "NONEXIST",
            Self::Invalid(_) => "INVAL",
            Self::NoMemory => "NOMEM",
            Self::NoHandle => "NO_HDL",
            Self::Overflow { .. } => "OVERFLOW",
            Self::AlreadyExists => "EXIST",
            Self::Io(_) => "IO",
            Self::IoInvalid(_) => "IO_INVAL",
            Self::NoPermission => "NO_PERM",
            Self::NoSpace => "NOSPACE",
            Self::InProgress => "INPROGRESS",
            Self::Busy => "BUSY",
            Self::Canceled => "CANCELED",
            Self::Truncated => "TRUNC",
            Self::Protocol(_) => "PROTO",
            Self::Again => "AGAIN",
            Self::Uninit => "UNINIT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics_are_unique() {
        let variants = [
            VosError::NonExistent,
            VosError::Invalid("x".into()),
            VosError::NoMemory,
            VosError::NoHandle,
            VosError::Overflow { required: 4 },
            VosError::AlreadyExists,
            VosError::Io("x".into()),
            VosError::IoInvalid("x".into()),
            VosError::NoPermission,
            VosError::NoSpace,
            VosError::InProgress,
            VosError::Busy,
            VosError::Canceled,
            VosError::Truncated,
            VosError::Protocol("x".into()),
            VosError::Again,
            VosError::Uninit,
        ];
        let mut seen = std::collections::HashSet::new();
        for v in &variants {
            assert!(seen.insert(v.mnemonic()), "duplicate mnemonic {}", v.mnemonic());
            assert!(seen.insert(v.code().to_string()));
        }
    }
}
