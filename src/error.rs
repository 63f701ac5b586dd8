//! Error types surfaced by the public API.
//!
//! Hand-rolled `Display`/`Error` impls, matching the rest of the crate —
//! no `thiserror`. Component-level errors (`UriError`, `TimeError`) convert
//! into the top-level `JediError` via `From`.

use core::fmt;

/// Why a URI string failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    /// A segment was empty (two consecutive `/`, or a leading/trailing `/`
    /// left an empty segment after split).
    EmptySegment,
    /// A segment was the literal sentinel `$`, which is reserved.
    ReservedSegment,
    /// `*` appeared somewhere other than the final segment.
    WildcardNotLast,
    /// The URI has more components than the pattern has URI slots.
    TooManyComponents { have: usize, max: usize },
}

impl fmt::Display for UriError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UriError::EmptySegment => write!(f, "uri contains an empty segment"),
            UriError::ReservedSegment => write!(f, "uri contains the reserved segment \"$\""),
            UriError::WildcardNotLast => write!(f, "\"*\" may only appear as the final segment"),
            UriError::TooManyComponents { have, max } => write!(
                f,
                "uri has {have} components, exceeding the maximum of {max}"
            ),
        }
    }
}

impl std::error::Error for UriError {}

/// Why a timestamp or time path failed to parse or validate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    /// A component's quantity fell outside its position's valid bounds.
    OutOfRange {
        position: u8,
        quantity: u16,
        min: u16,
        max: u16,
    },
    /// A time path had more than six components.
    TooLong(usize),
    /// `range(start, end)` was called with `start > end`.
    EmptyInterval,
}

impl fmt::Display for TimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeError::OutOfRange {
                position,
                quantity,
                min,
                max,
            } => write!(
                f,
                "time component at position {position} has quantity {quantity}, outside [{min}, {max}]"
            ),
            TimeError::TooLong(n) => write!(f, "time path has {n} components, maximum is 6"),
            TimeError::EmptyInterval => write!(f, "range end precedes range start"),
        }
    }
}

impl std::error::Error for TimeError {}

/// Top-level error type for every fallible client-engine operation.
#[derive(Debug)]
pub enum JediError {
    /// The caller supplied a malformed URI.
    InvalidUri(UriError),
    /// The caller supplied a malformed or out-of-range timestamp/time path.
    InvalidTime(TimeError),
    /// A WKD-IBE encapsulation failed to unmarshal.
    MalformedCiphertext,
    /// The ciphertext envelope was shorter than `encryptedKeySize + blockSize`.
    CiphertextTooShort { have: usize, need: usize },
    /// No secret key in the key store covers the requested pattern.
    NoKeyForPattern,
    /// An external collaborator (key store, params reader, symmetric
    /// primitive) returned an error.
    BackendError(String),
    /// Unmarshalling a pattern or delegation failed.
    MarshalError(String),
    /// An internal lock was poisoned by a panicking holder. The crate never
    /// panics on this path in the public API, so this variant exists for
    /// completeness rather than being expected in practice.
    LockPoisoned,
}

impl fmt::Display for JediError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JediError::InvalidUri(e) => write!(f, "invalid uri: {e}"),
            JediError::InvalidTime(e) => write!(f, "invalid time: {e}"),
            JediError::MalformedCiphertext => write!(f, "malformed ciphertext encapsulation"),
            JediError::CiphertextTooShort { have, need } => write!(
                f,
                "ciphertext too short: {have} bytes, need at least {need}"
            ),
            JediError::NoKeyForPattern => write!(f, "no key for pattern"),
            JediError::BackendError(msg) => write!(f, "backend error: {msg}"),
            JediError::MarshalError(msg) => write!(f, "marshal error: {msg}"),
            JediError::LockPoisoned => write!(f, "internal lock poisoned"),
        }
    }
}

impl std::error::Error for JediError {}

impl From<UriError> for JediError {
    fn from(e: UriError) -> Self {
        JediError::InvalidUri(e)
    }
}

impl From<TimeError> for JediError {
    fn from(e: TimeError) -> Self {
        JediError::InvalidTime(e)
    }
}

pub type Result<T> = std::result::Result<T, JediError>;
