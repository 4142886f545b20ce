//! Frame parsing and validation errors.

use std::fmt;
use std::fmt::Display;

/// Failure modes encountered while reading a frame header off the wire,
/// before any decryption is attempted.
#[derive(Debug)]
pub(crate) enum FrameError {
    /// `len` fell outside `1..=MAX_PACKET_LEN` (I4).
    InvalidLength(usize),
    /// The authentication tag did not verify.
    TagMismatch,
}

impl std::error::Error for FrameError {}

impl Display for FrameError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FrameError::InvalidLength(len) => write!(fmt, "frame length {} out of bounds", len),
            FrameError::TagMismatch => "authentication tag mismatch".fmt(fmt),
        }
    }
}
