// SPDX-License-Identifier: Apache-2.0
//! Handles to live result streams and the generation tokens that guard
//! their callbacks.

use thiserror::Error;

/// Failure raised by a stream handle.
#[derive(Debug, Error)]
pub enum StreamError {
    /// `destroy` was called on a handle that was already torn down.
    #[error("stream already destroyed")]
    AlreadyDestroyed,
    /// The underlying engine reported a failure.
    #[error("engine failure: {0}")]
    Engine(String),
}

/// A live result stream owned by the registry.
///
/// `destroy` may be called more than once; owners swallow (and log) errors
/// from redundant teardown so one stubborn handle cannot wedge a cancel.
pub trait StreamHandle {
    /// Tear the stream down, releasing engine resources.
    fn destroy(&mut self) -> Result<(), StreamError>;
}

/// Generation token identifying one registered stream set.
///
/// Every data/end/error callback carries the token it was registered
/// under; callbacks whose token no longer matches the live generation are
/// ignored, so a stream torn down mid-flight cannot corrupt the state of
/// its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryToken(u64);

impl QueryToken {
    pub(crate) fn new(generation: u64) -> Self {
        Self(generation)
    }

    /// Raw generation number, for logging.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}
