//! Error types for the rendezvous protocol and its harness.

use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// This enum contains all error messages this library can return. Most API functions
/// will generally return a [`Result<_, RendezvousError>`].
///
/// [`Result<_, RendezvousError>`]: std::result::Result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RendezvousError {
    /// A wait or signal operation was attempted on a channel that has been closed.
    ///
    /// This is the in-process analog of a semaphore operation failing at the OS
    /// boundary: it is always fatal to the entity that observes it. A participant
    /// half-way through a match cannot rejoin, so there is no retry path.
    ChannelClosed {
        /// Name of the channel the operation was attempted on.
        channel: &'static str,
    },
    /// The simulation was configured with values that can never complete.
    ///
    /// Raised by the builder before any protocol state exists; a rejected
    /// configuration cannot corrupt shared state.
    InvalidConfig {
        /// Further specifies why the configuration was invalid.
        info: String,
    },
    /// An entity was created with an identity index outside its role's population.
    InvalidEntityId {
        /// The index that was supplied.
        id: usize,
        /// The maximum valid index (population - 1).
        max: usize,
    },
    /// A protocol invariant was violated. This should not happen under normal
    /// operation; if you encounter this error, please report it as a bug.
    Internal {
        /// A description of the internal error.
        context: String,
    },
}

impl Display for RendezvousError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RendezvousError::ChannelClosed { channel } => {
                write!(f, "Channel '{}' is closed; the rendezvous is over.", channel)
            }
            RendezvousError::InvalidConfig { info } => {
                write!(f, "Invalid configuration: {}", info)
            }
            RendezvousError::InvalidEntityId { id, max } => {
                write!(
                    f,
                    "Invalid entity id {}: must be less than or equal to {}",
                    id, max
                )
            }
            RendezvousError::Internal { context } => {
                write!(f, "Internal error (please report as bug): {}", context)
            }
        }
    }
}

impl Error for RendezvousError {}
