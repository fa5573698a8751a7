//! Client-side synchronization state machine.
//!
//! The classic three-state OT client: at most one operation is in flight to
//! the server at a time, later local edits pile into a compose buffer, and
//! every incoming server change is transformed against the outstanding
//! operation and then the buffer before it may touch the local document.
//!
//! ```text
//! Synchronized ── local op ──► AwaitingConfirm           (send op)
//! AwaitingConfirm ── local op ──► AwaitingWithBuffer
//! AwaitingConfirm ── server ack ──► Synchronized
//! AwaitingWithBuffer ── local op ──► AwaitingWithBuffer  (buffer ∘ op)
//! AwaitingWithBuffer ── server ack ──► AwaitingConfirm   (send buffer)
//! ```
//!
//! The machine is a pure value: the transport layer drives it and performs
//! all I/O. Server changes must be fed in receipt order; convergence
//! relies on the server imposing a total order.

use crate::change::ChangeSet;
use crate::error::{Error, Result};

/// Where the client stands relative to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    /// No local changes the server has not acknowledged.
    Synchronized,
    /// One operation sent, no answer yet.
    AwaitingConfirm {
        /// The operation in flight.
        outstanding: ChangeSet,
    },
    /// One operation in flight plus buffered local edits.
    AwaitingWithBuffer {
        /// The operation in flight.
        outstanding: ChangeSet,
        /// Composition of every local edit made since the send.
        buffer: ChangeSet,
    },
}

/// The client half of the OT control algorithm.
#[derive(Debug, Clone)]
pub struct Client {
    state: ClientState,
}

impl Client {
    /// A client in the [`ClientState::Synchronized`] state.
    pub fn new() -> Self {
        Client {
            state: ClientState::Synchronized,
        }
    }

    /// The current state.
    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// Returns `true` when nothing is in flight or buffered.
    pub fn is_synchronized(&self) -> bool {
        matches!(self.state, ClientState::Synchronized)
    }

    /// Records a local edit (already applied to the local document).
    ///
    /// Returns the change to send to the server, if this edit starts a new
    /// round trip; otherwise the edit is buffered.
    pub fn apply_local(&mut self, change: ChangeSet) -> Result<Option<ChangeSet>> {
        let state = std::mem::replace(&mut self.state, ClientState::Synchronized);
        match state {
            ClientState::Synchronized => {
                self.state = ClientState::AwaitingConfirm {
                    outstanding: change.clone(),
                };
                Ok(Some(change))
            }
            ClientState::AwaitingConfirm { outstanding } => {
                if change.len_before() != outstanding.len_after() {
                    let expected = outstanding.len_after();
                    self.state = ClientState::AwaitingConfirm { outstanding };
                    return Err(Error::LengthMismatch {
                        expected,
                        actual: change.len_before(),
                    });
                }
                self.state = ClientState::AwaitingWithBuffer {
                    outstanding,
                    buffer: change,
                };
                Ok(None)
            }
            ClientState::AwaitingWithBuffer {
                outstanding,
                buffer,
            } => {
                let buffer = buffer.compose(&change)?;
                self.state = ClientState::AwaitingWithBuffer {
                    outstanding,
                    buffer,
                };
                Ok(None)
            }
        }
    }

    /// Processes a change broadcast by the server (someone else's edit).
    ///
    /// Transforms it against the outstanding operation and the buffer, in
    /// that order, and returns the change to apply to the local document.
    pub fn apply_server(&mut self, change: ChangeSet) -> Result<ChangeSet> {
        let state = std::mem::replace(&mut self.state, ClientState::Synchronized);
        match state {
            ClientState::Synchronized => Ok(change),
            ClientState::AwaitingConfirm { outstanding } => {
                let (outstanding, change) = outstanding.transform(&change)?;
                self.state = ClientState::AwaitingConfirm { outstanding };
                Ok(change)
            }
            ClientState::AwaitingWithBuffer {
                outstanding,
                buffer,
            } => {
                let (outstanding, change) = outstanding.transform(&change)?;
                let (buffer, change) = buffer.transform(&change)?;
                self.state = ClientState::AwaitingWithBuffer {
                    outstanding,
                    buffer,
                };
                Ok(change)
            }
        }
    }

    /// Processes the server's acknowledgement of the outstanding
    /// operation. Returns the buffered change to send next, if any.
    pub fn server_ack(&mut self) -> Result<Option<ChangeSet>> {
        let state = std::mem::replace(&mut self.state, ClientState::Synchronized);
        match state {
            ClientState::Synchronized => Err(Error::InvalidInput {
                parameter: "ack",
                reason: "no operation is outstanding",
                value: "Synchronized".to_string(),
            }),
            ClientState::AwaitingConfirm { .. } => {
                self.state = ClientState::Synchronized;
                Ok(None)
            }
            ClientState::AwaitingWithBuffer { buffer, .. } => {
                self.state = ClientState::AwaitingConfirm {
                    outstanding: buffer.clone(),
                };
                Ok(Some(buffer))
            }
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Client::new()
    }
}
