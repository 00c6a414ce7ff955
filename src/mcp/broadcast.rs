//! Broadcast manager for server-push clients.
//!
//! Tracks the set of currently connected event-stream consumers and
//! delivers serialized messages to one or all of them. Each client owns a
//! bounded mailbox; the behavioural contract is that [`BroadcastManager::send`]
//! may wait briefly for space, while [`BroadcastManager::broadcast`] never
//! waits — a stalled consumer is skipped, not serviced, so it can never
//! delay delivery to the rest.
//!
//! # Ownership
//!
//! The registry exclusively owns the write side of every mailbox. Transport
//! adapters receive a [`ClientHandle`] (identifier plus read side) at
//! registration time and hold nothing else; removal closes the mailbox
//! exactly once by dropping the sender.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::BroadcastError;

/// Pending messages a client mailbox can hold before deliveries are
/// skipped (broadcast) or waited on (send).
pub const MAILBOX_CAPACITY: usize = 256;

/// How long a point-to-point send waits for mailbox space before failing.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(2);

/// What a transport adapter gets back from [`BroadcastManager::add_client`]:
/// the client's identifier and the read side of its mailbox.
#[derive(Debug)]
pub struct ClientHandle {
    /// Collision-resistant random identifier for this client.
    pub id: String,
    /// Read side of the client's mailbox. Yields `None` once the client
    /// has been removed and the queue drained.
    pub mailbox: mpsc::Receiver<String>,
}

/// Registry-side state for one client.
struct ClientSlot {
    sender: mpsc::Sender<String>,
    alive: bool,
}

/// Manages all connected push clients.
///
/// Registration and removal take the write side of the lock; send and
/// broadcast take the read side, so deliveries to different clients
/// proceed concurrently.
pub struct BroadcastManager {
    clients: RwLock<HashMap<String, ClientSlot>>,
}

impl BroadcastManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a new client and returns its handle.
    ///
    /// Infallible: the identifier is a fresh UUID v4, assumed unique in
    /// practice. The mailbox exists before this returns, so a broadcast
    /// racing with registration is delivered, not lost.
    pub async fn add_client(&self) -> ClientHandle {
        let id = uuid::Uuid::new_v4().to_string();
        let (sender, mailbox) = mpsc::channel(MAILBOX_CAPACITY);

        let mut clients = self.clients.write().await;
        clients.insert(
            id.clone(),
            ClientSlot {
                sender,
                alive: true,
            },
        );
        info!(client_id = %id, "Push client added");

        ClientHandle { id, mailbox }
    }

    /// Unregisters a client, closing its mailbox.
    ///
    /// Removing an unknown or already-removed id is a silent no-op, so the
    /// call is idempotent; the presence check guarantees the mailbox is
    /// closed exactly once.
    pub async fn remove_client(&self, id: &str) {
        let mut clients = self.clients.write().await;
        if let Some(mut slot) = clients.remove(id) {
            slot.alive = false;
            // Dropping the slot (and its sender) closes the mailbox and
            // wakes any reader blocked on it.
            drop(slot);
            info!(client_id = %id, "Push client removed");
        }
    }

    /// Delivers a message to one specific client.
    ///
    /// Waits up to [`SEND_TIMEOUT`] for mailbox space; the caller expects a
    /// definite outcome.
    ///
    /// # Errors
    ///
    /// - [`BroadcastError::ClientNotFound`] when no live client has this id
    /// - [`BroadcastError::SendTimeout`] when the mailbox stayed full
    /// - [`BroadcastError::ClientClosed`] when the mailbox closed mid-send
    pub async fn send(&self, id: &str, message: String) -> Result<(), BroadcastError> {
        let sender = {
            let clients = self.clients.read().await;
            let slot = clients.get(id).ok_or_else(|| BroadcastError::ClientNotFound {
                id: id.to_string(),
            })?;
            if !slot.alive {
                return Err(BroadcastError::ClientClosed { id: id.to_string() });
            }
            slot.sender.clone()
        };

        match sender.send_timeout(message, SEND_TIMEOUT).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(BroadcastError::SendTimeout {
                id: id.to_string(),
            }),
            Err(SendTimeoutError::Closed(_)) => Err(BroadcastError::ClientClosed {
                id: id.to_string(),
            }),
        }
    }

    /// Delivers a message to every live client, best-effort.
    ///
    /// Never waits: a full mailbox is skipped with a warning so that one
    /// slow consumer cannot block delivery to the rest.
    pub async fn broadcast(&self, message: &str) {
        let clients = self.clients.read().await;
        for (id, slot) in clients.iter() {
            if !slot.alive {
                continue;
            }
            match slot.sender.try_send(message.to_string()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(client_id = %id, "Mailbox full, skipping broadcast delivery");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(client_id = %id, "Mailbox closed during broadcast");
                }
            }
        }
    }

    /// Number of currently registered clients.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}
