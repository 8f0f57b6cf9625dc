/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Shared connection registry.
//!
//! Maps a session key to the live [`RoomConnectionHandle`] so the active-call
//! view can adopt the connection the waiting room opened instead of
//! reconnecting. The table is owned by a single actor task; every read and
//! write is a message to it. [`ConnectionRegistry`] is the cloneable handle.
//!
//! Attempts that are still connecting are tracked too. The first view to
//! [`claim`](ConnectionRegistry::claim) a key leads the handshake; later
//! views wait for the leader's handle instead of opening a second one.

use log::{debug, info, warn};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};

use super::room_handle::RoomConnectionHandle;
use crate::error::SessionError;

enum RegistryCommand {
    Put {
        handle: RoomConnectionHandle,
        reply: oneshot::Sender<Result<Option<RoomConnectionHandle>, SessionError>>,
    },
    Get {
        session_key: String,
        reply: oneshot::Sender<Option<RoomConnectionHandle>>,
    },
    Delete {
        session_key: String,
        reply: oneshot::Sender<Option<RoomConnectionHandle>>,
    },
    /// Remove the entry only if it still holds the handle with this id.
    DeleteHandle { session_key: String, id: u64 },
    Claim {
        session_key: String,
        reply: oneshot::Sender<RegistryClaim>,
    },
    /// The leading attempt ended without registering a handle.
    Release { session_key: String, claim_id: u64 },
    Len {
        reply: oneshot::Sender<usize>,
    },
}

/// Result of [`ConnectionRegistry::claim`].
#[derive(Debug)]
pub enum RegistryClaim {
    /// A live handle is registered; adopt it.
    Live(RoomConnectionHandle),
    /// Another view is connecting. Resolves with its handle, or `None` if
    /// that attempt ended without one.
    Pending(oneshot::Receiver<Option<RoomConnectionHandle>>),
    /// The caller leads the attempt for this key.
    Lead(AttemptClaim),
}

/// Held by the view leading the connect attempt for a key. Dropping it
/// without registering a handle wakes the waiting views.
#[derive(Debug)]
pub struct AttemptClaim {
    session_key: String,
    id: u64,
    tx: Option<mpsc::UnboundedSender<RegistryCommand>>,
}

impl Drop for AttemptClaim {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(RegistryCommand::Release {
                session_key: std::mem::take(&mut self.session_key),
                claim_id: self.id,
            });
        }
    }
}

struct PendingAttempt {
    claim_id: u64,
    waiters: Vec<oneshot::Sender<Option<RoomConnectionHandle>>>,
}

struct RegistryActor {
    entries: HashMap<String, RoomConnectionHandle>,
    pending: HashMap<String, PendingAttempt>,
    next_claim: u64,
    tx: mpsc::WeakUnboundedSender<RegistryCommand>,
    rx: mpsc::UnboundedReceiver<RegistryCommand>,
}

impl RegistryActor {
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                RegistryCommand::Put { handle, reply } => {
                    let _ = reply.send(self.put(handle));
                }
                RegistryCommand::Get { session_key, reply } => {
                    let _ = reply.send(self.get(&session_key));
                }
                RegistryCommand::Delete { session_key, reply } => {
                    let removed = self.entries.remove(&session_key);
                    if removed.is_some() {
                        debug!("Registry: removed {session_key}");
                    }
                    let _ = reply.send(removed);
                }
                RegistryCommand::DeleteHandle { session_key, id } => {
                    if self.entries.get(&session_key).map(|h| h.id()) == Some(id) {
                        self.entries.remove(&session_key);
                        debug!("Registry: removed {session_key}#{id}");
                    }
                }
                RegistryCommand::Claim { session_key, reply } => {
                    let _ = reply.send(self.claim(session_key));
                }
                RegistryCommand::Release {
                    session_key,
                    claim_id,
                } => self.release(&session_key, claim_id),
                RegistryCommand::Len { reply } => {
                    let _ = reply.send(self.entries.len());
                }
            }
        }
        debug!("Registry actor stopped with {} entries", self.entries.len());
    }

    fn put(
        &mut self,
        handle: RoomConnectionHandle,
    ) -> Result<Option<RoomConnectionHandle>, SessionError> {
        if !handle.is_alive() {
            return Err(SessionError::NotConnected);
        }
        let key = handle.session_key().to_string();
        if let Some(pending) = self.pending.remove(&key) {
            debug!(
                "Registry: claim {key}/{} resolved with #{}",
                pending.claim_id,
                handle.id()
            );
            for waiter in pending.waiters {
                let _ = waiter.send(Some(handle.clone()));
            }
        }
        match self.entries.insert(key.clone(), handle.clone()) {
            Some(previous) if previous.id() != handle.id() => {
                // Never two adoptable handles for one key.
                info!(
                    "Registry: {key}#{} replaces #{}",
                    handle.id(),
                    previous.id()
                );
                previous.close();
                Ok(Some(previous))
            }
            _ => {
                info!("Registry: registered {key}#{}", handle.id());
                Ok(None)
            }
        }
    }

    fn get(&mut self, session_key: &str) -> Option<RoomConnectionHandle> {
        let handle = self.entries.get(session_key)?;
        if handle.is_alive() {
            return Some(handle.clone());
        }
        debug!(
            "Registry: dropping dead entry {session_key}#{} ({})",
            handle.id(),
            handle.phase()
        );
        self.entries.remove(session_key);
        None
    }

    fn claim(&mut self, session_key: String) -> RegistryClaim {
        if let Some(handle) = self.get(&session_key) {
            return RegistryClaim::Live(handle);
        }
        if let Some(pending) = self.pending.get_mut(&session_key) {
            let (waiter, rx) = oneshot::channel();
            pending.waiters.push(waiter);
            debug!(
                "Registry: waiting on claim {session_key}/{}",
                pending.claim_id
            );
            return RegistryClaim::Pending(rx);
        }
        self.next_claim += 1;
        let claim_id = self.next_claim;
        self.pending.insert(
            session_key.clone(),
            PendingAttempt {
                claim_id,
                waiters: Vec::new(),
            },
        );
        debug!("Registry: claim {session_key}/{claim_id} issued");
        RegistryClaim::Lead(AttemptClaim {
            session_key,
            id: claim_id,
            tx: self.tx.upgrade(),
        })
    }

    fn release(&mut self, session_key: &str, claim_id: u64) {
        if self.pending.get(session_key).map(|p| p.claim_id) != Some(claim_id) {
            return;
        }
        if let Some(pending) = self.pending.remove(session_key) {
            debug!(
                "Registry: claim {session_key}/{claim_id} released with {} waiter(s)",
                pending.waiters.len()
            );
            for waiter in pending.waiters {
                let _ = waiter.send(None);
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConnectionRegistry {
    tx: mpsc::UnboundedSender<RegistryCommand>,
}

impl ConnectionRegistry {
    /// Spawn the owning actor. Requires a tokio runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = RegistryActor {
            entries: HashMap::new(),
            pending: HashMap::new(),
            next_claim: 0,
            tx: tx.downgrade(),
            rx,
        };
        tokio::spawn(actor.run());
        Self { tx }
    }

    /// Register a live handle, closing any other handle held for its key.
    ///
    /// Returns the displaced handle, if any. Fails with `NotConnected` for a
    /// handle that is not adoptable.
    pub async fn put(
        &self,
        handle: RoomConnectionHandle,
    ) -> Result<Option<RoomConnectionHandle>, SessionError> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(RegistryCommand::Put { handle, reply }).is_err() {
            warn!("Registry actor is gone; handle not registered");
            return Ok(None);
        }
        rx.await.unwrap_or(Ok(None))
    }

    /// Look up a handle that is safe to adopt. Dead entries are removed and
    /// reported as absent.
    pub async fn get(&self, session_key: &str) -> Option<RoomConnectionHandle> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RegistryCommand::Get {
                session_key: session_key.to_string(),
                reply,
            })
            .ok()?;
        rx.await.ok().flatten()
    }

    /// Adopt, wait for, or lead the connect attempt for `session_key`.
    ///
    /// At most one [`AttemptClaim`] per key is outstanding. If the actor is
    /// gone the caller leads with a claim that wakes nobody.
    pub async fn claim(&self, session_key: &str) -> RegistryClaim {
        let unowned = || {
            RegistryClaim::Lead(AttemptClaim {
                session_key: session_key.to_string(),
                id: 0,
                tx: None,
            })
        };
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(RegistryCommand::Claim {
                session_key: session_key.to_string(),
                reply,
            })
            .is_err()
        {
            warn!("Registry actor is gone; connecting without a claim");
            return unowned();
        }
        rx.await.unwrap_or_else(|_| unowned())
    }

    pub async fn delete(&self, session_key: &str) -> Option<RoomConnectionHandle> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RegistryCommand::Delete {
                session_key: session_key.to_string(),
                reply,
            })
            .ok()?;
        rx.await.ok().flatten()
    }

    /// Remove `session_key` if it still maps to the handle with `id`.
    ///
    /// Does not wait for the actor, so it is safe on synchronous teardown paths.
    pub fn delete_handle(&self, session_key: &str, id: u64) {
        let _ = self.tx.send(RegistryCommand::DeleteHandle {
            session_key: session_key.to_string(),
            id,
        });
    }

    pub async fn len(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(RegistryCommand::Len { reply }).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
