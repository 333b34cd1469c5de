use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use tokio::sync::oneshot;

use crate::common::frame::TxId;
use crate::common::function::FunctionCode;
use crate::error::{InternalError, RequestError};
use crate::frame::Frame;

pub(crate) type ReplyResult = Result<Vec<u8>, RequestError>;

/// A request that has been sent and is waiting for exactly one outcome
pub(crate) struct PendingTransaction {
    function: FunctionCode,
    submitted: Instant,
    reply: oneshot::Sender<ReplyResult>,
}

impl PendingTransaction {
    fn resolve(self, result: ReplyResult) {
        // the waiter may already be gone if it timed out
        self.reply.send(result).ok();
    }
}

struct Inner {
    next: TxId,
    pending: HashMap<TxId, PendingTransaction>,
    closed: bool,
}

/// Correlates responses with requests over one connection
///
/// Ids are allocated from a wrapping counter and never handed out while a
/// transaction holding the same id is still pending.
pub(crate) struct TransactionManager {
    inner: Mutex<Inner>,
}

impl TransactionManager {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next: TxId::default(),
                pending: HashMap::new(),
                closed: false,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, RequestError> {
        self.inner
            .lock()
            .map_err(|_| InternalError::PoisonedLock.into())
    }

    pub(crate) fn register(
        &self,
        function: FunctionCode,
    ) -> Result<(TxId, oneshot::Receiver<ReplyResult>), RequestError> {
        let mut inner = self.lock()?;

        if inner.closed {
            return Err(RequestError::ConnectionClosed);
        }

        for _ in 0..=u16::MAX {
            let id = inner.next.next();
            if inner.pending.contains_key(&id) {
                continue;
            }

            let (tx, rx) = oneshot::channel();
            inner.pending.insert(
                id,
                PendingTransaction {
                    function,
                    submitted: Instant::now(),
                    reply: tx,
                },
            );
            return Ok((id, rx));
        }

        Err(InternalError::TransactionIdsExhausted.into())
    }

    /// Deliver a received frame to the transaction waiting on its id
    ///
    /// A poisoned lock fails every pending transaction and is returned so the
    /// read loop can stop.
    pub(crate) fn complete(&self, frame: Frame) -> Result<(), RequestError> {
        let id = TxId::new(frame.tx_id);
        let pending = match self.lock() {
            Ok(mut inner) => inner.pending.remove(&id),
            Err(err) => {
                tracing::error!("transaction lock poisoned, dropping response {}", id);
                self.fail_all(err);
                return Err(err);
            }
        };

        match pending {
            Some(pending) => {
                tracing::debug!(
                    "{} completed in {:?}",
                    pending.function,
                    pending.submitted.elapsed()
                );
                pending.resolve(Ok(frame.pdu));
            }
            None => {
                tracing::warn!("received response with unexpected transaction id: {}", id);
            }
        }

        Ok(())
    }

    /// Forget a transaction, releasing its id. Returns false if it already completed.
    pub(crate) fn cancel(&self, id: TxId) -> bool {
        match self.lock() {
            Ok(mut inner) => inner.pending.remove(&id).is_some(),
            Err(_) => false,
        }
    }

    /// Resolve every pending transaction with `err` and refuse new ones
    pub(crate) fn fail_all(&self, err: RequestError) {
        let pending: Vec<PendingTransaction> = match self.inner.lock() {
            Ok(mut inner) => {
                inner.closed = true;
                inner.pending.drain().map(|(_, x)| x).collect()
            }
            Err(poisoned) => {
                let mut inner = poisoned.into_inner();
                inner.closed = true;
                inner.pending.drain().map(|(_, x)| x).collect()
            }
        };

        if !pending.is_empty() {
            tracing::warn!("failing {} pending request(s): {}", pending.len(), err);
        }

        for transaction in pending {
            transaction.resolve(Err(err));
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        match self.inner.lock() {
            Ok(inner) => inner.closed,
            Err(_) => true,
        }
    }

    pub(crate) fn pending_count(&self) -> usize {
        match self.inner.lock() {
            Ok(inner) => inner.pending.len(),
            Err(_) => 0,
        }
    }
}

/// Owns a registered id for the lifetime of one request
///
/// Dropping the guard before the transaction resolved releases the id, so a
/// caller that abandons its request never leaves an entry in the pending map.
pub(crate) struct TransactionGuard<'a> {
    manager: &'a TransactionManager,
    id: TxId,
    armed: bool,
}

impl<'a> TransactionGuard<'a> {
    pub(crate) fn new(manager: &'a TransactionManager, id: TxId) -> Self {
        Self {
            manager,
            id,
            armed: true,
        }
    }

    pub(crate) fn id(&self) -> TxId {
        self.id
    }

    /// The read loop or `fail_all` already removed the entry
    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.manager.cancel(self.id) {
            tracing::debug!("released transaction {}", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitId;

    fn frame(tx_id: u16, pdu: &[u8]) -> Frame {
        Frame::new(tx_id, UnitId::new(1), pdu.to_vec())
    }

    #[test]
    fn allocates_sequential_ids() {
        let manager = TransactionManager::new();
        let (a, _ra) = manager.register(FunctionCode::ReadCoils).unwrap();
        let (b, _rb) = manager.register(FunctionCode::ReadCoils).unwrap();
        assert_eq!(a.to_u16(), 0);
        assert_eq!(b.to_u16(), 1);
        assert_eq!(manager.pending_count(), 2);
    }

    #[test]
    fn skips_ids_that_are_still_pending_after_wrapping() {
        let manager = TransactionManager::new();
        let (first, _rx) = manager.register(FunctionCode::ReadCoils).unwrap();
        assert_eq!(first.to_u16(), 0);

        // cycle through the rest of the id space, releasing each id
        for _ in 1..=u16::MAX {
            let (id, _) = manager.register(FunctionCode::ReadCoils).unwrap();
            assert!(manager.cancel(id));
        }

        let (id, _rx) = manager.register(FunctionCode::ReadCoils).unwrap();
        assert_eq!(id.to_u16(), 1);
    }

    #[test]
    fn completes_matching_transaction_only() {
        let manager = TransactionManager::new();
        let (a, mut ra) = manager.register(FunctionCode::ReadHoldingRegisters).unwrap();
        let (b, mut rb) = manager.register(FunctionCode::ReadHoldingRegisters).unwrap();

        manager
            .complete(frame(b.to_u16(), &[0x03, 0x02, 0x00, 0x01]))
            .unwrap();
        assert_eq!(rb.try_recv().unwrap(), Ok(vec![0x03, 0x02, 0x00, 0x01]));
        assert!(ra.try_recv().is_err());

        manager.complete(frame(a.to_u16(), &[0x83, 0x02])).unwrap();
        assert_eq!(ra.try_recv().unwrap(), Ok(vec![0x83, 0x02]));
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn drops_responses_with_unknown_ids() {
        let manager = TransactionManager::new();
        let (_, mut rx) = manager.register(FunctionCode::ReadCoils).unwrap();
        manager.complete(frame(0x4242, &[0x01, 0x01, 0x00])).unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(manager.pending_count(), 1);
    }

    #[test]
    fn cancel_releases_the_id() {
        let manager = TransactionManager::new();
        let (id, _rx) = manager.register(FunctionCode::ReadCoils).unwrap();
        assert!(manager.cancel(id));
        assert!(!manager.cancel(id));
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn fail_all_resolves_every_pending_transaction_and_closes() {
        let manager = TransactionManager::new();
        let mut receivers: Vec<_> = (0..3)
            .map(|_| manager.register(FunctionCode::WriteSingleRegister).unwrap().1)
            .collect();

        manager.fail_all(RequestError::ConnectionClosed);

        for rx in receivers.iter_mut() {
            assert_eq!(rx.try_recv().unwrap(), Err(RequestError::ConnectionClosed));
        }
        assert!(manager.is_closed());
        assert_eq!(
            manager.register(FunctionCode::ReadCoils).err(),
            Some(RequestError::ConnectionClosed)
        );
    }

    #[test]
    fn dropped_guard_releases_the_id() {
        let manager = TransactionManager::new();
        let (id, _rx) = manager.register(FunctionCode::ReadCoils).unwrap();
        drop(TransactionGuard::new(&manager, id));
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn disarmed_guard_leaves_the_map_alone() {
        let manager = TransactionManager::new();
        let (id, _rx) = manager.register(FunctionCode::ReadCoils).unwrap();
        let mut guard = TransactionGuard::new(&manager, id);
        guard.disarm();
        drop(guard);
        assert_eq!(manager.pending_count(), 1);
    }

    #[test]
    fn poisoned_lock_fails_pending_transactions_on_complete() {
        let manager = std::sync::Arc::new(TransactionManager::new());
        let (id, mut rx) = manager.register(FunctionCode::ReadCoils).unwrap();

        let other = manager.clone();
        std::thread::spawn(move || {
            let _guard = other.inner.lock().unwrap();
            panic!("panic while holding the transaction lock");
        })
        .join()
        .unwrap_err();

        let poisoned = RequestError::Internal(InternalError::PoisonedLock);
        assert_eq!(
            manager.complete(frame(id.to_u16(), &[0x01, 0x01, 0x00])),
            Err(poisoned)
        );
        assert_eq!(rx.try_recv().unwrap(), Err(poisoned));
        assert!(manager.is_closed());
    }
}
