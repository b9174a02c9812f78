use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::errors::SessionError;
use crate::proto::pdu::ResponseOrException;

pub type Completion = oneshot::Sender<Result<ResponseOrException, SessionError>>;

/// Outstanding TCP transactions, keyed by `transaction_id`. Ids are
/// allocated by a per-session atomic counter with wrap-around — never a
/// process-global counter, so multiple sessions never contend over it.
pub struct TransactionRegistry {
    next_id: AtomicU16,
    pending: Mutex<HashMap<u16, Completion>>,
}

impl Default for TransactionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU16::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Allocates the next transaction id and registers a completion for
    /// it. Wraps at 65535 back to 1 (0 is reserved, matching the source's
    /// habit of starting each session at 1).
    pub fn register(&self) -> (u16, oneshot::Receiver<Result<ResponseOrException, SessionError>>) {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock().unwrap();
        loop {
            let id = self.allocate_id();
            if !pending.contains_key(&id) {
                pending.insert(id, tx);
                return (id, rx);
            }
            // An id collision while the prior transaction is still
            // outstanding would need u16::MAX concurrent transactions to
            // hit honestly, so this loop is a safety net, not the
            // expected path.
        }
    }

    fn allocate_id(&self) -> u16 {
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
            // 0 was skipped; the fetch_add already advanced past it.
        }
    }

    /// Resolves a response whose transaction id matches a pending entry.
    /// An id with no pending entry is a response that arrived after its
    /// deadline already fired — it is dropped, not an error.
    pub fn resolve(&self, transaction_id: u16, response: Result<ResponseOrException, SessionError>) {
        let completion = self.pending.lock().unwrap().remove(&transaction_id);
        match completion {
            Some(completion) => {
                let _ = completion.send(response);
            }
            None => {
                tracing::warn!(transaction_id, "response for unknown or already-resolved transaction");
            }
        }
    }

    /// Removes a pending entry without resolving it (deadline fired, or
    /// the caller cancelled) — the receiver has already observed the
    /// corresponding error through its own path (timeout/cancellation).
    pub fn remove(&self, transaction_id: u16) {
        self.pending.lock().unwrap().remove(&transaction_id);
    }

    /// Fails every pending transaction, used when the connection drops.
    pub fn fail_all(&self, make_error: impl Fn() -> SessionError) {
        let mut pending = self.pending.lock().unwrap();
        for (_, completion) in pending.drain() {
            let _ = completion.send(Err(make_error()));
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_skip_zero() {
        let registry = TransactionRegistry::new();
        let (id1, _rx1) = registry.register();
        let (id2, _rx2) = registry.register();
        assert_eq!(id1, 1);
        assert_eq!(id2, 2);
    }

    #[tokio::test]
    async fn resolve_delivers_to_the_matching_receiver() {
        let registry = TransactionRegistry::new();
        let (id, rx) = registry.register();
        registry.resolve(id, Ok(ResponseOrException::Response(crate::proto::pdu::Response::ReadRegisters(vec![7]))));
        let result = rx.await.unwrap().unwrap();
        assert!(matches!(result, ResponseOrException::Response(_)));
    }

    #[test]
    fn resolve_with_unknown_id_is_silently_dropped() {
        let registry = TransactionRegistry::new();
        registry.resolve(999, Ok(ResponseOrException::Exception(crate::errors::ExceptionCode::IllegalFunction)));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn fail_all_resolves_every_pending_transaction() {
        let registry = TransactionRegistry::new();
        let (_id1, rx1) = registry.register();
        let (_id2, rx2) = registry.register();
        registry.fail_all(|| SessionError::connection_lost("peer closed"));
        assert!(rx1.await.unwrap().is_err());
        assert!(rx2.await.unwrap().is_err());
    }
}
