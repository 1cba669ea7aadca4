//! Long lived feature locks, held in memory next to the store.
//!
//! Locks are independent of database transactions: a lock taken with a
//! [`FeatureLock::token`] survives commits until it is released or expires,
//! while a [`FeatureLock::Transaction`] lock ends with the transaction that
//! took it.

use geostore_core::{Error, FeatureId, Result};
use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::{Duration, Instant},
};

/// Identifies a transaction for lock ownership and change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub(crate) u64);

/// Who holds a lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockOwner {
    Transaction(TransactionId),
    /// Holder of an authorization token.
    Token(String),
}

/// How long a requested lock lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureLock {
    /// Until the enclosing transaction commits or rolls back.
    Transaction,

    /// Until released, or until `duration` passes without a refresh.
    Token { token: String, duration: Duration },
}

/// Outcome of a batch operation that may partly succeed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub attempted: usize,
    pub succeeded: usize,
    /// Features the operation skipped.
    pub failures: Vec<FeatureId>,
}

/// What a writer may touch despite locks: its own transaction's locks and
/// those of the tokens it was given.
#[derive(Debug, Clone, Default)]
pub struct Authorizations {
    pub(crate) transaction: Option<TransactionId>,
    pub(crate) tokens: HashSet<String>,
}

/// The lock table of one store.
///
/// Every call takes the table's mutex, so lock and unlock calls are
/// serialized across all connections and transactions of the store.
#[derive(Debug, Default)]
pub struct LockManager {
    locks: Mutex<HashMap<FeatureId, Lock>>,
}

#[derive(Debug, Clone)]
struct Lock {
    owner: LockOwner,
    /// `None` for transaction locks.
    expires: Option<Instant>,
    duration: Duration,
}

impl FeatureLock {
    /// A lock with a fresh random token.
    pub fn token(duration: Duration) -> FeatureLock {
        FeatureLock::with_token(uuid::Uuid::new_v4().to_string(), duration)
    }

    pub fn with_token(token: impl Into<String>, duration: Duration) -> FeatureLock {
        FeatureLock::Token {
            token: token.into(),
            duration,
        }
    }

    /// The authorization token, if this is a token lock.
    pub fn authorization(&self) -> Option<&str> {
        match self {
            FeatureLock::Transaction => None,
            FeatureLock::Token { token, .. } => Some(token),
        }
    }
}

impl BatchResult {
    /// Returns `true` if every attempted feature succeeded.
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.attempted
    }
}

impl Authorizations {
    pub fn new() -> Authorizations {
        Authorizations::default()
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Authorizations {
        self.tokens.insert(token.into());
        self
    }

    pub(crate) fn for_transaction(id: TransactionId) -> Authorizations {
        Authorizations {
            transaction: Some(id),
            tokens: HashSet::new(),
        }
    }

    fn allows(&self, owner: &LockOwner) -> bool {
        match owner {
            LockOwner::Transaction(id) => self.transaction == Some(*id),
            LockOwner::Token(token) => self.tokens.contains(token),
        }
    }
}

impl Lock {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }
}

impl LockManager {
    pub fn new() -> LockManager {
        LockManager::default()
    }

    /// Locks every feature in `ids` for `owner`.
    ///
    /// Features locked by another owner are skipped and reported in the
    /// result; relocking a feature the owner already holds renews it.
    pub fn lock(
        &self,
        ids: impl IntoIterator<Item = FeatureId>,
        owner: &LockOwner,
        duration: Option<Duration>,
    ) -> BatchResult {
        let now = Instant::now();
        let mut locks = self.table();
        let mut result = BatchResult::default();

        // Tokens that are never released or refreshed leave expired entries
        locks.retain(|_, lock| !lock.is_expired(now));

        for id in ids {
            result.attempted += 1;

            match locks.get(&id) {
                Some(lock) if lock.owner != *owner && !lock.is_expired(now) => {
                    result.failures.push(id);
                }
                _ => {
                    locks.insert(
                        id,
                        Lock {
                            owner: owner.clone(),
                            expires: duration.map(|duration| now + duration),
                            duration: duration.unwrap_or_default(),
                        },
                    );
                    result.succeeded += 1;
                }
            }
        }

        tracing::debug!(
            attempted = result.attempted,
            succeeded = result.succeeded,
            "lock"
        );
        result
    }

    /// Unlocks every feature in `ids` held by `owner`.
    ///
    /// Fails without unlocking anything if one of the features is held by
    /// another owner. Features that are not locked are skipped.
    pub fn unlock(
        &self,
        ids: impl IntoIterator<Item = FeatureId>,
        owner: &LockOwner,
    ) -> Result<BatchResult> {
        let now = Instant::now();
        let mut locks = self.table();
        let ids: Vec<FeatureId> = ids.into_iter().collect();

        for id in &ids {
            if let Some(lock) = locks.get(id) {
                if lock.owner != *owner && !lock.is_expired(now) {
                    return Err(Error::authorization(format!(
                        "lock on `{id}` is held by another owner"
                    )));
                }
            }
        }

        let mut result = BatchResult::default();
        for id in ids {
            result.attempted += 1;
            if locks.remove(&id).is_some() {
                result.succeeded += 1;
            } else {
                result.failures.push(id);
            }
        }

        Ok(result)
    }

    /// Extends every lock of `token` by its duration, counted from now.
    ///
    /// Fails if the token holds no live lock.
    pub fn refresh(&self, token: &str) -> Result<usize> {
        let now = Instant::now();
        let mut locks = self.table();
        let mut refreshed = 0;

        for lock in locks.values_mut() {
            if matches!(&lock.owner, LockOwner::Token(t) if t == token) && !lock.is_expired(now) {
                lock.expires = Some(now + lock.duration);
                refreshed += 1;
            }
        }

        if refreshed == 0 {
            return Err(Error::authorization(format!(
                "lock token `{token}` holds no locks"
            )));
        }
        Ok(refreshed)
    }

    /// Releases every lock of `token`. Returns how many were released.
    pub fn release(&self, token: &str) -> usize {
        self.release_where(|owner| matches!(owner, LockOwner::Token(t) if t == token))
    }

    /// Releases the locks a transaction took for its own lifetime.
    pub fn release_transaction(&self, id: TransactionId) -> usize {
        self.release_where(|owner| *owner == LockOwner::Transaction(id))
    }

    /// Fails with a write conflict if `id` is locked by an owner
    /// `authorizations` does not cover.
    pub fn assert_access(&self, id: &FeatureId, authorizations: &Authorizations) -> Result<()> {
        let locks = self.table();
        match locks.get(id) {
            Some(lock) if !lock.is_expired(Instant::now()) && !authorizations.allows(&lock.owner) => {
                Err(Error::write_conflict(format!("feature `{id}` is locked")))
            }
            _ => Ok(()),
        }
    }

    /// Returns `true` if `id` holds a live lock.
    pub fn is_locked(&self, id: &FeatureId) -> bool {
        self.table()
            .get(id)
            .is_some_and(|lock| !lock.is_expired(Instant::now()))
    }

    /// Returns `true` if any feature of `type_name` holds a live lock.
    pub fn has_locks(&self, type_name: &str) -> bool {
        let now = Instant::now();
        let prefix = format!("{type_name}.");
        self.table()
            .iter()
            .any(|(id, lock)| id.as_str().starts_with(&prefix) && !lock.is_expired(now))
    }

    fn release_where(&self, f: impl Fn(&LockOwner) -> bool) -> usize {
        let now = Instant::now();
        let mut locks = self.table();
        let mut released = 0;

        // Expired locks are dropped on the way
        locks.retain(|_, lock| {
            if lock.is_expired(now) {
                return false;
            }
            let matched = f(&lock.owner);
            released += usize::from(matched);
            !matched
        });
        tracing::debug!(released, "release locks");
        released
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<FeatureId, Lock>> {
        // The table stays consistent even if a holder panicked
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> FeatureId {
        FeatureId::from(format!("roads.{n}").as_str())
    }

    fn token(name: &str) -> LockOwner {
        LockOwner::Token(name.to_string())
    }

    #[test]
    fn second_owner_is_refused() {
        let locks = LockManager::new();
        let (a, b) = (token("a"), token("b"));

        let result = locks.lock([id(1)], &a, None);
        assert_eq!(result.succeeded, 1);

        let result = locks.lock([id(1)], &b, None);
        assert_eq!(result.attempted, 1);
        assert_eq!(result.succeeded, 0);
        assert_eq!(result.failures, [id(1)]);

        assert!(locks.unlock([id(1)], &b).unwrap_err().is_authorization());

        assert_eq!(locks.unlock([id(1)], &a).unwrap().succeeded, 1);
        assert_eq!(locks.lock([id(1)], &b, None).succeeded, 1);
    }

    #[test]
    fn batches_partly_succeed() {
        let locks = LockManager::new();
        locks.lock([id(2)], &token("a"), None);

        let result = locks.lock([id(1), id(2), id(3)], &token("b"), None);
        assert_eq!(result.attempted, 3);
        assert_eq!(result.succeeded, 2);
        assert!(!result.is_complete());
    }

    #[test]
    fn expired_locks_are_free() {
        let locks = LockManager::new();
        locks.lock([id(1)], &token("a"), Some(Duration::ZERO));

        assert!(!locks.is_locked(&id(1)));
        assert_eq!(locks.lock([id(1)], &token("b"), None).succeeded, 1);
        assert!(locks.refresh("a").unwrap_err().is_authorization());
    }

    #[test]
    fn locking_drops_expired_entries() {
        let locks = LockManager::new();
        locks.lock([id(1), id(2)], &token("a"), Some(Duration::ZERO));
        assert_eq!(locks.table().len(), 2);

        locks.lock([id(3)], &token("b"), Some(Duration::from_secs(60)));
        assert_eq!(locks.table().len(), 1);
        assert!(locks.is_locked(&id(3)));
    }

    #[test]
    fn refresh_and_release_tokens() {
        let locks = LockManager::new();
        locks.lock([id(1), id(2)], &token("a"), Some(Duration::from_secs(60)));
        locks.lock([id(3)], &token("b"), Some(Duration::from_secs(60)));

        assert_eq!(locks.refresh("a").unwrap(), 2);
        assert_eq!(locks.release("a"), 2);
        assert!(!locks.is_locked(&id(1)));
        assert!(locks.is_locked(&id(3)));
        assert!(locks.has_locks("roads"));
        assert!(!locks.has_locks("rivers"));
    }

    #[test]
    fn access_follows_authorizations() {
        let locks = LockManager::new();
        let tx = TransactionId(7);
        locks.lock([id(1)], &LockOwner::Transaction(tx), None);
        locks.lock([id(2)], &token("a"), None);

        let anonymous = Authorizations::new();
        assert!(locks
            .assert_access(&id(1), &anonymous)
            .unwrap_err()
            .is_write_conflict());
        assert!(locks.assert_access(&id(3), &anonymous).is_ok());

        let own = Authorizations::for_transaction(tx);
        assert!(locks.assert_access(&id(1), &own).is_ok());
        assert!(locks.assert_access(&id(2), &own).is_err());
        assert!(locks.assert_access(&id(2), &own.with_token("a")).is_ok());

        assert_eq!(locks.release_transaction(tx), 1);
        assert!(!locks.is_locked(&id(1)));
    }
}
