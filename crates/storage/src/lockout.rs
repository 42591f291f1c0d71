use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use course_core::model::{LessonId, UserId};
use course_core::time::seconds_until;

use crate::keys;
use crate::kv::{KeyValueStore, StorageError};

/// Default lockout duration after the final exit strike: 24 hours.
pub const LOCKOUT_DURATION_SECS: i64 = 24 * 60 * 60;

/// Persisted lock record. Absent or expired means not locked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct LockoutRecord {
    locked_until: DateTime<Utc>,
}

/// Per-user, per-lesson quiz lockouts over the key-value port.
///
/// Expiry is lazy: expired records are ignored on read and never swept.
#[derive(Clone)]
pub struct LockoutRegistry {
    kv: Arc<dyn KeyValueStore>,
}

impl LockoutRegistry {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    async fn load(
        &self,
        user: &UserId,
        lesson: LessonId,
    ) -> Result<Option<LockoutRecord>, StorageError> {
        let key = keys::lockout(user, lesson);
        match self.kv.get(&key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Timestamp the current lock expires at, if a record exists.
    ///
    /// The raw record is returned even when already expired; use
    /// [`is_locked`](Self::is_locked) for the effective state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be read.
    pub async fn locked_until(
        &self,
        user: &UserId,
        lesson: LessonId,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        Ok(self.load(user, lesson).await?.map(|r| r.locked_until))
    }

    /// True iff an unexpired lock record exists.
    ///
    /// At exactly `locked_until` the lock no longer holds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be read.
    pub async fn is_locked(
        &self,
        user: &UserId,
        lesson: LessonId,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        Ok(self
            .load(user, lesson)
            .await?
            .is_some_and(|r| r.locked_until > now))
    }

    /// Whole seconds until the lock expires, rounded up, zero when unlocked.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be read.
    pub async fn remaining_seconds(
        &self,
        user: &UserId,
        lesson: LessonId,
        now: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        Ok(self
            .load(user, lesson)
            .await?
            .map_or(0, |r| seconds_until(now, r.locked_until)))
    }

    /// Write a lock expiring at `now + duration`, overwriting any existing
    /// record. Locks never stack: re-locking replaces the old expiry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    pub async fn lock(
        &self,
        user: &UserId,
        lesson: LessonId,
        now: DateTime<Utc>,
        duration: Duration,
    ) -> Result<DateTime<Utc>, StorageError> {
        let locked_until = now + duration;
        let record = LockoutRecord { locked_until };
        let raw =
            serde_json::to_string(&record).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.put(&keys::lockout(user, lesson), raw).await?;
        Ok(locked_until)
    }

    /// [`lock`](Self::lock) with the standard 24-hour duration.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    pub async fn lock_default(
        &self,
        user: &UserId,
        lesson: LessonId,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, StorageError> {
        self.lock(user, lesson, now, Duration::seconds(LOCKOUT_DURATION_SECS))
            .await
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryKv;
    use course_core::time::fixed_now;

    fn registry() -> LockoutRegistry {
        LockoutRegistry::new(Arc::new(InMemoryKv::new()))
    }

    fn user() -> UserId {
        UserId::new("alice").unwrap()
    }

    #[tokio::test]
    async fn absent_record_means_unlocked() {
        let registry = registry();
        let now = fixed_now();
        assert!(!registry.is_locked(&user(), LessonId::new(1), now).await.unwrap());
        assert_eq!(
            registry
                .remaining_seconds(&user(), LessonId::new(1), now)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn lock_holds_until_expiry_exclusive() {
        let registry = registry();
        let user = user();
        let lesson = LessonId::new(1);
        let now = fixed_now();

        let until = registry.lock_default(&user, lesson, now).await.unwrap();
        assert_eq!(until, now + Duration::seconds(LOCKOUT_DURATION_SECS));

        assert!(registry.is_locked(&user, lesson, now).await.unwrap());
        assert!(
            registry
                .is_locked(&user, lesson, until - Duration::seconds(1))
                .await
                .unwrap()
        );
        // at exactly locked_until the lock is released
        assert!(!registry.is_locked(&user, lesson, until).await.unwrap());
    }

    #[tokio::test]
    async fn remaining_seconds_rounds_up() {
        let registry = registry();
        let user = user();
        let lesson = LessonId::new(1);
        let now = fixed_now();

        registry
            .lock(&user, lesson, now, Duration::milliseconds(1500))
            .await
            .unwrap();
        assert_eq!(
            registry.remaining_seconds(&user, lesson, now).await.unwrap(),
            2
        );

        let later = now + Duration::seconds(10);
        assert_eq!(
            registry
                .remaining_seconds(&user, lesson, later)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn relock_overwrites_instead_of_stacking() {
        let registry = registry();
        let user = user();
        let lesson = LessonId::new(1);
        let now = fixed_now();

        registry.lock_default(&user, lesson, now).await.unwrap();
        let later = now + Duration::hours(1);
        let until = registry.lock_default(&user, lesson, later).await.unwrap();

        // second lock replaces the first; expiry is 24h from the later call
        assert_eq!(until, later + Duration::seconds(LOCKOUT_DURATION_SECS));
        assert_eq!(
            registry.locked_until(&user, lesson).await.unwrap(),
            Some(until)
        );
    }

    #[tokio::test]
    async fn locks_are_scoped_per_user_and_lesson() {
        let registry = registry();
        let alice = UserId::new("alice").unwrap();
        let bob = UserId::new("bob").unwrap();
        let now = fixed_now();

        registry.lock_default(&alice, LessonId::new(1), now).await.unwrap();

        assert!(!registry.is_locked(&bob, LessonId::new(1), now).await.unwrap());
        assert!(!registry.is_locked(&alice, LessonId::new(2), now).await.unwrap());
    }
}
