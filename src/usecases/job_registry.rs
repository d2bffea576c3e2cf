//! Process-wide registry enforcing at most one active forward job per owner.
//!
//! `admit` hands out a [`JobLease`]; dropping the lease frees the owner's slot, so the
//! slot is released on every exit path of the job task (including panics and aborts).

use crate::domain::DomainError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

struct Slot {
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Inner {
    slots: Mutex<HashMap<i64, Slot>>,
    next_generation: AtomicU64,
}

/// Cheap to clone; all clones share the same map.
#[derive(Clone, Default)]
pub struct JobRegistry {
    inner: Arc<Inner>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<i64, Slot>> {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve the owner's slot. Fails with `AlreadyRunning` if a job is active.
    pub fn admit(&self, owner: i64) -> Result<JobLease, DomainError> {
        let mut slots = self.slots();
        if slots.contains_key(&owner) {
            return Err(DomainError::AlreadyRunning { owner });
        }
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        slots.insert(
            owner,
            Slot {
                generation,
                cancel: cancel.clone(),
            },
        );
        debug!(owner, generation, "job slot admitted");
        Ok(JobLease {
            registry: self.clone(),
            owner,
            generation,
            cancel,
        })
    }

    /// Flag the owner's job for cancellation. Returns whether a job was found.
    /// Calling it again is harmless.
    pub fn request_cancel(&self, owner: i64) -> bool {
        match self.slots().get(&owner) {
            Some(slot) => {
                slot.cancel.cancel();
                info!(owner, "cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Free the owner's slot unconditionally. A job still holding it is cancelled, so the
    /// owner never ends up with two live jobs.
    pub fn release(&self, owner: i64) {
        if let Some(slot) = self.slots().remove(&owner) {
            slot.cancel.cancel();
            debug!(owner, generation = slot.generation, "job slot released");
        }
    }

    pub fn is_running(&self, owner: i64) -> bool {
        self.slots().contains_key(&owner)
    }

    pub fn active_count(&self) -> usize {
        self.slots().len()
    }

    /// Release only if the slot still belongs to this lease's generation.
    fn release_generation(&self, owner: i64, generation: u64) {
        let mut slots = self.slots();
        if slots.get(&owner).is_some_and(|s| s.generation == generation) {
            slots.remove(&owner);
            debug!(owner, generation, "job slot released");
        }
    }
}

/// Proof of admission. Frees the slot when dropped.
pub struct JobLease {
    registry: JobRegistry,
    owner: i64,
    generation: u64,
    cancel: CancellationToken,
}

impl JobLease {
    /// Token observed by the job at each loop iteration.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Drop for JobLease {
    fn drop(&mut self) {
        self.registry.release_generation(self.owner, self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_admit_is_rejected() {
        let registry = JobRegistry::new();
        let _lease = registry.admit(7).unwrap();
        assert_eq!(
            registry.admit(7).err(),
            Some(DomainError::AlreadyRunning { owner: 7 })
        );
        assert!(registry.admit(8).is_ok());
    }

    #[test]
    fn dropping_lease_frees_slot() {
        let registry = JobRegistry::new();
        let lease = registry.admit(7).unwrap();
        assert!(registry.is_running(7));
        drop(lease);
        assert!(!registry.is_running(7));
        assert!(registry.admit(7).is_ok());
    }

    #[test]
    fn stale_lease_does_not_free_newer_job() {
        let registry = JobRegistry::new();
        let old = registry.admit(7).unwrap();
        registry.release(7);
        let new = registry.admit(7).unwrap();
        drop(old);
        assert!(registry.is_running(7));
        assert!(!new.cancel_token().is_cancelled());
    }

    #[test]
    fn release_cancels_the_evicted_job() {
        let registry = JobRegistry::new();
        let lease = registry.admit(7).unwrap();
        let token = lease.cancel_token();

        registry.release(7);

        assert!(token.is_cancelled());
        assert!(!registry.is_running(7));
        registry.release(7);
    }

    #[test]
    fn cancel_is_idempotent_and_reports_presence() {
        let registry = JobRegistry::new();
        assert!(!registry.request_cancel(7));

        let lease = registry.admit(7).unwrap();
        let token = lease.cancel_token();
        assert!(registry.request_cancel(7));
        assert!(registry.request_cancel(7));
        assert!(token.is_cancelled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_admissions_yield_one_winner() {
        let registry = JobRegistry::new();
        let barrier = Arc::new(tokio::sync::Barrier::new(2));

        let attempt = |registry: JobRegistry, barrier: Arc<tokio::sync::Barrier>| {
            tokio::spawn(async move {
                barrier.wait().await;
                registry.admit(99)
            })
        };
        let a = attempt(registry.clone(), barrier.clone());
        let b = attempt(registry.clone(), barrier);
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        let wins = [&a, &b].iter().filter(|r| r.is_ok()).count();
        let rejected = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(DomainError::AlreadyRunning { owner: 99 })))
            .count();
        assert_eq!((wins, rejected), (1, 1));
        assert_eq!(registry.active_count(), 1);
    }
}
