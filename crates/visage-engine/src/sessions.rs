//! Concurrent registry of live enrollment sessions.

use dashmap::DashMap;
use visage_core::{EnrollmentSession, FaceSample, SessionId};

/// Registry mapping session ids to per-connection enrollment state.
///
/// Each entry is owned by exactly one connection. DashMap shards give
/// per-key locking: operations on different sessions never contend, and
/// two appends to the same session are serialized by the entry lock.
/// Every accessor treats an absent id as a silent no-op because events
/// can race connection teardown.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, EnrollmentSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Insert a fresh session. Returns `false` (leaving the existing
    /// entry untouched) if the id is already registered — transports can
    /// replay connect events, and clobbering a live run would lose
    /// samples.
    pub fn create(&self, id: SessionId) -> bool {
        let mut created = false;
        let _ = self.sessions.entry(id.clone()).or_insert_with(|| {
            created = true;
            EnrollmentSession::new(id)
        });
        created
    }

    /// Remove a session. Idempotent.
    pub fn remove(&self, id: &SessionId) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Append a sample to a session's run. Returns the run length after
    /// the append, or `None` if the session is gone.
    pub fn append_sample(&self, id: &SessionId, sample: FaceSample) -> Option<usize> {
        self.sessions.get_mut(id).map(|mut entry| {
            entry.push(sample);
            entry.sample_count()
        })
    }

    /// Current run length, or `None` if the session is gone.
    pub fn sample_count(&self, id: &SessionId) -> Option<usize> {
        self.sessions.get(id).map(|entry| entry.sample_count())
    }

    /// Copy out the session's current run (capture order preserved).
    pub fn snapshot(&self, id: &SessionId) -> Option<Vec<FaceSample>> {
        self.sessions.get(id).map(|entry| entry.snapshot())
    }

    /// Atomically empty a session's run without removing the session.
    /// Returns `false` if the session is gone.
    pub fn clear(&self, id: &SessionId) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                entry.clear();
                true
            }
            None => false,
        }
    }
}
