//! Key-partitioned lock table.
//!
//! One async mutex per key, created on demand and dropped from the table when
//! its last holder releases. Keys are `team:<id>` and `pair:<a>|<b>` with the
//! pair in canonical order.
//!
//! Ordering rule: the pair section first, then team sections in ascending id
//! order. [`KeyedLocks::acquire`] is the only multi-key entry point and
//! enforces it. A caller that must read under the pair section before it
//! knows its teams takes the pair alone, then the teams with a second
//! `acquire(None, ..)`. Sections are taken before a transaction begins and
//! never while one is open.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Table = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Key for the section covering both directions between two actors.
#[must_use]
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("pair:{a}|{b}")
    } else {
        format!("pair:{b}|{a}")
    }
}

#[must_use]
pub fn team_key(team_id: &str) -> String {
    format!("team:{team_id}")
}

#[derive(Clone, Default)]
pub struct KeyedLocks {
    table: Table,
}

impl KeyedLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a single section.
    pub async fn lock(&self, key: String) -> SectionGuard {
        let mutex = self.table.entry(key.clone()).or_default().clone();
        let guard = mutex.lock_owned().await;
        SectionGuard {
            key,
            table: Arc::clone(&self.table),
            guard: Some(guard),
        }
    }

    /// Take the pair section (if any), then each team section in ascending
    /// id order. Duplicate team ids are taken once.
    pub async fn acquire<S: AsRef<str>>(&self, pair: Option<(&str, &str)>, teams: &[S]) -> Sections {
        let mut guards = Vec::with_capacity(teams.len() + 1);
        if let Some((a, b)) = pair {
            guards.push(self.lock(pair_key(a, b)).await);
        }

        let mut team_ids: Vec<&str> = teams.iter().map(AsRef::as_ref).collect();
        team_ids.sort_unstable();
        team_ids.dedup();
        for team_id in team_ids {
            guards.push(self.lock(team_key(team_id)).await);
        }

        Sections { guards }
    }

    /// Live entries; zero once every section is released.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Held section. Dropping it releases the mutex and prunes the entry when no
/// other task holds or waits on it.
pub struct SectionGuard {
    key: String,
    table: Table,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SectionGuard {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for SectionGuard {
    fn drop(&mut self) {
        // The guard owns one Arc to the mutex; release it before counting.
        drop(self.guard.take());
        self.table
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// An ordered set of held sections, released together.
pub struct Sections {
    guards: Vec<SectionGuard>,
}

impl Sections {
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.guards.iter().map(SectionGuard::key).collect()
    }
}
