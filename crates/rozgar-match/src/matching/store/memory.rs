use std::sync::{Arc, Mutex};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::super::domain::{
    JobId, MatchId, MatchRecord, Notification, NotificationId, PairKey, WorkerId,
};
use super::{by_score_desc, newest_first, MatchStore, NotificationStore, StoreError};

/// Match store keyed by pair. Insertion goes through the map's entry API, which holds the
/// shard lock across the existence check and the write.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMatchStore {
    by_pair: Arc<DashMap<PairKey, MatchRecord>>,
}

impl InMemoryMatchStore {
    pub fn len(&self) -> usize {
        self.by_pair.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }

    pub(crate) fn from_records(records: impl IntoIterator<Item = MatchRecord>) -> Self {
        let store = Self::default();
        for record in records {
            store.by_pair.entry(record.pair_key()).or_insert(record);
        }
        store
    }

    /// Runs `persist` only if the pair is still vacant, then records the match.
    pub(crate) fn insert_with<F>(
        &self,
        record: MatchRecord,
        persist: F,
    ) -> Result<MatchId, StoreError>
    where
        F: FnOnce(&MatchRecord) -> Result<(), StoreError>,
    {
        match self.by_pair.entry(record.pair_key()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey {
                job_id: record.job_id,
                worker_id: record.worker_id,
            }),
            Entry::Vacant(slot) => {
                persist(&record)?;
                let id = record.id.clone();
                slot.insert(record);
                Ok(id)
            }
        }
    }

    fn collect<P>(&self, predicate: P) -> Vec<MatchRecord>
    where
        P: Fn(&MatchRecord) -> bool,
    {
        let mut records: Vec<MatchRecord> = self
            .by_pair
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(by_score_desc);
        records
    }
}

impl MatchStore for InMemoryMatchStore {
    fn exists(&self, job_id: &JobId, worker_id: &WorkerId) -> Result<bool, StoreError> {
        Ok(self.by_pair.contains_key(&PairKey::new(job_id, worker_id)))
    }

    fn insert(&self, record: MatchRecord) -> Result<MatchId, StoreError> {
        self.insert_with(record, |_| Ok(()))
    }

    fn for_worker(&self, worker_id: &WorkerId) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(self.collect(|record| &record.worker_id == worker_id))
    }

    fn for_job(&self, job_id: &JobId) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(self.collect(|record| &record.job_id == job_id))
    }

    fn all(&self) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(self.collect(|_| true))
    }

    fn count_for_job(&self, job_id: &JobId) -> Result<usize, StoreError> {
        Ok(self
            .by_pair
            .iter()
            .filter(|entry| &entry.key().job_id == job_id)
            .count())
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryNotificationStore {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryNotificationStore {
    pub fn all(&self) -> Vec<Notification> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub(crate) fn from_records(records: Vec<Notification>) -> Self {
        Self {
            events: Arc::new(Mutex::new(records)),
        }
    }
}

impl NotificationStore for InMemoryNotificationStore {
    fn insert(&self, notification: Notification) -> Result<NotificationId, StoreError> {
        let id = notification.id.clone();
        self.events
            .lock()
            .map_err(|_| StoreError::Unavailable("notification mutex poisoned".to_string()))?
            .push(notification);
        Ok(id)
    }

    fn for_worker(&self, worker_id: &WorkerId) -> Result<Vec<Notification>, StoreError> {
        let mut notifications: Vec<Notification> = self
            .events
            .lock()
            .map_err(|_| StoreError::Unavailable("notification mutex poisoned".to_string()))?
            .iter()
            .filter(|notification| &notification.worker_id == worker_id)
            .cloned()
            .collect();
        notifications.sort_by(newest_first);
        Ok(notifications)
    }
}
