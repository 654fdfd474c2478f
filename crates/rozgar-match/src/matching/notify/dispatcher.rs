use std::sync::Arc;

use chrono::Utc;

use super::super::domain::{
    DeliveryStatus, Job, Notification, NotificationChannel, NotificationId, Worker,
};
use super::super::scoring::CompatibilityScore;
use super::super::store::{NotificationStore, StoreError};
use super::template::NotificationFields;
use super::{LocalizationError, Localizer, JOB_MATCH_TEMPLATE};

/// Renders the job-match notice in the worker's language and records it as sent.
pub struct NotificationDispatcher<N> {
    store: Arc<N>,
    localizer: Localizer,
}

impl<N> NotificationDispatcher<N>
where
    N: NotificationStore + 'static,
{
    pub fn new(store: Arc<N>, localizer: Localizer) -> Self {
        Self { store, localizer }
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    pub fn store(&self) -> &Arc<N> {
        &self.store
    }

    /// Writes exactly one notification. Nothing is retried.
    pub fn dispatch(
        &self,
        worker: &Worker,
        job: &Job,
        score: &CompatibilityScore,
    ) -> Result<Notification, NotificationError> {
        let fields = NotificationFields {
            worker_name: worker.name.clone(),
            job_title: job.title.clone(),
            village: job.village.clone(),
            district: job.location.district.clone(),
            wage: job.daily_wage,
            contact: job.contact_number.clone(),
            score: score.percent(),
        };

        let rendered = self
            .localizer
            .render(JOB_MATCH_TEMPLATE, &worker.language, &fields)?;

        let notification = Notification {
            id: NotificationId::generate(),
            worker_id: worker.id.clone(),
            job_id: job.id.clone(),
            channel: NotificationChannel::Sms,
            message: rendered.text,
            language: rendered.language,
            phone_number: worker.phone_number.clone(),
            status: DeliveryStatus::MockSent,
            sent_at: Utc::now(),
        };

        self.store.insert(notification.clone())?;
        Ok(notification)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error(transparent)]
    Render(#[from] LocalizationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
