use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::super::domain::{
    AccountId, EmployerId, Job, JobId, JobStatus, LanguageCode, Location, TradeType, Worker,
    WorkerId,
};
use super::{RecordKind, RejectedRecord};

/// Loosely-typed job document as stored by the job posting service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub job_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub employer_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub job_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub village: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub district: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub daily_wage_offered: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub contact_number: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub created_at: Option<String>,
}

/// Loosely-typed worker profile document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub worker_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub district: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub job_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub expected_daily_wage: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` has invalid value '{value}'")]
    InvalidField { field: &'static str, value: String },
}

impl JobRow {
    pub fn validate(self) -> Result<Job, RecordError> {
        let id = required(self.job_id, "job_id")?;
        let trade = required(self.job_type, "job_type")?;
        let status = match self.status {
            Some(raw) => JobStatus::parse(&raw).ok_or(RecordError::InvalidField {
                field: "status",
                value: raw,
            })?,
            None => JobStatus::Active,
        };

        Ok(Job {
            id: JobId(id),
            employer_id: EmployerId(required(self.employer_id, "employer_id")?),
            title: self.title.unwrap_or_else(|| trade.clone()),
            trade: TradeType(trade),
            village: self.village.unwrap_or_default(),
            location: Location::new(
                required(self.district, "district")?,
                required(self.state, "state")?,
            ),
            daily_wage: wage(self.daily_wage_offered, "daily_wage_offered")?,
            contact_number: self.contact_number.unwrap_or_default(),
            status,
            created_at: timestamp(self.created_at)?,
        })
    }

    pub(crate) fn reject(&self, position: usize, error: RecordError) -> RejectedRecord {
        RejectedRecord {
            kind: RecordKind::Job,
            reference: reference(self.job_id.as_deref(), position),
            error,
        }
    }
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            job_id: Some(job.id.0.clone()),
            employer_id: Some(job.employer_id.0.clone()),
            title: Some(job.title.clone()),
            job_type: Some(job.trade.0.clone()),
            village: Some(job.village.clone()).filter(|value| !value.is_empty()),
            district: Some(job.location.district.clone()),
            state: Some(job.location.state.clone()),
            daily_wage_offered: Some(job.daily_wage.to_string()),
            contact_number: Some(job.contact_number.clone()).filter(|value| !value.is_empty()),
            status: Some(job.status.label().to_string()),
            created_at: Some(job.created_at.to_rfc3339()),
        }
    }
}

impl WorkerRow {
    pub fn validate(self) -> Result<Worker, RecordError> {
        self.validate_with(&LanguageCode::default())
    }

    /// Validates the row, giving a worker with no language preference `default_language`.
    pub fn validate_with(self, default_language: &LanguageCode) -> Result<Worker, RecordError> {
        Ok(Worker {
            id: WorkerId(required(self.worker_id, "worker_id")?),
            account_id: AccountId(required(self.user_id, "user_id")?),
            name: required(self.name, "name")?,
            phone_number: self.phone_number.unwrap_or_default(),
            location: Location::new(
                required(self.district, "district")?,
                required(self.state, "state")?,
            ),
            trade: TradeType(required(self.job_type, "job_type")?),
            expected_daily_wage: wage(self.expected_daily_wage, "expected_daily_wage")?,
            language: self
                .language
                .map(|code| LanguageCode::new(&code))
                .unwrap_or_else(|| default_language.clone()),
            created_at: timestamp(self.created_at)?,
        })
    }

    pub(crate) fn reject(&self, position: usize, error: RecordError) -> RejectedRecord {
        RejectedRecord {
            kind: RecordKind::Worker,
            reference: reference(self.worker_id.as_deref(), position),
            error,
        }
    }
}

impl From<&Worker> for WorkerRow {
    fn from(worker: &Worker) -> Self {
        Self {
            worker_id: Some(worker.id.0.clone()),
            user_id: Some(worker.account_id.0.clone()),
            name: Some(worker.name.clone()),
            phone_number: Some(worker.phone_number.clone()).filter(|value| !value.is_empty()),
            district: Some(worker.location.district.clone()),
            state: Some(worker.location.state.clone()),
            job_type: Some(worker.trade.0.clone()),
            expected_daily_wage: Some(worker.expected_daily_wage.to_string()),
            language: Some(worker.language.as_str().to_string()),
            created_at: Some(worker.created_at.to_rfc3339()),
        }
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, RecordError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(RecordError::MissingField(field))
}

fn wage(value: Option<String>, field: &'static str) -> Result<u32, RecordError> {
    let raw = required(value, field)?;
    raw.parse::<u32>()
        .map_err(|_| RecordError::InvalidField { field, value: raw })
}

fn timestamp(value: Option<String>) -> Result<DateTime<Utc>, RecordError> {
    let Some(raw) = value.map(|value| value.trim().to_string()) else {
        return Ok(Utc::now());
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or(RecordError::InvalidField {
            field: "created_at",
            value: raw,
        })
}

fn reference(id: Option<&str>, position: usize) -> String {
    match id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => format!("row {}", position + 1),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Validates rows in order, splitting them into accepted entities and rejections.
pub(crate) fn partition<R, T>(
    rows: impl IntoIterator<Item = R>,
    validate: impl Fn(R) -> Result<T, RejectedRecord>,
) -> (Vec<T>, Vec<RejectedRecord>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for row in rows {
        match validate(row) {
            Ok(entity) => accepted.push(entity),
            Err(rejection) => rejected.push(rejection),
        }
    }
    (accepted, rejected)
}
