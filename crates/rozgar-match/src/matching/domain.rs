use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

identifier!(
    /// Identifier of a job posting owned by the job registry.
    JobId
);
identifier!(
    /// Identifier of a worker profile owned by the worker registry.
    WorkerId
);
identifier!(
    /// Account that posted a job.
    EmployerId
);
identifier!(
    /// Account that owns a worker profile.
    AccountId
);
identifier!(MatchId);
identifier!(NotificationId);

impl MatchId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl NotificationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Coarse administrative location. Comparison is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub district: String,
    pub state: String,
}

impl Location {
    pub fn new(district: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            district: district.into(),
            state: state.into(),
        }
    }

    pub fn same_district(&self, other: &Location) -> bool {
        same_region(&self.district, &other.district)
    }

    pub fn same_state(&self, other: &Location) -> bool {
        same_region(&self.state, &other.state)
    }

    /// Lowercased district, used as a bucket key by the indexed candidate strategy.
    pub(crate) fn district_key(&self) -> String {
        self.district.trim().to_lowercase()
    }

    pub(crate) fn state_key(&self) -> String {
        self.state.trim().to_lowercase()
    }
}

fn same_region(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

/// Trade a job asks for or a worker offers (e.g. `Mason`, `Plumber`). Compared exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeType(pub String);

impl TradeType {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ISO-639-1 style language code, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageCode {
    /// Hindi, the language profiles are created with when none is chosen.
    fn default() -> Self {
        Self("hi".to_string())
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Active,
    Closed,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Active => "active",
            JobStatus::Closed => "closed",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Job posting as read from the job registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub employer_id: EmployerId,
    pub title: String,
    pub trade: TradeType,
    pub village: String,
    pub location: Location,
    pub daily_wage: u32,
    pub contact_number: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn is_active(&self) -> bool {
        self.status == JobStatus::Active
    }
}

/// Worker profile as read from the worker registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub account_id: AccountId,
    pub name: String,
    pub phone_number: String,
    pub location: Location,
    pub trade: TradeType,
    pub expected_daily_wage: u32,
    pub language: LanguageCode,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
}

impl MatchStatus {
    pub const fn label(self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
        }
    }
}

/// Persisted pairing of a job and a worker. At most one exists per pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub job_id: JobId,
    pub worker_id: WorkerId,
    pub score: f64,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}

impl MatchRecord {
    pub fn pending(job_id: JobId, worker_id: WorkerId, score: f64) -> Self {
        Self {
            id: MatchId::generate(),
            job_id,
            worker_id,
            score,
            status: MatchStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn pair_key(&self) -> PairKey {
        PairKey::new(&self.job_id, &self.worker_id)
    }
}

/// Uniqueness key of the match store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub job_id: JobId,
    pub worker_id: WorkerId,
}

impl PairKey {
    pub fn new(job_id: &JobId, worker_id: &WorkerId) -> Self {
        Self {
            job_id: job_id.clone(),
            worker_id: worker_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Sms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    MockSent,
}

impl DeliveryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DeliveryStatus::MockSent => "mock_sent",
        }
    }
}

/// Rendered, persisted notice that a worker was matched to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub worker_id: WorkerId,
    pub job_id: JobId,
    pub channel: NotificationChannel,
    pub message: String,
    pub language: LanguageCode,
    pub phone_number: String,
    pub status: DeliveryStatus,
    pub sent_at: DateTime<Utc>,
}
