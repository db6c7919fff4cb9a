//! Session records owned by the job engine.
//!
//! Records serialize with camelCase field names; this is the JSON shape stored
//! under the record keys in [`crate::store::keys`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which side of the marketplace the device user is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Worker,
    Employer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Worker => "worker",
            UserRole::Employer => "employer",
        }
    }

    /// Stored roles other than the two known ones read back as absent
    pub fn parse_stored(raw: &str) -> Option<Self> {
        match raw {
            "worker" => Some(UserRole::Worker),
            "employer" => Some(UserRole::Employer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub name: String,
    pub age: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_skill: Option<String>,
    pub experience: String,
    pub job_type: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_document: Option<String>,
    pub phone: String,
    pub verified: bool,
    pub rating: f32,
    pub badge: Badge,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerProfile {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nid_document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_license: Option<String>,
    #[serde(default)]
    pub verified: bool,
    /// Balance the platform fee and SMS cost are deducted from
    #[serde(default)]
    pub wallet: Decimal,
    #[serde(default)]
    pub sms_credits: u32,
    pub created_at: DateTime<Utc>,
}

/// Job status state machine:
///
/// ```text
/// pending_confirmation -> confirmed -> completed
/// pending_confirmation -> expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    PendingConfirmation,
    Confirmed,
    Completed,
    Expired,
}

impl JobStatus {
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::PendingConfirmation => "pending_confirmation",
            JobStatus::Confirmed => "confirmed",
            JobStatus::Completed => "completed",
            JobStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Expired)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::PendingConfirmation, JobStatus::Confirmed)
                | (JobStatus::PendingConfirmation, JobStatus::Expired)
                | (JobStatus::Confirmed, JobStatus::Completed)
        )
    }

    /// Targets reachable only through their own engine operation
    /// (confirmation carries a worker, expiry carries a refund).
    pub fn has_dedicated_operation(&self) -> bool {
        matches!(self, JobStatus::Confirmed | JobStatus::Expired)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_confirmation" => Ok(JobStatus::PendingConfirmation),
            "confirmed" => Ok(JobStatus::Confirmed),
            "completed" => Ok(JobStatus::Completed),
            "expired" => Ok(JobStatus::Expired),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub employer_id: String,
    pub job_type: String,
    pub location: String,
    pub number_of_workers: u32,
    pub urgency: Urgency,
    pub payment_amount: Decimal,
    /// Frozen at creation
    pub platform_fee: Decimal,
    /// Frozen at creation; never refunded
    pub sms_cost: Decimal,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_worker_id: Option<String>,
    pub selected_candidates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refunded_amount: Option<Decimal>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Amount debited from the wallet when the job was posted
    pub fn total_charged(&self) -> Decimal {
        self.platform_fee + self.sms_cost
    }

    /// Debit minus any refund issued for this job
    pub fn net_charged(&self) -> Decimal {
        self.total_charged() - self.refunded_amount.unwrap_or(Decimal::ZERO)
    }

    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::PendingConfirmation && self.expires_at <= now
    }
}

/// Caller-side description of a job to post
///
/// `platform_fee` and `sms_cost` may carry whatever the caller displayed; the
/// engine ignores them and recomputes both from `payment_amount` and the
/// candidate list.
#[derive(Debug, Clone, bon::Builder)]
pub struct JobDraft {
    #[builder(into)]
    pub job_type: String,
    #[builder(into)]
    pub location: String,
    #[builder(default = 1)]
    pub number_of_workers: u32,
    #[builder(default)]
    pub urgency: Urgency,
    pub payment_amount: Decimal,
    #[builder(default)]
    pub selected_candidates: Vec<String>,
    #[builder(into)]
    pub employer_id: Option<String>,
    pub platform_fee: Option<Decimal>,
    pub sms_cost: Option<Decimal>,
}

/// Prepaid SMS packages. Payment itself is settled outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmsPackage {
    #[serde(alias = "oneTime")]
    OneTime,
    Monthly,
    Emergency,
}

impl SmsPackage {
    pub fn price(&self) -> Decimal {
        match self {
            SmsPackage::OneTime => Decimal::from(50),
            SmsPackage::Monthly => Decimal::from(500),
            SmsPackage::Emergency => Decimal::from(100),
        }
    }

    pub fn credits(&self) -> u32 {
        match self {
            SmsPackage::OneTime => 5,
            SmsPackage::Monthly => 50,
            SmsPackage::Emergency => 10,
        }
    }
}

/// Everything the engine keeps for one device session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub user_role: Option<UserRole>,
    pub is_first_launch: bool,
    pub has_completed_onboarding: bool,
    pub worker_profile: Option<WorkerProfile>,
    pub employer_profile: Option<EmployerProfile>,
    pub jobs: Vec<Job>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user_role: None,
            is_first_launch: true,
            has_completed_onboarding: false,
            worker_profile: None,
            employer_profile: None,
            jobs: Vec::new(),
        }
    }
}

/// Partial update of the session flags, applied as one commit
///
/// `None` leaves a field untouched; `user_role: Some(None)` clears the role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionFlags {
    pub user_role: Option<Option<UserRole>>,
    pub is_first_launch: Option<bool>,
    pub has_completed_onboarding: Option<bool>,
}

impl SessionFlags {
    pub fn is_empty(&self) -> bool {
        self.user_role.is_none()
            && self.is_first_launch.is_none()
            && self.has_completed_onboarding.is_none()
    }
}

impl SessionState {
    pub fn job_index(&self, job_id: &str) -> Option<usize> {
        self.jobs.iter().position(|job| job.id == job_id)
    }
}

/// Result of a refund request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefundOutcome {
    Refunded { amount: Decimal },
    /// The job was already expired; nothing was credited
    AlreadyRefunded,
}
