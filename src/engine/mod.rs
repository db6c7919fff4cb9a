//! Job lifecycle and wallet ledger
//!
//! [`JobEngine`] owns the session records (role, flags, profiles, job list)
//! and is the only writer of the employer wallet. Posting a job debits the
//! platform fee and SMS cost; an unconfirmed job can be expired, which credits
//! the platform fee back exactly once.
//!
//! ```text
//! create_contracted_job ──► pending_confirmation ──► confirmed ──► completed
//!                                  │
//!                                  └── refund_job_fee / expire_lapsed ──► expired
//! ```

pub mod error;
pub mod fees;
pub mod models;
pub mod service;

pub use error::{EngineError, Result};
pub use fees::{FeeQuote, FeeSchedule};
pub use models::{
    Badge, EmployerProfile, Job, JobDraft, JobStatus, RefundOutcome, SessionFlags, SessionState,
    SmsPackage, Urgency, UserRole, WorkerProfile,
};
pub use service::{EngineSettings, JobEngine};
