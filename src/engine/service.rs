use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::error::{EngineError, Result};
use super::fees::{self, FeeSchedule};
use super::models::{
    EmployerProfile, Job, JobDraft, JobStatus, RefundOutcome, SessionFlags, SessionState,
    SmsPackage, UserRole, WorkerProfile,
};
use crate::config::LedgerConfig;
use crate::notify::{JobNotice, NotificationDispatcher};
use crate::observability::Metrics;
use crate::store::{self, KeyValueStore, StoreError, WriteBatch, keys};

type SessionGuard = OwnedMutexGuard<SessionState>;

/// Tunables the engine is constructed with
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub fees: FeeSchedule,
    pub max_selected_candidates: usize,
    pub job_ttl: TimeDelta,
    pub write_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for EngineSettings {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            fees: FeeSchedule::from(config),
            max_selected_candidates: config.max_selected_candidates,
            job_ttl: TimeDelta::from_std(config.job_ttl.as_duration()).unwrap_or(TimeDelta::MAX),
            write_timeout: config.write_timeout.as_duration(),
        }
    }
}

/// Job lifecycle and wallet ledger for one device session
///
/// Owns the employer wallet, SMS credits and job list. Every mutation runs
/// inside one async mutex (the per-employer critical section), works on a
/// copy of the session, commits the copy to the store as a single batch, and
/// only then replaces the in-memory session. A failed commit leaves memory
/// exactly as it was.
///
/// A commit that outlives `write_timeout` is reported as failed right away,
/// but the critical section stays locked until the store answers. If the late
/// commit landed after all, the pre-operation session is written back before
/// the next operation may run.
pub struct JobEngine {
    store: Arc<dyn KeyValueStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    settings: EngineSettings,
    metrics: Arc<Metrics>,
    state: Arc<Mutex<SessionState>>,
}

impl JobEngine {
    /// Load the session from `store`
    pub async fn open(
        store: Arc<dyn KeyValueStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        settings: EngineSettings,
    ) -> Result<Self> {
        let state = load_session(store.as_ref()).await?;

        info!(
            employer = state.employer_profile.as_ref().map(|p| p.id.as_str()),
            jobs = state.jobs.len(),
            "Session loaded"
        );

        Ok(Self {
            store,
            dispatcher,
            settings,
            metrics: Arc::new(Metrics::new()),
            state: Arc::new(Mutex::new(state)),
        })
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub async fn health_check(&self) -> Result<()> {
        Ok(self.store.health_check().await?)
    }

    // ---- views ----

    pub async fn session(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn employer_profile(&self) -> Option<EmployerProfile> {
        self.state.lock().await.employer_profile.clone()
    }

    pub async fn worker_profile(&self) -> Option<WorkerProfile> {
        self.state.lock().await.worker_profile.clone()
    }

    pub async fn wallet(&self) -> Result<Decimal> {
        self.state
            .lock()
            .await
            .employer_profile
            .as_ref()
            .map(|profile| profile.wallet)
            .ok_or(EngineError::NoEmployerProfile)
    }

    pub async fn jobs(&self) -> Vec<Job> {
        self.state.lock().await.jobs.clone()
    }

    pub async fn job(&self, job_id: &str) -> Option<Job> {
        let state = self.state.lock().await;
        state.job_index(job_id).map(|idx| state.jobs[idx].clone())
    }

    // ---- job lifecycle ----

    /// Post a job: charge platform fee + SMS cost and record it as pending
    pub async fn create_contracted_job(&self, draft: JobDraft) -> Result<Job> {
        let payment_amount = fees::validate_payment(draft.payment_amount)?;
        let candidates = dedupe_candidates(draft.selected_candidates);
        if candidates.len() > self.settings.max_selected_candidates {
            return Err(EngineError::TooManyCandidates {
                count: candidates.len(),
                limit: self.settings.max_selected_candidates,
            });
        }

        let state = self.lock_session().await;

        let profile = state
            .employer_profile
            .as_ref()
            .ok_or(EngineError::NoEmployerProfile)?;

        if let Some(draft_employer) = draft.employer_id {
            if draft_employer != profile.id {
                return Err(EngineError::EmployerMismatch {
                    draft: draft_employer,
                    session: profile.id.clone(),
                });
            }
        }

        let quote = self.settings.fees.quote(payment_amount, candidates.len())?;
        if draft.platform_fee.is_some_and(|fee| fee != quote.platform_fee)
            || draft.sms_cost.is_some_and(|cost| cost != quote.sms_cost)
        {
            debug!(
                supplied_fee = ?draft.platform_fee,
                supplied_sms = ?draft.sms_cost,
                platform_fee = %quote.platform_fee,
                sms_cost = %quote.sms_cost,
                "Ignoring caller-supplied fees"
            );
        }

        let total = quote.total();
        if profile.wallet < total {
            self.metrics.job_rejected();
            warn!(
                employer_id = %profile.id,
                wallet = %profile.wallet,
                required = %total,
                "Insufficient wallet balance"
            );
            return Err(EngineError::InsufficientBalance {
                required: total,
                available: profile.wallet,
            });
        }

        let now = Utc::now();
        let job = Job {
            id: Uuid::now_v7().to_string(),
            employer_id: profile.id.clone(),
            job_type: draft.job_type,
            location: draft.location,
            number_of_workers: draft.number_of_workers,
            urgency: draft.urgency,
            payment_amount,
            platform_fee: quote.platform_fee,
            sms_cost: quote.sms_cost,
            status: JobStatus::PendingConfirmation,
            confirmed_worker_id: None,
            selected_candidates: candidates,
            refunded_amount: None,
            expires_at: now.checked_add_signed(self.settings.job_ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            created_at: now,
        };

        let mut next = state.clone();
        if let Some(profile) = next.employer_profile.as_mut() {
            profile.wallet -= total;
        }
        next.jobs.push(job.clone());

        let batch = ledger_batch(&next)?;
        let mut state = self.persist(state, batch).await?;
        *state = next;
        drop(state);

        self.metrics.job_created();
        info!(
            job_id = %job.id,
            employer_id = %job.employer_id,
            platform_fee = %job.platform_fee,
            sms_cost = %job.sms_cost,
            "Job created"
        );

        self.hand_off(&job).await;
        Ok(job)
    }

    /// Record that `worker_id` accepted the job
    pub async fn confirm_job_acceptance(&self, job_id: &str, worker_id: &str) -> Result<Job> {
        let state = self.lock_session().await;
        let idx = find_job(&state, job_id)?;
        ensure_transition(&state.jobs[idx], JobStatus::Confirmed)?;

        let mut next = state.clone();
        let job = &mut next.jobs[idx];
        job.status = JobStatus::Confirmed;
        job.confirmed_worker_id = Some(worker_id.to_string());
        let confirmed = job.clone();

        let batch = ledger_batch(&next)?;
        let mut state = self.persist(state, batch).await?;
        *state = next;

        info!(job_id, worker_id, "Job confirmed");
        Ok(confirmed)
    }

    /// Return the platform fee of an unconfirmed job and expire it
    ///
    /// The SMS cost stays charged. Repeating the call on an expired job is a
    /// no-op reported as [`RefundOutcome::AlreadyRefunded`].
    pub async fn refund_job_fee(&self, job_id: &str) -> Result<RefundOutcome> {
        let state = self.lock_session().await;
        let idx = find_job(&state, job_id)?;

        if state.jobs[idx].status == JobStatus::Expired {
            debug!(job_id, "Refund skipped, job already expired");
            return Ok(RefundOutcome::AlreadyRefunded);
        }
        ensure_transition(&state.jobs[idx], JobStatus::Expired)?;

        let mut next = state.clone();
        let amount = apply_refund(&mut next, idx)?;

        let batch = ledger_batch(&next)?;
        let mut state = self.persist(state, batch).await?;
        *state = next;

        self.metrics.refund_issued();
        info!(job_id, amount = %amount, "Platform fee refunded");
        Ok(RefundOutcome::Refunded { amount })
    }

    /// Generic status setter for transitions without a dedicated operation
    ///
    /// Only `confirmed -> completed` qualifies; confirmation and expiry go
    /// through [`Self::confirm_job_acceptance`] and [`Self::refund_job_fee`].
    pub async fn update_job_status(&self, job_id: &str, new_status: JobStatus) -> Result<Job> {
        let state = self.lock_session().await;
        let idx = find_job(&state, job_id)?;
        let current = state.jobs[idx].status;

        if new_status.has_dedicated_operation() {
            return Err(EngineError::InvalidTransition {
                job_id: job_id.to_string(),
                from: current,
                to: new_status,
            });
        }
        ensure_transition(&state.jobs[idx], new_status)?;

        let mut next = state.clone();
        next.jobs[idx].status = new_status;
        let updated = next.jobs[idx].clone();

        let batch = ledger_batch(&next)?;
        let mut state = self.persist(state, batch).await?;
        *state = next;

        info!(job_id, from = %current, to = %new_status, "Job status updated");
        Ok(updated)
    }

    pub async fn complete_job(&self, job_id: &str) -> Result<Job> {
        self.update_job_status(job_id, JobStatus::Completed).await
    }

    /// Refund every pending job whose confirmation window closed at or before `now`
    ///
    /// All refunds land in one commit. Returns the ids of the refunded jobs.
    pub async fn expire_lapsed(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let state = self.lock_session().await;

        let lapsed: Vec<usize> = state
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| job.is_lapsed(now))
            .map(|(idx, _)| idx)
            .collect();

        if lapsed.is_empty() {
            return Ok(Vec::new());
        }

        let mut next = state.clone();
        let mut total = Decimal::ZERO;
        for &idx in &lapsed {
            total += apply_refund(&mut next, idx)?;
        }

        let batch = ledger_batch(&next)?;
        let mut state = self.persist(state, batch).await?;
        let refunded: Vec<String> = lapsed.iter().map(|&idx| next.jobs[idx].id.clone()).collect();
        *state = next;

        for _ in &refunded {
            self.metrics.refund_issued();
        }
        info!(count = refunded.len(), total = %total, "Lapsed jobs refunded");
        Ok(refunded)
    }

    // ---- profiles and flags ----

    /// Install the profile produced by registration
    pub async fn register_employer(&self, profile: EmployerProfile) -> Result<EmployerProfile> {
        if profile.wallet < Decimal::ZERO {
            return Err(EngineError::InvalidAmount(format!(
                "opening wallet must not be negative, got {}",
                profile.wallet
            )));
        }

        let state = self.lock_session().await;
        if let Some(existing) = &state.employer_profile {
            return Err(EngineError::EmployerAlreadyRegistered(existing.id.clone()));
        }

        let mut next = state.clone();
        next.employer_profile = Some(profile.clone());

        let batch = ledger_batch(&next)?;
        let mut state = self.persist(state, batch).await?;
        *state = next;

        info!(employer_id = %profile.id, wallet = %profile.wallet, "Employer registered");
        Ok(profile)
    }

    /// Add the credits of a prepaid SMS package; the wallet is not touched
    pub async fn purchase_package(&self, package: SmsPackage) -> Result<EmployerProfile> {
        let state = self.lock_session().await;
        if state.employer_profile.is_none() {
            return Err(EngineError::NoEmployerProfile);
        }

        let mut next = state.clone();
        let mut updated = None;
        if let Some(profile) = next.employer_profile.as_mut() {
            profile.sms_credits = profile.sms_credits.saturating_add(package.credits());
            updated = Some(profile.clone());
        }

        let batch = ledger_batch(&next)?;
        let mut state = self.persist(state, batch).await?;
        *state = next;

        let profile = updated.ok_or(EngineError::NoEmployerProfile)?;
        info!(
            employer_id = %profile.id,
            package = ?package,
            sms_credits = profile.sms_credits,
            "SMS package activated"
        );
        Ok(profile)
    }

    /// Store or clear the worker profile
    pub async fn set_worker_profile(&self, profile: Option<WorkerProfile>) -> Result<()> {
        let state = self.lock_session().await;
        let mut batch = WriteBatch::new();
        match &profile {
            Some(profile) => batch.set(keys::WORKER_PROFILE, encode(profile)?),
            None => batch.remove(keys::WORKER_PROFILE),
        };

        let mut state = self.persist(state, batch).await?;
        state.worker_profile = profile;
        Ok(())
    }

    /// Apply every flag present in `flags` in one commit
    pub async fn update_session(&self, flags: SessionFlags) -> Result<SessionState> {
        let state = self.lock_session().await;
        if flags.is_empty() {
            return Ok(state.clone());
        }

        let mut batch = WriteBatch::new();
        match flags.user_role {
            Some(Some(role)) => {
                batch.set(keys::USER_ROLE, role.as_str());
            }
            Some(None) => {
                batch.remove(keys::USER_ROLE);
            }
            None => {}
        }
        if let Some(value) = flags.is_first_launch {
            batch.set(keys::FIRST_LAUNCH, keys::encode_flag(value));
        }
        if let Some(value) = flags.has_completed_onboarding {
            batch.set(keys::ONBOARDING, keys::encode_flag(value));
        }

        let mut state = self.persist(state, batch).await?;
        if let Some(role) = flags.user_role {
            state.user_role = role;
        }
        if let Some(value) = flags.is_first_launch {
            state.is_first_launch = value;
        }
        if let Some(value) = flags.has_completed_onboarding {
            state.has_completed_onboarding = value;
        }

        debug!(?flags, "Session flags updated");
        Ok(state.clone())
    }

    pub async fn set_user_role(&self, role: Option<UserRole>) -> Result<()> {
        self.update_session(SessionFlags {
            user_role: Some(role),
            ..SessionFlags::default()
        })
        .await
        .map(drop)
    }

    pub async fn set_first_launch(&self, value: bool) -> Result<()> {
        self.update_session(SessionFlags {
            is_first_launch: Some(value),
            ..SessionFlags::default()
        })
        .await
        .map(drop)
    }

    pub async fn set_onboarding_complete(&self, value: bool) -> Result<()> {
        self.update_session(SessionFlags {
            has_completed_onboarding: Some(value),
            ..SessionFlags::default()
        })
        .await
        .map(drop)
    }

    /// Logout: drop every record and return the session to defaults
    pub async fn clear_all_data(&self) -> Result<()> {
        let state = self.lock_session().await;
        let mut batch = WriteBatch::new();
        for key in keys::ALL {
            batch.remove(key);
        }

        let mut state = self.persist(state, batch).await?;
        *state = SessionState::default();

        info!("Session data cleared");
        Ok(())
    }

    // ---- internals ----

    async fn lock_session(&self) -> SessionGuard {
        Arc::clone(&self.state).lock_owned().await
    }

    /// Commit `batch` while holding the critical section
    ///
    /// Hands the guard back on success. On failure the guard is released
    /// unchanged, except after a timeout, where it moves to [`reconcile`].
    async fn persist(&self, state: SessionGuard, batch: WriteBatch) -> Result<SessionGuard> {
        let timeout = self.settings.write_timeout;
        let store = Arc::clone(&self.store);
        let mut commit = Box::pin(async move { store.commit(batch).await });

        let outcome = tokio::time::timeout(timeout, &mut commit).await;
        let err = match outcome {
            Ok(Ok(())) => return Ok(state),
            Ok(Err(err)) => err,
            Err(_) => {
                tokio::spawn(reconcile(
                    Arc::clone(&self.store),
                    Arc::clone(&self.metrics),
                    state,
                    commit,
                ));
                StoreError::Timeout(timeout)
            }
        };

        self.metrics.persistence_failed();
        warn!(error = %err, "Commit failed, session left unchanged");
        Err(EngineError::PersistenceFailure(err))
    }

    async fn hand_off(&self, job: &Job) {
        if job.selected_candidates.is_empty() {
            return;
        }

        if let Err(err) = self.dispatcher.dispatch(JobNotice::from(job)).await {
            warn!(job_id = %job.id, error = %err, "Notification hand-off failed");
        }
    }
}

/// Wait out a commit the caller stopped waiting for
///
/// Holds the critical section until the store answers. A commit that landed
/// late is undone by writing every record of the unchanged session back.
async fn reconcile<F>(
    store: Arc<dyn KeyValueStore>,
    metrics: Arc<Metrics>,
    state: SessionGuard,
    commit: F,
) where
    F: Future<Output = store::Result<()>> + Send + 'static,
{
    if let Err(err) = commit.await {
        debug!(error = %err, "Timed-out commit did not land");
        return;
    }

    warn!("Timed-out commit landed late, restoring session records");
    let restored = match snapshot_batch(&state) {
        Ok(batch) => store.commit(batch).await.map_err(EngineError::from),
        Err(err) => Err(err),
    };

    match restored {
        Ok(()) => info!("Session records restored"),
        Err(err) => {
            metrics.persistence_failed();
            error!(error = %err, "Failed to restore session records, store diverged from memory");
        }
    }
}

async fn load_session(store: &dyn KeyValueStore) -> Result<SessionState> {
    let mut state = SessionState::default();

    if let Some(raw) = store.get(keys::USER_ROLE).await? {
        state.user_role = UserRole::parse_stored(&raw);
    }
    if let Some(raw) = store.get(keys::FIRST_LAUNCH).await? {
        state.is_first_launch = raw != "false";
    }
    if let Some(raw) = store.get(keys::ONBOARDING).await? {
        state.has_completed_onboarding = raw == "true";
    }

    state.worker_profile = decode(keys::WORKER_PROFILE, store.get(keys::WORKER_PROFILE).await?)?;
    state.employer_profile =
        decode(keys::EMPLOYER_PROFILE, store.get(keys::EMPLOYER_PROFILE).await?)?;
    state.jobs = decode(keys::JOBS, store.get(keys::JOBS).await?)?.unwrap_or_default();

    Ok(state)
}

fn decode<T: DeserializeOwned>(key: &str, raw: Option<String>) -> Result<Option<T>> {
    raw.map(|text| {
        serde_json::from_str(&text).map_err(|source| EngineError::CorruptRecord {
            key: key.to_string(),
            source,
        })
    })
    .transpose()
}

fn encode<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Wallet and job list together, so neither can land without the other
fn ledger_batch(state: &SessionState) -> Result<WriteBatch> {
    let mut batch = WriteBatch::new();
    batch.set(keys::JOBS, encode(&state.jobs)?);
    match &state.employer_profile {
        Some(profile) => batch.set(keys::EMPLOYER_PROFILE, encode(profile)?),
        None => batch.remove(keys::EMPLOYER_PROFILE),
    };
    Ok(batch)
}

/// Every record of `state`, so that loading the store yields `state` again
fn snapshot_batch(state: &SessionState) -> Result<WriteBatch> {
    let mut batch = ledger_batch(state)?;
    match state.user_role {
        Some(role) => batch.set(keys::USER_ROLE, role.as_str()),
        None => batch.remove(keys::USER_ROLE),
    };
    batch.set(keys::FIRST_LAUNCH, keys::encode_flag(state.is_first_launch));
    batch.set(keys::ONBOARDING, keys::encode_flag(state.has_completed_onboarding));
    match &state.worker_profile {
        Some(profile) => batch.set(keys::WORKER_PROFILE, encode(profile)?),
        None => batch.remove(keys::WORKER_PROFILE),
    };
    Ok(batch)
}

fn find_job(state: &SessionState, job_id: &str) -> Result<usize> {
    state
        .job_index(job_id)
        .ok_or_else(|| EngineError::JobNotFound(job_id.to_string()))
}

fn ensure_transition(job: &Job, to: JobStatus) -> Result<()> {
    if job.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(EngineError::InvalidTransition {
            job_id: job.id.clone(),
            from: job.status,
            to,
        })
    }
}

/// Credit the platform fee of `state.jobs[idx]` and expire the job
fn apply_refund(state: &mut SessionState, idx: usize) -> Result<Decimal> {
    let profile = state
        .employer_profile
        .as_mut()
        .ok_or(EngineError::NoEmployerProfile)?;
    let job = &mut state.jobs[idx];
    let amount = job.platform_fee;

    profile.wallet = profile
        .wallet
        .checked_add(amount)
        .ok_or_else(|| EngineError::InvalidAmount(format!("wallet overflow refunding {amount}")))?;
    job.status = JobStatus::Expired;
    job.refunded_amount = Some(amount);
    Ok(amount)
}

/// Keep the first occurrence of each candidate, in order
fn dedupe_candidates(candidates: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.clone()))
        .collect()
}
