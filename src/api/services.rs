use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use super::{
    error::ApiError,
    models::{
        ConfirmJobRequest, CreateJobRequest, ExpireResponse, FeeScheduleResponse, HealthResponse,
        RegisterEmployerRequest, SessionUpdateRequest, UpdateStatusRequest, WalletResponse,
    },
    state::AppState,
};
use crate::engine::{
    EmployerProfile, EngineError, JobDraft, JobStatus, SmsPackage, WorkerProfile, fees,
};

type Payload<T> = Result<Json<T>, JsonRejection>;

/// Job posting endpoint (POST /jobs)
///
/// Debits platform fee + SMS cost from the employer wallet and returns the
/// pending job with `201 Created`. Caller-supplied fee fields are parsed so
/// malformed values are rejected, then discarded by the engine.
pub async fn create_job(
    State(state): State<AppState>,
    payload: Payload<CreateJobRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;

    let payment_amount = fees::amount_from_json(&request.payment_amount)?;
    let platform_fee = request
        .platform_fee
        .as_ref()
        .map(fees::amount_from_json)
        .transpose()?;
    let sms_cost = request
        .sms_cost
        .as_ref()
        .map(fees::amount_from_json)
        .transpose()?;

    let draft = JobDraft {
        job_type: request.job_type,
        location: request.location,
        number_of_workers: request.number_of_workers.unwrap_or(1),
        urgency: request.urgency.unwrap_or_default(),
        payment_amount,
        selected_candidates: request.selected_candidates,
        employer_id: request.employer_id,
        platform_fee,
        sms_cost,
    };

    let job = state.engine.create_contracted_job(draft).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.jobs().await)
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.engine.job(&job_id).await {
        Some(job) => Ok(Json(job)),
        None => Err(EngineError::JobNotFound(job_id).into()),
    }
}

/// Worker acceptance (POST /jobs/{id}/confirm)
pub async fn confirm_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    payload: Payload<ConfirmJobRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let job = state
        .engine
        .confirm_job_acceptance(&job_id, &request.worker_id)
        .await?;

    Ok(Json(job))
}

/// Platform fee refund (POST /jobs/{id}/refund)
///
/// Repeating the call on an expired job answers `200` with
/// `{"outcome": "already_refunded"}` and credits nothing.
pub async fn refund_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.engine.refund_job_fee(&job_id).await?;
    Ok(Json(outcome))
}

pub async fn update_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    payload: Payload<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let status: JobStatus = request.status.parse().map_err(ApiError::InvalidPayload)?;

    let job = state.engine.update_job_status(&job_id, status).await?;
    Ok(Json(job))
}

/// Lapsed-job sweep (POST /jobs/expire)
pub async fn expire_jobs(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let refunded = state.engine.expire_lapsed(Utc::now()).await?;
    Ok(Json(ExpireResponse { refunded }))
}

/// Employer registration (POST /employer)
///
/// Builds the profile from the form fields. The opening wallet may only be
/// set here, once; later calls answer `409`.
pub async fn register_employer(
    State(state): State<AppState>,
    payload: Payload<RegisterEmployerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;

    let wallet = match &request.wallet {
        Some(value) => fees::amount_from_json(value)?,
        None => Decimal::ZERO,
    };

    let profile = EmployerProfile {
        id: request.id.unwrap_or_else(|| Uuid::now_v7().to_string()),
        name: request.name,
        phone: request.phone,
        nid_document: request.nid_document,
        trade_license: request.trade_license,
        verified: request.verified,
        wallet,
        sms_credits: request.sms_credits.unwrap_or(0),
        created_at: Utc::now(),
    };

    let profile = state.engine.register_employer(profile).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn put_worker_profile(
    State(state): State<AppState>,
    payload: Payload<WorkerProfile>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(profile) = payload?;
    state.engine.set_worker_profile(Some(profile.clone())).await?;
    Ok(Json(profile))
}

/// Worker logout (DELETE /worker)
pub async fn clear_worker_profile(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    state.engine.set_worker_profile(None).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_wallet(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .engine
        .employer_profile()
        .await
        .ok_or(EngineError::NoEmployerProfile)?;

    Ok(Json(WalletResponse {
        employer_id: profile.id,
        wallet: profile.wallet,
        sms_credits: profile.sms_credits,
    }))
}

/// SMS package activation (POST /packages/{package})
pub async fn purchase_package(
    State(state): State<AppState>,
    Path(package): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let package: SmsPackage = serde_json::from_value(Value::String(package.clone()))
        .map_err(|_| ApiError::InvalidPayload(format!("unknown package '{package}'")))?;

    let profile = state.engine.purchase_package(package).await?;
    Ok(Json(WalletResponse {
        employer_id: profile.id,
        wallet: profile.wallet,
        sms_credits: profile.sms_credits,
    }))
}

/// Fee schedule the service was configured with (GET /fees)
pub async fn get_fees(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = &state.config.ledger;
    Json(FeeScheduleResponse {
        platform_fee_rate: ledger.platform_fee_rate,
        sms_unit_cost: ledger.sms_unit_cost,
        max_selected_candidates: ledger.max_selected_candidates,
        job_ttl: ledger.job_ttl,
    })
}

pub async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.session().await)
}

pub async fn update_session(
    State(state): State<AppState>,
    payload: Payload<SessionUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let session = state.engine.update_session(request.into()).await?;
    Ok(Json(session))
}

/// Logout (DELETE /session)
pub async fn clear_session(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.engine.clear_all_data().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

/// Health check endpoint (GET /health)
///
/// Reads from the store. Returns 503 Service Unavailable when the read
/// fails, 200 OK otherwise.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());

    let store_status = match state.engine.health_check().await {
        Ok(()) => "healthy",
        Err(err) => {
            tracing::warn!(error = %err, "Store health check failed");
            "unhealthy"
        }
    };
    components.insert("store".to_string(), store_status.to_string());

    let all_healthy = components.values().all(|status| status == "healthy");
    let (status_code, overall_status) = if all_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}
