//! Request and response bodies for the HTTP facade.
//!
//! Bodies use camelCase like the stored records. Money fields on requests are
//! taken as raw JSON so both `500` and `"500.00"` are accepted and decimals
//! such as `999.995` never pass through `f64`.
//!
//! ```json
//! POST /jobs
//! {
//!   "jobType": "electrician",
//!   "location": "Dhaka, Mirpur",
//!   "numberOfWorkers": 2,
//!   "urgency": "urgent",
//!   "paymentAmount": 500,
//!   "selectedCandidates": ["w1", "w2", "w3"]
//! }
//! ```

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::engine::{SessionFlags, Urgency, UserRole};
use crate::humanize::HumanDuration;

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub job_type: String,
    pub location: String,
    #[serde(default)]
    pub number_of_workers: Option<u32>,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    pub payment_amount: Value,
    #[serde(default)]
    pub selected_candidates: Vec<String>,
    #[serde(default)]
    pub employer_id: Option<String>,
    #[serde(default)]
    pub platform_fee: Option<Value>,
    #[serde(default)]
    pub sms_cost: Option<Value>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmJobRequest {
    pub worker_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegisterEmployerRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub nid_document: Option<String>,
    #[serde(default)]
    pub trade_license: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub wallet: Option<Value>,
    #[serde(default)]
    pub sms_credits: Option<u32>,
}

/// Partial update of the session flags; absent fields are left alone
///
/// `"userRole": null` clears the stored role.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdateRequest {
    #[serde(default, deserialize_with = "present")]
    pub user_role: Option<Option<UserRole>>,
    #[serde(default)]
    pub is_first_launch: Option<bool>,
    #[serde(default)]
    pub has_completed_onboarding: Option<bool>,
}

impl From<SessionUpdateRequest> for SessionFlags {
    fn from(request: SessionUpdateRequest) -> Self {
        Self {
            user_role: request.user_role,
            is_first_launch: request.is_first_launch,
            has_completed_onboarding: request.has_completed_onboarding,
        }
    }
}

/// Tells a field sent as `null` apart from a missing one
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Charges applied to new postings (GET /fees)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeeScheduleResponse {
    pub platform_fee_rate: Decimal,
    pub sms_unit_cost: Decimal,
    pub max_selected_candidates: usize,
    pub job_ttl: HumanDuration,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub employer_id: String,
    pub wallet: Decimal,
    pub sms_credits: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExpireResponse {
    pub refunded: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}
