//! Record keys for the session store
//!
//! Every durable record lives under one of these keys:
//! - `@livora_user_role`: "worker" | "employer"
//! - `@livora_first_launch`: "true" | "false"
//! - `@livora_onboarding`: "true" | "false"
//! - `@livora_worker_profile`: WorkerProfile (JSON)
//! - `@livora_employer_profile`: EmployerProfile (JSON)
//! - `@livora_jobs`: Vec<Job> (JSON)

const KEY_PREFIX: &str = "@livora_";

pub const USER_ROLE: &str = "@livora_user_role";
pub const FIRST_LAUNCH: &str = "@livora_first_launch";
pub const ONBOARDING: &str = "@livora_onboarding";
pub const WORKER_PROFILE: &str = "@livora_worker_profile";
pub const EMPLOYER_PROFILE: &str = "@livora_employer_profile";
pub const JOBS: &str = "@livora_jobs";

/// All record keys, in load order. Used by the clear/reset path.
pub const ALL: [&str; 6] = [
    USER_ROLE,
    FIRST_LAUNCH,
    ONBOARDING,
    WORKER_PROFILE,
    EMPLOYER_PROFILE,
    JOBS,
];

/// Encode a boolean flag the way the record layout stores it
pub fn encode_flag(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

/// Strip the shared prefix: @livora_jobs -> jobs
pub fn short_name(key: &str) -> Option<&str> {
    key.strip_prefix(KEY_PREFIX)
}
