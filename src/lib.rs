pub mod api;
pub mod config;
pub mod engine;
pub mod humanize;
pub mod notify;
pub mod observability;
pub mod store;
