use std::sync::Arc;

use crate::config::Config;
use crate::engine::JobEngine;
use crate::observability::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<JobEngine>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<JobEngine>) -> Self {
        let metrics = engine.metrics();
        Self {
            config: Arc::new(config),
            engine,
            metrics,
        }
    }
}
