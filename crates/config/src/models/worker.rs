use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub enabled: bool,
    pub worker_id: String,
    /// 同时处理的任务上限
    pub max_concurrent_jobs: u32,
    /// 队列轮询间隔
    pub poll_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            worker_id: "book-worker-001".to_string(),
            max_concurrent_jobs: 5,
            poll_interval_ms: 1000,
        }
    }
}

impl ConfigValidator for WorkerConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.worker_id, "worker.worker_id")?;
        ValidationUtils::validate_count(
            self.max_concurrent_jobs as usize,
            "worker.max_concurrent_jobs",
        )?;
        ValidationUtils::validate_count(self.poll_interval_ms as usize, "worker.poll_interval_ms")?;
        Ok(())
    }
}
