//! Shared application state threaded through every handler.

use sentinel_audit::AuditEngine;
use sentinel_kernel::GatedWriteCoordinator;
use sentinel_memory::MemoryEngine;
use sentinel_policy::PolicyEngine;
use sentinel_workflow::{AllocationEngine, PromotionTracker, RoiMonitor};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub policy: Arc<PolicyEngine>,
    pub audit: Arc<AuditEngine>,
    pub kernel: Arc<GatedWriteCoordinator>,
    pub memory: Arc<MemoryEngine>,
    pub allocation: Arc<AllocationEngine>,
    pub promotion: Arc<PromotionTracker>,
    pub roi: Arc<RoiMonitor>,
    pub version: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn uptime_seconds(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }
}
