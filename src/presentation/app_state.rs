// Application state for HTTP handlers
use std::sync::Arc;

use crate::application::scheduler::StreamingScheduler;
use crate::application::snapshot_service::SnapshotService;
use crate::infrastructure::broadcast::GroupBroadcaster;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<StreamingScheduler>,
    pub broadcaster: Arc<GroupBroadcaster>,
    pub snapshot_service: SnapshotService,
}
