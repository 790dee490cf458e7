// Streaming scheduler - periodic snapshot generation and broadcast loop
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{watch, Mutex};

use crate::application::publisher::UpdatePublisher;
use crate::application::snapshot_service::SnapshotService;
use crate::domain::snapshot::LineSnapshot;
use crate::domain::update::StreamMessage;

const DEFAULT_INTERVAL_MS: u64 = 500;
/// Above this interval the scheduler pushes every cycle even without
/// changes, so slow-polling subscribers still see a live stream
const DEFAULT_KEEPALIVE_AFTER_MS: u64 = 1000;
const FAILURE_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredLine {
    pub line_id: i64,
    pub post_ids: Vec<i64>,
}

/// Startup configuration for the scheduler. Out-of-range values fall back
/// to the documented defaults instead of failing.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval_ms: u64,
    pub keepalive_after_ms: u64,
    pub lines: Vec<MonitoredLine>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            keepalive_after_ms: DEFAULT_KEEPALIVE_AFTER_MS,
            lines: Vec::new(),
        }
    }
}

/// Operational diagnostics, no side effects
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub interval_ms: u64,
    pub monitored_lines: Vec<i64>,
    pub cached_snapshots: usize,
}

struct SchedulerState {
    interval: Duration,
    keepalive_after: Duration,
    monitored: Vec<MonitoredLine>,
    cache: HashMap<i64, LineSnapshot>,
    running: bool,
}

/// Runs the monitoring loop: every interval, for each monitored line in
/// registration order, generate a snapshot, diff it against the cached
/// previous one, and broadcast an initial snapshot or a delta update.
///
/// The snapshot cache and the monitored set are owned by this scheduler;
/// reconfiguration calls take the same mutex as the loop, so they are safe
/// while it runs. Updates for one line are published strictly in order.
pub struct StreamingScheduler {
    snapshot_service: SnapshotService,
    publisher: Arc<dyn UpdatePublisher>,
    state: Mutex<SchedulerState>,
    shutdown_tx: watch::Sender<bool>,
}

impl StreamingScheduler {
    pub fn new(
        snapshot_service: SnapshotService,
        publisher: Arc<dyn UpdatePublisher>,
        config: SchedulerConfig,
    ) -> Self {
        let interval_ms = if config.interval_ms == 0 {
            tracing::warn!(
                "Configured interval must be positive, falling back to {} ms",
                DEFAULT_INTERVAL_MS
            );
            DEFAULT_INTERVAL_MS
        } else {
            config.interval_ms
        };

        let monitored = if config.lines.is_empty() {
            tracing::info!("No monitored lines configured, defaulting to line 1 with posts 1-4");
            vec![MonitoredLine {
                line_id: 1,
                post_ids: vec![1, 2, 3, 4],
            }]
        } else {
            config.lines
        };

        let (shutdown_tx, _) = watch::channel(false);

        Self {
            snapshot_service,
            publisher,
            state: Mutex::new(SchedulerState {
                interval: Duration::from_millis(interval_ms),
                keepalive_after: Duration::from_millis(config.keepalive_after_ms),
                monitored,
                cache: HashMap::new(),
                running: false,
            }),
            shutdown_tx,
        }
    }

    /// The monitoring loop. Spawn exactly once; a second call while already
    /// running returns immediately.
    pub async fn run(self: Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            if state.running {
                tracing::warn!("Scheduler is already running, ignoring second start");
                return;
            }
            state.running = true;
        }

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tracing::info!("Streaming scheduler started");

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            // Classified failures are absorbed inside the cycle; anything
            // that still unwinds out of it gets logged and a backoff, never
            // a dead loop.
            if let Err(panic) = AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                tracing::error!(
                    "Monitoring cycle failed unexpectedly: {}",
                    panic_message(panic.as_ref())
                );
                tokio::select! {
                    _ = tokio::time::sleep(FAILURE_BACKOFF) => {}
                    _ = shutdown_rx.changed() => break,
                }
                continue;
            }

            let interval = self.state.lock().await.interval;
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown_rx.changed() => break,
            }
        }

        self.state.lock().await.running = false;
        tracing::info!("Streaming scheduler stopped");
    }

    /// One pass over all monitored lines, in registration order. Per-line
    /// failures (data source, publish) are logged where they arise and do
    /// not abort the rest of the cycle.
    async fn run_cycle(&self) {
        let monitored = self.state.lock().await.monitored.clone();

        for line in monitored {
            self.process_line(&line).await;
        }
    }

    async fn process_line(&self, line: &MonitoredLine) {
        // Hold the state lock while reading and replacing this line's cache
        // entry so reconfiguration cannot interleave with the read/modify.
        let mut state = self.state.lock().await;

        if !state.monitored.iter().any(|m| m.line_id == line.line_id) {
            // Removed mid-cycle
            return;
        }

        match state.cache.get(&line.line_id).cloned() {
            None => {
                let snapshot = self
                    .snapshot_service
                    .generate_line_snapshot(line.line_id, &line.post_ids)
                    .await;
                if let Err(e) = self
                    .publisher
                    .publish(line.line_id, StreamMessage::InitialSnapshot(snapshot.clone()))
                    .await
                {
                    tracing::warn!(
                        "Failed to publish initial snapshot for line {}: {:#}",
                        line.line_id,
                        e
                    );
                }
                state.cache.insert(line.line_id, snapshot);
            }
            Some(previous) => {
                let (current, update) = self
                    .snapshot_service
                    .generate_dashboard_update(line.line_id, &line.post_ids, &previous)
                    .await;

                let always_push = state.interval > state.keepalive_after;
                if update.has_any_changes || always_push {
                    if let Err(e) = self
                        .publisher
                        .publish(line.line_id, StreamMessage::Update(update))
                        .await
                    {
                        tracing::warn!(
                            "Failed to publish update for line {}: {:#}",
                            line.line_id,
                            e
                        );
                    }
                }

                // Cache the fresh snapshot whether or not it was published
                state.cache.insert(line.line_id, current);
            }
        }
    }

    /// Replace the whole monitored set. Clears the snapshot cache so the
    /// next cycle re-sends a full initial snapshot for every line.
    pub async fn replace_monitored_lines(&self, lines: Vec<MonitoredLine>) {
        let mut state = self.state.lock().await;
        tracing::info!("Replacing monitored lines ({} entries)", lines.len());
        state.monitored = lines;
        state.cache.clear();
    }

    /// Add one line at the end of the registration order. No-op if the line
    /// is already monitored.
    pub async fn add_line(&self, line_id: i64, post_ids: Vec<i64>) {
        let mut state = self.state.lock().await;
        if state.monitored.iter().any(|m| m.line_id == line_id) {
            return;
        }
        tracing::info!("Now monitoring line {}", line_id);
        state.monitored.push(MonitoredLine { line_id, post_ids });
    }

    /// Stop monitoring one line and evict its cached snapshot
    pub async fn remove_line(&self, line_id: i64) {
        let mut state = self.state.lock().await;
        state.monitored.retain(|m| m.line_id != line_id);
        state.cache.remove(&line_id);
        tracing::info!("Stopped monitoring line {}", line_id);
    }

    /// Change the cycle interval; takes effect on the next sleep. A zero
    /// interval is rejected and the previous value kept.
    pub async fn set_interval(&self, interval_ms: u64) {
        if interval_ms == 0 {
            tracing::warn!("Ignoring zero interval, keeping the current one");
            return;
        }
        let mut state = self.state.lock().await;
        state.interval = Duration::from_millis(interval_ms);
        tracing::info!("Monitoring interval set to {} ms", interval_ms);
    }

    /// Post ids of a monitored line, if the line is monitored
    pub async fn post_ids_for(&self, line_id: i64) -> Option<Vec<i64>> {
        let state = self.state.lock().await;
        state
            .monitored
            .iter()
            .find(|m| m.line_id == line_id)
            .map(|m| m.post_ids.clone())
    }

    pub async fn status(&self) -> SchedulerStatus {
        let state = self.state.lock().await;
        SchedulerStatus {
            running: state.running,
            interval_ms: state.interval.as_millis() as u64,
            monitored_lines: state.monitored.iter().map(|m| m.line_id).collect(),
            cached_snapshots: state.cache.len(),
        }
    }

    /// Signal the loop to stop after the current cycle. Idempotent; safe to
    /// call when the scheduler never started.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::line_data_repository::{
        LineDataRepository, PostStateRecord, SensorReadingRecord,
    };
    use crate::domain::alert::LineThresholds;
    use crate::domain::oee::OeeInput;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Shop floor stub with mutable post counters
    struct FakeFloor {
        posts: StdMutex<Vec<PostStateRecord>>,
        panic_once: AtomicBool,
    }

    impl FakeFloor {
        fn new(post_ids: &[i64]) -> Self {
            let t0 = Utc.with_ymd_and_hms(2026, 2, 1, 6, 0, 0).unwrap();
            let posts = post_ids
                .iter()
                .map(|&post_id| PostStateRecord {
                    post_id,
                    name: format!("Post {}", post_id),
                    units_produced: 100,
                    defective_units: 1,
                    efficiency: 95.0,
                    status: "Running".to_string(),
                    health_score: 90.0,
                    updated_at: t0,
                })
                .collect();
            Self {
                posts: StdMutex::new(posts),
                panic_once: AtomicBool::new(false),
            }
        }

        fn increment_units(&self, post_id: i64) {
            let mut posts = self.posts.lock().unwrap();
            let post = posts.iter_mut().find(|p| p.post_id == post_id).unwrap();
            post.units_produced += 1;
        }
    }

    #[async_trait]
    impl LineDataRepository for FakeFloor {
        async fn fetch_post_states(
            &self,
            _line_id: i64,
            post_ids: &[i64],
        ) -> anyhow::Result<Vec<PostStateRecord>> {
            if self.panic_once.swap(false, Ordering::SeqCst) {
                panic!("shop floor connection wedged");
            }
            let posts = self.posts.lock().unwrap();
            Ok(posts
                .iter()
                .filter(|p| post_ids.contains(&p.post_id))
                .cloned()
                .collect())
        }

        async fn fetch_sensor_readings(
            &self,
            _line_id: i64,
        ) -> anyhow::Result<Vec<SensorReadingRecord>> {
            Ok(Vec::new())
        }

        async fn fetch_production_counters(&self, _line_id: i64) -> anyhow::Result<OeeInput> {
            Ok(OeeInput {
                planned_minutes: 480,
                actual_run_minutes: 432,
                idle_minutes: 48,
                produced_units: 950,
                expected_units: 1000,
                defective_units: 19,
            })
        }

        async fn fetch_material_level(&self, _line_id: i64) -> anyhow::Result<Option<f64>> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        messages: StdMutex<Vec<(i64, StreamMessage)>>,
    }

    impl RecordingPublisher {
        fn take(&self) -> Vec<(i64, StreamMessage)> {
            std::mem::take(&mut self.messages.lock().unwrap())
        }
    }

    #[async_trait]
    impl UpdatePublisher for RecordingPublisher {
        async fn publish(&self, line_id: i64, message: StreamMessage) -> anyhow::Result<()> {
            self.messages.lock().unwrap().push((line_id, message));
            Ok(())
        }
    }

    fn scheduler_with(
        floor: Arc<FakeFloor>,
        publisher: Arc<RecordingPublisher>,
        config: SchedulerConfig,
    ) -> StreamingScheduler {
        let service = SnapshotService::new(floor, LineThresholds::default());
        StreamingScheduler::new(service, publisher, config)
    }

    fn one_line_config(interval_ms: u64) -> SchedulerConfig {
        SchedulerConfig {
            interval_ms,
            lines: vec![MonitoredLine {
                line_id: 1,
                post_ids: vec![1, 2, 3, 4],
            }],
            ..SchedulerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_first_cycle_publishes_initial_snapshot() {
        let floor = Arc::new(FakeFloor::new(&[1, 2, 3, 4]));
        let publisher = Arc::new(RecordingPublisher::default());
        let scheduler = scheduler_with(floor, publisher.clone(), one_line_config(500));

        scheduler.run_cycle().await;

        let messages = publisher.take();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, 1);
        assert!(matches!(messages[0].1, StreamMessage::InitialSnapshot(_)));
        assert_eq!(scheduler.status().await.cached_snapshots, 1);
    }

    #[tokio::test]
    async fn test_unchanged_state_publishes_nothing_at_fine_interval() {
        let floor = Arc::new(FakeFloor::new(&[1, 2, 3, 4]));
        let publisher = Arc::new(RecordingPublisher::default());
        let scheduler = scheduler_with(floor, publisher.clone(), one_line_config(500));

        scheduler.run_cycle().await;
        publisher.take();

        scheduler.run_cycle().await;
        assert!(publisher.take().is_empty());
    }

    #[tokio::test]
    async fn test_coarse_interval_always_pushes() {
        let floor = Arc::new(FakeFloor::new(&[1, 2, 3, 4]));
        let publisher = Arc::new(RecordingPublisher::default());
        let scheduler = scheduler_with(floor, publisher.clone(), one_line_config(2000));

        scheduler.run_cycle().await;
        publisher.take();

        scheduler.run_cycle().await;
        let messages = publisher.take();
        assert_eq!(messages.len(), 1);
        match &messages[0].1 {
            StreamMessage::Update(update) => assert!(!update.has_any_changes),
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_change_produces_update_with_only_that_delta() {
        let floor = Arc::new(FakeFloor::new(&[1, 2, 3, 4]));
        let publisher = Arc::new(RecordingPublisher::default());
        let scheduler = scheduler_with(floor.clone(), publisher.clone(), one_line_config(500));

        // Cycle 1: initial. Cycle 2: silent. Cycle 3: post 2 produced a unit.
        scheduler.run_cycle().await;
        scheduler.run_cycle().await;
        publisher.take();

        floor.increment_units(2);
        scheduler.run_cycle().await;

        let messages = publisher.take();
        assert_eq!(messages.len(), 1);
        match &messages[0].1 {
            StreamMessage::Update(update) => {
                assert!(update.has_any_changes);
                assert_eq!(update.posts.len(), 1);
                assert_eq!(update.posts[0].post_id, 2);
                assert_eq!(update.posts[0].units_produced, 101);
                assert!(update.sensors.is_empty());
                assert!(update.oee.is_none());
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_replace_monitored_lines_clears_cache() {
        let floor = Arc::new(FakeFloor::new(&[1, 2, 3, 4]));
        let publisher = Arc::new(RecordingPublisher::default());
        let scheduler = scheduler_with(floor, publisher.clone(), one_line_config(500));

        scheduler.run_cycle().await;
        publisher.take();

        scheduler
            .replace_monitored_lines(vec![MonitoredLine {
                line_id: 1,
                post_ids: vec![1, 2],
            }])
            .await;
        assert_eq!(scheduler.status().await.cached_snapshots, 0);

        scheduler.run_cycle().await;
        let messages = publisher.take();
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0].1, StreamMessage::InitialSnapshot(_)));
    }

    #[tokio::test]
    async fn test_remove_line_evicts_cache_entry() {
        let floor = Arc::new(FakeFloor::new(&[1, 2, 3, 4]));
        let publisher = Arc::new(RecordingPublisher::default());
        let scheduler = scheduler_with(floor, publisher.clone(), one_line_config(500));

        scheduler.add_line(2, vec![1]).await;
        scheduler.run_cycle().await;
        assert_eq!(scheduler.status().await.cached_snapshots, 2);

        scheduler.remove_line(2).await;
        let status = scheduler.status().await;
        assert_eq!(status.monitored_lines, vec![1]);
        assert_eq!(status.cached_snapshots, 1);
    }

    #[tokio::test]
    async fn test_defaults_applied_for_empty_config() {
        let floor = Arc::new(FakeFloor::new(&[1, 2, 3, 4]));
        let publisher = Arc::new(RecordingPublisher::default());
        let scheduler = scheduler_with(
            floor,
            publisher,
            SchedulerConfig {
                interval_ms: 0,
                lines: Vec::new(),
                ..SchedulerConfig::default()
            },
        );

        let status = scheduler.status().await;
        assert_eq!(status.interval_ms, 500);
        assert_eq!(status.monitored_lines, vec![1]);
    }

    #[tokio::test]
    async fn test_zero_interval_reconfiguration_rejected() {
        let floor = Arc::new(FakeFloor::new(&[1]));
        let publisher = Arc::new(RecordingPublisher::default());
        let scheduler = scheduler_with(floor, publisher, one_line_config(500));

        scheduler.set_interval(0).await;
        assert_eq!(scheduler.status().await.interval_ms, 500);

        scheduler.set_interval(250).await;
        assert_eq!(scheduler.status().await.interval_ms, 250);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_survives_panicking_cycle_with_backoff() {
        let floor = Arc::new(FakeFloor::new(&[1, 2, 3, 4]));
        floor.panic_once.store(true, Ordering::SeqCst);
        let publisher = Arc::new(RecordingPublisher::default());
        let scheduler = Arc::new(scheduler_with(
            floor.clone(),
            publisher.clone(),
            one_line_config(10),
        ));

        let handle = tokio::spawn(scheduler.clone().run());

        // Cycle one panics mid-fetch; after the backoff the loop retries and
        // the next cycle publishes the initial snapshot.
        loop {
            if !publisher.messages.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let messages = publisher.take();
        assert!(matches!(messages[0].1, StreamMessage::InitialSnapshot(_)));

        scheduler.shutdown();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_and_is_idempotent() {
        let floor = Arc::new(FakeFloor::new(&[1, 2, 3, 4]));
        let publisher = Arc::new(RecordingPublisher::default());
        let scheduler = Arc::new(scheduler_with(floor, publisher, one_line_config(10)));

        // Shutdown before start must not panic
        scheduler.shutdown();

        let handle = tokio::spawn(scheduler.clone().run());
        // Already-signalled shutdown stops the loop promptly
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();

        assert!(!scheduler.status().await.running);
        scheduler.shutdown();
    }
}
