// ── Refresh coordinator ──
//
// Runs refresh cycles against a `TelemetrySource`, publishes the result
// through the `SnapshotStore`, and classifies failures into temporary
// (`UpdateFailed`) and terminal (`ReauthRequired`) outcomes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ilex_api::{Credentials, IlexClient};

use crate::config::{BridgeConfig, MIN_SCAN_INTERVAL};
use crate::entity::EntityContext;
use crate::error::CoreError;
use crate::model::Snapshot;
use crate::source::TelemetrySource;
use crate::store::SnapshotStore;
use crate::stream::SnapshotStream;

// ── CoordinatorState ─────────────────────────────────────────────

/// Outcome of the most recent cycle, observable by hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    /// No cycle has run yet.
    Idle,
    Refreshing,
    /// The last cycle published a snapshot.
    Ready,
    /// The last cycle failed temporarily; the previous snapshot is kept.
    UpdateFailed { message: String },
    /// Stored credentials no longer work. Scheduling has stopped.
    ReauthRequired,
}

// ── Coordinator ──────────────────────────────────────────────────

/// Drives refresh cycles and owns the published snapshot.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Only one cycle runs at a
/// time; a `refresh()` issued while another is in flight waits for it.
pub struct Coordinator<S> {
    inner: Arc<CoordinatorInner<S>>,
}

impl<S> Clone for Coordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<S> {
    source: S,
    store: Arc<SnapshotStore>,
    state: watch::Sender<CoordinatorState>,
    scan_interval: Duration,
    cycle: Mutex<()>,
    last_update_success: AtomicBool,
}

impl<S: TelemetrySource> Coordinator<S> {
    /// Create a coordinator over `source`. Does not fetch anything; call
    /// [`first_refresh()`](Self::first_refresh) before serving entities.
    ///
    /// Intervals below [`MIN_SCAN_INTERVAL`] are raised to it.
    pub fn new(source: S, scan_interval: Duration) -> Self {
        let (state, _) = watch::channel(CoordinatorState::Idle);
        Self {
            inner: Arc::new(CoordinatorInner {
                source,
                store: Arc::new(SnapshotStore::new()),
                state,
                scan_interval: scan_interval.max(MIN_SCAN_INTERVAL),
                cycle: Mutex::new(()),
                last_update_success: AtomicBool::new(false),
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.inner.store
    }

    pub fn scan_interval(&self) -> Duration {
        self.inner.scan_interval
    }

    // ── Cycles ───────────────────────────────────────────────────

    /// Startup cycle. A failure here means the host is not ready yet.
    pub async fn first_refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        let snapshot = self.refresh().await?;
        info!(devices = snapshot.len(), "initial refresh complete");
        Ok(snapshot)
    }

    /// Run one cycle: list devices, fetch each device's live data, and
    /// publish the assembled snapshot.
    ///
    /// On error the previously published snapshot stays in place.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        let _cycle = self.inner.cycle.lock().await;
        self.inner.state.send_replace(CoordinatorState::Refreshing);

        match self.collect().await {
            Ok((snapshot, skipped)) => {
                let published = self.inner.store.publish(snapshot, &skipped, Utc::now());
                self.inner.last_update_success.store(true, Ordering::Release);
                self.inner.state.send_replace(CoordinatorState::Ready);
                debug!(devices = published.len(), "refresh cycle complete");
                Ok(published)
            }
            Err(e) => {
                self.inner.last_update_success.store(false, Ordering::Release);
                match &e {
                    CoreError::ReauthRequired => {
                        error!("session could not be renewed, credentials must be re-entered");
                        self.inner.state.send_replace(CoordinatorState::ReauthRequired);
                    }
                    other => {
                        warn!(error = %other, "refresh cycle failed");
                        self.inner.state.send_replace(CoordinatorState::UpdateFailed {
                            message: other.to_string(),
                        });
                    }
                }
                Err(e)
            }
        }
    }

    /// Fetch everything for one cycle without touching published state.
    ///
    /// Returns the assembled snapshot and the serials that were listed but
    /// skipped.
    async fn collect(&self) -> Result<(Snapshot, Vec<String>), CoreError> {
        let source = &self.inner.source;

        let list = source
            .list_devices()
            .await
            .map_err(CoreError::from_cycle_error)?;
        debug!(devices = list.results.len(), "device list fetched");

        let mut snapshot = Snapshot::default();
        let mut skipped = Vec::new();
        for device in list.results {
            match source.get_live_data(&device.serial).await {
                Ok(live) => snapshot.insert(device, live),
                Err(e) if e.is_reauth_required() => return Err(CoreError::ReauthRequired),
                Err(e) => {
                    warn!(serial = %device.serial, error = %e, "skipping device for this cycle");
                    skipped.push(device.serial);
                }
            }
        }

        Ok((snapshot, skipped))
    }

    // ── Readers ──────────────────────────────────────────────────

    /// The last successfully published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.snapshot()
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.inner.store.last_success()
    }

    /// Whether the most recent cycle succeeded.
    pub fn last_update_success(&self) -> bool {
        self.inner.last_update_success.load(Ordering::Acquire)
    }

    /// Subscribe to snapshot replacements.
    pub fn subscribe(&self) -> SnapshotStream {
        self.inner.store.subscribe()
    }

    /// Watch the coordinator state. A transition to
    /// [`CoordinatorState::ReauthRequired`] is the signal to re-collect
    /// credentials.
    pub fn state(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    pub fn current_state(&self) -> CoordinatorState {
        self.inner.state.borrow().clone()
    }

    /// Point-in-time view for evaluating entity states.
    ///
    /// Devices skipped by the latest cycle keep reporting their previous
    /// values until they answer again.
    pub fn entity_context(&self) -> EntityContext {
        EntityContext::new(
            self.snapshot(),
            self.last_update_success(),
            self.last_success(),
        )
        .with_last_known(self.inner.store.last_known())
    }
}

impl<S: TelemetrySource + 'static> Coordinator<S> {
    /// Spawn the periodic refresh task.
    ///
    /// The task stops when `cancel` fires, or for good after a cycle
    /// reports [`CoreError::ReauthRequired`].
    pub fn start(&self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(refresh_task(self.clone(), cancel))
    }
}

impl Coordinator<IlexClient> {
    /// Build a client from `config`, log in, and run the startup cycle.
    pub async fn connect(config: &BridgeConfig) -> Result<Self, CoreError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let client = IlexClient::new(config.base_url.clone(), credentials, &config.transport())?;

        client.login().await?;
        info!(username = %config.username, "logged in to i-Lex Connect");

        let coordinator = Self::new(client, config.scan_interval);
        coordinator.first_refresh().await?;
        Ok(coordinator)
    }
}

// ── Background task ──────────────────────────────────────────────

async fn refresh_task<S: TelemetrySource + 'static>(
    coordinator: Coordinator<S>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(coordinator.scan_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(CoreError::ReauthRequired) = coordinator.refresh().await {
                    break;
                }
            }
        }
    }

    debug!("refresh task stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::future::{Future, ready};
    use std::sync::atomic::AtomicUsize;

    use ilex_api::{DeviceDescriptor, DeviceList, Error, LiveData};
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};

    use crate::entity::{EntityState, SensorValue, entities_for};

    use super::*;

    type ListFn = Box<dyn Fn() -> Result<DeviceList, Error> + Send + Sync>;
    type LiveFn = Box<dyn Fn(&str) -> Result<LiveData, Error> + Send + Sync>;

    /// Scripted source: each call is answered by a closure.
    struct FakeSource {
        list: ListFn,
        live: LiveFn,
        list_calls: AtomicUsize,
        live_calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(
            list: impl Fn() -> Result<DeviceList, Error> + Send + Sync + 'static,
            live: impl Fn(&str) -> Result<LiveData, Error> + Send + Sync + 'static,
        ) -> Self {
            Self {
                list: Box::new(list),
                live: Box::new(live),
                list_calls: AtomicUsize::new(0),
                live_calls: AtomicUsize::new(0),
            }
        }

        fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        fn live_calls(&self) -> usize {
            self.live_calls.load(Ordering::SeqCst)
        }
    }

    impl TelemetrySource for FakeSource {
        fn list_devices(&self) -> impl Future<Output = Result<DeviceList, Error>> + Send {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            ready((self.list)())
        }

        fn get_live_data(
            &self,
            serial: &str,
        ) -> impl Future<Output = Result<LiveData, Error>> + Send {
            self.live_calls.fetch_add(1, Ordering::SeqCst);
            ready((self.live)(serial))
        }
    }

    fn devices(serials: &[&str]) -> DeviceList {
        DeviceList {
            results: serials
                .iter()
                .map(|s| DeviceDescriptor {
                    serial: (*s).to_string(),
                    dtype: "LEXplus10S".into(),
                    extra: Map::new(),
                })
                .collect(),
        }
    }

    fn live(pressure: &str) -> LiveData {
        [("getPRS".to_string(), json!(pressure))].into_iter().collect()
    }

    fn gateway_timeout() -> Error {
        Error::Status {
            status: 504,
            url: "https://i-lexconnect.com/api/devices/B/live".into(),
        }
    }

    fn coordinator(source: FakeSource) -> Coordinator<FakeSource> {
        Coordinator::new(source, Duration::from_secs(30))
    }

    #[tokio::test]
    async fn scenario_one_device_times_out() {
        let source = FakeSource::new(
            || Ok(devices(&["A", "B"])),
            |serial| match serial {
                "A" => Ok(live("2.5")),
                _ => Err(gateway_timeout()),
            },
        );
        let coordinator = coordinator(source);

        let snapshot = coordinator.refresh().await.unwrap();

        assert_eq!(snapshot.serials().collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(snapshot.get("A").unwrap().live, live("2.5"));
        assert!(!snapshot.contains("B"));
        assert!(coordinator.last_update_success());
        assert!(coordinator.last_success().is_some());
        assert_eq!(coordinator.current_state(), CoordinatorState::Ready);
    }

    #[tokio::test]
    async fn one_failing_device_of_many_is_skipped() {
        let source = FakeSource::new(
            || Ok(devices(&["A", "B", "C", "D"])),
            |serial| {
                if serial == "C" {
                    Err(Error::Deserialization {
                        message: "expected value".into(),
                        body: "<html>".into(),
                    })
                } else {
                    Ok(live("3.0"))
                }
            },
        );
        let coordinator = coordinator(source);

        let snapshot = coordinator.refresh().await.unwrap();

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.serials().collect::<Vec<_>>(), vec!["A", "B", "D"]);
        // The failure did not stop later siblings from being queried.
        assert_eq!(coordinator.source().live_calls(), 4);
    }

    #[tokio::test]
    async fn skipped_device_keeps_last_value_until_it_answers() {
        let fail_b = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fail_b);
        let source = FakeSource::new(
            || Ok(devices(&["A", "B"])),
            move |serial| {
                if serial == "B" && flag.load(Ordering::SeqCst) {
                    Err(gateway_timeout())
                } else if serial == "B" {
                    Ok(live("1.8"))
                } else {
                    Ok(live("2.5"))
                }
            },
        );
        let coordinator = coordinator(source);
        coordinator.refresh().await.unwrap();

        fail_b.store(true, Ordering::SeqCst);
        let snapshot = coordinator.refresh().await.unwrap();
        assert!(!snapshot.contains("B"));

        let ctx = coordinator.entity_context();
        let entities = entities_for(ctx.known_devices());
        let b_pressure = entities
            .iter()
            .find(|e| e.unique_id() == "B_getPRS")
            .unwrap();
        assert!(b_pressure.available(&ctx));
        assert_eq!(
            b_pressure.state(&ctx),
            EntityState::Value(SensorValue::Number(1.8))
        );
    }

    #[tokio::test]
    async fn list_reauth_leaves_snapshot_untouched() {
        let reauth = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&reauth);
        let source = FakeSource::new(
            move || {
                if flag.load(Ordering::SeqCst) {
                    Err(Error::ReauthRequired)
                } else {
                    Ok(devices(&["A"]))
                }
            },
            |_| Ok(live("2.5")),
        );
        let coordinator = coordinator(source);

        let before = coordinator.refresh().await.unwrap();
        let stamped = coordinator.last_success();

        reauth.store(true, Ordering::SeqCst);
        let err = coordinator.refresh().await.unwrap_err();

        assert!(err.is_reauth_required());
        assert!(Arc::ptr_eq(&before, &coordinator.snapshot()));
        assert_eq!(coordinator.last_success(), stamped);
        assert!(!coordinator.last_update_success());
        assert_eq!(coordinator.current_state(), CoordinatorState::ReauthRequired);
    }

    #[tokio::test]
    async fn device_reauth_aborts_whole_cycle() {
        let fail_b = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fail_b);
        let source = FakeSource::new(
            || Ok(devices(&["A", "B", "C"])),
            move |serial| {
                if serial == "B" && flag.load(Ordering::SeqCst) {
                    Err(Error::ReauthRequired)
                } else {
                    Ok(live("2.5"))
                }
            },
        );
        let coordinator = coordinator(source);

        let before = coordinator.refresh().await.unwrap();
        fail_b.store(true, Ordering::SeqCst);

        let err = coordinator.refresh().await.unwrap_err();

        assert!(err.is_reauth_required());
        assert!(Arc::ptr_eq(&before, &coordinator.snapshot()));
        // A and B were queried on the second cycle; C never was.
        assert_eq!(coordinator.source().live_calls(), 3 + 2);
    }

    #[tokio::test]
    async fn list_failure_is_temporary() {
        let fail = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fail);
        let source = FakeSource::new(
            move || {
                if flag.load(Ordering::SeqCst) {
                    Err(Error::Status {
                        status: 502,
                        url: "https://i-lexconnect.com/api/devices".into(),
                    })
                } else {
                    Ok(devices(&["A"]))
                }
            },
            |_| Ok(live("2.5")),
        );
        let coordinator = coordinator(source);

        let before = coordinator.refresh().await.unwrap();
        fail.store(true, Ordering::SeqCst);

        let err = coordinator.refresh().await.unwrap_err();
        assert!(matches!(err, CoreError::UpdateFailed { .. }));
        assert!(Arc::ptr_eq(&before, &coordinator.snapshot()));
        assert!(matches!(
            coordinator.current_state(),
            CoordinatorState::UpdateFailed { .. }
        ));

        // Next cycle recovers.
        fail.store(false, Ordering::SeqCst);
        coordinator.refresh().await.unwrap();
        assert!(coordinator.last_update_success());
    }

    #[tokio::test]
    async fn refresh_is_idempotent() {
        let source = FakeSource::new(|| Ok(devices(&["A", "B"])), |_| Ok(live("2.5")));
        let coordinator = coordinator(source);

        let first = coordinator.refresh().await.unwrap();
        let second = coordinator.refresh().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[tokio::test]
    async fn subscribers_are_notified_on_publish() {
        let source = FakeSource::new(|| Ok(devices(&["A"])), |_| Ok(live("2.5")));
        let coordinator = coordinator(source);
        let mut stream = coordinator.subscribe();

        coordinator.refresh().await.unwrap();

        let snap = stream.changed().await.unwrap();
        assert!(snap.contains("A"));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_stops_after_reauth() {
        let reauth = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&reauth);
        let source = FakeSource::new(
            move || {
                if flag.load(Ordering::SeqCst) {
                    Err(Error::ReauthRequired)
                } else {
                    Ok(devices(&["A"]))
                }
            },
            |_| Ok(live("2.5")),
        );
        let coordinator = coordinator(source);
        coordinator.first_refresh().await.unwrap();

        let cancel = CancellationToken::new();
        let handle = coordinator.start(cancel.clone());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(coordinator.source().list_calls(), 2);

        reauth.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;

        handle.await.unwrap();
        assert_eq!(coordinator.source().list_calls(), 3);
        assert_eq!(coordinator.current_state(), CoordinatorState::ReauthRequired);

        // No further cycles even though nobody cancelled.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(coordinator.source().list_calls(), 3);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_keeps_running_after_temporary_failure() {
        let fail = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&fail);
        let source = FakeSource::new(
            move || {
                if flag.load(Ordering::SeqCst) {
                    Err(gateway_timeout())
                } else {
                    Ok(devices(&["A"]))
                }
            },
            |_| Ok(live("2.5")),
        );
        let coordinator = coordinator(source);
        assert!(coordinator.first_refresh().await.is_err());

        let cancel = CancellationToken::new();
        let handle = coordinator.start(cancel.clone());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(coordinator.source().list_calls(), 2);

        fail.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(coordinator.source().list_calls(), 3);
        assert!(coordinator.snapshot().contains("A"));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn scan_interval_is_clamped() {
        let source = FakeSource::new(|| Ok(devices(&[])), |_| Ok(live("0")));
        let coordinator = Coordinator::new(source, Duration::from_secs(1));
        assert_eq!(coordinator.scan_interval(), MIN_SCAN_INTERVAL);
    }
}
