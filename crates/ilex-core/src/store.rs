// ── Snapshot store ──
//
// Holds the last successfully assembled snapshot. Writes replace the
// whole snapshot by pointer swap; readers load an `Arc` and never see a
// half-built state. Changes are broadcast via `watch` channels.
//
// Alongside the published snapshot the store keeps a last-known view: a
// device that was listed but skipped this cycle keeps its previous entry
// there until it answers again or drops off the listing.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::Snapshot;
use crate::stream::SnapshotStream;

/// Publish / read-last-snapshot port between the coordinator and readers.
///
/// Only the coordinator publishes; entity adapters and hosts read.
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
    last_known: ArcSwap<Snapshot>,
    updates: watch::Sender<Arc<Snapshot>>,
    last_success: watch::Sender<Option<DateTime<Utc>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let empty = Arc::new(Snapshot::default());
        let (updates, _) = watch::channel(Arc::clone(&empty));
        let (last_success, _) = watch::channel(None);

        Self {
            current: ArcSwap::new(Arc::clone(&empty)),
            last_known: ArcSwap::new(empty),
            updates,
            last_success,
        }
    }

    /// Replace the published snapshot and stamp the success time.
    ///
    /// `skipped` lists serials that were in the device listing but whose
    /// live data failed this cycle; their previous entries are carried into
    /// the last-known view.
    pub(crate) fn publish(
        &self,
        snapshot: Snapshot,
        skipped: &[String],
        at: DateTime<Utc>,
    ) -> Arc<Snapshot> {
        let previous = self.last_known.load();
        let mut known = snapshot.clone();
        for serial in skipped {
            if let Some(entry) = previous.get(serial) {
                known.insert_entry(serial.clone(), entry.clone());
            }
        }
        self.last_known.store(Arc::new(known));

        let snapshot = Arc::new(snapshot);
        self.current.store(Arc::clone(&snapshot));
        // `send_replace` updates unconditionally, even with zero receivers.
        self.updates.send_replace(Arc::clone(&snapshot));
        self.last_success.send_replace(Some(at));
        snapshot
    }

    // ── Readers ──────────────────────────────────────────────────────

    /// The current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Published snapshot plus the previous entries of devices that were
    /// listed but skipped by the latest cycle.
    pub fn last_known(&self) -> Arc<Snapshot> {
        self.last_known.load_full()
    }

    /// Subscribe to snapshot replacements.
    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.updates.subscribe())
    }

    /// When the last cycle completed successfully, if ever.
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        *self.last_success.borrow()
    }

    /// How long ago the last successful cycle finished, or `None` if never.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_success().map(|t| Utc::now() - t)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
