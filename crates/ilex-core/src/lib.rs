// ilex-core: Refresh coordinator and entity layer between ilex-api and hosts.

pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod model;
pub mod source;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{BridgeConfig, DEFAULT_SCAN_INTERVAL, MIN_SCAN_INTERVAL, TlsVerification};
pub use ilex_api::{DEFAULT_BASE_URL, IlexClient, SessionState};
pub use coordinator::{Coordinator, CoordinatorState};
pub use entity::{
    DeviceInfo, Entity, EntityContext, EntityState, Platform, SensorDeviceClass, entities_for,
};
pub use error::CoreError;
pub use model::{DeviceEntry, Snapshot};
pub use source::TelemetrySource;
pub use store::SnapshotStore;
pub use stream::{SnapshotStream, SnapshotWatchStream};
