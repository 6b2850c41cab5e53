// ilex-api: Async Rust client for the SYR / Oceanic i-Lex Connect cloud API

pub mod auth;
pub mod client;
pub mod devices;
pub mod error;
pub mod models;
pub mod reauth;
pub mod transport;

pub use auth::{Credentials, SessionState};
pub use client::{DEFAULT_BASE_URL, IlexClient};
pub use error::Error;
pub use models::{DeviceDescriptor, DeviceList, LiveData};
pub use transport::{TlsMode, TransportConfig};
