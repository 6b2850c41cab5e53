// ── Telemetry source port ──
//
// The coordinator only needs two calls from the API client. Keeping them
// behind a trait lets tests drive full cycles with scripted responses.

use std::future::Future;

use ilex_api::{DeviceList, Error, IlexClient, LiveData};

/// Where a refresh cycle reads devices and telemetry from.
///
/// Implementations own any session handling; errors come back already
/// classified by [`ilex_api::Error`] variant.
pub trait TelemetrySource: Send + Sync {
    fn list_devices(&self) -> impl Future<Output = Result<DeviceList, Error>> + Send;

    fn get_live_data(&self, serial: &str) -> impl Future<Output = Result<LiveData, Error>> + Send;
}

impl TelemetrySource for IlexClient {
    fn list_devices(&self) -> impl Future<Output = Result<DeviceList, Error>> + Send {
        IlexClient::list_devices(self)
    }

    fn get_live_data(&self, serial: &str) -> impl Future<Output = Result<LiveData, Error>> + Send {
        IlexClient::get_live_data(self, serial)
    }
}
