// Device endpoints
//
// Listing and live telemetry. Both go through `get_json`, so an expired
// session is renewed transparently.

use tracing::debug;

use crate::client::IlexClient;
use crate::error::Error;
use crate::models::{DeviceList, LiveData};

/// Producer filter sent with the device listing.
const PRODUCER_TAG: &str = "oceanic";

impl IlexClient {
    /// List online devices of the Oceanic producer line.
    ///
    /// `GET /api/devices?filterconnect=online&filterproducent=oceanic`
    pub async fn list_devices(&self) -> Result<DeviceList, Error> {
        let mut url = self.segments_url(&["api", "devices"])?;
        url.query_pairs_mut()
            .append_pair("filterconnect", "online")
            .append_pair("filterproducent", PRODUCER_TAG);

        let list: DeviceList = self.get_json(url).await?;
        debug!(devices = list.results.len(), "device list fetched");
        Ok(list)
    }

    /// Fetch the live telemetry of one device.
    ///
    /// `GET /api/devices/{serial}/live`
    pub async fn get_live_data(&self, serial: &str) -> Result<LiveData, Error> {
        let url = self.segments_url(&["api", "devices", serial, "live"])?;
        let live: LiveData = self.get_json(url).await?;
        debug!(serial, fields = live.len(), "live data fetched");
        Ok(live)
    }
}
