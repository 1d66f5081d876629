use std::sync::OnceLock;

use tracing::{debug, warn};

use super::executor::Executor;
use crate::proto::DeviceInfo;

/// Device info, fetched on first access and kept for the client's lifetime.
#[derive(Default)]
pub(crate) struct InfoCache {
    cell: OnceLock<DeviceInfo>,
}

impl InfoCache {
    /// Returns the cached info, fetching it first if needed. Concurrent first
    /// callers wait on the same fetch.
    pub fn get(&self, exec: &Executor) -> &DeviceInfo {
        self.cell.get_or_init(|| fetch(exec))
    }

    pub fn peek(&self) -> Option<&DeviceInfo> {
        self.cell.get()
    }
}

fn fetch(exec: &Executor) -> DeviceInfo {
    let reply = match exec.call(exec.info_request()) {
        Ok(reply) => reply,
        Err(e) => {
            warn!("fetch device info: {}", e);
            return DeviceInfo::default();
        }
    };

    match serde_json::from_slice(&reply.body) {
        Ok(v) => {
            let info = DeviceInfo::from_value(&v);
            debug!(
                model = info.model.as_str(),
                firmware = info.firmware_version.as_str(),
                "device info fetched"
            );
            info
        }

        Err(e) => {
            warn!("malformed device info: {}", e);
            DeviceInfo::default()
        }
    }
}
