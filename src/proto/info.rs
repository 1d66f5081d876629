use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoints {
    pub http_port: u16,
    pub http_updates_port: u16,
}

/// Static capabilities reported by `/osc/info`.
///
/// Every field falls back to its zero value when the camera omits it or sends
/// it with an unexpected type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
    pub support_url: String,
    pub endpoints: Endpoints,
    pub gps: bool,
    pub gyro: bool,
    pub uptime: u64,
    pub api: Vec<String>,
    pub api_level: Vec<u8>,
}

impl DeviceInfo {
    pub fn from_value(v: &Value) -> Self {
        let endpoints = v
            .get("endpoints")
            .map(|e| Endpoints {
                http_port: port(e, "httpPort"),
                http_updates_port: port(e, "httpUpdatesPort"),
            })
            .unwrap_or_default();

        DeviceInfo {
            manufacturer: string(v, "manufacturer"),
            model: string(v, "model"),
            serial_number: string(v, "serialNumber"),
            firmware_version: string(v, "firmwareVersion"),
            support_url: string(v, "supportUrl"),
            endpoints,
            gps: v.get("gps").and_then(Value::as_bool).unwrap_or_default(),
            gyro: v.get("gyro").and_then(Value::as_bool).unwrap_or_default(),
            uptime: v.get("uptime").and_then(Value::as_u64).unwrap_or_default(),
            api: v
                .get("api")
                .and_then(Value::as_array)
                .map(|api| {
                    api.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
            api_level: v
                .get("apiLevel")
                .and_then(Value::as_array)
                .map(|levels| {
                    levels
                        .iter()
                        .filter_map(Value::as_u64)
                        .filter_map(|l| u8::try_from(l).ok())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn supports(&self, path: &str) -> bool {
        self.api.iter().any(|a| a == path)
    }
}

fn string(v: &Value, key: &str) -> String {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default()
}

fn port(v: &Value, key: &str) -> u16 {
    v.get(key)
        .and_then(Value::as_u64)
        .and_then(|p| u16::try_from(p).ok())
        .unwrap_or_default()
}
