use serde::Deserialize;

use crate::proto::Parameters;

pub mod cmd;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    /// Seconds until the session expires.
    #[serde(default)]
    pub timeout: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageEntry {
    pub name: String,
    #[serde(alias = "fileUrl")]
    pub uri: String,
    pub size: u64,
    pub date_time_zone: String,
    pub width: u32,
    pub height: u32,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageList {
    pub entries: Vec<ImageEntry>,
    pub total_entries: u32,
    pub continuation_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub exif: Parameters,
    pub xmp: Parameters,
}
