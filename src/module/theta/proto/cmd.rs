use serde::Serialize;

use crate::proto::impl_osc_cmd;
use crate::util::macros::impl_str_enums;

impl_str_enums!(
    /// Rendition returned by `camera.getImage`.
    ImageType,
    Full = "full",
    Thumb = "thumb",
);

impl_str_enums!(
    CaptureMode,
    Interval = "interval",
    Composite = "composite",
    Bracket = "bracket",
    TimeShift = "timeShift",
);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetImage {
    pub file_uri: String,
    #[serde(rename = "_type", skip_serializing_if = "Option::is_none")]
    pub image_type: Option<ImageType>,
}

impl_osc_cmd!(GetImage, "camera.getImage", binary);

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLivePreview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl_osc_cmd!(GetLivePreview, "camera._getLivePreview", binary);

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishWlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl_osc_cmd!(FinishWlan, "camera._finishWlan");

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCapture {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(rename = "_mode", skip_serializing_if = "Option::is_none")]
    pub mode: Option<CaptureMode>,
}

impl_osc_cmd!(StartCapture, "camera._startCapture");

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopCapture {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl_osc_cmd!(StopCapture, "camera._stopCapture");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAll {
    pub entry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<bool>,
}

impl_osc_cmd!(ListAll, "camera._listAll");

#[derive(Debug, Default, Serialize)]
pub struct StopSelfTimer;

impl_osc_cmd!(StopSelfTimer, "camera._stopSelfTimer");
