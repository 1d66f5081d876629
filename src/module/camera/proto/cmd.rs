use serde::Serialize;

use crate::proto::{impl_osc_cmd, Parameters};

#[derive(Debug, Default, Serialize)]
pub struct StartSession;

impl_osc_cmd!(StartSession, "camera.startSession");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSession {
    pub session_id: String,
}

impl_osc_cmd!(UpdateSession, "camera.updateSession");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseSession {
    pub session_id: String,
}

impl_osc_cmd!(CloseSession, "camera.closeSession");

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TakePicture {
    // not needed from api level 2 on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl_osc_cmd!(TakePicture, "camera.takePicture");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListImages {
    pub entry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_thumb: Option<bool>,
}

impl ListImages {
    pub fn new(entry_count: u32) -> Self {
        ListImages {
            entry_count,
            max_size: None,
            continuation_token: None,
            include_thumb: None,
        }
    }
}

impl_osc_cmd!(ListImages, "camera.listImages");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delete {
    pub file_uri: String,
}

impl_osc_cmd!(Delete, "camera.delete");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetImage {
    pub file_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u32>,
}

impl_osc_cmd!(GetImage, "camera.getImage", binary);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMetadata {
    pub file_uri: String,
}

impl_osc_cmd!(GetMetadata, "camera.getMetadata");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub option_names: Vec<String>,
}

impl_osc_cmd!(GetOptions, "camera.getOptions");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub options: Parameters,
}

impl_osc_cmd!(SetOptions, "camera.setOptions");
