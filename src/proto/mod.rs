use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{util::macros::impl_str_enums, Error, Result};

pub mod info;
pub mod mjpeg;

pub use info::{DeviceInfo, Endpoints};

pub type Parameters = Map<String, Value>;

pub const PATH_INFO: &str = "/osc/info";
pub const PATH_STATE: &str = "/osc/state";
pub const PATH_CHECK_FOR_UPDATES: &str = "/osc/checkForUpdates";
pub const PATH_EXECUTE: &str = "/osc/commands/execute";
pub const PATH_STATUS: &str = "/osc/commands/status";

impl_str_enums!(
    /// Execution progress of a command. `InProgress` is the only non-terminal
    /// state.
    CommandState,
    InProgress = "inProgress",
    Done = "done",
    Error = "error",
);

impl CommandState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CommandState::InProgress)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ErrorCode {
    UnknownCommand,
    DisabledCommand,
    MissingParameter,
    InvalidParameterName,
    InvalidSessionId,
    InvalidParameterValue,
    CorruptedFile,
    CameraInExclusiveUse,
    PowerOffSequenceRunning,
    InvalidFileFormat,
    ServiceUnavailable,
    CanceledShooting,
    #[default]
    Unexpected,
    /// A vendor specific code outside of the standard set.
    Other(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::UnknownCommand => "unknownCommand",
            ErrorCode::DisabledCommand => "disabledCommand",
            ErrorCode::MissingParameter => "missingParameter",
            ErrorCode::InvalidParameterName => "invalidParameterName",
            ErrorCode::InvalidSessionId => "invalidSessionId",
            ErrorCode::InvalidParameterValue => "invalidParameterValue",
            ErrorCode::CorruptedFile => "corruptedFile",
            ErrorCode::CameraInExclusiveUse => "cameraInExclusiveUse",
            ErrorCode::PowerOffSequenceRunning => "powerOffSequenceRunning",
            ErrorCode::InvalidFileFormat => "invalidFileFormat",
            ErrorCode::ServiceUnavailable => "serviceUnavailable",
            ErrorCode::CanceledShooting => "canceledShooting",
            ErrorCode::Unexpected => "unexpected",
            ErrorCode::Other(code) => code.as_str(),
        }
    }

    /// The http status a camera answers with alongside this code.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ErrorCode::UnknownCommand
            | ErrorCode::MissingParameter
            | ErrorCode::InvalidParameterName
            | ErrorCode::InvalidParameterValue
            | ErrorCode::CameraInExclusiveUse => Some(400),

            ErrorCode::DisabledCommand
            | ErrorCode::InvalidSessionId
            | ErrorCode::CorruptedFile
            | ErrorCode::PowerOffSequenceRunning
            | ErrorCode::InvalidFileFormat
            | ErrorCode::CanceledShooting => Some(403),

            ErrorCode::ServiceUnavailable | ErrorCode::Unexpected => Some(503),

            ErrorCode::Other(_) => None,
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "unknownCommand" => ErrorCode::UnknownCommand,
            "disabledCommand" => ErrorCode::DisabledCommand,
            "missingParameter" => ErrorCode::MissingParameter,
            "invalidParameterName" => ErrorCode::InvalidParameterName,
            "invalidSessionId" => ErrorCode::InvalidSessionId,
            "invalidParameterValue" => ErrorCode::InvalidParameterValue,
            "corruptedFile" => ErrorCode::CorruptedFile,
            "cameraInExclusiveUse" => ErrorCode::CameraInExclusiveUse,
            "powerOffSequenceRunning" => ErrorCode::PowerOffSequenceRunning,
            "invalidFileFormat" => ErrorCode::InvalidFileFormat,
            "serviceUnavailable" => ErrorCode::ServiceUnavailable,
            "canceledShooting" => ErrorCode::CanceledShooting,
            "unexpected" => ErrorCode::Unexpected,
            other => ErrorCode::Other(other.to_owned()),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(ErrorCode::from(raw.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandError {
    pub code: ErrorCode,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub completion: f64,
}

/// Body of an `execute` or `status` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub name: String,
    pub state: CommandState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Parameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
}

impl CommandResponse {
    pub fn parse(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(From::from)
    }

    pub fn result<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.results
            .as_ref()
            .and_then(|r| r.get(key))
            .and_then(|v| T::deserialize(v).ok())
    }

    /// Decodes the whole `results` object, an absent object decodes from `{}`.
    pub fn decode_results<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.results {
            Some(results) => Ok(T::deserialize(&Value::Object(results.clone()))?),
            None => Ok(T::deserialize(&Value::Object(Parameters::new()))?),
        }
    }

    pub fn result_str(&self, key: &str) -> Option<&str> {
        self.results
            .as_ref()
            .and_then(|r| r.get(key))
            .and_then(Value::as_str)
    }
}

/// Body of a `/osc/state` reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub fingerprint: String,
    #[serde(default)]
    pub state: Parameters,
}

/// Body of a `/osc/checkForUpdates` reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckForUpdates {
    pub state_fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttle_timeout: Option<u64>,
}

/// The minimal view of a command reply needed to drive completion polling.
#[derive(Debug, Deserialize)]
pub(crate) struct CommandHead {
    pub state: CommandState,
    #[serde(default)]
    pub id: Option<String>,
}

impl CommandHead {
    pub fn peek(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }
}

pub trait Command {
    const NAME: &'static str;

    /// Binary commands answer with raw bytes rather than a command response,
    /// so they are never polled.
    const BINARY: bool = false;

    fn parameters(&self) -> Result<Option<Parameters>>;
}

pub fn to_parameters<T: Serialize>(cmd: &T) -> Result<Option<Parameters>> {
    match serde_json::to_value(cmd)? {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        other => Err(Error::InvalidData(
            format!("command parameters must be an object, got {}", other).into(),
        )),
    }
}

pub(crate) fn execute_body(name: &str, parameters: Option<Parameters>) -> Vec<u8> {
    let mut object = Map::new();
    object.insert("name".to_owned(), Value::String(name.to_owned()));
    if let Some(parameters) = parameters {
        object.insert("parameters".to_owned(), Value::Object(parameters));
    }

    Value::Object(object).to_string().into_bytes()
}

pub(crate) fn status_body(id: &str) -> Vec<u8> {
    serde_json::json!({ "id": id }).to_string().into_bytes()
}

pub(crate) fn check_for_updates_body(fingerprint: &str) -> Vec<u8> {
    serde_json::json!({ "stateFingerprint": fingerprint })
        .to_string()
        .into_bytes()
}

macro_rules! impl_osc_cmd {
    ($name:ident, $cmd:literal) => {
        impl $crate::proto::Command for $name {
            const NAME: &'static str = $cmd;

            fn parameters(&self) -> $crate::Result<Option<$crate::proto::Parameters>> {
                $crate::proto::to_parameters(self)
            }
        }
    };

    ($name:ident, $cmd:literal, binary) => {
        impl $crate::proto::Command for $name {
            const NAME: &'static str = $cmd;
            const BINARY: bool = true;

            fn parameters(&self) -> $crate::Result<Option<$crate::proto::Parameters>> {
                $crate::proto::to_parameters(self)
            }
        }
    };
}

pub(crate) use impl_osc_cmd;
