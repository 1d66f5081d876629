use std::borrow::Cow;
use std::fmt;

use crate::proto::CommandError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    Http(ureq::Error),
    Json(serde_json::Error),
    Status {
        code: u16,
        body: Vec<u8>,
    },
    /// The request was preempted by a newer one on the same client, or
    /// cancelled explicitly.
    Cancelled,
    Osc(CommandError),
    PollLimit {
        polls: usize,
    },
    InvalidData(Cow<'static, str>),
    Other(Cow<'static, str>),
}

impl Error {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IO(e) => write!(f, "io: {}", e),
            Error::Http(e) => write!(f, "http: {}", e),
            Error::Json(e) => write!(f, "json: {}", e),
            Error::Status { code, body } => {
                write!(f, "unexpected http status {} ({} bytes)", code, body.len())
            }
            Error::Cancelled => f.write_str("request cancelled"),
            Error::Osc(e) => write!(f, "osc error {}: {}", e.code, e.message),
            Error::PollLimit { polls } => write!(f, "command still in progress after {} polls", polls),
            Error::InvalidData(msg) => write!(f, "invalid data: {}", msg),
            Error::Other(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IO(e)
    }
}

impl From<ureq::Error> for Error {
    fn from(e: ureq::Error) -> Self {
        Self::Http(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

macro_rules! ensure_ok {
    ($resp:expr) => {{
        let mut resp: $crate::proto::CommandResponse = $resp;
        if resp.state == $crate::proto::CommandState::Error {
            return Err($crate::Error::Osc(resp.error.take().unwrap_or_default()));
        }

        resp
    }};
}

pub(crate) use ensure_ok;
