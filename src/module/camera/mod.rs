//! Commands every OSC camera implements under the `camera.` prefix.

use tracing::debug;

use super::impl_module;
use crate::error::ensure_ok;
use crate::proto::Parameters;
use crate::{Error, Result};

pub mod proto;

use proto::{cmd, ImageList, Metadata, Session};

impl_module!(Camera);

impl Camera {
    pub fn start_session(&self) -> Result<Session> {
        self.client.run(&cmd::StartSession)?.decode_results()
    }

    pub fn update_session(&self, session_id: impl Into<String>) -> Result<Session> {
        self.client
            .run(&cmd::UpdateSession {
                session_id: session_id.into(),
            })?
            .decode_results()
    }

    pub fn close_session(&self, session_id: impl Into<String>) -> Result<()> {
        self.client.run(&cmd::CloseSession {
            session_id: session_id.into(),
        })?;
        Ok(())
    }

    /// Takes a picture and returns the uri of the stored file.
    pub fn take_picture(&self, session_id: Option<String>) -> Result<String> {
        let resp = self.client.run(&cmd::TakePicture { session_id })?;
        let uri = resp
            .result_str("fileUri")
            .or_else(|| resp.result_str("fileUrl"))
            .ok_or_else(|| Error::InvalidData("takePicture result without fileUri".into()))?;

        debug!(uri, "picture taken");
        Ok(uri.to_owned())
    }

    pub fn list_images(&self, req: &cmd::ListImages) -> Result<ImageList> {
        self.client.run(req)?.decode_results()
    }

    pub fn delete(&self, file_uri: impl Into<String>) -> Result<()> {
        self.client.run(&cmd::Delete {
            file_uri: file_uri.into(),
        })?;
        Ok(())
    }

    /// Downloads a stored image. The body is the raw file content.
    pub fn get_image(&self, file_uri: impl Into<String>, max_size: Option<u32>) -> Result<Vec<u8>> {
        let data = self.client.fetch(&cmd::GetImage {
            file_uri: file_uri.into(),
            max_size,
        })?;

        // an error is reported as a json body even for binary commands
        if let Ok(resp) = crate::proto::CommandResponse::parse(&data) {
            ensure_ok!(resp);
        }

        Ok(data)
    }

    pub fn get_metadata(&self, file_uri: impl Into<String>) -> Result<Metadata> {
        self.client
            .run(&cmd::GetMetadata {
                file_uri: file_uri.into(),
            })?
            .decode_results()
    }

    pub fn get_options<S: Into<String>>(
        &self,
        session_id: Option<String>,
        option_names: impl IntoIterator<Item = S>,
    ) -> Result<Parameters> {
        let resp = self.client.run(&cmd::GetOptions {
            session_id,
            option_names: option_names.into_iter().map(Into::into).collect(),
        })?;

        Ok(resp.result::<Parameters>("options").unwrap_or_default())
    }

    pub fn set_options(&self, session_id: Option<String>, options: Parameters) -> Result<()> {
        self.client.run(&cmd::SetOptions {
            session_id,
            options,
        })?;
        Ok(())
    }
}
