//! RICOH THETA vendor extensions, the `camera._` commands and the
//! thumbnail flavour of `camera.getImage`.

use tracing::{debug, warn};

use super::camera::proto::ImageList;
use super::impl_module;
use crate::client::PreviewEvent;
use crate::error::ensure_ok;
use crate::proto::CommandResponse;
use crate::util::chan::{self, Rx};
use crate::Result;

pub mod proto;

use proto::cmd::{self, CaptureMode, ImageType};

impl_module!(Theta);

impl Theta {
    pub fn get_image(&self, file_uri: impl Into<String>, image_type: Option<ImageType>) -> Result<Vec<u8>> {
        let data = self.client.fetch(&cmd::GetImage {
            file_uri: file_uri.into(),
            image_type,
        })?;

        if let Ok(resp) = CommandResponse::parse(&data) {
            ensure_ok!(resp);
        }

        Ok(data)
    }

    /// Starts the motion jpeg preview and hands out the decoded frames. The
    /// stream replaces any preview already running on the client and ends
    /// with a single `Closed` event.
    pub fn live_preview(&self, session_id: Option<String>) -> Rx<PreviewEvent> {
        let (tx, rx) = chan::unbounded();
        self.client
            .live_preview(&cmd::GetLivePreview { session_id }, move |ev| {
                if tx.send(ev).is_err() {
                    debug!("preview receiver gone, frame dropped");
                }
            });

        rx
    }

    pub fn stop_live_preview(&self) {
        self.client.stop_live_preview();
    }

    pub fn finish_wlan(&self, session_id: Option<String>) -> Result<()> {
        self.client.run(&cmd::FinishWlan { session_id })?;
        Ok(())
    }

    pub fn start_capture(&self, session_id: Option<String>, mode: Option<CaptureMode>) -> Result<()> {
        self.client.run(&cmd::StartCapture { session_id, mode })?;
        Ok(())
    }

    /// Stops a continuous capture and returns the uris of the files it
    /// produced.
    pub fn stop_capture(&self, session_id: Option<String>) -> Result<Vec<String>> {
        let resp = self.client.run(&cmd::StopCapture { session_id })?;
        match resp.result::<Vec<String>>("fileUrls") {
            Some(uris) => Ok(uris),
            None => {
                if resp.results.is_some() {
                    warn!(name = %resp.name, "stopCapture result without fileUrls");
                }
                Ok(Vec::new())
            }
        }
    }

    pub fn list_all(&self, req: &cmd::ListAll) -> Result<ImageList> {
        self.client.run(req)?.decode_results()
    }

    pub fn stop_self_timer(&self) -> Result<()> {
        self.client.run(&cmd::StopSelfTimer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::client::transport::mock::{json, Scripted, Step};
    use crate::client::{Client, ClientConfig, Endpoint, PollPolicy};

    fn theta(steps: Vec<Step>) -> (Arc<Scripted>, Theta) {
        let script = Arc::new(Scripted::new(steps));
        let cfg = ClientConfig {
            poll: PollPolicy {
                interval: Duration::from_millis(5),
                max_polls: None,
            },
            ..Default::default()
        };
        let client = Client::with_transport(Endpoint::new("192.168.1.1", 80), cfg, script.clone());
        (script, Theta::new(Arc::new(client)))
    }

    #[test]
    fn live_preview_delivers_frames_through_channel() {
        let (script, theta) = theta(vec![Step::Stream(vec![
            vec![0x00, 0xFF, 0xD8, 0x01],
            vec![0x02, 0xFF, 0xD9, 0xFF, 0xD8],
            vec![0x03, 0xFF, 0xD9],
        ])]);

        let rx = theta.live_preview(None);
        let mut frames = Vec::new();
        loop {
            match rx.recv_timeout(Duration::from_secs(5)).expect("preview event") {
                Some(PreviewEvent::Frame(frame)) => frames.push(frame),
                Some(PreviewEvent::Closed(reason)) => {
                    assert!(reason.is_none(), "{:?}", reason);
                    break;
                }
                None => panic!("channel closed before the close event"),
            }
        }

        assert_eq!(frames, vec![vec![0xFF, 0xD8, 0x01, 0x02], vec![0xFF, 0xD8, 0x03]]);

        let sent: serde_json::Value =
            serde_json::from_slice(script.requests()[0].body.as_deref().expect("body")).expect("json body");
        assert_eq!(sent, serde_json::json!({ "name": "camera._getLivePreview", "parameters": {} }));
    }

    #[test]
    fn stop_capture_collects_file_urls() {
        let (_script, theta) = theta(vec![
            Step::Reply(json(r#"{"name":"camera._stopCapture","state":"inProgress","id":"3"}"#)),
            Step::Reply(json(
                r#"{"name":"camera._stopCapture","state":"done","results":{"fileUrls":["a.JPG","b.JPG"]}}"#,
            )),
        ]);

        assert_eq!(theta.stop_capture(None).expect("stop capture"), vec!["a.JPG", "b.JPG"]);
    }

    #[test]
    fn list_all_accepts_file_url_entries() {
        let (_script, theta) = theta(vec![Step::Reply(json(
            r#"{"name":"camera._listAll","state":"done","results":{"entries":[{"name":"R0010015.JPG","fileUrl":"http://192.168.1.1/files/R0010015.JPG","size":10}],"totalEntries":1}}"#,
        ))]);

        let list = theta
            .list_all(&cmd::ListAll {
                entry_count: 10,
                continuation_token: None,
                detail: None,
            })
            .expect("list all");
        assert_eq!(list.entries[0].uri, "http://192.168.1.1/files/R0010015.JPG");
        assert_eq!(list.total_entries, 1);
    }
}
