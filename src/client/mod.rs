use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::bounded;
use tracing::{debug, warn};

use crate::{
    error::ensure_ok,
    proto::{CheckForUpdates, Command, CommandResponse, DeviceInfo, Parameters, State},
    Error, Result,
};

mod executor;
mod info;
mod poller;
mod preview;
pub mod transport;

use executor::{Executor, Handler};
use info::InfoCache;
pub use poller::{PollPolicy, DEFAULT_POLL_INTERVAL};
pub use preview::{
    LivePreview, PreviewConfig, PreviewEvent, DEFAULT_CHUNK_SIZE, DEFAULT_IDLE_TIMEOUT,
};
pub use transport::{Http, Reply, ResponseMeta, Transport};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_UPDATES_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_RESPONSE_SIZE: u64 = 64 * 1024 * 1024;

/// Address of a camera's http server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub ip_address: String,
    pub command_port: u16,
}

impl Endpoint {
    pub fn new(ip_address: impl Into<String>, command_port: u16) -> Self {
        Endpoint {
            ip_address: ip_address.into(),
            command_port,
        }
    }

    pub fn url(&self, port: u16, path: &str) -> String {
        if self.ip_address.contains(':') && !self.ip_address.starts_with('[') {
            format!("http://[{}]:{}{}", self.ip_address, port, path)
        } else {
            format!("http://{}:{}{}", self.ip_address, port, path)
        }
    }

    pub fn command_url(&self, path: &str) -> String {
        self.url(self.command_port, path)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Endpoint::new(addr.ip().to_string(), addr.port())
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub poll: PollPolicy,
    /// Deadline for a whole one-shot exchange, and for the response head of
    /// a preview stream.
    pub timeout: Option<Duration>,
    /// Deadline for `checkForUpdates`, which cameras may hold open.
    pub updates_timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub max_response_size: u64,
    pub preview: PreviewConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll: Default::default(),
            timeout: Some(DEFAULT_TIMEOUT),
            updates_timeout: Some(DEFAULT_UPDATES_TIMEOUT),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            preview: Default::default(),
        }
    }
}

/// Client of one camera.
///
/// A client runs one exchange at a time: starting a request cancels the one
/// in flight, whose handler then receives [`Error::Cancelled`]. Live preview
/// streams are tracked separately, one per client.
///
/// Handlers run on worker threads and are called exactly once.
///
/// A blocking http exchange cannot be interrupted. Cancelling hands the
/// handler [`Error::Cancelled`] right away, while the exchange itself runs
/// on in the background until it completes or hits its deadline
/// ([`ClientConfig::timeout`]); its reply is then discarded. Turning the
/// deadline off lets an unresponsive camera hold such exchanges forever.
pub struct Client {
    exec: Arc<Executor>,
    poll: PollPolicy,
    updates_timeout: Option<Duration>,
    preview_cfg: PreviewConfig,
    info: InfoCache,
    preview: Mutex<Option<LivePreview>>,
}

impl Drop for Client {
    fn drop(&mut self) {
        self.stop_live_preview();
        self.exec.cancel();
    }
}

impl Client {
    pub fn new(endpoint: Endpoint) -> Self {
        Self::with_config(endpoint, ClientConfig::default())
    }

    pub fn with_config(endpoint: Endpoint, cfg: ClientConfig) -> Self {
        let transport = Arc::new(Http::new(
            cfg.timeout,
            cfg.connect_timeout,
            cfg.max_response_size,
        ));
        Self::with_transport(endpoint, cfg, transport)
    }

    pub fn with_transport(
        endpoint: Endpoint,
        cfg: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        debug!(?endpoint, "osc client created");
        Client {
            exec: Arc::new(Executor::new(endpoint, transport)),
            poll: cfg.poll,
            updates_timeout: cfg.updates_timeout,
            preview_cfg: cfg.preview,
            info: Default::default(),
            preview: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.exec.endpoint()
    }

    /// Device info, fetched on first call. A failed fetch leaves every field
    /// at its zero value and is not retried.
    pub fn device_info(&self) -> &DeviceInfo {
        self.info.get(&self.exec)
    }

    /// Port serving `checkForUpdates`; the command port when the camera did
    /// not report one.
    pub fn updates_port(&self) -> u16 {
        match self.device_info().endpoints.http_updates_port {
            0 => self.endpoint().command_port,
            port => port,
        }
    }

    /// Cancels the in-flight request, if any.
    pub fn cancel(&self) {
        self.exec.cancel();
    }

    pub fn info<F>(&self, handler: F)
    where
        F: FnOnce(Result<Reply>) + Send + 'static,
    {
        self.exec.dispatch(self.exec.info_request(), Box::new(handler));
    }

    pub fn state<F>(&self, handler: F)
    where
        F: FnOnce(Result<Reply>) + Send + 'static,
    {
        self.exec.dispatch(self.exec.state_request(), Box::new(handler));
    }

    pub fn check_for_updates<F>(&self, fingerprint: &str, handler: F)
    where
        F: FnOnce(Result<Reply>) + Send + 'static,
    {
        let req = self
            .exec
            .check_for_updates_request(self.updates_port(), fingerprint)
            .with_timeout(self.updates_timeout);
        self.exec.dispatch(req, Box::new(handler));
    }

    /// A single status poll; no further polling is done.
    pub fn status<F>(&self, id: &str, handler: F)
    where
        F: FnOnce(Result<Reply>) + Send + 'static,
    {
        self.exec.dispatch(self.exec.status_request(id), Box::new(handler));
    }

    /// Sends `name` once and hands over the first reply, without polling.
    pub fn execute_raw<F>(&self, name: &str, parameters: Option<Parameters>, handler: F)
    where
        F: FnOnce(Result<Reply>) + Send + 'static,
    {
        if name.is_empty() {
            handler(Err(Error::InvalidData("empty command name".into())));
            return;
        }

        self.exec
            .dispatch(self.exec.execute_request(name, parameters), Box::new(handler));
    }

    /// Sends `name` and polls its status until the command is done or failed.
    pub fn execute_and_wait_raw<F>(&self, name: &str, parameters: Option<Parameters>, handler: F)
    where
        F: FnOnce(Result<Reply>) + Send + 'static,
    {
        if name.is_empty() {
            handler(Err(Error::InvalidData("empty command name".into())));
            return;
        }

        let exec = self.exec.clone();
        let policy = self.poll.clone();
        self.exec.dispatch_chained(
            self.exec.execute_request(name, parameters),
            move |chain| -> Handler {
                Box::new(move |first| handler(poller::wait_done(&exec, &policy, chain, first)))
            },
        );
    }

    /// Runs a typed command. Binary commands answer with their first reply,
    /// every other command is polled to completion.
    pub fn execute<C, F>(&self, cmd: &C, handler: F)
    where
        C: Command,
        F: FnOnce(Result<Reply>) + Send + 'static,
    {
        let parameters = match cmd.parameters() {
            Ok(parameters) => parameters,
            Err(e) => return handler(Err(e)),
        };

        if C::BINARY {
            self.execute_raw(C::NAME, parameters, handler);
        } else {
            self.execute_and_wait_raw(C::NAME, parameters, handler);
        }
    }

    /// Opens a live preview stream for `cmd`, replacing any preview already
    /// running on this client. `on_event` receives each frame, then one
    /// [`PreviewEvent::Closed`].
    pub fn live_preview<C, F>(&self, cmd: &C, mut on_event: F)
    where
        C: Command,
        F: FnMut(PreviewEvent) + Send + 'static,
    {
        let parameters = match cmd.parameters() {
            Ok(parameters) => parameters,
            Err(e) => return on_event(PreviewEvent::Closed(Some(e))),
        };

        let mut slot = match self.preview.lock() {
            Ok(slot) => slot,
            Err(_e) => {
                return on_event(PreviewEvent::Closed(Some(Error::Other(
                    "preview slot poisoned".into(),
                ))))
            }
        };

        if let Some(mut prev) = slot.take() {
            debug!("replacing running live preview");
            prev.stop();
        }

        *slot = Some(LivePreview::start(
            self.exec.transport(),
            self.exec.execute_request(C::NAME, parameters),
            self.preview_cfg.clone(),
            on_event,
        ));
    }

    pub fn stop_live_preview(&self) {
        match self.preview.lock() {
            Ok(mut slot) => {
                if let Some(mut preview) = slot.take() {
                    preview.stop();
                }
            }
            Err(_e) => warn!("preview slot poisoned"),
        }
    }

    fn wait_reply(issue: impl FnOnce(Box<dyn FnOnce(Result<Reply>) + Send>)) -> Result<Reply> {
        let (tx, rx) = bounded(1);
        issue(Box::new(move |res| {
            let _ = tx.send(res);
        }));

        rx.recv()
            .map_err(|_e| Error::Other("reply chan broken".into()))?
    }

    /// Runs `cmd` to completion and decodes its response. A command that
    /// ends in the error state is returned as [`Error::Osc`].
    pub fn run<C: Command>(&self, cmd: &C) -> Result<CommandResponse> {
        let reply = Self::wait_reply(|h| self.execute(cmd, h))?;
        let resp = ensure_ok!(CommandResponse::parse(&reply.body)?);
        Ok(resp)
    }

    /// Runs `cmd` and returns the raw body of its final reply.
    pub fn fetch<C: Command>(&self, cmd: &C) -> Result<Vec<u8>> {
        Self::wait_reply(|h| self.execute(cmd, h)).map(|reply| reply.body)
    }

    pub fn camera_state(&self) -> Result<State> {
        let reply = Self::wait_reply(|h| self.state(h))?;
        serde_json::from_slice(&reply.body).map_err(From::from)
    }

    pub fn wait_for_updates(&self, fingerprint: &str) -> Result<CheckForUpdates> {
        let reply = Self::wait_reply(|h| self.check_for_updates(fingerprint, h))?;
        serde_json::from_slice(&reply.body).map_err(From::from)
    }
}
