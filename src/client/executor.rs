use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError};
use tracing::{debug, trace, warn};

use super::{
    transport::{Reply, Request, Transport},
    Endpoint,
};
use crate::{
    proto::{self, CommandHead, CommandState, Parameters},
    Error, Result,
};

pub type Handler = Box<dyn FnOnce(Result<Reply>) + Send + 'static>;

/// The exchange currently owning a client. Every request belongs to a chain:
/// a top-level call starts a new chain, and the status polls issued on its
/// behalf continue it.
struct InFlight {
    chain: u64,
    cancel_tx: Option<Sender<()>>,
}

impl InFlight {
    fn cancel(&mut self) {
        if self.cancel_tx.take().is_some() {
            debug!(chain = self.chain, "in-flight request cancelled");
        }
    }

    fn is_live(&self, chain: u64) -> bool {
        self.chain == chain && self.cancel_tx.is_some()
    }
}

pub(crate) struct Executor {
    endpoint: Endpoint,
    transport: Arc<dyn Transport>,
    chain_seq: AtomicU64,
    current: Mutex<Option<InFlight>>,
}

impl Drop for Executor {
    fn drop(&mut self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(inflight) = current.as_mut() {
                inflight.cancel();
            }
        }
    }
}

impl Executor {
    pub fn new(endpoint: Endpoint, transport: Arc<dyn Transport>) -> Self {
        Executor {
            endpoint,
            transport,
            chain_seq: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    fn current(&self) -> Result<MutexGuard<'_, Option<InFlight>>> {
        self.current
            .lock()
            .map_err(|_e| Error::Other("in-flight slot poisoned".into()))
    }

    /// Starts a new chain, cancelling whatever the client was doing.
    pub fn dispatch(&self, req: Request, handler: Handler) -> u64 {
        self.dispatch_chained(req, move |_chain| handler)
    }

    /// Like [`Executor::dispatch`], for handlers that need to know their
    /// chain to continue it.
    pub fn dispatch_chained(&self, req: Request, make: impl FnOnce(u64) -> Handler) -> u64 {
        let chain = self.chain_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let handler = make(chain);
        let (cancel_tx, cancel_rx) = bounded(0);

        match self.current() {
            Ok(mut current) => {
                if let Some(mut prev) = current.replace(InFlight {
                    chain,
                    cancel_tx: Some(cancel_tx),
                }) {
                    prev.cancel();
                }
            }

            Err(e) => {
                handler(Err(e));
                return chain;
            }
        }

        self.spawn(chain, req, cancel_rx, handler);
        chain
    }

    /// Continues `chain` with another request. Fails with
    /// [`Error::Cancelled`] if the chain has been preempted or cancelled.
    pub fn dispatch_in_chain(&self, chain: u64, req: Request, handler: Handler) {
        let (cancel_tx, cancel_rx) = bounded(0);

        let continued = match self.current() {
            Ok(mut current) => match current.as_mut() {
                Some(inflight) if inflight.is_live(chain) => {
                    inflight.cancel_tx = Some(cancel_tx);
                    Ok(())
                }
                _ => Err(Error::Cancelled),
            },
            Err(e) => Err(e),
        };

        match continued {
            Ok(()) => self.spawn(chain, req, cancel_rx, handler),
            Err(e) => {
                debug!(chain, "chain no longer current");
                handler(Err(e));
            }
        }
    }

    pub fn call(&self, req: Request) -> Result<Reply> {
        let (tx, rx) = bounded(1);
        self.dispatch(req, reply_to(tx));
        wait_reply(rx)
    }

    pub fn call_in_chain(&self, chain: u64, req: Request) -> Result<Reply> {
        let (tx, rx) = bounded(1);
        self.dispatch_in_chain(chain, req, reply_to(tx));
        wait_reply(rx)
    }

    /// Cancels the in-flight request, if any. Cancelling twice, or after the
    /// request finished, does nothing.
    pub fn cancel(&self) {
        match self.current() {
            Ok(mut current) => {
                if let Some(inflight) = current.as_mut() {
                    inflight.cancel();
                }
            }
            Err(e) => warn!("cancel: {}", e),
        }
    }

    fn spawn(&self, chain: u64, req: Request, cancel_rx: Receiver<()>, handler: Handler) {
        let transport = self.transport.clone();
        thread::spawn(move || {
            let url = req.url.clone();
            let (resp_tx, resp_rx) = bounded(1);
            thread::spawn(move || {
                let _ = resp_tx.send(transport.send(&req));
            });

            trace!(chain, url = url.as_str(), "request sent");
            let res = select! {
                recv(resp_rx) -> res => {
                    res.unwrap_or_else(|_e| Err(Error::Other("transport worker gone".into())))
                }
                recv(cancel_rx) -> _ => Err(Error::Cancelled),
            };

            // a cancel racing with the reply still wins
            let res = match cancel_rx.try_recv() {
                Err(TryRecvError::Disconnected) => Err(Error::Cancelled),
                _ => res.and_then(check_status),
            };

            match &res {
                Ok(reply) => trace!(chain, url = url.as_str(), status = reply.meta.status, "request done"),
                Err(e) if e.is_cancelled() => debug!(chain, url = url.as_str(), "request preempted"),
                Err(e) => debug!(chain, url = url.as_str(), "request failed: {}", e),
            }

            handler(res);
        });
    }

    pub fn execute_request(&self, name: &str, parameters: Option<Parameters>) -> Request {
        Request::post(
            self.endpoint.command_url(proto::PATH_EXECUTE),
            Some(proto::execute_body(name, parameters)),
        )
    }

    pub fn status_request(&self, id: &str) -> Request {
        Request::post(
            self.endpoint.command_url(proto::PATH_STATUS),
            Some(proto::status_body(id)),
        )
    }

    pub fn info_request(&self) -> Request {
        Request::get(self.endpoint.command_url(proto::PATH_INFO))
    }

    pub fn state_request(&self) -> Request {
        Request::post(self.endpoint.command_url(proto::PATH_STATE), None)
    }

    pub fn check_for_updates_request(&self, updates_port: u16, fingerprint: &str) -> Request {
        Request::post(
            self.endpoint.url(updates_port, proto::PATH_CHECK_FOR_UPDATES),
            Some(proto::check_for_updates_body(fingerprint)),
        )
    }
}

fn reply_to(tx: Sender<Result<Reply>>) -> Handler {
    Box::new(move |res| {
        if tx.send(res).is_err() {
            warn!("reply chan broken");
        }
    })
}

fn wait_reply(rx: Receiver<Result<Reply>>) -> Result<Reply> {
    rx.recv()
        .map_err(|_e| Error::Other("reply chan broken".into()))?
}

/// Cameras answer command errors with 4xx/5xx statuses; those replies still
/// carry a command response and are handed on as such.
fn check_status(reply: Reply) -> Result<Reply> {
    if reply.meta.is_success() {
        return Ok(reply);
    }

    match CommandHead::peek(&reply.body) {
        Some(head) if head.state == CommandState::Error => Ok(reply),
        _ => Err(Error::Status {
            code: reply.meta.status,
            body: reply.body,
        }),
    }
}
