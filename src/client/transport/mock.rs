use std::collections::VecDeque;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use super::{BodyStream, Reply, Request, ResponseMeta, Transport};
use crate::{Error, Result};

pub(crate) enum Step {
    Reply(Reply),
    Delayed(Duration, Reply),
    /// Blocks until the gate sender sends or is dropped, or until the
    /// request's own timeout runs out.
    Gated(Receiver<()>, Reply),
    Fail(&'static str),
    Stream(Vec<Vec<u8>>),
    /// Yields the chunks, then blocks reading until the gate opens.
    Stalled(Vec<Vec<u8>>, Receiver<()>),
}

/// Answers requests from a script, in order, and records what was asked.
#[derive(Default)]
pub(crate) struct Scripted {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<Request>>,
    finished: AtomicUsize,
}

impl Scripted {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Scripted {
            steps: Mutex::new(steps.into_iter().collect()),
            requests: Default::default(),
            finished: Default::default(),
        }
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| {
                let path_at = r.url.find("/osc").unwrap_or(0);
                r.url[path_at..].to_owned()
            })
            .collect()
    }

    /// Number of one-shot sends that have returned.
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    fn next(&self, req: &Request) -> Option<Step> {
        self.requests.lock().expect("requests lock").push(req.clone());
        self.steps.lock().expect("steps lock").pop_front()
    }
}

pub(crate) fn json(body: &str) -> Reply {
    with_status(200, body)
}

pub(crate) fn with_status(status: u16, body: &str) -> Reply {
    Reply {
        body: body.as_bytes().to_vec(),
        meta: ResponseMeta {
            status,
            content_type: Some("application/json; charset=utf-8".to_owned()),
        },
    }
}

pub(crate) fn gate() -> (Sender<()>, Receiver<()>) {
    crossbeam_channel::bounded(0)
}

fn timed_out() -> Error {
    Error::IO(std::io::Error::new(std::io::ErrorKind::TimedOut, "scripted timeout"))
}

impl Scripted {
    fn answer(&self, req: &Request) -> Result<Reply> {
        match self.next(req) {
            Some(Step::Reply(reply)) => Ok(reply),
            Some(Step::Delayed(delay, reply)) => {
                std::thread::sleep(delay);
                Ok(reply)
            }
            Some(Step::Gated(gate, reply)) => match req.timeout {
                Some(timeout) => match gate.recv_timeout(timeout) {
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(timed_out()),
                    _ => Ok(reply),
                },
                None => {
                    let _ = gate.recv();
                    Ok(reply)
                }
            },
            Some(Step::Fail(msg)) => Err(Error::IO(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                msg,
            ))),
            Some(Step::Stream(_)) | Some(Step::Stalled(..)) => {
                Err(Error::Other("stream step for one-shot request".into()))
            }
            None => Err(Error::Other("script exhausted".into())),
        }
    }
}

impl Transport for Scripted {
    fn send(&self, req: &Request) -> Result<Reply> {
        let res = self.answer(req);
        self.finished.fetch_add(1, Ordering::SeqCst);
        res
    }

    fn open_stream(&self, req: &Request) -> Result<(ResponseMeta, BodyStream)> {
        match self.next(req) {
            Some(Step::Stream(chunks)) => Ok((stream_meta(), Box::new(Chunked::new(chunks, None)))),
            Some(Step::Stalled(chunks, gate)) => {
                Ok((stream_meta(), Box::new(Chunked::new(chunks, Some(gate)))))
            }
            Some(Step::Fail(msg)) => Err(Error::IO(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                msg,
            ))),
            _ => Err(Error::Other("no stream scripted".into())),
        }
    }
}

fn stream_meta() -> ResponseMeta {
    ResponseMeta {
        status: 200,
        content_type: Some("multipart/x-mixed-replace".to_owned()),
    }
}

/// Yields at most one scripted chunk per read.
struct Chunked {
    chunks: VecDeque<Cursor<Vec<u8>>>,
    stall: Option<Receiver<()>>,
}

impl Chunked {
    fn new(chunks: Vec<Vec<u8>>, stall: Option<Receiver<()>>) -> Self {
        Chunked {
            chunks: chunks.into_iter().map(Cursor::new).collect(),
            stall,
        }
    }
}

impl Read for Chunked {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while let Some(front) = self.chunks.front_mut() {
            let read = front.read(buf)?;
            if read > 0 {
                return Ok(read);
            }
            self.chunks.pop_front();
        }

        if let Some(gate) = self.stall.take() {
            let _ = gate.recv();
        }

        Ok(0)
    }
}
