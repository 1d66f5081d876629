use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{after, bounded, never, select, Receiver, Sender};
use tracing::{debug, trace};

use super::transport::{Request, Transport};
use crate::{proto::mjpeg::FrameDemuxer, Error, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

// chunks read ahead of the demuxer
const FEED_DEPTH: usize = 4;

#[derive(Debug)]
pub enum PreviewEvent {
    Frame(Vec<u8>),
    /// The stream ended. Delivered exactly once, after the last frame; `None`
    /// for a normal close.
    Closed(Option<Error>),
}

#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub chunk_size: usize,
    pub max_buffer: Option<usize>,
    /// Closes the stream with a timed out [`Error::IO`] when no data arrives
    /// for this long.
    pub idle_timeout: Option<Duration>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_buffer: None,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        }
    }
}

enum Feed {
    Chunk(Vec<u8>),
    End(Result<()>),
}

/// Handle to a running live preview. Dropping it stops the stream.
///
/// The body is read on a separate thread, so stopping does not wait for a
/// read to return: the close event is delivered at once and the reader
/// exits on its own when its read comes back.
pub struct LivePreview {
    stop_tx: Option<Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
}

impl Drop for LivePreview {
    fn drop(&mut self) {
        self.stop();
    }
}

impl LivePreview {
    pub(crate) fn start<F>(
        transport: Arc<dyn Transport>,
        req: Request,
        cfg: PreviewConfig,
        mut on_event: F,
    ) -> Self
    where
        F: FnMut(PreviewEvent) + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let (feed_tx, feed_rx) = bounded(FEED_DEPTH);

        let url = req.url.clone();
        let chunk_size = cfg.chunk_size.max(1);
        thread::spawn(move || read_body(transport.as_ref(), &req, chunk_size, feed_tx));

        let join = thread::spawn(move || {
            debug!(url = url.as_str(), "live preview start");
            let res = pump(&feed_rx, &stop_rx, &cfg, &mut on_event);
            debug!(url = url.as_str(), ok = res.is_ok(), "live preview stop");
            on_event(PreviewEvent::Closed(res.err()));
        });

        LivePreview {
            stop_tx: Some(stop_tx),
            join: Some(join),
        }
    }

    /// Stops the stream. It is closed with [`Error::Cancelled`] unless it
    /// had already ended.
    pub fn stop(&mut self) {
        if self.stop_tx.take().is_some() {
            debug!("live preview stop requested");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }

    /// Waits for the final event to be delivered.
    pub fn join(mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Opens the stream and forwards its body in chunks until it ends, fails, or
/// nobody listens anymore.
fn read_body(transport: &dyn Transport, req: &Request, chunk_size: usize, feed: Sender<Feed>) {
    let (meta, mut body) = match transport.open_stream(req) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = feed.send(Feed::End(Err(e)));
            return;
        }
    };

    if !meta.is_success() {
        let mut rest = Vec::new();
        let _ = body.read_to_end(&mut rest);
        let _ = feed.send(Feed::End(Err(Error::Status {
            code: meta.status,
            body: rest,
        })));
        return;
    }

    let mut buf = vec![0u8; chunk_size];
    loop {
        let next = match body.read(&mut buf) {
            Ok(0) => Feed::End(Ok(())),
            Ok(read) => Feed::Chunk(buf[..read].to_vec()),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => Feed::End(Err(e.into())),
        };

        let end = matches!(next, Feed::End(_));
        if feed.send(next).is_err() {
            trace!(url = req.url.as_str(), "preview reader abandoned");
            return;
        }

        if end {
            return;
        }
    }
}

fn pump(
    feed: &Receiver<Feed>,
    stop: &Receiver<()>,
    cfg: &PreviewConfig,
    on_event: &mut impl FnMut(PreviewEvent),
) -> Result<()> {
    let mut demux = FrameDemuxer::with_max_buffer(cfg.max_buffer);
    let mut frames = 0u64;
    loop {
        let idle = cfg.idle_timeout.map_or_else(never, after);
        let chunk = select! {
            recv(stop) -> _ => return Err(Error::Cancelled),
            recv(feed) -> next => match next {
                Ok(Feed::Chunk(chunk)) => chunk,
                Ok(Feed::End(res)) => return res,
                Err(_) => return Err(Error::Other("preview reader gone".into())),
            },
            recv(idle) -> _ => {
                return Err(Error::IO(std::io::Error::new(
                    ErrorKind::TimedOut,
                    "no preview data within the idle timeout",
                )))
            }
        };

        demux.on_chunk(&chunk, |frame| {
            frames += 1;
            trace!(frames, size = frame.len(), "preview frame");
            on_event(PreviewEvent::Frame(frame));
        });
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::unbounded;

    use super::*;
    use crate::client::transport::mock::{gate, Scripted, Step};

    fn preview_url() -> Request {
        Request::post("http://192.168.1.1:80/osc/commands/execute".to_owned(), None)
    }

    fn collect(script: Scripted, cfg: PreviewConfig) -> Vec<PreviewEvent> {
        let (tx, rx) = unbounded();
        let preview = LivePreview::start(
            Arc::new(script),
            preview_url(),
            cfg,
            move |evt| {
                let _ = tx.send(evt);
            },
        );
        preview.join();
        rx.try_iter().collect()
    }

    #[test]
    fn frames_then_close() {
        let events = collect(
            Scripted::new([Step::Stream(vec![
                vec![0xFF, 0xD8, 0xAA],
                vec![0xBB, 0xFF, 0xD9, 0xFF],
                vec![0xD8, 0xCC, 0xFF, 0xD9, 0xFF, 0xD8, 0x01],
            ])]),
            PreviewConfig {
                chunk_size: 2,
                ..Default::default()
            },
        );

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], PreviewEvent::Frame(f) if f == &[0xFF, 0xD8, 0xAA, 0xBB]));
        assert!(matches!(&events[1], PreviewEvent::Frame(f) if f == &[0xFF, 0xD8, 0xCC]));
        // the trailing partial frame is not flushed
        assert!(matches!(&events[2], PreviewEvent::Closed(None)));
    }

    #[test]
    fn open_failure_closes_with_error() {
        let events = collect(Scripted::new([Step::Fail("refused")]), PreviewConfig::default());
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], PreviewEvent::Closed(Some(Error::IO(_)))));
    }

    #[test]
    fn stopped_preview_closes_as_cancelled() {
        let (tx, rx) = unbounded();
        let mut preview = LivePreview::start(
            Arc::new(Scripted::new([Step::Stream(vec![vec![0xFF, 0xD8, 0x01, 0xFF, 0xD9]])])),
            preview_url(),
            PreviewConfig::default(),
            move |evt| {
                let _ = tx.send(evt);
            },
        );
        preview.stop();
        preview.join();

        let events: Vec<_> = rx.try_iter().collect();
        let last = events.last().expect("closed event");
        // stopping may race with the single chunk, but the close is always last
        assert!(matches!(
            last,
            PreviewEvent::Closed(Some(Error::Cancelled)) | PreviewEvent::Closed(None)
        ));
    }

    #[test]
    fn stop_closes_a_stalled_stream() {
        let (stall_tx, stall_rx) = gate();
        let (tx, rx) = unbounded();
        let mut preview = LivePreview::start(
            Arc::new(Scripted::new([Step::Stalled(
                vec![vec![0xFF, 0xD8, 0x01, 0xFF, 0xD9]],
                stall_rx,
            )])),
            preview_url(),
            PreviewConfig {
                idle_timeout: None,
                ..Default::default()
            },
            move |evt| {
                let _ = tx.send(evt);
            },
        );

        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(2)).expect("frame"),
            PreviewEvent::Frame(_)
        ));

        // the reader is now blocked and never returns on its own
        preview.stop();
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(2)).expect("close after stop"),
            PreviewEvent::Closed(Some(Error::Cancelled))
        ));

        preview.join();
        assert!(rx.try_recv().is_err());
        drop(stall_tx);
    }

    #[test]
    fn idle_stream_times_out() {
        let (stall_tx, stall_rx) = gate();
        let (tx, rx) = unbounded();
        let _preview = LivePreview::start(
            Arc::new(Scripted::new([Step::Stalled(Vec::new(), stall_rx)])),
            preview_url(),
            PreviewConfig {
                idle_timeout: Some(Duration::from_millis(50)),
                ..Default::default()
            },
            move |evt| {
                let _ = tx.send(evt);
            },
        );

        match rx.recv_timeout(Duration::from_secs(2)).expect("close") {
            PreviewEvent::Closed(Some(Error::IO(e))) => assert_eq!(e.kind(), ErrorKind::TimedOut),
            other => panic!("unexpected event {:?}", other),
        }
        drop(stall_tx);
    }
}
