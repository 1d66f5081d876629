use tracing::{trace, warn};

pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

// a frame needs at least a start and an end marker
const MIN_FRAME_SPAN: usize = JPEG_SOI.len() + JPEG_EOI.len();

/// Splits a live preview byte stream into JPEG frames.
///
/// Frames are cut from a start marker up to, but not including, the next end
/// marker. Bytes are kept across chunks until a complete frame is seen, so the
/// output does not depend on how the stream was chunked.
#[derive(Debug, Default)]
pub struct FrameDemuxer {
    buf: Vec<u8>,
    soi: Option<usize>,
    // position the next marker search resumes from
    cursor: usize,
    max_buffer: Option<usize>,
}

impl FrameDemuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the pending buffer. Without a cap a stream that never closes a
    /// frame grows the buffer without bound.
    pub fn with_max_buffer(max_buffer: Option<usize>) -> Self {
        Self {
            max_buffer,
            ..Default::default()
        }
    }

    /// Number of bytes held back waiting for the rest of a frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Appends a chunk and emits every frame completed by it, in stream order.
    pub fn on_chunk(&mut self, chunk: &[u8], mut emit: impl FnMut(Vec<u8>)) {
        self.buf.extend_from_slice(chunk);

        while self.buf.len() >= MIN_FRAME_SPAN {
            let start = match self.soi {
                Some(start) => start,
                None => match find(&self.buf, self.cursor, JPEG_SOI) {
                    Some(start) => {
                        self.soi = Some(start);
                        self.cursor = start + JPEG_SOI.len();
                        start
                    }

                    None => {
                        // the last byte may be the first half of a marker
                        self.cursor = self.buf.len() - 1;
                        break;
                    }
                },
            };

            let end = match find(&self.buf, self.cursor, JPEG_EOI) {
                Some(end) => end,
                None => {
                    self.cursor = (self.buf.len() - 1).max(start + JPEG_SOI.len());
                    break;
                }
            };

            trace!(start, end, "jpeg frame found");
            emit(self.buf[start..end].to_vec());

            self.buf.drain(..end + JPEG_EOI.len());
            self.soi = None;
            self.cursor = 0;
        }

        self.enforce_cap();
    }

    fn enforce_cap(&mut self) {
        let cap = match self.max_buffer {
            Some(cap) if self.buf.len() > cap => cap,
            _ => return,
        };

        if let Some(start) = self.soi.filter(|s| *s > 0) {
            self.buf.drain(..start);
            self.soi = Some(0);
            self.cursor -= start;
        }

        if self.buf.len() <= cap {
            return;
        }

        // the pending frame lost its end marker, resync on the newest start
        let newest = self.soi.and_then(|_| {
            self.buf
                .get(1..)?
                .windows(JPEG_SOI.len())
                .rposition(|w| w == JPEG_SOI)
                .map(|pos| pos + 1)
        });

        if let Some(start) = newest {
            warn!(
                pending = self.buf.len(),
                cap,
                dropped = start,
                "no complete frame within buffer cap, skipping to the last start marker"
            );
            self.buf.drain(..start);
            self.soi = Some(0);
            self.cursor = (self.buf.len() - 1).max(JPEG_SOI.len());
        }

        if self.buf.len() > cap {
            warn!(
                pending = self.buf.len(),
                cap, "no complete frame within buffer cap, dropping pending bytes"
            );
            let keep_from = self.buf.len() - 1;
            self.buf.drain(..keep_from);
            self.soi = None;
            self.cursor = 0;
        }
    }
}

fn find(buf: &[u8], from: usize, marker: [u8; 2]) -> Option<usize> {
    buf.get(from..)?
        .windows(marker.len())
        .position(|w| w == marker)
        .map(|pos| pos + from)
}
