use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::{Error, Result};

/// An unbounded channel whose sending half can tell when every receiver is
/// gone.
pub fn unbounded<T>() -> (Tx<T>, Rx<T>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let arc = Arc::new(rx);
    (
        Tx {
            tx,
            rx: arc.clone(),
        },
        Rx { rx: arc },
    )
}

pub struct Tx<T> {
    tx: Sender<T>,
    rx: Arc<Receiver<T>>,
}

impl<T> Tx<T> {
    pub fn send(&self, ele: T) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Other("receiver dropped".into()));
        }

        self.tx
            .send(ele)
            .map_err(|_e| Error::Other("chan broken".into()))
    }

    pub fn is_closed(&self) -> bool {
        Arc::strong_count(&self.rx) == 1
    }
}

pub struct Rx<T> {
    rx: Arc<Receiver<T>>,
}

impl<T> Rx<T> {
    /// Blocks until the next element arrives, or returns `None` once the
    /// sending side is gone and the channel is drained.
    pub fn recv(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<T>> {
        match self.rx.recv_timeout(timeout) {
            Ok(ele) => Ok(Some(ele)),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(RecvTimeoutError::Timeout) => Err(Error::Other("recv timed out".into())),
        }
    }

    pub fn inner(&self) -> &Receiver<T> {
        self.rx.as_ref()
    }
}
