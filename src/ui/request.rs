//! Background requests whose results land back in the UI thread

use std::future::Future;

use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};

/// One in-flight request and the last result it produced
pub struct RequestSlot<T> {
    pending: Option<oneshot::Receiver<T>>,
    latest: Option<T>,
}

impl<T: Send + 'static> RequestSlot<T> {
    pub fn new() -> Self {
        Self {
            pending: None,
            latest: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Run `request` on the runtime, replacing any request still in flight
    pub fn spawn<F>(&mut self, runtime: &Handle, ctx: &egui::Context, request: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let ctx = ctx.clone();
        runtime.spawn(async move {
            let _ = tx.send(request.await);
            ctx.request_repaint();
        });
        self.pending = Some(rx);
    }

    /// Pick up a finished result. Returns true when a new one arrived
    pub fn poll(&mut self) -> bool {
        let Some(rx) = self.pending.as_mut() else {
            return false;
        };
        match rx.try_recv() {
            Ok(value) => {
                self.latest = Some(value);
                self.pending = None;
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Closed) => {
                self.pending = None;
                false
            }
        }
    }

    pub fn latest(&self) -> Option<&T> {
        self.latest.as_ref()
    }
}

impl<T: Send + 'static> Default for RequestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
