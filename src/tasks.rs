//! Background work reported back to the UI thread.
//!
//! The UI never awaits. Work is spawned on the app's tokio runtime and each
//! result is pushed into an unbounded channel that the owner drains once per
//! frame, asking egui for a repaint when something lands.

use std::future::Future;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

pub struct Tasks<T> {
    handle: Handle,
    sender: mpsc::UnboundedSender<T>,
    receiver: mpsc::UnboundedReceiver<T>,
    repaint: Option<egui::Context>,
    in_flight: usize,
}

impl<T: Send + 'static> Tasks<T> {
    pub fn new(handle: Handle) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            handle,
            sender,
            receiver,
            repaint: None,
            in_flight: 0,
        }
    }

    /// Request a repaint of `ctx` whenever a result arrives.
    pub fn with_repaint(mut self, ctx: egui::Context) -> Self {
        self.repaint = Some(ctx);
        self
    }

    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let sender = self.sender.clone();
        let requester = self.repaint.clone();
        self.in_flight += 1;
        self.handle.spawn(async move {
            let result = future.await;
            if sender.send(result).is_err() {
                log::debug!("task finished after its receiver was dropped");
            }
            if let Some(ctx) = requester {
                ctx.request_repaint();
            }
        });
    }

    /// Next finished result, if any, without blocking.
    pub fn try_next(&mut self) -> Option<T> {
        let value = self.receiver.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(value)
    }

    /// Wait for the next finished result.
    pub async fn next(&mut self) -> Option<T> {
        let value = self.receiver.recv().await?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(value)
    }

    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight == 0
    }
}
