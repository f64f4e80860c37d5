//! Messages between the script thread and the rendering thread.

use crate::pump::ActionPump;
use actions::{ActionBatch, ElementId, HookEvent, PageId};
use anyhow::{Result, anyhow};
use log::{debug, warn};
use std::ops::Range;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use vdom::{AnimationId, CallbackSink, Document, WindowSurface};

/// Work executed on the rendering thread between slices.
pub type HostTask = Box<dyn FnOnce(&mut ActionPump) + Send>;

/// Everything the rendering thread accepts, in one FIFO.
pub enum Inbound {
    Batch(ActionBatch),
    /// A wire-format batch, decoded on the rendering thread.
    Encoded(String),
    Host(HostTask),
    /// Stop reading; queued actions for ready pages are still applied.
    Shutdown,
}

/// Cloneable producer side of the rendering thread's inbox.
#[derive(Clone, Debug)]
pub struct ActionSender {
    inner: UnboundedSender<Inbound>,
}

impl ActionSender {
    pub(crate) const fn new(inner: UnboundedSender<Inbound>) -> Self {
        Self { inner }
    }

    fn send(&self, message: Inbound) -> Result<()> {
        self.inner
            .send(message)
            .map_err(|_| anyhow!("the rendering thread has stopped"))
    }

    /// Queue a batch of actions.
    ///
    /// # Errors
    /// Returns an error if the rendering thread has stopped.
    pub fn send_batch(&self, batch: ActionBatch) -> Result<()> {
        self.send(Inbound::Batch(batch))
    }

    /// Queue a batch in wire format.
    ///
    /// # Errors
    /// Returns an error if the rendering thread has stopped.
    pub fn send_encoded(&self, text: impl Into<String>) -> Result<()> {
        self.send(Inbound::Encoded(text.into()))
    }

    /// Run `task` on the rendering thread.
    ///
    /// # Errors
    /// Returns an error if the rendering thread has stopped.
    pub fn run_on_render_thread(&self, task: impl FnOnce(&mut ActionPump) + Send + 'static) -> Result<()> {
        self.send(Inbound::Host(Box::new(task)))
    }

    /// Build a document on the rendering thread and register it.
    ///
    /// # Errors
    /// Returns an error if the rendering thread has stopped. A failing
    /// `build` is logged there.
    pub fn register<Build>(&self, build: Build) -> Result<()>
    where
        Build: FnOnce() -> Result<Document> + Send + 'static,
    {
        self.run_on_render_thread(move |pump| match build() {
            Ok(document) => {
                pump.register(document);
            }
            Err(err) => warn!(target: "trellis::runtime", "document construction failed: {err:#}"),
        })
    }

    /// Bind `window` to `page`, making it ready.
    ///
    /// # Errors
    /// Returns an error if the rendering thread has stopped.
    pub fn bind_window<Window>(&self, page: PageId, window: Window) -> Result<()>
    where
        Window: WindowSurface + Send + 'static,
    {
        self.run_on_render_thread(move |pump| match pump.document_mut(page) {
            Some(document) => document.bind_window(Box::new(window)),
            None => warn!(target: "trellis::runtime", "cannot bind a window to unknown {page}"),
        })
    }

    /// Move the visible window of a recyclable container.
    ///
    /// # Errors
    /// Returns an error if the rendering thread has stopped.
    pub fn set_visible_range(&self, page: PageId, container: ElementId, range: Range<usize>) -> Result<()> {
        self.run_on_render_thread(move |pump| {
            let moved = pump
                .document_mut(page)
                .is_some_and(|document| document.set_visible_range(container, range));
            if moved {
                pump.refresh_index(page);
            } else {
                debug!(target: "trellis::runtime", "{page}: {container} is not a recyclable container");
            }
        })
    }

    /// Report a finished animation to `page`.
    ///
    /// # Errors
    /// Returns an error if the rendering thread has stopped.
    pub fn animation_finished(&self, page: PageId, id: AnimationId) -> Result<()> {
        self.run_on_render_thread(move |pump| {
            if let Some(document) = pump.document_mut(page) {
                document.animation_finished(id);
            }
        })
    }

    /// Abort the in-flight transition of `page`.
    ///
    /// # Errors
    /// Returns an error if the rendering thread has stopped.
    pub fn abort_transition(&self, page: PageId) -> Result<()> {
        self.run_on_render_thread(move |pump| {
            if let Some(document) = pump.document_mut(page) {
                document.abort_transition();
            }
        })
    }

    pub(crate) fn shutdown(&self) -> Result<()> {
        self.send(Inbound::Shutdown)
    }
}

/// Hook events flowing back to the script side, in delivery order.
#[derive(Clone, Debug)]
pub struct HookChannel {
    inner: UnboundedSender<HookEvent>,
}

impl HookChannel {
    pub fn new() -> (Self, UnboundedReceiver<HookEvent>) {
        let (sender, receiver) = unbounded_channel();
        (Self { inner: sender }, receiver)
    }
}

impl CallbackSink for HookChannel {
    fn notify(&mut self, event: HookEvent) {
        if self.inner.send(event).is_err() {
            debug!(target: "trellis::runtime", "hook receiver is gone; dropping {event:?}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap freely")]
mod tests {
    use super::*;
    use actions::HookKind;
    use tokio::sync::mpsc::error::TryRecvError;

    #[test]
    fn hook_channel_preserves_order() {
        let (mut channel, mut receiver) = HookChannel::new();
        let page = PageId(1);
        channel.notify(HookEvent::new(page, HookKind::Mounted, ElementId(1)));
        channel.notify(HookEvent::new(page, HookKind::Updated, ElementId(1)));
        assert_eq!(receiver.try_recv().unwrap().hook, HookKind::Mounted);
        assert_eq!(receiver.try_recv().unwrap().hook, HookKind::Updated);
        assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn closed_receiver_is_tolerated() {
        let (mut channel, receiver) = HookChannel::new();
        drop(receiver);
        channel.notify(HookEvent::new(PageId(1), HookKind::Mounted, ElementId(1)));
    }

    #[test]
    fn sender_fails_once_the_inbox_is_gone() {
        let (sender, receiver) = unbounded_channel();
        let sender = ActionSender::new(sender);
        drop(receiver);
        sender.send_encoded("{}").unwrap_err();
    }
}
