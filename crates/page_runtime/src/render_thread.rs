//! The rendering thread.
//!
//! Documents hold host renderables that must stay on one thread, so the pump
//! lives on a dedicated OS thread driving a current-thread tokio runtime with
//! a `LocalSet`. Between slices the loop yields, runs host tasks and picks up
//! new batches; it never skips queued actions, and a host task only runs once
//! the ready actions sent ahead of it have been applied.

use crate::channel::{ActionSender, HostTask, Inbound};
use crate::config::RuntimeConfig;
use crate::index::ElementIndex;
use crate::pump::ActionPump;
use crate::telemetry::PumpCounters;
use anyhow::{Context as _, Result, anyhow};
use log::{debug, info, warn};
use std::thread::{self, JoinHandle};
use tokio::runtime::Builder;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::task::{LocalSet, yield_now};

/// How the rendering loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub counters: PumpCounters,
    /// Actions still queued behind a page that never became ready.
    pub stranded: usize,
}

pub struct RenderThread {
    sender: ActionSender,
    handle: Option<JoinHandle<Result<RunSummary>>>,
}

impl RenderThread {
    /// Start the rendering thread. `index` is refreshed after every slice.
    ///
    /// # Errors
    /// Returns an error if the OS thread cannot be spawned.
    pub fn spawn(config: RuntimeConfig, index: ElementIndex) -> Result<Self> {
        let (sender, receiver) = unbounded_channel();
        let handle = thread::Builder::new()
            .name("trellis-render".to_owned())
            .spawn(move || {
                let runtime = Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .context("building the rendering runtime")?;
                let pump = ActionPump::new(&config).with_index(index);
                LocalSet::new().block_on(&runtime, run_loop(receiver, pump))
            })
            .context("spawning the rendering thread")?;
        Ok(Self {
            sender: ActionSender::new(sender),
            handle: Some(handle),
        })
    }

    pub fn sender(&self) -> ActionSender {
        self.sender.clone()
    }

    /// Ask the loop to stop after the actions already queued and wait for it.
    ///
    /// # Errors
    /// Returns the error that stopped the loop, if any.
    pub fn shutdown(mut self) -> Result<RunSummary> {
        if self.sender.shutdown().is_err() {
            debug!(target: "trellis::runtime", "rendering loop already stopped");
        }
        self.join()
    }

    fn join(&mut self) -> Result<RunSummary> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| anyhow!("the rendering thread was already joined"))?;
        handle
            .join()
            .map_err(|_| anyhow!("the rendering thread panicked"))?
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ignored = self.sender.shutdown();
            if let Err(err) = self.join() {
                warn!(target: "trellis::runtime", "rendering loop ended with: {err:#}");
            }
        }
    }
}

/// Returns false once the inbox asked to stop.
fn handle_message(pump: &mut ActionPump, message: Inbound) -> Result<bool> {
    match message {
        Inbound::Batch(batch) => pump.enqueue_batch(batch),
        Inbound::Encoded(text) => pump
            .enqueue_encoded(&text)
            .context("rejecting an undecodable batch")?,
        Inbound::Host(task) => task(pump),
        Inbound::Shutdown => return Ok(false),
    }
    Ok(true)
}

async fn run_loop(mut inbox: UnboundedReceiver<Inbound>, mut pump: ActionPump) -> Result<RunSummary> {
    info!(target: "trellis::runtime", "rendering loop started");
    let mut open = true;
    // A host task waits until the actions sent before it have been applied.
    let mut held: Option<HostTask> = None;
    loop {
        while open && held.is_none() {
            match inbox.try_recv() {
                Ok(Inbound::Host(task)) if pump.has_ready_work() => held = Some(task),
                Ok(message) => open = handle_message(&mut pump, message)?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => open = false,
            }
        }

        if pump.has_ready_work() {
            let outcome = pump.run_slice();
            if let Some(page) = outcome.blocked_on {
                debug!(target: "trellis::runtime", "waiting for {page} ({} queued)", outcome.remaining);
            }
            yield_now().await;
            continue;
        }
        if let Some(task) = held.take() {
            task(&mut pump);
            continue;
        }
        if !open {
            break;
        }
        match inbox.recv().await {
            Some(message) => open = handle_message(&mut pump, message)?,
            None => open = false,
        }
    }

    let stranded = pump.pending();
    if stranded > 0 {
        warn!(target: "trellis::runtime", "stopping with {stranded} actions waiting on {:?}", pump.blocked_on());
    }
    info!(target: "trellis::runtime", "rendering loop stopped");
    Ok(RunSummary {
        counters: pump.counters(),
        stranded,
    })
}
