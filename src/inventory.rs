//! The start/stop inventory state machine and its background polling loop.
//!
//! Two states: Idle (no job) and Scanning (one polling thread alive). `start`
//! is idempotent and `stop` fully quiesces the poller before touching the
//! device again, because the vendor library is not safe for overlapping
//! calls. A failed poll emits one error event and the loop keeps going; only
//! stop/shutdown ends a session.

use crate::bridge::EventSink;
use crate::log_debug;
use crate::protocol::{epc_hex, BridgeEvent};
use crate::reader::TagReader;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Timing and arming parameters for one inventory session.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Bound on each single-tag read.
    pub poll_timeout_ms: u16,
    /// Pause between polls.
    pub poll_delay_ms: u64,
    /// Read attempts per continuous-read arming call.
    pub burst_count: u8,
    /// Vendor inventory parameter word, passed through untouched.
    pub inventory_param: u32,
    /// Bound on the best-effort stop call.
    pub stop_timeout_ms: u16,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 200,
            poll_delay_ms: 120,
            burst_count: 0xFF,
            inventory_param: 0,
            stop_timeout_ms: 1000,
        }
    }
}

/// Cooperative cancellation flag shared with the polling thread.
#[derive(Clone)]
struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

struct InventoryJob {
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

/// Owns the Idle/Scanning state and at most one polling thread.
pub struct InventoryController<R: TagReader + 'static> {
    reader: Arc<R>,
    sink: EventSink,
    config: PollConfig,
    job: Option<InventoryJob>,
}

impl<R: TagReader + 'static> InventoryController<R> {
    pub fn new(reader: Arc<R>, sink: EventSink, config: PollConfig) -> Self {
        Self {
            reader,
            sink,
            config,
            job: None,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.job.is_some()
    }

    /// Arm the device and spawn the polling thread. A no-op while already
    /// scanning; on a rejected arming call, one error event and back to Idle.
    pub fn start(&mut self) {
        if self.job.is_some() {
            return;
        }

        if let Err(err) = self
            .reader
            .start_inventory(self.config.burst_count, self.config.inventory_param)
        {
            self.sink
                .emit(&BridgeEvent::error(format!("start inventory failed: {err}")));
            return;
        }

        let cancel = CancelToken::new();
        let handle = thread::spawn({
            let reader = Arc::clone(&self.reader);
            let sink = self.sink.clone();
            let cancel = cancel.clone();
            let config = self.config;
            move || run_poll_loop(reader, sink, cancel, config)
        });

        log_debug("Inventory scanning started");
        self.job = Some(InventoryJob {
            cancel,
            handle: Some(handle),
        });
    }

    /// Cancel the polling thread, wait for it to exit, then disarm the
    /// device. A no-op while Idle; emits nothing on its own.
    pub fn stop(&mut self) {
        let Some(mut job) = self.job.take() else {
            return;
        };

        job.cancel.cancel();
        if let Some(handle) = job.handle.take() {
            let _ = handle.join();
        }
        // Poller has exited; the control call cannot overlap a poll now.
        self.reader.stop_inventory(self.config.stop_timeout_ms);
        log_debug("Inventory scanning stopped");
    }
}

fn run_poll_loop<R: TagReader>(
    reader: Arc<R>,
    sink: EventSink,
    cancel: CancelToken,
    config: PollConfig,
) {
    while !cancel.is_cancelled() {
        match reader.poll_tag(config.poll_timeout_ms) {
            Ok(Some(tag)) => sink.emit(&BridgeEvent::Tag {
                epc: epc_hex(&tag.bytes),
            }),
            Ok(None) => {}
            Err(err) => sink.emit(&BridgeEvent::error(format!("tag poll failed: {err}"))),
        }

        if cancel.is_cancelled() {
            break;
        }
        thread::sleep(Duration::from_millis(config.poll_delay_ms));
    }
    log_debug("Polling loop exited");
}
