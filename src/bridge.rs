//! The foreground command loop and the shared outbound event stream.
//!
//! Commands arrive one JSON line at a time on stdin and are dispatched to the
//! inventory controller; events go out through a single mutex-guarded writer
//! so lines from this loop and the polling thread never interleave. Every
//! write is flushed before the next read so the parent sees events promptly.

use crate::inventory::{InventoryController, PollConfig};
use crate::log_debug;
use crate::protocol::{self, BridgeEvent, Command};
use crate::reader::TagReader;
use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

/// Clonable handle to the serialized outbound event stream.
#[derive(Clone)]
pub struct EventSink {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl EventSink {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            out: Arc::new(Mutex::new(writer)),
        }
    }

    /// Sink over process stdout, which the protocol owns exclusively.
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Write one event as one flushed JSON line. Serialization or write
    /// failures are swallowed; there is nowhere left to report them.
    pub fn emit(&self, event: &BridgeEvent) {
        let Ok(json) = protocol::encode(event) else {
            return;
        };
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(out, "{json}");
        let _ = out.flush();
    }
}

/// Run the bridge over an already-open reader: emit `ready`, then consume
/// commands until `shutdown`, end-of-input, or a read failure. All three
/// paths quiesce scanning before returning; a read failure additionally
/// surfaces as `Err` so the caller can report it once after cleanup. The
/// device itself closes when the last reader handle drops in the caller.
pub fn run_bridge<R: TagReader + 'static>(
    input: impl BufRead,
    sink: EventSink,
    reader: Arc<R>,
    poll: PollConfig,
) -> Result<()> {
    let mut controller = InventoryController::new(reader, sink.clone(), poll);
    sink.emit(&BridgeEvent::Ready);

    let mut failure = None;
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                failure = Some(anyhow::Error::new(err).context("input read failed"));
                break;
            }
        };

        match protocol::decode(&line) {
            Ok(Some(Command::Start)) => controller.start(),
            Ok(Some(Command::Stop)) => controller.stop(),
            Ok(Some(Command::Shutdown)) => {
                log_debug("Shutdown command received");
                break;
            }
            Ok(None) => {}
            Err(err) => sink.emit(&BridgeEvent::error(err.to_string())),
        }
    }

    // Shutdown, EOF, and read failure all share this teardown.
    controller.stop();
    log_debug("Bridge loop exited");
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}


#[cfg(test)]
mod tests {
    use super::test_sink::capture_sink;
    use super::*;
    use crate::reader::fake::FakeReader;
    use std::io::Cursor;

    fn fast_poll() -> PollConfig {
        PollConfig {
            poll_timeout_ms: 1,
            poll_delay_ms: 1,
            ..PollConfig::default()
        }
    }

    fn run_lines(reader: &Arc<FakeReader>, input: &str) -> super::test_sink::CaptureBuf {
        let (sink, buf) = capture_sink();
        run_bridge(Cursor::new(input.to_string()), sink, Arc::clone(reader), fast_poll())
            .expect("bridge loop");
        buf
    }

    #[test]
    fn test_ready_is_the_first_line_emitted() {
        let reader = Arc::new(FakeReader::new());
        let buf = run_lines(&reader, "{\"cmd\":\"start\"}\n{\"cmd\":\"shutdown\"}\n");

        let lines = buf.lines();
        assert_eq!(lines[0], r#"{"event":"ready"}"#);
        assert_eq!(
            buf.contents().matches(r#""event":"ready""#).count(),
            1,
            "ready is emitted exactly once"
        );
    }

    #[test]
    fn test_undecodable_lines_emit_one_error_each_and_do_not_stop_the_loop() {
        let reader = Arc::new(FakeReader::new());
        let buf = run_lines(
            &reader,
            "this is not json\n{\"cmd\":\"reboot\"}\n{\"cmd\":\"shutdown\"}\n",
        );

        assert_eq!(buf.contents().matches(r#""event":"error""#).count(), 2);
        // Neither bad line reached the reader.
        assert_eq!(reader.started(), 0);
    }

    #[test]
    fn test_shutdown_while_scanning_quiesces_and_disarms() {
        let reader = Arc::new(FakeReader::new());
        run_lines(&reader, "{\"cmd\":\"start\"}\n{\"cmd\":\"shutdown\"}\n");

        assert_eq!(reader.started(), 1);
        assert_eq!(reader.stopped(), 1);
    }

    #[test]
    fn test_eof_without_shutdown_takes_the_same_cleanup_path() {
        let reader = Arc::new(FakeReader::new());
        run_lines(&reader, "{\"cmd\":\"start\"}\n");

        assert_eq!(reader.started(), 1);
        assert_eq!(reader.stopped(), 1);
    }

    #[test]
    fn test_stop_while_idle_emits_nothing() {
        let reader = Arc::new(FakeReader::new());
        let buf = run_lines(&reader, "{\"cmd\":\"stop\"}\n{\"cmd\":\"shutdown\"}\n");

        assert_eq!(buf.lines(), vec![r#"{"event":"ready"}"#.to_string()]);
        assert_eq!(reader.stopped(), 0);
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let reader = Arc::new(FakeReader::new());
        let buf = run_lines(&reader, "\n   \n{\"cmd\":\"shutdown\"}\n");

        assert_eq!(buf.lines(), vec![r#"{"event":"ready"}"#.to_string()]);
    }

    #[test]
    fn test_read_failure_surfaces_as_error_after_cleanup() {
        struct FailingInput;

        impl io::Read for FailingInput {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("stream torn down"))
            }
        }

        let reader = Arc::new(FakeReader::new());
        let (sink, buf) = capture_sink();
        let result = run_bridge(
            io::BufReader::new(FailingInput),
            sink,
            Arc::clone(&reader),
            fast_poll(),
        );

        let err = result.expect_err("read failure propagates");
        assert_eq!(err.to_string(), "input read failed");
        assert!(format!("{err:#}").contains("stream torn down"));
        // Teardown still ran and the protocol stream stayed clean: just the
        // ready line, with the failure left for the caller to report.
        assert_eq!(buf.lines(), vec![r#"{"event":"ready"}"#.to_string()]);
        assert_eq!(reader.started(), 0);
    }

    #[test]
    fn test_case_insensitive_commands_dispatch() {
        let reader = Arc::new(FakeReader::new());
        run_lines(&reader, "{\"cmd\":\"START\"}\n{\"cmd\":\"Stop\"}\n{\"cmd\":\"SHUTDOWN\"}\n");

        assert_eq!(reader.started(), 1);
        assert_eq!(reader.stopped(), 1);
    }
}
