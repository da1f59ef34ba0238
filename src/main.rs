use clap::Parser;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use uhf_bridge::bridge::{run_bridge, EventSink};
use uhf_bridge::config::AppConfig;
use uhf_bridge::protocol::BridgeEvent;
use uhf_bridge::reader::{usb_device_count, ReaderSession};
use uhf_bridge::{init_debug_log_file, log_debug};

/// Unrecoverable startup: no capable reader attached.
const EXIT_NO_DEVICE: u8 = 2;
/// Unrecoverable startup: the reader refused to open.
const EXIT_OPEN_FAILED: u8 = 3;

fn main() -> ExitCode {
    let config = AppConfig::parse();
    if let Err(err) = config.validate() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    init_debug_log_file();
    log_debug("=== UHF bridge started ===");
    let code = run(&config);
    log_debug("=== UHF bridge exiting ===");
    code
}

fn run(config: &AppConfig) -> ExitCode {
    let sink = EventSink::stdout();

    let count = usb_device_count();
    if count <= 0 {
        sink.emit(&BridgeEvent::error("no HID reader found"));
        return ExitCode::from(EXIT_NO_DEVICE);
    }
    log_debug(&format!("{count} reader(s) attached"));

    let session = match ReaderSession::open(config.device_index) {
        Ok(session) => Arc::new(session),
        Err(err) => {
            sink.emit(&BridgeEvent::error(format!("open reader failed: {err}")));
            return ExitCode::from(EXIT_OPEN_FAILED);
        }
    };

    let stdin = io::stdin();
    if let Err(err) = run_bridge(stdin.lock(), sink.clone(), session, config.poll_config()) {
        // Final report on the shutdown path; cleanup already ran.
        sink.emit(&BridgeEvent::error(format!("{err:#}")));
    }
    ExitCode::SUCCESS
}
