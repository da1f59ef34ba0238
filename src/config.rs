//! Command-line parsing and validation helpers.

use crate::inventory::PollConfig;
use anyhow::{bail, Result};
use clap::Parser;

const DEFAULT_POLL_TIMEOUT_MS: u16 = 200;
const DEFAULT_POLL_DELAY_MS: u64 = 120;
const DEFAULT_BURST_COUNT: u8 = 0xFF;
const DEFAULT_STOP_TIMEOUT_MS: u16 = 1000;
// Past these the bridge would feel dead to the parent process.
const MAX_POLL_TIMEOUT_MS: u16 = 10_000;
const MAX_POLL_DELAY_MS: u64 = 10_000;

/// CLI options for the UHF reader bridge. Defaults match the vendor sample
/// timings the reader is known to behave well with.
#[derive(Debug, Parser, Clone)]
#[command(about = "JSON stdin/stdout bridge for vendor UHF RFID readers", version)]
pub struct AppConfig {
    /// USB index of the reader to open
    #[arg(long, default_value_t = 0)]
    pub device_index: u16,

    /// Upper bound in milliseconds on each single-tag poll
    #[arg(long, default_value_t = DEFAULT_POLL_TIMEOUT_MS)]
    pub poll_timeout_ms: u16,

    /// Pause in milliseconds between polls
    #[arg(long, default_value_t = DEFAULT_POLL_DELAY_MS)]
    pub poll_delay_ms: u64,

    /// Read attempts per continuous-read arming call
    #[arg(long, default_value_t = DEFAULT_BURST_COUNT)]
    pub burst_count: u8,

    /// Vendor inventory parameter word, passed through untouched
    #[arg(long, default_value_t = 0)]
    pub inventory_param: u32,

    /// Upper bound in milliseconds on the best-effort inventory stop call
    #[arg(long, default_value_t = DEFAULT_STOP_TIMEOUT_MS)]
    pub stop_timeout_ms: u16,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_timeout_ms == 0 {
            bail!("--poll-timeout-ms must be at least 1");
        }
        if self.poll_timeout_ms > MAX_POLL_TIMEOUT_MS {
            bail!("--poll-timeout-ms must be at most {MAX_POLL_TIMEOUT_MS}");
        }
        if self.poll_delay_ms > MAX_POLL_DELAY_MS {
            bail!("--poll-delay-ms must be at most {MAX_POLL_DELAY_MS}");
        }
        if self.burst_count == 0 {
            bail!("--burst-count must be at least 1");
        }
        Ok(())
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            poll_timeout_ms: self.poll_timeout_ms,
            poll_delay_ms: self.poll_delay_ms,
            burst_count: self.burst_count,
            inventory_param: self.inventory_param,
            stop_timeout_ms: self.stop_timeout_ms,
        }
    }
}
