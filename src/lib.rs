//! # Moisture Monitor Core Library
//!
//! This library provides the foundational types and logic for the soil-moisture
//! monitor: sample acquisition contracts, moisture state-transition tracking,
//! and e-mail notification dispatch. It targets small single-board computers
//! such as the Raspberry Pi Zero, where the binary runs as a long-lived
//! single-threaded process.
//!
//! ## Design Philosophy
//!
//! ### One ingestion path for two sensors
//! The monitor supports two acquisition modes behind a single [`sensor::SampleSource`]
//! contract:
//! - **Analog polling**: an MCP3008 ADC channel read over SPI at a fixed pace,
//!   yielding raw 10-bit integers.
//! - **Edge-triggered digital input**: a GPIO line whose debounced interrupt
//!   callbacks are funneled through a channel, yielding logic levels.
//!
//! Either way, the state tracker consumes plain [`Sample`] values and never
//! learns how they were produced.
//!
//! ### Explicit ownership instead of globals
//! Transition counters and the previous reading live in an owned
//! [`monitor::MonitorState`], mutated only by the tracker. The mail message
//! is rebuilt for every send; no session or message object is shared.
//!
//! ### Failure policy
//! - Configuration problems fail eagerly at startup, before any device handle
//!   is acquired.
//! - A missing or misconfigured device fails fast with a device-unavailable
//!   error rather than returning stale readings.
//! - Notification failures are logged and swallowed; the monitoring loop is
//!   never aborted by the mail relay.

use std::fmt;

// Module declarations
pub mod config;
pub mod monitor;
pub mod notifier;
pub mod sensor;
pub mod simulate;

/// A single sensor reading.
///
/// Immutable once produced and never persisted; exactly one sample is
/// "current" at any time, and the prior one is retained only long enough to
/// classify the next transition.
///
/// # Example
/// ```
/// use moisture_monitor_lib::Sample;
///
/// // A mid-scale ADC reading (10-bit channel, 0-1023)
/// let raw = Sample::Raw(512);
///
/// // A digital sensor that just activated
/// let level = Sample::Level(true);
/// # let _ = (raw, level);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sample {
    /// Raw value from a 10-bit ADC channel (0-1023).
    Raw(u16),
    /// Logic level reported by an edge-triggered digital input.
    /// `true` means the sensor activated, `false` that it deactivated.
    Level(bool),
}

/// A classified change in moisture state, derived from two consecutive
/// readings or from which edge callback fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Moisture increased since the previous reading.
    Gain,
    /// Moisture decreased since the previous reading. This is the alerting
    /// transition: a dry plant is the condition worth an e-mail.
    Loss,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Gain => write!(f, "gain"),
            Transition::Loss => write!(f, "loss"),
        }
    }
}
