//! # Sample Acquisition Contract
//!
//! Both acquisition modes (analog polling and edge-triggered digital input)
//! sit behind the [`SampleSource`] trait, so the state tracker ingests either
//! uniformly and never learns about SPI transfers or interrupt callbacks.
//!
//! The hardware-backed implementations live in the binary behind the
//! `hardware` feature; [`crate::simulate::SimulatedSource`] is always
//! available for development mode.

use crate::Sample;
use thiserror::Error;

/// Errors raised by a reading source.
///
/// A source that cannot be opened fails fast with [`DeviceError::Unavailable`]
/// rather than silently yielding stale or zero values.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The underlying device is absent or misconfigured (wrong pin, SPI not
    /// enabled, channel out of range).
    #[error("device unavailable: {0}")]
    Unavailable(String),

    /// A read from an open device failed.
    #[error("device read failed: {0}")]
    Read(String),
}

/// A lazy, infinite, non-restartable sequence of samples.
///
/// `next_sample` blocks for at most a bounded interval:
/// - a polling source paces itself and returns `Ok(Some(_))` every tick;
/// - an edge source waits on its interrupt channel and returns `Ok(None)`
///   when nothing fired within the wait window, so the run loop can check
///   its cancellation flag at a steady cadence.
///
/// `release` is idempotent and also invoked from `Drop` by every
/// implementation, guaranteeing the device handle is given back on every
/// exit path, including interruption mid-read.
pub trait SampleSource {
    /// Produce the next sample, blocking. `Ok(None)` means an idle tick.
    fn next_sample(&mut self) -> Result<Option<Sample>, DeviceError>;

    /// Give the device handle back. Safe to call more than once.
    fn release(&mut self);
}
