//! # Moisture State Tracking
//!
//! The state tracker holds the previously observed sample and decides, for
//! each new one, whether a moisture `gain` or `loss` transition occurred.
//! The very first sample only seeds the tracker and never yields a
//! transition.
//!
//! Sensor wiring polarity differed between deployments of this monitor, so
//! both interpretations are explicit, named policies rather than a guessed
//! "correct" one:
//! - [`AnalogPolarity`] maps raw ADC movement onto gain/loss.
//! - [`EdgePolarity`] maps digital activation onto gain/loss. The default
//!   mirrors a normally-open sensor contact, where *activation* means the
//!   probe left the water: a moisture **loss**.
//!
//! On a loss transition, and only when notifications are enabled, the tracker
//! invokes the [`Notifier`]. A notifier failure is logged and swallowed; it
//! never unwinds out of the transition handler and never touches the
//! counters.

use crate::notifier::Notifier;
use crate::sensor::{DeviceError, SampleSource};
use crate::{Sample, Transition};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};

/// How a change in the raw ADC value is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalogPolarity {
    /// A falling raw value means the soil got wetter (resistive probes read
    /// lower when conductive). This is the original deployment's convention.
    DropIsGain,
    /// A falling raw value means the soil got drier.
    DropIsLoss,
}

impl AnalogPolarity {
    fn classify(self, previous: u16, new: u16) -> Option<Transition> {
        let falling = match new.cmp(&previous) {
            CmpOrdering::Equal => return None,
            CmpOrdering::Less => true,
            CmpOrdering::Greater => false,
        };
        Some(match (self, falling) {
            (AnalogPolarity::DropIsGain, true) | (AnalogPolarity::DropIsLoss, false) => {
                Transition::Gain
            }
            (AnalogPolarity::DropIsGain, false) | (AnalogPolarity::DropIsLoss, true) => {
                Transition::Loss
            }
        })
    }
}

/// How a digital activation edge is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgePolarity {
    /// Activation means the probe left the water: a loss. Matches a
    /// normally-open sensor contact.
    ActiveIsLoss,
    /// Activation means the probe entered the water: a gain.
    ActiveIsGain,
}

impl EdgePolarity {
    fn classify(self, activated: bool) -> Transition {
        match (self, activated) {
            (EdgePolarity::ActiveIsLoss, true) | (EdgePolarity::ActiveIsGain, false) => {
                Transition::Loss
            }
            (EdgePolarity::ActiveIsLoss, false) | (EdgePolarity::ActiveIsGain, true) => {
                Transition::Gain
            }
        }
    }
}

/// Owned tracker state: the previous sample plus the transition counters.
///
/// Counters are monotonically non-decreasing, equal the number of events
/// observed so far, and reset only on process restart.
#[derive(Debug, Default, Clone)]
pub struct MonitorState {
    /// The previously observed sample; `None` until the first reading seeds it.
    pub previous_sample: Option<Sample>,
    /// How many gain transitions have occurred since process start.
    pub gain_count: u64,
    /// How many loss transitions have occurred since process start.
    pub loss_count: u64,
}

/// The moisture state tracker and notification pipeline.
pub struct Monitor {
    state: MonitorState,
    analog_polarity: AnalogPolarity,
    edge_polarity: EdgePolarity,
    /// `None` keeps the dispatch disabled, preserving the deployments that
    /// ran with the e-mail call toggled off.
    notifier: Option<Box<dyn Notifier>>,
}

impl Monitor {
    pub fn new(
        analog_polarity: AnalogPolarity,
        edge_polarity: EdgePolarity,
        notifier: Option<Box<dyn Notifier>>,
    ) -> Self {
        Monitor {
            state: MonitorState::default(),
            analog_polarity,
            edge_polarity,
            notifier,
        }
    }

    /// Current tracker state (previous sample and counters).
    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Ingest one sample and classify the transition, if any.
    ///
    /// Updates the stored previous sample, bumps the matching counter and,
    /// on a loss with notifications enabled, dispatches the alert.
    pub fn observe(&mut self, sample: Sample) -> Option<Transition> {
        let transition = self.classify(sample);

        if self.state.previous_sample != Some(sample) {
            log::debug!("sample: {sample:?}");
        }
        self.state.previous_sample = Some(sample);

        match transition {
            Some(Transition::Gain) => {
                self.state.gain_count += 1;
                log::info!("moisture gain detected (#{})", self.state.gain_count);
            }
            Some(Transition::Loss) => {
                self.state.loss_count += 1;
                log::info!("moisture loss detected (#{})", self.state.loss_count);
                self.dispatch_alert();
            }
            None => {}
        }

        transition
    }

    fn classify(&self, sample: Sample) -> Option<Transition> {
        let previous = self.state.previous_sample?;
        match (previous, sample) {
            (Sample::Raw(p), Sample::Raw(n)) => self.analog_polarity.classify(p, n),
            // Edge events report the transition directly by which callback
            // fired; the debounce layer already owns deduplication.
            (_, Sample::Level(activated)) => Some(self.edge_polarity.classify(activated)),
            // A raw reading after a level sample only reseeds the tracker.
            (Sample::Level(_), Sample::Raw(_)) => None,
        }
    }

    fn dispatch_alert(&self) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if let Err(e) = notifier.alert(Transition::Loss) {
            log::error!("unable to send notification: {e}");
        }
    }
}

/// Drive a [`Monitor`] from a [`SampleSource`] until the shutdown flag clears.
///
/// The source is taken by value; its handle is released exactly once on
/// every exit path, including a read error or an interrupt that lands during
/// an active read (the `Drop` backstop is made safe by idempotent release).
pub fn run_monitor<S: SampleSource>(
    mut source: S,
    monitor: &mut Monitor,
    running: &AtomicBool,
) -> Result<(), DeviceError> {
    let mut outcome = Ok(());

    while running.load(Ordering::SeqCst) {
        match source.next_sample() {
            Ok(Some(sample)) => {
                monitor.observe(sample);
            }
            Ok(None) => {} // idle tick; re-check the shutdown flag
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }

    source.release();
    outcome
}
