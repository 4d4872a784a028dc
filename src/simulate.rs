//! # Simulated Reading Source
//!
//! A synthetic moisture curve for development mode, so the monitoring
//! pipeline can run end to end on machines without an ADC or GPIO attached.
//!
//! The model is a slow sine over the 10-bit ADC range, quantized into coarse
//! steps. Quantization matters: it produces plateaus of equal consecutive
//! readings, exercising the tracker's "no transition on equal values" path
//! the way a real probe's stable readings would. One full wet/dry cycle
//! spans 120 ticks (a minute at the default 0.5 s pace).

use crate::sensor::{DeviceError, SampleSource};
use crate::Sample;
use std::thread;
use std::time::Duration;

/// Mid-scale resting point of the synthetic curve.
const MID_SCALE: f32 = 512.0;
/// Swing of the synthetic curve around mid-scale.
const AMPLITUDE: f32 = 360.0;
/// Ticks per full wet/dry cycle.
const CYCLE_TICKS: f32 = 120.0;
/// Quantization step; readings snap to multiples of this.
const STEP: u16 = 16;

/// Produces a paced, infinite stream of synthetic raw samples.
pub struct SimulatedSource {
    tick: u32,
    pace: Duration,
    released: bool,
}

impl SimulatedSource {
    pub fn new(pace: Duration) -> Self {
        SimulatedSource {
            tick: 0,
            pace,
            released: false,
        }
    }

    fn value_at(tick: u32) -> u16 {
        let theta = (tick as f32 / CYCLE_TICKS) * std::f32::consts::TAU;
        let raw = MID_SCALE + AMPLITUDE * theta.sin();
        let clamped = raw.clamp(0.0, 1023.0) as u16;
        (clamped / STEP) * STEP
    }
}

impl SampleSource for SimulatedSource {
    fn next_sample(&mut self) -> Result<Option<Sample>, DeviceError> {
        thread::sleep(self.pace);
        let value = Self::value_at(self.tick);
        self.tick = self.tick.wrapping_add(1);
        Ok(Some(Sample::Raw(value)))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            log::info!("simulated source released");
        }
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_stay_within_adc_bounds() {
        for tick in 0..240 {
            let value = SimulatedSource::value_at(tick);
            assert!(value <= 1023, "tick {tick} produced {value}");
        }
    }

    #[test]
    fn quantization_produces_plateaus() {
        // The curve is flattest around its peak; at least one pair of
        // consecutive ticks must quantize to the same reading.
        let mut repeats = 0;
        for tick in 0..120 {
            if SimulatedSource::value_at(tick) == SimulatedSource::value_at(tick + 1) {
                repeats += 1;
            }
        }
        assert!(repeats > 0, "expected at least one plateau per cycle");
    }

    #[test]
    fn curve_rises_and_falls_within_a_cycle() {
        let early = SimulatedSource::value_at(0);
        let crest = SimulatedSource::value_at(30); // quarter cycle
        let trough = SimulatedSource::value_at(90); // three-quarter cycle
        assert!(crest > early);
        assert!(trough < early);
    }

    #[test]
    fn release_is_idempotent() {
        let mut source = SimulatedSource::new(Duration::from_millis(0));
        source.release();
        source.release(); // second call must be a no-op
        assert!(source.released);
    }
}
