//! Edge-triggered GPIO source.
//!
//! Registers an async interrupt on both edges of the sensor pin. The
//! interrupt callback runs on rppal's own dispatch thread, so instead of
//! locking shared tracker state it forwards logic levels over a channel;
//! the run loop's thread stays the only one that ever touches the monitor.
//!
//! Debounce follows the usual contact-settle recipe: after an edge fires,
//! wait out the settle window, let the last level win, and suppress repeats
//! of the level already reported.

use moisture_monitor_lib::config::SensorConfig;
use moisture_monitor_lib::sensor::{DeviceError, SampleSource};
use moisture_monitor_lib::Sample;
use rppal::gpio::{Gpio, InputPin, Level, Trigger};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Contact settle window after an edge.
const SETTLE: Duration = Duration::from_millis(30);
/// Upper bound on one blocking wait, so the run loop can observe the
/// shutdown flag at a steady cadence.
const WAIT_WINDOW: Duration = Duration::from_millis(500);

pub struct GpioEdgeSource {
    pin: InputPin,
    events: Receiver<bool>,
    last_level: Option<bool>,
    released: bool,
}

impl GpioEdgeSource {
    /// Acquire the pin and install the interrupt handler. Fails fast when
    /// the GPIO controller or the configured pin is unavailable.
    pub fn open(config: &SensorConfig) -> Result<Self, DeviceError> {
        let gpio = Gpio::new()
            .map_err(|e| DeviceError::Unavailable(format!("GPIO controller: {e}")))?;
        let mut pin = gpio
            .get(config.gpio_pin)
            .map_err(|e| {
                DeviceError::Unavailable(format!("GPIO {} unavailable: {e}", config.gpio_pin))
            })?
            .into_input();

        let (tx, rx) = mpsc::channel();
        pin.set_async_interrupt(Trigger::Both, move |level| {
            let _ = tx.send(level == Level::High);
        })
        .map_err(|e| DeviceError::Unavailable(format!("interrupt setup failed: {e}")))?;

        log::info!("edge monitoring on GPIO {}", config.gpio_pin);

        Ok(Self {
            pin,
            events: rx,
            last_level: None,
            released: false,
        })
    }
}

impl SampleSource for GpioEdgeSource {
    fn next_sample(&mut self) -> Result<Option<Sample>, DeviceError> {
        let mut level = match self.events.recv_timeout(WAIT_WINDOW) {
            Ok(level) => level,
            Err(RecvTimeoutError::Timeout) => return Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(DeviceError::Read("interrupt channel closed".to_string()))
            }
        };

        // Let the contact settle, then take the most recent level.
        thread::sleep(SETTLE);
        while let Ok(next) = self.events.try_recv() {
            level = next;
        }

        // Bounce landed back on the level already reported: nothing new.
        if self.last_level == Some(level) {
            return Ok(None);
        }
        self.last_level = Some(level);

        Ok(Some(Sample::Level(level)))
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.pin.clear_async_interrupt() {
            log::warn!("failed to clear GPIO interrupt: {e}");
        }
        log::info!("GPIO {} released", self.pin.pin());
    }
}

impl Drop for GpioEdgeSource {
    fn drop(&mut self) {
        self.release();
    }
}
