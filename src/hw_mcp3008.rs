//! MCP3008 analog polling source.
//!
//! Reads one 10-bit channel of an MCP3008 ADC over hardware SPI (which must
//! be enabled on the Pi), pacing itself by sleeping the configured interval
//! before each blocking read.

use moisture_monitor_lib::config::SensorConfig;
use moisture_monitor_lib::sensor::{DeviceError, SampleSource};
use moisture_monitor_lib::Sample;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use std::thread;
use std::time::Duration;

/// MCP3008 datasheet tops out at 3.6 MHz at 5 V; 1.35 MHz is the safe
/// figure for 3.3 V operation.
const SPI_CLOCK_HZ: u32 = 1_350_000;

pub struct Mcp3008Source {
    spi: Spi,
    channel: u8,
    pace: Duration,
    released: bool,
}

impl Mcp3008Source {
    /// Open the SPI device. Fails fast when the bus is absent or not
    /// enabled, rather than yielding zero readings later.
    pub fn open(config: &SensorConfig) -> Result<Self, DeviceError> {
        if config.adc_channel > 7 {
            return Err(DeviceError::Unavailable(format!(
                "MCP3008 has channels 0-7, got {}",
                config.adc_channel
            )));
        }
        let bus = match config.spi_bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            2 => Bus::Spi2,
            other => {
                return Err(DeviceError::Unavailable(format!(
                    "unsupported SPI bus {other}"
                )))
            }
        };
        let slave = match config.spi_device {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            other => {
                return Err(DeviceError::Unavailable(format!(
                    "unsupported SPI slave select {other}"
                )))
            }
        };

        let spi = Spi::new(bus, slave, SPI_CLOCK_HZ, Mode::Mode0)
            .map_err(|e| DeviceError::Unavailable(format!("SPI open failed: {e}")))?;

        log::info!(
            "MCP3008 on SPI{}/CE{} channel {}, polling every {} ms",
            config.spi_bus,
            config.spi_device,
            config.adc_channel,
            config.poll_interval_ms
        );

        Ok(Self {
            spi,
            channel: config.adc_channel,
            pace: Duration::from_millis(config.poll_interval_ms),
            released: false,
        })
    }

    /// Single-ended read of one channel: start bit, SGL/DIFF + channel,
    /// then 10 result bits straddling the last two response bytes.
    fn read_channel(&mut self) -> Result<u16, DeviceError> {
        let tx = [0x01, (0x08 | self.channel) << 4, 0x00];
        let mut rx = [0u8; 3];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| DeviceError::Read(e.to_string()))?;
        Ok((u16::from(rx[1] & 0x03) << 8) | u16::from(rx[2]))
    }
}

impl SampleSource for Mcp3008Source {
    fn next_sample(&mut self) -> Result<Option<Sample>, DeviceError> {
        thread::sleep(self.pace);
        Ok(Some(Sample::Raw(self.read_channel()?)))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            // The Spi handle closes on drop; this just makes the release
            // observable and single-shot.
            log::info!("SPI handle released");
        }
    }
}

impl Drop for Mcp3008Source {
    fn drop(&mut self) {
        self.release();
    }
}
