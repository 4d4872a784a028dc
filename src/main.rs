//! # Moisture Monitor Application Entry Point
//!
//! This binary wires the pieces together: configuration (file plus
//! environment overlay, validated before any device is touched), a reading
//! source picked by mode, the state tracker, the optional e-mail notifier,
//! and a Ctrl-C-driven shutdown flag. It supports both production mode
//! (real sensor hardware) and development mode (synthetic readings).

// Test modules
#[cfg(test)]
mod tests;

#[cfg(all(target_os = "linux", feature = "hardware"))]
mod hw_gpio_edge;
#[cfg(all(target_os = "linux", feature = "hardware"))]
mod hw_mcp3008;

use anyhow::Context;
use moisture_monitor_lib::config::Config;
use moisture_monitor_lib::monitor::{run_monitor, Monitor};
use moisture_monitor_lib::notifier::{EmailNotifier, Notifier};
use moisture_monitor_lib::simulate::SimulatedSource;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Build the notifier when notifications are enabled. Validation has
/// already proven the mail settings complete by the time this runs.
fn build_notifier(config: &Config) -> anyhow::Result<Option<Box<dyn Notifier>>> {
    if !config.notify.enabled {
        log::info!("notifications disabled by configuration");
        return Ok(None);
    }
    let settings = config.smtp.resolved().context("mail settings")?;
    Ok(Some(Box::new(EmailNotifier::new(settings))))
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Development mode: synthetic readings for testing without hardware
    let development_mode = env::args().any(|arg| arg == "--simulate");

    // Configuration: file defaults, environment overlay, eager validation.
    // Everything must check out before a device handle is acquired.
    let mut config = Config::load();
    config.overlay_env().context("environment overlay")?;
    config.validate().context("invalid configuration")?;

    // Cancellation: Ctrl-C clears the flag; the run loop notices between
    // samples and unwinds through the guaranteed device release.
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .context("install interrupt handler")?;
    }

    let notifier = build_notifier(&config)?;
    let mut monitor = Monitor::new(
        config.sensor.analog_polarity,
        config.sensor.edge_polarity,
        notifier,
    );

    if development_mode {
        let source = SimulatedSource::new(Duration::from_millis(config.sensor.poll_interval_ms));
        run_monitor(source, &mut monitor, &running).context("monitor loop")?;
    } else {
        #[cfg(all(target_os = "linux", feature = "hardware"))]
        {
            use moisture_monitor_lib::config::SensorMode;

            match config.sensor.mode {
                SensorMode::AnalogPoll => {
                    let source = hw_mcp3008::Mcp3008Source::open(&config.sensor)
                        .context("open MCP3008")?;
                    run_monitor(source, &mut monitor, &running).context("monitor loop")?;
                }
                SensorMode::DigitalEdge => {
                    let source = hw_gpio_edge::GpioEdgeSource::open(&config.sensor)
                        .context("open GPIO edge input")?;
                    run_monitor(source, &mut monitor, &running).context("monitor loop")?;
                }
            }
        }

        #[cfg(not(all(target_os = "linux", feature = "hardware")))]
        {
            anyhow::bail!(
                "sensor hardware support not enabled; rebuild with --features hardware \
                 or run with --simulate"
            );
        }
    }

    let state = monitor.state();
    println!(
        "Exiting... ({} gains, {} losses observed)",
        state.gain_count, state.loss_count
    );
    Ok(())
}
