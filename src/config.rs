//! # Configuration Management
//!
//! This module handles loading and parsing configuration for the monitor.
//! Sensor behavior (mode, pin/channel, pacing, polarity policies) comes from
//! the moisture-config.toml file with sensible defaults, while mail settings
//! stay out of the file entirely: they are read from environment-style
//! key/value pairs (`SMTP_HOST`, `SMTP_USER`, ...), the same keys the
//! deployment's `.env` provides.
//!
//! Validation is eager: [`Config::validate`] runs before any device handle is
//! acquired, so a missing credential or malformed value fails with a clear
//! configuration error instead of surfacing mid-run.

use crate::monitor::{AnalogPolarity, EdgePolarity};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting was absent (environment variable name given).
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// A setting was present but could not be parsed or is out of range.
    #[error("invalid value for {name}: {value}")]
    Invalid {
        name: &'static str,
        value: String,
    },
}

/// Which acquisition mode the monitor runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensorMode {
    /// Poll an MCP3008 ADC channel over SPI at a fixed interval.
    AnalogPoll,
    /// React to debounced edge interrupts on a digital GPIO line.
    DigitalEdge,
}

/// Application configuration loaded from moisture-config.toml plus the
/// environment overlay.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Sensor acquisition configuration
    pub sensor: SensorConfig,
    /// Notification toggle
    pub notify: NotifyConfig,
    /// Mail relay settings; environment-only, never serialized
    #[serde(skip)]
    pub smtp: SmtpConfig,
}

/// Sensor acquisition configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct SensorConfig {
    /// Acquisition mode (analog polling or digital edge events)
    pub mode: SensorMode,
    /// BCM pin number for the digital-edge mode (GPIO 2/3 carry hard-wired
    /// pull-ups on the Pi and are best avoided)
    pub gpio_pin: u8,
    /// MCP3008 channel index (0-7) for the analog-poll mode
    pub adc_channel: u8,
    /// SPI bus index for the MCP3008
    pub spi_bus: u8,
    /// SPI slave-select index for the MCP3008
    pub spi_device: u8,
    /// Pace of the polling loop in milliseconds
    pub poll_interval_ms: u64,
    /// How raw ADC movement maps onto gain/loss
    pub analog_polarity: AnalogPolarity,
    /// How edge activation maps onto gain/loss
    pub edge_polarity: EdgePolarity,
}

/// Notification toggle. The original deployments kept the e-mail dispatch
/// commented out; this makes that choice an explicit setting instead of a
/// silent no-op, defaulting to disabled.
#[derive(Debug, Deserialize, Serialize)]
pub struct NotifyConfig {
    /// Send an e-mail on every moisture-loss transition
    pub enabled: bool,
}

/// Mail relay settings gathered from the environment overlay.
///
/// All fields are optional until [`SmtpConfig::resolved`] is called; that is
/// where "notifications are enabled but SMTP_PASS is unset" becomes a
/// [`ConfigError::Missing`].
#[derive(Debug, Default, Clone)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    pub template: Option<PathBuf>,
}

/// Fully-resolved mail settings, produced only after validation succeeds.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
    /// One or more recipients, comma-separated
    pub to: String,
    pub subject: String,
    /// HTML template path; relative paths resolve against the executable's
    /// own directory
    pub template: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sensor: SensorConfig {
                mode: SensorMode::AnalogPoll,
                gpio_pin: 17,
                adc_channel: 0,
                spi_bus: 0,
                spi_device: 0,
                poll_interval_ms: 500,
                analog_polarity: AnalogPolarity::DropIsGain,
                edge_polarity: EdgePolarity::ActiveIsLoss,
            },
            notify: NotifyConfig { enabled: false },
            smtp: SmtpConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the moisture-config.toml file.
    /// Falls back to default configuration if the file doesn't exist or is invalid.
    pub fn load() -> Self {
        Self::load_from_path("moisture-config.toml")
    }

    /// Load configuration from the specified path.
    /// Falls back to default configuration if the file doesn't exist or is invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    log::info!(
                        "loaded configuration ({:?} mode)",
                        config.sensor.mode
                    );
                    config
                }
                Err(e) => {
                    log::warn!("invalid config file format: {e}");
                    log::warn!("using default configuration (analog polling)");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("no config file found, using default configuration");
                Self::default()
            }
        }
    }

    /// Overlay settings from the process environment.
    ///
    /// Recognized keys: `GPIO_PIN`, `SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`,
    /// `SMTP_PASS`, `SMTP_FROM`, `SMTP_TO`, `EMAIL_SUBJECT`,
    /// `EMAIL_TMPL_FILENAME`.
    pub fn overlay_env(&mut self) -> Result<(), ConfigError> {
        self.overlay_from(|key| env::var(key).ok())
    }

    /// Overlay settings from an arbitrary key/value lookup. Split out from
    /// [`Config::overlay_env`] so tests never have to mutate the process
    /// environment.
    pub fn overlay_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("GPIO_PIN") {
            self.sensor.gpio_pin = raw.parse().map_err(|_| ConfigError::Invalid {
                name: "GPIO_PIN",
                value: raw,
            })?;
        }
        if let Some(raw) = lookup("SMTP_PORT") {
            self.smtp.port = Some(raw.parse().map_err(|_| ConfigError::Invalid {
                name: "SMTP_PORT",
                value: raw,
            })?);
        }
        if let Some(host) = lookup("SMTP_HOST") {
            self.smtp.host = Some(host);
        }
        if let Some(user) = lookup("SMTP_USER") {
            self.smtp.user = Some(user);
        }
        if let Some(pass) = lookup("SMTP_PASS") {
            self.smtp.pass = Some(pass);
        }
        if let Some(from) = lookup("SMTP_FROM") {
            self.smtp.from = Some(from);
        }
        if let Some(to) = lookup("SMTP_TO") {
            self.smtp.to = Some(to);
        }
        if let Some(subject) = lookup("EMAIL_SUBJECT") {
            self.smtp.subject = Some(subject);
        }
        if let Some(template) = lookup("EMAIL_TMPL_FILENAME") {
            self.smtp.template = Some(PathBuf::from(template));
        }
        Ok(())
    }

    /// Eagerly validate the configuration. Must pass before any device
    /// handle is acquired.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensor.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "poll_interval_ms",
                value: "0".to_string(),
            });
        }
        if self.sensor.adc_channel > 7 {
            return Err(ConfigError::Invalid {
                name: "adc_channel",
                value: self.sensor.adc_channel.to_string(),
            });
        }
        if self.notify.enabled {
            // Surfaces the first missing mail setting by name.
            self.smtp.resolved()?;
        }
        Ok(())
    }
}

impl SmtpConfig {
    /// Resolve into complete [`MailSettings`], naming the first missing
    /// environment key on failure.
    pub fn resolved(&self) -> Result<MailSettings, ConfigError> {
        Ok(MailSettings {
            host: self
                .host
                .clone()
                .ok_or(ConfigError::Missing("SMTP_HOST"))?,
            port: self.port.ok_or(ConfigError::Missing("SMTP_PORT"))?,
            user: self
                .user
                .clone()
                .ok_or(ConfigError::Missing("SMTP_USER"))?,
            pass: self
                .pass
                .clone()
                .ok_or(ConfigError::Missing("SMTP_PASS"))?,
            from: self
                .from
                .clone()
                .ok_or(ConfigError::Missing("SMTP_FROM"))?,
            to: self.to.clone().ok_or(ConfigError::Missing("SMTP_TO"))?,
            subject: self
                .subject
                .clone()
                .ok_or(ConfigError::Missing("EMAIL_SUBJECT"))?,
            template: self
                .template
                .clone()
                .ok_or(ConfigError::Missing("EMAIL_TMPL_FILENAME"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SMTP_HOST", "mail.example.com"),
            ("SMTP_PORT", "587"),
            ("SMTP_USER", "plantbot"),
            ("SMTP_PASS", "hunter2"),
            ("SMTP_FROM", "plantbot@example.com"),
            ("SMTP_TO", "me@example.com"),
            ("EMAIL_SUBJECT", "Water your plant!"),
            ("EMAIL_TMPL_FILENAME", "alert.html"),
        ])
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sensor.mode, SensorMode::AnalogPoll);
        assert_eq!(config.sensor.gpio_pin, 17);
        assert_eq!(config.sensor.adc_channel, 0);
        assert_eq!(config.sensor.poll_interval_ms, 500);
        assert!(!config.notify.enabled);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.sensor.mode, config.sensor.mode);
        assert_eq!(parsed.sensor.poll_interval_ms, config.sensor.poll_interval_ms);
        assert_eq!(parsed.notify.enabled, config.notify.enabled);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fall back to default
        assert_eq!(config.sensor.mode, SensorMode::AnalogPoll);
    }

    #[test]
    fn test_overlay_fills_mail_settings() {
        let env = full_env();
        let mut config = Config::default();
        config
            .overlay_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        let mail = config.smtp.resolved().unwrap();
        assert_eq!(mail.host, "mail.example.com");
        assert_eq!(mail.port, 587);
        assert_eq!(mail.to, "me@example.com");
        assert_eq!(mail.template, PathBuf::from("alert.html"));
    }

    #[test]
    fn test_overlay_rejects_malformed_port() {
        let mut config = Config::default();
        let result = config.overlay_from(|key| {
            (key == "SMTP_PORT").then(|| "not-a-port".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "SMTP_PORT", .. })
        ));
    }

    #[test]
    fn test_overlay_gpio_pin_override() {
        let mut config = Config::default();
        config
            .overlay_from(|key| (key == "GPIO_PIN").then(|| "27".to_string()))
            .unwrap();
        assert_eq!(config.sensor.gpio_pin, 27);
    }

    #[test]
    fn test_validate_requires_mail_settings_when_enabled() {
        let mut config = Config::default();
        config.notify.enabled = true;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("SMTP_HOST"))
        ));

        let env = full_env();
        config
            .overlay_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.sensor.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_channel() {
        let mut config = Config::default();
        config.sensor.adc_channel = 8;
        assert!(config.validate().is_err());
    }
}
