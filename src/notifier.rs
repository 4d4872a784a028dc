//! # E-mail Notification Dispatch
//!
//! The notifier renders a message body from an HTML template file and sends
//! exactly one message per alert over an authenticated STARTTLS session to
//! the configured mail relay. The session is transient: opened, used for one
//! message, closed. The message itself is rebuilt for every send; nothing is
//! shared or mutated between alerts.
//!
//! No retry is attempted on failure. Adding bounded retry with backoff would
//! be a reasonable enhancement, but the monitoring loop tolerates a missed
//! alert and the caller already logs and swallows every [`NotifyError`].

use crate::config::MailSettings;
use crate::Transition;
use lettre::message::header::ContentType;
use lettre::message::{MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Upper bound on the SMTP round trip. The send is blocking and shares the
/// monitor's only thread, so an unresponsive relay must not hang the loop
/// indefinitely.
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while rendering or dispatching a notification.
///
/// A rendering failure is treated exactly like a transport failure by the
/// caller: logged, non-fatal, loop uninterrupted.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The template file could not be located or read.
    #[error("template read failed: {0}")]
    Template(#[from] std::io::Error),

    /// A From/To mailbox failed to parse.
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The message could not be assembled.
    #[error("message build failed: {0}")]
    Message(#[from] lettre::error::Error),

    /// The SMTP session failed (auth, connection refused, timeout).
    #[error("SMTP transport failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Anything that can deliver a transition alert.
///
/// The state tracker holds the notifier behind this trait so tests can
/// substitute recording or failing doubles for the real SMTP dispatch.
pub trait Notifier {
    fn alert(&self, transition: Transition) -> Result<(), NotifyError>;
}

/// SMTP-backed notifier: one STARTTLS login session and one multipart
/// message per alert.
pub struct EmailNotifier {
    settings: MailSettings,
}

impl EmailNotifier {
    pub fn new(settings: MailSettings) -> Self {
        EmailNotifier { settings }
    }

    /// Read the configured HTML template into the message body.
    ///
    /// The template carries no substitution variables; rendering it is
    /// reading it. Relative paths resolve against the executable's own
    /// directory, mirroring how the deployment ships the template next to
    /// the program.
    fn render_body(&self) -> Result<String, NotifyError> {
        let path = resolve_template_path(&self.settings.template)?;
        Ok(fs::read_to_string(path)?)
    }

    /// Assemble a fresh multipart/alternative message with one HTML part.
    fn build_message(&self, body: String) -> Result<Message, NotifyError> {
        let mut builder = Message::builder()
            .from(self.settings.from.parse()?)
            .subject(self.settings.subject.clone());

        // SMTP_TO may name a comma-separated recipient list.
        for recipient in self.settings.to.split(',') {
            builder = builder.to(recipient.trim().parse()?);
        }

        Ok(builder.multipart(
            MultiPart::alternative().singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(body),
            ),
        )?)
    }

    fn transport(&self) -> Result<SmtpTransport, NotifyError> {
        Ok(SmtpTransport::starttls_relay(&self.settings.host)?
            .port(self.settings.port)
            .credentials(Credentials::new(
                self.settings.user.clone(),
                self.settings.pass.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build())
    }
}

impl Notifier for EmailNotifier {
    fn alert(&self, transition: Transition) -> Result<(), NotifyError> {
        let body = self.render_body()?;
        let message = self.build_message(body)?;
        let mailer = self.transport()?;
        mailer.send(&message)?;
        log::info!(
            "notification sent to {} ({transition} transition)",
            self.settings.to
        );
        Ok(())
    }
}

/// Resolve a template path: absolute paths pass through, relative ones are
/// anchored at the executable's directory.
fn resolve_template_path(template: &Path) -> Result<PathBuf, std::io::Error> {
    if template.is_absolute() {
        return Ok(template.to_path_buf());
    }
    let exe = std::env::current_exe()?;
    let dir = exe.parent().ok_or_else(|| {
        std::io::Error::other("executable has no parent directory")
    })?;
    Ok(dir.join(template))
}
