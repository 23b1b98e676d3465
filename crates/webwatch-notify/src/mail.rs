//! Mail notifier: renders the diff as an HTML table and hands it to a
//! [`MailTransport`]. Production delivery goes through lettre's async SMTP
//! transport.

use std::fmt::Write as _;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info};
use webwatch_core::config::{MailConfig, SmtpTls};
use webwatch_core::{DiffEntry, Snapshot};

use crate::{error::NotifyError, notifier::Notifier};

pub const MAIL_CHANNEL: &str = "mail";

/// A fully rendered notification mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Delivers rendered mails.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), NotifyError>;
}

/// [`MailTransport`] over SMTP.
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    /// Build the SMTP transport described by `config`. No connection is made yet.
    ///
    /// The host must be set and the sender must parse as a mailbox.
    pub fn from_config(config: &MailConfig) -> Result<Self, NotifyError> {
        if config.smtp_host.trim().is_empty() {
            return Err(NotifyError::Config("mail.smtp_host is not set".to_string()));
        }
        config.sender.parse::<Mailbox>().map_err(|e| {
            NotifyError::Config(format!(
                "mail.sender {:?} is not a valid address: {e}",
                config.sender
            ))
        })?;

        let builder = match config.tls {
            SmtpTls::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                    .map_err(|e| NotifyError::Config(format!("SMTP relay: {e}")))?
            }
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| NotifyError::Config(format!("SMTP relay: {e}")))?,
            SmtpTls::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            }
        };

        let mut builder = builder.port(config.smtp_port);
        if let Some(user) = &config.smtp_user {
            builder = builder.credentials(Credentials::new(
                user.clone(),
                config.smtp_pass.clone().unwrap_or_default(),
            ));
        }

        Ok(Self {
            mailer: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: MailMessage) -> Result<(), NotifyError> {
        let from: Mailbox = message
            .from
            .parse()
            .map_err(|e| NotifyError::InvalidDestination {
                destination: message.from.clone(),
                reason: format!("{e}"),
            })?;
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| NotifyError::InvalidDestination {
                destination: message.to.clone(),
                reason: format!("{e}"),
            })?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html_body)
            .map_err(|e| NotifyError::Render(format!("build email: {e}")))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| NotifyError::Delivery(format!("SMTP send: {e}")))?;
        Ok(())
    }
}

/// The `mail` channel: one mail per (job, destination) per cycle.
pub struct MailNotifier {
    sender: String,
    transport: Box<dyn MailTransport>,
}

impl MailNotifier {
    pub fn new(sender: impl Into<String>, transport: Box<dyn MailTransport>) -> Self {
        Self {
            sender: sender.into(),
            transport,
        }
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    fn key(&self) -> &str {
        MAIL_CHANNEL
    }

    async fn notify(
        &self,
        job_name: &str,
        destination: &str,
        entries: &[DiffEntry],
        _snapshot: &Snapshot,
    ) -> Result<(), NotifyError> {
        if destination.trim().is_empty() {
            return Err(NotifyError::InvalidDestination {
                destination: destination.to_string(),
                reason: "empty mail address".to_string(),
            });
        }

        let html_body = render_body(job_name, entries)?;
        debug!(job = %job_name, to = %destination, bytes = html_body.len(), "mail rendered");

        self.transport
            .send(MailMessage {
                from: self.sender.clone(),
                to: destination.to_string(),
                subject: subject(job_name),
                html_body,
            })
            .await?;

        info!(job = %job_name, to = %destination, items = entries.len(), "mail notification sent");
        Ok(())
    }
}

pub fn subject(job_name: &str) -> String {
    format!("Update on watched job {job_name}")
}

/// Render the HTML body. Every interpolated value is escaped.
pub fn render_body(job_name: &str, entries: &[DiffEntry]) -> Result<String, NotifyError> {
    let mut out = String::with_capacity(512 + entries.len() * 128);
    render_into(&mut out, job_name, entries).map_err(|e| NotifyError::Render(e.to_string()))?;
    Ok(out)
}

fn render_into(out: &mut String, job_name: &str, entries: &[DiffEntry]) -> std::fmt::Result {
    writeln!(out, "<html>\n<head>\n</head>")?;
    writeln!(out, "<body style=\"font-family: Arial\">")?;
    writeln!(out, "Hi.<br />\n<br />")?;
    writeln!(
        out,
        "You are receiving this mail because you registered to get updates on job <i>{}</i>.<br />\n<br />",
        escape_html(job_name)
    )?;

    if entries.is_empty() {
        writeln!(out, "No items were reported in this run.<br />")?;
    } else {
        writeln!(out, "<table cellpadding=\"0\" border=\"1\">")?;
        writeln!(out, "\t<tr>\n\t\t<th>Name/Item</th>\n\t\t<th>Old/new value</th>\n\t</tr>")?;
        for entry in entries {
            writeln!(out, "\t<tr>")?;
            writeln!(out, "\t\t<td valign=\"top\">{}</td>", escape_html(&entry.item))?;
            writeln!(
                out,
                "\t\t<td valign=\"top\">\n\t\t\tOld: {}<br />\n\t\t\tNew: {}\n\t\t</td>",
                escape_html(&entry.old_value),
                escape_html(&entry.new_value)
            )?;
            writeln!(out, "\t</tr>")?;
        }
        writeln!(out, "</table>")?;
    }

    writeln!(out, "<br />\nYours, webwatch.<br />")?;
    writeln!(out, "</body>\n</html>")
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
