use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

/// SMTP settings, read once at startup. When absent the share endpoint
/// reports a delivery error instead of panicking mid-request.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Sends QR share emails over SMTP (TLS via relay).
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn new(config: MailerConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .with_context(|| format!("invalid SMTP relay host '{}'", config.host))?
            .credentials(Credentials::new(config.username, config.password))
            .build();
        let from: Mailbox = config
            .from
            .parse()
            .with_context(|| format!("invalid sender address '{}'", config.from))?;

        info!("SMTP mailer configured for relay {}", config.host);
        Ok(Self { transport, from })
    }

    /// Email a QR code: HTML body with the sender's name and message, the
    /// encoded payload text, the image inline, and the same PNG attached.
    pub async fn send_qr(
        &self,
        to: Mailbox,
        sender_name: &str,
        note: &str,
        payload_text: &str,
        record_id: &str,
        png: Vec<u8>,
    ) -> Result<()> {
        // Sender name, note, and payload are all user-controlled
        let sender_name = escape_html(sender_name);
        let note = escape_html(note);
        let payload_text = escape_html(payload_text);
        let html = format!(
            "<div>\
             <h2>QR Code from {sender_name}</h2>\
             <p>{note}</p>\
             <p>This QR Code contains: {payload_text}</p>\
             <img src=\"cid:qrcode\" alt=\"QR Code\" />\
             <p>Scan the QR code with your device to access the content.</p>\
             </div>"
        );

        let png_type = ContentType::parse("image/png").context("image/png content type")?;
        let inline = Attachment::new_inline("qrcode".to_string()).body(png.clone(), png_type.clone());
        let attachment =
            Attachment::new(format!("qrcode-{record_id}.png")).body(png, png_type);

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format!("QR Code shared by {sender_name}"))
            .multipart(
                MultiPart::mixed()
                    .multipart(
                        MultiPart::related()
                            .singlepart(
                                SinglePart::builder()
                                    .header(ContentType::TEXT_HTML)
                                    .body(html),
                            )
                            .singlepart(inline),
                    )
                    .singlepart(attachment),
            )
            .context("building share email")?;

        self.transport.send(email).await.context("SMTP send")?;
        Ok(())
    }
}

/// Minimal HTML escaping for text interpolated into the email body.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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
