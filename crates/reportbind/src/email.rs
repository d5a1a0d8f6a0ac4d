//! Gmail API delivery of the merged PDF.

use std::env;
use std::path::Path;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use log::{debug, info};
use serde_json::json;

use crate::error::DeliveryError;

const DEFAULT_DISPLAY_NAME: &str = "報告書作成ツール";
const DEFAULT_API_ENDPOINT: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

/// Gmail sender credentials and identity, from the environment.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Sender address, `EMAIL_SENDER`.
    pub sender: Option<String>,
    /// Display name on the From header, `EMAIL_DISPLAY_NAME`.
    pub display_name: String,
    /// OAuth2 bearer token for the Gmail API, `GMAIL_ACCESS_TOKEN`.
    pub access_token: Option<String>,
    /// Send endpoint; overridable via `GMAIL_API_ENDPOINT` for testing.
    pub api_endpoint: String,
}

impl EmailConfig {
    pub fn from_env() -> Self {
        let non_empty = |key: &str| {
            env::var(key)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            sender: non_empty("EMAIL_SENDER"),
            display_name: non_empty("EMAIL_DISPLAY_NAME")
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
            access_token: non_empty("GMAIL_ACCESS_TOKEN"),
            api_endpoint: non_empty("GMAIL_API_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
        }
    }

    /// True when both a sender and a token are present.
    pub fn is_configured(&self) -> bool {
        self.sender.is_some() && self.access_token.is_some()
    }

    /// Sends `attachment` to `recipient` through the Gmail API.
    pub fn send_with_attachment(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        attachment: &Path,
    ) -> Result<(), DeliveryError> {
        let (Some(sender), Some(token)) = (&self.sender, &self.access_token) else {
            return Err(DeliveryError::NotConfigured);
        };

        let attachment_bytes =
            std::fs::read(attachment).map_err(|source| DeliveryError::ReadAttachment {
                path: attachment.to_path_buf(),
                source,
            })?;
        let attachment_name = attachment
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("report.pdf");

        let mime = build_mime_message(
            sender,
            &self.display_name,
            recipient,
            subject,
            body,
            attachment_name,
            &attachment_bytes,
        );
        let raw = URL_SAFE_NO_PAD.encode(mime.as_bytes());
        debug!(
            "Sending {} ({} bytes) to {}",
            attachment_name,
            attachment_bytes.len(),
            recipient
        );

        let client = reqwest::blocking::Client::new();
        let response = client
            .post(&self.api_endpoint)
            .bearer_auth(token)
            .json(&json!({ "raw": raw }))
            .send()
            .map_err(|e| DeliveryError::SendFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(DeliveryError::SendFailed(format!(
                "Gmail API returned {}: {}",
                status,
                detail.trim()
            )));
        }

        info!("Sent '{}' to {}", subject, recipient);
        Ok(())
    }
}

/// RFC 2047 encoded-word form; plain ASCII passes through unchanged.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

fn build_mime_message(
    sender: &str,
    display_name: &str,
    recipient: &str,
    subject: &str,
    body: &str,
    attachment_name: &str,
    attachment: &[u8],
) -> String {
    let boundary = format!("reportbind-{}", uuid::Uuid::new_v4());
    let encoded_name = encode_header(attachment_name);

    let mut message = String::new();
    message.push_str(&format!(
        "From: {} <{}>\r\n",
        encode_header(display_name),
        sender
    ));
    message.push_str(&format!("To: {}\r\n", recipient));
    message.push_str(&format!("Subject: {}\r\n", encode_header(subject)));
    message.push_str("MIME-Version: 1.0\r\n");
    message.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
        boundary
    ));

    message.push_str(&format!("--{}\r\n", boundary));
    message.push_str("Content-Type: text/plain; charset=\"UTF-8\"\r\n");
    message.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    message.push_str(&wrap_base64(&STANDARD.encode(body.as_bytes())));
    message.push_str("\r\n");

    message.push_str(&format!("--{}\r\n", boundary));
    message.push_str(&format!(
        "Content-Type: application/pdf; name=\"{}\"\r\n",
        encoded_name
    ));
    message.push_str(&format!(
        "Content-Disposition: attachment; filename=\"{}\"\r\n",
        encoded_name
    ));
    message.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    message.push_str(&wrap_base64(&STANDARD.encode(attachment)));
    message.push_str("\r\n");

    message.push_str(&format!("--{}--\r\n", boundary));
    message
}

/// Base64 bodies are wrapped at 76 columns per RFC 2045.
fn wrap_base64(encoded: &str) -> String {
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / 76 * 2);
    let bytes = encoded.as_bytes();
    for chunk in bytes.chunks(76) {
        wrapped.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        wrapped.push_str("\r\n");
    }
    wrapped
}
