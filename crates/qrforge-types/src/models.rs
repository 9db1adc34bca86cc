use serde::{Deserialize, Serialize};

/// What kind of payload a QR code encodes. Stored as uppercase text in the
/// database and on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QrType {
    #[serde(rename = "URL")]
    Url,
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "EMAIL")]
    Email,
    #[serde(rename = "PHONE")]
    Phone,
    #[serde(rename = "SMS")]
    Sms,
    #[serde(rename = "WIFI")]
    Wifi,
}

impl Default for QrType {
    fn default() -> Self {
        QrType::Url
    }
}

impl QrType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QrType::Url => "URL",
            QrType::Text => "TEXT",
            QrType::Email => "EMAIL",
            QrType::Phone => "PHONE",
            QrType::Sms => "SMS",
            QrType::Wifi => "WIFI",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "URL" => Some(QrType::Url),
            "TEXT" => Some(QrType::Text),
            "EMAIL" => Some(QrType::Email),
            "PHONE" => Some(QrType::Phone),
            "SMS" => Some(QrType::Sms),
            "WIFI" => Some(QrType::Wifi),
            _ => None,
        }
    }
}
