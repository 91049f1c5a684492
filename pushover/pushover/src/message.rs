use std::collections::BTreeMap;

use crate::{AttachmentSource, NotificationError};

/// Ordered form fields of a request, field name to wire value.
pub type Fields = BTreeMap<String, String>;

/// Optional parameters every request carries once defaults are filled,
/// empty when not given.
pub const OPTIONAL_FIELDS: [&str; 7] = [
    "device",
    "title",
    "url",
    "url_title",
    "priority",
    "timestamp",
    "sound",
];

/// To enable HTML formatting. <https://pushover.net/api#html>
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
pub enum HTML {
    /// Plain text (default)
    #[strum(to_string = "0", serialize = "plain")]
    Plain,
    /// HTML
    #[strum(to_string = "1", serialize = "html")]
    HTML,
}

/// To enable monospace messages. <https://pushover.net/api#html>
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
pub enum Monospace {
    /// Normal (default)
    #[strum(to_string = "0", serialize = "normal")]
    Normal,
    /// Monospace
    #[strum(to_string = "1", serialize = "monospace")]
    Monospace,
}

/// Messages may be sent with a different priority
/// that affects how the message is presented to the user. <https://pushover.net/api#priority>
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
pub enum Priority {
    /// Normal (default)
    #[strum(to_string = "0", serialize = "normal")]
    Normal,
    /// Lowest
    #[strum(to_string = "-2", serialize = "lowest")]
    Lowest,
    /// Low
    #[strum(to_string = "-1", serialize = "low")]
    Low,
    /// High
    #[strum(to_string = "1", serialize = "high")]
    High,
    /// Emergency, pair with `retry` and `expire`
    #[strum(to_string = "2", serialize = "emergency")]
    Emergency,
}

/// Pushover API parameters <https://pushover.net/api#messages> and attachment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    /// Your message. Required.
    pub message: String,
    /// Overrides the API token of the client for this message.
    pub token: Option<String>,
    /// Overrides the user / group key of the client for this message.
    pub user: Option<String>,
    /// Your user's device name to send the message directly to that device,
    /// rather than all of the user's devices (multiple devices may be separated by a comma).
    /// <https://pushover.net/api#identifiers>
    pub device: Option<String>,
    /// Your message's title, otherwise your app's name is used. <https://pushover.net/api#messages>
    pub title: Option<String>,
    /// A supplementary URL to show with your message. <https://pushover.net/api#urls>
    pub url: Option<String>,
    /// A title for your supplementary URL,
    /// otherwise just the URL is shown. <https://pushover.net/api#urls>
    pub url_title: Option<String>,
    /// Messages may be sent with a different priority that affects
    /// how the message is presented to the user. <https://pushover.net/api#priority>
    pub priority: Option<Priority>,
    /// A Unix timestamp displayed instead of the time the API received the message.
    /// <https://pushover.net/api#timestamp>
    pub timestamp: Option<u64>,
    /// Name of a sound, see [`crate::SoundTable`]. <https://pushover.net/api#sounds>
    pub sound: Option<String>,
    /// To enable HTML formatting. <https://pushover.net/api#html>
    pub html: Option<HTML>,
    /// To enable monospace messages. <https://pushover.net/api#html>
    pub monospace: Option<Monospace>,
    /// Seconds until the message is deleted from devices. <https://pushover.net/api#ttl>
    pub ttl: Option<u64>,
    /// Seconds between retries of an emergency message. <https://pushover.net/api#priority>
    pub retry: Option<u64>,
    /// Seconds until an emergency message stops being retried.
    pub expire: Option<u64>,
    /// Other API parameters, sent as they are.
    pub extra: BTreeMap<String, String>,
    /// Optional attachment.
    pub file: Option<AttachmentSource>,
}

fn text(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

fn number(v: Option<u64>) -> String {
    v.filter(|v| *v != 0).map(|v| v.to_string()).unwrap_or_default()
}

/// Returns the fields of `message` with every optional field in [`OPTIONAL_FIELDS`]
/// present, empty when not given.
///
/// Credentials and attachment are not part of the result. `message` is not modified.
pub fn fill_defaults(message: &Message) -> Fields {
    let mut fields = Fields::new();
    fields.insert("message".to_string(), message.message.clone());
    fields.insert("device".to_string(), text(&message.device));
    fields.insert("title".to_string(), text(&message.title));
    fields.insert("url".to_string(), text(&message.url));
    fields.insert("url_title".to_string(), text(&message.url_title));
    fields.insert(
        "priority".to_string(),
        message
            .priority
            .filter(|p| *p != Priority::Normal)
            .map(|p| p.to_string())
            .unwrap_or_default(),
    );
    fields.insert("timestamp".to_string(), number(message.timestamp));
    fields.insert("sound".to_string(), text(&message.sound));

    let passthrough = [
        ("html", message.html.map(|h| h.to_string())),
        ("monospace", message.monospace.map(|m| m.to_string())),
        ("ttl", message.ttl.filter(|v| *v != 0).map(|v| v.to_string())),
        ("retry", message.retry.map(|v| v.to_string())),
        ("expire", message.expire.map(|v| v.to_string())),
    ];
    for (name, value) in passthrough {
        if let Some(value) = value {
            fields.insert(name.to_string(), value);
        }
    }
    for (name, value) in &message.extra {
        fields.entry(name.clone()).or_insert_with(|| value.clone());
    }
    fields
}

impl Message {
    /// Creates a [`Message`] with nothing but the text.
    ///
    /// ```rust
    /// # use pushover::{Message, Priority};
    /// let mut m = Message::new("backup finished");
    /// m.title = Some("cron".into());
    /// m.priority = Some(Priority::Low);
    /// ```
    pub fn new<T>(message: T) -> Self
    where
        T: Into<String>,
    {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Rejects messages the API would refuse anyway.
    pub fn validate(&self) -> Result<(), NotificationError> {
        if self.message.is_empty() {
            return Err(NotificationError::EmptyMessage);
        }
        // HTML and monospace are mutually exclusive <https://pushover.net/api#html>
        if self.html == Some(HTML::HTML) && self.monospace == Some(Monospace::Monospace) {
            return Err(NotificationError::HTMLMonospace);
        }
        Ok(())
    }
}
