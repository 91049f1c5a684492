use std::fmt;

use thiserror::Error;

use crate::{AttachmentError, Delivery};

/// Notification error.
#[derive(Error, Debug)]
pub enum NotificationError {
    /// Transport failure from [`ureq`] crate e.g. connection refused, DNS or TLS failure.
    #[error("ureq error: {0}")]
    UReq(#[from] Box<ureq::Error>),
    /// Response body is not the JSON document Pushover promises.
    #[error("deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
    /// Pushover accepted the request but answered with an `errors` list.
    /// <https://pushover.net/api#response>
    #[error("API error: {}", .0.join("; "))]
    Api(Vec<String>),
    /// Pushover answered, but with a body carrying an error, see `source`.
    /// Status and raw body stay available in `delivery`.
    #[error("{source} (HTTP {})", .delivery.status)]
    Answered {
        /// What Pushover answered.
        delivery: Box<Delivery>,
        /// [`NotificationError::Api`] or [`NotificationError::Deserialize`].
        #[source]
        source: Box<NotificationError>,
    },
    /// Wrapped [`crate::AttachmentError`].
    #[error("attachment error: {0}")]
    Attachment(#[from] AttachmentError),
    /// HTML and monospace are mutually exclusive. <https://pushover.net/api#html>
    #[error("html and monospace are mutually exclusive")]
    HTMLMonospace,
    /// Message is required and must not be empty. <https://pushover.net/api#messages>
    #[error("message is empty")]
    EmptyMessage,
    /// API or proxy URL could not be parsed.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Blocking request task panicked or was cancelled.
    #[error("request task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    /// Spawning the sound refresh or a dispatched request needs a Tokio runtime.
    #[error("no Tokio runtime is running")]
    NoRuntime,
}

impl NotificationError {
    /// The answer of Pushover, if the request got that far.
    pub fn delivery(&self) -> Option<&Delivery> {
        match self {
            Self::Answered { delivery, .. } => Some(delivery),
            _ => None,
        }
    }
}

/// Receives application and parse errors of a [`crate::Client`].
///
/// Without a reporter those errors are returned from [`crate::Client::send`] instead,
/// and failures of the background sound refresh are logged at error level.
///
/// Any `Fn(&NotificationError) + Send + Sync` closure is a reporter:
///
/// ```rust
/// # use std::sync::Arc;
/// # use pushover::{ErrorReporter, NotificationError};
/// let reporter: Arc<dyn ErrorReporter> = Arc::new(|e: &NotificationError| eprintln!("{e}"));
/// ```
pub trait ErrorReporter: Send + Sync {
    /// Report one error.
    fn report(&self, error: &NotificationError);
}

impl<F> ErrorReporter for F
where
    F: Fn(&NotificationError) + Send + Sync,
{
    fn report(&self, error: &NotificationError) {
        self(error)
    }
}

impl fmt::Debug for dyn ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorReporter")
    }
}
