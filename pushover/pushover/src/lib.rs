#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

//! Pushover is Pushover API client with attachment support in Rust 2021 edition.
//!
//! ```no_run
//! # async fn run() -> Result<(), pushover::NotificationError> {
//! use pushover::{Client, Message, Options, Priority};
//!
//! let client = Client::new(Options::new("token", "user"))?;
//! let mut message = Message::new("backup finished");
//! message.priority = Some(Priority::Low);
//! message.file = Some(std::path::Path::new("chart.png").into());
//! let delivery = client.send(&message).await?;
//! println!("{:?}", delivery.response);
//! # Ok(())
//! # }
//! ```

pub use attachment::{Attachment, AttachmentError, AttachmentSource};
pub use client::{Client, Delivery, HttpOptions, Options, Response, SOUND_REFRESH_INTERVAL};
pub use error::{ErrorReporter, NotificationError};
pub use message::{fill_defaults, Fields, Message, Monospace, Priority, HTML, OPTIONAL_FIELDS};
pub use multipart::{encode, Boundary};
pub use sounds::{Sound, SoundTable, Sounds};

mod attachment;
mod client;
mod error;
mod message;
pub mod multipart;
mod sounds;

#[cfg(test)]
fn server_url() -> String {
    mockito::server_url()
}

#[cfg(not(test))]
fn server_url() -> String {
    "https://api.pushover.net".to_string()
}

/// Shorthand function to send notification to Pushover.
/// ```no_run
/// # async fn run() {
/// use pushover::send_notification;
/// let _ = send_notification("token", "user", "message").await;
/// let _ = send_notification("token", "group", "message").await;
/// # }
/// ```
pub async fn send_notification<S>(
    token: S,
    identifier: S,
    message: S,
) -> Result<Delivery, NotificationError>
where
    S: Into<String>,
{
    let client = Client::new(Options::new(token, identifier))?;
    client.send(&Message::new(message)).await
}
