use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr as _;

use mime::Mime;
use thiserror::Error;
use url::Url;

/// Attachment error.
#[derive(Error, Debug)]
pub enum AttachmentError {
    /// Error from [`std::io`].
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    /// Error from [`ureq`] crate.
    #[error("ureq error: {0}")]
    UReq(#[from] Box<ureq::Error>),
    /// Error from [`url`] crate.
    #[error("attachment URL error: {0}")]
    Url(#[from] url::ParseError),
    /// Failed to infer MIME type, no extra information.
    #[error("unknown MIME type")]
    Infer,
    /// Download task panicked or was cancelled.
    #[error("download task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Notification attachment. Image in most cases.
#[derive(Clone, Debug, PartialEq)]
pub struct Attachment {
    /// Filename.
    pub(crate) filename: String,
    /// Declared MIME type, `application/octet-stream` is sent when absent.
    pub(crate) mime: Option<Mime>,
    /// Attachment content.
    pub(crate) content: Vec<u8>,
}

fn last_segment(path: &Path) -> &str {
    path.file_name()
        .map_or("filename", |t| t.to_str().map_or("filename", |t| t))
}

fn infer_mime(buffer: &[u8]) -> Result<(Mime, &'static str), AttachmentError> {
    let inferred = infer::get(buffer).ok_or(AttachmentError::Infer)?;
    let mime = Mime::from_str(inferred.mime_type()).map_err(|_e| AttachmentError::Infer)?;
    Ok((mime, inferred.extension()))
}

impl Attachment {
    /// Creates an [`Attachment`] without declared MIME type.
    pub fn new<T, C>(filename: T, content: C) -> Self
    where
        T: Into<String>,
        C: Into<Vec<u8>>,
    {
        Self {
            filename: filename.into(),
            mime: None,
            content: content.into(),
        }
    }

    /// Declares MIME type of the [`Attachment`].
    pub fn with_mime(mut self, mime: Mime) -> Self {
        self.mime = Some(mime);
        self
    }

    /// Filename sent along with the content.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Declared MIME type, if any.
    pub fn mime(&self) -> Option<&Mime> {
        self.mime.as_ref()
    }

    /// Raw content.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Creates an [`Attachment`] from path.
    ///
    /// The whole file is read eagerly and named after the last segment of `path`.
    /// No MIME type is declared.
    pub fn from_path<T>(path: T) -> Result<Self, AttachmentError>
    where
        T: AsRef<Path>,
    {
        let mut buffer = Vec::new();
        let mut handle = File::open(path.as_ref())?;
        handle.read_to_end(&mut buffer)?;
        Ok(Self::new(last_segment(path.as_ref()), buffer))
    }

    /// Creates an [`Attachment`] from URL, MIME type is inferred from content.
    pub async fn from_url<T>(url: T) -> Result<Self, AttachmentError>
    where
        T: AsRef<str>,
    {
        let parsed = Url::parse(url.as_ref())?;
        let filename = parsed
            .path_segments()
            .map_or("filename", |s| s.last().map_or("filename", |s| s))
            .to_owned();
        let buffer = tokio::task::spawn_blocking(move || {
            let res = ureq::get(parsed.as_str())
                .call()
                .map_err(|e| AttachmentError::UReq(Box::new(e)))?;
            let mut buffer = Vec::new();
            res.into_reader().read_to_end(&mut buffer)?;
            Ok::<_, AttachmentError>(buffer)
        })
        .await??;
        let (mime, _) = infer_mime(&buffer)?;
        Ok(Self::new(filename, buffer).with_mime(mime))
    }
}

/// Content without filename e.g. piped from standard input,
/// MIME type is inferred and the filename follows its extension.
impl TryFrom<Vec<u8>> for Attachment {
    type Error = AttachmentError;

    fn try_from(buffer: Vec<u8>) -> Result<Self, Self::Error> {
        let (mime, extension) = infer_mime(&buffer)?;
        Ok(Self::new(format!("attachment.{extension}"), buffer).with_mime(mime))
    }
}

/// Where the attachment of a [`crate::Message`] comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum AttachmentSource {
    /// Read from file system when the message is sent.
    Path(PathBuf),
    /// Already prepared.
    Attachment(Attachment),
}

impl AttachmentSource {
    /// Loads the file, or hands out the prepared attachment untouched.
    pub fn resolve(&self) -> Result<Cow<'_, Attachment>, AttachmentError> {
        match self {
            Self::Path(p) => Ok(Cow::Owned(Attachment::from_path(p)?)),
            Self::Attachment(a) => Ok(Cow::Borrowed(a)),
        }
    }
}

impl From<PathBuf> for AttachmentSource {
    fn from(p: PathBuf) -> Self {
        Self::Path(p)
    }
}

impl From<&Path> for AttachmentSource {
    fn from(p: &Path) -> Self {
        Self::Path(p.to_path_buf())
    }
}

impl From<Attachment> for AttachmentSource {
    fn from(a: Attachment) -> Self {
        Self::Attachment(a)
    }
}
