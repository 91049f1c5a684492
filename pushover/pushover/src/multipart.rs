//! `multipart/form-data` request bodies. <https://www.rfc-editor.org/rfc/rfc7578>

use std::fmt;
use std::iter;

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::{Attachment, Fields};

/// Form field name of the attachment part. <https://pushover.net/api#attachments>
pub const ATTACHMENT_FIELD: &str = "attachment";
/// Content type of an attachment that declares none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const CRLF: &[u8] = b"\r\n";
const BOUNDARY_LENGTH: usize = 24;

/// Delimiter between parts of a body.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Boundary(String);

impl Boundary {
    /// Generates a random boundary.
    pub fn random() -> Self {
        let suffix: String = iter::repeat(())
            .map(|()| thread_rng().sample(Alphanumeric))
            .map(char::from)
            .take(BOUNDARY_LENGTH)
            .collect();
        Self(format!("----pushover{suffix}"))
    }

    /// Boundary token without leading dashes.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the `Content-Type` header of a body framed with this boundary.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.0)
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// quoted-string parameters may not carry quotes or line breaks
fn escape(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn open_part(body: &mut Vec<u8>, boundary: &Boundary, disposition: &str) {
    body.extend_from_slice(b"--");
    body.extend_from_slice(boundary.as_str().as_bytes());
    body.extend_from_slice(CRLF);
    body.extend_from_slice(b"Content-Disposition: form-data; ");
    body.extend_from_slice(disposition.as_bytes());
    body.extend_from_slice(CRLF);
}

/// Encodes `fields` and an optional `attachment` into one `multipart/form-data` body.
///
/// Every non-empty field becomes a text part in map order. The attachment, if any,
/// becomes the last part named `attachment`, its content copied byte for byte.
/// Empty values and fields named `file` or `attachment` are skipped.
///
/// A body with no parts at all is a lone boundary line followed by the close delimiter.
pub fn encode(
    fields: &Fields,
    boundary: &Boundary,
    attachment: Option<&Attachment>,
) -> Vec<u8> {
    let mut body = Vec::new();
    let mut parts = 0usize;

    let texts = fields
        .iter()
        .filter(|(k, v)| !v.is_empty() && *k != "file" && *k != ATTACHMENT_FIELD);
    for (name, value) in texts {
        open_part(&mut body, boundary, &format!("name=\"{}\"", escape(name)));
        body.extend_from_slice(CRLF);
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(CRLF);
        parts += 1;
    }

    if let Some(a) = attachment {
        let disposition = format!(
            "name=\"{ATTACHMENT_FIELD}\"; filename=\"{}\"",
            escape(a.filename())
        );
        open_part(&mut body, boundary, &disposition);
        let content_type = a
            .mime()
            .map_or_else(|| DEFAULT_CONTENT_TYPE.to_string(), ToString::to_string);
        body.extend_from_slice(b"Content-Type: ");
        body.extend_from_slice(content_type.as_bytes());
        body.extend_from_slice(CRLF);
        body.extend_from_slice(CRLF);
        body.extend_from_slice(a.content());
        body.extend_from_slice(CRLF);
        parts += 1;
    }

    if parts == 0 {
        body.extend_from_slice(b"--");
        body.extend_from_slice(boundary.as_str().as_bytes());
        body.extend_from_slice(CRLF);
    }

    body.extend_from_slice(b"--");
    body.extend_from_slice(boundary.as_str().as_bytes());
    body.extend_from_slice(b"--");
    body.extend_from_slice(CRLF);
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    fn boundary() -> Boundary {
        Boundary("XYZ".to_string())
    }

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn t_text_parts() {
        let f = fields(&[("token", "T"), ("user", "U"), ("message", "hello")]);
        let body = encode(&f, &boundary(), None);
        let expected = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"message\"\r\n\r\nhello\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"token\"\r\n\r\nT\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"user\"\r\n\r\nU\r\n\
            --XYZ--\r\n";
        assert_eq!(expected, String::from_utf8(body).unwrap());
    }

    #[test]
    fn t_single_field_has_no_attachment_part() {
        let body = encode(&fields(&[("message", "hello")]), &boundary(), None);
        assert_eq!(1, count(&body, b"--XYZ\r\n"));
        assert_eq!(1, count(&body, b"--XYZ--\r\n"));
        assert_eq!(0, count(&body, b"attachment"));
        assert!(body.ends_with(b"hello\r\n--XYZ--\r\n"));
    }

    #[test]
    fn t_empty_fields_are_omitted() {
        let f = fields(&[
            ("message", "hello"),
            ("title", ""),
            ("device", ""),
            ("file", "/tmp/x"),
            ("url", "https://example.com"),
        ]);
        let body = String::from_utf8(encode(&f, &boundary(), None)).unwrap();
        assert!(body.contains("name=\"url\"\r\n\r\nhttps://example.com\r\n"));
        assert!(!body.contains("name=\"title\""));
        assert!(!body.contains("name=\"device\""));
        assert!(!body.contains("name=\"file\""));
        assert_eq!(2, body.matches("Content-Disposition").count());
    }

    #[test]
    fn t_nothing_to_encode() {
        let body = encode(&Fields::new(), &boundary(), None);
        assert_eq!(b"--XYZ\r\n--XYZ--\r\n".to_vec(), body);
    }

    #[test]
    fn t_attachment_part() {
        let content: Vec<u8> = vec![0x89, 0x00, 0x0D, 0x0A, 0xFF];
        let a = Attachment::new("img.bin", content.clone());
        let f = fields(&[("message", "img")]);
        let body = encode(&f, &boundary(), Some(&a));

        let head = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"message\"\r\n\r\nimg\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"attachment\"; filename=\"img.bin\"\r\n\
            Content-Type: application/octet-stream\r\n\r\n";
        let tail = "\r\n--XYZ--\r\n";
        assert_eq!(head.len() + content.len() + tail.len(), body.len());
        assert_eq!(head.as_bytes(), &body[..head.len()]);
        assert_eq!(
            content.as_slice(),
            &body[head.len()..head.len() + content.len()]
        );
        assert_eq!(tail.as_bytes(), &body[head.len() + content.len()..]);
    }

    #[test]
    fn t_attachment_only() {
        let a = Attachment::new("a.png", vec![1u8, 2]).with_mime(mime::IMAGE_PNG);
        let body = encode(&Fields::new(), &boundary(), Some(&a));
        let mut expected = b"--XYZ\r\n\
            Content-Disposition: form-data; name=\"attachment\"; filename=\"a.png\"\r\n\
            Content-Type: image/png\r\n\r\n"
            .to_vec();
        expected.extend_from_slice(&[1, 2]);
        expected.extend_from_slice(b"\r\n--XYZ--\r\n");
        assert_eq!(expected, body);
    }

    #[test]
    fn t_quotes_in_filename() {
        let a = Attachment::new("a\"b\r\n.png", Vec::new());
        let body = encode(&Fields::new(), &boundary(), Some(&a));
        let body = String::from_utf8(body).unwrap();
        assert!(body.contains("filename=\"a%22b%0D%0A.png\""));
    }

    #[test]
    fn t_random_boundary() {
        let boundaries: HashSet<_> = (0..1000).map(|_| Boundary::random()).collect();
        assert_eq!(1000, boundaries.len());

        let b = Boundary::random();
        assert_eq!(BOUNDARY_LENGTH + "----pushover".len(), b.as_str().len());
        assert!(b.as_str().chars().all(|c| c == '-' || c.is_ascii_alphanumeric()));
        assert_eq!(
            format!("multipart/form-data; boundary={b}"),
            b.content_type()
        );
    }
}
