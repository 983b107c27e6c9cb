//! Builds `multipart/mixed` messages
//!
//! ## Usage
//!
//! ```rust
//! use smtp_xoauth2::Message;
//!
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let mut message = Message::new();
//! message
//!     .to(vec!["hei@domain.tld".parse()?])
//!     .subject("Happy new year")
//!     .body("text/plain", "Be happy!");
//! message.attach_with_type(b"a,b\r\n1,2\r\n".to_vec(), "/tmp/report.csv", "text/csv");
//!
//! let bytes = message.formatted()?;
//! # assert!(!bytes.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! Which produces:
//!
//! ```sh
//! MIME-Version: 1.0
//! Date: Sat, 12 Dec 2020 16:33:19 -0000
//! To: hei@domain.tld
//! Subject: Happy new year
//! Content-Type: multipart/mixed; boundary=F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYS
//!
//! --F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYS
//! Content-Type: text/plain; charset=utf-8
//! Content-Transfer-Encoding: base64
//!
//! QmUgaGFwcHkh
//! --F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYS
//! Content-Type: text/csv
//! Content-Transfer-Encoding: base64
//! Content-Disposition: attachment; filename="report.csv"
//!
//! YSxiDQoxLDINCg==
//! --F2mTKN843loAAAAA8porEdAjCKhArPxGeahYoZYS--
//! ```
//!
//! Every part is base64 encoded. Non-ASCII header values are written as
//! RFC 2047 encoded words, except address lists which are kept as UTF-8
//! (RFC 6532). File names are RFC 2231 parameters.
//!
//! Blind carbon copy recipients are only part of the SMTP envelope and never
//! appear in the rendered headers, unless a `Bcc` header is set explicitly
//! with [`Message::set_header`].

use std::time::SystemTime;

use mime::Mime;

pub use self::{attachment::AttachmentFile, header::Headers};
use self::{
    attachment::Disposition,
    header::{write_header, write_raw_header},
};
use crate::{
    address::{Address, Envelope},
    base64,
    error::{self, Error},
};

mod attachment;
pub mod header;

const DEFAULT_BODY_TYPE: &str = "text/plain";
const BOUNDARY_LEN: usize = 40;

// Headers written by the serializer itself
const GENERATED_HEADERS: [&str; 6] = [
    "MIME-Version",
    "Date",
    "To",
    "Cc",
    "Content-Type",
    "Content-Transfer-Encoding",
];

/// Main body of a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Body {
    content: Vec<u8>,
    content_type: String,
}

/// Email message
///
/// Setters record data as-is. Everything is validated when the message is
/// serialized, which never mutates it: the same message can be rendered,
/// and sent, several times, each rendering getting a new boundary and date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    headers: Headers,
    to: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    body: Body,
    attachments: Vec<AttachmentFile>,
    embedded: Vec<AttachmentFile>,
}

impl Message {
    /// Creates an empty message
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the values of a header
    ///
    /// Headers are rendered in the order they were first set, after the
    /// generated ones.
    pub fn set_header(&mut self, name: impl Into<String>, values: Vec<String>) -> &mut Self {
        self.headers.set_raw(name, values);
        self
    }

    /// Caller-defined headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Sets the `Subject` header
    pub fn subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.set_header("Subject", vec![subject.into()])
    }

    /// Sets the `From` header
    ///
    /// The envelope sender is the authenticated account, whatever this
    /// header says.
    pub fn from(&mut self, from: &Address) -> &mut Self {
        self.set_header("From", vec![from.to_string()])
    }

    /// Sets the primary recipients
    pub fn to(&mut self, to: Vec<Address>) -> &mut Self {
        self.to = to;
        self
    }

    /// Sets the carbon copy recipients
    pub fn cc(&mut self, cc: Vec<Address>) -> &mut Self {
        self.cc = cc;
        self
    }

    /// Sets the blind carbon copy recipients
    pub fn bcc(&mut self, bcc: Vec<Address>) -> &mut Self {
        self.bcc = bcc;
        self
    }

    /// Sets the main body
    ///
    /// An empty `content_type` means `text/plain`. The body is sent as
    /// UTF-8.
    pub fn body(
        &mut self,
        content_type: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.body = Body {
            content: content.into(),
            content_type: content_type.into(),
        };
        self
    }

    /// Attaches a file
    ///
    /// Only the base name of `path` is kept. The returned file must be given
    /// a content type before the message is serialized.
    pub fn attach(&mut self, content: Vec<u8>, path: &str) -> &mut AttachmentFile {
        self.attachments.push(AttachmentFile::new(path, content));
        let last = self.attachments.len() - 1;
        &mut self.attachments[last]
    }

    /// Attaches a file with its content type
    pub fn attach_with_type(
        &mut self,
        content: Vec<u8>,
        path: &str,
        content_type: impl Into<String>,
    ) -> &mut AttachmentFile {
        let file = self.attach(content, path);
        file.set_content_type(content_type);
        file
    }

    /// Embeds a file to reference from an HTML body
    ///
    /// The part gets `Content-ID: <name>`, so an image embedded from
    /// `img/logo.png` is shown by `<img src="cid:logo.png">`. Serializing
    /// fails when the name is not a valid `msg-id`, such as one holding a
    /// space or non-ASCII characters.
    pub fn embed(&mut self, content: Vec<u8>, path: &str) -> &mut AttachmentFile {
        self.embedded.push(AttachmentFile::new(path, content));
        let last = self.embedded.len() - 1;
        &mut self.embedded[last]
    }

    /// Embeds a file with its content type
    pub fn embed_with_type(
        &mut self,
        content: Vec<u8>,
        path: &str,
        content_type: impl Into<String>,
    ) -> &mut AttachmentFile {
        let file = self.embed(content, path);
        file.set_content_type(content_type);
        file
    }

    /// Attached files, in order
    pub fn attachments(&self) -> &[AttachmentFile] {
        &self.attachments
    }

    /// Embedded files, in order
    pub fn embedded(&self) -> &[AttachmentFile] {
        &self.embedded
    }

    /// SMTP envelope for this message
    ///
    /// Recipients are `to`, `cc` and `bcc`, without duplicates. Fails if the
    /// message has no recipient.
    pub fn envelope(&self, from: Address) -> Result<Envelope, Error> {
        let recipients = self
            .to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .cloned();
        Envelope::new(from, recipients)
    }

    /// Renders the message with the current date and a random boundary
    pub fn formatted(&self) -> Result<Vec<u8>, Error> {
        self.formatted_with(SystemTime::now(), &make_boundary())
    }

    /// Renders the message with a given date and boundary
    ///
    /// The output only depends on the message and the two arguments.
    pub fn formatted_with(&self, date: SystemTime, boundary: &str) -> Result<Vec<u8>, Error> {
        check_boundary(boundary)?;

        let mut out = String::new();
        write_header(&mut out, "MIME-Version", "1.0")?;
        write_header(&mut out, "Date", &header::format_date(date))?;
        write_raw_header(&mut out, "To", &join_addresses(&self.to))?;
        if !self.cc.is_empty() {
            write_raw_header(&mut out, "Cc", &join_addresses(&self.cc))?;
        }

        for (name, values) in self.headers.iter() {
            if GENERATED_HEADERS
                .iter()
                .any(|generated| generated.eq_ignore_ascii_case(name))
            {
                return Err(error::encoding(format!(
                    "header {name:?} is generated and cannot be set"
                )));
            }
            write_header(&mut out, name, &values.join(", "))?;
        }

        let has_parts = !self.body.content.is_empty()
            || !self.embedded.is_empty()
            || !self.attachments.is_empty();
        if has_parts {
            // checked boundaries are short enough to stay on one line
            out.push_str("Content-Type: multipart/mixed; boundary=");
            if boundary.contains(['(', ')', ',', '/', ':', '=', '?']) {
                out.push('"');
                out.push_str(boundary);
                out.push('"');
            } else {
                out.push_str(boundary);
            }
            out.push_str("\r\n");
        }
        out.push_str("\r\n");

        if !has_parts {
            return Ok(out.into_bytes());
        }

        if !self.body.content.is_empty() {
            write_delimiter(&mut out, boundary);
            self.write_body(&mut out)?;
        }
        for file in &self.embedded {
            write_delimiter(&mut out, boundary);
            file.write_part(&mut out, Disposition::Inline)?;
        }
        for file in &self.attachments {
            write_delimiter(&mut out, boundary);
            file.write_part(&mut out, Disposition::Attachment)?;
        }

        out.push_str("--");
        out.push_str(boundary);
        out.push_str("--\r\n");

        Ok(out.into_bytes())
    }

    fn write_body(&self, out: &mut String) -> Result<(), Error> {
        let content_type = if self.body.content_type.is_empty() {
            DEFAULT_BODY_TYPE
        } else {
            &self.body.content_type
        };
        let mime = content_type.parse::<Mime>().map_err(error::encoding)?;

        write_header(
            out,
            "Content-Type",
            &format!("{}; charset=utf-8", mime.essence_str()),
        )?;
        write_header(out, "Content-Transfer-Encoding", "base64")?;
        out.push_str("\r\n");
        out.push_str(&base64::encode_wrapped(&self.body.content));
        out.push_str("\r\n");
        Ok(())
    }
}

fn write_delimiter(out: &mut String, boundary: &str) {
    out.push_str("--");
    out.push_str(boundary);
    out.push_str("\r\n");
}

fn join_addresses(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<String>>()
        .join(", ")
}

/// Create a random MIME boundary.
fn make_boundary() -> String {
    std::iter::repeat_with(fastrand::alphanumeric)
        .take(BOUNDARY_LEN)
        .collect()
}

// https://tools.ietf.org/html/rfc2046#section-5.1.1
fn check_boundary(boundary: &str) -> Result<(), Error> {
    let valid = (1..=70).contains(&boundary.len())
        && boundary
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "'()+_,-./:=?".contains(c));
    if valid {
        Ok(())
    } else {
        Err(error::encoding(format!("invalid boundary {boundary:?}")))
    }
}
