use mime::Mime;

use super::header::{write_header, write_header_with_param, write_raw_header, Headers};
use crate::{
    base64,
    error::{self, Error},
};

/// How a file part is presented by the receiving client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    /// Downloadable file
    Attachment,
    /// Referenced from the body through its `Content-ID`
    Inline,
}

/// A file carried by a [`Message`](super::Message)
///
/// Only the base name of the path given on creation is kept. The
/// `Content-Type` header must be set before the message is serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    name: String,
    headers: Headers,
    content: Vec<u8>,
}

impl AttachmentFile {
    pub(crate) fn new(path: &str, content: Vec<u8>) -> Self {
        Self {
            name: base_name(path).to_owned(),
            headers: Headers::new(),
            content,
        }
    }

    /// The file name, without its directory
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw file content
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Headers rendered at the top of the part
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to the part headers
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Sets the `Content-Type` of the part
    pub fn set_content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
        self.headers
            .set_raw("Content-Type", vec![content_type.into()]);
        self
    }

    pub(crate) fn write_part(&self, out: &mut String, disposition: Disposition) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(error::encoding("attachment without a file name"));
        }
        if disposition == Disposition::Inline && !is_msg_id(&self.name) {
            return Err(error::encoding(format!(
                "{:?} cannot be used as a Content-ID",
                self.name
            )));
        }

        let content_type = self
            .headers
            .get_raw("Content-Type")
            .and_then(|values| values.first())
            .ok_or_else(|| {
                error::encoding(format!("attachment {:?} has no Content-Type", self.name))
            })?;
        content_type.parse::<Mime>().map_err(error::encoding)?;

        write_header(out, "Content-Type", content_type)?;
        write_header(out, "Content-Transfer-Encoding", "base64")?;
        match disposition {
            Disposition::Attachment => {
                write_header_with_param(
                    out,
                    "Content-Disposition",
                    "attachment",
                    "filename",
                    &self.name,
                )?;
            }
            Disposition::Inline => {
                write_header_with_param(out, "Content-Disposition", "inline", "filename", &self.name)?;
                write_raw_header(out, "Content-ID", &format!("<{}>", self.name))?;
            }
        }

        for (name, values) in self.headers.iter() {
            if is_generated(name) {
                continue;
            }
            write_header(out, name, &values.join(", "))?;
        }

        out.push_str("\r\n");
        out.push_str(&base64::encode_wrapped(&self.content));
        out.push_str("\r\n");
        Ok(())
    }
}

fn is_generated(name: &str) -> bool {
    [
        "Content-Type",
        "Content-Transfer-Encoding",
        "Content-Disposition",
        "Content-ID",
    ]
    .iter()
    .any(|generated| generated.eq_ignore_ascii_case(name))
}

fn base_name(path: &str) -> &str {
    match path.rsplit(['/', '\\']).next() {
        Some(".") | Some("..") | None => "",
        Some(name) => name,
    }
}

// https://tools.ietf.org/html/rfc5322#section-3.6.4
fn is_msg_id(name: &str) -> bool {
    let mut parts = name.splitn(2, '@');
    parts.next().is_some_and(is_dot_atom) && parts.next().map_or(true, is_dot_atom)
}

fn is_dot_atom(s: &str) -> bool {
    !s.is_empty()
        && s.split('.')
            .all(|atom| !atom.is_empty() && atom.bytes().all(is_atext))
}

fn is_atext(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-/=?^_`{|}~".contains(&b)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn path_is_stripped() {
        assert_eq!(AttachmentFile::new("/tmp/hello.txt", Vec::new()).name(), "hello.txt");
        assert_eq!(AttachmentFile::new("C:\\tmp\\report.pdf", Vec::new()).name(), "report.pdf");
        assert_eq!(AttachmentFile::new("hello.txt", Vec::new()).name(), "hello.txt");
        assert_eq!(AttachmentFile::new("/tmp/", Vec::new()).name(), "");
    }

    #[test]
    fn attachment() {
        let mut file = AttachmentFile::new("test.txt", b"Hello world!".to_vec());
        file.set_content_type("text/plain");

        let mut out = String::new();
        file.write_part(&mut out, Disposition::Attachment).unwrap();
        assert_eq!(
            out,
            concat!(
                "Content-Type: text/plain\r\n",
                "Content-Transfer-Encoding: base64\r\n",
                "Content-Disposition: attachment; filename=\"test.txt\"\r\n",
                "\r\n",
                "SGVsbG8gd29ybGQh\r\n",
            )
        );
    }

    #[test]
    fn attachment_inline() {
        let mut file = AttachmentFile::new("logo.png", vec![0x89, b'P', b'N', b'G']);
        file.set_content_type("image/png");

        let mut out = String::new();
        file.write_part(&mut out, Disposition::Inline).unwrap();
        assert_eq!(
            out,
            concat!(
                "Content-Type: image/png\r\n",
                "Content-Transfer-Encoding: base64\r\n",
                "Content-Disposition: inline; filename=\"logo.png\"\r\n",
                "Content-ID: <logo.png>\r\n",
                "\r\n",
                "iVBORw==\r\n",
            )
        );
    }

    #[test]
    fn extra_headers_are_kept() {
        let mut file = AttachmentFile::new("a.csv", b"a,b".to_vec());
        file.set_content_type("text/csv");
        file.headers_mut().insert_raw("Content-Description", "export");
        file.headers_mut().insert_raw("content-type", "ignored");

        let mut out = String::new();
        file.write_part(&mut out, Disposition::Attachment).unwrap();
        assert!(out.contains("Content-Description: export\r\n"));
        assert_eq!(out.matches("Content-Type").count(), 1);
    }

    #[test]
    fn missing_content_type() {
        let file = AttachmentFile::new("a.bin", vec![1, 2, 3]);
        let err = file
            .write_part(&mut String::new(), Disposition::Attachment)
            .unwrap_err();
        assert!(err.is_encoding());
    }

    #[test]
    fn invalid_content_type() {
        let mut file = AttachmentFile::new("a.bin", vec![1, 2, 3]);
        file.set_content_type("not a mime type");
        let err = file
            .write_part(&mut String::new(), Disposition::Attachment)
            .unwrap_err();
        assert!(err.is_encoding());
    }

    fn disposition(name: &str) -> String {
        let mut file = AttachmentFile::new(name, Vec::new());
        file.set_content_type("text/plain");
        let mut out = String::new();
        file.write_part(&mut out, Disposition::Attachment).unwrap();
        out.lines()
            .skip_while(|line| !line.starts_with("Content-Disposition"))
            .take_while(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn filename_quoting() {
        assert_eq!(
            disposition("annual report.pdf"),
            "Content-Disposition: attachment; filename=\"annual report.pdf\""
        );
        assert_eq!(
            disposition("a\"b.txt"),
            "Content-Disposition: attachment; filename=\"a\\\"b.txt\""
        );
        assert_eq!(
            disposition("résumé.pdf"),
            "Content-Disposition: attachment;\n filename*0*=utf-8''r%C3%A9sum%C3%A9.pdf"
        );
    }

    #[test]
    fn content_id_must_be_a_msg_id() {
        for name in ["lögo.png", "my logo.png", "a..png", "a@b@c", "@logo"] {
            let mut file = AttachmentFile::new(name, Vec::new());
            file.set_content_type("image/png");
            let mut out = String::new();
            let err = file.write_part(&mut out, Disposition::Inline).unwrap_err();
            assert!(err.is_encoding(), "{name}");
            assert!(out.is_empty());
        }

        for name in ["logo.png", "part1.logo@example.org"] {
            let mut file = AttachmentFile::new(name, Vec::new());
            file.set_content_type("image/png");
            let mut out = String::new();
            file.write_part(&mut out, Disposition::Inline).unwrap();
            assert!(out.contains(&format!("Content-ID: <{name}>\r\n")));
        }

        // only embedded files carry a Content-ID
        let mut file = AttachmentFile::new("my logo.png", Vec::new());
        file.set_content_type("image/png");
        file.write_part(&mut String::new(), Disposition::Attachment)
            .unwrap();
    }
}
