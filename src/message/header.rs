//! Ordered header storage and header line rendering
// https://tools.ietf.org/html/rfc5322#section-2.2

use std::{
    fmt::{self, Write},
    time::SystemTime,
};

use email_encoding::headers::{rfc2047, rfc2231, writer::EmailWriter};
use httpdate::HttpDate;

use crate::error::{self, Error};

/// Longest line allowed by RFC 5322, without the CRLF
const MAX_LINE_LEN: usize = 998;

/// Header fields in insertion order
///
/// Each name appears once and maps to an ordered list of values, which are
/// rendered joined by `", "`. Name lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: Vec<(String, Vec<String>)>,
}

impl Headers {
    /// Creates an empty header list
    #[inline]
    pub const fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Values of the header called `name`
    pub fn get_raw(&self, name: &str) -> Option<&[String]> {
        self.find_header(name).map(|(_name, values)| values)
    }

    /// Replaces the values of `name`, keeping its original position if it
    /// was already set
    pub fn set_raw(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.find_header_mut(&name) {
            Some(current_values) => {
                *current_values = values;
            }
            None => {
                self.headers.push((name, values));
            }
        }
    }

    /// Appends a value to `name`, creating the header if needed
    pub fn insert_raw(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.find_header_mut(&name) {
            Some(values) => values.push(value.into()),
            None => self.headers.push((name, vec![value.into()])),
        }
    }

    /// Removes `name`, returning its values
    pub fn remove_raw(&mut self, name: &str) -> Option<Vec<String>> {
        self.headers
            .iter()
            .position(|(name_, _values)| name.eq_ignore_ascii_case(name_))
            .map(|i| self.headers.remove(i).1)
    }

    /// Iterates over `(name, values)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.headers
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of distinct header names
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Tells if no header is set
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    fn find_header(&self, name: &str) -> Option<(&str, &[String])> {
        self.iter()
            .find(|&(name_, _values)| name.eq_ignore_ascii_case(name_))
    }

    fn find_header_mut(&mut self, name: &str) -> Option<&mut Vec<String>> {
        self.headers
            .iter_mut()
            .find(|(name_, _values)| name.eq_ignore_ascii_case(name_))
            .map(|(_name, values)| values)
    }
}

/// Writes `Name: value\r\n`
///
/// ASCII values are folded at whitespace. Non-ASCII values are written as
/// RFC 2047 encoded words, folded so that no line exceeds 76 characters.
pub(crate) fn write_header(out: &mut String, name: &str, value: &str) -> Result<(), Error> {
    write_with(out, name, value, |value, w| {
        if value.is_ascii() {
            w.folding().write_str(value)
        } else {
            rfc2047::encode(value, w)
        }
    })
}

/// Writes `Name: value\r\n` keeping UTF-8 as is
///
/// Used for address lists, which cannot hold encoded words.
/// [RFC 6532](https://tools.ietf.org/html/rfc6532)
pub(crate) fn write_raw_header(out: &mut String, name: &str, value: &str) -> Result<(), Error> {
    write_with(out, name, value, |value, w| w.folding().write_str(value))
}

/// Writes `Name: value; key=param\r\n`, `param` being encoded as an
/// RFC 2231 parameter
pub(crate) fn write_header_with_param(
    out: &mut String,
    name: &str,
    value: &str,
    key: &str,
    param: &str,
) -> Result<(), Error> {
    write_with(out, name, value, |value, w| {
        w.write_str(value)?;
        w.write_char(';')?;
        w.space();
        rfc2231::encode(key, param, w)
    })
}

fn write_with<F>(out: &mut String, name: &str, value: &str, encode: F) -> Result<(), Error>
where
    F: FnOnce(&str, &mut EmailWriter<'_>) -> fmt::Result,
{
    check_name(name)?;
    if value.contains(['\r', '\n']) {
        return Err(error::encoding(format!(
            "value of header {name:?} contains a line break"
        )));
    }

    let mut line = String::with_capacity(name.len() + value.len() + 4);
    line.push_str(name);
    line.push(':');
    {
        let mut w = EmailWriter::new(&mut line, name.len() + 1, 1, false);
        encode(value, &mut w).map_err(error::encoding)?;
    }
    line.push_str("\r\n");

    // https://tools.ietf.org/html/rfc5322#section-2.1.1
    if line.split("\r\n").any(|l| l.len() > MAX_LINE_LEN) {
        return Err(error::encoding(format!(
            "header {name:?} has a line longer than {MAX_LINE_LEN} characters"
        )));
    }

    out.push_str(&line);
    Ok(())
}

fn check_name(name: &str) -> Result<(), Error> {
    // ftext = %d33-57 / %d59-126
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| (33..=126).contains(&b) && b != b':');
    if valid {
        Ok(())
    } else {
        Err(error::encoding(format!("invalid header name {name:?}")))
    }
}

/// Formats a `Date` header value
///
/// Defined in [RFC2822](https://tools.ietf.org/html/rfc2822#section-3.3)
pub(crate) fn format_date(date: SystemTime) -> String {
    let mut s = HttpDate::from(date).to_string();
    if s.ends_with(" GMT") {
        // The httpdate crate always appends ` GMT` to the end of the string,
        // but this is considered an obsolete date format for email
        // https://tools.ietf.org/html/rfc2822#appendix-A.6.2,
        // so we replace `GMT` with `-0000`
        s.truncate(s.len() - "GMT".len());
        s.push_str("-0000");
    }
    s
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::base64;

    #[test]
    fn set_keeps_first_position() {
        let mut headers = Headers::new();
        headers.set_raw("Subject", vec!["first".to_owned()]);
        headers.insert_raw("X-Mailer", "smtp-xoauth2");
        headers.set_raw("subject", vec!["second".to_owned()]);

        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["Subject", "X-Mailer"]);
        assert_eq!(
            headers.get_raw("SUBJECT"),
            Some(&["second".to_owned()][..])
        );
    }

    #[test]
    fn insert_appends_values() {
        let mut headers = Headers::new();
        headers.insert_raw("Keywords", "a");
        headers.insert_raw("Keywords", "b");

        assert_eq!(headers.len(), 1);
        assert_eq!(
            headers.remove_raw("keywords"),
            Some(vec!["a".to_owned(), "b".to_owned()])
        );
        assert!(headers.is_empty());
    }

    #[test]
    fn ascii_header() {
        let mut out = String::new();
        write_header(&mut out, "Subject", "Hello world").unwrap();
        assert_eq!(out, "Subject: Hello world\r\n");
    }

    #[test]
    fn utf8_header() {
        let mut out = String::new();
        write_header(&mut out, "Subject", "Привет").unwrap();
        assert_eq!(out, "Subject: =?utf-8?b?0J/RgNC40LLQtdGC?=\r\n");
    }

    #[test]
    fn long_utf8_header_is_folded() {
        let mut out = String::new();
        let value = "Текст письма в уникоде, достаточно длинный";
        write_header(&mut out, "Subject", value).unwrap();

        let words: Vec<&str> = out
            .trim_start_matches("Subject: ")
            .trim_end_matches("\r\n")
            .split("\r\n ")
            .collect();
        assert!(words.len() > 1);

        let mut decoded = Vec::new();
        for word in words {
            assert!(word.len() <= 75);
            let payload = word
                .strip_prefix("=?utf-8?b?")
                .and_then(|w| w.strip_suffix("?="))
                .unwrap();
            decoded.extend(base64::decode(payload).unwrap());
        }
        assert_eq!(String::from_utf8(decoded).unwrap(), value);
    }

    #[test]
    fn header_injection_is_rejected() {
        let mut out = String::new();
        let err = write_header(&mut out, "Subject", "hi\r\nBcc: x@example.com").unwrap_err();
        assert!(err.is_encoding());

        let err = write_header(&mut out, "Bad Name", "value").unwrap_err();
        assert!(err.is_encoding());
        assert!(out.is_empty());
    }

    #[test]
    fn long_ascii_header_is_folded() {
        let mut out = String::new();
        let value = "word ".repeat(300);
        write_header(&mut out, "Subject", value.trim_end()).unwrap();

        let lines: Vec<&str> = out.trim_end_matches("\r\n").split("\r\n").collect();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| line.len() <= 78));
        assert!(lines[1..].iter().all(|line| line.starts_with(' ')));
        assert_eq!(lines.concat().replace("Subject: ", ""), value.trim_end());
    }

    #[test]
    fn unbreakable_header_is_rejected() {
        let mut out = String::new();
        let err = write_header(&mut out, "Subject", &"x".repeat(1000)).unwrap_err();
        assert!(err.is_encoding());
        assert!(out.is_empty());
    }

    #[test]
    fn raw_header_keeps_utf8() {
        let mut out = String::new();
        write_raw_header(&mut out, "To", "jöran@example.com, a@example.com").unwrap();
        assert_eq!(out, "To: jöran@example.com, a@example.com\r\n");

        let mut out = String::new();
        write_raw_header(&mut out, "To", "").unwrap();
        assert_eq!(out, "To: \r\n");
    }

    #[test]
    fn parameter_header() {
        let mut out = String::new();
        write_header_with_param(&mut out, "Content-Disposition", "attachment", "filename", "a.txt")
            .unwrap();
        assert_eq!(out, "Content-Disposition: attachment; filename=\"a.txt\"\r\n");

        let mut out = String::new();
        write_header_with_param(&mut out, "Content-Disposition", "inline", "filename", "lögo.png")
            .unwrap();
        assert_eq!(
            out,
            "Content-Disposition: inline;\r\n filename*0*=utf-8''l%C3%B6go.png\r\n"
        );
    }

    #[test]
    fn format_date_header() {
        // Tue, 15 Nov 1994 08:12:31 GMT
        let date = SystemTime::UNIX_EPOCH + Duration::from_secs(784887151);
        assert_eq!(format_date(date), "Tue, 15 Nov 1994 08:12:31 -0000");
    }
}
