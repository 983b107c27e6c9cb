//! SMTP response, containing a mandatory return code and an optional text
//! message

use std::{
    fmt::{Display, Formatter, Result},
    result,
    str::FromStr,
};

use nom::{
    branch::alt,
    bytes::streaming::{tag, take_until},
    combinator::{complete, map, opt, value},
    multi::many0,
    sequence::preceded,
    IResult, Parser,
};

use crate::error::{self, Error};

/// The first digit indicates severity
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Severity {
    /// 2yx
    PositiveCompletion = 2,
    /// 3yz
    PositiveIntermediate = 3,
    /// 4yz
    TransientNegativeCompletion = 4,
    /// 5yz
    PermanentNegativeCompletion = 5,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", *self as u8)
    }
}

/// Second digit
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Category {
    /// x0z
    Syntax = 0,
    /// x1z
    Information = 1,
    /// x2z
    Connections = 2,
    /// x3z
    Unspecified3 = 3,
    /// x4z
    Unspecified4 = 4,
    /// x5z
    MailSystem = 5,
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", *self as u8)
    }
}

/// The detail digit of a response code (third digit)
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Detail {
    Zero = 0,
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
}

impl Display for Detail {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", *self as u8)
    }
}

/// Represents a 3 digit SMTP response code
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct Code {
    /// First digit of the response code
    pub severity: Severity,
    /// Second digit of the response code
    pub category: Category,
    /// Third digit
    pub detail: Detail,
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}{}{}", self.severity, self.category, self.detail)
    }
}

impl Code {
    /// Creates a new `Code` structure
    pub fn new(severity: Severity, category: Category, detail: Detail) -> Code {
        Code {
            severity,
            category,
            detail,
        }
    }

    /// Tells if the response is positive
    pub fn is_positive(self) -> bool {
        matches!(
            self.severity,
            Severity::PositiveCompletion | Severity::PositiveIntermediate
        )
    }
}

impl From<Code> for u16 {
    fn from(code: Code) -> Self {
        code.detail as u16 + 10 * code.category as u16 + 100 * code.severity as u16
    }
}

/// Contains an SMTP reply, with separated code and message
///
/// The text message is optional, only the code is mandatory
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Response {
    /// Response code
    code: Code,
    /// Server response string (optional)
    /// Handle multiline responses
    message: Vec<String>,
}

impl FromStr for Response {
    type Err = Error;

    fn from_str(s: &str) -> result::Result<Response, Error> {
        parse_response(s)
            .map(|(_, r)| r)
            .map_err(|e| error::response(e.to_owned()))
    }
}

impl Response {
    /// Creates a new `Response`
    pub fn new(code: Code, message: Vec<String>) -> Response {
        Response { code, message }
    }

    /// Tells if the response is positive
    pub fn is_positive(&self) -> bool {
        self.code.is_positive()
    }

    /// Tests code equality
    pub fn has_code(&self, code: u16) -> bool {
        u16::from(self.code) == code
    }

    /// Returns only the first word of the message if possible
    pub fn first_word(&self) -> Option<&str> {
        self.message
            .first()
            .and_then(|line| line.split_whitespace().next())
    }

    /// Returns only the line of the message if possible
    pub fn first_line(&self) -> Option<&str> {
        self.message.first().map(String::as_str)
    }

    /// Response code
    pub fn code(&self) -> Code {
        self.code
    }

    /// Server response string (array of lines)
    pub fn message(&self) -> impl Iterator<Item = &str> {
        self.message.iter().map(String::as_str)
    }

    /// The message lines joined by spaces, used as error detail
    pub(crate) fn text(&self) -> String {
        self.message
            .iter()
            .map(String::as_str)
            .collect::<Vec<&str>>()
            .join(" ")
    }
}

// Parsers (originally from tokio-smtp)

fn parse_code(i: &str) -> IResult<&str, Code> {
    map(
        (parse_severity, parse_category, parse_detail),
        |(severity, category, detail)| Code {
            severity,
            category,
            detail,
        },
    )
    .parse(i)
}

fn parse_severity(i: &str) -> IResult<&str, Severity> {
    alt((
        value(Severity::PositiveCompletion, tag("2")),
        value(Severity::PositiveIntermediate, tag("3")),
        value(Severity::TransientNegativeCompletion, tag("4")),
        value(Severity::PermanentNegativeCompletion, tag("5")),
    ))
    .parse(i)
}

fn parse_category(i: &str) -> IResult<&str, Category> {
    alt((
        value(Category::Syntax, tag("0")),
        value(Category::Information, tag("1")),
        value(Category::Connections, tag("2")),
        value(Category::Unspecified3, tag("3")),
        value(Category::Unspecified4, tag("4")),
        value(Category::MailSystem, tag("5")),
    ))
    .parse(i)
}

fn parse_detail(i: &str) -> IResult<&str, Detail> {
    alt((
        value(Detail::Zero, tag("0")),
        value(Detail::One, tag("1")),
        value(Detail::Two, tag("2")),
        value(Detail::Three, tag("3")),
        value(Detail::Four, tag("4")),
        value(Detail::Five, tag("5")),
        value(Detail::Six, tag("6")),
        value(Detail::Seven, tag("7")),
        value(Detail::Eight, tag("8")),
        value(Detail::Nine, tag("9")),
    ))
    .parse(i)
}

pub(crate) fn parse_response(i: &str) -> IResult<&str, Response> {
    let (i, lines) = many0((
        parse_code,
        preceded(tag("-"), take_until("\r\n")),
        tag("\r\n"),
    ))
    .parse(i)?;
    // The text of the last line may be omitted, as in `250\r\n`
    let (i, (last_code, last_line)) =
        (parse_code, opt(preceded(tag(" "), take_until("\r\n")))).parse(i)?;
    let (i, _) = complete(tag("\r\n")).parse(i)?;

    // Check that all codes are equal.
    if !lines.iter().all(|&(code, _, _)| code == last_code) {
        return Err(nom::Err::Failure(nom::error::Error::new(
            "",
            nom::error::ErrorKind::Not,
        )));
    }

    // Extract text from lines, and append last line.
    let mut lines: Vec<String> = lines.into_iter().map(|(_, text, _)| text.into()).collect();
    lines.push(last_line.unwrap_or_default().into());

    Ok((
        i,
        Response {
            code: last_code,
            message: lines,
        },
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    fn temp_failure(message: &[&str]) -> Response {
        Response::new(
            Code::new(
                Severity::TransientNegativeCompletion,
                Category::MailSystem,
                Detail::One,
            ),
            message.iter().map(|&line| line.to_owned()).collect(),
        )
    }

    #[test]
    fn test_code_display() {
        let code = Code::new(
            Severity::TransientNegativeCompletion,
            Category::Connections,
            Detail::One,
        );

        assert_eq!(code.to_string(), "421");
        assert_eq!(u16::from(code), 421);
    }

    #[test]
    fn test_response_from_str() {
        let raw_response =
            "250-smtp.office365.com\r\n250-SIZE 157286400\r\n250-STARTTLS\r\n250 SMTPUTF8\r\n";
        assert_eq!(
            raw_response.parse::<Response>().unwrap(),
            Response {
                code: Code {
                    severity: Severity::PositiveCompletion,
                    category: Category::MailSystem,
                    detail: Detail::Zero,
                },
                message: vec![
                    "smtp.office365.com".to_owned(),
                    "SIZE 157286400".to_owned(),
                    "STARTTLS".to_owned(),
                    "SMTPUTF8".to_owned(),
                ],
            }
        );

        let wrong_code = "2506-me\r\n250-8BITMIME\r\n250-SIZE 42\r\n250 AUTH PLAIN CRAM-MD5\r\n";
        assert!(wrong_code.parse::<Response>().is_err());

        let wrong_end = "250-me\r\n250-8BITMIME\r\n250-SIZE 42\r\n250-AUTH PLAIN CRAM-MD5\r\n";
        assert!(wrong_end.parse::<Response>().is_err());

        let mixed_codes = "250-me\r\n251 8BITMIME\r\n";
        assert!(mixed_codes.parse::<Response>().is_err());
    }

    #[test]
    fn test_response_without_text() {
        let response = "334 \r\n".parse::<Response>().unwrap();
        assert!(response.has_code(334));
        assert_eq!(response.first_line(), Some(""));

        let response = "250\r\n".parse::<Response>().unwrap();
        assert!(response.has_code(250));
        assert_eq!(response.first_word(), None);
    }

    #[test]
    fn test_response_is_positive() {
        assert!("354 Start mail input\r\n"
            .parse::<Response>()
            .unwrap()
            .is_positive());
        assert!(!temp_failure(&["me"]).is_positive());
    }

    #[test]
    fn test_response_has_code() {
        assert!(temp_failure(&["me"]).has_code(451));
        assert!(!temp_failure(&["me"]).has_code(251));
    }

    #[test]
    fn test_response_first_word() {
        assert_eq!(temp_failure(&["me", "8BITMIME"]).first_word(), Some("me"));
        assert_eq!(temp_failure(&["me mo", "8BITMIME"]).first_word(), Some("me"));
        assert_eq!(temp_failure(&[]).first_word(), None);
        assert_eq!(temp_failure(&["  "]).first_word(), None);
    }

    #[test]
    fn test_response_first_line() {
        assert_eq!(temp_failure(&["me mo", "8BITMIME"]).first_line(), Some("me mo"));
        assert_eq!(temp_failure(&[]).first_line(), None);
        assert_eq!(temp_failure(&["  "]).first_line(), Some("  "));
    }

    #[test]
    fn test_response_text() {
        let response = "535-5.7.3 Authentication\r\n535 unsuccessful\r\n"
            .parse::<Response>()
            .unwrap();
        assert_eq!(response.text(), "5.7.3 Authentication unsuccessful");
    }

    #[test]
    fn test_response_incomplete() {
        let raw_response = "250-smtp.example.org\r\n";
        let res = parse_response(raw_response);
        match res {
            Err(nom::Err::Incomplete(_)) => {}
            _ => panic!("Expected incomplete response, got {res:?}"),
        }
    }
}
