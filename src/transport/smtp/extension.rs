//! ESMTP features

use std::{
    collections::HashSet,
    fmt::{self, Display, Formatter},
    net::{Ipv4Addr, Ipv6Addr},
};

use crate::{
    error::{self, Error},
    transport::smtp::{authentication::Mechanism, response::Response},
};

/// Client identifier, the parameter to `EHLO`
#[derive(PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub enum ClientId {
    /// A fully-qualified domain name
    Domain(String),
    /// An IPv4 address
    Ipv4(Ipv4Addr),
    /// An IPv6 address
    Ipv6(Ipv6Addr),
}

const LOCALHOST_CLIENT: ClientId = ClientId::Ipv4(Ipv4Addr::new(127, 0, 0, 1));

impl Default for ClientId {
    fn default() -> Self {
        // https://tools.ietf.org/html/rfc5321#section-4.1.4
        //
        // If the client does not have an obvious name, an address literal
        // SHOULD be substituted for the domain name.
        LOCALHOST_CLIENT
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Domain(ref value) => f.write_str(value),
            Self::Ipv4(ref value) => write!(f, "[{value}]"),
            Self::Ipv6(ref value) => write!(f, "[IPv6:{value}]"),
        }
    }
}

/// Supported ESMTP keywords
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum Extension {
    /// SMTPUTF8 keyword
    ///
    /// Defined in [RFC 6531](https://tools.ietf.org/html/rfc6531)
    SmtpUtfEight,
    /// STARTTLS keyword
    ///
    /// Defined in [RFC 2487](https://tools.ietf.org/html/rfc2487)
    StartTls,
    /// AUTH mechanism
    Authentication(Mechanism),
}

impl Display for Extension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Extension::SmtpUtfEight => f.write_str("SMTPUTF8"),
            Extension::StartTls => f.write_str("STARTTLS"),
            Extension::Authentication(ref mechanism) => write!(f, "AUTH {mechanism}"),
        }
    }
}

/// Contains information about an SMTP server
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct ServerInfo {
    /// Server name
    ///
    /// The name given in the server banner
    name: String,
    /// ESMTP features supported by the server
    ///
    /// It contains the features supported by the server and known by the `Extension` module.
    features: HashSet<Extension>,
}

impl Display for ServerInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let features = if self.features.is_empty() {
            "no supported features".to_owned()
        } else {
            format!("{:?}", self.features)
        };
        write!(f, "{} with {}", self.name, features)
    }
}

impl ServerInfo {
    /// Parses a EHLO response to create a `ServerInfo`
    pub fn from_response(response: &Response) -> Result<ServerInfo, Error> {
        let name = match response.first_word() {
            Some(name) => name,
            None => return Err(error::response("Could not read server name")),
        };

        let mut features: HashSet<Extension> = HashSet::new();

        // The first line is the greeting
        for line in response.message().skip(1) {
            let mut split = line.split_whitespace();
            let Some(keyword) = split.next() else {
                continue;
            };

            match keyword.to_ascii_uppercase().as_str() {
                "SMTPUTF8" => {
                    features.insert(Extension::SmtpUtfEight);
                }
                "STARTTLS" => {
                    features.insert(Extension::StartTls);
                }
                "AUTH" => {
                    for mechanism in split {
                        if mechanism.eq_ignore_ascii_case("XOAUTH2") {
                            features.insert(Extension::Authentication(Mechanism::Xoauth2));
                        }
                    }
                }
                _ => (),
            };
        }

        Ok(ServerInfo {
            name: name.to_owned(),
            features,
        })
    }

    /// Checks if the server supports an ESMTP feature
    pub fn supports_feature(&self, keyword: Extension) -> bool {
        self.features.contains(&keyword)
    }

    /// Checks if the server supports an authentication mechanism
    pub fn supports_auth_mechanism(&self, mechanism: Mechanism) -> bool {
        self.features
            .contains(&Extension::Authentication(mechanism))
    }

    /// The name given in the server banner
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }
}

/// A `MAIL FROM` extension parameter
#[derive(PartialEq, Eq, Clone, Debug)]
#[non_exhaustive]
pub enum MailParameter {
    /// `SMTPUTF8` parameter
    SmtpUtfEight,
}

impl Display for MailParameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            MailParameter::SmtpUtfEight => f.write_str("SMTPUTF8"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clientid_fmt() {
        assert_eq!(
            ClientId::Domain("mx.example.org".to_owned()).to_string(),
            "mx.example.org"
        );
        assert_eq!(ClientId::default().to_string(), "[127.0.0.1]");
        assert_eq!(
            ClientId::Ipv6(Ipv6Addr::LOCALHOST).to_string(),
            "[IPv6:::1]"
        );
    }

    #[test]
    fn test_extension_fmt() {
        assert_eq!(Extension::StartTls.to_string(), "STARTTLS");
        assert_eq!(
            Extension::Authentication(Mechanism::Xoauth2).to_string(),
            "AUTH XOAUTH2"
        );
    }

    #[test]
    fn test_serverinfo() {
        let response = concat!(
            "250-smtp.office365.com Hello [203.0.113.7]\r\n",
            "250-SIZE 157286400\r\n",
            "250-8BITMIME\r\n",
            "250-STARTTLS\r\n",
            "250-AUTH LOGIN xoauth2\r\n",
            "250 SMTPUTF8\r\n",
        )
        .parse::<Response>()
        .unwrap();

        let server_info = ServerInfo::from_response(&response).unwrap();
        assert_eq!(server_info.name(), "smtp.office365.com");
        assert!(server_info.supports_feature(Extension::StartTls));
        assert!(server_info.supports_feature(Extension::SmtpUtfEight));
        assert!(server_info.supports_auth_mechanism(Mechanism::Xoauth2));
    }

    #[test]
    fn test_serverinfo_no_features() {
        let response = "250 mx.example.org\r\n".parse::<Response>().unwrap();
        let server_info = ServerInfo::from_response(&response).unwrap();

        assert!(!server_info.supports_feature(Extension::StartTls));
        assert!(!server_info.supports_auth_mechanism(Mechanism::Xoauth2));
        assert_eq!(
            server_info.to_string(),
            "mx.example.org with no supported features"
        );
    }

    #[test]
    fn test_serverinfo_without_name() {
        let response = "250 \r\n".parse::<Response>().unwrap();
        assert!(ServerInfo::from_response(&response)
            .unwrap_err()
            .is_response());
    }
}
