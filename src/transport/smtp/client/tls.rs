use std::fmt::{self, Debug};

use native_tls::{Protocol, TlsConnector};

use crate::error::{self, Error};

/// TLS protocol versions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsVersion {
    /// TLS 1.0
    ///
    /// Should only be used when trying to support legacy
    /// SMTP servers that haven't updated to
    /// at least TLS 1.2 yet.
    Tlsv10,
    /// TLS 1.1
    ///
    /// Should only be used when trying to support legacy
    /// SMTP servers that haven't updated to
    /// at least TLS 1.2 yet.
    Tlsv11,
    /// TLS 1.2
    ///
    /// A good option for most SMTP servers.
    Tlsv12,
}

/// Parameters to use for the `STARTTLS` upgrade
#[derive(Clone)]
pub struct TlsParameters {
    pub(super) connector: TlsConnector,
    /// The domain name which is expected in the TLS certificate from the server
    pub(super) domain: String,
}

impl Debug for TlsParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsParameters")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Builder for `TlsParameters`
#[derive(Debug, Clone)]
pub struct TlsParametersBuilder {
    domain: String,
    root_certs: Vec<Certificate>,
    min_tls_version: TlsVersion,
}

impl TlsParametersBuilder {
    /// Creates a new builder for `TlsParameters`
    pub fn new(domain: String) -> Self {
        Self {
            domain,
            root_certs: Vec::new(),
            min_tls_version: TlsVersion::Tlsv12,
        }
    }

    /// Add a custom root certificate
    ///
    /// Can be used to safely connect to a server using a self-signed certificate, for example.
    pub fn add_root_certificate(mut self, cert: Certificate) -> Self {
        self.root_certs.push(cert);
        self
    }

    /// Controls which minimum TLS version is allowed
    ///
    /// Defaults to [`Tlsv12`][TlsVersion::Tlsv12].
    pub fn set_min_tls_version(mut self, min_tls_version: TlsVersion) -> Self {
        self.min_tls_version = min_tls_version;
        self
    }

    /// Creates a new `TlsParameters` with the system trust store and the
    /// added root certificates
    pub fn build(self) -> Result<TlsParameters, Error> {
        let mut tls_builder = TlsConnector::builder();

        for cert in self.root_certs {
            tls_builder.add_root_certificate(cert.native_tls);
        }

        let min_tls_version = match self.min_tls_version {
            TlsVersion::Tlsv10 => Protocol::Tlsv10,
            TlsVersion::Tlsv11 => Protocol::Tlsv11,
            TlsVersion::Tlsv12 => Protocol::Tlsv12,
        };
        tls_builder.min_protocol_version(Some(min_tls_version));

        let connector = tls_builder.build().map_err(error::client)?;
        Ok(TlsParameters {
            connector,
            domain: self.domain,
        })
    }
}

impl TlsParameters {
    /// Creates a new `TlsParameters` with the default settings
    pub fn new(domain: String) -> Result<Self, Error> {
        TlsParametersBuilder::new(domain).build()
    }

    /// Creates a new `TlsParameters` builder
    pub fn builder(domain: String) -> TlsParametersBuilder {
        TlsParametersBuilder::new(domain)
    }

    /// The domain name the server certificate is checked against
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

/// A certificate that can be used with [`TlsParametersBuilder::add_root_certificate`]
#[derive(Clone)]
pub struct Certificate {
    native_tls: native_tls::Certificate,
}

impl Certificate {
    /// Create a `Certificate` from a DER encoded certificate
    pub fn from_der(der: &[u8]) -> Result<Self, Error> {
        let native_tls = native_tls::Certificate::from_der(der).map_err(error::client)?;
        Ok(Self { native_tls })
    }

    /// Create a `Certificate` from a PEM encoded certificate
    pub fn from_pem(pem: &[u8]) -> Result<Self, Error> {
        let native_tls = native_tls::Certificate::from_pem(pem).map_err(error::client)?;
        Ok(Self { native_tls })
    }
}

impl Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate").finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn invalid_pem_is_rejected() {
        let err = Certificate::from_pem(b"-----BEGIN CERTIFICATE-----\nnope\n").unwrap_err();
        assert!(err.is_client());
    }

    #[test]
    fn builder_defaults() {
        let builder = TlsParameters::builder("smtp.office365.com".to_owned());
        assert_eq!(builder.min_tls_version, TlsVersion::Tlsv12);
        assert!(builder.root_certs.is_empty());
    }
}
