//! Configuration file and connection settings
//!
//! The YAML document keeps the flat layout of the `gomtp.yaml` files
//! written by the `template` command:
//!
//! ```yaml
//! username: user@gmail.com
//! password: app-password
//! from: user@gmail.com
//! to: someone@example.com
//! host: smtp.gmail.com
//! port: 587
//! ssl: false
//! tls: true
//! auth: LOGIN
//! verifyCertificate: true
//! cc:
//!   - copy@example.com
//! ```
//!
//! [`ConnectionConfig`] is the checked form used to build the
//! [`SmtpTransport`].

use std::{
    fmt::{self, Debug, Display},
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{
    smtp::{
        self,
        authentication::Credentials,
        client::{Tls, TlsParameters},
        extension::ClientId,
        SmtpTransport, DEFAULT_TIMEOUT, SMTP_PORT, SUBMISSIONS_PORT, SUBMISSION_PORT,
    },
    BoxError,
};

/// Error raised before any connection is opened
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
}

#[derive(Debug)]
pub(crate) enum Kind {
    /// A file could not be read or written
    Io(PathBuf),
    /// The configuration file is not valid YAML for [`EmailConfig`]
    Yaml,
    /// `ssl` and `tls` are both enabled
    ConflictingSecurity,
    /// A timeout of zero seconds
    InvalidTimeout,
    /// The body was given by more than one source
    MultipleBodySources,
    /// The message could not be composed
    Message,
    /// `template` was given an unknown provider
    UnknownProvider,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
            }),
        }
    }

    /// Returns true if `ssl` and `tls` were both enabled
    pub fn is_conflicting_security(&self) -> bool {
        matches!(self.inner.kind, Kind::ConflictingSecurity)
    }

    /// Returns true if the timeout is zero
    pub fn is_invalid_timeout(&self) -> bool {
        matches!(self.inner.kind, Kind::InvalidTimeout)
    }

    /// Returns true if the body was given by more than one source
    pub fn is_multiple_body_sources(&self) -> bool {
        matches!(self.inner.kind, Kind::MultipleBodySources)
    }

    /// Returns true if a file could not be read or written
    pub fn is_io(&self) -> bool {
        matches!(self.inner.kind, Kind::Io(_))
    }

    /// Returns true if the message could not be composed
    pub fn is_message(&self) -> bool {
        matches!(self.inner.kind, Kind::Message)
    }

    /// Returns true if the template provider is unknown
    pub fn is_unknown_provider(&self) -> bool {
        matches!(self.inner.kind, Kind::UnknownProvider)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("config::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(source) = &self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.kind {
            Kind::Io(path) => write!(f, "{}", path.display())?,
            Kind::Yaml => f.write_str("invalid configuration file")?,
            Kind::ConflictingSecurity => f.write_str(
                "invalid configuration: both SSL and TLS (STARTTLS) are enabled; choose only one",
            )?,
            Kind::InvalidTimeout => {
                f.write_str("invalid configuration: timeout must be at least one second")?
            }
            Kind::MultipleBodySources => {
                f.write_str("cannot specify body via multiple sources simultaneously")?
            }
            Kind::Message => f.write_str("invalid message")?,
            Kind::UnknownProvider => {
                f.write_str("provider can be one of these: mailhog | gmail | yandex | brevo")?
            }
        };

        if let Some(e) = &self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source.as_ref().map(|e| {
            let r: &(dyn std::error::Error + 'static) = &**e;
            r
        })
    }
}

pub(crate) fn io<P: Into<PathBuf>>(path: P, e: std::io::Error) -> Error {
    Error::new(Kind::Io(path.into()), Some(e))
}

pub(crate) fn message(e: crate::Error) -> Error {
    Error::new(Kind::Message, Some(e))
}

pub(crate) fn conflicting_security() -> Error {
    Error::new(Kind::ConflictingSecurity, None::<BoxError>)
}

pub(crate) fn invalid_timeout() -> Error {
    Error::new(Kind::InvalidTimeout, None::<BoxError>)
}

pub(crate) fn multiple_body_sources() -> Error {
    Error::new(Kind::MultipleBodySources, None::<BoxError>)
}

pub(crate) fn unknown_provider() -> Error {
    Error::new(Kind::UnknownProvider, None::<BoxError>)
}

/// The content of a `gomtp.yaml` file
///
/// Every key is optional, missing ones take their default value.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmailConfig {
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
    pub host: String,
    /// `0` picks the usual port of the selected security mode
    pub port: u16,
    /// Implicit TLS
    pub ssl: bool,
    /// STARTTLS
    pub tls: bool,
    /// `LOGIN` enables authentication, anything else disables it
    pub auth: String,
    pub verify_certificate: bool,
    pub subject: String,
    pub body: String,
    pub cc: Vec<String>,
    /// Seconds, bounds the connection and every read and write
    pub timeout: Option<u64>,
    /// Name sent with EHLO, defaults to `host`
    pub hello_name: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            from: String::new(),
            to: String::new(),
            host: String::new(),
            port: 0,
            ssl: false,
            tls: false,
            auth: String::new(),
            verify_certificate: true,
            subject: String::new(),
            body: String::new(),
            cc: Vec::new(),
            timeout: None,
            hello_name: None,
        }
    }
}

impl Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("username", &self.username)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("ssl", &self.ssl)
            .field("tls", &self.tls)
            .field("auth", &self.auth)
            .field("verify_certificate", &self.verify_certificate)
            .field("subject", &self.subject)
            .field("cc", &self.cc)
            .field("timeout", &self.timeout)
            .field("hello_name", &self.hello_name)
            .finish_non_exhaustive()
    }
}

impl EmailConfig {
    /// Reads and parses the configuration file at `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parses a YAML document, an empty document gives the defaults
    pub fn from_yaml(content: &str) -> Result<Self, Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| Error::new(Kind::Yaml, Some(e)))
    }
}

/// How the connection is protected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    /// No encryption
    Plain,
    /// TLS handshake right after connecting, before the banner
    ImplicitTls,
    /// Plaintext upgraded with STARTTLS after the greeting
    StartTls,
}

impl Security {
    /// Usual port of the mode
    pub fn default_port(self) -> u16 {
        match self {
            Security::Plain => SMTP_PORT,
            Security::ImplicitTls => SUBMISSIONS_PORT,
            Security::StartTls => SUBMISSION_PORT,
        }
    }
}

impl Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Security::Plain => "plain_no_tls",
            Security::ImplicitTls => "ssl_implicit",
            Security::StartTls => "starttls",
        })
    }
}

/// Whether to authenticate after the greeting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    None,
    /// Username and password, with the first of PLAIN and LOGIN the
    /// server offers
    Login,
}

impl From<&str> for AuthMode {
    fn from(value: &str) -> Self {
        match value {
            "LOGIN" => AuthMode::Login,
            _ => AuthMode::None,
        }
    }
}

/// Checked connection settings, built once per run
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub auth_mode: AuthMode,
    pub security: Security,
    /// `true` verifies the certificate chain and the host name
    pub verify_certificate: bool,
    pub timeout: Duration,
    pub hello_name: String,
}

impl Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("auth_mode", &self.auth_mode)
            .field("security", &self.security)
            .field("verify_certificate", &self.verify_certificate)
            .field("timeout", &self.timeout)
            .field("hello_name", &self.hello_name)
            .finish_non_exhaustive()
    }
}

impl TryFrom<&EmailConfig> for ConnectionConfig {
    type Error = Error;

    fn try_from(config: &EmailConfig) -> Result<Self, Self::Error> {
        let security = match (config.ssl, config.tls) {
            (true, true) => return Err(conflicting_security()),
            (true, false) => Security::ImplicitTls,
            (false, true) => Security::StartTls,
            (false, false) => Security::Plain,
        };

        let port = match config.port {
            0 => security.default_port(),
            port => port,
        };

        let timeout = match config.timeout {
            None => DEFAULT_TIMEOUT,
            Some(0) => return Err(invalid_timeout()),
            Some(seconds) => Duration::from_secs(seconds),
        };

        let hello_name = config
            .hello_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| config.host.clone());

        Ok(ConnectionConfig {
            host: config.host.clone(),
            port,
            username: config.username.clone(),
            password: config.password.clone(),
            auth_mode: AuthMode::from(config.auth.as_str()),
            security,
            verify_certificate: config.verify_certificate,
            timeout,
            hello_name,
        })
    }
}

impl ConnectionConfig {
    fn tls_parameters(&self) -> Result<TlsParameters, smtp::Error> {
        TlsParameters::builder(self.host.clone())
            .dangerous_accept_invalid_certs(!self.verify_certificate)
            .build()
    }

    /// Builds the transport for these settings
    ///
    /// Fails only when the TLS configuration can not be built.
    pub fn transport(&self) -> Result<SmtpTransport, smtp::Error> {
        let mut builder = SmtpTransport::builder(self.host.as_str())
            .port(self.port)
            .timeout(Some(self.timeout))
            .hello_name(ClientId::from(self.hello_name.as_str()));

        builder = match self.security {
            Security::Plain => builder,
            Security::ImplicitTls => builder.tls(Tls::Wrapper(self.tls_parameters()?)),
            Security::StartTls => builder.tls(Tls::Required(self.tls_parameters()?)),
        };

        if self.auth_mode == AuthMode::Login {
            builder = builder.credentials(Credentials::new(
                self.username.clone(),
                self.password.clone(),
            ));
        }

        Ok(builder.build())
    }
}
