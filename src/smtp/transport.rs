use std::time::Duration;

use super::{
    authentication::{Credentials, Mechanism},
    client::{SmtpConnection, Tls},
    error::Phase,
    extension::ClientId,
    response::Response,
    Error, SmtpInfo,
};
use crate::{address::Envelope, message::Message};

/// Sends emails using the SMTP protocol
///
/// Every send opens its own connection and closes it afterwards.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    info: SmtpInfo,
}

impl SmtpTransport {
    /// Creates a new SMTP client builder for `server`
    ///
    /// Defaults are a plaintext connection on port 25 without
    /// authentication, use the builder to change them.
    pub fn builder<T: Into<String>>(server: T) -> SmtpTransportBuilder {
        SmtpTransportBuilder::new(server)
    }

    /// Sends a composed message to the recipients of its envelope
    pub fn send(&self, message: &Message) -> Result<Response, Error> {
        self.send_raw(message.envelope(), &message.formatted())
    }

    /// Runs one complete session delivering `email` to `envelope`
    ///
    /// Returns the server's reply to the message content.
    pub fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> Result<Response, Error> {
        let tls_parameters = match self.info.tls {
            Tls::Wrapper(ref tls_parameters) => Some(tls_parameters),
            Tls::None | Tls::Required(_) => None,
        };

        tracing::debug!(
            "connecting to {}:{} ({:?})",
            self.info.server,
            self.info.port,
            self.info.tls
        );
        let mut conn = SmtpConnection::connect(
            (self.info.server.as_str(), self.info.port),
            self.info.timeout,
            tls_parameters,
        )
        .map_err(|e| e.during(Phase::Connect))?;

        match self.session(&mut conn, envelope, email) {
            Ok(response) => {
                // the message is accepted whatever happens to QUIT
                if let Err(err) = conn.quit() {
                    tracing::debug!("QUIT failed after delivery: {err}");
                }
                Ok(response)
            }
            Err(err) => {
                conn.abort();
                Err(err)
            }
        }
    }

    fn session(
        &self,
        conn: &mut SmtpConnection,
        envelope: &Envelope,
        email: &[u8],
    ) -> Result<Response, Error> {
        conn.ehlo(&self.info.hello_name)
            .map_err(|e| e.during(Phase::Greeting))?;

        match self.info.tls {
            Tls::Required(ref tls_parameters) => conn
                .starttls(tls_parameters, &self.info.hello_name)
                .map_err(|e| e.during(Phase::StartTls))?,
            Tls::None | Tls::Wrapper(_) => {}
        }

        if let Some(credentials) = &self.info.credentials {
            if conn.server_info().advertises_auth() {
                conn.auth(&self.info.authentication, credentials)
                    .map_err(|e| e.during(Phase::Auth))?;
            } else {
                tracing::debug!("server does not advertise AUTH, continuing unauthenticated");
            }
        }

        conn.mail(envelope, email)
            .map_err(|e| e.during(Phase::Mail))?;

        for recipient in envelope.to() {
            conn.rcpt(recipient).map_err(|e| e.during(Phase::Rcpt))?;
        }

        conn.data(email).map_err(|e| e.during(Phase::Data))
    }
}

/// Contains client configuration.
/// Instances of this struct can be created using functions of [`SmtpTransport`].
#[derive(Debug, Clone)]
pub struct SmtpTransportBuilder {
    info: SmtpInfo,
}

impl SmtpTransportBuilder {
    // Create new builder with default parameters
    pub(crate) fn new<T: Into<String>>(server: T) -> Self {
        let new = SmtpInfo {
            server: server.into(),
            ..Default::default()
        };

        Self { info: new }
    }

    /// Set the name used during EHLO
    pub fn hello_name(mut self, name: ClientId) -> Self {
        self.info.hello_name = name;
        self
    }

    /// Set the authentication credentials to use
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.info.credentials = Some(credentials);
        self
    }

    /// Set the authentication mechanisms to try, in order
    pub fn authentication(mut self, mechanisms: Vec<Mechanism>) -> Self {
        self.info.authentication = mechanisms;
        self
    }

    /// Set the timeout duration
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.info.timeout = timeout;
        self
    }

    /// Set the port to use
    pub fn port(mut self, port: u16) -> Self {
        self.info.port = port;
        self
    }

    /// Set the TLS settings to use
    pub fn tls(mut self, tls: Tls) -> Self {
        self.info.tls = tls;
        self
    }

    /// Build the transport
    pub fn build(self) -> SmtpTransport {
        SmtpTransport { info: self.info }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::smtp::{authentication::DEFAULT_MECHANISMS, DEFAULT_TIMEOUT, SMTP_PORT};

    #[test]
    fn builder_defaults() {
        let transport = SmtpTransport::builder("mail.example.org").build();

        assert_eq!(transport.info.server, "mail.example.org");
        assert_eq!(transport.info.port, SMTP_PORT);
        assert_eq!(transport.info.timeout, Some(DEFAULT_TIMEOUT));
        assert_eq!(transport.info.authentication, DEFAULT_MECHANISMS);
        assert_eq!(transport.info.credentials, None);
        assert!(matches!(transport.info.tls, Tls::None));
    }

    #[test]
    fn builder_overrides() {
        let transport = SmtpTransport::builder("mail.example.org")
            .port(2525)
            .hello_name(ClientId::from("client.example.org"))
            .credentials(Credentials::from(("user", "secret")))
            .authentication(vec![Mechanism::Login])
            .timeout(Some(Duration::from_secs(3)))
            .build();

        assert_eq!(transport.info.port, 2525);
        assert_eq!(
            transport.info.hello_name,
            ClientId::from("client.example.org")
        );
        assert_eq!(
            transport.info.credentials,
            Some(Credentials::from(("user", "secret")))
        );
        assert_eq!(transport.info.authentication, vec![Mechanism::Login]);
        assert_eq!(transport.info.timeout, Some(Duration::from_secs(3)));
    }
}
