use std::{
    fmt::Display,
    io::{BufRead, BufReader, Write},
    net::{Shutdown, ToSocketAddrs},
    time::Duration,
};

use super::{escape_crlf, ClientCodec, NetworkStream, TlsInfo, TlsParameters};
use crate::{
    address::{Address, Envelope},
    smtp::{
        authentication::{Credentials, Mechanism},
        commands::{Auth, Command, MailParameter},
        error::{self, Error},
        extension::{ClientId, Extension, ServerInfo},
        response::{parse_response, Response, Severity},
    },
};

/// Structure that implements the SMTP client
pub struct SmtpConnection {
    /// TCP stream between client and server
    stream: BufReader<NetworkStream>,
    /// Set once an i/o or parsing error left the stream unusable
    panic: bool,
    /// Whether QUIT has been sent
    sent_quit: bool,
    /// Information about the server
    server_info: ServerInfo,
}

impl SmtpConnection {
    /// Get information about the server
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Connects to the configured server and reads its banner
    ///
    /// With `tls_parameters` the TLS handshake runs before any SMTP byte
    /// is exchanged.
    pub fn connect<A: ToSocketAddrs>(
        server: A,
        timeout: Option<Duration>,
        tls_parameters: Option<&TlsParameters>,
    ) -> Result<SmtpConnection, Error> {
        let stream = NetworkStream::connect(server, timeout, tls_parameters)?;
        let mut conn = SmtpConnection {
            stream: BufReader::new(stream),
            panic: false,
            sent_quit: false,
            server_info: ServerInfo::default(),
        };

        if let Some(info) = conn.tls_info() {
            tracing::debug!("connection encrypted: {info}");
        }

        match conn.read_response() {
            Ok(banner) => {
                tracing::debug!("server banner: {}", banner.first_line().unwrap_or_default());
                Ok(conn)
            }
            Err(err) => {
                conn.abort();
                Err(err)
            }
        }
    }

    /// Send EHLO and update server info
    ///
    /// Servers that reject EHLO with a permanent error are greeted with
    /// HELO instead, and are then assumed to support no extension.
    pub fn ehlo(&mut self, hello_name: &ClientId) -> Result<(), Error> {
        match self.command(Command::Ehlo(hello_name)) {
            Ok(ehlo_response) => {
                self.server_info = ServerInfo::from_ehlo(&ehlo_response);
            }
            Err(err)
                if err
                    .status()
                    .is_some_and(|c| c.severity() == Severity::PermanentFailure) =>
            {
                tracing::debug!("EHLO rejected ({err}), falling back to HELO");
                let helo_response = self.command(Command::Helo(hello_name))?;
                self.server_info = ServerInfo::from_helo(&helo_response);
            }
            Err(err) => return Err(err),
        }

        tracing::debug!("server {}", self.server_info);
        Ok(())
    }

    pub fn has_broken(&self) -> bool {
        self.panic || self.sent_quit
    }

    /// Upgrades the session with STARTTLS, then greets the server again
    ///
    /// Fails without sending anything when the server did not advertise
    /// the extension.
    pub fn starttls(
        &mut self,
        tls_parameters: &TlsParameters,
        hello_name: &ClientId,
    ) -> Result<(), Error> {
        if !self.server_info.supports(Extension::StartTls) {
            return Err(error::unsupported("server does not support STARTTLS"));
        }

        self.command(Command::StartTls)?;
        if let Err(err) = self.stream.get_mut().upgrade_tls(tls_parameters) {
            self.panic = true;
            return Err(err);
        }
        if let Some(info) = self.tls_info() {
            tracing::debug!("connection encrypted: {info}");
        }

        // extensions may differ once encrypted
        self.ehlo(hello_name)
    }

    /// Sends an AUTH command with the given mechanism, and handles the challenge if needed
    pub fn auth(
        &mut self,
        mechanisms: &[Mechanism],
        credentials: &Credentials,
    ) -> Result<Response, Error> {
        let mechanism = self
            .server_info
            .choose_mechanism(mechanisms)
            .ok_or_else(|| error::client("No compatible authentication mechanism was found"))?;
        tracing::debug!("authenticating as {} with {mechanism}", credentials.username());

        // Limit challenges to avoid blocking
        let mut challenges = 10;
        let mut response = self.auth_command(&Auth::start(mechanism, credentials))?;

        while challenges > 0 && response.has_code(334) {
            challenges -= 1;
            response = self.auth_command(&Auth::answer(mechanism, credentials, &response)?)?;
        }

        if challenges == 0 {
            Err(error::response("Unexpected number of challenges"))
        } else {
            Ok(response)
        }
    }

    /// Sends `MAIL FROM` with the parameters the envelope and message require
    pub fn mail(&mut self, envelope: &Envelope, email: &[u8]) -> Result<Response, Error> {
        let mut mail_options = vec![];

        // Internationalization handling
        //
        // * 8BITMIME: https://tools.ietf.org/html/rfc6152
        // * SMTPUTF8: https://tools.ietf.org/html/rfc653

        // Check for non-ascii addresses and use the SMTPUTF8 option if any.
        if envelope.has_non_ascii_addresses() {
            if !self.server_info().supports(Extension::SmtpUtf8) {
                // don't try to send non-ascii addresses (per RFC)
                return Err(error::client(
                    "Envelope contains non-ascii chars but server does not support SMTPUTF8",
                ));
            }
            mail_options.push(MailParameter::SmtpUtf8);
        }

        // Check for non-ascii content in the message
        if !email.is_ascii() {
            if !self.server_info().supports(Extension::EightBitMime) {
                return Err(error::client(
                    "Message contains non-ascii chars but server does not support 8BITMIME",
                ));
            }
            mail_options.push(MailParameter::EightBitMime);
        }

        self.command(Command::Mail {
            from: envelope.from(),
            parameters: &mail_options,
        })
    }

    /// Sends `RCPT TO` for a single recipient
    pub fn rcpt(&mut self, recipient: &Address) -> Result<Response, Error> {
        self.command(Command::Rcpt(recipient))
    }

    /// Sends `DATA` followed by the message content
    pub fn data(&mut self, email: &[u8]) -> Result<Response, Error> {
        self.command(Command::Data)?;
        self.message(email)
    }

    pub fn quit(&mut self) -> Result<Response, Error> {
        self.sent_quit = true;
        self.command(Command::Quit)
    }

    /// Ends the session without caring about the outcome
    ///
    /// QUIT is only attempted while the stream is still usable, then the
    /// socket is shut down.
    pub fn abort(&mut self) {
        if !self.has_broken() {
            if let Err(err) = self.quit() {
                tracing::debug!("QUIT failed while aborting: {err}");
            }
        }

        let _ = self.stream.get_ref().shutdown(Shutdown::Both);
    }

    /// Tells if the underlying stream is currently encrypted
    pub fn is_encrypted(&self) -> bool {
        self.stream.get_ref().is_encrypted()
    }

    /// Negotiated TLS parameters, if the stream is encrypted
    pub fn tls_info(&self) -> Option<TlsInfo> {
        self.stream.get_ref().tls_info()
    }

    /// Sends the message content
    pub fn message(&mut self, message: &[u8]) -> Result<Response, Error> {
        let mut codec = ClientCodec::new();
        let mut out_buf = Vec::with_capacity(message.len() + 5);
        codec.encode(message, &mut out_buf);
        codec.encode(&[], &mut out_buf);
        self.write(out_buf.as_slice())?;

        self.read_response()
    }

    /// Sends an SMTP command
    pub fn command<C: Display>(&mut self, command: C) -> Result<Response, Error> {
        self.write(command.to_string().as_bytes())?;
        self.read_response()
    }

    /// Sends an AUTH command, keeping the secret out of the logs
    fn auth_command(&mut self, auth: &Auth) -> Result<Response, Error> {
        self.write_logged(auth.to_string().as_bytes(), auth.redacted())?;
        self.read_response()
    }

    /// Writes a string to the server
    fn write(&mut self, string: &[u8]) -> Result<(), Error> {
        self.write_logged(string, &escape_crlf(&String::from_utf8_lossy(string)))
    }

    fn write_logged(&mut self, bytes: &[u8], log_line: &str) -> Result<(), Error> {
        if self.panic {
            return Err(error::client("connection is broken"));
        }

        let stream = self.stream.get_mut();
        if let Err(err) = stream.write_all(bytes).and_then(|()| stream.flush()) {
            self.panic = true;
            return Err(error::network(err));
        }

        tracing::debug!("Wrote: {log_line}");
        Ok(())
    }

    /// Reads one complete reply
    ///
    /// Bytes that are not UTF-8 are replaced, so a reply in a legacy
    /// charset still reaches the caller with its code.
    pub fn read_response(&mut self) -> Result<Response, Error> {
        if self.panic {
            return Err(error::client("connection is broken"));
        }

        let mut buffer = Vec::with_capacity(128);

        loop {
            let start = buffer.len();
            match self.stream.read_until(b'\n', &mut buffer) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => {
                    self.panic = true;
                    return Err(error::network(err));
                }
            }
            tracing::debug!(
                "<< {}",
                escape_crlf(&String::from_utf8_lossy(&buffer[start..]))
            );

            let text = String::from_utf8_lossy(&buffer);
            match parse_response(&text) {
                Ok((_, response)) if response.is_positive() => return Ok(response),
                Ok((_, response)) => return Err(error::rejected(&response)),
                Err(nom::Err::Incomplete(_)) => {}
                Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
                    self.panic = true;
                    return Err(error::response(format!(
                        "unexpected reply line {:?}",
                        e.input.lines().next().unwrap_or_default()
                    )));
                }
            }
        }

        self.panic = true;
        Err(error::response("connection closed in the middle of a reply"))
    }
}
