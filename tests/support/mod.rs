//! A scripted SMTP server for the integration tests
//!
//! The server accepts a single connection on a random local port, sends
//! the banner, then answers every command line with the reply returned
//! by the test's responder. Everything the client sent is handed back
//! once the connection ends.
//!
//! [`spawn_tls`] serves a self-signed certificate for `127.0.0.1`, either
//! from the first byte or after a `220` reply to `STARTTLS`.

#![allow(dead_code)]

use std::{
    io::{self, BufRead, BufReader, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use rustls::{
    pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer},
    ServerConfig, ServerConnection, StreamOwned,
};

const IO_TIMEOUT: Duration = Duration::from_secs(10);

/// What the client sent during the session
#[derive(Debug, Default)]
pub struct Transcript {
    /// Command lines, without their CRLF
    pub commands: Vec<String>,
    /// Raw content sent after DATA, terminator included
    pub data: Option<String>,
    /// How many commands had been received when TLS started
    pub tls_from: Option<usize>,
}

impl Transcript {
    /// Command lines starting with `verb`
    pub fn sent(&self, verb: &str) -> Vec<&str> {
        self.commands
            .iter()
            .map(String::as_str)
            .filter(|c| c.starts_with(verb))
            .collect()
    }

    pub fn has_sent(&self, verb: &str) -> bool {
        !self.sent(verb).is_empty()
    }

    /// The verbs of every command, in order
    pub fn verbs(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|c| {
                c.split([' ', ':'])
                    .next()
                    .unwrap_or_default()
                    .to_ascii_uppercase()
            })
            .collect()
    }
}

pub struct Server {
    pub addr: SocketAddr,
    handle: JoinHandle<Transcript>,
}

impl Server {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Waits for the session to end
    pub fn transcript(self) -> Transcript {
        self.handle.join().expect("mock server panicked")
    }
}

/// Starts a server answering with `respond`
///
/// `respond` gets each command line without its CRLF, and `"."` once the
/// message content has been received. It returns the full reply, CRLF
/// included, as text or raw bytes.
pub fn spawn<F, R>(respond: F) -> Server
where
    F: FnMut(&str) -> R + Send + 'static,
    R: AsRef<[u8]>,
{
    spawn_with_banner("220 mock.example.com ESMTP ready\r\n", respond)
}

pub fn spawn_with_banner<F, R>(banner: &'static str, respond: F) -> Server
where
    F: FnMut(&str) -> R + Send + 'static,
    R: AsRef<[u8]>,
{
    serve(banner, None, respond)
}

/// When the server switches to TLS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Before the banner
    Implicit,
    /// Once `STARTTLS` got a `220` reply
    StartTls,
}

/// Starts a server with a self-signed certificate
pub fn spawn_tls<F, R>(mode: TlsMode, respond: F) -> Server
where
    F: FnMut(&str) -> R + Send + 'static,
    R: AsRef<[u8]>,
{
    serve(
        "220 mock.example.com ESMTP ready\r\n",
        Some((mode, self_signed())),
        respond,
    )
}

fn self_signed() -> Arc<ServerConfig> {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["127.0.0.1".to_owned(), "localhost".to_owned()])
            .expect("generate certificate");
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

    let config =
        ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .expect("protocol versions")
            .with_no_client_auth()
            .with_single_cert(vec![cert.der().clone()], key)
            .expect("server certificate");
    Arc::new(config)
}

/// The server side of the connection, encrypted or not
enum Conn {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ServerConnection, TcpStream>>),
}

impl Conn {
    fn into_tls(self, config: Arc<ServerConfig>) -> io::Result<Conn> {
        match self {
            Conn::Plain(tcp) => {
                let session = ServerConnection::new(config).map_err(io::Error::other)?;
                Ok(Conn::Tls(Box::new(StreamOwned::new(session, tcp))))
            }
            tls => Ok(tls),
        }
    }
}

impl Read for Conn {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Conn::Plain(s) => s.read(buf),
            Conn::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Conn {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Conn::Plain(s) => s.write(buf),
            Conn::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Conn::Plain(s) => s.flush(),
            Conn::Tls(s) => s.flush(),
        }
    }
}

fn serve<F, R>(
    banner: &'static str,
    tls: Option<(TlsMode, Arc<ServerConfig>)>,
    mut respond: F,
) -> Server
where
    F: FnMut(&str) -> R + Send + 'static,
    R: AsRef<[u8]>,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let addr = listener.local_addr().expect("mock server address");

    let handle = thread::spawn(move || {
        let mut transcript = Transcript::default();
        let Ok((stream, _)) = listener.accept() else {
            return transcript;
        };
        stream.set_read_timeout(Some(IO_TIMEOUT)).ok();
        stream.set_write_timeout(Some(IO_TIMEOUT)).ok();

        let mut conn = Conn::Plain(stream);
        if let Some((TlsMode::Implicit, config)) = &tls {
            conn = match conn.into_tls(Arc::clone(config)) {
                Ok(conn) => conn,
                Err(_) => return transcript,
            };
            transcript.tls_from = Some(0);
        }
        let mut reader = BufReader::new(conn);

        let greeted = reader
            .get_mut()
            .write_all(banner.as_bytes())
            .and_then(|()| reader.get_mut().flush());
        if greeted.is_err() {
            return transcript;
        }

        let mut in_data = false;
        let mut data = String::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let text = String::from_utf8_lossy(&line).into_owned();

            let reply = if in_data {
                data.push_str(&text);
                if text != ".\r\n" {
                    continue;
                }
                in_data = false;
                transcript.data = Some(std::mem::take(&mut data));
                respond(".")
            } else {
                let command = text.trim_end_matches(['\r', '\n']).to_owned();
                let reply = respond(&command);
                transcript.commands.push(command);
                reply
            };

            let sent = reader
                .get_mut()
                .write_all(reply.as_ref())
                .and_then(|()| reader.get_mut().flush());
            if sent.is_err() {
                break;
            }

            let Some(command) = transcript.commands.last() else {
                continue;
            };
            let verb = command.to_ascii_uppercase();
            if verb == "DATA" && reply.as_ref().starts_with(b"354") {
                in_data = true;
            }
            if verb == "QUIT" {
                break;
            }
            if verb == "STARTTLS" && reply.as_ref().starts_with(b"220") {
                let Some((TlsMode::StartTls, config)) = &tls else {
                    continue;
                };
                reader = match reader.into_inner().into_tls(Arc::clone(config)) {
                    Ok(conn) => BufReader::new(conn),
                    Err(_) => break,
                };
                transcript.tls_from = Some(transcript.commands.len());
            }
        }

        transcript
    });

    Server { addr, handle }
}

/// EHLO reply advertising `features`
pub fn ehlo_reply(features: &[&str]) -> String {
    let mut reply = String::from("250");
    if features.is_empty() {
        reply.push_str(" mock.example.com\r\n");
        return reply;
    }

    reply.push_str("-mock.example.com\r\n");
    for (i, feature) in features.iter().enumerate() {
        let sep = if i + 1 == features.len() { ' ' } else { '-' };
        reply.push_str(&format!("250{sep}{feature}\r\n"));
    }
    reply
}

/// The replies of a well behaved server advertising `features`
pub fn standard_reply(command: &str, features: &[&str]) -> String {
    let verb = command
        .split([' ', ':'])
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();

    match verb.as_str() {
        "EHLO" => ehlo_reply(features),
        "HELO" => "250 mock.example.com\r\n".to_owned(),
        "AUTH" => "235 2.7.0 Authentication successful\r\n".to_owned(),
        "STARTTLS" => "220 2.0.0 Ready to start TLS\r\n".to_owned(),
        "MAIL" | "RCPT" => "250 2.1.0 OK\r\n".to_owned(),
        "DATA" => "354 End data with <CR><LF>.<CR><LF>\r\n".to_owned(),
        "." => "250 2.0.0 OK: queued as 42\r\n".to_owned(),
        "QUIT" => "221 2.0.0 Bye\r\n".to_owned(),
        _ => "502 5.5.2 Command not recognized\r\n".to_owned(),
    }
}

/// A server that accepts everything
pub fn accepting(features: &'static [&'static str]) -> Server {
    spawn(move |command| standard_reply(command, features))
}
