use std::{
    io::{self, Read, Write},
    mem,
    net::{Shutdown, TcpStream, ToSocketAddrs},
    sync::Arc,
    time::Duration,
};

use rustls::{ClientConnection, StreamOwned};
use socket2::{Domain, Protocol, Type};

use super::tls::{TlsInfo, TlsParameters};
use crate::smtp::error::{self, Error};

/// A network stream
#[derive(Debug)]
pub struct NetworkStream {
    inner: InnerNetworkStream,
}

/// Represents the different types of underlying network streams
#[derive(Debug)]
#[allow(clippy::large_enum_variant)]
enum InnerNetworkStream {
    /// Plain TCP stream
    Tcp(TcpStream),
    /// Encrypted TCP stream
    Rustls(StreamOwned<ClientConnection, TcpStream>, String),
    /// Can't be built
    None,
}

impl NetworkStream {
    fn new(inner: InnerNetworkStream) -> Self {
        if let InnerNetworkStream::None = inner {
            debug_assert!(false, "InnerNetworkStream::None must never be built");
        }

        NetworkStream { inner }
    }

    /// Shutdowns the connection
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        match &self.inner {
            InnerNetworkStream::Tcp(s) => s.shutdown(how),
            InnerNetworkStream::Rustls(s, _) => s.get_ref().shutdown(how),
            InnerNetworkStream::None => Ok(()),
        }
    }

    /// Opens a TCP connection, wrapped in TLS right away when parameters are given
    ///
    /// `timeout` bounds the TCP connect of each resolved address and the
    /// TLS handshake.
    pub fn connect<T: ToSocketAddrs>(
        server: T,
        timeout: Option<Duration>,
        tls_parameters: Option<&TlsParameters>,
    ) -> Result<NetworkStream, Error> {
        fn try_connect<T: ToSocketAddrs>(
            server: T,
            timeout: Option<Duration>,
        ) -> Result<TcpStream, Error> {
            let addrs = server.to_socket_addrs().map_err(error::connection)?;

            let mut last_err = None;
            for addr in addrs {
                let socket = socket2::Socket::new(
                    Domain::for_address(addr),
                    Type::STREAM,
                    Some(Protocol::TCP),
                )
                .map_err(error::connection)?;

                let connected = match timeout {
                    Some(timeout) => socket.connect_timeout(&addr.into(), timeout),
                    None => socket.connect(&addr.into()),
                };
                match connected {
                    Ok(()) => return Ok(socket.into()),
                    Err(err) => last_err = Some(err),
                }
            }

            Err(match last_err {
                Some(last_err) => error::connection(last_err),
                None => error::connection("could not resolve to any address"),
            })
        }

        let tcp_stream = try_connect(server, timeout)?;
        tcp_stream
            .set_read_timeout(timeout)
            .map_err(error::connection)?;
        tcp_stream
            .set_write_timeout(timeout)
            .map_err(error::connection)?;

        let mut stream = NetworkStream::new(InnerNetworkStream::Tcp(tcp_stream));
        if let Some(tls_parameters) = tls_parameters {
            stream.upgrade_tls(tls_parameters)?;
        }
        Ok(stream)
    }

    /// Runs the TLS handshake over the current plain TCP stream
    pub fn upgrade_tls(&mut self, tls_parameters: &TlsParameters) -> Result<(), Error> {
        match &self.inner {
            InnerNetworkStream::Tcp(_) => {
                // get owned TcpStream
                let tcp_stream = mem::replace(&mut self.inner, InnerNetworkStream::None);
                let InnerNetworkStream::Tcp(tcp_stream) = tcp_stream else {
                    unreachable!()
                };

                self.inner = Self::upgrade_rustls(tcp_stream, tls_parameters)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn upgrade_rustls(
        mut tcp_stream: TcpStream,
        tls_parameters: &TlsParameters,
    ) -> Result<InnerNetworkStream, Error> {
        let mut connection = ClientConnection::new(
            Arc::clone(&tls_parameters.connector),
            tls_parameters.server_name.clone(),
        )
        .map_err(error::tls)?;

        // drive the handshake now so that certificate problems surface here
        // and not on the first SMTP read
        while connection.is_handshaking() {
            connection.complete_io(&mut tcp_stream).map_err(error::tls)?;
        }

        Ok(InnerNetworkStream::Rustls(
            StreamOwned::new(connection, tcp_stream),
            tls_parameters.domain().to_owned(),
        ))
    }

    /// Tells if the stream is encrypted
    pub fn is_encrypted(&self) -> bool {
        match &self.inner {
            InnerNetworkStream::Tcp(_) | InnerNetworkStream::None => false,
            InnerNetworkStream::Rustls(..) => true,
        }
    }

    /// Negotiated TLS parameters, `None` on a plaintext stream
    pub fn tls_info(&self) -> Option<TlsInfo> {
        match &self.inner {
            InnerNetworkStream::Rustls(stream, server_name) => {
                Some(TlsInfo::from_connection(&stream.conn, server_name))
            }
            InnerNetworkStream::Tcp(_) | InnerNetworkStream::None => None,
        }
    }
}

impl Read for NetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            InnerNetworkStream::Tcp(s) => s.read(buf),
            InnerNetworkStream::Rustls(s, _) => s.read(buf),
            InnerNetworkStream::None => Err(not_connected()),
        }
    }
}

impl Write for NetworkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            InnerNetworkStream::Tcp(s) => s.write(buf),
            InnerNetworkStream::Rustls(s, _) => s.write(buf),
            InnerNetworkStream::None => Err(not_connected()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            InnerNetworkStream::Tcp(s) => s.flush(),
            InnerNetworkStream::Rustls(s, _) => s.flush(),
            InnerNetworkStream::None => Err(not_connected()),
        }
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "stream is not connected")
}

#[cfg(test)]
mod test {
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn plain_connect_is_not_encrypted() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let stream = NetworkStream::connect(addr, Some(Duration::from_secs(5)), None).unwrap();
        assert!(!stream.is_encrypted());
        assert!(stream.tls_info().is_none());
    }

    #[test]
    fn refused_connection_is_a_connection_error() {
        // bind then drop to get a port nobody listens on
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();

        let err = NetworkStream::connect(addr, Some(Duration::from_secs(5)), None).unwrap_err();
        assert!(!err.is_tls());
        assert!(err.to_string().starts_with("connection error"));
    }
}
