//! EHLO identity and what the server answers to it

use std::{
    collections::HashSet,
    fmt::{self, Display, Formatter},
    net::IpAddr,
};

use crate::smtp::{authentication::Mechanism, response::Response};

/// The argument of `EHLO` and `HELO`
///
/// Built from a host name or address. IP addresses become address
/// literals, `[192.0.2.1]` or `[IPv6:2001:db8::1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        ClientId("[127.0.0.1]".to_owned())
    }
}

impl From<&str> for ClientId {
    fn from(name: &str) -> Self {
        let bare = name
            .strip_prefix('[')
            .and_then(|n| n.strip_suffix(']'))
            .unwrap_or(name);

        match bare.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => ClientId(format!("[{ip}]")),
            Ok(IpAddr::V6(ip)) => ClientId(format!("[IPv6:{ip}]")),
            Err(_) if name.is_empty() => ClientId::default(),
            Err(_) => ClientId(name.to_owned()),
        }
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// EHLO keywords the session acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Extension {
    /// [RFC 6152](https://tools.ietf.org/html/rfc6152)
    EightBitMime,
    /// [RFC 6531](https://tools.ietf.org/html/rfc6531)
    SmtpUtf8,
    /// [RFC 3207](https://tools.ietf.org/html/rfc3207)
    StartTls,
}

impl Extension {
    fn from_keyword(keyword: &str) -> Option<Extension> {
        [
            Extension::EightBitMime,
            Extension::SmtpUtf8,
            Extension::StartTls,
        ]
        .into_iter()
        .find(|extension| keyword.eq_ignore_ascii_case(&extension.to_string()))
    }
}

impl Display for Extension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Extension::EightBitMime => "8BITMIME",
            Extension::SmtpUtf8 => "SMTPUTF8",
            Extension::StartTls => "STARTTLS",
        })
    }
}

/// The server's name and the extensions it advertised
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    name: String,
    extensions: HashSet<Extension>,
    /// Known mechanisms in advertised order, `None` without an `AUTH` line
    auth: Option<Vec<Mechanism>>,
}

impl ServerInfo {
    /// Reads a `250` EHLO reply
    ///
    /// The first line holds the server name, possibly empty, and is never
    /// read as a keyword.
    pub fn from_ehlo(response: &Response) -> ServerInfo {
        let mut info = ServerInfo::from_helo(response);

        for line in response.lines().skip(1) {
            let mut words = line.split_whitespace();
            let Some(keyword) = words.next() else {
                continue;
            };

            if keyword.eq_ignore_ascii_case("AUTH") {
                let mechanisms = info.auth.get_or_insert_with(Vec::new);
                for mechanism in words.filter_map(Mechanism::from_keyword) {
                    if !mechanisms.contains(&mechanism) {
                        mechanisms.push(mechanism);
                    }
                }
            } else if let Some(extension) = Extension::from_keyword(keyword) {
                info.extensions.insert(extension);
            }
        }

        info
    }

    /// A `HELO` greeting carries no extension
    pub fn from_helo(response: &Response) -> ServerInfo {
        ServerInfo {
            name: response.first_word().unwrap_or_default().to_owned(),
            ..ServerInfo::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supports(&self, extension: Extension) -> bool {
        self.extensions.contains(&extension)
    }

    /// Whether an `AUTH` line was present, whatever mechanisms it listed
    pub fn advertises_auth(&self) -> bool {
        self.auth.is_some()
    }

    /// The first of `preferred` the server also offers
    pub fn choose_mechanism(&self, preferred: &[Mechanism]) -> Option<Mechanism> {
        let offered = self.auth.as_deref().unwrap_or_default();
        preferred.iter().copied().find(|m| offered.contains(m))
    }
}

impl Display for ServerInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut offers: Vec<String> = self.extensions.iter().map(ToString::to_string).collect();
        offers.sort();
        if let Some(mechanisms) = &self.auth {
            let names: Vec<String> = mechanisms.iter().map(ToString::to_string).collect();
            offers.push(format!("AUTH {}", names.join(" ")).trim_end().to_owned());
        }

        if offers.is_empty() {
            write!(f, "{} without extensions", self.name)
        } else {
            write!(f, "{} offering {}", self.name, offers.join(", "))
        }
    }
}
