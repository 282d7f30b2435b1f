//! SASL `PLAIN` and `LOGIN`

use std::fmt::{self, Debug, Display, Formatter};

use crate::smtp::error::{self, Error};

/// Mechanisms tried when the configuration enables authentication
///
/// `LOGIN` comes last, it only exists for servers that lack `PLAIN`.
pub const DEFAULT_MECHANISMS: &[Mechanism] = &[Mechanism::Plain, Mechanism::Login];

/// User name and password
///
/// `Debug` only shows the user name.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: String, password: String) -> Credentials {
        Credentials { username, password }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl<U: Into<String>, P: Into<String>> From<(U, P)> for Credentials {
    fn from((username, password): (U, P)) -> Self {
        Credentials::new(username.into(), password.into())
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mechanism {
    /// [RFC 4616](https://tools.ietf.org/html/rfc4616), the credentials
    /// travel with the `AUTH` command
    Plain,
    /// The server prompts for the user name, then for the password
    ///
    /// [draft-murchison-sasl-login-00](https://www.ietf.org/archive/id/draft-murchison-sasl-login-00.txt)
    Login,
}

impl Display for Mechanism {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mechanism::Plain => "PLAIN",
            Mechanism::Login => "LOGIN",
        })
    }
}

impl Mechanism {
    /// Reads a mechanism name from an `AUTH` EHLO line
    pub(crate) fn from_keyword(keyword: &str) -> Option<Mechanism> {
        if keyword.eq_ignore_ascii_case("PLAIN") {
            Some(Mechanism::Plain)
        } else if keyword.eq_ignore_ascii_case("LOGIN") {
            Some(Mechanism::Login)
        } else {
            None
        }
    }

    /// What goes after `AUTH <mechanism>`, before base64
    ///
    /// `None` for mechanisms where the server speaks first.
    pub fn initial_response(self, credentials: &Credentials) -> Option<String> {
        match self {
            Mechanism::Plain => Some(format!(
                "\0{}\0{}",
                credentials.username, credentials.password
            )),
            Mechanism::Login => None,
        }
    }

    /// The answer to a decoded `334` challenge
    pub fn answer(self, credentials: &Credentials, challenge: &str) -> Result<String, Error> {
        if self == Mechanism::Plain {
            return Err(error::client("PLAIN got a challenge after its initial response"));
        }

        let prompt = challenge.trim().trim_end_matches(':').to_ascii_lowercase();
        match prompt.as_str() {
            "username" | "user name" => Ok(credentials.username.clone()),
            "password" => Ok(credentials.password.clone()),
            _ => Err(error::client(format!("unexpected LOGIN prompt {challenge:?}"))),
        }
    }
}
