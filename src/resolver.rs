//! Merges the configuration file, the command line and standard input
//! into the settings of one run

use std::{fs, path::PathBuf};

use crate::{
    config::{self, ConnectionConfig, EmailConfig, Error},
    message::{Message, MessageEnvelope},
    smtp::{self, response::Response},
};

/// Subject used when neither the file nor the command line sets one
pub const DEFAULT_SUBJECT: &str = "GOMTP Test Subject";
/// Recipient used when neither the file nor the command line sets one
pub const DEFAULT_TO: &str = "to@example.com";
/// Body used when no source provides one
pub const DEFAULT_BODY: &str = "This is the test email sent by gomtp.";

/// Values given on the command line
///
/// Empty strings count as not given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub body_file: Option<PathBuf>,
    /// Replaces the `cc` list of the file when not empty
    pub cc: Vec<String>,
    /// Seconds
    pub timeout: Option<u64>,
}

/// The places a body can come from, at most one may be used
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodySources {
    pub stdin: Option<String>,
    pub flag: Option<String>,
    pub file: Option<PathBuf>,
}

impl BodySources {
    /// Number of sources actually provided
    pub fn count(&self) -> usize {
        usize::from(self.stdin.is_some())
            + usize::from(self.flag.is_some())
            + usize::from(self.file.is_some())
    }

    /// Returns the body of the only provided source
    ///
    /// Fails without reading anything when several sources are provided.
    pub fn into_body(self) -> Result<Option<String>, Error> {
        if self.count() > 1 {
            return Err(config::multiple_body_sources());
        }

        if let Some(path) = self.file {
            return fs::read_to_string(&path)
                .map(Some)
                .map_err(|e| config::io(path, e));
        }
        Ok(self.stdin.or(self.flag))
    }
}

/// Everything needed to send the message
#[derive(Debug, Clone)]
pub struct Resolved {
    pub connection: ConnectionConfig,
    pub envelope: MessageEnvelope,
    pub message: Message,
}

fn given(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

/// Applies body selection, defaults and command line overrides to `config`
///
/// `stdin` is the content piped to the process, if any. Nothing touches
/// the network, every error is a configuration or message error.
pub fn resolve(
    mut config: EmailConfig,
    overrides: &Overrides,
    stdin: Option<String>,
) -> Result<Resolved, Error> {
    let sources = BodySources {
        stdin: stdin.filter(|s| !s.is_empty()),
        flag: given(&overrides.body),
        file: overrides.body_file.clone(),
    };
    if let Some(body) = sources.into_body()? {
        config.body = body;
    }

    if config.subject.is_empty() {
        config.subject = DEFAULT_SUBJECT.to_owned();
    }
    if config.to.is_empty() {
        config.to = DEFAULT_TO.to_owned();
    }
    if config.body.is_empty() {
        config.body = DEFAULT_BODY.to_owned();
    }

    if let Some(to) = given(&overrides.to) {
        config.to = to;
    }
    if let Some(subject) = given(&overrides.subject) {
        config.subject = subject;
    }
    if !overrides.cc.is_empty() {
        config.cc.clone_from(&overrides.cc);
    }
    if overrides.timeout.is_some() {
        config.timeout = overrides.timeout;
    }

    let connection = ConnectionConfig::try_from(&config)?;

    let envelope = MessageEnvelope {
        from: config.from,
        to: config.to,
        cc: config.cc,
        subject: config.subject,
        body: config.body,
    };
    let message = envelope.compose().map_err(config::message)?;

    Ok(Resolved {
        connection,
        envelope,
        message,
    })
}

impl Resolved {
    /// Sends the message, returns the server's reply to the content
    pub fn send(&self) -> Result<Response, smtp::Error> {
        let connection = &self.connection;
        tracing::debug!(
            "host={} port={} security={} auth={:?} verify_certificate={}",
            connection.host,
            connection.port,
            connection.security,
            connection.auth_mode,
            connection.verify_certificate
        );

        connection.transport()?.send(&self.message)
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            from: "from@example.com".to_owned(),
            host: "localhost".to_owned(),
            port: 1025,
            ..Default::default()
        }
    }

    #[test]
    fn defaults_fill_empty_fields() {
        let resolved = resolve(config(), &Overrides::default(), None).unwrap();

        assert_eq!(
            resolved.envelope,
            MessageEnvelope {
                from: "from@example.com".to_owned(),
                to: DEFAULT_TO.to_owned(),
                cc: vec![],
                subject: DEFAULT_SUBJECT.to_owned(),
                body: DEFAULT_BODY.to_owned(),
            }
        );
    }

    #[test]
    fn file_values_are_kept() {
        let config = EmailConfig {
            to: "file@example.com".to_owned(),
            subject: "From file".to_owned(),
            body: "File body".to_owned(),
            ..config()
        };

        let resolved = resolve(config, &Overrides::default(), None).unwrap();
        assert_eq!(resolved.envelope.to, "file@example.com");
        assert_eq!(resolved.envelope.subject, "From file");
        assert_eq!(resolved.envelope.body, "File body");
    }

    #[test]
    fn flags_override_file_and_defaults() {
        let config = EmailConfig {
            to: "file@example.com".to_owned(),
            subject: "From file".to_owned(),
            ..config()
        };
        let overrides = Overrides {
            to: Some("flag@example.com".to_owned()),
            subject: Some("From flag".to_owned()),
            body: Some("Flag body".to_owned()),
            ..Default::default()
        };

        let resolved = resolve(config, &overrides, None).unwrap();
        assert_eq!(resolved.envelope.to, "flag@example.com");
        assert_eq!(resolved.envelope.subject, "From flag");
        assert_eq!(resolved.envelope.body, "Flag body");
    }

    #[test]
    fn empty_flags_are_ignored() {
        let overrides = Overrides {
            to: Some(String::new()),
            subject: Some(String::new()),
            body: Some(String::new()),
            ..Default::default()
        };

        let resolved = resolve(config(), &overrides, Some(String::new())).unwrap();
        assert_eq!(resolved.envelope.to, DEFAULT_TO);
        assert_eq!(resolved.envelope.subject, DEFAULT_SUBJECT);
        assert_eq!(resolved.envelope.body, DEFAULT_BODY);
    }

    #[test]
    fn cc_flag_replaces_file_list() {
        let config = EmailConfig {
            cc: vec!["file1@example.com".to_owned(), "file2@example.com".to_owned()],
            ..config()
        };
        let overrides = Overrides {
            cc: vec!["flag@example.com".to_owned()],
            ..Default::default()
        };

        let resolved = resolve(config.clone(), &overrides, None).unwrap();
        assert_eq!(resolved.envelope.cc, ["flag@example.com"]);

        let resolved = resolve(config, &Overrides::default(), None).unwrap();
        assert_eq!(
            resolved.envelope.cc,
            ["file1@example.com", "file2@example.com"]
        );
    }

    #[test]
    fn stdin_body() {
        let resolved = resolve(
            config(),
            &Overrides::default(),
            Some("Piped body\n".to_owned()),
        )
        .unwrap();
        assert_eq!(resolved.envelope.body, "Piped body\n");
    }

    #[test]
    fn body_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Body from a file").unwrap();

        let overrides = Overrides {
            body_file: Some(file.path().to_owned()),
            ..Default::default()
        };
        let resolved = resolve(config(), &overrides, None).unwrap();
        assert_eq!(resolved.envelope.body, "Body from a file");
    }

    #[test]
    fn missing_body_file() {
        let overrides = Overrides {
            body_file: Some(PathBuf::from("./unknown/body.txt")),
            ..Default::default()
        };

        let err = resolve(config(), &overrides, None).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn multiple_body_sources_fail() {
        let both = [
            (
                Some("stdin".to_owned()),
                Overrides {
                    body: Some("flag".to_owned()),
                    ..Default::default()
                },
            ),
            (
                Some("stdin".to_owned()),
                Overrides {
                    body_file: Some(PathBuf::from("./unknown/body.txt")),
                    ..Default::default()
                },
            ),
            (
                None,
                Overrides {
                    body: Some("flag".to_owned()),
                    body_file: Some(PathBuf::from("./unknown/body.txt")),
                    ..Default::default()
                },
            ),
        ];

        for (stdin, overrides) in both {
            let err = resolve(config(), &overrides, stdin).unwrap_err();
            assert!(err.is_multiple_body_sources(), "{err}");
            assert_eq!(
                err.to_string(),
                "cannot specify body via multiple sources simultaneously"
            );
        }
    }

    #[test]
    fn conflicting_security_is_rejected() {
        let config = EmailConfig {
            ssl: true,
            tls: true,
            ..config()
        };

        let err = resolve(config, &Overrides::default(), None).unwrap_err();
        assert!(err.is_conflicting_security());
    }

    #[test]
    fn timeout_flag_overrides_file() {
        let config = EmailConfig {
            timeout: Some(30),
            ..config()
        };
        let overrides = Overrides {
            timeout: Some(2),
            ..Default::default()
        };

        let resolved = resolve(config, &overrides, None).unwrap();
        assert_eq!(
            resolved.connection.timeout,
            std::time::Duration::from_secs(2)
        );
    }

    #[test]
    fn zero_timeout_flag_is_rejected() {
        let overrides = Overrides {
            timeout: Some(0),
            ..Default::default()
        };

        let err = resolve(config(), &overrides, None).unwrap_err();
        assert!(err.is_invalid_timeout());
    }

    #[test]
    fn missing_sender_is_a_message_error() {
        let config = EmailConfig {
            from: String::new(),
            ..config()
        };

        let err = resolve(config, &Overrides::default(), None).unwrap_err();
        assert!(err.is_message());
        assert_eq!(
            err.to_string(),
            "invalid message: missing source address, invalid envelope"
        );
    }
}
