//! Starter configuration files for common providers

use std::{fmt, fs, path::Path, str::FromStr};

use crate::config::{self, Error};

/// A provider with a bundled `gomtp.yaml` preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    /// Local MailHog, plaintext on port 1025
    #[default]
    Mailhog,
    Gmail,
    Yandex,
    Brevo,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Mailhog,
        Provider::Gmail,
        Provider::Yandex,
        Provider::Brevo,
    ];

    /// The preset, as written to disk
    pub fn template(self) -> &'static str {
        match self {
            Provider::Mailhog => include_str!("../templates/mailhog.yaml"),
            Provider::Gmail => include_str!("../templates/gmail.yaml"),
            Provider::Yandex => include_str!("../templates/yandex.yaml"),
            Provider::Brevo => include_str!("../templates/brevo.yaml"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Provider::Mailhog => "mailhog",
            Provider::Gmail => "gmail",
            Provider::Yandex => "yandex",
            Provider::Brevo => "brevo",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|provider| provider.name() == s)
            .ok_or_else(config::unknown_provider)
    }
}

/// Writes the preset of `provider` to `path`, replacing any existing file
pub fn write_template<P: AsRef<Path>>(provider: Provider, path: P) -> Result<(), Error> {
    let path = path.as_ref();
    fs::write(path, provider.template()).map_err(|e| config::io(path, e))?;
    tracing::debug!("wrote {provider} template to {}", path.display());
    Ok(())
}
