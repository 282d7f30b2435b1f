//! gomtp checks SMTP settings by sending a real test email.
//!
//! A run loads a YAML [`config`], applies the command line overrides
//! through the [`resolver`], composes a plain text [`message`] and hands
//! it to the [`smtp`] transport, which drives a single session:
//!
//! ```text
//! connect -> EHLO/HELO -> [STARTTLS] -> [AUTH] -> MAIL FROM -> RCPT TO x N -> DATA -> QUIT
//! ```
//!
//! The server's own reply text is kept in every error, it is usually the
//! answer to "why do these settings not work".
//!
//! ```rust,no_run
//! use gomtp::{config::EmailConfig, resolver::{self, Overrides}};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EmailConfig::load("gomtp.yaml")?;
//! let resolved = resolver::resolve(config, &Overrides::default(), None)?;
//! let response = resolved.send()?;
//! println!("{response}");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code, unstable_features)]

pub mod address;
pub mod config;
pub mod error;
pub mod message;
pub mod resolver;
pub mod smtp;
pub mod template;

use std::error::Error as StdError;

pub use crate::error::Error;

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;
