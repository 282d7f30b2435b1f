//! Command-line utility that checks SMTP settings by sending a test email
//!
//! ```text
//! gomtp                     # read gomtp.yaml and send a test email
//! gomtp -f custom.yaml      # read custom.yaml and send a test email
//! gomtp template -p gmail   # write a gomtp.yaml preset for gmail
//! ```

use std::{
    io::{self, IsTerminal, Read},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use gomtp::{
    config::EmailConfig,
    resolver::{self, Overrides},
    template::{self, Provider},
};
use tracing_subscriber::EnvFilter;

/// Gomtp is a CLI tool that tests SMTP settings easily.
#[derive(Parser, Debug)]
#[command(name = "gomtp")]
#[command(version)]
struct Cli {
    /// Configuration file path.
    #[arg(short = 'f', long = "file", default_value = "gomtp.yaml")]
    file: PathBuf,

    /// Target email address.
    #[arg(long)]
    to: Option<String>,

    /// Subject of the email.
    #[arg(short, long)]
    subject: Option<String>,

    /// Body of the email.
    #[arg(short, long)]
    body: Option<String>,

    /// File that contains body of the email.
    #[arg(long)]
    body_file: Option<PathBuf>,

    /// CC email address, repeat or separate with commas.
    #[arg(long, value_delimiter = ',')]
    cc: Vec<String>,

    /// Timeout in seconds for connecting and for every server reply.
    #[arg(long)]
    timeout: Option<u64>,

    /// Enable verbose SMTP/TLS debugging output.
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a gomtp yaml template file.
    Template {
        /// Output path of gomtp template yaml file.
        #[arg(short, long, default_value = "gomtp.yaml")]
        output: PathBuf,

        /// Provider for the template: mailhog, gmail, yandex or brevo.
        #[arg(short, long, default_value = "mailhog")]
        provider: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(Commands::Template { output, provider }) = cli.command {
        let provider: Provider = provider.parse()?;
        return Ok(template::write_template(provider, output)?);
    }

    let config = EmailConfig::load(&cli.file)?;
    let stdin = read_stdin()?;

    let overrides = Overrides {
        to: cli.to,
        subject: cli.subject,
        body: cli.body,
        body_file: cli.body_file,
        cc: cli.cc,
        timeout: cli.timeout,
    };
    let resolved = resolver::resolve(config, &overrides, stdin)?;

    let response = resolved.send()?;
    tracing::debug!("message accepted: {response}");

    println!("Email sent successfully!");
    Ok(())
}

/// Reads the piped body, a terminal is never read
fn read_stdin() -> anyhow::Result<Option<String>> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut body = String::new();
    stdin
        .read_to_string(&mut body)
        .map_err(|e| anyhow!("failed to read the body from standard input: {e}"))?;
    Ok(Some(body))
}
