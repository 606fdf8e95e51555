pub mod build;
pub mod config;
pub mod expand;
pub mod list;
pub mod pull;
pub mod push;

use anyhow::Context;
use clap::Args;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{BufRead, IsTerminal, Write};
use std::path::Path;
use vro_core::config::Config;
use vro_core::package::Package;
use vro_core::transport::{Credentials, HttpTransport};

/// Server connection flags shared by `pull` and `push`.
#[derive(Args)]
pub struct RemoteArgs {
    /// Server name as configured under vro_servers
    #[arg(long, short = 's')]
    pub server: String,

    /// Package name as configured in .vrocli.yml
    #[arg(long, short = 'p')]
    pub package: String,

    /// User for servers without stored credentials
    #[arg(long, env = "VRO_USER")]
    pub user: Option<String>,

    /// Password for servers without stored credentials
    #[arg(long, env = "VRO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl RemoteArgs {
    pub fn transport(&self, config: &Config) -> anyhow::Result<HttpTransport> {
        let server = config.server(&self.server)?;
        let mut user = server.user.clone().or_else(|| self.user.clone());
        let mut password = server.pwd.clone().or_else(|| self.password.clone());
        if std::io::stdin().is_terminal() {
            ask_credentials(
                &mut user,
                &mut password,
                &mut std::io::stdin().lock(),
                &mut std::io::stderr(),
                read_hidden,
            )?;
        }
        let credentials = Credentials::resolve(&self.server, server, user, password)?;
        HttpTransport::for_server(&self.server, server, credentials)
            .with_context(|| format!("failed to create client for '{}'", self.server))
    }
}

/// Prompt for whichever of user and password is still missing. Empty answers
/// leave it missing.
pub fn ask_credentials(
    user: &mut Option<String>,
    password: &mut Option<String>,
    input: &mut impl BufRead,
    out: &mut impl Write,
    read_secret: impl FnOnce() -> std::io::Result<String>,
) -> anyhow::Result<()> {
    if user.is_none() {
        write!(out, "vRO API username: ")?;
        out.flush()?;
        let mut answer = String::new();
        input
            .read_line(&mut answer)
            .context("failed to read username from stdin")?;
        *user = Some(answer.trim().to_string()).filter(|u| !u.is_empty());
    }
    if password.is_none() {
        write!(out, "vRO API password: ")?;
        out.flush()?;
        let secret = read_secret().context("failed to read password")?;
        *password = Some(secret).filter(|p| !p.is_empty());
    }
    Ok(())
}

/// Read one line from the terminal without echoing it.
fn read_hidden() -> std::io::Result<String> {
    terminal::enable_raw_mode()?;
    let secret = read_keys();
    terminal::disable_raw_mode()?;
    eprintln!();
    secret
}

fn read_keys() -> std::io::Result<String> {
    let mut secret = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(secret),
            KeyCode::Esc => return Err(cancelled()),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(cancelled())
            }
            KeyCode::Backspace => {
                secret.pop();
            }
            KeyCode::Char(c) => secret.push(c),
            _ => {}
        }
    }
}

fn cancelled() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Interrupted, "password entry cancelled")
}

pub fn load_package(root: &Path, name: &str) -> anyhow::Result<(Config, Package)> {
    let config = Config::load(root).context("failed to load config")?;
    let package = Package::resolve(name, &config, root)
        .with_context(|| format!("cannot resolve package '{name}'"))?;
    Ok((config, package))
}

/// Ask on stderr and read one line from stdin. Only `y`/`yes` proceed.
pub fn confirm(message: &str) -> anyhow::Result<bool> {
    eprint!("{message}\nContinue? [y/N] ");
    std::io::stderr().flush()?;
    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation from stdin")?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
