//! Console commands and the session that executes them.

use crate::config::ConsoleConfig;
use crate::error::ConsoleError;
use crate::render;
use crate::session::{Authenticator, ConfiguredAuthenticator, SessionMarker, SessionStore};
use chanda_core::{Amount, AuthError, Clock, PaymentDraft, PaymentId, PaymentPatch, SystemClock};
use chanda_media::ImageCompressor;
use chanda_remote::RestStore;
use chanda_storage::{PaymentLedger, PaymentStore};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const HELP: &str = "\
Commands:
  login <user> <password>          start an admin session
  logout                           end the admin session
  submit <name> <amount> <branch> <image-path>
                                   record a contribution
  list [--refresh]                 show contributions, newest first      (admin)
  summary                          contributor count and totals         (admin)
  update <id> [--name v] [--amount v] [--branch v] [--screenshot path]
                                   correct a contribution                (admin)
  delete <id>                      remove a contribution                 (admin)
  clear-cache                      drop the cached list                  (admin)
  stats                            cache statistics                      (admin)
  compress <in> <out>              downscale an image to a JPEG file
  help                             this text
  quit                             leave the console";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login {
        user_id: String,
        password: String,
    },
    Logout,
    List {
        refresh: bool,
    },
    Summary,
    Stats,
    Submit {
        name: String,
        amount: String,
        branch: String,
        image: PathBuf,
    },
    Update {
        id: PaymentId,
        name: Option<String>,
        amount: Option<String>,
        branch: Option<String>,
        screenshot: Option<PathBuf>,
    },
    Delete {
        id: PaymentId,
    },
    ClearCache,
    Compress {
        input: PathBuf,
        output: PathBuf,
    },
    Help,
    Quit,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self, ConsoleError> {
        let (name, rest) = args
            .split_first()
            .ok_or_else(|| ConsoleError::usage("empty command (try 'help')"))?;

        let command = match name.as_str() {
            "login" => {
                let [user_id, password] = exact::<2>(rest, "login <user> <password>")?;
                Command::Login { user_id, password }
            }
            "logout" => {
                exact::<0>(rest, "logout")?;
                Command::Logout
            }
            "list" => match rest {
                [] => Command::List { refresh: false },
                [flag] if flag == "--refresh" => Command::List { refresh: true },
                _ => return Err(ConsoleError::usage("list [--refresh]")),
            },
            "summary" => {
                exact::<0>(rest, "summary")?;
                Command::Summary
            }
            "stats" => {
                exact::<0>(rest, "stats")?;
                Command::Stats
            }
            "submit" => {
                let [name, amount, branch, image] =
                    exact::<4>(rest, "submit <name> <amount> <branch> <image-path>")?;
                Command::Submit {
                    name,
                    amount,
                    branch,
                    image: PathBuf::from(image),
                }
            }
            "update" => parse_update(rest)?,
            "delete" => {
                let [id] = exact::<1>(rest, "delete <id>")?;
                Command::Delete {
                    id: PaymentId::new(id),
                }
            }
            "clear-cache" => {
                exact::<0>(rest, "clear-cache")?;
                Command::ClearCache
            }
            "compress" => {
                let [input, output] = exact::<2>(rest, "compress <in> <out>")?;
                Command::Compress {
                    input: PathBuf::from(input),
                    output: PathBuf::from(output),
                }
            }
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => {
                return Err(ConsoleError::usage(format!(
                    "unknown command '{}' (try 'help')",
                    other
                )))
            }
        };
        Ok(command)
    }

    fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::List { .. }
                | Command::Summary
                | Command::Stats
                | Command::Update { .. }
                | Command::Delete { .. }
                | Command::ClearCache
        )
    }
}

fn exact<const N: usize>(args: &[String], usage: &str) -> Result<[String; N], ConsoleError> {
    <[String; N]>::try_from(args.to_vec()).map_err(|_| ConsoleError::usage(usage))
}

fn parse_update(args: &[String]) -> Result<Command, ConsoleError> {
    const USAGE: &str = "update <id> [--name v] [--amount v] [--branch v] [--screenshot path]";
    let (id, flags) = args
        .split_first()
        .ok_or_else(|| ConsoleError::usage(USAGE))?;

    let mut name = None;
    let mut amount = None;
    let mut branch = None;
    let mut screenshot = None;
    let mut iter = flags.iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .cloned()
            .ok_or_else(|| ConsoleError::usage(USAGE))?;
        match flag.as_str() {
            "--name" => name = Some(value),
            "--amount" => amount = Some(value),
            "--branch" => branch = Some(value),
            "--screenshot" => screenshot = Some(PathBuf::from(value)),
            _ => return Err(ConsoleError::usage(USAGE)),
        }
    }

    Ok(Command::Update {
        id: PaymentId::new(id.as_str()),
        name,
        amount,
        branch,
        screenshot,
    })
}

/// Split a console line into words. Double quotes group words.
pub fn tokenize(line: &str) -> Result<Vec<String>, ConsoleError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quoted {
        return Err(ConsoleError::usage("unterminated quote"));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// What the caller should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Output(String),
    Quit,
}

/// One console session: a ledger (and so one cache), plus admin state.
pub struct Console {
    ledger: PaymentLedger<dyn PaymentStore>,
    compressor: ImageCompressor,
    authenticator: Box<dyn Authenticator>,
    sessions: SessionStore,
    session: Option<SessionMarker>,
    clock: Arc<dyn Clock>,
}

impl Console {
    pub fn new(
        ledger: PaymentLedger<dyn PaymentStore>,
        compressor: ImageCompressor,
        authenticator: Box<dyn Authenticator>,
        sessions: SessionStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            compressor,
            authenticator,
            sessions,
            session: None,
            clock,
        }
    }

    /// Wire the REST store, compressor and configured admin.
    pub fn from_config(config: &ConsoleConfig) -> Result<Self, ConsoleError> {
        let store: Arc<dyn PaymentStore> = Arc::new(RestStore::new(&config.store)?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ledger = PaymentLedger::with_clock(store, config.ledger.clone(), Arc::clone(&clock));
        let compressor = ImageCompressor::new(config.media.clone())?;
        let authenticator = Box::new(ConfiguredAuthenticator::new(
            config.admin.user_id.clone(),
            config.admin.password_sha256.clone(),
        ));

        let mut console = Self::new(
            ledger,
            compressor,
            authenticator,
            SessionStore::new(config.session.path.clone()),
            clock,
        );
        console.restore_session(&config.admin.user_id);
        Ok(console)
    }

    /// Pick up a marker left by an earlier login of `admin_user_id`.
    pub fn restore_session(&mut self, admin_user_id: &str) -> Option<&SessionMarker> {
        self.session = match self.sessions.load() {
            Ok(Some(marker)) if marker.user_id == admin_user_id => Some(marker),
            Ok(Some(marker)) => {
                tracing::warn!(user_id = %marker.user_id, "Ignoring session marker for unknown user");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable session marker");
                None
            }
        };
        self.session.as_ref()
    }

    pub fn session(&self) -> Option<&SessionMarker> {
        self.session.as_ref()
    }

    pub fn ledger(&self) -> &PaymentLedger<dyn PaymentStore> {
        &self.ledger
    }

    pub async fn run_line(&mut self, line: &str) -> Result<Outcome, ConsoleError> {
        let words = tokenize(line)?;
        if words.is_empty() {
            return Ok(Outcome::Output(String::new()));
        }
        self.execute(Command::parse(&words)?).await
    }

    pub async fn execute(&mut self, command: Command) -> Result<Outcome, ConsoleError> {
        if command.requires_admin() && self.session.is_none() {
            return Err(AuthError::NotLoggedIn.into());
        }

        let output = match command {
            Command::Login { user_id, password } => {
                self.authenticator.authenticate(&user_id, &password).await?;
                let marker = SessionMarker::new(user_id, self.clock.now());
                self.sessions.save(&marker)?;
                tracing::info!(user_id = %marker.user_id, session_id = %marker.session_id, "Admin logged in");
                let message = format!("Logged in as {}.", marker.user_id);
                self.session = Some(marker);
                message
            }
            Command::Logout => {
                self.sessions.clear()?;
                match self.session.take() {
                    Some(marker) => {
                        tracing::info!(user_id = %marker.user_id, "Admin logged out");
                        "Logged out.".to_string()
                    }
                    None => "Not logged in.".to_string(),
                }
            }
            Command::List { refresh } => {
                let read = if refresh {
                    self.ledger.refresh().await
                } else {
                    self.ledger.list().await
                };
                render::list_view(&read)
            }
            Command::Summary => {
                let read = self.ledger.summary().await;
                render::summary_view(&read.summary, read.is_stale)
            }
            Command::Stats => render::stats_view(&self.ledger.cache_stats().await),
            Command::Submit {
                name,
                amount,
                branch,
                image,
            } => {
                // Check the typed fields before reading the image.
                let mut draft =
                    PaymentDraft::new(name, amount, branch, image.display().to_string());
                draft.validate()?;
                draft.screenshot = self.compressor.compress_file(&image).await?.data_uri();
                let record = self.ledger.create(&draft).await?;
                format!(
                    "Payment recorded: {} {} {} ({})",
                    record.id,
                    record.name,
                    render::rupees(record.amount),
                    record.branch
                )
            }
            Command::Update {
                id,
                name,
                amount,
                branch,
                screenshot,
            } => {
                let mut patch = PaymentPatch::new();
                patch.name = name;
                patch.branch = branch;
                if let Some(text) = amount {
                    patch.amount = Some(Amount::parse(&text)?);
                }
                if let Some(path) = screenshot {
                    patch.screenshot = Some(self.compressor.compress_file(&path).await?.data_uri());
                }
                self.ledger.update(&id, &patch).await?;
                format!("Payment {} updated.", id)
            }
            Command::Delete { id } => {
                self.ledger.delete(&id).await?;
                format!("Payment {} deleted.", id)
            }
            Command::ClearCache => {
                self.ledger.clear_cache().await;
                "Cache cleared.".to_string()
            }
            Command::Compress { input, output } => {
                let image = self.compressor.compress_file(&input).await?;
                tokio::fs::write(&output, image.bytes()).await?;
                format!(
                    "Wrote {} ({}x{}, {} bytes)",
                    output.display(),
                    image.width,
                    image.height,
                    image.byte_len()
                )
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Output(output))
    }
}

/// Read commands line by line until EOF or `quit`.
///
/// Command failures are reported to `out` and do not end the loop.
pub async fn run_repl<R, W>(
    console: &mut Console,
    input: R,
    out: &mut W,
    interactive: bool,
) -> Result<(), ConsoleError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        if interactive {
            write!(out, "chanda> ")?;
            out.flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match console.run_line(&line).await {
            Ok(Outcome::Quit) => break,
            Ok(Outcome::Output(text)) if text.is_empty() => {}
            Ok(Outcome::Output(text)) => writeln!(out, "{}", text)?,
            Err(e) => writeln!(out, "error: {}", e)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_basic_commands() {
        assert_eq!(
            Command::parse(&words(&["list", "--refresh"])).unwrap(),
            Command::List { refresh: true }
        );
        assert_eq!(
            Command::parse(&words(&["delete", "p1"])).unwrap(),
            Command::Delete {
                id: PaymentId::new("p1")
            }
        );
        assert_eq!(
            Command::parse(&words(&["submit", "Asha", "501", "CS", "proof.png"])).unwrap(),
            Command::Submit {
                name: "Asha".to_string(),
                amount: "501".to_string(),
                branch: "CS".to_string(),
                image: PathBuf::from("proof.png"),
            }
        );
        assert_eq!(Command::parse(&words(&["exit"])).unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_update_flags() {
        let command =
            Command::parse(&words(&["update", "p1", "--branch", "ECE", "--amount", "750"])).unwrap();
        assert_eq!(
            command,
            Command::Update {
                id: PaymentId::new("p1"),
                name: None,
                amount: Some("750".to_string()),
                branch: Some("ECE".to_string()),
                screenshot: None,
            }
        );
        assert!(Command::parse(&words(&["update", "p1", "--branch"])).is_err());
        assert!(Command::parse(&words(&["update", "p1", "--colour", "red"])).is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_arity() {
        assert!(Command::parse(&words(&["login", "admin"])).is_err());
        assert!(Command::parse(&words(&["submit", "Asha", "501"])).is_err());
        assert!(Command::parse(&words(&["list", "--all"])).is_err());
        assert!(Command::parse(&words(&["frobnicate"])).is_err());
        assert!(Command::parse(&[]).is_err());
    }

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(
            tokenize(r#"submit "Asha Rao" 501 CS "my proof.png""#).unwrap(),
            words(&["submit", "Asha Rao", "501", "CS", "my proof.png"])
        );
        assert_eq!(tokenize("   ").unwrap(), Vec::<String>::new());
        assert_eq!(tokenize(r#"update p1 --name """#).unwrap(), words(&["update", "p1", "--name", ""]));
        assert!(tokenize(r#"submit "Asha"#).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Quoting every word gives the words back, spaces included.
        #[test]
        fn prop_tokenize_quoted_words(
            list in proptest::collection::vec("[a-zA-Z0-9 ._-]{0,12}", 0..6),
        ) {
            let line = list
                .iter()
                .map(|w| format!("\"{}\"", w))
                .collect::<Vec<_>>()
                .join(" ");
            prop_assert_eq!(tokenize(&line).unwrap(), list);
        }

        /// Unknown command names are usage errors whatever follows.
        #[test]
        fn prop_unknown_command_is_usage_error(
            name in "[A-Z]{1,8}",
            rest in proptest::collection::vec("\\PC{0,10}", 0..5),
        ) {
            let mut args = vec![name];
            args.extend(rest);
            prop_assert!(matches!(Command::parse(&args), Err(ConsoleError::Usage(_))));
        }
    }

    #[test]
    fn test_admin_commands_flagged() {
        assert!(Command::List { refresh: false }.requires_admin());
        assert!(Command::ClearCache.requires_admin());
        assert!(!Command::Help.requires_admin());
        assert!(!Command::Submit {
            name: String::new(),
            amount: String::new(),
            branch: String::new(),
            image: PathBuf::new(),
        }
        .requires_admin());
    }
}
