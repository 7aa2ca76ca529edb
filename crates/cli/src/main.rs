use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio_util::sync::CancellationToken;

use parley_core::logging::{self, LoggingConfig, PrivacyConfig};
use parley_core::{CatalogPanel, Config, Error, FileHandle, Host};
use parley_render::{HighlightOutput, MarkdownRenderer, StreamConsumer, SyntectHighlighter};
use parley_session::{CatalogClient, ResetOutcome, SessionController, SubmitOutcome, VoiceAdapter};
use parley_transport::{Endpoint, HttpTransport, MockTransport, Transport, check_health};

mod terminal;

use terminal::{TerminalHost, TerminalView};

const DEFAULT_CONFIG: &str = "parley.toml";

/// Parley - a streaming chat client for the Fred backend
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Chat with a streaming assistant backend from the terminal", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to config file (default: ./parley.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Replay scripted responses from a TOML file instead of contacting the backend
    #[arg(long, value_name = "PATH")]
    mock: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a message and stream the reply
    Chat {
        #[arg(required = true, value_name = "WORDS")]
        words: Vec<String>,
    },
    /// Upload a file for analysis
    Upload {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// List files known to the backend
    Files,
    /// Clear the chat history
    Reset,
    /// Check that the backend is reachable
    Ping {
        /// Give up after this many milliseconds
        #[arg(long, default_value_t = 5000, value_name = "MS")]
        timeout_ms: u64,
    },
    /// Ask the backend to summarize a folder
    Analyze {
        #[arg(value_name = "FOLDER")]
        folder: String,
    },
    /// Start an interactive session
    Repl,
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn run() -> Result<bool> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    let mut logging_config = LoggingConfig::from(config.logging.clone());
    if cli.verbose {
        logging_config = logging_config.with_level("debug");
    }
    let _guard = logging::init_logging(Some(logging_config)).context("Failed to initialize logging")?;

    let engine = Engine::build(&config, cli.mock.as_deref())?;
    engine.execute(cli.command).await
}

/// Load config from file, falling back to defaults when the default file is absent
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::from_file(path).with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => {
            let path = Path::new(DEFAULT_CONFIG);
            if path.exists() {
                Config::from_file(path).with_context(|| format!("Failed to load config from {}", path.display()))
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// One line typed into the repl
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    /// Send the line; an empty line sends whatever the text field holds
    Send(String),
    File(PathBuf),
    Files,
    /// One-based catalog position
    Pick(usize),
    Voice,
    Reset,
    Help,
    Quit,
    Unknown(String),
}

impl ReplCommand {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return ReplCommand::Send(line.to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        match (name, arg) {
            ("file", path) if !path.is_empty() => ReplCommand::File(PathBuf::from(path)),
            ("files", "") => ReplCommand::Files,
            ("pick", n) => match n.parse::<usize>() {
                Ok(n) if n > 0 => ReplCommand::Pick(n),
                _ => ReplCommand::Unknown(line.to_string()),
            },
            ("voice", "") => ReplCommand::Voice,
            ("reset", "") => ReplCommand::Reset,
            ("help", "") => ReplCommand::Help,
            ("quit" | "exit", "") => ReplCommand::Quit,
            _ => ReplCommand::Unknown(line.to_string()),
        }
    }
}

const REPL_HELP: &str = "\
  <text>        send a message
  <empty line>  send the text field (filled by /pick or /voice)
  /file <path>  upload a file for analysis
  /files        list files known to the backend
  /pick <n>     put file n from the list into the text field
  /voice        capture one spoken message into the text field
  /reset        clear the chat history
  /quit         leave";

/// Next repl line, or None on end of input or when `interrupt` fires first
///
/// Ctrl-C must be watched at the prompt: once a reply has listened for it the
/// default handler no longer ends the process.
async fn next_input<R, F, T>(lines: &mut Lines<R>, interrupt: F) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = interrupt => {
            eprintln!();
            Ok(None)
        }
        line = lines.next_line() => line.context("Failed to read input"),
    }
}

struct Engine {
    host: Arc<TerminalHost>,
    view: Arc<TerminalView>,
    transport: Arc<dyn Transport>,
    controller: SessionController,
    catalog: CatalogClient,
    voice: VoiceAdapter,
    privacy: PrivacyConfig,
}

impl Engine {
    fn build(config: &Config, mock: Option<&Path>) -> Result<Self> {
        let host = Arc::new(TerminalHost::from_config(config).context("Invalid server origin")?);
        let view = Arc::new(TerminalView::new(config.chat.surface));

        let transport: Arc<dyn Transport> = match mock {
            Some(path) => Arc::new(
                MockTransport::from_file(path)
                    .with_context(|| format!("Failed to load mock responses from {}", path.display()))?,
            ),
            None => {
                let endpoint = Endpoint::resolve(host.as_ref(), &config.server);
                tracing::debug!(base = endpoint.base(), "resolved backend endpoint");
                Arc::new(HttpTransport::new(endpoint))
            }
        };

        let highlighter = SyntectHighlighter::with_theme(&config.render.theme, HighlightOutput::Ansi)
            .with_context(|| format!("Failed to load theme '{}'", config.render.theme))?;
        let consumer = StreamConsumer::new(Arc::new(MarkdownRenderer::new()), Arc::new(highlighter));

        let controller = SessionController::new(transport.clone(), host.clone(), view.clone(), consumer)
            .with_upload_language(config.render.upload_language.clone());
        let catalog = CatalogClient::new(transport.clone());
        let voice = VoiceAdapter::from_config(&config.voice);
        let privacy = LoggingConfig::from(config.logging.clone()).privacy;

        Ok(Self { host, view, transport, controller, catalog, voice, privacy })
    }

    async fn execute(&self, command: Commands) -> Result<bool> {
        match command {
            Commands::Chat { words } => {
                self.host.set_text(&words.join(" "));
                self.submit().await
            }
            Commands::Upload { path } => self.upload(&path).await,
            Commands::Files => {
                let panel = self.catalog.refresh(self.view.as_ref()).await;
                Ok(!matches!(panel, CatalogPanel::Failed(_)))
            }
            Commands::Reset => self.reset().await,
            Commands::Ping { timeout_ms } => self.ping(Duration::from_millis(timeout_ms)).await,
            Commands::Analyze { folder } => {
                let summary = self.transport.analyze_folder(&folder).await?;
                println!("{}", summary);
                Ok(true)
            }
            Commands::Repl => self.repl().await,
        }
    }

    /// Submit the host's current input; Ctrl-C cancels a running reply
    async fn submit(&self) -> Result<bool> {
        tracing::debug!(
            text = %logging::redact_content(&self.host.text(), &self.privacy),
            "submitting"
        );

        let cancel = CancellationToken::new();
        let watcher = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });
        let outcome = self.controller.submit_with_cancel(&cancel).await;
        watcher.abort();

        match outcome {
            Ok(SubmitOutcome::Streamed(_) | SubmitOutcome::Uploaded { .. }) => Ok(true),
            Ok(SubmitOutcome::Failed { .. }) => Ok(false),
            Ok(SubmitOutcome::Cancelled { .. }) => {
                eprintln!("{}", "Reply cancelled".yellow());
                Ok(false)
            }
            Err(Error::EmptySubmission) => {
                eprintln!("{}", "Nothing to send".dimmed());
                Ok(false)
            }
            Err(Error::Busy) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn upload(&self, path: &Path) -> Result<bool> {
        if !path.is_file() {
            anyhow::bail!("File not found: {}", path.display());
        }
        self.host.select_file(FileHandle::from_path(path));
        self.submit().await
    }

    async fn reset(&self) -> Result<bool> {
        match self.controller.reset().await {
            Ok(ResetOutcome::Confirmed) => Ok(true),
            Ok(ResetOutcome::RemoteFailed(_)) | Err(Error::Busy) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn ping(&self, timeout: Duration) -> Result<bool> {
        let result = check_health(self.transport.as_ref(), timeout).await;
        if let Some(body) = &result.body {
            println!("{} {}ms", "Backend is up".green().bold(), result.latency_ms);
            println!("{}", serde_json::to_string_pretty(body)?);
        } else if let Some(error) = &result.error {
            eprintln!("{} {}", "Backend unreachable:".red().bold(), error);
        }
        Ok(result.healthy)
    }

    async fn repl(&self) -> Result<bool> {
        println!("{}", "parley - type /help for commands".green().bold());
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            eprint!("{} ", ">".cyan().bold());
            let Some(line) = next_input(&mut lines, tokio::signal::ctrl_c()).await? else {
                break;
            };

            match ReplCommand::parse(&line) {
                ReplCommand::Send(text) => {
                    if !text.is_empty() {
                        self.host.set_text(&text);
                    }
                    self.submit().await?;
                }
                ReplCommand::File(path) => {
                    if let Err(e) = self.upload(&path).await {
                        eprintln!("{} {:#}", "Error:".red().bold(), e);
                    }
                }
                ReplCommand::Files => {
                    self.catalog.refresh(self.view.as_ref()).await;
                }
                ReplCommand::Pick(n) => match self.catalog.select_index(n - 1, self.host.as_ref()) {
                    Some(entry) => eprintln!("{} {} (empty line sends it)", "Picked".green(), entry),
                    None => eprintln!("{} no file {} in the list; run /files first", "Notice:".yellow().bold(), n),
                },
                ReplCommand::Voice => self.capture_voice().await,
                ReplCommand::Reset => {
                    self.reset().await?;
                }
                ReplCommand::Help => println!("{}", REPL_HELP),
                ReplCommand::Quit => break,
                ReplCommand::Unknown(line) => {
                    eprintln!("{} unknown command {} (try /help)", "Notice:".yellow().bold(), line.cyan());
                }
            }
        }

        Ok(true)
    }

    async fn capture_voice(&self) {
        if !self.voice.control_visible() {
            eprintln!("{} voice capture is not configured", "Notice:".yellow().bold());
            return;
        }

        let capture = self.voice.toggle(self.host.as_ref(), self.view.as_ref());
        tokio::pin!(capture);
        let heard = tokio::select! {
            heard = &mut capture => heard,
            _ = tokio::signal::ctrl_c() => {
                self.voice.stop();
                capture.await
            }
        };

        if let Some(text) = heard {
            eprintln!("{} {} (empty line sends it)", "Heard:".magenta().bold(), text);
        }
    }
}
