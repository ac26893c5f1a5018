use futures::StreamExt;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use strum::VariantNames;
use thiserror::Error as ThisError;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, instrument, warn, Level, Subscriber};

use crate::codec::LineCodec;
use crate::compute::{CommandName, Compute, DEFAULT_MAX_LEN};
use crate::context::Context;
use crate::database::{Database, ExecResult, QueryStorage};
use crate::storage::Storage;
use crate::Error;

static RESULT_OK: &[u8] = b"OK";
static RESULT_NOT_FOUND: &[u8] = b"NOT_FOUND";
static NEW_LINE: &[u8] = b"\n";

/// Default destination of the logs. Stderr is the error channel of the protocol, so logs are
/// kept out of it.
pub const DEFAULT_LOG_FILE: &str = "app.log";

#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum accepted length of a raw command line, in bytes.
    pub max_command_len: usize,
    pub log_level: Level,
    /// Logs are appended to this file.
    pub log_file: PathBuf,
    pub read_only: bool,
    /// Skips the help banner printed on startup.
    pub quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_command_len: DEFAULT_MAX_LEN,
            log_level: Level::WARN,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            read_only: false,
            quiet: false,
        }
    }
}

/// Runs the store over the process' standard streams until stdin is exhausted or the process
/// receives SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<(), Error> {
    let _ = tracing::subscriber::set_global_default(subscriber(&config)?)
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let db = Database::new(Compute::new(config.max_command_len), Storage::new())
        .read_only(config.read_only);
    let ctx = Context::background();
    cancel_on_shutdown_signal(ctx.clone())?;

    let mut app = App::new(tokio::io::stdin(), tokio::io::stdout(), tokio::io::stderr(), db);
    if !config.quiet {
        app.write_help().await?;
    }

    app.run(&ctx).await?;
    Ok(())
}

/// Builds the log subscriber described by `config`. Stdout carries query results and stderr
/// carries query errors, so logs only ever go to the log file.
pub fn subscriber(config: &Config) -> io::Result<impl Subscriber + Send + Sync> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;

    Ok(tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .finish())
}

/// Cancels `ctx` once the process receives Ctrl-C or, on unix, SIGTERM. The handlers are
/// registered before this returns.
pub fn cancel_on_shutdown_signal(ctx: Context) -> io::Result<JoinHandle<()>> {
    #[cfg(unix)]
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        #[cfg(unix)]
        let terminated = terminate.recv();
        #[cfg(not(unix))]
        let terminated = std::future::pending::<Option<()>>();

        tokio::select! {
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => info!("Received Ctrl-C, shutting down"),
                Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
            },
            _ = terminated => info!("Received SIGTERM, shutting down"),
        }

        ctx.cancel();
    }))
}

/// Line-oriented front end: feeds each input line to the database and writes the outcome to the
/// output stream, or its error to the error stream.
pub struct App<R, W, E, S = Storage> {
    input: R,
    output: W,
    errors: E,
    db: Database<S>,
}

impl<R, W, E, S> App<R, W, E, S>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
    S: QueryStorage,
{
    pub fn new(input: R, output: W, errors: E, db: Database<S>) -> App<R, W, E, S> {
        App {
            input,
            output,
            errors,
            db,
        }
    }

    /// Executes every line of the input in order. A failed query is reported on the error stream
    /// and processing continues with the next line; only I/O failures stop the loop early.
    #[instrument(name = "app", skip_all)]
    pub async fn run(&mut self, ctx: &Context) -> Result<(), AppError> {
        let mut lines = FramedRead::new(&mut self.input, LineCodec::new());

        loop {
            let line = tokio::select! {
                biased;
                _ = ctx.done() => {
                    info!("Context done, stopping");
                    break;
                }
                line = lines.next() => line,
            };

            let Some(line) = line else {
                break;
            };
            let line = line.map_err(AppError::Read)?;

            match self.db.exec(ctx, line) {
                ExecResult::Unsupported(err) | ExecResult::Err(err) => {
                    write_line(&mut self.errors, err.to_string().as_bytes())
                        .await
                        .map_err(AppError::WriteErrors)?;
                }
                ExecResult::OkNoData => write_line(&mut self.output, RESULT_OK)
                    .await
                    .map_err(AppError::WriteOutput)?,
                ExecResult::NotFound => write_line(&mut self.output, RESULT_NOT_FOUND)
                    .await
                    .map_err(AppError::WriteOutput)?,
                ExecResult::Ok(data) => write_line(&mut self.output, &data)
                    .await
                    .map_err(AppError::WriteOutput)?,
            }
        }

        info!("Input closed");
        Ok(())
    }

    pub async fn write_help(&mut self) -> Result<(), AppError> {
        let commands = CommandName::VARIANTS
            .iter()
            .map(|name| format!("{}_command", name.to_lowercase()))
            .collect::<Vec<_>>()
            .join(" | ");

        let help = format!(
            "\nHELP:\n\
             query = {commands}\n\
             set_command = \"SET\" argument argument\n\
             get_command = \"GET\" argument\n\
             del_command = \"DEL\" argument\n\
             argument    = punctuation | letter | digit {{ punctuation | letter | digit }}\n\
             punctuation = \"*\" | \"/\" | \"_\" | ...\n\
             letter      = \"a\" | ... | \"z\" | \"A\" | ... | \"Z\"\n\
             digit       = \"0\" | ... | \"9\"\n\n"
        );

        self.output
            .write_all(help.as_bytes())
            .await
            .map_err(AppError::WriteOutput)?;
        self.output.flush().await.map_err(AppError::WriteOutput)
    }

    pub fn into_inner(self) -> (W, E) {
        (self.output, self.errors)
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    writer.write_all(data).await?;
    writer.write_all(NEW_LINE).await?;
    writer.flush().await
}

#[derive(Debug, ThisError)]
pub enum AppError {
    #[error("scan: {0}")]
    Read(#[source] io::Error),
    #[error("writing to stdout: {0}")]
    WriteOutput(#[source] io::Error),
    #[error("writing to stderr: {0}")]
    WriteErrors(#[source] io::Error),
}
