use clap::Parser;
use linekv::app::{self, Config};
use linekv::compute::DEFAULT_MAX_LEN;
use linekv::Error;
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Maximum accepted length of a single command line, in bytes
    #[arg(long, env = "LINEKV_MAX_COMMAND_LEN", default_value_t = DEFAULT_MAX_LEN)]
    max_command_len: usize,

    /// Most verbose level that is logged
    #[arg(long, env = "LINEKV_LOG_LEVEL", default_value_t = Level::WARN)]
    log_level: Level,

    /// Append logs to this file
    #[arg(long, env = "LINEKV_LOG_FILE", default_value = app::DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Reject SET and DEL queries
    #[arg(long, env = "LINEKV_READ_ONLY")]
    read_only: bool,

    /// Do not print the help banner on startup
    #[arg(short, long)]
    quiet: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            max_command_len: args.max_command_len,
            log_level: args.log_level,
            log_file: args.log_file,
            read_only: args.read_only,
            quiet: args.quiet,
        }
    }
}

fn main() -> Result<(), Error> {
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    let res = runtime.block_on(app::run(args.into()));

    // A blocking read on stdin cannot be interrupted, so don't wait for it after Ctrl-C.
    runtime.shutdown_background();
    res
}
