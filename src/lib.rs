pub mod align;
pub mod labels;
pub mod matching;
pub mod session;
pub mod tmux;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use session::actions::{self, InternalArgs};

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "quickhop",
    version,
    long_version = build_version(),
    about = "Keystroke-minimal jump, copy, and open for tmux panes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stage the helper pane and start an interactive selection
    Jump {
        /// One of: easymotion-search, easymotion-lines, easycopy,
        /// quickcopy, quickopen
        action: String,

        /// Target pane (defaults to the active pane)
        #[arg(short = 't', long = "target")]
        target: Option<String>,

        /// Characters to key in as the search needle
        #[arg(long)]
        search_nkeys: Option<usize>,

        /// Search direction relative to the cursor: both|forward|reverse
        #[arg(long)]
        search_direction: Option<String>,
    },
    /// Inner process respawned inside the helper pane
    #[command(hide = true)]
    Internal {
        action: String,

        #[arg(short = 't')]
        target: String,

        #[arg(long = "hidden-t")]
        hidden_target: String,

        #[arg(long)]
        hidden_window: String,

        #[arg(long)]
        orig_window: String,

        #[arg(long)]
        swap_mode: String,

        #[arg(long)]
        search_nkeys: Option<usize>,

        #[arg(long)]
        search_direction: Option<String>,
    },
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate man page to stdout
    Man,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Jump {
            action,
            target,
            search_nkeys,
            search_direction,
        } => actions::run_jump(
            &action,
            target.as_deref(),
            search_nkeys,
            search_direction.as_deref(),
        ),
        Commands::Internal {
            action,
            target,
            hidden_target,
            hidden_window,
            orig_window,
            swap_mode,
            search_nkeys,
            search_direction,
        } => actions::run_internal(&InternalArgs {
            action,
            target,
            hidden_target,
            hidden_window,
            orig_window,
            swap_mode,
            search_nkeys,
            search_direction,
        }),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "qhop", &mut std::io::stdout());
            Ok(())
        }
        Commands::Man => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            let mut out = std::io::stdout();
            man.render(&mut out)?;
            Ok(())
        }
    }
}

fn build_version() -> String {
    match option_env!("VERGEN_BUILD_TIMESTAMP") {
        Some(ts) => format!("{} (built {ts})", env!("CARGO_PKG_VERSION")),
        None => env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Set up tracing. Stdout belongs to the selection overlay, so logs go to
/// a file under `QUICKHOP_LOG_DIR` when set, else to stderr at warn level.
/// The returned guard must stay alive for the file writer to flush.
pub fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("QUICKHOP_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    if let Ok(dir) = std::env::var("QUICKHOP_LOG_DIR") {
        let appender = tracing_appender::rolling::never(dir, "qhop.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        return Some(guard);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    None
}
