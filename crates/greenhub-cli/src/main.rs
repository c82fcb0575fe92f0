#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::{OutputMode, resolve_output_mode};
use std::env;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "glh: points, badges and notifications for a green-living hub",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output format: pretty, text or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Hub",
        about = "Initialize a hub",
        long_about = "Create .greenhub/ with a default config, migrate the store and load the badge catalog.",
        after_help = "EXAMPLES:\n    # Initialize a hub in the current directory\n    glh init\n\n    # Emit machine-readable output\n    glh init --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Hub",
        about = "Register and list users",
        after_help = "EXAMPLES:\n    # Register a user\n    glh user add fern fern@example.com\n\n    # List users\n    glh user list --json"
    )]
    User(cmd::user::UserArgs),

    #[command(
        next_help_heading = "Earn",
        about = "Plan and complete tasks",
        long_about = "Create tasks worth the configured reward and complete them. Completing a task awards its points exactly once.",
        after_help = "EXAMPLES:\n    # Plan a task\n    glh task add --user fern --title \"Evening walk\" --category exercise\n\n    # Complete it\n    glh task done <task-id>"
    )]
    Task(cmd::task::TaskArgs),

    #[command(
        next_help_heading = "Earn",
        about = "Log sustainability actions",
        long_about = "Record a sustainability action and award floor(value * rate) points. Unknown action types use the default rate.",
        after_help = "EXAMPLES:\n    # Recycle 3 kg\n    glh action log --user fern recycle 3\n\n    # Retry an action whose award failed\n    glh action retry <action-id>\n\n    # Show the rate table\n    glh action rates"
    )]
    Action(cmd::action::ActionArgs),

    #[command(
        next_help_heading = "Earn",
        about = "Grant bonus points",
        after_help = "EXAMPLES:\n    # Grant 25 points\n    glh bonus --user fern --amount 25 --reason \"Cleanup crew\""
    )]
    Bonus(cmd::bonus::BonusArgs),

    #[command(
        next_help_heading = "Earn",
        about = "Award pending events",
        long_about = "Award every completed task, action and bonus whose points were never recorded. Failures are reported and skipped.",
        after_help = "EXAMPLES:\n    # Sweep once\n    glh sweep\n\n    # Fail the process when anything could not be awarded\n    glh sweep --strict --json"
    )]
    Sweep(cmd::sweep::SweepArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show a user's points",
        after_help = "EXAMPLES:\n    # Current total\n    glh points fern\n\n    # With the ledger\n    glh points fern --history --json"
    )]
    Points(cmd::points::PointsArgs),

    #[command(
        next_help_heading = "Read",
        about = "List badges",
        long_about = "List the badge catalog, the badges a user holds, or sync the catalog from config.",
        after_help = "EXAMPLES:\n    # Catalog\n    glh badges\n\n    # Badges held by a user\n    glh badges --mine fern\n\n    # Reload [[badges]] from config\n    glh badges sync"
    )]
    Badges(cmd::badges::BadgesArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show the leaderboard",
        after_help = "EXAMPLES:\n    # Top users\n    glh leaderboard\n\n    # Top 3\n    glh leaderboard --limit 3 --json"
    )]
    Leaderboard(cmd::leaderboard::LeaderboardArgs),

    #[command(
        next_help_heading = "Read",
        about = "Read badge notifications",
        after_help = "EXAMPLES:\n    # Unread notifications\n    glh notifications list fern --unread\n\n    # Mark everything read\n    glh notifications read-all fern"
    )]
    Notifications(cmd::notifications::NotificationsArgs),

    #[command(
        next_help_heading = "Hub",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    glh completions bash\n\n    # Generate zsh completions\n    glh completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GREENHUB_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "greenhub=debug,glh=debug,info"
        } else {
            "greenhub=info,glh=info,warn"
        })
    });

    let format = env::var("GREENHUB_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    // Logs go to stderr so --json stdout stays parseable.
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        debug!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let output = cli.output_mode();

    match cli.command {
        Commands::Init(ref args) => cmd::init::run_init(args, output, &project_root),
        Commands::User(ref args) => cmd::user::run_user(args, output, &project_root),
        Commands::Task(ref args) => cmd::task::run_task(args, output, &project_root),
        Commands::Action(ref args) => cmd::action::run_action(args, output, &project_root),
        Commands::Bonus(ref args) => cmd::bonus::run_bonus(args, output, &project_root),
        Commands::Sweep(ref args) => cmd::sweep::run_sweep(args, output, &project_root),
        Commands::Points(ref args) => cmd::points::run_points(args, output, &project_root),
        Commands::Badges(ref args) => cmd::badges::run_badges(args, output, &project_root),
        Commands::Leaderboard(ref args) => {
            cmd::leaderboard::run_leaderboard(args, output, &project_root)
        }
        Commands::Notifications(ref args) => {
            cmd::notifications::run_notifications(args, output, &project_root)
        }
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
