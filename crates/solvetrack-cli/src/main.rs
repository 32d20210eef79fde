#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use solvetrack_core::config;
use std::env;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "st: coding-practice streak and points tracker",
    long_about = None
)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a tracker in the current directory",
        after_help = "EXAMPLES:\n    st init\n    st init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(next_help_heading = "Roster", about = "Manage tracked persons")]
    Person {
        #[command(subcommand)]
        command: cmd::person::PersonCommand,
    },

    #[command(
        next_help_heading = "Read",
        about = "Show one person's stats",
        after_help = "EXAMPLES:\n    st show 1\n    st show 1 --solves --json"
    )]
    Show(cmd::person::ShowArgs),

    #[command(
        next_help_heading = "Sync",
        about = "Pull recent accepted submissions and recompute stats",
        after_help = "EXAMPLES:\n    # One person\n    st refresh 1\n\n    # Everyone, continuing past individual failures\n    st refresh --all"
    )]
    Refresh(cmd::refresh::RefreshArgs),

    #[command(next_help_heading = "Roster", about = "Manage parties")]
    Party {
        #[command(subcommand)]
        command: cmd::party::PartyCommand,
    },

    #[command(
        next_help_heading = "Read",
        about = "Rank persons by reward points",
        after_help = "EXAMPLES:\n    st leaderboard\n    st leaderboard --limit 10 --json"
    )]
    Leaderboard(cmd::leaderboard::LeaderboardArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("SOLVETRACK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "solvetrack=debug,st=debug,info"
        } else {
            "solvetrack=info,st=info,warn"
        })
    });

    let format = env::var("SOLVETRACK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

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

fn run(command: &Commands, cli_json: bool) -> (OutputMode, anyhow::Result<()>) {
    let fallback = if cli_json {
        OutputMode::Json
    } else {
        OutputMode::Pretty
    };

    let project_root = match env::current_dir() {
        Ok(root) => root,
        Err(err) => return (fallback, Err(err.into())),
    };

    let effective = match config::resolve_config(&project_root, cli_json) {
        Ok(effective) => effective,
        Err(err) => return (fallback, Err(err)),
    };
    let output = OutputMode::from_resolved(&effective.resolved_output);
    debug!(root = %project_root.display(), output = ?output, "resolved configuration");

    if let Commands::Init(args) = command {
        return (output, cmd::init::run_init(args, &project_root, output));
    }

    let ctx = cmd::Context {
        project_root,
        config: effective.project,
        output,
    };

    let result = match command {
        Commands::Init(_) => Ok(()),
        Commands::Person { command } => cmd::person::run_person(command, &ctx),
        Commands::Show(args) => cmd::person::run_show(args, &ctx),
        Commands::Refresh(args) => cmd::refresh::run_refresh(args, &ctx),
        Commands::Party { command } => cmd::party::run_party(command, &ctx),
        Commands::Leaderboard(args) => cmd::leaderboard::run_leaderboard(args, &ctx),
    };
    (output, result)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (output, result) = run(&cli.command, cli.json);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Err(render_err) = render_error(output, &CliError::from(&err)) {
                eprintln!("error: {err:#} (while reporting: {render_err})");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmd::party::PartyCommand;
    use cmd::person::PersonCommand;

    #[test]
    fn json_flag_parses_before_and_after_subcommand() {
        let before = Cli::parse_from(["st", "--json", "leaderboard"]);
        assert!(before.json);
        let after = Cli::parse_from(["st", "leaderboard", "--json"]);
        assert!(after.json);
    }

    #[test]
    fn person_add_parses() {
        let cli = Cli::parse_from(["st", "person", "add", "Ada Lovelace", "ada_l"]);
        match cli.command {
            Commands::Person {
                command: PersonCommand::Add(args),
            } => {
                assert_eq!(args.display_name, "Ada Lovelace");
                assert_eq!(args.handle, "ada_l");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn refresh_needs_a_target() {
        assert!(Cli::try_parse_from(["st", "refresh"]).is_err());
        assert!(Cli::try_parse_from(["st", "refresh", "1", "--all"]).is_err());

        let one = Cli::parse_from(["st", "refresh", "3", "--limit", "5"]);
        assert!(matches!(
            one.command,
            Commands::Refresh(cmd::refresh::RefreshArgs {
                person_id: Some(3),
                all: false,
                limit: Some(5),
            })
        ));

        let all = Cli::parse_from(["st", "refresh", "--all", "--limit", "5"]);
        assert!(matches!(
            all.command,
            Commands::Refresh(cmd::refresh::RefreshArgs {
                person_id: None,
                all: true,
                limit: Some(5),
            })
        ));
    }

    #[test]
    fn party_create_parses_dates() {
        let cli = Cli::parse_from([
            "st", "party", "create", "Winter", "--goal", "30", "--starts", "2024-01-01", "--ends",
            "2024-01-31",
        ]);
        match cli.command {
            Commands::Party {
                command: PartyCommand::Create(args),
            } => {
                assert_eq!(args.goal, 30);
                assert_eq!(args.starts.to_string(), "2024-01-01");
                assert_eq!(args.ends.to_string(), "2024-01-31");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn party_create_rejects_bad_date() {
        assert!(
            Cli::try_parse_from([
                "st", "party", "create", "Winter", "--goal", "3", "--starts", "Jan 1", "--ends",
                "2024-01-31",
            ])
            .is_err()
        );
    }

    #[test]
    fn all_subcommands_parse() {
        let commands: [&[&str]; 10] = [
            &["st", "init"],
            &["st", "person", "add", "A", "a"],
            &["st", "show", "1"],
            &["st", "refresh", "--all"],
            &["st", "party", "join", "1", "2"],
            &["st", "party", "leave", "1"],
            &["st", "party", "show", "2"],
            &["st", "party", "refresh", "2"],
            &["st", "leaderboard", "--limit", "3"],
            &["st", "-v", "leaderboard"],
        ];
        for args in commands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }
}
