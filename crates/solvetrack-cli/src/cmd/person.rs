use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use solvetrack_core::ledger;
use solvetrack_core::model::{Person, SolveRecord};
use solvetrack_core::roster;
use std::io::{self, Write};

use super::{Context, find_person, now_us};
use crate::output::{pretty_kv, pretty_section, render, render_mode};

#[derive(Subcommand, Debug)]
pub enum PersonCommand {
    /// Register a person to track.
    Add(AddArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Name shown on leaderboards.
    pub display_name: String,

    /// Username on the event source.
    pub handle: String,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Person id.
    pub person_id: i64,

    /// Also list every credited solve.
    #[arg(long)]
    pub solves: bool,
}

#[derive(Debug, Serialize)]
struct PersonView {
    #[serde(flatten)]
    person: Person,
    #[serde(skip_serializing_if = "Option::is_none")]
    solves: Option<Vec<SolveRecord>>,
}

pub fn run_person(command: &PersonCommand, ctx: &Context) -> Result<()> {
    match command {
        PersonCommand::Add(args) => run_add(args, ctx),
    }
}

fn run_add(args: &AddArgs, ctx: &Context) -> Result<()> {
    let conn = ctx.open_store()?;
    let person = roster::create_person(&conn, &args.display_name, &args.handle, now_us())
        .context("add person")?;
    tracing::info!(person_id = person.person_id, handle = %person.handle, "person added");

    render(ctx.output, &person, |person, w| {
        writeln!(
            w,
            "✓ Added {} ({}) as person {}",
            person.display_name, person.handle, person.person_id
        )
    })
}

/// Execute `st show <person>`.
pub fn run_show(args: &ShowArgs, ctx: &Context) -> Result<()> {
    let conn = ctx.open_store()?;
    let person = find_person(&conn, args.person_id)?;
    let solves = if args.solves {
        Some(ledger::solves_for_person(&conn, person.person_id)?)
    } else {
        None
    };

    let view = PersonView { person, solves };
    render_mode(ctx.output, &view, write_text, write_pretty)
}

fn write_text(view: &PersonView, w: &mut dyn Write) -> io::Result<()> {
    let p = &view.person;
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        p.person_id,
        p.handle,
        p.stats.total_problems,
        p.stats.current_streak,
        p.stats.longest_streak,
        p.stats.reward_points,
        p.stats
            .last_solve_date
            .map_or_else(|| "-".to_string(), |d| d.to_string())
    )?;
    for solve in view.solves.iter().flatten() {
        writeln!(w, "{}\t{}", solve.solved_on, solve.problem_id)?;
    }
    Ok(())
}

fn write_pretty(view: &PersonView, w: &mut dyn Write) -> io::Result<()> {
    let p = &view.person;
    pretty_section(w, &format!("{} (@{})", p.display_name, p.handle))?;
    pretty_kv(w, "Person", p.person_id.to_string())?;
    pretty_kv(
        w,
        "Party",
        p.party_id.map_or_else(|| "none".to_string(), |id| id.to_string()),
    )?;
    pretty_kv(w, "Solved", p.stats.total_problems.to_string())?;
    pretty_kv(w, "Current streak", format!("{} day(s)", p.stats.current_streak))?;
    pretty_kv(w, "Longest streak", format!("{} day(s)", p.stats.longest_streak))?;
    pretty_kv(w, "Points", p.stats.reward_points.to_string())?;
    pretty_kv(
        w,
        "Last solve",
        p.stats
            .last_solve_date
            .map_or_else(|| "never".to_string(), |d| d.to_string()),
    )?;
    pretty_kv(
        w,
        "Refreshed",
        p.last_refreshed_at_us
            .and_then(chrono::DateTime::from_timestamp_micros)
            .map_or_else(|| "never".to_string(), |t| t.to_rfc3339()),
    )?;
    if let Some(solves) = &view.solves {
        writeln!(w)?;
        pretty_section(w, "Solves")?;
        for solve in solves {
            writeln!(w, "  {}  problem {}", solve.solved_on, solve.problem_id)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solvetrack_core::config::ProjectConfig;
    use crate::output::OutputMode;
    use solvetrack_core::error::ErrorCode;

    fn ctx_for(dir: &std::path::Path) -> Context {
        Context {
            project_root: dir.to_path_buf(),
            config: ProjectConfig::default(),
            output: OutputMode::Json,
        }
    }

    #[test]
    fn add_requires_initialized_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = AddArgs {
            display_name: "Ada".into(),
            handle: "ada".into(),
        };
        let err = run_add(&args, &ctx_for(dir.path())).expect_err("not initialized");
        assert_eq!(
            crate::output::error_code_of(&err),
            Some(ErrorCode::NotInitialized)
        );
    }

    #[test]
    fn pretty_view_lists_stats() {
        let person = Person {
            person_id: 1,
            display_name: "Ada".into(),
            handle: "ada".into(),
            party_id: None,
            stats: solvetrack_core::model::PersonStats {
                total_problems: 4,
                current_streak: 1,
                longest_streak: 3,
                last_solve_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 5),
                reward_points: 8,
            },
            last_refreshed_at_us: None,
            created_at_us: 0,
        };
        let mut buf = Vec::new();
        write_pretty(
            &PersonView {
                person,
                solves: None,
            },
            &mut buf,
        )
        .expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("Ada (@ada)"));
        assert!(text.contains("Longest streak:  3 day(s)"));
        assert!(text.contains("2024-01-05"));
    }
}
