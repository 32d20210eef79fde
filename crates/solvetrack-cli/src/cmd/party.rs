use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde::Serialize;
use solvetrack_core::clock::{Clock, SystemClock};
use solvetrack_core::db::query;
use solvetrack_core::model::{Party, Person};
use solvetrack_core::refresh::Refresher;
use solvetrack_core::report::{self, PartyProgress, PartyStatus};
use solvetrack_core::roster::{self, NewParty};
use solvetrack_core::source::LeetCodeClient;
use std::io::{self, Write};

use super::{Context, find_party, now_us};
use crate::cmd::refresh::render_bulk;
use crate::output::{pretty_kv, pretty_section, render, render_mode};

#[derive(Subcommand, Debug)]
pub enum PartyCommand {
    /// Create a party with a solve goal and a date window.
    Create(CreateArgs),
    /// Put a person into a party.
    Join {
        person_id: i64,
        party_id: i64,
    },
    /// Take a person out of their party.
    Leave { person_id: i64 },
    /// Show status, members and progress of a party.
    Show { party_id: i64 },
    /// Refresh every member of a party.
    Refresh { party_id: i64 },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    pub name: String,

    /// Target number of solves across all members.
    #[arg(long)]
    pub goal: u32,

    /// First day of the party (YYYY-MM-DD, inclusive).
    #[arg(long)]
    pub starts: NaiveDate,

    /// Last day of the party (YYYY-MM-DD, inclusive).
    #[arg(long)]
    pub ends: NaiveDate,
}

#[derive(Debug, Serialize)]
struct MembershipChange {
    person_id: i64,
    party_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct PartyView {
    #[serde(flatten)]
    party: Party,
    status: PartyStatus,
    members: Vec<Person>,
    progress: PartyProgress,
}

pub fn run_party(command: &PartyCommand, ctx: &Context) -> Result<()> {
    match command {
        PartyCommand::Create(args) => run_create(args, ctx),
        PartyCommand::Join {
            person_id,
            party_id,
        } => run_join(*person_id, *party_id, ctx),
        PartyCommand::Leave { person_id } => run_leave(*person_id, ctx),
        PartyCommand::Show { party_id } => run_show(*party_id, ctx),
        PartyCommand::Refresh { party_id } => run_refresh(*party_id, ctx),
    }
}

fn run_create(args: &CreateArgs, ctx: &Context) -> Result<()> {
    let conn = ctx.open_store()?;
    let party = roster::create_party(
        &conn,
        &NewParty {
            name: args.name.clone(),
            goal: args.goal,
            starts_on: args.starts,
            ends_on: args.ends,
        },
        now_us(),
    )
    .context("create party")?;
    tracing::info!(party_id = party.party_id, name = %party.name, "party created");

    render(ctx.output, &party, |party, w| {
        writeln!(
            w,
            "✓ Created party {} \"{}\" ({} to {}, goal {})",
            party.party_id, party.name, party.starts_on, party.ends_on, party.goal
        )
    })
}

fn run_join(person_id: i64, party_id: i64, ctx: &Context) -> Result<()> {
    let conn = ctx.open_store()?;
    roster::join_party(&conn, person_id, party_id).context("join party")?;
    let change = MembershipChange {
        person_id,
        party_id: Some(party_id),
    };
    render(ctx.output, &change, |change, w| {
        writeln!(
            w,
            "✓ Person {} joined party {}",
            change.person_id,
            change.party_id.unwrap_or_default()
        )
    })
}

fn run_leave(person_id: i64, ctx: &Context) -> Result<()> {
    let conn = ctx.open_store()?;
    roster::leave_party(&conn, person_id).context("leave party")?;
    let change = MembershipChange {
        person_id,
        party_id: None,
    };
    render(ctx.output, &change, |change, w| {
        writeln!(w, "✓ Person {} left their party", change.person_id)
    })
}

fn run_show(party_id: i64, ctx: &Context) -> Result<()> {
    let conn = ctx.open_store()?;
    let party = find_party(&conn, party_id)?;
    let members = query::party_members(&conn, party_id)?;
    let solves = query::party_solves(&conn, party_id, party.starts_on, party.ends_on)?;
    let progress = report::party_progress(&solves, party.goal);
    let status = report::party_status(&party, SystemClock.today());

    let view = PartyView {
        party,
        status,
        members,
        progress,
    };
    render_mode(ctx.output, &view, write_text, write_pretty)
}

fn run_refresh(party_id: i64, ctx: &Context) -> Result<()> {
    let mut conn = ctx.open_store()?;
    let client = LeetCodeClient::from_config(&ctx.config.source);
    let report = Refresher::from_config(&mut conn, client, SystemClock, &ctx.config)
        .refresh_party(party_id)?;
    render_bulk(ctx.output, &report)
}

fn write_text(view: &PartyView, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}/{}\t{}",
        view.party.party_id, view.party.name, view.progress.done, view.progress.goal, view.status
    )?;
    for bar in &view.progress.bars {
        writeln!(w, "{}\t{}\t{}", bar.person_id, bar.display_name, bar.solves)?;
    }
    Ok(())
}

fn write_pretty(view: &PartyView, w: &mut dyn Write) -> io::Result<()> {
    let party = &view.party;
    pretty_section(w, &format!("{} (party {})", party.name, party.party_id))?;
    pretty_kv(w, "Window", format!("{} to {}", party.starts_on, party.ends_on))?;
    pretty_kv(w, "Status", view.status.to_string())?;
    pretty_kv(
        w,
        "Progress",
        format!(
            "{}/{} ({}%)",
            view.progress.done,
            view.progress.goal,
            view.progress.percent()
        ),
    )?;
    pretty_kv(w, "Members", view.members.len().to_string())?;

    if !view.progress.bars.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Solves in window")?;
        for bar in &view.progress.bars {
            writeln!(w, "  {:<24} {:>4}", bar.display_name, bar.solves)?;
        }
    }
    Ok(())
}
