use anyhow::{Context as _, Result, bail};
use clap::Args;
use serde::Serialize;
use solvetrack_core::clock::SystemClock;
use solvetrack_core::config::ProjectConfig;
use solvetrack_core::refresh::{BulkRefreshReport, Refresher, RefreshSummary};
use solvetrack_core::source::LeetCodeClient;
use std::io::{self, Write};

use super::{Context, find_person};
use crate::output::{OutputMode, pretty_kv, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Person id to refresh.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub person_id: Option<i64>,

    /// Refresh every tracked person.
    #[arg(long)]
    pub all: bool,

    /// How many recent accepted submissions to request.
    #[arg(long)]
    pub limit: Option<u32>,
}

/// One member's line in a bulk refresh report.
#[derive(Debug, Serialize)]
pub struct OutcomeView {
    pub person_id: i64,
    pub handle: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_solves: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_points: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct BulkView {
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<OutcomeView>,
}

impl From<&BulkRefreshReport> for BulkView {
    fn from(report: &BulkRefreshReport) -> Self {
        let outcomes = report
            .outcomes
            .iter()
            .map(|outcome| match &outcome.result {
                Ok(summary) => OutcomeView {
                    person_id: outcome.person_id,
                    handle: outcome.handle.clone(),
                    ok: true,
                    new_solves: Some(summary.new_solves),
                    reward_points: Some(summary.stats.reward_points),
                    error: None,
                    error_code: None,
                    step: None,
                },
                Err(err) => OutcomeView {
                    person_id: outcome.person_id,
                    handle: outcome.handle.clone(),
                    ok: false,
                    new_solves: None,
                    reward_points: None,
                    error: Some(err.to_string()),
                    error_code: Some(err.code().code()),
                    step: Some(err.step().as_str()),
                },
            })
            .collect();
        Self {
            succeeded: report.succeeded(),
            failed: report.failed(),
            outcomes,
        }
    }
}

/// Execute `st refresh <person> | --all`.
///
/// A failed single refresh, or any failed member of `--all`, makes the command
/// fail after the report is printed.
pub fn run_refresh(args: &RefreshArgs, ctx: &Context) -> Result<()> {
    let mut conn = ctx.open_store()?;

    let target = args
        .person_id
        .map(|person_id| find_person(&conn, person_id))
        .transpose()?;

    let client = LeetCodeClient::from_config(&ctx.config.source);
    let mut refresher = Refresher::from_config(&mut conn, client, SystemClock, &ctx.config)
        .with_fetch_limit(fetch_limit(args, &ctx.config));

    let Some(person) = target else {
        let report = refresher.refresh_all()?;
        return render_bulk(ctx.output, &report);
    };

    let limit = refresher.fetch_limit();
    let summary = refresher
        .refresh(person.person_id, &person.handle, limit)
        .with_context(|| format!("refresh {} (@{})", person.display_name, person.handle))?;
    render_summary(ctx.output, &summary)
}

/// `--limit` when given, otherwise the configured `source.fetch_limit`.
fn fetch_limit(args: &RefreshArgs, config: &ProjectConfig) -> u32 {
    args.limit.unwrap_or(config.source.fetch_limit)
}

fn render_summary(output: OutputMode, summary: &RefreshSummary) -> Result<()> {
    render(output, summary, |s, w| {
        if output == OutputMode::Text {
            return writeln!(
                w,
                "{}\t{}\t{}\t{}\t{}",
                s.person_id, s.handle, s.new_solves, s.stats.total_problems, s.stats.reward_points
            );
        }
        pretty_section(w, &format!("Refreshed @{}", s.handle))?;
        pretty_kv(w, "New solves", s.new_solves.to_string())?;
        pretty_kv(w, "Events seen", s.observed.to_string())?;
        if s.skipped > 0 {
            pretty_kv(w, "Skipped", format!("{} malformed", s.skipped))?;
        }
        pretty_kv(w, "Solved", s.stats.total_problems.to_string())?;
        pretty_kv(w, "Current streak", format!("{} day(s)", s.stats.current_streak))?;
        pretty_kv(w, "Longest streak", format!("{} day(s)", s.stats.longest_streak))?;
        pretty_kv(w, "Points", s.stats.reward_points.to_string())
    })
}

/// Print a bulk report and fail if any member failed.
pub fn render_bulk(output: OutputMode, report: &BulkRefreshReport) -> Result<()> {
    let view = BulkView::from(report);
    render_mode(output, &view, write_bulk_text, write_bulk_pretty)?;
    if view.failed > 0 {
        bail!(
            "{} of {} refreshes failed",
            view.failed,
            view.failed + view.succeeded
        );
    }
    Ok(())
}

fn write_bulk_text(view: &BulkView, w: &mut dyn Write) -> io::Result<()> {
    for outcome in &view.outcomes {
        match (&outcome.error, outcome.error_code) {
            (Some(error), code) => writeln!(
                w,
                "{}\t{}\tfailed\t{}\t{}",
                outcome.person_id,
                outcome.handle,
                code.unwrap_or("-"),
                error
            )?,
            (None, _) => writeln!(
                w,
                "{}\t{}\tok\t{}",
                outcome.person_id,
                outcome.handle,
                outcome.new_solves.unwrap_or(0)
            )?,
        }
    }
    Ok(())
}

fn write_bulk_pretty(view: &BulkView, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(
        w,
        &format!("Refreshed {} of {}", view.succeeded, view.outcomes.len()),
    )?;
    for outcome in &view.outcomes {
        if outcome.ok {
            writeln!(
                w,
                "  ✓ @{:<20} +{} new, {} pts",
                outcome.handle,
                outcome.new_solves.unwrap_or(0),
                outcome.reward_points.unwrap_or(0)
            )?;
        } else {
            writeln!(
                w,
                "  ✗ @{:<20} [{}] {}",
                outcome.handle,
                outcome.error_code.unwrap_or("-"),
                outcome.error.as_deref().unwrap_or("unknown error")
            )?;
        }
    }
    Ok(())
}
