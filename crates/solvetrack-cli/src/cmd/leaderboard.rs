use anyhow::Result;
use clap::Args;
use solvetrack_core::db::query::{self, LeaderboardEntry, ordinal};
use std::io::{self, Write};

use super::Context;
use crate::output::{pretty_rule, render_mode};

#[derive(Args, Debug)]
pub struct LeaderboardArgs {
    /// Show only the top N persons.
    #[arg(long)]
    pub limit: Option<u32>,
}

/// Execute `st leaderboard`.
pub fn run_leaderboard(args: &LeaderboardArgs, ctx: &Context) -> Result<()> {
    let conn = ctx.open_store()?;
    let board = query::leaderboard(&conn, args.limit)?;
    render_mode(ctx.output, &board, write_text, write_pretty)
}

fn write_text(board: &Vec<LeaderboardEntry>, w: &mut dyn Write) -> io::Result<()> {
    for entry in board {
        let p = &entry.person;
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            entry.rank, p.handle, p.stats.reward_points, p.stats.total_problems, p.stats.current_streak
        )?;
    }
    Ok(())
}

fn write_pretty(board: &Vec<LeaderboardEntry>, w: &mut dyn Write) -> io::Result<()> {
    if board.is_empty() {
        return writeln!(w, "No one is being tracked yet. Add someone with `st person add`.");
    }
    writeln!(
        w,
        "{:<6} {:<24} {:>7} {:>7} {:>7}",
        "RANK", "NAME", "POINTS", "SOLVED", "STREAK"
    )?;
    pretty_rule(w)?;
    for entry in board {
        let p = &entry.person;
        writeln!(
            w,
            "{:<6} {:<24} {:>7} {:>7} {:>7}",
            ordinal(entry.rank),
            p.display_name,
            p.stats.reward_points,
            p.stats.total_problems,
            p.stats.current_streak
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solvetrack_core::model::{Person, PersonStats};

    fn entry(rank: u32, name: &str, points: u64) -> LeaderboardEntry {
        LeaderboardEntry {
            rank,
            person: Person {
                person_id: i64::from(rank),
                display_name: name.to_string(),
                handle: name.to_lowercase(),
                party_id: None,
                stats: PersonStats {
                    reward_points: points,
                    ..PersonStats::default()
                },
                last_refreshed_at_us: None,
                created_at_us: 0,
            },
        }
    }

    #[test]
    fn pretty_board_uses_ordinals() {
        let board = vec![entry(1, "Ada", 9), entry(2, "Bob", 4), entry(3, "Cy", 1)];
        let mut buf = Vec::new();
        write_pretty(&board, &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("1st"));
        assert!(text.contains("2nd"));
        assert!(text.contains("3rd"));
    }

    #[test]
    fn text_board_is_tab_separated() {
        let mut buf = Vec::new();
        write_text(&vec![entry(1, "Ada", 9)], &mut buf).expect("render");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "1\tada\t9\t0\t0\n");
    }
}
