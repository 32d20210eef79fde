use anyhow::{Context as _, Result, bail};
use clap::Args;
use serde::Serialize;
use solvetrack_core::config::{self, DEFAULT_CONFIG_TOML, STATE_DIR};
use solvetrack_core::db;
use std::path::Path;

use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite the default config even if `.solvetrack/` already exists.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct InitReport {
    state_dir: String,
    config: String,
    store: String,
}

const GITIGNORE: &str = "solvetrack.db\nsolvetrack.db-wal\nsolvetrack.db-shm\n";

/// Execute `st init`:
///
/// ```text
/// .solvetrack/
///   config.toml     (default source and points settings)
///   solvetrack.db   (migrated store)
///   .gitignore
/// ```
///
/// # Errors
///
/// Returns an error if `.solvetrack/` exists and `--force` is not set, or if
/// any filesystem or store operation fails.
pub fn run_init(args: &InitArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let state_dir = project_root.join(STATE_DIR);
    if state_dir.exists() && !args.force {
        bail!("{STATE_DIR}/ already exists. Use `st init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("Failed to create {}", state_dir.display()))?;

    let config_path = state_dir.join("config.toml");
    std::fs::write(&config_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    let gitignore_path = state_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write {}", gitignore_path.display()))?;

    let store_path = config::db_path(project_root);
    db::open_store(&store_path)?;
    tracing::info!(path = %store_path.display(), "store initialized");

    let report = InitReport {
        state_dir: state_dir.display().to_string(),
        config: config_path.display().to_string(),
        store: store_path.display().to_string(),
    };
    render(output, &report, |report, w| {
        writeln!(w, "✓ Initialized {STATE_DIR}/")?;
        writeln!(w)?;
        writeln!(w, "  Config: {}", report.config)?;
        writeln!(w, "  Store:  {}", report.store)?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  st person add \"Ada Lovelace\" ada_l")?;
        writeln!(w, "  st refresh 1")
    })
}
