//! Canonical SQLite schema for the tracker store.
//!
//! - `persons` holds identity plus the derived aggregate columns the engine
//!   rewrites after every refresh
//! - `problems` caches upstream metadata, unique by slug
//! - `solve_records` is the append-only ledger, one row per `(person, problem)`
//! - `parties` groups persons; membership is `persons.party_id`
//! - `store_meta` tracks the schema version

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS parties (
    party_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    goal INTEGER NOT NULL DEFAULT 0 CHECK (goal >= 0),
    starts_on TEXT NOT NULL,
    ends_on TEXT NOT NULL,
    last_bulk_refresh_at_us INTEGER,
    created_at_us INTEGER NOT NULL,
    CHECK (ends_on >= starts_on)
);

CREATE TABLE IF NOT EXISTS persons (
    person_id INTEGER PRIMARY KEY AUTOINCREMENT,
    display_name TEXT NOT NULL CHECK (length(trim(display_name)) > 0),
    handle TEXT NOT NULL CHECK (length(trim(handle)) > 0),
    party_id INTEGER REFERENCES parties(party_id) ON DELETE SET NULL,
    total_problems INTEGER NOT NULL DEFAULT 0,
    current_streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    last_solve_date TEXT,
    reward_points INTEGER NOT NULL DEFAULT 0,
    last_refreshed_at_us INTEGER,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS problems (
    problem_id INTEGER PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE CHECK (length(trim(slug)) > 0),
    title TEXT NOT NULL,
    difficulty TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard'))
);

CREATE TABLE IF NOT EXISTS solve_records (
    person_id INTEGER NOT NULL REFERENCES persons(person_id) ON DELETE CASCADE,
    problem_id INTEGER NOT NULL REFERENCES problems(problem_id),
    solved_on TEXT NOT NULL,
    points INTEGER CHECK (points IS NULL OR points >= 0),
    recorded_at_us INTEGER NOT NULL,
    PRIMARY KEY (person_id, problem_id)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, created_at_us)
VALUES (1, 1, CAST(strftime('%s', 'now') AS INTEGER) * 1000000);
";

/// Migration v2: read-path indexes for leaderboard and party windows.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_persons_reward_points
    ON persons(reward_points DESC, total_problems DESC, person_id);

CREATE INDEX IF NOT EXISTS idx_persons_party
    ON persons(party_id);

CREATE INDEX IF NOT EXISTS idx_solve_records_person_date
    ON solve_records(person_id, solved_on);

CREATE INDEX IF NOT EXISTS idx_solve_records_date
    ON solve_records(solved_on, person_id);
";

/// Indexes expected by leaderboard and party query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_persons_reward_points",
    "idx_persons_party",
    "idx_solve_records_person_date",
    "idx_solve_records_date",
];
