//! Repository implementations: SQL-backed (`sqlx` over SQLite) and an
//! in-memory double with the same filter/sort/paginate semantics.

use chrono::{DateTime, Duration, SubsecRound, Utc};

pub mod memory_repo;
pub mod sql_repo;

pub use memory_repo::InMemoryTaskRepository;
pub use sql_repo::{SqlRepoOptions, SqlTaskRepository};

/// Current time at the precision both stores keep (microseconds).
pub(crate) fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// `updated_at` for a mutation of a row last touched at `previous`; always
/// strictly later than `previous`.
pub(crate) fn next_update_stamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now_utc();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// ASCII case-insensitive substring match, the same rule SQLite's `LIKE` applies.
pub(crate) fn title_matches(title: &str, needle: &str) -> bool {
    needle.is_empty()
        || title
            .to_ascii_lowercase()
            .contains(&needle.to_ascii_lowercase())
}
