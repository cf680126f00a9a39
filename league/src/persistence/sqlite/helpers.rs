//! Shared encode/decode helpers for SQLite ↔ domain type conversions.

// ── Counters ───────────────────────────────────────────────────────────

/// Decode an INTEGER counter column. The schema keeps counters non-negative;
/// anything outside `u32` saturates.
pub fn decode_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Decode an INTEGER unix timestamp column.
pub fn decode_timestamp(value: i64) -> u64 {
    value.max(0) as u64
}

// ── Constraint errors ──────────────────────────────────────────────────

/// Returns the `table.column` named by a UNIQUE (or PRIMARY KEY) violation.
///
/// SQLite reports these as `UNIQUE constraint failed: teams.abbreviation`.
pub fn unique_violation_column(err: &sqlx::Error) -> Option<String> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    if !db_err.is_unique_violation() {
        return None;
    }
    let message = db_err.message();
    Some(
        message
            .rsplit(": ")
            .next()
            .unwrap_or(message)
            .trim()
            .to_string(),
    )
}
