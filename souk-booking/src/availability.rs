use chrono::{DateTime, Utc};
use souk_core::{CoreError, CoreResult};

/// Half-open overlap test. A booking that ends exactly when another starts
/// does not conflict, so back-to-back slots work without padding.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Validates a proposed interval before anything is locked or priced.
pub fn validate_interval(
    now: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> CoreResult<()> {
    if end <= start {
        return Err(CoreError::InvalidInterval(
            "end must be after start".to_string(),
        ));
    }
    if start < now {
        return Err(CoreError::InvalidInterval(
            "start must not be in the past".to_string(),
        ));
    }
    Ok(())
}
