use chrono::{DateTime, Utc};
use serde::Serialize;

/// Whether voting is currently open for a category.
///
/// There is no stored status column; this is always derived from the
/// category's end time at read time. Callers should pass a `now` obtained
/// from the store (`NOW()`) so application-level and query-level checks
/// agree on the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VotingStatus {
    Active,
    Expired,
}

impl VotingStatus {
    pub fn is_active(self) -> bool {
        matches!(self, VotingStatus::Active)
    }
}

/// `None` means the category never expires. A category is active strictly
/// before its end time; at the end time it is already expired.
pub fn voting_status(end_time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> VotingStatus {
    match end_time {
        None => VotingStatus::Active,
        Some(end) if now < end => VotingStatus::Active,
        Some(_) => VotingStatus::Expired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn no_end_time_is_always_active() {
        assert_eq!(voting_status(None, at(0)), VotingStatus::Active);
        assert_eq!(voting_status(None, at(i32::MAX as i64)), VotingStatus::Active);
    }

    #[test]
    fn active_strictly_before_end_time() {
        assert_eq!(voting_status(Some(at(100)), at(99)), VotingStatus::Active);
    }

    #[test]
    fn expired_at_exactly_end_time() {
        assert_eq!(voting_status(Some(at(100)), at(100)), VotingStatus::Expired);
    }

    #[test]
    fn expired_after_end_time() {
        assert_eq!(voting_status(Some(at(100)), at(101)), VotingStatus::Expired);
    }

    #[test]
    fn is_active_helper() {
        assert!(VotingStatus::Active.is_active());
        assert!(!VotingStatus::Expired.is_active());
    }
}
