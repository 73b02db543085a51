// Validation utilities module
// Provides custom validation functions for domain-specific rules

use chrono::NaiveTime;
use validator::ValidationError;

/// Validates that an event time range is well formed (start strictly
/// before end)
pub fn validate_time_range(start: NaiveTime, end: NaiveTime) -> Result<(), ValidationError> {
    if start < end {
        Ok(())
    } else {
        Err(ValidationError::new("start_time_must_precede_end_time"))
    }
}

/// Validates that an event quota is at least 1
pub fn validate_quota(quota: i32) -> Result<(), ValidationError> {
    if quota >= 1 {
        Ok(())
    } else {
        Err(ValidationError::new("quota_must_be_at_least_one"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_valid_time_range() {
        let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        assert!(validate_time_range(start, end).is_ok());
    }

    #[test]
    fn test_reversed_time_range() {
        let start = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert!(validate_time_range(start, end).is_err());
    }

    #[test]
    fn test_zero_length_time_range() {
        let t = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert!(validate_time_range(t, t).is_err());
    }

    #[test]
    fn test_quota_bounds() {
        assert!(validate_quota(1).is_ok());
        assert!(validate_quota(12).is_ok());
        assert!(validate_quota(0).is_err());
        assert!(validate_quota(-3).is_err());
    }
}
