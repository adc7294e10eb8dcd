use super::DomainError;

/// Bounds check for a recorded mark: 0 and `max_mark` are both valid.
pub fn validate_mark(mark: f64, max_mark: f64) -> Result<(), DomainError> {
    if !mark.is_finite() || mark < 0.0 {
        return Err(DomainError::NegativeMark);
    }
    if mark > max_mark {
        return Err(DomainError::MarkExceedsMax {
            mark,
            max: max_mark,
        });
    }
    Ok(())
}
