//! Weighted course aggregation.
//!
//! The summary is computed over every assessment component of the course,
//! whether or not a mark has been recorded for it. An ungraded component
//! still contributes its weight to the denominator, so it lowers the
//! percentage until a mark lands. This mirrors how the course summaries
//! have always been reported to students.

use super::DomainError;

/// One assessment component joined with the student's mark, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentMark {
    pub max_mark: f64,
    pub weight_percentage: f64,
    pub mark_obtained: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CourseSummary {
    pub overall_percentage: f64,
    pub letter_grade: char,
}

/// Fixed threshold ladder.
pub fn letter_grade(percentage: f64) -> char {
    if percentage >= 90.0 {
        'A'
    } else if percentage >= 80.0 {
        'B'
    } else if percentage >= 70.0 {
        'C'
    } else if percentage >= 60.0 {
        'D'
    } else {
        'F'
    }
}

pub fn summarize_course(rows: &[ComponentMark]) -> CourseSummary {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    for row in rows {
        total_weight += row.weight_percentage;
        if let Some(mark) = row.mark_obtained {
            if row.max_mark > 0.0 {
                weighted += mark / row.max_mark * row.weight_percentage;
            }
        }
    }

    let overall_percentage = if total_weight > 0.0 {
        weighted / total_weight * 100.0
    } else {
        0.0
    };

    CourseSummary {
        overall_percentage,
        letter_grade: letter_grade(overall_percentage),
    }
}

/// Validates a component definition before it is accepted.
pub fn validate_component(max_mark: f64, weight_percentage: f64) -> Result<(), DomainError> {
    if !max_mark.is_finite() || max_mark <= 0.0 {
        return Err(DomainError::InvalidMaxMark(max_mark));
    }
    if !weight_percentage.is_finite() || !(0.0..=100.0).contains(&weight_percentage) {
        return Err(DomainError::InvalidWeight(weight_percentage));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graded(max_mark: f64, weight_percentage: f64, mark: f64) -> ComponentMark {
        ComponentMark {
            max_mark,
            weight_percentage,
            mark_obtained: Some(mark),
        }
    }

    #[test]
    fn worked_example_scores_86_grade_b() {
        let summary = summarize_course(&[graded(100.0, 40.0, 80.0), graded(50.0, 60.0, 45.0)]);
        assert!((summary.overall_percentage - 86.0).abs() < 1e-9);
        assert_eq!(summary.letter_grade, 'B');
    }

    #[test]
    fn ladder_boundaries_are_inclusive() {
        assert_eq!(letter_grade(90.0), 'A');
        assert_eq!(letter_grade(89.999), 'B');
        assert_eq!(letter_grade(80.0), 'B');
        assert_eq!(letter_grade(70.0), 'C');
        assert_eq!(letter_grade(60.0), 'D');
        assert_eq!(letter_grade(59.999), 'F');
        assert_eq!(letter_grade(0.0), 'F');
    }

    #[test]
    fn no_components_yields_zero_not_nan() {
        let summary = summarize_course(&[]);
        assert_eq!(summary.overall_percentage, 0.0);
        assert_eq!(summary.letter_grade, 'F');
    }

    #[test]
    fn ungraded_component_still_weighs_on_the_denominator() {
        // Full marks on the graded half, nothing recorded for the other half:
        // the summary reads 50%, not 100%.
        let rows = [
            graded(100.0, 50.0, 100.0),
            ComponentMark {
                max_mark: 100.0,
                weight_percentage: 50.0,
                mark_obtained: None,
            },
        ];
        let summary = summarize_course(&rows);
        assert!((summary.overall_percentage - 50.0).abs() < 1e-9);
        assert_eq!(summary.letter_grade, 'F');
    }

    #[test]
    fn component_bounds_are_validated() {
        assert!(validate_component(100.0, 40.0).is_ok());
        assert!(validate_component(0.0, 40.0).is_err());
        assert!(validate_component(-5.0, 40.0).is_err());
        assert!(validate_component(100.0, 100.0).is_ok());
        assert!(validate_component(100.0, 100.5).is_err());
        assert!(validate_component(100.0, -0.5).is_err());
    }
}
