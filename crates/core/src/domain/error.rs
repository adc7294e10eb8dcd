use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("Mark obtained ({mark}) exceeds the maximum mark allowed ({max}) for this component.")]
    MarkExceedsMax { mark: f64, max: f64 },

    #[error("Mark obtained must be a non-negative number.")]
    NegativeMark,

    #[error("Invalid role specified.")]
    InvalidRole(String),

    #[error("Invalid remark status specified.")]
    InvalidRemarkStatus(String),

    #[error("Max mark must be a positive number.")]
    InvalidMaxMark(f64),

    #[error("Weight percentage must be between 0 and 100.")]
    InvalidWeight(f64),
}
