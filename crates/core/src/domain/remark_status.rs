use std::fmt;
use std::str::FromStr;

use super::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemarkStatus {
    Pending,
    Approved,
    Rejected,
}

impl RemarkStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RemarkStatus::Pending => "pending",
            RemarkStatus::Approved => "approved",
            RemarkStatus::Rejected => "rejected",
        }
    }

    /// Approved and rejected are terminal; only a pending request resolves.
    pub fn is_resolved(self) -> bool {
        matches!(self, RemarkStatus::Approved | RemarkStatus::Rejected)
    }
}

impl fmt::Display for RemarkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemarkStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RemarkStatus::Pending),
            "approved" => Ok(RemarkStatus::Approved),
            "rejected" => Ok(RemarkStatus::Rejected),
            other => Err(DomainError::InvalidRemarkStatus(other.to_string())),
        }
    }
}
