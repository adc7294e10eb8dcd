use std::fmt;
use std::str::FromStr;

use super::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Lecturer,
    Student,
    Advisor,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Lecturer, Role::Student, Role::Advisor];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Lecturer => "lecturer",
            Role::Student => "student",
            Role::Advisor => "advisor",
        }
    }

    /// Keeps only the role names present in the allow-list. Unknown names are
    /// dropped rather than rejected, matching the fanout contract: callers get
    /// a possibly-empty set, never an error, for a bad role name.
    pub fn filter_known<'a, I>(names: I) -> Vec<Role>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut roles = Vec::new();
        for role in names.into_iter().filter_map(|name| name.parse().ok()) {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        roles
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "lecturer" => Ok(Role::Lecturer),
            "student" => Ok(Role::Student),
            "advisor" => Ok(Role::Advisor),
            other => Err(DomainError::InvalidRole(other.to_string())),
        }
    }
}
