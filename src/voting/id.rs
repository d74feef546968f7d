use std::clone::Clone;
use std::cmp::{Eq, PartialEq};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::error::{self, ValidationError};

/// Identifier of a stored record: candidates, votes, registrations, profiles,
/// accounts, and sessions.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub Uuid);
impl Id {
    pub fn new() -> Id {
        Id(Uuid::new_v4())
    }
}
impl Default for Id {
    fn default() -> Self {
        Id::new()
    }
}
impl Display for Id {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl FromStr for Id {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Id)
    }
}


pub const EMPLOYEE_ID_MAX_LEN: usize = 50;

/// An employee's NIP, the business key every voter record hangs off.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(String);
impl EmployeeId {
    /// Trims the raw input and rejects empty, oversized, or space-containing NIPs.
    pub fn parse(raw: &str) -> Result<EmployeeId, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(error::employee_id_empty());
        }
        let len = trimmed.chars().count();
        if len > EMPLOYEE_ID_MAX_LEN {
            return Err(error::employee_id_too_long(EMPLOYEE_ID_MAX_LEN, len));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(error::employee_id_malformed(trimmed));
        }
        Ok(EmployeeId(trimmed.to_string()))
    }

    /// Wraps a value already validated on the way into storage.
    pub fn from_stored(value: String) -> EmployeeId {
        EmployeeId(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl Display for EmployeeId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl PartialEq<&str> for EmployeeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_id_is_trimmed() {
        let id = EmployeeId::parse("  19870412  ").unwrap();
        assert_eq!(id, "19870412");
    }

    #[test]
    fn employee_id_rejects_blank_and_inner_space() {
        assert!(EmployeeId::parse("   ").is_err());
        assert!(EmployeeId::parse("1987 0412").is_err());
        assert!(EmployeeId::parse(&"9".repeat(EMPLOYEE_ID_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn employee_id_limit_counts_characters() {
        assert!(EmployeeId::parse(&"é".repeat(EMPLOYEE_ID_MAX_LEN)).is_ok());
        assert!(EmployeeId::parse(&"é".repeat(EMPLOYEE_ID_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn id_parses_uuid_text() {
        let id = Id::new();
        assert_eq!(id.to_string().parse::<Id>().unwrap(), id);
        assert!("not-a-uuid".parse::<Id>().is_err());
    }
}
