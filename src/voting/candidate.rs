use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::Id;
use crate::error::{self, ValidationError};

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Candidate {
    pub id: Id,
    pub name: String,
    pub photo_url: Option<String>,
    pub description: Option<String>,
    /// Position on the ballot, ascending.
    pub order_number: i32,
    pub created_at: DateTime<Utc>,
}

/// Candidate form input exactly as the admin typed it.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UnvalidatedCandidate {
    pub name: String,
    pub description: String,
    pub photo_url: Option<String>,
    pub order_number: String,
}

pub struct NewCandidate {
    pub name: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub order_number: i32,
}

impl TryFrom<UnvalidatedCandidate> for NewCandidate {
    type Error = ValidationError;
    fn try_from(value: UnvalidatedCandidate) -> Result<Self, Self::Error> {
        let UnvalidatedCandidate { name, description, photo_url, order_number } = value;

        let name = name.trim();
        if name.is_empty() {
            return Err(error::candidate_name_empty());
        }

        let raw_order = order_number.trim();
        let order_number = match raw_order.parse::<i32>() {
            Ok(n) if n > 0 => n,
            _ => return Err(error::candidate_order_invalid(raw_order)),
        };

        let description = description.trim();
        Ok(NewCandidate {
            name: name.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            photo_url: photo_url.filter(|url| !url.trim().is_empty()),
            order_number,
        })
    }
}

impl Candidate {
    pub fn new(
        NewCandidate { name, description, photo_url, order_number }: NewCandidate,
        now: DateTime<Utc>,
    ) -> Candidate {
        Candidate {
            id: Id::new(),
            name,
            photo_url,
            description,
            order_number,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, order: &str) -> UnvalidatedCandidate {
        UnvalidatedCandidate {
            name: String::from(name),
            order_number: String::from(order),
            ..Default::default()
        }
    }

    #[test]
    fn trims_and_drops_blank_description() {
        let candidate = NewCandidate::try_from(UnvalidatedCandidate {
            description: String::from("   "),
            ..form("  Siti Rahma ", " 2 ")
        }).unwrap();
        assert_eq!(candidate.name, "Siti Rahma");
        assert_eq!(candidate.order_number, 2);
        assert_eq!(candidate.description, None);
    }

    #[test]
    fn rejects_missing_name() {
        assert!(NewCandidate::try_from(form("  ", "1")).is_err());
    }

    #[test]
    fn rejects_non_numeric_or_zero_order() {
        assert!(NewCandidate::try_from(form("Budi", "first")).is_err());
        assert!(NewCandidate::try_from(form("Budi", "0")).is_err());
        assert!(NewCandidate::try_from(form("Budi", "")).is_err());
    }
}
