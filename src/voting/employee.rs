use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::{EmployeeId, Id};

/// A row of the employee roster imported by the admins. Only employees on the
/// roster can register, and `has_voted` mirrors whether a vote row exists.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Employee {
    pub id: Id,
    pub employee_id: EmployeeId,
    pub employee_name: Option<String>,
    pub has_voted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn new(employee_id: EmployeeId, employee_name: Option<String>, now: DateTime<Utc>) -> Employee {
        Employee {
            id: Id::new(),
            employee_id,
            employee_name,
            has_voted: false,
            created_at: now,
            updated_at: now,
        }
    }
}
