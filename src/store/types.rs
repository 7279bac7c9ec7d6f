//! Employee records and change-log entries.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// A stored employee record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub position: String,
    pub salary: f64,
}

impl Employee {
    /// Check the mutable fields, the same rules a create payload follows.
    /// The id is not checked: an id no row carries, zero and negatives
    /// included, makes an update a no-op.
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_fields(&self.name, &self.position, self.salary)
    }
}

/// Payload for creating an employee. The id is assigned by the primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub position: String,
    pub salary: f64,
}

impl NewEmployee {
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_fields(&self.name, &self.position, self.salary)
    }
}

fn validate_fields(name: &str, position: &str, salary: f64) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::MalformedInput("name must not be empty".into()));
    }
    if position.trim().is_empty() {
        return Err(StoreError::MalformedInput("position must not be empty".into()));
    }
    if !salary.is_finite() {
        return Err(StoreError::MalformedInput("salary must be a finite number".into()));
    }
    Ok(())
}

/// Kind of mutation recorded in the change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    /// Name stored in the `ReplicationLog.Operation` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INSERT" => Ok(Operation::Insert),
            "UPDATE" => Ok(Operation::Update),
            "DELETE" => Ok(Operation::Delete),
            other => Err(StoreError::UnknownOperation(other.to_string())),
        }
    }
}

/// One row of the append-only change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub log_id: i64,
    pub operation: Operation,
    pub employee_id: i64,
    /// Unix seconds.
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_employee_validation() {
        let ok = NewEmployee { name: "Ann".into(), position: "Eng".into(), salary: 50000.0 };
        assert!(ok.validate().is_ok());

        let blank_name = NewEmployee { name: "  ".into(), ..ok.clone() };
        assert!(matches!(blank_name.validate(), Err(StoreError::MalformedInput(_))));

        let blank_position = NewEmployee { position: String::new(), ..ok.clone() };
        assert!(matches!(blank_position.validate(), Err(StoreError::MalformedInput(_))));

        let nan_salary = NewEmployee { salary: f64::NAN, ..ok };
        assert!(matches!(nan_salary.validate(), Err(StoreError::MalformedInput(_))));
    }

    #[test]
    fn test_employee_validation_ignores_id() {
        let e = Employee { id: 0, name: "Ann".into(), position: "Eng".into(), salary: 1.0 };
        assert!(e.validate().is_ok());
        let e = Employee { id: -4, ..e };
        assert!(e.validate().is_ok());
        let e = Employee { name: String::new(), ..e };
        assert!(matches!(e.validate(), Err(StoreError::MalformedInput(_))));
    }

    #[test]
    fn test_operation_names() {
        for op in [Operation::Insert, Operation::Update, Operation::Delete] {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
        assert!("TRUNCATE".parse::<Operation>().is_err());
    }

    #[test]
    fn test_create_payload_ignores_id() {
        let parsed: NewEmployee =
            serde_json::from_str(r#"{"id":9,"name":"Ann","position":"Eng","salary":1.5}"#).unwrap();
        assert_eq!(parsed.name, "Ann");
        assert_eq!(parsed.salary, 1.5);
    }
}
