//! Core domain types for the Batchline demo pipeline.

use serde::{Deserialize, Serialize};

/// A persisted employee row, materialized from storage by the reader.
///
/// `id` is assigned by the storage engine on insert and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    /// Storage-assigned identifier, unique and non-null once persisted.
    pub id: i64,
    /// Employee name (the only field the demo transform mutates).
    pub name: String,
    /// Department name, passed through unchanged.
    pub department: String,
    /// Salary, passed through unchanged.
    pub salary: f64,
}

/// An employee prior to persistence — no identifier yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub department: String,
    pub salary: f64,
}

impl NewEmployee {
    pub fn new(name: impl Into<String>, department: impl Into<String>, salary: f64) -> Self {
        Self {
            name: name.into(),
            department: department.into(),
            salary,
        }
    }
}

/// The three fixed demo records seeded at process start.
pub fn demo_employees() -> Vec<NewEmployee> {
    vec![
        NewEmployee::new("Alice", "IT", 60000.0),
        NewEmployee::new("Bob", "HR", 50000.0),
        NewEmployee::new("Charlie", "Finance", 70000.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_employee_constructor() {
        let e = NewEmployee::new("Alice", "IT", 60000.0);
        assert_eq!(e.name, "Alice");
        assert_eq!(e.department, "IT");
        assert_eq!(e.salary, 60000.0);
    }

    #[test]
    fn demo_seed_set() {
        let seed = demo_employees();
        assert_eq!(seed.len(), 3);
        assert_eq!(seed[0].name, "Alice");
        assert_eq!(seed[2].department, "Finance");
    }

    #[test]
    fn employee_serialization_roundtrip() {
        let e = Employee {
            id: 1,
            name: "Bob".into(),
            department: "HR".into(),
            salary: 50000.0,
        };
        let json = serde_json::to_string(&e).expect("serialize");
        let parsed: Employee = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, e);
    }
}
