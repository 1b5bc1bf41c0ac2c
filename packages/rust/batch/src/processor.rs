//! The demo transform: uppercase the employee name.

use batchline_shared::{Employee, Result};

use crate::item::{ItemProcessor, ProcessorAction};

/// Replaces `name` with its uppercased form; every other field passes
/// through unchanged. Pure and stateless, and cannot fail on well-formed
/// input — it never skips and never returns an error.
#[derive(Debug, Default)]
pub struct UppercaseNameProcessor;

impl ItemProcessor<Employee, Employee> for UppercaseNameProcessor {
    fn process(&self, item: &Employee) -> Result<ProcessorAction<Employee>> {
        Ok(ProcessorAction::Keep(Employee {
            id: item.id,
            name: item.name.to_uppercase(),
            department: item.department.clone(),
            salary: item.salary,
        }))
    }
}
