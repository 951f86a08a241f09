//! Employee set of one parse run, keyed by employee id.

use crate::diagnostic::{Diagnostic, DiagnosticKind, Severity};
use crate::extract::RowFields;
use crate::model::{Employee, EmployeeStatus};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Unique employees in first-seen order
#[derive(Debug, Default)]
pub struct EmployeeRegistry {
    employees: Vec<Employee>,
    index: HashMap<String, usize>,
}

impl EmployeeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the employee facts of one row.
    ///
    /// Later rows only fill fields earlier rows left empty. A different
    /// non-empty name for a known id is reported, never applied.
    pub fn observe(&mut self, fields: &RowFields, sheet: &str, row: u32) -> Option<Diagnostic> {
        let slot = match self.index.get(&fields.employee_id).copied() {
            Some(slot) => slot,
            None => {
                self.index
                    .insert(fields.employee_id.clone(), self.employees.len());
                self.employees.push(employee_from(fields));
                return None;
            }
        };

        let employee = &mut self.employees[slot];
        let mismatch = match &fields.name {
            Some(name) if !employee.name.is_empty() && employee.name != *name => {
                Some(Diagnostic::sheet(
                    DiagnosticKind::EmployeeMismatch,
                    sheet,
                    format!(
                        "row {}: employee {} is named '{}' here but '{}' earlier",
                        row, fields.employee_id, name, employee.name
                    ),
                    Severity::Warning,
                ))
            }
            _ => None,
        };

        fill_text(&mut employee.name, &fields.name);
        fill_text(&mut employee.dispatch_company, &fields.dispatch_company);
        fill_text(&mut employee.department, &fields.department);
        employee.hire_date = employee.hire_date.or(fields.hire_date);
        employee.birth_date = employee.birth_date.or(fields.birth_date);
        employee.gender = employee.gender.or(fields.gender);
        fill_rate(&mut employee.hourly_rate, fields.hourly_rate);
        fill_rate(&mut employee.billing_rate, fields.billing_rate);

        mismatch
    }

    pub fn len(&self) -> usize {
        self.employees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }

    pub fn into_employees(self) -> Vec<Employee> {
        self.employees
    }
}

fn employee_from(fields: &RowFields) -> Employee {
    Employee {
        employee_id: fields.employee_id.clone(),
        name: fields.name.clone().unwrap_or_default(),
        dispatch_company: fields.dispatch_company.clone().unwrap_or_default(),
        department: fields.department.clone().unwrap_or_default(),
        hire_date: fields.hire_date,
        birth_date: fields.birth_date,
        gender: fields.gender,
        hourly_rate: fields.hourly_rate.unwrap_or(Decimal::ZERO),
        billing_rate: fields.billing_rate.unwrap_or(Decimal::ZERO),
        status: EmployeeStatus::Active,
    }
}

fn fill_text(target: &mut String, value: &Option<String>) {
    if target.is_empty() {
        if let Some(value) = value {
            *target = value.clone();
        }
    }
}

fn fill_rate(target: &mut Decimal, value: Option<Decimal>) {
    if target.is_zero() {
        if let Some(value) = value {
            *target = value;
        }
    }
}
