//! Canonical payroll types produced by the engine.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Canonical field a spreadsheet column can carry, independent of its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    EmployeeId,
    Name,
    DispatchCompany,
    Department,
    HireDate,
    BirthDate,
    Gender,
    HourlyRate,
    BillingRate,
    WorkHours,
    BillingAmount,
    Period,
}

impl FieldRole {
    /// Every role in declaration order
    pub const ALL: [FieldRole; 12] = [
        FieldRole::EmployeeId,
        FieldRole::Name,
        FieldRole::DispatchCompany,
        FieldRole::Department,
        FieldRole::HireDate,
        FieldRole::BirthDate,
        FieldRole::Gender,
        FieldRole::HourlyRate,
        FieldRole::BillingRate,
        FieldRole::WorkHours,
        FieldRole::BillingAmount,
        FieldRole::Period,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldRole::EmployeeId => "employee_id",
            FieldRole::Name => "name",
            FieldRole::DispatchCompany => "dispatch_company",
            FieldRole::Department => "department",
            FieldRole::HireDate => "hire_date",
            FieldRole::BirthDate => "birth_date",
            FieldRole::Gender => "gender",
            FieldRole::HourlyRate => "hourly_rate",
            FieldRole::BillingRate => "billing_rate",
            FieldRole::WorkHours => "work_hours",
            FieldRole::BillingAmount => "billing_amount",
            FieldRole::Period => "period",
        }
    }

    /// Roles coerced as non-negative decimals
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldRole::HourlyRate
                | FieldRole::BillingRate
                | FieldRole::WorkHours
                | FieldRole::BillingAmount
        )
    }

    /// Roles that can identify an employee in a header
    pub fn is_identity(&self) -> bool {
        matches!(self, FieldRole::EmployeeId | FieldRole::Name)
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldRole::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown field role '{}'", s))
    }
}

/// How a label matched its role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Synonym,
    Partial,
    /// Declared by a fixed template
    Template,
}

/// Association of a sheet column to a role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// 1-based column
    pub column: u32,
    pub role: FieldRole,
    /// Match confidence in [0, 1]
    pub confidence: f64,
    pub kind: MatchKind,
    /// Label text as found in the sheet (merged across header rows)
    pub label: String,
}

/// A normalized year-month token, rendered `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) && (1900..=9999).contains(&year) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn from_date(date: NaiveDate) -> Option<Self> {
        use chrono::Datelike;
        Self::new(date.year(), date.month())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
}

/// Employee facts collected from payroll rows.
///
/// Rates are zero when no row of the run carried them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Employee {
    pub employee_id: String,
    pub name: String,
    pub dispatch_company: String,
    pub department: String,
    pub hire_date: Option<NaiveDate>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub hourly_rate: Decimal,
    pub billing_rate: Decimal,
    pub status: EmployeeStatus,
}

/// Where the billing amount of a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountSource {
    /// Read from the sheet
    Provided,
    /// Computed as work hours x billing rate
    Derived,
    /// Neither present nor derivable; amount is zero
    Absent,
}

/// Source reference of an extracted record; never part of equality
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    pub sheet: String,
    /// 0-based sheet position in the workbook
    pub sheet_index: usize,
    /// 1-based row number
    pub row: u32,
    pub amount_source: AmountSource,
    /// Provided amount disagrees with hours x rate beyond tolerance
    pub inconsistent: bool,
}

/// One payroll line for one employee and period
#[derive(Debug, Clone, Serialize)]
pub struct PayrollRecord {
    pub employee_id: String,
    pub period: Period,
    pub work_hours: Decimal,
    pub billing_amount: Decimal,
    pub provenance: Provenance,
}

impl PartialEq for PayrollRecord {
    fn eq(&self, other: &Self) -> bool {
        self.employee_id == other.employee_id
            && self.period == other.period
            && self.work_hours == other.work_hours
            && self.billing_amount == other.billing_amount
    }
}

impl PayrollRecord {
    pub fn is_derived(&self) -> bool {
        self.provenance.amount_source == AmountSource::Derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn record(sheet: &str, row: u32) -> PayrollRecord {
        PayrollRecord {
            employee_id: "E001".to_string(),
            period: Period::new(2024, 3).unwrap(),
            work_hours: dec("160"),
            billing_amount: dec("272000"),
            provenance: Provenance {
                sheet: sheet.to_string(),
                sheet_index: 0,
                row,
                amount_source: AmountSource::Provided,
                inconsistent: false,
            },
        }
    }

    #[test]
    fn test_role_round_trip_names() {
        for role in FieldRole::ALL {
            assert_eq!(role.as_str().parse::<FieldRole>().unwrap(), role);
        }
        assert!("salary".parse::<FieldRole>().is_err());
    }

    #[test]
    fn test_role_classes() {
        assert!(FieldRole::WorkHours.is_numeric());
        assert!(!FieldRole::Name.is_numeric());
        assert!(FieldRole::Name.is_identity());
        assert!(FieldRole::EmployeeId.is_identity());
        assert!(!FieldRole::Period.is_identity());
    }

    #[test]
    fn test_period_formatting_and_bounds() {
        let period = Period::new(2024, 3).unwrap();
        assert_eq!(period.to_string(), "2024-03");
        assert_eq!(serde_json::to_string(&period).unwrap(), "\"2024-03\"");
        assert!(Period::new(2024, 13).is_none());
        assert!(Period::new(2024, 0).is_none());
        assert!(Period::new(1850, 1).is_none());
    }

    #[test]
    fn test_provenance_is_not_identity() {
        assert_eq!(record("Sheet1", 4), record("Sheet2", 90));

        let mut other = record("Sheet1", 4);
        other.work_hours = dec("161");
        assert_ne!(record("Sheet1", 4), other);
    }
}
