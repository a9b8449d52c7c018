//! The canonical record: the total, strongly-typed form of one questionnaire.
//!
//! Every year/quarter subtree exists even when the source had no data for
//! it. Zero values stand in for absent data and the metadata block lists
//! which critical values were left at zero.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::period::{Quarter, QuarterKey, YearQuarters};
use crate::types::ExtractionMethod;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub company_info: CompanyInfo,
    pub operational_triggers: OperationalTriggers,
    pub qualifying_questions: QualifyingQuestions,
    pub revenue_by_quarter: RevenueByQuarter,
    pub credit_wages_by_quarter: CreditWagesByQuarter,
    pub loan_forgiveness: LoanForgiveness,
    pub ownership: Vec<OwnershipEntry>,
    pub metadata: RecordMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub company_name: String,
    pub dba_name: String,
    pub tax_id: String,
    pub entity_type: String,
    pub industry: String,
    pub year_founded: u32,
    pub website: String,
    pub address: Address,
    pub contact: Contact,
    pub headcount: Headcount,
    pub remarks: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub email: String,
    pub phone: String,
}

impl Contact {
    pub fn full_name(&self) -> String {
        [self.first_name.trim(), self.last_name.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Full-time employee counts per fiscal year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Headcount {
    pub y2019: u32,
    pub y2020: u32,
    pub y2021: u32,
}

impl Headcount {
    pub fn get(&self, year: u16) -> Option<u32> {
        match year {
            2019 => Some(self.y2019),
            2020 => Some(self.y2020),
            2021 => Some(self.y2021),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, year: u16) -> Option<&mut u32> {
        match year {
            2019 => Some(&mut self.y2019),
            2020 => Some(&mut self.y2020),
            2021 => Some(&mut self.y2021),
            _ => None,
        }
    }
}

/// Company-level shutdown standards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShutdownStandard {
    FullShutdown,
    PartialShutdown,
    SupplyChain,
    VendorDisruption,
    CapacityLimits,
    ReducedHours,
}

impl ShutdownStandard {
    pub const ALL: [ShutdownStandard; 6] = [
        ShutdownStandard::FullShutdown,
        ShutdownStandard::PartialShutdown,
        ShutdownStandard::SupplyChain,
        ShutdownStandard::VendorDisruption,
        ShutdownStandard::CapacityLimits,
        ShutdownStandard::ReducedHours,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ShutdownStandard::FullShutdown => "standard_full_shutdown",
            ShutdownStandard::PartialShutdown => "standard_partial_shutdown",
            ShutdownStandard::SupplyChain => "standard_supply_chain",
            ShutdownStandard::VendorDisruption => "standard_vendor_disruption",
            ShutdownStandard::CapacityLimits => "standard_capacity_limits",
            ShutdownStandard::ReducedHours => "standard_reduced_hours",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ShutdownStandard::FullShutdown => "FS",
            ShutdownStandard::PartialShutdown => "PS",
            ShutdownStandard::SupplyChain => "SC",
            ShutdownStandard::VendorDisruption => "VD",
            ShutdownStandard::CapacityLimits => "CL",
            ShutdownStandard::ReducedHours => "RH",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ShutdownStandard::FullShutdown => "Full shutdown standard",
            ShutdownStandard::PartialShutdown => "Partial shutdown standard",
            ShutdownStandard::SupplyChain => "Supply chain standard",
            ShutdownStandard::VendorDisruption => "Vendor standard",
            ShutdownStandard::CapacityLimits => "Capacity limits standard",
            ShutdownStandard::ReducedHours => "Reduced hours standard",
        }
    }

    pub fn sentence(self) -> &'static str {
        match self {
            ShutdownStandard::FullShutdown => "Operations were fully suspended by a governmental order.",
            ShutdownStandard::PartialShutdown => {
                "More than a nominal portion of operations was suspended by a governmental order."
            }
            ShutdownStandard::SupplyChain => {
                "Critical goods could not be obtained from suppliers due to governmental orders."
            }
            ShutdownStandard::VendorDisruption => "Key vendors were unable to deliver due to governmental orders.",
            ShutdownStandard::CapacityLimits => "Occupancy or capacity limits were imposed by a governmental order.",
            ShutdownStandard::ReducedHours => "Business hours were reduced by a governmental order.",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationalTriggers {
    pub full_shutdown: bool,
    pub partial_shutdown: bool,
    pub supply_chain: bool,
    pub vendor_disruption: bool,
    pub capacity_limits: bool,
    pub reduced_hours: bool,
}

impl OperationalTriggers {
    pub fn get(&self, standard: ShutdownStandard) -> bool {
        match standard {
            ShutdownStandard::FullShutdown => self.full_shutdown,
            ShutdownStandard::PartialShutdown => self.partial_shutdown,
            ShutdownStandard::SupplyChain => self.supply_chain,
            ShutdownStandard::VendorDisruption => self.vendor_disruption,
            ShutdownStandard::CapacityLimits => self.capacity_limits,
            ShutdownStandard::ReducedHours => self.reduced_hours,
        }
    }

    pub fn set(&mut self, standard: ShutdownStandard, value: bool) {
        let slot = match standard {
            ShutdownStandard::FullShutdown => &mut self.full_shutdown,
            ShutdownStandard::PartialShutdown => &mut self.partial_shutdown,
            ShutdownStandard::SupplyChain => &mut self.supply_chain,
            ShutdownStandard::VendorDisruption => &mut self.vendor_disruption,
            ShutdownStandard::CapacityLimits => &mut self.capacity_limits,
            ShutdownStandard::ReducedHours => &mut self.reduced_hours,
        };
        *slot = value;
    }

    pub fn active(&self) -> impl Iterator<Item = ShutdownStandard> + '_ {
        ShutdownStandard::ALL.into_iter().filter(|s| self.get(*s))
    }
}

/// The eight per-quarter qualifying questions, in questionnaire row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Question {
    GovernmentShutdown,
    SupplyDisruption,
    VendorDisruption,
    CapacityRestriction,
    ReducedHours,
    RemoteWorkLimits,
    /// 2020 question set: gross receipts down 50% or more against 2019.
    RevenueReduction50,
    /// 2021 question set: gross receipts down 20% or more against 2019.
    RevenueReduction20,
}

impl Question {
    pub const ALL: [Question; 8] = [
        Question::GovernmentShutdown,
        Question::SupplyDisruption,
        Question::VendorDisruption,
        Question::CapacityRestriction,
        Question::ReducedHours,
        Question::RemoteWorkLimits,
        Question::RevenueReduction50,
        Question::RevenueReduction20,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Question::GovernmentShutdown => "government_shutdown",
            Question::SupplyDisruption => "supply_disruption",
            Question::VendorDisruption => "vendor_disruption",
            Question::CapacityRestriction => "capacity_restriction",
            Question::ReducedHours => "reduced_hours",
            Question::RemoteWorkLimits => "remote_work_limits",
            Question::RevenueReduction50 => "revenue_reduction_50",
            Question::RevenueReduction20 => "revenue_reduction_20",
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Question::GovernmentShutdown => "Was the business subject to a government order suspending operations?",
            Question::SupplyDisruption => "Did supply chain disruptions delay critical goods?",
            Question::VendorDisruption => "Were vendors unable to deliver due to government orders?",
            Question::CapacityRestriction => "Were capacity or occupancy limits imposed?",
            Question::ReducedHours => "Were business hours reduced by government order?",
            Question::RemoteWorkLimits => "Were employees unable to work remotely?",
            Question::RevenueReduction50 => "Did gross receipts decline by 50% or more vs. 2019?",
            Question::RevenueReduction20 => "Did gross receipts decline by 20% or more vs. 2019?",
        }
    }

    /// The revenue question that counts toward a claim in the given year.
    pub fn revenue_threshold_for(year: u16) -> Question {
        if year <= 2020 {
            Question::RevenueReduction50
        } else {
            Question::RevenueReduction20
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterTriggers {
    pub government_shutdown: bool,
    pub supply_disruption: bool,
    pub vendor_disruption: bool,
    pub capacity_restriction: bool,
    pub reduced_hours: bool,
    pub remote_work_limits: bool,
    pub revenue_reduction_50: bool,
    pub revenue_reduction_20: bool,
}

impl QuarterTriggers {
    pub fn get(&self, question: Question) -> bool {
        match question {
            Question::GovernmentShutdown => self.government_shutdown,
            Question::SupplyDisruption => self.supply_disruption,
            Question::VendorDisruption => self.vendor_disruption,
            Question::CapacityRestriction => self.capacity_restriction,
            Question::ReducedHours => self.reduced_hours,
            Question::RemoteWorkLimits => self.remote_work_limits,
            Question::RevenueReduction50 => self.revenue_reduction_50,
            Question::RevenueReduction20 => self.revenue_reduction_20,
        }
    }

    pub fn set(&mut self, question: Question, value: bool) {
        let slot = match question {
            Question::GovernmentShutdown => &mut self.government_shutdown,
            Question::SupplyDisruption => &mut self.supply_disruption,
            Question::VendorDisruption => &mut self.vendor_disruption,
            Question::CapacityRestriction => &mut self.capacity_restriction,
            Question::ReducedHours => &mut self.reduced_hours,
            Question::RemoteWorkLimits => &mut self.remote_work_limits,
            Question::RevenueReduction50 => &mut self.revenue_reduction_50,
            Question::RevenueReduction20 => &mut self.revenue_reduction_20,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualifyingQuestions {
    pub y2020: YearQuarters<QuarterTriggers>,
    pub y2021: YearQuarters<QuarterTriggers>,
}

impl QualifyingQuestions {
    pub fn get(&self, key: QuarterKey) -> Option<&QuarterTriggers> {
        match key.year {
            2020 => Some(self.y2020.get(key.quarter)),
            2021 => Some(self.y2021.get(key.quarter)),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: QuarterKey) -> Option<&mut QuarterTriggers> {
        match key.year {
            2020 => Some(self.y2020.get_mut(key.quarter)),
            2021 => Some(self.y2021.get_mut(key.quarter)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueByQuarter {
    pub y2019: YearQuarters<f64>,
    pub y2020: YearQuarters<f64>,
    pub y2021: YearQuarters<f64>,
}

impl RevenueByQuarter {
    pub fn get(&self, key: QuarterKey) -> Option<f64> {
        self.year(key.year).map(|y| *y.get(key.quarter))
    }

    pub fn get_mut(&mut self, key: QuarterKey) -> Option<&mut f64> {
        match key.year {
            2019 => Some(self.y2019.get_mut(key.quarter)),
            2020 => Some(self.y2020.get_mut(key.quarter)),
            2021 => Some(self.y2021.get_mut(key.quarter)),
            _ => None,
        }
    }

    pub fn year(&self, year: u16) -> Option<&YearQuarters<f64>> {
        match year {
            2019 => Some(&self.y2019),
            2020 => Some(&self.y2020),
            2021 => Some(&self.y2021),
            _ => None,
        }
    }
}

/// Columns of the payroll-credit breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CreditColumn {
    QualifiedWages,
    HealthPlanExpenses,
    CreditWages,
    EmployeeCount,
}

impl CreditColumn {
    pub const ALL: [CreditColumn; 4] = [
        CreditColumn::QualifiedWages,
        CreditColumn::HealthPlanExpenses,
        CreditColumn::CreditWages,
        CreditColumn::EmployeeCount,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CreditColumn::QualifiedWages => "qualified_wages",
            CreditColumn::HealthPlanExpenses => "health_plan_expenses",
            CreditColumn::CreditWages => "credit_wages",
            CreditColumn::EmployeeCount => "employee_count",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CreditColumn::QualifiedWages => "Qualified Wages",
            CreditColumn::HealthPlanExpenses => "Health Plan Expenses",
            CreditColumn::CreditWages => "Credit Wages",
            CreditColumn::EmployeeCount => "Employee Count",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterCredit {
    pub qualified_wages: f64,
    pub health_plan_expenses: f64,
    pub credit_wages: f64,
    pub employee_count: f64,
}

impl QuarterCredit {
    pub fn get(&self, column: CreditColumn) -> f64 {
        match column {
            CreditColumn::QualifiedWages => self.qualified_wages,
            CreditColumn::HealthPlanExpenses => self.health_plan_expenses,
            CreditColumn::CreditWages => self.credit_wages,
            CreditColumn::EmployeeCount => self.employee_count,
        }
    }

    pub fn set(&mut self, column: CreditColumn, value: f64) {
        let slot = match column {
            CreditColumn::QualifiedWages => &mut self.qualified_wages,
            CreditColumn::HealthPlanExpenses => &mut self.health_plan_expenses,
            CreditColumn::CreditWages => &mut self.credit_wages,
            CreditColumn::EmployeeCount => &mut self.employee_count,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreditWagesByQuarter {
    pub y2020: YearQuarters<QuarterCredit>,
    pub y2021: YearQuarters<QuarterCredit>,
}

impl CreditWagesByQuarter {
    pub fn get(&self, key: QuarterKey) -> Option<&QuarterCredit> {
        match key.year {
            2020 => Some(self.y2020.get(key.quarter)),
            2021 => Some(self.y2021.get(key.quarter)),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: QuarterKey) -> Option<&mut QuarterCredit> {
        match key.year {
            2020 => Some(self.y2020.get_mut(key.quarter)),
            2021 => Some(self.y2021.get_mut(key.quarter)),
            _ => None,
        }
    }

    /// Sum of one column across a year.
    pub fn year_total(&self, year: u16, column: CreditColumn) -> f64 {
        Quarter::ALL
            .into_iter()
            .filter_map(|q| self.get(QuarterKey::new(year, q)))
            .map(|c| c.get(column))
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanForgiveness {
    pub first_draw_forgiven: f64,
    pub second_draw_forgiven: f64,
}

impl LoanForgiveness {
    pub fn total(&self) -> f64 {
        self.first_draw_forgiven + self.second_draw_forgiven
    }
}

/// One owner. `percentage` is always on the 0–100 scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnershipEntry {
    pub name: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    #[default]
    Partial,
    Invalid,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationStatus::Valid => "valid",
            ValidationStatus::Partial => "partial",
            ValidationStatus::Invalid => "invalid",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub validation_status: ValidationStatus,
    pub missing_fields: Vec<String>,
    pub extraction_method: ExtractionMethod,
    pub warning_count: usize,
}
