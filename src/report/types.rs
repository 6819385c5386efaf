use crate::model::{MonthScope, ShiftCounts, SubjectId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// En-tête du rapport mensuel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportHeader {
    pub institution: String,
    pub scope: MonthScope,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Employee,
    Placeholder,
    /// Ligne synthétique d'un folguista (substitut).
    Floater,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectId>,
    pub kind: RowKind,
    pub name: String,
    pub job_title: String,
    pub shift_breakdown: ShiftCounts,
    pub total_shifts: u32,
    pub substituted_days: u32,
    pub actual_days_worked: u32,
}

/// Agrégat par nom de substitut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FloaterSummary {
    pub substitute_name: String,
    pub count: u32,
    pub subjects_covered: BTreeSet<String>,
    pub reasons: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub roster_size: usize,
    pub total_days_worked: u32,
    pub days_in_month: u8,
    pub total_substitutions: u32,
    pub distinct_floaters: usize,
}

/// Ligne de totaux (hors lignes folguistas).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportTotals {
    pub shift_breakdown: ShiftCounts,
    pub total_shifts: u32,
    pub substituted_days: u32,
    pub actual_days_worked: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyReport {
    pub header: ReportHeader,
    pub summary: ReportSummary,
    pub floaters: Vec<FloaterSummary>,
    pub lines: Vec<ReportLine>,
    pub totals: ReportTotals,
}

impl MonthlyReport {
    pub fn line(&self, name: &str) -> Option<&ReportLine> {
        self.lines.iter().find(|l| l.name == name)
    }

    pub fn line_for(&self, subject: &SubjectId) -> Option<&ReportLine> {
        self.lines.iter().find(|l| l.subject.as_ref() == Some(subject))
    }
}
