//! Rapport mensuel : agrégation des grilles et des substitutions, puis
//! export soumis à la porte d'approbation.

pub mod approval;
pub mod render;
mod types;

pub use approval::{ApprovalGate, ApprovalStamp, ReportState, SignOff};
pub use render::{CsvReport, JsonReport, ReportRenderer, TextReport};
pub use types::{
    FloaterSummary, MonthlyReport, ReportHeader, ReportLine, ReportSummary, ReportTotals, RowKind,
};

use crate::error::ValidationError;
use crate::model::{MonthAssignment, ShiftCode, Subject, SubjectId, SubstitutionRecord};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Agrège grilles et substitutions du périmètre de `header` pour les sujets
/// de `roster` (déjà ordonné).
///
/// Les substitutions d'un autre périmètre ou d'un sujet absent du roster
/// (employé désélectionné, poste supprimé) sont ignorées.
pub fn generate(
    header: ReportHeader,
    roster: &[Subject],
    assignments: &BTreeMap<SubjectId, MonthAssignment>,
    substitutions: &[SubstitutionRecord],
) -> Result<MonthlyReport, ValidationError> {
    if header.institution.trim().is_empty() {
        return Err(ValidationError::BlankField("institution"));
    }

    let names: BTreeMap<SubjectId, &str> = roster.iter().map(|s| (s.id(), s.display_name())).collect();
    let in_scope: Vec<&SubstitutionRecord> = substitutions
        .iter()
        .filter(|r| r.key.scope == header.scope && names.contains_key(&r.key.subject))
        .collect();

    let mut substituted: BTreeMap<&SubjectId, BTreeSet<u8>> = BTreeMap::new();
    for rec in &in_scope {
        substituted.entry(&rec.key.subject).or_default().insert(rec.day);
    }

    let empty = MonthAssignment::new();
    let mut staff = Vec::new();
    let mut slots = Vec::new();
    for subject in roster {
        let id = subject.id();
        let breakdown = assignments.get(&id).unwrap_or(&empty).counts();
        let total_shifts = breakdown.total();
        let substituted_days = substituted.get(&id).map_or(0, |days| days.len() as u32);
        let line = ReportLine {
            kind: match subject {
                Subject::Employee(_) => RowKind::Employee,
                Subject::Placeholder(_) => RowKind::Placeholder,
            },
            subject: Some(id),
            name: subject.display_name().to_string(),
            job_title: subject.job_title().to_string(),
            shift_breakdown: breakdown,
            total_shifts,
            substituted_days,
            actual_days_worked: actual_days_worked(
                total_shifts,
                breakdown.get(ShiftCode::RestDay),
                substituted_days,
            ),
        };
        match line.kind {
            RowKind::Placeholder => slots.push(line),
            _ => staff.push(line),
        }
    }
    // tri stable : à égalité, l'ordre du roster est conservé
    staff.sort_by(|a, b| b.actual_days_worked.cmp(&a.actual_days_worked));

    let mut totals = ReportTotals::default();
    for line in staff.iter().chain(slots.iter()) {
        totals.shift_breakdown.merge(&line.shift_breakdown);
        totals.total_shifts += line.total_shifts;
        totals.substituted_days += line.substituted_days;
        totals.actual_days_worked += line.actual_days_worked;
    }

    let floaters = summarize_floaters(&in_scope, &names);
    let summary = ReportSummary {
        roster_size: roster.len(),
        total_days_worked: totals.actual_days_worked,
        days_in_month: header.scope.days_in_month(),
        total_substitutions: in_scope.len() as u32,
        distinct_floaters: floaters.len(),
    };

    let mut lines = staff;
    lines.extend(slots);
    lines.extend(floaters.iter().map(|f| ReportLine {
        subject: None,
        kind: RowKind::Floater,
        name: f.substitute_name.clone(),
        job_title: String::new(),
        shift_breakdown: Default::default(),
        total_shifts: f.count,
        substituted_days: 0,
        actual_days_worked: f.count,
    }));

    debug!(scope = %header.scope, lines = lines.len(), floaters = floaters.len(), "monthly report generated");
    Ok(MonthlyReport {
        header,
        summary,
        floaters,
        lines,
        totals,
    })
}

/// `total − folgas − jours substitués`, borné à zéro.
pub fn actual_days_worked(total_shifts: u32, rest_days: u32, substituted_days: u32) -> u32 {
    total_shifts
        .saturating_sub(rest_days)
        .saturating_sub(substituted_days)
}

fn summarize_floaters(
    records: &[&SubstitutionRecord],
    names: &BTreeMap<SubjectId, &str>,
) -> Vec<FloaterSummary> {
    let mut by_name: BTreeMap<&str, FloaterSummary> = BTreeMap::new();
    for rec in records {
        let name = rec.substitution.substitute_name.trim();
        let entry = by_name.entry(name).or_insert_with(|| FloaterSummary {
            substitute_name: name.to_string(),
            count: 0,
            subjects_covered: BTreeSet::new(),
            reasons: BTreeSet::new(),
        });
        entry.count += 1;
        if let Some(subject) = names.get(&rec.key.subject) {
            entry.subjects_covered.insert((*subject).to_string());
        }
        entry.reasons.insert(rec.substitution.reason.trim().to_string());
    }

    let mut floaters: Vec<FloaterSummary> = by_name.into_values().collect();
    floaters.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.substitute_name.cmp(&b.substitute_name)));
    floaters
}
