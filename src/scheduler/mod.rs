mod mutate;
mod overlay;
mod rotation;
mod types;

pub use overlay::{SessionOverlay, SubstitutionRequest};
pub use rotation::apply_shift;
pub use types::{CellWrite, Confirmation, EngineOptions};

use crate::error::EscalaError;
use crate::model::{
    Employee, MonthScope, PlaceholderId, ScheduleKey, ShiftCode, Subject, SubjectId,
    SubstitutionRecord,
};
use crate::report::{self, MonthlyReport, ReportHeader};
use crate::roster::{build_roster, RosterView};
use crate::storage::{Availability, BatchOp, CommitReport, ScheduleStore, WriteBatch};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Moteur d'escala : relie la vue de session, la rotation, le stockage et
/// le calque de substitutions.
#[derive(Debug)]
pub struct ScheduleEngine<S> {
    store: S,
    session: SessionOverlay,
    options: EngineOptions,
}

impl<S: ScheduleStore> ScheduleEngine<S> {
    pub fn new(store: S, options: EngineOptions) -> Self {
        Self {
            store,
            session: SessionOverlay::new(),
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }
    pub fn session(&self) -> &SessionOverlay {
        &self.session
    }

    pub fn availability(&self) -> Availability {
        self.store.availability()
    }

    /// Écrit un code et propage les plantões 24h/12h, en un seul lot atomique.
    /// En cas de recouvrement de deux propagations, la dernière écriture gagne.
    pub fn apply_shift(
        &mut self,
        key: &ScheduleKey,
        day: u8,
        code: Option<ShiftCode>,
    ) -> Result<Vec<CellWrite>, EscalaError> {
        mutate::apply_shift(self, key, day, code)
    }

    /// Insère ou remplace la substitution d'une journée non vide.
    pub fn set_substitution(
        &mut self,
        key: &ScheduleKey,
        day: u8,
        request: SubstitutionRequest,
        now: DateTime<Utc>,
    ) -> Result<(), EscalaError> {
        mutate::set_substitution(self, key, day, request, now)
    }

    /// Retire une substitution ; renvoie `false` si rien n'existait.
    pub fn clear_substitution(
        &mut self,
        key: &ScheduleKey,
        day: u8,
        confirmation: Confirmation,
    ) -> Result<bool, EscalaError> {
        mutate::clear_substitution(self, key, day, confirmation)
    }

    /// Vide grilles et substitutions d'un périmètre (un seul lot).
    pub fn clear_month(
        &mut self,
        scope: &MonthScope,
        confirmation: Confirmation,
    ) -> Result<CommitReport, EscalaError> {
        mutate::clear_month(self, scope, confirmation)
    }

    /// Supprime un poste vacant et toutes ses données (idempotent).
    pub fn remove_placeholder(
        &mut self,
        view: &mut RosterView,
        id: PlaceholderId,
        confirmation: Confirmation,
    ) -> Result<bool, EscalaError> {
        mutate::remove_placeholder(self, view, id, confirmation)
    }

    /// Persiste explicitement les postes vacants de la vue.
    pub fn persist_placeholders(&mut self, view: &RosterView) -> Result<CommitReport, EscalaError> {
        let batch: WriteBatch = view
            .placeholders()
            .iter()
            .cloned()
            .map(BatchOp::UpsertPlaceholder)
            .collect();
        if batch.is_empty() {
            return Ok(CommitReport::default());
        }
        self.store.commit(&batch)
    }

    /// Recharge dans la vue les postes vacants persistés d'une unité ;
    /// renvoie leur nombre.
    pub fn load_placeholders(&self, view: &mut RosterView, unit: &str) -> Result<usize, EscalaError> {
        let book = self.store.snapshot()?;
        let positions: Vec<_> = book
            .placeholders()
            .iter()
            .filter(|p| p.unit == unit)
            .cloned()
            .collect();
        let count = positions.len();
        view.restore_placeholders(positions);
        Ok(count)
    }

    pub fn roster(&self, employees: &[Employee], view: &RosterView) -> Vec<Subject> {
        build_roster(employees, view, &self.options.job_title_priority)
    }

    /// Substitutions d'un périmètre : stockées + session.
    pub fn substitutions_in(&self, scope: &MonthScope) -> Result<Vec<SubstitutionRecord>, EscalaError> {
        let stored = self.store.snapshot()?.substitutions_in(scope);
        Ok(self.merge_session(stored, scope))
    }

    /// Rapport mensuel calculé à la demande depuis les données courantes.
    pub fn monthly_report(
        &self,
        employees: &[Employee],
        view: &RosterView,
        scope: &MonthScope,
        now: DateTime<Utc>,
    ) -> Result<MonthlyReport, EscalaError> {
        let book = self.store.snapshot()?;
        let roster = self.roster(employees, view);
        let assignments: BTreeMap<SubjectId, _> = book
            .assignments_in(scope)
            .map(|(subject, days)| (subject.clone(), days.clone()))
            .collect();
        let substitutions = self.merge_session(book.substitutions_in(scope), scope);

        let header = ReportHeader {
            institution: self.options.institution.clone(),
            scope: scope.clone(),
            generated_at: now,
        };
        Ok(report::generate(header, &roster, &assignments, &substitutions)?)
    }

    /// Une entrée de session masque l'entrée stockée du même (clé, jour).
    fn merge_session(&self, stored: Vec<SubstitutionRecord>, scope: &MonthScope) -> Vec<SubstitutionRecord> {
        let session = self.session.records_in(scope);
        let mut records: Vec<SubstitutionRecord> = stored
            .into_iter()
            .filter(|rec| self.session.get(&rec.key, rec.day).is_none())
            .collect();
        records.extend(session);
        records
    }

    fn is_session_scoped(&self, subject: &SubjectId) -> bool {
        subject.is_placeholder() && !self.options.persist_placeholder_substitutions
    }
}
