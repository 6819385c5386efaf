use crate::error::ValidationError;
use crate::model::{
    EmployeeId, MonthScope, ScheduleKey, SubjectId, Substitution, SubstitutionRecord,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Demande de substitution pour une journée.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionRequest {
    pub substitute_name: String,
    pub reason: String,
    pub substitute_id: Option<EmployeeId>,
}

impl SubstitutionRequest {
    pub fn new<N: Into<String>, R: Into<String>>(substitute_name: N, reason: R) -> Self {
        Self {
            substitute_name: substitute_name.into(),
            reason: reason.into(),
            substitute_id: None,
        }
    }

    pub fn with_substitute_id(mut self, id: EmployeeId) -> Self {
        self.substitute_id = Some(id);
        self
    }

    /// Valide les champs et horodate la substitution.
    pub(crate) fn into_substitution(self, now: DateTime<Utc>) -> Result<Substitution, ValidationError> {
        let substitute_name = self.substitute_name.trim().to_string();
        let reason = self.reason.trim().to_string();
        if substitute_name.is_empty() {
            return Err(ValidationError::BlankField("substitute_name"));
        }
        if reason.is_empty() {
            return Err(ValidationError::BlankField("reason"));
        }
        Ok(Substitution {
            substitute_id: self.substitute_id,
            substitute_name,
            reason,
            created_at: now,
        })
    }
}

/// Substitutions gardées le temps de la session d'édition (postes vacants).
#[derive(Debug, Clone, Default)]
pub struct SessionOverlay {
    entries: BTreeMap<(ScheduleKey, u8), Substitution>,
}

impl SessionOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insère ou remplace ; renvoie l'entrée précédente.
    pub fn put(&mut self, key: ScheduleKey, day: u8, substitution: Substitution) -> Option<Substitution> {
        self.entries.insert((key, day), substitution)
    }

    pub fn remove(&mut self, key: &ScheduleKey, day: u8) -> Option<Substitution> {
        self.entries.remove(&(key.clone(), day))
    }

    pub fn get(&self, key: &ScheduleKey, day: u8) -> Option<&Substitution> {
        self.entries.get(&(key.clone(), day))
    }

    pub fn clear_scope(&mut self, scope: &MonthScope) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(key, _), _| &key.scope != scope);
        before - self.entries.len()
    }

    pub fn purge_subject(&mut self, subject: &SubjectId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(key, _), _| &key.subject != subject);
        before - self.entries.len()
    }

    pub fn records_in(&self, scope: &MonthScope) -> Vec<SubstitutionRecord> {
        self.entries
            .iter()
            .filter(|((key, _), _)| &key.scope == scope)
            .map(|((key, day), substitution)| SubstitutionRecord {
                key: key.clone(),
                day: *day,
                substitution: substitution.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
