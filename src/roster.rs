use crate::error::ValidationError;
use crate::model::{Employee, EmployeeId, PlaceholderId, PlaceholderPosition, Subject};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

/// Ordre fixe des fonctions dans la grille. Chaque rang accepte plusieurs
/// variantes séparées par `/` (ex. `Enfermeiro/Enfermeira`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTitlePriority {
    ranks: Vec<Vec<String>>,
}

impl Default for JobTitlePriority {
    fn default() -> Self {
        Self::from_titles(&[
            "Enfermeiro/Enfermeira",
            "Técnico de Enfermagem/Técnica de Enfermagem",
            "Cuidador/Cuidadora",
            "Médico/Médica",
            "Nutricionista",
            "Fisioterapeuta",
            "Psicólogo/Psicóloga",
            "Assistente Social",
            "Terapeuta Ocupacional",
            "Fonoaudiólogo/Fonoaudióloga",
        ])
    }
}

impl JobTitlePriority {
    pub fn from_titles<S: AsRef<str>>(titles: &[S]) -> Self {
        let ranks = titles
            .iter()
            .map(|t| t.as_ref().split('/').map(normalize).filter(|v| !v.is_empty()).collect())
            .collect();
        Self { ranks }
    }

    /// Rang d'une fonction ; les fonctions inconnues passent après les connues.
    pub fn rank(&self, job_title: &str) -> usize {
        let title = normalize(job_title);
        self.ranks
            .iter()
            .position(|variants| variants.iter().any(|v| *v == title))
            .unwrap_or(self.ranks.len())
    }

    fn compare(&self, a: &Subject, b: &Subject) -> Ordering {
        self.rank(a.job_title())
            .cmp(&self.rank(b.job_title()))
            .then_with(|| normalize(a.display_name()).cmp(&normalize(b.display_name())))
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Sélection d'employés et postes vacants de la session d'édition.
///
/// La sélection est un simple filtre d'affichage : désélectionner un employé
/// le masque de la grille et du rapport sans toucher à ses données.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterView {
    selected: BTreeSet<EmployeeId>,
    placeholders: Vec<PlaceholderPosition>,
}

impl RosterView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sélectionne tous les employés actifs d'une unité.
    pub fn for_unit(employees: &[Employee], unit: &str) -> Self {
        let mut view = Self::new();
        for e in employees.iter().filter(|e| e.active && e.unit == unit) {
            view.select(e.id.clone());
        }
        view
    }

    pub fn select(&mut self, id: EmployeeId) -> bool {
        self.selected.insert(id)
    }

    pub fn deselect(&mut self, id: &EmployeeId) -> bool {
        self.selected.remove(id)
    }

    pub fn is_selected(&self, id: &EmployeeId) -> bool {
        self.selected.contains(id)
    }

    pub fn selected(&self) -> impl Iterator<Item = &EmployeeId> {
        self.selected.iter()
    }

    pub fn placeholders(&self) -> &[PlaceholderPosition] {
        &self.placeholders
    }

    pub fn placeholder(&self, id: PlaceholderId) -> Option<&PlaceholderPosition> {
        self.placeholders.iter().find(|p| p.id == id)
    }

    /// Réintègre des postes déjà connus (ex. relus depuis le stockage).
    pub fn restore_placeholders<I: IntoIterator<Item = PlaceholderPosition>>(&mut self, positions: I) {
        for position in positions {
            if self.placeholder(position.id).is_none() {
                self.placeholders.push(position);
            }
        }
    }

    /// Crée `quantity` postes vacants distincts pour une fonction.
    pub fn add_placeholders(
        &mut self,
        job_title: &str,
        quantity: u32,
        unit: &str,
    ) -> Result<Vec<PlaceholderId>, ValidationError> {
        if quantity < 1 {
            return Err(ValidationError::InvalidQuantity(quantity));
        }
        let job_title = job_title.trim();
        if job_title.is_empty() {
            return Err(ValidationError::BlankField("job_title"));
        }

        let mut seq = self
            .placeholders
            .iter()
            .filter(|p| normalize(&p.job_title) == normalize(job_title))
            .count() as u32;
        let mut created = Vec::with_capacity(quantity as usize);
        for _ in 0..quantity {
            let label = loop {
                seq += 1;
                let candidate = format!("{job_title} (vaga {seq})");
                if !self.placeholders.iter().any(|p| p.label == candidate) {
                    break candidate;
                }
            };
            let position = PlaceholderPosition {
                id: PlaceholderId::random(),
                label,
                job_title: job_title.to_string(),
                unit: unit.trim().to_string(),
            };
            created.push(position.id);
            self.placeholders.push(position);
        }
        debug!(job_title, quantity, "placeholders added");
        Ok(created)
    }

    /// Retire un poste vacant de la vue ; sans effet s'il n'existe pas.
    pub fn remove_placeholder(&mut self, id: PlaceholderId) -> Option<PlaceholderPosition> {
        let pos = self.placeholders.iter().position(|p| p.id == id)?;
        Some(self.placeholders.remove(pos))
    }
}

/// Construit la liste ordonnée des lignes de la grille.
///
/// Employés actifs et sélectionnés d'abord (rang de fonction puis nom),
/// ensuite tous les postes vacants, quel que soit leur intitulé.
pub fn build_roster(
    employees: &[Employee],
    view: &RosterView,
    priority: &JobTitlePriority,
) -> Vec<Subject> {
    let mut staff: Vec<Subject> = employees
        .iter()
        .filter(|e| e.active && view.is_selected(&e.id))
        .cloned()
        .map(Subject::Employee)
        .collect();
    staff.sort_by(|a, b| priority.compare(a, b));

    let mut slots: Vec<Subject> = view
        .placeholders
        .iter()
        .cloned()
        .map(Subject::Placeholder)
        .collect();
    slots.sort_by(|a, b| priority.compare(a, b));

    staff.extend(slots);
    staff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gendered_variants_share_a_rank() {
        let priority = JobTitlePriority::default();
        assert_eq!(priority.rank("Enfermeira"), priority.rank("enfermeiro"));
        assert!(priority.rank("Cuidadora") < priority.rank("Médico"));
        assert_eq!(priority.rank("Motorista"), 10);
    }

    #[test]
    fn labels_stay_distinct_after_removal() {
        let mut view = RosterView::new();
        let ids = view.add_placeholders("Cuidador", 2, "Botafogo").unwrap();
        view.remove_placeholder(ids[0]);
        view.add_placeholders("Cuidador", 1, "Botafogo").unwrap();
        let labels: BTreeSet<_> = view.placeholders().iter().map(|p| p.label.clone()).collect();
        assert_eq!(labels.len(), 2);
    }
}
