use crate::error::{EscalaError, ValidationError};
use crate::model::{
    MonthAssignment, MonthScope, PlaceholderPosition, ScheduleKey, ShiftCode, SubjectId,
    Substitution, SubstitutionRecord,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Version du format de `ScheduleBook` sur disque.
pub const SCHEMA_VERSION: u32 = 1;

/// Opération élémentaire d'un lot d'écriture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    SetCell {
        key: ScheduleKey,
        day: u8,
        code: Option<ShiftCode>,
    },
    PutSubstitution(SubstitutionRecord),
    DeleteSubstitution {
        key: ScheduleKey,
        day: u8,
    },
    /// Vide les grilles ET les substitutions d'un périmètre.
    ClearScope(MonthScope),
    /// Supprime toutes les données d'un sujet (et le poste s'il s'agit d'un placeholder).
    PurgeSubject(SubjectId),
    UpsertPlaceholder(PlaceholderPosition),
}

impl BatchOp {
    fn name(&self) -> &'static str {
        match self {
            BatchOp::SetCell { .. } => "set_cell",
            BatchOp::PutSubstitution(_) => "put_substitution",
            BatchOp::DeleteSubstitution { .. } => "delete_substitution",
            BatchOp::ClearScope(_) => "clear_scope",
            BatchOp::PurgeSubject(_) => "purge_subject",
            BatchOp::UpsertPlaceholder(_) => "upsert_placeholder",
        }
    }
}

/// Lot d'opérations appliqué en tout-ou-rien par `ScheduleStore::commit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&mut self, op: BatchOp) -> &mut Self {
        self.ops.push(op);
        self
    }
    pub fn len(&self) -> usize {
        self.ops.len()
    }
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }
}

impl FromIterator<BatchOp> for WriteBatch {
    fn from_iter<I: IntoIterator<Item = BatchOp>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

/// Bilan d'un commit réussi.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub ops: usize,
    pub removed_assignments: usize,
    pub removed_substitutions: usize,
}

/// État du support de stockage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Ready,
    Unavailable(String),
}

/// Tables de l'escala : grilles, substitutions, postes vacants persistés.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BookFile", into = "BookFile")]
pub struct ScheduleBook {
    assignments: BTreeMap<ScheduleKey, MonthAssignment>,
    substitutions: BTreeMap<(ScheduleKey, u8), Substitution>,
    placeholders: Vec<PlaceholderPosition>,
}

#[derive(Serialize, Deserialize)]
struct AssignmentRow {
    key: ScheduleKey,
    days: MonthAssignment,
}

#[derive(Serialize, Deserialize)]
struct BookFile {
    schema_version: u32,
    #[serde(default)]
    assignments: Vec<AssignmentRow>,
    #[serde(default)]
    substitutions: Vec<SubstitutionRecord>,
    #[serde(default)]
    placeholders: Vec<PlaceholderPosition>,
}

impl TryFrom<BookFile> for ScheduleBook {
    type Error = ValidationError;

    /// Un livre relu du disque passe par les mêmes contrôles qu'un lot.
    fn try_from(file: BookFile) -> Result<Self, Self::Error> {
        let mut assignments = BTreeMap::new();
        for row in file.assignments {
            row.key.scope.validate()?;
            let month_length = row.key.scope.days_in_month();
            if let Some((day, _)) = row.days.filled().find(|(day, _)| *day > month_length) {
                return Err(ValidationError::DayOutOfRange { day, month_length });
            }
            assignments.insert(row.key, row.days);
        }
        let mut substitutions = BTreeMap::new();
        for rec in file.substitutions {
            rec.key.scope.validate()?;
            check_day(&rec.key.scope, rec.day)?;
            substitutions.insert((rec.key, rec.day), rec.substitution);
        }
        Ok(Self {
            assignments,
            substitutions,
            placeholders: file.placeholders,
        })
    }
}

impl From<ScheduleBook> for BookFile {
    fn from(book: ScheduleBook) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            assignments: book
                .assignments
                .into_iter()
                .map(|(key, days)| AssignmentRow { key, days })
                .collect(),
            substitutions: book
                .substitutions
                .into_iter()
                .map(|((key, day), substitution)| SubstitutionRecord {
                    key,
                    day,
                    substitution,
                })
                .collect(),
            placeholders: book.placeholders,
        }
    }
}

impl ScheduleBook {
    pub fn assignment(&self, key: &ScheduleKey) -> Option<&MonthAssignment> {
        self.assignments.get(key)
    }

    pub fn cell(&self, key: &ScheduleKey, day: u8) -> Option<ShiftCode> {
        self.assignment(key).and_then(|a| a.get(day))
    }

    /// Grilles d'un périmètre, par sujet.
    pub fn assignments_in<'a>(
        &'a self,
        scope: &'a MonthScope,
    ) -> impl Iterator<Item = (&'a SubjectId, &'a MonthAssignment)> + 'a {
        self.assignments
            .iter()
            .filter(move |(key, _)| &key.scope == scope)
            .map(|(key, days)| (&key.subject, days))
    }

    pub fn substitution(&self, key: &ScheduleKey, day: u8) -> Option<&Substitution> {
        self.substitutions.get(&(key.clone(), day))
    }

    pub fn substitutions_in(&self, scope: &MonthScope) -> Vec<SubstitutionRecord> {
        self.substitutions
            .iter()
            .filter(|((key, _), _)| &key.scope == scope)
            .map(|((key, day), substitution)| SubstitutionRecord {
                key: key.clone(),
                day: *day,
                substitution: substitution.clone(),
            })
            .collect()
    }

    pub fn placeholders(&self) -> &[PlaceholderPosition] {
        &self.placeholders
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn substitution_count(&self) -> usize {
        self.substitutions.len()
    }

    /// Applique un lot sur une copie ; l'original n'est remplacé qu'en cas de succès.
    pub fn apply(&mut self, batch: &WriteBatch) -> Result<CommitReport, EscalaError> {
        let mut next = self.clone();
        let mut report = CommitReport {
            ops: batch.len(),
            ..CommitReport::default()
        };
        for (index, op) in batch.ops().iter().enumerate() {
            next.apply_op(op, &mut report).map_err(|source| {
                warn!(index, op = op.name(), error = %source, "batch rejected");
                EscalaError::BatchRejected { index, source }
            })?;
        }
        *self = next;
        Ok(report)
    }

    fn apply_op(&mut self, op: &BatchOp, report: &mut CommitReport) -> Result<(), ValidationError> {
        match op {
            BatchOp::SetCell { key, day, code } => {
                check_day(&key.scope, *day)?;
                match code {
                    Some(_) => {
                        self.assignments.entry(key.clone()).or_default().set(*day, *code)?;
                    }
                    None => {
                        if let Some(assignment) = self.assignments.get_mut(key) {
                            assignment.set(*day, None)?;
                        }
                        // une journée vidée ne peut plus porter de substitution
                        if self.substitutions.remove(&(key.clone(), *day)).is_some() {
                            report.removed_substitutions += 1;
                        }
                    }
                }
            }
            BatchOp::PutSubstitution(rec) => {
                check_day(&rec.key.scope, rec.day)?;
                if self.cell(&rec.key, rec.day).is_none() {
                    return Err(ValidationError::EmptyDay { day: rec.day });
                }
                self.substitutions
                    .insert((rec.key.clone(), rec.day), rec.substitution.clone());
            }
            BatchOp::DeleteSubstitution { key, day } => {
                if self.substitutions.remove(&(key.clone(), *day)).is_some() {
                    report.removed_substitutions += 1;
                }
            }
            BatchOp::ClearScope(scope) => {
                let before = (self.assignments.len(), self.substitutions.len());
                self.assignments.retain(|key, _| &key.scope != scope);
                self.substitutions.retain(|(key, _), _| &key.scope != scope);
                report.removed_assignments += before.0 - self.assignments.len();
                report.removed_substitutions += before.1 - self.substitutions.len();
            }
            BatchOp::PurgeSubject(subject) => {
                let before = (self.assignments.len(), self.substitutions.len());
                self.assignments.retain(|key, _| &key.subject != subject);
                self.substitutions.retain(|(key, _), _| &key.subject != subject);
                report.removed_assignments += before.0 - self.assignments.len();
                report.removed_substitutions += before.1 - self.substitutions.len();
                if let SubjectId::Placeholder(id) = subject {
                    self.placeholders.retain(|p| &p.id != id);
                }
            }
            BatchOp::UpsertPlaceholder(position) => {
                match self.placeholders.iter_mut().find(|p| p.id == position.id) {
                    Some(existing) => *existing = position.clone(),
                    None => self.placeholders.push(position.clone()),
                }
            }
        }
        Ok(())
    }
}

fn check_day(scope: &MonthScope, day: u8) -> Result<(), ValidationError> {
    let month_length = scope.days_in_month();
    if day == 0 || day > month_length {
        return Err(ValidationError::DayOutOfRange { day, month_length });
    }
    Ok(())
}

pub trait ScheduleStore {
    /// Indique si les tables existent et sont exploitables.
    fn availability(&self) -> Availability;
    /// Instantané cohérent des tables.
    fn snapshot(&self) -> Result<ScheduleBook, EscalaError>;
    /// Applique un lot de manière atomique (tout ou rien).
    fn commit(&mut self, batch: &WriteBatch) -> Result<CommitReport, EscalaError>;
}

/// Stockage en mémoire (tests, intégration embarquée).
#[derive(Debug, Clone)]
pub struct MemoryStore {
    book: ScheduleBook,
    availability: Availability,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            book: ScheduleBook::default(),
            availability: Availability::Ready,
        }
    }

    /// Simule des tables absentes.
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        Self {
            book: ScheduleBook::default(),
            availability: Availability::Unavailable(reason.into()),
        }
    }

    pub fn book(&self) -> &ScheduleBook {
        &self.book
    }

    fn ensure_ready(&self) -> Result<(), EscalaError> {
        match &self.availability {
            Availability::Ready => Ok(()),
            Availability::Unavailable(reason) => Err(EscalaError::Unavailable(reason.clone())),
        }
    }
}

impl ScheduleStore for MemoryStore {
    fn availability(&self) -> Availability {
        self.availability.clone()
    }

    fn snapshot(&self) -> Result<ScheduleBook, EscalaError> {
        self.ensure_ready()?;
        Ok(self.book.clone())
    }

    fn commit(&mut self, batch: &WriteBatch) -> Result<CommitReport, EscalaError> {
        self.ensure_ready()?;
        let report = self.book.apply(batch)?;
        debug!(ops = report.ops, "memory batch committed");
        Ok(report)
    }
}

/// Stockage fichier JSON ; chaque commit réécrit le livre de manière atomique.
pub struct JsonStore {
    path: PathBuf,
    availability: Availability,
}

#[derive(Deserialize)]
struct BookHeader {
    schema_version: u32,
}

impl JsonStore {
    /// Ouvre un livre existant. Un fichier absent ou d'une autre version
    /// donne un store `Unavailable` plutôt qu'une erreur.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let availability = probe(&path)?;
        if let Availability::Unavailable(reason) = &availability {
            warn!(path = %path.display(), %reason, "schedule book unavailable");
        }
        Ok(Self { path, availability })
    }

    /// Crée un livre vide s'il n'existe pas encore, puis l'ouvre.
    pub fn init<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            write_atomic(path, &ScheduleBook::default())?;
        }
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_ready(&self) -> Result<(), EscalaError> {
        match &self.availability {
            Availability::Ready => Ok(()),
            Availability::Unavailable(reason) => Err(EscalaError::Unavailable(reason.clone())),
        }
    }

    fn load(&self) -> anyhow::Result<ScheduleBook> {
        let data = fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        let book: ScheduleBook = serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(book)
    }
}

fn probe(path: &Path) -> anyhow::Result<Availability> {
    if !path.exists() {
        return Ok(Availability::Unavailable(format!(
            "{} does not exist (run `init` first)",
            path.display()
        )));
    }
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let header: BookHeader = match serde_json::from_slice(&data) {
        Ok(h) => h,
        Err(err) => {
            return Ok(Availability::Unavailable(format!(
                "{} is not a schedule book: {err}",
                path.display()
            )))
        }
    };
    if header.schema_version != SCHEMA_VERSION {
        return Ok(Availability::Unavailable(format!(
            "schema version {} not supported (expected {SCHEMA_VERSION})",
            header.schema_version
        )));
    }
    if let Err(err) = serde_json::from_slice::<ScheduleBook>(&data) {
        return Ok(Availability::Unavailable(format!(
            "{} failed validation: {err}",
            path.display()
        )));
    }
    Ok(Availability::Ready)
}

fn write_atomic(path: &Path, book: &ScheduleBook) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(book)?;
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(parent).with_context(|| "creating temp file")?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).with_context(|| "atomic rename")?;
    Ok(())
}

impl ScheduleStore for JsonStore {
    fn availability(&self) -> Availability {
        self.availability.clone()
    }

    fn snapshot(&self) -> Result<ScheduleBook, EscalaError> {
        self.ensure_ready()?;
        self.load()
            .map_err(|err| EscalaError::persistence("load schedule book", err))
    }

    fn commit(&mut self, batch: &WriteBatch) -> Result<CommitReport, EscalaError> {
        self.ensure_ready()?;
        let mut book = self
            .load()
            .map_err(|err| EscalaError::persistence("load schedule book", err))?;
        let report = book.apply(batch)?;
        write_atomic(&self.path, &book)
            .map_err(|err| EscalaError::persistence("write schedule book", err))?;
        debug!(path = %self.path.display(), ops = report.ops, "batch committed");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EmployeeId;

    fn key(id: &str) -> ScheduleKey {
        MonthScope::new("Enfermagem", "Botafogo", 2, 2025)
            .unwrap()
            .key(EmployeeId::new(id).into())
    }

    #[test]
    fn failed_batch_leaves_book_untouched() {
        let mut book = ScheduleBook::default();
        let batch: WriteBatch = [
            BatchOp::SetCell { key: key("a"), day: 1, code: Some(ShiftCode::Duty24h) },
            // février 2025 : 28 jours
            BatchOp::SetCell { key: key("a"), day: 29, code: Some(ShiftCode::Duty24h) },
        ]
        .into_iter()
        .collect();

        let err = book.apply(&batch).unwrap_err();
        assert!(matches!(err, EscalaError::BatchRejected { index: 1, .. }));
        assert_eq!(book, ScheduleBook::default());
    }

    #[test]
    fn emptying_a_cell_drops_its_substitution() {
        let mut book = ScheduleBook::default();
        let sub = Substitution {
            substitute_id: None,
            substitute_name: "Folguista".into(),
            reason: "atestado".into(),
            created_at: chrono::Utc::now(),
        };
        let batch: WriteBatch = [
            BatchOp::SetCell { key: key("a"), day: 3, code: Some(ShiftCode::ServiceDay) },
            BatchOp::PutSubstitution(SubstitutionRecord { key: key("a"), day: 3, substitution: sub }),
        ]
        .into_iter()
        .collect();
        book.apply(&batch).unwrap();
        assert_eq!(book.substitution_count(), 1);

        let mut clear = WriteBatch::new();
        clear.push(BatchOp::SetCell { key: key("a"), day: 3, code: None });
        let report = book.apply(&clear).unwrap();
        assert_eq!(report.removed_substitutions, 1);
        assert_eq!(book.substitution_count(), 0);
    }
}
