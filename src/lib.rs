#![forbid(unsafe_code)]
//! Escala — moteur de planification mensuelle des équipes (sans UI).
//!
//! - Grille mensuelle par catégorie/unité, un code de service par jour.
//! - Propagation automatique des plantões 24h (tous les 3 jours) et 12h (tous les 2 jours).
//! - Substitutions en calque, sans modifier la grille.
//! - Postes vacants (placeholders) pour la planification.
//! - Rapport mensuel avec porte d'approbation avant export.
//! - Écritures en lots atomiques (tout ou rien).

pub mod error;
pub mod io;
pub mod model;
pub mod report;
pub mod roster;
pub mod scheduler;
pub mod storage;

pub use error::{EscalaError, ValidationError};
pub use model::{
    Employee, EmployeeId, MonthAssignment, MonthScope, PlaceholderId, PlaceholderPosition,
    ScheduleKey, ShiftCode, ShiftCounts, Subject, SubjectId, Substitution, SubstitutionRecord,
};
pub use report::{
    generate, ApprovalGate, CsvReport, FloaterSummary, JsonReport, MonthlyReport, ReportLine,
    ReportRenderer, ReportState, RowKind, SignOff, TextReport,
};
pub use roster::{build_roster, JobTitlePriority, RosterView};
pub use scheduler::{
    apply_shift, CellWrite, Confirmation, EngineOptions, ScheduleEngine, SubstitutionRequest,
};
pub use storage::{Availability, JsonStore, MemoryStore, ScheduleBook, ScheduleStore, WriteBatch};
