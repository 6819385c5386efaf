use super::{rotation, CellWrite, Confirmation, ScheduleEngine, SubstitutionRequest};
use crate::error::{EscalaError, ValidationError};
use crate::model::{MonthScope, PlaceholderId, ScheduleKey, ShiftCode, SubjectId, SubstitutionRecord};
use crate::roster::RosterView;
use crate::storage::{BatchOp, CommitReport, ScheduleStore, WriteBatch};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

pub(super) fn apply_shift<S: ScheduleStore>(
    engine: &mut ScheduleEngine<S>,
    key: &ScheduleKey,
    day: u8,
    code: Option<ShiftCode>,
) -> Result<Vec<CellWrite>, EscalaError> {
    let writes = rotation::apply_shift(day, code, key.scope.days_in_month())?;

    let batch: WriteBatch = writes
        .iter()
        .map(|w| BatchOp::SetCell {
            key: key.clone(),
            day: w.day,
            code: w.code,
        })
        .collect();
    engine.store.commit(&batch)?;

    if code.is_none() {
        engine.session.remove(key, day);
    }
    debug!(subject = %key.subject, scope = %key.scope, day, cells = writes.len(), "shift applied");
    Ok(writes)
}

pub(super) fn set_substitution<S: ScheduleStore>(
    engine: &mut ScheduleEngine<S>,
    key: &ScheduleKey,
    day: u8,
    request: SubstitutionRequest,
    now: DateTime<Utc>,
) -> Result<(), EscalaError> {
    let month_length = key.scope.days_in_month();
    if day == 0 || day > month_length {
        return Err(ValidationError::DayOutOfRange { day, month_length }.into());
    }
    let book = engine.store.snapshot()?;
    if book.cell(key, day).is_none() {
        return Err(ValidationError::EmptyDay { day }.into());
    }
    let substitution = request.into_substitution(now)?;

    if engine.is_session_scoped(&key.subject) {
        // une substitution déjà persistée pour ce jour est remplacée, pas doublée
        if book.substitution(key, day).is_some() {
            let mut batch = WriteBatch::new();
            batch.push(BatchOp::DeleteSubstitution {
                key: key.clone(),
                day,
            });
            engine.store.commit(&batch)?;
        }
        engine.session.put(key.clone(), day, substitution);
        debug!(subject = %key.subject, day, "session substitution recorded");
        return Ok(());
    }

    let mut batch = WriteBatch::new();
    batch.push(BatchOp::PutSubstitution(SubstitutionRecord {
        key: key.clone(),
        day,
        substitution,
    }));
    engine.store.commit(&batch)?;
    debug!(subject = %key.subject, day, "substitution recorded");
    Ok(())
}

pub(super) fn clear_substitution<S: ScheduleStore>(
    engine: &mut ScheduleEngine<S>,
    key: &ScheduleKey,
    day: u8,
    confirmation: Confirmation,
) -> Result<bool, EscalaError> {
    confirmation.require("removing a substitution")?;

    let from_session = engine.session.remove(key, day).is_some();
    let mut batch = WriteBatch::new();
    batch.push(BatchOp::DeleteSubstitution {
        key: key.clone(),
        day,
    });
    let report = engine.store.commit(&batch)?;
    Ok(from_session || report.removed_substitutions > 0)
}

pub(super) fn clear_month<S: ScheduleStore>(
    engine: &mut ScheduleEngine<S>,
    scope: &MonthScope,
    confirmation: Confirmation,
) -> Result<CommitReport, EscalaError> {
    confirmation.require("clearing a month")?;

    let mut batch = WriteBatch::new();
    batch.push(BatchOp::ClearScope(scope.clone()));
    let mut report = engine.store.commit(&batch)?;
    report.removed_substitutions += engine.session.clear_scope(scope);
    info!(
        %scope,
        assignments = report.removed_assignments,
        substitutions = report.removed_substitutions,
        "month cleared"
    );
    Ok(report)
}

pub(super) fn remove_placeholder<S: ScheduleStore>(
    engine: &mut ScheduleEngine<S>,
    view: &mut RosterView,
    id: PlaceholderId,
    confirmation: Confirmation,
) -> Result<bool, EscalaError> {
    confirmation.require("removing a placeholder")?;

    let subject = SubjectId::Placeholder(id);
    let mut batch = WriteBatch::new();
    batch.push(BatchOp::PurgeSubject(subject.clone()));
    let report = engine.store.commit(&batch)?;
    let session = engine.session.purge_subject(&subject);
    let from_view = view.remove_placeholder(id).is_some();

    let removed = from_view || report.removed_assignments > 0 || report.removed_substitutions > 0 || session > 0;
    info!(placeholder = %id, removed, "placeholder removed");
    Ok(removed)
}
