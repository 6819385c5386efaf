#![forbid(unsafe_code)]
use chrono::{Duration, TimeZone, Utc};
use escala::{
    model::{EmployeeId, MonthScope, ShiftCode},
    scheduler::{Confirmation, EngineOptions, ScheduleEngine, SubstitutionRequest},
    storage::{MemoryStore, ScheduleStore},
    EscalaError, RosterView, ValidationError,
};

fn scope() -> MonthScope {
    MonthScope::new("Enfermagem", "Botafogo", 6, 2024).unwrap()
}

#[test]
fn substitution_requires_a_filled_day() {
    let mut engine = ScheduleEngine::new(MemoryStore::new(), EngineOptions::default());
    let key = scope().key(EmployeeId::new("a").into());
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();

    let err = engine
        .set_substitution(&key, 5, SubstitutionRequest::new("Carla", "atestado"), now)
        .unwrap_err();
    assert!(matches!(
        err,
        EscalaError::Validation(ValidationError::EmptyDay { day: 5 })
    ));
    assert!(engine.substitutions_in(&scope()).unwrap().is_empty());
}

#[test]
fn second_substitution_replaces_the_first() {
    let mut engine = ScheduleEngine::new(MemoryStore::new(), EngineOptions::default());
    let key = scope().key(EmployeeId::new("a").into());
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();

    engine.apply_shift(&key, 5, Some(ShiftCode::ServiceDay)).unwrap();
    engine
        .set_substitution(&key, 5, SubstitutionRequest::new("Carla", "atestado"), now)
        .unwrap();
    engine
        .set_substitution(
            &key,
            5,
            SubstitutionRequest::new("Diego", "troca de plantão")
                .with_substitute_id(EmployeeId::new("d")),
            now + Duration::hours(1),
        )
        .unwrap();

    let records = engine.substitutions_in(&scope()).unwrap();
    assert_eq!(records.len(), 1);
    let sub = &records[0].substitution;
    assert_eq!(sub.substitute_name, "Diego");
    assert_eq!(sub.reason, "troca de plantão");
    assert_eq!(sub.substitute_id, Some(EmployeeId::new("d")));
}

#[test]
fn blank_fields_are_rejected() {
    let mut engine = ScheduleEngine::new(MemoryStore::new(), EngineOptions::default());
    let key = scope().key(EmployeeId::new("a").into());
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
    engine.apply_shift(&key, 5, Some(ShiftCode::ServiceDay)).unwrap();

    let err = engine
        .set_substitution(&key, 5, SubstitutionRequest::new("  ", "atestado"), now)
        .unwrap_err();
    assert!(matches!(
        err,
        EscalaError::Validation(ValidationError::BlankField("substitute_name"))
    ));
}

#[test]
fn clearing_is_confirmed_and_tolerates_absence() {
    let mut engine = ScheduleEngine::new(MemoryStore::new(), EngineOptions::default());
    let key = scope().key(EmployeeId::new("a").into());
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
    engine.apply_shift(&key, 5, Some(ShiftCode::Duty6h)).unwrap();
    engine
        .set_substitution(&key, 5, SubstitutionRequest::new("Carla", "atestado"), now)
        .unwrap();

    assert!(engine.clear_substitution(&key, 5, Confirmation::Pending).is_err());
    assert!(engine.clear_substitution(&key, 5, Confirmation::Confirmed).unwrap());
    assert!(!engine.clear_substitution(&key, 5, Confirmation::Confirmed).unwrap());
    // la grille n'est pas modifiée
    let book = engine.store().snapshot().unwrap();
    assert_eq!(book.cell(&key, 5), Some(ShiftCode::Duty6h));
}

#[test]
fn placeholder_substitutions_stay_in_session() {
    let mut view = RosterView::new();
    let id = view.add_placeholders("Técnico de Enfermagem", 1, "Botafogo").unwrap()[0];
    let key = scope().key(id.into());
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();

    let mut engine = ScheduleEngine::new(MemoryStore::new(), EngineOptions::default());
    engine.apply_shift(&key, 2, Some(ShiftCode::Duty12h)).unwrap();
    engine
        .set_substitution(&key, 2, SubstitutionRequest::new("Folguista", "vaga aberta"), now)
        .unwrap();

    assert_eq!(engine.session().len(), 1);
    assert_eq!(engine.store().snapshot().unwrap().substitution_count(), 0);
    assert_eq!(engine.substitutions_in(&scope()).unwrap().len(), 1);

    // vider la cellule retire aussi la substitution de session
    engine.apply_shift(&key, 2, None).unwrap();
    assert!(engine.session().is_empty());
}

#[test]
fn placeholder_substitutions_can_be_persisted() {
    let mut view = RosterView::new();
    let id = view.add_placeholders("Cuidador", 1, "Botafogo").unwrap()[0];
    let key = scope().key(id.into());
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();

    let options = EngineOptions {
        persist_placeholder_substitutions: true,
        ..EngineOptions::default()
    };
    let mut engine = ScheduleEngine::new(MemoryStore::new(), options);
    engine.apply_shift(&key, 2, Some(ShiftCode::ServiceDay)).unwrap();
    engine
        .set_substitution(&key, 2, SubstitutionRequest::new("Folguista", "vaga aberta"), now)
        .unwrap();

    assert!(engine.session().is_empty());
    assert_eq!(engine.store().snapshot().unwrap().substitution_count(), 1);
}

#[test]
fn session_substitution_replaces_a_persisted_one() {
    let mut view = RosterView::new();
    let id = view.add_placeholders("Cuidador", 1, "Botafogo").unwrap()[0];
    let key = scope().key(id.into());
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();

    let options = EngineOptions {
        persist_placeholder_substitutions: true,
        ..EngineOptions::default()
    };
    let mut persisting = ScheduleEngine::new(MemoryStore::new(), options);
    persisting.apply_shift(&key, 1, Some(ShiftCode::ServiceDay)).unwrap();
    persisting
        .set_substitution(&key, 1, SubstitutionRequest::new("Carla", "atestado"), now)
        .unwrap();

    let mut engine = ScheduleEngine::new(persisting.store().clone(), EngineOptions::default());
    engine
        .set_substitution(&key, 1, SubstitutionRequest::new("Duda", "férias"), now)
        .unwrap();

    assert_eq!(engine.store().snapshot().unwrap().substitution_count(), 0);
    let records = engine.substitutions_in(&scope()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].substitution.substitute_name, "Duda");
    assert_eq!(
        engine.session().get(&key, 1).map(|s| s.reason.as_str()),
        Some("férias")
    );

    let report = engine.monthly_report(&[], &view, &scope(), now).unwrap();
    assert_eq!(report.summary.total_substitutions, 1);
    assert_eq!(report.summary.distinct_floaters, 1);
    let line = report.line_for(&key.subject).unwrap();
    assert_eq!(line.substituted_days, 1);
    assert_eq!(report.line("Duda").map(|l| l.kind), Some(escala::RowKind::Floater));
}
