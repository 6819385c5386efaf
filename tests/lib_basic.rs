#![forbid(unsafe_code)]
use chrono::{TimeZone, Utc};
use escala::{
    model::{Employee, EmployeeId, MonthScope, ShiftCode, SubjectId},
    report::RowKind,
    scheduler::{Confirmation, EngineOptions, ScheduleEngine, SubstitutionRequest},
    storage::{MemoryStore, ScheduleStore},
    RosterView,
};

fn employee(id: &str, name: &str, job: &str, unit: &str) -> Employee {
    Employee::new(EmployeeId::new(id), name, job, unit)
}

#[test]
fn end_to_end_month_with_placeholder() {
    let employees = vec![
        employee("a", "Ana", "Enfermeira", "Y"),
        employee("b", "Bruno", "Técnico de Enfermagem", "Y"),
    ];
    let mut view = RosterView::for_unit(&employees, "Y");
    let ids = view.add_placeholders("Cuidador", 1, "Y").unwrap();
    let placeholder = SubjectId::Placeholder(ids[0]);

    let scope = MonthScope::new("Geral", "Y", 4, 2025).unwrap();
    assert_eq!(scope.days_in_month(), 30);

    let mut engine = ScheduleEngine::new(MemoryStore::new(), EngineOptions::default());
    let a = scope.key(EmployeeId::new("a").into());
    let b = scope.key(EmployeeId::new("b").into());

    let writes = engine.apply_shift(&a, 1, Some(ShiftCode::Duty24h)).unwrap();
    let days: Vec<u8> = writes.iter().map(|w| w.day).collect();
    assert_eq!(days, vec![1, 4, 7, 10, 13, 16, 19, 22, 25, 28]);

    let writes = engine.apply_shift(&b, 2, Some(ShiftCode::Duty12h)).unwrap();
    assert_eq!(writes.len(), 15);
    assert_eq!(writes.last().map(|w| w.day), Some(30));

    let now = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
    let report = engine.monthly_report(&employees, &view, &scope, now).unwrap();

    let line_a = report.line_for(&a.subject).unwrap();
    assert_eq!(line_a.shift_breakdown.get(ShiftCode::Duty24h), 10);
    let line_b = report.line_for(&b.subject).unwrap();
    assert_eq!(line_b.shift_breakdown.get(ShiftCode::Duty12h), 15);

    let last = report.lines.last().unwrap();
    assert_eq!(last.kind, RowKind::Placeholder);
    assert_eq!(last.subject.as_ref(), Some(&placeholder));
    assert_eq!(last.total_shifts, 0);
    assert_eq!(last.actual_days_worked, 0);

    // B (15) avant A (10)
    assert_eq!(report.lines[0].subject.as_ref(), Some(&b.subject));
    assert_eq!(report.summary.roster_size, 3);
    assert_eq!(report.summary.total_days_worked, 25);
}

#[test]
fn clear_month_only_touches_its_scope() {
    let mut engine = ScheduleEngine::new(MemoryStore::new(), EngineOptions::default());
    let target = MonthScope::new("Enfermagem", "Botafogo", 6, 2024).unwrap();
    let other_month = MonthScope::new("Enfermagem", "Botafogo", 7, 2024).unwrap();
    let other_unit = MonthScope::new("Enfermagem", "Tijuca", 6, 2024).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();

    for scope in [&target, &other_month, &other_unit] {
        let key = scope.key(EmployeeId::new("a").into());
        engine.apply_shift(&key, 2, Some(ShiftCode::ServiceDay)).unwrap();
        engine
            .set_substitution(&key, 2, SubstitutionRequest::new("Carla", "férias"), now)
            .unwrap();
    }

    let err = engine.clear_month(&target, Confirmation::Pending).unwrap_err();
    assert!(err.is_validation());

    let report = engine.clear_month(&target, Confirmation::Confirmed).unwrap();
    assert_eq!(report.removed_assignments, 1);
    assert_eq!(report.removed_substitutions, 1);

    let book = engine.store().snapshot().unwrap();
    assert_eq!(book.assignments_in(&target).count(), 0);
    assert!(book.substitutions_in(&target).is_empty());
    assert_eq!(book.assignments_in(&other_month).count(), 1);
    assert_eq!(book.substitutions_in(&other_month).len(), 1);
    assert_eq!(book.assignments_in(&other_unit).count(), 1);
    assert_eq!(book.substitutions_in(&other_unit).len(), 1);
}

#[test]
fn removing_placeholder_purges_its_data() {
    let employees = vec![employee("a", "Ana", "Enfermeira", "Y")];
    let mut view = RosterView::for_unit(&employees, "Y");
    let id = view.add_placeholders("Enfermeiro", 1, "Y").unwrap()[0];
    let scope = MonthScope::new("Geral", "Y", 4, 2025).unwrap();
    let key = scope.key(id.into());
    let now = Utc.with_ymd_and_hms(2025, 4, 10, 8, 0, 0).unwrap();

    let mut engine = ScheduleEngine::new(MemoryStore::new(), EngineOptions::default());
    engine.persist_placeholders(&view).unwrap();
    engine.apply_shift(&key, 3, Some(ShiftCode::Duty24h)).unwrap();
    engine
        .set_substitution(&key, 3, SubstitutionRequest::new("Folguista X", "cobertura"), now)
        .unwrap();
    assert_eq!(engine.session().len(), 1);

    let removed = engine
        .remove_placeholder(&mut view, id, Confirmation::Confirmed)
        .unwrap();
    assert!(removed);
    assert!(view.placeholders().is_empty());
    assert!(engine.session().is_empty());

    let book = engine.store().snapshot().unwrap();
    assert!(book.assignment(&key).is_none());
    assert!(book.placeholders().is_empty());

    let report = engine.monthly_report(&employees, &view, &scope, now).unwrap();
    assert!(report.line_for(&key.subject).is_none());
    assert!(report.floaters.is_empty());
    assert_eq!(report.lines.len(), 1);

    // idempotent
    let again = engine
        .remove_placeholder(&mut view, id, Confirmation::Confirmed)
        .unwrap();
    assert!(!again);
}

#[test]
fn deselecting_hides_without_mutating() {
    let employees = vec![
        employee("a", "Ana", "Enfermeira", "Y"),
        employee("b", "Bruno", "Enfermeiro", "Y"),
    ];
    let mut view = RosterView::for_unit(&employees, "Y");
    let scope = MonthScope::new("Geral", "Y", 1, 2025).unwrap();
    let mut engine = ScheduleEngine::new(MemoryStore::new(), EngineOptions::default());
    let b = scope.key(EmployeeId::new("b").into());
    engine.apply_shift(&b, 5, Some(ShiftCode::ServiceDay)).unwrap();

    assert!(view.deselect(&EmployeeId::new("b")));
    let now = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
    let report = engine.monthly_report(&employees, &view, &scope, now).unwrap();
    assert!(report.line_for(&b.subject).is_none());

    let book = engine.store().snapshot().unwrap();
    assert_eq!(book.cell(&b, 5), Some(ShiftCode::ServiceDay));
}

#[test]
fn unavailable_store_degrades_explicitly() {
    let mut engine = ScheduleEngine::new(
        MemoryStore::unavailable("escala table missing"),
        EngineOptions::default(),
    );
    let scope = MonthScope::new("Geral", "Y", 1, 2025).unwrap();
    let key = scope.key(EmployeeId::new("a").into());
    let err = engine.apply_shift(&key, 1, Some(ShiftCode::Duty6h)).unwrap_err();
    assert!(matches!(err, escala::EscalaError::Unavailable(_)));
    assert!(matches!(engine.availability(), escala::Availability::Unavailable(_)));
}
