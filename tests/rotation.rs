#![forbid(unsafe_code)]
use escala::{
    apply_shift,
    model::{EmployeeId, MonthScope, ShiftCode},
    scheduler::{EngineOptions, ScheduleEngine},
    storage::{MemoryStore, ScheduleStore},
    ValidationError,
};

fn propagated_days(day: u8, code: ShiftCode, len: u8) -> Vec<u8> {
    apply_shift(day, Some(code), len)
        .unwrap()
        .into_iter()
        .map(|w| {
            assert_eq!(w.code, Some(code));
            w.day
        })
        .collect()
}

#[test]
fn duty24h_repeats_every_three_days_within_month() {
    for len in 28..=31u8 {
        for day in 1..=len {
            let expected: Vec<u8> = (day..=len).step_by(3).collect();
            let got = propagated_days(day, ShiftCode::Duty24h, len);
            assert_eq!(got, expected, "day {day}, len {len}");
            assert!(got.iter().all(|d| *d <= len));
        }
    }
}

#[test]
fn duty12h_repeats_every_two_days_within_month() {
    for len in 28..=31u8 {
        for day in 1..=len {
            let expected: Vec<u8> = (day..=len).step_by(2).collect();
            assert_eq!(propagated_days(day, ShiftCode::Duty12h, len), expected);
        }
    }
}

#[test]
fn other_codes_touch_a_single_cell() {
    for code in [ShiftCode::ServiceDay, ShiftCode::RestDay, ShiftCode::Duty6h] {
        assert_eq!(propagated_days(10, code, 30), vec![10]);
    }
    let cleared = apply_shift(10, None, 30).unwrap();
    assert_eq!(cleared.len(), 1);
    assert_eq!(cleared[0].code, None);
}

#[test]
fn invalid_inputs_are_rejected() {
    assert_eq!(
        apply_shift(0, Some(ShiftCode::Duty24h), 30).unwrap_err(),
        ValidationError::DayOutOfRange { day: 0, month_length: 30 }
    );
    assert_eq!(
        apply_shift(1, Some(ShiftCode::Duty24h), 32).unwrap_err(),
        ValidationError::InvalidMonthLength(32)
    );
}

#[test]
fn overlapping_origins_last_write_wins() {
    let mut engine = ScheduleEngine::new(MemoryStore::new(), EngineOptions::default());
    let scope = MonthScope::new("Enfermagem", "Botafogo", 6, 2024).unwrap();
    let key = scope.key(EmployeeId::new("a").into());

    engine.apply_shift(&key, 1, Some(ShiftCode::Duty24h)).unwrap();
    engine.apply_shift(&key, 4, Some(ShiftCode::Duty12h)).unwrap();

    let book = engine.store().snapshot().unwrap();
    assert_eq!(book.cell(&key, 1), Some(ShiftCode::Duty24h));
    // 4, 10, 16… repris par la propagation 12h
    assert_eq!(book.cell(&key, 4), Some(ShiftCode::Duty12h));
    assert_eq!(book.cell(&key, 10), Some(ShiftCode::Duty12h));
    // 7, 13… gardent le 24h d'origine
    assert_eq!(book.cell(&key, 7), Some(ShiftCode::Duty24h));
    assert_eq!(book.cell(&key, 30), Some(ShiftCode::Duty12h));
}

#[test]
fn editing_a_propagated_cell_does_not_cascade() {
    let mut engine = ScheduleEngine::new(MemoryStore::new(), EngineOptions::default());
    let scope = MonthScope::new("Enfermagem", "Botafogo", 6, 2024).unwrap();
    let key = scope.key(EmployeeId::new("a").into());

    engine.apply_shift(&key, 1, Some(ShiftCode::Duty24h)).unwrap();
    let writes = engine.apply_shift(&key, 7, Some(ShiftCode::RestDay)).unwrap();
    assert_eq!(writes.len(), 1);

    let book = engine.store().snapshot().unwrap();
    assert_eq!(book.cell(&key, 7), Some(ShiftCode::RestDay));
    assert_eq!(book.cell(&key, 10), Some(ShiftCode::Duty24h));
    assert_eq!(book.cell(&key, 28), Some(ShiftCode::Duty24h));
}
