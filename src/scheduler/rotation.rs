use super::types::CellWrite;
use crate::error::ValidationError;
use crate::model::ShiftCode;

/// Calcule les cellules touchées par l'édition de `day`.
///
/// Les plantões 24h se répètent tous les 3 jours et les 12h tous les 2 jours,
/// vers l'avant uniquement et sans dépasser la fin du mois. Tout autre code
/// (y compris une cellule vidée) ne touche que `day`.
pub fn apply_shift(
    day: u8,
    code: Option<ShiftCode>,
    month_length: u8,
) -> Result<Vec<CellWrite>, ValidationError> {
    if !(28..=31).contains(&month_length) {
        return Err(ValidationError::InvalidMonthLength(month_length));
    }
    if day == 0 || day > month_length {
        return Err(ValidationError::DayOutOfRange { day, month_length });
    }

    let Some(step) = code.and_then(ShiftCode::rotation_cadence) else {
        return Ok(vec![CellWrite { day, code }]);
    };

    Ok((day..=month_length)
        .step_by(usize::from(step))
        .map(|d| CellWrite { day: d, code })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(writes: &[CellWrite]) -> Vec<u8> {
        writes.iter().map(|w| w.day).collect()
    }

    #[test]
    fn last_day_origin_stays_single() {
        let writes = apply_shift(31, Some(ShiftCode::Duty24h), 31).unwrap();
        assert_eq!(days(&writes), vec![31]);
    }

    #[test]
    fn rejects_day_past_month_end() {
        let err = apply_shift(31, Some(ShiftCode::ServiceDay), 30).unwrap_err();
        assert_eq!(err, ValidationError::DayOutOfRange { day: 31, month_length: 30 });
    }
}
