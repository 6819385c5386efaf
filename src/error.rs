use thiserror::Error;

/// Erreurs de validation (entrée utilisateur ou précondition métier).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("day {day} is empty: a substitution needs an assigned shift")]
    EmptyDay { day: u8 },
    #[error("day {day} out of range 1..={month_length}")]
    DayOutOfRange { day: u8, month_length: u8 },
    #[error("invalid month length: {0}")]
    InvalidMonthLength(u8),
    #[error("invalid month {month}/{year}")]
    InvalidMonth { month: u32, year: i32 },
    #[error("placeholder quantity must be at least 1 (got {0})")]
    InvalidQuantity(u32),
    #[error("required field is blank: {0}")]
    BlankField(&'static str),
    #[error("unknown shift code: {0}")]
    UnknownShiftCode(String),
    #[error("invalid placeholder id: {0}")]
    InvalidPlaceholderId(String),
    #[error("confirmation required before {0}")]
    ConfirmationRequired(&'static str),
    #[error("export blocked: {0}")]
    ApprovalMissing(&'static str),
}

#[derive(Error, Debug)]
pub enum EscalaError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("persistence failure during {op}: {source}")]
    Persistence {
        op: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    /// Un lot a été refusé ; rien n'a été écrit.
    #[error("batch rejected at op #{index}: {source}")]
    BatchRejected {
        index: usize,
        #[source]
        source: ValidationError,
    },
    #[error("report rendering failed: {0}")]
    Render(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("schedule storage unavailable: {0}")]
    Unavailable(String),
}

impl EscalaError {
    pub(crate) fn persistence<O: Into<String>>(op: O, source: anyhow::Error) -> Self {
        EscalaError::Persistence {
            op: op.into(),
            source: source.into(),
        }
    }

    /// Vrai pour les erreurs qui ne changent rien côté stockage.
    pub fn is_validation(&self) -> bool {
        matches!(self, EscalaError::Validation(_))
    }
}
