use crate::error::ValidationError;
use crate::model::ShiftCode;
use crate::roster::JobTitlePriority;

/// Options du moteur d'escala
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Ordre d'affichage des fonctions.
    pub job_title_priority: JobTitlePriority,
    /// Si vrai, les substitutions des postes vacants sont persistées comme
    /// celles des employés au lieu de rester en session.
    pub persist_placeholder_substitutions: bool,
    /// Nom de l'établissement imprimé dans l'en-tête du rapport.
    pub institution: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            job_title_priority: JobTitlePriority::default(),
            persist_placeholder_substitutions: false,
            institution: "Instituição".to_string(),
        }
    }
}

/// Écriture d'une cellule calculée par la rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellWrite {
    pub day: u8,
    pub code: Option<ShiftCode>,
}

/// Confirmation explicite exigée avant toute opération destructive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Pending,
    Confirmed,
}

impl Confirmation {
    pub fn from_flag(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Pending
        }
    }

    pub(crate) fn require(self, action: &'static str) -> Result<(), ValidationError> {
        match self {
            Confirmation::Confirmed => Ok(()),
            Confirmation::Pending => Err(ValidationError::ConfirmationRequired(action)),
        }
    }
}
