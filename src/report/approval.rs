//! Porte d'approbation avant export du rapport.
//!
//! Simple précondition d'interface : ce n'est ni un contrôle d'accès ni une
//! piste d'audit. L'approbation n'est pas persistée et doit être redonnée
//! pour chaque export.

use super::{MonthlyReport, ReportRenderer};
use crate::error::{EscalaError, ValidationError};
use serde::Serialize;
use tracing::info;

/// Signature saisie au moment de l'export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignOff {
    /// Responsable de l'unité qui approuve.
    pub signer: String,
    pub approved: bool,
    pub technical_responsible: Option<String>,
}

impl SignOff {
    pub fn new<S: Into<String>>(signer: S, approved: bool) -> Self {
        Self {
            signer: signer.into(),
            approved,
            technical_responsible: None,
        }
    }

    pub fn with_technical_responsible<S: Into<String>>(mut self, name: S) -> Self {
        self.technical_responsible = Some(name.into());
        self
    }
}

/// Tampon imprimé sur un rapport approuvé.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalStamp {
    pub signer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_responsible: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportState {
    Draft,
    Approved(ApprovalStamp),
    Exported,
}

/// Draft → Approved → Exported.
#[derive(Debug, Clone)]
pub struct ApprovalGate {
    state: ReportState,
}

impl Default for ApprovalGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ApprovalGate {
    pub fn new() -> Self {
        Self {
            state: ReportState::Draft,
        }
    }

    pub fn state(&self) -> &ReportState {
        &self.state
    }

    /// Passe en `Approved` si le signataire est renseigné et la case cochée.
    /// Sinon l'état redevient `Draft`.
    pub fn approve(&mut self, sign_off: &SignOff) -> Result<(), ValidationError> {
        let signer = sign_off.signer.trim();
        let outcome = if signer.is_empty() {
            Err(ValidationError::ApprovalMissing("signer name is blank"))
        } else if !sign_off.approved {
            Err(ValidationError::ApprovalMissing("approval flag is not set"))
        } else {
            Ok(ApprovalStamp {
                signer: signer.to_string(),
                technical_responsible: sign_off
                    .technical_responsible
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            })
        };
        match outcome {
            Ok(stamp) => {
                self.state = ReportState::Approved(stamp);
                Ok(())
            }
            Err(err) => {
                self.state = ReportState::Draft;
                Err(err)
            }
        }
    }

    /// Rend le rapport approuvé ; l'approbation est consommée.
    pub fn export(
        &mut self,
        report: &MonthlyReport,
        renderer: &dyn ReportRenderer,
    ) -> Result<String, EscalaError> {
        let ReportState::Approved(stamp) = &self.state else {
            return Err(ValidationError::ApprovalMissing("report is not approved").into());
        };
        let rendered = renderer
            .render(report, Some(stamp))
            .map_err(|err| EscalaError::Render(err.into()))?;
        info!(scope = %report.header.scope, signer = %stamp.signer, "report exported");
        self.state = ReportState::Exported;
        Ok(rendered)
    }

    /// Approuve puis exporte en une seule action.
    pub fn sign_and_export(
        &mut self,
        report: &MonthlyReport,
        sign_off: &SignOff,
        renderer: &dyn ReportRenderer,
    ) -> Result<String, EscalaError> {
        self.approve(sign_off)?;
        self.export(report, renderer)
    }
}
