use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

/// Nombre maximal de colonnes jour d'une escala.
pub const MAX_DAYS: u8 = 31;

/// Identifiant fort pour Employee (fourni par le cadastre externe)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EmployeeId(String);

impl EmployeeId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().trim().to_owned())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifiant fort pour PlaceholderPosition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlaceholderId(Uuid);

impl PlaceholderId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidPlaceholderId(s.to_string()))
    }
}

impl fmt::Display for PlaceholderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Membre du personnel, en lecture seule pour le moteur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub job_title: String,
    pub registry_or_tax_id: String,
    pub unit: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Employee {
    pub fn new<N: Into<String>, J: Into<String>, U: Into<String>>(
        id: EmployeeId,
        name: N,
        job_title: J,
        unit: U,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            job_title: job_title.into(),
            registry_or_tax_id: String::new(),
            unit: unit.into(),
            active: true,
        }
    }
}

/// Poste non pourvu, utilisé comme aide à la planification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderPosition {
    pub id: PlaceholderId,
    pub label: String,
    pub job_title: String,
    pub unit: String,
}

/// Sujet d'une ligne d'escala : employé réel ou poste vacant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubjectId {
    Employee(EmployeeId),
    Placeholder(PlaceholderId),
}

impl SubjectId {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, SubjectId::Placeholder(_))
    }
}

impl From<EmployeeId> for SubjectId {
    fn from(id: EmployeeId) -> Self {
        SubjectId::Employee(id)
    }
}

impl From<PlaceholderId> for SubjectId {
    fn from(id: PlaceholderId) -> Self {
        SubjectId::Placeholder(id)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectId::Employee(id) => write!(f, "employee {id}"),
            SubjectId::Placeholder(id) => write!(f, "placeholder {id}"),
        }
    }
}

/// Ligne de la grille, dans l'ordre d'affichage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Employee(Employee),
    Placeholder(PlaceholderPosition),
}

impl Subject {
    pub fn id(&self) -> SubjectId {
        match self {
            Subject::Employee(e) => SubjectId::Employee(e.id.clone()),
            Subject::Placeholder(p) => SubjectId::Placeholder(p.id),
        }
    }
    pub fn display_name(&self) -> &str {
        match self {
            Subject::Employee(e) => &e.name,
            Subject::Placeholder(p) => &p.label,
        }
    }
    pub fn job_title(&self) -> &str {
        match self {
            Subject::Employee(e) => &e.job_title,
            Subject::Placeholder(p) => &p.job_title,
        }
    }
}

/// Code de service pour une journée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftCode {
    ServiceDay,
    RestDay,
    Duty12h,
    Duty24h,
    Duty6h,
}

impl ShiftCode {
    pub const ALL: [ShiftCode; 5] = [
        ShiftCode::ServiceDay,
        ShiftCode::RestDay,
        ShiftCode::Duty12h,
        ShiftCode::Duty24h,
        ShiftCode::Duty6h,
    ];

    /// Intervalle (en jours) de répétition automatique des plantões longs.
    pub fn rotation_cadence(self) -> Option<u8> {
        match self {
            ShiftCode::Duty24h => Some(3),
            ShiftCode::Duty12h => Some(2),
            _ => None,
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            ShiftCode::ServiceDay => "S",
            ShiftCode::RestDay => "F",
            ShiftCode::Duty12h => "12",
            ShiftCode::Duty24h => "24",
            ShiftCode::Duty6h => "6",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ShiftCode::ServiceDay => "Serviço",
            ShiftCode::RestDay => "Folga",
            ShiftCode::Duty12h => "Plantão 12h",
            ShiftCode::Duty24h => "Plantão 24h",
            ShiftCode::Duty6h => "Plantão 6h",
        }
    }

    fn index(self) -> usize {
        match self {
            ShiftCode::ServiceDay => 0,
            ShiftCode::RestDay => 1,
            ShiftCode::Duty12h => 2,
            ShiftCode::Duty24h => 3,
            ShiftCode::Duty6h => 4,
        }
    }
}

impl fmt::Display for ShiftCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

impl FromStr for ShiftCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        let code = match raw.as_str() {
            "s" | "service_day" | "serviceday" => ShiftCode::ServiceDay,
            "f" | "rest_day" | "restday" => ShiftCode::RestDay,
            "12" | "12h" | "duty12h" | "duty_12h" => ShiftCode::Duty12h,
            "24" | "24h" | "duty24h" | "duty_24h" => ShiftCode::Duty24h,
            "6" | "6h" | "duty6h" | "duty_6h" => ShiftCode::Duty6h,
            _ => return Err(ValidationError::UnknownShiftCode(s.to_string())),
        };
        Ok(code)
    }
}

/// Compteurs par code de service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShiftCounts([u32; 5]);

impl Serialize for ShiftCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(ShiftCode::ALL.iter().map(|code| (code, self.get(*code))))
    }
}

impl ShiftCounts {
    pub fn get(&self, code: ShiftCode) -> u32 {
        self.0[code.index()]
    }
    pub fn add(&mut self, code: ShiftCode, n: u32) {
        self.0[code.index()] += n;
    }
    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }
    pub fn merge(&mut self, other: &ShiftCounts) {
        for code in ShiftCode::ALL {
            self.add(code, other.get(code));
        }
    }
}

/// Périmètre d'une escala : catégorie, unité, mois, année.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthScope {
    pub category: String,
    pub unit: String,
    pub month: u32,
    pub year: i32,
}

impl MonthScope {
    /// Construit un périmètre validé (`month` dans 1..=12, champs non vides).
    pub fn new<C: Into<String>, U: Into<String>>(
        category: C,
        unit: U,
        month: u32,
        year: i32,
    ) -> Result<Self, ValidationError> {
        let scope = Self {
            category: category.into().trim().to_string(),
            unit: unit.into().trim().to_string(),
            month,
            year,
        };
        scope.validate()?;
        Ok(scope)
    }

    /// Revalide un périmètre venu d'ailleurs (fichier, désérialisation).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.category.trim().is_empty() {
            return Err(ValidationError::BlankField("category"));
        }
        if self.unit.trim().is_empty() {
            return Err(ValidationError::BlankField("unit"));
        }
        if NaiveDate::from_ymd_opt(self.year, self.month, 1).is_none() {
            return Err(ValidationError::InvalidMonth {
                month: self.month,
                year: self.year,
            });
        }
        Ok(())
    }

    /// Longueur du mois (calendrier grégorien).
    pub fn days_in_month(&self) -> u8 {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1);
        let next = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
        };
        match (first, next) {
            (Some(a), Some(b)) => b.signed_duration_since(a).num_days() as u8,
            _ => MAX_DAYS,
        }
    }

    pub fn key(&self, subject: SubjectId) -> ScheduleKey {
        ScheduleKey { subject, scope: self.clone() }
    }
}

impl fmt::Display for MonthScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} {:02}/{}", self.category, self.unit, self.month, self.year)
    }
}

/// Clé d'une ligne d'escala : sujet + périmètre.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScheduleKey {
    pub subject: SubjectId,
    pub scope: MonthScope,
}

/// Grille d'un sujet pour un mois : une cellule par jour (1..=31).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthAssignment {
    days: [Option<ShiftCode>; MAX_DAYS as usize],
}

impl MonthAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, day: u8) -> Option<ShiftCode> {
        match day {
            1..=MAX_DAYS => self.days[usize::from(day - 1)],
            _ => None,
        }
    }

    /// Écrit une cellule ; renvoie la valeur précédente.
    pub fn set(&mut self, day: u8, code: Option<ShiftCode>) -> Result<Option<ShiftCode>, ValidationError> {
        if !(1..=MAX_DAYS).contains(&day) {
            return Err(ValidationError::DayOutOfRange { day, month_length: MAX_DAYS });
        }
        Ok(std::mem::replace(&mut self.days[usize::from(day - 1)], code))
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Option::is_none)
    }

    /// Itère sur les cellules non vides `(jour, code)`.
    pub fn filled(&self) -> impl Iterator<Item = (u8, ShiftCode)> + '_ {
        self.days
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|code| (i as u8 + 1, code)))
    }

    pub fn counts(&self) -> ShiftCounts {
        let mut counts = ShiftCounts::default();
        for (_, code) in self.filled() {
            counts.add(code, 1);
        }
        counts
    }
}

/// Couverture ponctuelle d'une journée par une autre personne.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitute_id: Option<EmployeeId>,
    pub substitute_name: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Substitution avec sa clé, telle que stockée.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRecord {
    pub key: ScheduleKey,
    pub day: u8,
    pub substitution: Substitution,
}

