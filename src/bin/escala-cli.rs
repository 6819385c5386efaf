#![forbid(unsafe_code)]
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use escala::{
    io,
    model::{Employee, EmployeeId, MonthScope, PlaceholderId, ScheduleKey, ShiftCode, SubjectId},
    report::{ApprovalGate, CsvReport, JsonReport, ReportRenderer, SignOff, TextReport},
    roster::RosterView,
    scheduler::{Confirmation, EngineOptions, ScheduleEngine, SubstitutionRequest},
    storage::{JsonStore, ScheduleStore},
    EscalaError, ValidationError,
};
use chrono::Utc;
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI d'escala mensuelle (stockage fichier JSON)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON de l'escala
    #[arg(long, global = true, default_value = "escala.json")]
    book: String,

    /// Cadastre des employés (CSV)
    #[arg(long, global = true)]
    employees: Option<String>,

    /// Nom de l'établissement (en-tête du rapport)
    #[arg(long, global = true, default_value = "Instituição")]
    institution: String,

    /// Persiste aussi les substitutions des postes vacants
    #[arg(long, global = true)]
    persist_placeholder_substitutions: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args, Debug)]
struct ScopeArgs {
    #[arg(long)]
    category: String,
    #[arg(long)]
    unit: String,
    #[arg(long)]
    month: u32,
    #[arg(long)]
    year: i32,
}

impl ScopeArgs {
    fn scope(&self) -> Result<MonthScope, ValidationError> {
        MonthScope::new(&self.category, &self.unit, self.month, self.year)
    }
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct SubjectArgs {
    /// Identifiant d'un employé du cadastre
    #[arg(long)]
    employee: Option<String>,
    /// Identifiant d'un poste vacant
    #[arg(long)]
    placeholder: Option<String>,
}

impl SubjectArgs {
    fn subject(&self) -> Result<SubjectId> {
        match (&self.employee, &self.placeholder) {
            (Some(id), None) => Ok(SubjectId::Employee(EmployeeId::new(id))),
            (None, Some(id)) => Ok(SubjectId::Placeholder(PlaceholderId::parse(id)?)),
            _ => bail!("exactly one of --employee or --placeholder is required"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Text,
    Csv,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Créer un fichier d'escala vide
    Init,

    /// Ajouter des postes vacants
    AddPlaceholders {
        #[arg(long)]
        job_title: String,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        #[arg(long)]
        unit: String,
    },

    /// Supprimer un poste vacant et toutes ses données
    RemovePlaceholder {
        #[arg(long)]
        id: String,
        /// Confirme l'opération destructive
        #[arg(long)]
        yes: bool,
    },

    /// Écrire un code (24h/12h propagés jusqu'à la fin du mois)
    Set {
        #[command(flatten)]
        scope: ScopeArgs,
        #[command(flatten)]
        subject: SubjectArgs,
        #[arg(long)]
        day: u8,
        /// S, F, 12, 24, 6 ; `-` pour vider la cellule
        #[arg(long)]
        code: String,
    },

    /// Enregistrer une substitution sur une journée
    Substitute {
        #[command(flatten)]
        scope: ScopeArgs,
        #[command(flatten)]
        subject: SubjectArgs,
        #[arg(long)]
        day: u8,
        #[arg(long)]
        name: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        substitute_id: Option<String>,
    },

    /// Retirer une substitution
    Unsubstitute {
        #[command(flatten)]
        scope: ScopeArgs,
        #[command(flatten)]
        subject: SubjectArgs,
        #[arg(long)]
        day: u8,
        #[arg(long)]
        yes: bool,
    },

    /// Vider un mois (grilles + substitutions)
    ClearMonth {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        yes: bool,
    },

    /// Exporter la grille du mois en CSV
    Grid {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        out: String,
    },

    /// Rapport mensuel (brouillon sur stdout, export signé avec --out)
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        /// liste "id1,id2,..." d'employés à masquer
        #[arg(long)]
        hide: Option<String>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        #[arg(long)]
        out: Option<String>,
        /// Nom du responsable qui approuve
        #[arg(long, default_value = "")]
        signer: String,
        #[arg(long)]
        approved: bool,
        #[arg(long)]
        technical_responsible: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let store = if matches!(cli.cmd, Commands::Init) {
        JsonStore::init(&cli.book)?
    } else {
        JsonStore::open(&cli.book)?
    };
    let options = EngineOptions {
        persist_placeholder_substitutions: cli.persist_placeholder_substitutions,
        institution: cli.institution.clone(),
        ..EngineOptions::default()
    };
    let mut engine = ScheduleEngine::new(store, options);
    let employees = load_employees(cli.employees.as_deref())?;

    let code = match cli.cmd {
        Commands::Init => {
            engine.store().snapshot()?;
            println!("OK: {}", engine.store().path().display());
            0
        }
        Commands::AddPlaceholders {
            job_title,
            quantity,
            unit,
        } => {
            let mut view = RosterView::new();
            engine.load_placeholders(&mut view, unit.trim())?;
            let ids = view.add_placeholders(&job_title, quantity, &unit)?;
            engine.persist_placeholders(&view)?;
            for id in ids {
                if let Some(p) = view.placeholder(id) {
                    println!("{} | {}", p.id, p.label);
                }
            }
            0
        }
        Commands::RemovePlaceholder { id, yes } => {
            let id = PlaceholderId::parse(&id)?;
            let mut view = RosterView::new();
            let removed = engine.remove_placeholder(&mut view, id, Confirmation::from_flag(yes))?;
            println!("{}", if removed { "removed" } else { "nothing to remove" });
            0
        }
        Commands::Set {
            scope,
            subject,
            day,
            code,
        } => {
            let key = key(&scope, &subject)?;
            ensure_known(&engine, &employees, &key.subject)?;
            let code = match code.trim() {
                "-" | "" => None,
                raw => Some(raw.parse::<ShiftCode>()?),
            };
            let writes = engine.apply_shift(&key, day, code)?;
            let days: Vec<String> = writes.iter().map(|w| w.day.to_string()).collect();
            println!("{} cell(s): {}", writes.len(), days.join(","));
            0
        }
        Commands::Substitute {
            scope,
            subject,
            day,
            name,
            reason,
            substitute_id,
        } => {
            let key = key(&scope, &subject)?;
            ensure_known(&engine, &employees, &key.subject)?;
            // la session ne survit pas au processus
            if key.subject.is_placeholder() && !engine.options().persist_placeholder_substitutions {
                bail!(
                    "placeholder substitutions are session-only and would be lost on exit; \
                     pass --persist-placeholder-substitutions to record them"
                );
            }
            let mut request = SubstitutionRequest::new(name, reason);
            if let Some(id) = substitute_id {
                request = request.with_substitute_id(EmployeeId::new(id));
            }
            engine.set_substitution(&key, day, request, Utc::now())?;
            println!("substitution recorded for day {day}");
            0
        }
        Commands::Unsubstitute {
            scope,
            subject,
            day,
            yes,
        } => {
            let key = key(&scope, &subject)?;
            let removed = engine.clear_substitution(&key, day, Confirmation::from_flag(yes))?;
            println!("{}", if removed { "removed" } else { "nothing to remove" });
            0
        }
        Commands::ClearMonth { scope, yes } => {
            let scope = scope.scope()?;
            let report = engine.clear_month(&scope, Confirmation::from_flag(yes))?;
            println!(
                "cleared {} assignment(s), {} substitution(s)",
                report.removed_assignments, report.removed_substitutions
            );
            0
        }
        Commands::Grid { scope, out } => {
            let scope = scope.scope()?;
            let view = unit_view(&engine, &employees, &scope, None)?;
            let roster = engine.roster(&employees, &view);
            let book = engine.store().snapshot()?;
            io::export_month_csv(out, &scope, &roster, &book)?;
            0
        }
        Commands::Report {
            scope,
            hide,
            format,
            out,
            signer,
            approved,
            technical_responsible,
        } => {
            let scope = scope.scope()?;
            let view = unit_view(&engine, &employees, &scope, hide.as_deref())?;
            let report = engine.monthly_report(&employees, &view, &scope, Utc::now())?;
            let renderer: &dyn ReportRenderer = match format {
                Format::Text => &TextReport,
                Format::Csv => &CsvReport,
                Format::Json => &JsonReport,
            };

            match out {
                None => {
                    print!("{}", renderer.render(&report, None)?);
                    0
                }
                Some(path) => {
                    let mut sign_off = SignOff::new(signer, approved);
                    if let Some(name) = technical_responsible {
                        sign_off = sign_off.with_technical_responsible(name);
                    }
                    let mut gate = ApprovalGate::new();
                    match gate.sign_and_export(&report, &sign_off, renderer) {
                        Ok(rendered) => {
                            std::fs::write(&path, rendered)
                                .with_context(|| format!("writing {path}"))?;
                            println!("Report exported to {path}");
                            0
                        }
                        Err(EscalaError::Validation(err @ ValidationError::ApprovalMissing(_))) => {
                            eprintln!("{err}");
                            // Code 2 = export bloqué par la porte d'approbation
                            2
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
            }
        }
    };

    std::process::exit(code);
}

fn load_employees(path: Option<&str>) -> Result<Vec<Employee>> {
    match path {
        Some(p) => io::import_employees_csv(p).with_context(|| format!("importing {p}")),
        None => Ok(Vec::new()),
    }
}

fn key(scope: &ScopeArgs, subject: &SubjectArgs) -> Result<ScheduleKey> {
    Ok(scope.scope()?.key(subject.subject()?))
}

/// Refuse un sujet absent du cadastre importé ou des postes vacants stockés.
fn ensure_known<S: ScheduleStore>(
    engine: &ScheduleEngine<S>,
    employees: &[Employee],
    subject: &SubjectId,
) -> Result<(), EscalaError> {
    let book = engine.store().snapshot()?;
    let known = match subject {
        SubjectId::Employee(id) => employees.is_empty() || employees.iter().any(|e| &e.id == id),
        SubjectId::Placeholder(id) => book.placeholders().iter().any(|p| &p.id == id),
    };
    if known {
        Ok(())
    } else {
        Err(EscalaError::NotFound(subject.to_string()))
    }
}

fn unit_view<S: ScheduleStore>(
    engine: &ScheduleEngine<S>,
    employees: &[Employee],
    scope: &MonthScope,
    hide: Option<&str>,
) -> Result<RosterView> {
    let mut view = RosterView::for_unit(employees, &scope.unit);
    engine.load_placeholders(&mut view, &scope.unit)?;
    if let Some(list) = hide {
        for id in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            view.deselect(&EmployeeId::new(id));
        }
    }
    Ok(view)
}
