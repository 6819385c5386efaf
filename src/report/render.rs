use super::{ApprovalStamp, MonthlyReport, ReportLine, RowKind};
use crate::model::{ShiftCode, ShiftCounts};
use anyhow::Result;
use csv::{Terminator, WriterBuilder};
use serde::Serialize;
use std::fmt::Write as _;

/// Permet de choisir le format de l'artefact exporté.
pub trait ReportRenderer {
    /// `stamp` est présent uniquement quand la porte d'approbation est satisfaite.
    fn render(&self, report: &MonthlyReport, stamp: Option<&ApprovalStamp>) -> Result<String>;
}

const BLANK_SIGNATURE: &str = "______________________________";

/// Document texte à imprimer et signer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextReport;

impl ReportRenderer for TextReport {
    fn render(&self, report: &MonthlyReport, stamp: Option<&ApprovalStamp>) -> Result<String> {
        let header = &report.header;
        let summary = &report.summary;
        let mut out = String::new();

        writeln!(out, "{}", header.institution)?;
        writeln!(
            out,
            "Escala mensal: {} / {} - {:02}/{}",
            header.scope.category, header.scope.unit, header.scope.month, header.scope.year
        )?;
        writeln!(out, "Gerado em {} UTC", header.generated_at.format("%d/%m/%Y %H:%M"))?;

        writeln!(out)?;
        writeln!(out, "RESUMO")?;
        writeln!(out, "Profissionais na escala: {}", summary.roster_size)?;
        writeln!(out, "Dias trabalhados: {}", summary.total_days_worked)?;
        writeln!(out, "Dias no mês: {}", summary.days_in_month)?;
        writeln!(out, "Substituições: {}", summary.total_substitutions)?;
        writeln!(out, "Folguistas: {}", summary.distinct_floaters)?;

        writeln!(out)?;
        writeln!(out, "FOLGUISTAS")?;
        if report.floaters.is_empty() {
            writeln!(out, "- nenhum")?;
        }
        for floater in &report.floaters {
            writeln!(out, "- {}: {} substituição(ões)", floater.substitute_name, floater.count)?;
            writeln!(out, "  Cobriu: {}", join(&floater.subjects_covered))?;
            writeln!(out, "  Motivos: {}", join(&floater.reasons))?;
        }

        writeln!(out)?;
        writeln!(out, "QUADRO")?;
        writeln!(
            out,
            "{:<24} {:<22} {:>3} {:>3} {:>3} {:>3} {:>3} {:>5} {:>5} {:>5}",
            "Profissional", "Função", "S", "F", "12", "24", "6", "Total", "Subst", "Trab"
        )?;
        for line in &report.lines {
            let name = match line.kind {
                RowKind::Floater => format!("{} (folguista)", line.name),
                _ => line.name.clone(),
            };
            write_row(&mut out, &name, &line.job_title, line)?;
        }
        let totals = &report.totals;
        write_counts(
            &mut out,
            "TOTAL",
            "",
            &totals.shift_breakdown,
            [totals.total_shifts, totals.substituted_days, totals.actual_days_worked],
        )?;

        writeln!(out)?;
        let technical = stamp
            .and_then(|s| s.technical_responsible.as_deref())
            .unwrap_or(BLANK_SIGNATURE);
        let approver = stamp.map(|s| s.signer.as_str()).unwrap_or(BLANK_SIGNATURE);
        writeln!(out, "Responsável técnico: {technical}")?;
        writeln!(out, "Aprovação da unidade: {approver}")?;
        match stamp {
            Some(_) => writeln!(out, "*** APROVADO ***")?,
            None => writeln!(out, "RASCUNHO - não aprovado")?,
        }
        Ok(out)
    }
}

fn write_row(out: &mut String, name: &str, job_title: &str, line: &ReportLine) -> Result<()> {
    write_counts(
        out,
        name,
        job_title,
        &line.shift_breakdown,
        [line.total_shifts, line.substituted_days, line.actual_days_worked],
    )
}

fn write_counts(
    out: &mut String,
    name: &str,
    job_title: &str,
    counts: &ShiftCounts,
    [total, substituted, worked]: [u32; 3],
) -> Result<()> {
    let line = format!(
        "{:<24} {:<22} {:>3} {:>3} {:>3} {:>3} {:>3} {:>5} {:>5} {:>5}",
        name,
        job_title,
        counts.get(ShiftCode::ServiceDay),
        counts.get(ShiftCode::RestDay),
        counts.get(ShiftCode::Duty12h),
        counts.get(ShiftCode::Duty24h),
        counts.get(ShiftCode::Duty6h),
        total,
        substituted,
        worked
    );
    writeln!(out, "{line}")?;
    Ok(())
}

fn join<'a, I: IntoIterator<Item = &'a String>>(items: I) -> String {
    items.into_iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Export CSV du quadro: une ligne par sujet, puis totaux et approbation.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvReport;

impl ReportRenderer for CsvReport {
    fn render(&self, report: &MonthlyReport, stamp: Option<&ApprovalStamp>) -> Result<String> {
        let mut buf = Vec::new();
        {
            let mut w = WriterBuilder::new()
                .flexible(true)
                .terminator(Terminator::Any(b'\n'))
                .from_writer(&mut buf);
            let mut header = vec!["nome", "funcao", "tipo"];
            header.extend(ShiftCode::ALL.iter().map(|c| c.short()));
            header.extend(["total", "substituicoes", "dias_trabalhados"]);
            w.write_record(&header)?;

            for line in &report.lines {
                let kind = match line.kind {
                    RowKind::Employee => "funcionario",
                    RowKind::Placeholder => "vaga",
                    RowKind::Floater => "folguista",
                };
                let mut record = vec![line.name.clone(), line.job_title.clone(), kind.to_string()];
                record.extend(number_fields(
                    &line.shift_breakdown,
                    [line.total_shifts, line.substituted_days, line.actual_days_worked],
                ));
                w.write_record(&record)?;
            }

            let totals = &report.totals;
            let mut record = vec!["TOTAL".to_string(), String::new(), String::new()];
            record.extend(number_fields(
                &totals.shift_breakdown,
                [totals.total_shifts, totals.substituted_days, totals.actual_days_worked],
            ));
            w.write_record(&record)?;

            if let Some(stamp) = stamp {
                w.write_record(["aprovado_por", stamp.signer.as_str()])?;
            }
            w.flush()?;
        }
        Ok(String::from_utf8(buf)?)
    }
}

fn number_fields(counts: &ShiftCounts, extra: [u32; 3]) -> Vec<String> {
    let mut buffer = itoa::Buffer::new();
    ShiftCode::ALL
        .iter()
        .map(|c| counts.get(*c))
        .chain(extra)
        .map(|n| buffer.format(n).to_string())
        .collect()
}

/// Export JSON (intégrations).
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReport;

#[derive(Serialize)]
struct JsonEnvelope<'a> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    approval: Option<&'a ApprovalStamp>,
    report: &'a MonthlyReport,
}

impl ReportRenderer for JsonReport {
    fn render(&self, report: &MonthlyReport, stamp: Option<&ApprovalStamp>) -> Result<String> {
        let envelope = JsonEnvelope {
            status: if stamp.is_some() { "approved" } else { "draft" },
            approval: stamp,
            report,
        };
        Ok(serde_json::to_string_pretty(&envelope)?)
    }
}
