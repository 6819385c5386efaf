use crate::model::{Employee, EmployeeId, MonthScope, Subject};
use crate::storage::ScheduleBook;
use anyhow::{bail, Context};
use csv::{ReaderBuilder, WriterBuilder};
use std::path::Path;

/// Import du cadastre: header `id,name,job_title,registry_or_tax_id,unit[,active]`
pub fn import_employees_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Employee>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let id = rec.get(0).context("missing id")?.trim();
        let name = rec.get(1).context("missing name")?.trim();
        let job_title = rec.get(2).context("missing job_title")?.trim();
        let registry = rec.get(3).context("missing registry_or_tax_id")?.trim();
        let unit = rec.get(4).context("missing unit")?.trim();
        if id.is_empty() || name.is_empty() || job_title.is_empty() || unit.is_empty() {
            bail!("invalid employee row (empty field) for id {id:?}");
        }
        let mut employee = Employee::new(EmployeeId::new(id), name, job_title, unit);
        employee.registry_or_tax_id = registry.to_string();
        if let Some(flag) = rec.get(5) {
            let flag = flag.trim();
            if !flag.is_empty() {
                employee.active =
                    parse_bool(flag).with_context(|| format!("invalid active value for id {id}"))?;
            }
        }
        out.push(employee);
    }
    Ok(out)
}

fn parse_bool(s: &str) -> anyhow::Result<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "sim" | "s" => Ok(true),
        "false" | "0" | "no" | "n" | "não" | "nao" => Ok(false),
        _ => bail!("expected boolean"),
    }
}

/// Export CSV de la grille: header `nome,funcao,1,2,…,<fin du mois>`
pub fn export_month_csv<P: AsRef<Path>>(
    path: P,
    scope: &MonthScope,
    roster: &[Subject],
    book: &ScheduleBook,
) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    let month_length = scope.days_in_month();

    let mut buffer = itoa::Buffer::new();
    let mut header = vec!["nome".to_string(), "funcao".to_string()];
    header.extend((1..=month_length).map(|d| buffer.format(d).to_string()));
    w.write_record(&header)?;

    for subject in roster {
        let key = scope.key(subject.id());
        let mut record = vec![subject.display_name().to_string(), subject.job_title().to_string()];
        record.extend((1..=month_length).map(|day| {
            let code = book.cell(&key, day).map(|c| c.short()).unwrap_or("");
            match book.substitution(&key, day) {
                Some(_) => format!("{code}*"),
                None => code.to_string(),
            }
        }));
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_portuguese_booleans() {
        assert!(parse_bool("Sim").unwrap());
        assert!(!parse_bool("NÃO").unwrap());
        assert!(parse_bool("talvez").is_err());
    }
}
