use std::io::Read;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::models::DashboardRow;

/// Reads an exported dashboard row set. Expected header:
/// `auditoria_id,dt_auditoria,topico_id,nome_tema,pergunta_id,st_pergunta`.
pub fn read_dashboard_csv(csv_path: &Path) -> anyhow::Result<Vec<DashboardRow>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let rows = parse_dashboard_rows(file)
        .with_context(|| format!("failed to parse {}", csv_path.display()))?;
    info!(rows = rows.len(), path = %csv_path.display(), "dashboard rows loaded from csv");
    Ok(rows)
}

pub fn parse_dashboard_rows<R: Read>(input: R) -> anyhow::Result<Vec<DashboardRow>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    let mut rows = Vec::new();

    for (line, result) in reader.deserialize::<DashboardRow>().enumerate() {
        let row = result.with_context(|| format!("invalid row {}", line + 1))?;
        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerStatus;
    use chrono::NaiveDate;

    #[test]
    fn parses_rows_with_blank_optional_fields() {
        let data = "\
auditoria_id,dt_auditoria,topico_id,nome_tema,pergunta_id,st_pergunta
101,2025-01-14,1,Backup Procedures,11,CF
101,2025-01-14,1,Backup Procedures,12,
101,2025-01-14,,Orphan,13,NC
";
        let rows = parse_dashboard_rows(data.as_bytes()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].audit_id, 101);
        assert_eq!(rows[0].audit_date, NaiveDate::from_ymd_opt(2025, 1, 14).unwrap());
        assert_eq!(rows[0].status, Some(AnswerStatus::Compliant));
        assert_eq!(rows[1].status, None);
        assert_eq!(rows[2].topic_id, None);
    }

    #[test]
    fn rejects_unknown_status_codes() {
        let data = "\
auditoria_id,dt_auditoria,topico_id,nome_tema,pergunta_id,st_pergunta
101,2025-01-14,1,Backup Procedures,11,OK
";
        let err = parse_dashboard_rows(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("invalid row 1"));
    }
}
