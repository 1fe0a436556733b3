use std::fmt::Write;

use crate::dashboard;
use crate::models::{ComplianceBand, Dashboard, MONTH_ABBREVIATIONS};

fn cell(value: Option<u8>) -> String {
    match value {
        Some(v) => format!("{v}%"),
        None => "—".to_string(),
    }
}

pub fn build_report(client_label: &str, year: i32, dashboard: &Dashboard) -> String {
    let overall = dashboard::overall_score(dashboard);

    let mut output = String::new();

    let _ = writeln!(output, "# Compliance Dashboard");
    let _ = writeln!(output, "Generated for {} ({})", client_label, year);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall Score");
    let _ = writeln!(
        output,
        "{} ({})",
        cell(overall),
        ComplianceBand::from_percentage(overall).label()
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Topics by Month");

    if dashboard.topics.is_empty() {
        let _ = writeln!(output, "No audits recorded for this year.");
    } else {
        let header: Vec<String> = MONTH_ABBREVIATIONS
            .iter()
            .map(|month| month.to_uppercase())
            .collect();
        let _ = writeln!(output, "| Topic | {} |", header.join(" | "));
        let _ = writeln!(output, "|---|{}", "---|".repeat(MONTH_ABBREVIATIONS.len()));
        for topic in dashboard.topics.iter() {
            let cells: Vec<String> = topic.months.iter().map(|value| cell(*value)).collect();
            let _ = writeln!(output, "| {} | {} |", topic.name, cells.join(" | "));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Results");

    for month in dashboard.monthly.iter() {
        let _ = writeln!(
            output,
            "- {}: {} ({})",
            month.label,
            cell(month.result),
            ComplianceBand::from_percentage(month.result).label()
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerStatus, DashboardRow};
    use chrono::NaiveDate;

    #[test]
    fn renders_matrix_and_null_cells() {
        let rows = vec![DashboardRow {
            audit_id: 1,
            audit_date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            topic_id: Some(1),
            topic_name: "Backup Procedures".to_string(),
            question_id: Some(10),
            status: Some(AnswerStatus::PartiallyCompliant),
        }];
        let dashboard = dashboard::aggregate(&rows, 2024);
        let report = build_report("Transportes Aurora Ltda", 2024, &dashboard);

        assert!(report.contains("Generated for Transportes Aurora Ltda (2024)"));
        assert!(report.contains("50% (attention)"));
        assert!(report.contains("| Backup Procedures | — | 50% | — |"));
        assert!(report.contains("- FEV/24: 50% (attention)"));
        assert!(report.contains("- JAN/24: — (no data)"));
    }

    #[test]
    fn empty_dashboard_still_lists_months() {
        let dashboard = dashboard::aggregate(&[], 2025);
        let report = build_report("client 9", 2025, &dashboard);

        assert!(report.contains("No audits recorded for this year."));
        assert!(report.contains("- DEZ/25: — (no data)"));
        assert!(report.contains("— (no data)\n\n## Topics"));
    }
}
