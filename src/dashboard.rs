use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use crate::models::{
    AnswerStatus, Dashboard, DashboardRow, MonthlyResult, TopicMonthly, MONTH_ABBREVIATIONS,
};

/// Running sum/count of fractions in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    pub fn percentage(&self) -> Option<u8> {
        self.mean().map(to_percentage)
    }
}

fn to_percentage(fraction: f64) -> u8 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}

#[derive(Debug)]
struct TopicAnswers {
    id: i64,
    name: String,
    seen: HashSet<i64>,
    statuses: Vec<Option<AnswerStatus>>,
}

#[derive(Debug)]
struct AuditAnswers {
    month: usize,
    topics: Vec<TopicAnswers>,
    topic_index: HashMap<i64, usize>,
}

/// Weighted mean over answered questions; `None` when nothing counts.
pub fn topic_score(statuses: &[Option<AnswerStatus>]) -> Option<f64> {
    let mut score = Accumulator::default();
    for weight in statuses.iter().flatten().filter_map(|status| status.weight()) {
        score.add(weight);
    }
    score.mean()
}

/// Zero-based calendar month of an audit date.
pub fn month_index(date: NaiveDate) -> usize {
    date.month0() as usize
}

pub fn month_label(month: usize, year: i32) -> String {
    format!(
        "{}/{:02}",
        MONTH_ABBREVIATIONS[month].to_uppercase(),
        year.rem_euclid(100)
    )
}

fn group_rows(rows: &[DashboardRow]) -> (Vec<AuditAnswers>, usize) {
    let mut audits: Vec<AuditAnswers> = Vec::new();
    let mut audit_index: HashMap<i64, usize> = HashMap::new();
    let mut skipped = 0usize;

    for row in rows {
        let (Some(topic_id), Some(question_id)) = (row.topic_id, row.question_id) else {
            skipped += 1;
            continue;
        };

        let audit_position = *audit_index.entry(row.audit_id).or_insert_with(|| {
            audits.push(AuditAnswers {
                month: month_index(row.audit_date),
                topics: Vec::new(),
                topic_index: HashMap::new(),
            });
            audits.len() - 1
        });
        let audit = &mut audits[audit_position];

        let topic_position = *audit.topic_index.entry(topic_id).or_insert_with(|| {
            audit.topics.push(TopicAnswers {
                id: topic_id,
                name: row.topic_name.clone(),
                seen: HashSet::new(),
                statuses: Vec::new(),
            });
            audit.topics.len() - 1
        });
        let topic = &mut audit.topics[topic_position];

        if topic.seen.insert(question_id) {
            topic.statuses.push(row.status);
        }
    }

    (audits, skipped)
}

/// Rolls one client-year of answers into the topic × month matrix and the
/// monthly overall series.
///
/// Rows are trusted to belong to the requested client and year. The monthly
/// overall is a mean of per-audit averages, not of topic cells.
pub fn aggregate(rows: &[DashboardRow], year: i32) -> Dashboard {
    let (audits, skipped) = group_rows(rows);
    if skipped > 0 {
        warn!(skipped, "dashboard rows missing topic or question id were skipped");
    }

    let mut topic_order: Vec<(i64, String)> = Vec::new();
    let mut topic_months: HashMap<(i64, usize), Accumulator> = HashMap::new();
    let mut monthly: [Accumulator; 12] = Default::default();

    for audit in &audits {
        let mut audit_average = Accumulator::default();

        for topic in &audit.topics {
            if !topic_order.iter().any(|(id, _)| *id == topic.id) {
                topic_order.push((topic.id, topic.name.clone()));
            }

            if let Some(score) = topic_score(&topic.statuses) {
                topic_months
                    .entry((topic.id, audit.month))
                    .or_default()
                    .add(score);
                audit_average.add(score);
            }
        }

        if let Some(average) = audit_average.mean() {
            monthly[audit.month].add(average);
        }
    }

    let topics = topic_order
        .into_iter()
        .map(|(id, name)| {
            let mut months = [None; 12];
            for (month, cell) in months.iter_mut().enumerate() {
                *cell = topic_months
                    .get(&(id, month))
                    .and_then(Accumulator::percentage);
            }
            TopicMonthly { id, name, months }
        })
        .collect::<Vec<_>>();

    let monthly = monthly
        .iter()
        .enumerate()
        .map(|(month, accumulator)| MonthlyResult {
            label: month_label(month, year),
            result: accumulator.percentage(),
        })
        .collect();

    debug!(
        rows = rows.len(),
        audits = audits.len(),
        topics = topics.len(),
        year,
        "dashboard aggregated"
    );

    Dashboard { topics, monthly }
}

/// Yearly score: rounded mean of the months that have a result.
pub fn overall_score(dashboard: &Dashboard) -> Option<u8> {
    let results: Vec<u8> = dashboard.monthly.iter().filter_map(|m| m.result).collect();
    if results.is_empty() {
        return None;
    }
    let total: u32 = results.iter().map(|&r| u32::from(r)).sum();
    Some((f64::from(total) / results.len() as f64).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use AnswerStatus::{
        Compliant as CF, NonCompliant as NC, NotEvaluated as NE, PartiallyCompliant as PC,
    };

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn row(
        audit_id: i64,
        audit_date: NaiveDate,
        topic_id: i64,
        question_id: i64,
        status: Option<AnswerStatus>,
    ) -> DashboardRow {
        DashboardRow {
            audit_id,
            audit_date,
            topic_id: Some(topic_id),
            topic_name: format!("Topic {topic_id}"),
            question_id: Some(question_id),
            status,
        }
    }

    #[test]
    fn topic_score_weights_answers() {
        let score = topic_score(&[Some(CF), Some(PC), Some(NC)]).unwrap();
        assert_eq!(to_percentage(score), 50);
    }

    #[test]
    fn topic_score_ignores_unevaluated_and_missing() {
        assert_eq!(topic_score(&[Some(NE), Some(NE)]), None);
        assert_eq!(topic_score(&[None, Some(NE)]), None);
        assert_eq!(topic_score(&[None, Some(CF), Some(NE)]), Some(1.0));
    }

    #[test]
    fn empty_input_keeps_twelve_null_months() {
        let dashboard = aggregate(&[], 2024);
        assert!(dashboard.topics.is_empty());
        assert_eq!(dashboard.monthly.len(), 12);
        assert_eq!(dashboard.monthly[0].label, "JAN/24");
        assert_eq!(dashboard.monthly[11].label, "DEZ/24");
        assert!(dashboard.monthly.iter().all(|m| m.result.is_none()));
        assert_eq!(overall_score(&dashboard), None);
    }

    #[test]
    fn cells_without_audits_stay_null() {
        let rows = vec![
            row(1, date(1, 10), 1, 100, Some(CF)),
            row(1, date(1, 10), 2, 200, Some(NC)),
            row(2, date(2, 5), 1, 100, Some(PC)),
        ];
        let dashboard = aggregate(&rows, 2024);

        assert_eq!(dashboard.topics.len(), 2);
        assert_eq!(dashboard.topics[0].months[0], Some(100));
        assert_eq!(dashboard.topics[0].months[1], Some(50));
        assert_eq!(dashboard.topics[1].months[0], Some(0));
        assert_eq!(dashboard.topics[1].months[1], None);
        assert_eq!(dashboard.topics[1].months[5], None);
    }

    #[test]
    fn unevaluated_topic_is_null_but_still_listed() {
        let rows = vec![
            row(1, date(4, 1), 1, 100, Some(NE)),
            row(1, date(4, 1), 1, 101, Some(NE)),
            row(1, date(4, 1), 2, 200, Some(CF)),
        ];
        let dashboard = aggregate(&rows, 2024);

        assert_eq!(dashboard.topics[0].id, 1);
        assert_eq!(dashboard.topics[0].months[3], None);
        assert_eq!(dashboard.topics[1].months[3], Some(100));
        assert_eq!(dashboard.monthly[3].result, Some(100));
    }

    #[test]
    fn monthly_overall_averages_audits_not_topics() {
        // Audit 1: one topic at 80%. Audit 2: topics at 80%, 50%, 50%.
        let mut rows = Vec::new();
        for audit_id in [1, 2] {
            let day = date(6, audit_id as u32 * 10);
            rows.extend([
                row(audit_id, day, 1, 100, Some(CF)),
                row(audit_id, day, 1, 101, Some(CF)),
                row(audit_id, day, 1, 102, Some(CF)),
                row(audit_id, day, 1, 103, Some(CF)),
                row(audit_id, day, 1, 104, Some(NC)),
            ]);
        }
        rows.extend([
            row(2, date(6, 20), 2, 200, Some(PC)),
            row(2, date(6, 20), 3, 300, Some(CF)),
            row(2, date(6, 20), 3, 301, Some(NC)),
        ]);
        let dashboard = aggregate(&rows, 2024);

        // Flattening the four topic scores would give 65%.
        assert_eq!(dashboard.monthly[5].result, Some(70));
        assert_eq!(dashboard.topics[0].months[5], Some(80));
        assert_eq!(dashboard.topics[1].months[5], Some(50));
    }

    #[test]
    fn audits_without_eligible_topics_do_not_dilute_the_month() {
        let rows = vec![
            row(1, date(9, 1), 1, 100, Some(CF)),
            row(2, date(9, 15), 1, 100, Some(NE)),
            row(3, date(9, 28), 1, 100, None),
        ];
        let dashboard = aggregate(&rows, 2024);
        assert_eq!(dashboard.monthly[8].result, Some(100));
    }

    #[test]
    fn duplicate_question_rows_keep_first_status() {
        let rows = vec![
            row(1, date(1, 2), 1, 100, Some(CF)),
            row(1, date(1, 2), 1, 100, Some(NC)),
        ];
        let dashboard = aggregate(&rows, 2024);
        assert_eq!(dashboard.topics[0].months[0], Some(100));
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let mut orphan = row(1, date(1, 2), 1, 100, Some(NC));
        orphan.question_id = None;
        let rows = vec![orphan, row(1, date(1, 2), 1, 101, Some(CF))];
        let dashboard = aggregate(&rows, 2024);
        assert_eq!(dashboard.topics[0].months[0], Some(100));
    }

    #[test]
    fn aggregation_is_deterministic() {
        let rows = vec![
            row(1, date(1, 2), 2, 200, Some(PC)),
            row(1, date(1, 2), 1, 100, Some(CF)),
            row(2, date(3, 9), 1, 100, Some(NC)),
        ];
        assert_eq!(aggregate(&rows, 2024), aggregate(&rows, 2024));
    }

    #[test]
    fn overall_score_averages_non_null_months() {
        let rows = vec![
            row(1, date(1, 2), 1, 100, Some(CF)),
            row(2, date(2, 2), 1, 100, Some(PC)),
            row(3, date(3, 2), 1, 100, Some(PC)),
        ];
        let dashboard = aggregate(&rows, 2024);
        // (100 + 50 + 50) / 3 = 66.67
        assert_eq!(overall_score(&dashboard), Some(67));
    }

    #[test]
    fn labels_use_two_digit_year() {
        assert_eq!(month_label(0, 2024), "JAN/24");
        assert_eq!(month_label(8, 2005), "SET/05");
    }
}
