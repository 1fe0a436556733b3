use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, warn};

use crate::models::{AuditDetail, AuditInfo, AuditRow, ClientInfo, Question, Topic};

/// Builds the audit form from the joined rows of one audit.
///
/// All rows must belong to the same audit; this is not checked. Returns
/// `None` when there are no rows or when the first row has neither an audit
/// id nor a client id.
pub fn assemble_detail(rows: &[AuditRow]) -> Option<AuditDetail> {
    let Some(first) = rows.first() else {
        warn!("no rows for audit detail");
        return None;
    };

    let (Some(audit_id), Some(client_id)) = (first.audit_id, first.client_id) else {
        warn!(
            audit_id = ?first.audit_id,
            client_id = ?first.client_id,
            "audit detail rows missing audit or client id"
        );
        return None;
    };

    let mut topics: Vec<Topic> = Vec::new();
    let mut topic_index: HashMap<i64, usize> = HashMap::new();
    let mut seen_questions: HashSet<i64> = HashSet::new();
    let mut answers = BTreeMap::new();
    let mut comments = BTreeMap::new();
    let mut photos = BTreeMap::new();
    let mut skipped = 0usize;

    for row in rows {
        let (Some(topic_id), Some(question_id)) = (row.topic_id, row.question_id) else {
            skipped += 1;
            continue;
        };

        let position = *topic_index.entry(topic_id).or_insert_with(|| {
            topics.push(Topic {
                id: topic_id,
                name: row.topic_name.clone(),
                requirements: row.topic_requirements.clone(),
                order: row.topic_order,
                questions: Vec::new(),
            });
            topics.len() - 1
        });

        if seen_questions.insert(question_id) {
            topics[position].questions.push(Question {
                id: question_id,
                text: row.question_text.clone(),
                order: row.question_order,
            });
            comments.insert(question_id, String::new());
            photos.insert(question_id, Vec::new());
        }

        if let Some(status) = row.status {
            answers.insert(question_id, status);
            comments.insert(question_id, row.comment.clone().unwrap_or_default());
            photos.insert(question_id, split_photo_paths(row.photo_paths.as_deref()));
        }
    }

    // Stable sorts: equal display orders keep first-seen order.
    topics.sort_by_key(|topic| topic.order);
    for topic in topics.iter_mut() {
        topic.questions.sort_by_key(|question| question.order);
    }

    debug!(
        audit_id,
        rows = rows.len(),
        topics = topics.len(),
        skipped,
        "audit detail assembled"
    );

    Some(AuditDetail {
        audit: AuditInfo {
            id: audit_id,
            date: first.audit_date,
            comment: first.audit_comment.clone(),
            auditor: first.auditor_name.clone(),
            state: first.audit_state,
        },
        client: ClientInfo {
            id: client_id,
            legal_name: first.client_name.clone(),
            tax_id: first.tax_id.clone(),
            contact_name: first.client_contact.clone(),
            contact_phone: first.client_phone.clone(),
        },
        topics,
        answers,
        comments,
        photos,
    })
}

pub fn split_photo_paths(joined: Option<&str>) -> Vec<String> {
    joined
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|path| !path.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
