use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("unknown answer status: {0:?} (expected CF, PC, NC or NE)")]
    UnknownAnswerStatus(String),

    #[error("unknown audit state: {0:?} (expected A or F)")]
    UnknownAuditState(String),
}

/// Answer given to one question in one audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerStatus {
    #[serde(rename = "CF")]
    Compliant,
    #[serde(rename = "PC")]
    PartiallyCompliant,
    #[serde(rename = "NC")]
    NonCompliant,
    #[serde(rename = "NE")]
    NotEvaluated,
}

impl AnswerStatus {
    /// Scoring weight, or `None` when the answer stays out of the denominator.
    pub fn weight(self) -> Option<f64> {
        match self {
            AnswerStatus::Compliant => Some(1.0),
            AnswerStatus::PartiallyCompliant => Some(0.5),
            AnswerStatus::NonCompliant => Some(0.0),
            AnswerStatus::NotEvaluated => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            AnswerStatus::Compliant => "CF",
            AnswerStatus::PartiallyCompliant => "PC",
            AnswerStatus::NonCompliant => "NC",
            AnswerStatus::NotEvaluated => "NE",
        }
    }
}

impl FromStr for AnswerStatus {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "CF" => Ok(AnswerStatus::Compliant),
            "PC" => Ok(AnswerStatus::PartiallyCompliant),
            "NC" => Ok(AnswerStatus::NonCompliant),
            "NE" => Ok(AnswerStatus::NotEvaluated),
            other => Err(ModelError::UnknownAnswerStatus(other.to_string())),
        }
    }
}

impl fmt::Display for AnswerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditState {
    #[serde(rename = "A")]
    Open,
    #[serde(rename = "F")]
    Finalized,
}

impl FromStr for AuditState {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "A" => Ok(AuditState::Open),
            "F" => Ok(AuditState::Finalized),
            other => Err(ModelError::UnknownAuditState(other.to_string())),
        }
    }
}

/// One joined row for a single audit: audit × topic × question, with the
/// latest answer for that question if there is one.
#[derive(Debug, Clone, Default)]
pub struct AuditRow {
    pub audit_id: Option<i64>,
    pub audit_date: Option<NaiveDate>,
    pub audit_comment: Option<String>,
    pub auditor_name: Option<String>,
    pub audit_state: Option<AuditState>,
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub tax_id: Option<String>,
    pub client_contact: Option<String>,
    pub client_phone: Option<String>,
    pub topic_id: Option<i64>,
    pub topic_name: Option<String>,
    pub topic_requirements: Option<String>,
    pub topic_order: i32,
    pub question_id: Option<i64>,
    pub question_text: Option<String>,
    pub question_order: i32,
    pub status: Option<AnswerStatus>,
    pub comment: Option<String>,
    pub photo_paths: Option<String>,
}

/// One row of a client-year dashboard query. Column names follow the
/// exported CSV layout.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardRow {
    #[serde(rename = "auditoria_id")]
    pub audit_id: i64,
    #[serde(rename = "dt_auditoria")]
    pub audit_date: NaiveDate,
    #[serde(rename = "topico_id")]
    pub topic_id: Option<i64>,
    #[serde(rename = "nome_tema", default)]
    pub topic_name: String,
    #[serde(rename = "pergunta_id")]
    pub question_id: Option<i64>,
    #[serde(rename = "st_pergunta")]
    pub status: Option<AnswerStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditInfo {
    pub id: i64,
    #[serde(rename = "dt_auditoria")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "observacao")]
    pub comment: Option<String>,
    #[serde(rename = "auditorResponsavel")]
    pub auditor: Option<String>,
    #[serde(rename = "st_auditoria")]
    pub state: Option<AuditState>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientInfo {
    pub id: i64,
    #[serde(rename = "razao_social")]
    pub legal_name: Option<String>,
    #[serde(rename = "cnpj")]
    pub tax_id: Option<String>,
    #[serde(rename = "responsavel")]
    pub contact_name: Option<String>,
    #[serde(rename = "telefone")]
    pub contact_phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub id: i64,
    #[serde(rename = "descricao_pergunta")]
    pub text: Option<String>,
    #[serde(rename = "ordem_pergunta")]
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Topic {
    pub id: i64,
    #[serde(rename = "nome_tema")]
    pub name: Option<String>,
    #[serde(rename = "requisitos")]
    pub requirements: Option<String>,
    #[serde(rename = "ordem_topico")]
    pub order: i32,
    #[serde(rename = "perguntas")]
    pub questions: Vec<Question>,
}

/// Editable audit form: metadata, ordered topics and the per-question
/// overlay of answers, comments and photos.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditDetail {
    #[serde(rename = "auditoriaInfo")]
    pub audit: AuditInfo,
    #[serde(rename = "clienteInfo")]
    pub client: ClientInfo,
    #[serde(rename = "topicos")]
    pub topics: Vec<Topic>,
    #[serde(rename = "respostas")]
    pub answers: BTreeMap<i64, AnswerStatus>,
    #[serde(rename = "observacoes")]
    pub comments: BTreeMap<i64, String>,
    #[serde(rename = "fotos")]
    pub photos: BTreeMap<i64, Vec<String>>,
}

/// One topic's row of the topic × month matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicMonthly {
    pub id: i64,
    pub name: String,
    pub months: [Option<u8>; 12],
}

impl Serialize for TopicMonthly {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + MONTH_ABBREVIATIONS.len()))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("nome_tema", &self.name)?;
        for (abbreviation, value) in MONTH_ABBREVIATIONS.iter().zip(self.months.iter()) {
            map.serialize_entry(abbreviation, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyResult {
    #[serde(rename = "mes")]
    pub label: String,
    #[serde(rename = "resultado")]
    pub result: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    #[serde(rename = "processos")]
    pub topics: Vec<TopicMonthly>,
    #[serde(rename = "resultadosMensais")]
    pub monthly: Vec<MonthlyResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceBand {
    Compliant,
    Attention,
    Critical,
    NoData,
}

impl ComplianceBand {
    pub fn from_percentage(value: Option<u8>) -> Self {
        match value {
            None => ComplianceBand::NoData,
            Some(v) if v >= 80 => ComplianceBand::Compliant,
            Some(v) if v >= 50 => ComplianceBand::Attention,
            Some(_) => ComplianceBand::Critical,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ComplianceBand::Compliant => "compliant",
            ComplianceBand::Attention => "attention",
            ComplianceBand::Critical => "critical",
            ComplianceBand::NoData => "no data",
        }
    }
}
