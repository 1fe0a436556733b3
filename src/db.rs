use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::{AnswerStatus, AuditRow, AuditState, DashboardRow};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_compliance.clients (id, razao_social, cnpj, responsavel, telefone)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO UPDATE
        SET razao_social = EXCLUDED.razao_social, responsavel = EXCLUDED.responsavel
        "#,
    )
    .bind(1_i64)
    .bind("Transportes Aurora Ltda")
    .bind("12.345.678/0001-90")
    .bind("Paulo Reis")
    .bind("(11) 4002-8922")
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO audit_compliance.auditors (id, nome, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(1_i64)
    .bind("Marina Costa")
    .bind("marina.costa@auditoria.example")
    .execute(pool)
    .await?;

    let topics = vec![
        (1_i64, "Backup Procedures", "Daily backups with tested restores", 1),
        (2_i64, "Access Control", "Named accounts and quarterly reviews", 2),
        (3_i64, "Fire Safety", "Extinguishers inspected and signposted", 3),
    ];

    for (id, name, requirements, order) in topics {
        sqlx::query(
            r#"
            INSERT INTO audit_compliance.topics (id, nome_tema, requisitos, ordem_topico)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(requirements)
        .bind(order)
        .execute(pool)
        .await?;
    }

    let questions = vec![
        (11_i64, 1_i64, "Are backups run every night?", 1),
        (12, 1, "Was a restore tested this quarter?", 2),
        (13, 1, "Is an offsite copy kept?", 3),
        (21, 2, "Are shared accounts disabled?", 1),
        (22, 2, "Was the access review signed off?", 2),
        (31, 3, "Are extinguishers within their inspection date?", 1),
        (32, 3, "Are emergency exits unobstructed?", 2),
    ];

    for (id, topic_id, text, order) in questions {
        sqlx::query(
            r#"
            INSERT INTO audit_compliance.questions (id, id_topico, descricao_pergunta, ordem_pergunta)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(topic_id)
        .bind(text)
        .bind(order)
        .execute(pool)
        .await?;
    }

    let audits = vec![
        (
            101_i64,
            NaiveDate::from_ymd_opt(2025, 1, 14).context("invalid date")?,
            "Kick-off audit",
            "F",
        ),
        (
            102,
            NaiveDate::from_ymd_opt(2025, 3, 3).context("invalid date")?,
            "Quarterly follow-up",
            "F",
        ),
        (
            103,
            NaiveDate::from_ymd_opt(2025, 3, 27).context("invalid date")?,
            "Warehouse visit",
            "A",
        ),
    ];

    for (id, date, comment, state) in audits {
        sqlx::query(
            r#"
            INSERT INTO audit_compliance.audits
            (id, id_cliente, id_usuario, dt_auditoria, observacao_geral, st_auditoria)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(1_i64)
        .bind(1_i64)
        .bind(date)
        .bind(comment)
        .bind(state)
        .execute(pool)
        .await?;
    }

    let answers = vec![
        (101_i64, 11_i64, "CF", "", None),
        (101, 12, "NC", "No restore evidence", None),
        (101, 13, "PC", "Offsite copy is weekly", None),
        (101, 21, "CF", "", None),
        (101, 22, "NE", "", None),
        (101, 31, "NC", "Two extinguishers expired", Some("uploads/101-31-a.jpg,uploads/101-31-b.jpg")),
        (102, 11, "CF", "", None),
        (102, 12, "PC", "Partial restore only", None),
        (102, 13, "CF", "", None),
        (102, 31, "CF", "Replaced", Some("uploads/102-31.jpg")),
        (102, 32, "PC", "Pallets near exit B", None),
        (103, 21, "NC", "Shared login on forklift terminal", None),
        (103, 22, "PC", "", None),
    ];

    for (audit_id, question_id, status, comment, photos) in answers {
        let answer_id: i64 = sqlx::query(
            r#"
            INSERT INTO audit_compliance.answers (id_auditoria, id_pergunta, st_pergunta, comentario)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id_auditoria, id_pergunta) DO UPDATE
            SET st_pergunta = EXCLUDED.st_pergunta, comentario = EXCLUDED.comentario
            RETURNING id
            "#,
        )
        .bind(audit_id)
        .bind(question_id)
        .bind(status)
        .bind(comment)
        .fetch_one(pool)
        .await?
        .get("id");

        sqlx::query("DELETE FROM audit_compliance.files WHERE id_resposta = $1")
            .bind(answer_id)
            .execute(pool)
            .await?;

        for path in photos.into_iter().flat_map(|joined: &str| joined.split(',')) {
            sqlx::query(
                "INSERT INTO audit_compliance.files (id_resposta, tipo, caminho) VALUES ($1, 'Foto', $2)",
            )
            .bind(answer_id)
            .bind(path)
            .execute(pool)
            .await?;
        }
    }

    info!("seed data applied");
    Ok(())
}

fn parse_status(raw: Option<String>) -> anyhow::Result<Option<AnswerStatus>> {
    Ok(raw.map(|value| value.parse()).transpose()?)
}

pub async fn fetch_audit_rows(pool: &PgPool, audit_id: i64) -> anyhow::Result<Vec<AuditRow>> {
    let records = sqlx::query(
        r#"
        SELECT a.id AS id_auditoria, a.dt_auditoria, a.observacao_geral AS observacao,
               u.nome AS nome_auditor, a.st_auditoria::text AS st_auditoria,
               c.id AS id_cliente, c.razao_social AS nome_cliente, c.cnpj,
               c.responsavel AS cliente_responsavel, c.telefone AS cliente_telefone,
               t.id AS id_topico, t.nome_tema, t.requisitos, t.ordem_topico,
               p.id AS id_pergunta, p.descricao_pergunta, p.ordem_pergunta,
               r.st_pergunta::text AS st_pergunta, r.comentario,
               (SELECT string_agg(f.caminho, ',' ORDER BY f.id)
                  FROM audit_compliance.files f
                 WHERE f.id_resposta = r.id) AS caminhos_fotos
        FROM audit_compliance.audits a
        JOIN audit_compliance.clients c ON c.id = a.id_cliente
        LEFT JOIN audit_compliance.auditors u ON u.id = a.id_usuario
        CROSS JOIN audit_compliance.topics t
        JOIN audit_compliance.questions p ON p.id_topico = t.id AND p.is_active
        LEFT JOIN audit_compliance.answers r
               ON r.id_auditoria = a.id AND r.id_pergunta = p.id
        WHERE a.id = $1 AND t.is_active
        ORDER BY t.ordem_topico, p.ordem_pergunta, p.id
        "#,
    )
    .bind(audit_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to load rows for audit {audit_id}"))?;

    let mut rows = Vec::with_capacity(records.len());

    for row in records {
        let state: Option<String> = row.get("st_auditoria");
        rows.push(AuditRow {
            audit_id: row.get("id_auditoria"),
            audit_date: row.get("dt_auditoria"),
            audit_comment: row.get("observacao"),
            auditor_name: row.get("nome_auditor"),
            audit_state: state.map(|value| value.parse::<AuditState>()).transpose()?,
            client_id: row.get("id_cliente"),
            client_name: row.get("nome_cliente"),
            tax_id: row.get("cnpj"),
            client_contact: row.get("cliente_responsavel"),
            client_phone: row.get("cliente_telefone"),
            topic_id: row.get("id_topico"),
            topic_name: row.get("nome_tema"),
            topic_requirements: row.get("requisitos"),
            topic_order: row.get("ordem_topico"),
            question_id: row.get("id_pergunta"),
            question_text: row.get("descricao_pergunta"),
            question_order: row.get("ordem_pergunta"),
            status: parse_status(row.get("st_pergunta"))?,
            comment: row.get("comentario"),
            photo_paths: row.get("caminhos_fotos"),
        });
    }

    Ok(rows)
}

pub async fn fetch_dashboard_rows(
    pool: &PgPool,
    client_id: i64,
    year: i32,
) -> anyhow::Result<Vec<DashboardRow>> {
    let records = sqlx::query(
        r#"
        SELECT a.id AS auditoria_id, a.dt_auditoria,
               t.id AS topico_id, t.nome_tema,
               p.id AS pergunta_id, r.st_pergunta::text AS st_pergunta
        FROM audit_compliance.audits a
        CROSS JOIN audit_compliance.topics t
        JOIN audit_compliance.questions p ON p.id_topico = t.id AND p.is_active
        LEFT JOIN audit_compliance.answers r
               ON r.id_auditoria = a.id AND r.id_pergunta = p.id
        WHERE a.id_cliente = $1
          AND EXTRACT(YEAR FROM a.dt_auditoria)::int = $2
          AND t.is_active
        ORDER BY a.dt_auditoria, a.id, t.ordem_topico, p.ordem_pergunta
        "#,
    )
    .bind(client_id)
    .bind(year)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to load dashboard rows for client {client_id}, {year}"))?;

    let mut rows = Vec::with_capacity(records.len());

    for row in records {
        rows.push(DashboardRow {
            audit_id: row.get("auditoria_id"),
            audit_date: row.get("dt_auditoria"),
            topic_id: row.get("topico_id"),
            topic_name: row.get("nome_tema"),
            question_id: row.get("pergunta_id"),
            status: parse_status(row.get("st_pergunta"))?,
        });
    }

    Ok(rows)
}

pub async fn fetch_audit_years(pool: &PgPool, client_id: i64) -> anyhow::Result<Vec<i32>> {
    let records = sqlx::query(
        r#"
        SELECT DISTINCT EXTRACT(YEAR FROM dt_auditoria)::int AS ano
        FROM audit_compliance.audits
        WHERE id_cliente = $1
        ORDER BY ano
        "#,
    )
    .bind(client_id)
    .fetch_all(pool)
    .await?;

    Ok(records.iter().map(|row| row.get("ano")).collect())
}
