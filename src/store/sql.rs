//! Postgres statement rendering. Values are bound as text and cast to the
//! column type, so every table shares one binding path.

use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};

use crate::model::{spec as spec_of, ColumnType, DbId, LiveConflictPolicy, TableSpec, Uid, UpdatePlan, UpsertStatement};

pub fn bind_text(ty: ColumnType, value: &Value) -> Option<String> {
    match (ty, value) {
        (_, Value::Null) => None,
        (ColumnType::Jsonb, value) => Some(value.to_string()),
        (_, Value::String(s)) => Some(s.clone()),
        (_, value) => Some(value.to_string()),
    }
}

pub fn select_live(spec: &TableSpec, uids: &[Uid]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT t.id, t.uid, jsonb_build_object(");
    let mut attributes = qb.separated(", ");
    for attr in spec.projection {
        attributes.push(format!("'{attr}', t.{attr}"));
    }
    qb.push(format!(
        ") AS attributes FROM {} AS t WHERE t.uid = ANY(",
        spec.table
    ));
    qb.push_bind(uids.to_vec());
    qb.push(") AND t.deleted_at IS NULL");
    qb
}

/// `refs` column mapping each reference column to the uid it points at.
/// Soft-deleted targets are not filtered, so old references still render.
fn push_reference_uids(qb: &mut QueryBuilder<'static, Postgres>, spec: &TableSpec) {
    qb.push("jsonb_build_object(");
    let mut refs = qb.separated(", ");
    for column in spec.reference_columns() {
        if let Some(kind) = column.reference {
            refs.push(format!(
                "'{0}', (SELECT r.uid FROM {1} AS r WHERE r.id = t.{0})",
                column.column,
                spec_of(kind).table
            ));
        }
    }
    qb.push(") AS refs");
}

pub fn select_live_rows(spec: &TableSpec, ids: &[DbId]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT to_jsonb(t) AS row, ");
    push_reference_uids(&mut qb, spec);
    qb.push(format!(" FROM {} AS t WHERE t.id = ANY(", spec.table));
    qb.push_bind(ids.to_vec());
    qb.push(") AND t.deleted_at IS NULL");
    qb
}

/// `INSERT .. ON CONFLICT (natural key) DO UPDATE`. Under the reject policy
/// the update only fires for soft-deleted rows, so live conflicts come back
/// as missing rows rather than errors.
pub fn render_upsert(statement: &UpsertStatement) -> QueryBuilder<'static, Postgres> {
    let spec = statement.spec;
    let columns: Vec<_> = statement.columns().collect();

    let mut qb = QueryBuilder::new(format!("INSERT INTO {} AS t (uid", spec.table));
    for column in &columns {
        qb.push(", ").push(column.column);
    }
    qb.push(") ");

    qb.push_values(statement.rows.iter(), |mut values, row| {
        values.push_bind(row.uid.clone());
        for column in &columns {
            let value = row.values.get(column.column).unwrap_or(&Value::Null);
            values
                .push_bind(bind_text(column.ty, value))
                .push_unseparated(format!("::{}", column.ty.sql_name()));
        }
    });

    if !spec.natural_key.is_empty() {
        qb.push(format!(
            " ON CONFLICT ({}) DO UPDATE SET ",
            spec.natural_key.join(", ")
        ));
        for column in statement.update_columns() {
            qb.push(format!("{0} = EXCLUDED.{0}, ", column.column));
        }
        qb.push("deleted_at = NULL, updated_at = NOW()");
        if statement.live_conflict == LiveConflictPolicy::Reject {
            qb.push(" WHERE t.deleted_at IS NOT NULL");
        }
    }

    qb.push(" RETURNING (t.xmax = 0) AS inserted, to_jsonb(t) AS row, ");
    push_reference_uids(&mut qb, spec);
    qb
}

/// One UPDATE for all targets; each changed column gets a CASE on the row id
/// that falls back to the current value.
pub fn render_update(plan: &UpdatePlan) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("UPDATE {} AS t SET ", plan.spec.table));

    for assignment in &plan.assignments {
        let column = assignment.column;
        qb.push(format!("{} = CASE t.id", column.column));
        for (id, value) in &assignment.arms {
            qb.push(" WHEN ").push_bind(*id).push(" THEN ");
            qb.push_bind(bind_text(column.ty, value))
                .push(format!("::{}", column.ty.sql_name()));
        }
        qb.push(format!(" ELSE t.{} END, ", column.column));
    }

    qb.push("updated_at = CASE WHEN t.id = ANY(")
        .push_bind(plan.touched.clone())
        .push(") THEN NOW() ELSE t.updated_at END");

    qb.push(" WHERE t.id = ANY(")
        .push_bind(plan.targets.clone())
        .push(") AND t.deleted_at IS NULL RETURNING to_jsonb(t) AS row, ");
    push_reference_uids(&mut qb, plan.spec);
    qb
}
