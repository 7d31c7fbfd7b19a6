//! PostgreSQL workflow store.
//!
//! The graph is kept in a JSONB `graph_data` column in its wire form
//! (`{ nodes, edges }`), so a reload hands back exactly what was saved.

use super::{StoreError, WorkflowStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailflow_core::{Result, WorkflowId};
use mailflow_workflow::{RunStats, Workflow, WorkflowGraph, WorkflowMetadata, WorkflowSummary};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use tracing::instrument;

/// Workflow store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgWorkflowStore {
    pool: PgPool,
}

impl PgWorkflowStore {
    /// Creates a new store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn database_error(e: sqlx::Error) -> StoreError {
    StoreError::Database {
        details: e.to_string(),
    }
}

fn parse_id(raw: &str) -> std::result::Result<WorkflowId, StoreError> {
    WorkflowId::from_str(raw).map_err(|e| StoreError::Decode {
        id: raw.to_string(),
        reason: e.to_string(),
    })
}

fn decode_runs(id: &str, total_runs: i64) -> std::result::Result<u64, StoreError> {
    u64::try_from(total_runs).map_err(|_| StoreError::Decode {
        id: id.to_string(),
        reason: format!("negative run count {total_runs}"),
    })
}

fn decode_node_count(id: &str, node_count: i32) -> std::result::Result<usize, StoreError> {
    usize::try_from(node_count).map_err(|_| StoreError::Decode {
        id: id.to_string(),
        reason: format!("negative node count {node_count}"),
    })
}

/// Row type for workflow queries.
#[derive(FromRow)]
struct WorkflowRow {
    id: String,
    name: String,
    description: Option<String>,
    is_active: bool,
    graph_data: serde_json::Value,
    total_runs: i64,
    success_rate: f64,
    last_run_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkflowRow {
    fn try_into_workflow(self) -> std::result::Result<Workflow, StoreError> {
        let id = parse_id(&self.id)?;
        let graph: WorkflowGraph =
            serde_json::from_value(self.graph_data).map_err(|e| StoreError::Decode {
                id: self.id.clone(),
                reason: e.to_string(),
            })?;

        Ok(Workflow {
            id,
            metadata: WorkflowMetadata {
                name: self.name,
                description: self.description,
                is_active: self.is_active,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            stats: RunStats {
                total_runs: decode_runs(&self.id, self.total_runs)?,
                success_rate: self.success_rate,
                last_run_at: self.last_run_at,
            },
            graph,
        })
    }
}

/// Row type for listings; the graph itself is not loaded.
#[derive(FromRow)]
struct WorkflowSummaryRow {
    id: String,
    name: String,
    description: Option<String>,
    is_active: bool,
    node_count: i32,
    total_runs: i64,
    success_rate: f64,
    last_run_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl WorkflowSummaryRow {
    fn try_into_summary(self) -> std::result::Result<WorkflowSummary, StoreError> {
        Ok(WorkflowSummary {
            id: parse_id(&self.id)?,
            name: self.name,
            description: self.description,
            is_active: self.is_active,
            node_count: decode_node_count(&self.id, self.node_count)?,
            stats: RunStats {
                total_runs: decode_runs(&self.id, self.total_runs)?,
                success_rate: self.success_rate,
                last_run_at: self.last_run_at,
            },
            updated_at: self.updated_at,
        })
    }
}

/// Column values for inserts and updates.
struct WorkflowParams {
    graph_data: serde_json::Value,
    total_runs: i64,
}

impl WorkflowParams {
    fn encode(workflow: &Workflow) -> std::result::Result<Self, StoreError> {
        let graph_data =
            serde_json::to_value(&workflow.graph).map_err(|e| StoreError::Encode {
                id: workflow.id,
                reason: e.to_string(),
            })?;
        let total_runs =
            i64::try_from(workflow.stats.total_runs).map_err(|_| StoreError::Encode {
                id: workflow.id,
                reason: "run count out of range".to_string(),
            })?;
        Ok(Self {
            graph_data,
            total_runs,
        })
    }
}

#[async_trait]
impl WorkflowStore for PgWorkflowStore {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<WorkflowSummary>, StoreError> {
        let rows: Vec<WorkflowSummaryRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, is_active,
                   COALESCE(jsonb_array_length(graph_data->'nodes'), 0) AS node_count,
                   total_runs, success_rate, last_run_at, updated_at
            FROM workflows
            ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(rows
            .into_iter()
            .map(WorkflowSummaryRow::try_into_summary)
            .collect::<std::result::Result<_, _>>()?)
    }

    #[instrument(skip(self), fields(workflow_id = %id))]
    async fn get(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        let row: Option<WorkflowRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, is_active, graph_data,
                   total_runs, success_rate, last_run_at, created_at, updated_at
            FROM workflows
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        match row {
            Some(r) => Ok(Some(r.try_into_workflow()?)),
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(workflow_id = %workflow.id))]
    async fn create(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let params = WorkflowParams::encode(workflow)?;

        let result = sqlx::query(
            r#"
            INSERT INTO workflows
                (id, name, description, is_active, graph_data,
                 total_runs, success_rate, last_run_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(workflow.id.to_string())
        .bind(&workflow.metadata.name)
        .bind(&workflow.metadata.description)
        .bind(workflow.metadata.is_active)
        .bind(&params.graph_data)
        .bind(params.total_runs)
        .bind(workflow.stats.success_rate)
        .bind(workflow.stats.last_run_at)
        .bind(workflow.metadata.created_at)
        .bind(workflow.metadata.updated_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists { id: workflow.id }.into());
        }
        Ok(())
    }

    #[instrument(skip_all, fields(workflow_id = %workflow.id))]
    async fn update(&self, workflow: &Workflow) -> Result<bool, StoreError> {
        let params = WorkflowParams::encode(workflow)?;

        let result = sqlx::query(
            r#"
            UPDATE workflows
            SET name = $2, description = $3, is_active = $4, graph_data = $5,
                total_runs = $6, success_rate = $7, last_run_at = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(workflow.id.to_string())
        .bind(&workflow.metadata.name)
        .bind(&workflow.metadata.description)
        .bind(workflow.metadata.is_active)
        .bind(&params.graph_data)
        .bind(params.total_runs)
        .bind(workflow.stats.success_rate)
        .bind(workflow.stats.last_run_at)
        .bind(workflow.metadata.updated_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(workflow_id = %id))]
    async fn delete(&self, id: WorkflowId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM workflows
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(result.rows_affected() > 0)
    }
}
