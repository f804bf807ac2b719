//! PostgreSQL store adapter
//!
//! Connection pooling via deadpool-postgres. Rows cross the boundary as
//! `jsonb`: reads wrap each row in `to_jsonb`, writes go through
//! `jsonb_populate_recordset`, so the adapter needs no per-table column
//! knowledge. Identifiers are validated before interpolation; all values
//! are bound as parameters.

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;

use strata_core::{
    FilterExpr, FilterOperator, OrderDirection, Row, StoreError, StrataResult,
};

use crate::store::{validate_identifier, SelectQuery, StoreAdapter};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// PostgreSQL connection pool configuration.
#[derive(Debug, Clone)]
pub struct PgConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
}

impl Default for PgConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "strata".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
        }
    }
}

impl PgConfig {
    /// Create a new configuration from environment variables.
    ///
    /// Environment variables:
    /// - `STRATA_PG_HOST` (default: localhost)
    /// - `STRATA_PG_PORT` (default: 5432)
    /// - `STRATA_PG_NAME` (default: strata)
    /// - `STRATA_PG_USER` (default: postgres)
    /// - `STRATA_PG_PASSWORD` (default: empty)
    /// - `STRATA_PG_POOL_SIZE` (default: 16)
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("STRATA_PG_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("STRATA_PG_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("STRATA_PG_NAME").unwrap_or_else(|_| "strata".to_string()),
            user: std::env::var("STRATA_PG_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("STRATA_PG_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("STRATA_PG_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> StrataResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.pool = Some(PoolConfig::new(self.max_size));

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| {
                StoreError::ConnectionFailed {
                    reason: format!("failed to create pool: {}", e),
                }
                .into()
            })
    }
}

// ============================================================================
// SQL BUILDING
// ============================================================================

fn quoted(name: &str) -> String {
    format!("\"{}\"", name)
}

fn jsonb_field(column: &str) -> String {
    format!("to_jsonb(t)->'{}'", column)
}

fn scalar_operator(op: FilterOperator) -> Option<&'static str> {
    match op {
        FilterOperator::Eq => Some("="),
        FilterOperator::Ne => Some("<>"),
        FilterOperator::Gt => Some(">"),
        FilterOperator::Lt => Some("<"),
        FilterOperator::Gte => Some(">="),
        FilterOperator::Lte => Some("<="),
        FilterOperator::Contains | FilterOperator::In => None,
    }
}

/// Render `filters` as a conjunction, pushing one jsonb parameter each.
/// Parameter numbering continues from `params.len()`.
fn build_predicates(
    filters: &[FilterExpr],
    params: &mut Vec<serde_json::Value>,
) -> StrataResult<String> {
    let mut predicates = Vec::with_capacity(filters.len());
    for filter in filters {
        validate_identifier(&filter.field)?;
        params.push(filter.value.clone());
        let index = params.len();
        let predicate = match filter.operator {
            FilterOperator::Contains => format!(
                "(to_jsonb(t)->>'{}') LIKE '%' || (${}::jsonb #>> '{{}}') || '%'",
                filter.field, index
            ),
            FilterOperator::In => {
                format!("${}::jsonb @> ({})", index, jsonb_field(&filter.field))
            }
            op => {
                // scalar_operator covers every remaining variant
                let sql_op = scalar_operator(op).unwrap_or("=");
                format!("{} {} ${}::jsonb", jsonb_field(&filter.field), sql_op, index)
            }
        };
        predicates.push(predicate);
    }
    Ok(predicates.join(" AND "))
}

fn build_select(
    table: &str,
    query: &SelectQuery,
) -> StrataResult<(String, Vec<serde_json::Value>)> {
    validate_identifier(table)?;
    let mut params = Vec::new();
    let mut sql = format!("SELECT to_jsonb(t) FROM {} t", quoted(table));

    if !query.filters.is_empty() {
        let predicates = build_predicates(&query.filters, &mut params)?;
        sql.push_str(" WHERE ");
        sql.push_str(&predicates);
    }

    if let Some(order) = &query.order {
        validate_identifier(&order.column)?;
        let direction = match order.direction {
            OrderDirection::Ascending => "ASC",
            OrderDirection::Descending => "DESC",
        };
        sql.push_str(&format!(" ORDER BY {} {}", jsonb_field(&order.column), direction));
    }

    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    Ok((sql, params))
}

fn build_update(
    table: &str,
    filters: &[FilterExpr],
    patch: &Row,
) -> StrataResult<(String, Vec<serde_json::Value>)> {
    validate_identifier(table)?;
    let patch_object = patch.as_object().ok_or_else(|| StoreError::UpdateFailed {
        table: table.to_string(),
        reason: "patch is not a JSON object".to_string(),
    })?;
    if patch_object.is_empty() {
        return Err(StoreError::UpdateFailed {
            table: table.to_string(),
            reason: "patch has no columns".to_string(),
        }
        .into());
    }

    // jsonb_populate_record types each patched column against the table's
    // row type, so no per-column type knowledge is needed here.
    let mut assignments = Vec::with_capacity(patch_object.len());
    for column in patch_object.keys() {
        validate_identifier(column)?;
        assignments.push(format!(
            "{col} = (jsonb_populate_record(NULL::{table}, $1::jsonb)).{col}",
            col = quoted(column),
            table = quoted(table),
        ));
    }

    let mut params = vec![patch.clone()];
    let mut sql = format!(
        "UPDATE {} t SET {}",
        quoted(table),
        assignments.join(", ")
    );
    if !filters.is_empty() {
        let predicates = build_predicates(filters, &mut params)?;
        sql.push_str(" WHERE ");
        sql.push_str(&predicates);
    }
    Ok((sql, params))
}

fn build_delete(
    table: &str,
    filters: &[FilterExpr],
) -> StrataResult<(String, Vec<serde_json::Value>)> {
    validate_identifier(table)?;
    let mut params = Vec::new();
    let mut sql = format!("DELETE FROM {} t", quoted(table));
    if !filters.is_empty() {
        let predicates = build_predicates(filters, &mut params)?;
        sql.push_str(" WHERE ");
        sql.push_str(&predicates);
    }
    Ok((sql, params))
}

// ============================================================================
// ADAPTER
// ============================================================================

/// Store adapter backed by a PostgreSQL connection pool.
pub struct PgStoreAdapter {
    pool: Pool,
}

impl PgStoreAdapter {
    /// Create an adapter over an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create an adapter from configuration.
    pub fn from_config(config: &PgConfig) -> StrataResult<Self> {
        Ok(Self::new(config.create_pool()?))
    }

    /// Current pool size, for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    async fn client(&self) -> StrataResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            StoreError::ConnectionFailed {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

fn as_sql_params(params: &[serde_json::Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl StoreAdapter for PgStoreAdapter {
    async fn select(&self, table: &str, query: &SelectQuery) -> StrataResult<Vec<Row>> {
        let (sql, params) = build_select(table, query)?;
        let client = self.client().await?;
        let rows = client
            .query(sql.as_str(), &as_sql_params(&params))
            .await
            .map_err(|e| StoreError::QueryFailed {
                table: table.to_string(),
                reason: e.to_string(),
            })?;
        Ok(rows
            .iter()
            .map(|row| row.get::<_, serde_json::Value>(0))
            .collect())
    }

    async fn insert(&self, table: &str, rows: &[Row]) -> StrataResult<u64> {
        validate_identifier(table)?;
        let sql = format!(
            "INSERT INTO {table} SELECT * FROM jsonb_populate_recordset(NULL::{table}, $1::jsonb)",
            table = quoted(table),
        );
        let payload = serde_json::Value::Array(rows.to_vec());
        let client = self.client().await?;
        client
            .execute(sql.as_str(), &[&payload])
            .await
            .map_err(|e| {
                StoreError::InsertFailed {
                    table: table.to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
    }

    async fn update(
        &self,
        table: &str,
        filters: &[FilterExpr],
        patch: &Row,
    ) -> StrataResult<u64> {
        let (sql, params) = build_update(table, filters, patch)?;
        let client = self.client().await?;
        client
            .execute(sql.as_str(), &as_sql_params(&params))
            .await
            .map_err(|e| {
                StoreError::UpdateFailed {
                    table: table.to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
    }

    async fn delete(&self, table: &str, filters: &[FilterExpr]) -> StrataResult<u64> {
        let (sql, params) = build_delete(table, filters)?;
        let client = self.client().await?;
        client
            .execute(sql.as_str(), &as_sql_params(&params))
            .await
            .map_err(|e| {
                StoreError::DeleteFailed {
                    table: table.to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
    }

    async fn rpc(&self, name: &str, params: serde_json::Value) -> StrataResult<serde_json::Value> {
        validate_identifier(name)?;
        let sql = format!("SELECT to_jsonb({}($1::jsonb)) AS result", name);
        let client = self.client().await?;
        let row = client
            .query_one(sql.as_str(), &[&params])
            .await
            .map_err(|e| StoreError::RpcFailed {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(row.get(0))
    }
}
