use crate::sqlstate::classify;
use async_trait::async_trait;
use sqlx::postgres::{PgColumn, PgRow};
use sqlx::{Column, Connection, Executor as _, PgConnection, Row as _, TypeInfo};
use store::{Row, Store, StoreError, Value};

const BASE_TABLES_QUERY: &str = r#"
    SELECT table_name::text
    FROM information_schema.tables
    WHERE table_schema = $1
      AND table_type = 'BASE TABLE'
    ORDER BY table_name
"#;

/// A `Store` over one dedicated PostgreSQL connection.
#[derive(Debug)]
pub struct PgStore {
    conn: PgConnection,
}

impl PgStore {
    pub fn new(conn: PgConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn execute(&mut self, sql: &str) -> Result<u64, StoreError> {
        // Simple-query protocol: scripts may contain DDL and DO blocks that
        // cannot be prepared.
        let result = (&mut self.conn)
            .execute(sqlx::raw_sql(sql))
            .await
            .map_err(classify)?;
        Ok(result.rows_affected())
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, StoreError> {
        let rows = sqlx::query(sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(classify)?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn list_base_tables(&mut self, schema: &str) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>(BASE_TABLES_QUERY)
            .bind(schema)
            .fetch_all(&mut self.conn)
            .await
            .map_err(classify)
    }

    async fn ping(&mut self) -> Result<(), StoreError> {
        self.conn.ping().await.map_err(classify)
    }

    async fn close(self) -> Result<(), StoreError> {
        self.conn.close().await.map_err(classify)
    }
}

fn decode_row(row: &PgRow) -> Row {
    Row::new(
        row.columns()
            .iter()
            .map(|column| decode_value(row, column))
            .collect(),
    )
}

fn decode_value(row: &PgRow, column: &PgColumn) -> Value {
    let index = column.ordinal();
    let type_name = column.type_info().name();
    let decoded = match type_name {
        "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .map(|v| v.map(Value::Bool)),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)
            .map(|v| v.map(|n| Value::Int(n.into()))),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)
            .map(|v| v.map(|n| Value::Int(n.into()))),
        "INT8" => row
            .try_get::<Option<i64>, _>(index)
            .map(|v| v.map(Value::Int)),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)
            .map(|v| v.map(|n| Value::Float(n.into()))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(index)
            .map(|v| v.map(Value::Float)),
        _ => row
            .try_get::<Option<String>, _>(index)
            .map(|v| v.map(Value::Text)),
    };
    match decoded {
        Ok(Some(value)) => value,
        Ok(None) => Value::Null,
        Err(_) => Value::Unsupported(type_name.to_string()),
    }
}
