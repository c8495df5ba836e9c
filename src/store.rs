//! Record store - durable file records in SQLite / 文件记录存储
//!
//! A single `files` table keyed by id. The processing status is persisted
//! alongside the record so restarts can tell "never finished" from
//! "finished" without guessing from content emptiness.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::models::{FileRecord, ProcessingStatus};

/// Run database migrations / 运行数据库迁移
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            declared_type TEXT NOT NULL,
            size INTEGER NOT NULL DEFAULT 0,
            last_modified_at TEXT NOT NULL,
            uploaded_at TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'pending',
            error TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// CRUD adapter over the `files` table / files 表的 CRUD 封装
#[derive(Clone)]
pub struct FileStore {
    pool: SqlitePool,
}

impl FileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new record / 新增记录
    pub async fn add(&self, record: &FileRecord) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO files
               (id, name, declared_type, size, last_modified_at, uploaded_at, content, status, error)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.declared_type)
        .bind(record.size)
        .bind(&record.last_modified_at)
        .bind(&record.uploaded_at)
        .bind(&record.content)
        .bind(record.status.as_str())
        .bind(&record.error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store extracted content and mark the record processed / 写入提取结果
    pub async fn update_content(&self, id: &str, content: &str) -> Result<()> {
        sqlx::query("UPDATE files SET content = ?, status = 'processed', error = NULL WHERE id = ?")
            .bind(content)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Persist a status change / 更新状态
    pub async fn update_status(
        &self,
        id: &str,
        status: ProcessingStatus,
        error: Option<&str>,
    ) -> Result<()> {
        sqlx::query("UPDATE files SET status = ?, error = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete a record; deleting an unknown id is a no-op / 删除记录
    pub async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Fetch one record / 查询单条
    pub async fn get(&self, id: &str) -> Result<Option<FileRecord>> {
        let row = sqlx::query(
            "SELECT id, name, declared_type, size, last_modified_at, uploaded_at, content, status, error FROM files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(record_from_row))
    }

    /// Fetch all records, oldest first / 查询全部
    pub async fn list(&self) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query(
            "SELECT id, name, declared_type, size, last_modified_at, uploaded_at, content, status, error FROM files ORDER BY uploaded_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(record_from_row).collect())
    }

    /// Drop every record; test isolation hook / 清空（测试隔离用）
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM files").execute(&self.pool).await?;
        Ok(())
    }
}

fn record_from_row(row: sqlx::sqlite::SqliteRow) -> FileRecord {
    let status_str: String = row.get("status");
    FileRecord {
        id: row.get("id"),
        name: row.get("name"),
        declared_type: row.get("declared_type"),
        size: row.get("size"),
        last_modified_at: row.get("last_modified_at"),
        uploaded_at: row.get("uploaded_at"),
        content: row.get("content"),
        status: ProcessingStatus::parse(&status_str),
        error: row.get("error"),
    }
}
