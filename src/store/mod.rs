// SQLite store for volunteers, tasks, performance history and system snapshots.
// Instants are INTEGER Unix milliseconds (UTC).

pub mod badges;

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::instrument;

use crate::analytics::{MetricsSource, Window};
use crate::models::{PerformanceHistory, SystemMetrics, Task, TaskStatus, Volunteer};

pub use badges::{AttributionFilter, AttributionPage, AttributionStatistics};

pub fn to_ms(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub fn from_ms(ms: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| anyhow::anyhow!("timestamp out of range: {}", ms))
}

fn opt_from_ms(ms: Option<i64>) -> anyhow::Result<Option<DateTime<Utc>>> {
    ms.map(from_ms).transpose()
}

/// Live counts used to stamp a new system snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub total_volunteers: i64,
    pub active_volunteers: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub pending_tasks: i64,
}

pub struct MetricsStore {
    pool: SqlitePool,
    retention: Duration,
}

impl MetricsStore {
    pub async fn connect(
        path: &str,
        max_pool_size: u32,
        retention_days: u32,
    ) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self {
            pool,
            retention: Duration::days(retention_days as i64),
        })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS system_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                total_volunteers INTEGER NOT NULL DEFAULT 0,
                active_volunteers INTEGER NOT NULL DEFAULT 0,
                total_tasks INTEGER NOT NULL DEFAULT 0,
                completed_tasks INTEGER NOT NULL DEFAULT 0,
                pending_tasks INTEGER NOT NULL DEFAULT 0,
                cpu_usage REAL NOT NULL DEFAULT 0,
                memory_usage REAL NOT NULL DEFAULT 0,
                network_throughput REAL NOT NULL DEFAULT 0,
                cost_savings REAL NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_system_metrics_timestamp ON system_metrics(timestamp)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS volunteers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                volunteer_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'inactive',
                joined_date INTEGER NOT NULL,
                last_seen INTEGER NOT NULL,
                tasks_completed INTEGER NOT NULL DEFAULT 0,
                total_computation_time REAL NOT NULL DEFAULT 0,
                cpu_cores INTEGER NOT NULL DEFAULT 0,
                memory_gb REAL NOT NULL DEFAULT 0,
                performance_score REAL NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id TEXT NOT NULL UNIQUE,
                workflow_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                assigned_volunteer TEXT,
                created_date INTEGER NOT NULL,
                started_date INTEGER,
                completed_date INTEGER,
                execution_time REAL NOT NULL DEFAULT 0,
                cpu_usage REAL NOT NULL DEFAULT 0,
                memory_usage REAL NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_created_date ON tasks(created_date)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS performance_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                volunteer_id TEXT NOT NULL,
                task_id TEXT NOT NULL,
                execution_time REAL NOT NULL DEFAULT 0,
                cpu_usage REAL NOT NULL DEFAULT 0,
                memory_usage REAL NOT NULL DEFAULT 0,
                success INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_performance_history_volunteer ON performance_history(volunteer_id, timestamp)",
        )
        .execute(&self.pool)
        .await?;

        badges::init_badge_tables(&self.pool).await?;

        Ok(())
    }

    /// True when no volunteer has been stored yet (demo seeding runs only then).
    pub async fn is_empty(&self) -> anyhow::Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM volunteers")
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n == 0)
    }

    #[instrument(skip(self, volunteers), fields(repo = "store", operation = "insert_volunteers", count = volunteers.len()))]
    pub async fn insert_volunteers(&self, volunteers: &[Volunteer]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        for v in volunteers {
            sqlx::query(
                r#"
                INSERT INTO volunteers
                (volunteer_id, name, status, joined_date, last_seen, tasks_completed,
                 total_computation_time, cpu_cores, memory_gb, performance_score)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(&v.volunteer_id)
            .bind(&v.name)
            .bind(v.status.as_str())
            .bind(to_ms(v.joined_date))
            .bind(to_ms(v.last_seen))
            .bind(v.tasks_completed)
            .bind(v.total_computation_time)
            .bind(v.cpu_cores)
            .bind(v.memory_gb)
            .bind(v.performance_score)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, tasks), fields(repo = "store", operation = "insert_tasks", count = tasks.len()))]
    pub async fn insert_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        for t in tasks {
            sqlx::query(
                r#"
                INSERT INTO tasks
                (task_id, workflow_id, status, assigned_volunteer, created_date, started_date,
                 completed_date, execution_time, cpu_usage, memory_usage)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(&t.task_id)
            .bind(&t.workflow_id)
            .bind(t.status.as_str())
            .bind(t.assigned_volunteer.as_deref())
            .bind(to_ms(t.created_date))
            .bind(t.started_date.map(to_ms))
            .bind(t.completed_date.map(to_ms))
            .bind(t.execution_time)
            .bind(t.cpu_usage)
            .bind(t.memory_usage)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, entries), fields(repo = "store", operation = "insert_performance_history", count = entries.len()))]
    pub async fn insert_performance_history(
        &self,
        entries: &[PerformanceHistory],
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        for p in entries {
            sqlx::query(
                r#"
                INSERT INTO performance_history
                (timestamp, volunteer_id, task_id, execution_time, cpu_usage, memory_usage, success)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(to_ms(p.timestamp))
            .bind(&p.volunteer_id)
            .bind(&p.task_id)
            .bind(p.execution_time)
            .bind(p.cpu_usage)
            .bind(p.memory_usage)
            .bind(p.success)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, samples), fields(repo = "store", operation = "insert_system_metrics", count = samples.len()))]
    pub async fn insert_system_metrics(&self, samples: &[SystemMetrics]) -> anyhow::Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for s in samples {
            sqlx::query(
                r#"
                INSERT INTO system_metrics
                (timestamp, total_volunteers, active_volunteers, total_tasks, completed_tasks,
                 pending_tasks, cpu_usage, memory_usage, network_throughput, cost_savings)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(to_ms(s.timestamp))
            .bind(s.total_volunteers)
            .bind(s.active_volunteers)
            .bind(s.total_tasks)
            .bind(s.completed_tasks)
            .bind(s.pending_tasks)
            .bind(s.cpu_usage)
            .bind(s.memory_usage)
            .bind(s.network_throughput)
            .bind(s.cost_savings)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "store", operation = "latest_system_metrics"))]
    pub async fn latest_system_metrics(&self) -> anyhow::Result<Option<SystemMetrics>> {
        let row = sqlx::query(
            "SELECT * FROM system_metrics ORDER BY timestamp DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::parse_system_metrics_row).transpose()
    }

    /// Snapshots with timestamp >= since, ascending.
    #[instrument(skip(self), fields(repo = "store", operation = "system_metrics_since"))]
    pub async fn system_metrics_since(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<SystemMetrics>> {
        let rows = sqlx::query(
            "SELECT * FROM system_metrics WHERE timestamp >= $1 ORDER BY timestamp ASC, id ASC",
        )
        .bind(to_ms(since))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_system_metrics_row).collect()
    }

    #[instrument(skip(self), fields(repo = "store", operation = "list_volunteers"))]
    pub async fn list_volunteers(&self) -> anyhow::Result<Vec<Volunteer>> {
        let rows = sqlx::query("SELECT * FROM volunteers ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::parse_volunteer_row).collect()
    }

    #[instrument(skip(self), fields(repo = "store", operation = "get_volunteer"))]
    pub async fn get_volunteer(&self, volunteer_id: &str) -> anyhow::Result<Option<Volunteer>> {
        let row = sqlx::query("SELECT * FROM volunteers WHERE volunteer_id = $1")
            .bind(volunteer_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::parse_volunteer_row).transpose()
    }

    /// Newest first.
    #[instrument(skip(self), fields(repo = "store", operation = "recent_performance_history"))]
    pub async fn recent_performance_history(
        &self,
        volunteer_id: &str,
        limit: u32,
    ) -> anyhow::Result<Vec<PerformanceHistory>> {
        let rows = sqlx::query(
            "SELECT * FROM performance_history WHERE volunteer_id = $1 ORDER BY timestamp DESC, id DESC LIMIT $2",
        )
        .bind(volunteer_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_performance_row).collect()
    }

    /// Newest first, optionally filtered by status.
    #[instrument(skip(self), fields(repo = "store", operation = "list_tasks"))]
    pub async fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        limit: u32,
    ) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query(
            "SELECT * FROM tasks WHERE ($1 IS NULL OR status = $1) ORDER BY created_date DESC, id DESC LIMIT $2",
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_task_row).collect()
    }

    #[instrument(skip(self), fields(repo = "store", operation = "counts"))]
    pub async fn counts(&self) -> anyhow::Result<StoreCounts> {
        let v = sqlx::query(
            "SELECT COUNT(*) AS total, COALESCE(SUM(CASE WHEN status = 'active' THEN 1 ELSE 0 END), 0) AS active FROM volunteers",
        )
        .fetch_one(&self.pool)
        .await?;
        let t = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0) AS completed,
                   COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0) AS pending
            FROM tasks
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(StoreCounts {
            total_volunteers: v.try_get("total")?,
            active_volunteers: v.try_get("active")?,
            total_tasks: t.try_get("total")?,
            completed_tasks: t.try_get("completed")?,
            pending_tasks: t.try_get("pending")?,
        })
    }

    /// Mean execution time of completed tasks per assigned volunteer.
    #[instrument(skip(self), fields(repo = "store", operation = "average_execution_times"))]
    pub async fn average_execution_times(&self) -> anyhow::Result<HashMap<String, f64>> {
        let rows = sqlx::query(
            r#"
            SELECT assigned_volunteer, AVG(execution_time) AS avg_time
            FROM tasks
            WHERE status = 'completed' AND assigned_volunteer IS NOT NULL AND execution_time > 0
            GROUP BY assigned_volunteer
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        let mut out: HashMap<String, f64> = HashMap::with_capacity(rows.len());
        for row in rows {
            out.insert(row.try_get("assigned_volunteer")?, row.try_get("avg_time")?);
        }
        Ok(out)
    }

    /// Deletes system snapshots and performance history older than the retention window.
    /// Returns the number of rows removed.
    #[instrument(skip(self), fields(repo = "store", operation = "prune_old_data"))]
    pub async fn prune_old_data(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let cutoff = to_ms(now - self.retention);
        let metrics = sqlx::query("DELETE FROM system_metrics WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        let history = sqlx::query("DELETE FROM performance_history WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(metrics.rows_affected() + history.rows_affected())
    }

    #[instrument(skip(self), fields(repo = "store", operation = "vacuum"))]
    pub async fn vacuum(&self) -> anyhow::Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    fn parse_system_metrics_row(row: &SqliteRow) -> anyhow::Result<SystemMetrics> {
        Ok(SystemMetrics {
            id: row.try_get("id")?,
            timestamp: from_ms(row.try_get("timestamp")?)?,
            total_volunteers: row.try_get("total_volunteers")?,
            active_volunteers: row.try_get("active_volunteers")?,
            total_tasks: row.try_get("total_tasks")?,
            completed_tasks: row.try_get("completed_tasks")?,
            pending_tasks: row.try_get("pending_tasks")?,
            cpu_usage: row.try_get("cpu_usage")?,
            memory_usage: row.try_get("memory_usage")?,
            network_throughput: row.try_get("network_throughput")?,
            cost_savings: row.try_get("cost_savings")?,
        })
    }

    fn parse_volunteer_row(row: &SqliteRow) -> anyhow::Result<Volunteer> {
        let status: String = row.try_get("status")?;
        Ok(Volunteer {
            id: row.try_get("id")?,
            volunteer_id: row.try_get("volunteer_id")?,
            name: row.try_get("name")?,
            status: status.parse()?,
            joined_date: from_ms(row.try_get("joined_date")?)?,
            last_seen: from_ms(row.try_get("last_seen")?)?,
            tasks_completed: row.try_get("tasks_completed")?,
            total_computation_time: row.try_get("total_computation_time")?,
            cpu_cores: row.try_get("cpu_cores")?,
            memory_gb: row.try_get("memory_gb")?,
            performance_score: row.try_get("performance_score")?,
        })
    }

    fn parse_task_row(row: &SqliteRow) -> anyhow::Result<Task> {
        let status: String = row.try_get("status")?;
        Ok(Task {
            id: row.try_get("id")?,
            task_id: row.try_get("task_id")?,
            workflow_id: row.try_get("workflow_id")?,
            status: status.parse()?,
            assigned_volunteer: row.try_get("assigned_volunteer")?,
            created_date: from_ms(row.try_get("created_date")?)?,
            started_date: opt_from_ms(row.try_get("started_date")?)?,
            completed_date: opt_from_ms(row.try_get("completed_date")?)?,
            execution_time: row.try_get("execution_time")?,
            cpu_usage: row.try_get("cpu_usage")?,
            memory_usage: row.try_get("memory_usage")?,
        })
    }

    fn parse_performance_row(row: &SqliteRow) -> anyhow::Result<PerformanceHistory> {
        Ok(PerformanceHistory {
            id: row.try_get("id")?,
            timestamp: from_ms(row.try_get("timestamp")?)?,
            volunteer_id: row.try_get("volunteer_id")?,
            task_id: row.try_get("task_id")?,
            execution_time: row.try_get("execution_time")?,
            cpu_usage: row.try_get("cpu_usage")?,
            memory_usage: row.try_get("memory_usage")?,
            success: row.try_get("success")?,
        })
    }
}

impl MetricsSource for MetricsStore {
    #[instrument(skip(self), fields(repo = "store", operation = "system_metrics"))]
    async fn system_metrics(&self, window: Window) -> anyhow::Result<Vec<SystemMetrics>> {
        let rows = sqlx::query(
            "SELECT * FROM system_metrics WHERE timestamp >= $1 AND timestamp <= $2 ORDER BY timestamp ASC, id ASC",
        )
        .bind(to_ms(window.start))
        .bind(to_ms(window.end))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_system_metrics_row).collect()
    }

    #[instrument(skip(self), fields(repo = "store", operation = "performance_history"))]
    async fn performance_history(
        &self,
        window: Window,
        volunteer_id: Option<&str>,
    ) -> anyhow::Result<Vec<PerformanceHistory>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM performance_history
            WHERE timestamp >= $1 AND timestamp <= $2 AND ($3 IS NULL OR volunteer_id = $3)
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(to_ms(window.start))
        .bind(to_ms(window.end))
        .bind(volunteer_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_performance_row).collect()
    }

    #[instrument(skip(self), fields(repo = "store", operation = "tasks"))]
    async fn tasks(
        &self,
        window: Window,
        status: Option<TaskStatus>,
    ) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM tasks
            WHERE created_date >= $1 AND created_date <= $2 AND ($3 IS NULL OR status = $3)
            ORDER BY created_date ASC, id ASC
            "#,
        )
        .bind(to_ms(window.start))
        .bind(to_ms(window.end))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_task_row).collect()
    }

    #[instrument(skip(self), fields(repo = "store", operation = "volunteers"))]
    async fn volunteers(&self) -> anyhow::Result<Vec<Volunteer>> {
        self.list_volunteers().await
    }
}
