// Badge catalog and attribution tables.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::instrument;

use super::{MetricsStore, from_ms, opt_from_ms, to_ms};
use crate::analytics::badges::Award;
use crate::models::{Badge, BadgeCriteria, NewBadge, VolunteerBadge};

const ATTRIBUTION_SELECT: &str = r#"
    SELECT vb.id, vb.volunteer_id, vb.badge_id, vb.earned_date, vb.period, vb.period_start,
           vb.period_end, vb.reason, vb.metric_value, vb.rank, vb.notified, vb.notification_date,
           vb.revoked, vb.revoked_date, vb.created_at,
           b.badge_id AS b_badge_id, b.name AS b_name, b.description AS b_description,
           b.category AS b_category, b.icon AS b_icon, b.level AS b_level,
           b.criteria AS b_criteria, b.active AS b_active, b.created_at AS b_created_at,
           b.updated_at AS b_updated_at
    FROM volunteer_badges vb
    LEFT JOIN badges b ON b.id = vb.badge_id
"#;

pub(super) async fn init_badge_tables(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS badges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            badge_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT,
            category TEXT,
            icon TEXT NOT NULL DEFAULT '',
            level TEXT NOT NULL DEFAULT 'bronze',
            criteria TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS volunteer_badges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            volunteer_id TEXT NOT NULL,
            badge_id INTEGER NOT NULL REFERENCES badges(id),
            earned_date INTEGER NOT NULL,
            period TEXT,
            period_start INTEGER,
            period_end INTEGER,
            reason TEXT,
            metric_value REAL,
            rank INTEGER,
            notified INTEGER NOT NULL DEFAULT 0,
            notification_date INTEGER,
            revoked INTEGER NOT NULL DEFAULT 0,
            revoked_date INTEGER,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_volunteer_badges_volunteer ON volunteer_badges(volunteer_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_volunteer_badges_earned ON volunteer_badges(earned_date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Filters for the attribution listing; revoked rows are always excluded.
#[derive(Debug, Clone, Default)]
pub struct AttributionFilter {
    pub period: Option<String>,
    pub volunteer_id: Option<String>,
    pub badge_id: Option<i64>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttributionPage {
    pub badges: Vec<VolunteerBadge>,
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolunteerBadgeCount {
    pub volunteer_id: String,
    pub badge_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BadgeCount {
    pub name: String,
    pub icon: String,
    pub count: i64,
}

/// Counts over non-revoked attributions.
#[derive(Debug, Clone, Serialize)]
pub struct AttributionStatistics {
    pub total_attributions: i64,
    pub by_period: BTreeMap<String, i64>,
    pub by_category: BTreeMap<String, i64>,
    pub top_volunteers: Vec<VolunteerBadgeCount>,
    pub most_attributed_badges: Vec<BadgeCount>,
}

impl MetricsStore {
    pub async fn badge_count(&self) -> anyhow::Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM badges")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    /// Inserts catalog entries, skipping ids that already exist. Returns rows inserted.
    #[instrument(skip(self, badges), fields(repo = "store", operation = "insert_badges", count = badges.len()))]
    pub async fn insert_badges(
        &self,
        badges: &[NewBadge],
        now: DateTime<Utc>,
    ) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for b in badges {
            let criteria = serde_json::to_string(&b.criteria)?;
            let res = sqlx::query(
                r#"
                INSERT OR IGNORE INTO badges
                (badge_id, name, description, category, icon, level, criteria, active, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 1, $8, $8)
                "#,
            )
            .bind(&b.badge_id)
            .bind(&b.name)
            .bind(&b.description)
            .bind(&b.category)
            .bind(&b.icon)
            .bind(b.level.as_str())
            .bind(criteria)
            .bind(to_ms(now))
            .execute(&mut *tx)
            .await?;
            inserted += res.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    #[instrument(skip(self), fields(repo = "store", operation = "active_badges"))]
    pub async fn active_badges(&self) -> anyhow::Result<Vec<Badge>> {
        let rows = sqlx::query("SELECT * FROM badges WHERE active = 1 ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|r| parse_badge_row(r, "")).collect()
    }

    /// Persists awards in one transaction and returns the stored attributions.
    #[instrument(skip(self, awards), fields(repo = "store", operation = "insert_attributions", count = awards.len()))]
    pub async fn insert_attributions(
        &self,
        awards: &[Award],
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<VolunteerBadge>> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(awards.len());
        for a in awards {
            let res = sqlx::query(
                r#"
                INSERT INTO volunteer_badges
                (volunteer_id, badge_id, earned_date, period, period_start, period_end, reason,
                 metric_value, rank, notified, revoked, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, 0, $3)
                "#,
            )
            .bind(&a.volunteer_id)
            .bind(a.badge_id)
            .bind(to_ms(now))
            .bind(&a.period)
            .bind(a.period_start.map(to_ms))
            .bind(a.period_end.map(to_ms))
            .bind(&a.reason)
            .bind(a.metric_value)
            .bind(a.rank)
            .execute(&mut *tx)
            .await?;
            ids.push(res.last_insert_rowid());
        }
        tx.commit().await?;

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(a) = self.get_attribution(id).await? {
                out.push(a);
            }
        }
        Ok(out)
    }

    /// Every attribution, revoked included, oldest first.
    #[instrument(skip(self), fields(repo = "store", operation = "all_attributions"))]
    pub async fn all_attributions(&self) -> anyhow::Result<Vec<VolunteerBadge>> {
        let sql = format!("{} ORDER BY vb.earned_date ASC, vb.id ASC", ATTRIBUTION_SELECT);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(parse_attribution_row).collect()
    }

    #[instrument(skip(self), fields(repo = "store", operation = "list_attributions"))]
    pub async fn list_attributions(
        &self,
        filter: &AttributionFilter,
    ) -> anyhow::Result<AttributionPage> {
        const WHERE: &str = r#"
            WHERE vb.revoked = 0
              AND ($1 IS NULL OR vb.period = $1)
              AND ($2 IS NULL OR vb.volunteer_id = $2)
              AND ($3 IS NULL OR vb.badge_id = $3)
        "#;
        let count_sql = format!("SELECT COUNT(*) AS n FROM volunteer_badges vb {}", WHERE);
        let total: i64 = sqlx::query(&count_sql)
            .bind(filter.period.as_deref())
            .bind(filter.volunteer_id.as_deref())
            .bind(filter.badge_id)
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?;

        let sql = format!(
            "{} {} ORDER BY vb.earned_date DESC, vb.id DESC LIMIT $4 OFFSET $5",
            ATTRIBUTION_SELECT, WHERE
        );
        let rows = sqlx::query(&sql)
            .bind(filter.period.as_deref())
            .bind(filter.volunteer_id.as_deref())
            .bind(filter.badge_id)
            .bind(filter.limit as i64)
            .bind(filter.offset as i64)
            .fetch_all(&self.pool)
            .await?;
        let badges = rows
            .iter()
            .map(parse_attribution_row)
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(AttributionPage {
            badges,
            total,
            limit: filter.limit,
            offset: filter.offset,
            has_more: (filter.offset as i64 + filter.limit as i64) < total,
        })
    }

    /// Non-revoked attributions earned at or after `since`, newest first.
    #[instrument(skip(self), fields(repo = "store", operation = "recent_attributions"))]
    pub async fn recent_attributions(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> anyhow::Result<Vec<VolunteerBadge>> {
        let sql = format!(
            "{} WHERE vb.revoked = 0 AND vb.earned_date >= $1 ORDER BY vb.earned_date DESC, vb.id DESC LIMIT $2",
            ATTRIBUTION_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(to_ms(since))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(parse_attribution_row).collect()
    }

    #[instrument(skip(self), fields(repo = "store", operation = "get_attribution"))]
    pub async fn get_attribution(&self, id: i64) -> anyhow::Result<Option<VolunteerBadge>> {
        let sql = format!("{} WHERE vb.id = $1", ATTRIBUTION_SELECT);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(parse_attribution_row).transpose()
    }

    /// A volunteer's attributions, newest first.
    #[instrument(skip(self), fields(repo = "store", operation = "volunteer_attributions"))]
    pub async fn volunteer_attributions(
        &self,
        volunteer_id: &str,
        include_revoked: bool,
    ) -> anyhow::Result<Vec<VolunteerBadge>> {
        let sql = format!(
            "{} WHERE vb.volunteer_id = $1 AND ($2 OR vb.revoked = 0) ORDER BY vb.earned_date DESC, vb.id DESC",
            ATTRIBUTION_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(volunteer_id)
            .bind(include_revoked)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(parse_attribution_row).collect()
    }

    /// Marks an attribution revoked. Returns false when it does not exist or is already revoked.
    #[instrument(skip(self), fields(repo = "store", operation = "revoke_attribution"))]
    pub async fn revoke_attribution(&self, id: i64, now: DateTime<Utc>) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE volunteer_badges SET revoked = 1, revoked_date = $1 WHERE id = $2 AND revoked = 0",
        )
        .bind(to_ms(now))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(repo = "store", operation = "attribution_statistics"))]
    pub async fn attribution_statistics(&self) -> anyhow::Result<AttributionStatistics> {
        let total_attributions: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM volunteer_badges WHERE revoked = 0")
                .fetch_one(&self.pool)
                .await?
                .try_get("n")?;

        let mut by_period: BTreeMap<String, i64> = BTreeMap::new();
        let rows = sqlx::query(
            r#"
            SELECT period, COUNT(*) AS n FROM volunteer_badges
            WHERE revoked = 0 AND period IS NOT NULL
            GROUP BY period
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        for row in rows {
            by_period.insert(row.try_get("period")?, row.try_get("n")?);
        }

        let mut by_category: BTreeMap<String, i64> = BTreeMap::new();
        let rows = sqlx::query(
            r#"
            SELECT b.category AS category, COUNT(vb.id) AS n
            FROM volunteer_badges vb JOIN badges b ON b.id = vb.badge_id
            WHERE vb.revoked = 0 AND b.category IS NOT NULL
            GROUP BY b.category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        for row in rows {
            by_category.insert(row.try_get("category")?, row.try_get("n")?);
        }

        let rows = sqlx::query(
            r#"
            SELECT volunteer_id, COUNT(*) AS n FROM volunteer_badges
            WHERE revoked = 0
            GROUP BY volunteer_id
            ORDER BY n DESC, volunteer_id ASC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        let top_volunteers = rows
            .iter()
            .map(|row| {
                Ok(VolunteerBadgeCount {
                    volunteer_id: row.try_get("volunteer_id")?,
                    badge_count: row.try_get("n")?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let rows = sqlx::query(
            r#"
            SELECT b.name AS name, b.icon AS icon, COUNT(vb.id) AS n
            FROM volunteer_badges vb JOIN badges b ON b.id = vb.badge_id
            WHERE vb.revoked = 0
            GROUP BY b.id
            ORDER BY n DESC, b.id ASC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        let most_attributed_badges = rows
            .iter()
            .map(|row| {
                Ok(BadgeCount {
                    name: row.try_get("name")?,
                    icon: row.try_get("icon")?,
                    count: row.try_get("n")?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(AttributionStatistics {
            total_attributions,
            by_period,
            by_category,
            top_volunteers,
            most_attributed_badges,
        })
    }
}

/// Reads badge columns, each prefixed with `prefix` (empty for a plain `badges` row).
fn parse_badge_row(row: &SqliteRow, prefix: &str) -> anyhow::Result<Badge> {
    let col = |name: &str| format!("{}{}", prefix, name);
    let level: String = row.try_get(col("level").as_str())?;
    let criteria: Option<String> = row.try_get(col("criteria").as_str())?;
    Ok(Badge {
        id: if prefix.is_empty() {
            row.try_get("id")?
        } else {
            row.try_get("badge_id")?
        },
        badge_id: row.try_get(col("badge_id").as_str())?,
        name: row.try_get(col("name").as_str())?,
        description: row.try_get(col("description").as_str())?,
        category: row.try_get(col("category").as_str())?,
        icon: row.try_get(col("icon").as_str())?,
        level: level.parse()?,
        criteria: criteria.and_then(|c| serde_json::from_str::<BadgeCriteria>(&c).ok()),
        active: row.try_get(col("active").as_str())?,
        created_at: from_ms(row.try_get(col("created_at").as_str())?)?,
        updated_at: from_ms(row.try_get(col("updated_at").as_str())?)?,
    })
}

fn parse_attribution_row(row: &SqliteRow) -> anyhow::Result<VolunteerBadge> {
    let badge_name: Option<String> = row.try_get("b_name")?;
    let badge = match badge_name {
        Some(_) => Some(parse_badge_row(row, "b_")?),
        None => None,
    };
    Ok(VolunteerBadge {
        id: row.try_get("id")?,
        volunteer_id: row.try_get("volunteer_id")?,
        badge_id: row.try_get("badge_id")?,
        earned_date: from_ms(row.try_get("earned_date")?)?,
        period: row.try_get("period")?,
        period_start: opt_from_ms(row.try_get("period_start")?)?,
        period_end: opt_from_ms(row.try_get("period_end")?)?,
        reason: row.try_get("reason")?,
        metric_value: row.try_get("metric_value")?,
        rank: row.try_get("rank")?,
        notified: row.try_get("notified")?,
        notification_date: opt_from_ms(row.try_get("notification_date")?)?,
        revoked: row.try_get("revoked")?,
        revoked_date: opt_from_ms(row.try_get("revoked_date")?)?,
        created_at: from_ms(row.try_get("created_at")?)?,
        badge,
    })
}
