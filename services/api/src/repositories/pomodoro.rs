//! Pomodoro repository for database operations

use pomo_common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow, types::Json};
use tracing::info;
use uuid::Uuid;

use crate::models::{ListFilter, PauseInterval, Pomodoro, PomodoroCounts, StatsWindows};

/// Name of the partial unique index allowing one running session per user
pub const ACTIVE_SESSION_CONSTRAINT: &str = "uq_pomodoros_active_user";

const COLUMNS: &str = "id, user_id, title, description, type, status, duration, break_duration, \
     start_time, end_time, paused_at, total_paused_time, actual_work_time, pause_intervals, \
     created_at, updated_at";

/// Durable pomodoro store; every access is scoped by the owning user
pub trait PomodoroStore: Clone + Send + Sync + 'static {
    fn insert(&self, pomodoro: &Pomodoro) -> impl Future<Output = DatabaseResult<()>> + Send;

    fn find(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = DatabaseResult<Option<Pomodoro>>> + Send;

    /// The user's in-progress session, if any
    fn find_active(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = DatabaseResult<Option<Pomodoro>>> + Send;

    /// One page matching the filter, newest first, plus the total match count
    fn list(
        &self,
        user_id: Uuid,
        filter: &ListFilter,
    ) -> impl Future<Output = DatabaseResult<(Vec<Pomodoro>, i64)>> + Send;

    /// Persist every mutable field; a second running session surfaces as a
    /// unique violation of [`ACTIVE_SESSION_CONSTRAINT`]
    fn save(&self, pomodoro: &Pomodoro) -> impl Future<Output = DatabaseResult<bool>> + Send;

    fn delete(&self, id: Uuid, user_id: Uuid) -> impl Future<Output = DatabaseResult<bool>> + Send;

    fn counts(
        &self,
        user_id: Uuid,
        windows: &StatsWindows,
    ) -> impl Future<Output = DatabaseResult<PomodoroCounts>> + Send;
}

/// PostgreSQL pomodoro repository
#[derive(Clone)]
pub struct PomodoroRepository {
    pool: PgPool,
}

impl PomodoroRepository {
    /// Create a new pomodoro repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_enum<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: T::Err| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn pomodoro_from_row(row: &PgRow) -> Result<Pomodoro, sqlx::Error> {
    let Json(pause_intervals): Json<Vec<PauseInterval>> = row.try_get("pause_intervals")?;

    Ok(Pomodoro {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        kind: decode_enum(row, "type")?,
        status: decode_enum(row, "status")?,
        duration: row.try_get("duration")?,
        break_duration: row.try_get("break_duration")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        paused_at: row.try_get("paused_at")?,
        total_paused_time: row.try_get("total_paused_time")?,
        actual_work_time: row.try_get("actual_work_time")?,
        pause_intervals,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Escape LIKE metacharacters so search input matches literally
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, filter: &ListFilter) {
    qb.push(" WHERE user_id = ").push_bind(user_id);

    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(kind) = filter.kind {
        qb.push(" AND type = ").push_bind(kind.as_str());
    }
    if let Some((from, to)) = filter.created_between {
        qb.push(" AND created_at BETWEEN ")
            .push_bind(from)
            .push(" AND ")
            .push_bind(to);
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

impl PomodoroStore for PomodoroRepository {
    async fn insert(&self, pomodoro: &Pomodoro) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pomodoros (id, user_id, title, description, type, status, duration,
                                   break_duration, pause_intervals, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(pomodoro.id)
        .bind(pomodoro.user_id)
        .bind(pomodoro.title.as_deref())
        .bind(pomodoro.description.as_deref())
        .bind(pomodoro.kind.as_str())
        .bind(pomodoro.status.as_str())
        .bind(pomodoro.duration)
        .bind(pomodoro.break_duration)
        .bind(Json(&pomodoro.pause_intervals))
        .bind(pomodoro.created_at)
        .bind(pomodoro.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        info!("Created pomodoro {} for user {}", pomodoro.id, pomodoro.user_id);
        Ok(())
    }

    async fn find(&self, id: Uuid, user_id: Uuid) -> DatabaseResult<Option<Pomodoro>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM pomodoros WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.as_ref().map(pomodoro_from_row).transpose()?)
    }

    async fn find_active(&self, user_id: Uuid) -> DatabaseResult<Option<Pomodoro>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM pomodoros WHERE user_id = $1 AND status = 'in_progress'"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(row.as_ref().map(pomodoro_from_row).transpose()?)
    }

    async fn list(&self, user_id: Uuid, filter: &ListFilter) -> DatabaseResult<(Vec<Pomodoro>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM pomodoros");
        push_filters(&mut count, user_id, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        let mut page = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM pomodoros"));
        push_filters(&mut page, user_id, filter);
        page.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(filter.limit))
            .push(" OFFSET ")
            .push_bind(filter.offset());
        let rows = page
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        let items = rows
            .iter()
            .map(pomodoro_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, total))
    }

    async fn save(&self, pomodoro: &Pomodoro) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pomodoros
            SET title = $3,
                description = $4,
                type = $5,
                status = $6,
                duration = $7,
                break_duration = $8,
                start_time = $9,
                end_time = $10,
                paused_at = $11,
                total_paused_time = $12,
                actual_work_time = $13,
                pause_intervals = $14,
                updated_at = $15
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(pomodoro.id)
        .bind(pomodoro.user_id)
        .bind(pomodoro.title.as_deref())
        .bind(pomodoro.description.as_deref())
        .bind(pomodoro.kind.as_str())
        .bind(pomodoro.status.as_str())
        .bind(pomodoro.duration)
        .bind(pomodoro.break_duration)
        .bind(pomodoro.start_time)
        .bind(pomodoro.end_time)
        .bind(pomodoro.paused_at)
        .bind(pomodoro.total_paused_time)
        .bind(pomodoro.actual_work_time)
        .bind(Json(&pomodoro.pause_intervals))
        .bind(pomodoro.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM pomodoros WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn counts(&self, user_id: Uuid, windows: &StatsWindows) -> DatabaseResult<PomodoroCounts> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                   COALESCE(SUM(actual_work_time) FILTER (WHERE status = 'completed'), 0)::BIGINT
                       AS work_seconds,
                   COUNT(*) FILTER (WHERE created_at BETWEEN $2 AND $5) AS today,
                   COUNT(*) FILTER (WHERE created_at BETWEEN $3 AND $5) AS week,
                   COUNT(*) FILTER (WHERE created_at BETWEEN $4 AND $5) AS month
            FROM pomodoros
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(windows.today)
        .bind(windows.week)
        .bind(windows.month)
        .bind(windows.now)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        Ok(PomodoroCounts {
            total: row.try_get("total")?,
            completed: row.try_get("completed")?,
            work_seconds: row.try_get("work_seconds")?,
            today: row.try_get("today")?,
            week: row.try_get("week")?,
            month: row.try_get("month")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_input_is_matched_literally() {
        assert_eq!(like_pattern("focus"), "%focus%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
    }

    #[test]
    fn filters_render_in_order() {
        let filter = ListFilter {
            status: Some(crate::models::PomodoroStatus::Completed),
            kind: None,
            created_between: None,
            search: Some("report".into()),
            page: 1,
            limit: 10,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM pomodoros");
        push_filters(&mut qb, Uuid::nil(), &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM pomodoros WHERE user_id = $1 AND status = $2 \
             AND (title ILIKE $3 OR description ILIKE $4)"
        );
    }
}
