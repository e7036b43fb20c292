#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use pomo_api::{
    AppState, PomodoroService,
    models::{ListFilter, Pomodoro, PomodoroCounts, PomodoroStatus, StatsWindows},
    repositories::{ACTIVE_SESSION_CONSTRAINT, PomodoroStore},
};
use pomo_common::{
    JwtConfig, JwtService, TokenType,
    error::{DatabaseError, DatabaseResult},
};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const SECRET: &str = "integration-test-secret";

/// Pomodoro store backed by a vector, enforcing one running session per user
/// like the partial unique index
#[derive(Clone, Default)]
pub struct InMemoryPomodoros {
    rows: Arc<Mutex<Vec<Pomodoro>>>,
}

fn matches_filter(p: &Pomodoro, user_id: Uuid, filter: &ListFilter) -> bool {
    let contains = |field: &Option<String>, needle: &str| {
        field
            .as_deref()
            .is_some_and(|v| v.to_lowercase().contains(needle))
    };

    p.user_id == user_id
        && filter.status.is_none_or(|s| p.status == s)
        && filter.kind.is_none_or(|k| p.kind == k)
        && filter
            .created_between
            .is_none_or(|(from, to)| p.created_at >= from && p.created_at <= to)
        && filter.search.as_deref().is_none_or(|s| {
            let needle = s.to_lowercase();
            contains(&p.title, &needle) || contains(&p.description, &needle)
        })
}

impl InMemoryPomodoros {
    /// Overwrite a stored row, bypassing the engine
    pub async fn put(&self, pomodoro: Pomodoro) {
        let mut rows = self.rows.lock().await;
        rows.retain(|p| p.id != pomodoro.id);
        rows.push(pomodoro);
    }
}

impl PomodoroStore for InMemoryPomodoros {
    async fn insert(&self, pomodoro: &Pomodoro) -> DatabaseResult<()> {
        self.rows.lock().await.push(pomodoro.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid, user_id: Uuid) -> DatabaseResult<Option<Pomodoro>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .find(|p| p.id == id && p.user_id == user_id)
            .cloned())
    }

    async fn find_active(&self, user_id: Uuid) -> DatabaseResult<Option<Pomodoro>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .find(|p| p.user_id == user_id && p.status == PomodoroStatus::InProgress)
            .cloned())
    }

    async fn list(&self, user_id: Uuid, filter: &ListFilter) -> DatabaseResult<(Vec<Pomodoro>, i64)> {
        let rows = self.rows.lock().await;
        let mut hits: Vec<Pomodoro> = rows
            .iter()
            .filter(|p| matches_filter(p, user_id, filter))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = hits.len() as i64;
        let page = hits
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn save(&self, pomodoro: &Pomodoro) -> DatabaseResult<bool> {
        let mut rows = self.rows.lock().await;
        if pomodoro.status == PomodoroStatus::InProgress
            && rows.iter().any(|p| {
                p.user_id == pomodoro.user_id
                    && p.id != pomodoro.id
                    && p.status == PomodoroStatus::InProgress
            })
        {
            return Err(DatabaseError::UniqueViolation {
                constraint: ACTIVE_SESSION_CONSTRAINT.to_string(),
            });
        }

        let Some(row) = rows
            .iter_mut()
            .find(|p| p.id == pomodoro.id && p.user_id == pomodoro.user_id)
        else {
            return Ok(false);
        };
        *row = pomodoro.clone();
        Ok(true)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> DatabaseResult<bool> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|p| !(p.id == id && p.user_id == user_id));
        Ok(rows.len() < before)
    }

    async fn counts(&self, user_id: Uuid, windows: &StatsWindows) -> DatabaseResult<PomodoroCounts> {
        let rows = self.rows.lock().await;
        let mine: Vec<&Pomodoro> = rows.iter().filter(|p| p.user_id == user_id).collect();
        let since = |start: DateTime<Utc>| {
            mine.iter()
                .filter(|p| p.created_at >= start && p.created_at <= windows.now)
                .count() as i64
        };
        let completed: Vec<&&Pomodoro> = mine
            .iter()
            .filter(|p| p.status == PomodoroStatus::Completed)
            .collect();

        Ok(PomodoroCounts {
            total: mine.len() as i64,
            completed: completed.len() as i64,
            work_seconds: completed.iter().map(|p| p.actual_work_time).sum(),
            today: since(windows.today),
            week: since(windows.week),
            month: since(windows.month),
        })
    }
}

pub fn jwt() -> JwtService {
    JwtService::new(JwtConfig {
        secret: SECRET.to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604_800,
    })
}

pub fn access_token(user_id: Uuid) -> String {
    jwt()
        .sign(user_id, "ada@example.com", TokenType::Access, Duration::minutes(15))
        .unwrap()
}

pub fn service(store: InMemoryPomodoros) -> PomodoroService<InMemoryPomodoros> {
    PomodoroService::new(store)
}

pub fn app_state(store: InMemoryPomodoros) -> AppState<InMemoryPomodoros> {
    AppState::new(service(store), jwt())
}
