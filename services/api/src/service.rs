//! Pomodoro session engine
//!
//! Loads a session scoped to the caller, applies a lifecycle transition at
//! the current wall-clock instant and persists the result.

use chrono::Utc;
use pomo_common::error::DatabaseError;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::{PomodoroError, PomodoroResult},
    models::{
        CreatePomodoro, PaginatedPomodoros, Pomodoro, PomodoroQuery, PomodoroStats,
        StartPomodoro, StatsWindows, UpdatePomodoro,
    },
    repositories::{ACTIVE_SESSION_CONSTRAINT, PomodoroStore},
};

/// Map a violation of the one-running-session index to its domain error
fn map_active_conflict(err: DatabaseError) -> PomodoroError {
    if err.is_unique_violation(ACTIVE_SESSION_CONSTRAINT) {
        PomodoroError::ConflictActiveSession
    } else {
        PomodoroError::Database(err)
    }
}

#[derive(Clone)]
pub struct PomodoroService<P> {
    store: P,
}

impl<P: PomodoroStore> PomodoroService<P> {
    pub fn new(store: P) -> Self {
        Self { store }
    }

    pub async fn create(&self, user_id: Uuid, input: CreatePomodoro) -> PomodoroResult<Pomodoro> {
        input.validate()?;
        let pomodoro = Pomodoro::new(user_id, input, Utc::now());
        self.store.insert(&pomodoro).await?;
        Ok(pomodoro)
    }

    pub async fn find_all(
        &self,
        user_id: Uuid,
        query: PomodoroQuery,
    ) -> PomodoroResult<PaginatedPomodoros> {
        let filter = query.into_filter()?;
        let (items, total) = self.store.list(user_id, &filter).await?;

        let now = Utc::now();
        let data = items.into_iter().map(|p| p.view(now)).collect();
        Ok(PaginatedPomodoros::new(data, total, &filter))
    }

    /// Fetch a session owned by `user_id`; other users' sessions read as absent
    pub async fn find_one(&self, id: Uuid, user_id: Uuid) -> PomodoroResult<Pomodoro> {
        self.store
            .find(id, user_id)
            .await?
            .ok_or(PomodoroError::NotFound)
    }

    pub async fn get_current_active(&self, user_id: Uuid) -> PomodoroResult<Option<Pomodoro>> {
        Ok(self.store.find_active(user_id).await?)
    }

    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        update: UpdatePomodoro,
    ) -> PomodoroResult<Pomodoro> {
        update.validate()?;
        let mut pomodoro = self.find_one(id, user_id).await?;
        pomodoro.apply_update(update, Utc::now())?;
        self.persist(&pomodoro).await?;
        Ok(pomodoro)
    }

    pub async fn start(
        &self,
        id: Uuid,
        user_id: Uuid,
        input: StartPomodoro,
    ) -> PomodoroResult<Pomodoro> {
        let mut pomodoro = self.find_one(id, user_id).await?;
        pomodoro.ensure_startable()?;

        // Fast path; the unique index settles concurrent starts
        if let Some(active) = self.store.find_active(user_id).await? {
            if active.id != pomodoro.id {
                debug!("User {} already runs pomodoro {}", user_id, active.id);
                return Err(PomodoroError::ConflictActiveSession);
            }
        }

        pomodoro.start(input.start_time.unwrap_or_else(Utc::now))?;
        self.persist(&pomodoro).await?;
        info!("Started pomodoro {} for user {}", pomodoro.id, user_id);
        Ok(pomodoro)
    }

    pub async fn pause(&self, id: Uuid, user_id: Uuid) -> PomodoroResult<Pomodoro> {
        self.transition(id, user_id, Pomodoro::pause).await
    }

    pub async fn resume(&self, id: Uuid, user_id: Uuid) -> PomodoroResult<Pomodoro> {
        self.transition(id, user_id, Pomodoro::resume).await
    }

    pub async fn complete(&self, id: Uuid, user_id: Uuid) -> PomodoroResult<Pomodoro> {
        let pomodoro = self.transition(id, user_id, Pomodoro::complete).await?;
        info!(
            "Completed pomodoro {} with {}s of work",
            pomodoro.id, pomodoro.actual_work_time
        );
        Ok(pomodoro)
    }

    pub async fn cancel(&self, id: Uuid, user_id: Uuid) -> PomodoroResult<Pomodoro> {
        self.transition(id, user_id, Pomodoro::cancel).await
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> PomodoroResult<()> {
        let pomodoro = self.find_one(id, user_id).await?;
        pomodoro.ensure_deletable()?;

        if !self.store.delete(id, user_id).await? {
            return Err(PomodoroError::NotFound);
        }
        Ok(())
    }

    pub async fn get_stats(&self, user_id: Uuid) -> PomodoroResult<PomodoroStats> {
        let windows = StatsWindows::at(Utc::now());
        let counts = self.store.counts(user_id, &windows).await?;
        Ok(counts.into())
    }

    async fn transition<F>(&self, id: Uuid, user_id: Uuid, apply: F) -> PomodoroResult<Pomodoro>
    where
        F: FnOnce(&mut Pomodoro, chrono::DateTime<Utc>) -> PomodoroResult<()>,
    {
        let mut pomodoro = self.find_one(id, user_id).await?;
        apply(&mut pomodoro, Utc::now())?;
        self.persist(&pomodoro).await?;
        Ok(pomodoro)
    }

    async fn persist(&self, pomodoro: &Pomodoro) -> PomodoroResult<()> {
        let saved = self.store.save(pomodoro).await.map_err(map_active_conflict)?;
        if !saved {
            return Err(PomodoroError::NotFound);
        }
        Ok(())
    }
}
