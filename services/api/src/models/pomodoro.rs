//! Pomodoro session model and its lifecycle transitions
//!
//! Transitions are pure: every method takes the wall-clock instant it should
//! treat as "now", so accounting can be exercised with synthetic timestamps.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PomodoroError, PomodoroResult};

pub const DEFAULT_DURATION: i32 = 25;
pub const DEFAULT_BREAK_DURATION: i32 = 5;
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

const MAX_TITLE_CHARS: usize = 255;
const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PomodoroStatus {
    Pending,
    InProgress,
    Paused,
    Completed,
    Cancelled,
}

/// Session kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PomodoroType {
    #[default]
    Work,
    ShortBreak,
    LongBreak,
}

/// Unknown enum literal read back from storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant `{}`", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

impl PomodoroStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PomodoroStatus::Pending => "pending",
            PomodoroStatus::InProgress => "in_progress",
            PomodoroStatus::Paused => "paused",
            PomodoroStatus::Completed => "completed",
            PomodoroStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for PomodoroStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PomodoroStatus::Pending),
            "in_progress" => Ok(PomodoroStatus::InProgress),
            "paused" => Ok(PomodoroStatus::Paused),
            "completed" => Ok(PomodoroStatus::Completed),
            "cancelled" => Ok(PomodoroStatus::Cancelled),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl PomodoroType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PomodoroType::Work => "work",
            PomodoroType::ShortBreak => "short_break",
            PomodoroType::LongBreak => "long_break",
        }
    }
}

impl FromStr for PomodoroType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(PomodoroType::Work),
            "short_break" => Ok(PomodoroType::ShortBreak),
            "long_break" => Ok(PomodoroType::LongBreak),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// One pause of a running session; `end_time` stays unset while paused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseInterval {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Pomodoro session entity
///
/// `total_paused_time` and `actual_work_time` are whole seconds; `duration`
/// and `break_duration` are minutes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pomodoro {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: PomodoroType,
    pub status: PomodoroStatus,
    pub duration: i32,
    pub break_duration: i32,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub total_paused_time: i64,
    pub actual_work_time: i64,
    pub pause_intervals: Vec<PauseInterval>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whole seconds from `from` to `to`, never negative
fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().max(0)
}

impl Pomodoro {
    /// Build a pending session from a validated create payload
    pub fn new(user_id: Uuid, input: CreatePomodoro, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: input.title,
            description: input.description,
            kind: input.kind.unwrap_or_default(),
            status: PomodoroStatus::Pending,
            duration: input.duration.unwrap_or(DEFAULT_DURATION),
            break_duration: input.break_duration.unwrap_or(DEFAULT_BREAK_DURATION),
            start_time: None,
            end_time: None,
            paused_at: None,
            total_paused_time: 0,
            actual_work_time: 0,
            pause_intervals: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PomodoroStatus::InProgress
    }

    /// Guards shared by `start` and the caller's single-active check
    pub fn ensure_startable(&self) -> PomodoroResult<()> {
        match self.status {
            PomodoroStatus::InProgress => Err(PomodoroError::AlreadyActive),
            PomodoroStatus::Completed => Err(PomodoroError::InvalidState(
                "Cannot start a completed pomodoro",
            )),
            _ => Ok(()),
        }
    }

    /// Begin a fresh timing run at `at`.
    ///
    /// A run restarted from `paused` or `cancelled` closes any open pause and
    /// resets the paused-time accumulator, so accounting is relative to the
    /// new start time.
    pub fn start(&mut self, at: DateTime<Utc>) -> PomodoroResult<()> {
        self.ensure_startable()?;

        self.close_open_pause(at);
        self.status = PomodoroStatus::InProgress;
        self.start_time = Some(at);
        self.end_time = None;
        self.paused_at = None;
        self.total_paused_time = 0;
        self.updated_at = at;
        Ok(())
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> PomodoroResult<()> {
        if self.status != PomodoroStatus::InProgress {
            return Err(PomodoroError::InvalidState(
                "Can only pause an active pomodoro",
            ));
        }

        self.status = PomodoroStatus::Paused;
        self.paused_at = Some(now);
        self.pause_intervals.push(PauseInterval {
            start_time: now,
            end_time: None,
        });
        self.updated_at = now;
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> PomodoroResult<()> {
        if self.status != PomodoroStatus::Paused {
            return Err(PomodoroError::InvalidState(
                "Can only resume a paused pomodoro",
            ));
        }

        self.close_open_pause(now);
        self.status = PomodoroStatus::InProgress;
        self.updated_at = now;
        Ok(())
    }

    /// Finish the session; a pause still open at `now` counts as paused time
    pub fn complete(&mut self, now: DateTime<Utc>) -> PomodoroResult<()> {
        if self.status == PomodoroStatus::Completed {
            return Err(PomodoroError::AlreadyCompleted);
        }

        self.close_open_pause(now);
        self.status = PomodoroStatus::Completed;
        self.end_time = Some(now);
        if let Some(start) = self.start_time {
            self.actual_work_time = (seconds_between(start, now) - self.total_paused_time).max(0);
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> PomodoroResult<()> {
        if self.status == PomodoroStatus::Completed {
            return Err(PomodoroError::InvalidState(
                "Cannot cancel a completed pomodoro",
            ));
        }

        self.close_open_pause(now);
        self.status = PomodoroStatus::Cancelled;
        self.end_time = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Apply an edit. A running session only accepts an edit that pauses it.
    pub fn apply_update(&mut self, update: UpdatePomodoro, now: DateTime<Utc>) -> PomodoroResult<()> {
        let pausing = update.status == Some(PomodoroStatus::Paused);
        if self.is_active() && !pausing {
            return Err(PomodoroError::InvalidState(
                "Cannot update pomodoro while it is in progress. Pause it first.",
            ));
        }
        if pausing && self.status != PomodoroStatus::Paused {
            self.pause(now)?;
        }

        if let Some(title) = update.title {
            self.title = Some(title);
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(kind) = update.kind {
            self.kind = kind;
        }
        if let Some(duration) = update.duration {
            self.duration = duration;
        }
        if let Some(break_duration) = update.break_duration {
            self.break_duration = break_duration;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn ensure_deletable(&self) -> PomodoroResult<()> {
        if self.is_active() {
            return Err(PomodoroError::InvalidState(
                "Cannot delete an active pomodoro. Cancel it first.",
            ));
        }
        Ok(())
    }

    /// Seconds left on the timer at `now`
    pub fn remaining_time(&self, now: DateTime<Utc>) -> i64 {
        let planned = i64::from(self.duration) * 60;
        match (self.status, self.start_time) {
            (PomodoroStatus::InProgress, Some(start)) => {
                (planned - seconds_between(start, now) + self.total_paused_time).max(0)
            }
            _ => planned,
        }
    }

    pub fn view(self, now: DateTime<Utc>) -> PomodoroView {
        PomodoroView {
            remaining_time: self.remaining_time(now),
            pomodoro: self,
        }
    }

    fn close_open_pause(&mut self, now: DateTime<Utc>) {
        if let Some(paused_at) = self.paused_at.take() {
            self.total_paused_time += seconds_between(paused_at, now);
        }
        if let Some(open) = self
            .pause_intervals
            .iter_mut()
            .rev()
            .find(|interval| interval.end_time.is_none())
        {
            open.end_time = Some(now);
        }
    }
}

/// Serialized session with its derived remaining time
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroView {
    #[serde(flatten)]
    pub pomodoro: Pomodoro,
    pub remaining_time: i64,
}

fn validate_title(title: Option<&str>) -> PomodoroResult<()> {
    if let Some(title) = title {
        let len = title.chars().count();
        if len == 0 || len > MAX_TITLE_CHARS {
            return Err(PomodoroError::Validation(format!(
                "title must be between 1 and {MAX_TITLE_CHARS} characters"
            )));
        }
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> PomodoroResult<()> {
    if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_CHARS) {
        return Err(PomodoroError::Validation(format!(
            "description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_minutes(field: &str, value: Option<i32>, min: i32, max: i32) -> PomodoroResult<()> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(PomodoroError::Validation(format!(
            "{field} must be between {min} and {max} minutes"
        ))),
        _ => Ok(()),
    }
}

/// Create payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePomodoro {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<PomodoroType>,
    pub duration: Option<i32>,
    pub break_duration: Option<i32>,
}

impl CreatePomodoro {
    pub fn validate(&self) -> PomodoroResult<()> {
        validate_title(self.title.as_deref())?;
        validate_description(self.description.as_deref())?;
        validate_minutes("duration", self.duration, 1, 120)?;
        validate_minutes("breakDuration", self.break_duration, 0, 30)
    }
}

/// Update payload; `status` may only request a pause
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePomodoro {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<PomodoroType>,
    pub status: Option<PomodoroStatus>,
    pub duration: Option<i32>,
    pub break_duration: Option<i32>,
}

impl UpdatePomodoro {
    pub fn validate(&self) -> PomodoroResult<()> {
        if self
            .status
            .is_some_and(|status| status != PomodoroStatus::Paused)
        {
            return Err(PomodoroError::Validation(
                "status can only be set to paused; use the start, resume, complete or cancel actions"
                    .to_string(),
            ));
        }
        validate_title(self.title.as_deref())?;
        validate_description(self.description.as_deref())?;
        validate_minutes("duration", self.duration, 1, 120)?;
        validate_minutes("breakDuration", self.break_duration, 0, 30)
    }
}

/// Start payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPomodoro {
    /// Explicit start instant; defaults to now
    pub start_time: Option<DateTime<Utc>>,
}

/// Query parameters for session listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroQuery {
    pub status: Option<PomodoroStatus>,
    #[serde(rename = "type")]
    pub kind: Option<PomodoroType>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Page number (1-based)
    pub page: Option<u32>,
    /// Number of items per page
    pub limit: Option<u32>,
    /// Case-insensitive match on title or description
    pub search: Option<String>,
}

/// Validated listing filter handed to the store
#[derive(Debug, Clone, PartialEq)]
pub struct ListFilter {
    pub status: Option<PomodoroStatus>,
    pub kind: Option<PomodoroType>,
    pub created_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl ListFilter {
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

impl PomodoroQuery {
    pub fn into_filter(self) -> PomodoroResult<ListFilter> {
        let page = self.page.unwrap_or(DEFAULT_PAGE);
        if page < 1 {
            return Err(PomodoroError::Validation("page must be at least 1".to_string()));
        }
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(PomodoroError::Validation(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }

        // The date range only applies when both ends are given
        let created_between = self.start_date.zip(self.end_date);
        let search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(ListFilter {
            status: self.status,
            kind: self.kind,
            created_between,
            search,
            page,
            limit,
        })
    }
}

/// One page of sessions
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedPomodoros {
    pub data: Vec<PomodoroView>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}

impl PaginatedPomodoros {
    pub fn new(data: Vec<PomodoroView>, total: i64, filter: &ListFilter) -> Self {
        let limit = i64::from(filter.limit);
        Self {
            data,
            total,
            page: filter.page,
            limit: filter.limit,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

/// Start instants of the statistics windows, all in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsWindows {
    pub today: DateTime<Utc>,
    /// Weeks start on Sunday
    pub week: DateTime<Utc>,
    pub month: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl StatsWindows {
    pub fn at(now: DateTime<Utc>) -> Self {
        let midnight = now.date_naive().and_time(chrono::NaiveTime::MIN);
        let today = Utc.from_utc_datetime(&midnight);
        let week = today - Duration::days(i64::from(now.weekday().num_days_from_sunday()));
        let month = today - Duration::days(i64::from(now.day0()));
        Self {
            today,
            week,
            month,
            now,
        }
    }
}

/// Raw aggregates read from the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PomodoroCounts {
    pub total: i64,
    pub completed: i64,
    /// Sum of actual work time of completed sessions, in seconds
    pub work_seconds: i64,
    pub today: i64,
    pub week: i64,
    pub month: i64,
}

/// Aggregate statistics for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroStats {
    pub total_pomodoros: i64,
    pub completed_pomodoros: i64,
    /// Minutes
    pub total_work_time: i64,
    /// Minutes per completed session
    pub average_work_time: i64,
    /// Percentage, two decimals
    pub completion_rate: f64,
    pub today_pomodoros: i64,
    pub week_pomodoros: i64,
    pub month_pomodoros: i64,
}

impl From<PomodoroCounts> for PomodoroStats {
    fn from(counts: PomodoroCounts) -> Self {
        let average_work_time = if counts.completed > 0 {
            counts.work_seconds / counts.completed / 60
        } else {
            0
        };
        let completion_rate = if counts.total > 0 {
            let rate = counts.completed as f64 / counts.total as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        } else {
            0.0
        };

        Self {
            total_pomodoros: counts.total,
            completed_pomodoros: counts.completed,
            total_work_time: counts.work_seconds / 60,
            average_work_time,
            completion_rate,
            today_pomodoros: counts.today,
            week_pomodoros: counts.week,
            month_pomodoros: counts.month,
        }
    }
}
