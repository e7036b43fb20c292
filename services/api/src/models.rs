//! API models for request and response payloads

pub mod pomodoro;

pub use pomodoro::{
    CreatePomodoro, ListFilter, PaginatedPomodoros, PauseInterval, Pomodoro, PomodoroCounts,
    PomodoroQuery, PomodoroStats, PomodoroStatus, PomodoroType, PomodoroView, StartPomodoro,
    StatsWindows, UpdatePomodoro,
};
