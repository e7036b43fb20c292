//! Application state shared across handlers

use pomo_common::JwtService;

use crate::service::PomodoroService;

/// Application state, generic over the pomodoro store
#[derive(Clone)]
pub struct AppState<P> {
    pub pomodoros: PomodoroService<P>,
    pub jwt: JwtService,
}

impl<P> AppState<P> {
    pub fn new(pomodoros: PomodoroService<P>, jwt: JwtService) -> Self {
        Self { pomodoros, jwt }
    }
}
