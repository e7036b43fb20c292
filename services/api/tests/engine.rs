mod support;

use std::time::Duration;

use chrono::Utc;
use pomo_api::{
    PomodoroError,
    models::{
        CreatePomodoro, PomodoroQuery, PomodoroStatus, PomodoroType, StartPomodoro,
        UpdatePomodoro,
    },
};
use support::{InMemoryPomodoros, service};
use uuid::Uuid;

fn titled(title: &str) -> CreatePomodoro {
    CreatePomodoro {
        title: Some(title.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn created_session_is_pending_with_full_remaining_time() {
    let engine = service(InMemoryPomodoros::default());
    let user = Uuid::new_v4();

    let p = engine.create(user, CreatePomodoro::default()).await.unwrap();
    assert_eq!(p.status, PomodoroStatus::Pending);
    assert_eq!(p.kind, PomodoroType::Work);
    assert_eq!(p.remaining_time(Utc::now()), 1500);
}

#[tokio::test]
async fn invalid_create_payload_is_rejected() {
    let engine = service(InMemoryPomodoros::default());
    let input = CreatePomodoro {
        duration: Some(0),
        ..Default::default()
    };
    assert!(matches!(
        engine.create(Uuid::new_v4(), input).await,
        Err(PomodoroError::Validation(_))
    ));
}

#[tokio::test]
async fn work_pause_resume_complete_in_real_time() {
    let engine = service(InMemoryPomodoros::default());
    let user = Uuid::new_v4();
    let p = engine
        .create(
            user,
            CreatePomodoro {
                duration: Some(25),
                break_duration: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    engine.start(p.id, user, StartPomodoro::default()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    engine.pause(p.id, user).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    let resumed = engine.resume(p.id, user).await.unwrap();
    assert!(resumed.pause_intervals[0].end_time.is_some());
    tokio::time::sleep(Duration::from_secs(1)).await;
    let done = engine.complete(p.id, user).await.unwrap();

    assert_eq!(done.status, PomodoroStatus::Completed);
    assert!((0..=2).contains(&done.total_paused_time), "paused {}", done.total_paused_time);
    assert!((2..=4).contains(&done.actual_work_time), "worked {}", done.actual_work_time);
}

#[tokio::test]
async fn explicit_start_time_is_honored() {
    let engine = service(InMemoryPomodoros::default());
    let user = Uuid::new_v4();
    let p = engine.create(user, CreatePomodoro::default()).await.unwrap();

    let started_at = Utc::now() - chrono::Duration::minutes(5);
    let running = engine
        .start(p.id, user, StartPomodoro { start_time: Some(started_at) })
        .await
        .unwrap();
    assert_eq!(running.start_time, Some(started_at));
    let remaining = running.remaining_time(Utc::now());
    assert!((1198..=1200).contains(&remaining), "remaining {remaining}");
}

#[tokio::test]
async fn one_running_session_per_user() {
    let engine = service(InMemoryPomodoros::default());
    let user = Uuid::new_v4();
    let first = engine.create(user, titled("first")).await.unwrap();
    let second = engine.create(user, titled("second")).await.unwrap();

    engine.start(first.id, user, StartPomodoro::default()).await.unwrap();
    assert!(matches!(
        engine.start(first.id, user, StartPomodoro::default()).await,
        Err(PomodoroError::AlreadyActive)
    ));
    assert!(matches!(
        engine.start(second.id, user, StartPomodoro::default()).await,
        Err(PomodoroError::ConflictActiveSession)
    ));

    // Another user is unaffected
    let other = Uuid::new_v4();
    let theirs = engine.create(other, titled("theirs")).await.unwrap();
    engine.start(theirs.id, other, StartPomodoro::default()).await.unwrap();

    engine.cancel(first.id, user).await.unwrap();
    engine.start(second.id, user, StartPomodoro::default()).await.unwrap();
    let active = engine.get_current_active(user).await.unwrap().unwrap();
    assert_eq!(active.id, second.id);
}

#[tokio::test]
async fn concurrent_starts_leave_one_running_session() {
    let engine = service(InMemoryPomodoros::default());
    let user = Uuid::new_v4();
    let a = engine.create(user, titled("a")).await.unwrap();
    let b = engine.create(user, titled("b")).await.unwrap();

    let (ra, rb) = tokio::join!(
        engine.start(a.id, user, StartPomodoro::default()),
        engine.start(b.id, user, StartPomodoro::default()),
    );
    assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);
    assert!(matches!(
        ra.err().or(rb.err()),
        Some(PomodoroError::ConflictActiveSession)
    ));
}

#[tokio::test]
async fn sessions_of_other_users_read_as_missing() {
    let engine = service(InMemoryPomodoros::default());
    let owner = Uuid::new_v4();
    let intruder = Uuid::new_v4();
    let p = engine.create(owner, CreatePomodoro::default()).await.unwrap();

    assert!(matches!(
        engine.find_one(p.id, intruder).await,
        Err(PomodoroError::NotFound)
    ));
    assert!(matches!(
        engine.start(p.id, intruder, StartPomodoro::default()).await,
        Err(PomodoroError::NotFound)
    ));
    assert!(matches!(
        engine.delete(p.id, intruder).await,
        Err(PomodoroError::NotFound)
    ));
    assert!(engine.find_one(p.id, owner).await.is_ok());
}

#[tokio::test]
async fn lifecycle_guards() {
    let engine = service(InMemoryPomodoros::default());
    let user = Uuid::new_v4();
    let p = engine.create(user, CreatePomodoro::default()).await.unwrap();

    assert!(matches!(
        engine.resume(p.id, user).await,
        Err(PomodoroError::InvalidState(_))
    ));
    engine.start(p.id, user, StartPomodoro::default()).await.unwrap();

    assert!(matches!(
        engine.delete(p.id, user).await,
        Err(PomodoroError::InvalidState(_))
    ));
    assert!(matches!(
        engine.update(p.id, user, UpdatePomodoro { duration: Some(50), ..Default::default() }).await,
        Err(PomodoroError::InvalidState(_))
    ));

    let paused = engine
        .update(
            p.id,
            user,
            UpdatePomodoro {
                status: Some(PomodoroStatus::Paused),
                duration: Some(50),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(paused.status, PomodoroStatus::Paused);
    assert_eq!(paused.duration, 50);

    engine.complete(p.id, user).await.unwrap();
    assert!(matches!(
        engine.complete(p.id, user).await,
        Err(PomodoroError::AlreadyCompleted)
    ));
    assert!(matches!(
        engine.cancel(p.id, user).await,
        Err(PomodoroError::InvalidState(_))
    ));
    assert!(matches!(
        engine.start(p.id, user, StartPomodoro::default()).await,
        Err(PomodoroError::InvalidState(_))
    ));

    engine.delete(p.id, user).await.unwrap();
    assert!(matches!(
        engine.find_one(p.id, user).await,
        Err(PomodoroError::NotFound)
    ));
}

#[tokio::test]
async fn listing_filters_searches_and_paginates() {
    let engine = service(InMemoryPomodoros::default());
    let user = Uuid::new_v4();
    for i in 0..12 {
        engine.create(user, titled(&format!("Focus block {i}"))).await.unwrap();
    }
    let report = engine
        .create(
            user,
            CreatePomodoro {
                title: Some("Quarterly".into()),
                description: Some("Write the REPORT draft".into()),
                kind: Some(PomodoroType::LongBreak),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    engine.create(Uuid::new_v4(), titled("Focus elsewhere")).await.unwrap();

    let first = engine.find_all(user, PomodoroQuery::default()).await.unwrap();
    assert_eq!(first.total, 13);
    assert_eq!(first.data.len(), 10);
    assert_eq!(first.total_pages, 2);
    assert_eq!(first.data[0].pomodoro.id, report.id);

    let second = engine
        .find_all(user, PomodoroQuery { page: Some(2), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(second.data.len(), 3);

    let search = engine
        .find_all(user, PomodoroQuery { search: Some("report".into()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(search.total, 1);

    let by_type = engine
        .find_all(
            user,
            PomodoroQuery { kind: Some(PomodoroType::LongBreak), ..Default::default() },
        )
        .await
        .unwrap();
    assert_eq!(by_type.data[0].pomodoro.id, report.id);

    let none_yet = engine
        .find_all(
            user,
            PomodoroQuery {
                start_date: Some(Utc::now() + chrono::Duration::days(1)),
                end_date: Some(Utc::now() + chrono::Duration::days(2)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(none_yet.total, 0);

    assert!(matches!(
        engine.find_all(user, PomodoroQuery { limit: Some(101), ..Default::default() }).await,
        Err(PomodoroError::Validation(_))
    ));
}

#[tokio::test]
async fn stats_aggregate_completed_work() {
    let store = InMemoryPomodoros::default();
    let engine = service(store.clone());
    let user = Uuid::new_v4();

    let mut done = engine.create(user, CreatePomodoro::default()).await.unwrap();
    done.status = PomodoroStatus::Completed;
    done.actual_work_time = 1500;
    store.put(done).await;
    engine.create(user, CreatePomodoro::default()).await.unwrap();
    engine.create(user, CreatePomodoro::default()).await.unwrap();

    let stats = engine.get_stats(user).await.unwrap();
    assert_eq!(stats.total_pomodoros, 3);
    assert_eq!(stats.completed_pomodoros, 1);
    assert_eq!(stats.total_work_time, 25);
    assert_eq!(stats.average_work_time, 25);
    assert_eq!(stats.completion_rate, 33.33);
    assert_eq!(stats.today_pomodoros, 3);
    assert_eq!(stats.week_pomodoros, 3);
    assert_eq!(stats.month_pomodoros, 3);

    let empty = engine.get_stats(Uuid::new_v4()).await.unwrap();
    assert_eq!(empty.total_pomodoros, 0);
    assert_eq!(empty.completion_rate, 0.0);
}
