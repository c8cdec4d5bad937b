use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use tokio::sync::{Mutex, Notify};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use room_cell::{AvailableRoom, RoomWindow};
use session_coordinator_cell::{
    AvailabilityCoordinator, CoordinatorDriver, CoordinatorOptions, CoordinatorState, Event,
    FlowVariant, NoticeCode, Permissions, PlanSource, RoomSource, SessionDraft, ShiftKey,
    ShiftLookup, ShiftSource,
};
use shared_models::auth::ActorRole;
use shared_models::EntityId;
use shared_utils::test_utils::{MockApiResponses, TestConfig};
use staff_schedule_cell::{ShiftStatus, WorkShift};
use treatment_plan_cell::TreatmentPlanBounds;

fn d(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn shift(shift_id: i64, staff: &str, date: &str, start: u32, end: u32, room: i64) -> WorkShift {
    WorkShift {
        id: EntityId::from(shift_id),
        staff_id: EntityId::from(staff),
        shift_date: d(date),
        start_time: t(start, 0),
        end_time: t(end, 0),
        room_id: Some(EntityId::from(room)),
        status: ShiftStatus::Active,
        slot: Some(1),
        appointments: None,
    }
}

// ==============================================================================
// FAKE SOURCES
// ==============================================================================

/// Shifts by staff id. Staff listed in `gated` wait for `release` first.
#[derive(Default)]
struct FakeShifts {
    by_staff: HashMap<String, Vec<WorkShift>>,
    gated: Option<String>,
    release: Arc<Notify>,
}

#[async_trait]
impl ShiftSource for FakeShifts {
    async fn fetch_shifts(&self, key: &ShiftKey, _auth_token: &str) -> Result<Vec<WorkShift>> {
        if self.gated.as_deref() == Some(key.staff_id.as_str()) {
            self.release.notified().await;
        }
        Ok(self
            .by_staff
            .get(key.staff_id.as_str())
            .cloned()
            .unwrap_or_default())
    }
}

struct FakeRooms(Vec<AvailableRoom>);

#[async_trait]
impl RoomSource for FakeRooms {
    async fn fetch_rooms(&self, _window: &RoomWindow, _auth_token: &str) -> Result<Vec<AvailableRoom>> {
        Ok(self.0.clone())
    }
}

struct FakePlans(Option<TreatmentPlanBounds>);

#[async_trait]
impl PlanSource for FakePlans {
    async fn fetch_plan(&self, plan_id: &EntityId, _auth_token: &str) -> Result<TreatmentPlanBounds> {
        self.0
            .clone()
            .ok_or_else(|| anyhow!("Treatment plan {} not found", plan_id))
    }
}

struct FailingShifts;

#[async_trait]
impl ShiftSource for FailingShifts {
    async fn fetch_shifts(&self, _key: &ShiftKey, _auth_token: &str) -> Result<Vec<WorkShift>> {
        Err(anyhow!("connection reset by peer"))
    }
}

fn rooms(ids: &[i64]) -> Vec<AvailableRoom> {
    ids.iter()
        .map(|id| AvailableRoom {
            id: EntityId::from(*id),
            name: format!("Room {}", id),
            location: None,
            floor_number: None,
        })
        .collect()
}

fn driver(shifts: impl ShiftSource + 'static, plan: Option<TreatmentPlanBounds>) -> CoordinatorDriver {
    CoordinatorDriver::with_sources(
        Arc::new(shifts),
        Arc::new(FakeRooms(rooms(&[3, 5]))),
        Arc::new(FakePlans(plan)),
    )
}

fn seeded(staff: &str, date: &str) -> CoordinatorOptions {
    let seed = SessionDraft {
        staff_id: Some(EntityId::from(staff)),
        date: Some(d(date)),
        ..SessionDraft::default()
    };
    CoordinatorOptions::new(FlowVariant::Appointment, Permissions::new(ActorRole::Manager, None))
        .with_seed(seed)
}

// ==============================================================================
// TESTS
// ==============================================================================

#[tokio::test]
async fn test_settle_runs_follow_up_room_check() {
    let shifts = FakeShifts {
        by_staff: HashMap::from([(
            "staff-x".to_string(),
            vec![shift(1, "staff-x", "2024-05-01", 9, 12, 3)],
        )]),
        ..FakeShifts::default()
    };
    let driver = driver(shifts, None);

    let (mut coordinator, commands) = AvailabilityCoordinator::open(seeded("staff-x", "2024-05-01"));
    driver.settle(&mut coordinator, commands, "token").await;

    assert_eq!(coordinator.state(), CoordinatorState::AutoFilled);
    let request = coordinator.prepare_submission().unwrap();
    assert_eq!(request.payload.room_id, EntityId::from(3));
    assert_eq!(request.payload.schedule_id, Some(EntityId::from(1)));
}

#[tokio::test]
async fn test_source_errors_become_failed_results() {
    let driver = driver(FailingShifts, None);

    let (mut coordinator, commands) = AvailabilityCoordinator::open(seeded("staff-x", "2024-05-01"));
    driver.settle(&mut coordinator, commands, "token").await;

    assert_eq!(coordinator.state(), CoordinatorState::Manual);
    let notices = coordinator.take_notices();
    assert!(notices.iter().any(|n| n.code == NoticeCode::ScheduleQueryFailed));
}

#[tokio::test]
async fn test_execute_answers_every_command() {
    let plan = TreatmentPlanBounds {
        id: EntityId::from(4),
        start_date: d("2024-01-01"),
        end_date: d("2024-01-31"),
    };
    let driver = driver(FakeShifts::default(), Some(plan));

    let options = CoordinatorOptions::new(
        FlowVariant::TreatmentSession { plan_id: EntityId::from(4) },
        Permissions::new(ActorRole::Staff, Some(EntityId::from("staff-1"))),
    )
    .with_lookup(ShiftLookup::PlanWindow);
    let (_, commands) = AvailabilityCoordinator::open(options);

    let events = driver.execute(commands, "token").await;
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], Event::PlanLoaded { result: Ok(bounds), .. } if bounds.id == EntityId::from(4)));
}

#[tokio::test]
async fn test_late_result_for_previous_staff_is_dropped() {
    let release = Arc::new(Notify::new());
    let shifts = FakeShifts {
        by_staff: HashMap::from([
            ("staff-x".to_string(), vec![shift(1, "staff-x", "2024-05-01", 9, 12, 3)]),
            ("staff-y".to_string(), vec![shift(2, "staff-y", "2024-05-01", 13, 17, 5)]),
        ]),
        gated: Some("staff-x".to_string()),
        release: release.clone(),
    };
    let driver = driver(shifts, None);

    let (coordinator, commands) = AvailabilityCoordinator::open(seeded("staff-x", "2024-05-01"));
    let coordinator = Arc::new(Mutex::new(coordinator));

    // staff-x's query hangs while the user switches to staff-y.
    let slow = {
        let driver = driver.clone();
        let coordinator = coordinator.clone();
        tokio::spawn(async move { driver.settle_shared(&coordinator, commands, "token").await })
    };

    let commands = coordinator
        .lock()
        .await
        .dispatch(Event::StaffChanged(Some(EntityId::from("staff-y"))));
    driver.settle_shared(&coordinator, commands, "token").await;

    release.notify_one();
    slow.await.unwrap();

    let coordinator = coordinator.lock().await;
    assert_eq!(coordinator.state(), CoordinatorState::AutoFilled);
    assert_eq!(coordinator.draft().staff_id, Some(EntityId::from("staff-y")));
    assert_eq!(coordinator.draft().schedule_id, Some(EntityId::from(2)));
    assert_eq!(coordinator.draft().start_time, Some(t(13, 0)));
}

#[tokio::test]
async fn test_driver_against_mock_api() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/staff-schedules"))
        .and(query_param("staffId", "staff-y"))
        .and(header("Authorization", "Bearer desk-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockApiResponses::work_shift(1, "staff-y", "2024-06-10", "09:00", "12:00", 3),
            MockApiResponses::work_shift(2, "staff-y", "2024-06-10", "13:00", "17:00", 4),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rooms/available"))
        .and(query_param("startDate", "2024-06-10"))
        .and(query_param("startTime", "13:00"))
        .and(query_param("endTime", "17:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [MockApiResponses::room(4, "Sauna")]
        })))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_base_url(mock_server.uri()).to_app_config();
    let driver = CoordinatorDriver::new(&config);

    let (mut coordinator, commands) = AvailabilityCoordinator::open(seeded("staff-y", "2024-06-10"));
    driver.settle(&mut coordinator, commands, "desk-token").await;
    assert_eq!(coordinator.state(), CoordinatorState::NeedsChoice);
    assert_eq!(coordinator.candidates().len(), 2);

    let commands = coordinator.dispatch(Event::UserSelectedShift(EntityId::from(2)));
    driver.settle(&mut coordinator, commands, "desk-token").await;

    let snapshot = coordinator.snapshot();
    assert!(snapshot.can_submit);
    assert_eq!(snapshot.room_options.len(), 1);
    assert_eq!(snapshot.room_options[0].name, "Sauna");
}
