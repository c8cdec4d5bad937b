use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use room_cell::{RoomAvailabilityService, RoomWindow};
use shared_models::EntityId;
use shared_utils::test_utils::{MockApiResponses, TestConfig};

fn window(start: (u32, u32), end: (u32, u32)) -> RoomWindow {
    RoomWindow::on(
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
        NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
    )
}

#[tokio::test]
async fn test_available_rooms_for_window() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rooms/available"))
        .and(query_param("startDate", "2024-05-01"))
        .and(query_param("endDate", "2024-05-01"))
        .and(query_param("startTime", "09:00"))
        .and(query_param("endTime", "12:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockApiResponses::room(3, "Room 3"),
            MockApiResponses::room(5, "Room 5"),
        ])))
        .mount(&mock_server)
        .await;

    let service = RoomAvailabilityService::new(&TestConfig::with_base_url(mock_server.uri()).to_app_config());
    let rooms = service.get_available_rooms(&window((9, 0), (12, 0)), "t").await.unwrap();

    let ids: Vec<EntityId> = rooms.into_iter().map(|room| room.id).collect();
    assert_eq!(ids, vec![EntityId::from(3), EntityId::from(5)]);
}

#[tokio::test]
async fn test_backwards_window_is_refused_without_request() {
    let mock_server = MockServer::start().await;

    let service = RoomAvailabilityService::new(&TestConfig::with_base_url(mock_server.uri()).to_app_config());
    let result = service.get_available_rooms(&window((12, 0), (9, 0)), "t").await;

    assert!(result.is_err());
    assert!(mock_server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_upstream_failure_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rooms/available"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let service = RoomAvailabilityService::new(&TestConfig::with_base_url(mock_server.uri()).to_app_config());
    assert!(service.get_available_rooms(&window((9, 0), (10, 0)), "t").await.is_err());
}
