use chrono::NaiveDate;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_models::EntityId;
use shared_utils::test_utils::{MockApiResponses, TestConfig};
use treatment_plan_cell::TreatmentPlanService;

#[tokio::test]
async fn test_get_plan_bounds_ignores_extra_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/treatment-plans/12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockApiResponses::treatment_plan(12, "2024-01-01", "2024-01-31"),
        ))
        .mount(&mock_server)
        .await;

    let service = TreatmentPlanService::new(&TestConfig::with_base_url(mock_server.uri()).to_app_config());
    let plan = service.get_plan_bounds(&EntityId::from(12), "t").await.unwrap();

    assert_eq!(plan.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(plan.end_date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
}

#[tokio::test]
async fn test_inverted_plan_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/treatment-plans/13"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockApiResponses::treatment_plan(13, "2024-02-01", "2024-01-01"),
        ))
        .mount(&mock_server)
        .await;

    let service = TreatmentPlanService::new(&TestConfig::with_base_url(mock_server.uri()).to_app_config());
    assert!(service.get_plan_bounds(&EntityId::from(13), "t").await.is_err());
}

#[tokio::test]
async fn test_missing_plan_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/treatment-plans/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let service = TreatmentPlanService::new(&TestConfig::with_base_url(mock_server.uri()).to_app_config());
    assert!(service.get_plan_bounds(&EntityId::from(404), "t").await.is_err());
}
