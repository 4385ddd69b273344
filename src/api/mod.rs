/*
 * Local REST API exposing dashboard views
 */

use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{get, post, put, routes, State};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::error;
use crate::config::Config;
use crate::models::{DashboardError, DealCategory, GroupingKey, SubscriptionOutcome};
use crate::pipeline::DealRow;
use crate::service::{DashboardService, DashboardSnapshot, OpportunityHistory, RefreshOutcome};
use crate::settings::{AllSettings, FieldError, SaveReport, SettingsForm};

pub struct ApiState {
    pub config: Config,
    pub service: Arc<DashboardService>,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    pub min_profit: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub email: String,
}

fn error_status(err: &DashboardError) -> Status {
    match err {
        DashboardError::Connection(_) => Status::ServiceUnavailable,
        DashboardError::Request { .. } | DashboardError::Network(_) => Status::BadGateway,
        DashboardError::Validation { .. } => Status::UnprocessableEntity,
        _ => Status::InternalServerError,
    }
}

fn to_custom(err: DashboardError) -> Custom<String> {
    error!(error = %err, "API request failed");
    Custom(error_status(&err), err.to_string())
}

#[get("/health")]
pub async fn health_check() -> &'static str {
    "OK"
}

#[get("/api/v1/dashboard")]
pub async fn get_dashboard(state: &State<ApiState>) -> Json<DashboardSnapshot> {
    Json(state.service.snapshot().await)
}

#[get("/api/v1/deals/<category>")]
pub async fn get_deals(
    category: &str,
    state: &State<ApiState>,
) -> std::result::Result<Json<Vec<DealRow>>, Custom<String>> {
    let category = DealCategory::from_str(category)
        .map_err(|e| Custom(Status::NotFound, e.to_string()))?;
    Ok(Json(state.service.rows(category).await))
}

#[get("/api/v1/history/<source_pair>/<dest_pair>")]
pub async fn get_history(
    source_pair: &str,
    dest_pair: &str,
    state: &State<ApiState>,
) -> Json<OpportunityHistory> {
    let key = GroupingKey::new(source_pair, dest_pair);
    Json(state.service.history(&key).await)
}

#[post("/api/v1/refresh")]
pub async fn refresh(state: &State<ApiState>) -> std::result::Result<Json<RefreshOutcome>, Custom<String>> {
    state
        .service
        .trigger_refresh()
        .await
        .map(Json)
        .map_err(to_custom)
}

#[get("/api/v1/settings")]
pub async fn get_settings(state: &State<ApiState>) -> Json<AllSettings> {
    Json(state.service.settings())
}

#[put("/api/v1/settings", format = "json", data = "<form>")]
pub async fn put_settings(
    form: Json<SettingsForm>,
    state: &State<ApiState>,
) -> std::result::Result<Json<SaveReport>, Custom<Json<Vec<FieldError>>>> {
    state
        .service
        .save_settings(&form)
        .await
        .map(Json)
        .map_err(|errors| Custom(Status::UnprocessableEntity, Json(errors)))
}

#[post("/api/v1/alerts/subscribe", format = "json", data = "<body>")]
pub async fn subscribe_alerts(
    body: Json<SubscribeRequest>,
    state: &State<ApiState>,
) -> std::result::Result<Json<SubscriptionOutcome>, Custom<String>> {
    state
        .service
        .subscribe_alerts(&body.email, body.min_profit)
        .await
        .map(Json)
        .map_err(to_custom)
}

#[post("/api/v1/alerts/unsubscribe", format = "json", data = "<body>")]
pub async fn unsubscribe_alerts(
    body: Json<UnsubscribeRequest>,
    state: &State<ApiState>,
) -> std::result::Result<Json<u16>, Custom<String>> {
    state
        .service
        .unsubscribe_alerts(&body.email)
        .await
        .map(Json)
        .map_err(to_custom)
}

#[must_use]
pub fn create_rocket(state: ApiState) -> rocket::Rocket<rocket::Build> {
    let figment = rocket::Config::figment()
        .merge(("address", state.config.server.host.clone()))
        .merge(("port", state.config.server.port));

    rocket::custom(figment).manage(state).mount(
        "/",
        routes![
            health_check,
            get_dashboard,
            get_deals,
            get_history,
            refresh,
            get_settings,
            put_settings,
            subscribe_alerts,
            unsubscribe_alerts
        ],
    )
}
