//! ==============================================================================
//! api.rs - json http api
//! ==============================================================================
//!
//! purpose:
//!     exposes the sensor store and the ai gateway as json endpoints.
//!     every request runs: receive -> validate -> resolve/build prompt
//!     -> (gateway call) -> respond. failures become {status:"error", message}.
//!
//! routes:
//!     GET  /api/sensor-data           current reading or offline
//!     POST /api/sensor-data           station posts a (partial) reading
//!     GET  /api/sensor-data/history   every reading, oldest first
//!     POST /api/ai-analyze-sensors    status analysis of current/override values
//!     POST /api/ai-predict-growth     co2 absorption forecast
//!     POST /api/chatbot               conversational assistant
//!     GET  /api/health                liveness only
//!     *                               front-end (frontend.rs)
//!
//! ==============================================================================

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::domain::{ChatTurn, SensorInput};
use crate::error::ApiError;
use crate::frontend;
use crate::gateway::AiGateway;
use crate::prompts::{self, AnalysisParameters, PredictionConditions};
use crate::store::SensorStore;

// ==============================================================================
// shared state
// ==============================================================================
// everything here is a cheap clone-able handle; the store is the only
// mutable part and guards itself.

#[derive(Clone)]
pub struct AppState {
    pub store: SensorStore,
    pub gateway: AiGateway,
    pub dist_dir: Arc<PathBuf>,
    /// log each accepted reading
    pub show_sensor_data: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/sensor-data", get(get_sensor_data).post(post_sensor_data))
        .route("/api/sensor-data/history", get(get_sensor_history))
        .route("/api/ai-analyze-sensors", post(analyze_sensors))
        .route("/api/ai-predict-growth", post(predict_growth))
        .route("/api/chatbot", post(chatbot))
        .route("/api/health", get(health))
        .fallback(frontend::serve_frontend)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ==============================================================================
// sensor endpoints
// ==============================================================================

async fn get_sensor_data(State(state): State<AppState>) -> Json<Value> {
    match state.store.current().await {
        Some(reading) => Json(json!({ "status": "online", "data": reading })),
        None => Json(json!({ "status": "offline", "message": "Station has not connected yet" })),
    }
}

async fn post_sensor_data(
    State(state): State<AppState>,
    payload: Result<Json<SensorInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let input = match payload {
        Ok(Json(input)) if !input.is_empty() => input,
        Ok(_) => {
            return Err(ApiError::bad_request(
                "Reading has no sensor field with a non-null value",
            ))
        }
        Err(rejection) => {
            tracing::warn!("[SENSOR] rejected post: {}", rejection.body_text());
            return Err(ApiError::bad_request(format!(
                "Body is not a JSON sensor reading: {}",
                rejection.body_text()
            )));
        }
    };

    let (reading, count) = state.store.record(input).await;

    if state.show_sensor_data {
        tracing::info!(
            "[SENSOR] T={} H={} GPS={},{} (#{})",
            fmt_opt(reading.temperature),
            fmt_opt(reading.humidity),
            fmt_opt(reading.latitude),
            fmt_opt(reading.longitude),
            count,
        );
    }

    Ok((StatusCode::CREATED, Json(json!({ "status": "received", "data": reading }))))
}

async fn get_sensor_history(State(state): State<AppState>) -> Json<Value> {
    let history = state.store.history().await;
    Json(json!({ "status": "ok", "count": history.len(), "data": history }))
}

// ==============================================================================
// ai endpoints
// ==============================================================================

async fn analyze_sensors(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let overrides: SensorInput = optional_body(&body)?;
    let current = state.store.current().await;
    let parameters = AnalysisParameters::resolve(&overrides, current.as_ref(), state.store.fallback())?;

    let prompt = prompts::analysis_prompt(&parameters);
    let analysis = state
        .gateway
        .complete(&prompt.messages, prompt.params)
        .await
        .map_err(|e| log_ai_failure("analysis", e))?;

    Ok(Json(json!({ "status": "success", "analysis": analysis, "parameters": parameters })))
}

async fn predict_growth(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let overrides: SensorInput = optional_body(&body)?;
    let current = state.store.current().await;
    let conditions = PredictionConditions::resolve(&overrides, current.as_ref(), state.store.fallback())?;

    let prompt = prompts::prediction_prompt(&conditions);
    let prediction = state
        .gateway
        .complete(&prompt.messages, prompt.params)
        .await
        .map_err(|e| log_ai_failure("prediction", e))?;

    Ok(Json(json!({ "status": "success", "prediction": prediction, "conditions": conditions })))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ChatRequest {
    message: String,
    history: Vec<ChatTurn>,
}

async fn chatbot(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let request: ChatRequest = optional_body(&body)?;
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message must not be empty"));
    }

    let prompt = prompts::conversation_prompt(&request.message, &request.history);
    let response = state
        .gateway
        .complete(&prompt.messages, prompt.params)
        .await
        .map_err(|e| log_ai_failure("chatbot", e))?;

    Ok(Json(json!({ "status": "success", "response": response, "user_message": request.message })))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "GreenPulse API is running" }))
}

// ==============================================================================
// helpers
// ==============================================================================

/// absent, blank, or `null` body means "no overrides"
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice::<Option<T>>(body)
        .map(Option::unwrap_or_default)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))
}

fn log_ai_failure(endpoint: &str, e: crate::error::GatewayError) -> ApiError {
    tracing::error!("[AI] {} failed: {}", endpoint, e);
    e.into()
}

fn fmt_opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state_with(gateway: AiGateway, fallback: Option<SensorInput>) -> AppState {
        AppState {
            store: SensorStore::new(fallback),
            gateway,
            dist_dir: Arc::new(PathBuf::from("/nonexistent/greenpulse-dist")),
            show_sensor_data: false,
        }
    }

    fn offline_state() -> AppState {
        state_with(AiGateway::unavailable("no API key configured (set OPENAI_API_KEY)"), None)
    }

    fn live_gateway(base_url: &str) -> AiGateway {
        AiGateway::connect(base_url, "gpt-4o", "sk-test", Duration::from_secs(5)).unwrap()
    }

    async fn call(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };

        let res = router(state.clone()).oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_get_before_any_post_is_offline() {
        let state = offline_state();
        let (status, body) = call(&state, "GET", "/api/sensor-data", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "offline");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_post_then_get_returns_same_reading() {
        let state = offline_state();
        let (status, posted) = call(
            &state,
            "POST",
            "/api/sensor-data",
            Some(json!({ "temperature": 24.1, "humidity": 70 })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(posted["status"], "received");
        assert_eq!(posted["data"]["temperature"], 24.1);
        assert_eq!(posted["data"]["humidity"], 70.0);
        assert_eq!(posted["data"]["ph"], Value::Null);
        assert_eq!(posted["data"]["gps_valid"], false);
        assert!(posted["data"]["timestamp"].is_string());

        let (status, body) = call(&state, "GET", "/api/sensor-data", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "online");
        assert_eq!(body["data"], posted["data"]);
    }

    #[tokio::test]
    async fn test_empty_post_rejected_without_mutation() {
        let state = offline_state();

        let (status, body) = call(&state, "POST", "/api/sensor-data", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        for empty in [json!({}), json!({ "temperature": null }), json!({ "station_id": null, "foo": 1 })] {
            let (status, body) = call(&state, "POST", "/api/sensor-data", Some(empty)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], "Reading has no sensor field with a non-null value");
        }

        let (status, body) = call(&state, "POST", "/api/sensor-data", Some(json!({ "temperature": "hot" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("Body is not a JSON sensor reading"));

        assert!(state.store.current().await.is_none());
        assert!(state.store.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_history_lists_every_post_in_order() {
        let state = offline_state();
        for t in [20.0, 21.5, 23.0] {
            call(&state, "POST", "/api/sensor-data", Some(json!({ "temperature": t }))).await;
        }

        let (status, body) = call(&state, "GET", "/api/sensor-data/history", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        let temps: Vec<f64> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["temperature"].as_f64().unwrap())
            .collect();
        assert_eq!(temps, vec![20.0, 21.5, 23.0]);
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(&offline_state(), "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_ai_endpoints_report_unavailable_gateway() {
        let state = offline_state();
        call(&state, "POST", "/api/sensor-data", Some(json!({ "temperature": 22, "ph": 7.1 }))).await;

        for (uri, body) in [
            ("/api/ai-analyze-sensors", json!({})),
            ("/api/ai-predict-growth", json!({})),
            ("/api/chatbot", json!({ "message": "hello" })),
        ] {
            let (status, body) = call(&state, "POST", uri, Some(body)).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
            assert_eq!(body["status"], "error");
            assert!(body["message"].as_str().unwrap().contains("not available"), "{uri}: {body}");
        }
    }

    #[tokio::test]
    async fn test_chatbot_empty_message_rejected_regardless_of_history() {
        let upstream = mock::spawn(StatusCode::OK, mock::reply("unused")).await;
        let state = state_with(live_gateway(&upstream.base_url), None);

        for body in [
            json!({ "message": "" }),
            json!({ "message": "   ", "history": [{ "role": "user", "content": "hi" }] }),
            json!({ "history": [{ "role": "assistant", "content": "hello" }] }),
        ] {
            let (status, body) = call(&state, "POST", "/api/chatbot", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["status"], "error");
        }
        let (status, _) = call(&state, "POST", "/api/chatbot", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn test_chatbot_forwards_last_ten_turns() {
        let upstream = mock::spawn(StatusCode::OK, mock::reply("🌱 About 38 kg per year.")).await;
        let state = state_with(live_gateway(&upstream.base_url), None);

        let history: Vec<Value> = (0..14)
            .map(|i| {
                let role = if i % 2 == 0 { "user" } else { "assistant" };
                json!({ "role": role, "content": format!("turn {i}") })
            })
            .collect();
        let (status, body) = call(
            &state,
            "POST",
            "/api/chatbot",
            Some(json!({ "message": "How much CO2?", "history": history })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["response"], "🌱 About 38 kg per year.");
        assert_eq!(body["user_message"], "How much CO2?");

        let sent = upstream.last_body();
        let messages = sent["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 12);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "turn 4");
        assert_eq!(messages[11], json!({ "role": "user", "content": "How much CO2?" }));
        assert_eq!(sent["max_tokens"], 500);
        assert_eq!(sent["temperature"], 0.7);
    }

    #[tokio::test]
    async fn test_analysis_merges_overrides_over_current_reading() {
        let upstream = mock::spawn(StatusCode::OK, mock::reply("🟢 Status: Good")).await;
        let state = state_with(live_gateway(&upstream.base_url), None);
        call(
            &state,
            "POST",
            "/api/sensor-data",
            Some(json!({ "temperature": 22.0, "humidity": 65.0, "co2_ppm": 430.0, "light_intensity": 500.0, "satellites": 8 })),
        )
        .await;

        let (status, body) = call(&state, "POST", "/api/ai-analyze-sensors", Some(json!({ "temperature": 27.5 }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["analysis"], "🟢 Status: Good");
        assert_eq!(body["parameters"]["temperature"], 27.5);
        assert_eq!(body["parameters"]["humidity"], 65.0);
        assert_eq!(body["parameters"]["satellites"], 8);
        assert_eq!(body["parameters"]["latitude"], Value::Null);

        let sent = upstream.last_body();
        assert_eq!(sent["max_tokens"], 180);
        assert_eq!(sent["temperature"], 0.4);
        let user = sent["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("Temperature: 27.5°C"));
        assert!(user.contains("CO2: 430 ppm"));
    }

    #[tokio::test]
    async fn test_analysis_without_any_data_is_bad_request() {
        let upstream = mock::spawn(StatusCode::OK, mock::reply("unused")).await;
        let state = state_with(live_gateway(&upstream.base_url), None);

        let (status, body) = call(&state, "POST", "/api/ai-analyze-sensors", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn test_prediction_uses_fallback_profile_before_first_reading() {
        let upstream = mock::spawn(StatusCode::OK, mock::reply("⚡ Efficiency: 90%")).await;
        let fallback = SensorInput {
            ph: Some(7.0),
            temperature: Some(22.0),
            light_intensity: Some(500.0),
            ..SensorInput::default()
        };
        let state = state_with(live_gateway(&upstream.base_url), Some(fallback));

        let (status, body) = call(&state, "POST", "/api/ai-predict-growth", Some(json!({ "ph": 6.8 }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "⚡ Efficiency: 90%");
        assert_eq!(body["conditions"], json!({ "ph": 6.8, "temperature": 22.0, "light_intensity": 500.0 }));
        assert_eq!(upstream.last_body()["max_tokens"], 150);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500_with_provider_text() {
        let upstream = mock::spawn(
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "error": { "message": "Rate limit reached for gpt-4o" } }),
        )
        .await;
        let state = state_with(live_gateway(&upstream.base_url), None);

        let (status, body) = call(&state, "POST", "/api/chatbot", Some(json!({ "message": "hi" }))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "status": "error", "message": "Rate limit reached for gpt-4o" }));
    }

    #[test]
    fn test_optional_body() {
        let empty: SensorInput = optional_body(&Bytes::from_static(b"  \n")).unwrap();
        assert!(empty.is_empty());

        let null: SensorInput = optional_body(&Bytes::from_static(b"null")).unwrap();
        assert!(null.is_empty());

        let some: SensorInput = optional_body(&Bytes::from_static(br#"{"ph": 7.4}"#)).unwrap();
        assert_eq!(some.ph, Some(7.4));

        assert!(optional_body::<SensorInput>(&Bytes::from_static(b"{not json")).is_err());
    }
}
