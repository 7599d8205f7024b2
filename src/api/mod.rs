use axum::{
    Router, async_trait,
    body::Bytes,
    extract::{Form, FromRequest, Json, Request, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{SimulationInputs, project};
use crate::rate::SgsClient;

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const RATE_UNAVAILABLE_MESSAGE: &str = "Could not fetch the current rate";
const SIMULATION_RATE_UNAVAILABLE_MESSAGE: &str = "Could not fetch a rate for the simulation";

/// A payload field as either body format delivers it: JSON carries numbers
/// or strings, form encoding always carries strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FieldValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SimulatePayload {
    amount: Option<FieldValue>,
    annual_rate_percent: Option<FieldValue>,
    years: Option<FieldValue>,
    compounds_per_year: Option<FieldValue>,
    periodic_contribution: Option<FieldValue>,
}

#[async_trait]
impl<S> FromRequest<S> for SimulatePayload
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(payload) =
                Form::<SimulatePayload>::from_request(req, state)
                    .await
                    .map_err(|e| {
                        error_response(
                            StatusCode::BAD_REQUEST,
                            &format!("Invalid form payload: {e}"),
                        )
                    })?;
            return Ok(payload);
        }

        let body = Bytes::from_request(req, state).await.map_err(|e| {
            error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid request body: {e}"),
            )
        })?;
        if body.is_empty() {
            return Ok(SimulatePayload::default());
        }
        serde_json::from_slice(&body).map_err(|e| {
            error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid JSON payload: {e}"),
            )
        })
    }
}

/// Everything except the rate, which resolves afterwards and possibly
/// through the provider.
#[derive(Debug)]
struct NumericFields {
    amount: f64,
    years: f64,
    compounds_per_year: u32,
    periodic_contribution: f64,
}

fn coerce_numeric_fields(payload: &SimulatePayload) -> Result<NumericFields, String> {
    Ok(NumericFields {
        amount: float_field("amount", payload.amount.as_ref(), 0.0)?,
        years: float_field("years", payload.years.as_ref(), 1.0)?,
        compounds_per_year: integer_field(
            "compounds_per_year",
            payload.compounds_per_year.as_ref(),
            12,
        )?,
        periodic_contribution: float_field(
            "periodic_contribution",
            payload.periodic_contribution.as_ref(),
            0.0,
        )?,
    })
}

/// `Ok(None)` means the caller wants the latest published rate.
fn requested_rate(payload: &SimulatePayload) -> Result<Option<f64>, String> {
    match payload.annual_rate_percent.as_ref() {
        None => Ok(None),
        Some(FieldValue::Number(n)) => Ok(Some(*n)),
        Some(FieldValue::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map(Some)
                .map_err(|e| format!("invalid value for annual_rate_percent: {e}"))
        }
    }
}

fn float_field(field: &str, value: Option<&FieldValue>, default: f64) -> Result<f64, String> {
    match value {
        None => Ok(default),
        Some(FieldValue::Number(n)) => Ok(*n),
        Some(FieldValue::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(default);
            }
            trimmed
                .parse::<f64>()
                .map_err(|e| format!("invalid value for {field}: {e}"))
        }
    }
}

fn integer_field(field: &str, value: Option<&FieldValue>, default: u32) -> Result<u32, String> {
    match value {
        None => Ok(default),
        // Fractional counts truncate toward zero, negative ones clamp to
        // zero; both end in the zero-period fallback downstream.
        Some(FieldValue::Number(n)) => Ok(*n as u32),
        Some(FieldValue::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(default);
            }
            let parsed = trimmed
                .parse::<i64>()
                .map_err(|e| format!("invalid value for {field}: {e}"))?;
            Ok(parsed.clamp(0, u32::MAX as i64) as u32)
        }
    }
}

pub async fn run_http_server(port: u16, client: SgsClient) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(series = client.series(), "serving rate lookups");
    let app = router(client);

    let listener = TcpListener::bind(addr).await?;
    println!("Compound interest API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

fn router(client: SgsClient) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route("/api/rate", get(rate_handler))
        .route("/api/simulate", post(simulate_handler))
        .fallback(not_found_handler)
        .with_state(client)
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn rate_handler(State(client): State<SgsClient>) -> Response {
    match client.fetch_latest().await {
        Some(observation) => json_response(StatusCode::OK, observation),
        None => error_response(StatusCode::SERVICE_UNAVAILABLE, RATE_UNAVAILABLE_MESSAGE),
    }
}

async fn simulate_handler(State(client): State<SgsClient>, payload: SimulatePayload) -> Response {
    simulate_handler_impl(&client, payload).await
}

async fn simulate_handler_impl(client: &SgsClient, payload: SimulatePayload) -> Response {
    // Numeric fields are checked before any rate lookup, so a malformed
    // field fails fast without an upstream round trip.
    let fields = match coerce_numeric_fields(&payload) {
        Ok(fields) => fields,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let annual_rate_percent = match requested_rate(&payload) {
        Ok(Some(rate)) => rate,
        Ok(None) => match client.fetch_latest().await {
            Some(observation) => observation.value,
            None => {
                return error_response(
                    StatusCode::SERVICE_UNAVAILABLE,
                    SIMULATION_RATE_UNAVAILABLE_MESSAGE,
                );
            }
        },
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let inputs = SimulationInputs {
        principal: fields.amount,
        annual_rate_percent,
        years: fields.years,
        compounds_per_year: fields.compounds_per_year,
        periodic_contribution: fields.periodic_contribution,
    };
    json_response(StatusCode::OK, project(&inputs))
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
