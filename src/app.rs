use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::error::DashboardError;
use crate::filter::FilterQuery;
use crate::graph::Chart;
use crate::record::Table;
use crate::report::{DashboardReport, FilterChoices, ReportOptions, run_query};

/// Read-only state shared by every request
pub struct AppState {
    table: Arc<Table>,
    choices: FilterChoices,
    animation: Option<Value>,
    options: ReportOptions,
}

impl AppState {
    pub fn new(table: Table, animation: Option<Value>, options: ReportOptions) -> Self {
        let choices = FilterChoices::from_table(&table);
        AppState {
            table: Arc::new(table),
            choices,
            animation,
            options,
        }
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

#[derive(Serialize)]
struct TransactionsResponse {
    count: usize,
    records: Table,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(StatusResponse {
            status: "error".to_string(),
            message: Some(message),
        }),
    )
        .into_response()
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        match self {
            DashboardError::Filter(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
            DashboardError::Aggregate(e) => {
                error!("Aggregation failed: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        }
    }
}

/// Builds the router over an already loaded table
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/choices", get(get_choices))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/transactions", get(get_transactions))
        .route("/api/chart/:name", get(get_chart))
        .route("/api/animation", get(get_animation))
        .with_state(state)
}

pub async fn run(bind_addr: &str, state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(Arc::new(state));

    let listener = TcpListener::bind(bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(include_str!("./static/dashboard.html"))
}

async fn get_choices(State(state): State<Arc<AppState>>) -> Json<FilterChoices> {
    Json(state.choices.clone())
}

fn query_report(state: &AppState, query: &FilterQuery) -> Result<(Table, DashboardReport), DashboardError> {
    run_query(&state.table, query, &state.options).inspect_err(|e| warn!("Rejected query {:?}: {}", query, e))
}

async fn get_dashboard(
    Query(query): Query<FilterQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardReport>, DashboardError> {
    let (_, report) = query_report(&state, &query)?;
    Ok(Json(report))
}

async fn get_transactions(
    Query(query): Query<FilterQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<TransactionsResponse>, DashboardError> {
    let (records, _) = query_report(&state, &query)?;
    Ok(Json(TransactionsResponse {
        count: records.len(),
        records,
    }))
}

async fn get_chart(
    Path(name): Path<String>,
    Query(query): Query<FilterQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let chart = match name.parse::<Chart>() {
        Ok(chart) => chart,
        Err(message) => return error_response(StatusCode::NOT_FOUND, message),
    };

    let report = match query_report(&state, &query) {
        Ok((_, report)) => report,
        Err(e) => return e.into_response(),
    };

    match chart.render(&report) {
        Ok(svg) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        Err(e) => {
            error!("Failed to render {} chart: {}", chart.name(), e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to render chart: {}", e))
        }
    }
}

async fn get_animation(State(state): State<Arc<AppState>>) -> Response {
    match &state.animation {
        Some(doc) => Json(doc.clone()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "No animation loaded".to_string()),
    }
}
