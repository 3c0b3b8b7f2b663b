// Pet Clinic - Web Server
// JSON API over the clinic service (axum)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use pet_clinic::{
    logging, seed_pet_types, ClinicError, ClinicService, Config, EntityId, FormOutcome, NewVisit, Owner,
    OwnerPageView, PetType, Rejections, SearchOutcome, SqliteRepository,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

type Service = ClinicService<SqliteRepository>;

/// Shared application state
#[derive(Clone)]
struct AppState {
    service: Arc<Mutex<Service>>,
}

impl AppState {
    fn new(service: Service) -> Self {
        AppState {
            service: Arc::new(Mutex::new(service)),
        }
    }

    /// One request at a time touches the store
    fn lock(&self) -> Result<MutexGuard<'_, Service>, ApiError> {
        self.service.lock().map_err(|_| ApiError::Poisoned)
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejections: Option<Rejections>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            rejections: None,
        }
    }
}

impl ApiResponse<()> {
    fn failed(error: String, rejections: Option<Rejections>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            rejections,
        }
    }
}

/// Search result, tagged by which branch the search took
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum SearchResponse {
    NotFound { rejections: Rejections },
    Single { owner: Owner },
    Page(OwnerPageView),
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        match outcome {
            SearchOutcome::NotFound(rejections) => SearchResponse::NotFound { rejections },
            SearchOutcome::Single(owner) => SearchResponse::Single { owner },
            SearchOutcome::Page(view) => SearchResponse::Page(view),
        }
    }
}

#[derive(Deserialize)]
struct FindParams {
    #[serde(rename = "lastName")]
    last_name: Option<String>,
    page: Option<usize>,
}

/// Pet form: the type travels as its display text
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PetForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    birth_date: Option<NaiveDate>,
    #[serde(default, rename = "type")]
    pet_type: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

enum ApiError {
    Rejected(Rejections),
    Clinic(ClinicError),
    Poisoned,
}

impl From<ClinicError> for ApiError {
    fn from(err: ClinicError) -> Self {
        ApiError::Clinic(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Rejected(rejections) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiResponse::failed("validation failed".to_string(), Some(rejections)),
            ),
            ApiError::Clinic(err) => {
                let status = match &err {
                    ClinicError::InvalidReference { .. } => StatusCode::NOT_FOUND,
                    ClinicError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                    _ => {
                        tracing::error!(error = %err, "request failed");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, ApiResponse::failed(err.to_string(), None))
            }
            ApiError::Poisoned => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::failed("service unavailable".to_string(), None),
            ),
        };
        (status, Json(body)).into_response()
    }
}

fn respond<T: Serialize>(status: StatusCode, outcome: FormOutcome<T>) -> Result<Response, ApiError> {
    match outcome {
        FormOutcome::Saved(value) => Ok((status, Json(ApiResponse::ok(value))).into_response()),
        FormOutcome::Rejected(rejections) => Err(ApiError::Rejected(rejections)),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/owners?lastName=&page=
async fn find_owners(State(state): State<AppState>, Query(params): Query<FindParams>) -> Result<Response, ApiError> {
    let service = state.lock()?;
    let outcome = service.find_owners(params.page.unwrap_or(1), params.last_name.as_deref())?;
    Ok(Json(ApiResponse::ok(SearchResponse::from(outcome))).into_response())
}

/// POST /api/owners
async fn create_owner(State(state): State<AppState>, Json(payload): Json<Owner>) -> Result<Response, ApiError> {
    let outcome = state.lock()?.create_owner(payload)?;
    respond(StatusCode::CREATED, outcome)
}

/// GET /api/owners/:owner_id
async fn show_owner(State(state): State<AppState>, Path(owner_id): Path<EntityId>) -> Result<Response, ApiError> {
    let owner = state.lock()?.show_owner(owner_id)?;
    Ok(Json(ApiResponse::ok(owner)).into_response())
}

/// PUT /api/owners/:owner_id
async fn update_owner(
    State(state): State<AppState>,
    Path(owner_id): Path<EntityId>,
    Json(payload): Json<Owner>,
) -> Result<Response, ApiError> {
    let outcome = state.lock()?.update_owner(owner_id, payload)?;
    respond(StatusCode::OK, outcome)
}

/// DELETE /api/owners/:owner_id
async fn delete_owner(State(state): State<AppState>, Path(owner_id): Path<EntityId>) -> Result<Response, ApiError> {
    state.lock()?.delete_owner(owner_id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// POST /api/owners/:owner_id/pets
async fn create_pet(
    State(state): State<AppState>,
    Path(owner_id): Path<EntityId>,
    Json(form): Json<PetForm>,
) -> Result<Response, ApiError> {
    let mut service = state.lock()?;
    let pet = service
        .pet_from_form(&form.name, form.birth_date, form.pet_type.as_deref())?
        .map_err(ApiError::Rejected)?;
    let outcome = service.create_pet(owner_id, pet)?;
    respond(StatusCode::CREATED, outcome)
}

/// PUT /api/owners/:owner_id/pets/:pet_id
async fn update_pet(
    State(state): State<AppState>,
    Path((owner_id, pet_id)): Path<(EntityId, EntityId)>,
    Json(form): Json<PetForm>,
) -> Result<Response, ApiError> {
    let mut service = state.lock()?;
    let pet = service
        .pet_from_form(&form.name, form.birth_date, form.pet_type.as_deref())?
        .map_err(ApiError::Rejected)?;
    let outcome = service.update_pet(owner_id, pet_id, pet)?;
    respond(StatusCode::OK, outcome)
}

/// POST /api/owners/:owner_id/pets/:pet_id/visits
async fn create_visit(
    State(state): State<AppState>,
    Path((owner_id, pet_id)): Path<(EntityId, EntityId)>,
    Json(form): Json<NewVisit>,
) -> Result<Response, ApiError> {
    let outcome = state.lock()?.create_visit(owner_id, pet_id, form)?;
    respond(StatusCode::CREATED, outcome)
}

/// GET /api/pettypes
async fn list_pet_types(State(state): State<AppState>) -> Result<Response, ApiError> {
    let types: Vec<PetType> = state.lock()?.list_pet_types()?;
    Ok(Json(ApiResponse::ok(types)).into_response())
}

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/owners", get(find_owners).post(create_owner))
        .route(
            "/owners/:owner_id",
            get(show_owner).put(update_owner).delete(delete_owner),
        )
        .route("/owners/:owner_id/pets", post(create_pet))
        .route("/owners/:owner_id/pets/:pet_id", put(update_pet))
        .route("/owners/:owner_id/pets/:pet_id/visits", post(create_visit))
        .route("/pettypes", get(list_pet_types))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logging::init(&config);

    println!("🌐 Pet Clinic - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let repo = SqliteRepository::open(&config.database_path)?;
    let seeded = seed_pet_types(repo.connection())?;
    println!("✓ Database opened: {}", config.database_path.display());
    if seeded > 0 {
        println!("✓ Seeded {} pet types", seeded);
    }

    let state = AppState::new(ClinicService::new(repo).with_page_size(config.page_size));

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;

    println!("\n🚀 Server running on http://{}", config.bind_address);
    println!("   API: http://{}/api/owners", config.bind_address);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app(state)).await?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let repo = SqliteRepository::open_in_memory().unwrap();
        seed_pet_types(repo.connection()).unwrap();
        AppState::new(ClinicService::new(repo))
    }

    async fn call(state: &AppState, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn george() -> Value {
        json!({
            "firstName": "George",
            "lastName": "Franklin",
            "address": "110 W. Liberty St.",
            "city": "Madison",
            "telephone": "6085551023"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(&test_state(), Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_owner_lifecycle() {
        let state = test_state();

        let (status, body) = call(&state, Method::POST, "/api/owners", Some(george())).await;
        assert_eq!(status, StatusCode::CREATED);
        let owner_id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = call(
            &state,
            Method::POST,
            &format!("/api/owners/{}/pets", owner_id),
            Some(json!({"name": "Leo", "birthDate": "2020-09-07", "type": "cat"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let pet_id = body["data"]["pets"][0]["id"].as_i64().unwrap();

        let (status, body) = call(
            &state,
            Method::POST,
            &format!("/api/owners/{}/pets/{}/visits", owner_id, pet_id),
            Some(json!({"date": "2024-01-15", "description": "rabies shot"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["pets"][0]["visits"][0]["description"], "rabies shot");

        let (status, body) = call(&state, Method::GET, &format!("/api/owners/{}", owner_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pets"][0]["type"]["name"], "cat");

        let (status, _) = call(&state, Method::DELETE, &format!("/api/owners/{}", owner_id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&state, Method::GET, &format!("/api/owners/{}", owner_id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rejections_are_422() {
        let state = test_state();

        let mut bad = george();
        bad["telephone"] = json!("12345");
        let (status, body) = call(&state, Method::POST, "/api/owners", Some(bad)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["rejections"][0]["field"], "telephone");

        let (_, body) = call(&state, Method::POST, "/api/owners", Some(george())).await;
        let owner_id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = call(
            &state,
            Method::POST,
            &format!("/api/owners/{}/pets", owner_id),
            Some(json!({"name": "Leo", "birthDate": "2020-09-07", "type": "unicorn"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["rejections"][0]["field"], "type");
    }

    #[tokio::test]
    async fn test_update_owner_mismatch_and_unknown() {
        let state = test_state();
        let (_, body) = call(&state, Method::POST, "/api/owners", Some(george())).await;
        let owner_id = body["data"]["id"].as_i64().unwrap();

        let mut payload = george();
        payload["id"] = json!(owner_id + 1);
        let (status, body) = call(&state, Method::PUT, &format!("/api/owners/{}", owner_id), Some(payload)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["rejections"][0]["field"], "id");

        let mut payload = george();
        payload["id"] = json!(999);
        let (status, _) = call(&state, Method::PUT, "/api/owners/999", Some(payload)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_branches() {
        let state = test_state();

        let (_, body) = call(&state, Method::GET, "/api/owners?lastName=Frank", None).await;
        assert_eq!(body["data"]["kind"], "notFound");

        call(&state, Method::POST, "/api/owners", Some(george())).await;
        let (_, body) = call(&state, Method::GET, "/api/owners?lastName=Frank", None).await;
        assert_eq!(body["data"]["kind"], "single");
        assert_eq!(body["data"]["owner"]["lastName"], "Franklin");

        call(&state, Method::POST, "/api/owners", Some(george())).await;
        let (_, body) = call(&state, Method::GET, "/api/owners?lastName=Frank&page=1", None).await;
        assert_eq!(body["data"]["kind"], "page");
        assert_eq!(body["data"]["totalItems"], 2);
        assert_eq!(body["data"]["currentPage"], 1);
    }

    #[tokio::test]
    async fn test_pet_types_sorted() {
        let (status, body) = call(&test_state(), Method::GET, "/api/pettypes", None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["bird", "cat", "dog", "hamster", "lizard", "snake"]);
    }
}
