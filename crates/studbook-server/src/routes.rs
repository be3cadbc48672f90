//! REST transport
//!
//! JSON over HTTP for horses, owners and lineage trees.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use studbook_core::{
    Error, HorseDraft, HorseId, HorseSearch, LineageNode, OwnerDraft, OwnerId, OwnerSearch,
    DEFAULT_GENERATIONS,
};
use studbook_storage::StorageBackend;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::dto::{ErrorDto, HorseDetailDto, HorseListDto, OwnerDto};
use crate::service::Studbook;

/// Maximum request body size (1MB)
const MAX_BODY_SIZE: usize = 1024 * 1024;

type AppState<S> = State<Arc<Studbook<S>>>;

/// Domain error carried out of a handler
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::HorseNotFound(_) | Error::OwnerNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidGenerations(_) => StatusCode::BAD_REQUEST,
            Error::Storage(_) | Error::Serialization(_) | Error::Fatal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::warn!("Request rejected ({}): {}", status.as_u16(), self.0);
        }
        (status, Json(ErrorDto::from_error(&self.0))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
struct TreeParams {
    generations: Option<i64>,
}

/// Create the REST router
pub fn create_router<S: StorageBackend + ?Sized + 'static>(service: Arc<Studbook<S>>) -> Router {
    // Restrictive CORS: only allow localhost origins
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
            HeaderValue::from_static("http://localhost:4200"),
            HeaderValue::from_static("http://127.0.0.1:4200"),
            HeaderValue::from_static("http://localhost:8080"),
            HeaderValue::from_static("http://127.0.0.1:8080"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/horses", get(list_horses::<S>).post(create_horse::<S>))
        .route(
            "/horses/:id",
            get(get_horse::<S>).put(update_horse::<S>).delete(delete_horse::<S>),
        )
        .route("/horses/:id/familytree", get(family_tree::<S>))
        .route("/owners", get(list_owners::<S>).post(create_owner::<S>))
        .route("/owners/:id", get(get_owner::<S>))
        .route("/health", get(health_handler::<S>))
        .with_state(service)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
}

/// Health check endpoint
async fn health_handler<S: StorageBackend + ?Sized + 'static>(
    State(service): AppState<S>,
) -> impl IntoResponse {
    let storage = service.storage().health_check().await.unwrap_or(false);
    Json(serde_json::json!({
        "status": if storage { "ok" } else { "degraded" },
        "server": "studbook",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn list_horses<S: StorageBackend + ?Sized + 'static>(
    State(service): AppState<S>,
    Query(filter): Query<HorseSearch>,
) -> ApiResult<Json<Vec<HorseListDto>>> {
    tracing::debug!("GET /horses {:?}", filter);
    let horses = if filter == HorseSearch::default() {
        service.list_horses().await?
    } else {
        service.search_horses(&filter).await?
    };
    Ok(Json(horses))
}

async fn create_horse<S: StorageBackend + ?Sized + 'static>(
    State(service): AppState<S>,
    Json(draft): Json<HorseDraft>,
) -> ApiResult<(StatusCode, Json<HorseDetailDto>)> {
    tracing::debug!("POST /horses {:?}", draft);
    let horse = service.create_horse(&draft).await?;
    Ok((StatusCode::CREATED, Json(horse)))
}

async fn get_horse<S: StorageBackend + ?Sized + 'static>(
    State(service): AppState<S>,
    Path(id): Path<i64>,
) -> ApiResult<Json<HorseDetailDto>> {
    tracing::debug!("GET /horses/{}", id);
    Ok(Json(service.get_horse(HorseId(id)).await?))
}

async fn update_horse<S: StorageBackend + ?Sized + 'static>(
    State(service): AppState<S>,
    Path(id): Path<i64>,
    Json(draft): Json<HorseDraft>,
) -> ApiResult<Json<HorseDetailDto>> {
    tracing::debug!("PUT /horses/{} {:?}", id, draft);
    Ok(Json(service.update_horse(HorseId(id), draft).await?))
}

async fn delete_horse<S: StorageBackend + ?Sized + 'static>(
    State(service): AppState<S>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    tracing::debug!("DELETE /horses/{}", id);
    service.delete_horse(HorseId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn family_tree<S: StorageBackend + ?Sized + 'static>(
    State(service): AppState<S>,
    Path(id): Path<i64>,
    Query(params): Query<TreeParams>,
) -> ApiResult<Json<LineageNode>> {
    let generations = params.generations.unwrap_or(i64::from(DEFAULT_GENERATIONS));
    tracing::debug!("GET /horses/{}/familytree generations={}", id, generations);
    Ok(Json(service.lineage_tree(HorseId(id), generations).await?))
}

async fn list_owners<S: StorageBackend + ?Sized + 'static>(
    State(service): AppState<S>,
    Query(filter): Query<OwnerSearch>,
) -> ApiResult<Json<Vec<OwnerDto>>> {
    tracing::debug!("GET /owners {:?}", filter);
    let owners = if filter == OwnerSearch::default() {
        service.list_owners().await?
    } else {
        service.search_owners(&filter).await?
    };
    Ok(Json(owners))
}

async fn create_owner<S: StorageBackend + ?Sized + 'static>(
    State(service): AppState<S>,
    Json(draft): Json<OwnerDraft>,
) -> ApiResult<(StatusCode, Json<OwnerDto>)> {
    tracing::debug!("POST /owners {:?}", draft);
    let owner = service.create_owner(&draft).await?;
    Ok((StatusCode::CREATED, Json(owner)))
}

async fn get_owner<S: StorageBackend + ?Sized + 'static>(
    State(service): AppState<S>,
    Path(id): Path<i64>,
) -> ApiResult<Json<OwnerDto>> {
    tracing::debug!("GET /owners/{}", id);
    Ok(Json(service.get_owner(OwnerId(id)).await?))
}

/// Serve the REST API until the listener fails
pub async fn run_server<S: StorageBackend + ?Sized + 'static>(
    service: Arc<Studbook<S>>,
    addr: &str,
) -> anyhow::Result<()> {
    let router = create_router(service);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Studbook REST server listening on {}", addr);
    tracing::info!("  Horses: http://{}/horses", addr);
    tracing::info!("  Owners: http://{}/owners", addr);
    tracing::info!("  Health check: http://{}/health", addr);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use studbook_storage::MemoryStorage;
    use tower::ServiceExt;

    fn router() -> Router {
        let service = Studbook::new(Arc::new(MemoryStorage::new()))
            .with_clock(|| NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        create_router(Arc::new(service))
    }

    async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&router(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_horse_lifecycle() {
        let router = router();

        let (status, owner) = send(
            &router,
            "POST",
            "/owners",
            Some(json!({"firstName": "Anna", "lastName": "Huber", "email": "anna@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, mare) = send(
            &router,
            "POST",
            "/horses",
            Some(json!({
                "name": "Wendy",
                "dateOfBirth": "2010-04-12",
                "sex": "FEMALE",
                "ownerId": owner["id"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(mare["owner"]["lastName"], "Huber");

        let (status, foal) = send(
            &router,
            "POST",
            "/horses",
            Some(json!({
                "name": "Hugo",
                "dateOfBirth": "2018-05-01",
                "sex": "MALE",
                "motherId": mare["id"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(foal["mother"]["name"], "Wendy");

        let uri = format!("/horses/{}", foal["id"]);
        let (status, fetched) = send(&router, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["dateOfBirth"], "2018-05-01");

        let (status, updated) = send(
            &router,
            "PUT",
            &uri,
            Some(json!({
                "name": "Hugo II",
                "dateOfBirth": "2018-05-01",
                "sex": "MALE",
                "motherId": mare["id"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Hugo II");

        let (status, listed) = send(&router, "GET", "/horses?name=hugo", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let (status, _) = send(&router, "DELETE", &format!("/horses/{}", mare["id"]), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, orphan) = send(&router, "GET", &uri, None).await;
        assert!(orphan["mother"].is_null());
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let router = router();

        let (status, body) = send(&router, "POST", "/horses", Some(json!({"name": ""}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["errors"],
            json!([
                "Name of the horse cannot be blank",
                "Date of birth of the horse cannot be null",
                "Sex of the horse cannot be null"
            ])
        );

        let (status, body) = send(
            &router,
            "POST",
            "/horses",
            Some(json!({
                "name": "Lonely",
                "dateOfBirth": "2015-01-01",
                "sex": "MALE",
                "fatherId": 99
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["errors"], json!(["The given father does not exist"]));

        let (status, body) = send(&router, "GET", "/horses/12345", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No horse with ID 12345 found");

        let (status, _) = send(&router, "GET", "/owners/3", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_family_tree() {
        let router = router();
        let (_, dam) = send(
            &router,
            "POST",
            "/horses",
            Some(json!({"name": "Dam", "dateOfBirth": "2000-01-01", "sex": "FEMALE"})),
        )
        .await;
        let (_, foal) = send(
            &router,
            "POST",
            "/horses",
            Some(json!({
                "name": "Foal",
                "dateOfBirth": "2010-01-01",
                "sex": "FEMALE",
                "motherId": dam["id"]
            })),
        )
        .await;

        let tree_uri = format!("/horses/{}/familytree", foal["id"]);
        let (status, tree) = send(&router, "GET", &tree_uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tree["name"], "Foal");
        assert_eq!(tree["mother"]["name"], "Dam");
        assert!(tree["father"].is_null());

        let (status, tree) = send(
            &router,
            "GET",
            &format!("/horses/{}/familytree?generations=1", foal["id"]),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(tree["mother"].is_null());

        let (status, _) = send(
            &router,
            "GET",
            &format!("/horses/{}/familytree?generations=0", foal["id"]),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
