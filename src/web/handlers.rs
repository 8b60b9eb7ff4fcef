//! HTTP request handlers

use super::state::AppState;
use crate::metrics::TypeStats;
use crate::results::Timing;
use crate::search::SearchError;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::error;

/// Query parameters for search
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Search query
    pub q: Option<String>,
    /// Page number, 1-indexed
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Restrict the search to registered types, comma separated
    #[serde(rename = "type")]
    pub type_name: Option<String>,
}

/// One page of results as JSON
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub data: Vec<ResultResponse>,
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
    pub timings: Vec<Timing>,
}

#[derive(Debug, Serialize)]
pub struct ResultResponse {
    #[serde(rename = "type")]
    pub source: String,
    pub score: f64,
    pub record: Value,
}

#[derive(Debug, Serialize)]
pub struct TypeResponse {
    pub name: String,
    pub collection: String,
    pub fields: Vec<String>,
    pub relations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_searches: u64,
    pub rejected_searches: u64,
    pub last_search_at: Option<DateTime<Utc>>,
    pub types: HashMap<String, TypeStats>,
}

/// Maps search failures onto HTTP statuses
pub struct ApiError(SearchError);

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SearchError::QueryTooShort { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            SearchError::UnknownType(_) => StatusCode::NOT_FOUND,
            SearchError::InvalidPage { .. } => StatusCode::BAD_REQUEST,
            other => {
                error!("Search failed: {}", other);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

/// Search handler
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params.q.unwrap_or_default();
    let per_page = state.page_size(params.per_page);
    let page = params.page.unwrap_or(1);

    let names: Vec<&str> = params
        .type_name
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();

    let result = if names.is_empty() {
        state.search.search(&query, Some(per_page), page).await?
    } else {
        state
            .search
            .search_named(&names, &query, Some(per_page), page)
            .await?
    };

    let last_page = result.last_page();
    Ok(Json(SearchResponse {
        query,
        total: result.total,
        per_page: result.per_page,
        current_page: result.current_page,
        last_page,
        timings: result.timings,
        data: result
            .items
            .into_iter()
            .map(|item| ResultResponse {
                source: item.source,
                score: item.score,
                record: item.record,
            })
            .collect(),
    }))
}

/// Registered searchable types
pub async fn types(State(state): State<AppState>) -> impl IntoResponse {
    let types: Vec<TypeResponse> = state
        .search
        .list_types()
        .iter()
        .map(|t| TypeResponse {
            name: t.name().to_string(),
            collection: t.collection().to_string(),
            fields: t.fields().to_vec(),
            relations: t.relations().iter().map(|r| r.name.clone()).collect(),
        })
        .collect();

    Json(types)
}

/// Stats handler
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatsResponse {
        total_searches: state.metrics.get_total_searches(),
        rejected_searches: state.metrics.get_rejected_searches(),
        last_search_at: state.metrics.last_search_at(),
        types: state.metrics.get_type_stats(),
    })
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "instance": state.instance_name(),
        "mode": state.search.mode(),
        "version": crate::VERSION
    }))
}

#[cfg(test)]
mod tests {
    use crate::backend::{Constrained, MemoryBackend};
    use crate::config::Settings;
    use crate::metrics::Metrics;
    use crate::models::SearchableType;
    use crate::search::Searchable;
    use crate::web::{create_router, AppState};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let settings = Settings::default();
        let backend = MemoryBackend::new()
            .with_collection(
                "posts",
                vec![
                    json!({"id": 1, "title": "Lorem lorem", "published_at": "2020-01-01"}),
                    json!({"id": 2, "title": "Lorem ipsum", "published_at": null}),
                    json!({"id": 3, "title": "Dolor sit", "published_at": "2020-01-02"}),
                ],
            )
            .with_collection(
                "articles",
                vec![
                    json!({"id": 1, "title": "Lorem lorem lorem"}),
                    json!({"id": 2, "title": "Amet"}),
                ],
            );

        let metrics = Arc::new(Metrics::new());
        let search = Searchable::new(Arc::new(backend), &settings.search)
            .with_metrics(Arc::clone(&metrics));
        search.register_types(vec![
            SearchableType::deserialized("post", "posts", vec!["title".into()])
                .with_filter(|query| Some(query.where_not_null("published_at"))),
            SearchableType::deserialized("article", "articles", vec!["title".into()]),
        ]);

        create_router(AppState::new(settings, search, metrics))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_search_json_shape() {
        let (status, body) = get(app(), "/search?q=lorem&per_page=10").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["query"], "lorem");
        assert_eq!(body["total"], 2);
        assert_eq!(body["per_page"], 10);
        assert_eq!(body["current_page"], 1);
        assert_eq!(body["last_page"], 1);

        let data = body["data"].as_array().unwrap();
        assert_eq!(data[0]["type"], "article");
        assert_eq!(data[0]["score"], 3.0);
        assert_eq!(data[0]["record"]["title"], "Lorem lorem lorem");
        assert_eq!(data[1]["type"], "post");
        assert_eq!(data[1]["record"]["id"], 1);
    }

    #[tokio::test]
    async fn test_search_single_type() {
        let (status, body) = get(app(), "/search?q=lorem&type=post").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["data"][0]["type"], "post");
    }

    #[tokio::test]
    async fn test_search_type_list() {
        let (status, body) = get(app(), "/search?q=lorem&type=article,%20post").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["data"][0]["type"], "article");
        assert_eq!(body["data"][1]["type"], "post");

        let (status, _) = get(app(), "/search?q=lorem&type=post,video").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_per_page_is_clamped() {
        let (status, body) = get(app(), "/search?q=lorem&per_page=500").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["per_page"], 100);

        let (_, body) = get(app(), "/search?q=lorem").await;
        assert_eq!(body["per_page"], 15);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let (status, body) = get(app(), "/search?q=ab").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("at least 3"));

        let (status, _) = get(app(), "/search?q=lorem&type=video").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get(app(), "/search?q=lorem&page=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_types_and_health() {
        let (status, body) = get(app(), "/types").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "post");
        assert_eq!(body[1]["collection"], "articles");

        let (status, body) = get(app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["instance"], "searchable-rs");
        assert_eq!(body["mode"], "boolean");
    }

    #[tokio::test]
    async fn test_stats_counts_searches() {
        let app = app();
        get(app.clone(), "/search?q=lorem").await;
        get(app.clone(), "/search?q=a").await;

        let (status, body) = get(app, "/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_searches"], 1);
        assert_eq!(body["rejected_searches"], 1);
        assert_eq!(body["types"]["post"]["fetches"], 1);
    }
}
