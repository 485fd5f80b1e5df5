use std::collections::BTreeMap;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::SharedState;
use crate::config::Credentials;
use crate::models::{AuthRequest, AuthResponse, DecodedVin, HealthStatus, ServiceInfo};
use crate::scrapers::EmexScraper;
use crate::traits::PartsCatalog;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub part_name: Option<String>,
}

pub async fn home() -> Json<ServiceInfo> {
    let endpoints = BTreeMap::from([
        ("/api/decode-vin/<vin>", "Декодирование VIN кода"),
        ("/api/search-parts/<vin>", "Поиск запчастей по VIN"),
        ("/api/part-details/<article>", "Детальная информация о запчасти"),
        ("/api/authenticate", "Аутентификация на emex.ru"),
        ("/health", "Проверка состояния сервиса"),
    ]);

    Json(ServiceInfo {
        service: "VIN Parser для emex.ru",
        version: env!("CARGO_PKG_VERSION"),
        endpoints,
        status: "active",
    })
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
    })
}

pub async fn decode_vin(State(state): State<SharedState>, Path(vin): Path<String>) -> Response {
    let vin = vin.to_uppercase();
    let scraper = state.scraper().await;

    match scraper.decoder().decode(&vin).await {
        Ok(vehicle_info) => Json(DecodedVin {
            vin,
            vehicle_info,
            decoded: true,
        })
        .into_response(),
        Err(e) => {
            warn!("VIN decode failed for {}: {}", vin, e);
            Json(json!({ "error": e.to_string(), "vin": vin })).into_response()
        }
    }
}

pub async fn search_parts(
    State(state): State<SharedState>,
    Path(vin): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let vin = vin.to_uppercase();
    let scraper = state.scraper().await;

    match scraper.search_parts(&vin, query.part_name.as_deref()).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            warn!("Part search failed for {}: {}", vin, e);
            Json(json!({ "error": e.to_string(), "vin": vin })).into_response()
        }
    }
}

pub async fn part_details(State(state): State<SharedState>, Path(article): Path<String>) -> Response {
    let scraper = state.scraper().await;

    match scraper.get_part_details(&article).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            warn!("Part details failed for {}: {}", article, e);
            Json(json!({ "error": e.to_string(), "article": article })).into_response()
        }
    }
}

/// Replaces the shared scraper with one logged in under the given
/// credentials. A body that isn't JSON counts as missing fields.
pub async fn authenticate(
    State(state): State<SharedState>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Response {
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    let Some(credentials) = Credentials::new(request.username, request.password) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Username и password обязательны" })),
        )
            .into_response();
    };

    let username = credentials.username.clone();
    let mut scraper = match EmexScraper::new(&state.settings, Some(credentials)) {
        Ok(scraper) => scraper,
        Err(e) => {
            error!("Failed to build scraper for {}: {}", username, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let authenticated = scraper.authenticate().await;
    state.replace_scraper(scraper).await;
    info!("Scraper replaced for {} (authenticated: {})", username, authenticated);

    let message = if authenticated {
        "Успешная аутентификация"
    } else {
        "Ошибка аутентификации"
    };

    Json(AuthResponse {
        authenticated,
        message: message.to_string(),
    })
    .into_response()
}
