//! Zomato daily-menu API resolver.
//!
//! Uses the entity's selector as the Zomato venue id and flattens the
//! API's nested menu/dish structure into `"name - price"` lines. A
//! missing API key is the one case that surfaces an explanatory message
//! to the end user instead of silent absence; the service substitutes
//! it after the normal resolution path comes up empty.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tracing::warn;

use super::Resolver;
use crate::entity::ResolveRequest;
use crate::error::ConfigError;
use crate::service::LunchService;

const DAILY_MENU_URL: &str = "https://developers.zomato.com/api/v2.1/dailymenu";

/// Message shown when the Zomato API key is not configured.
pub const ZOMATO_NOT_CONFIGURED: &str =
    "Zomato API key is not configured; set it in the application config to enable Zomato menu sources.";

/// Calls the Zomato daily-menu API for the entity's venue id.
pub struct ZomatoResolver;

impl ZomatoResolver {
    async fn fetch_daily_menu(
        service: &LunchService,
        request: &ResolveRequest,
    ) -> Option<Bytes> {
        let Some(api_key) = service.config().zomato_api_key.as_deref() else {
            warn!(
                entity = %request.entity.name,
                error = %ConfigError::MissingCredential { name: "zomato_api_key".to_string() },
                "cannot call Zomato"
            );
            return None;
        };
        let Some(venue) = request.selector() else {
            warn!(entity = %request.entity.name, "Zomato entity has no venue id selector");
            return None;
        };

        let response = service
            .client()
            .get(DAILY_MENU_URL)
            .query(&[("res_id", venue)])
            .header("user-key", api_key)
            .send()
            .await;
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(entity = %request.entity.name, error = %err, "Zomato request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(entity = %request.entity.name, status = status.as_u16(), "Zomato non-2xx response");
            return None;
        }
        match response.bytes().await {
            Ok(body) => Some(body),
            Err(err) => {
                warn!(entity = %request.entity.name, error = %err, "Zomato body read failed");
                None
            }
        }
    }
}

/// Flatten the daily-menu payload into `"name - price"` lines.
fn flatten_daily_menu(payload: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    let menus = payload
        .get("daily_menus")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for menu in &menus {
        let dishes = menu
            .pointer("/daily_menu/dishes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for dish in &dishes {
            let name = dish
                .pointer("/dish/name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim();
            if name.is_empty() {
                continue;
            }
            let price = dish
                .pointer("/dish/price")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim();
            if price.is_empty() {
                lines.push(name.to_string());
            } else {
                lines.push(format!("{name} - {price}"));
            }
        }
    }
    lines
}

#[async_trait]
impl Resolver for ZomatoResolver {
    fn name(&self) -> &str {
        "zomato"
    }

    fn cache_ext(&self) -> &str {
        "json"
    }

    async fn resolve(&self, service: &LunchService, request: &ResolveRequest) -> Option<Bytes> {
        match &request.content {
            Some(content) => Some(content.clone()),
            None => Self::fetch_daily_menu(service, request).await,
        }
    }

    async fn resolve_text(
        &self,
        service: &LunchService,
        request: &ResolveRequest,
    ) -> Option<String> {
        let raw = service.cached_raw(self, request, None).await?;
        let payload: Value = match serde_json::from_slice(&raw) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(entity = %request.entity.name, error = %err, "Zomato payload not JSON");
                return None;
            }
        };
        let lines = flatten_daily_menu(&payload);
        if lines.is_empty() {
            warn!(entity = %request.entity.name, "Zomato menu empty");
            return None;
        }
        Some(lines.join("\n"))
    }
}
