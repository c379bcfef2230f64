//! Remote list API boundary.
//!
//! The form only talks to the collaboration platform through [`ListApi`], so
//! the workflow can be driven against the real HTTP client or an in-memory
//! stand-in.

pub mod http;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::domain::PersonSelection;
use crate::errors::Result;

pub use http::SpHttpClient;

/// Site user returned by `ensureuser`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteUser {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
    #[serde(rename = "Email", default)]
    pub email: Option<String>,
}

#[async_trait]
pub trait ListApi: Send + Sync {
    /// Reads the items behind a list items URL, unwrapped from any OData envelope.
    async fn get_items(&self, url: &str) -> Result<Vec<JsonValue>>;

    /// Resolves a logon name (email) to a user of the web owning `list_url`.
    async fn ensure_user(&self, list_url: &str, logon_name: &str) -> Result<SiteUser>;

    /// Searches the directory for people matching `query`.
    async fn search_people(&self, query: &str, limit: usize) -> Result<Vec<PersonSelection>>;

    /// Creates a list item from `body`; returns the created item.
    async fn create_item(&self, list_url: &str, body: &JsonValue) -> Result<JsonValue>;
}

/// Unwraps the item array from the response shapes the platform emits.
pub fn unwrap_items(payload: JsonValue) -> Option<Vec<JsonValue>> {
    match payload {
        JsonValue::Array(items) => Some(items),
        JsonValue::Object(mut map) => {
            if let Some(JsonValue::Array(items)) = map.remove("value") {
                return Some(items);
            }
            match map.remove("d") {
                Some(JsonValue::Object(mut inner)) => match inner.remove("results") {
                    Some(JsonValue::Array(items)) => Some(items),
                    _ => None,
                },
                _ => None,
            }
        }
        _ => None,
    }
}

/// Web URL owning a list endpoint, i.e. everything before `/_api/`.
pub fn web_url_of(list_url: &str) -> &str {
    match list_url.find("/_api/") {
        Some(index) => &list_url[..index],
        None => list_url.trim_end_matches('/'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_known_envelopes() {
        let item = json!({"CDOA": {"Id": 1, "Title": "A"}});
        assert_eq!(unwrap_items(json!([item.clone()])).unwrap().len(), 1);
        assert_eq!(unwrap_items(json!({"value": [item.clone()]})).unwrap().len(), 1);
        assert_eq!(
            unwrap_items(json!({"d": {"results": [item.clone(), item]}}))
                .unwrap()
                .len(),
            2
        );
        assert!(unwrap_items(json!({"error": "nope"})).is_none());
    }

    #[test]
    fn web_url_strips_api_path() {
        assert_eq!(
            web_url_of("https://contoso.example/sites/aa/_api/web/lists/getbytitle('CW')/items"),
            "https://contoso.example/sites/aa"
        );
        assert_eq!(web_url_of("https://contoso.example/sites/aa/"), "https://contoso.example/sites/aa");
    }
}
