use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde_json::{json, Value as JsonValue};
use tracing::debug;
use url::Url;

use super::{unwrap_items, web_url_of, ListApi, SiteUser};
use crate::config::Config;
use crate::domain::PersonSelection;
use crate::errors::{FormError, Result};

const ACCEPT_V1: &str = "application/json;odata.metadata=minimal";
const CONTENT_TYPE_V1: &str = "application/json;odata.metadata=minimal";
const ODATA_VERSION: &str = "4.0";
const PEOPLE_SEARCH_PATH: &str =
    "/_api/SP.UI.ApplicationPages.ClientPeoplePickerWebServiceInterface.clientPeoplePickerSearchUser";
const ERROR_BODY_LIMIT: usize = 500;

/// HTTP client for the platform's REST list API.
pub struct SpHttpClient {
    http: Client,
    site_url: Url,
    access_token: Option<String>,
}

impl SpHttpClient {
    pub fn new(site_url: &str, access_token: Option<String>, timeout: Duration) -> Result<Self> {
        let site_url = Url::parse(site_url.trim_end_matches('/'))
            .map_err(|err| FormError::Config(format!("invalid site url `{site_url}`: {err}")))?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            site_url,
            access_token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.site_url,
            config.access_token.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Absolute URL for `target`; site-relative paths are joined to the site.
    pub fn resolve_url(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_string();
        }
        let base = self.site_url.as_str().trim_end_matches('/');
        format!("{}/{}", base, target.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .header(header::ACCEPT, ACCEPT_V1)
            .header("OData-Version", ODATA_VERSION);
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send_json(&self, method: Method, url: &str, body: Option<&JsonValue>) -> Result<JsonValue> {
        debug!(%method, url, "sending list api request");
        let mut builder = self.request(method, url);
        if let Some(body) = body {
            builder = builder
                .header(header::CONTENT_TYPE, CONTENT_TYPE_V1)
                .body(serde_json::to_vec(body)?);
        }
        let response = builder.send().await?;
        read_json(response).await
    }
}

async fn read_json(response: Response) -> Result<JsonValue> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        let body = match serde_json::from_str::<JsonValue>(&text) {
            Ok(parsed) => parsed.to_string(),
            Err(_) => text.chars().take(ERROR_BODY_LIMIT).collect(),
        };
        return Err(FormError::Api {
            status: status.as_u16(),
            body,
        });
    }
    if text.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

#[async_trait]
impl ListApi for SpHttpClient {
    async fn get_items(&self, url: &str) -> Result<Vec<JsonValue>> {
        let url = self.resolve_url(url);
        let payload = self.send_json(Method::GET, &url, None).await?;
        unwrap_items(payload).ok_or_else(|| {
            FormError::InvalidInput(format!("response from {url} does not contain an item array"))
        })
    }

    async fn ensure_user(&self, list_url: &str, logon_name: &str) -> Result<SiteUser> {
        let list_url = self.resolve_url(list_url);
        let url = format!("{}/_api/web/ensureuser", web_url_of(&list_url));
        let payload = self
            .send_json(Method::POST, &url, Some(&json!({ "logonName": logon_name })))
            .await?;
        let user = match payload {
            JsonValue::Object(mut map) if map.contains_key("d") => {
                map.remove("d").unwrap_or(JsonValue::Null)
            }
            other => other,
        };
        Ok(serde_json::from_value(user)?)
    }

    async fn search_people(&self, query: &str, limit: usize) -> Result<Vec<PersonSelection>> {
        let url = self.resolve_url(PEOPLE_SEARCH_PATH);
        let body = json!({
            "queryParams": {
                "AllowEmailAddresses": true,
                "AllowMultipleEntities": false,
                "AllUrlZones": false,
                "MaximumEntitySuggestions": limit,
                "PrincipalSource": 15,
                "PrincipalType": 1,
                "QueryString": query,
            }
        });
        let payload = self.send_json(Method::POST, &url, Some(&body)).await?;
        parse_people(&payload)
    }

    async fn create_item(&self, list_url: &str, body: &JsonValue) -> Result<JsonValue> {
        let url = self.resolve_url(list_url);
        self.send_json(Method::POST, &url, Some(body)).await
    }
}

/// Decodes the people picker payload, which wraps a JSON string of entities.
fn parse_people(payload: &JsonValue) -> Result<Vec<PersonSelection>> {
    let raw = payload
        .get("value")
        .or_else(|| payload.pointer("/d/ClientPeoplePickerSearchUser"))
        .and_then(JsonValue::as_str)
        .ok_or_else(|| FormError::InvalidInput("unexpected people search response".into()))?;
    let entities: Vec<JsonValue> = serde_json::from_str(raw)?;
    Ok(entities
        .iter()
        .filter_map(|entity| {
            let text = entity.get("DisplayText")?.as_str()?.to_string();
            let email = entity
                .pointer("/EntityData/Email")
                .and_then(JsonValue::as_str)
                .filter(|email| !email.is_empty())
                .or_else(|| entity.get("Description").and_then(JsonValue::as_str))
                .unwrap_or_default()
                .to_string();
            Some(PersonSelection::new(text, email))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_site_relative_urls() {
        let client =
            SpHttpClient::new("https://contoso.example/sites/aa/", None, Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            client.resolve_url("/_api/web/lists/getbytitle('CW')/items"),
            "https://contoso.example/sites/aa/_api/web/lists/getbytitle('CW')/items"
        );
        assert_eq!(
            client.resolve_url("https://other.example/_api/x"),
            "https://other.example/_api/x"
        );
    }

    #[test]
    fn rejects_invalid_site_url() {
        let err = SpHttpClient::new("not a url", None, Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, FormError::Config(_)));
    }

    #[test]
    fn parses_people_picker_entities() {
        let entities = r#"[{"DisplayText":"Sam Roe","Description":"i:0#.f|membership|sam@example.edu","EntityData":{"Email":"sam@example.edu"}},{"DisplayText":"No Mail","Description":"nomail@example.edu","EntityData":{"Email":""}}]"#;
        let payload = json!({ "value": entities });
        let people = parse_people(&payload).unwrap();
        assert_eq!(people[0], PersonSelection::new("Sam Roe", "sam@example.edu"));
        assert_eq!(people[1].secondary_text, "nomail@example.edu");
    }
}
