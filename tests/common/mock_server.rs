//! Minimal stand-in for the list REST API, served by axum on a random port.

use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value as JsonValue};

pub const SITE_PATH: &str = "/sites/aa";
pub const LOOKUP_PATH: &str = "/sites/aa/_api/lookup/items";
pub const FORM_PATH: &str = "/sites/aa/_api/form/items";
const ENSURE_USER_PATH: &str = "/sites/aa/_api/web/ensureuser";
const PEOPLE_PATH: &str =
    "/sites/aa/_api/SP.UI.ApplicationPages.ClientPeoplePickerWebServiceInterface.clientPeoplePickerSearchUser";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub odata_version: Option<String>,
    pub body: JsonValue,
}

pub struct MockState {
    pub lookup: JsonValue,
    pub ensure_status: StatusCode,
    pub create_status: StatusCode,
    pub requests: Mutex<Vec<RecordedRequest>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            lookup: json!({
                "value": [
                    {"CDOA": {"Id": 7, "Title": "Ann Lee"}, "DSM": {"Id": 3, "Title": "Bo Chan"}},
                    {"CDOA": {"Id": 9, "Title": "Cy Diaz"}, "DSM": {"Id": 4, "Title": "Dee Ekt"}}
                ]
            }),
            ensure_status: StatusCode::OK,
            create_status: StatusCode::CREATED,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl MockState {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }

    fn record(&self, method: &Method, uri: &Uri, headers: &HeaderMap, body: &str) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            path: uri.path().to_string(),
            authorization: header("authorization"),
            accept: header("accept"),
            odata_version: header("odata-version"),
            body: serde_json::from_str(body).unwrap_or(JsonValue::Null),
        });
    }
}

pub struct MockServer {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockServer {
    pub fn site_url(&self) -> String {
        format!("{}{}", self.base_url, SITE_PATH)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Binds 127.0.0.1:0 and serves on the current runtime.
pub async fn spawn(state: MockState) -> MockServer {
    let state = Arc::new(state);
    let app = Router::new()
        .route(LOOKUP_PATH, get(lookup_items))
        .route(FORM_PATH, post(create_item))
        .route(ENSURE_USER_PATH, post(ensure_user))
        .route(PEOPLE_PATH, post(search_people))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockServer {
        base_url: format!("http://{addr}"),
        state,
    }
}

async fn lookup_items(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Json<JsonValue> {
    state.record(&method, &uri, &headers, "");
    Json(state.lookup.clone())
}

async fn ensure_user(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.record(&method, &uri, &headers, &body);
    if !state.ensure_status.is_success() {
        let error = json!({"error": {"code": "-2146232832", "message": "The specified user could not be found."}});
        return (state.ensure_status, Json(error)).into_response();
    }
    let logon: JsonValue = serde_json::from_str(&body).unwrap_or(JsonValue::Null);
    Json(json!({
        "Id": 42,
        "Title": "Sam Roe",
        "Email": logon["logonName"],
    }))
    .into_response()
}

async fn search_people(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Json<JsonValue> {
    state.record(&method, &uri, &headers, &body);
    let entities = json!([
        {"DisplayText": "Sam Roe", "Description": "sam.roe@example.edu", "EntityData": {"Email": "sam.roe@example.edu"}},
        {"DisplayText": "Sam Rollins", "Description": "sam.rollins@example.edu", "EntityData": {"Email": ""}}
    ]);
    Json(json!({ "value": entities.to_string() }))
}

async fn create_item(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.record(&method, &uri, &headers, &body);
    if !state.create_status.is_success() {
        let error = json!({"error": {"code": "-1", "message": "Column 'StudentID' does not exist."}});
        return (state.create_status, Json(error)).into_response();
    }
    let mut created: JsonValue = serde_json::from_str(&body).unwrap_or_else(|_| json!({}));
    created["Id"] = json!(101);
    (state.create_status, Json(created)).into_response()
}
