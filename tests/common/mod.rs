#![allow(dead_code)]

pub mod mock_server;

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use cw_form::{
    core::{FormController, FormSettings},
    domain::{LookupPair, LookupRef, PersonSelection},
    errors::{FormError, Result},
    sharepoint::{ListApi, SiteUser},
};
use once_cell::sync::Lazy;
use serde_json::{json, Value as JsonValue};

pub const LOOKUP_URL: &str = "/_api/web/lists/getbytitle('CDOA to DSM')/items";
pub const FORM_URL: &str = "/_api/web/lists/getbytitle('Cancel Withdrawal')/items";

/// Lookup rows shared by the workflow tests.
pub static LOOKUP_ROWS: Lazy<Vec<LookupPair>> = Lazy::new(|| {
    vec![
        LookupPair::new(LookupRef::new(7, "Ann Lee"), LookupRef::new(3, "Bo Chan")),
        LookupPair::new(LookupRef::new(9, "Cy Diaz"), LookupRef::new(4, "Dee Ekt")),
    ]
});

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetItems(String),
    EnsureUser(String),
    SearchPeople(String),
    CreateItem(JsonValue),
}

/// In-memory list API recording every call it receives.
pub struct FakeListApi {
    pub calls: Mutex<Vec<Call>>,
    pub lookup_fails: bool,
    pub ensure_user_fails: bool,
    pub create_fails: bool,
    pub user_id: i64,
}

impl Default for FakeListApi {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            lookup_fails: false,
            ensure_user_fails: false,
            create_fails: false,
            user_id: 42,
        }
    }
}

impl FakeListApi {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<JsonValue> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CreateItem(body) => Some(body),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ListApi for FakeListApi {
    async fn get_items(&self, url: &str) -> Result<Vec<JsonValue>> {
        self.record(Call::GetItems(url.to_string()));
        if self.lookup_fails {
            return Err(FormError::Api {
                status: 503,
                body: "unavailable".into(),
            });
        }
        LOOKUP_ROWS
            .iter()
            .map(|pair| serde_json::to_value(pair).map_err(FormError::from))
            .collect()
    }

    async fn ensure_user(&self, _list_url: &str, logon_name: &str) -> Result<SiteUser> {
        self.record(Call::EnsureUser(logon_name.to_string()));
        if self.ensure_user_fails {
            return Err(FormError::Api {
                status: 404,
                body: json!({"error": {"message": "user not found"}}).to_string(),
            });
        }
        Ok(serde_json::from_value(json!({
            "Id": self.user_id,
            "Title": "Sam Roe",
            "Email": logon_name,
        }))?)
    }

    async fn search_people(&self, query: &str, limit: usize) -> Result<Vec<PersonSelection>> {
        self.record(Call::SearchPeople(query.to_string()));
        let people = vec![
            PersonSelection::new("Sam Roe", "sam.roe@example.edu"),
            PersonSelection::new("Sam Rollins", "sam.rollins@example.edu"),
        ];
        Ok(people.into_iter().take(limit).collect())
    }

    async fn create_item(&self, _list_url: &str, body: &JsonValue) -> Result<JsonValue> {
        self.record(Call::CreateItem(body.clone()));
        if self.create_fails {
            return Err(FormError::Api {
                status: 400,
                body: json!({"error": {"message": "Column 'StudentID' is invalid"}}).to_string(),
            });
        }
        let mut created = body.clone();
        created["Id"] = json!(101);
        Ok(created)
    }
}

pub fn settings() -> FormSettings {
    FormSettings {
        lookup_list_url: LOOKUP_URL.to_string(),
        form_list_url: FORM_URL.to_string(),
        people_search_min_chars: 5,
    }
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

/// Controller with lookup data already loaded.
pub async fn loaded_controller(api: FakeListApi) -> FormController<FakeListApi> {
    let mut controller = FormController::new(api, settings(), today());
    assert!(controller.load_lookup().await.is_loaded());
    controller
}
