//! REST terminal handlers.

use std::collections::{BTreeMap, HashMap};

use axum::{
    body::Body,
    extract::{Form, FromRequest},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::auth::AuthenticatedHandler;
use crate::http::response::{resource_response, ApiError};
use crate::store::{Identity, Kind, Record, SharedStore};

/// Read the listed form fields. Every field is required.
async fn read_fields(
    request: Request<Body>,
    kind: Kind,
    fields: &[&str],
) -> Result<BTreeMap<String, String>, Response> {
    let Form(values) = match Form::<HashMap<String, String>>::from_request(request, &()).await {
        Ok(form) => form,
        Err(rejection) => {
            tracing::info!(kind = %kind, error = %rejection, "Unreadable form body");
            return Err(ApiError::bad_request(rejection.body_text()).into_response());
        }
    };

    let mut attrs = BTreeMap::new();
    for field in fields {
        match values.get(*field) {
            Some(value) => attrs.insert((*field).to_string(), value.clone()),
            None => {
                let message = format!("missing field `{}`", field);
                return Err(ApiError::bad_request(message).into_response());
            }
        };
    }
    Ok(attrs)
}

/// Create a `kind` record from the listed form fields.
///
/// Every field is required. The caller becomes the record's owner.
pub fn create_resource(
    store: SharedStore,
    kind: Kind,
    fields: &'static [&'static str],
) -> impl AuthenticatedHandler {
    move |request: Request<Body>, identity: Identity| {
        let store = store.clone();
        async move {
            let attrs = match read_fields(request, kind, fields).await {
                Ok(attrs) => attrs,
                Err(response) => return response,
            };

            let mut record = Record::new(kind).with_owner(identity.id.clone());
            record.attrs = attrs;

            match store.save(record).await {
                Ok(saved) => {
                    tracing::info!(
                        kind = %kind,
                        id = %saved.id,
                        owner = %identity.id,
                        "Record created"
                    );
                    resource_response(StatusCode::CREATED, &saved)
                }
                Err(e) => {
                    tracing::error!(kind = %kind, error = %e, "Failed to save record");
                    ApiError::server_error().into_response()
                }
            }
        }
    }
}

/// A freshly registered user together with its key.
#[derive(Debug, Serialize)]
pub struct IssuedUser {
    #[serde(flatten)]
    pub record: Record,
    pub key: String,
}

/// Register a user from the listed form fields and return its credentials.
pub fn create_user(
    store: SharedStore,
    fields: &'static [&'static str],
) -> impl AuthenticatedHandler {
    move |request: Request<Body>, identity: Identity| {
        let store = store.clone();
        async move {
            let attrs = match read_fields(request, Kind::User, fields).await {
                Ok(attrs) => attrs,
                Err(response) => return response,
            };

            let mut record = Record::new(Kind::User);
            record.attrs = attrs;

            match store.register_user(record).await {
                Ok((record, key)) => {
                    tracing::info!(id = %record.id, created_by = %identity.id, "User registered");
                    resource_response(StatusCode::CREATED, &IssuedUser { record, key })
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to register user");
                    ApiError::server_error().into_response()
                }
            }
        }
    }
}

/// List the caller's `kind` records.
pub fn list_resources(store: SharedStore, kind: Kind) -> impl AuthenticatedHandler {
    move |_request: Request<Body>, identity: Identity| {
        let store = store.clone();
        async move {
            match store.query(kind).await {
                Ok(records) => {
                    let owned: Vec<Record> = records
                        .into_iter()
                        .filter(|record| record.owner.as_deref() == Some(identity.id.as_str()))
                        .collect();
                    resource_response(StatusCode::OK, &owned)
                }
                Err(e) => {
                    tracing::error!(kind = %kind, error = %e, "Failed to query records");
                    ApiError::server_error().into_response()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Store};
    use axum::http::header::CONTENT_TYPE;
    use std::sync::Arc;

    fn form_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/events")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn creates_owned_record_from_form() {
        let store = Arc::new(MemoryStore::new());
        let handler = create_resource(store.clone(), Kind::Event, &["name"]);

        let response = handler
            .call(form_request("name=Sandy%27s+Party"), Identity::user("abc"))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = json(response).await;
        assert_eq!(body["kind"], "event");
        assert_eq!(body["owner"], "abc");
        assert_eq!(body["attrs"]["name"], "Sandy's Party");
        assert!(!body["id"].as_str().unwrap().is_empty());
        assert_eq!(store.query(Kind::Event).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let store = Arc::new(MemoryStore::new());
        let handler = create_resource(store.clone(), Kind::Event, &["name"]);

        let response = handler
            .call(form_request("nickname=x"), Identity::user("abc"))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_generic_server_error() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let handler = create_resource(store, Kind::Event, &["name"]);

        let response = handler
            .call(form_request("name=Sandy"), Identity::user("abc"))
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(response).await["developer_message"], "Server Error");
    }

    #[tokio::test]
    async fn created_user_receives_working_credentials() {
        let store = Arc::new(MemoryStore::new());
        let handler = create_user(store.clone(), &["name"]);

        let response = handler
            .call(form_request("name=Sandy"), Identity::user("abc"))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = json(response).await;
        assert_eq!(body["kind"], "user");
        assert_eq!(body["attrs"]["name"], "Sandy");
        let id = body["id"].as_str().unwrap();
        let key = body["key"].as_str().unwrap();
        assert_eq!(store.verify(id, key).await.unwrap(), Some(Identity::user(id)));
    }

    #[tokio::test]
    async fn user_without_name_is_not_registered() {
        let store = Arc::new(MemoryStore::new());
        let handler = create_user(store.clone(), &["name"]);

        let response = handler
            .call(form_request("nickname=x"), Identity::user("abc"))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn lists_only_callers_records() {
        let store = Arc::new(MemoryStore::new());
        store.save(Record::new(Kind::Event).with_owner("abc")).await.unwrap();
        store.save(Record::new(Kind::Event).with_owner("abc")).await.unwrap();
        store.save(Record::new(Kind::Event).with_owner("other")).await.unwrap();

        let handler = list_resources(store, Kind::Event);
        let response = handler
            .call(Request::new(Body::empty()), Identity::user("abc"))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await.as_array().unwrap().len(), 2);
    }
}
