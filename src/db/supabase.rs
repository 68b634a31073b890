// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{DbError, Filter, ObjectStorage, Row, StoredObject, TableStore};

/// REST client for a hosted Supabase project, authenticated with the service
/// role key.
pub struct SupabaseClient {
    http: Client,
    base_url: String,
    service_key: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<Value>,
    message: Option<String>,
    error: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl SupabaseClient {
    pub fn new(base_url: &str, service_key: &str) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client for Supabase")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn filter_query(filters: &[Filter]) -> Vec<(String, String)> {
        filters
            .iter()
            .map(|f| (f.column.clone(), format!("eq.{}", f.value)))
            .collect()
    }

    async fn send(request: RequestBuilder) -> Result<Response, DbError> {
        let response = request
            .send()
            .await
            .map_err(|e| DbError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();

        // PostgREST sends string codes, storage sends numeric status codes
        let code = body.code.map(|c| match c {
            Value::String(s) => s,
            other => other.to_string(),
        });
        let message = body
            .message
            .or(body.error)
            .unwrap_or_else(|| if text.is_empty() { format!("HTTP {}", status) } else { text });

        Err(DbError::Api {
            status,
            code,
            message,
            details: body.details,
            hint: body.hint,
        })
    }

    async fn rows(response: Response) -> Result<Vec<Row>, DbError> {
        let text = response
            .text()
            .await
            .map_err(|e| DbError::Transport(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| DbError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TableStore for SupabaseClient {
    async fn select(&self, table: &str, columns: &str, filters: &[Filter]) -> Result<Vec<Row>, DbError> {
        debug!("select {} from {} where {:?}", columns, table, filters);
        let request = self
            .http
            .get(self.rest_url(table))
            .query(&[("select", columns)])
            .query(&Self::filter_query(filters));
        let response = Self::send(self.authorize(request)).await?;
        Self::rows(response).await
    }

    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Vec<Row>, DbError> {
        debug!("upsert into {} on conflict ({})", table, on_conflict);
        let request = self
            .http
            .post(self.rest_url(table))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&vec![Value::Object(row)]);
        let response = Self::send(self.authorize(request)).await?;
        Self::rows(response).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Vec<Row>, DbError> {
        debug!("insert into {}", table);
        let request = self
            .http
            .post(self.rest_url(table))
            .header("Prefer", "return=representation")
            .json(&vec![Value::Object(row)]);
        let response = Self::send(self.authorize(request)).await?;
        Self::rows(response).await
    }

    async fn update(&self, table: &str, patch: Row, filters: &[Filter]) -> Result<Vec<Row>, DbError> {
        debug!("update {} where {:?}", table, filters);
        let request = self
            .http
            .patch(self.rest_url(table))
            .query(&Self::filter_query(filters))
            .header("Prefer", "return=representation")
            .json(&Value::Object(patch));
        let response = Self::send(self.authorize(request)).await?;
        Self::rows(response).await
    }
}

#[async_trait]
impl ObjectStorage for SupabaseClient {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<StoredObject>, DbError> {
        let request = self
            .http
            .post(self.storage_url(&format!("object/list/{}", bucket)))
            .json(&json!({ "prefix": prefix, "limit": 100, "offset": 0 }));
        let response = Self::send(self.authorize(request)).await?;
        response
            .json::<Vec<StoredObject>>()
            .await
            .map_err(|e| DbError::Decode(e.to_string()))
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), DbError> {
        if paths.is_empty() {
            return Ok(());
        }
        let request = self
            .http
            .delete(self.storage_url(&format!("object/{}", bucket)))
            .json(&json!({ "prefixes": paths }));
        Self::send(self.authorize(request)).await?;
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
        upsert: bool,
    ) -> Result<(), DbError> {
        let request = self
            .http
            .post(self.storage_url(&format!("object/{}/{}", bucket, path)))
            .header(
                header::CONTENT_TYPE,
                content_type.unwrap_or("application/octet-stream"),
            )
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes);
        Self::send(self.authorize(request)).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.storage_url(&format!("object/public/{}/{}", bucket, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{eq, UNKNOWN_COLUMN_CODE};
    use crate::test_support::spawn_upstream;
    use axum::{
        body::Bytes,
        extract::Query,
        http::{HeaderMap, StatusCode},
        routing::{delete, get, post},
        Json, Router,
    };
    use std::collections::HashMap;

    fn client(base: &str) -> SupabaseClient {
        SupabaseClient::new(base, "service-key").unwrap()
    }

    #[tokio::test]
    async fn select_sends_key_and_filters() {
        let router = Router::new().route(
            "/rest/v1/users",
            get(|headers: HeaderMap, Query(query): Query<HashMap<String, String>>| async move {
                assert_eq!(headers["apikey"], "service-key");
                assert_eq!(headers["authorization"], "Bearer service-key");
                assert_eq!(query["select"], "id,username");
                assert_eq!(query["id"], "eq.auth0|1");
                Json(json!([{ "id": "auth0|1", "username": "kanako" }]))
            }),
        );
        let base = spawn_upstream(router);

        let rows = client(&base)
            .select("users", "id,username", &[eq("id", "auth0|1")])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["username"], "kanako");
    }

    #[tokio::test]
    async fn schema_cache_error_names_the_unknown_column() {
        let router = Router::new().route(
            "/rest/v1/profiles",
            post(|Query(query): Query<HashMap<String, String>>| async move {
                assert_eq!(query["on_conflict"], "user_id");
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "code": "PGRST204",
                        "details": null,
                        "hint": null,
                        "message": "Could not find the 'interests' column of 'profiles' in the schema cache",
                    })),
                )
            }),
        );
        let base = spawn_upstream(router);

        let mut row = Row::new();
        row.insert("user_id".into(), json!("auth0|1"));
        row.insert("interests".into(), json!([]));
        let err = client(&base).upsert("profiles", row, "user_id").await.unwrap_err();

        assert!(matches!(
            &err,
            DbError::Api { status: 400, code: Some(code), .. } if code == UNKNOWN_COLUMN_CODE
        ));
        assert_eq!(err.unknown_column().as_deref(), Some("interests"));
    }

    #[tokio::test]
    async fn empty_success_body_is_no_rows() {
        let router = Router::new().route("/rest/v1/chats", post(|| async { StatusCode::CREATED }));
        let base = spawn_upstream(router);

        let rows = client(&base).insert("chats", Row::new()).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn storage_errors_keep_numeric_codes_and_plain_text() {
        let router = Router::new()
            .route(
                "/storage/v1/object/avatars",
                delete(|| async {
                    (
                        StatusCode::NOT_FOUND,
                        Json(json!({ "code": 404, "error": "not_found" })),
                    )
                }),
            )
            .route(
                "/storage/v1/object/list/avatars",
                post(|| async { (StatusCode::BAD_GATEWAY, "upstream gone") }),
            );
        let base = spawn_upstream(router);
        let client = client(&base);

        let err = client.remove("avatars", &["u/a.png".to_string()]).await.unwrap_err();
        assert!(matches!(
            &err,
            DbError::Api { status: 404, code: Some(code), message, .. }
                if code == "404" && message == "not_found"
        ));

        let err = client.list("avatars", "u/").await.unwrap_err();
        assert!(matches!(
            &err,
            DbError::Api { status: 502, code: None, message, .. } if message == "upstream gone"
        ));
    }

    #[tokio::test]
    async fn list_and_upload_round_trip_through_storage_api() {
        let router = Router::new()
            .route(
                "/storage/v1/object/list/avatars",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["prefix"], "u1/");
                    Json(json!([{ "name": "old.png", "id": "x" }]))
                }),
            )
            .route(
                "/storage/v1/object/avatars/u1/new.png",
                post(|headers: HeaderMap, bytes: Bytes| async move {
                    assert_eq!(headers["content-type"], "image/png");
                    assert_eq!(headers["x-upsert"], "false");
                    assert_eq!(&bytes[..], b"png-bytes");
                    Json(json!({ "Key": "avatars/u1/new.png" }))
                }),
            );
        let base = spawn_upstream(router);
        let client = client(&base);

        let listed = client.list("avatars", "u1/").await.unwrap();
        assert_eq!(listed[0].name, "old.png");

        client
            .upload("avatars", "u1/new.png", b"png-bytes".to_vec(), Some("image/png"), false)
            .await
            .unwrap();
        assert!(client.remove("avatars", &[]).await.is_ok());
    }

    #[test]
    fn urls_are_built_from_trimmed_base() {
        let client = SupabaseClient::new("https://demo.supabase.co/", "key").unwrap();
        assert_eq!(client.rest_url("profiles"), "https://demo.supabase.co/rest/v1/profiles");
        assert_eq!(
            client.public_url("avatars", "u1/a.png"),
            "https://demo.supabase.co/storage/v1/object/public/avatars/u1/a.png"
        );
    }

    #[test]
    fn filters_become_eq_operators() {
        let query = SupabaseClient::filter_query(&[eq("chat_id", 12), eq("user_id", "auth0|x")]);
        assert_eq!(
            query,
            vec![
                ("chat_id".to_string(), "eq.12".to_string()),
                ("user_id".to_string(), "eq.auth0|x".to_string()),
            ]
        );
    }
}
