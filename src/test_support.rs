// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! In-memory stand-ins for the external systems, shared by unit tests.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{BackendConfig, Config};
use crate::db::{
    Database, DbError, Filter, ObjectStorage, Row, StoredObject, TableStore, UNIQUE_VIOLATION_CODE,
    UNKNOWN_COLUMN_CODE,
};
use crate::identity::{
    IdentityProvider, ProviderError, SignupRequest, SignupResult, TokenSet, TokenSource,
};
use crate::services::translate::{TranslateError, Translation, Translator};

fn matches(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|f| match row.get(&f.column) {
        Some(Value::String(s)) => *s == f.value,
        Some(other) => other.to_string() == f.value,
        None => false,
    })
}

fn project(row: &Row, columns: &str) -> Row {
    if columns.trim() == "*" {
        return row.clone();
    }
    columns
        .split(',')
        .map(str::trim)
        .filter_map(|c| row.get(c).map(|v| (c.to_string(), v.clone())))
        .collect()
}

/// Tables held in memory. A table can be given a fixed column set, in which
/// case writes naming other columns fail the way PostgREST reports schema
/// cache misses.
#[derive(Default)]
pub struct MemoryTables {
    rows: Mutex<HashMap<String, Vec<Row>>>,
    columns: Mutex<HashMap<String, HashSet<String>>>,
    failures: Mutex<HashMap<(String, String), DbError>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryTables {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_columns(&self, table: &str, columns: &[&str]) {
        self.columns.lock().unwrap().insert(
            table.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        );
    }

    pub fn seed(&self, table: &str, row: Value) {
        let Value::Object(row) = row else {
            panic!("seed rows must be objects");
        };
        self.rows
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    /// Make every `op` ("select", "upsert", "insert", "update") on `table` fail.
    pub fn fail_on(&self, op: &str, table: &str, err: DbError) {
        self.failures
            .lock()
            .unwrap()
            .insert((op.to_string(), table.to_string()), err);
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.rows.lock().unwrap().get(table).cloned().unwrap_or_default()
    }

    /// "op:table" for every call, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn begin(&self, op: &str, table: &str) -> Result<(), DbError> {
        self.calls.lock().unwrap().push(format!("{}:{}", op, table));
        match self
            .failures
            .lock()
            .unwrap()
            .get(&(op.to_string(), table.to_string()))
        {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn check_columns(&self, table: &str, row: &Row) -> Result<(), DbError> {
        let columns = self.columns.lock().unwrap();
        let Some(known) = columns.get(table) else {
            return Ok(());
        };
        match row.keys().find(|k| !known.contains(*k)) {
            Some(unknown) => Err(DbError::api(
                400,
                Some(UNKNOWN_COLUMN_CODE),
                format!(
                    "Could not find the '{}' column of '{}' in the schema cache",
                    unknown, table
                ),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TableStore for MemoryTables {
    async fn select(&self, table: &str, columns: &str, filters: &[Filter]) -> Result<Vec<Row>, DbError> {
        self.begin("select", table)?;
        Ok(self
            .rows(table)
            .iter()
            .filter(|row| matches(row, filters))
            .map(|row| project(row, columns))
            .collect())
    }

    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Vec<Row>, DbError> {
        self.begin("upsert", table)?;
        self.check_columns(table, &row)?;

        let keys: Vec<Filter> = on_conflict
            .split(',')
            .map(str::trim)
            .filter_map(|key| {
                row.get(key).map(|v| Filter {
                    column: key.to_string(),
                    value: match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                })
            })
            .collect();

        let mut tables = self.rows.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        if let Some(existing) = rows.iter_mut().find(|r| matches(r, &keys)) {
            existing.extend(row);
            return Ok(vec![existing.clone()]);
        }
        rows.push(row.clone());
        Ok(vec![row])
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Vec<Row>, DbError> {
        self.begin("insert", table)?;
        self.check_columns(table, &row)?;

        let mut tables = self.rows.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        if let Some(id) = row.get("id") {
            if rows.iter().any(|r| r.get("id") == Some(id)) {
                return Err(DbError::api(
                    409,
                    Some(UNIQUE_VIOLATION_CODE),
                    format!("duplicate key value violates unique constraint \"{}_pkey\"", table),
                ));
            }
        }
        rows.push(row.clone());
        Ok(vec![row])
    }

    async fn update(&self, table: &str, patch: Row, filters: &[Filter]) -> Result<Vec<Row>, DbError> {
        self.begin("update", table)?;
        self.check_columns(table, &patch)?;

        let mut tables = self.rows.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|r| matches(r, filters)) {
            row.extend(patch.clone());
            updated.push(row.clone());
        }
        Ok(updated)
    }
}

/// Object storage keyed by `bucket/path`
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<String, (Vec<u8>, Option<String>)>>,
    fail_list: Mutex<bool>,
    fail_upload: Mutex<bool>,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, bucket: &str, path: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{}/{}", bucket, path), (bytes.to_vec(), None));
    }

    pub fn paths(&self, bucket: &str) -> Vec<String> {
        let prefix = format!("{}/", bucket);
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<(Vec<u8>, Option<String>)> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{}/{}", bucket, path))
            .cloned()
    }

    pub fn fail_list(&self) {
        *self.fail_list.lock().unwrap() = true;
    }

    pub fn fail_upload(&self) {
        *self.fail_upload.lock().unwrap() = true;
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<StoredObject>, DbError> {
        if *self.fail_list.lock().unwrap() {
            return Err(DbError::api(500, Some("500"), "list failed"));
        }
        let dir = format!("{}/{}/", bucket, prefix.trim_end_matches('/'));
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter_map(|k| k.strip_prefix(&dir))
            .filter(|rest| !rest.contains('/'))
            .map(|name| StoredObject {
                name: name.to_string(),
            })
            .collect())
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), DbError> {
        let mut objects = self.objects.lock().unwrap();
        for path in paths {
            objects.remove(&format!("{}/{}", bucket, path));
        }
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
        _upsert: bool,
    ) -> Result<(), DbError> {
        if *self.fail_upload.lock().unwrap() {
            return Err(DbError::api(400, Some("400"), "Invalid key"));
        }
        self.objects.lock().unwrap().insert(
            format!("{}/{}", bucket, path),
            (bytes, content_type.map(str::to_string)),
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("https://storage.test/{}/{}", bucket, path)
    }
}

pub fn memory_database() -> (Database, Arc<MemoryTables>, Arc<MemoryStorage>) {
    let tables = MemoryTables::new();
    let storage = MemoryStorage::new();
    let db = Database::from_parts(tables.clone(), storage.clone());
    (db, tables, storage)
}

/// Identity provider answering from scripted results
#[derive(Default)]
pub struct ScriptedIdentity {
    grants: Mutex<VecDeque<Result<TokenSet, ProviderError>>>,
    signups: Mutex<VecDeque<Result<SignupResult, ProviderError>>>,
    pub grant_usernames: Mutex<Vec<String>>,
    pub signup_requests: Mutex<Vec<SignupRequest>>,
}

impl ScriptedIdentity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_grant(&self, result: Result<TokenSet, ProviderError>) {
        self.grants.lock().unwrap().push_back(result);
    }

    pub fn push_signup(&self, result: Result<SignupResult, ProviderError>) {
        self.signups.lock().unwrap().push_back(result);
    }
}

pub fn token(access_token: &str) -> TokenSet {
    TokenSet {
        access_token: access_token.to_string(),
        id_token: Some("id-token".to_string()),
        expires_in: Some(86400),
        token_type: Some("Bearer".to_string()),
    }
}

pub fn rejected(status: u16, error: &str, description: &str) -> ProviderError {
    ProviderError::Rejected {
        status,
        error: Some(error.to_string()),
        description: description.to_string(),
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentity {
    async fn password_grant(&self, username: &str, _password: &str) -> Result<TokenSet, ProviderError> {
        self.grant_usernames.lock().unwrap().push(username.to_string());
        self.grants
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::NotConfigured))
    }

    async fn signup(&self, request: &SignupRequest) -> Result<SignupResult, ProviderError> {
        self.signup_requests.lock().unwrap().push(request.clone());
        self.signups
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::NotConfigured))
    }
}

/// Translator that tags the text with the language pair, or fails
pub struct EchoTranslator {
    pub fail: bool,
}

#[async_trait]
impl Translator for EchoTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<Translation, TranslateError> {
        if self.fail {
            return Err(TranslateError::Status("403".to_string()));
        }
        Ok(Translation {
            translated_text: format!("[{}->{}] {}", source, target, text),
            source_lang: source.to_string(),
            target_lang: target.to_string(),
        })
    }
}

pub fn test_config() -> Config {
    let mut vars: HashMap<&str, &str> = HashMap::new();
    vars.insert("AUTH0_DOMAIN", "tenant.auth0.test");
    vars.insert("AUTH0_CLIENT_ID", "client");
    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap()
}

/// Token source with a fixed answer
pub struct StaticToken {
    pub token: Option<String>,
    pub user_id: Option<String>,
}

impl StaticToken {
    pub fn new(token: Option<&str>, user_id: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            token: token.map(str::to_string),
            user_id: user_id.map(str::to_string),
        })
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Option<String> {
        self.token.clone()
    }

    fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}

/// Serve `router` on an ephemeral local port, returning its base URL.
pub fn spawn_upstream(router: axum::Router) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(router.into_make_service());
    tokio::spawn(server);
    format!("http://{}", addr)
}

/// Accept websocket handshakes on an ephemeral port and hold each connection
/// until the peer closes it. Returns `host:port`.
pub async fn spawn_ws_acceptor() -> String {
    use futures::StreamExt;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                    while let Some(Ok(_)) = ws.next().await {}
                }
            });
        }
    });
    addr.to_string()
}

/// A local port with nothing listening on it
pub fn closed_port_host() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

pub fn backend_config(api_base_url: &str, ws_host: &str) -> BackendConfig {
    BackendConfig {
        api_base_url: api_base_url.to_string(),
        ws_host: ws_host.to_string(),
        ws_secure: false,
    }
}
