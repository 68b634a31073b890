// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Display locales and the message catalogue shared by the API handlers and
//! the client-side consumers.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::local_store::LocalStore;

/// Storage key the locale preference is persisted under.
pub const LOCALE_STORAGE_KEY: &str = "locale";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ja,
    En,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Ja => "ja",
            Locale::En => "en",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Locale::Ja => Locale::En,
            Locale::En => Locale::Ja,
        }
    }

    /// Pick the first supported language from an `Accept-Language` header.
    /// Quality values are ignored; order is taken as preference.
    pub fn from_accept_language(header: &str) -> Self {
        header
            .split(',')
            .filter_map(|tag| {
                let tag = tag.split(';').next()?.trim();
                let primary = tag.split('-').next()?;
                primary.parse::<Locale>().ok()
            })
            .next()
            .unwrap_or_default()
    }

    pub fn messages(&self) -> &'static Messages {
        match self {
            Locale::Ja => &JA,
            Locale::En => &EN,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ja" => Ok(Locale::Ja),
            "en" => Ok(Locale::En),
            _ => Err(()),
        }
    }
}

/// Substitute `{name}` placeholders in a catalogue template.
pub fn fill(template: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{}}}", name), value)
    })
}

/// Every user-facing string, per locale.
#[derive(Debug)]
pub struct Messages {
    // auth
    pub email_password_required: &'static str,
    pub invalid_credentials: &'static str,
    pub grant_not_allowed: &'static str,
    pub default_connection_missing: &'static str,
    pub identity_not_configured: &'static str,
    pub identity_unreachable: &'static str,
    pub invalid_email_domain: &'static str,
    pub weak_password: &'static str,
    pub user_exists: &'static str,
    pub signup_failed: &'static str,
    pub signup_succeeded: &'static str,

    // profile
    pub empty_body: &'static str,
    pub missing_fields: &'static str,
    pub user_id_required: &'static str,
    pub user_not_found: &'static str,
    pub profile_saved: &'static str,
    pub schema_drift_exhausted: &'static str,

    // avatar
    pub invalid_dataurl: &'static str,
    pub storage_upload_failed: &'static str,
    pub avatar_uploaded: &'static str,
    pub profile_update_failed: &'static str,

    // chat interest
    pub interest_missing_get: &'static str,
    pub interest_missing_post: &'static str,
    pub invalid_interest: &'static str,
    pub invalid_chat_id: &'static str,
    pub interest_saved: &'static str,
    pub interest_fetch_failed: &'static str,
    pub interest_save_failed: &'static str,

    // translation
    pub text_required: &'static str,
    pub translation_failed: &'static str,

    // shared
    pub supabase_not_configured: &'static str,
    pub database_error: &'static str,
    pub internal_error: &'static str,

    // client side
    pub no_token: &'static str,
    pub backend_unreachable: &'static str,
    pub token_malformed: &'static str,
    pub auth_failed: &'static str,
    pub endpoint_not_found: &'static str,
    pub status_error: &'static str,
    pub request_timed_out: &'static str,
    pub check_server: &'static str,
    pub check_token: &'static str,
    pub check_token_fetch: &'static str,
    pub check_chats: &'static str,
    pub check_websocket: &'static str,
    pub server_running: &'static str,
    pub server_unreachable: &'static str,
    pub token_valid: &'static str,
    pub token_invalid: &'static str,
    pub token_format_invalid: &'static str,
    pub chats_fetched: &'static str,
    pub chats_fetch_failed_detail: &'static str,
    pub jwe_hint: &'static str,
    pub ws_connected: &'static str,
    pub ws_timeout: &'static str,
    pub ws_error: &'static str,
    pub ws_closed: &'static str,
    pub unknown_error: &'static str,
}

static JA: Messages = Messages {
    email_password_required: "メールアドレスとパスワードは必須です",
    invalid_credentials: "メールアドレスまたはパスワードが正しくありません",
    grant_not_allowed: "Resource Owner Password Grantが有効になっていません。Auth0 Dashboardで設定を確認してください。",
    default_connection_missing: "Auth0の認証サーバーにデフォルト接続が設定されていません。Auth0 Dashboardで「Username-Password-Authentication」接続を確認してください。",
    identity_not_configured: "認証プロバイダーが設定されていません",
    identity_unreachable: "認証サーバーに接続できません",
    invalid_email_domain: "{domain} のメールアドレスで登録してください",
    weak_password: "パスワードは{min}文字以上である必要があります",
    user_exists: "このメールアドレスは既に登録されています",
    signup_failed: "ユーザーの作成に失敗しました",
    signup_succeeded: "ユーザーを作成しました",

    empty_body: "リクエストボディが空です",
    missing_fields: "必須項目が不足しています",
    user_id_required: "user_id は必須です",
    user_not_found: "ユーザーが見つかりません",
    profile_saved: "プロフィールを保存しました",
    schema_drift_exhausted: "プロフィールの保存に失敗しました（スキーマ不一致）",

    invalid_dataurl: "画像データの形式が正しくありません",
    storage_upload_failed: "画像のアップロードに失敗しました",
    avatar_uploaded: "画像をアップロードしました",
    profile_update_failed: "画像はアップロードされましたが、プロフィールの更新に失敗しました",

    interest_missing_get: "chat_id と user_id は必須です",
    interest_missing_post: "chat_id, user_id, interest は必須です",
    invalid_interest: "interestは1から5の整数である必要があります",
    invalid_chat_id: "chat_idは数値である必要があります",
    interest_saved: "会いたい度を保存しました",
    interest_fetch_failed: "会いたい度の取得に失敗しました",
    interest_save_failed: "会いたい度の保存に失敗しました",

    text_required: "text は必須です",
    translation_failed: "翻訳に失敗しました",

    supabase_not_configured: "Supabaseが設定されていません",
    database_error: "データベースエラーが発生しました",
    internal_error: "予期しないエラーが発生しました",

    no_token: "認証トークンを取得できませんでした。ログインしてください。",
    backend_unreachable: "バックエンドサーバーに接続できません。\n{base_url} が起動しているか確認してください。",
    token_malformed: "トークンの形式が正しくありません。Auth0のAPI Audienceが設定されているか確認してください。\n\n設定方法:\n1. Auth0 Dashboard → APIs → 新しいAPIを作成\n2. Identifier (Audience) をコピー\n3. .envファイルに AUTH0_AUDIENCE=コピーしたIdentifier を追加",
    auth_failed: "認証に失敗しました ({detail})。再度ログインしてください。",
    endpoint_not_found: "APIエンドポイントが見つかりません。バックエンドサーバーの設定を確認してください。",
    status_error: "エラーが発生しました ({status}): {message}",
    request_timed_out: "リクエストがタイムアウトしました",
    check_server: "サーバーの起動確認",
    check_token: "トークンの検証",
    check_token_fetch: "トークンの取得",
    check_chats: "チャット一覧の取得",
    check_websocket: "WebSocket接続",
    server_running: "サーバーは起動しています",
    server_unreachable: "サーバーに接続できません",
    token_valid: "トークンは有効です",
    token_invalid: "トークンが無効です",
    token_format_invalid: "トークンの形式が不正です（セグメント数: {segments}）",
    chats_fetched: "チャット一覧の取得に成功しました（{count}件）",
    chats_fetch_failed_detail: "チャット一覧の取得に失敗しました: {detail}",
    jwe_hint: " (JWE形式のトークンが原因の可能性があります)",
    ws_connected: "WebSocket接続に成功しました",
    ws_timeout: "WebSocket接続がタイムアウトしました",
    ws_error: "WebSocket接続エラー: {detail}",
    ws_closed: "WebSocket接続が閉じられました (コード: {code}, 理由: {reason})",
    unknown_error: "不明なエラー",
};

static EN: Messages = Messages {
    email_password_required: "Email and password are required",
    invalid_credentials: "Invalid email or password",
    grant_not_allowed: "The Resource Owner Password grant is not enabled. Check the application settings in the Auth0 Dashboard.",
    default_connection_missing: "No default connection is configured on the Auth0 tenant. Check the \"Username-Password-Authentication\" connection in the Auth0 Dashboard.",
    identity_not_configured: "The identity provider is not configured",
    identity_unreachable: "Cannot reach the identity provider",
    invalid_email_domain: "Please sign up with an {domain} email address",
    weak_password: "Password must be at least {min} characters",
    user_exists: "This email address is already registered",
    signup_failed: "Failed to create user",
    signup_succeeded: "User created",

    empty_body: "Request body is empty",
    missing_fields: "Required fields are missing",
    user_id_required: "user_id is required",
    user_not_found: "User not found",
    profile_saved: "Profile saved",
    schema_drift_exhausted: "Failed to save profile (schema mismatch)",

    invalid_dataurl: "Image data is not a valid data URL",
    storage_upload_failed: "Failed to upload image",
    avatar_uploaded: "Image uploaded",
    profile_update_failed: "Image uploaded, but updating the profile failed",

    interest_missing_get: "chat_id and user_id are required",
    interest_missing_post: "chat_id, user_id and interest are required",
    invalid_interest: "interest must be an integer from 1 to 5",
    invalid_chat_id: "chat_id must be numeric",
    interest_saved: "Meeting interest saved",
    interest_fetch_failed: "Failed to load meeting interest",
    interest_save_failed: "Failed to save meeting interest",

    text_required: "text is required",
    translation_failed: "Translation failed",

    supabase_not_configured: "Supabase is not configured",
    database_error: "A database error occurred",
    internal_error: "An unexpected error occurred",

    no_token: "Could not obtain an access token. Please log in.",
    backend_unreachable: "Cannot reach the backend server.\nCheck that {base_url} is running.",
    token_malformed: "The token format is invalid. Check that an Auth0 API audience is configured.\n\nSetup:\n1. Auth0 Dashboard → APIs → create a new API\n2. Copy its Identifier (audience)\n3. Add AUTH0_AUDIENCE=<identifier> to your .env file",
    auth_failed: "Authentication failed ({detail}). Please log in again.",
    endpoint_not_found: "API endpoint not found. Check the backend server configuration.",
    status_error: "An error occurred ({status}): {message}",
    request_timed_out: "The request timed out",
    check_server: "Server reachability",
    check_token: "Token validation",
    check_token_fetch: "Token retrieval",
    check_chats: "Chat list retrieval",
    check_websocket: "WebSocket connection",
    server_running: "The server is running",
    server_unreachable: "Cannot reach the server",
    token_valid: "The token is valid",
    token_invalid: "The token is invalid",
    token_format_invalid: "The token format is invalid ({segments} segments)",
    chats_fetched: "Loaded chat list ({count} chats)",
    chats_fetch_failed_detail: "Failed to load chat list: {detail}",
    jwe_hint: " (a JWE token may be the cause)",
    ws_connected: "WebSocket connection succeeded",
    ws_timeout: "WebSocket connection timed out",
    ws_error: "WebSocket connection error: {detail}",
    ws_closed: "WebSocket connection closed (code: {code}, reason: {reason})",
    unknown_error: "unknown error",
};

/// Per-session locale selection.
///
/// Created once for a client session and shared by reference; the only
/// mutations are [`LocaleContext::set_locale`] and [`LocaleContext::toggle`].
/// The choice is persisted to the backing [`LocalStore`] when one is given.
pub struct LocaleContext {
    current: watch::Sender<Locale>,
    store: Option<Arc<dyn LocalStore>>,
}

impl LocaleContext {
    pub fn new(store: Option<Arc<dyn LocalStore>>) -> Self {
        let restored = store
            .as_ref()
            .and_then(|s| s.get(LOCALE_STORAGE_KEY))
            .and_then(|saved| saved.parse::<Locale>().ok())
            .unwrap_or_default();
        debug!("Locale context starting with {}", restored);

        let (current, _) = watch::channel(restored);
        Self { current, store }
    }

    pub fn locale(&self) -> Locale {
        *self.current.borrow()
    }

    pub fn messages(&self) -> &'static Messages {
        self.locale().messages()
    }

    pub fn set_locale(&self, locale: Locale) {
        self.current.send_replace(locale);
        if let Some(store) = &self.store {
            store.set(LOCALE_STORAGE_KEY, locale.as_str().to_string());
        }
    }

    pub fn toggle(&self) -> Locale {
        let next = self.locale().toggled();
        self.set_locale(next);
        next
    }

    pub fn is_japanese(&self) -> bool {
        self.locale() == Locale::Ja
    }

    pub fn subscribe(&self) -> watch::Receiver<Locale> {
        self.current.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_store::MemoryLocalStore;

    #[test]
    fn accept_language_picks_first_supported_tag() {
        assert_eq!(Locale::from_accept_language("en-US,en;q=0.9"), Locale::En);
        assert_eq!(Locale::from_accept_language("fr-FR, ja;q=0.8"), Locale::Ja);
        assert_eq!(Locale::from_accept_language("de"), Locale::Ja);
        assert_eq!(Locale::from_accept_language(""), Locale::Ja);
    }

    #[test]
    fn fill_replaces_named_placeholders() {
        let text = fill(EN.status_error, &[("status", "503"), ("message", "down")]);
        assert_eq!(text, "An error occurred (503): down");
    }

    #[test]
    fn context_restores_and_persists_choice() {
        let store = Arc::new(MemoryLocalStore::with_entries([("locale", "en")]));
        let ctx = LocaleContext::new(Some(store.clone()));
        assert_eq!(ctx.locale(), Locale::En);

        assert_eq!(ctx.toggle(), Locale::Ja);
        assert!(ctx.is_japanese());
        assert_eq!(store.get(LOCALE_STORAGE_KEY).as_deref(), Some("ja"));
    }

    #[test]
    fn context_ignores_garbage_in_store() {
        let store = Arc::new(MemoryLocalStore::with_entries([("locale", "klingon")]));
        let ctx = LocaleContext::new(Some(store));
        assert_eq!(ctx.locale(), Locale::Ja);
    }
}
