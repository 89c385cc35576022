//! Firebase Integration Module
//!
//! Email/password and Google sign-in through the Identity Toolkit REST API,
//! session refresh through the Secure Token API, and per-user cloud sync of
//! generation history and community prompts through Firestore.
//!
//! Firestore stores typed values (`{"stringValue": "..."}` and friends), so
//! documents are converted to and from plain JSON at the edge.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::models::UserData;

pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// Redirect URI reported with IdP credentials; only needs to be an authorized domain
const IDP_REQUEST_URI: &str = "http://localhost";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Refresh this many seconds before the ID token actually expires
const EXPIRY_BUFFER_SECS: i64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Message from the Firebase error body, verbatim (e.g. `EMAIL_NOT_FOUND`)
    #[error("{0}")]
    Provider(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Unexpected response ({status}): {body}")]
    Unexpected { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
}

/// Base URLs for the three REST surfaces; swap for the local emulator suite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub identity: String,
    pub secure_token: String,
    pub firestore: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            identity: DEFAULT_IDENTITY_URL.to_string(),
            secure_token: DEFAULT_SECURE_TOKEN_URL.to_string(),
            firestore: DEFAULT_FIRESTORE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Endpoints for the Firebase emulators, e.g. `emulator("localhost:9099", "localhost:8080")`
    pub fn emulator(auth_host: &str, firestore_host: &str) -> Self {
        Self {
            identity: format!("http://{}/identitytoolkit.googleapis.com/v1", auth_host),
            secure_token: format!("http://{}/securetoken.googleapis.com/v1", auth_host),
            firestore: format!("http://{}/v1", firestore_host),
        }
    }
}

/// Signed-in user. Tokens stay in the backend and are never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(skip_serializing, default)]
    pub id_token: String,
    #[serde(skip_serializing, default)]
    pub refresh_token: String,
    /// Unix timestamp (seconds) when the ID token expires
    pub expires_at: i64,
}

impl AuthUser {
    pub fn is_token_expired(&self) -> bool {
        Utc::now().timestamp() >= self.expires_at - EXPIRY_BUFFER_SECS
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileResponse {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: Map<String, Value>,
}

fn expires_at(expires_in: &str) -> i64 {
    let secs = expires_in.trim().parse::<i64>().unwrap_or_else(|_| {
        warn!("Unparseable expiresIn {:?}, assuming one hour", expires_in);
        3600
    });
    Utc::now().timestamp() + secs
}

impl From<SignInResponse> for AuthUser {
    fn from(r: SignInResponse) -> Self {
        AuthUser {
            expires_at: expires_at(&r.expires_in),
            uid: r.local_id,
            email: r.email.filter(|e| !e.is_empty()),
            display_name: r.display_name.filter(|n| !n.is_empty()),
            id_token: r.id_token,
            refresh_token: r.refresh_token,
        }
    }
}

/// Pull `error.message` out of a Firebase error body
pub fn parse_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
}

// ============================================================================
// Firestore value conversion
// ============================================================================

/// Plain JSON -> Firestore typed value
pub fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // int64 travels as a decimal string
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(to_firestore_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": json_to_fields(map) } }),
    }
}

/// Firestore typed value -> plain JSON. Unknown kinds become `null`.
pub fn from_firestore_value(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return Value::Null;
    };

    if let Some(s) = obj.get("stringValue") {
        return s.clone();
    }
    if let Some(i) = obj.get("integerValue") {
        return match i {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other.clone(),
        };
    }
    if let Some(d) = obj.get("doubleValue") {
        return d.clone();
    }
    if let Some(b) = obj.get("booleanValue") {
        return b.clone();
    }
    if obj.contains_key("nullValue") {
        return Value::Null;
    }
    if let Some(ts) = obj.get("timestampValue") {
        return ts.clone();
    }
    if let Some(array) = obj.get("arrayValue") {
        let values = array
            .get("values")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(from_firestore_value).collect())
            .unwrap_or_default();
        return Value::Array(values);
    }
    if let Some(map) = obj.get("mapValue") {
        return match map.get("fields").and_then(Value::as_object) {
            Some(fields) => fields_to_json(fields),
            None => Value::Object(Map::new()),
        };
    }

    debug!("Unsupported Firestore value kind: {:?}", obj.keys().collect::<Vec<_>>());
    Value::Null
}

pub fn json_to_fields(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), to_firestore_value(v)))
        .collect()
}

pub fn fields_to_json(fields: &Map<String, Value>) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), from_firestore_value(v)))
            .collect(),
    )
}

/// Query string limiting a PATCH to the given top-level fields
pub fn update_mask_query(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| format!("updateMask.fieldPaths={}", urlencoding::encode(f)))
        .collect::<Vec<_>>()
        .join("&")
}

// ============================================================================
// Client
// ============================================================================

pub struct FirebaseClient {
    client: reqwest::Client,
    config: FirebaseConfig,
    endpoints: Endpoints,
    auth: Arc<RwLock<Option<AuthUser>>>,
    auth_tx: watch::Sender<Option<AuthUser>>,
}

impl FirebaseClient {
    pub fn new(config: FirebaseConfig) -> Result<Self, AuthError> {
        Self::with_endpoints(config, Endpoints::default())
    }

    pub fn with_endpoints(config: FirebaseConfig, endpoints: Endpoints) -> Result<Self, AuthError> {
        if config.api_key.trim().is_empty() {
            return Err(AuthError::InvalidInput(
                "Firebase API key is not configured".to_string(),
            ));
        }
        if config.project_id.trim().is_empty() {
            return Err(AuthError::InvalidInput(
                "Firebase project ID is not configured".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let (auth_tx, _) = watch::channel(None);

        Ok(Self {
            client,
            config,
            endpoints,
            auth: Arc::new(RwLock::new(None)),
            auth_tx,
        })
    }

    pub fn config(&self) -> &FirebaseConfig {
        &self.config
    }

    /// Notified with the new user (or `None`) whenever sign-in state changes
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.auth_tx.subscribe()
    }

    pub async fn current_user(&self) -> Option<AuthUser> {
        self.auth.read().await.clone()
    }

    async fn set_user(&self, user: Option<AuthUser>) {
        *self.auth.write().await = user.clone();
        self.auth_tx.send_replace(user);
    }

    fn identity_url(&self, method: &str) -> String {
        format!(
            "{}/accounts:{}?key={}",
            self.endpoints.identity,
            method,
            urlencoding::encode(&self.config.api_key)
        )
    }

    fn token_url(&self) -> String {
        format!(
            "{}/token?key={}",
            self.endpoints.secure_token,
            urlencoding::encode(&self.config.api_key)
        )
    }

    pub fn user_document_url(&self, uid: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/users/{}",
            self.endpoints.firestore,
            urlencoding::encode(&self.config.project_id),
            urlencoding::encode(uid)
        )
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AuthError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        match parse_error_message(&body) {
            Some(message) => Err(AuthError::Provider(message)),
            None => Err(AuthError::Unexpected {
                status: status.as_u16(),
                body,
            }),
        }
    }

    async fn post_identity<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: Value,
    ) -> Result<T, AuthError> {
        let response = self
            .client
            .post(self.identity_url(method))
            .json(&body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    // ------------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------------

    pub async fn sign_in_with_email(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let response: SignInResponse = self
            .post_identity(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;

        let user = AuthUser::from(response);
        info!("Signed in with email as {}", user.uid);
        self.set_user(Some(user.clone())).await;
        Ok(user)
    }

    /// Create an account and set its display name to `username`
    pub async fn sign_up_with_email(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<AuthUser, AuthError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::InvalidInput("Username is required.".to_string()));
        }

        let response: SignInResponse = self
            .post_identity(
                "signUp",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        let mut user = AuthUser::from(response);

        let profile: UpdateProfileResponse = self
            .post_identity(
                "update",
                json!({
                    "idToken": user.id_token,
                    "displayName": username,
                    "returnSecureToken": false,
                }),
            )
            .await?;
        user.display_name = profile.display_name.or_else(|| Some(username.to_string()));

        info!("Created account {}", user.uid);
        self.set_user(Some(user.clone())).await;
        Ok(user)
    }

    /// Exchange a Google ID token from the host's OAuth flow for a Firebase session
    pub async fn sign_in_with_google(&self, google_id_token: &str) -> Result<AuthUser, AuthError> {
        if google_id_token.trim().is_empty() {
            return Err(AuthError::InvalidInput(
                "Missing Google credential".to_string(),
            ));
        }

        let post_body = format!(
            "id_token={}&providerId=google.com",
            urlencoding::encode(google_id_token)
        );
        let response: SignInResponse = self
            .post_identity(
                "signInWithIdp",
                json!({
                    "postBody": post_body,
                    "requestUri": IDP_REQUEST_URI,
                    "returnIdpCredential": true,
                    "returnSecureToken": true,
                }),
            )
            .await?;

        let user = AuthUser::from(response);
        info!("Signed in with Google as {}", user.uid);
        self.set_user(Some(user.clone())).await;
        Ok(user)
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::InvalidInput(
                "Please enter your email address to reset your password.".to_string(),
            ));
        }

        let _: Value = self
            .post_identity(
                "sendOobCode",
                json!({ "requestType": "PASSWORD_RESET", "email": email.trim() }),
            )
            .await?;
        info!("Password reset email requested");
        Ok(())
    }

    pub async fn sign_out(&self) {
        if self.auth.read().await.is_some() {
            info!("Signing out");
        }
        self.set_user(None).await;
    }

    /// Trade the refresh token for a fresh ID token
    pub async fn refresh_session(&self) -> Result<AuthUser, AuthError> {
        let current = self
            .current_user()
            .await
            .ok_or(AuthError::NotAuthenticated)?;

        let response = self
            .client
            .post(self.token_url())
            .json(&json!({
                "grant_type": "refresh_token",
                "refresh_token": current.refresh_token,
            }))
            .send()
            .await?;
        let refreshed: RefreshResponse = Self::handle_response(response).await?;

        let user = AuthUser {
            uid: refreshed.user_id,
            email: current.email,
            display_name: current.display_name,
            expires_at: expires_at(&refreshed.expires_in),
            id_token: refreshed.id_token,
            refresh_token: refreshed.refresh_token,
        };
        debug!("Refreshed session for {}", user.uid);
        self.set_user(Some(user.clone())).await;
        Ok(user)
    }

    async fn valid_id_token(&self) -> Result<String, AuthError> {
        let user = self
            .current_user()
            .await
            .ok_or(AuthError::NotAuthenticated)?;
        if user.is_token_expired() {
            return Ok(self.refresh_session().await?.id_token);
        }
        Ok(user.id_token)
    }

    // ------------------------------------------------------------------------
    // Cloud sync
    // ------------------------------------------------------------------------

    /// Read `users/<uid>`; a missing document yields empty lists
    pub async fn get_user_data(&self, uid: &str) -> Result<UserData, AuthError> {
        let token = self.valid_id_token().await?;
        let response = self
            .client
            .get(self.user_document_url(uid))
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("No cloud document for {}", uid);
            return Ok(UserData {
                history: Some(Vec::new()),
                community_prompts: Some(Vec::new()),
            });
        }

        let document: FirestoreDocument = Self::handle_response(response).await?;
        let data: UserData = serde_json::from_value(fields_to_json(&document.fields))?;
        info!(
            "Pulled cloud data for {}: {} history items, {} community prompts",
            uid,
            data.history.as_ref().map_or(0, Vec::len),
            data.community_prompts.as_ref().map_or(0, Vec::len)
        );
        Ok(data)
    }

    /// Merge-write the present fields of `data` into `users/<uid>`
    pub async fn update_user_data(&self, uid: &str, data: &UserData) -> Result<(), AuthError> {
        let value = serde_json::to_value(data)?;
        let Value::Object(map) = value else {
            return Ok(());
        };
        if map.is_empty() {
            return Ok(());
        }

        let mask: Vec<&str> = map.keys().map(String::as_str).collect();
        let url = format!("{}?{}", self.user_document_url(uid), update_mask_query(&mask));
        let token = self.valid_id_token().await?;

        let response = self
            .client
            .patch(url)
            .bearer_auth(token)
            .json(&json!({ "fields": json_to_fields(&map) }))
            .send()
            .await?;
        let _: Value = Self::handle_response(response).await?;

        info!("Pushed cloud data for {} ({})", uid, mask.join(", "));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenerationSettings, HistoryItem};

    fn test_config() -> FirebaseConfig {
        FirebaseConfig {
            api_key: "test-key".to_string(),
            project_id: "rupveda-test".to_string(),
        }
    }

    #[test]
    fn test_value_conversion_round_trip() {
        let original = json!({
            "name": "Kerala Mural",
            "count": 42,
            "negative": -7,
            "ratio": 0.5,
            "enabled": true,
            "missing": null,
            "tags": ["a", 1, false],
            "nested": { "inner": { "deep": "yes" }, "empty": [] }
        });

        let Value::Object(map) = &original else { unreachable!() };
        let fields = json_to_fields(map);
        assert_eq!(fields["count"], json!({ "integerValue": "42" }));
        assert_eq!(fields["ratio"], json!({ "doubleValue": 0.5 }));
        assert_eq!(fields["missing"], json!({ "nullValue": null }));

        assert_eq!(fields_to_json(&fields), original);
    }

    #[test]
    fn test_from_firestore_tolerates_sparse_values() {
        // Firestore omits `values` / `fields` for empty containers
        assert_eq!(from_firestore_value(&json!({ "arrayValue": {} })), json!([]));
        assert_eq!(from_firestore_value(&json!({ "mapValue": {} })), json!({}));
        assert_eq!(
            from_firestore_value(&json!({ "timestampValue": "2024-05-01T12:00:00Z" })),
            json!("2024-05-01T12:00:00Z")
        );
        assert_eq!(from_firestore_value(&json!({ "geoPointValue": {} })), Value::Null);
        assert_eq!(from_firestore_value(&json!("bare")), Value::Null);
    }

    #[test]
    fn test_user_data_from_document_fields() {
        let item = HistoryItem {
            id: 1714564800000,
            image_url: "data:image/jpeg;base64,abc".to_string(),
            prompt: "test".to_string(),
            settings: GenerationSettings::default(),
            created_at: "2024-05-01T12:00:00.000Z".to_string(),
        };
        let data = UserData {
            history: Some(vec![item]),
            community_prompts: None,
        };

        let Value::Object(map) = serde_json::to_value(&data).unwrap() else {
            unreachable!()
        };
        let fields = json_to_fields(&map);
        let back: UserData = serde_json::from_value(fields_to_json(&fields)).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_update_mask_lists_present_fields_only() {
        let data = UserData {
            history: None,
            community_prompts: Some(Vec::new()),
        };
        let Value::Object(map) = serde_json::to_value(&data).unwrap() else {
            unreachable!()
        };
        let mask: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(mask, vec!["communityPrompts"]);
        assert_eq!(
            update_mask_query(&mask),
            "updateMask.fieldPaths=communityPrompts"
        );
        assert_eq!(
            update_mask_query(&["history", "communityPrompts"]),
            "updateMask.fieldPaths=history&updateMask.fieldPaths=communityPrompts"
        );
    }

    #[test]
    fn test_parse_error_message() {
        let body = r#"{"error":{"code":400,"message":"EMAIL_NOT_FOUND","errors":[]}}"#;
        assert_eq!(parse_error_message(body), Some("EMAIL_NOT_FOUND".to_string()));
        assert_eq!(parse_error_message("<html>502</html>"), None);
        assert_eq!(
            AuthError::Provider("INVALID_PASSWORD".to_string()).to_string(),
            "INVALID_PASSWORD"
        );
    }

    #[test]
    fn test_client_requires_config() {
        let mut config = test_config();
        config.api_key = " ".to_string();
        assert!(matches!(
            FirebaseClient::new(config),
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_document_url_and_emulator_endpoints() {
        let client =
            FirebaseClient::with_endpoints(test_config(), Endpoints::emulator("localhost:9099", "localhost:8080"))
                .unwrap();
        assert_eq!(
            client.user_document_url("abc/def"),
            "http://localhost:8080/v1/projects/rupveda-test/databases/(default)/documents/users/abc%2Fdef"
        );
        assert_eq!(
            client.identity_url("signUp"),
            "http://localhost:9099/identitytoolkit.googleapis.com/v1/accounts:signUp?key=test-key"
        );
    }

    #[test]
    fn test_auth_user_hides_tokens() {
        let user = AuthUser {
            uid: "u1".to_string(),
            email: Some("a@b.c".to_string()),
            display_name: Some("Asha".to_string()),
            id_token: "secret-id".to_string(),
            refresh_token: "secret-refresh".to_string(),
            expires_at: 0,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"displayName\":\"Asha\""));
        assert!(!json.contains("secret"));
        assert!(user.is_token_expired());
    }

    #[tokio::test]
    async fn test_local_validation_and_sign_out_notifies() {
        let client = FirebaseClient::new(test_config()).unwrap();
        let mut rx = client.subscribe();

        let err = client
            .sign_up_with_email("a@b.c", "secret1", "   ")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Username is required.");

        let err = client.send_password_reset("").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));

        assert!(matches!(
            client.get_user_data("u1").await,
            Err(AuthError::NotAuthenticated)
        ));

        client.sign_out().await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), None);
        assert!(client.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_out_reaches_subscribers_after_client_dropped() {
        let client = FirebaseClient::new(test_config()).unwrap();
        let mut rx = client.subscribe();

        client.sign_out().await;
        drop(client);

        assert!(rx.changed().await.is_ok());
        assert_eq!(*rx.borrow_and_update(), None);
        assert!(rx.changed().await.is_err());
    }

    /// Requires the Firebase emulator suite on the default ports
    #[tokio::test]
    #[ignore]
    async fn test_emulator_sign_up_and_sync() {
        let client = FirebaseClient::with_endpoints(
            FirebaseConfig {
                api_key: "fake-api-key".to_string(),
                project_id: "demo-rupveda".to_string(),
            },
            Endpoints::emulator("localhost:9099", "localhost:8080"),
        )
        .expect("Failed to create client");

        let email = format!("user{}@example.com", Utc::now().timestamp_millis());
        let user = client
            .sign_up_with_email(&email, "secret123", "Asha")
            .await
            .expect("Sign up failed");
        assert_eq!(user.display_name.as_deref(), Some("Asha"));

        let empty = client.get_user_data(&user.uid).await.expect("Pull failed");
        assert_eq!(empty.history, Some(Vec::new()));

        let data = UserData {
            history: None,
            community_prompts: Some(Vec::new()),
        };
        client
            .update_user_data(&user.uid, &data)
            .await
            .expect("Push failed");
    }
}
