//! HTTP route handlers for the API

use super::AppState;
use crate::error::CoreError;
use crate::session::RegisterRequest;
use axum::{
    extract::{ConnectInfo, FromRequest, Query, Request, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    response::IntoResponse,
    Form, Json,
};
use serde::Deserialize;
use std::net::SocketAddr;

// ============================================================================
// Service info
// ============================================================================

pub async fn welcome() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Bienvenido a la Aplicación de manejo de Sesiones con datos persistentes",
        "author": env!("CARGO_PKG_AUTHORS"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.registry.store().storage().as_str()
    }))
}

// ============================================================================
// Session lifecycle
// ============================================================================

/// Query string carrying the target session
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdQuery {
    pub session_id: Option<String>,
}

impl SessionIdQuery {
    fn session_id(&self) -> &str {
        self.session_id.as_deref().unwrap_or_default()
    }
}

/// Accepts a JSON body or an HTML form post (application/x-www-form-urlencoded)
pub async fn login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Request,
) -> impl IntoResponse {
    let request = match register_body(&headers, body, &state).await {
        Ok(request) => request,
        Err(rejection) => {
            tracing::debug!("Rejected login body: {}", rejection);
            return CoreError::Validation("Datos no recibidos correctamente".to_string())
                .into_response();
        }
    };

    let caller_ip = caller_ip(
        &headers,
        connect_info.map(|ConnectInfo(addr)| addr),
        state.trust_forwarded_for,
    );

    match state.registry.register(request, caller_ip).await {
        Ok(session_id) => Json(serde_json::json!({
            "message": "Usuario registrado exitosamente",
            "sessionId": session_id
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_session(
    State(state): State<AppState>,
    Query(query): Query<SessionIdQuery>,
) -> impl IntoResponse {
    match state.registry.inspect(query.session_id()).await {
        Ok(details) => Json(serde_json::json!({
            "session": details.session,
            "sessionDuration": format!("{} segundos", details.session_duration_seconds)
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_current_sessions(State(state): State<AppState>) -> impl IntoResponse {
    match state.registry.list_active().await {
        Ok(sessions) => Json(serde_json::json!({
            "message": "Sesiones activas",
            "sessions": sessions
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_session(
    State(state): State<AppState>,
    Query(query): Query<SessionIdQuery>,
) -> impl IntoResponse {
    match state.registry.refresh(query.session_id()).await {
        Ok(()) => Json(serde_json::json!({
            "message": "Datos de sesión actualizados"
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn logout(
    State(state): State<AppState>,
    Query(query): Query<SessionIdQuery>,
) -> impl IntoResponse {
    match state.registry.terminate(query.session_id()).await {
        Ok(()) => Json(serde_json::json!({
            "message": "Sesión finalizada correctamente"
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

// ============================================================================
// Administrative
// ============================================================================

pub async fn list_all_sessions(State(state): State<AppState>) -> impl IntoResponse {
    match state.registry.list_all().await {
        Ok(sessions) => Json(serde_json::json!({
            "message": "Todas las sesiones",
            "sessions": sessions
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn delete_all_sessions(State(state): State<AppState>) -> impl IntoResponse {
    match state.registry.purge_all().await {
        Ok(deleted) => Json(serde_json::json!({
            "message": "Todas las sesiones han sido eliminadas",
            "deleted": deleted
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn register_body(
    headers: &HeaderMap,
    body: Request,
    state: &AppState,
) -> std::result::Result<RegisterRequest, String> {
    let is_form = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        Form::<RegisterRequest>::from_request(body, state)
            .await
            .map(|Form(request)| request)
            .map_err(|rejection| rejection.body_text())
    } else {
        Json::<RegisterRequest>::from_request(body, state)
            .await
            .map(|Json(request)| request)
            .map_err(|rejection| rejection.body_text())
    }
}

/// Address the caller connected from, as recorded in clientData.ipAddress
fn caller_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> Option<String> {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            // The proxy appends the peer it saw; anything before it is client-supplied
            .and_then(|v| v.rsplit(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return Some(ip.to_string());
        }
    }

    // IPv4 callers on a dual-stack socket show up as ::ffff:a.b.c.d
    peer.map(|addr| addr.ip().to_canonical().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::create_router;
    use crate::clock::Clock;
    use crate::ephemeral::EphemeralIndex;
    use crate::handlers::SessionRegistry;
    use crate::network::IdentityProvider;
    use crate::session::NetworkIdentity;
    use crate::store::SessionStore;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        app_with(false)
    }

    fn app_with(strict_updates: bool) -> Router {
        let registry = SessionRegistry::new(
            SessionStore::Ephemeral(Arc::new(EphemeralIndex::new())),
            IdentityProvider::Fixed(NetworkIdentity {
                mac_address: Some("00:11:22:33:44:55".to_string()),
                ip_address: Some("192.168.1.10".to_string()),
            }),
            Clock::default(),
        )
        .with_strict_updates(strict_updates);

        create_router(AppState {
            registry,
            trust_forwarded_for: true,
        })
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        call_with(app, method, uri, "application/json", body).await
    }

    async fn call_with(
        app: &Router,
        method: &str,
        uri: &str,
        content_type: &str,
        body: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", content_type);
        }
        let request = builder
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn login_ana(app: &Router) -> String {
        let (status, body) = call(
            app,
            "POST",
            "/login",
            Some(r#"{"name":"Ana","email":"ana@x.com","clientMac":"AA:BB:CC:DD:EE:FF"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["sessionId"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_welcome() {
        let (status, body) = call(&app(), "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].as_str().unwrap().starts_with("Bienvenido"));
        assert_eq!(body["author"], env!("CARGO_PKG_AUTHORS"));
    }

    #[tokio::test]
    async fn test_health_reports_storage() {
        let (status, body) = call(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["storage"], "ephemeral");
    }

    #[tokio::test]
    async fn test_login_then_inspect() {
        let app = app();
        let session_id = login_ana(&app).await;

        let uri = format!("/session?sessionId={}", session_id);
        let (status, body) = call(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session"]["sessionId"], session_id.as_str());
        assert_eq!(body["session"]["status"], "Active");
        assert_eq!(body["session"]["clientData"]["ipAddress"], "10.0.0.1");
        assert_eq!(body["session"]["serverData"]["macAddress"], "00:11:22:33:44:55");

        let duration = body["sessionDuration"].as_str().unwrap();
        let seconds: i64 = duration.strip_suffix(" segundos").unwrap().parse().unwrap();
        assert!((0..=1).contains(&seconds), "fresh session reported {}", duration);
    }

    #[tokio::test]
    async fn test_login_accepts_form_body() {
        let app = app();
        let (status, body) = call_with(
            &app,
            "POST",
            "/login",
            "application/x-www-form-urlencoded",
            Some("name=Ana&email=ana%40x.com&clientMac=AA%3ABB%3ACC%3ADD%3AEE%3AFF"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let session_id = body["sessionId"].as_str().unwrap().to_string();

        let uri = format!("/session?sessionId={}", session_id);
        let (_, body) = call(&app, "GET", &uri, None).await;
        assert_eq!(body["session"]["email"], "ana@x.com");
        assert_eq!(body["session"]["clientData"]["macAddress"], "AA:BB:CC:DD:EE:FF");

        let (status, body) = call_with(
            &app,
            "POST",
            "/login",
            "application/x-www-form-urlencoded",
            Some("name=Bob&email=bob%40x.com"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");
    }

    #[tokio::test]
    async fn test_login_missing_fields() {
        let app = app();
        let partial = r#"{"name":"Ana","email":"ana@x.com"}"#;
        let (status, body) = call(&app, "POST", "/login", Some(partial)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");

        let (status, _) = call(&app, "POST", "/login", Some("not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = call(&app, "GET", "/listAllSessions", None).await;
        assert!(body["sessions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_duplicate_email() {
        let app = app();
        login_ana(&app).await;
        let (status, body) = call(
            &app,
            "POST",
            "/login",
            Some(r#"{"name":"Otra","email":"ana@x.com","clientMac":"11:22:33:44:55:66"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "email_taken");
    }

    #[tokio::test]
    async fn test_session_query_errors() {
        let app = app();
        let (status, _) = call(&app, "GET", "/session", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, "GET", "/session?sessionId=nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "session_not_found");
    }

    #[tokio::test]
    async fn test_update_and_logout_flow() {
        let app = app();
        let session_id = login_ana(&app).await;

        let uri = format!("/update?sessionId={}", session_id);
        let (status, _) = call(&app, "PUT", &uri, None).await;
        assert_eq!(status, StatusCode::OK);

        let uri = format!("/logout?sessionId={}", session_id);
        let (status, body) = call(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Sesión finalizada correctamente");

        let (_, body) = call(&app, "GET", "/listCurrentSessions", None).await;
        assert!(body["sessions"].as_array().unwrap().is_empty());

        let (_, body) = call(&app, "GET", "/listAllSessions", None).await;
        assert_eq!(body["sessions"][0]["status"], "UserTerminated");
    }

    #[tokio::test]
    async fn test_update_and_logout_require_session_id() {
        let app = app();
        let (status, _) = call(&app, "PUT", "/update", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = call(&app, "POST", "/logout", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_id_update_policy() {
        let (status, _) = call(&app(), "PUT", "/update?sessionId=ghost", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app_with(true), "POST", "/logout?sessionId=ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_all_sessions() {
        let app = app();
        login_ana(&app).await;

        let (status, body) = call(&app, "DELETE", "/deleteAllSessions", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], 1);

        let (_, body) = call(&app, "GET", "/listAllSessions", None).await;
        assert!(body["sessions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_caller_ip_prefers_peer_unless_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "198.51.100.4".parse().unwrap());
        let peer: SocketAddr = "[::ffff:10.1.2.3]:5555".parse().unwrap();

        assert_eq!(
            caller_ip(&headers, Some(peer), false).as_deref(),
            Some("10.1.2.3")
        );
        assert_eq!(
            caller_ip(&headers, Some(peer), true).as_deref(),
            Some("198.51.100.4")
        );
        assert_eq!(caller_ip(&HeaderMap::new(), None, true), None);

        // A client-forged leading entry is ignored in favour of the proxy's
        let mut chained = HeaderMap::new();
        chained.insert("x-forwarded-for", "1.2.3.4, 198.51.100.4".parse().unwrap());
        assert_eq!(
            caller_ip(&chained, Some(peer), true).as_deref(),
            Some("198.51.100.4")
        );
    }
}
