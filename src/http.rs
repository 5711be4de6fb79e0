//! HTTP transport: maps HTTP requests onto the router, the poll dispatcher
//! and the descriptor builder.
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `POST /router`: a JSON call or batch, or a form submit
//!   (url-encoded or multipart) addressed by `extAction`/`extMethod`.
//! - `GET|POST /poll/:action/:method/:event`: one polling call.
//! - `GET /api.js`, `GET /api-debug.js`: the API descriptor. Query:
//!   `apiNs`, `actionNs`, `remotingApiVar`, `pollingUrlsVar`, `group`,
//!   `format=json`.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use direct_router::{http, Remoting, RouterConfig};
//!
//! let remoting = Arc::new(Remoting::new(catalog, RouterConfig::default()));
//!
//! // Compose with other axum routes
//! let app = axum::Router::new().nest("/direct", http::router(remoting.clone()));
//!
//! // Or serve directly
//! http::serve(remoting, "0.0.0.0:3000").await?;
//! ```

use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, OriginalUri, Path, Query, Request, State};
use axum::http::header::{ACCEPT_LANGUAGE, CONTENT_LENGTH, CONTENT_TYPE, COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tracing::{error, warn};

use crate::api::{ApiFormat, ApiRequest};
use crate::error::RouterError;
use crate::remoting::Remoting;
use crate::transport::{IncomingCall, OutgoingResponse, UploadedFile};

/// Build an axum `Router` serving the remoting endpoints.
pub fn router(remoting: Arc<Remoting>) -> Router {
    Router::new()
        .route("/router", post(router_handler))
        .route("/poll/:action/:method/:event", get(poll_handler).post(poll_handler))
        .route("/api.js", get(api_handler))
        .route("/api-debug.js", get(api_handler))
        .with_state(remoting)
}

/// Serve the remoting endpoints at the given address (e.g. `"0.0.0.0:3000"`).
pub async fn serve(remoting: Arc<Remoting>, addr: &str) -> Result<(), std::io::Error> {
    let app = router(remoting);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

/// Request body as the router consumes it.
enum Payload {
    Json(Vec<u8>),
    Form {
        fields: Vec<(String, String)>,
        uploads: Vec<UploadedFile>,
        multipart: bool,
    },
}

/// `POST /router`
async fn router_handler(
    State(remoting): State<Arc<Remoting>>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    request: Request,
) -> Response {
    let payload = match read_payload(&headers, request, remoting.config().max_body_bytes).await {
        Ok(payload) => payload,
        Err(rejection) => return rejection,
    };

    let mut call = incoming(&remoting, "POST", uri.path(), &headers, query);
    let is_form = matches!(payload, Payload::Form { .. });
    match payload {
        Payload::Json(body) => call = call.body(body),
        Payload::Form {
            fields,
            uploads,
            multipart,
        } => {
            for (name, value) in fields {
                call = call.param(name, value);
            }
            for file in uploads {
                call = call.upload(file);
            }
            call = call.multipart(multipart);
        }
    }

    run_blocking(move || {
        if is_form {
            remoting.router().route_form_post(&call)
        } else {
            remoting.router().route(&call)
        }
    })
    .await
}

/// `GET|POST /poll/:action/:method/:event`
async fn poll_handler(
    State(remoting): State<Arc<Remoting>>,
    Path((action, method, event)): Path<(String, String, String)>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    request: Request,
) -> Response {
    let http_method = request.method().as_str().to_string();
    let mut call = incoming(&remoting, &http_method, uri.path(), &headers, query);
    if is_url_encoded(&headers) {
        match Form::<Vec<(String, String)>>::from_request(request, &()).await {
            Ok(Form(fields)) => {
                for (name, value) in fields {
                    call = call.param(name, value);
                }
            }
            Err(rejection) => return rejection.into_response(),
        }
    }

    run_blocking(move || remoting.poller().dispatch(&action, &method, &event, &call)).await
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiQuery {
    api_ns: Option<String>,
    action_ns: Option<String>,
    remoting_api_var: Option<String>,
    polling_urls_var: Option<String>,
    group: Option<String>,
    format: Option<String>,
}

/// `GET /api.js`, `GET /api-debug.js`
async fn api_handler(
    State(remoting): State<Arc<Remoting>>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<ApiQuery>,
) -> Response {
    let mut request = ApiRequest::for_path(uri.path())
        .with_action_ns(query.action_ns.as_deref())
        .with_group(query.group.as_deref());
    if let Some(ns) = query.api_ns.as_deref() {
        request = request.with_api_ns(Some(ns));
    }
    if let Some(var) = query.remoting_api_var.filter(|v| !v.trim().is_empty()) {
        request = request.with_remoting_api_var(var);
    }
    if let Some(var) = query.polling_urls_var.filter(|v| !v.trim().is_empty()) {
        request = request.with_polling_urls_var(var);
    }
    if query.format.is_some_and(|f| f.eq_ignore_ascii_case("json")) {
        request = request.with_format(ApiFormat::Json);
    }

    run_blocking(move || remoting.api().respond(&request)).await
}

async fn read_payload(
    headers: &HeaderMap,
    request: Request,
    limit: usize,
) -> Result<Payload, Response> {
    let content_type = content_type(headers);
    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(IntoResponse::into_response)?;
        let (fields, uploads) = read_multipart(multipart).await?;
        Ok(Payload::Form {
            fields,
            uploads,
            multipart: true,
        })
    } else if is_url_encoded(headers) {
        let Form(fields) = Form::<Vec<(String, String)>>::from_request(request, &())
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(Payload::Form {
            fields,
            uploads: Vec::new(),
            multipart: false,
        })
    } else {
        let declared = header_str(headers, CONTENT_LENGTH.as_str()).and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|length| length > limit) {
            warn!(limit, "request body exceeds the limit");
            return Err(StatusCode::PAYLOAD_TOO_LARGE.into_response());
        }
        let body = axum::body::to_bytes(request.into_body(), limit)
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()).into_response())?;
        Ok(Payload::Json(body.to_vec()))
    }
}

/// Text parts become parameters, file parts uploads.
async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(Vec<(String, String)>, Vec<UploadedFile>), Response> {
    let mut fields = Vec::new();
    let mut uploads = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(e.into_response()),
        };
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        match file_name {
            Some(file_name) => {
                let bytes = field.bytes().await.map_err(IntoResponse::into_response)?;
                let mut file = UploadedFile::new(name, bytes.to_vec()).with_file_name(file_name);
                if let Some(content_type) = content_type {
                    file = file.with_content_type(content_type);
                }
                uploads.push(file);
            }
            None => {
                let text = field.text().await.map_err(IntoResponse::into_response)?;
                fields.push((name, text));
            }
        }
    }
    Ok((fields, uploads))
}

/// Translate HTTP request state into an `IncomingCall`: headers, query
/// parameters, session, locale and principal.
fn incoming(
    remoting: &Remoting,
    method: &str,
    path: &str,
    headers: &HeaderMap,
    query: Vec<(String, String)>,
) -> IncomingCall {
    let config = remoting.config();
    let mut call = IncomingCall::new(method, path);
    for (name, value) in headers.iter() {
        if let Ok(v) = value.to_str() {
            call = call.header(name.as_str(), v);
        }
    }
    for (name, value) in query {
        call = call.param(name, value);
    }

    let session_id = header_str(headers, &config.session_header)
        .map(str::to_string)
        .or_else(|| cookie(headers, &config.session_cookie));
    if let Some(id) = session_id.filter(|id| !id.is_empty()) {
        call = call.session(remoting.sessions().get_or_create(&id));
    }
    if let Some(locale) = headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(primary_language)
    {
        call = call.locale(locale);
    }
    if let Some(principal) = config
        .principal_header
        .as_deref()
        .and_then(|name| header_str(headers, name))
    {
        call = call.principal(principal);
    }
    call
}

/// Routing runs handlers synchronously and may wait on a session lock, so
/// it stays off the async workers.
async fn run_blocking<F>(work: F) -> Response
where
    F: FnOnce() -> Result<OutgoingResponse, RouterError> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(Ok(response)) => into_response(response),
        Ok(Err(err @ RouterError::Codec(_))) => {
            warn!(kind = err.kind(), "rejected request: {}", err);
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        Ok(Err(err)) => {
            error!(kind = err.kind(), "request failed: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
        Err(join) => {
            error!("routing task failed: {}", join);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn into_response(outgoing: OutgoingResponse) -> Response {
    let status = StatusCode::from_u16(outgoing.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, outgoing.body).into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&outgoing.content_type) {
        headers.insert(CONTENT_TYPE, value);
    }
    for (name, value) in outgoing.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!(header = %name, "dropping invalid response header"),
        }
    }
    response
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn is_url_encoded(headers: &HeaderMap) -> bool {
    content_type(headers).starts_with("application/x-www-form-urlencoded")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// First language tag of an `Accept-Language` header.
fn primary_language(header: &str) -> Option<String> {
    header
        .split(',')
        .next()
        .and_then(|tag| tag.split(';').next())
        .map(str::trim)
        .filter(|tag| !tag.is_empty() && *tag != "*")
        .map(str::to_string)
}
