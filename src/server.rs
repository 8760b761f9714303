use crate::{acquire::ContentRequest, render::Pipeline};
use axum::{
    body::{Body, HttpBody},
    extract::{Extension, FromRequest, Multipart, RequestParts},
    headers::ContentType,
    http::{header::CONTENT_TYPE, HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router, TypedHeader,
};
use percent_encoding::percent_decode_str;
use std::{
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Every path is served by [`handle`]. The catch-all also matches `/`.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/*path", any(handle))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(Extension(pipeline)),
        )
}

fn html() -> TypedHeader<ContentType> {
    TypedHeader(ContentType::from(mime::TEXT_HTML))
}

pub async fn handle(
    Extension(pipeline): Extension<Arc<Pipeline>>,
    request: Request<Body>,
) -> Response {
    if request.method() == Method::HEAD {
        return html().into_response();
    }

    let settings = pipeline.settings();
    let is_post = request.method() == Method::POST;
    let uri = request.uri().clone();

    let form = if is_post {
        let read = match form_kind(request.headers()) {
            Some(FormKind::UrlEncoded) => read_form(request, settings.max_form_bytes).await,
            Some(FormKind::Multipart) => read_multipart(request, settings.max_form_bytes).await,
            None => Ok(Vec::new()),
        };
        match read {
            Ok(form) => form,
            Err(status) => return status.into_response(),
        }
    } else {
        Vec::new()
    };

    let params = Params::parse(uri.query(), form);
    let content = ContentRequest {
        file_path: request_file(&settings.document_root, uri.path()),
        inline_text: if is_post { params.get("markdown") } else { None },
        remote_url: params.get("url"),
        raw: settings.raw_support && params.contains("raw"),
    };
    let style = params.get("style");

    match pipeline.render(&content, style.as_deref()).await {
        Ok(rendered) => (html(), rendered.into_bytes()).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormKind {
    UrlEncoded,
    Multipart,
}

fn form_kind(headers: &HeaderMap) -> Option<FormKind> {
    let mime = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok())?;

    if mime.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() {
        Some(FormKind::UrlEncoded)
    } else if mime.essence_str() == mime::MULTIPART_FORM_DATA.essence_str() {
        Some(FormKind::Multipart)
    } else {
        None
    }
}

fn bad_body(err: impl std::fmt::Display) -> StatusCode {
    debug!(error = %err, "failed to read request body");
    StatusCode::BAD_REQUEST
}

async fn read_form(
    mut request: Request<Body>,
    limit: usize,
) -> Result<Vec<(String, String)>, StatusCode> {
    let body = request.body_mut();
    let mut form = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(bad_body)?;
        if form.len() + chunk.len() > limit {
            return Err(StatusCode::PAYLOAD_TOO_LARGE);
        }
        form.extend_from_slice(&chunk);
    }

    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(&form) {
        Ok(pairs) => Ok(pairs),
        Err(err) => {
            debug!(error = %err, "ignoring malformed form body");
            Ok(Vec::new())
        }
    }
}

/// Collect the named text fields of a `multipart/form-data` body. Names and
/// values together may not exceed `limit` bytes.
async fn read_multipart(
    request: Request<Body>,
    limit: usize,
) -> Result<Vec<(String, String)>, StatusCode> {
    let mut parts = RequestParts::new(request);
    let mut multipart = Multipart::from_request(&mut parts).await.map_err(bad_body)?;

    let mut pairs = Vec::new();
    let mut total = 0;
    while let Some(mut field) = multipart.next_field().await.map_err(bad_body)? {
        let name = match field.name() {
            Some(name) => name.to_owned(),
            None => continue,
        };

        total += name.len();
        let mut value = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(bad_body)? {
            total += chunk.len();
            if total > limit {
                return Err(StatusCode::PAYLOAD_TOO_LARGE);
            }
            value.extend_from_slice(&chunk);
        }
        if total > limit {
            return Err(StatusCode::PAYLOAD_TOO_LARGE);
        }

        pairs.push((name, String::from_utf8_lossy(&value).into_owned()));
    }
    Ok(pairs)
}

/// Map a request path onto a file below `root`. A trailing slash survives
/// the mapping; paths that would leave `root` map to nothing.
pub fn request_file(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let decoded = match percent_decode_str(uri_path).decode_utf8() {
        Ok(decoded) => decoded,
        Err(err) => {
            debug!(path = uri_path, error = %err, "request path is not valid UTF-8");
            return None;
        }
    };

    let relative = decoded.trim_start_matches('/');
    let escapes = Path::new(relative).components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        debug!(path = uri_path, "request path leaves the document root");
        return None;
    }

    Some(root.join(relative))
}

/// Decoded query and form parameters, query first.
#[derive(Debug, Default)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn parse(query: Option<&str>, form: Vec<(String, String)>) -> Self {
        let mut pairs = Vec::new();
        if let Some(query) = query {
            match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
                Ok(decoded) => pairs.extend(decoded),
                Err(err) => debug!(error = %err, "ignoring malformed query string"),
            }
        }
        pairs.extend(form);
        Self(pairs)
    }

    /// Every value given for `key`, joined without a separator.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut values = self
            .0
            .iter()
            .filter(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
            .peekable();
        values.peek()?;
        Some(values.collect())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(name, _)| name == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_join_repeated_keys_query_first() {
        let form = vec![
            ("style".to_owned(), "c".to_owned()),
            ("markdown".to_owned(), "# hi".to_owned()),
        ];
        let params = Params::parse(Some("style=a&url=x%20y&style=b"), form);

        assert_eq!(params.get("style").as_deref(), Some("abc"));
        assert_eq!(params.get("url").as_deref(), Some("x y"));
        assert_eq!(params.get("markdown").as_deref(), Some("# hi"));
        assert_eq!(params.get("raw"), None);
    }

    #[test]
    fn bare_key_is_present() {
        let params = Params::parse(Some("raw"), Vec::new());

        assert!(params.contains("raw"));
        assert_eq!(params.get("raw").as_deref(), Some(""));
        assert!(!params.contains("style"));
    }

    #[test]
    fn request_paths_map_below_root() {
        let root = Path::new("/srv/docs");

        assert_eq!(
            request_file(root, "/guide/intro.md"),
            Some(PathBuf::from("/srv/docs/guide/intro.md"))
        );
        assert_eq!(
            request_file(root, "/with%20space.md"),
            Some(PathBuf::from("/srv/docs/with space.md"))
        );
        assert_eq!(request_file(root, "/../etc/passwd"), None);
        assert_eq!(request_file(root, "/a/%2e%2e/%2e%2e/etc"), None);
    }

    #[test]
    fn trailing_slash_survives() {
        let root = Path::new("/srv/docs");

        let dir = request_file(root, "/guide/").unwrap();
        assert!(dir.to_string_lossy().ends_with('/'));

        let top = request_file(root, "/").unwrap();
        assert!(top.to_string_lossy().ends_with('/'));
    }

    #[test]
    fn form_detection_uses_media_type() {
        let mut headers = HeaderMap::new();
        assert_eq!(form_kind(&headers), None);

        headers.insert(
            CONTENT_TYPE,
            "application/x-www-form-urlencoded; charset=utf-8".parse().unwrap(),
        );
        assert_eq!(form_kind(&headers), Some(FormKind::UrlEncoded));

        headers.insert(
            CONTENT_TYPE,
            "multipart/form-data; boundary=xyz".parse().unwrap(),
        );
        assert_eq!(form_kind(&headers), Some(FormKind::Multipart));

        headers.insert(CONTENT_TYPE, "text/plain".parse().unwrap());
        assert_eq!(form_kind(&headers), None);
    }
}
