use super::Guard;
use crate::error::RouteError;
use crate::request::RequestContext;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::Request;
use mime::Mime;
use serde_json::{json, Map, Value};

/// Collects the named values a request submits: query parameters first, then
/// the fields of a JSON object or form body. Body fields win on conflict.
pub fn submitted_fields(request: &Request<Bytes>) -> Result<Map<String, Value>, RouteError> {
    let mut fields = Map::new();

    if let Some(query) = request.uri().query() {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(query).map_err(|e| RouteError::bad_request(json!({"query": e.to_string()})))?;
        fields.extend(pairs.into_iter().map(|(key, value)| (key, Value::String(value))));
    }

    if request.body().is_empty() {
        return Ok(fields);
    }

    let Some(mime) = content_type(request) else {
        return Ok(fields);
    };

    match mime.essence_str() {
        "application/json" => {
            let body: Value = serde_json::from_slice(request.body())
                .map_err(|e| RouteError::bad_request(json!({"body": e.to_string()})))?;
            if let Value::Object(object) = body {
                fields.extend(object);
            }
        }
        "application/x-www-form-urlencoded" => {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(request.body())
                .map_err(|e| RouteError::bad_request(json!({"body": e.to_string()})))?;
            fields.extend(pairs.into_iter().map(|(key, value)| (key, Value::String(value))));
        }
        _ => {}
    }

    Ok(fields)
}

fn content_type(request: &Request<Bytes>) -> Option<Mime> {
    request.headers().get(CONTENT_TYPE)?.to_str().ok()?.parse().ok()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Rejects requests that do not submit every listed field.
#[derive(Debug, Clone)]
pub struct RequiredFieldsGuard {
    fields: Vec<String>,
}

impl RequiredFieldsGuard {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

#[async_trait]
impl Guard for RequiredFieldsGuard {
    async fn check(&self, ctx: &mut RequestContext) -> Result<(), RouteError> {
        let submitted = submitted_fields(ctx.request())?;
        let missing: Vec<&str> = self
            .fields
            .iter()
            .filter(|field| submitted.get(field.as_str()).is_none_or(is_blank))
            .map(String::as_str)
            .collect();

        if missing.is_empty() { Ok(()) } else { Err(RouteError::bad_request(json!(missing))) }
    }
}

/// Rejects requests missing any listed header, or sending it empty.
#[derive(Debug, Clone)]
pub struct HeadersGuard {
    headers: Vec<String>,
}

impl HeadersGuard {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers }
    }
}

#[async_trait]
impl Guard for HeadersGuard {
    async fn check(&self, ctx: &mut RequestContext) -> Result<(), RouteError> {
        let headers = ctx.headers();
        let missing: Vec<&str> = self
            .headers
            .iter()
            .filter(|name| headers.get(name.as_str()).is_none_or(|value| value.as_bytes().trim_ascii().is_empty()))
            .map(String::as_str)
            .collect();

        if missing.is_empty() { Ok(()) } else { Err(RouteError::bad_request(json!(missing))) }
    }
}

/// Rejects requests whose `Content-Type` essence differs from the required one.
#[derive(Debug, Clone)]
pub struct ContentTypeGuard {
    required: Mime,
}

impl ContentTypeGuard {
    pub fn new(required: Mime) -> Self {
        Self { required }
    }
}

#[async_trait]
impl Guard for ContentTypeGuard {
    async fn check(&self, ctx: &mut RequestContext) -> Result<(), RouteError> {
        let got = ctx.headers().get(CONTENT_TYPE).and_then(|value| value.to_str().ok()).unwrap_or_default();
        let matches = got.parse::<Mime>().is_ok_and(|mime| mime.essence_str() == self.required.essence_str());

        if matches {
            Ok(())
        } else {
            Err(RouteError::bad_request(json!({"required": self.required.essence_str(), "got": got})))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::tests::{context, route};
    use std::sync::Arc;

    fn items_route() -> Arc<micro_route::ResolvedRoute> {
        route(json!({"paths": {"/items": {"methods": {"POST": {"handler": "items.create"}}}}}))
    }

    fn post(uri: &str, content_type: Option<&str>, body: &'static str) -> Request<Bytes> {
        let mut builder = Request::post(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(Bytes::from_static(body.as_bytes())).unwrap()
    }

    #[test]
    fn fields_from_query_json_and_form() {
        let fields = submitted_fields(&post("/items?page=2", Some("application/json"), r#"{"name":"a","n":1}"#)).unwrap();
        assert_eq!(fields.get("page"), Some(&json!("2")));
        assert_eq!(fields.get("name"), Some(&json!("a")));
        assert_eq!(fields.get("n"), Some(&json!(1)));

        let fields =
            submitted_fields(&post("/items", Some("application/x-www-form-urlencoded"), "name=b&tag=x+y")).unwrap();
        assert_eq!(fields.get("name"), Some(&json!("b")));
        assert_eq!(fields.get("tag"), Some(&json!("x y")));

        let fields = submitted_fields(&post("/items", Some("text/plain"), "name=c")).unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn malformed_json_is_a_bad_request() {
        let err = submitted_fields(&post("/items", Some("application/json"), "{")).unwrap_err();
        assert!(matches!(err, RouteError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn missing_fields_are_listed() {
        let route = items_route();
        let guard = RequiredFieldsGuard::new(vec!["name".into(), "price".into(), "note".into()]);
        let mut ctx = context(&route, post("/items", Some("application/json"), r#"{"price":0,"note":""}"#));

        let err = guard.check(&mut ctx).await.unwrap_err();
        assert_eq!(err.public_message(), "bad_request");
        assert_eq!(err.public_data(), json!(["name", "note"]));
    }

    #[tokio::test]
    async fn all_fields_present() {
        let route = items_route();
        let guard = RequiredFieldsGuard::new(vec!["name".into()]);
        let mut ctx = context(&route, post("/items?name=x", None, ""));
        assert!(guard.check(&mut ctx).await.is_ok());
    }

    #[tokio::test]
    async fn headers() {
        let route = items_route();
        let guard = HeadersGuard::new(vec!["X-Client".into(), "X-Trace".into()]);
        let request = Request::post("/items").header("x-client", "web").header("x-trace", " ").body(Bytes::new()).unwrap();

        let err = guard.check(&mut context(&route, request)).await.unwrap_err();
        assert_eq!(err.public_data(), json!(["X-Trace"]));
    }

    #[tokio::test]
    async fn content_type() {
        let route = items_route();
        let guard = ContentTypeGuard::new(mime::APPLICATION_JSON);

        let mut ctx = context(&route, post("/items", Some("application/json; charset=utf-8"), "{}"));
        assert!(guard.check(&mut ctx).await.is_ok());

        let mut ctx = context(&route, post("/items", Some("text/plain"), "x"));
        let err = guard.check(&mut ctx).await.unwrap_err();
        assert_eq!(err.public_data(), json!({"required": "application/json", "got": "text/plain"}));

        let mut ctx = context(&route, post("/items", None, ""));
        let err = guard.check(&mut ctx).await.unwrap_err();
        assert_eq!(err.public_data(), json!({"required": "application/json", "got": ""}));
    }
}
