//! Tower service that answers Kubernetes REST requests from the in-memory store
//!
//! `kube::Client` is built on top of this service, so every `kube::Api<K>` call
//! ends up here as an HTTP request and is routed to the [`ObjectTracker`].

use crate::client_utils::{extract_gvk, join_api_version};
use crate::discovery::{ResourceInfo, ResourceRegistry};
use crate::error::Error;
use crate::interceptor;
use crate::selectors::{
    object_matches_fields, object_matches_labels, parse_field_selector, parse_label_selector,
};
use crate::tracker::{ObjectTracker, GVR};
use crate::utils::object_name;
use crate::Result;
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use kube::client::Body as KubeBody;
use serde_json::Value;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tracing::{debug, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// State shared by the service and the `MockServer` handle
pub(crate) struct Backend {
    pub(crate) tracker: ObjectTracker,
    pub(crate) registry: ResourceRegistry,
    pub(crate) interceptors: interceptor::Funcs,
    pub(crate) default_namespace: String,
}

/// Parsed Kubernetes API path
///
/// - `/api/v1/namespaces/default/configmaps[/name]`
/// - `/apis/storage.k8s.io/v1/storageclasses[/name]`
#[derive(Debug, PartialEq)]
pub(crate) struct ParsedPath {
    pub(crate) gvr: GVR,
    pub(crate) namespace: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) subresource: Option<String>,
}

impl ParsedPath {
    pub(crate) fn parse(path: &str) -> Option<Self> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let (group, rest) = match parts.as_slice() {
            ["api", rest @ ..] => ("", rest),
            ["apis", group, rest @ ..] => (*group, rest),
            _ => return None,
        };

        let (version, rest) = rest.split_first()?;
        let (namespace, rest) = match rest {
            ["namespaces", ns, tail @ ..] if !tail.is_empty() => (Some(ns.to_string()), tail),
            _ => (None, rest),
        };

        let (resource, name, subresource) = match rest {
            [resource] => (*resource, None, None),
            [resource, name] => (*resource, Some(*name), None),
            [resource, name, sub] => (*resource, Some(*name), Some(*sub)),
            _ => return None,
        };

        Some(Self::new(group, version, resource, namespace, name, subresource))
    }

    fn new(
        group: &str,
        version: &str,
        resource: &str,
        namespace: Option<String>,
        name: Option<&str>,
        subresource: Option<&str>,
    ) -> Self {
        Self {
            gvr: GVR::new(group, version, resource),
            namespace,
            name: name.map(str::to_string),
            subresource: subresource.map(str::to_string),
        }
    }

    fn require_name(&self, verb: &str) -> Result<&str> {
        self.name
            .as_deref()
            .ok_or_else(|| Error::InvalidRequest(format!("resource name is required for {}", verb)))
    }
}

/// Query parameters understood on list requests
#[derive(Debug, Default)]
pub(crate) struct ListQuery {
    pub(crate) label_selector: Option<String>,
    pub(crate) field_selector: Option<String>,
    pub(crate) limit: Option<usize>,
    /// Opaque token from a previous limited list: the offset of the next item
    pub(crate) continue_token: Option<String>,
}

/// Decode an `application/x-www-form-urlencoded` value, where `+` is a space.
fn decode_query_value(value: &str) -> String {
    let value = value.replace('+', " ");
    match urlencoding::decode(&value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value,
    }
}

impl ListQuery {
    pub(crate) fn parse(query: Option<&str>) -> Self {
        let mut params = Self::default();
        for pair in query.unwrap_or("").split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = decode_query_value(value);
            match key {
                "labelSelector" => params.label_selector = Some(value),
                "fieldSelector" => params.field_selector = Some(value),
                "limit" => params.limit = value.parse().ok().filter(|l| *l > 0),
                "continue" if !value.is_empty() => params.continue_token = Some(value),
                _ => {}
            }
        }
        params
    }

    fn offset(&self) -> Result<usize> {
        match &self.continue_token {
            Some(token) => token
                .parse()
                .map_err(|_| Error::InvalidRequest(format!("invalid continue token: {}", token))),
            None => Ok(0),
        }
    }
}

/// Patch types based on the Content-Type header
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PatchType {
    /// RFC 6902 - application/json-patch+json
    Json,
    /// RFC 7386 - application/merge-patch+json
    Merge,
    /// application/strategic-merge-patch+json, applied as a merge patch
    StrategicMerge,
    /// application/apply-patch+yaml, applied as a merge patch
    Apply,
}

impl PatchType {
    pub(crate) fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if ct.contains("application/json-patch+json") => PatchType::Json,
            Some(ct) if ct.contains("application/merge-patch+json") => PatchType::Merge,
            Some(ct) if ct.contains("application/apply-patch+yaml") => PatchType::Apply,
            _ => PatchType::StrategicMerge,
        }
    }

    pub(crate) fn apply(self, target: &mut Value, patch: &Value) -> Result<()> {
        match self {
            PatchType::Json => {
                let ops: json_patch::Patch = serde_json::from_value(patch.clone())?;
                json_patch::patch(target, &ops)?;
            }
            PatchType::Merge | PatchType::StrategicMerge | PatchType::Apply => {
                json_patch::merge(target, patch);
            }
        }
        Ok(())
    }
}

/// Mock HTTP service routing requests to the object tracker
#[derive(Clone)]
pub struct MockService {
    backend: Arc<Backend>,
}

impl MockService {
    pub(crate) fn new(backend: Arc<Backend>) -> Self {
        Self { backend }
    }

    fn tracker(&self) -> &ObjectTracker {
        &self.backend.tracker
    }

    fn resolve(&self, parsed: &ParsedPath) -> Result<ResourceInfo> {
        if let Some(sub) = &parsed.subresource {
            return Err(Error::NotFound {
                kind: format!("{}/{}", parsed.gvr.resource, sub),
                name: parsed.name.clone().unwrap_or_default(),
                namespace: parsed.namespace.clone().unwrap_or_default(),
            });
        }
        self.backend
            .registry
            .by_gvr(&parsed.gvr)
            .ok_or_else(|| Error::UnknownResource {
                group: parsed.gvr.group.clone(),
                version: parsed.gvr.version.clone(),
                resource: parsed.gvr.resource.clone(),
            })
    }

    /// Namespace key used in the tracker: always empty for cluster-scoped kinds.
    fn store_namespace<'a>(&'a self, info: &ResourceInfo, parsed: &'a ParsedPath) -> &'a str {
        if !info.namespaced {
            ""
        } else {
            parsed
                .namespace
                .as_deref()
                .unwrap_or(&self.backend.default_namespace)
        }
    }

    async fn handle_request(&self, req: Request<KubeBody>) -> std::result::Result<Response<Full<Bytes>>, BoxError> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = req.into_body().collect().await?.to_bytes();

        debug!("{} {}", method, path);

        let Some(parsed) = ParsedPath::parse(&path) else {
            return Ok(Self::error_response(
                StatusCode::NOT_FOUND,
                &format!("the server could not find the requested resource: {}", path),
            ));
        };

        let result = match method.as_str() {
            "GET" => self
                .handle_get(&parsed, query.as_deref())
                .map(|v| (StatusCode::OK, v)),
            "POST" => self
                .handle_post(&parsed, &body)
                .map(|v| (StatusCode::CREATED, v)),
            "PUT" => self
                .handle_put(&parsed, &body)
                .map(|v| (StatusCode::OK, v)),
            "PATCH" => self
                .handle_patch(&parsed, &body, content_type.as_deref())
                .map(|v| (StatusCode::OK, v)),
            "DELETE" => self.handle_delete(&parsed).map(|v| (StatusCode::OK, v)),
            _ => {
                return Ok(Self::error_response(
                    StatusCode::METHOD_NOT_ALLOWED,
                    "Method not allowed",
                ))
            }
        };

        Ok(match result {
            Ok((status, value)) => Self::json_response(status, &value),
            Err(err) => {
                warn!("{} {} rejected: {}", method, path, err);
                let (status, _) = err.status();
                Self::json_response(status, &err.to_status_body())
            }
        })
    }

    fn handle_get(&self, parsed: &ParsedPath, query: Option<&str>) -> Result<Value> {
        let info = self.resolve(parsed)?;
        let namespace = self.store_namespace(&info, parsed);

        if let Some(name) = parsed.name.as_deref() {
            if let Some(hook) = &self.backend.interceptors.get {
                let ctx = interceptor::GetContext {
                    tracker: self.tracker(),
                    kind: &info.kind,
                    namespace,
                    name,
                };
                if let Some(obj) = hook(ctx)? {
                    return Ok(obj);
                }
            }
            return self.tracker().get(&parsed.gvr, namespace, name);
        }

        let params = ListQuery::parse(query);
        let list_namespace = if info.namespaced {
            parsed.namespace.as_deref()
        } else {
            None
        };

        let intercepted = match &self.backend.interceptors.list {
            Some(hook) => hook(interceptor::ListContext {
                tracker: self.tracker(),
                kind: &info.kind,
                namespace: list_namespace,
            })?,
            None => None,
        };
        let mut objects = match intercepted {
            Some(objects) => objects,
            None => self.tracker().list(&parsed.gvr, list_namespace)?,
        };

        if let Some(selector) = &params.label_selector {
            let selector = parse_label_selector(selector).map_err(Error::InvalidRequest)?;
            objects.retain(|obj| object_matches_labels(obj, &selector));
        }
        if let Some(selector) = &params.field_selector {
            let requirements = parse_field_selector(selector).map_err(Error::InvalidRequest)?;
            objects.retain(|obj| object_matches_fields(obj, &requirements));
        }

        let offset = params.offset()?;
        let mut objects: Vec<Value> = objects.into_iter().skip(offset).collect();
        let mut metadata = serde_json::json!({
            "resourceVersion": self.tracker().current_resource_version()
        });
        if let Some(limit) = params.limit {
            if objects.len() > limit {
                metadata["continue"] = Value::String((offset + limit).to_string());
                metadata["remainingItemCount"] = Value::from(objects.len() - limit);
                objects.truncate(limit);
            }
        }

        Ok(serde_json::json!({
            "kind": format!("{}List", info.kind),
            "apiVersion": join_api_version(&info.group, &info.version),
            "metadata": metadata,
            "items": objects
        }))
    }

    /// Decode a request body, defaulting `apiVersion`/`kind` from the URL and
    /// rejecting bodies addressed to a different kind.
    fn decode_object(info: &ResourceInfo, body: &[u8]) -> Result<Value> {
        let mut obj: Value = serde_json::from_slice(body)?;
        if !obj.is_object() {
            return Err(Error::InvalidRequest("request body must be an object".to_string()));
        }
        if obj.get("apiVersion").is_none() {
            obj["apiVersion"] = Value::String(join_api_version(&info.group, &info.version));
        }
        if obj.get("kind").is_none() {
            obj["kind"] = Value::String(info.kind.clone());
        }

        let gvk = extract_gvk(&obj)?;
        if gvk != info.gvk() {
            return Err(Error::InvalidRequest(format!(
                "body kind {} does not match {} endpoint",
                gvk.kind, info.plural
            )));
        }
        Ok(obj)
    }

    /// A namespaced body may omit its namespace but must not name another one.
    fn check_namespace(info: &ResourceInfo, obj: &Value, namespace: &str) -> Result<()> {
        if !info.namespaced {
            return Ok(());
        }
        let body_namespace = obj
            .get("metadata")
            .and_then(|m| m.get("namespace"))
            .and_then(|n| n.as_str())
            .unwrap_or("");
        if !body_namespace.is_empty() && body_namespace != namespace {
            return Err(Error::InvalidRequest(
                "the namespace of the provided object does not match the namespace sent on the request"
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn handle_post(&self, parsed: &ParsedPath, body: &[u8]) -> Result<Value> {
        let info = self.resolve(parsed)?;
        let namespace = self.store_namespace(&info, parsed);
        let obj = Self::decode_object(&info, body)?;
        Self::check_namespace(&info, &obj, namespace)?;

        if let Some(hook) = &self.backend.interceptors.create {
            let ctx = interceptor::CreateContext {
                tracker: self.tracker(),
                kind: &info.kind,
                namespace,
                object: &obj,
            };
            if let Some(created) = hook(ctx)? {
                return Ok(created);
            }
        }

        self.tracker().create(&parsed.gvr, &info.gvk(), obj, namespace)
    }

    fn handle_put(&self, parsed: &ParsedPath, body: &[u8]) -> Result<Value> {
        let info = self.resolve(parsed)?;
        let namespace = self.store_namespace(&info, parsed);
        let name = parsed.require_name("PUT")?;
        let obj = Self::decode_object(&info, body)?;
        Self::check_namespace(&info, &obj, namespace)?;

        if object_name(&obj) != Some(name) {
            return Err(Error::InvalidRequest(format!(
                "metadata.name does not match the name in the request path ({})",
                name
            )));
        }

        if let Some(hook) = &self.backend.interceptors.replace {
            let ctx = interceptor::ReplaceContext {
                tracker: self.tracker(),
                kind: &info.kind,
                namespace,
                name,
                object: &obj,
            };
            if let Some(replaced) = hook(ctx)? {
                return Ok(replaced);
            }
        }

        self.tracker().update(&parsed.gvr, obj, namespace)
    }

    fn handle_patch(
        &self,
        parsed: &ParsedPath,
        body: &[u8],
        content_type: Option<&str>,
    ) -> Result<Value> {
        let info = self.resolve(parsed)?;
        let namespace = self.store_namespace(&info, parsed);
        let name = parsed.require_name("PATCH")?;
        let patch: Value = serde_json::from_slice(body)?;

        if let Some(hook) = &self.backend.interceptors.patch {
            let ctx = interceptor::PatchContext {
                tracker: self.tracker(),
                kind: &info.kind,
                namespace,
                name,
                patch: &patch,
            };
            if let Some(patched) = hook(ctx)? {
                return Ok(patched);
            }
        }

        let mut target = self.tracker().get(&parsed.gvr, namespace, name)?;
        PatchType::from_content_type(content_type).apply(&mut target, &patch)?;

        if object_name(&target) != Some(name) {
            return Err(Error::InvalidRequest(
                "metadata.name field is immutable".to_string(),
            ));
        }
        Self::check_namespace(&info, &target, namespace)?;

        self.tracker().update(&parsed.gvr, target, namespace)
    }

    fn handle_delete(&self, parsed: &ParsedPath) -> Result<Value> {
        let info = self.resolve(parsed)?;
        let namespace = self.store_namespace(&info, parsed);
        let name = parsed.require_name("DELETE")?;

        if let Some(hook) = &self.backend.interceptors.delete {
            let ctx = interceptor::DeleteContext {
                tracker: self.tracker(),
                kind: &info.kind,
                namespace,
                name,
            };
            if let Some(deleted) = hook(ctx)? {
                return Ok(deleted);
            }
        }

        self.tracker().delete(&parsed.gvr, namespace, name)
    }

    fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }

    fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
        let body = serde_json::json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": message,
            "reason": status.canonical_reason().unwrap_or("Unknown"),
            "code": status.as_u16()
        });
        Self::json_response(status, &body)
    }
}

impl Service<Request<KubeBody>> for MockService {
    type Response = Response<Full<Bytes>>;
    type Error = BoxError;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<KubeBody>) -> Self::Future {
        let this = self.clone();
        async move { this.handle_request(req).await }.boxed()
    }
}
