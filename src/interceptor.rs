//! Per-verb hooks that let a test override or fail mock server requests
//!
//! Each hook receives a context describing the request and returns:
//! - `Ok(Some(value))` to answer with `value` instead of touching the store
//! - `Ok(None)` to fall through to the default store behavior
//! - `Err(e)` to fail the request with `e` mapped to its HTTP status

use crate::tracker::ObjectTracker;
use crate::Result;
use serde_json::Value;
use std::sync::Arc;

/// Interceptor functions, one optional hook per verb
///
/// # Example
/// ```
/// use kube_mock_server::{interceptor, Error};
///
/// let funcs = interceptor::Funcs::new().delete(|ctx| {
///     if ctx.name == "protected" {
///         return Err(Error::Conflict("protected objects cannot be deleted".into()));
///     }
///     Ok(None)
/// });
/// ```
#[derive(Default, Clone)]
pub struct Funcs {
    pub(crate) create: Option<CreateInterceptor>,
    pub(crate) get: Option<GetInterceptor>,
    pub(crate) list: Option<ListInterceptor>,
    pub(crate) replace: Option<ReplaceInterceptor>,
    pub(crate) patch: Option<PatchInterceptor>,
    pub(crate) delete: Option<DeleteInterceptor>,
}

pub struct CreateContext<'a> {
    pub tracker: &'a ObjectTracker,
    pub kind: &'a str,
    pub namespace: &'a str,
    /// The object being created
    pub object: &'a Value,
}

pub struct GetContext<'a> {
    pub tracker: &'a ObjectTracker,
    pub kind: &'a str,
    pub namespace: &'a str,
    pub name: &'a str,
}

pub struct ListContext<'a> {
    pub tracker: &'a ObjectTracker,
    pub kind: &'a str,
    /// `None` for an all-namespaces or cluster-scoped list
    pub namespace: Option<&'a str>,
}

pub struct ReplaceContext<'a> {
    pub tracker: &'a ObjectTracker,
    pub kind: &'a str,
    pub namespace: &'a str,
    pub name: &'a str,
    /// The replacement object
    pub object: &'a Value,
}

pub struct PatchContext<'a> {
    pub tracker: &'a ObjectTracker,
    pub kind: &'a str,
    pub namespace: &'a str,
    pub name: &'a str,
    /// The raw patch document
    pub patch: &'a Value,
}

pub struct DeleteContext<'a> {
    pub tracker: &'a ObjectTracker,
    pub kind: &'a str,
    pub namespace: &'a str,
    pub name: &'a str,
}

pub type CreateInterceptor = Arc<dyn Fn(CreateContext) -> Result<Option<Value>> + Send + Sync>;
pub type GetInterceptor = Arc<dyn Fn(GetContext) -> Result<Option<Value>> + Send + Sync>;
pub type ListInterceptor = Arc<dyn Fn(ListContext) -> Result<Option<Vec<Value>>> + Send + Sync>;
pub type ReplaceInterceptor = Arc<dyn Fn(ReplaceContext) -> Result<Option<Value>> + Send + Sync>;
pub type PatchInterceptor = Arc<dyn Fn(PatchContext) -> Result<Option<Value>> + Send + Sync>;
pub type DeleteInterceptor = Arc<dyn Fn(DeleteContext) -> Result<Option<Value>> + Send + Sync>;

impl Funcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create<F>(mut self, f: F) -> Self
    where
        F: Fn(CreateContext) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.create = Some(Arc::new(f));
        self
    }

    pub fn get<F>(mut self, f: F) -> Self
    where
        F: Fn(GetContext) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.get = Some(Arc::new(f));
        self
    }

    pub fn list<F>(mut self, f: F) -> Self
    where
        F: Fn(ListContext) -> Result<Option<Vec<Value>>> + Send + Sync + 'static,
    {
        self.list = Some(Arc::new(f));
        self
    }

    pub fn replace<F>(mut self, f: F) -> Self
    where
        F: Fn(ReplaceContext) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.replace = Some(Arc::new(f));
        self
    }

    pub fn patch<F>(mut self, f: F) -> Self
    where
        F: Fn(PatchContext) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.patch = Some(Arc::new(f));
        self
    }

    pub fn delete<F>(mut self, f: F) -> Self
    where
        F: Fn(DeleteContext) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.delete = Some(Arc::new(f));
        self
    }
}
