use http::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Resource not found: {kind} {name} in namespace {namespace}")]
    NotFound {
        kind: String,
        name: String,
        namespace: String,
    },

    #[error("Resource already exists: {kind} {name} in namespace {namespace}")]
    AlreadyExists {
        kind: String,
        name: String,
        namespace: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown resource: {group}/{version} {resource}")]
    UnknownResource {
        group: String,
        version: String,
        resource: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("JSON patch error: {0}")]
    Patch(#[from] json_patch::PatchError),

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("Failed to access object metadata: {0}")]
    Metadata(String),

    #[error("Kubernetes client error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status and Kubernetes `Status.reason` the mock server answers with.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Error::NotFound { .. } | Error::UnknownResource { .. } => {
                (StatusCode::NOT_FOUND, "NotFound")
            }
            Error::AlreadyExists { .. } => (StatusCode::CONFLICT, "AlreadyExists"),
            Error::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            Error::InvalidRequest(_) | Error::Metadata(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "Invalid")
            }
            Error::Serialization(_) | Error::Patch(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            Error::Fixture(_) | Error::Kube(_) | Error::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError")
            }
        }
    }

    /// Render as a Kubernetes `Status` object.
    pub fn to_status_body(&self) -> serde_json::Value {
        let (code, reason) = self.status();
        serde_json::json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": self.to_string(),
            "reason": reason,
            "code": code.as_u16(),
        })
    }

    /// Map an API error returned through `kube::Client` back onto a typed variant.
    ///
    /// `kind`, `name` and `namespace` describe the request that failed since the
    /// `Status` body only carries a message.
    pub(crate) fn from_kube(err: kube::Error, kind: &str, name: &str, namespace: &str) -> Self {
        match err {
            kube::Error::Api(resp) => match (resp.code, resp.reason.as_str()) {
                (404, _) => Error::NotFound {
                    kind: kind.to_string(),
                    name: name.to_string(),
                    namespace: namespace.to_string(),
                },
                (409, "AlreadyExists") => Error::AlreadyExists {
                    kind: kind.to_string(),
                    name: name.to_string(),
                    namespace: namespace.to_string(),
                },
                (409, _) => Error::Conflict(resp.message),
                (400, _) | (422, _) => Error::InvalidRequest(resp.message),
                _ => Error::Kube(kube::Error::Api(resp)),
            },
            other => Error::Kube(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
