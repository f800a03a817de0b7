use std::fmt;

use url::Url;

use crate::error::FaceClientError;

/// One regional service endpoint plus the subscription key that authenticates
/// against it. Immutable once constructed; a client is bound to exactly one.
#[derive(Clone)]
pub struct RemoteEndpoint {
    base: Url,
    key: String,
}

impl RemoteEndpoint {
    pub fn new(base_url: &str, key: impl Into<String>) -> Result<Self, FaceClientError> {
        let mut base = Url::parse(base_url)?;
        // Relative joins drop the last path segment unless the base ends in a
        // slash, so normalize here instead of at every call site.
        if !base.path().ends_with('/') {
            let normalized = format!("{}/", base.path());
            base.set_path(&normalized);
        }
        Ok(Self {
            base,
            key: key.into(),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn join(&self, path: &str) -> Result<Url, FaceClientError> {
        self.base.join(path).map_err(FaceClientError::from)
    }
}

impl fmt::Debug for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteEndpoint")
            .field("base", &self.base.as_str())
            .field("key", &"<redacted>")
            .finish()
    }
}
