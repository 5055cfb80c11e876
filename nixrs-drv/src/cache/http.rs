use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::{Client, IntoUrl, RequestBuilder, Response, StatusCode};
use tracing::{debug, trace};
use url::Url;

use super::{BatchQuery, BinaryCache, CacheError};
use crate::settings::{DEFAULT_CACHE_TIMEOUT, Settings};
use crate::store_path::StorePath;

/// Credentials sent along with every cache request.
#[derive(Clone, PartialEq, Eq)]
pub enum CacheAuth {
    Basic {
        username: String,
        password: Option<String>,
    },
    Bearer(String),
}

impl fmt::Debug for CacheAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheAuth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            CacheAuth::Bearer(_) => f.write_str("Bearer(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpBinaryCache {
    client: Client,
    base_url: Url,
    auth: Option<CacheAuth>,
    timeout: Duration,
}

impl HttpBinaryCache {
    /// Client for the cache at `url`.
    ///
    /// Credentials embedded in the URL are taken out of it and sent as basic
    /// authentication.
    pub fn new<U: IntoUrl>(url: U) -> Result<HttpBinaryCache, CacheError> {
        let client = Client::builder().build()?;
        let mut base_url = url.into_url()?;
        let auth = if base_url.username().is_empty() {
            None
        } else {
            let auth = CacheAuth::Basic {
                username: base_url.username().to_owned(),
                password: base_url.password().map(str::to_owned),
            };
            // Only fails for URLs that cannot have credentials in the first place.
            let _ = base_url.set_username("");
            let _ = base_url.set_password(None);
            Some(auth)
        };
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(HttpBinaryCache {
            client,
            base_url,
            auth,
            timeout: DEFAULT_CACHE_TIMEOUT,
        })
    }

    /// Client for the cache configured in `settings`, if any.
    pub fn from_settings(settings: &Settings) -> Result<Option<HttpBinaryCache>, CacheError> {
        settings
            .cache_url
            .clone()
            .map(|url| Ok(HttpBinaryCache::new(url)?.with_timeout(settings.cache_timeout)))
            .transpose()
    }

    pub fn with_auth(mut self, auth: CacheAuth) -> HttpBinaryCache {
        self.auth = Some(auth);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> HttpBinaryCache {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn auth(&self) -> Option<&CacheAuth> {
        self.auth.as_ref()
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(CacheAuth::Basic { username, password }) => {
                request.basic_auth(username, password.as_ref())
            }
            Some(CacheAuth::Bearer(token)) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn deadline<F>(&self, fut: F) -> Result<Response, CacheError>
    where
        F: Future<Output = Result<Response, reqwest::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(resp) => Ok(resp?),
            Err(_) => Err(CacheError::Timeout(self.timeout)),
        }
    }
}

impl BinaryCache for HttpBinaryCache {
    async fn query_paths(&self, paths: &[StorePath]) -> Result<BatchQuery, CacheError> {
        let url = self.base_url.join("query-paths")?;
        debug!(%url, paths = paths.len(), "querying binary cache");
        let request = self.authorize(self.client.get(url.clone()).json(paths));
        let resp = self.deadline(request.send()).await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!(%url, "binary cache has no batch query");
            Ok(BatchQuery::Unsupported)
        } else if status.is_success() {
            let body = tokio::time::timeout(self.timeout, resp.json::<BTreeMap<StorePath, bool>>())
                .await
                .map_err(|_| CacheError::Timeout(self.timeout))??;
            Ok(BatchQuery::Supported(body))
        } else {
            Err(CacheError::Status { url, status })
        }
    }

    async fn probe(&self, path: &StorePath) -> Result<bool, CacheError> {
        let url = self.base_url.join(&format!("{}.narinfo", path.hash_part()))?;
        trace!(%url, "probing binary cache");
        let request = self.authorize(self.client.get(url.clone()));
        let resp = self.deadline(request.send()).await?;
        let status = resp.status();
        if status.is_success() {
            Ok(true)
        } else if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            Ok(false)
        } else {
            Err(CacheError::Status { url, status })
        }
    }
}
