//! Cloud Storage JSON API backend.
//!
//! Request surface:
//!
//! | Operation      | Request                                                        |
//! |----------------|----------------------------------------------------------------|
//! | list buckets   | `GET  {api}/b?project=`                                        |
//! | list objects   | `GET  {api}/b/{bucket}/o?prefix=&delimiter=/`                  |
//! | get metadata   | `GET  {api}/b/{bucket}/o/{object}`                             |
//! | get data       | `GET  {api}/b/{bucket}/o/{object}?alt=media`                   |
//! | write          | `POST {upload}/b/{bucket}/o?uploadType=media&name=`            |
//! | delete         | `DELETE {api}/b/{bucket}/o/{object}`                           |
//! | copy           | `POST {api}/b/{src}/o/{srcObject}/rewriteTo/b/{dst}/o/{dstObject}` |
//!
//! Object names are sent as single percent-encoded path segments, so `/`
//! inside a key travels as `%2F`.

use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use gcsb_types::{BucketInfo, Credential, ListResult, ObjectMetadata};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::Deserialize;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::traits::{ListOptions, ObjectStoreClient};

fn require_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::Validation("no object name supplied".into()));
    }
    Ok(())
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketPage {
    #[serde(default)]
    items: Vec<BucketInfo>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RewriteResponse {
    done: bool,
    rewrite_token: Option<String>,
    resource: Option<ObjectMetadata>,
}

/// [`ObjectStoreClient`] over the Cloud Storage JSON API.
///
/// The bearer credential is injected by the auth collaborator and can be
/// swapped at any time with [`set_credential`](Self::set_credential). A
/// missing token is not checked locally: the request goes out without an
/// `Authorization` header and the API's rejection surfaces as
/// [`StoreError::Auth`].
pub struct HttpObjectStore {
    client: reqwest::Client,
    config: StoreConfig,
    credential: RwLock<Credential>,
}

impl HttpObjectStore {
    pub fn new(config: StoreConfig, credential: Credential) -> StoreResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            config,
            credential: RwLock::new(credential),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Replace the credential used for subsequent calls.
    pub fn set_credential(&self, credential: Credential) {
        *self.credential.write().expect("lock poisoned") = credential;
    }

    fn credential(&self) -> Credential {
        self.credential.read().expect("lock poisoned").clone()
    }

    fn url(base: &str, segments: &[&str]) -> StoreResult<Url> {
        let mut url =
            Url::parse(base).map_err(|e| StoreError::Validation(format!("bad base URL {base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Validation(format!("base URL cannot take a path: {base}")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// URL of a single object. An empty key would address the listing
    /// endpoint instead, so it is refused.
    fn object_url(&self, bucket: &str, key: &str) -> StoreResult<Url> {
        require_key(key)?;
        Self::url(&self.config.api_base, &["b", bucket, "o", key])
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.credential().token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, request: RequestBuilder, bucket: &str, key: &str) -> StoreResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|env| env.error.message)
            .unwrap_or(body);
        tracing::debug!(bucket, key, status = status.as_u16(), %message, "request rejected");

        Err(match status.as_u16() {
            401 | 403 => match self.credential().error() {
                Some(acquisition) => StoreError::Auth(format!("{message} (credential: {acquisition})")),
                None => StoreError::Auth(message),
            },
            404 if key.is_empty() => StoreError::BucketNotFound(bucket.to_string()),
            404 => StoreError::not_found(bucket, key),
            code => StoreError::Api {
                status: code,
                message,
            },
        })
    }

    /// A rewrite 404 does not say which side is missing. If the source is
    /// still there, the destination bucket is the one that does not exist.
    async fn copy_miss(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        err: StoreError,
    ) -> StoreError {
        match self.get_metadata(src_bucket, src_key).await {
            Ok(_) => StoreError::BucketNotFound(dst_bucket.to_string()),
            Err(_) => err,
        }
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> StoreResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ObjectStoreClient for HttpObjectStore {
    async fn list_buckets(&self, project: &str) -> StoreResult<Vec<BucketInfo>> {
        if project.is_empty() {
            return Err(StoreError::Validation("project must not be empty".into()));
        }
        let url = Self::url(&self.config.api_base, &["b"])?;
        let mut buckets = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .request(Method::GET, url.clone())
                .query(&[("project", project)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: BucketPage = Self::json(self.send(request, "", "").await?).await?;
            buckets.extend(page.items);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        tracing::debug!(project, count = buckets.len(), "listed buckets");
        Ok(buckets)
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        options: ListOptions,
    ) -> StoreResult<ListResult> {
        let url = Self::url(&self.config.api_base, &["b", bucket, "o"])?;
        let mut result = ListResult::default();
        loop {
            let mut request = self
                .request(Method::GET, url.clone())
                .query(&[("prefix", prefix)]);
            if options.delimiter {
                request = request.query(&[("delimiter", "/")]);
            }
            if let Some(size) = self.config.page_size {
                request = request.query(&[("maxResults", size)]);
            }
            if let Some(token) = &result.next_page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: ListResult = Self::json(self.send(request, bucket, "").await?).await?;
            result.extend(page);
            if result.next_page_token.is_none() {
                break;
            }
        }
        tracing::debug!(
            bucket,
            prefix,
            delimiter = options.delimiter,
            items = result.items.len(),
            prefixes = result.prefixes.len(),
            "listed objects"
        );
        Ok(result)
    }

    async fn get_metadata(&self, bucket: &str, key: &str) -> StoreResult<ObjectMetadata> {
        let request = self.request(Method::GET, self.object_url(bucket, key)?);
        Self::json(self.send(request, bucket, key).await?).await
    }

    async fn get_data(&self, bucket: &str, key: &str) -> StoreResult<Bytes> {
        let request = self
            .request(Method::GET, self.object_url(bucket, key)?)
            .query(&[("alt", "media")]);
        let response = self.send(request, bucket, key).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        tracing::debug!(bucket, key, size = body.len(), "fetched object");
        Ok(body)
    }

    async fn write(&self, bucket: &str, key: &str, content: Bytes) -> StoreResult<ObjectMetadata> {
        if bucket.is_empty() {
            return Err(StoreError::Validation("no bucket supplied".into()));
        }
        require_key(key)?;
        let url = Self::url(&self.config.upload_base, &["b", bucket, "o"])?;
        let size = content.len();
        let request = self
            .request(Method::POST, url)
            .query(&[("uploadType", "media"), ("name", key)])
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(content);
        let meta: ObjectMetadata = Self::json(self.send(request, bucket, key).await?).await?;
        tracing::info!(bucket, key, size, generation = meta.generation, "wrote object");
        Ok(meta)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        let request = self.request(Method::DELETE, self.object_url(bucket, key)?);
        self.send(request, bucket, key).await?;
        tracing::info!(bucket, key, "deleted object");
        Ok(())
    }

    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<ObjectMetadata> {
        require_key(src_key)?;
        require_key(dst_key)?;
        let url = Self::url(
            &self.config.api_base,
            &["b", src_bucket, "o", src_key, "rewriteTo", "b", dst_bucket, "o", dst_key],
        )?;
        // Large objects are rewritten in several rounds.
        let mut rewrite_token: Option<String> = None;
        loop {
            let mut request = self.request(Method::POST, url.clone());
            if let Some(token) = &rewrite_token {
                request = request.query(&[("rewriteToken", token.as_str())]);
            }
            let response = match self.send(request, src_bucket, src_key).await {
                Err(err) if err.is_not_found() => {
                    return Err(self.copy_miss(src_bucket, src_key, dst_bucket, err).await)
                }
                other => other?,
            };
            let round: RewriteResponse = Self::json(response).await?;
            if round.done {
                let meta = round.resource.ok_or_else(|| {
                    StoreError::Decode("rewrite finished without a resource".into())
                })?;
                tracing::info!(src_bucket, src_key, dst_bucket, dst_key, "copied object");
                return Ok(meta);
            }
            rewrite_token = Some(round.rewrite_token.ok_or_else(|| {
                StoreError::Decode("unfinished rewrite without a rewrite token".into())
            })?);
        }
    }
}

impl std::fmt::Debug for HttpObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpObjectStore")
            .field("api_base", &self.config.api_base)
            .field("credential", &self.credential())
            .finish()
    }
}
