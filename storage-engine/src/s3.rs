use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime as S3DateTime, DateTimeFormat};
use chrono::{DateTime, Utc};
use shared::{Error, Result};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;
use ttl_store::domain::request::{GetObjectRequest, ListObjectsRequest, PutObjectRequest};
use ttl_store::domain::response::{GetObjectOutcome, ListPage, ObjectEntry, StoredObject};
use ttl_store::{AdapterOptions, BackendFactory, ObjectBackend, ObjectMeta};

const NOT_MODIFIED: u16 = 304;
const NOT_FOUND: u16 = 404;

/// S3 (or S3-compatible) backend over the AWS SDK client.
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
}

impl S3Backend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

pub(crate) fn to_s3_time(instant: DateTime<Utc>) -> S3DateTime {
    S3DateTime::from_millis(instant.timestamp_millis())
}

pub(crate) fn from_s3_time(instant: &S3DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(instant.secs(), instant.subsec_nanos())
}

/// `Expires` comes back as an HTTP-date string.
pub(crate) fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
    S3DateTime::from_str(raw, DateTimeFormat::HttpDate)
        .ok()
        .and_then(|instant| from_s3_time(&instant))
}

fn status_of<E>(err: &SdkError<E, HttpResponse>) -> Option<u16> {
    err.raw_response().map(|response| response.status().as_u16())
}

fn backend_error<E, R>(operation: &str, err: SdkError<E, R>) -> Error
where
    E: std::error::Error + 'static,
    R: Debug,
{
    Error::Backend(format!("{operation}: {}", DisplayErrorContext(err)))
}

#[async_trait]
impl ObjectBackend for S3Backend {
    async fn get_object(&self, request: GetObjectRequest) -> Result<GetObjectOutcome> {
        debug!(
            "S3 get_object {}/{} (if_modified_since: {:?})",
            request.bucket, request.name, request.if_modified_since
        );
        let result = self
            .client
            .get_object()
            .bucket(&request.bucket)
            .key(&request.name)
            .set_if_modified_since(request.if_modified_since.map(to_s3_time))
            .send()
            .await;

        match result {
            Ok(output) => {
                let meta = ObjectMeta {
                    last_modified: output.last_modified().and_then(from_s3_time),
                    expires: output.expires_string().and_then(parse_http_date),
                };
                let body = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| Error::Backend(format!("get_object body: {e}")))?
                    .into_bytes();
                Ok(GetObjectOutcome::Found(StoredObject { body, meta }))
            }
            Err(err) => match status_of(&err) {
                Some(NOT_MODIFIED) => Ok(GetObjectOutcome::NotModified),
                Some(NOT_FOUND) => Ok(GetObjectOutcome::Missing),
                _ if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                    Ok(GetObjectOutcome::Missing)
                }
                _ => Err(backend_error("get_object", err)),
            },
        }
    }

    async fn head_object(&self, bucket: &str, name: &str) -> Result<Option<ObjectMeta>> {
        debug!("S3 head_object {}/{}", bucket, name);
        match self.client.head_object().bucket(bucket).key(name).send().await {
            Ok(output) => Ok(Some(ObjectMeta {
                last_modified: output.last_modified().and_then(from_s3_time),
                expires: output.expires_string().and_then(parse_http_date),
            })),
            Err(err) => {
                let missing = status_of(&err) == Some(NOT_FOUND)
                    || err.as_service_error().is_some_and(|e| e.is_not_found());
                if missing {
                    Ok(None)
                } else {
                    Err(backend_error("head_object", err))
                }
            }
        }
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<()> {
        debug!(
            "S3 put_object {}/{} ({} bytes, expires: {:?})",
            request.bucket,
            request.name,
            request.body.len(),
            request.expires
        );
        self.client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.name)
            .body(ByteStream::from(request.body))
            .set_expires(request.expires.map(to_s3_time))
            .send()
            .await
            .map_err(|err| backend_error("put_object", err))?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, name: &str) -> Result<()> {
        debug!("S3 delete_object {}/{}", bucket, name);
        // S3 answers 204 for missing keys too
        self.client
            .delete_object()
            .bucket(bucket)
            .key(name)
            .send()
            .await
            .map_err(|err| backend_error("delete_object", err))?;
        Ok(())
    }

    async fn list_objects(&self, request: ListObjectsRequest) -> Result<ListPage> {
        debug!(
            "S3 list_objects_v2 {} (prefix: {:?}, continued: {})",
            request.bucket,
            request.prefix,
            request.continuation_token.is_some()
        );
        let output = self
            .client
            .list_objects_v2()
            .bucket(&request.bucket)
            .set_prefix(request.prefix)
            .set_continuation_token(request.continuation_token)
            .send()
            .await
            .map_err(|err| backend_error("list_objects_v2", err))?;

        let entries = output
            .contents()
            .iter()
            .filter_map(|object| {
                object.key().map(|name| ObjectEntry {
                    name: name.to_string(),
                    last_modified: object.last_modified().and_then(from_s3_time),
                })
            })
            .collect();

        let next_continuation_token = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListPage {
            entries,
            next_continuation_token,
        })
    }
}

impl Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("client", &"<aws_sdk_s3::Client>")
            .finish()
    }
}

/// Builds an [`S3Backend`] from adapter options. Region and credentials fall
/// back to the standard AWS environment/profile chain when not given.
#[derive(Clone, Copy, Debug, Default)]
pub struct S3BackendFactory;

#[async_trait]
impl BackendFactory for S3BackendFactory {
    async fn connect(&self, options: &AdapterOptions) -> Result<Arc<dyn ObjectBackend>> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &options.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &options.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        if let Some(credentials) = &options.credentials {
            loader = loader.credentials_provider(Credentials::new(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                credentials.session_token.clone(),
                None,
                "ttl-store",
            ));
        }
        let shared_config = loader.load().await;

        // S3-compatible stores behind a custom endpoint rarely do virtual-host buckets
        let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
            .force_path_style(options.endpoint_url.is_some())
            .build();

        debug!(
            "S3 client ready (region: {:?}, endpoint: {:?})",
            shared_config.region(),
            options.endpoint_url
        );
        Ok(Arc::new(S3Backend::new(Client::from_conf(s3_config))))
    }
}
