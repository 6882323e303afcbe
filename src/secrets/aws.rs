//! AWS Secrets Manager backend (`aws` feature).
//!
//! The SDK client is built with a short connect timeout, an operation timeout
//! and a single attempt, so one call never outlives the gateway deadline by
//! much even before the gateway abandons it.
//!
//! Credentials come from the default provider chain (environment, profile,
//! instance metadata).

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::types::{Filter, FilterNameStringType};
use aws_sdk_secretsmanager::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::client::{RemoteSecretEntry, RemoteSecretStore};
use super::error::{RemoteStoreError, Result};
use crate::config::RemoteStoreConfig;

/// Page size for list calls (service maximum)
const LIST_PAGE_SIZE: i32 = 100;

pub struct AwsSecretsManagerStore {
    client: Client,
    region: String,
}

impl std::fmt::Debug for AwsSecretsManagerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretsManagerStore").field("region", &self.region).finish()
    }
}

impl AwsSecretsManagerStore {
    /// Build a client from the remote store configuration
    pub async fn from_config(config: &RemoteStoreConfig) -> Self {
        let timeouts = TimeoutConfig::builder()
            .connect_timeout(config.connect_timeout())
            .operation_timeout(config.operation_timeout())
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .timeout_config(timeouts)
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts));

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        info!(
            region = %config.region,
            connect_timeout_ms = config.connect_timeout_ms,
            operation_timeout_ms = config.operation_timeout_ms,
            max_attempts = config.max_attempts,
            "AWS Secrets Manager client initialized"
        );

        Self { client: Client::new(&sdk_config), region: config.region.clone() }
    }
}

/// Map an SDK error onto the backend-neutral taxonomy
fn classify<E, R>(id: &str, err: SdkError<E, R>) -> RemoteStoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();

    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            RemoteStoreError::unavailable(message)
        }
        _ => match err.code() {
            Some("ResourceExistsException") => RemoteStoreError::already_exists(id),
            Some("ResourceNotFoundException") => RemoteStoreError::not_found(id),
            Some("AccessDeniedException")
            | Some("UnrecognizedClientException")
            | Some("InvalidSignatureException")
            | Some("ExpiredTokenException") => RemoteStoreError::access_denied(message),
            _ => RemoteStoreError::backend(message),
        },
    }
}

fn to_chrono(dt: &aws_sdk_secretsmanager::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

#[async_trait]
impl RemoteSecretStore for AwsSecretsManagerStore {
    fn backend_name(&self) -> &'static str {
        "aws"
    }

    async fn create_secret(&self, id: &str, value: &str, description: &str) -> Result<()> {
        self.client
            .create_secret()
            .name(id)
            .secret_string(value)
            .description(description)
            .send()
            .await
            .map_err(|e| classify(id, e))?;

        debug!(remote_id = %id, region = %self.region, "Created AWS secret");
        Ok(())
    }

    async fn update_secret(&self, id: &str, value: &str, description: &str) -> Result<()> {
        self.client
            .update_secret()
            .secret_id(id)
            .secret_string(value)
            .description(description)
            .send()
            .await
            .map_err(|e| classify(id, e))?;

        debug!(remote_id = %id, region = %self.region, "Updated AWS secret");
        Ok(())
    }

    async fn get_secret(&self, id: &str) -> Result<String> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(id)
            .send()
            .await
            .map_err(|e| classify(id, e))?;

        response
            .secret_string()
            .map(ToString::to_string)
            .or_else(|| {
                response
                    .secret_binary()
                    .map(|blob| String::from_utf8_lossy(blob.as_ref()).to_string())
            })
            .ok_or_else(|| RemoteStoreError::backend(format!("Secret {} has no value", id)))
    }

    async fn delete_secret(&self, id: &str) -> Result<()> {
        self.client
            .delete_secret()
            .secret_id(id)
            .force_delete_without_recovery(true)
            .send()
            .await
            .map_err(|e| classify(id, e))?;

        debug!(remote_id = %id, region = %self.region, "Deleted AWS secret");
        Ok(())
    }

    async fn list_secrets(&self, prefix: Option<&str>) -> Result<Vec<RemoteSecretEntry>> {
        let mut entries = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_secrets()
                .max_results(LIST_PAGE_SIZE)
                .set_next_token(next_token.take());

            if let Some(prefix) = prefix {
                request = request
                    .filters(Filter::builder().key(FilterNameStringType::Name).values(prefix).build());
            }

            let response = request.send().await.map_err(|e| classify("*", e))?;

            for secret in response.secret_list() {
                let Some(name) = secret.name() else { continue };
                // the service filter matches name prefixes loosely; re-check exactly
                if prefix.is_some_and(|p| !name.starts_with(p)) {
                    continue;
                }

                let mut entry = RemoteSecretEntry::new(name);
                if let Some(description) = secret.description() {
                    entry = entry.with_description(description);
                }
                if let Some(created_at) = secret.created_date().and_then(to_chrono) {
                    entry = entry.with_created_at(created_at);
                }
                entries.push(entry);
            }

            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(count = entries.len(), region = %self.region, "Listed AWS secrets");
        Ok(entries)
    }
}
