use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::{config::Region, Client};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::s3::error::StorageError;
use crate::s3::storage::ObjectStorage;

/// Real S3 implementation of the ObjectStorage trait. The existence probe is
/// a HEAD request with a bounded timeout.
#[derive(Clone)]
pub struct S3ObjectStorage {
    client: Client,
    probe_timeout: Duration,
}

impl S3ObjectStorage {
    /// Create a new S3ObjectStorage instance from configuration.
    pub async fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let config_loader = aws_config::from_env().region(Region::new(config.region.clone()));

        let aws_config = if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "StaticCredentialsProvider",
            );
            config_loader.credentials_provider(credentials).load().await
        } else {
            config_loader.load().await
        };

        let mut client_builder = aws_sdk_s3::config::Builder::from(&aws_config);
        if let Some(endpoint) = &config.endpoint {
            client_builder = client_builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Client::from_conf(client_builder.build());
        info!("Connected to S3 in region {}", config.region);

        Ok(Self {
            client,
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
        })
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        debug!("Probing for object s3://{bucket}/{key}");

        let request = self.client.head_object().bucket(bucket).key(key).send();

        match timeout(self.probe_timeout, request).await {
            Err(_) => Err(StorageError::ProbeTimeout(format!("{bucket}/{key}"))),
            Ok(Ok(_)) => Ok(true),
            Ok(Err(err)) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                {
                    Ok(false)
                } else {
                    Err(StorageError::NetworkError(err.to_string()))
                }
            }
        }
    }

    #[cfg(test)]
    async fn add_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| StorageError::NetworkError(err.to_string()))?;
        Ok(())
    }

    #[cfg(test)]
    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| StorageError::NetworkError(err.to_string()))?;
        Ok(())
    }
}
