use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_sqs::types::MessageAttributeValue;
use aws_sdk_sqs::{config::Region, Client};
use tracing::{debug, info};

use crate::config::QueueConfig;
use crate::queue::error::QueueError;
use crate::queue::message::{JobMessage, JOB_TYPE_CROP};
use crate::queue::queue::{JobQueue, QueueReceipt};

/// SQS implementation of the JobQueue trait.
///
/// Targets a FIFO queue: every send carries a message group id and the
/// message's deterministic deduplication key, so the queue itself enforces
/// at-most-one job per submission intent.
#[derive(Clone)]
pub struct SqsJobQueue {
    client: Client,
    queue_url: String,
    message_group: String,
}

impl SqsJobQueue {
    /// Create a new SqsJobQueue from configuration.
    pub async fn new(config: &QueueConfig) -> Result<Self, QueueError> {
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

        let mut client_builder = aws_sdk_sqs::config::Builder::from(&aws_config);
        if let Some(endpoint) = &config.endpoint {
            client_builder = client_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(client_builder.build());
        info!("Connected to job queue in region {}", config.region);

        Ok(Self {
            client,
            queue_url: config.queue_url.clone(),
            message_group: config.message_group.clone(),
        })
    }
}

#[async_trait]
impl JobQueue for SqsJobQueue {
    async fn send_job(&self, message: &JobMessage) -> Result<QueueReceipt, QueueError> {
        let body = serde_json::to_string(message)
            .map_err(|e| QueueError::SerializationError(e.to_string()))?;

        let action_attribute = MessageAttributeValue::builder()
            .data_type("String")
            .string_value(JOB_TYPE_CROP)
            .build()
            .map_err(|e| QueueError::ConfigurationError(e.to_string()))?;

        debug!(
            "Sending {} job for project {} (dedup key {})",
            message.job_type,
            message.project_id,
            message.dedup_key()
        );

        let response = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .message_group_id(&self.message_group)
            .message_deduplication_id(message.dedup_key())
            .message_attributes("Action", action_attribute)
            .send()
            .await
            .map_err(|err| QueueError::Unavailable(err.to_string()))?;

        Ok(QueueReceipt {
            message_id: response.message_id().unwrap_or_default().to_string(),
        })
    }
}
