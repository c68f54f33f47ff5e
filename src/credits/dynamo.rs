use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::{config::Region, Client};
use tracing::info;

use crate::config::CreditsConfig;
use crate::credits::error::CreditError;
use crate::credits::ledger::CreditLedger;

/// DynamoDB implementation of the CreditLedger trait. Reads the `credits`
/// attribute from the user record, keyed by user id.
#[derive(Clone)]
pub struct DynamoCreditLedger {
    client: Client,
    table: String,
}

impl DynamoCreditLedger {
    /// Create a new DynamoCreditLedger from configuration.
    pub async fn new(config: &CreditsConfig) -> Result<Self, CreditError> {
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

        let mut client_builder = aws_sdk_dynamodb::config::Builder::from(&aws_config);
        if let Some(endpoint) = &config.endpoint {
            client_builder = client_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(client_builder.build());
        info!(
            "Connected to user table {} in region {}",
            config.table, config.region
        );

        Ok(Self {
            client,
            table: config.table.clone(),
        })
    }
}

#[async_trait]
impl CreditLedger for DynamoCreditLedger {
    async fn remaining(&self, user_id: &str) -> Result<u32, CreditError> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("pk", AttributeValue::S(user_id.to_string()))
            .send()
            .await
            .map_err(|err| CreditError::QueryError(err.to_string()))?;

        let item = response
            .item()
            .ok_or_else(|| CreditError::UserNotFound(user_id.to_string()))?;

        // A user record without the attribute has never been granted
        // credits.
        match item.get("credits") {
            None => Ok(0),
            Some(attr) => attr
                .as_n()
                .ok()
                .and_then(|n| n.parse::<u32>().ok())
                .ok_or_else(|| {
                    CreditError::QueryError(format!(
                        "malformed credits attribute for user {user_id}"
                    ))
                }),
        }
    }
}
