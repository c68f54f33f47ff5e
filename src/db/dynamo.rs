use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::{config::Region, Client};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::db::backend::ProjectBackend;
use crate::db::error::StoreError;
use crate::db::models::{id_to_sort_key, Project};

/// DynamoDB implementation of the ProjectBackend trait.
///
/// Records live in a single table keyed by `pk = owner_id` and
/// `sk = project#<id>`. The full project document is stored as JSON in the
/// `doc` attribute; `version` and `last_modified_at` are lifted into their
/// own attributes so conditional writes and scans do not need to parse the
/// document.
#[derive(Clone)]
pub struct DynamoProjectBackend {
    client: Client,
    table: String,
}

impl DynamoProjectBackend {
    /// Create a new DynamoProjectBackend from configuration.
    pub async fn new(config: &StoreConfig) -> Result<Self, StoreError> {
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
            "Connected to project table {} in region {}",
            config.table, config.region
        );

        Ok(Self {
            client,
            table: config.table.clone(),
        })
    }

    fn item_for(project: &Project) -> Result<Vec<(String, AttributeValue)>, StoreError> {
        let doc = serde_json::to_string(project)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        Ok(vec![
            ("pk".into(), AttributeValue::S(project.owner_id.clone())),
            ("sk".into(), AttributeValue::S(id_to_sort_key(&project.id))),
            (
                "version".into(),
                AttributeValue::N(project.version.to_string()),
            ),
            (
                "last_modified_at".into(),
                AttributeValue::N(project.last_modified_at.timestamp().to_string()),
            ),
            ("doc".into(), AttributeValue::S(doc)),
        ])
    }

    fn project_from_item(
        item: &std::collections::HashMap<String, AttributeValue>,
    ) -> Result<Project, StoreError> {
        let doc = item
            .get("doc")
            .and_then(|attr| attr.as_s().ok())
            .ok_or_else(|| {
                StoreError::SerializationError("item is missing the doc attribute".into())
            })?;
        serde_json::from_str(doc).map_err(|e| StoreError::SerializationError(e.to_string()))
    }
}

#[async_trait]
impl ProjectBackend for DynamoProjectBackend {
    async fn insert(&self, project: &Project) -> Result<(), StoreError> {
        let mut request = self
            .client
            .put_item()
            .table_name(&self.table)
            .condition_expression("attribute_not_exists(pk) AND attribute_not_exists(sk)");
        for (name, value) in Self::item_for(project)? {
            request = request.item(name, value);
        }

        request.send().await.map_err(|err| {
            if err
                .as_service_error()
                .map(|e| e.is_conditional_check_failed_exception())
                .unwrap_or(false)
            {
                StoreError::AlreadyExists(project.id.clone())
            } else {
                StoreError::QueryError(err.to_string())
            }
        })?;
        Ok(())
    }

    async fn get(&self, owner_id: &str, id: &str) -> Result<Option<Project>, StoreError> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("pk", AttributeValue::S(owner_id.to_string()))
            .key("sk", AttributeValue::S(id_to_sort_key(id)))
            .send()
            .await
            .map_err(|err| StoreError::QueryError(err.to_string()))?;

        match response.item() {
            Some(item) => Ok(Some(Self::project_from_item(item)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Project>, StoreError> {
        debug!("Listing projects for owner {owner_id}");
        let response = self
            .client
            .query()
            .table_name(&self.table)
            .key_condition_expression("pk = :pk AND begins_with(sk, :prefix)")
            .expression_attribute_values(":pk", AttributeValue::S(owner_id.to_string()))
            .expression_attribute_values(":prefix", AttributeValue::S("project#".into()))
            .send()
            .await
            .map_err(|err| StoreError::QueryError(err.to_string()))?;

        response
            .items()
            .iter()
            .map(Self::project_from_item)
            .collect()
    }

    async fn update(&self, project: &Project, expected_version: u64) -> Result<(), StoreError> {
        let mut request = self
            .client
            .put_item()
            .table_name(&self.table)
            .condition_expression("version = :expected")
            .expression_attribute_values(
                ":expected",
                AttributeValue::N(expected_version.to_string()),
            );
        for (name, value) in Self::item_for(project)? {
            request = request.item(name, value);
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_conditional_check_failed_exception())
                    .unwrap_or(false) =>
            {
                // The condition also fails when the record is gone entirely,
                // so disambiguate with a follow-up read.
                match self.get(&project.owner_id, &project.id).await? {
                    Some(_) => Err(StoreError::Conflict(project.id.clone())),
                    None => Err(StoreError::NotFound(project.id.clone())),
                }
            }
            Err(err) => Err(StoreError::QueryError(err.to_string())),
        }
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table)
            .key("pk", AttributeValue::S(owner_id.to_string()))
            .key("sk", AttributeValue::S(id_to_sort_key(id)))
            .send()
            .await
            .map_err(|err| StoreError::QueryError(err.to_string()))?;
        Ok(())
    }
}
