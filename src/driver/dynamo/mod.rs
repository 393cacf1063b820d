//! DynamoDB driver.
//!
//! One `aws_sdk_dynamodb::Client` serves both the low-level listing surface
//! and the document surface; documents are converted to attribute maps at
//! the boundary.

mod convert;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{ReturnConsumedCapacity, ReturnValue, Select};
use aws_sdk_dynamodb::Client;
use tracing::{debug, info};

use super::{
    DeleteOutput, DocumentDriver, DriverError, GetOutput, Item, ItemPage, Key, LowLevelDriver,
    PutOutput, QueryParams, Result, ScanParams, UpdateOutput, UpdateParams,
};
use crate::config::Config;
use convert::{from_attrs, from_opt_attrs, to_attrs};

/// DynamoDB implementation of both driver traits.
#[derive(Debug, Clone)]
pub struct DynamoDriver {
    client: Client,
}

impl DynamoDriver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the endpoint and region rules of `config`.
    pub async fn connect(config: &Config) -> Self {
        let sdk_config = crate::config::aws::sdk_config(config).await;

        let client = match config.store_endpoint() {
            Some(endpoint) => {
                let dynamo_config = aws_sdk_dynamodb::config::Builder::from(&sdk_config)
                    .endpoint_url(&endpoint)
                    .build();
                info!(endpoint = %endpoint, "Connected to local DynamoDB");
                Client::from_conf(dynamo_config)
            }
            None => {
                info!(region = ?sdk_config.region(), "Connected to DynamoDB");
                Client::new(&sdk_config)
            }
        };

        Self { client }
    }

    /// The underlying SDK client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl LowLevelDriver for DynamoDriver {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut start: Option<String> = None;

        loop {
            let output = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start.take())
                .send()
                .await
                .map_err(DriverError::sdk)?;

            names.extend(output.table_names.unwrap_or_default());

            match output.last_evaluated_table_name {
                Some(last) => start = Some(last),
                None => break,
            }
        }

        debug!(count = names.len(), "Listed DynamoDB tables");
        Ok(names)
    }
}

#[async_trait]
impl DocumentDriver for DynamoDriver {
    async fn get(&self, table: &str, key: Key) -> Result<GetOutput> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(to_attrs(key)))
            .send()
            .await
            .map_err(DriverError::sdk)?;

        Ok(GetOutput {
            item: from_opt_attrs(output.item)?,
        })
    }

    async fn put(&self, table: &str, item: Item) -> Result<PutOutput> {
        let output = self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(to_attrs(item)))
            .send()
            .await
            .map_err(DriverError::sdk)?;

        Ok(PutOutput {
            attributes: from_opt_attrs(output.attributes)?,
        })
    }

    async fn update(&self, table: &str, params: UpdateParams) -> Result<UpdateOutput> {
        let output = self
            .client
            .update_item()
            .table_name(table)
            .set_key(Some(to_attrs(params.key)))
            .set_update_expression(params.update_expression)
            .set_condition_expression(params.condition_expression)
            .set_expression_attribute_names(params.expression_attribute_names)
            .set_expression_attribute_values(params.expression_attribute_values.map(to_attrs))
            .set_return_values(params.return_values.as_deref().map(ReturnValue::from))
            .set_return_consumed_capacity(
                params
                    .return_consumed_capacity
                    .as_deref()
                    .map(ReturnConsumedCapacity::from),
            )
            .send()
            .await
            .map_err(DriverError::sdk)?;

        Ok(UpdateOutput {
            attributes: from_opt_attrs(output.attributes)?,
        })
    }

    async fn delete(&self, table: &str, key: Key) -> Result<DeleteOutput> {
        let output = self
            .client
            .delete_item()
            .table_name(table)
            .set_key(Some(to_attrs(key)))
            .send()
            .await
            .map_err(DriverError::sdk)?;

        Ok(DeleteOutput {
            attributes: from_opt_attrs(output.attributes)?,
        })
    }

    async fn query(&self, table: &str, params: QueryParams) -> Result<ItemPage> {
        let output = self
            .client
            .query()
            .table_name(table)
            .set_index_name(params.index_name)
            .set_key_condition_expression(params.key_condition_expression)
            .set_filter_expression(params.filter_expression)
            .set_projection_expression(params.projection_expression)
            .set_expression_attribute_names(params.expression_attribute_names)
            .set_expression_attribute_values(params.expression_attribute_values.map(to_attrs))
            .set_exclusive_start_key(params.exclusive_start_key.map(to_attrs))
            .set_limit(params.limit)
            .set_scan_index_forward(params.scan_index_forward)
            .set_consistent_read(params.consistent_read)
            .set_select(params.select.as_deref().map(Select::from))
            .set_return_consumed_capacity(
                params
                    .return_consumed_capacity
                    .as_deref()
                    .map(ReturnConsumedCapacity::from),
            )
            .send()
            .await
            .map_err(DriverError::sdk)?;

        Ok(ItemPage {
            items: output
                .items
                .unwrap_or_default()
                .into_iter()
                .map(from_attrs)
                .collect::<Result<Vec<_>>>()?,
            count: output.count,
            scanned_count: output.scanned_count,
            last_evaluated_key: from_opt_attrs(output.last_evaluated_key)?,
        })
    }

    async fn scan(&self, table: &str, params: ScanParams) -> Result<ItemPage> {
        let output = self
            .client
            .scan()
            .table_name(table)
            .set_index_name(params.index_name)
            .set_filter_expression(params.filter_expression)
            .set_projection_expression(params.projection_expression)
            .set_expression_attribute_names(params.expression_attribute_names)
            .set_expression_attribute_values(params.expression_attribute_values.map(to_attrs))
            .set_exclusive_start_key(params.exclusive_start_key.map(to_attrs))
            .set_limit(params.limit)
            .set_consistent_read(params.consistent_read)
            .set_segment(params.segment)
            .set_total_segments(params.total_segments)
            .set_select(params.select.as_deref().map(Select::from))
            .set_return_consumed_capacity(
                params
                    .return_consumed_capacity
                    .as_deref()
                    .map(ReturnConsumedCapacity::from),
            )
            .send()
            .await
            .map_err(DriverError::sdk)?;

        Ok(ItemPage {
            items: output
                .items
                .unwrap_or_default()
                .into_iter()
                .map(from_attrs)
                .collect::<Result<Vec<_>>>()?,
            count: output.count,
            scanned_count: output.scanned_count,
            last_evaluated_key: from_opt_attrs(output.last_evaluated_key)?,
        })
    }
}
