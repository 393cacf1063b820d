//! Request and response shapes for document operations.
//!
//! Field names serialize in the store's PascalCase so parameter objects
//! written as JSON (`{"KeyConditionExpression": ...}`) deserialize directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored document.
pub type Item = Map<String, Value>;

/// The key attributes identifying one document.
pub type Key = Map<String, Value>;

/// Parameters for a key-condition query.
///
/// Unknown keys are rejected rather than dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default, deny_unknown_fields)]
pub struct QueryParams {
    pub index_name: Option<String>,
    pub key_condition_expression: Option<String>,
    pub filter_expression: Option<String>,
    pub projection_expression: Option<String>,
    pub expression_attribute_names: Option<HashMap<String, String>>,
    pub expression_attribute_values: Option<Item>,
    pub exclusive_start_key: Option<Key>,
    pub limit: Option<i32>,
    pub scan_index_forward: Option<bool>,
    pub consistent_read: Option<bool>,
    /// One of `ALL_ATTRIBUTES`, `ALL_PROJECTED_ATTRIBUTES`, `SPECIFIC_ATTRIBUTES`, `COUNT`.
    pub select: Option<String>,
    pub return_consumed_capacity: Option<String>,
}

/// Parameters for a full-table scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default, deny_unknown_fields)]
pub struct ScanParams {
    pub index_name: Option<String>,
    pub filter_expression: Option<String>,
    pub projection_expression: Option<String>,
    pub expression_attribute_names: Option<HashMap<String, String>>,
    pub expression_attribute_values: Option<Item>,
    pub exclusive_start_key: Option<Key>,
    pub limit: Option<i32>,
    pub consistent_read: Option<bool>,
    pub segment: Option<i32>,
    pub total_segments: Option<i32>,
    pub select: Option<String>,
    pub return_consumed_capacity: Option<String>,
}

/// Parameters for an in-place update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default, deny_unknown_fields)]
pub struct UpdateParams {
    pub key: Key,
    pub update_expression: Option<String>,
    pub condition_expression: Option<String>,
    pub expression_attribute_names: Option<HashMap<String, String>>,
    pub expression_attribute_values: Option<Item>,
    /// One of `NONE`, `ALL_OLD`, `UPDATED_OLD`, `ALL_NEW`, `UPDATED_NEW`.
    pub return_values: Option<String>,
    pub return_consumed_capacity: Option<String>,
}

/// Envelope returned by a point read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GetOutput {
    pub item: Option<Item>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PutOutput {
    pub attributes: Option<Item>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UpdateOutput {
    pub attributes: Option<Item>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeleteOutput {
    pub attributes: Option<Item>,
}

/// One page of a query or scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub count: i32,
    pub scanned_count: i32,
    pub last_evaluated_key: Option<Key>,
}
