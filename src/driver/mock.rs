//! In-memory store for testing.
//!
//! Tables must be created with their key attribute names before use.
//! Expressions are understood only in their simplest form: equality key
//! conditions joined by `AND`, and `SET`/`REMOVE` update clauses.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{
    DeleteOutput, DocumentDriver, DriverError, GetOutput, Item, ItemPage, Key, LowLevelDriver,
    PutOutput, QueryParams, Result, ScanParams, UpdateOutput, UpdateParams,
};

struct MemTable {
    key_attrs: Vec<String>,
    items: Vec<Item>,
}

impl MemTable {
    fn key_of(&self, item: &Item) -> Result<Vec<Value>> {
        self.key_attrs
            .iter()
            .map(|attr| {
                item.get(attr)
                    .cloned()
                    .ok_or_else(|| {
                        DriverError::Validation(format!("missing key attribute '{}'", attr))
                    })
            })
            .collect()
    }

    fn position(&self, key: &Key) -> Result<Option<usize>> {
        let wanted = self.key_of(key)?;
        for (i, item) in self.items.iter().enumerate() {
            if self.key_of(item)? == wanted {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }
}

/// Mock store implementing both driver traits over in-memory tables.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, MemTable>>,
    failing: RwLock<HashSet<&'static str>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) an empty table keyed by `key_attrs`.
    pub async fn create_table(&self, name: impl Into<String>, key_attrs: &[&str]) {
        self.tables.write().await.insert(
            name.into(),
            MemTable {
                key_attrs: key_attrs.iter().map(|s| s.to_string()).collect(),
                items: Vec::new(),
            },
        );
    }

    pub async fn drop_table(&self, name: &str) {
        self.tables.write().await.remove(name);
    }

    /// Make every call of `operation` (`list_tables`, `get`, `put`, ...) fail.
    pub async fn set_fail_on(&self, operation: &'static str, fail: bool) {
        let mut failing = self.failing.write().await;
        if fail {
            failing.insert(operation);
        } else {
            failing.remove(operation);
        }
    }

    async fn check(&self, operation: &'static str) -> Result<()> {
        if self.failing.read().await.contains(operation) {
            return Err(DriverError::sdk(std::io::Error::other(format!(
                "simulated {} failure",
                operation
            ))));
        }
        Ok(())
    }
}

fn missing(table: &str) -> DriverError {
    DriverError::TableNotFound(table.to_string())
}

fn resolve_name(name: &str, names: Option<&HashMap<String, String>>) -> Result<String> {
    if name.starts_with('#') {
        names
            .and_then(|n| n.get(name))
            .cloned()
            .ok_or_else(|| DriverError::Validation(format!("unbound attribute name '{}'", name)))
    } else {
        Ok(name.to_string())
    }
}

fn resolve_value(placeholder: &str, values: Option<&Item>) -> Result<Value> {
    values
        .and_then(|v| v.get(placeholder))
        .cloned()
        .ok_or_else(|| {
            DriverError::Validation(format!("unbound attribute value '{}'", placeholder))
        })
}

/// Parse `a = :x AND #b = :y` into attribute/value pairs.
fn equality_conditions(
    expression: &str,
    names: Option<&HashMap<String, String>>,
    values: Option<&Item>,
) -> Result<Vec<(String, Value)>> {
    expression
        .split(" AND ")
        .map(|clause| {
            let (lhs, rhs) = clause
                .split_once('=')
                .ok_or_else(|| DriverError::Unsupported(format!("condition '{}'", clause.trim())))?;
            Ok((
                resolve_name(lhs.trim(), names)?,
                resolve_value(rhs.trim(), values)?,
            ))
        })
        .collect()
}

fn matches_all(item: &Item, conditions: &[(String, Value)]) -> bool {
    conditions
        .iter()
        .all(|(attr, value)| item.get(attr) == Some(value))
}

fn apply_update(item: &mut Item, params: &UpdateParams) -> Result<()> {
    let Some(expression) = params.update_expression.as_deref() else {
        return Ok(());
    };
    let names = params.expression_attribute_names.as_ref();
    let values = params.expression_attribute_values.as_ref();
    let expression = expression.trim();

    if let Some(rest) = expression.strip_prefix("SET ") {
        for assignment in rest.split(',') {
            let (lhs, rhs) = assignment.split_once('=').ok_or_else(|| {
                DriverError::Unsupported(format!("assignment '{}'", assignment.trim()))
            })?;
            item.insert(resolve_name(lhs.trim(), names)?, resolve_value(rhs.trim(), values)?);
        }
        Ok(())
    } else if let Some(rest) = expression.strip_prefix("REMOVE ") {
        for attr in rest.split(',') {
            item.remove(&resolve_name(attr.trim(), names)?);
        }
        Ok(())
    } else {
        Err(DriverError::Unsupported(format!("update expression '{}'", expression)))
    }
}

/// `Select: COUNT` keeps the counts and drops the items.
fn page(items: Vec<Item>, scanned: usize, limit: Option<i32>, select: Option<&str>) -> ItemPage {
    let limit = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
    let mut items: Vec<Item> = items.into_iter().take(limit).collect();
    let count = items.len() as i32;
    if select == Some("COUNT") {
        items.clear();
    }
    ItemPage {
        count,
        scanned_count: scanned as i32,
        items,
        last_evaluated_key: None,
    }
}

#[async_trait]
impl LowLevelDriver for MemoryStore {
    async fn list_tables(&self) -> Result<Vec<String>> {
        self.check("list_tables").await?;
        let mut names: Vec<String> = self.tables.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl DocumentDriver for MemoryStore {
    async fn get(&self, table: &str, key: Key) -> Result<GetOutput> {
        self.check("get").await?;
        let tables = self.tables.read().await;
        let t = tables.get(table).ok_or_else(|| missing(table))?;
        Ok(GetOutput {
            item: t.position(&key)?.map(|i| t.items[i].clone()),
        })
    }

    async fn put(&self, table: &str, item: Item) -> Result<PutOutput> {
        self.check("put").await?;
        let mut tables = self.tables.write().await;
        let t = tables.get_mut(table).ok_or_else(|| missing(table))?;
        match t.position(&item)? {
            Some(i) => t.items[i] = item,
            None => t.items.push(item),
        }
        Ok(PutOutput::default())
    }

    async fn update(&self, table: &str, params: UpdateParams) -> Result<UpdateOutput> {
        self.check("update").await?;
        let mut tables = self.tables.write().await;
        let t = tables.get_mut(table).ok_or_else(|| missing(table))?;

        // Applied to a copy; the table only changes once the whole expression succeeds.
        let index = t.position(&params.key)?;
        let old = index.map(|i| t.items[i].clone());
        let mut updated = old.clone().unwrap_or_else(|| params.key.clone());
        apply_update(&mut updated, &params)?;

        let attributes = match params.return_values.as_deref() {
            Some("ALL_NEW") => Some(updated.clone()),
            Some("ALL_OLD") => old,
            _ => None,
        };
        match index {
            Some(i) => t.items[i] = updated,
            None => t.items.push(updated),
        }
        Ok(UpdateOutput { attributes })
    }

    async fn delete(&self, table: &str, key: Key) -> Result<DeleteOutput> {
        self.check("delete").await?;
        let mut tables = self.tables.write().await;
        let t = tables.get_mut(table).ok_or_else(|| missing(table))?;
        if let Some(i) = t.position(&key)? {
            t.items.remove(i);
        }
        Ok(DeleteOutput::default())
    }

    async fn query(&self, table: &str, params: QueryParams) -> Result<ItemPage> {
        self.check("query").await?;
        let tables = self.tables.read().await;
        let t = tables.get(table).ok_or_else(|| missing(table))?;

        let expression = params.key_condition_expression.as_deref().ok_or_else(|| {
            DriverError::Validation("query requires a key condition expression".to_string())
        })?;
        let conditions = equality_conditions(
            expression,
            params.expression_attribute_names.as_ref(),
            params.expression_attribute_values.as_ref(),
        )?;

        let found: Vec<Item> = t
            .items
            .iter()
            .filter(|item| matches_all(item, &conditions))
            .cloned()
            .collect();
        let scanned = found.len();
        Ok(page(found, scanned, params.limit, params.select.as_deref()))
    }

    async fn scan(&self, table: &str, params: ScanParams) -> Result<ItemPage> {
        self.check("scan").await?;
        let tables = self.tables.read().await;
        let t = tables.get(table).ok_or_else(|| missing(table))?;

        let conditions = match params.filter_expression.as_deref() {
            Some(expression) => equality_conditions(
                expression,
                params.expression_attribute_names.as_ref(),
                params.expression_attribute_values.as_ref(),
            )?,
            None => Vec::new(),
        };

        let found: Vec<Item> = t
            .items
            .iter()
            .filter(|item| matches_all(item, &conditions))
            .cloned()
            .collect();
        Ok(page(found, t.items.len(), params.limit, params.select.as_deref()))
    }
}
