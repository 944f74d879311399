// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory table with DynamoDB-shaped operations.
//!
//! Items are keyed by their `id` attribute. Requests and responses follow the
//! low-level client shapes: `{Key: {id}}`, `{Item: {...}}`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{anyhow, bail};
use serde_json::{json, Value};

use crate::target::Target;
use crate::types::Params;

/// Operations exposed by [`MemoryTable::into_target`].
pub const OPERATIONS: &[&str] = &["getItem", "putItem", "deleteItem"];

/// Shared in-memory item store.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    items: Arc<RwLock<HashMap<String, Value>>>,
    latency: Duration,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every operation by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `{Key: {id}}` -> `{Item: {...}}`, or `{}` when absent.
    pub async fn get_item(&self, params: Params) -> anyhow::Result<Value> {
        self.simulate_latency().await;
        let id = key_id(&params["Key"])?;
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        Ok(match items.get(&id) {
            Some(item) => json!({"Item": item}),
            None => json!({}),
        })
    }

    /// `{Item: {id, ...}}` -> `{}`. Replaces any existing item.
    pub async fn put_item(&self, params: Params) -> anyhow::Result<Value> {
        self.simulate_latency().await;
        let item = &params["Item"];
        if !item.is_object() {
            bail!("ValidationException: Item must be a map");
        }
        let id = key_id(item)?;
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, item.clone());
        Ok(json!({}))
    }

    /// `{Key: {id}}` -> `{Attributes: {...}}` with the removed item, or `{}`.
    pub async fn delete_item(&self, params: Params) -> anyhow::Result<Value> {
        self.simulate_latency().await;
        let id = key_id(&params["Key"])?;
        let removed = self
            .items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        Ok(match removed {
            Some(item) => json!({"Attributes": item}),
            None => json!({}),
        })
    }

    /// A target exposing `getItem`, `putItem`, and `deleteItem` over this table.
    pub fn into_target(self) -> Target {
        let get = self.clone();
        let put = self.clone();
        let delete = self;

        Target::builder()
            .operation("getItem", move |params: Params| {
                let table = get.clone();
                async move { table.get_item(params).await }
            })
            .operation("putItem", move |params: Params| {
                let table = put.clone();
                async move { table.put_item(params).await }
            })
            .operation("deleteItem", move |params: Params| {
                let table = delete.clone();
                async move { table.delete_item(params).await }
            })
            .build()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

fn key_id(key: &Value) -> anyhow::Result<String> {
    match key.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        Some(other) => Err(anyhow!("ValidationException: unsupported key type: {other}")),
        None => Err(anyhow!(
            "ValidationException: The provided key element does not match the schema"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(value: Value) -> Params {
        Arc::new(value)
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let table = MemoryTable::new();
        table
            .put_item(params(json!({"Item": {"id": "x", "name": "first"}})))
            .await
            .unwrap();
        assert_eq!(table.len(), 1);

        let got = table.get_item(params(json!({"Key": {"id": "x"}}))).await.unwrap();
        assert_eq!(got, json!({"Item": {"id": "x", "name": "first"}}));

        let deleted = table
            .delete_item(params(json!({"Key": {"id": "x"}})))
            .await
            .unwrap();
        assert_eq!(deleted["Attributes"]["name"], "first");
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_item() {
        let table = MemoryTable::new();
        let got = table.get_item(params(json!({"Key": {"id": 7}}))).await.unwrap();
        assert_eq!(got, json!({}));
    }

    #[tokio::test]
    async fn test_invalid_key_fails() {
        let table = MemoryTable::new();
        let err = table.get_item(params(json!({"Key": {}}))).await.unwrap_err();
        assert!(err.to_string().starts_with("ValidationException"));

        let err = table.put_item(params(json!({"Item": "nope"}))).await.unwrap_err();
        assert!(err.to_string().contains("Item must be a map"));
    }

    #[tokio::test]
    async fn test_into_target_shares_items() {
        let table = MemoryTable::new();
        let target = table.clone().into_target();
        assert_eq!(target.operation_names(), vec!["deleteItem", "getItem", "putItem"]);

        target
            .call("putItem", params(json!({"Item": {"id": "x"}})))
            .await
            .unwrap();
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_with_latency() {
        let table = MemoryTable::new().with_latency(Duration::from_millis(2));
        let start = std::time::Instant::now();
        table.get_item(params(json!({"Key": {"id": "x"}}))).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(2));
    }
}
