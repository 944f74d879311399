// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Method tables for instrumentation targets.
//!
//! A [`Target`] maps operation names (`getItem`, `putItem`, ...) to
//! [`Operation`] implementations, and holds the instrumented methods
//! installed alongside them (`instrumentedGetItem`, ...).

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::InstrumentError;
use crate::instrument::InstrumentedMethod;
use crate::types::{CallContext, CallOutcome, Params};

/// One asynchronous operation of a target.
///
/// Completes exactly once with either the response data or an error.
///
/// # Example
///
/// ```rust,ignore
/// use dynamo_instrument::target::Operation;
///
/// struct GetItem;
///
/// #[async_trait]
/// impl Operation for GetItem {
///     async fn call(&self, params: Params) -> anyhow::Result<Value> {
///         Ok(json!({"Item": {"id": params["Key"]["id"]}}))
///     }
/// }
/// ```
#[async_trait]
pub trait Operation: Send + Sync {
    async fn call(&self, params: Params) -> anyhow::Result<Value>;
}

#[async_trait]
impl<F, Fut> Operation for F
where
    F: Fn(Params) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn call(&self, params: Params) -> anyhow::Result<Value> {
        (self)(params).await
    }
}

/// Name of the instrumented method installed for `method`.
///
/// `getItem` becomes `instrumentedGetItem`.
pub fn instrumented_name(method: &str) -> String {
    let mut chars = method.chars();
    match chars.next() {
        Some(first) => format!("instrumented{}{}", first.to_uppercase(), chars.as_str()),
        None => "instrumented".to_string(),
    }
}

/// Operations of a client plus the instrumented methods installed on it.
#[derive(Clone, Default)]
pub struct Target {
    operations: HashMap<String, Arc<dyn Operation>>,
    instrumented: HashMap<String, Arc<InstrumentedMethod>>,
}

impl Target {
    /// Create a target with no operations.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> TargetBuilder {
        TargetBuilder::new()
    }

    /// Get an operation by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.operations.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Names of all plain operations, sorted.
    pub fn operation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Call an operation directly, without instrumentation.
    pub async fn call(&self, name: &str, params: Params) -> anyhow::Result<Value> {
        let operation = self
            .get(name)
            .ok_or_else(|| InstrumentError::MethodNotFound(name.to_string()))?;
        operation.call(params).await
    }

    /// Install an instrumented method, replacing any previous one of the same name.
    pub fn install(&mut self, name: impl Into<String>, method: InstrumentedMethod) -> &mut Self {
        self.instrumented.insert(name.into(), Arc::new(method));
        self
    }

    /// Get an installed instrumented method, e.g. `instrumentedGetItem`.
    pub fn instrumented(&self, name: &str) -> Option<Arc<InstrumentedMethod>> {
        self.instrumented.get(name).cloned()
    }

    /// Names of all installed instrumented methods, sorted.
    pub fn instrumented_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.instrumented.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Call an installed instrumented method by name.
    pub async fn call_instrumented(
        &self,
        name: &str,
        params: Params,
        context: CallContext,
    ) -> Result<CallOutcome, InstrumentError> {
        let method = self
            .instrumented(name)
            .ok_or_else(|| InstrumentError::MethodNotFound(name.to_string()))?;
        method.call(params, context).await
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("operations", &self.operation_names())
            .field("instrumented", &self.instrumented_names())
            .finish()
    }
}

/// Builder for constructing a [`Target`].
#[derive(Default)]
pub struct TargetBuilder {
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl TargetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation under `name`.
    pub fn operation<O: Operation + 'static>(mut self, name: impl Into<String>, operation: O) -> Self {
        self.operations.insert(name.into(), Arc::new(operation));
        self
    }

    /// Register an already shared operation.
    pub fn operation_arc(mut self, name: impl Into<String>, operation: Arc<dyn Operation>) -> Self {
        self.operations.insert(name.into(), operation);
        self
    }

    pub fn build(self) -> Target {
        Target {
            operations: self.operations,
            instrumented: HashMap::new(),
        }
    }
}
