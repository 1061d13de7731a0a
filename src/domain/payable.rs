//! Polymorphic transaction owners.
//!
//! A transaction points at its owner through a `(payable_type, payable_id)`
//! pair. Turning that pair into a record goes through a registry keyed by
//! type, one resolver per owner table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::validation::validate_payable_type;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayableRef {
    pub payable_type: String,
    pub payable_id: i64,
}

impl PayableRef {
    pub fn new(payable_type: impl Into<String>, payable_id: i64) -> Self {
        Self {
            payable_type: payable_type.into(),
            payable_id,
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        validate_payable_type(&self.payable_type)?;
        Ok(())
    }
}

/// A resolved owner with whatever attributes its table exposes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payable {
    pub reference: PayableRef,
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
pub trait PayableResolver: Send + Sync {
    async fn resolve(&self, reference: &PayableRef) -> LedgerResult<Payable>;
}

#[derive(Clone, Default)]
pub struct PayableRegistry {
    resolvers: HashMap<String, Arc<dyn PayableResolver>>,
}

impl PayableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        payable_type: impl Into<String>,
        resolver: Arc<dyn PayableResolver>,
    ) -> Self {
        self.resolvers.insert(payable_type.into(), resolver);
        self
    }

    pub fn is_registered(&self, payable_type: &str) -> bool {
        self.resolvers.contains_key(payable_type)
    }

    pub async fn resolve(&self, reference: &PayableRef) -> LedgerResult<Payable> {
        let resolver = self
            .resolvers
            .get(&reference.payable_type)
            .ok_or_else(|| LedgerError::UnknownPayableType(reference.payable_type.clone()))?;

        resolver.resolve(reference).await
    }
}
