//! Named contract registry
//!
//! Holds every contract by name and validates values against them.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::contract::SchemaContract;
use super::contracts;
use super::error::SchemaError;
use super::validator;
use crate::document::Record;

/// Central store of record contracts
pub struct SchemaRegistry {
    contracts: HashMap<String, SchemaContract>,
}

impl SchemaRegistry {
    /// Registry containing the built-in dashboard contracts
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for contract in contracts::all() {
            registry.register(contract);
        }
        registry
    }

    /// Registry with no contracts
    pub fn empty() -> Self {
        Self {
            contracts: HashMap::new(),
        }
    }

    /// Add or replace a contract under its own name
    pub fn register(&mut self, contract: SchemaContract) {
        self.contracts.insert(contract.name().to_string(), contract);
    }

    pub fn get(&self, name: &str) -> Option<&SchemaContract> {
        self.contracts.get(name)
    }

    /// Check a value against a named contract, returning the coerced record
    pub fn check(&self, name: &str, candidate: &Value) -> Result<Record, SchemaError> {
        let contract = self.lookup(name)?;
        Ok(validator::check(candidate, contract)?)
    }

    /// Validate and decode a value against a named contract
    pub fn validate<T: DeserializeOwned>(
        &self,
        name: &str,
        candidate: &Value,
    ) -> Result<T, SchemaError> {
        let contract = self.lookup(name)?;
        Ok(validator::validate(candidate, contract)?)
    }

    /// Registered names, sorted
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.contracts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    fn lookup(&self, name: &str) -> Result<&SchemaContract, SchemaError> {
        self.contracts
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
