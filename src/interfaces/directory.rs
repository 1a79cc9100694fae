//! Account display-name lookup.
//!
//! Identities and names belong to the external customer/representative
//! registry; the ledger only asks for a label when rendering leaderboards.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::ledger::Role;

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn display_name(&self, account_id: &str, role: Role) -> Option<String>;
}

/// Fixed in-memory directory.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    names: HashMap<(Role, String), String>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: Role, account_id: &str, name: &str) -> Self {
        self.insert(role, account_id, name);
        self
    }

    pub fn insert(&mut self, role: Role, account_id: &str, name: &str) {
        self.names
            .insert((role, account_id.to_string()), name.to_string());
    }
}

#[async_trait]
impl AccountDirectory for StaticDirectory {
    async fn display_name(&self, account_id: &str, role: Role) -> Option<String> {
        self.names.get(&(role, account_id.to_string())).cloned()
    }
}
