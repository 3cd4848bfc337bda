use std::collections::HashMap;

use crate::config::{ApiKeyCredential, AppConfig, BasicCredential, BearerCredential};

/// In-memory credential indexes, rebuilt wholesale on every config load.
/// Lookups never mutate; a reload replaces the whole store.
#[derive(Debug, Default)]
pub struct AuthStore {
    // By credential, for verification.
    pub basic_by_user: HashMap<String, BasicCredential>,
    pub bearer_by_token: HashMap<String, BearerCredential>,
    pub api_key_by_key: HashMap<String, ApiKeyCredential>,

    // By name, for policy evaluation and the debug endpoint.
    pub basic_by_name: HashMap<String, BasicCredential>,
    pub bearer_by_name: HashMap<String, BearerCredential>,
    pub api_key_by_name: HashMap<String, ApiKeyCredential>,
}

impl AuthStore {
    /// Build the indexes from a validated configuration. Uniqueness of
    /// names, users, and secrets was enforced at load time.
    pub fn build(config: &AppConfig) -> Self {
        let mut store = Self::default();

        for cred in &config.basic_auth {
            store
                .basic_by_user
                .insert(cred.user.clone(), cred.clone());
            store.basic_by_name.insert(cred.name.clone(), cred.clone());
        }
        for cred in &config.bearer_token {
            store
                .bearer_by_token
                .insert(cred.token.clone(), cred.clone());
            store
                .bearer_by_name
                .insert(cred.name.clone(), cred.clone());
        }
        for cred in &config.api_key {
            store.api_key_by_key.insert(cred.key.clone(), cred.clone());
            store
                .api_key_by_name
                .insert(cred.name.clone(), cred.clone());
        }

        store
    }
}
