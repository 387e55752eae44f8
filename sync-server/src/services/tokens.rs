//! Seller token registry
//!
//! Every profile owns one or more marketplace authorization tokens; polls
//! iterate the active tokens of a profile, and workflow messages reference
//! tokens by id so a handler can rebuild the API credentials.

use ozon_api::client::ApiToken;
use serde::Deserialize;
use shared::ids::{ProfileId, TokenId};
use std::collections::HashMap;
use std::path::Path;

/// One registered seller token
#[derive(Debug, Clone)]
pub struct ProfileToken {
    pub id: TokenId,
    pub profile: ProfileId,
    pub api: ApiToken,
    pub active: bool,
}

/// Token lookup used by the schedulers and dispatchers
pub trait TokenProvider: Send + Sync {
    /// Profiles with at least one active token
    fn profiles(&self) -> Vec<ProfileId>;

    /// Active tokens of a profile
    fn tokens_for(&self, profile: ProfileId) -> Vec<ProfileToken>;

    /// Resolve a token by id (message payloads carry ids, not secrets)
    fn token(&self, id: TokenId) -> Option<ProfileToken>;
}

#[derive(Debug, Deserialize)]
struct TokenFileEntry {
    id: TokenId,
    profile: ProfileId,
    client_id: String,
    api_key: String,
    warehouse_id: i64,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

/// Token registry loaded from a JSON file at startup
pub struct FileTokens {
    by_id: HashMap<TokenId, ProfileToken>,
}

impl FileTokens {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let entries: Vec<TokenFileEntry> = serde_json::from_str(&raw)?;
        Ok(Self::from_entries(entries))
    }

    fn from_entries(entries: Vec<TokenFileEntry>) -> Self {
        let by_id = entries
            .into_iter()
            .map(|e| {
                (
                    e.id,
                    ProfileToken {
                        id: e.id,
                        profile: e.profile,
                        api: ApiToken {
                            client_id: e.client_id,
                            api_key: e.api_key,
                            warehouse_id: e.warehouse_id,
                        },
                        active: e.active,
                    },
                )
            })
            .collect();

        Self { by_id }
    }
}

impl TokenProvider for FileTokens {
    fn profiles(&self) -> Vec<ProfileId> {
        let mut profiles: Vec<ProfileId> = self
            .by_id
            .values()
            .filter(|t| t.active)
            .map(|t| t.profile)
            .collect();
        profiles.sort_by_key(|p| p.0);
        profiles.dedup();
        profiles
    }

    fn tokens_for(&self, profile: ProfileId) -> Vec<ProfileToken> {
        self.by_id
            .values()
            .filter(|t| t.active && t.profile == profile)
            .cloned()
            .collect()
    }

    fn token(&self, id: TokenId) -> Option<ProfileToken> {
        self.by_id.get(&id).filter(|t| t.active).cloned()
    }
}
