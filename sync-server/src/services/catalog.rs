//! Product catalog lookup
//!
//! Resolves a marketplace article (offer id) to the internal product card
//! and its delivery parameters. An article the catalog cannot resolve is a
//! data-integrity failure: the batch aborts so an operator notices the
//! mismatch instead of the order silently vanishing.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

/// Internal product card references plus packaging parameters
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogProduct {
    /// Product card identifier
    pub product: Uuid,
    #[serde(default)]
    pub offer: Option<Uuid>,
    #[serde(default)]
    pub variation: Option<Uuid>,
    #[serde(default)]
    pub modification: Option<Uuid>,
    /// Units of this product that fit one physical package
    #[serde(default = "default_capacity")]
    pub package_capacity: u32,
}

fn default_capacity() -> u32 {
    1
}

/// Catalog lookup by article
pub trait CatalogResolver: Send + Sync {
    fn resolve(&self, article: &str) -> Option<CatalogProduct>;
}

/// Catalog snapshot loaded from a JSON file (article -> card)
pub struct FileCatalog {
    by_article: HashMap<String, CatalogProduct>,
}

impl FileCatalog {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let by_article: HashMap<String, CatalogProduct> = serde_json::from_str(&raw)?;
        Ok(Self { by_article })
    }

    pub fn from_map(by_article: HashMap<String, CatalogProduct>) -> Self {
        Self { by_article }
    }
}

impl CatalogResolver for FileCatalog {
    fn resolve(&self, article: &str) -> Option<CatalogProduct> {
        self.by_article.get(article).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_article() {
        let mut map = HashMap::new();
        map.insert(
            "ART-1".to_string(),
            CatalogProduct {
                product: Uuid::new_v4(),
                offer: None,
                variation: None,
                modification: None,
                package_capacity: 4,
            },
        );

        let catalog = FileCatalog::from_map(map);
        assert_eq!(catalog.resolve("ART-1").unwrap().package_capacity, 4);
        assert!(catalog.resolve("ART-MISSING").is_none());
    }

    #[test]
    fn test_capacity_defaults_to_one() {
        let json = r#"{"ART-1": {"product": "018d464d-c67a-7285-8192-7235b0510924"}}"#;
        let by_article: HashMap<String, CatalogProduct> = serde_json::from_str(json).unwrap();
        assert_eq!(by_article["ART-1"].package_capacity, 1);
    }
}
