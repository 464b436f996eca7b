use serde::{Deserialize, Serialize};

/// A tracked storefront, as listed in `brands.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandDescriptor {
    pub name: String,
    pub url: String,
    /// CSS selectors tried before the generic strategies, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<String>,
    /// Extra collection paths appended to `url`, e.g. `/collections/new-arrivals`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

impl BrandDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            selectors: Vec::new(),
            paths: Vec::new(),
        }
    }

    /// Every page to scan for this brand: the base URL first, then each extra path.
    pub fn page_urls(&self) -> Vec<String> {
        let base = self.url.trim_end_matches('/');
        let mut urls = vec![self.url.clone()];
        for path in &self.paths {
            if path.starts_with('/') {
                urls.push(format!("{}{}", base, path));
            } else {
                urls.push(format!("{}/{}", base, path));
            }
        }
        urls
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }
}
