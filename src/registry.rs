//! Brand list loading and editing.
//!
//! The run pipeline only reads the registry. Edits come from the `brands`
//! subcommand, which the issue-driven workflow calls.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::models::BrandDescriptor;
use crate::utils::error::{AppError, Result};
use crate::utils::write_atomic;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryChange {
    Added,
    UrlUpdated,
    Unchanged,
    Removed,
    NotFound,
}

pub struct BrandRegistry {
    path: PathBuf,
}

impl BrandRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the brand list for a run. A missing or malformed file is fatal.
    ///
    /// Entries with an empty name or URL are skipped with a warning.
    pub fn load(&self) -> Result<Vec<BrandDescriptor>> {
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            AppError::Registry(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let brands = parse_brands(&raw)
            .map_err(|e| AppError::Registry(format!("{}: {}", self.path.display(), e)))?;
        Ok(brands
            .into_iter()
            .filter(|b| {
                let usable = !b.name.trim().is_empty() && !b.url.trim().is_empty();
                if !usable {
                    warn!("Skipping brand entry with empty name or url: {:?}", b);
                }
                usable
            })
            .collect())
    }

    /// Load the brand list for editing. A missing file is an empty registry.
    pub fn load_for_edit(&self) -> Result<Vec<BrandDescriptor>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => parse_brands(&raw)
                .map_err(|e| AppError::Registry(format!("{}: {}", self.path.display(), e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(AppError::Registry(format!(
                "cannot read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    pub fn save(&self, brands: &[BrandDescriptor]) -> Result<()> {
        let mut sorted = brands.to_vec();
        sort_brands(&mut sorted);
        let mut json = serde_json::to_string_pretty(&sorted)?;
        json.push('\n');
        write_atomic(&self.path, json.as_bytes()).map_err(|e| {
            AppError::Registry(format!("cannot write {}: {}", self.path.display(), e))
        })
    }

    pub fn add(&self, name: &str, url: Option<&str>) -> Result<RegistryChange> {
        let mut brands = self.load_for_edit()?;
        let change = add_brand(&mut brands, name, url)?;
        self.save(&brands)?;
        info!("Registry {}: {:?} {}", self.path.display(), change, name.trim());
        Ok(change)
    }

    pub fn remove(&self, name: &str) -> Result<RegistryChange> {
        let mut brands = self.load_for_edit()?;
        let change = remove_brand(&mut brands, name);
        if change == RegistryChange::NotFound {
            warn!("{} not found, nothing to remove", name.trim());
        }
        self.save(&brands)?;
        Ok(change)
    }
}

fn parse_brands(raw: &str) -> std::result::Result<Vec<BrandDescriptor>, serde_json::Error> {
    serde_json::from_str(raw)
}

pub fn sort_brands(brands: &mut [BrandDescriptor]) {
    brands.sort_by_key(|b| b.name.to_lowercase());
}

/// Add a brand, or update the URL of an existing one (names match case-insensitively).
pub fn add_brand(
    brands: &mut Vec<BrandDescriptor>,
    name: &str,
    url: Option<&str>,
) -> Result<RegistryChange> {
    let name = name.trim();
    let url = url.map(str::trim).filter(|u| !u.is_empty());
    if name.is_empty() {
        return Err(AppError::Registry("brand name must not be empty".into()));
    }

    if let Some(existing) = brands.iter_mut().find(|b| b.matches_name(name)) {
        return Ok(match url {
            Some(url) if existing.url != url => {
                existing.url = url.to_string();
                RegistryChange::UrlUpdated
            }
            _ => RegistryChange::Unchanged,
        });
    }

    let url = url.ok_or_else(|| AppError::Registry(format!("URL required to add {}", name)))?;
    brands.push(BrandDescriptor::new(name, url));
    Ok(RegistryChange::Added)
}

pub fn remove_brand(brands: &mut Vec<BrandDescriptor>, name: &str) -> RegistryChange {
    match brands.iter().position(|b| b.matches_name(name)) {
        Some(index) => {
            brands.remove(index);
            RegistryChange::Removed
        }
        None => RegistryChange::NotFound,
    }
}
