use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A product listing discovered on a storefront page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    /// Older state files call this `url`.
    #[serde(default, alias = "url")]
    pub link: String,
    #[serde(default, deserialize_with = "price_text")]
    pub price: Option<String>,
}

/// Accepts a price stored as either a string or a bare number.
fn price_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Identity of an item within one brand.
///
/// The link identifies an item when present; otherwise the name does. Both are
/// compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKey {
    Link(String),
    Name(String),
}

impl Item {
    pub fn new(name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: link.into(),
            price: None,
        }
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }

    pub fn key(&self) -> ItemKey {
        let link = self.link.trim();
        if link.is_empty() {
            ItemKey::Name(self.name.trim().to_lowercase())
        } else {
            ItemKey::Link(link.to_lowercase())
        }
    }
}

/// On-disk shape of a state entry. Early state files stored bare product names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum StoredItem {
    Legacy(String),
    Full(Item),
}

impl From<StoredItem> for Item {
    fn from(stored: StoredItem) -> Self {
        match stored {
            StoredItem::Legacy(name) => Item::new(name, ""),
            StoredItem::Full(item) => item,
        }
    }
}
