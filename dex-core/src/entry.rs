//! Catalog entities: resolved entries, lightweight references, and list pages.

use serde::{Deserialize, Serialize};

/// A fully resolved catalog entry.
///
/// Entries are keyed by both `id` and the lowercase `name`. Upstream data is
/// static for the lifetime of a session, so an entry is never mutated once
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: u32,
    pub name: String,
    /// Category names in upstream slot order.
    pub categories: Vec<String>,
    #[serde(default)]
    pub images: EntryImages,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

impl Entry {
    /// Create an entry with no imagery or physical attributes.
    pub fn new(id: u32, name: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            id,
            name: name.into().to_lowercase(),
            categories,
            images: EntryImages::default(),
            height: None,
            weight: None,
        }
    }

    /// Whether this entry belongs to `category` (case-insensitive).
    pub fn in_category(&self, category: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }

    /// Best image for display: official artwork, falling back to the front sprite.
    pub fn preferred_image(&self) -> Option<&str> {
        self.images
            .artwork
            .as_deref()
            .or(self.images.front.as_deref())
    }
}

/// Image references attached to an entry. Opaque to the catalog core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryImages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork: Option<String>,
}

/// A `(name, locator)` pair returned by list endpoints.
///
/// A reference alone is not displayable; it must be resolved into an
/// [`Entry`] with a detail fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryRef {
    pub name: String,
    pub locator: String,
}

impl EntryRef {
    pub fn new(name: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locator: locator.into(),
        }
    }
}

/// A category listed in the upstream category directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    pub locator: String,
}

/// One page of the browse-all listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPage {
    pub results: Vec<EntryRef>,
    /// Total number of entries upstream, when the endpoint reports it.
    #[serde(default)]
    pub total: Option<u64>,
}

/// Pagination/filtering mode of the catalog controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Browse the whole catalog by offset.
    #[default]
    All,
    /// Page through the sorted membership of one category.
    Category,
    /// Single-shot lookup by exact name or numeric id.
    Exact,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::All => "all",
            Strategy::Category => "category",
            Strategy::Exact => "exact",
        }
    }

    /// Whether `load_more` can append further pages under this strategy.
    pub fn supports_continuation(&self) -> bool {
        matches!(self, Strategy::All | Strategy::Category)
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_new_lowercases_name() {
        let entry = Entry::new(25, "Pikachu", vec!["electric".to_string()]);
        assert_eq!(entry.name, "pikachu");
        assert!(entry.in_category("Electric"));
        assert!(!entry.in_category("water"));
    }

    #[test]
    fn test_preferred_image_falls_back_to_front() {
        let mut entry = Entry::new(1, "bulbasaur", vec![]);
        assert_eq!(entry.preferred_image(), None);

        entry.images.front = Some("front.png".to_string());
        assert_eq!(entry.preferred_image(), Some("front.png"));

        entry.images.artwork = Some("art.png".to_string());
        assert_eq!(entry.preferred_image(), Some("art.png"));
    }

    #[test]
    fn test_strategy_continuation() {
        assert!(Strategy::All.supports_continuation());
        assert!(Strategy::Category.supports_continuation());
        assert!(!Strategy::Exact.supports_continuation());
        assert_eq!(Strategy::default(), Strategy::All);
    }

    #[test]
    fn test_entry_serde_skips_empty_attributes() {
        let entry = Entry::new(4, "charmander", vec!["fire".to_string()]);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("height").is_none());
        let back: Entry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
