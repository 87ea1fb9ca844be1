//! Upstream JSON shapes and their conversion into core types.

use dex_core::{CategoryRef, Entry, EntryImages, EntryPage, EntryRef};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NamedResource {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse {
    #[serde(default)]
    pub count: Option<u64>,
    pub results: Vec<NamedResource>,
}

impl From<ListResponse> for EntryPage {
    fn from(res: ListResponse) -> Self {
        EntryPage {
            results: res
                .results
                .into_iter()
                .map(|r| EntryRef::new(r.name, r.url))
                .collect(),
            total: res.count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryDirectoryResponse {
    pub results: Vec<NamedResource>,
}

impl From<CategoryDirectoryResponse> for Vec<CategoryRef> {
    fn from(res: CategoryDirectoryResponse) -> Self {
        res.results
            .into_iter()
            .map(|r| CategoryRef {
                name: r.name,
                locator: r.url,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryResponse {
    pub pokemon: Vec<CategoryMemberSlot>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryMemberSlot {
    pub pokemon: NamedResource,
}

impl From<CategoryResponse> for Vec<EntryRef> {
    fn from(res: CategoryResponse) -> Self {
        res.pokemon
            .into_iter()
            .map(|slot| EntryRef::new(slot.pokemon.name, slot.pokemon.url))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailResponse {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub weight: Option<u32>,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub sprites: Sprites,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TypeSlot {
    pub slot: u32,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Sprites {
    #[serde(default)]
    pub front_default: Option<String>,
    #[serde(default)]
    pub back_default: Option<String>,
    #[serde(default)]
    pub other: Option<OtherSprites>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OtherSprites {
    #[serde(rename = "official-artwork", default)]
    pub official_artwork: Option<ArtworkSprite>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArtworkSprite {
    #[serde(default)]
    pub front_default: Option<String>,
}

impl From<DetailResponse> for Entry {
    fn from(mut res: DetailResponse) -> Self {
        res.types.sort_by_key(|t| t.slot);
        let artwork = res
            .sprites
            .other
            .and_then(|o| o.official_artwork)
            .and_then(|a| a.front_default);
        Entry {
            id: res.id,
            name: res.name.to_lowercase(),
            categories: res.types.into_iter().map(|t| t.kind.name).collect(),
            images: EntryImages {
                front: res.sprites.front_default,
                back: res.sprites.back_default,
                artwork,
            },
            height: res.height,
            weight: res.weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL: &str = r#"{
        "id": 6,
        "name": "charizard",
        "height": 17,
        "weight": 905,
        "base_experience": 267,
        "types": [
            {"slot": 2, "type": {"name": "flying", "url": "https://pokeapi.co/api/v2/type/3/"}},
            {"slot": 1, "type": {"name": "fire", "url": "https://pokeapi.co/api/v2/type/10/"}}
        ],
        "sprites": {
            "front_default": "front.png",
            "back_default": null,
            "other": {"official-artwork": {"front_default": "art.png"}}
        }
    }"#;

    #[test]
    fn test_detail_to_entry() {
        let res: DetailResponse = serde_json::from_str(DETAIL).unwrap();
        let entry = Entry::from(res);
        assert_eq!(entry.id, 6);
        assert_eq!(entry.name, "charizard");
        assert_eq!(entry.categories, vec!["fire", "flying"]);
        assert_eq!(entry.images.front.as_deref(), Some("front.png"));
        assert_eq!(entry.images.back, None);
        assert_eq!(entry.images.artwork.as_deref(), Some("art.png"));
        assert_eq!(entry.weight, Some(905));
    }

    #[test]
    fn test_detail_without_sprites() {
        let res: DetailResponse =
            serde_json::from_str(r#"{"id": 1, "name": "Bulbasaur"}"#).unwrap();
        let entry = Entry::from(res);
        assert_eq!(entry.name, "bulbasaur");
        assert!(entry.categories.is_empty());
        assert_eq!(entry.preferred_image(), None);
    }

    #[test]
    fn test_list_page_conversion() {
        let raw = r#"{
            "count": 1302,
            "next": "https://pokeapi.co/api/v2/pokemon?offset=2&limit=2",
            "previous": null,
            "results": [
                {"name": "bulbasaur", "url": "https://pokeapi.co/api/v2/pokemon/1/"},
                {"name": "ivysaur", "url": "https://pokeapi.co/api/v2/pokemon/2/"}
            ]
        }"#;
        let page = EntryPage::from(serde_json::from_str::<ListResponse>(raw).unwrap());
        assert_eq!(page.total, Some(1302));
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[1].name, "ivysaur");
        assert_eq!(page.results[1].locator, "https://pokeapi.co/api/v2/pokemon/2/");
    }

    #[test]
    fn test_category_members_conversion() {
        let raw = r#"{
            "name": "fire",
            "pokemon": [
                {"slot": 1, "pokemon": {"name": "charmander", "url": "u4"}},
                {"slot": 1, "pokemon": {"name": "vulpix", "url": "u37"}}
            ]
        }"#;
        let members: Vec<EntryRef> =
            serde_json::from_str::<CategoryResponse>(raw).unwrap().into();
        assert_eq!(
            members,
            vec![EntryRef::new("charmander", "u4"), EntryRef::new("vulpix", "u37")]
        );
    }
}
