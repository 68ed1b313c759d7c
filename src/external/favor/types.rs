//! Payloads returned by the Favor API.
//!
//! Field names follow the wire format. URLs are kept as strings; the few
//! that the server sends as `""` instead of `null` decode as `None`.

use std::collections::HashMap;

use jiff::Timestamp;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoLocation {
    /// Favor headquarters, Austin TX.
    pub const FAVOR_HQ: GeoLocation = GeoLocation {
        latitude: 30.2599563,
        longitude: -97.7147446,
    };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl Default for GeoLocation {
    fn default() -> Self {
        Self::FAVOR_HQ
    }
}

/// `/page-layouts/v2/browse`: cuisine categories, filters and the home
/// page sections.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Browse {
    pub categories: Vec<BrowseCategory>,
    pub filters: Vec<Filter>,
    /// Sections with a layout this client does not know are dropped.
    #[serde(deserialize_with = "known_sections")]
    pub sections: Vec<Section>,
    pub is_empty: bool,
}

impl Browse {
    pub fn merchant_sections(&self) -> impl Iterator<Item = &MerchantCarouselSection> {
        self.sections.iter().filter_map(|section| match section {
            Section::MerchantCarousel(s) => Some(s),
            Section::HeroCarousel(_) => None,
        })
    }

    pub fn hero_sections(&self) -> impl Iterator<Item = &HeroCarouselSection> {
        self.sections.iter().filter_map(|section| match section {
            Section::HeroCarousel(s) => Some(s),
            Section::MerchantCarousel(_) => None,
        })
    }
}

/// A cuisine, e.g. "Pizza" or "Burgers".
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BrowseCategory {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub category_pinned: bool,
    pub category_pinned_date: Option<Timestamp>,
    pub icon_url: String,
    pub images: CategoryImages,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryImages {
    pub search_icon: String,
    pub hero_image: String,
    pub card_image: String,
    pub card_mobile_image: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Filter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub values: Vec<FilterValue>,
    pub icon_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilterValue {
    pub display_name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    HeroCarousel(HeroCarouselSection),
    MerchantCarousel(MerchantCarouselSection),
}

impl Section {
    pub fn id(&self) -> &str {
        match self {
            Section::HeroCarousel(s) => s.id(),
            Section::MerchantCarousel(s) => s.id(),
        }
    }
}

fn known_sections<'de, D>(deserializer: D) -> Result<Vec<Section>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    let mut sections = Vec::with_capacity(raw.len());
    for value in raw {
        let layout = value.get("layout").and_then(|l| l.as_str()).map(str::to_owned);
        let section = match layout.as_deref() {
            Some("hero_carousel") => {
                Section::HeroCarousel(serde_json::from_value(value).map_err(de::Error::custom)?)
            }
            Some("merchant_carousel") => {
                Section::MerchantCarousel(serde_json::from_value(value).map_err(de::Error::custom)?)
            }
            other => {
                tracing::debug!(layout = ?other, "skipping browse section with unknown layout");
                continue;
            }
        };
        sections.push(section);
    }
    Ok(sections)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HeroCarouselSection {
    pub heroes: Vec<Hero>,
    pub layout: String,
    pub hero_type: String,
    pub web_hero_type: String,
}

impl HeroCarouselSection {
    pub fn id(&self) -> &str {
        "Heroes"
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Hero {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub background_image_url: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub web_hero_image_url: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub eyebrow: Option<String>,
    pub cta: String,
    pub image_url: String,
    pub colors: HeroColors,
    pub display_type: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HeroColors {
    pub background: String,
    pub eyebrow: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub cta: String,
}

/// `null`, a missing field and `""` all mean "no URL".
fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MerchantCarouselSection {
    pub layout: String,
    pub title: String,
    pub category_id: Option<i64>,
    pub slug: Option<String>,
    pub merchants: Vec<Merchant>,
    pub merchant_link: Option<String>,
    pub merchant_link_type: Option<String>,
    pub merchant_link_id: Option<i64>,
}

impl MerchantCarouselSection {
    pub fn id(&self) -> &str {
        &self.title
    }
}

/// A restaurant as listed in carousels and category pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merchant {
    pub id: u64,
    pub franchise_id: u64,
    pub name: String,
    pub is_open: bool,
    pub image_url: String,
    pub distance_display_string: String,
    pub delivery_fee: DeliveryFee,
    pub origin_tracking: OriginTracking,
    pub badge: Option<Badge>,
    pub flavor_text: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub text: String,
    pub theme: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryFee {
    pub display_delivery_fee: String,
    pub strike_through_fee: Option<String>,
    pub is_loyalty: bool,
    pub text_color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginTracking {
    pub category_id: Option<String>,
    pub collection_type: Option<String>,
    pub filter_ids: Option<Vec<String>>,
    pub collection_id: Option<String>,
}

/// `/page-layouts/v2/filters/collection?cuisine=<id>`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Category {
    pub title: String,
    pub merchants: Vec<Merchant>,
    pub layout: String,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pagination {
    pub page_size: u32,
    pub page: u32,
    pub total: u32,
}

/// `/menu-hydration/public/v2/locations/<id>/menu_url`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MenuUrl {
    /// e.g. `locations/10370/menu/4yhZd9QI7T1VryE3rcx_kfyzVn8wJHzW2A8Pn89LZhE`
    pub menu_url: String,
}

/// `/menu-hydration/public/v2/<menu_url>/overview`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MenuOverview {
    pub id: i64,
    pub option_groups: Option<Vec<OptionGroup>>,
    pub option_items: Option<Vec<OptionItem>>,
    pub menu_items: Vec<MenuItem>,
    pub sub_menus: Vec<SubMenu>,
}

impl MenuOverview {
    /// The items a section lists, in section order. Ids missing from
    /// `menu_items` are skipped.
    pub fn items_for_section(&self, section: &MenuSection) -> Vec<&MenuItem> {
        let by_id: HashMap<&str, &MenuItem> = self
            .menu_items
            .iter()
            .map(|item| (item.id.as_str(), item))
            .collect();
        section
            .menu_items
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).copied())
            .collect()
    }

    pub fn sections(&self) -> impl Iterator<Item = &MenuSection> {
        self.sub_menus.iter().flat_map(|sub| sub.sections.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OptionGroup {
    pub id: String,
    pub name: Option<String>,
    pub options: Vec<String>,
    pub required_description: Option<String>,
    pub min_selectable: Option<i64>,
    pub max_selectable: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OptionItem {
    pub base_price: i64,
    pub id: String,
    pub is_quantifiable: Option<bool>,
    pub name: String,
    pub option_groups: Option<Vec<String>>,
    pub price: i64,
    pub min_item_display_price: i64,
}

/// Prices are in cents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MenuItem {
    pub base_price: i64,
    pub description: Option<String>,
    pub id: String,
    pub is_quantifiable: bool,
    pub name: String,
    pub option_groups: Option<Vec<String>>,
    pub price: i64,
    pub min_item_display_price: i64,
    pub sub_menu_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubMenu {
    pub id: String,
    pub name: String,
    pub sections: Vec<MenuSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MenuSection {
    pub id: String,
    pub name: String,
    pub item_count: u32,
    pub menu_items: Vec<String>,
}
