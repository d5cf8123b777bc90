use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// One anime record as returned by the Jikan API.
///
/// Field names follow the wire format so that favorites written to disk keep the
/// same shape as the API payload they were captured from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Item {
    pub mal_id: u32,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub images: Images,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub genres: Vec<GenreTag>,
}

impl Item {
    /// Best available poster URL: large jpg, then jpg, then webp. Empty when none.
    pub fn image_url(&self) -> &str {
        let jpg = &self.images.jpg;
        jpg.large_image_url
            .as_deref()
            .or(jpg.image_url.as_deref())
            .or(self
                .images
                .webp
                .as_ref()
                .and_then(|w| w.image_url.as_deref()))
            .unwrap_or("")
    }

    pub fn genre_names(&self) -> impl Iterator<Item = &str> {
        self.genres.iter().map(|g| g.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Images {
    #[serde(default)]
    pub jpg: ImageSet,
    #[serde(default)]
    pub webp: Option<ImageSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ImageSet {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub small_image_url: Option<String>,
    #[serde(default)]
    pub large_image_url: Option<String>,
}

/// Genre reference embedded in an [`Item`]. Only the name is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GenreTag {
    pub name: String,
}

/// A genre usable as a search filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub mal_id: u32,
    pub name: String,
    #[serde(default)]
    pub count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PaginationItems {
    pub count: u32,
    pub total: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Pagination {
    pub last_visible_page: u32,
    pub has_next_page: bool,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub items: Option<PaginationItems>,
}

/// A page of results: `{ data: [...], pagination?: {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.pagination
            .as_ref()
            .map(|p| p.has_next_page)
            .unwrap_or(false)
    }

    /// Total item count reported by the API, falling back to the page length.
    pub fn total(&self) -> u32 {
        self.pagination
            .as_ref()
            .and_then(|p| p.items.as_ref())
            .map(|i| i.total)
            .unwrap_or(self.data.len() as u32)
    }
}

/// Single-object envelope: `{ data: {...} }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Async status of a state slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum FetchStatus {
    #[default]
    #[strum(serialize = "idle")]
    Idle,
    #[strum(serialize = "loading")]
    Loading,
    #[strum(serialize = "succeeded")]
    Succeeded,
    #[strum(serialize = "failed")]
    Failed,
}
