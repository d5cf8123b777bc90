use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Result ordering by score.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Display, Serialize, Deserialize)]
pub enum SortOrder {
    #[strum(serialize = "asc")]
    Ascending,
    #[default]
    #[strum(serialize = "desc")]
    Descending,
}

impl SortOrder {
    pub fn toggle(&self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    /// Value of the `sort` query parameter.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ascending => "Lowest → Highest",
            Self::Descending => "Highest → Lowest",
        }
    }
}
