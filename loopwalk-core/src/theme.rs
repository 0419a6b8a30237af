//! Walk themes: the single goal a trip is planned around.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeCategory {
    Historic,
    #[serde(rename = "movie")]
    MovieLocation,
    #[serde(rename = "energy")]
    EnergyLevel,
    #[serde(rename = "food")]
    FoodPreference,
    #[serde(rename = "custom")]
    CustomText,
    #[default]
    None,
}

impl ThemeCategory {
    pub const SELECTABLE: [Self; 5] = [
        Self::Historic,
        Self::MovieLocation,
        Self::EnergyLevel,
        Self::FoodPreference,
        Self::CustomText,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Historic => "historic",
            Self::MovieLocation => "movie",
            Self::EnergyLevel => "energy",
            Self::FoodPreference => "food",
            Self::CustomText => "custom",
            Self::None => "none",
        }
    }

    /// Human-readable name used when composing route queries.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Historic => "Historic",
            Self::MovieLocation => "Movie location",
            Self::EnergyLevel => "Energy level",
            Self::FoodPreference => "Food",
            Self::CustomText => "Custom",
            Self::None => "",
        }
    }

    /// Place-search keywords the route service enriches candidates with.
    #[must_use]
    pub const fn enrichment_queries(self) -> &'static [&'static str] {
        match self {
            Self::Historic => &["landmark", "museum"],
            Self::MovieLocation => &["tourist attraction"],
            Self::EnergyLevel => &["park"],
            Self::FoodPreference => &["cafe", "restaurant"],
            Self::CustomText | Self::None => &[crate::constants::DEFAULT_ENRICHMENT_QUERY],
        }
    }
}

impl fmt::Display for ThemeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "historic" => Ok(Self::Historic),
            "movie" => Ok(Self::MovieLocation),
            "energy" => Ok(Self::EnergyLevel),
            "food" => Ok(Self::FoodPreference),
            "custom" => Ok(Self::CustomText),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

/// The active theme. `detail` is empty exactly when `category` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Theme {
    category: ThemeCategory,
    detail: String,
}

impl Theme {
    /// Build a theme, keeping the detail/category invariant.
    ///
    /// A `None` category drops any detail; a blank detail for a real category
    /// is replaced with the category's display name.
    #[must_use]
    pub fn new(category: ThemeCategory, detail: impl Into<String>) -> Self {
        if category == ThemeCategory::None {
            return Self::default();
        }
        let detail = detail.into().trim().to_string();
        let detail = if detail.is_empty() {
            category.display_name().to_string()
        } else {
            detail
        };
        Self { category, detail }
    }

    #[must_use]
    pub const fn category(&self) -> ThemeCategory {
        self.category
    }

    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        self.category == ThemeCategory::None
    }
}

/// One preset offered by the goal-selection screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePreset {
    pub id: &'static str,
    pub category: ThemeCategory,
    pub name: &'static str,
    pub description: &'static str,
}

impl ThemePreset {
    #[must_use]
    pub fn to_theme(&self) -> Theme {
        Theme::new(self.category, self.name)
    }
}

const fn preset(
    id: &'static str,
    category: ThemeCategory,
    name: &'static str,
    description: &'static str,
) -> ThemePreset {
    ThemePreset {
        id,
        category,
        name,
        description,
    }
}

pub const THEME_PRESETS: &[ThemePreset] = &[
    preset(
        "rookery",
        ThemeCategory::Historic,
        "The Rookery Building",
        "Chicago School landmark with a Frank Lloyd Wright light court.",
    ),
    preset(
        "marquette",
        ThemeCategory::Historic,
        "Marquette Building",
        "National Historic Landmark known for its mosaics.",
    ),
    preset(
        "marshall-field",
        ThemeCategory::Historic,
        "Marshall Field and Company Building",
        "Historic retail palace on State Street.",
    ),
    preset(
        "field",
        ThemeCategory::Historic,
        "Field Building",
        "Early skyscraper next to the Rookery.",
    ),
    preset(
        "stock-exchange",
        ThemeCategory::Historic,
        "Chicago Stock Exchange Arch",
        "Surviving arch of the Adler & Sullivan exchange.",
    ),
    preset(
        "lasalle",
        ThemeCategory::MovieLocation,
        "LaSalle Street",
        "Financial corridor from The Dark Knight chase.",
    ),
    preset(
        "lower-wacker",
        ThemeCategory::MovieLocation,
        "Lower Wacker Drive",
        "Multi-level street from The Dark Knight and Transformers 3.",
    ),
    preset(
        "board-of-trade",
        ThemeCategory::MovieLocation,
        "Chicago Board of Trade Building",
        "Art Deco landmark from Ferris Bueller and The Dark Knight.",
    ),
    preset(
        "stranger-things",
        ThemeCategory::MovieLocation,
        "Chicago Streets & Alleys",
        "Urban backdrop from Stranger Things season 2.",
    ),
    preset(
        "riverwalk",
        ThemeCategory::MovieLocation,
        "Chicago Riverwalk",
        "Waterfront walkway seen in The Fugitive.",
    ),
    preset(
        "millennium",
        ThemeCategory::MovieLocation,
        "Millennium Park",
        "Cloud Gate and the park from Source Code.",
    ),
    preset(
        "high",
        ThemeCategory::EnergyLevel,
        "Energetic",
        "Hills and elevated paths for an active walk.",
    ),
    preset(
        "medium",
        ThemeCategory::EnergyLevel,
        "Moderate",
        "A comfortable sightseeing pace.",
    ),
    preset(
        "low",
        ThemeCategory::EnergyLevel,
        "Relaxed",
        "Leisurely routes with time to linger.",
    ),
    preset(
        "cozy-cafes",
        ThemeCategory::FoodPreference,
        "Cozy Cafes",
        "Charming cafes for coffee and conversation.",
    ),
    preset(
        "restaurants",
        ThemeCategory::FoodPreference,
        "Dining Destinations",
        "Stops at popular Chicago restaurants.",
    ),
    preset(
        "social-spots",
        ThemeCategory::FoodPreference,
        "Social Gathering Spots",
        "Lively cafes and eateries where friends gather.",
    ),
    preset(
        "chicago-classics",
        ThemeCategory::FoodPreference,
        "Chicago Food Classics",
        "Deep-dish pizza and other local favorites.",
    ),
    preset(
        "brunch-walks",
        ThemeCategory::FoodPreference,
        "Brunch & Walk",
        "Brunch spots for a leisurely group meal.",
    ),
];

/// Look up a preset by id.
#[must_use]
pub fn find_preset(id: &str) -> Option<&'static ThemePreset> {
    THEME_PRESETS.iter().find(|preset| preset.id == id)
}

/// Presets belonging to one category, in display order.
pub fn presets_for(category: ThemeCategory) -> impl Iterator<Item = &'static ThemePreset> {
    THEME_PRESETS
        .iter()
        .filter(move |preset| preset.category == category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_category_never_keeps_detail() {
        let theme = Theme::new(ThemeCategory::None, "leftover");
        assert!(theme.is_none());
        assert_eq!(theme.detail(), "");
    }

    #[test]
    fn blank_detail_gets_category_name() {
        let theme = Theme::new(ThemeCategory::EnergyLevel, "   ");
        assert_eq!(theme.detail(), "Energy level");
        assert!(!theme.is_none());
    }

    #[test]
    fn category_strings_round_trip() {
        for category in ThemeCategory::SELECTABLE {
            assert_eq!(category.as_str().parse::<ThemeCategory>(), Ok(category));
        }
        assert!("dance".parse::<ThemeCategory>().is_err());
    }

    #[test]
    fn catalog_lookup_and_grouping() {
        let preset = find_preset("rookery").expect("rookery preset");
        assert_eq!(preset.category, ThemeCategory::Historic);
        assert_eq!(preset.to_theme().detail(), "The Rookery Building");
        assert_eq!(presets_for(ThemeCategory::EnergyLevel).count(), 3);
        assert_eq!(presets_for(ThemeCategory::CustomText).count(), 0);
        assert!(find_preset("nowhere").is_none());
    }
}
