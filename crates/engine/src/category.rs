//! Transaction categories and the icons they render with.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::EngineError;

/// Category of a transaction.
///
/// The known set is closed; anything else the server hands back is kept
/// verbatim in [`Category::Custom`] so it can still be shown.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    FoodAndDrinks,
    Shopping,
    Transportation,
    Bills,
    Entertainment,
    Income,
    Other,
    Custom(String),
}

/// Icon shown next to a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Icon {
    FastFood,
    Cart,
    Car,
    Receipt,
    Film,
    Cash,
    Ellipsis,
    PriceTags,
}

impl Category {
    /// Every category a user can pick when creating a transaction.
    pub const KNOWN: [Category; 7] = [
        Category::FoodAndDrinks,
        Category::Shopping,
        Category::Transportation,
        Category::Bills,
        Category::Entertainment,
        Category::Income,
        Category::Other,
    ];

    /// Label used on the wire and in the UI.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::FoodAndDrinks => "Food & Drinks",
            Self::Shopping => "Shopping",
            Self::Transportation => "Transportation",
            Self::Bills => "Bills",
            Self::Entertainment => "Entertainment",
            Self::Income => "Income",
            Self::Other => "Other",
            Self::Custom(label) => label,
        }
    }

    #[must_use]
    pub fn icon(&self) -> Icon {
        match self {
            Self::FoodAndDrinks => Icon::FastFood,
            Self::Shopping => Icon::Cart,
            Self::Transportation => Icon::Car,
            Self::Bills => Icon::Receipt,
            Self::Entertainment => Icon::Film,
            Self::Income => Icon::Cash,
            Self::Other => Icon::Ellipsis,
            Self::Custom(_) => Icon::PriceTags,
        }
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }

    /// Looks up a known category by its exact label.
    pub fn parse_known(label: &str) -> Result<Category, EngineError> {
        Self::KNOWN
            .into_iter()
            .find(|category| category.label() == label)
            .ok_or_else(|| EngineError::UnknownCategory(label.to_string()))
    }

    /// Position in [`Category::KNOWN`], if this is a known category.
    #[must_use]
    pub fn known_index(&self) -> Option<usize> {
        Self::KNOWN.iter().position(|category| category == self)
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Self::parse_known(&label).unwrap_or(Category::Custom(label))
    }
}

impl From<&str> for Category {
    fn from(label: &str) -> Self {
        Self::parse_known(label).unwrap_or_else(|_| Category::Custom(label.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Category::from)
    }
}

impl Icon {
    /// Icon name in the Ionicons set used by the mobile client.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FastFood => "fast-food",
            Self::Cart => "cart",
            Self::Car => "car",
            Self::Receipt => "receipt",
            Self::Film => "film",
            Self::Cash => "cash",
            Self::Ellipsis => "ellipsis-horizontal",
            Self::PriceTags => "pricetags",
        }
    }

    /// Single-cell glyph for terminal rendering.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::FastFood => '🍔',
            Self::Cart => '🛒',
            Self::Car => '🚗',
            Self::Receipt => '🧾',
            Self::Film => '🎬',
            Self::Cash => '💵',
            Self::Ellipsis => '…',
            Self::PriceTags => '🏷',
        }
    }
}
