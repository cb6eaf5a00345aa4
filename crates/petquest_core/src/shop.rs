use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Food,
    Toys,
    Treats,
    Decorations,
    Upgrades,
}

impl ItemCategory {
    /// Consumables are applied on purchase and never enter the inventory.
    pub fn is_consumable(self) -> bool {
        matches!(self, Self::Food | Self::Toys | Self::Treats)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Toys => "toys",
            Self::Treats => "treats",
            Self::Decorations => "decorations",
            Self::Upgrades => "upgrades",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "stat", content = "amount", rename_all = "snake_case")]
pub enum Effect {
    Health(f64),
    Happiness(f64),
    Hunger(f64),
    Energy(f64),
    PermanentHealth(f64),
    PermanentHappiness(f64),
    DecayMultiplier(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShopItem {
    pub id: &'static str,
    pub name: &'static str,
    pub category: ItemCategory,
    pub price: u64,
    pub description: &'static str,
    pub effects: &'static [Effect],
    pub wearable: bool,
}

const fn item(
    id: &'static str,
    name: &'static str,
    category: ItemCategory,
    price: u64,
    description: &'static str,
    effects: &'static [Effect],
) -> ShopItem {
    ShopItem {
        id,
        name,
        category,
        price,
        description,
        effects,
        wearable: false,
    }
}

const fn wearable(
    id: &'static str,
    name: &'static str,
    price: u64,
    description: &'static str,
    effects: &'static [Effect],
) -> ShopItem {
    ShopItem {
        id,
        name,
        category: ItemCategory::Decorations,
        price,
        description,
        effects,
        wearable: true,
    }
}

use Effect::*;
use ItemCategory::*;

pub const CATALOG: &[ShopItem] = &[
    item("apple", "Apple", Food, 10, "A fresh apple", &[Hunger(20.0), Health(10.0)]),
    item("meal", "Meal", Food, 30, "A hearty meal", &[Hunger(40.0), Health(20.0)]),
    item("feast", "Feast", Food, 60, "A grand feast", &[Hunger(60.0), Health(40.0)]),
    item("ball", "Ball", Toys, 20, "A fun ball to play with", &[Happiness(20.0), Energy(10.0)]),
    item("puzzle", "Puzzle", Toys, 40, "A challenging puzzle", &[Happiness(30.0), Energy(20.0)]),
    item(
        "game-console",
        "Game Console",
        Toys,
        80,
        "Hours of fun",
        &[Happiness(50.0), Energy(30.0)],
    ),
    item(
        "cookie",
        "Cookie",
        Treats,
        30,
        "A sweet cookie",
        &[Health(15.0), Happiness(15.0), Hunger(15.0), Energy(15.0)],
    ),
    item(
        "cake",
        "Cake",
        Treats,
        70,
        "A delicious cake",
        &[Health(30.0), Happiness(30.0), Hunger(30.0), Energy(30.0)],
    ),
    item(
        "golden-treat",
        "Golden Treat",
        Treats,
        150,
        "The ultimate treat",
        &[Health(50.0), Happiness(50.0), Hunger(50.0), Energy(50.0)],
    ),
    wearable(
        "hat",
        "Lucky Hat",
        40,
        "A stylish hat that brings good fortune",
        &[Happiness(10.0)],
    ),
    wearable("bow-tie", "Elegant Bow Tie", 35, "A dapper accessory", &[Happiness(15.0)]),
    wearable(
        "tie",
        "Professional Tie",
        45,
        "Look sharp and professional",
        &[Happiness(12.0), Energy(5.0)],
    ),
    item("accessory", "Accessory", Decorations, 60, "A fancy accessory", &[]),
    item("background", "Background Theme", Decorations, 100, "Change the background", &[]),
    item(
        "health-boost",
        "Health Boost",
        Upgrades,
        200,
        "+10 max health permanently",
        &[PermanentHealth(10.0)],
    ),
    item(
        "happiness-boost",
        "Happiness Boost",
        Upgrades,
        200,
        "+10 max happiness permanently",
        &[PermanentHappiness(10.0)],
    ),
    item(
        "stat-decay-slower",
        "Stat Decay Slower",
        Upgrades,
        300,
        "Stats decay 50% slower",
        &[DecayMultiplier(0.5)],
    ),
];

pub fn find_item(id: &str) -> Option<&'static ShopItem> {
    let trimmed = id.trim();
    CATALOG.iter().find(|item| item.id == trimmed)
}

#[cfg(test)]
mod tests {
    use super::{CATALOG, ItemCategory, find_item};
    use std::collections::HashSet;

    #[test]
    fn catalog_ids_are_unique() {
        let ids: HashSet<_> = CATALOG.iter().map(|item| item.id).collect();
        assert_eq!(ids.len(), CATALOG.len());
    }

    #[test]
    fn only_decorations_are_wearable() {
        for item in CATALOG.iter().filter(|item| item.wearable) {
            assert_eq!(item.category, ItemCategory::Decorations, "{}", item.id);
        }
    }

    #[test]
    fn find_item_trims_input() {
        assert_eq!(find_item(" apple ").map(|item| item.price), Some(10));
        assert!(find_item("unicorn").is_none());
    }
}
