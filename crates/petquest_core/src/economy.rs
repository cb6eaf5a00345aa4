//! Pet economy: rewards, lazy stat decay, growth stages and the shop.

use crate::error::AppError;
use crate::model::PetData;
use crate::model::pet::STAT_CEILING;
use crate::shop::{Effect, ShopItem, find_item};
use serde::Serialize;
use tracing::{debug, info};

pub const COMPLETION_HAPPINESS_BONUS: f64 = 5.0;
pub const HUNGER_DECAY_PER_HOUR: f64 = 15.0;
pub const ENERGY_DECAY_PER_HOUR: f64 = 10.0;
pub const MAX_GROWTH_STAGE: u8 = 3;
const GROWTH_POINTS_PER_STAGE: f64 = 20.0;
const MS_PER_HOUR: f64 = 3_600_000.0;

pub const GROWTH_STAGE_NAMES: [&str; 4] = ["Egg", "Baby", "Teen", "Adult"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseOutcome {
    pub item_id: String,
    pub price: u64,
    pub coins_left: u64,
    pub stored_in_inventory: bool,
}

pub fn growth_stage(pet: &PetData) -> u8 {
    let points = f64::from(pet.total_tasks_completed)
        + f64::from(pet.items_used)
        + pet.average_stat() / 10.0;
    let stage = (points / GROWTH_POINTS_PER_STAGE).floor();
    if stage >= f64::from(MAX_GROWTH_STAGE) {
        MAX_GROWTH_STAGE
    } else if stage <= 0.0 {
        0
    } else {
        stage as u8
    }
}

pub fn growth_stage_name(stage: u8) -> &'static str {
    GROWTH_STAGE_NAMES[usize::from(stage.min(MAX_GROWTH_STAGE))]
}

pub fn refresh_growth(pet: &mut PetData) {
    pet.growth_stage = growth_stage(pet);
}

/// Credits a task or goal completion.
pub fn apply_reward(pet: &mut PetData, coins: u64) {
    pet.coins = pet.coins.saturating_add(coins);
    pet.happiness = (pet.happiness + COMPLETION_HAPPINESS_BONUS).min(pet.max_happiness);
    refresh_growth(pet);
    info!(coins, balance = pet.coins, "reward credited");
}

/// Decays hunger and energy for the time since `last_stat_update`. Called on
/// every read of the record; there is no background scheduler.
pub fn apply_decay(pet: &mut PetData, now: i64) {
    let elapsed = now - pet.last_stat_update;
    if elapsed <= 0 {
        return;
    }

    let hours = elapsed as f64 / MS_PER_HOUR;
    let multiplier = pet.decay_multiplier.max(0.0);
    pet.hunger = (pet.hunger - multiplier * HUNGER_DECAY_PER_HOUR * hours).max(0.0);
    pet.energy = (pet.energy - multiplier * ENERGY_DECAY_PER_HOUR * hours).max(0.0);
    pet.last_stat_update = now;
    refresh_growth(pet);
    debug!(hours, hunger = pet.hunger, energy = pet.energy, "stat decay applied");
}

pub fn purchase(pet: &mut PetData, item_id: &str) -> Result<PurchaseOutcome, AppError> {
    let item = find_item(item_id).ok_or_else(|| AppError::invalid_input("item not found"))?;
    if pet.coins < item.price {
        return Err(AppError::invalid_input(format!(
            "not enough coins: {} costs {}, balance is {}",
            item.name, item.price, pet.coins
        )));
    }

    pet.coins -= item.price;
    apply_effects(pet, item);

    let stored_in_inventory = !item.category.is_consumable();
    if stored_in_inventory {
        if !pet.owns(item.id) {
            pet.inventory.push(item.id.to_string());
        }
    } else {
        pet.items_used += 1;
    }
    refresh_growth(pet);

    info!(item = item.id, price = item.price, balance = pet.coins, "item purchased");
    Ok(PurchaseOutcome {
        item_id: item.id.to_string(),
        price: item.price,
        coins_left: pet.coins,
        stored_in_inventory,
    })
}

fn apply_effects(pet: &mut PetData, item: &ShopItem) {
    for effect in item.effects {
        match *effect {
            Effect::Health(amount) => pet.health = (pet.health + amount).min(pet.max_health),
            Effect::Happiness(amount) => {
                pet.happiness = (pet.happiness + amount).min(pet.max_happiness)
            }
            Effect::Hunger(amount) => pet.hunger = (pet.hunger + amount).min(STAT_CEILING),
            Effect::Energy(amount) => pet.energy = (pet.energy + amount).min(STAT_CEILING),
            Effect::PermanentHealth(amount) => {
                pet.max_health += amount;
                pet.health = (pet.health + amount).min(pet.max_health);
            }
            Effect::PermanentHappiness(amount) => {
                pet.max_happiness += amount;
                pet.happiness = (pet.happiness + amount).min(pet.max_happiness);
            }
            Effect::DecayMultiplier(factor) => pet.decay_multiplier *= factor,
        }
    }
}

/// Equips an owned wearable, or unequips it if it is already active.
/// Returns whether the item is active afterwards.
pub fn toggle_wearable(pet: &mut PetData, item_id: &str) -> Result<bool, AppError> {
    let item = find_item(item_id).ok_or_else(|| AppError::invalid_input("item not found"))?;
    if !item.wearable {
        return Err(AppError::invalid_input("item is not wearable"));
    }
    if !pet.owns(item.id) {
        return Err(AppError::invalid_input("item is not owned"));
    }

    if let Some(index) = pet.active_items.iter().position(|id| id == item.id) {
        pet.active_items.remove(index);
        Ok(false)
    } else {
        pet.active_items.push(item.id.to_string());
        Ok(true)
    }
}

pub fn rename(pet: &mut PetData, name: &str) -> Result<(), AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("name is required"));
    }
    pet.name = trimmed.to_string();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_decay, apply_reward, growth_stage, purchase, rename, toggle_wearable};
    use crate::model::PetData;

    const HOUR: i64 = 3_600_000;

    #[test]
    fn decay_two_hours_drops_hunger_by_thirty() {
        let now = 10 * HOUR;
        let mut pet = PetData::new(now - 2 * HOUR);

        apply_decay(&mut pet, now);

        assert!((pet.hunger - 70.0).abs() < 1e-9);
        assert!((pet.energy - 80.0).abs() < 1e-9);
        assert_eq!(pet.last_stat_update, now);
    }

    #[test]
    fn decay_is_monotonic_between_reads() {
        let mut pet = PetData::new(0);
        let mut previous = pet.hunger;
        for step in 1..=12 {
            apply_decay(&mut pet, step * HOUR / 2);
            assert!(pet.hunger <= previous);
            previous = pet.hunger;
        }
        assert_eq!(pet.hunger, 10.0);
    }

    #[test]
    fn decay_floors_at_zero_and_respects_multiplier() {
        let mut pet = PetData::new(0);
        pet.decay_multiplier = 0.5;
        apply_decay(&mut pet, 4 * HOUR);
        assert!((pet.hunger - 70.0).abs() < 1e-9);

        apply_decay(&mut pet, 100 * HOUR);
        assert_eq!(pet.hunger, 0.0);
        assert_eq!(pet.energy, 0.0);
    }

    #[test]
    fn decay_ignores_clock_going_backwards() {
        let mut pet = PetData::new(5 * HOUR);
        apply_decay(&mut pet, HOUR);
        assert_eq!(pet.hunger, 100.0);
        assert_eq!(pet.last_stat_update, 5 * HOUR);
    }

    #[test]
    fn reward_adds_coins_and_caps_happiness() {
        let mut pet = PetData::new(0);
        pet.happiness = 98.0;
        apply_reward(&mut pet, 146);

        assert_eq!(pet.coins, 146);
        assert_eq!(pet.happiness, 100.0);
    }

    #[test]
    fn growth_stage_is_capped_at_three() {
        let mut pet = PetData::new(0);
        assert_eq!(growth_stage(&pet), 0);

        pet.total_tasks_completed = 15;
        pet.items_used = 5;
        assert_eq!(growth_stage(&pet), 1);

        pet.total_tasks_completed = 500;
        assert_eq!(growth_stage(&pet), 3);
    }

    #[test]
    fn purchase_rejects_insufficient_coins_without_mutation() {
        let mut pet = PetData::new(0);
        pet.coins = 5;
        let before = pet.clone();

        let err = purchase(&mut pet, "apple").unwrap_err();

        assert_eq!(err.code(), "invalid_input");
        assert_eq!(pet, before);
    }

    #[test]
    fn purchase_consumable_applies_effects_and_counts_usage() {
        let mut pet = PetData::new(0);
        pet.coins = 100;
        pet.hunger = 50.0;
        pet.health = 95.0;

        let outcome = purchase(&mut pet, "apple").unwrap();

        assert_eq!(outcome.coins_left, 90);
        assert!(!outcome.stored_in_inventory);
        assert_eq!(pet.hunger, 70.0);
        assert_eq!(pet.health, 100.0);
        assert_eq!(pet.items_used, 1);
        assert!(pet.inventory.is_empty());
    }

    #[test]
    fn purchase_upgrades_raise_ceiling_and_deduplicate_inventory() {
        let mut pet = PetData::new(0);
        pet.coins = 1_000;

        purchase(&mut pet, "health-boost").unwrap();
        purchase(&mut pet, "health-boost").unwrap();

        assert_eq!(pet.max_health, 120.0);
        assert_eq!(pet.health, 120.0);
        assert_eq!(pet.inventory, vec!["health-boost".to_string()]);
        assert_eq!(pet.items_used, 0);
    }

    #[test]
    fn decay_upgrade_multiplies_existing_multiplier() {
        let mut pet = PetData::new(0);
        pet.coins = 1_000;
        pet.decay_multiplier = 0.8;

        purchase(&mut pet, "stat-decay-slower").unwrap();

        assert!((pet.decay_multiplier - 0.4).abs() < 1e-9);
    }

    #[test]
    fn toggle_wearable_requires_ownership() {
        let mut pet = PetData::new(0);
        assert_eq!(toggle_wearable(&mut pet, "hat").unwrap_err().code(), "invalid_input");

        pet.coins = 40;
        purchase(&mut pet, "hat").unwrap();
        assert!(toggle_wearable(&mut pet, "hat").unwrap());
        assert_eq!(pet.active_items, vec!["hat".to_string()]);
        assert!(!toggle_wearable(&mut pet, "hat").unwrap());
        assert!(pet.active_items.is_empty());
    }

    #[test]
    fn toggle_wearable_rejects_non_wearables() {
        let mut pet = PetData::new(0);
        pet.inventory.push("background".to_string());
        let err = toggle_wearable(&mut pet, "background").unwrap_err();
        assert!(err.message().contains("not wearable"));
    }

    #[test]
    fn rename_rejects_blank_names() {
        let mut pet = PetData::new(0);
        assert!(rename(&mut pet, "   ").is_err());
        rename(&mut pet, " Mochi ").unwrap();
        assert_eq!(pet.name, "Mochi");
    }
}
