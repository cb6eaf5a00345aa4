use crate::clock::Clock;
use crate::economy::{self, PurchaseOutcome};
use crate::error::AppError;
use crate::model::PetData;
use crate::shop::{CATALOG, ItemCategory, ShopItem};
use crate::storage::json_store;
use crate::task_api::{load, mutate};
use serde::Serialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PetStatus {
    pub pet: PetData,
    pub stage_name: &'static str,
    pub average_stat: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquipOutcome {
    pub item_id: String,
    pub active: bool,
}

/// Pet state as of now, with decay applied. Reading does not write the
/// record back.
pub fn pet_status() -> Result<PetStatus, AppError> {
    let path = json_store::store_path()?;
    pet_status_with_path(&path, Clock::system())
}

pub fn buy_item(item_id: &str) -> Result<PurchaseOutcome, AppError> {
    let path = json_store::store_path()?;
    buy_item_with_path(&path, item_id, Clock::system())
}

pub fn equip_item(item_id: &str) -> Result<EquipOutcome, AppError> {
    let path = json_store::store_path()?;
    equip_item_with_path(&path, item_id, Clock::system())
}

pub fn rename_pet(name: &str) -> Result<PetData, AppError> {
    let path = json_store::store_path()?;
    rename_pet_with_path(&path, name, Clock::system())
}

pub fn catalog(category: Option<ItemCategory>) -> Vec<&'static ShopItem> {
    CATALOG
        .iter()
        .filter(|item| category.is_none_or(|wanted| item.category == wanted))
        .collect()
}

pub fn parse_category(raw: &str) -> Result<ItemCategory, AppError> {
    let trimmed = raw.trim().to_ascii_lowercase();
    [
        ItemCategory::Food,
        ItemCategory::Toys,
        ItemCategory::Treats,
        ItemCategory::Decorations,
        ItemCategory::Upgrades,
    ]
    .into_iter()
    .find(|category| category.label() == trimmed)
    .ok_or_else(|| AppError::invalid_input(format!("unknown category: {}", raw.trim())))
}

fn pet_status_with_path(path: &Path, clock: Clock) -> Result<PetStatus, AppError> {
    let pet = load(path, clock)?.pet_data;
    Ok(PetStatus {
        stage_name: economy::growth_stage_name(pet.growth_stage),
        average_stat: pet.average_stat(),
        pet,
    })
}

fn buy_item_with_path(path: &Path, item_id: &str, clock: Clock) -> Result<PurchaseOutcome, AppError> {
    mutate(path, clock, |record| economy::purchase(&mut record.pet_data, item_id))
}

fn equip_item_with_path(path: &Path, item_id: &str, clock: Clock) -> Result<EquipOutcome, AppError> {
    mutate(path, clock, |record| {
        let active = economy::toggle_wearable(&mut record.pet_data, item_id)?;
        info!(item = item_id.trim(), active, "wearable toggled");
        Ok(EquipOutcome {
            item_id: item_id.trim().to_string(),
            active,
        })
    })
}

fn rename_pet_with_path(path: &Path, name: &str, clock: Clock) -> Result<PetData, AppError> {
    mutate(path, clock, |record| {
        economy::rename(&mut record.pet_data, name)?;
        Ok(record.pet_data.clone())
    })
}
