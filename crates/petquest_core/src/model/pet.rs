use serde::{Deserialize, Serialize};

pub const STAT_CEILING: f64 = 100.0;
pub const DEFAULT_PET_NAME: &str = "My Pet";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetData {
    pub name: String,
    pub health: f64,
    pub happiness: f64,
    pub hunger: f64,
    pub energy: f64,
    pub max_health: f64,
    pub max_happiness: f64,
    /// Cached; see `economy::growth_stage`.
    pub growth_stage: u8,
    pub coins: u64,
    pub inventory: Vec<String>,
    pub active_items: Vec<String>,
    pub last_stat_update: i64,
    pub decay_multiplier: f64,
    pub items_used: u32,
    pub total_tasks_completed: u32,
    pub total_time_spent: i64,
}

impl PetData {
    pub fn new(now: i64) -> Self {
        Self {
            name: DEFAULT_PET_NAME.to_string(),
            health: STAT_CEILING,
            happiness: STAT_CEILING,
            hunger: STAT_CEILING,
            energy: STAT_CEILING,
            max_health: STAT_CEILING,
            max_happiness: STAT_CEILING,
            growth_stage: 0,
            coins: 0,
            inventory: Vec::new(),
            active_items: Vec::new(),
            last_stat_update: now,
            decay_multiplier: 1.0,
            items_used: 0,
            total_tasks_completed: 0,
            total_time_spent: 0,
        }
    }

    pub fn average_stat(&self) -> f64 {
        (self.health + self.happiness + self.hunger + self.energy) / 4.0
    }

    pub fn owns(&self, item_id: &str) -> bool {
        self.inventory.iter().any(|owned| owned == item_id)
    }
}
