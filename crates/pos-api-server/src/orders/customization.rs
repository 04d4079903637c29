use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Requested amount of an ingredient relative to the standard recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomizationLevel {
    None,
    Light,
    Normal,
    Extra,
}

impl CustomizationLevel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "None",
            Self::Light => "Light",
            Self::Normal => "Normal",
            Self::Extra => "Extra",
        }
    }

    /// Notes line for one ingredient. `None` reads as "No Pearls" rather
    /// than "None Pearls"; `Normal` never appears in notes.
    pub fn notes_line(&self, ingredient_name: &str) -> Option<String> {
        match self {
            Self::Normal => Option::None,
            Self::None => Some(format!("No {}", ingredient_name)),
            other => Some(format!("{} {}", other.as_str(), ingredient_name)),
        }
    }
}

impl Default for CustomizationLevel {
    fn default() -> Self {
        Self::Normal
    }
}

/// Per-session map of (menu item, ingredient) -> level.
///
/// Entries default to Normal and Normal is never stored, so resetting an
/// item is simply dropping its entries. Scoped to one customization dialog
/// interaction: the owner resets the item on dialog close and after a
/// completed add-to-cart.
#[derive(Debug, Default)]
pub struct CustomizationStore {
    levels: HashMap<(String, i32), CustomizationLevel>,
}

impl CustomizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, menu_item_id: &str, ingredient_id: i32) -> CustomizationLevel {
        self.levels
            .get(&(menu_item_id.to_string(), ingredient_id))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_level(&mut self, menu_item_id: &str, ingredient_id: i32, level: CustomizationLevel) {
        let key = (menu_item_id.to_string(), ingredient_id);
        if level == CustomizationLevel::Normal {
            self.levels.remove(&key);
        } else {
            self.levels.insert(key, level);
        }
    }

    /// Return every ingredient of the item to Normal.
    pub fn reset_item(&mut self, menu_item_id: &str) {
        self.levels.retain(|(item, _), _| item != menu_item_id);
    }

    pub fn is_all_normal(&self) -> bool {
        self.levels.is_empty()
    }
}
