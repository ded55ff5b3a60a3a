//! User-customizable configuration sets
//!
//! Each set is stored and synchronized as one opaque JSON blob under a fixed
//! settings key; there is no field-level merge.

use serde::{Deserialize, Serialize};

/// Storage key for the remote endpoint URL (device-local, never synced).
pub const KEY_ENDPOINT_URL: &str = "nomi-log-gas-url";
/// Storage key for the last successful sync timestamp (device-local).
pub const KEY_LAST_SYNC: &str = "nomi-log-last-sync";
/// Storage key for volume presets.
pub const KEY_VOLUME_PRESETS: &str = "nomi-log-volume-presets";
/// Storage key for color thresholds.
pub const KEY_COLOR_THRESHOLDS: &str = "nomi-log-color-thresholds";
/// Storage key for custom drink types.
pub const KEY_DRINK_TYPES: &str = "nomi-log-drink-types";
/// Storage key for the default drink type id.
pub const KEY_DEFAULT_TYPE_ID: &str = "nomi-log-default-type-id";

/// Keys exchanged by settings push/pull, in wire order.
pub const SYNCED_SETTING_KEYS: [&str; 4] = [
    KEY_VOLUME_PRESETS,
    KEY_COLOR_THRESHOLDS,
    KEY_DRINK_TYPES,
    KEY_DEFAULT_TYPE_ID,
];

/// Drink type id used when nothing else was chosen.
pub const DEFAULT_TYPE_ID: &str = "beer";

/// A quick-pick serving size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumePreset {
    pub ml: f64,
    pub label: String,
}

/// Low/high grams-of-alcohol boundaries for one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorThresholds {
    /// At or below: low intake
    pub low: f64,
    /// At or below: moderate intake; above: high
    pub high: f64,
}

/// Thresholds for each aggregation period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllThresholds {
    pub daily: ColorThresholds,
    pub weekly: ColorThresholds,
    pub monthly: ColorThresholds,
}

impl Default for AllThresholds {
    fn default() -> Self {
        Self {
            daily: ColorThresholds {
                low: 20.0,
                high: 40.0,
            },
            weekly: ColorThresholds {
                low: 140.0,
                high: 280.0,
            },
            monthly: ColorThresholds {
                low: 600.0,
                high: 1200.0,
            },
        }
    }
}

/// A user-defined kind of drink with default strength and serving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrinkType {
    pub id: String,
    pub name: String,
    pub emoji: String,
    /// Typical alcohol by volume
    pub percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_amount: Option<f64>,
    /// Calorie coefficient (1.0 when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coef: Option<f64>,
}

impl DrinkType {
    fn builtin(
        id: &str,
        name: &str,
        emoji: &str,
        percent: f64,
        amount: Option<f64>,
        coef: f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            emoji: emoji.to_string(),
            percent,
            default_amount: amount,
            coef: Some(coef),
        }
    }

    /// Calorie coefficient, defaulting to 1.0.
    pub fn calorie_coefficient(&self) -> f64 {
        self.coef.unwrap_or(1.0)
    }
}

/// Built-in drink types used until the user customizes the list.
pub fn default_drink_types() -> Vec<DrinkType> {
    vec![
        DrinkType::builtin("beer", "Beer", "🍺", 5.0, Some(350.0), 1.5),
        DrinkType::builtin(
            "craft_beer",
            "Craft beer (IPA)",
            "🍺",
            7.0,
            Some(350.0),
            1.7,
        ),
        DrinkType::builtin("chu-hi", "Chu-hi / Sour", "🍋", 5.0, Some(350.0), 1.0),
        DrinkType::builtin("highball", "Highball", "🥃", 7.0, Some(350.0), 1.0),
        DrinkType::builtin("wine", "Wine", "🍷", 12.0, Some(120.0), 1.1),
        DrinkType::builtin("sake", "Sake", "🍶", 15.0, Some(180.0), 1.3),
        DrinkType::builtin("shochu", "Shochu", "🫗", 25.0, Some(60.0), 1.0),
        DrinkType::builtin("whisky", "Whisky", "🥃", 40.0, Some(30.0), 1.0),
        DrinkType::builtin("other", "Other", "🍸", 5.0, None, 1.0),
    ]
}

/// Built-in serving sizes used until the user customizes the list.
pub fn default_volume_presets() -> Vec<VolumePreset> {
    [
        (30.0, "Single / shot"),
        (45.0, "Jigger"),
        (60.0, "Double"),
        (90.0, "Half go (guinomi)"),
        (120.0, "Wine glass (small)"),
        (135.0, "Sake glass (0.75 go)"),
        (150.0, "Glass of wine"),
        (180.0, "One go"),
        (200.0, "Cup / small tokkuri"),
        (237.0, "US half pint / 8oz"),
        (240.0, "Half pint (JP)"),
        (250.0, "Tumbler"),
        (270.0, "One and a half go / large tokkuri"),
        (280.0, "Small mug"),
        (284.0, "UK half pint / 10oz"),
        (300.0, "Cold sake bottle"),
        (330.0, "Small bottle / can"),
        (350.0, "Beer can"),
        (355.0, "US can"),
        (360.0, "Two go"),
        (375.0, "Half bottle"),
        (420.0, "420ml"),
        (473.0, "US pint"),
        (500.0, "Tall can"),
        (510.0, "510ml"),
        (568.0, "UK pint / 20oz"),
        (633.0, "Large bottle"),
        (700.0, "Bottle"),
        (720.0, "Yongo bottle"),
        (750.0, "Wine bottle"),
        (1000.0, "1 liter"),
        (1800.0, "Issho bottle"),
    ]
    .into_iter()
    .map(|(ml, label)| VolumePreset {
        ml,
        label: label.to_string(),
    })
    .collect()
}

/// Effective values of the synchronized settings, defaults filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSnapshot {
    pub volume_presets: Vec<VolumePreset>,
    pub thresholds: AllThresholds,
    pub drink_types: Vec<DrinkType>,
    pub default_type_id: String,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            volume_presets: default_volume_presets(),
            thresholds: AllThresholds::default(),
            drink_types: default_drink_types(),
            default_type_id: DEFAULT_TYPE_ID.to_string(),
        }
    }
}

impl SettingsSnapshot {
    /// Find a drink type by id.
    pub fn drink_type(&self, id: &str) -> Option<&DrinkType> {
        self.drink_types.iter().find(|drink_type| drink_type.id == id)
    }
}
