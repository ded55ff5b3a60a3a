//! Data models for nomi-log

mod record;
mod settings;

pub use record::{
    logical_date, validate_date, validate_measurements, DrinkingRecord, NewRecord, RecordId,
    RecordPatch, DATE_FORMAT, DEFAULT_DAY_START_HOUR,
};
pub use settings::{
    default_drink_types, default_volume_presets, AllThresholds, ColorThresholds, DrinkType,
    SettingsSnapshot, VolumePreset, DEFAULT_TYPE_ID, KEY_COLOR_THRESHOLDS, KEY_DEFAULT_TYPE_ID,
    KEY_DRINK_TYPES, KEY_ENDPOINT_URL, KEY_LAST_SYNC, KEY_VOLUME_PRESETS, SYNCED_SETTING_KEYS,
};
