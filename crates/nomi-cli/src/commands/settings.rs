use std::path::Path;

use nomi_core::models::{AllThresholds, DrinkType, SettingsSnapshot, VolumePreset};
use serde::Serialize;

use crate::commands::common::{format_number, open_database};
use crate::error::CliError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView<'a> {
    pub volume_presets: &'a [VolumePreset],
    pub thresholds: &'a AllThresholds,
    pub drink_types: &'a [DrinkType],
    pub default_type_id: &'a str,
}

impl<'a> From<&'a SettingsSnapshot> for SettingsView<'a> {
    fn from(settings: &'a SettingsSnapshot) -> Self {
        Self {
            volume_presets: &settings.volume_presets,
            thresholds: &settings.thresholds,
            drink_types: &settings.drink_types,
            default_type_id: &settings.default_type_id,
        }
    }
}

pub async fn run_settings_show(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let settings = db.load_settings().await?;

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&SettingsView::from(&settings))?
        );
    } else {
        for line in format_settings_lines(&settings) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_settings_reset(db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    db.save_settings(&SettingsSnapshot::default()).await?;
    println!("Settings restored to defaults");
    Ok(())
}

pub fn format_settings_lines(settings: &SettingsSnapshot) -> Vec<String> {
    let mut lines = vec!["Drink types:".to_string()];
    lines.extend(settings.drink_types.iter().map(|drink_type| {
        let marker = if drink_type.id == settings.default_type_id {
            " (default)"
        } else {
            ""
        };
        let amount = drink_type
            .default_amount
            .map_or_else(String::new, |ml| format!(", {}ml", format_number(ml)));
        format!(
            "  {} {} [{}] {}%{amount}{marker}",
            drink_type.emoji,
            drink_type.name,
            drink_type.id,
            format_number(drink_type.percent)
        )
    }));

    let thresholds = &settings.thresholds;
    lines.push("Thresholds (g):".to_string());
    for (period, band) in [
        ("daily", thresholds.daily),
        ("weekly", thresholds.weekly),
        ("monthly", thresholds.monthly),
    ] {
        lines.push(format!(
            "  {period}: low <= {}, high > {}",
            format_number(band.low),
            format_number(band.high)
        ));
    }

    lines.push(format!("Volume presets: {}", settings.volume_presets.len()));
    lines.extend(
        settings
            .volume_presets
            .iter()
            .map(|preset| format!("  {}ml {}", format_number(preset.ml), preset.label)),
    );
    lines
}
