use crate::error::ImportError;
use serde::Deserialize;

/// Longest key or location name accepted from a scanner export.
pub const MAX_KEY_LENGTH: usize = 64;

pub const SLOTS: [&str; 5] = ["flower", "plume", "sands", "goblet", "circlet"];

pub const MAIN_STATS: [&str; 17] = [
    "hp",
    "atk",
    "hp_",
    "atk_",
    "def_",
    "eleMas",
    "enerRech_",
    "heal_",
    "critRate_",
    "critDMG_",
    "physical_dmg_",
    "anemo_dmg_",
    "geo_dmg_",
    "electro_dmg_",
    "hydro_dmg_",
    "pyro_dmg_",
    "cryo_dmg_",
];

pub const SUB_STATS: [&str; 10] = [
    "hp",
    "hp_",
    "atk",
    "atk_",
    "def",
    "def_",
    "enerRech_",
    "eleMas",
    "critRate_",
    "critDMG_",
];

const MAX_SUB_STATS: usize = 4;
const MAX_LEVEL: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rarity {
    Grey = 1,
    Green = 2,
    Blue = 3,
    Purple = 4,
    Gold = 5,
}

impl Rarity {
    pub fn from_stars(stars: u8) -> Option<Self> {
        match stars {
            1 => Some(Rarity::Grey),
            2 => Some(Rarity::Green),
            3 => Some(Rarity::Blue),
            4 => Some(Rarity::Purple),
            5 => Some(Rarity::Gold),
            _ => None,
        }
    }

    pub fn stars(&self) -> u8 {
        *self as u8
    }

    pub fn max_level(&self) -> u32 {
        match self {
            Rarity::Grey | Rarity::Green => 4,
            Rarity::Blue => 12,
            Rarity::Purple => 16,
            Rarity::Gold => 20,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScanData {
    pub artifacts: Vec<ScannedArtifact>,
    pub weapons: Vec<ScannedWeapon>,
    pub characters: Vec<ScannedCharacter>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedArtifact {
    pub set_key: String,
    pub slot_key: String,
    pub level: u32,
    pub rarity: u8,
    pub main_stat_key: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub lock: bool,
    #[serde(default)]
    pub substats: Vec<ScannedSubStat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannedSubStat {
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedWeapon {
    pub key: String,
    pub level: u32,
    #[serde(default)]
    pub ascension: u32,
    #[serde(default = "default_refinement")]
    pub refinement: u32,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub lock: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedCharacter {
    pub key: String,
    pub level: u32,
    #[serde(default)]
    pub constellation: u32,
    #[serde(default)]
    pub ascension: u32,
    #[serde(default)]
    pub talent: Talent,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Talent {
    pub auto: u32,
    pub skill: u32,
    pub burst: u32,
}

fn default_refinement() -> u32 {
    1
}

/// An artifact that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub set_key: String,
    pub slot_key: String,
    pub rarity: Rarity,
    pub level: u32,
    pub main_stat_key: String,
    pub location: String,
    pub locked: bool,
    pub substats: Vec<(String, f64)>,
}

impl ScanData {
    pub fn parse(bytes: &[u8]) -> Result<Self, ImportError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty() && self.weapons.is_empty() && self.characters.is_empty()
    }

    pub fn validate(&self) -> Result<Vec<Artifact>, ImportError> {
        if self.is_empty() {
            return Err(ImportError::Empty);
        }

        for (i, weapon) in self.weapons.iter().enumerate() {
            let item = || format!("weapon #{}", i + 1);
            check_length(&weapon.key, "key", item)?;
            check_length(&weapon.location, "location", item)?;
            validate_weapon(weapon)?;
        }
        for (i, character) in self.characters.iter().enumerate() {
            check_length(&character.key, "key", || format!("character #{}", i + 1))?;
            validate_character(character)?;
        }

        self.artifacts
            .iter()
            .enumerate()
            .map(|(i, artifact)| validate_artifact(i + 1, artifact))
            .collect()
    }
}

fn check_length(
    value: &str,
    field: &'static str,
    item: impl FnOnce() -> String,
) -> Result<(), ImportError> {
    if value.chars().count() > MAX_KEY_LENGTH {
        return Err(ImportError::KeyTooLong {
            item: item(),
            field,
            max: MAX_KEY_LENGTH,
        });
    }
    Ok(())
}

fn validate_artifact(index: usize, artifact: &ScannedArtifact) -> Result<Artifact, ImportError> {
    let item = || format!("artifact #{}", index);
    check_length(&artifact.set_key, "setKey", item)?;
    check_length(&artifact.slot_key, "slotKey", item)?;
    check_length(&artifact.main_stat_key, "mainStatKey", item)?;
    check_length(&artifact.location, "location", item)?;
    for sub in &artifact.substats {
        check_length(&sub.key, "substat key", item)?;
    }

    let rarity = Rarity::from_stars(artifact.rarity).ok_or(ImportError::InvalidRarity {
        index,
        rarity: artifact.rarity,
    })?;

    if !SLOTS.contains(&artifact.slot_key.as_str()) {
        return Err(ImportError::UnknownSlot {
            index,
            slot: artifact.slot_key.clone(),
        });
    }

    if !MAIN_STATS.contains(&artifact.main_stat_key.as_str()) {
        return Err(ImportError::UnknownMainStat {
            index,
            key: artifact.main_stat_key.clone(),
        });
    }

    if artifact.level > rarity.max_level() {
        return Err(ImportError::LevelOutOfRange {
            index,
            level: artifact.level,
            max: rarity.max_level(),
        });
    }

    // scanners pad missing sub stats with empty keys
    let substats: Vec<(String, f64)> = artifact
        .substats
        .iter()
        .filter(|sub| !sub.key.is_empty())
        .map(|sub| (sub.key.clone(), sub.value))
        .collect();

    if substats.len() > MAX_SUB_STATS {
        return Err(ImportError::TooManySubStats {
            index,
            count: substats.len(),
        });
    }

    if let Some((key, _)) = substats
        .iter()
        .find(|(key, _)| !SUB_STATS.contains(&key.as_str()))
    {
        return Err(ImportError::UnknownSubStat {
            index,
            key: key.clone(),
        });
    }

    Ok(Artifact {
        set_key: artifact.set_key.clone(),
        slot_key: artifact.slot_key.clone(),
        rarity,
        level: artifact.level,
        main_stat_key: artifact.main_stat_key.clone(),
        location: artifact.location.clone(),
        locked: artifact.lock,
        substats,
    })
}

fn validate_weapon(weapon: &ScannedWeapon) -> Result<(), ImportError> {
    let reason = if weapon.level == 0 || weapon.level > MAX_LEVEL {
        "level must be between 1 and 90"
    } else if weapon.refinement == 0 || weapon.refinement > 5 {
        "refinement must be between 1 and 5"
    } else if weapon.ascension > 6 {
        "ascension must be at most 6"
    } else {
        return Ok(());
    };

    Err(ImportError::InvalidWeapon {
        key: weapon.key.clone(),
        reason,
    })
}

fn validate_character(character: &ScannedCharacter) -> Result<(), ImportError> {
    let reason = if character.level == 0 || character.level > MAX_LEVEL {
        "level must be between 1 and 90"
    } else if character.constellation > 6 {
        "constellation must be at most 6"
    } else if character.ascension > 6 {
        "ascension must be at most 6"
    } else {
        return Ok(());
    };

    Err(ImportError::InvalidCharacter {
        key: character.key.clone(),
        reason,
    })
}

/// Human readable name of a stat key.
pub fn stat_name(key: &str) -> &str {
    match key {
        "hp" | "hp_" => "HP",
        "atk" | "atk_" => "ATK",
        "def" | "def_" => "DEF",
        "enerRech_" => "Energy Recharge",
        "eleMas" => "Elemental Mastery",
        "critRate_" => "Crit Rate",
        "critDMG_" => "Crit DMG",
        "heal_" => "Healing Bonus",
        "physical_dmg_" => "Physical DMG Bonus",
        "anemo_dmg_" => "Anemo DMG Bonus",
        "geo_dmg_" => "Geo DMG Bonus",
        "electro_dmg_" => "Electro DMG Bonus",
        "hydro_dmg_" => "Hydro DMG Bonus",
        "pyro_dmg_" => "Pyro DMG Bonus",
        "cryo_dmg_" => "Cryo DMG Bonus",
        other => other,
    }
}

/// Formats a stat the way the game shows it, e.g. `Crit Rate: 3.9%` or `HP: 4,780`.
///
/// Keys ending in `_` are percentages.
pub fn format_stat(key: &str, value: f64) -> String {
    let name = stat_name(key);
    if key.ends_with('_') {
        format!("{}: {:.1}%", name, value)
    } else {
        format!("{}: {}", name, crate::utils::format::thousands(value.round() as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCAN: &str = r#"{
        "format": "GOOD",
        "version": 1,
        "artifacts": [
            {
                "setKey": "OceanHuedClam",
                "slotKey": "flower",
                "level": 20,
                "rarity": 5,
                "mainStatKey": "hp",
                "location": "SangonomiyaKokomi",
                "lock": true,
                "substats": [
                    {"key": "critRate_", "value": 3.9},
                    {"key": "hp_", "value": 14.6},
                    {"key": "def", "value": 23},
                    {"key": "", "value": 0}
                ]
            }
        ],
        "weapons": [
            {"key": "EverlastingMoonglow", "level": 90, "ascension": 6, "refinement": 1, "location": "SangonomiyaKokomi", "lock": true}
        ],
        "characters": [
            {"key": "SangonomiyaKokomi", "level": 90, "constellation": 0, "ascension": 6, "talent": {"auto": 6, "skill": 9, "burst": 9}}
        ]
    }"#;

    #[test]
    fn parses_scanner_export() {
        let scan = ScanData::parse(SCAN.as_bytes()).unwrap();
        assert_eq!(scan.weapons.len(), 1);
        assert_eq!(scan.characters[0].talent.skill, 9);

        let artifacts = scan.validate().unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].rarity, Rarity::Gold);
        // the padded empty sub stat is dropped
        assert_eq!(artifacts[0].substats.len(), 3);
        assert!(artifacts[0].locked);
    }

    #[test]
    fn decode_error_is_reported() {
        let err = ScanData::parse(b"{not json").unwrap_err();
        assert!(matches!(err, ImportError::Decode(_)));
    }

    #[test]
    fn empty_export_is_refused() {
        let scan = ScanData::parse(b"{}").unwrap();
        assert!(matches!(scan.validate(), Err(ImportError::Empty)));
    }

    #[test]
    fn rejects_level_above_rarity_cap() {
        let json = SCAN.replace("\"rarity\": 5", "\"rarity\": 4");
        let scan = ScanData::parse(json.as_bytes()).unwrap();
        assert!(matches!(
            scan.validate(),
            Err(ImportError::LevelOutOfRange { index: 1, level: 20, max: 16 })
        ));
    }

    #[test]
    fn rejects_unknown_slot_and_stats() {
        let json = SCAN.replace("\"flower\"", "\"hat\"");
        let scan = ScanData::parse(json.as_bytes()).unwrap();
        assert!(matches!(scan.validate(), Err(ImportError::UnknownSlot { .. })));

        let json = SCAN.replace("\"critRate_\"", "\"heal_\"");
        let scan = ScanData::parse(json.as_bytes()).unwrap();
        assert!(matches!(scan.validate(), Err(ImportError::UnknownSubStat { .. })));

        let json = SCAN.replace("\"mainStatKey\": \"hp\"", "\"mainStatKey\": \"def\"");
        let scan = ScanData::parse(json.as_bytes()).unwrap();
        assert!(matches!(scan.validate(), Err(ImportError::UnknownMainStat { .. })));
    }

    #[test]
    fn rejects_overlong_keys() {
        let long = "A".repeat(2500);

        let json = SCAN.replace("\"OceanHuedClam\"", &format!("\"{}\"", long));
        let scan = ScanData::parse(json.as_bytes()).unwrap();
        let err = scan.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "artifact #1: setKey is longer than 64 characters"
        );

        let json = SCAN.replace("\"flower\"", &format!("\"{}\"", long));
        let scan = ScanData::parse(json.as_bytes()).unwrap();
        assert!(matches!(
            scan.validate(),
            Err(ImportError::KeyTooLong { field: "slotKey", .. })
        ));

        let json = SCAN.replace("\"EverlastingMoonglow\"", &format!("\"{}\"", long));
        let scan = ScanData::parse(json.as_bytes()).unwrap();
        assert_eq!(
            scan.validate().unwrap_err().to_string(),
            "weapon #1: key is longer than 64 characters"
        );

        let json = SCAN.replace(
            "{\"key\": \"SangonomiyaKokomi\"",
            &format!("{{\"key\": \"{}\"", long),
        );
        let scan = ScanData::parse(json.as_bytes()).unwrap();
        assert_eq!(
            scan.validate().unwrap_err().to_string(),
            "character #1: key is longer than 64 characters"
        );
    }

    #[test]
    fn rejects_invalid_rarity() {
        let json = SCAN.replace("\"rarity\": 5", "\"rarity\": 6");
        let scan = ScanData::parse(json.as_bytes()).unwrap();
        assert!(matches!(
            scan.validate(),
            Err(ImportError::InvalidRarity { rarity: 6, .. })
        ));
    }

    #[test]
    fn rejects_bad_weapon_refinement() {
        let json = SCAN.replace("\"refinement\": 1", "\"refinement\": 9");
        let scan = ScanData::parse(json.as_bytes()).unwrap();
        let err = scan.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "weapon 'EverlastingMoonglow': refinement must be between 1 and 5"
        );
    }

    #[test]
    fn formats_stats() {
        assert_eq!(format_stat("critRate_", 3.9), "Crit Rate: 3.9%");
        assert_eq!(format_stat("hp", 4780.0), "HP: 4,780");
        assert_eq!(format_stat("eleMas", 23.0), "Elemental Mastery: 23");
        assert_eq!(format_stat("hydro_dmg_", 46.6), "Hydro DMG Bonus: 46.6%");
    }
}
