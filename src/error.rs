/// Reasons a scanner export is refused by `/data import`.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("could not decode file: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("file contains no artifacts, weapons or characters")]
    Empty,

    #[error("artifact #{index}: rarity {rarity} is not between 1 and 5")]
    InvalidRarity { index: usize, rarity: u8 },

    #[error("artifact #{index}: unknown slot '{slot}'")]
    UnknownSlot { index: usize, slot: String },

    #[error("artifact #{index}: unknown main stat '{key}'")]
    UnknownMainStat { index: usize, key: String },

    #[error("artifact #{index}: unknown sub stat '{key}'")]
    UnknownSubStat { index: usize, key: String },

    #[error("artifact #{index}: {count} sub stats, at most 4 are possible")]
    TooManySubStats { index: usize, count: usize },

    #[error("artifact #{index}: level {level} is above the maximum of {max}")]
    LevelOutOfRange { index: usize, level: u32, max: u32 },

    #[error("{item}: {field} is longer than {max} characters")]
    KeyTooLong {
        item: String,
        field: &'static str,
        max: usize,
    },

    #[error("weapon '{key}': {reason}")]
    InvalidWeapon { key: String, reason: &'static str },

    #[error("character '{key}': {reason}")]
    InvalidCharacter { key: String, reason: &'static str },
}

/// Reasons a module cannot be loaded, unloaded or reloaded.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("no module named `{0}`")]
    Unknown(String),

    #[error("`{0}` is already loaded")]
    AlreadyLoaded(&'static str),

    #[error("`{0}` is not loaded")]
    NotLoaded(&'static str),

    #[error("`{0}` cannot be unloaded")]
    Protected(&'static str),

    #[error("{0:#}")]
    Failed(#[from] anyhow::Error),
}
