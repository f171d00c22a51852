use anyhow::{Context as _, Result};
use chrono::Weekday;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Domains open Monday through Saturday. Sunday opens everything.
const DOMAIN_DAYS: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct DailyData {
    pub domains: Domains,
    /// Talent book -> character -> element.
    pub talent_books: BTreeMap<String, BTreeMap<String, String>>,
    /// Optional emoji markup keyed by item or element name.
    #[serde(default)]
    pub emoji: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Domains {
    pub talent: Vec<Vec<String>>,
    pub weapon: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Availability<'a> {
    Everything,
    Rotation {
        talents: Vec<TalentDomain<'a>>,
        weapons: &'a [String],
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TalentDomain<'a> {
    pub book: &'a str,
    /// (character, element), ordered by name.
    pub characters: Vec<(&'a str, &'a str)>,
}

impl DailyData {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read daily data at {:?}", path))?;
        Self::parse(&content).with_context(|| format!("invalid daily data at {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let data: Self = serde_json::from_str(content)?;
        data.validate()?;
        Ok(data)
    }

    fn validate(&self) -> Result<()> {
        if self.domains.talent.len() != DOMAIN_DAYS || self.domains.weapon.len() != DOMAIN_DAYS {
            return Err(anyhow::anyhow!(
                "expected {} days of talent and weapon domains",
                DOMAIN_DAYS
            ));
        }

        for book in self.domains.talent.iter().flatten() {
            if !self.talent_books.contains_key(book) {
                return Err(anyhow::anyhow!("talent book '{}' has no characters", book));
            }
        }

        Ok(())
    }

    pub fn availability(&self, weekday: Weekday) -> Availability<'_> {
        let index = weekday.num_days_from_monday() as usize;
        if index >= DOMAIN_DAYS {
            return Availability::Everything;
        }

        let talents = self.domains.talent[index]
            .iter()
            .map(|book| TalentDomain {
                book,
                characters: self
                    .talent_books
                    .get(book)
                    .map(|chars| {
                        chars
                            .iter()
                            .map(|(name, element)| (name.as_str(), element.as_str()))
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();

        Availability::Rotation {
            talents,
            weapons: &self.domains.weapon[index],
        }
    }

    /// `"<emoji> "` for `key`, or an empty string when none is configured.
    pub fn emoji_prefix(&self, key: &str) -> String {
        self.emoji
            .get(key)
            .map(|e| format!("{} ", e))
            .unwrap_or_default()
    }
}
