//! League entity model.
//!
//! Five record types make up a league: [`Team`], [`Standing`], [`GameResult`],
//! the directional [`HeadToHead`] tally table and [`LeagueConfig`]. Teams and
//! standings are keyed by [`OwnerKey`], the stable identifier of the
//! participant who owns the team.

use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use crate::persistence::now_timestamp;

/// Stable identifier of a league participant. An owner has at most one team.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerKey(String);

impl OwnerKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for OwnerKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Borrow<str> for OwnerKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Validation failures. Always recoverable; nothing is mutated when one is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("owner {0} already has a team")]
    OwnerTaken(OwnerKey),
    #[error("abbreviation {0} is already taken")]
    AbbreviationTaken(String),
    #[error("abbreviation {0:?} must be 2-3 letters")]
    InvalidAbbreviation(String),
    #[error("ties are not allowed ({0}-{0})")]
    TiedScore(u32),
    #[error("a team cannot play against itself")]
    SelfMatchup,
    #[error("winner score {winner} must be greater than loser score {loser}")]
    InvalidScore { winner: u32, loser: u32 },
    #[error("game has no winner or loser owner attached")]
    UnattributedGame,
    #[error("invalid value {value:?} for config key {key}")]
    InvalidConfigValue { key: String, value: String },
}

/// Normalize a team abbreviation to its stored form: 2-3 ASCII letters,
/// uppercase.
pub fn normalize_abbreviation(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if !(2..=3).contains(&len) || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidAbbreviation(raw.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

// ============================================================================
// Teams & standings
// ============================================================================

/// A registered team.
///
/// The file layout keeps `owner_id` inside the record as well as in the map
/// key; the map key is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub abbreviation: String,
    #[serde(rename = "owner", default, skip_serializing_if = "Option::is_none")]
    pub owner_label: Option<String>,
    pub owner_id: OwnerKey,
    #[serde(default)]
    pub created_at: u64,
}

/// Request to register a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTeam {
    pub owner_id: OwnerKey,
    pub name: String,
    pub abbreviation: String,
    pub owner_label: Option<String>,
    pub created_at: u64,
}

impl NewTeam {
    pub fn new(owner_id: OwnerKey, name: impl Into<String>, abbreviation: impl Into<String>) -> Self {
        Self {
            owner_id,
            name: name.into(),
            abbreviation: abbreviation.into(),
            owner_label: None,
            created_at: now_timestamp(),
        }
    }

    pub fn with_owner_label(mut self, label: impl Into<String>) -> Self {
        self.owner_label = Some(label.into());
        self
    }

    /// Validate the request and produce the team record to store.
    pub fn into_team(self) -> Result<Team, ValidationError> {
        let abbreviation = normalize_abbreviation(&self.abbreviation)?;
        Ok(Team {
            name: self.name,
            abbreviation,
            owner_label: self.owner_label,
            owner_id: self.owner_id,
            created_at: self.created_at,
        })
    }
}

impl From<&Team> for NewTeam {
    fn from(team: &Team) -> Self {
        Self {
            owner_id: team.owner_id.clone(),
            name: team.name.clone(),
            abbreviation: team.abbreviation.clone(),
            owner_label: team.owner_label.clone(),
            created_at: team.created_at,
        }
    }
}

/// Cumulative record of a team. Owned by the team with the same owner key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub points_for: u32,
    #[serde(default)]
    pub points_against: u32,
}

impl Standing {
    pub fn new(wins: u32, losses: u32, points_for: u32, points_against: u32) -> Self {
        Self {
            wins,
            losses,
            points_for,
            points_against,
        }
    }

    pub fn point_differential(&self) -> i64 {
        i64::from(self.points_for) - i64::from(self.points_against)
    }

    pub fn games_played(&self) -> u32 {
        self.wins.saturating_add(self.losses)
    }

    /// The standing after winning a game `scored` to `conceded`.
    pub fn with_win(&self, scored: u32, conceded: u32) -> Self {
        Self {
            wins: self.wins.saturating_add(1),
            losses: self.losses,
            points_for: self.points_for.saturating_add(scored),
            points_against: self.points_against.saturating_add(conceded),
        }
    }

    /// The standing after losing a game `scored` to `conceded`.
    pub fn with_loss(&self, scored: u32, conceded: u32) -> Self {
        Self {
            wins: self.wins,
            losses: self.losses.saturating_add(1),
            points_for: self.points_for.saturating_add(scored),
            points_against: self.points_against.saturating_add(conceded),
        }
    }
}

// ============================================================================
// Game results
// ============================================================================

/// An immutable record of a reported game.
///
/// Team names and abbreviations are captured when the game is recorded.
/// Owner references become `None` when the referenced team is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub week: u32,
    pub winner_id: Option<OwnerKey>,
    pub loser_id: Option<OwnerKey>,
    pub winner_team: String,
    pub winner_abbr: String,
    pub loser_team: String,
    pub loser_abbr: String,
    pub winner_score: u32,
    pub loser_score: u32,
    /// Unix seconds. Older documents carry an ISO-8601 string here instead.
    #[serde(rename = "date", default, deserialize_with = "deserialize_played_at")]
    pub played_at: u64,
}

fn deserialize_played_at<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDate {
        Seconds(u64),
        Text(String),
    }

    Ok(match RawDate::deserialize(deserializer)? {
        RawDate::Seconds(seconds) => seconds,
        RawDate::Text(text) => parse_iso_timestamp(&text).unwrap_or_else(|| {
            tracing::warn!(date = %text, "Unreadable game date, using 0");
            0
        }),
    })
}

/// Unix seconds for an ISO-8601 timestamp. Timestamps without an offset are
/// taken as UTC.
pub fn parse_iso_timestamp(text: &str) -> Option<u64> {
    let text = text.trim();
    let seconds = match chrono::DateTime::parse_from_rfc3339(text) {
        Ok(dt) => dt.timestamp(),
        Err(_) => text
            .parse::<chrono::NaiveDateTime>()
            .ok()?
            .and_utc()
            .timestamp(),
    };
    u64::try_from(seconds).ok()
}

impl GameResult {
    /// Build a game between two teams. Scores are given winner first.
    pub fn between(week: u32, winner: &Team, loser: &Team, winner_score: u32, loser_score: u32) -> Self {
        Self {
            week,
            winner_id: Some(winner.owner_id.clone()),
            loser_id: Some(loser.owner_id.clone()),
            winner_team: winner.name.clone(),
            winner_abbr: winner.abbreviation.clone(),
            loser_team: loser.name.clone(),
            loser_abbr: loser.abbreviation.clone(),
            winner_score,
            loser_score,
            played_at: now_timestamp(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.winner_score <= self.loser_score {
            return Err(ValidationError::InvalidScore {
                winner: self.winner_score,
                loser: self.loser_score,
            });
        }
        Ok(())
    }

    /// Both owner keys, for games that still reference live teams.
    pub fn participants(&self) -> Result<(&OwnerKey, &OwnerKey), ValidationError> {
        match (&self.winner_id, &self.loser_id) {
            (Some(winner), Some(loser)) if winner == loser => Err(ValidationError::SelfMatchup),
            (Some(winner), Some(loser)) => Ok((winner, loser)),
            _ => Err(ValidationError::UnattributedGame),
        }
    }

    pub fn involves(&self, owner: &OwnerKey) -> bool {
        self.winner_id.as_ref() == Some(owner) || self.loser_id.as_ref() == Some(owner)
    }
}

// ============================================================================
// Head-to-head
// ============================================================================

/// Directional win tallies: `wins(a, b)` counts how often `a` has beaten `b`.
///
/// The pair `(a, b)` and its reverse `(b, a)` are independent entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadToHead {
    tallies: BTreeMap<OwnerKey, BTreeMap<OwnerKey, u32>>,
}

impl HeadToHead {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more win of `winner` over `loser`.
    pub fn record_win(&mut self, winner: &OwnerKey, loser: &OwnerKey) {
        *self
            .tallies
            .entry(winner.clone())
            .or_default()
            .entry(loser.clone())
            .or_insert(0) += 1;
    }

    /// Set the tally for a pair. A zero count removes the pair.
    pub fn insert(&mut self, winner: OwnerKey, loser: OwnerKey, wins: u32) {
        if wins == 0 {
            if let Some(row) = self.tallies.get_mut(&winner) {
                row.remove(&loser);
                if row.is_empty() {
                    self.tallies.remove(&winner);
                }
            }
            return;
        }
        self.tallies.entry(winner).or_default().insert(loser, wins);
    }

    pub fn wins(&self, winner: &OwnerKey, loser: &OwnerKey) -> u32 {
        self.tallies
            .get(winner)
            .and_then(|row| row.get(loser))
            .copied()
            .unwrap_or(0)
    }

    /// Whether `winner` has beaten `loser` at least once.
    pub fn has_beaten(&self, winner: &OwnerKey, loser: &OwnerKey) -> bool {
        self.wins(winner, loser) > 0
    }

    /// Number of directional pairs.
    pub fn len(&self) -> usize {
        self.tallies.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of all win counts.
    pub fn total_wins(&self) -> u64 {
        self.iter().map(|(_, _, wins)| u64::from(wins)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OwnerKey, &OwnerKey, u32)> + '_ {
        self.tallies.iter().flat_map(|(winner, row)| {
            row.iter().map(move |(loser, wins)| (winner, loser, *wins))
        })
    }

    /// Drop every pair involving `owner`. Returns whether anything changed.
    pub fn remove_owner(&mut self, owner: &OwnerKey) -> bool {
        let mut changed = self.tallies.remove(owner).is_some();
        for row in self.tallies.values_mut() {
            changed |= row.remove(owner).is_some();
        }
        self.tallies.retain(|_, row| !row.is_empty());
        changed
    }

    /// Move every pair involving `from` onto `to`, adding to any tally `to`
    /// already has. Returns whether anything changed.
    pub fn rekey_owner(&mut self, from: &OwnerKey, to: &OwnerKey) -> bool {
        let before = self.clone();
        let entries: Vec<(OwnerKey, OwnerKey, u32)> = self
            .iter()
            .map(|(w, l, n)| (w.clone(), l.clone(), n))
            .collect();
        self.tallies.clear();
        for (winner, loser, wins) in entries {
            let winner = if &winner == from { to.clone() } else { winner };
            let loser = if &loser == from { to.clone() } else { loser };
            *self
                .tallies
                .entry(winner)
                .or_default()
                .entry(loser)
                .or_insert(0) += wins;
        }
        *self != before
    }
}

/// The `"<winner>_<loser>"` key used by the file layout.
pub fn matchup_key(winner: &OwnerKey, loser: &OwnerKey) -> String {
    format!("{winner}_{loser}")
}

/// Parse a `"<winner>_<loser>"` key. Keys that do not split into exactly two
/// non-empty parts are rejected.
pub fn parse_matchup_key(key: &str) -> Option<(OwnerKey, OwnerKey)> {
    let mut parts = key.split('_');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(winner), Some(loser), None) if !winner.is_empty() && !loser.is_empty() => {
            Some((OwnerKey::from(winner), OwnerKey::from(loser)))
        }
        _ => None,
    }
}

// ============================================================================
// League configuration
// ============================================================================

pub const LEAGUE_NAME_KEY: &str = "league_name";
pub const SEASON_KEY: &str = "season";
pub const WEEK_KEY: &str = "week";
pub const ADMIN_ROLE_KEY: &str = "admin_role";

pub const DEFAULT_LEAGUE_NAME: &str = "Madden Franchise League";
pub const DEFAULT_ADMIN_ROLE: &str = "League Admin";

/// A single config value. `season` and `week` are always integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Int(i64),
    Text(String),
}

impl ConfigValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(v) => Some(*v),
            ConfigValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Parse a raw text value the way it would be stored under `key`.
    pub fn parse_for(key: &str, raw: &str) -> Result<Self, ValidationError> {
        normalize_config_value(key, ConfigValue::Text(raw.to_string()))
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Int(v) => write!(f, "{v}"),
            ConfigValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Int(v)
    }
}

impl From<u32> for ConfigValue {
    fn from(v: u32) -> Self {
        ConfigValue::Int(i64::from(v))
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Text(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::Text(v)
    }
}

fn is_numeric_key(key: &str) -> bool {
    key == SEASON_KEY || key == WEEK_KEY
}

/// Bring a value into its stored form for `key`: positive integers for
/// `season`/`week`, text for everything else.
pub fn normalize_config_value(key: &str, value: ConfigValue) -> Result<ConfigValue, ValidationError> {
    if !is_numeric_key(key) {
        return Ok(ConfigValue::Text(value.to_string()));
    }
    match value.as_int() {
        Some(n) if n >= 1 => Ok(ConfigValue::Int(n)),
        _ => Err(ValidationError::InvalidConfigValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// League-wide settings. Always contains the four well-known keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueConfig {
    values: BTreeMap<String, ConfigValue>,
}

impl Default for LeagueConfig {
    fn default() -> Self {
        let mut values = BTreeMap::new();
        values.insert(LEAGUE_NAME_KEY.to_string(), ConfigValue::from(DEFAULT_LEAGUE_NAME));
        values.insert(SEASON_KEY.to_string(), ConfigValue::Int(1));
        values.insert(WEEK_KEY.to_string(), ConfigValue::Int(1));
        values.insert(ADMIN_ROLE_KEY.to_string(), ConfigValue::from(DEFAULT_ADMIN_ROLE));
        Self { values }
    }
}

impl LeagueConfig {
    /// Overlay stored values on the defaults. Values that cannot be normalized
    /// for their key are dropped in favour of the default.
    pub fn from_values<I>(stored: I) -> Self
    where
        I: IntoIterator<Item = (String, ConfigValue)>,
    {
        let mut config = Self::default();
        for (key, value) in stored {
            match normalize_config_value(&key, value) {
                Ok(value) => {
                    config.values.insert(key, value);
                }
                Err(e) => tracing::warn!(key = %key, "Ignoring stored config value: {}", e),
            }
        }
        config
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    /// Upsert a key after normalizing its value.
    pub fn set(&mut self, key: &str, value: ConfigValue) -> Result<(), ValidationError> {
        let value = normalize_config_value(key, value)?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    pub fn league_name(&self) -> &str {
        self.text(LEAGUE_NAME_KEY, DEFAULT_LEAGUE_NAME)
    }

    pub fn admin_role(&self) -> &str {
        self.text(ADMIN_ROLE_KEY, DEFAULT_ADMIN_ROLE)
    }

    pub fn season(&self) -> u32 {
        self.number(SEASON_KEY)
    }

    pub fn week(&self) -> u32 {
        self.number(WEEK_KEY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn text<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.values.get(key) {
            Some(ConfigValue::Text(s)) => s,
            _ => default,
        }
    }

    fn number(&self, key: &str) -> u32 {
        self.values
            .get(key)
            .and_then(ConfigValue::as_int)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(1)
    }
}
