use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradecraft_core::{DomainError, DomainResult, Entity, FactionId, ProfileId, UserId};

/// Assessed threat posture of a faction.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    #[default]
    Dormant,
    Nominal,
    Elevated,
    Severe,
    Critical,
}

impl ThreatLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreatLevel::Dormant => "DORMANT",
            ThreatLevel::Nominal => "NOMINAL",
            ThreatLevel::Elevated => "ELEVATED",
            ThreatLevel::Severe => "SEVERE",
            ThreatLevel::Critical => "CRITICAL",
        }
    }
}

impl core::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How closely a profile is tied to a faction.
///
/// Wire names are the human-readable labels carried over from the legacy
/// data set, not SCREAMING_SNAKE identifiers.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Affiliation {
    Leader,
    #[serde(rename = "High ranking member")]
    HighRankingMember,
    Member,
    #[default]
    Associate,
    Hangaround,
    Affiliate,
    Supporter,
    Informant,
    Unknown,
}

impl Affiliation {
    pub const ALL: [Affiliation; 9] = [
        Affiliation::Leader,
        Affiliation::HighRankingMember,
        Affiliation::Member,
        Affiliation::Associate,
        Affiliation::Hangaround,
        Affiliation::Affiliate,
        Affiliation::Supporter,
        Affiliation::Informant,
        Affiliation::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Affiliation::Leader => "Leader",
            Affiliation::HighRankingMember => "High ranking member",
            Affiliation::Member => "Member",
            Affiliation::Associate => "Associate",
            Affiliation::Hangaround => "Hangaround",
            Affiliation::Affiliate => "Affiliate",
            Affiliation::Supporter => "Supporter",
            Affiliation::Informant => "Informant",
            Affiliation::Unknown => "Unknown",
        }
    }

    /// Lenient intake: exact label match after trimming, anything else
    /// falls back to the Associate default. Never fails.
    pub fn normalize(input: &str) -> Affiliation {
        let input = input.trim();
        Self::ALL
            .into_iter()
            .find(|affiliation| affiliation.as_str() == input)
            .unwrap_or_default()
    }
}

impl core::fmt::Display for Affiliation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One profile's standing inside one faction. Unique per (faction, profile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub profile_id: ProfileId,
    pub affiliation: Affiliation,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(profile_id: ProfileId, affiliation: Affiliation, now: DateTime<Utc>) -> Self {
        Self {
            profile_id,
            affiliation,
            added_at: now,
            updated_at: now,
        }
    }
}

/// Point-in-time record of a faction's key indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub threat_level: ThreatLevel,
    pub member_count: usize,
    pub updated_by: UserId,
    pub timestamp: DateTime<Utc>,
}

/// A tracked criminal faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    id: FactionId,
    name: String,
    threat_level: ThreatLevel,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    archived_at: Option<DateTime<Utc>>,
}

impl Faction {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("faction name cannot be empty"));
        }
        let now = Utc::now();
        Ok(Self {
            id: FactionId::new(),
            name,
            threat_level: ThreatLevel::default(),
            description: description.into(),
            created_at: now,
            updated_at: now,
            archived_at: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threat_level(&self) -> ThreatLevel {
        self.threat_level
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    pub fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.archived_at
    }

    pub(crate) fn rename(&mut self, name: String, now: DateTime<Utc>) -> DomainResult<()> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("faction name cannot be empty"));
        }
        self.name = name;
        self.touch(now);
        Ok(())
    }

    pub(crate) fn set_threat_level(&mut self, level: ThreatLevel, now: DateTime<Utc>) {
        self.threat_level = level;
        self.touch(now);
    }

    pub(crate) fn set_description(&mut self, description: String, now: DateTime<Utc>) {
        self.description = description;
        self.touch(now);
    }

    pub(crate) fn archive(&mut self, now: DateTime<Utc>) {
        self.archived_at = Some(now);
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl Entity for Faction {
    type Id = FactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_faction_defaults_to_dormant() {
        let faction = Faction::new("The Hollow Crown", "").unwrap();
        assert_eq!(faction.threat_level(), ThreatLevel::Dormant);
        assert!(!faction.is_archived());
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(matches!(
            Faction::new("   ", ""),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn affiliation_normalizes_known_labels() {
        assert_eq!(Affiliation::normalize("Leader"), Affiliation::Leader);
        assert_eq!(
            Affiliation::normalize("  High ranking member  "),
            Affiliation::HighRankingMember
        );
        assert_eq!(Affiliation::normalize("Informant"), Affiliation::Informant);
    }

    #[test]
    fn unrecognized_affiliation_falls_back_to_associate() {
        assert_eq!(Affiliation::normalize(""), Affiliation::Associate);
        assert_eq!(Affiliation::normalize("Capo"), Affiliation::Associate);
        assert_eq!(Affiliation::normalize("leader"), Affiliation::Associate);
    }

    #[test]
    fn affiliation_serializes_with_legacy_labels() {
        let json = serde_json::to_string(&Affiliation::HighRankingMember).unwrap();
        assert_eq!(json, "\"High ranking member\"");
        let back: Affiliation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Affiliation::HighRankingMember);
    }
}
