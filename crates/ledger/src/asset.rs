use serde::{Deserialize, Serialize};

use tradecraft_core::{AssetId, DomainError, DomainResult, Entity};

/// Category of an allocatable asset.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetKind {
    Vehicle,
    Property,
    Financial,
    Equipment,
    Intel,
}

/// Allocation state of an asset.
///
/// `ALLOCATED` is reachable only via requisition approval; `AVAILABLE` is
/// restored only by explicit release on operation conclusion or abort.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetStatus {
    Available,
    Allocated,
    Maintenance,
    Compromised,
    Destroyed,
}

/// An allocatable resource tracked by the ledger.
///
/// Asset lifetime is independent of any single operation; the same asset is
/// reused across operations over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    pub kind: AssetKind,
    pub status: AssetStatus,
}

impl Asset {
    /// Register a new asset, initially AVAILABLE.
    pub fn new(name: impl Into<String>, kind: AssetKind) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("asset name cannot be empty"));
        }
        Ok(Self {
            id: AssetId::new(),
            name,
            kind,
            status: AssetStatus::Available,
        })
    }

    pub fn is_available(&self) -> bool {
        self.status == AssetStatus::Available
    }
}

impl Entity for Asset {
    type Id = AssetId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_asset_starts_available() {
        let asset = Asset::new("Safehouse 12", AssetKind::Property).unwrap();
        assert!(asset.is_available());
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(matches!(
            Asset::new("   ", AssetKind::Vehicle),
            Err(DomainError::Validation(_))
        ));
    }
}
