//! Point-in-time copies of a container's contents.
//!
//! A [`ContainerSnapshot`] is immutable once built. The plain variant keeps
//! the container's slot order and guarantees that no slot index appears
//! twice, both when constructed locally and when decoded off the wire.

use crate::error::SnapshotError;
use crate::types::ItemStack;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Plain slots
// ---------------------------------------------------------------------------

/// One occupied slot. The stack's `count` is the slot's quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotEntry {
    pub slot: u32,
    pub item: ItemStack,
}

impl SlotEntry {
    pub fn new(slot: u32, item: ItemStack) -> Self {
        Self { slot, item }
    }

    pub fn quantity(&self) -> u32 {
        self.item.count
    }
}

/// Ordered slot list with distinct slot indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SlotEntry>", into = "Vec<SlotEntry>")]
pub struct Slots(Vec<SlotEntry>);

impl Slots {
    pub fn new(entries: Vec<SlotEntry>) -> Result<Self, SnapshotError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.slot) {
                return Err(SnapshotError::DuplicateSlot(entry.slot));
            }
        }
        Ok(Self(entries))
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SlotEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[SlotEntry] {
        &self.0
    }
}

impl TryFrom<Vec<SlotEntry>> for Slots {
    type Error = SnapshotError;

    fn try_from(entries: Vec<SlotEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<Slots> for Vec<SlotEntry> {
    fn from(slots: Slots) -> Self {
        slots.0
    }
}

// ---------------------------------------------------------------------------
// Trade offers
// ---------------------------------------------------------------------------

/// One offer of a trading actor: what it wants, what it gives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOffer {
    pub buy: ItemStack,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_second: Option<ItemStack>,
    pub sell: ItemStack,
    /// Offer exhausted; still listed but not currently tradeable.
    #[serde(default)]
    pub disabled: bool,
}

impl TradeOffer {
    pub fn new(buy: ItemStack, sell: ItemStack) -> Self {
        Self {
            buy,
            buy_second: None,
            sell,
            disabled: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Plain,
    Trade,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContainerSnapshot {
    /// Ordinary inventory; `label` is the container's display name.
    Plain { label: String, slots: Slots },
    /// Trade-offer list; `label` is the offering party's name.
    Trade {
        label: String,
        offers: Vec<TradeOffer>,
    },
}

impl ContainerSnapshot {
    pub fn plain(label: impl Into<String>, entries: Vec<SlotEntry>) -> Result<Self, SnapshotError> {
        Ok(Self::Plain {
            label: label.into(),
            slots: Slots::new(entries)?,
        })
    }

    pub fn trade(label: impl Into<String>, offers: Vec<TradeOffer>) -> Self {
        Self::Trade {
            label: label.into(),
            offers,
        }
    }

    pub fn kind(&self) -> SnapshotKind {
        match self {
            Self::Plain { .. } => SnapshotKind::Plain,
            Self::Trade { .. } => SnapshotKind::Trade,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Plain { label, .. } | Self::Trade { label, .. } => label,
        }
    }

    /// Number of entries the overlay will lay out (slots or offers).
    pub fn len(&self) -> usize {
        match self {
            Self::Plain { slots, .. } => slots.len(),
            Self::Trade { offers, .. } => offers.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
