//! Permission gate.
//!
//! [`allowed`] is a pure function of a [`PermissionContext`] and the target's
//! type id. The context is rebuilt for every request from live requester
//! state and the settings snapshot in force for that request.

use crate::config::Settings;
use crate::types::ItemStack;
use crate::world::{EquipSlot, RequesterProfile};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct PermissionContext {
    pub requester_id: String,
    pub requires_wearable: bool,
    pub wearable_present: bool,
    pub banned_types: BTreeSet<String>,
}

impl PermissionContext {
    pub fn for_requester(requester: &RequesterProfile, settings: &Settings) -> Self {
        let policy = ViewerPolicy::new(&settings.viewer_items);
        Self {
            requester_id: requester.id.clone(),
            requires_wearable: settings.requires_wearable,
            wearable_present: policy.wearable_present(&requester.equipment),
            banned_types: settings.banned_types.clone(),
        }
    }
}

/// Rules, first failing rule denies:
/// 1. a wearable is required but not worn;
/// 2. the target type is banned.
pub fn allowed(ctx: &PermissionContext, target_type: &str) -> bool {
    if ctx.requires_wearable && !ctx.wearable_present {
        return false;
    }
    !ctx.banned_types.contains(target_type)
}

// ---------------------------------------------------------------------------
// Viewer capability
// ---------------------------------------------------------------------------

/// Decides whether worn equipment carries the viewer capability.
///
/// "Grants the query capability" and "can be worn in this slot" are checked
/// separately; an item counts only if both hold.
pub struct ViewerPolicy<'a> {
    viewer_items: &'a BTreeSet<String>,
}

impl<'a> ViewerPolicy<'a> {
    pub fn new(viewer_items: &'a BTreeSet<String>) -> Self {
        Self { viewer_items }
    }

    pub fn grants_query(&self, item: &ItemStack) -> bool {
        self.viewer_items.contains(&item.item_id)
    }

    /// Viewer items sit on the head or in an accessory slot.
    pub fn is_equippable(&self, _item: &ItemStack, slot: EquipSlot) -> bool {
        matches!(slot, EquipSlot::Head | EquipSlot::Accessory(_))
    }

    pub fn wearable_present(&self, equipment: &[(EquipSlot, ItemStack)]) -> bool {
        equipment
            .iter()
            .any(|(slot, item)| item.count > 0 && self.is_equippable(item, *slot) && self.grants_query(item))
    }
}
