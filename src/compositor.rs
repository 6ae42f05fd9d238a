//! Render compositor: cached snapshots → per-frame overlay draw lists.
//!
//! Output is a plain description of what to draw ([`Overlay`]); turning it
//! into pixels is the host renderer's job. The compositor only reads the
//! cache and never touches the network.

use crate::cache::SnapshotCache;
use crate::config::RenderConfig;
use crate::snapshot::{ContainerSnapshot, SlotEntry, TradeOffer};
use crate::types::{ItemStack, TargetId, Vec3};
use std::collections::HashMap;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Draw list
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ItemSprite {
    /// Stack to draw; `item.count` is the number shown.
    pub item: ItemStack,
    /// World-space centre of the sprite.
    pub position: Vec3,
    /// Rotation about the vertical axis, degrees.
    pub angle: f32,
    /// Trade offer that cannot currently be taken.
    pub dimmed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub target: TargetId,
    pub items: Vec<ItemSprite>,
    pub label: Option<Label>,
}

/// A target the host considers on screen this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleTarget {
    pub id: TargetId,
    /// Current world position of the top of the object.
    pub anchor: Vec3,
}

// ---------------------------------------------------------------------------
// Animation state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderState {
    /// Degrees, kept in `[0, 360)`.
    pub rotation_angle: f32,
}

impl RenderState {
    pub fn advance(&mut self, degrees: f32) {
        if degrees == 0.0 || !degrees.is_finite() {
            return;
        }
        self.rotation_angle = (self.rotation_angle + degrees).rem_euclid(360.0);
    }
}

// ---------------------------------------------------------------------------
// Compositor
// ---------------------------------------------------------------------------

pub struct RenderCompositor {
    config: RenderConfig,
    states: HashMap<TargetId, RenderState>,
}

impl RenderCompositor {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RenderConfig) {
        self.config = config;
    }

    pub fn state(&self, target: &TargetId) -> Option<&RenderState> {
        self.states.get(target)
    }

    pub fn tracked_states(&self) -> usize {
        self.states.len()
    }

    /// Produce this frame's overlays.
    ///
    /// A target without a live snapshot draws nothing and loses its
    /// animation state, as does any target no longer in `visible`.
    pub fn frame(
        &mut self,
        now: Instant,
        elapsed: Duration,
        visible: &[VisibleTarget],
        cache: &SnapshotCache,
    ) -> Vec<Overlay> {
        self.states
            .retain(|id, _| visible.iter().any(|v| v.id == *id));

        let step = self.config.base_rate * self.config.rotation_speed * elapsed.as_secs_f32();
        let mut overlays = Vec::with_capacity(visible.len());

        for target in visible {
            let Some(snapshot) = cache.peek_at(&target.id, now) else {
                self.states.remove(&target.id);
                continue;
            };

            let state = self.states.entry(target.id).or_default();
            state.advance(step);
            let angle = state.rotation_angle;

            overlays.push(self.layout(target, &snapshot, angle));
        }

        overlays
    }

    fn layout(&self, target: &VisibleTarget, snapshot: &ContainerSnapshot, angle: f32) -> Overlay {
        let (items, rows) = match snapshot {
            ContainerSnapshot::Plain { slots, .. } => {
                let stacks = if self.config.merge_stacks {
                    merge_stacks(slots.as_slice())
                } else {
                    slots.iter().map(|s| s.item.clone()).collect()
                };
                self.layout_grid(target.anchor, stacks, angle)
            }
            ContainerSnapshot::Trade { offers, .. } => {
                self.layout_offers(target.anchor, offers, angle)
            }
        };

        let show_label = match snapshot {
            ContainerSnapshot::Plain { .. } => self.config.show_block_name,
            ContainerSnapshot::Trade { .. } => self.config.show_merchant_name,
        };
        let label = (show_label && !snapshot.label().is_empty()).then(|| Label {
            text: snapshot.label().to_string(),
            position: target.anchor.add(Vec3::new(
                0.0,
                self.row_height(rows) + self.config.label_lift,
                0.0,
            )),
        });

        Overlay {
            target: target.id,
            items,
            label,
        }
    }

    /// Height above the anchor of the top row when `rows` rows are drawn.
    fn row_height(&self, rows: usize) -> f32 {
        self.config.anchor_lift + rows.saturating_sub(1) as f32 * self.config.item_spacing
    }

    fn layout_grid(
        &self,
        anchor: Vec3,
        stacks: Vec<ItemStack>,
        angle: f32,
    ) -> (Vec<ItemSprite>, usize) {
        let n = stacks.len();
        if n == 0 {
            return (Vec::new(), 0);
        }
        let cols = ((n as f32).sqrt().ceil() as usize).clamp(1, self.config.max_columns.max(1));
        let rows = n.div_ceil(cols);
        let spacing = self.config.item_spacing;

        let sprites = stacks
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let row = i / cols;
                let col = i % cols;
                let x = (col as f32 - (cols - 1) as f32 / 2.0) * spacing;
                let y = self.config.anchor_lift + (rows - 1 - row) as f32 * spacing;
                ItemSprite {
                    item,
                    position: anchor.add(Vec3::new(x, y, 0.0)),
                    angle,
                    dimmed: false,
                }
            })
            .collect();

        (sprites, rows)
    }

    fn layout_offers(
        &self,
        anchor: Vec3,
        offers: &[TradeOffer],
        angle: f32,
    ) -> (Vec<ItemSprite>, usize) {
        let rows = offers.len();
        let spacing = self.config.item_spacing;
        let mut sprites = Vec::with_capacity(rows * 3);

        for (row, offer) in offers.iter().enumerate() {
            let y = self.config.anchor_lift + (rows - 1 - row) as f32 * spacing;
            let columns = [
                (-spacing, Some(&offer.buy)),
                (0.0, offer.buy_second.as_ref()),
                (spacing, Some(&offer.sell)),
            ];
            for (x, item) in columns {
                let Some(item) = item else { continue };
                sprites.push(ItemSprite {
                    item: item.clone(),
                    position: anchor.add(Vec3::new(x, y, 0.0)),
                    angle,
                    dimmed: offer.disabled,
                });
            }
        }

        (sprites, rows)
    }
}

/// Collapse slots holding the same item into one stack, in order of first
/// appearance.
fn merge_stacks(slots: &[SlotEntry]) -> Vec<ItemStack> {
    let mut order: Vec<ItemStack> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in slots {
        let key = entry.item.fingerprint();
        match index.get(&key) {
            Some(&i) => order[i].count = order[i].count.saturating_add(entry.quantity()),
            None => {
                index.insert(key, order.len());
                order.push(entry.item.clone());
            }
        }
    }

    order
}
