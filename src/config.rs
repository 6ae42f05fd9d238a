//! Settings: what the authority enforces and how the requester displays.
//!
//! Loaded through the `config` crate from an optional TOML file layered with
//! `HOLO_*` environment variables. The authority reads settings through a
//! [`SettingsStore`]; the requester-side dispatcher and compositor receive
//! plain [`DispatchConfig`] / [`RenderConfig`] values at construction.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const MIN_ROTATION_SPEED: f32 = 0.0;
pub const MAX_ROTATION_SPEED: f32 = 5.0;

/// Item that grants the viewer capability out of the box.
pub const DEFAULT_VIEWER_ITEM: &str = "holoinventory:hologlasses";

/// Settings keys read from the environment as comma-separated lists.
const LIST_KEYS: [&str; 2] = ["banned_types", "viewer_items"];

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Requester must wear a viewer item to query anything.
    pub requires_wearable: bool,
    /// Target type ids that may never be queried.
    pub banned_types: BTreeSet<String>,
    /// Item ids that grant the viewer capability when worn.
    pub viewer_items: BTreeSet<String>,
    /// 1.0 = normal speed, 0.0 = no rotation.
    pub rotation_speed: f32,
    pub show_block_name: bool,
    pub show_merchant_name: bool,
    /// Only show overlays while sneaking.
    pub show_on_sneak: bool,
    /// Only show overlays while sprinting.
    pub show_on_sprint: bool,
    /// Collapse identical stacks into one sprite.
    pub merge_stacks: bool,
    pub timing: Timing,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            requires_wearable: true,
            banned_types: BTreeSet::new(),
            viewer_items: BTreeSet::from([DEFAULT_VIEWER_ITEM.to_string()]),
            rotation_speed: 1.0,
            show_block_name: true,
            show_merchant_name: true,
            show_on_sneak: false,
            show_on_sprint: false,
            merge_stacks: false,
            timing: Timing::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Minimum gap between two outbound queries.
    pub debounce_ms: u64,
    /// How long an unanswered query blocks a repeat for the same target.
    pub request_timeout_ms: u64,
    /// Lifetime of a cached snapshot.
    pub snapshot_ttl_ms: u64,
    /// Re-query the current target once its snapshot has less life left.
    pub refresh_margin_ms: u64,
    /// How long a target stays drawn after the view leaves it.
    pub fade_window_ms: u64,
    /// Maximum ray length for target resolution, in world units.
    pub reach: f32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            request_timeout_ms: 1000,
            snapshot_ttl_ms: 2000,
            refresh_margin_ms: 250,
            fade_window_ms: 500,
            reach: 8.0,
        }
    }
}

impl Settings {
    /// Load from an optional TOML file and `HOLO_*` environment variables.
    ///
    /// Nested keys use a double underscore: `HOLO_TIMING__DEBOUNCE_MS=50`.
    /// List keys take comma-separated values:
    /// `HOLO_BANNED_TYPES=minecraft:creeper,minecraft:ender_chest`.
    pub fn load(path: Option<&Path>) -> Result<Self, ::config::ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        let settings: Settings = builder
            .add_source(Self::environment())
            .build()?
            .try_deserialize()?;
        Ok(settings.normalized())
    }

    fn environment() -> ::config::Environment {
        let mut env = ::config::Environment::with_prefix("HOLO")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",");
        for key in LIST_KEYS {
            env = env.with_list_parse_key(key);
        }
        env
    }

    /// Parse from an inline TOML document (no environment layering).
    pub fn from_toml_str(source: &str) -> Result<Self, ::config::ConfigError> {
        let settings: Settings = ::config::Config::builder()
            .add_source(::config::File::from_str(source, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(settings.normalized())
    }

    /// Clamp values into their documented ranges.
    pub fn normalized(mut self) -> Self {
        if !self.rotation_speed.is_finite() {
            self.rotation_speed = 1.0;
        }
        self.rotation_speed = self
            .rotation_speed
            .clamp(MIN_ROTATION_SPEED, MAX_ROTATION_SPEED);
        self.timing.reach = self.timing.reach.max(0.0);
        self
    }

    /// Whether the overlay may be shown given the requester's movement state.
    pub fn overlay_enabled(&self, sneaking: bool, sprinting: bool) -> bool {
        if !self.show_on_sneak && !self.show_on_sprint {
            return true;
        }
        (self.show_on_sneak && sneaking) || (self.show_on_sprint && sprinting)
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            debounce: Duration::from_millis(self.timing.debounce_ms),
            request_timeout: Duration::from_millis(self.timing.request_timeout_ms),
            refresh_margin: Duration::from_millis(self.timing.refresh_margin_ms),
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            rotation_speed: self.rotation_speed,
            show_block_name: self.show_block_name,
            show_merchant_name: self.show_merchant_name,
            merge_stacks: self.merge_stacks,
            ..RenderConfig::default()
        }
    }

    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_millis(self.timing.snapshot_ttl_ms)
    }

    pub fn fade_window(&self) -> Duration {
        Duration::from_millis(self.timing.fade_window_ms)
    }
}

// ---------------------------------------------------------------------------
// Derived per-component configs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchConfig {
    pub debounce: Duration,
    pub request_timeout: Duration,
    pub refresh_margin: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Settings::default().dispatch_config()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    pub rotation_speed: f32,
    pub show_block_name: bool,
    pub show_merchant_name: bool,
    pub merge_stacks: bool,
    /// Degrees per second at `rotation_speed == 1.0`.
    pub base_rate: f32,
    /// Distance between neighbouring item sprites.
    pub item_spacing: f32,
    /// Height of the bottom item row above the target anchor.
    pub anchor_lift: f32,
    /// Height of the label above the top item row.
    pub label_lift: f32,
    /// Widest row for plain containers.
    pub max_columns: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            rotation_speed: 1.0,
            show_block_name: true,
            show_merchant_name: true,
            merge_stacks: false,
            // One full turn every 0x3FFF ms.
            base_rate: 360.0 / 16.383,
            item_spacing: 0.4,
            anchor_lift: 0.5,
            label_lift: 0.35,
            max_columns: 9,
        }
    }
}

// ---------------------------------------------------------------------------
// Versioned store
// ---------------------------------------------------------------------------

/// Atomically swappable settings snapshot.
///
/// Readers clone one `Arc<Settings>` and use it for the whole request;
/// writers publish a complete replacement, bumping the version.
#[derive(Debug)]
pub struct SettingsStore {
    current: RwLock<Arc<Settings>>,
    version: AtomicU64,
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings.normalized())),
            version: AtomicU64::new(1),
        }
    }

    pub fn snapshot(&self) -> Arc<Settings> {
        self.current.read().clone()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Replace the whole settings snapshot. Returns the new version.
    pub fn replace(&self, settings: Settings) -> u64 {
        let mut current = self.current.write();
        *current = Arc::new(settings.normalized());
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Add a type id to the ban list. Returns the new version.
    pub fn ban(&self, type_id: impl Into<String>) -> u64 {
        let type_id = type_id.into();
        self.update(|s| {
            s.banned_types.insert(type_id);
        })
    }

    /// Remove a type id from the ban list. Returns the new version.
    pub fn unban(&self, type_id: &str) -> u64 {
        self.update(|s| {
            s.banned_types.remove(type_id);
        })
    }

    fn update(&self, f: impl FnOnce(&mut Settings)) -> u64 {
        let mut current = self.current.write();
        let mut next = Settings::clone(&current);
        f(&mut next);
        *current = Arc::new(next.normalized());
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
