//! Tests for Settings loading, normalisation and the versioned store

#[cfg(test)]
mod tests {
    use holo_inventory::config::{
        Settings, SettingsStore, DEFAULT_VIEWER_ITEM, MAX_ROTATION_SPEED,
    };
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert!(s.requires_wearable);
        assert!(s.banned_types.is_empty());
        assert!(s.viewer_items.contains(DEFAULT_VIEWER_ITEM));
        assert_eq!(s.rotation_speed, 1.0);
        assert!(s.show_block_name);
        assert!(s.show_merchant_name);
        assert!(!s.merge_stacks);

        let dispatch = s.dispatch_config();
        assert_eq!(dispatch.debounce, Duration::from_millis(100));
        assert_eq!(dispatch.request_timeout, Duration::from_millis(1000));
        assert_eq!(s.snapshot_ttl(), Duration::from_millis(2000));
        assert_eq!(s.fade_window(), Duration::from_millis(500));
    }

    #[test]
    fn parses_toml_with_partial_timing_table() {
        let s = Settings::from_toml_str(
            r#"
            requires_wearable = false
            banned_types = ["minecraft:ender_chest", "minecraft:shulker_box"]
            merge_stacks = true

            [timing]
            debounce_ms = 50
            snapshot_ttl_ms = 4000
            "#,
        )
        .unwrap();

        assert!(!s.requires_wearable);
        assert!(s.merge_stacks);
        assert_eq!(s.banned_types.len(), 2);
        assert!(s.banned_types.contains("minecraft:ender_chest"));
        assert_eq!(s.timing.debounce_ms, 50);
        assert_eq!(s.timing.snapshot_ttl_ms, 4000);
        // Unset keys keep their defaults.
        assert_eq!(s.timing.request_timeout_ms, 1000);
        assert!(s.viewer_items.contains(DEFAULT_VIEWER_ITEM));
    }

    #[test]
    fn rotation_speed_is_clamped() {
        let fast = Settings::from_toml_str("rotation_speed = 9.0").unwrap();
        assert_eq!(fast.rotation_speed, MAX_ROTATION_SPEED);

        let negative = Settings::from_toml_str("rotation_speed = -1.0").unwrap();
        assert_eq!(negative.rotation_speed, 0.0);

        let nan = Settings {
            rotation_speed: f32::NAN,
            ..Settings::default()
        }
        .normalized();
        assert_eq!(nan.rotation_speed, 1.0);
    }

    // Only test in this file that touches the process environment.
    #[test]
    fn environment_layers_over_settings_file() {
        let path = std::env::temp_dir().join(format!(
            "holo-inventory-settings-{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "merge_stacks = true\nbanned_types = [\"minecraft:furnace\"]\n",
        )
        .unwrap();

        std::env::set_var("HOLO_BANNED_TYPES", "minecraft:creeper,minecraft:ender_chest");
        std::env::set_var("HOLO_VIEWER_ITEMS", "mymod:monocle");
        std::env::set_var("HOLO_TIMING__DEBOUNCE_MS", "40");
        let loaded = Settings::load(Some(&path));
        std::env::remove_var("HOLO_BANNED_TYPES");
        std::env::remove_var("HOLO_VIEWER_ITEMS");
        std::env::remove_var("HOLO_TIMING__DEBOUNCE_MS");
        let _ = std::fs::remove_file(&path);

        let s = loaded.unwrap();
        assert!(s.merge_stacks);
        assert_eq!(
            s.banned_types.iter().map(String::as_str).collect::<Vec<_>>(),
            ["minecraft:creeper", "minecraft:ender_chest"]
        );
        assert_eq!(
            s.viewer_items.iter().map(String::as_str).collect::<Vec<_>>(),
            ["mymod:monocle"]
        );
        assert_eq!(s.timing.debounce_ms, 40);
        assert_eq!(s.timing.snapshot_ttl_ms, 2000);

        let missing = std::env::temp_dir().join("holo-inventory-no-such-file.toml");
        assert_eq!(Settings::load(Some(&missing)).unwrap(), Settings::default());
    }

    #[test]
    fn render_config_carries_display_settings() {
        let s = Settings {
            rotation_speed: 2.5,
            show_block_name: false,
            merge_stacks: true,
            ..Settings::default()
        };
        let r = s.render_config();
        assert_eq!(r.rotation_speed, 2.5);
        assert!(!r.show_block_name);
        assert!(r.show_merchant_name);
        assert!(r.merge_stacks);
    }

    #[test]
    fn overlay_gating_by_movement() {
        let always = Settings::default();
        assert!(always.overlay_enabled(false, false));
        assert!(always.overlay_enabled(true, true));

        let sneak = Settings {
            show_on_sneak: true,
            ..Settings::default()
        };
        assert!(!sneak.overlay_enabled(false, false));
        assert!(!sneak.overlay_enabled(false, true));
        assert!(sneak.overlay_enabled(true, false));

        let either = Settings {
            show_on_sneak: true,
            show_on_sprint: true,
            ..Settings::default()
        };
        assert!(either.overlay_enabled(false, true));
        assert!(either.overlay_enabled(true, false));
        assert!(!either.overlay_enabled(false, false));
    }

    // -----------------------------------------------------------------------
    // SettingsStore
    // -----------------------------------------------------------------------

    #[test]
    fn store_versions_every_change() {
        let store = SettingsStore::default();
        assert_eq!(store.version(), 1);

        assert_eq!(store.ban("minecraft:chest"), 2);
        assert!(store.snapshot().banned_types.contains("minecraft:chest"));

        assert_eq!(store.unban("minecraft:chest"), 3);
        assert!(store.snapshot().banned_types.is_empty());

        let v = store.replace(Settings {
            requires_wearable: false,
            ..Settings::default()
        });
        assert_eq!(v, 4);
        assert!(!store.snapshot().requires_wearable);
    }

    #[test]
    fn held_snapshot_is_unaffected_by_later_changes() {
        let store = SettingsStore::default();
        let before = store.snapshot();
        store.ban("minecraft:furnace");
        assert!(before.banned_types.is_empty());
        assert!(store.snapshot().banned_types.contains("minecraft:furnace"));
    }

    #[test]
    fn replace_normalises() {
        let store = SettingsStore::default();
        store.replace(Settings {
            rotation_speed: 50.0,
            ..Settings::default()
        });
        assert_eq!(store.snapshot().rotation_speed, MAX_ROTATION_SPEED);
    }

    #[test]
    fn concurrent_bans_are_all_applied() {
        let store = Arc::new(SettingsStore::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    store.ban(format!("mod:type_{}", i));
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.snapshot().banned_types.len(), 8);
        assert_eq!(store.version(), 9);
    }
}
