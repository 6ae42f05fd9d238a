//! RequestHandler unit tests

#[cfg(test)]
mod tests {
    use holo_inventory::{
        config::{Settings, SettingsStore, DEFAULT_VIEWER_ITEM},
        error::{ProtocolError, QueryError},
        handler::RequestHandler,
        protocol::{self, subjects, Envelope, Query, Response},
        snapshot::{Slots, SlotEntry, TradeOffer},
        types::{BlockPos, ItemStack, TargetId, Vec3},
        world::{
            ActorRecord, ContainerData, EquipSlot, MemoryWorld, RequesterProfile,
            StructureRecord,
        },
    };
    use std::sync::Arc;

    const CHEST_POS: BlockPos = BlockPos { x: 2, y: 64, z: 0 };

    fn slots() -> Vec<SlotEntry> {
        vec![
            SlotEntry::new(0, ItemStack::new("minecraft:cobblestone", 64)),
            SlotEntry::new(4, ItemStack::new("minecraft:diamond", 3)),
            SlotEntry::new(2, ItemStack::new("minecraft:torch", 16)),
        ]
    }

    fn make_world() -> Arc<MemoryWorld> {
        let world = MemoryWorld::new();
        world.insert_structure(StructureRecord {
            world_id: 0,
            coordinate: CHEST_POS,
            type_id: "minecraft:chest".into(),
            name: "Chest".into(),
            container: Some(ContainerData::Slots {
                slots: Slots::new(slots()).unwrap(),
            }),
        });
        world.insert_structure(StructureRecord {
            world_id: 0,
            coordinate: BlockPos::new(5, 64, 0),
            type_id: "minecraft:stone".into(),
            name: "Stone".into(),
            container: None,
        });
        world.insert_actor(ActorRecord {
            world_id: 0,
            actor_id: 7,
            type_id: "minecraft:villager".into(),
            name: "Librarian".into(),
            position: Vec3::new(0.0, 64.0, 3.0),
            radius: 0.6,
            container: Some(ContainerData::Trades {
                offers: vec![TradeOffer::new(
                    ItemStack::new("minecraft:emerald", 1),
                    ItemStack::new("minecraft:bookshelf", 1),
                )],
            }),
        });
        world.insert_actor(ActorRecord {
            world_id: 0,
            actor_id: 9,
            type_id: "creeper".into(),
            name: "Creeper".into(),
            position: Vec3::new(4.0, 64.0, 4.0),
            radius: 0.6,
            container: Some(ContainerData::Slots {
                slots: Slots::empty(),
            }),
        });
        world.insert_requester(
            RequesterProfile::new("steve", 0)
                .wearing(EquipSlot::Head, ItemStack::new(DEFAULT_VIEWER_ITEM, 1)),
        );
        world.insert_requester(RequesterProfile::new("alex", 0));
        world.insert_requester(
            RequesterProfile::new("nether_guy", -1)
                .wearing(EquipSlot::Head, ItemStack::new(DEFAULT_VIEWER_ITEM, 1)),
        );
        Arc::new(world)
    }

    fn make_handler(settings: Settings) -> (RequestHandler<MemoryWorld>, Arc<MemoryWorld>) {
        let world = make_world();
        let handler = RequestHandler::new(world.clone(), Arc::new(SettingsStore::new(settings)));
        (handler, world)
    }

    fn query(requester: &str, target: TargetId) -> Envelope<Query> {
        Envelope::new(requester, 11, Query::for_target(&target))
    }

    fn chest() -> TargetId {
        TargetId::structure(0, CHEST_POS)
    }

    // -----------------------------------------------------------------------
    // Happy paths
    // -----------------------------------------------------------------------

    #[test]
    fn plain_container_is_answered_in_slot_order() {
        let (handler, _) = make_handler(Settings::default());
        let reply = handler.handle(&query("steve", chest())).unwrap();

        assert_eq!(reply.requester, "steve");
        assert_eq!(reply.seq, 11);
        match reply.payload {
            Response::PlainSnapshot {
                target_id,
                label,
                slots: got,
            } => {
                assert_eq!(target_id, chest());
                assert_eq!(label, "Chest");
                assert_eq!(got.as_slice(), slots().as_slice());
            }
            other => panic!("expected plain snapshot, got {:?}", other),
        }
    }

    #[test]
    fn trading_actor_is_answered_with_trade_snapshot() {
        let (handler, _) = make_handler(Settings::default());
        let reply = handler
            .handle(&query("steve", TargetId::actor(0, 7)))
            .unwrap();
        match reply.payload {
            Response::TradeSnapshot { offers, label, .. } => {
                assert_eq!(label, "Librarian");
                assert_eq!(offers.len(), 1);
                assert_eq!(offers[0].sell.item_id, "minecraft:bookshelf");
            }
            other => panic!("expected trade snapshot, got {:?}", other),
        }
    }

    #[test]
    fn handler_never_mutates_the_container() {
        let (handler, world) = make_handler(Settings::default());
        let before = {
            use holo_inventory::world::WorldView;
            let obj = world.locate(&chest()).unwrap();
            world.read_container(&world.has_container(&obj).unwrap())
        };
        for _ in 0..3 {
            handler.handle(&query("steve", chest())).unwrap();
        }
        let after = {
            use holo_inventory::world::WorldView;
            let obj = world.locate(&chest()).unwrap();
            world.read_container(&world.has_container(&obj).unwrap())
        };
        assert_eq!(before, after);
    }

    // -----------------------------------------------------------------------
    // Silent drops
    // -----------------------------------------------------------------------

    #[test]
    fn requester_without_wearable_is_denied() {
        let (handler, _) = make_handler(Settings::default());
        let err = handler.handle(&query("alex", chest())).unwrap_err();
        assert!(matches!(err, QueryError::PermissionDenied { .. }));
    }

    #[test]
    fn requester_without_wearable_is_fine_when_not_required() {
        let settings = Settings {
            requires_wearable: false,
            ..Settings::default()
        };
        let (handler, _) = make_handler(settings);
        assert!(handler.handle(&query("alex", chest())).is_ok());
    }

    #[test]
    fn banned_type_is_denied_despite_wearable() {
        let mut settings = Settings::default();
        settings.banned_types.insert("creeper".into());
        let (handler, _) = make_handler(settings);
        let err = handler
            .handle(&query("steve", TargetId::actor(0, 9)))
            .unwrap_err();
        assert!(matches!(err, QueryError::PermissionDenied { .. }));
    }

    #[test]
    fn runtime_ban_applies_to_next_request() {
        let (handler, _) = make_handler(Settings::default());
        assert!(handler.handle(&query("steve", chest())).is_ok());

        let v = handler.settings().ban("minecraft:chest");
        assert!(v > 1);
        assert!(matches!(
            handler.handle(&query("steve", chest())),
            Err(QueryError::PermissionDenied { .. })
        ));

        handler.settings().unban("minecraft:chest");
        assert!(handler.handle(&query("steve", chest())).is_ok());
    }

    #[test]
    fn vanished_target_is_dropped() {
        let (handler, world) = make_handler(Settings::default());
        assert!(world.remove(&chest()));
        assert_eq!(
            handler.handle(&query("steve", chest())),
            Err(QueryError::TargetVanished(chest()))
        );
    }

    #[test]
    fn object_without_container_is_dropped() {
        let (handler, _) = make_handler(Settings::default());
        let stone = TargetId::structure(0, BlockPos::new(5, 64, 0));
        assert_eq!(
            handler.handle(&query("steve", stone)),
            Err(QueryError::NoContainer(stone))
        );
    }

    #[test]
    fn other_world_and_unknown_requester_are_dropped() {
        let (handler, _) = make_handler(Settings::default());
        assert!(matches!(
            handler.handle(&query("nether_guy", chest())),
            Err(QueryError::WorldMismatch { .. })
        ));
        assert!(matches!(
            handler.handle(&query("herobrine", chest())),
            Err(QueryError::UnknownRequester(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Wire entry point
    // -----------------------------------------------------------------------

    fn structure_subject(requester: &str) -> String {
        subjects::query_for(requester, subjects::KIND_STRUCTURE)
    }

    #[test]
    fn handle_bytes_returns_encoded_reply() {
        let (handler, _) = make_handler(Settings::default());
        let q = query("steve", chest());
        let bytes = protocol::encode(&q).unwrap();

        let reply = handler
            .handle_bytes(&q.payload.subject("steve"), &bytes)
            .unwrap();
        let decoded: Envelope<Response> = protocol::decode(&reply).unwrap();
        assert_eq!(decoded.requester, "steve");
        assert_eq!(decoded.seq, 11);
        assert_eq!(decoded.payload.target_id(), chest());
    }

    #[test]
    fn handle_bytes_discards_malformed_and_mismatched_messages() {
        let (handler, _) = make_handler(Settings::default());
        assert!(handler
            .handle_bytes(&structure_subject("steve"), b"{not json")
            .is_none());

        let bytes = protocol::encode(&query("steve", chest())).unwrap();
        let actor_subject = subjects::query_for("steve", subjects::KIND_ACTOR);
        assert!(handler.handle_bytes(&actor_subject, &bytes).is_none());
        assert!(handler.handle_bytes("holo.query.structure", &bytes).is_none());
        assert!(handler.handle_bytes("holo.query.steve.chest", &bytes).is_none());
    }

    #[test]
    fn handle_bytes_sends_nothing_when_denied() {
        let (handler, _) = make_handler(Settings::default());
        let bytes = protocol::encode(&query("alex", chest())).unwrap();
        assert!(handler
            .handle_bytes(&structure_subject("alex"), &bytes)
            .is_none());
    }

    #[test]
    fn claiming_another_requesters_identity_is_refused() {
        let (handler, _) = make_handler(Settings::default());
        // alex has no viewer item and publishes under its own subject while
        // the envelope claims to be steve.
        let bytes = protocol::encode(&query("steve", chest())).unwrap();
        assert!(handler
            .handle_bytes(&structure_subject("alex"), &bytes)
            .is_none());
        assert!(matches!(
            protocol::decode_query(&structure_subject("alex"), &bytes),
            Err(ProtocolError::RequesterMismatch { .. })
        ));
    }

    #[test]
    fn query_subjects_round_trip() {
        let subject = structure_subject("steve");
        assert_eq!(subject, "holo.query.steve.structure");
        assert_eq!(
            subjects::parse_query(&subject),
            Some(("steve", subjects::KIND_STRUCTURE))
        );
        assert_eq!(subjects::parse_query("holo.query.a.b.structure"), None);
        assert_eq!(subjects::parse_query("holo.query.*.actor"), None);
        assert!(!subjects::is_valid_token("two words"));
        assert!(subjects::is_valid_token("steve_01"));
    }

    #[test]
    fn concurrent_requests_do_not_interfere() {
        let (handler, _) = make_handler(Settings::default());
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let handler = handler.clone();
                std::thread::spawn(move || {
                    let target = if i % 2 == 0 {
                        chest()
                    } else {
                        TargetId::actor(0, 7)
                    };
                    for _ in 0..50 {
                        let reply = handler.handle(&query("steve", target)).unwrap();
                        assert_eq!(reply.payload.target_id(), target);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
    }
}
