//! Property-based tests for the registries

use proptest::prelude::*;

use audiopi_state::{
    EventBus, GroupId, Source, SourceId, SourceKind, SourceRegistry, SourceState, Zone,
    ZoneHealth, ZoneId, ZoneRegistry,
};

// ============================================================================
// Test Helpers
// ============================================================================

const SOURCE_IDS: [&str; 4] = ["airplay", "spotify", "dlna", "bluetooth"];
const ZONE_IDS: [&str; 3] = ["kitchen", "living-room", "patio"];
const GROUP_IDS: [&str; 2] = ["g1", "g2"];

fn sources() -> SourceRegistry {
    SourceRegistry::new(
        vec![
            Source::new("airplay", SourceKind::Airplay, "AirPlay"),
            Source::new("spotify", SourceKind::Spotify, "Spotify"),
            Source::new("dlna", SourceKind::Dlna, "DLNA"),
            Source::new("bluetooth", SourceKind::Bluetooth, "Bluetooth"),
        ],
        EventBus::new(256),
    )
}

fn zones() -> ZoneRegistry {
    ZoneRegistry::new(
        ZONE_IDS
            .iter()
            .map(|id| Zone::new(*id, *id, ZoneHealth::Online)),
        EventBus::new(256),
    )
}

fn state_strategy() -> impl Strategy<Value = SourceState> {
    prop_oneof![
        Just(SourceState::Idle),
        Just(SourceState::Starting),
        Just(SourceState::Active),
        Just(SourceState::Stopping),
        Just(SourceState::Failed),
    ]
}

#[derive(Debug, Clone)]
enum ZoneOp {
    Volume(usize, i64),
    Join(usize, usize),
    Leave(usize),
    GroupVolume(usize, i64),
}

fn zone_op_strategy() -> impl Strategy<Value = ZoneOp> {
    prop_oneof![
        (0..ZONE_IDS.len(), -500i64..500).prop_map(|(z, v)| ZoneOp::Volume(z, v)),
        (0..ZONE_IDS.len(), 0..GROUP_IDS.len()).prop_map(|(z, g)| ZoneOp::Join(z, g)),
        (0..ZONE_IDS.len()).prop_map(ZoneOp::Leave),
        (0..GROUP_IDS.len(), i64::MIN..i64::MAX).prop_map(|(g, v)| ZoneOp::GroupVolume(g, v)),
    ]
}

// ============================================================================
// Single active source
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Whatever order of state writes arrives, at most one source is Active
    /// and every rejected write is a conflict.
    #[test]
    fn prop_at_most_one_active_source(
        writes in prop::collection::vec((0..SOURCE_IDS.len(), state_strategy()), 1..60)
    ) {
        let registry = sources();
        for (index, state) in writes {
            let id = SourceId::new(SOURCE_IDS[index]);
            if let Err(err) = registry.set_state(&id, state, None, None) {
                prop_assert_eq!(state, SourceState::Active);
                prop_assert_eq!(err.kind(), audiopi_state::ErrorKind::Conflict);
            }
            let active = registry
                .list_sources()
                .into_iter()
                .filter(|s| s.state == SourceState::Active)
                .count();
            prop_assert!(active <= 1);
        }
    }
}

// ============================================================================
// Zone invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Volumes stay in range, each zone is in at most one group, groups
    /// are never empty and agree with the zones' own membership.
    #[test]
    fn prop_zone_invariants_hold(ops in prop::collection::vec(zone_op_strategy(), 1..80)) {
        let registry = zones();
        for op in ops {
            let _ = match op {
                ZoneOp::Volume(z, v) => registry.set_volume(&ZoneId::new(ZONE_IDS[z]), v, None),
                ZoneOp::Join(z, g) => {
                    registry.join_group(&ZoneId::new(ZONE_IDS[z]), &GroupId::new(GROUP_IDS[g]), None)
                }
                ZoneOp::Leave(z) => registry.leave_group(&ZoneId::new(ZONE_IDS[z]), None),
                ZoneOp::GroupVolume(g, v) => {
                    registry.set_group_volume(&GroupId::new(GROUP_IDS[g]), v, None)
                }
            };

            let state = registry.snapshot();
            for zone in state.zones.values() {
                prop_assert!(zone.volume <= 100);
                let holding: Vec<_> = state
                    .groups
                    .values()
                    .filter(|g| g.members.contains(&zone.id))
                    .map(|g| g.id.clone())
                    .collect();
                prop_assert!(holding.len() <= 1);
                prop_assert_eq!(holding.first(), zone.group.as_ref());
            }
            for group in state.groups.values() {
                prop_assert!(!group.members.is_empty());
            }
        }
    }

    /// Group volume leaves every member at the same clamped level
    #[test]
    fn prop_group_volume_is_uniform(level in any::<i64>()) {
        let registry = zones();
        for zone in ZONE_IDS {
            registry.join_group(&ZoneId::new(zone), &GroupId::new("g1"), None).unwrap();
        }
        registry.set_volume(&ZoneId::new("kitchen"), 5, None).unwrap();

        registry.set_group_volume(&GroupId::new("g1"), level, None).unwrap();

        let expected = level.clamp(0, 100) as u8;
        for zone in registry.list_zones() {
            prop_assert_eq!(zone.volume, expected);
        }
    }
}
