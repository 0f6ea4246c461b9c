//! Zone Registry
//!
//! Zones and sync groups live in one copy-on-write [`ZoneState`] so that a
//! membership change touching a zone and two groups, or a group volume
//! touching every member, is committed by a single swap.
//!
//! Every mutator returns the number of events it emitted. Repeating a
//! mutation succeeds with 0.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::bus::EventBus;
use crate::error::{Result, StateError};
use crate::model::{
    CorrelationId, GroupId, OrchestrationEvent, SyncGroup, Zone, ZoneHealth, ZoneId,
    DEFAULT_VOLUME,
};

/// Zones and groups at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ZoneState {
    pub zones: BTreeMap<ZoneId, Zone>,
    pub groups: BTreeMap<GroupId, SyncGroup>,
}

impl ZoneState {
    fn zone(&self, id: &ZoneId) -> Result<&Zone> {
        self.zones
            .get(id)
            .ok_or_else(|| StateError::ZoneNotFound(id.clone()))
    }

    fn zone_mut(&mut self, id: &ZoneId) -> Result<&mut Zone> {
        self.zones
            .get_mut(id)
            .ok_or_else(|| StateError::ZoneNotFound(id.clone()))
    }

    /// Remove `zone` from `group`, dropping the group when it empties
    fn detach(&mut self, zone: &ZoneId, group: &GroupId, events: &mut Vec<OrchestrationEvent>) {
        let emptied = match self.groups.get_mut(group) {
            Some(sync_group) => {
                sync_group.members.remove(zone);
                sync_group.members.is_empty()
            }
            None => false,
        };
        if emptied {
            self.groups.remove(group);
            events.push(OrchestrationEvent::GroupDissolved {
                group: group.clone(),
            });
        }
    }
}

/// Registry of playback zones and sync groups
#[derive(Debug)]
pub struct ZoneRegistry {
    state: RwLock<Arc<ZoneState>>,
    bus: EventBus,
}

impl ZoneRegistry {
    /// Create a registry from the statically configured zones
    pub fn new(zones: impl IntoIterator<Item = Zone>, bus: EventBus) -> Self {
        let mut state = ZoneState::default();
        for mut zone in zones {
            // Group membership is runtime state only
            zone.group = None;
            state.zones.insert(zone.id.clone(), zone);
        }
        Self {
            state: RwLock::new(Arc::new(state)),
            bus,
        }
    }

    /// Consistent view of zones and groups
    pub fn snapshot(&self) -> Arc<ZoneState> {
        Arc::clone(&self.state.read())
    }

    pub fn list_zones(&self) -> Vec<Zone> {
        self.snapshot().zones.values().cloned().collect()
    }

    pub fn get_zone(&self, id: &ZoneId) -> Result<Zone> {
        self.snapshot().zone(id).cloned()
    }

    pub fn list_groups(&self) -> Vec<SyncGroup> {
        self.snapshot().groups.values().cloned().collect()
    }

    pub fn get_group(&self, id: &GroupId) -> Result<SyncGroup> {
        self.snapshot()
            .groups
            .get(id)
            .cloned()
            .ok_or_else(|| StateError::GroupNotFound(id.clone()))
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Set a zone's volume, clamped to 0..=100
    pub fn set_volume(
        &self,
        id: &ZoneId,
        level: i64,
        correlation_id: Option<CorrelationId>,
    ) -> Result<usize> {
        let level = clamp_volume(level);
        self.mutate(correlation_id, |state, events| {
            let zone = state.zone_mut(id)?;
            if zone.volume != level {
                events.push(OrchestrationEvent::ZoneVolumeChanged {
                    zone: id.clone(),
                    old: zone.volume,
                    new: level,
                });
                zone.volume = level;
            }
            Ok(())
        })
    }

    pub fn set_mute(
        &self,
        id: &ZoneId,
        muted: bool,
        correlation_id: Option<CorrelationId>,
    ) -> Result<usize> {
        self.mutate(correlation_id, |state, events| {
            let zone = state.zone_mut(id)?;
            if zone.muted != muted {
                zone.muted = muted;
                events.push(OrchestrationEvent::ZoneMuteChanged {
                    zone: id.clone(),
                    muted,
                });
            }
            Ok(())
        })
    }

    /// Move a zone into `group`, leaving its previous group first.
    ///
    /// The target group is created on demand; a previous group left empty
    /// is dissolved.
    pub fn join_group(
        &self,
        zone_id: &ZoneId,
        group: &GroupId,
        correlation_id: Option<CorrelationId>,
    ) -> Result<usize> {
        if group.as_str().trim().is_empty() {
            return Err(StateError::Validation("group id must not be empty".into()));
        }
        self.mutate(correlation_id, |state, events| {
            let previous = state.zone(zone_id)?.group.clone();
            if previous.as_ref() == Some(group) {
                return Ok(());
            }

            state.zone_mut(zone_id)?.group = Some(group.clone());
            events.push(OrchestrationEvent::GroupMembershipChanged {
                zone: zone_id.clone(),
                from: previous.clone(),
                to: Some(group.clone()),
            });
            if let Some(previous) = &previous {
                state.detach(zone_id, previous, events);
            }
            state
                .groups
                .entry(group.clone())
                .or_insert_with(|| SyncGroup {
                    id: group.clone(),
                    members: BTreeSet::new(),
                })
                .members
                .insert(zone_id.clone());
            Ok(())
        })
    }

    /// Take a zone out of its group; no-op when ungrouped
    pub fn leave_group(
        &self,
        zone_id: &ZoneId,
        correlation_id: Option<CorrelationId>,
    ) -> Result<usize> {
        self.mutate(correlation_id, |state, events| {
            let zone = state.zone_mut(zone_id)?;
            let Some(previous) = zone.group.take() else {
                return Ok(());
            };
            events.push(OrchestrationEvent::GroupMembershipChanged {
                zone: zone_id.clone(),
                from: Some(previous.clone()),
                to: None,
            });
            state.detach(zone_id, &previous, events);
            Ok(())
        })
    }

    /// Give every member of `group` the same clamped volume in one commit
    pub fn set_group_volume(
        &self,
        group: &GroupId,
        level: i64,
        correlation_id: Option<CorrelationId>,
    ) -> Result<usize> {
        let level = clamp_volume(level);
        self.mutate(correlation_id, |state, events| {
            let members: Vec<ZoneId> = state
                .groups
                .get(group)
                .ok_or_else(|| StateError::GroupNotFound(group.clone()))?
                .members
                .iter()
                .cloned()
                .collect();
            for member in members {
                let zone = state.zone_mut(&member)?;
                if zone.volume != level {
                    events.push(OrchestrationEvent::ZoneVolumeChanged {
                        zone: member.clone(),
                        old: zone.volume,
                        new: level,
                    });
                    zone.volume = level;
                }
            }
            Ok(())
        })
    }

    /// Register a playback client.
    ///
    /// Unknown zones are added Online at the default volume; known zones
    /// are brought back Online. Zones are never removed.
    pub fn register_zone(
        &self,
        id: &ZoneId,
        name: &str,
        correlation_id: Option<CorrelationId>,
    ) -> Result<usize> {
        if id.as_str().trim().is_empty() {
            return Err(StateError::Validation("zone id must not be empty".into()));
        }
        self.mutate(correlation_id, |state, events| {
            match state.zones.get_mut(id) {
                Some(zone) => {
                    if !name.is_empty() {
                        zone.name = name.to_string();
                    }
                    if zone.health != ZoneHealth::Online {
                        events.push(OrchestrationEvent::ZoneHealthChanged {
                            zone: id.clone(),
                            old: zone.health,
                            new: ZoneHealth::Online,
                        });
                        zone.health = ZoneHealth::Online;
                    }
                }
                None => {
                    let name = if name.is_empty() { id.as_str() } else { name };
                    let zone = Zone::new(id.clone(), name, ZoneHealth::Online)
                        .with_volume(DEFAULT_VOLUME);
                    state.zones.insert(id.clone(), zone);
                    events.push(OrchestrationEvent::ZoneRegistered {
                        zone: id.clone(),
                        name: name.to_string(),
                    });
                }
            }
            Ok(())
        })
    }

    /// Record a health observation; emits only on transitions
    pub fn mark_health(
        &self,
        id: &ZoneId,
        health: ZoneHealth,
        correlation_id: Option<CorrelationId>,
    ) -> Result<usize> {
        self.mutate(correlation_id, |state, events| {
            let zone = state.zone_mut(id)?;
            if zone.health != health {
                events.push(OrchestrationEvent::ZoneHealthChanged {
                    zone: id.clone(),
                    old: zone.health,
                    new: health,
                });
                zone.health = health;
            }
            Ok(())
        })
    }

    /// Apply `change` to a private copy and commit it only if it succeeds
    /// and actually changed something.
    fn mutate<F>(&self, correlation_id: Option<CorrelationId>, change: F) -> Result<usize>
    where
        F: FnOnce(&mut ZoneState, &mut Vec<OrchestrationEvent>) -> Result<()>,
    {
        let mut guard = self.state.write();
        let mut next = (**guard).clone();
        let mut events = Vec::new();

        change(&mut next, &mut events)?;

        if events.is_empty() {
            return Ok(0);
        }
        *guard = Arc::new(next);
        for event in &events {
            tracing::debug!(event = event.name(), "zone state changed");
        }
        let count = events.len();
        for event in events {
            self.bus.publish(event, correlation_id);
        }
        Ok(count)
    }
}

fn clamp_volume(level: i64) -> u8 {
    level.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn registry() -> ZoneRegistry {
        ZoneRegistry::new(
            vec![
                Zone::new("kitchen", "Kitchen", ZoneHealth::Online),
                Zone::new("living-room", "Living Room", ZoneHealth::Online),
            ],
            EventBus::new(64),
        )
    }

    fn kitchen() -> ZoneId {
        ZoneId::new("kitchen")
    }

    #[rstest]
    #[case(150, 100)]
    #[case(-5, 0)]
    #[case(0, 0)]
    #[case(73, 73)]
    fn test_set_volume_clamps(#[case] level: i64, #[case] expected: u8) {
        let registry = registry();
        registry.set_volume(&kitchen(), level, None).unwrap();
        assert_eq!(registry.get_zone(&kitchen()).unwrap().volume, expected);
    }

    #[test]
    fn test_set_volume_unknown_zone() {
        let err = registry().set_volume(&"attic".into(), 10, None).unwrap_err();
        assert_eq!(err, StateError::ZoneNotFound("attic".into()));
    }

    #[test]
    fn test_repeat_is_acknowledged_without_event() {
        let registry = registry();
        assert_eq!(registry.set_volume(&kitchen(), 80, None).unwrap(), 1);
        assert_eq!(registry.set_volume(&kitchen(), 80, None).unwrap(), 0);
        assert_eq!(registry.set_mute(&kitchen(), true, None).unwrap(), 1);
        assert_eq!(registry.set_mute(&kitchen(), true, None).unwrap(), 0);
        assert_eq!(registry.bus().last_seq(), 2);
    }

    #[test]
    fn test_join_moves_zone_and_dissolves_old_group() {
        let registry = registry();
        registry.join_group(&kitchen(), &"g".into(), None).unwrap();
        registry.join_group(&kitchen(), &"g2".into(), None).unwrap();

        assert_eq!(registry.get_zone(&kitchen()).unwrap().group, Some("g2".into()));
        assert!(registry.get_group(&"g".into()).is_err());
        assert!(registry.get_group(&"g2".into()).unwrap().contains(&kitchen()));

        let names: Vec<&str> = registry
            .bus()
            .since(0)
            .events
            .iter()
            .map(|e| e.event.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "group_membership_changed",
                "group_membership_changed",
                "group_dissolved"
            ]
        );
    }

    #[test]
    fn test_join_same_group_is_noop() {
        let registry = registry();
        assert_eq!(registry.join_group(&kitchen(), &"g".into(), None).unwrap(), 1);
        assert_eq!(registry.join_group(&kitchen(), &"g".into(), None).unwrap(), 0);
    }

    #[test]
    fn test_join_rejects_empty_group() {
        let err = registry().join_group(&kitchen(), &" ".into(), None).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn test_leave_group() {
        let registry = registry();
        registry.join_group(&kitchen(), &"g".into(), None).unwrap();
        registry.join_group(&"living-room".into(), &"g".into(), None).unwrap();

        assert_eq!(registry.leave_group(&kitchen(), None).unwrap(), 1);
        assert!(registry.get_group(&"g".into()).is_ok());
        assert_eq!(registry.leave_group(&kitchen(), None).unwrap(), 0);
        assert_eq!(registry.leave_group(&"living-room".into(), None).unwrap(), 2);
        assert!(registry.list_groups().is_empty());
    }

    #[test]
    fn test_group_volume_is_one_commit() {
        let registry = registry();
        registry.join_group(&kitchen(), &"g1".into(), None).unwrap();
        registry.join_group(&"living-room".into(), &"g1".into(), None).unwrap();
        registry.set_volume(&kitchen(), 30, None).unwrap();

        let before = registry.snapshot();
        assert_eq!(registry.set_group_volume(&"g1".into(), 64, None).unwrap(), 2);
        let after = registry.snapshot();

        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.zones.values().all(|z| z.volume == 64));
        assert_eq!(before.zones[&kitchen()].volume, 30);
    }

    #[test]
    fn test_group_volume_unknown_group() {
        let err = registry().set_group_volume(&"nope".into(), 10, None).unwrap_err();
        assert_eq!(err, StateError::GroupNotFound("nope".into()));
    }

    #[test]
    fn test_register_zone() {
        let registry = registry();
        assert_eq!(registry.register_zone(&"patio".into(), "Patio", None).unwrap(), 1);
        let patio = registry.get_zone(&"patio".into()).unwrap();
        assert_eq!(patio.volume, DEFAULT_VOLUME);
        assert_eq!(patio.health, ZoneHealth::Online);

        // already online
        assert_eq!(registry.register_zone(&"patio".into(), "Patio", None).unwrap(), 0);

        registry.mark_health(&"patio".into(), ZoneHealth::Offline, None).unwrap();
        assert_eq!(registry.register_zone(&"patio".into(), "", None).unwrap(), 1);
        assert_eq!(registry.get_zone(&"patio".into()).unwrap().name, "Patio");
    }

    #[test]
    fn test_mark_health_transitions_only() {
        let registry = registry();
        assert_eq!(registry.mark_health(&kitchen(), ZoneHealth::Online, None).unwrap(), 0);
        assert_eq!(registry.mark_health(&kitchen(), ZoneHealth::Degraded, None).unwrap(), 1);
        assert_eq!(registry.mark_health(&kitchen(), ZoneHealth::Degraded, None).unwrap(), 0);
    }

    #[test]
    fn test_failed_mutation_leaves_state_untouched() {
        let registry = registry();
        let before = registry.snapshot();
        assert!(registry.set_mute(&"attic".into(), true, None).is_err());
        assert!(Arc::ptr_eq(&before, &registry.snapshot()));
    }
}
