//! Snapshot building: periodic full states and per-tick deltas

use std::collections::HashMap;

use uuid::Uuid;

use crate::config::GameConfig;
use crate::ws::protocol::{PlayerSnapshot, PowerUpSnapshot, ServerMsg};

use super::physics::PhysicsSystem;
use super::player::PlayerState;

/// Minimum change before a player is repeated in a delta
#[derive(Debug, Clone, Copy)]
pub struct DeltaThresholds {
    pub min_distance: f32,
    pub min_angle: f32,
}

impl DeltaThresholds {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            min_distance: config.delta_min_distance,
            min_angle: config.delta_min_angle,
        }
    }

    /// Whether `current` differs enough from what the client last saw
    fn is_dirty(&self, last: Option<&PlayerSnapshot>, current: &PlayerSnapshot) -> bool {
        let Some(last) = last else {
            return true;
        };

        PhysicsSystem::distance_sq(last.x, last.y, current.x, current.y)
            > self.min_distance * self.min_distance
            || PhysicsSystem::angle_between(last.heading, current.heading) > self.min_angle
            || last.bullet_charges != current.bullet_charges
            || last.bullets != current.bullets
            || last.alive != current.alive
            || last.ghost != current.ghost
            || last.score != current.score
    }
}

/// Decides full vs delta per tick and builds the message
pub struct SnapshotEncoder {
    /// Ticks since the last full snapshot
    ticks_since_full: u32,
    /// Full snapshot interval in ticks
    full_interval: u32,
    force_full: bool,
    /// Sequence number of the last message sent
    seq: u64,
    thresholds: DeltaThresholds,
    /// What each client was last told about each player
    last_sent: HashMap<Uuid, PlayerSnapshot>,
}

impl SnapshotEncoder {
    pub fn new(full_interval: u32, thresholds: DeltaThresholds) -> Self {
        Self {
            ticks_since_full: 0,
            full_interval: full_interval.max(1),
            force_full: true,
            seq: 0,
            thresholds,
            last_sent: HashMap::new(),
        }
    }

    /// Force a full snapshot on the next encode (round start, roster change)
    pub fn force_next(&mut self) {
        self.force_full = true;
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Build this tick's message, if any
    pub fn encode(
        &mut self,
        tick: u64,
        players: &HashMap<Uuid, PlayerState>,
        power_ups: &[PowerUpSnapshot],
        power_ups_changed: bool,
    ) -> Option<ServerMsg> {
        self.ticks_since_full += 1;

        let mut current: Vec<PlayerSnapshot> = players.values().map(PlayerState::snapshot).collect();
        current.sort_by_key(|p| p.id);

        if self.force_full || self.ticks_since_full >= self.full_interval {
            return Some(self.build_full(tick, current, power_ups));
        }

        let changed: Vec<PlayerSnapshot> = current
            .into_iter()
            .filter(|p| self.thresholds.is_dirty(self.last_sent.get(&p.id), p))
            .collect();

        if changed.is_empty() && !power_ups_changed {
            return None;
        }

        for snapshot in &changed {
            self.last_sent.insert(snapshot.id, snapshot.clone());
        }
        self.seq += 1;

        Some(ServerMsg::GameStatePartial {
            seq: self.seq,
            tick,
            players: changed,
            power_ups: power_ups_changed.then(|| power_ups.to_vec()),
        })
    }

    fn build_full(
        &mut self,
        tick: u64,
        players: Vec<PlayerSnapshot>,
        power_ups: &[PowerUpSnapshot],
    ) -> ServerMsg {
        self.ticks_since_full = 0;
        self.force_full = false;
        self.last_sent = players.iter().map(|p| (p.id, p.clone())).collect();
        self.seq += 1;

        ServerMsg::GameState {
            seq: self.seq,
            tick,
            players,
            power_ups: power_ups.to_vec(),
        }
    }
}

/// Client-side view rebuilt from full and delta snapshots
#[derive(Debug, Clone, Default)]
pub struct SnapshotView {
    pub players: HashMap<Uuid, PlayerSnapshot>,
    pub power_ups: Vec<PowerUpSnapshot>,
    pub last_seq: u64,
}

impl SnapshotView {
    /// Apply a snapshot message. Returns false for anything else or for a stale sequence.
    pub fn apply(&mut self, msg: &ServerMsg) -> bool {
        match msg {
            ServerMsg::GameState {
                seq,
                players,
                power_ups,
                ..
            } if *seq > self.last_seq => {
                self.players = players.iter().map(|p| (p.id, p.clone())).collect();
                self.power_ups = power_ups.clone();
                self.last_seq = *seq;
                true
            }
            ServerMsg::GameStatePartial {
                seq,
                players,
                power_ups,
                ..
            } if *seq > self.last_seq => {
                for player in players {
                    self.players.insert(player.id, player.clone());
                }
                if let Some(power_ups) = power_ups {
                    self.power_ups = power_ups.clone();
                }
                self.last_seq = *seq;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::PowerUpKind;

    fn encoder(interval: u32) -> SnapshotEncoder {
        SnapshotEncoder::new(
            interval,
            DeltaThresholds {
                min_distance: 0.5,
                min_angle: 0.01,
            },
        )
    }

    fn roster(n: usize) -> HashMap<Uuid, PlayerState> {
        (0..n)
            .map(|i| {
                let p = PlayerState::new(Uuid::new_v4(), 50.0 + 100.0 * i as f32, 100.0, 0.0);
                (p.id, p)
            })
            .collect()
    }

    fn power_up(id: u64) -> PowerUpSnapshot {
        PowerUpSnapshot {
            id,
            x: 10.0,
            y: 10.0,
            kind: PowerUpKind::BulletRefill,
            size: 5.0,
            spawn_ms: 0,
        }
    }

    #[test]
    fn first_encode_is_full_then_silent_when_idle() {
        let mut enc = encoder(30);
        let players = roster(2);

        let msg = enc.encode(1, &players, &[], false).unwrap();
        assert!(matches!(msg, ServerMsg::GameState { seq: 1, .. }));
        assert!(enc.encode(2, &players, &[], false).is_none());
        assert_eq!(enc.seq(), 1);
    }

    #[test]
    fn full_snapshot_every_nth_tick_regardless_of_change() {
        let mut enc = encoder(5);
        let players = roster(2);
        let mut fulls = Vec::new();
        for tick in 1..=16 {
            if let Some(ServerMsg::GameState { tick, .. }) = enc.encode(tick, &players, &[], false) {
                fulls.push(tick);
            }
        }
        assert_eq!(fulls, vec![1, 6, 11, 16]);
    }

    #[test]
    fn delta_carries_only_players_that_moved_enough() {
        let mut enc = encoder(30);
        let mut players = roster(3);
        enc.encode(1, &players, &[], false);

        let ids: Vec<Uuid> = players.keys().copied().collect();
        players.get_mut(&ids[0]).unwrap().x += 1.5;
        players.get_mut(&ids[1]).unwrap().x += 0.2;

        match enc.encode(2, &players, &[], false) {
            Some(ServerMsg::GameStatePartial {
                players: changed,
                power_ups,
                ..
            }) => {
                assert_eq!(changed.len(), 1);
                assert_eq!(changed[0].id, ids[0]);
                assert!(power_ups.is_none());
            }
            other => panic!("expected delta, got {:?}", other),
        }

        // Small moves accumulate against the last sent state
        players.get_mut(&ids[1]).unwrap().x += 0.4;
        match enc.encode(3, &players, &[], false) {
            Some(ServerMsg::GameStatePartial { players: changed, .. }) => {
                assert_eq!(changed.len(), 1);
                assert_eq!(changed[0].id, ids[1]);
            }
            other => panic!("expected delta, got {:?}", other),
        }
    }

    #[test]
    fn discrete_changes_always_included() {
        let mut enc = encoder(30);
        let mut players = roster(2);
        enc.encode(1, &players, &[], false);

        let id = *players.keys().next().unwrap();
        players.get_mut(&id).unwrap().bullet_charges = 3;
        let Some(ServerMsg::GameStatePartial { players: changed, .. }) =
            enc.encode(2, &players, &[], false)
        else {
            panic!("expected delta");
        };
        assert_eq!(changed.len(), 1);

        players.get_mut(&id).unwrap().kill(3000.0);
        assert!(enc.encode(3, &players, &[], false).is_some());
    }

    #[test]
    fn power_ups_only_sent_when_changed() {
        let mut enc = encoder(30);
        let players = roster(1);
        enc.encode(1, &players, &[], false);

        let set = vec![power_up(1)];
        match enc.encode(2, &players, &set, true) {
            Some(ServerMsg::GameStatePartial {
                players, power_ups, ..
            }) => {
                assert!(players.is_empty());
                assert_eq!(power_ups, Some(set.clone()));
            }
            other => panic!("expected delta, got {:?}", other),
        }
        assert!(enc.encode(3, &players, &set, false).is_none());
    }

    #[test]
    fn forced_full_after_roster_change() {
        let mut enc = encoder(30);
        let players = roster(2);
        enc.encode(1, &players, &[], false);
        enc.force_next();
        assert!(matches!(
            enc.encode(2, &players, &[], false),
            Some(ServerMsg::GameState { .. })
        ));
    }

    #[test]
    fn deltas_between_fulls_reproduce_the_later_full() {
        let interval = 12;
        let mut enc = encoder(interval);
        let mut players = roster(4);
        let ids: Vec<Uuid> = {
            let mut ids: Vec<Uuid> = players.keys().copied().collect();
            ids.sort();
            ids
        };
        let mut view = SnapshotView::default();
        let mut power_ups: Vec<PowerUpSnapshot> = Vec::new();
        let mut fulls_checked = 0;

        for tick in 1..=60u64 {
            // Varied motion: one fast, one crawling, one frozen, one toggling charges
            players.get_mut(&ids[0]).unwrap().x += 1.5;
            players.get_mut(&ids[0]).unwrap().heading += 0.1;
            players.get_mut(&ids[1]).unwrap().y += 0.3;
            if tick % 7 == 0 {
                players.get_mut(&ids[3]).unwrap().bullet_charges += 1;
            }
            if tick == 20 {
                players.get_mut(&ids[2]).unwrap().kill(3000.0);
            }
            let changed = tick % 9 == 0;
            if changed {
                power_ups.push(power_up(tick));
            }

            let Some(msg) = enc.encode(tick, &players, &power_ups, changed) else {
                continue;
            };

            if let ServerMsg::GameState {
                players: full,
                power_ups: full_power_ups,
                ..
            } = &msg
            {
                if tick > 1 {
                    assert_eq!(view.players.len(), full.len());
                    for expected in full {
                        let seen = &view.players[&expected.id];
                        assert!(
                            PhysicsSystem::distance_sq(seen.x, seen.y, expected.x, expected.y)
                                <= 0.5 * 0.5 + 1e-4
                        );
                        assert!(PhysicsSystem::angle_between(seen.heading, expected.heading) <= 0.01 + 1e-5);
                        assert_eq!(seen.alive, expected.alive);
                        assert_eq!(seen.bullet_charges, expected.bullet_charges);
                        assert_eq!(seen.bullets, expected.bullets);
                        assert_eq!(seen.score, expected.score);
                    }
                    assert_eq!(&view.power_ups, full_power_ups);
                    fulls_checked += 1;
                }
            }
            assert!(view.apply(&msg));
        }

        assert!(fulls_checked >= 4);
    }

    #[test]
    fn view_ignores_stale_sequence() {
        let mut view = SnapshotView::default();
        let full = ServerMsg::GameState {
            seq: 5,
            tick: 5,
            players: vec![],
            power_ups: vec![power_up(1)],
        };
        let stale = ServerMsg::GameStatePartial {
            seq: 4,
            tick: 4,
            players: vec![],
            power_ups: Some(vec![]),
        };
        assert!(view.apply(&full));
        assert!(!view.apply(&stale));
        assert_eq!(view.power_ups.len(), 1);
    }
}
