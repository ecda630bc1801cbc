//! Power-up spawning, expiry and collection

use std::collections::HashMap;

use rand::Rng;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::ws::protocol::{PowerUpKind, PowerUpSnapshot};

use super::physics::PhysicsSystem;
use super::player::PlayerState;

/// Power-up constants pulled out of the game config
#[derive(Debug, Clone, Copy)]
pub struct PowerUpStats {
    pub spawn_interval_ms: u64,
    pub duration_ms: u64,
    pub collection_radius: f32,
    pub size: f32,
    pub bullet_bonus: u32,
    pub world_width: f32,
    pub world_height: f32,
}

impl PowerUpStats {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            spawn_interval_ms: config.power_up_spawn_interval_ms,
            duration_ms: config.power_up_duration_ms,
            collection_radius: config.power_up_collection_radius,
            size: config.power_up_size,
            bullet_bonus: config.power_up_bullet_bonus,
            world_width: config.world_width,
            world_height: config.world_height,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerUp {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub kind: PowerUpKind,
    /// Room clock at spawn
    pub spawn_ms: u64,
    pub size: f32,
}

impl PowerUp {
    pub fn snapshot(&self) -> PowerUpSnapshot {
        PowerUpSnapshot {
            id: self.id,
            x: self.x,
            y: self.y,
            kind: self.kind,
            size: self.size,
            spawn_ms: self.spawn_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub player_id: Uuid,
    pub power_up_id: u64,
    pub kind: PowerUpKind,
}

/// What happened to the power-up set during one tick
#[derive(Debug, Default)]
pub struct PowerUpTick {
    pub spawned: Option<PowerUp>,
    pub expired: usize,
    pub collected: Vec<Collection>,
}

impl PowerUpTick {
    /// The power-up set differs from the previous tick
    pub fn changed(&self) -> bool {
        self.spawned.is_some() || self.expired > 0 || !self.collected.is_empty()
    }
}

/// Owns a room's power-ups for the current round
#[derive(Debug)]
pub struct PowerUpSystem {
    stats: PowerUpStats,
    power_ups: Vec<PowerUp>,
    last_spawn_ms: Option<u64>,
    next_id: u64,
}

impl PowerUpSystem {
    pub fn new(stats: PowerUpStats) -> Self {
        Self {
            stats,
            power_ups: Vec::new(),
            last_spawn_ms: None,
            next_id: 1,
        }
    }

    pub fn power_ups(&self) -> &[PowerUp] {
        &self.power_ups
    }

    pub fn snapshots(&self) -> Vec<PowerUpSnapshot> {
        self.power_ups.iter().map(PowerUp::snapshot).collect()
    }

    /// Drop everything at round start. Ids keep counting up.
    pub fn reset(&mut self) {
        self.power_ups.clear();
        self.last_spawn_ms = None;
    }

    /// Spawn, expire and collect for one tick of an in-progress round.
    /// Equidistant collectors are settled by `roster` order.
    pub fn update<R: Rng>(
        &mut self,
        now_ms: u64,
        players: &mut HashMap<Uuid, PlayerState>,
        roster: &[Uuid],
        rng: &mut R,
    ) -> PowerUpTick {
        let spawned = self.maybe_spawn(now_ms, rng);
        let (expired, collected) = self.expire_and_collect(now_ms, players, roster);
        PowerUpTick {
            spawned,
            expired,
            collected,
        }
    }

    fn maybe_spawn<R: Rng>(&mut self, now_ms: u64, rng: &mut R) -> Option<PowerUp> {
        let due = self
            .last_spawn_ms
            .map_or(true, |last| now_ms.saturating_sub(last) > self.stats.spawn_interval_ms);
        if !due {
            return None;
        }

        let size = self.stats.size;
        let power_up = PowerUp {
            id: self.next_id,
            x: interior(rng, size, self.stats.world_width),
            y: interior(rng, size, self.stats.world_height),
            kind: PowerUpKind::BulletRefill,
            spawn_ms: now_ms,
            size,
        };
        self.next_id += 1;
        self.last_spawn_ms = Some(now_ms);
        self.power_ups.push(power_up.clone());
        Some(power_up)
    }

    /// Single filtering pass: expiry is decided first, then collection by the
    /// nearest living head within reach.
    fn expire_and_collect(
        &mut self,
        now_ms: u64,
        players: &mut HashMap<Uuid, PlayerState>,
        roster: &[Uuid],
    ) -> (usize, Vec<Collection>) {
        let radius_sq = self.stats.collection_radius * self.stats.collection_radius;
        let duration = self.stats.duration_ms;
        let bonus = self.stats.bullet_bonus;
        let mut expired = 0;
        let mut collected = Vec::new();

        self.power_ups.retain(|power_up| {
            if now_ms.saturating_sub(power_up.spawn_ms) >= duration {
                expired += 1;
                return false;
            }

            let collector = roster
                .iter()
                .filter_map(|id| players.get(id))
                .filter(|p| p.alive)
                .map(|p| {
                    let d = PhysicsSystem::distance_sq(p.x, p.y, power_up.x, power_up.y);
                    (d, p.id)
                })
                .filter(|(d, _)| *d < radius_sq)
                .min_by(|(a, _), (b, _)| a.total_cmp(b));

            match collector.and_then(|(_, id)| players.get_mut(&id)) {
                Some(player) => {
                    match power_up.kind {
                        PowerUpKind::BulletRefill => player.bullet_charges += bonus,
                    }
                    collected.push(Collection {
                        player_id: player.id,
                        power_up_id: power_up.id,
                        kind: power_up.kind,
                    });
                    false
                }
                None => true,
            }
        });

        (expired, collected)
    }
}

/// Uniform draw from `[margin, extent - margin)`, or the midpoint when the margin leaves no room
pub(super) fn interior<R: Rng>(rng: &mut R, margin: f32, extent: f32) -> f32 {
    if extent > 2.0 * margin {
        rng.gen_range(margin..extent - margin)
    } else {
        extent / 2.0
    }
}
