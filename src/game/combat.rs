//! Combat system - bullets, firing, hit detection

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::config::GameConfig;

use super::physics::PhysicsSystem;
use super::player::PlayerState;

/// Bullet constants pulled out of the game config
#[derive(Debug, Clone, Copy)]
pub struct BulletStats {
    /// World units per tick
    pub speed: f32,
    /// Total distance before the bullet is discarded
    pub range: f32,
    /// Kill distance between bullet centre and a head
    pub hit_radius: f32,
    pub world_width: f32,
    pub world_height: f32,
}

impl BulletStats {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            speed: config.bullet_speed,
            range: config.bullet_range,
            hit_radius: config.head_radius + config.bullet_hitbox_radius,
            world_width: config.world_width,
            world_height: config.world_height,
        }
    }
}

/// A bullet in flight, owned by the player that fired it
#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub range_remaining: f32,
}

impl Bullet {
    pub fn new(x: f32, y: f32, heading: f32, range: f32) -> Self {
        Self {
            x,
            y,
            heading,
            range_remaining: range,
        }
    }

    /// Advance one tick. Returns false once the bullet left the world or ran out of range.
    pub fn update(&mut self, stats: &BulletStats) -> bool {
        self.x += self.heading.cos() * stats.speed;
        self.y += self.heading.sin() * stats.speed;
        self.range_remaining -= stats.speed;
        self.range_remaining > 0.0
            && PhysicsSystem::in_world(self.x, self.y, stats.world_width, stats.world_height)
    }

    /// Check collision with a head, without a square root
    pub fn check_hit(&self, target_x: f32, target_y: f32, hit_radius: f32) -> bool {
        PhysicsSystem::distance_sq(self.x, self.y, target_x, target_y) < hit_radius * hit_radius
    }
}

/// Hit result from combat resolution
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub shooter_id: Uuid,
    pub target_id: Uuid,
    pub x: f32,
    pub y: f32,
}

/// Combat system for firing and resolving bullet hits
pub struct CombatSystem;

impl CombatSystem {
    /// Consume a pending fire request. Spends one charge and spawns a bullet
    /// at the head when a charge is available.
    pub fn try_fire(player: &mut PlayerState, stats: &BulletStats) -> bool {
        if !std::mem::take(&mut player.fire_requested) {
            return false;
        }
        if !player.alive || player.bullet_charges == 0 {
            return false;
        }
        player.bullet_charges -= 1;
        player
            .bullets
            .push(Bullet::new(player.x, player.y, player.heading, stats.range));
        true
    }

    /// Move every bullet of a living player, dropping spent ones
    pub fn advance_bullets(player: &mut PlayerState, stats: &BulletStats) {
        if !player.alive {
            return;
        }
        player.bullets.retain_mut(|bullet| bullet.update(stats));
    }

    /// Resolve bullet hits against heads. All hits are judged against the set of
    /// players alive at the start of resolution, so two players can trade kills.
    /// Shooters are visited in `roster` order, which decides credit when two
    /// bullets reach the same head. Bullets that hit are removed; victims are
    /// returned, not yet killed.
    pub fn resolve_hits(
        players: &mut HashMap<Uuid, PlayerState>,
        roster: &[Uuid],
        stats: &BulletStats,
    ) -> Vec<HitResult> {
        let targets: Vec<(Uuid, f32, f32)> = roster
            .iter()
            .filter_map(|id| players.get(id))
            .filter(|p| p.alive)
            .map(|p| (p.id, p.x, p.y))
            .collect();

        let mut hits = Vec::new();
        let mut victims: HashSet<Uuid> = HashSet::new();

        for shooter_id in roster {
            let Some(shooter) = players.get_mut(shooter_id).filter(|p| p.alive) else {
                continue;
            };
            let shooter_id = *shooter_id;

            shooter.bullets.retain(|bullet| {
                let hit = targets.iter().find(|(id, x, y)| {
                    *id != shooter_id
                        && !victims.contains(id)
                        && bullet.check_hit(*x, *y, stats.hit_radius)
                });

                match hit {
                    Some((target_id, _, _)) => {
                        victims.insert(*target_id);
                        hits.push(HitResult {
                            shooter_id,
                            target_id: *target_id,
                            x: bullet.x,
                            y: bullet.y,
                        });
                        false
                    }
                    None => true,
                }
            });
        }

        hits
    }
}
