//! Player state (authoritative)

use uuid::Uuid;

use crate::ws::protocol::{BulletSnapshot, PlayerSnapshot, TurnDirection};

use super::combat::Bullet;

/// Player state in a room
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub id: Uuid,

    // Position and movement
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub turning: TurnDirection,

    // Liveness
    pub alive: bool,
    /// Milliseconds until respawn, only meaningful while dead
    pub respawn_ms: f32,
    /// Excluded from trail stamping and trail collision. No game rule turns it on
    /// yet; it is carried on the wire for clients that draw ghost trails.
    pub ghost: bool,
    /// Last trail check result, reused when a check is skipped
    pub reported_hit: bool,

    // Combat
    pub bullet_charges: u32,
    pub bullets: Vec<Bullet>,
    /// Set by `shoot`, consumed on the next tick
    pub fire_requested: bool,

    pub score: u32,
}

impl PlayerState {
    pub fn new(id: Uuid, x: f32, y: f32, heading: f32) -> Self {
        Self {
            id,
            x,
            y,
            heading,
            turning: TurnDirection::Straight,
            alive: true,
            respawn_ms: 0.0,
            ghost: false,
            reported_hit: false,
            bullet_charges: 0,
            bullets: Vec::new(),
            fire_requested: false,
            score: 0,
        }
    }

    /// Alive -> Dead. Clears everything a death forfeits.
    pub fn kill(&mut self, respawn_ms: f32) {
        self.alive = false;
        self.respawn_ms = respawn_ms;
        self.bullet_charges = 0;
        self.bullets.clear();
        self.turning = TurnDirection::Straight;
        self.fire_requested = false;
    }

    /// Count the respawn timer down by one tick.
    /// Returns true when the timer has run out.
    pub fn tick_respawn(&mut self, elapsed_ms: f32) -> bool {
        self.respawn_ms -= elapsed_ms;
        self.respawn_ms <= 0.0
    }

    /// Put the player back on the field at a fresh spot
    pub fn respawn(&mut self, x: f32, y: f32, heading: f32) {
        self.x = x;
        self.y = y;
        self.heading = heading;
        self.alive = true;
        self.respawn_ms = 0.0;
        self.reported_hit = false;
        self.turning = TurnDirection::Straight;
        self.bullet_charges = 0;
        self.bullets.clear();
        self.fire_requested = false;
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            x: self.x,
            y: self.y,
            heading: self.heading,
            alive: self.alive,
            ghost: self.ghost,
            bullet_charges: self.bullet_charges,
            bullets: self
                .bullets
                .iter()
                .map(|b| BulletSnapshot {
                    x: b.x,
                    y: b.y,
                    heading: b.heading,
                })
                .collect(),
            score: self.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respawn_timer_counts_down_then_revives_empty_handed() {
        let mut player = PlayerState::new(Uuid::new_v4(), 10.0, 10.0, 0.0);
        player.bullet_charges = 4;
        player.bullets.push(Bullet::new(10.0, 10.0, 0.0, 200.0));
        player.turning = TurnDirection::Right;

        player.kill(3000.0);
        assert!(!player.alive);
        assert_eq!(player.bullet_charges, 0);
        assert!(player.bullets.is_empty());

        let mut last = player.respawn_ms;
        let mut ticks = 0;
        while !player.tick_respawn(1000.0 / 60.0) {
            assert!(player.respawn_ms < last);
            last = player.respawn_ms;
            ticks += 1;
        }
        assert!(player.respawn_ms <= 0.0);
        assert!((179..=180).contains(&ticks));

        player.respawn(500.0, 300.0, 1.0);
        assert!(player.alive);
        assert_eq!(player.bullet_charges, 0);
        assert!(player.bullets.is_empty());
        assert_eq!(player.turning, TurnDirection::Straight);
    }
}
