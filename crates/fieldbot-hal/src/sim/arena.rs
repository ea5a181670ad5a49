//! Field arena: notes lying on the carpet and notes in flight.

use fieldbot_types::{Pose3d, Translation2d};

pub const FIELD_LENGTH_M: f64 = 16.54;
pub const FIELD_WIDTH_M: f64 = 8.21;

/// Game-piece type name understood by [`Arena::game_pieces_by_type`].
pub const NOTE_TYPE: &str = "Note";

/// Height of a resting note's centre.
const NOTE_REST_HEIGHT_M: f64 = 0.0254;
const GRAVITY_MPS2: f64 = 9.81;

/// Autonomous note positions: blue wing, centre line, red wing.
const AUTO_NOTE_POSITIONS: [(f64, f64); 11] = [
    (2.8956, 4.1050),
    (2.8956, 5.5532),
    (2.8956, 7.0012),
    (8.2705, 0.7529),
    (8.2705, 2.4293),
    (8.2705, 4.1057),
    (8.2705, 5.7821),
    (8.2705, 7.4585),
    (13.6444, 4.1050),
    (13.6444, 5.5532),
    (13.6444, 7.0012),
];

/// A note in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteProjectile {
    pub pose: Pose3d,
    /// Field-frame velocity, m/s.
    pub velocity: [f64; 3],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arena {
    resting: Vec<Translation2d>,
    flying: Vec<NoteProjectile>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the field and place the autonomous notes.
    pub fn reset_field_for_auto(&mut self) {
        self.flying.clear();
        self.resting = AUTO_NOTE_POSITIONS
            .iter()
            .map(|&(x, y)| Translation2d::new(x, y))
            .collect();
    }

    pub fn resting_notes(&self) -> &[Translation2d] {
        &self.resting
    }

    pub fn flying_notes(&self) -> &[NoteProjectile] {
        &self.flying
    }

    pub fn place_note(&mut self, at: Translation2d) {
        self.resting.push(at);
    }

    /// Poses of every piece of the given type, or `None` for a type the arena
    /// does not simulate.
    pub fn game_pieces_by_type(&self, kind: &str) -> Option<Vec<Pose3d>> {
        if kind != NOTE_TYPE {
            return None;
        }
        let resting = self.resting.iter().map(|t| Pose3d {
            x: t.x,
            y: t.y,
            z: NOTE_REST_HEIGHT_M,
            ..Default::default()
        });
        let flying = self.flying.iter().map(|p| p.pose);
        Some(resting.chain(flying).collect())
    }

    /// Remove the first resting note for which `inside` holds.
    pub fn take_note_within(&mut self, inside: impl Fn(Translation2d) -> bool) -> bool {
        match self.resting.iter().position(|t| inside(*t)) {
            Some(i) => {
                self.resting.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn launch(&mut self, projectile: NoteProjectile) {
        self.flying.push(projectile);
    }

    /// Advance projectiles.  Notes that come down inside the field rest where
    /// they land; the rest leave the simulation.
    pub fn step(&mut self, dt: f64) {
        let mut landed = Vec::new();
        self.flying.retain_mut(|p| {
            p.pose.x += p.velocity[0] * dt;
            p.pose.y += p.velocity[1] * dt;
            p.pose.z += p.velocity[2] * dt;
            p.velocity[2] -= GRAVITY_MPS2 * dt;
            if p.pose.z <= NOTE_REST_HEIGHT_M && p.velocity[2] < 0.0 {
                landed.push(p.pose.ground_translation());
                false
            } else {
                true
            }
        });
        self.resting.extend(landed.into_iter().filter(|t| {
            (0.0..=FIELD_LENGTH_M).contains(&t.x) && (0.0..=FIELD_WIDTH_M).contains(&t.y)
        }));
    }
}
