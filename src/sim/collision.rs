//! Contact direction classification
//!
//! Every reaction in the game depends on which side of a thing was struck:
//! landing on a block is different from walking into it. The classifier looks
//! at how deep the two boxes overlap on each axis and how they are moving
//! relative to each other.

use serde::{Deserialize, Serialize};

use super::world::Body;
use crate::consts::SHALLOW_CONTACT;

/// Which side of `b` the colliding body `a` came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// `a` landed on top of `b`
    Above,
    /// `a` struck the underside of `b`
    Below,
    /// `a` is on the left of `b`
    Left,
    /// `a` is on the right of `b`
    Right,
}

impl Direction {
    pub fn is_side(&self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

/// Classify the contact between `a` and `b` from `b`'s point of view
///
/// A vertical contact needs a shallow vertical overlap (shallower than the
/// horizontal one, or under [`SHALLOW_CONTACT`] so block seams under a walker
/// still read as floor) plus relative motion that agrees with it: moving down
/// onto `b` is `Above`, moving up into `b` is `Below`. Everything else is a
/// side hit decided by horizontal displacement.
///
/// Deterministic and side-effect free.
pub fn classify(a: &Body, b: &Body) -> Direction {
    let delta = a.pos - b.pos;
    let rel_vel = a.vel - b.vel;
    let pen = a.penetration(b);

    let vertical = pen.y <= pen.x || pen.y <= SHALLOW_CONTACT;
    if vertical {
        if delta.y < 0.0 && rel_vel.y >= 0.0 {
            return Direction::Above;
        }
        if delta.y > 0.0 && rel_vel.y <= 0.0 {
            return Direction::Below;
        }
    }

    if delta.x < 0.0 {
        Direction::Left
    } else {
        Direction::Right
    }
}
