//! Collision detection and response
//!
//! The tricky part of the experiment: at mass ratios up to 10^16 the light
//! block can cover many times the gap between wall and heavy block in one
//! substep. Detection therefore never relies on velocities alone. Every
//! substep runs a wall pass and then a block-block pass, and each pass
//! restores the positional invariants before returning.

use super::state::SimState;

/// Wall penetration found by the corrective branch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Position before it was reset to the wall
    pub position: f64,
    /// Velocity was still pointing into the wall and got flipped
    pub reflected: bool,
}

/// A resolved block-block collision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyHit {
    /// (left, right) velocities before
    pub before: (f64, f64),
    /// (left, right) velocities after
    pub after: (f64, f64),
    /// Re-separation would have pushed the light block behind the wall,
    /// so the heavy block was moved instead
    pub clamped_at_wall: bool,
}

/// What a single resolver pass did
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Resolution {
    pub wall_hit: bool,
    pub penetration: Option<Penetration>,
    pub body_hit: Option<BodyHit>,
    /// Left block was found right of the heavy block without overlap.
    /// Holds (left, right) positions before the fix.
    pub ordering_recovered: Option<(f64, f64)>,
}

impl Resolution {
    /// Nothing happened this substep
    #[inline]
    pub fn is_quiet(&self) -> bool {
        !self.wall_hit
            && self.penetration.is_none()
            && self.body_hit.is_none()
            && self.ordering_recovered.is_none()
    }

    /// Collisions counted by this pass
    pub fn collisions(&self) -> u64 {
        u64::from(self.wall_hit)
            + u64::from(self.penetration.is_some_and(|p| p.reflected))
            + u64::from(self.body_hit.is_some())
    }
}

/// Post-collision velocities of a 1-D elastic collision
#[inline]
pub fn elastic_velocities(m1: f64, v1: f64, m2: f64, v2: f64) -> (f64, f64) {
    let total = m1 + m2;
    let v1_new = ((m1 - m2) * v1 + 2.0 * m2 * v2) / total;
    let v2_new = ((m2 - m1) * v2 + 2.0 * m1 * v1) / total;
    (v1_new, v2_new)
}

/// Run both passes, wall first
pub fn resolve(state: &mut SimState, separation: f64) -> Resolution {
    let mut resolution = Resolution::default();
    resolve_wall(state, &mut resolution);
    resolve_bodies(state, separation, &mut resolution);
    resolution
}

/// Reflect the light block off the wall
pub fn resolve_wall(state: &mut SimState, out: &mut Resolution) {
    let wall = state.wall_position;
    let left = &mut state.left;

    if left.position <= wall && left.velocity < 0.0 {
        left.velocity = -left.velocity;
        left.position = wall;
        state.collision_count += 1;
        out.wall_hit = true;
    }

    // Residual penetration from any other source. Never expected with sane
    // substep sizes.
    if left.position < wall {
        let position = left.position;
        left.position = wall;
        let reflected = left.velocity < 0.0;
        if reflected {
            left.velocity = left.velocity.abs();
            state.collision_count += 1;
        }
        out.penetration = Some(Penetration {
            position,
            reflected,
        });
    }
}

/// Collide the blocks on any overlap, then force them apart
pub fn resolve_bodies(state: &mut SimState, separation: f64, out: &mut Resolution) {
    let wall = state.wall_position;
    let width = state.left.width();
    let left_edge = state.left.right_edge();
    let right_edge = state.right.position;

    if left_edge >= right_edge {
        let before = (state.left.velocity, state.right.velocity);
        let after = elastic_velocities(
            state.left.mass,
            before.0,
            state.right.mass,
            before.1,
        );
        state.left.velocity = after.0;
        state.right.velocity = after.1;

        // Velocities alone can't be trusted to end the overlap at extreme
        // ratios, so always separate by position
        let clamped_at_wall = separate(state, wall, width, separation);

        state.collision_count += 1;
        out.body_hit = Some(BodyHit {
            before,
            after,
            clamped_at_wall,
        });
    } else if state.left.position > state.right.position {
        // Light block passed through the heavy one undetected. Not a
        // collision, just put the blocks back in order.
        let positions = (state.left.position, state.right.position);
        separate(state, wall, width, separation);
        out.ordering_recovered = Some(positions);
    }
}

/// Place the light block `separation` left of the heavy block. Returns
/// true if that would cross the wall and the heavy block was pushed out
/// instead.
fn separate(state: &mut SimState, wall: f64, width: f64, separation: f64) -> bool {
    state.left.position = state.right.position - width - separation;
    if state.left.position < wall {
        state.left.position = wall;
        state.right.position = wall + width + separation;
        true
    } else {
        false
    }
}
