//! Concrete plan variants and the navigation helpers they share.
//!
//! - [`navigate`] – [`NavigatePlan`]: walk to a point, optionally pause there
//!   (investigate) or run (flee).
//! - [`loot`] – [`LootPlan`]: approach a container or floor item, face it,
//!   request the transfer, then confirm via the inventory.
//! - [`search_building`] – [`SearchBuildingPlan`]: room-by-room exploration
//!   with stair seeking, wandering, and stuck-target blacklisting.

pub mod loot;
pub mod navigate;
pub mod search_building;

pub use loot::LootPlan;
pub use navigate::NavigatePlan;
pub use search_building::SearchBuildingPlan;

use std::collections::HashSet;

use scout_types::{ObjectSighting, Position, Stance, WorldSnapshot};
use tracing::debug;

/// Beyond this distance moves are requested at a run.
pub const RUN_DISTANCE: f64 = 10.0;

/// How far ahead of the player closed doors and windows are considered.
const OBSTACLE_SCAN_DISTANCE: f64 = 4.0;

/// Max distance between an obstacle and the straight route for it to block.
const OBSTACLE_LINE_TOLERANCE: f64 = 0.6;

pub fn stance_for(distance: f64) -> Stance {
    if distance > RUN_DISTANCE {
        Stance::Run
    } else {
        Stance::Auto
    }
}

/// First closed door or window lying across the straight segment from the
/// player to `target`, skipping ids in `ignore`.
///
/// Only fixtures on the player's floor, within the scan distance, and not
/// farther away than the target itself are considered.
pub fn obstacle_on_route<'s>(
    snapshot: &'s WorldSnapshot,
    target: Position,
    ignore: &HashSet<String>,
) -> Option<&'s ObjectSighting> {
    let player = snapshot.player.position;
    let (dx, dy) = (target.x - player.x, target.y - player.y);
    let route_len = dx.hypot(dy);
    if route_len < 0.1 {
        return None;
    }

    snapshot.objects.iter().find(|obj| {
        if !obj.is_door_or_window() || obj.is_open() {
            return false;
        }
        let Some(id) = obj.id.as_deref() else {
            return false;
        };
        if ignore.contains(id) || obj.z.floor() != player.z.floor() {
            return false;
        }
        let (ox, oy) = (obj.x - player.x, obj.y - player.y);
        let obj_dist = ox.hypot(oy);
        if obj_dist > OBSTACLE_SCAN_DISTANCE || obj_dist > route_len + 0.5 || obj_dist == 0.0 {
            return false;
        }
        // Projection of the obstacle onto the route, as a fraction of it.
        let t = (ox * dx + oy * dy) / (route_len * route_len);
        if !(0.0..=1.0).contains(&t) {
            return false;
        }
        let off_line = (obj.x - (player.x + t * dx)).hypot(obj.y - (player.y + t * dy));
        if off_line < OBSTACLE_LINE_TOLERANCE {
            debug!(id, object_type = %obj.object_type, off_line, "closed fixture blocks route");
            true
        } else {
            false
        }
    })
}
