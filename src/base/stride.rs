// Tripod stride geometry
//
// One stride is a fixed cycle of six foot waypoints in the leg frame. Both
// tripods walk the same cycle half a stride apart. Steering rotates every
// waypoint about the middle of the stride before it is handed to a leg.

use crate::geometry::Point3D;

/// Distance of the stride line from the shoulder (m)
pub const STRIDE_REACH: f64 = 0.1;
/// Half the stride length (m)
pub const STRIDE_HALF_LENGTH: f64 = 0.04;
/// Foot height while on the ground (m)
pub const GROUND_HEIGHT: f64 = -0.08;
/// Foot height while swinging (m)
pub const SWING_HEIGHT: f64 = -0.03;
/// Extra push past the stride ends (m)
pub const LEAN: f64 = 0.01;
/// Swing waypoints run this much faster than the stride speed
pub const SWING_SPEED_FACTOR: f64 = 1.5;

/// Point the stride is rotated about when steering
pub const STRIDE_CENTER: Point3D = Point3D::new(STRIDE_REACH, 0.0, 0.0);

pub const WAYPOINTS_PER_STRIDE: usize = 6;

/// Steering sign per tripod (A, B)
pub const TRIPOD_TURN_SIGN: [f64; 2] = [-1.0, 1.0];
/// Steering sign per slot within a tripod
pub const SLOT_TURN_SIGN: [f64; 3] = [1.0, -1.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: Point3D,
    /// Foot speed on the way to this waypoint (m/s)
    pub speed: f64,
}

impl Waypoint {
    const fn new(x: f64, y: f64, z: f64, speed: f64) -> Self {
        Self {
            position: Point3D::new(x, y, z),
            speed,
        }
    }
}

/// The stride cycle walked at `speed`
pub fn waypoints(speed: f64) -> [Waypoint; WAYPOINTS_PER_STRIDE] {
    let x = STRIDE_REACH;
    let dy = STRIDE_HALF_LENGTH;
    let swing = SWING_SPEED_FACTOR * speed;

    [
        Waypoint::new(x, -dy, GROUND_HEIGHT, speed),
        Waypoint::new(x, -dy - LEAN, GROUND_HEIGHT, swing),
        Waypoint::new(x, -dy, SWING_HEIGHT, swing),
        Waypoint::new(x, dy + LEAN, SWING_HEIGHT, swing),
        Waypoint::new(x, dy, GROUND_HEIGHT, swing),
        Waypoint::new(x, 0.0, GROUND_HEIGHT, speed),
    ]
}

/// Waypoint `index` of the cycle as seen by `tripod` (0 or 1)
pub fn tripod_waypoint(cycle: &[Waypoint; WAYPOINTS_PER_STRIDE], tripod: usize, index: usize) -> Waypoint {
    let phase = tripod * WAYPOINTS_PER_STRIDE / 2;
    cycle[(index + phase) % WAYPOINTS_PER_STRIDE]
}

/// Steering angle for the leg in `slot` of `tripod`
pub fn turn_angle(tripod: usize, slot: usize, direction: f64) -> f64 {
    TRIPOD_TURN_SIGN[tripod] * SLOT_TURN_SIGN[slot] * direction
}

/// Foot target for a leg mounted at `angle_from_base`, steered by `turn`
pub fn leg_target(waypoint: Point3D, angle_from_base: f64, turn: f64) -> Point3D {
    (waypoint - STRIDE_CENTER).rotate_z(-angle_from_base + turn) + STRIDE_CENTER
}
