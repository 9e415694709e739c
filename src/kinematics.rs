// Analytic inverse kinematics for a 3-DOF hexapod leg
// Converts a foot position in the leg frame into coxa/femur/tibia angles.
//
// The coxa yaws the whole leg around the vertical axis, which reduces the
// remaining femur/tibia pair to a planar 2-link arm.

use crate::geometry::Point3D;

/// Leg link lengths (meters)
pub const COXA_LENGTH: f64 = 0.032;
pub const FEMUR_LENGTH: f64 = 0.090;
pub const TIBIA_LENGTH: f64 = 0.112;

#[derive(Debug, Clone, thiserror::Error)]
pub enum KinematicsError {
    #[error("No solution for x={x}, y={y} with link lengths l0={l0}, l1={l1}")]
    NoSolution { x: f64, y: f64, l0: f64, l1: f64 },

    #[error("No solution for foot at ({x}, {y}, {z}) with link lengths l0={l0}, l1={l1}, l2={l2}")]
    UnreachableFoot {
        x: f64,
        y: f64,
        z: f64,
        l0: f64,
        l1: f64,
        l2: f64,
        #[source]
        source: Box<KinematicsError>,
    },
}

pub type Result<T> = std::result::Result<T, KinematicsError>;

/// Joint angles in radians, proximal to distal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointAngles {
    pub coxa: f64,
    pub femur: f64,
    pub tibia: f64,
}

impl JointAngles {
    pub fn new(coxa: f64, femur: f64, tibia: f64) -> Self {
        Self { coxa, femur, tibia }
    }

    /// Returns angles as array [coxa, femur, tibia]
    pub fn as_array(&self) -> [f64; 3] {
        [self.coxa, self.femur, self.tibia]
    }
}

/// Solve a planar 2-link arm with links `l0`, `l1` reaching (x, y)
///
/// The elbow-down branch is used, so the second angle is always in [-pi, 0].
pub fn solve_2dof(l0: f64, l1: f64, x: f64, y: f64) -> Result<(f64, f64)> {
    let numerator = x * x + y * y - l0 * l0 - l1 * l1;
    let denominator = 2.0 * l0 * l1;
    let cos_elbow = numerator / denominator;

    // acos would return NaN here, report it instead
    if !(cos_elbow.abs() <= 1.0) {
        return Err(KinematicsError::NoSolution { x, y, l0, l1 });
    }

    let theta1 = -cos_elbow.acos();

    let k1 = l0 + l1 * theta1.cos();
    let k2 = l1 * theta1.sin();
    let theta0 = y.atan2(x) - k2.atan2(k1);

    Ok((theta0, theta1))
}

/// Solve a 3-DOF leg: coxa yaw, then the femur/tibia plane
pub fn solve_3dof(l0: f64, l1: f64, l2: f64, x: f64, y: f64, z: f64) -> Result<JointAngles> {
    let coxa = y.atan2(x);
    let radial = x.hypot(y) - l0;

    let (femur, tibia) =
        solve_2dof(l1, l2, radial, z).map_err(|e| KinematicsError::UnreachableFoot {
            x,
            y,
            z,
            l0,
            l1,
            l2,
            source: Box::new(e),
        })?;

    Ok(JointAngles::new(coxa, femur, tibia))
}

/// Inverse kinematics solver for one leg geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegSolver {
    pub l0: f64,
    pub l1: f64,
    pub l2: f64,
}

impl Default for LegSolver {
    fn default() -> Self {
        Self::new(COXA_LENGTH, FEMUR_LENGTH, TIBIA_LENGTH)
    }
}

impl LegSolver {
    pub fn new(l0: f64, l1: f64, l2: f64) -> Self {
        Self { l0, l1, l2 }
    }

    /// Joint angles placing the foot at `foot`
    pub fn solve(&self, foot: Point3D) -> Result<JointAngles> {
        solve_3dof(self.l0, self.l1, self.l2, foot.x, foot.y, foot.z)
    }

    /// Foot position produced by `angles`
    pub fn forward(&self, angles: JointAngles) -> Point3D {
        let knee = angles.femur + angles.tibia;
        let radial = self.l0 + self.l1 * angles.femur.cos() + self.l2 * knee.cos();
        let z = self.l1 * angles.femur.sin() + self.l2 * knee.sin();

        Point3D::new(
            radial * angles.coxa.cos(),
            radial * angles.coxa.sin(),
            z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const EPS: f64 = 1e-6;

    #[test]
    fn test_2dof_reference_table() {
        // (x, y, theta0, theta1) for links 2 and 1
        let cases = [
            (3.0, 0.0, 0.0, 0.0),
            (-3.0, 0.0, PI, 0.0),
            (0.0, 3.0, PI / 2.0, 0.0),
            (0.0, -3.0, -PI / 2.0, 0.0),
            (2.0, -1.0, 0.0, -PI / 2.0),
            (2.0, 0.0, 0.5053605, -1.8234766),
            (1.5, -1.5, -0.2987032, -1.6961242),
        ];

        for (x, y, theta0, theta1) in cases {
            let (a0, a1) = solve_2dof(2.0, 1.0, x, y).unwrap();
            assert!(
                (a0 - theta0).abs() < EPS,
                "theta0 for ({x}, {y}): expected {theta0}, got {a0}"
            );
            assert!(
                (a1 - theta1).abs() < EPS,
                "theta1 for ({x}, {y}): expected {theta1}, got {a1}"
            );
        }
    }

    #[test]
    fn test_2dof_unreachable() {
        // Just outside the outer and inner workspace boundaries
        for (x, y) in [(3.001, 0.0), (0.0, 0.999), (0.0, 0.0), (-4.0, 2.0)] {
            let result = solve_2dof(2.0, 1.0, x, y);
            assert!(
                matches!(result, Err(KinematicsError::NoSolution { .. })),
                "({x}, {y}) should have no solution"
            );
        }
    }

    #[test]
    fn test_3dof_wraps_planar_failure() {
        let solver = LegSolver::default();
        let err = solver.solve(Point3D::new(0.5, 0.0, 0.0)).unwrap_err();

        match err {
            KinematicsError::UnreachableFoot { x, source, .. } => {
                assert_eq!(x, 0.5);
                assert!(matches!(*source, KinematicsError::NoSolution { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_solve_then_forward_recovers_foot() {
        let solver = LegSolver::default();

        let mut checked = 0;
        for x in [0.06, 0.08, 0.1, 0.12, 0.15] {
            for y in [-0.06, -0.02, 0.0, 0.03, 0.06] {
                for z in [-0.1, -0.08, -0.05, -0.02, 0.0] {
                    let foot = Point3D::new(x, y, z);
                    let Ok(angles) = solver.solve(foot) else {
                        continue;
                    };
                    let recovered = solver.forward(angles);
                    assert!(
                        recovered.almost_equal(foot, 1e-9),
                        "{foot} came back as {recovered}"
                    );
                    checked += 1;
                }
            }
        }

        // Most of this grid sits inside the workspace
        assert!(checked > 100, "only {checked} points were reachable");
    }

    #[test]
    fn test_coxa_follows_foot_bearing() {
        let solver = LegSolver::default();
        let angles = solver.solve(Point3D::new(0.1, 0.1, -0.05)).unwrap();
        assert!((angles.coxa - PI / 4.0).abs() < EPS);
    }
}
