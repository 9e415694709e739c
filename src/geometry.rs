// Point arithmetic for foot positions
//
// Foot positions are expressed in a leg's local frame: origin at the shoulder
// joint, x pointing outward, z pointing up.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Default tolerance used by [`Point3D::almost_equal`]
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub const ORIGIN: Point3D = Point3D::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Componentwise absolute value
    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs(), self.z.abs())
    }

    /// Euclidean magnitude
    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// p-norm of the vector
    pub fn norm_p(self, p: f64) -> f64 {
        let a = self.abs();
        (a.x.powf(p) + a.y.powf(p) + a.z.powf(p)).powf(1.0 / p)
    }

    /// True when the two points are closer than `tolerance`
    pub fn almost_equal(self, other: Point3D, tolerance: f64) -> bool {
        (self - other).norm() < tolerance
    }

    /// Rotate counter-clockwise about the z axis by `angle` radians
    pub fn rotate_z(self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(
            self.x * cos - self.y * sin,
            self.x * sin + self.y * cos,
            self.z,
        )
    }
}

impl fmt::Display for Point3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4}, {:.4})", self.x, self.y, self.z)
    }
}

impl Neg for Point3D {
    type Output = Point3D;

    fn neg(self) -> Point3D {
        Point3D::new(-self.x, -self.y, -self.z)
    }
}

// Vector-vector and vector-scalar operators, all componentwise
macro_rules! componentwise_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<Point3D> for Point3D {
            type Output = Point3D;

            fn $method(self, rhs: Point3D) -> Point3D {
                Point3D::new(self.x $op rhs.x, self.y $op rhs.y, self.z $op rhs.z)
            }
        }

        impl $trait<f64> for Point3D {
            type Output = Point3D;

            fn $method(self, rhs: f64) -> Point3D {
                Point3D::new(self.x $op rhs, self.y $op rhs, self.z $op rhs)
            }
        }
    };
}

componentwise_op!(Add, add, +);
componentwise_op!(Sub, sub, -);
componentwise_op!(Mul, mul, *);
componentwise_op!(Div, div, /);
