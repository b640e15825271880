use super::{Point2d, Point3d, Vector2d};

/// Rotates a vector 90 degrees counter-clockwise.
pub fn rot90(vec: Vector2d) -> Vector2d {
    Vector2d::new(-vec.y, vec.x)
}

/// The unit vector pointing along a heading, in radians from the x-axis.
pub fn heading_vector(heading: f64) -> Vector2d {
    Vector2d::new(heading.cos(), heading.sin())
}

/// Drops the z coordinate of a point.
pub fn flatten(point: Point3d) -> Point2d {
    Point2d::new(point.x, point.y)
}
