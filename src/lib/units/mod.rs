//! Unit and angle conversion shared by every builder.
//!
//! Parameters come in millimetres. Profiles are produced in an internal unit of centimetres,
//!  which is what the modeling hosts we target use natively.

/// Millimetres per internal length unit (cm).
pub const MM_PER_UNIT: f64 = 10.0;

/// Convert a length in millimetres to the internal unit.
pub fn to_internal_length(mm: f64) -> f64 {
    mm / MM_PER_UNIT
}

/// Convert a length in the internal unit back to millimetres.
pub fn from_internal_length(units: f64) -> f64 {
    units * MM_PER_UNIT
}

/// Convert a diameter in millimetres straight to an internal radius
pub fn diameter_to_internal_radius(mm: f64) -> f64 {
    to_internal_length(mm) / 2.0
}

/// Angle subtended by `pitch` of arc length on a circle of `radius`.
///
/// This treats the pitch as arc length, which is close enough to the chord when pitch is much smaller
///  than the radius (a 12mm pitch on an 800mm radius rack, for example).
pub fn angular_step(pitch: f64, radius: f64) -> f64 {
    pitch / radius
}

/// Half the angle spanned by a chord of `width` at `radius`, using the same small-angle approximation
///  as `angular_step`.
pub fn chord_half_angle(width: f64, radius: f64) -> f64 {
    (width / radius) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_mm_to_cm() {
        assert!((to_internal_length(35.0) - 3.5).abs() < EPSILON);
        assert!((from_internal_length(3.5) - 35.0).abs() < EPSILON);
        assert!((diameter_to_internal_radius(35.0) - 1.75).abs() < EPSILON);
    }

    #[test]
    fn test_angular_step() {
        // Rack pitch on the curved rack: 12.38mm on an 800mm radius
        let step = angular_step(to_internal_length(12.38), to_internal_length(800.0));
        assert!((step - 0.015475).abs() < EPSILON);
    }

    #[test]
    fn test_chord_half_angle_is_unit_independent() {
        let mm = chord_half_angle(8.6314, 17.5);
        let cm = chord_half_angle(to_internal_length(8.6314), to_internal_length(17.5));
        assert!((mm - cm).abs() < EPSILON);
        assert!((mm - 0.246611428571).abs() < 1e-9);
    }
}
