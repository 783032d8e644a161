use fnv::FnvBuildHasher;
use nalgebra::Point3;
use std::collections::HashSet;

/// A macro to unwrap an option to its `Some` value, and bail out of the current
/// function with an [anyhow::Error] if not. Can only be used in functions that
/// return an [anyhow::Result].
#[macro_export]
macro_rules! unwrap_or_bail {
    ($opt:expr, $fmt:expr, $($arg:tt)*) => {
        match $opt {
            Some(v) => v,
            None => return Err(anyhow::anyhow!($fmt, $($arg)*)),
        }
    };
}

/// A macro to measure the evaluation time of an expression. Wraps an
/// expression, logs how long it took at the given level (debug by default),
/// and evaluates to the value of the expression.
#[macro_export]
macro_rules! timed {
    ($label:expr, $ex:expr) => {
        $crate::timed!($label, log::Level::Debug, $ex)
    };
    ($label:expr, $log_level:expr, $ex:expr) => {{
        let now = std::time::Instant::now();
        let value = $ex;
        let elapsed = now.elapsed();
        log::log!(
            $log_level,
            "{} took {} μs",
            $label,
            elapsed.as_micros()
        );
        value
    }};
}

/// The integer cell of the world grid that a block occupies. Blocks are unit
/// cubes, so a block at a world position occupies the cell at that position
/// rounded to the nearest integers.
pub type WorldCell = Point3<i32>;
/// A set of world cells
pub type WorldCellSet = HashSet<WorldCell, FnvBuildHasher>;

/// Round a float to the nearest integer. Ties go to the even neighbor
/// (banker's rounding), so `0.5` becomes `0` and `1.5` becomes `2`. Puzzle
/// geometry snaps the mirror to half-integers, so the tie behavior matters and
/// has to stay stable.
pub fn round_to_int(value: f64) -> i32 {
    value.round_ties_even() as i32
}

/// Like [f64::signum], except that zero (of either sign) maps to zero. Pointer
/// deltas of zero should not move anything.
pub fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Round each component of a world position to get the cell it occupies
pub fn round_to_cell(position: Point3<f64>) -> WorldCell {
    position.map(round_to_int)
}

/// Floor each component of a world position
pub fn floor_to_cell(position: Point3<f64>) -> WorldCell {
    position.map(|c| c.floor() as i32)
}

/// Ceil each component of a world position
pub fn ceil_to_cell(position: Point3<f64>) -> WorldCell {
    position.map(|c| c.ceil() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_int() {
        assert_eq!(round_to_int(0.4), 0);
        assert_eq!(round_to_int(0.6), 1);
        assert_eq!(round_to_int(-0.6), -1);
        // Ties go to even
        assert_eq!(round_to_int(0.5), 0);
        assert_eq!(round_to_int(1.5), 2);
        assert_eq!(round_to_int(2.5), 2);
        assert_eq!(round_to_int(-0.5), 0);
        assert_eq!(round_to_int(-1.5), -2);
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(3.2), 1.0);
        assert_eq!(sign(-0.01), -1.0);
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.0), 0.0);
    }

    #[test]
    fn test_cells() {
        let position = Point3::new(1.2, -0.7, 2.5);
        assert_eq!(round_to_cell(position), Point3::new(1, -1, 2));
        assert_eq!(floor_to_cell(position), Point3::new(1, -1, 2));
        assert_eq!(ceil_to_cell(position), Point3::new(2, 0, 3));
    }
}
