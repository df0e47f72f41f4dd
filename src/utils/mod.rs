//! The utilities module provides general capabilities, that may span the
//! components, queues, resources, states, monitors, and simulator modules.
//! The utilities are centered around error reporting and common arithmetic.

pub mod errors;

/// Quantities within this tolerance are considered equal, to absorb the
/// rounding of repeated claim and release arithmetic.
pub const QUANTITY_TOLERANCE: f64 = 1.0e-9;

pub fn equivalent_f64(a: f64, b: f64) -> bool {
    (a - b).abs() <= QUANTITY_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_equivalent_f64() {
        assert![equivalent_f64(0.1 + 0.2, 0.3)];
        assert![!equivalent_f64(1.0, 1.001)];
    }
}
