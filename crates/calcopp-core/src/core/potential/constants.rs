/// Boltzmann constant in eV K⁻¹, the exact ratio of the SI values of `k_B` (J K⁻¹) and `e` (C).
pub const BOLTZMANN_CONSTANT_EV: f64 = 1.380_649e-23 / 1.602_176_634e-19;

/// Stand-in for the infinite potential of an inaccessible position, in eV.
pub const INFINITE_OPP: f64 = 1.0e6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boltzmann_constant_matches_codata_value_in_ev() {
        assert!((BOLTZMANN_CONSTANT_EV - 8.617_333_262e-5).abs() < 1e-14);
    }
}
