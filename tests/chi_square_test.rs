//! Cross-check of the Fisher score's chi-square survival function against
//! statrs.

use falx::classifier::inverse_chi_square;
use statrs::distribution::{ChiSquared, ContinuousCDF};

#[test]
fn test_matches_chi_squared_survival_function() {
    for df in (2..=60).step_by(2) {
        let distribution = ChiSquared::new(df as f64).unwrap();
        for step in 0..=80 {
            let chi = step as f64 * 0.75;
            let expected = distribution.sf(chi);
            let actual = inverse_chi_square(chi, df);
            assert!(
                (expected - actual).abs() < 1e-7,
                "chi={chi} df={df}: statrs={expected} falx={actual}"
            );
        }
    }
}

#[test]
fn test_zero_statistic() {
    assert_eq!(inverse_chi_square(0.0, 2), 1.0);
    assert_eq!(inverse_chi_square(0.0, 0), 1.0);
}

#[test]
fn test_result_is_a_probability() {
    for df in (0..=1000).step_by(10) {
        for chi in [0.0, 0.1, 1.0, 10.0, 100.0, 1_000.0, 10_000.0, f64::MAX] {
            let p = inverse_chi_square(chi, df);
            assert!((0.0..=1.0).contains(&p), "chi={chi} df={df}: {p}");
        }
    }
}
