//! End-to-end tests for the oracle: LP duals and certificates, MILP,
//! conflict extraction and BFGS.

use approx::assert_abs_diff_eq;
use nalgebra::DVector;
use oracle_core::{
    compute_iis, minimize, solve, BoundSide, ConstrId, ConstraintSense, FnObjective, LinearModel, LpOracle,
    NlpSettings, NlpStatus, ObjectiveSense, OracleError, OracleSettings, SimplexOracle, SolveStatus, VarType,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_duals_match_finite_differences() {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    init_logging();
    let mut rng = ChaCha8Rng::seed_from_u64(12345);
    let settings = OracleSettings::default();

    for trial in 0..10 {
        // max c.x  s.t.  A x <= b, 0 <= x <= 10 with positive data
        let n = 4;
        let m = 3;
        let mut model = LinearModel::new(format!("random_{}", trial));
        let vars: Vec<_> = (0..n)
            .map(|j| model.add_var(format!("x{}", j), 0.0, 10.0, VarType::Continuous))
            .collect();
        for i in 0..m {
            let terms: Vec<_> = vars.iter().map(|&v| (v, rng.gen_range(0.5..3.0))).collect();
            model
                .add_constraint(format!("r{}", i), terms, ConstraintSense::LessEqual, rng.gen_range(5.0..20.0))
                .unwrap();
        }
        let obj: Vec<_> = vars.iter().map(|&v| (v, rng.gen_range(1.0..5.0))).collect();
        model.set_objective(ObjectiveSense::Maximize, obj, 0.0).unwrap();

        let base = solve(&model, &settings).unwrap();
        assert_eq!(base.status, SolveStatus::Optimal);
        assert!(model.max_violation(&base.x) <= 1e-8);
        let duals = base.duals.clone().unwrap();

        let delta = 1e-5;
        for i in 0..m {
            // Maximization: the price of capacity is nonnegative
            assert!(duals[i] >= -1e-9, "trial {} row {}: dual {}", trial, i, duals[i]);

            let mut perturbed = model.clone();
            let rhs = model.constraints()[i].rhs;
            perturbed.set_rhs(ConstrId(i), rhs + delta).unwrap();
            let moved = solve(&perturbed, &settings).unwrap();
            let slope = (moved.obj_val - base.obj_val) / delta;
            assert_abs_diff_eq!(slope, duals[i], epsilon = 1e-4);
        }
    }
}

#[test]
fn test_equality_duals_min_sense() {
    // min 2x + 3y  s.t.  x + y = 4, x - y >= -2
    // Optimal x = 4, y = 0 (obj 8); d obj / d rhs of the equality is 2.
    let mut m = LinearModel::new("eq");
    let x = m.add_var("x", 0.0, f64::INFINITY, VarType::Continuous);
    let y = m.add_var("y", 0.0, f64::INFINITY, VarType::Continuous);
    let total = m.add_constraint("total", [(x, 1.0), (y, 1.0)], ConstraintSense::Equal, 4.0).unwrap();
    let diff = m
        .add_constraint("diff", [(x, 1.0), (y, -1.0)], ConstraintSense::GreaterEqual, -2.0)
        .unwrap();
    m.set_objective(ObjectiveSense::Minimize, [(x, 2.0), (y, 3.0)], 0.0).unwrap();

    let sol = SimplexOracle::default().solve(&m).unwrap();
    assert_eq!(sol.status, SolveStatus::Optimal);
    assert_abs_diff_eq!(sol.obj_val, 8.0, epsilon = 1e-9);
    assert_abs_diff_eq!(sol.dual(total).unwrap(), 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(sol.dual(diff).unwrap(), 0.0, epsilon = 1e-9);
}

#[test]
fn test_farkas_certificate_separates() {
    // x + y <= 1, x + y >= 3 on the nonnegative orthant: w = 2
    let mut m = LinearModel::new("gap");
    let x = m.add_var("x", 0.0, f64::INFINITY, VarType::Continuous);
    let y = m.add_var("y", 0.0, f64::INFINITY, VarType::Continuous);
    m.add_constraint("low", [(x, 1.0), (y, 1.0)], ConstraintSense::LessEqual, 1.0).unwrap();
    m.add_constraint("high", [(x, 1.0), (y, 1.0)], ConstraintSense::GreaterEqual, 3.0).unwrap();

    let sol = solve(&m, &OracleSettings::default()).unwrap();
    assert_eq!(sol.status, SolveStatus::Infeasible);
    assert_abs_diff_eq!(sol.infeasibility, 2.0, epsilon = 1e-9);
    assert!(sol.value(x).is_none());

    // Every rhs r' with a feasible model satisfies w + u.(r' - r) <= 0
    let u = sol.farkas.unwrap();
    for (low, high) in [(3.0, 3.0), (5.0, 3.0), (4.0, 0.0)] {
        let lhs = sol.infeasibility + u[0] * (low - 1.0) + u[1] * (high - 3.0);
        assert!(lhs <= 1e-9, "certificate violated at ({}, {}): {}", low, high, lhs);
    }
}

#[test]
fn test_unbounded_names_variable() {
    let mut m = LinearModel::new("open");
    let x = m.add_var("x", 0.0, 4.0, VarType::Continuous);
    let theta = m.add_var("theta", f64::NEG_INFINITY, f64::INFINITY, VarType::Continuous);
    m.add_constraint("link", [(x, 1.0), (theta, 1.0)], ConstraintSense::LessEqual, 10.0)
        .unwrap();
    m.set_objective(ObjectiveSense::Minimize, [(x, 1.0), (theta, 1.0)], 0.0).unwrap();

    let sol = solve(&m, &OracleSettings::default()).unwrap();
    assert_eq!(sol.status, SolveStatus::Unbounded);
    assert_eq!(sol.unbounded_var, Some(theta));
}

#[test]
fn test_milp_with_continuous_part() {
    // min -x - 2y + z  s.t.  x + y <= 3.5, y - z <= 1.5, x, y integer in [0, 10], z >= 0
    let mut m = LinearModel::new("mixed");
    let x = m.add_var("x", 0.0, 10.0, VarType::Integer);
    let y = m.add_var("y", 0.0, 10.0, VarType::Integer);
    let z = m.add_var("z", 0.0, f64::INFINITY, VarType::Continuous);
    m.add_constraint("cap", [(x, 1.0), (y, 1.0)], ConstraintSense::LessEqual, 3.5).unwrap();
    m.add_constraint("link", [(y, 1.0), (z, -1.0)], ConstraintSense::LessEqual, 1.5).unwrap();
    m.set_objective(ObjectiveSense::Minimize, [(x, -1.0), (y, -2.0), (z, 1.0)], 0.0)
        .unwrap();

    let sol = solve(&m, &OracleSettings::default()).unwrap();
    assert_eq!(sol.status, SolveStatus::Optimal);
    // y = 3, z = 1.5, x = 0 gives -4.5; y = 2, z = 0.5, x = 1 gives -4.5 as well
    assert_abs_diff_eq!(sol.obj_val, -4.5, epsilon = 1e-9);
    assert!(m.max_violation(&sol.x) <= 1e-9);
    for j in [0, 1] {
        assert_eq!(sol.x[j], sol.x[j].round());
    }
    assert!(sol.duals.is_none());
}

#[test]
fn test_iis_of_two_rows() {
    init_logging();
    let mut m = LinearModel::new("diagnose");
    let x = m.add_var("x", f64::NEG_INFINITY, f64::INFINITY, VarType::Continuous);
    let y = m.add_var("y", 0.0, f64::INFINITY, VarType::Continuous);
    m.add_constraint("cap", [(x, 1.0)], ConstraintSense::LessEqual, 8.0).unwrap();
    m.add_constraint("budget", [(x, 1.0), (y, 1.0)], ConstraintSense::LessEqual, 50.0)
        .unwrap();
    m.add_constraint("demand", [(x, 1.0)], ConstraintSense::GreaterEqual, 10.0).unwrap();
    m.set_objective(ObjectiveSense::Minimize, [(x, 1.0), (y, 1.0)], 0.0).unwrap();

    assert_eq!(solve(&m, &OracleSettings::default()).unwrap().status, SolveStatus::Infeasible);

    let iis = SimplexOracle::default().compute_iis(&m).unwrap();
    assert_eq!(iis.constraints, vec![ConstrId(0), ConstrId(2)]);
    assert!(iis.bounds.is_empty());
    assert_eq!(iis.len(), 2);

    let listing = iis.to_string();
    assert!(listing.contains("cap: x <= 8"));
    assert!(listing.contains("demand: x >= 10"));
    assert!(!listing.contains("budget"));
}

#[test]
fn test_iis_keeps_bound_members() {
    let mut m = LinearModel::new("bounded");
    let x = m.add_var("x", 0.0, 8.0, VarType::Integer);
    m.add_constraint("demand", [(x, 1.0)], ConstraintSense::GreaterEqual, 10.0).unwrap();

    let iis = compute_iis(&m, &OracleSettings::default()).unwrap();
    assert_eq!(iis.constraints, vec![ConstrId(0)]);
    assert_eq!(iis.bounds, vec![(x, BoundSide::Upper)]);
}

#[test]
fn test_iis_requires_infeasible_model() {
    let mut m = LinearModel::new("fine");
    let x = m.add_var("x", 0.0, 8.0, VarType::Continuous);
    m.add_constraint("c", [(x, 1.0)], ConstraintSense::GreaterEqual, 1.0).unwrap();
    assert!(matches!(
        compute_iis(&m, &OracleSettings::default()),
        Err(OracleError::IisUnavailable(_))
    ));
}

#[test]
fn test_bfgs_quadratic_and_rosenbrock() {
    // 0.5 x'Qx - b'x with Q = [[4, 1], [1, 3]], b = [1, 2]: x* = Q^-1 b = (1/11, 7/11)
    let quad = FnObjective::new(
        2,
        |x: &DVector<f64>| 0.5 * (4.0 * x[0] * x[0] + 2.0 * x[0] * x[1] + 3.0 * x[1] * x[1]) - x[0] - 2.0 * x[1],
        |x: &DVector<f64>| DVector::from_vec(vec![4.0 * x[0] + x[1] - 1.0, x[0] + 3.0 * x[1] - 2.0]),
    );
    let sol = minimize(&quad, &[5.0, -5.0], &NlpSettings::default()).unwrap();
    assert_eq!(sol.status, NlpStatus::Optimal);
    assert_abs_diff_eq!(sol.x[0], 1.0 / 11.0, epsilon = 1e-7);
    assert_abs_diff_eq!(sol.x[1], 7.0 / 11.0, epsilon = 1e-7);

    let rosen = FnObjective::new(
        2,
        |x: &DVector<f64>| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2),
        |x: &DVector<f64>| {
            DVector::from_vec(vec![
                -2.0 * (1.0 - x[0]) - 400.0 * x[0] * (x[1] - x[0] * x[0]),
                200.0 * (x[1] - x[0] * x[0]),
            ])
        },
    );
    let sol = minimize(&rosen, &[-1.2, 1.0], &NlpSettings::default()).unwrap();
    assert_eq!(sol.status, NlpStatus::Optimal);
    assert_abs_diff_eq!(sol.x[0], 1.0, epsilon = 1e-5);
    assert_abs_diff_eq!(sol.x[1], 1.0, epsilon = 1e-5);
}
