//! Quadratic Programming Example
//!
//! Canonicalizes `quad_over_lin(x - c, 2)` and solves
//!
//! minimize    ||x - c||^2 / 2
//! subject to  x1 + x2 = 4, x >= 0
//!
//! with the Clarabel backend, assembling the canonical data by hand.

use cvxreduce::prelude::*;
use cvxreduce::sparse::{csc_from_triplets, csc_to_dense};

fn main() -> Result<()> {
    env_logger::init();
    println!("=== Quadratic Programming ===\n");

    let x = variable((2, 1));
    let target = constant_vec(vec![3.0, 2.0]);
    let residual = &x - &target;
    let atom = quad_over_lin(&residual, &constant(2.0));

    let canon = quad_over_lin_canon(&atom, &[residual, constant(2.0)])?;
    let t = canon.expr.var().clone();
    println!("Canonicalized into t' P t with P =\n{}", canon.expr.coefficient_dense());
    println!("Auxiliary constraints: {}\n", canon.constraints.len());

    // Columns: x (0, 1), t (2, 3). The objective is t' P t = (1/2) t' (2P) t.
    let n = 4;
    let p_t = csc_to_dense(canon.expr.p()) * 2.0;
    let (mut rows, mut cols, mut vals) = (Vec::new(), Vec::new(), Vec::new());
    for i in 0..2 {
        rows.push(2 + i);
        cols.push(2 + i);
        vals.push(p_t[(i, i)]);
    }
    let p = csc_from_triplets(n, n, rows, cols, vals);

    // t - x == -c  and  x1 + x2 == 4
    let a = csc_from_triplets(
        3,
        n,
        vec![0, 0, 1, 1, 2, 2],
        vec![2, 0, 3, 1, 0, 1],
        vec![1.0, -1.0, 1.0, -1.0, 1.0, 1.0],
    );
    let b = vec![-3.0, -2.0, 4.0];
    // -x <= 0
    let f = csc_from_triplets(2, n, vec![0, 1], vec![0, 1], vec![-1.0, -1.0]);
    let g = vec![0.0, 0.0];

    let data = CanonicalProblemData::new(p, vec![0.0; n], a, b, f, g)?;
    let sum_id = ExprId::new();
    let inverse = InverseData::from_vars([&x, &t])
        .with_eq_constraints(&canon.constraints)
        .with_eq_block(sum_id, 1)
        .with_ineq_block(ExprId::new(), 2);

    println!("Solving...");
    let solution = ClarabelQp::new().solve(
        &data,
        &inverse,
        false,
        false,
        &SolverOptions::new(),
        None,
    )?;

    println!("\nResults:");
    println!("  Status: {}", solution.status());
    println!("  Optimal value: {:.6}", solution.opt_val());
    if let Some(Array::Dense(m)) = x.variable_id().and_then(|id| solution.get_value(id)) {
        println!("  x = [{:.6}, {:.6}]", m[(0, 0)], m[(1, 0)]);
    }
    if let Some(dual) = solution.get_dual(sum_id).and_then(Array::as_scalar) {
        println!("  Dual of x1 + x2 = 4: {:.6}", dual);
    }

    // Expected: x = [2.5, 1.5], value = 0.25
    println!("\nExpected: x = [2.5, 1.5], value = 0.25");
    Ok(())
}
