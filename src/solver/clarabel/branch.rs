//! Depth-first branch and bound over continuous Clarabel relaxations.

use std::time::Instant;

use clarabel::solver::SolverStatus;
use log::{debug, info};

use super::model::{ClarabelModel, ModelSolution, ModelStatus, Relaxation};

/// Outcome of a branch-and-bound search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MipStatus {
    /// The search finished with a proven optimal incumbent.
    Optimal,
    /// No integer-feasible point exists.
    Infeasible,
    /// The root relaxation is unbounded.
    Unbounded,
    /// The node limit was reached.
    NodeLimit,
    /// The time limit was reached.
    TimeLimit,
    /// Some node relaxations ended without a verdict, so the incumbent is
    /// not proven optimal. Carries the first such status.
    Unresolved(SolverStatus),
    /// The root relaxation failed with the given status, or a later one did
    /// and no incumbent was found.
    RelaxationFailed(SolverStatus),
}

struct Node {
    lb: Vec<f64>,
    ub: Vec<f64>,
    depth: usize,
}

struct Incumbent {
    x: Vec<f64>,
    obj: f64,
}

/// Solve `model` to integer optimality.
pub(crate) fn branch_and_bound(model: &ClarabelModel) -> ModelSolution {
    let controls = model.mip_controls().clone();
    let int_idx = model.integer_indices();
    let deadline = model.time_limit().map(|limit| Instant::now() + limit);
    let (lb, ub) = model.effective_bounds();

    let mut stack = vec![Node { lb, ub, depth: 0 }];
    let mut incumbent: Option<Incumbent> = None;
    let mut nodes = 0usize;
    let mut stopped: Option<MipStatus> = None;
    // first status of a relaxation that was neither solved nor proven infeasible
    let mut unresolved: Option<SolverStatus> = None;

    while let Some(node) = stack.pop() {
        if nodes >= controls.max_nodes {
            stopped = Some(MipStatus::NodeLimit);
            break;
        }
        if deadline.map_or(false, |d| Instant::now() >= d) {
            stopped = Some(MipStatus::TimeLimit);
            break;
        }
        nodes += 1;

        let relax = model.solve_relaxation(&node.lb, &node.ub);
        match relax.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {}
            SolverStatus::PrimalInfeasible => continue,
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible
                if node.depth == 0 =>
            {
                stopped = Some(MipStatus::Unbounded);
                break;
            }
            status if node.depth == 0 => {
                stopped = Some(MipStatus::RelaxationFailed(status));
                break;
            }
            status => {
                debug!("dropping node at depth {}: relaxation {:?}", node.depth, status);
                if unresolved.is_none() {
                    unresolved = Some(status);
                }
                continue;
            }
        }

        if let Some(best) = &incumbent {
            if relax.obj_val >= best.obj - controls.gap_abs {
                continue;
            }
        }

        match most_fractional(&relax, &int_idx, controls.int_tol) {
            None => {
                let x = round_integers(relax.x, &int_idx);
                let obj = model.objective(&x);
                debug!("new incumbent {} at node {}", obj, nodes);
                incumbent = Some(Incumbent { x, obj });
            }
            Some(j) => {
                let v = relax.x[j];
                let mut down = Node {
                    lb: node.lb.clone(),
                    ub: node.ub.clone(),
                    depth: node.depth + 1,
                };
                down.ub[j] = v.floor();
                let mut up = Node {
                    lb: node.lb,
                    ub: node.ub,
                    depth: node.depth + 1,
                };
                up.lb[j] = v.ceil();
                // down branch is explored first
                stack.push(up);
                stack.push(down);
            }
        }
    }

    let status = match (stopped, unresolved, &incumbent) {
        (Some(status), _, _) => status,
        (None, Some(SolverStatus::MaxTime), Some(_)) => MipStatus::TimeLimit,
        (None, Some(status), Some(_)) => MipStatus::Unresolved(status),
        (None, Some(status), None) => MipStatus::RelaxationFailed(status),
        (None, None, Some(_)) => MipStatus::Optimal,
        (None, None, None) => MipStatus::Infeasible,
    };
    info!("branch and bound finished: {:?} after {} nodes", status, nodes);

    let (x, obj_val) = match incumbent {
        Some(inc) if keeps_incumbent(status) => (Some(inc.x), inc.obj),
        _ => (None, f64::NAN),
    };
    ModelSolution {
        status: ModelStatus::Mip(status),
        x,
        eq_duals: None,
        ineq_duals: None,
        obj_val,
        iterations: 0,
        nodes: Some(nodes),
        warm_started: false,
    }
}

fn keeps_incumbent(status: MipStatus) -> bool {
    matches!(
        status,
        MipStatus::Optimal
            | MipStatus::NodeLimit
            | MipStatus::TimeLimit
            | MipStatus::Unresolved(_)
    )
}

/// Integer variable whose relaxed value is furthest from an integer.
fn most_fractional(relax: &Relaxation, int_idx: &[usize], tol: f64) -> Option<usize> {
    int_idx
        .iter()
        .map(|&j| (j, (relax.x[j] - relax.x[j].round()).abs()))
        .filter(|&(_, frac)| frac > tol)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(j, _)| j)
}

fn round_integers(mut x: Vec<f64>, int_idx: &[usize]) -> Vec<f64> {
    for &j in int_idx {
        x[j] = x[j].round();
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::clarabel::model::{RowSense, VarType};
    use crate::sparse::csc_scaled_identity;

    const INF: f64 = 1e20;
    const TOL: f64 = 1e-5;

    fn relaxation(x: Vec<f64>) -> Relaxation {
        Relaxation {
            status: SolverStatus::Solved,
            x,
            eq_duals: vec![],
            ineq_duals: vec![],
            obj_val: 0.0,
            iterations: 0,
        }
    }

    #[test]
    fn test_most_fractional() {
        let relax = relaxation(vec![0.5, 1.9, 2.0000001, 0.3]);
        assert_eq!(most_fractional(&relax, &[0, 1, 2], 1e-5), Some(0));
        assert_eq!(most_fractional(&relax, &[1, 2], 1e-5), Some(1));
        assert_eq!(most_fractional(&relax, &[2], 1e-5), None);
    }

    #[test]
    fn test_integer_rounding_of_quadratic() {
        // min x^2 - 5.2 x over the integers: x = 3
        let mut model = ClarabelModel::new(INF);
        model.add_variables(&[-5.2], &[-INF], &[INF]).unwrap();
        model.set_quadratic(&csc_scaled_identity(1, 2.0)).unwrap();
        model.set_var_type(0, VarType::Integer).unwrap();
        model.hide_output();

        let sol = branch_and_bound(&model);
        assert_eq!(sol.status, ModelStatus::Mip(MipStatus::Optimal));
        assert!((sol.x.unwrap()[0] - 3.0).abs() < TOL);
        assert!((sol.obj_val - (-6.6)).abs() < TOL);
        assert!(sol.nodes.unwrap() >= 3);
    }

    #[test]
    fn test_infeasible_binary() {
        // binary x with x >= 0.5 and x <= 0.7
        let mut model = ClarabelModel::new(INF);
        model.add_variables(&[1.0], &[-INF], &[INF]).unwrap();
        model
            .add_rows(
                vec![(vec![0], vec![-1.0]), (vec![0], vec![1.0])],
                RowSense::LessEqual,
                &[-0.5, 0.7],
            )
            .unwrap();
        model.set_var_type(0, VarType::Binary).unwrap();
        model.hide_output();

        let sol = branch_and_bound(&model);
        assert_eq!(sol.status, ModelStatus::Mip(MipStatus::Infeasible));
        assert!(sol.x.is_none());
    }
}
