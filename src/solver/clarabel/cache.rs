//! Solver reuse across solves of structurally identical problems.

use std::fmt;

use clarabel::solver::DefaultSolver;
use log::{debug, warn};

use super::model::Assembled;
use crate::solver::options::OptionValue;

/// Everything a cached solver's data update cannot change.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pattern {
    n_var: usize,
    p_offsets: Vec<usize>,
    p_indices: Vec<usize>,
    a_offsets: Vec<usize>,
    a_indices: Vec<usize>,
    n_eq: usize,
    n_nonneg: usize,
    controls: Vec<(String, OptionValue)>,
    verbose: bool,
}

impl Pattern {
    pub fn new(asm: &Assembled, controls: &[(String, OptionValue)], verbose: bool) -> Self {
        Pattern {
            n_var: asm.q.len(),
            p_offsets: asm.p.col_offsets().to_vec(),
            p_indices: asm.p.row_indices().to_vec(),
            a_offsets: asm.a.col_offsets().to_vec(),
            a_indices: asm.a.row_indices().to_vec(),
            n_eq: asm.n_eq,
            n_nonneg: asm.n_ineq + asm.n_bound,
            controls: controls.to_vec(),
            verbose,
        }
    }
}

/// Session state for warm-started continuous solves.
///
/// Holds the last Clarabel solver built for a continuous problem together
/// with the structure it was built for. A later warm-started solve with the
/// same structure overwrites the solver's data in place instead of building a
/// new one. One session serves one solve at a time.
#[derive(Default)]
pub struct SolverCache {
    entry: Option<(Pattern, DefaultSolver<f64>)>,
}

impl SolverCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a solver is cached.
    pub fn is_populated(&self) -> bool {
        self.entry.is_some()
    }

    /// Drop the cached solver.
    pub fn clear(&mut self) {
        self.entry = None;
    }

    pub(crate) fn store(&mut self, pattern: Pattern, solver: DefaultSolver<f64>) {
        self.entry = Some((pattern, solver));
    }

    /// Load `asm` into the cached solver if it was built for `pattern`.
    ///
    /// A failed update empties the cache.
    pub(crate) fn reuse(
        &mut self,
        pattern: &Pattern,
        asm: &Assembled,
    ) -> Option<&mut DefaultSolver<f64>> {
        match &self.entry {
            Some((cached, _)) if cached == pattern => {}
            Some(_) => {
                debug!("cached solver structure differs, rebuilding");
                return None;
            }
            None => return None,
        }
        let (_, solver) = self.entry.as_mut()?;
        let updated = solver
            .update_data(&asm.clarabel_p(), &asm.q, &asm.clarabel_a(), &asm.b)
            .map_err(|e| e.to_string());
        match updated {
            Ok(()) => {
                debug!("reusing cached solver");
                self.entry.as_mut().map(|(_, solver)| solver)
            }
            Err(reason) => {
                warn!("cached solver could not be updated ({}), rebuilding", reason);
                self.clear();
                None
            }
        }
    }
}

impl fmt::Debug for SolverCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverCache")
            .field("populated", &self.is_populated())
            .finish()
    }
}
