//! The simulation state and its five-phase tick driver.
//!
//! Grounded in `FluidSimulation::run` in
//! `examples/original_source/include/FluidSimulation.h`: gravity injection,
//! pressure relaxation, capacity-bounded flow propagation to convergence,
//! kinetic-energy reconciliation, and probabilistic migration, in that order,
//! once per tick. [`crate::propagate`] holds the recursive DFS propagators
//! phases C–E dispatch into; this module owns the per-cell state and phases
//! A, B, and D, which are plain row-major sweeps with no recursion.

use crate::density::DensityTable;
use crate::direction::Direction;
use crate::grid::{Backend, GridStorage};
use crate::io::LoadedGrid;
use crate::scalar::Scalar;
use crate::velocity::VelocityField;
use rand_chacha::ChaCha8Rng;

/// Tri-state generation stamp (`last_use`). Plain `i64`
/// arithmetic rather than a Rust `enum`, matching the original's raw
/// integer. The hot path compares it against `UT` and `UT - 1` directly
/// and a wrapper enum would just add match overhead for no clarity gain
/// (the three states *are* `< UT-1`, `== UT-1`, `== UT`, not named variants
/// with independent meaning).
pub type LastUse = i64;

/// Full per-tick simulation state, generic over the three scalar parameters
/// (`P` pressure, `V` velocity, `FV` flow) and the storage [`Backend`].
pub struct Simulation<P, V, FV, B: Backend> {
    pub(crate) rows: usize,
    pub(crate) cols: usize,
    pub(crate) field: B::Storage<u8>,
    pub(crate) rho: DensityTable<P>,
    pub(crate) p: B::Storage<P>,
    pub(crate) old_p: B::Storage<P>,
    pub(crate) dirs: B::Storage<i32>,
    pub(crate) last_use: B::Storage<LastUse>,
    pub(crate) ut: LastUse,
    pub(crate) gravity: V,
    pub(crate) velocity: VelocityField<V, B>,
    pub(crate) velocity_flow: VelocityField<FV, B>,
    pub(crate) total_delta_p: P,
    pub(crate) rng: ChaCha8Rng,
}

impl<P, V, FV, B> Simulation<P, V, FV, B>
where
    P: Scalar,
    V: Scalar,
    FV: Scalar,
    B: Backend,
{
    /// Build a simulation from a loaded grid, computing `dirs` once at
    /// startup (parallelized by row range, the one precompute this crate
    /// sanctions for rayon).
    pub fn from_grid(grid: &LoadedGrid, rng: ChaCha8Rng) -> Self
    where
        B::Storage<u8>: Sync,
    {
        let rows = grid.rows;
        let cols = grid.cols;

        let mut field = B::Storage::<u8>::filled(rows, cols, b'#');
        for r in 0..rows {
            for c in 0..cols {
                *field.get_mut(r, c) = grid.field[r][c];
            }
        }

        let rho_air = P::from_f64(grid.rho_air);
        let rho_fluid = P::from_f64(grid.rho_fluid);
        let rho = DensityTable::new(rho_air, rho_fluid);
        let g = V::from_f64(grid.g);

        let mut sim = Self {
            rows,
            cols,
            field,
            rho,
            p: B::Storage::<P>::filled(rows, cols, P::zero()),
            old_p: B::Storage::<P>::filled(rows, cols, P::zero()),
            dirs: B::Storage::<i32>::filled(rows, cols, 0),
            last_use: B::Storage::<LastUse>::filled(rows, cols, 0),
            ut: 0,
            gravity: g,
            velocity: VelocityField::new(rows, cols),
            velocity_flow: VelocityField::new(rows, cols),
            total_delta_p: P::zero(),
            rng,
        };
        sim.compute_dirs();
        sim
    }

    fn compute_dirs(&mut self)
    where
        B::Storage<u8>: Sync,
    {
        use rayon::prelude::*;

        let rows = self.rows;
        let cols = self.cols;
        let field = &self.field;
        let mut counts = vec![0i32; rows * cols];

        counts.par_chunks_mut(cols).enumerate().for_each(|(r, row)| {
            for c in 0..cols {
                if *field.get(r, c) == b'#' {
                    continue;
                }
                let mut n = 0;
                for d in Direction::ALL {
                    if let Some((nr, nc)) = d.neighbor(r, c, rows, cols) {
                        if *field.get(nr, nc) != b'#' {
                            n += 1;
                        }
                    }
                }
                row[c] = n;
            }
        });

        for r in 0..rows {
            for c in 0..cols {
                *self.dirs.get_mut(r, c) = counts[r * cols + c];
            }
        }
    }

    pub fn field_char(&self, r: usize, c: usize) -> u8 {
        *self.field.get(r, c)
    }

    pub fn total_delta_p(&self) -> P {
        self.total_delta_p
    }

    /// `(rho_air, rho_fluid, gravity)` as `f64`, for checkpoint writing.
    /// Exact for every scalar type this crate wires up: the fixed-point
    /// `to_f64` is lossless, and these three values are never mutated
    /// after load.
    pub fn checkpoint_scalars(&self) -> (f64, f64, f64) {
        (
            self.rho.get(b' ').to_f64(),
            self.rho.get(b'.').to_f64(),
            self.gravity.to_f64(),
        )
    }

    /// Render the field as `R` rows of ASCII, for both tick-output and
    /// checkpoint writing.
    pub fn field_rows(&self) -> Vec<String> {
        (0..self.rows)
            .map(|r| {
                (0..self.cols)
                    .map(|c| *self.field.get(r, c) as char)
                    .collect()
            })
            .collect()
    }

    /// Run phase A: gravity injection.
    fn phase_gravity(&mut self) {
        for r in 0..self.rows {
            for c in 0..self.cols {
                if *self.field.get(r, c) == b'#' {
                    continue;
                }
                if let Some((nr, nc)) = Direction::Down.neighbor(r, c, self.rows, self.cols) {
                    if *self.field.get(nr, nc) != b'#' {
                        self.velocity.add(r, c, Direction::Down, self.gravity);
                    }
                }
            }
        }
    }

    /// Run phase B: pressure relaxation into velocity, reading only
    /// `old_p` and writing only `p`/`velocity`/the neighbor's back-pointing
    /// velocity component.
    fn phase_pressure_relaxation(&mut self) {
        for r in 0..self.rows {
            for c in 0..self.cols {
                *self.old_p.get_mut(r, c) = *self.p.get(r, c);
            }
        }

        for r in 0..self.rows {
            for c in 0..self.cols {
                if *self.field.get(r, c) == b'#' {
                    continue;
                }
                for d in Direction::ALL {
                    let Some((nr, nc)) = d.neighbor(r, c, self.rows, self.cols) else {
                        continue;
                    };
                    if *self.field.get(nr, nc) == b'#' {
                        continue;
                    }
                    if !(*self.old_p.get(nr, nc) < *self.old_p.get(r, c)) {
                        continue;
                    }

                    let delta_p = *self.old_p.get(r, c) - *self.old_p.get(nr, nc);
                    let mut force = delta_p;
                    let rho_neighbor = self.rho.get(*self.field.get(nr, nc));

                    let contr = *self.velocity.get(nr, nc, d.opposite());
                    let contr_p: P = crate::scalar::cast(contr);
                    if contr_p * rho_neighbor >= force {
                        let delta_v: V = crate::scalar::cast(force / rho_neighbor);
                        *self.velocity.get_mut(nr, nc, d.opposite()) = contr - delta_v;
                        continue;
                    }

                    force = force - contr_p * rho_neighbor;
                    *self.velocity.get_mut(nr, nc, d.opposite()) = V::zero();

                    let rho_here = self.rho.get(*self.field.get(r, c));
                    let added: V = crate::scalar::cast(force / rho_here);
                    self.velocity.add(r, c, d, added);

                    let dirs_here = P::from_i32(*self.dirs.get(r, c));
                    let share = force / dirs_here;
                    *self.p.get_mut(r, c) = *self.p.get(r, c) - share;
                    self.total_delta_p = self.total_delta_p - share;
                }
            }
        }
    }

    /// Run phase D: kinetic-energy reconciliation of converged flow back
    /// into pressure.
    fn phase_reconcile(&mut self) {
        for r in 0..self.rows {
            for c in 0..self.cols {
                if *self.field.get(r, c) == b'#' {
                    continue;
                }
                for d in Direction::ALL {
                    let old_v = *self.velocity.get(r, c, d);
                    if !(old_v > V::zero()) {
                        continue;
                    }
                    let new_v = *self.velocity_flow.get(r, c, d);
                    let old_v_fv: FV = crate::scalar::cast(old_v);
                    debug_assert!(
                        !(old_v_fv < new_v),
                        "flow exceeded capacity during reconciliation"
                    );

                    *self.velocity.get_mut(r, c, d) = crate::scalar::cast(new_v);
                    let new_v_as_v: V = crate::scalar::cast(new_v);
                    let mut force: P = crate::scalar::cast(old_v - new_v_as_v);
                    force = force * self.rho.get(*self.field.get(r, c));
                    if *self.field.get(r, c) == b'.' {
                        force = force * P::from_f64(0.8);
                    }

                    match d.neighbor(r, c, self.rows, self.cols) {
                        None => {
                            let dirs_here = P::from_i32(*self.dirs.get(r, c));
                            let share = force / dirs_here;
                            *self.p.get_mut(r, c) = *self.p.get(r, c) + share;
                            self.total_delta_p = self.total_delta_p + share;
                        }
                        Some((nr, nc)) => {
                            if *self.field.get(nr, nc) == b'#' {
                                let dirs_here = P::from_i32(*self.dirs.get(r, c));
                                let share = force / dirs_here;
                                *self.p.get_mut(r, c) = *self.p.get(r, c) + share;
                                self.total_delta_p = self.total_delta_p + share;
                            } else {
                                let dirs_there = P::from_i32(*self.dirs.get(nr, nc));
                                let share = force / dirs_there;
                                *self.p.get_mut(nr, nc) = *self.p.get(nr, nc) + share;
                                self.total_delta_p = self.total_delta_p + share;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Execute one full tick (phases A-E). Returns whether phase E migrated
    /// at least one cell, which gates the tick-output print.
    pub fn tick(&mut self, index: u64) -> bool {
        let span = tracing::debug_span!("tick", index, ut = self.ut);
        let _guard = span.enter();

        self.total_delta_p = P::zero();

        tracing::trace!("phase A: gravity");
        self.phase_gravity();

        tracing::trace!("phase B: pressure relaxation");
        self.phase_pressure_relaxation();

        tracing::trace!("phase C: flow propagation");
        self.phase_flow();

        tracing::trace!("phase D: reconciliation");
        self.phase_reconcile();

        tracing::trace!("phase E: migration");
        let moved = self.phase_migrate();

        tracing::debug!(total_delta_p = ?self.total_delta_p, moved, "tick complete");
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Dynamic;
    use crate::io::LoadedGrid;

    fn grid_from_rows(rows: &[&str], rho_air: f64, rho_fluid: f64, g: f64) -> LoadedGrid {
        let field: Vec<Vec<u8>> = rows.iter().map(|r| r.as_bytes().to_vec()).collect();
        let cols = field[0].len();
        LoadedGrid {
            rows: field.len(),
            cols,
            field,
            rho_air,
            rho_fluid,
            g,
        }
    }

    fn build(rows: &[&str], rho_air: f64, rho_fluid: f64, g: f64) -> Simulation<f64, f64, f64, Dynamic> {
        let grid = grid_from_rows(rows, rho_air, rho_fluid, g);
        Simulation::from_grid(&grid, crate::rng::new_rng())
    }

    const COLUMN: [&str; 5] = ["###", "#.#", "#.#", "#.#", "###"];

    #[test]
    fn ticks_zero_is_a_no_op_except_dirs() {
        let s = build(&COLUMN, 0.01, 1000.0, 0.1);
        for r in 0..s.rows {
            for c in 0..s.cols {
                assert_eq!(*s.p.get(r, c), 0.0);
                for d in Direction::ALL {
                    assert_eq!(*s.velocity.get(r, c, d), 0.0);
                }
            }
        }
    }

    #[test]
    fn all_obstacle_grid_produces_no_change() {
        let mut s = build(&["###", "###", "###"], 0.01, 1000.0, 0.1);
        let before = s.field_rows();
        let moved = s.tick(0);
        assert!(!moved);
        assert_eq!(s.field_rows(), before);
        assert_eq!(s.total_delta_p(), 0.0);
    }

    /// Every neighbor of the single open column is `#`, so nothing ever
    /// writes a horizontal velocity component: phase A only ever touches
    /// the down component, and phase B only touches a direction whose
    /// neighbor is non-`#`.
    #[test]
    fn single_open_column_has_zero_horizontal_velocity_indefinitely() {
        let mut s = build(&COLUMN, 0.01, 1000.0, 0.1);
        for tick in 0..5 {
            s.tick(tick);
            for r in 0..s.rows {
                for c in 0..s.cols {
                    if *s.field.get(r, c) == b'#' {
                        continue;
                    }
                    assert_eq!(*s.velocity.get(r, c, Direction::Left), 0.0);
                    assert_eq!(*s.velocity.get(r, c, Direction::Right), 0.0);
                }
            }
        }
    }

    #[test]
    fn dirs_never_change_after_initialization() {
        let mut s = build(&COLUMN, 0.01, 1000.0, 0.1);
        let before: Vec<i32> = (0..s.rows)
            .flat_map(|r| (0..s.cols).map(move |c| (r, c)))
            .map(|(r, c)| *s.dirs.get(r, c))
            .collect();
        for tick in 0..5 {
            s.tick(tick);
        }
        let after: Vec<i32> = (0..s.rows)
            .flat_map(|r| (0..s.cols).map(move |c| (r, c)))
            .map(|(r, c)| *s.dirs.get(r, c))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn last_use_never_exceeds_ut() {
        let mut s = build(&COLUMN, 0.01, 1000.0, 0.1);
        for tick in 0..5 {
            s.tick(tick);
            for r in 0..s.rows {
                for c in 0..s.cols {
                    assert!(*s.last_use.get(r, c) <= s.ut);
                }
            }
        }
    }

    /// Phase E only ever swaps two cells' field bytes; the field is always
    /// a permutation of its initial multiset.
    #[test]
    fn field_is_always_a_permutation_of_its_initial_multiset() {
        let rows = ["#####", "#. .#", "#.. #", "#####"];
        let mut s = build(&rows, 0.01, 1000.0, 0.1);

        let mut before: Vec<u8> = (0..s.rows)
            .flat_map(|r| (0..s.cols).map(move |c| (r, c)))
            .map(|(r, c)| *s.field.get(r, c))
            .collect();
        before.sort();

        for tick in 0..10 {
            s.tick(tick);
        }

        let mut after: Vec<u8> = (0..s.rows)
            .flat_map(|r| (0..s.cols).map(move |c| (r, c)))
            .map(|(r, c)| *s.field.get(r, c))
            .collect();
        after.sort();

        assert_eq!(before, after);
    }

    /// After phase D, velocity never exceeds its pre-tick value wherever
    /// it was positive.
    #[test]
    fn velocity_never_increases_across_a_tick_where_it_was_positive() {
        let mut s = build(&COLUMN, 0.01, 1000.0, 0.1);
        let old: Vec<((usize, usize, Direction), f64)> = (0..s.rows)
            .flat_map(|r| (0..s.cols).map(move |c| (r, c)))
            .flat_map(|(r, c)| Direction::ALL.into_iter().map(move |d| (r, c, d)))
            .map(|(r, c, d)| ((r, c, d), *s.velocity.get(r, c, d)))
            .collect();

        s.tick(0);

        for ((r, c, d), old_v) in old {
            if old_v > 0.0 {
                assert!(*s.velocity.get(r, c, d) <= old_v);
            }
        }
    }
}
