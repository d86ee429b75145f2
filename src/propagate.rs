//! The recursive DFS propagators: capacity-bounded flow (phase C), the
//! velocity-driven close-off pass (used by phase E when a cell doesn't
//! move), and the probabilistic three-way-swap migration (phase E).
//!
//! Grounded in `propagate_flow`, `propagate_stop`, `propagate_move`, and
//! `move_prob` in `examples/original_source/include/FluidSimulation.h`.
//! All four share the `last_use` tri-state gate: `< UT-1` unvisited,
//! `== UT-1` on-stack, `== UT` closed. The endpoint equality check in
//! [`Simulation::propagate_flow`] is the entire cycle breaker for closed
//! flow loops; it is not an optional optimization and must not be replaced
//! with a visited set.

use crate::direction::Direction;
use crate::grid::{Backend, GridStorage};
use crate::scalar::{cast, min, Scalar};
use crate::tick::Simulation;

impl<P, V, FV, B> Simulation<P, V, FV, B>
where
    P: Scalar,
    V: Scalar,
    FV: Scalar,
    B: Backend,
{
    /// Phase C: reset `velocity_flow`, then repeatedly sweep the grid in
    /// row-major order until a full sweep transfers no new flow.
    pub(crate) fn phase_flow(&mut self) {
        self.velocity_flow = crate::velocity::VelocityField::new(self.rows, self.cols);

        loop {
            self.ut += 2;
            let mut propagated_any = false;
            for r in 0..self.rows {
                for c in 0..self.cols {
                    if *self.field.get(r, c) == b'#' || *self.last_use.get(r, c) == self.ut {
                        continue;
                    }
                    let (transferred, _, _) = self.propagate_flow(r, c, P::one());
                    if transferred > P::zero() {
                        propagated_any = true;
                    }
                }
            }
            if !propagated_any {
                break;
            }
        }
    }

    /// Capacity-bounded recursive flow from `(x, y)` under limit `lim`.
    ///
    /// Returns `(transferred, propagated, endpoint)`. `endpoint` is the
    /// cell the augmenting path ultimately reached; comparing it against
    /// `(x, y)` on the way back out is what stops a closed loop from
    /// extending its own originating edge indefinitely.
    pub(crate) fn propagate_flow(&mut self, x: usize, y: usize, lim: P) -> (P, bool, (i64, i64)) {
        self.last_use.set(x, y, self.ut - 1);
        let mut ret = P::zero();

        for d in Direction::ALL {
            let Some((nx, ny)) = d.neighbor(x, y, self.rows, self.cols) else {
                continue;
            };
            if *self.field.get(nx, ny) == b'#' || *self.last_use.get(nx, ny) >= self.ut {
                continue;
            }

            let cap = *self.velocity.get(x, y, d);
            let flow = *self.velocity_flow.get(x, y, d);
            let cap_as_fv: FV = cast(cap);
            if flow == cap_as_fv {
                continue;
            }

            let res: V = cap - cast(flow);
            let vp = min(lim, cast(res));

            if *self.last_use.get(nx, ny) == self.ut - 1 {
                self.velocity_flow.add(x, y, d, cast(vp));
                self.last_use.set(x, y, self.ut);
                return (vp, true, (nx as i64, ny as i64));
            }

            let (t, prop, end) = self.propagate_flow(nx, ny, vp);
            ret = ret + t;
            if prop {
                self.velocity_flow.add(x, y, d, cast(t));
                self.last_use.set(x, y, self.ut);
                let breaks_own_cycle = end != (x as i64, y as i64);
                return (t, prop && breaks_own_cycle, end);
            }
        }

        self.last_use.set(x, y, self.ut);
        (ret, false, (0, 0))
    }

    /// Carves out and closes the connected region of cells with no outward
    /// velocity reachable from `(x, y)`.
    pub(crate) fn propagate_stop(&mut self, x: usize, y: usize, force: bool) {
        if !force {
            let mut stop = true;
            for d in Direction::ALL {
                let Some((nx, ny)) = d.neighbor(x, y, self.rows, self.cols) else {
                    continue;
                };
                if *self.field.get(nx, ny) != b'#'
                    && *self.last_use.get(nx, ny) < self.ut - 1
                    && *self.velocity.get(x, y, d) > V::zero()
                {
                    stop = false;
                    break;
                }
            }
            if !stop {
                return;
            }
        }

        self.last_use.set(x, y, self.ut);
        for d in Direction::ALL {
            let Some((nx, ny)) = d.neighbor(x, y, self.rows, self.cols) else {
                continue;
            };
            if *self.field.get(nx, ny) == b'#'
                || *self.last_use.get(nx, ny) == self.ut
                || *self.velocity.get(x, y, d) > V::zero()
            {
                continue;
            }
            self.propagate_stop(nx, ny, false);
        }
    }

    /// Sum of non-negative outgoing velocity out of `(x, y)`, converted to
    /// `P`, used as the weight driving migration probability.
    pub(crate) fn move_prob(&self, x: usize, y: usize) -> P {
        let mut sum = P::zero();
        for d in Direction::ALL {
            let Some((nx, ny)) = d.neighbor(x, y, self.rows, self.cols) else {
                continue;
            };
            if *self.field.get(nx, ny) == b'#' || *self.last_use.get(nx, ny) == self.ut {
                continue;
            }
            let v = *self.velocity.get(x, y, d);
            if v < V::zero() {
                continue;
            }
            sum = sum + cast(v);
        }
        sum
    }

    /// Probabilistic migration step out of `(x, y)`. `is_first` marks the
    /// entry call (the cell drawing its own migration draw) versus a
    /// recursive descent into a neighbor already committed to moving.
    pub(crate) fn propagate_move(&mut self, x: usize, y: usize, is_first: bool) -> bool {
        self.last_use.set(x, y, self.ut - if is_first { 1 } else { 0 });

        let mut ret = false;
        let mut chosen: Option<(usize, usize)> = None;

        loop {
            let mut tres = [P::zero(); 4];
            let mut sum = P::zero();
            let mut neighbors: [Option<(usize, usize)>; 4] = [None; 4];

            for (i, d) in Direction::ALL.into_iter().enumerate() {
                let neighbor = d.neighbor(x, y, self.rows, self.cols);
                neighbors[i] = neighbor;
                let Some((nx, ny)) = neighbor else {
                    tres[i] = sum;
                    continue;
                };
                if *self.field.get(nx, ny) == b'#' || *self.last_use.get(nx, ny) == self.ut {
                    tres[i] = sum;
                    continue;
                }
                let v = *self.velocity.get(x, y, d);
                if v < V::zero() {
                    tres[i] = sum;
                    continue;
                }
                sum = sum + cast(v);
                tres[i] = sum;
            }

            if sum == P::zero() {
                break;
            }

            let draw = P::random01(&mut self.rng) * sum;
            // Smallest index with a strictly-greater running sum: an
            // `upper_bound` over the monotone prefix-sum array.
            let idx = tres.iter().position(|&t| t > draw).expect(
                "draw was < sum but no prefix entry exceeded it: zero-weighted direction chosen",
            );

            let (nx, ny) = neighbors[idx].expect("chosen direction has no neighbor in bounds");
            debug_assert!(*self.velocity.get(x, y, Direction::ALL[idx]) > V::zero());
            debug_assert!(*self.field.get(nx, ny) != b'#');
            debug_assert!(*self.last_use.get(nx, ny) < self.ut);

            chosen = Some((nx, ny));
            ret = *self.last_use.get(nx, ny) == self.ut - 1 || self.propagate_move(nx, ny, false);

            if ret {
                break;
            }
        }

        self.last_use.set(x, y, self.ut);

        for d in Direction::ALL {
            let Some((nx, ny)) = d.neighbor(x, y, self.rows, self.cols) else {
                continue;
            };
            if *self.field.get(nx, ny) != b'#'
                && *self.last_use.get(nx, ny) < self.ut - 1
                && *self.velocity.get(x, y, d) < V::zero()
            {
                self.propagate_stop(nx, ny, false);
            }
        }

        if ret && !is_first {
            if let Some((nx, ny)) = chosen {
                let field_a = *self.field.get(x, y);
                let field_b = *self.field.get(nx, ny);
                *self.field.get_mut(x, y) = field_b;
                *self.field.get_mut(nx, ny) = field_a;

                let p_a = *self.p.get(x, y);
                let p_b = *self.p.get(nx, ny);
                *self.p.get_mut(x, y) = p_b;
                *self.p.get_mut(nx, ny) = p_a;

                self.velocity.swap_cells((x, y), (nx, ny));
            }
        }

        ret
    }

    /// Phase E: probabilistic migration. Returns whether any cell moved.
    pub(crate) fn phase_migrate(&mut self) -> bool {
        self.ut += 2;
        let mut moved = false;
        for r in 0..self.rows {
            for c in 0..self.cols {
                if *self.field.get(r, c) == b'#' || *self.last_use.get(r, c) == self.ut {
                    continue;
                }
                let draw = P::random01(&mut self.rng);
                let prob = self.move_prob(r, c);
                if draw < prob {
                    moved = true;
                    self.propagate_move(r, c, true);
                } else {
                    self.propagate_stop(r, c, true);
                }
            }
        }
        moved
    }
}

/// Small ergonomic helper: `last_use` arithmetic happens often enough in
/// this module that a `get`/`set` pair on the raw grid reads better than
/// `*self.last_use.get_mut(r, c) = v` at every call site.
trait LastUseGrid {
    fn set(&mut self, r: usize, c: usize, v: i64);
}

impl<S: GridStorage<i64>> LastUseGrid for S {
    fn set(&mut self, r: usize, c: usize, v: i64) {
        *self.get_mut(r, c) = v;
    }
}
