//! Dense per-cell 4-vector keyed by [`Direction`], backed by a [`Backend`].
//!
//! Ported from `VelocityField<CurrentType>` in
//! `examples/original_source/include/FluidSimulation.h`. The original stores
//! `std::array<CurrentType, 4>` per cell and does a linear `std::ranges::find`
//! over the delta list to resolve a direction to a slot index; since our
//! [`Direction`] enum already carries its slot index, that lookup collapses
//! to `Direction::index`.

use crate::direction::Direction;
use crate::grid::{Backend, GridStorage};
use std::ops::Add;

/// Four independent per-cell scalar planes, one per [`Direction`].
pub struct VelocityField<T, B: Backend> {
    components: [B::Storage<T>; 4],
}

impl<T, B: Backend> VelocityField<T, B>
where
    T: Clone + Default + std::fmt::Debug,
{
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            components: std::array::from_fn(|_| B::Storage::<T>::filled(rows, cols, T::default())),
        }
    }

    pub fn get(&self, r: usize, c: usize, dir: Direction) -> &T {
        self.components[dir.index()].get(r, c)
    }

    pub fn get_mut(&mut self, r: usize, c: usize, dir: Direction) -> &mut T {
        self.components[dir.index()].get_mut(r, c)
    }

    /// Add `delta` to the component in place, returning the new value.
    pub fn add(&mut self, r: usize, c: usize, dir: Direction, delta: T) -> T
    where
        T: Add<Output = T> + Copy,
    {
        let slot = self.components[dir.index()].get_mut(r, c);
        *slot = *slot + delta;
        *slot
    }

    /// Exchange the full 4-vector at `a` with the one at `b`, in place.
    ///
    /// Grounded in `ParticleParams::swap_with` in
    /// `examples/original_source/include/FluidSimulation.h`, which threads a
    /// scratch struct through three `std::swap` calls to rotate a cell's
    /// field/pressure/velocity triple with a neighbor's. Rust has no need
    /// for the scratch-struct dance: a direct read-exchange-write per
    /// component is the same rotation with no intermediate allocation.
    pub fn swap_cells(&mut self, a: (usize, usize), b: (usize, usize))
    where
        T: Copy,
    {
        for component in &mut self.components {
            let va = *component.get(a.0, a.1);
            let vb = *component.get(b.0, b.1);
            *component.get_mut(a.0, a.1) = vb;
            *component.get_mut(b.0, b.1) = va;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Dynamic;

    #[test]
    fn get_set_independent_per_direction() {
        let mut v: VelocityField<f64, Dynamic> = VelocityField::new(3, 3);
        *v.get_mut(1, 1, Direction::Up) = 1.0;
        *v.get_mut(1, 1, Direction::Down) = 2.0;
        assert_eq!(*v.get(1, 1, Direction::Up), 1.0);
        assert_eq!(*v.get(1, 1, Direction::Down), 2.0);
        assert_eq!(*v.get(1, 1, Direction::Left), 0.0);
    }

    #[test]
    fn add_accumulates() {
        let mut v: VelocityField<f64, Dynamic> = VelocityField::new(2, 2);
        v.add(0, 0, Direction::Right, 1.5);
        v.add(0, 0, Direction::Right, 0.5);
        assert_eq!(*v.get(0, 0, Direction::Right), 2.0);
    }

    #[test]
    fn swap_cells_exchanges_all_four_directions() {
        let mut v: VelocityField<f64, Dynamic> = VelocityField::new(2, 2);
        *v.get_mut(0, 0, Direction::Up) = 1.0;
        *v.get_mut(0, 0, Direction::Right) = 2.0;
        *v.get_mut(1, 1, Direction::Down) = 3.0;
        v.swap_cells((0, 0), (1, 1));
        assert_eq!(*v.get(1, 1, Direction::Up), 1.0);
        assert_eq!(*v.get(1, 1, Direction::Right), 2.0);
        assert_eq!(*v.get(0, 0, Direction::Down), 3.0);
        assert_eq!(*v.get(0, 0, Direction::Up), 0.0);
    }
}
