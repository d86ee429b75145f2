//! Grid storage: a [`Backend`] abstracts over compile-time-sized dense
//! arrays and runtime-sized `Vec`-backed storage, so the rest of the crate
//! (velocity fields, pressure, `dirs`, `last_use`) is written once and
//! instantiated over either.
//!
//! Ported from the `StorageType<Type>` alias in
//! `examples/original_source/include/FluidSimulation.h`, which picks between
//! `std::array` and `std::vector` storage based on whether the simulation
//! was instantiated with compile-time dimensions. Rust's generic associated
//! types let us express the same choice as a trait rather than a
//! `std::conditional_t`.

/// Per-cell 2-D storage of a single value type `T`.
pub trait GridStorage<T>: Sized {
    /// Allocate storage for `rows` x `cols` cells, all set to `value`.
    fn filled(rows: usize, cols: usize, value: T) -> Self
    where
        T: Clone;

    fn rows(&self) -> usize;
    fn cols(&self) -> usize;

    fn get(&self, r: usize, c: usize) -> &T;
    fn get_mut(&mut self, r: usize, c: usize) -> &mut T;
}

/// Selects a concrete [`GridStorage`] implementation for any element type.
///
/// `Dynamic` and `Static<R, C>` are the two implementors, mirroring the
/// original's compile-time-size-matching dispatch in `main.cpp`'s
/// `select_static_sizes_impl`.
pub trait Backend: 'static {
    type Storage<T: Clone + Default + std::fmt::Debug>: GridStorage<T>;

    /// Human-readable label, used in log output.
    fn label() -> &'static str;
}

/// Row-major `Vec`-backed storage with dimensions chosen at load time.
#[derive(Debug, Clone)]
pub struct DynamicGrid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T> GridStorage<T> for DynamicGrid<T> {
    fn filled(rows: usize, cols: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self {
            rows,
            cols,
            cells: vec![value; rows * cols],
        }
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn get(&self, r: usize, c: usize) -> &T {
        &self.cells[r * self.cols + c]
    }

    fn get_mut(&mut self, r: usize, c: usize) -> &mut T {
        &mut self.cells[r * self.cols + c]
    }
}

/// Dense `[[T; C]; R]`-backed storage for a registered compile-time
/// dimension pair.
#[derive(Debug, Clone)]
pub struct StaticGrid<T, const R: usize, const C: usize> {
    cells: Box<[[T; C]; R]>,
}

impl<T, const R: usize, const C: usize> GridStorage<T> for StaticGrid<T, R, C> {
    fn filled(rows: usize, cols: usize, value: T) -> Self
    where
        T: Clone,
    {
        assert_eq!(rows, R, "static grid instantiated with mismatched row count");
        assert_eq!(cols, C, "static grid instantiated with mismatched column count");
        let cells = std::array::from_fn(|_| std::array::from_fn(|_| value.clone()));
        Self { cells: Box::new(cells) }
    }

    fn rows(&self) -> usize {
        R
    }

    fn cols(&self) -> usize {
        C
    }

    fn get(&self, r: usize, c: usize) -> &T {
        &self.cells[r][c]
    }

    fn get_mut(&mut self, r: usize, c: usize) -> &mut T {
        &mut self.cells[r][c]
    }
}

/// Runtime-sized backend: used whenever the loaded grid doesn't match a
/// registered static dimension pair.
pub struct Dynamic;

impl Backend for Dynamic {
    type Storage<T: Clone + Default + std::fmt::Debug> = DynamicGrid<T>;

    fn label() -> &'static str {
        "dynamic"
    }
}

/// Compile-time-sized backend for a registered `(R, C)` dimension pair.
pub struct Static<const R: usize, const C: usize>;

impl<const R: usize, const C: usize> Backend for Static<R, C> {
    type Storage<T: Clone + Default + std::fmt::Debug> = StaticGrid<T, R, C>;

    fn label() -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_grid_roundtrips_values() {
        let mut g = DynamicGrid::filled(3, 4, 0i32);
        *g.get_mut(1, 2) = 7;
        assert_eq!(*g.get(1, 2), 7);
        assert_eq!(*g.get(0, 0), 0);
        assert_eq!(g.rows(), 3);
        assert_eq!(g.cols(), 4);
    }

    #[test]
    fn static_grid_roundtrips_values() {
        let mut g: StaticGrid<i32, 3, 4> = StaticGrid::filled(3, 4, 0i32);
        *g.get_mut(1, 2) = 7;
        assert_eq!(*g.get(1, 2), 7);
        assert_eq!(*g.get(0, 0), 0);
        assert_eq!(g.rows(), 3);
        assert_eq!(g.cols(), 4);
    }

    #[test]
    #[should_panic]
    fn static_grid_rejects_mismatched_dims() {
        let _: StaticGrid<i32, 3, 4> = StaticGrid::filled(3, 5, 0i32);
    }

    /// [`Static`] and [`Dynamic`] must be behaviorally identical for
    /// equivalent dimensions.
    #[test]
    fn static_and_dynamic_backends_agree() {
        let mut dynamic = DynamicGrid::filled(3, 4, 0i32);
        let mut static_: StaticGrid<i32, 3, 4> = StaticGrid::filled(3, 4, 0i32);

        for r in 0..3 {
            for c in 0..4 {
                let v = (r * 10 + c) as i32;
                *dynamic.get_mut(r, c) = v;
                *static_.get_mut(r, c) = v;
            }
        }

        for r in 0..3 {
            for c in 0..4 {
                assert_eq!(dynamic.get(r, c), static_.get(r, c));
            }
        }
    }
}
