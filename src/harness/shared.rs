/*!
 * Shared Array
 *
 * Array of f64 cells that detects non-atomic critical sections.
 *
 * A correct critical section scales every cell by the same factor, so the
 * cells stay equal forever. Two overlapping sections that interleave their
 * read-modify-writes on a cell drop one factor there and leave cells that
 * disagree.
 *
 * Cells are `AtomicU64` bit patterns accessed with relaxed loads and stores.
 * Racy runs lose updates without being undefined behaviour; guarded runs get
 * their ordering from the lock.
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

/// Scale factors applied by [`SharedArray::scale_all`]
///
/// `x += v * x` with `v` in this set multiplies by 2 or 0.5 exactly, so tens
/// of thousands of steps stay far from f64 overflow and underflow.
pub const SCALE_FACTORS: [f64; 2] = [1.0, -0.5];

/// Fixed-size array shared between workers
pub struct SharedArray {
    cells: Box<[AtomicU64]>,
}

impl SharedArray {
    /// Create `len` cells holding `initial`
    ///
    /// Zero would make every scaling a no-op, so pick anything else.
    pub fn new(len: usize, initial: f64) -> Self {
        let cells = (0..len)
            .map(|_| AtomicU64::new(initial.to_bits()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { cells }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Read one cell
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        f64::from_bits(self.cells[index].load(Ordering::Relaxed))
    }

    /// The critical section: `arr[j] += v * arr[j]` for every cell
    ///
    /// Scaling commutes, so overlapping sections only show up as lost
    /// updates: a read and a write of the same cell straddling another
    /// section. With `yield_midway` the thread yields between reading and
    /// writing the middle cell, so any section scheduled in that window
    /// loses its update there, even on a single core.
    pub fn scale_all(&self, v: f64, yield_midway: bool) {
        let half = self.cells.len() / 2;
        for (j, cell) in self.cells.iter().enumerate() {
            let x = f64::from_bits(cell.load(Ordering::Relaxed));
            if yield_midway && j == half {
                thread::yield_now();
            }
            cell.store((x + v * x).to_bits(), Ordering::Relaxed);
        }
    }

    /// Index of the first cell that differs from cell 0
    pub fn first_mismatch(&self) -> Option<usize> {
        let first = self.cells.first()?.load(Ordering::Relaxed);
        self.cells
            .iter()
            .position(|c| c.load(Ordering::Relaxed) != first)
    }
}
