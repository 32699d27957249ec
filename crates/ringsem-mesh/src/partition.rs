//! Partitioning of the element grid into colatitude strips.
//!
//! Worker `r` of `P` owns the contiguous columns
//! `[⌈r·n/P⌉, ⌈(r+1)·n/P⌉)` of the `n` colatitude columns, every radial
//! row included. Each worker owns at least one column as long as
//! `P ≤ n`.

use std::ops::Range;

use ringsem_core::ConfigError;

/// Position of one worker among all workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Partition {
    rank: usize,
    size: usize,
}

impl Partition {
    /// Worker `rank` of `size`.
    pub fn new(rank: usize, size: usize) -> Result<Self, ConfigError> {
        if size == 0 || rank >= size {
            return Err(ConfigError::InvalidPartition {
                reason: format!("rank {rank} is not below partition count {size}"),
            });
        }
        Ok(Self { rank, size })
    }

    /// The only worker of a serial run.
    pub fn solo() -> Self {
        Self { rank: 0, size: 1 }
    }

    /// This worker's rank.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Check that `columns` colatitude columns give every worker work.
    pub fn check(&self, columns: usize) -> Result<(), ConfigError> {
        if self.size > columns {
            return Err(ConfigError::InvalidPartition {
                reason: format!(
                    "{} partitions exceed the {columns} colatitude element columns",
                    self.size
                ),
            });
        }
        Ok(())
    }

    /// Owner of column `col` out of `columns`.
    pub fn column_owner(&self, col: usize, columns: usize) -> usize {
        col * self.size / columns
    }

    /// Columns owned by this worker.
    pub fn columns(&self, columns: usize) -> Range<usize> {
        let start = (self.rank * columns).div_ceil(self.size);
        let end = ((self.rank + 1) * columns).div_ceil(self.size);
        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn solo_owns_everything() {
        let p = Partition::solo();
        assert_eq!(p.columns(7), 0..7);
        assert!((0..7).all(|c| p.column_owner(c, 7) == 0));
    }

    #[test]
    fn rejects_bad_layouts() {
        assert!(Partition::new(3, 3).is_err());
        assert!(Partition::new(0, 0).is_err());
        let p = Partition::new(0, 5).unwrap();
        assert!(matches!(
            p.check(4),
            Err(ConfigError::InvalidPartition { .. })
        ));
        assert!(p.check(5).is_ok());
    }

    proptest! {
        #[test]
        fn strips_cover_columns_exactly_once(size in 1usize..9, extra in 0usize..20) {
            let columns = size + extra;
            let mut next = 0;
            for rank in 0..size {
                let p = Partition::new(rank, size).unwrap();
                let range = p.columns(columns);
                prop_assert_eq!(range.start, next);
                prop_assert!(range.end > range.start);
                for c in range.clone() {
                    prop_assert_eq!(p.column_owner(c, columns), rank);
                }
                next = range.end;
            }
            prop_assert_eq!(next, columns);
        }
    }
}
