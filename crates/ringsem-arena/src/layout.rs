//! Flat storage layout of per-point, per-order coefficients.

use std::ops::Range;

/// Offsets of each point's coefficients in a flat buffer.
///
/// Point `p` carries `orders(p)` azimuthal orders of `dof` components,
/// stored order-major: component `c` of order `m` lives at
/// `range(p).start + m * dof + c`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldLayout {
    dof: usize,
    orders: Vec<usize>,
    offsets: Vec<usize>,
}

impl FieldLayout {
    /// Layout for points with the given order counts.
    pub fn new(dof: usize, orders: Vec<usize>) -> Self {
        let mut offsets = Vec::with_capacity(orders.len() + 1);
        let mut acc = 0;
        offsets.push(0);
        for &nu in &orders {
            acc += nu * dof;
            offsets.push(acc);
        }
        Self {
            dof,
            orders,
            offsets,
        }
    }

    /// Components per order.
    pub fn dof(&self) -> usize {
        self.dof
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the layout has no points.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Total number of stored coefficients.
    pub fn total(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Orders carried by point `p`.
    pub fn orders(&self, p: usize) -> usize {
        self.orders[p]
    }

    /// Buffer range of point `p`.
    pub fn range(&self, p: usize) -> Range<usize> {
        self.offsets[p]..self.offsets[p + 1]
    }

    /// Largest order count of any point.
    pub fn max_orders(&self) -> usize {
        self.orders.iter().copied().max().unwrap_or(0)
    }
}
