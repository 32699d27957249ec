//! Fixed-capacity scratch space carved into disjoint slices per call.

use ringsem_core::ResourceInitializationError;

/// Scratch space for the temporaries of one element kernel invocation.
///
/// The backing vector is allocated once. Each [`carve`](Self::carve)
/// hands out a fresh set of disjoint slices starting at the beginning of
/// the region, so no explicit reset is needed between elements. The
/// returned slices borrow the region mutably, which rules out
/// overlapping use within a worker.
#[derive(Clone, Debug)]
pub struct ScratchRegion<T> {
    data: Vec<T>,
    name: &'static str,
}

impl<T: Copy + Default> ScratchRegion<T> {
    /// Region of `capacity` elements, reported as `name` in errors.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            data: vec![T::default(); capacity],
            name,
        }
    }

    /// Split the front of the region into `N` slices of the given
    /// lengths. Contents are whatever the previous user left behind.
    pub fn carve<const N: usize>(
        &mut self,
        lens: [usize; N],
    ) -> Result<[&mut [T]; N], ResourceInitializationError> {
        let total: usize = lens.iter().sum();
        if total > self.data.len() {
            return Err(ResourceInitializationError::WorkspaceTooSmall {
                resource: self.name,
                required: total,
                capacity: self.data.len(),
            });
        }
        let mut rest: &mut [T] = &mut self.data[..total];
        let mut out: [&mut [T]; N] = std::array::from_fn(|_| Default::default());
        for (slot, &len) in out.iter_mut().zip(lens.iter()) {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(len);
            *slot = head;
            rest = tail;
        }
        Ok(out)
    }

    /// Total capacity in elements.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Memory usage of the backing storage in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
    }
}
