//! Shared per-kind element workspace.

use num_complex::Complex64;
use ringsem_core::ResourceInitializationError;

use crate::scratch::ScratchRegion;

/// Per-order and per-sample widths an element kind needs in scratch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkspaceShape {
    /// Kind name used in errors and reports.
    pub name: &'static str,
    /// Complex values needed per azimuthal order.
    pub coeff_width: usize,
    /// Real values needed per ring sample.
    pub phys_width: usize,
}

/// Scratch shared by every element of one kind on one worker.
///
/// Starts empty; [`init_workspace`](Self::init_workspace) sizes it once
/// for the largest half ring size of the mesh.
#[derive(Debug)]
pub struct ElementWorkspace {
    shape: WorkspaceShape,
    coeff: ScratchRegion<Complex64>,
    phys: ScratchRegion<f64>,
    max_half_nr: Option<usize>,
}

impl ElementWorkspace {
    /// Uninitialized workspace for a kind of the given shape.
    pub fn new(shape: WorkspaceShape) -> Self {
        Self {
            shape,
            coeff: ScratchRegion::new(shape.name, 0),
            phys: ScratchRegion::new(shape.name, 0),
            max_half_nr: None,
        }
    }

    /// Allocate room for rings of up to `2 * max_half_nr + 1` samples,
    /// i.e. for orders `0..=max_half_nr`.
    pub fn init_workspace(&mut self, max_half_nr: usize) -> Result<(), ResourceInitializationError> {
        if self.max_half_nr.is_some() {
            return Err(ResourceInitializationError::AlreadyInitialized {
                resource: self.shape.name,
            });
        }
        let orders = max_half_nr + 1;
        let max_nr = 2 * max_half_nr + 1;
        self.coeff = ScratchRegion::new(self.shape.name, orders * self.shape.coeff_width);
        self.phys = ScratchRegion::new(self.shape.name, max_nr * self.shape.phys_width);
        self.max_half_nr = Some(max_half_nr);
        Ok(())
    }

    /// Whether [`init_workspace`](Self::init_workspace) has run.
    pub fn is_initialized(&self) -> bool {
        self.max_half_nr.is_some()
    }

    /// The kind shape.
    pub fn shape(&self) -> WorkspaceShape {
        self.shape
    }

    /// Largest ring size the workspace serves.
    pub fn max_nr(&self) -> usize {
        self.max_half_nr.map_or(0, |h| 2 * h + 1)
    }

    /// Both scratch regions, failing if the workspace was never sized
    /// or cannot hold a ring of `nr` samples.
    pub fn regions(
        &mut self,
        nr: usize,
    ) -> Result<(&mut ScratchRegion<Complex64>, &mut ScratchRegion<f64>), ResourceInitializationError>
    {
        let Some(half) = self.max_half_nr else {
            return Err(ResourceInitializationError::NotInitialized {
                resource: self.shape.name,
            });
        };
        if nr / 2 > half {
            return Err(ResourceInitializationError::WorkspaceTooSmall {
                resource: self.shape.name,
                required: nr,
                capacity: 2 * half + 1,
            });
        }
        Ok((&mut self.coeff, &mut self.phys))
    }

    /// Memory usage of both regions in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.coeff.memory_bytes() + self.phys.memory_bytes()
    }
}
