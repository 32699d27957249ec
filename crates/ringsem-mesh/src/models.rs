//! Reference model providers.
//!
//! [`LayeredModel`] is a stack of homogeneous shells, each split into a
//! number of radial element rows. It stands in for an external mesh
//! file in tests, benches and small runs.

use ringsem_core::{ExodusModel, Material, NrField};

/// One homogeneous shell.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    /// Inner radius in metres.
    pub r_bottom: f64,
    /// Outer radius in metres.
    pub r_top: f64,
    /// Radial element rows across the shell.
    pub rows: usize,
    /// Material of the shell.
    pub material: Material,
}

/// Stack of homogeneous shells, innermost first.
#[derive(Clone, Debug, PartialEq)]
pub struct LayeredModel {
    name: String,
    layers: Vec<Layer>,
    nodes: Vec<f64>,
    row_layer: Vec<usize>,
    theta_elements: usize,
}

impl LayeredModel {
    /// Model over the given shells with `theta_elements` elements along
    /// colatitude.
    ///
    /// The radial nodes are the shell boundaries subdivided evenly.
    /// Inconsistent shells (gaps, overlaps, empty rows) are passed
    /// through and rejected when the mesh is built.
    pub fn new(name: impl Into<String>, layers: Vec<Layer>, theta_elements: usize) -> Self {
        let mut nodes = Vec::new();
        let mut row_layer = Vec::new();
        for (i, layer) in layers.iter().enumerate() {
            if nodes.is_empty() {
                nodes.push(layer.r_bottom);
            }
            for k in 1..=layer.rows {
                let f = k as f64 / layer.rows as f64;
                nodes.push(layer.r_bottom + f * (layer.r_top - layer.r_bottom));
                row_layer.push(i);
            }
        }
        Self {
            name: name.into(),
            layers,
            nodes,
            row_layer,
            theta_elements,
        }
    }

    /// Single homogeneous shell.
    pub fn homogeneous(
        r_bottom: f64,
        r_top: f64,
        rows: usize,
        theta_elements: usize,
        material: Material,
    ) -> Self {
        Self::new(
            "homogeneous",
            vec![Layer {
                r_bottom,
                r_top,
                rows,
                material,
            }],
            theta_elements,
        )
    }

    /// The shells.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

impl ExodusModel for LayeredModel {
    fn radial_nodes(&self) -> &[f64] {
        &self.nodes
    }

    fn theta_elements(&self) -> usize {
        self.theta_elements
    }

    fn material(&self, row: usize, _r: f64) -> Material {
        let layer = self
            .row_layer
            .get(row)
            .or(self.row_layer.last())
            .copied()
            .unwrap_or(0);
        self.layers[layer].material
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// The same ring size everywhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformNrField {
    nr: usize,
}

impl UniformNrField {
    /// Field of constant `nr`.
    pub fn new(nr: usize) -> Self {
        Self { nr }
    }
}

impl NrField for UniformNrField {
    fn nr(&self, _r: f64, _theta: f64) -> usize {
        self.nr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rock() -> Material {
        Material {
            vp: 6000.0,
            vs: 3500.0,
            rho: 2700.0,
            q_kappa: 57823.0,
            q_mu: 600.0,
        }
    }

    fn water() -> Material {
        Material {
            vp: 1500.0,
            vs: 0.0,
            rho: 1000.0,
            q_kappa: 57823.0,
            q_mu: 0.0,
        }
    }

    #[test]
    fn nodes_subdivide_layers() {
        let model = LayeredModel::new(
            "two",
            vec![
                Layer {
                    r_bottom: 100.0,
                    r_top: 200.0,
                    rows: 2,
                    material: water(),
                },
                Layer {
                    r_bottom: 200.0,
                    r_top: 260.0,
                    rows: 3,
                    material: rock(),
                },
            ],
            8,
        );
        let nodes = model.radial_nodes();
        assert_eq!(nodes.len(), 6);
        assert_eq!(nodes[0], 100.0);
        assert_eq!(nodes[2], 200.0);
        assert!((nodes[3] - 220.0).abs() < 1e-12);
        assert_eq!(model.outer_radius(), 260.0);
        assert!(model.material(1, 150.0).is_fluid());
        assert!(!model.material(2, 210.0).is_fluid());
        assert_eq!(model.theta_elements(), 8);
    }

    #[test]
    fn homogeneous_shell() {
        let model = LayeredModel::homogeneous(1.0, 2.0, 4, 6, rock());
        assert_eq!(model.radial_nodes().len(), 5);
        assert_eq!(model.material(3, 1.9), rock());
        assert_eq!(UniformNrField::new(5).nr(1.5, 0.3), 5);
    }
}
