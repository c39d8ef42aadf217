//! Decoded model graph handed over by the tile loader
//!
//! These types mirror what a glTF-style decoder produces for one tile: a tree of
//! nodes, each optionally carrying a mesh made of primitives with typed vertex
//! attributes and an optional index buffer. Nothing here knows about LOD; the
//! extractor reads these buffers without modifying them.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Name of the vertex attribute holding 3-component positions
pub const POSITION_ATTRIBUTE: &str = "POSITION";

/// A decoded tile model
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecodedModel {
    /// Root of the scene graph (None if the model has no scene)
    pub scene: Option<SceneNode>,
}

/// A node of the scene graph
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SceneNode {
    pub mesh: Option<Mesh>,
    pub children: Vec<SceneNode>,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Mesh {
    pub primitives: Vec<Primitive>,
}

/// Topology of a primitive, as declared by the model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveMode {
    /// Whether the primitive describes line geometry
    #[inline]
    pub fn is_line(&self) -> bool {
        matches!(self, Self::Lines | Self::LineLoop | Self::LineStrip)
    }
}

/// A typed, flat vertex attribute buffer
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VertexAttribute {
    pub name: String,
    /// Number of vertices described by the buffer
    pub count: usize,
    /// Flat component values (3 per vertex for positions)
    pub values: Vec<f32>,
}

/// A single drawable primitive of a mesh
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Primitive {
    pub mode: PrimitiveMode,
    pub attributes: Vec<VertexAttribute>,
    pub indices: Option<Vec<u32>>,
}

impl DecodedModel {
    pub fn new(scene: SceneNode) -> Self {
        Self { scene: Some(scene) }
    }

    /// Visit every node depth-first, parent before children
    pub fn traverse<F: FnMut(&SceneNode)>(&self, mut visit: F) {
        if let Some(root) = &self.scene {
            root.traverse(&mut visit);
        }
    }
}

impl SceneNode {
    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    fn traverse<F: FnMut(&SceneNode)>(&self, visit: &mut F) {
        visit(self);
        for child in &self.children {
            child.traverse(visit);
        }
    }
}

impl Mesh {
    pub fn new(primitives: Vec<Primitive>) -> Self {
        Self { primitives }
    }
}

impl VertexAttribute {
    /// Position attribute from flat xyz triples
    pub fn positions(values: Vec<f32>) -> Self {
        Self {
            name: POSITION_ATTRIBUTE.to_string(),
            count: values.len() / 3,
            values,
        }
    }
}

impl Primitive {
    /// Primitive with the given mode and flat xyz positions, without indices
    pub fn new(mode: PrimitiveMode, positions: Vec<f32>) -> Self {
        Self {
            mode,
            attributes: vec![VertexAttribute::positions(positions)],
            indices: None,
        }
    }

    pub fn line_strip(positions: Vec<f32>) -> Self {
        Self::new(PrimitiveMode::LineStrip, positions)
    }

    pub fn lines(positions: Vec<f32>) -> Self {
        Self::new(PrimitiveMode::Lines, positions)
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Look up an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    #[inline]
    pub fn positions(&self) -> Option<&VertexAttribute> {
        self.attribute(POSITION_ATTRIBUTE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traverse_order() {
        let leaf = |n: usize| {
            SceneNode::default().with_mesh(Mesh::new(vec![Primitive::lines(vec![n as f32; 6])]))
        };
        let model = DecodedModel::new(
            SceneNode::default()
                .with_mesh(Mesh::new(vec![Primitive::lines(vec![0.0; 6])]))
                .with_child(leaf(1).with_child(leaf(2)))
                .with_child(leaf(3)),
        );

        let mut seen = Vec::new();
        model.traverse(|node| {
            if let Some(mesh) = &node.mesh {
                seen.push(mesh.primitives[0].positions().unwrap().values[0] as usize);
            }
        });
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_traverse_without_scene() {
        let mut visited = 0;
        DecodedModel::default().traverse(|_| visited += 1);
        assert_eq!(visited, 0);
    }

    #[test]
    fn test_position_attribute_lookup() {
        let primitive = Primitive::line_strip(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let positions = primitive.positions().unwrap();
        assert_eq!(positions.count, 2);

        let no_positions = Primitive {
            mode: PrimitiveMode::LineStrip,
            attributes: Vec::new(),
            indices: None,
        };
        assert!(no_positions.positions().is_none());
    }

    #[test]
    fn test_line_modes() {
        assert!(PrimitiveMode::Lines.is_line());
        assert!(PrimitiveMode::LineStrip.is_line());
        assert!(PrimitiveMode::LineLoop.is_line());
        assert!(!PrimitiveMode::Triangles.is_line());
        assert!(!PrimitiveMode::Points.is_line());
    }
}
