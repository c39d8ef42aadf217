//! Feature extraction from decoded tile models
//!
//! Line primitives are resolved exactly once, when a tile finishes loading, into the
//! tagged [`LineGeometry`] and then flattened into independent polylines. Downstream
//! stages never look at primitive modes or index buffers again.

use crate::model::{DecodedModel, Primitive, PrimitiveMode};
use crate::{FeatureSet, LodError, Point3, Polyline, Result};
use rayon::prelude::*;

/// Line geometry of one primitive, with indices already resolved
#[derive(Clone, Debug, PartialEq)]
pub enum LineGeometry {
    /// A single connected path
    LineStrip(Vec<Point3>),
    /// Independent two-point segments
    LineSegments(Vec<[Point3; 2]>),
}

impl LineGeometry {
    /// Flatten into polylines, appending to `out`
    pub fn push_polylines(self, out: &mut Vec<Polyline>) {
        match self {
            Self::LineStrip(points) => {
                if !points.is_empty() {
                    out.push(Polyline::from_non_empty(points));
                }
            }
            Self::LineSegments(pairs) => {
                out.extend(pairs.into_iter().map(|[a, b]| Polyline::segment(a, b)));
            }
        }
    }
}

/// Resolve one primitive into line geometry
///
/// Returns `Ok(None)` for primitives that carry no line geometry: missing positions
/// or a non-line mode. Index buffers referencing missing vertices are an error.
pub fn resolve_primitive(primitive: &Primitive) -> Result<Option<LineGeometry>> {
    if !primitive.mode.is_line() {
        return Ok(None);
    }
    let Some(attribute) = primitive.positions() else {
        return Ok(None);
    };

    let vertex_count = attribute.count.min(attribute.values.len() / 3);
    let positions: Vec<Point3> = attribute.values[..vertex_count * 3]
        .chunks_exact(3)
        .map(|xyz| Point3::new(xyz[0] as f64, xyz[1] as f64, xyz[2] as f64))
        .collect();

    let path = match &primitive.indices {
        Some(indices) => indices
            .iter()
            .map(|&index| {
                positions
                    .get(index as usize)
                    .copied()
                    .ok_or(LodError::IndexOutOfRange {
                        index: index as usize,
                        vertex_count,
                    })
            })
            .collect::<Result<Vec<_>>>()?,
        None => positions,
    };

    let geometry = match primitive.mode {
        PrimitiveMode::Lines => LineGeometry::LineSegments(
            path.chunks_exact(2).map(|pair| [pair[0], pair[1]]).collect(),
        ),
        PrimitiveMode::LineLoop => {
            let mut path = path;
            if path.len() >= 2 {
                path.push(path[0]);
            }
            LineGeometry::LineStrip(path)
        }
        _ => LineGeometry::LineStrip(path),
    };

    Ok(Some(geometry))
}

/// Extract all line features from a decoded model
///
/// Features come out in node traversal order, then primitive order. Primitives that
/// fail to resolve are skipped so one bad buffer never costs the whole tile.
#[profiling::function]
pub fn extract_features(model: &DecodedModel) -> FeatureSet {
    let mut polylines = Vec::new();

    model.traverse(|node| {
        let Some(mesh) = &node.mesh else {
            return;
        };
        for (primitive_index, primitive) in mesh.primitives.iter().enumerate() {
            match resolve_primitive(primitive) {
                Ok(Some(geometry)) => geometry.push_polylines(&mut polylines),
                Ok(None) => {
                    tracing::trace!(
                        "Skipping primitive {} ({:?}) without line geometry",
                        primitive_index,
                        primitive.mode
                    );
                }
                Err(e) => {
                    tracing::warn!("Skipping malformed primitive {}: {}", primitive_index, e);
                }
            }
        }
    });

    FeatureSet::new(polylines)
}

/// Extract features for a batch of loaded tiles in parallel
///
/// The output keeps the input order.
pub fn extract_many<K: Send>(models: Vec<(K, DecodedModel)>) -> Vec<(K, FeatureSet)> {
    profiling::scope!("extract_many");

    models
        .into_par_iter()
        .map(|(id, model)| {
            let features = extract_features(&model);
            (id, features)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mesh, SceneNode, VertexAttribute};

    /// Flat xyz buffer for points (i, 10*i, 0)
    fn positions(count: usize) -> Vec<f32> {
        (0..count)
            .flat_map(|i| [i as f32, 10.0 * i as f32, 0.0])
            .collect()
    }

    fn pt(i: usize) -> Point3 {
        Point3::new(i as f64, 10.0 * i as f64, 0.0)
    }

    fn model_with(primitives: Vec<Primitive>) -> DecodedModel {
        DecodedModel::new(SceneNode::default().with_mesh(Mesh::new(primitives)))
    }

    #[test]
    fn test_line_strip_without_indices() {
        let geometry = resolve_primitive(&Primitive::line_strip(positions(4)))
            .unwrap()
            .unwrap();
        assert_eq!(
            geometry,
            LineGeometry::LineStrip(vec![pt(0), pt(1), pt(2), pt(3)])
        );
    }

    #[test]
    fn test_line_strip_with_indices() {
        let primitive = Primitive::line_strip(positions(4)).with_indices(vec![3, 1, 1, 0]);
        let geometry = resolve_primitive(&primitive).unwrap().unwrap();
        assert_eq!(
            geometry,
            LineGeometry::LineStrip(vec![pt(3), pt(1), pt(1), pt(0)])
        );
    }

    #[test]
    fn test_lines_with_indices() {
        let primitive = Primitive::lines(positions(4)).with_indices(vec![0, 1, 2, 3, 3, 0]);
        let geometry = resolve_primitive(&primitive).unwrap().unwrap();
        assert_eq!(
            geometry,
            LineGeometry::LineSegments(vec![[pt(0), pt(1)], [pt(2), pt(3)], [pt(3), pt(0)]])
        );
    }

    #[test]
    fn test_lines_without_indices_drops_trailing_vertex() {
        let geometry = resolve_primitive(&Primitive::lines(positions(5)))
            .unwrap()
            .unwrap();
        assert_eq!(
            geometry,
            LineGeometry::LineSegments(vec![[pt(0), pt(1)], [pt(2), pt(3)]])
        );
    }

    #[test]
    fn test_line_loop_is_closed() {
        let primitive = Primitive::new(PrimitiveMode::LineLoop, positions(3));
        let geometry = resolve_primitive(&primitive).unwrap().unwrap();
        assert_eq!(
            geometry,
            LineGeometry::LineStrip(vec![pt(0), pt(1), pt(2), pt(0)])
        );
    }

    #[test]
    fn test_missing_positions_is_skipped() {
        let primitive = Primitive {
            mode: PrimitiveMode::LineStrip,
            attributes: vec![VertexAttribute {
                name: "NORMAL".to_string(),
                count: 2,
                values: vec![0.0; 6],
            }],
            indices: None,
        };
        assert_eq!(resolve_primitive(&primitive), Ok(None));
    }

    #[test]
    fn test_non_line_mode_is_skipped() {
        let primitive = Primitive::new(PrimitiveMode::Triangles, positions(3));
        assert_eq!(resolve_primitive(&primitive), Ok(None));
    }

    #[test]
    fn test_index_out_of_range() {
        let primitive = Primitive::line_strip(positions(2)).with_indices(vec![0, 5]);
        assert_eq!(
            resolve_primitive(&primitive),
            Err(LodError::IndexOutOfRange {
                index: 5,
                vertex_count: 2
            })
        );
    }

    #[test]
    fn test_count_limits_vertices() {
        let mut primitive = Primitive::line_strip(positions(4));
        primitive.attributes[0].count = 2;
        let geometry = resolve_primitive(&primitive).unwrap().unwrap();
        assert_eq!(geometry, LineGeometry::LineStrip(vec![pt(0), pt(1)]));
    }

    #[test]
    fn test_extract_features_mixed_model() {
        let model = DecodedModel::new(
            SceneNode::default()
                .with_mesh(Mesh::new(vec![
                    Primitive::line_strip(positions(5)),
                    Primitive::new(PrimitiveMode::Triangles, positions(3)),
                ]))
                .with_child(SceneNode::default().with_mesh(Mesh::new(vec![
                    Primitive::lines(positions(4)),
                    Primitive::line_strip(positions(2)).with_indices(vec![0, 9]),
                ]))),
        );

        let features = extract_features(&model);
        // 1 strip + 2 segments, the malformed strip and the triangles are skipped
        assert_eq!(features.len(), 3);
        assert_eq!(features.vertex_count(), 5 + 2 + 2);
        assert_eq!(features.features()[0].point_count(), 5);
        assert_eq!(features.features()[1].points(), &[pt(0), pt(1)]);
        assert_eq!(features.features()[2].points(), &[pt(2), pt(3)]);
    }

    #[test]
    fn test_extract_features_without_scene() {
        let features = extract_features(&DecodedModel::default());
        assert!(features.is_empty());
    }

    #[test]
    fn test_empty_strip_produces_no_feature() {
        let features = extract_features(&model_with(vec![Primitive::line_strip(Vec::new())]));
        assert!(features.is_empty());
    }

    #[test]
    fn test_extraction_does_not_mutate_input() {
        let model = model_with(vec![
            Primitive::line_strip(positions(6)).with_indices(vec![5, 4, 3]),
        ]);
        let before = model.clone();
        let _ = extract_features(&model);
        assert_eq!(model, before);
    }

    #[test]
    fn test_extract_many_keeps_order() {
        let batch: Vec<(u32, DecodedModel)> = (0..8)
            .map(|i| (i, model_with(vec![Primitive::line_strip(positions(i as usize + 1))])))
            .collect();

        let results = extract_many(batch);
        assert_eq!(results.len(), 8);
        for (expected, (id, features)) in results.iter().enumerate() {
            assert_eq!(*id, expected as u32);
            assert_eq!(features.vertex_count(), expected + 1);
        }
    }
}
