use log::{debug, info};

use crate::{
    error::{Error, Result},
    geometry::{
        BarycentricCoordinates, FloatType, TriAccel, Triangle, WorldBox, WorldPoint, WorldVector,
        clip_triangle,
    },
    tracer::TraceEpsilons,
    tree::{Clipper, SahTree, TreeSettings},
};

/// Triangles with any squared edge length below this are dropped when building a model.
const MIN_EDGE_LENGTH_SQUARED: FloatType = 1e-6;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
    pub position: WorldPoint,
    /// Shading normal, zero vector makes the triangles using this vertex flat shaded.
    pub normal: WorldVector,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ModelTriangle {
    pub vertices: Triangle<u32>,
    /// Index into the scene's surface list.
    pub surface: usize,
}

/// Collects vertices and triangles of a model before compilation.
#[derive(Clone, Debug, Default)]
pub struct ModelBuilder {
    vertices: Vec<Vertex>,
    triangles: Vec<ModelTriangle>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a vertex and returns its index.
    pub fn add_vertex(&mut self, position: WorldPoint, normal: WorldVector) -> usize {
        self.vertices.push(Vertex { position, normal });
        self.vertices.len() - 1
    }

    /// Adds a triangle and returns its index.
    ///
    /// Triangles with a near zero length edge can't be intersected reliably, these are
    /// skipped and `Ok(None)` is returned.
    pub fn add_triangle(&mut self, vertices: [usize; 3], surface: usize) -> Result<Option<usize>> {
        if let Some(&out_of_range) = vertices.iter().find(|&&v| v >= self.vertices.len()) {
            return Err(Error::VertexOutOfRange(out_of_range));
        }
        let [a, b, c] = vertices;
        if a == b || b == c || c == a {
            return Err(Error::DegenerateTriangle(vertices));
        }

        let positions = Triangle::from(vertices).map(|&i| self.vertices[i].position);
        if positions
            .cyclic_edges()
            .iter()
            .any(|edge| edge.norm_squared() < MIN_EDGE_LENGTH_SQUARED)
        {
            debug!("Skipping triangle {vertices:?} with a near zero length edge");
            return Ok(None);
        }

        self.triangles.push(ModelTriangle {
            vertices: Triangle::from(vertices).map(|&i| i as u32),
            surface,
        });
        Ok(Some(self.triangles.len() - 1))
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Builds the intersection structures of the model.
    pub fn compile(self, settings: &TreeSettings, epsilons: &TraceEpsilons) -> Result<Model> {
        settings.validate()?;

        let positions: Vec<Triangle<WorldPoint>> = self
            .triangles
            .iter()
            .map(|triangle| triangle.vertices.map(|&i| self.vertices[i as usize].position))
            .collect();
        let accels: Vec<TriAccel> = positions.iter().map(TriAccel::new).collect();

        let clipper = TriangleClipper {
            triangles: &positions,
            accels: &accels,
            eps: epsilons.clip,
        };
        let tree = SahTree::compile(positions.len(), &clipper, settings);

        info!(
            "Compiled model with {} triangles into {} tree nodes",
            positions.len(),
            tree.node_count()
        );
        debug!("{}", tree.statistics());

        Ok(Model {
            vertices: self.vertices,
            triangles: self.triangles,
            accels,
            tree,
        })
    }
}

struct TriangleClipper<'a> {
    triangles: &'a [Triangle<WorldPoint>],
    accels: &'a [TriAccel],
    eps: FloatType,
}

impl Clipper for TriangleClipper<'_> {
    fn bounding_box(&self, object: u32) -> WorldBox {
        WorldBox::from_triangle(&self.triangles[object as usize])
    }

    fn clip(&self, object: u32, bounding_box: &WorldBox) -> WorldBox {
        let i = object as usize;
        clip_triangle(&self.triangles[i], &self.accels[i], bounding_box, self.eps)
    }
}

/// Compiled triangle mesh, ready for tracing.
#[derive(Clone, Debug)]
pub struct Model {
    vertices: Vec<Vertex>,
    triangles: Vec<ModelTriangle>,
    accels: Vec<TriAccel>,
    tree: SahTree,
}

impl Model {
    pub fn tree(&self) -> &SahTree {
        &self.tree
    }

    pub(crate) fn accels(&self) -> &[TriAccel] {
        &self.accels
    }

    pub fn bounding_box(&self) -> &WorldBox {
        self.tree.bounding_box()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn triangle(&self, index: u32) -> &ModelTriangle {
        &self.triangles[index as usize]
    }

    pub fn triangle_positions(&self, index: u32) -> Triangle<WorldPoint> {
        self.triangles[index as usize]
            .vertices
            .map(|&i| self.vertices[i as usize].position)
    }

    /// Largest surface index used by the triangles.
    pub fn max_surface(&self) -> Option<usize> {
        self.triangles.iter().map(|t| t.surface).max()
    }

    /// Unnormalized shading normal at a point of a triangle in model space.
    ///
    /// Interpolates vertex normals, falls back to the geometric normal if any of the
    /// vertices has no normal.
    pub fn normal_at(
        &self,
        index: u32,
        barycentric: &BarycentricCoordinates<FloatType>,
    ) -> WorldVector {
        let normals = self.triangles[index as usize]
            .vertices
            .map(|&i| self.vertices[i as usize].normal);
        if normals.iter().any(|n| n.norm_squared() == 0.0) {
            return self.triangle_positions(index).normal();
        }
        barycentric.interpolate_triangle(&normals)
    }
}
