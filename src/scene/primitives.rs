//! Tessellated shapes for building simple scenes.

use std::f32::consts::PI;

use crate::{
    error::Result,
    geometry::{FloatType, WorldPoint, WorldVector},
};

use super::ModelBuilder;

/// Adds a planar quad with corners given in counter-clockwise order, flat shaded.
pub fn add_quad(builder: &mut ModelBuilder, corners: [WorldPoint; 4], surface: usize) -> Result<()> {
    let [a, b, c, d] = corners.map(|corner| builder.add_vertex(corner, WorldVector::zeros()));
    builder.add_triangle([a, b, c], surface)?;
    builder.add_triangle([a, c, d], surface)?;
    Ok(())
}

/// Adds a sphere made of `segments` slices around the z axis and `rings` stacks from pole to
/// pole, with smooth normals.
pub fn add_uv_sphere(
    builder: &mut ModelBuilder,
    center: WorldPoint,
    radius: FloatType,
    segments: usize,
    rings: usize,
    surface: usize,
) -> Result<()> {
    let segments = segments.max(3);
    let rings = rings.max(2);

    let mut add_vertex = |theta: FloatType, phi: FloatType| {
        let normal = WorldVector::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
        builder.add_vertex(center + normal * radius, normal)
    };

    let north = add_vertex(0.0, 0.0);
    let mut grid = Vec::with_capacity((rings - 1) * segments);
    for ring in 1..rings {
        let theta = PI * ring as FloatType / rings as FloatType;
        for segment in 0..segments {
            let phi = 2.0 * PI * segment as FloatType / segments as FloatType;
            grid.push(add_vertex(theta, phi));
        }
    }
    let south = add_vertex(PI, 0.0);

    let at = |ring: usize, segment: usize| grid[ring * segments + segment % segments];

    for segment in 0..segments {
        builder.add_triangle([north, at(0, segment), at(0, segment + 1)], surface)?;
    }
    for ring in 0..rings - 2 {
        for segment in 0..segments {
            let a = at(ring, segment);
            let b = at(ring + 1, segment);
            let c = at(ring + 1, segment + 1);
            let d = at(ring, segment + 1);
            builder.add_triangle([a, b, c], surface)?;
            builder.add_triangle([a, c, d], surface)?;
        }
    }
    let last = rings - 2;
    for segment in 0..segments {
        builder.add_triangle([south, at(last, segment + 1), at(last, segment)], surface)?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        geometry::{Ray, Segment},
        tracer::TraceEpsilons,
        tree::TreeSettings,
    };
    use assert2::{assert, let_assert};
    use test_case::test_case;

    #[test]
    fn quad_has_two_triangles() {
        let mut builder = ModelBuilder::new();
        add_quad(
            &mut builder,
            [
                WorldPoint::new(0.0, 0.0, 0.0),
                WorldPoint::new(1.0, 0.0, 0.0),
                WorldPoint::new(1.0, 1.0, 0.0),
                WorldPoint::new(0.0, 1.0, 0.0),
            ],
            0,
        )
        .unwrap();

        assert!(builder.vertex_count() == 4);
        assert!(builder.triangle_count() == 2);
    }

    #[test_case(3, 2 ; "minimal")]
    #[test_case(16, 8 ; "regular")]
    fn sphere_triangle_count(segments: usize, rings: usize) {
        let mut builder = ModelBuilder::new();
        add_uv_sphere(&mut builder, WorldPoint::origin(), 1.0, segments, rings, 0).unwrap();

        assert!(builder.vertex_count() == segments * (rings - 1) + 2);
        assert!(builder.triangle_count() == 2 * segments * (rings - 1));
    }

    #[test_case(WorldVector::new(0.0, 0.0, -1.0) ; "from_above")]
    #[test_case(WorldVector::new(1.0, 0.0, 0.0) ; "from_side")]
    #[test_case(WorldVector::new(-0.3, 0.5, 0.8) ; "oblique")]
    fn sphere_is_hit_near_radius(direction: WorldVector) {
        let mut builder = ModelBuilder::new();
        let center = WorldPoint::new(1.0, 2.0, 3.0);
        add_uv_sphere(&mut builder, center, 2.0, 32, 16, 0).unwrap();
        let model = builder
            .compile(&TreeSettings::default(), &TraceEpsilons::default())
            .unwrap();

        let direction = direction.normalize();
        let ray = Ray::new(center - direction * 10.0, direction);
        let mut segment = Segment::new(0.0, f32::MAX);

        let_assert!(Some(hit) = model.trace(&ray, &mut segment, &TraceEpsilons::default()));
        // Tessellation makes the sphere slightly smaller than the radius
        assert!(hit.t >= 8.0 - 1e-4);
        assert!(hit.t < 8.05);

        let normal = model.normal_at(hit.triangle, &hit.barycentric).normalize();
        assert!(normal.dot(&-direction) > 0.99);
    }
}
