use super::{BarycentricCoordinates, FloatType, Ray, Segment, Triangle, WorldPoint};

/// Precomputed triangle data for the projection method ray/triangle test (I. Wald,
/// "Realtime Ray Tracing and Interactive Global Illumination", 2004).
///
/// The triangle is projected onto the plane perpendicular to its dominant normal axis `k`,
/// plane equation and barycentric coordinate functions are stored per projection axis,
/// so that the test needs one division and a handful of multiply-adds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TriAccel {
    k: u8,

    n_u: FloatType,
    n_v: FloatType,
    n_d: FloatType,

    b_nu: FloatType,
    b_nv: FloatType,
    b_d: FloatType,

    c_nu: FloatType,
    c_nv: FloatType,
    c_d: FloatType,
}

impl TriAccel {
    pub fn new(triangle: &Triangle<WorldPoint>) -> TriAccel {
        let a = &triangle[0];
        let [b, c] = triangle.edges();
        let n = b.cross(&c);

        let k = dominant_axis(n.x.abs(), n.y.abs(), n.z.abs());
        let u = (k + 1) % 3;
        let v = (k + 2) % 3;

        let k_rec = 1.0 / n[k];
        let det_rec = 1.0 / (b[u] * c[v] - b[v] * c[u]);

        TriAccel {
            k: k as u8,

            n_u: n[u] * k_rec,
            n_v: n[v] * k_rec,
            n_d: n.dot(&a.coords) * k_rec,

            b_nu: c[v] * det_rec,
            b_nv: -c[u] * det_rec,
            b_d: (c[u] * a[v] - c[v] * a[u]) * det_rec,

            c_nu: -b[v] * det_rec,
            c_nv: b[u] * det_rec,
            c_d: (b[v] * a[u] - b[u] * a[v]) * det_rec,
        }
    }

    /// Index of the axis along which the triangle is projected.
    pub fn dominant_axis(&self) -> usize {
        self.k as usize
    }

    /// Intersects the ray with the triangle.
    ///
    /// On a hit within the segment, shrinks `segment.max` to the hit parameter and returns
    /// barycentric coordinates of the hit point. On a miss the segment is left untouched.
    /// Parameter tolerance is `eps` scaled by the magnitude of the hit parameter, the
    /// barycentric tolerance is `eps`.
    #[inline]
    pub fn intersect(
        &self,
        ray: &Ray,
        segment: &mut Segment,
        eps: FloatType,
    ) -> Option<BarycentricCoordinates<FloatType>> {
        let k = self.k as usize;
        let u = (k + 1) % 3;
        let v = (k + 2) % 3;

        let o = &ray.origin;
        let d = &ray.direction;

        let nd = 1.0 / (d[k] + self.n_u * d[u] + self.n_v * d[v]);
        let t = (self.n_d - o[k] - self.n_u * o[u] - self.n_v * o[v]) * nd;

        if !segment.contains(t, eps + t.abs() * eps) {
            return None;
        }

        let hu = o[u] + t * d[u];
        let hv = o[v] + t * d[v];

        let beta = hu * self.b_nu + hv * self.b_nv + self.b_d;
        if beta < -eps {
            return None;
        }

        let gamma = hu * self.c_nu + hv * self.c_nv + self.c_d;
        if gamma < -eps {
            return None;
        }

        if beta + gamma > 1.0 + eps {
            return None;
        }

        segment.max = t;
        Some(BarycentricCoordinates { u: beta, v: gamma })
    }
}

/// Axis with the largest component, x wins over y and y over z only when strictly larger.
fn dominant_axis(x: FloatType, y: FloatType, z: FloatType) -> usize {
    if x > y {
        if x > z { 0 } else { 2 }
    } else if y > z {
        1
    } else {
        2
    }
}
