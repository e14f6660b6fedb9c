use crate::geometry::{EPSILON, Ray, WorldPoint};

use super::{
    Environment, Illumination, Light, Radiance, ShadingContext, Surface, modulate,
};

/// Emits the same radiance regardless of lighting.
#[derive(Copy, Clone, Debug)]
pub struct ConstantSurface {
    radiance: Radiance,
}

impl ConstantSurface {
    pub fn new(radiance: Radiance) -> Self {
        ConstantSurface { radiance }
    }
}

impl Surface for ConstantSurface {
    fn shade(&self, _context: &ShadingContext) -> Radiance {
        self.radiance
    }
}

/// Lambertian surface lit by the scene lights, with shadows.
#[derive(Copy, Clone, Debug)]
pub struct DiffuseSurface {
    color: Radiance,
}

impl DiffuseSurface {
    pub fn new(color: Radiance) -> Self {
        DiffuseSurface { color }
    }
}

impl Surface for DiffuseSurface {
    fn shade(&self, context: &ShadingContext) -> Radiance {
        let mut sum = Radiance::default();
        for illumination in context.illuminate() {
            let cos = context.normal().dot(&illumination.direction);
            if cos <= 0.0 || context.shadow(&illumination) {
                continue;
            }
            sum += modulate(illumination.radiance, self.color) * cos;
        }
        sum
    }
}

/// Perfect mirror, reflected radiance is scaled by `attenuation`.
#[derive(Copy, Clone, Debug)]
pub struct MirrorSurface {
    attenuation: Radiance,
}

impl MirrorSurface {
    pub fn new(attenuation: Radiance) -> Self {
        MirrorSurface { attenuation }
    }
}

impl Surface for MirrorSurface {
    fn shade(&self, context: &ShadingContext) -> Radiance {
        let reflected = Ray::new(*context.position(), context.reflected());
        modulate(context.trace(&reflected), self.attenuation)
    }
}

/// Lets the ray pass through, adding its own radiance.
#[derive(Copy, Clone, Debug)]
pub struct TransparentSurface {
    radiance: Radiance,
}

impl TransparentSurface {
    pub fn new(radiance: Radiance) -> Self {
        TransparentSurface { radiance }
    }
}

impl Surface for TransparentSurface {
    fn shade(&self, _context: &ShadingContext) -> Radiance {
        self.radiance
    }

    fn is_transparent(&self, _context: &ShadingContext) -> bool {
        true
    }
}

/// Point light source with inverse square falloff.
#[derive(Copy, Clone, Debug)]
pub struct PointLight {
    position: WorldPoint,
    radiance: Radiance,
}

impl PointLight {
    pub fn new(position: WorldPoint, radiance: Radiance) -> Self {
        PointLight { position, radiance }
    }
}

impl Light for PointLight {
    fn illuminate(&self, point: &WorldPoint) -> Option<Illumination> {
        let offset = self.position - point;
        let distance = offset.norm();
        if distance < EPSILON {
            return None;
        }

        Some(Illumination {
            direction: offset / distance,
            distance,
            radiance: self.radiance * (1.0 / (distance * distance)),
        })
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct ConstantEnvironment {
    radiance: Radiance,
}

impl ConstantEnvironment {
    pub fn new(radiance: Radiance) -> Self {
        ConstantEnvironment { radiance }
    }
}

impl Environment for ConstantEnvironment {
    fn shade(&self, _ray: &Ray) -> Radiance {
        self.radiance
    }
}
