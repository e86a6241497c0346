//! Modèle d'ellipsoïde (demi-grand axe + aplatissement)

use std::f64::consts::PI;

use crate::crs::{CoordinateReferenceSystem, CrsType, Datum};
use crate::error::{PlanimetryError, Result};

/// Ellipsoïde de référence, immuable pour toute la durée d'un jeu de données
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    semi_major_axis: f64,
    flattening: f64,
}

impl Ellipsoid {
    /// Ellipsoïde WGS84
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major_axis: 6378137.0,
        flattening: 1.0 / 298.257223563,
    };

    /// Ellipsoïde GRS80 (RGF93, ETRS89, NAD83)
    /// Note: Quasi identique à WGS84, différence < 0.1mm
    pub const GRS80: Ellipsoid = Ellipsoid {
        semi_major_axis: 6378137.0,
        flattening: 1.0 / 298.257222101,
    };

    /// Crée un ellipsoïde en validant a > 0 et f ∈ [0, 1)
    pub fn new(semi_major_axis: f64, flattening: f64) -> Result<Self> {
        let valid = semi_major_axis.is_finite()
            && semi_major_axis > 0.0
            && flattening.is_finite()
            && (0.0..1.0).contains(&flattening);
        if !valid {
            return Err(PlanimetryError::InvalidEllipsoid {
                semi_major_axis,
                flattening,
            });
        }
        Ok(Self {
            semi_major_axis,
            flattening,
        })
    }

    /// Crée depuis l'inverse de l'aplatissement (0 = sphère, convention WKT)
    pub fn from_inverse_flattening(semi_major_axis: f64, inverse_flattening: f64) -> Result<Self> {
        let flattening = if inverse_flattening == 0.0 {
            0.0
        } else {
            1.0 / inverse_flattening
        };
        Self::new(semi_major_axis, flattening)
    }

    /// Sphère de rayon donné
    pub fn sphere(radius: f64) -> Result<Self> {
        Self::new(radius, 0.0)
    }

    /// Demi-grand axe (rayon équatorial) en mètres
    pub fn semi_major_axis(&self) -> f64 {
        self.semi_major_axis
    }

    /// Aplatissement
    pub fn flattening(&self) -> f64 {
        self.flattening
    }

    /// Demi-petit axe (rayon polaire) en mètres
    pub fn semi_minor_axis(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.flattening)
    }

    /// Première excentricité au carré
    pub fn e2(&self) -> f64 {
        self.flattening * (2.0 - self.flattening)
    }

    /// Première excentricité
    pub fn e(&self) -> f64 {
        self.e2().sqrt()
    }

    /// Deuxième excentricité au carré
    pub fn ep2(&self) -> f64 {
        self.e2() / (1.0 - self.e2())
    }

    /// Carré du rayon authalique (sphère de même surface)
    pub fn authalic_radius_squared(&self) -> f64 {
        let a = self.semi_major_axis;
        let b = self.semi_minor_axis();
        let e2 = self.e2();
        let ratio = if e2 == 0.0 {
            1.0
        } else {
            let e = e2.sqrt();
            e.atanh() / e
        };
        (a * a + b * b * ratio) / 2.0
    }

    /// Surface totale de l'ellipsoïde en m²
    pub fn surface_area(&self) -> f64 {
        4.0 * PI * self.authalic_radius_squared()
    }
}

impl From<&Datum> for Ellipsoid {
    fn from(datum: &Datum) -> Self {
        datum.ellipsoid
    }
}

/// Extrait l'ellipsoïde du datum d'un système géographique, géodésique
/// ou projeté (via son système de base)
pub fn earth_of(crs: &CoordinateReferenceSystem) -> Result<Ellipsoid> {
    match crs {
        CoordinateReferenceSystem::Geographic(g) | CoordinateReferenceSystem::Geodetic(g) => {
            Ok(Ellipsoid::from(&g.datum))
        }
        CoordinateReferenceSystem::Projected(p) => Ok(Ellipsoid::from(&p.base.datum)),
        other => Err(PlanimetryError::UnsupportedCrs {
            name: other.name().to_string(),
            category: crate::crs::classify(other),
        }),
    }
}

/// Indique si la catégorie dispose d'un ellipsoïde exploitable
pub fn has_ellipsoid(category: CrsType) -> bool {
    matches!(
        category,
        CrsType::Geographic | CrsType::Geodetic | CrsType::Projected
    )
}
