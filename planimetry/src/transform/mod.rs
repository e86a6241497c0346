//! Transformation vers le système géographique de base
//!
//! Projections inverses supportées en Rust pur :
//! - Lambert conique conforme (1SP, 2SP) - Lambert 93, CC42-CC50
//! - Mercator transverse - UTM
//! - Mercator (1SP, 2SP) et Pseudo-Mercator (EPSG:3857)
//!
//! Avec la feature `proj`, les autres méthodes passent par la bibliothèque PROJ.

mod lambert;
mod mercator;
#[cfg(feature = "proj")]
mod proj;
mod transverse_mercator;

use geo::{Coord, Geometry, MapCoords};
use thiserror::Error;

use crate::crs::{wkt, GeodeticCrs, ProjectedCrs, ProjectionMethod};
use crate::ellipsoid::Ellipsoid;
use crate::error::{PlanimetryError, Result};

pub use lambert::LambertConic;
pub use mercator::{Mercator, PseudoMercator};
#[cfg(feature = "proj")]
pub use self::proj::ProjReprojector;
pub use transverse_mercator::TransverseMercator;

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon: lon_deg.to_radians(),
            lat: lat_deg.to_radians(),
        }
    }
}

/// Erreur de transformation d'une coordonnée
#[derive(Debug, Error)]
pub enum TransformError {
    /// Résultat hors domaine (NaN, infini)
    #[error("coordinate ({x}, {y}) has no geographic equivalent")]
    NonFinite { x: f64, y: f64 },

    /// Erreur remontée par PROJ
    #[error("PROJ: {0}")]
    Proj(String),
}

/// Projection inverse en Rust pur
#[derive(Debug, Clone)]
pub enum InverseProjection {
    Lambert(LambertConic),
    TransverseMercator(TransverseMercator),
    Mercator(Mercator),
    PseudoMercator(PseudoMercator),
}

impl InverseProjection {
    /// Construit la projection inverse si la méthode est supportée
    pub fn for_crs(crs: &ProjectedCrs) -> Option<Self> {
        let ellipsoid: Ellipsoid = crs.base.datum.ellipsoid;
        let params = &crs.projection.parameters;
        let projection = match &crs.projection.method {
            ProjectionMethod::LambertConformalConic1SP => {
                Self::Lambert(LambertConic::one_parallel(&ellipsoid, params))
            }
            ProjectionMethod::LambertConformalConic2SP => {
                Self::Lambert(LambertConic::two_parallels(&ellipsoid, params))
            }
            ProjectionMethod::TransverseMercator => {
                Self::TransverseMercator(TransverseMercator::new(&ellipsoid, params))
            }
            ProjectionMethod::Mercator1SP => Self::Mercator(Mercator::one_parallel(&ellipsoid, params)),
            ProjectionMethod::Mercator2SP => {
                Self::Mercator(Mercator::two_parallels(&ellipsoid, params))
            }
            ProjectionMethod::PseudoMercator => {
                Self::PseudoMercator(PseudoMercator::new(&ellipsoid, params))
            }
            ProjectionMethod::Other(_) => return None,
        };
        Some(projection)
    }

    /// Coordonnées projetées (mètres) → géographiques
    pub fn inverse(&self, x: f64, y: f64) -> Geographic {
        match self {
            Self::Lambert(p) => p.inverse(x, y),
            Self::TransverseMercator(p) => p.inverse(x, y),
            Self::Mercator(p) => p.inverse(x, y),
            Self::PseudoMercator(p) => p.inverse(x, y),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Lambert(_) => "Lambert conformal conic",
            Self::TransverseMercator(_) => "Transverse Mercator",
            Self::Mercator(_) => "Mercator",
            Self::PseudoMercator(_) => "Pseudo-Mercator",
        }
    }
}

/// Reprojection légère vers le système géographique de base (pure Rust)
#[derive(Debug, Clone)]
pub struct ReprojectorLite {
    projection: InverseProjection,
    /// Mètres par unité linéaire source
    linear_unit: f64,
}

impl ReprojectorLite {
    /// Crée un reprojector si la méthode de projection est supportée
    pub fn new(crs: &ProjectedCrs) -> Option<Self> {
        Some(Self {
            projection: InverseProjection::for_crs(crs)?,
            linear_unit: crs.linear_unit,
        })
    }

    /// Transforme un point (x, y) en (longitude, latitude) en degrés
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        self.projection
            .inverse(x * self.linear_unit, y * self.linear_unit)
            .to_degrees()
    }
}

/// Transformation vers les coordonnées géographiques en degrés
#[derive(Debug)]
pub enum GeographicTransform {
    /// Projection inverse en Rust pur
    Lite(ReprojectorLite),
    /// Reprojection via PROJ (si feature activée)
    #[cfg(feature = "proj")]
    Proj(ProjReprojector),
    /// Système géographique exprimé dans une autre unité que le degré
    AngularUnit { radians_per_unit: f64 },
}

impl GeographicTransform {
    /// Transforme un point en (longitude, latitude) en degrés
    pub fn transform_point(&self, x: f64, y: f64) -> std::result::Result<(f64, f64), TransformError> {
        let (lon, lat) = match self {
            Self::Lite(lite) => lite.transform_point(x, y),
            #[cfg(feature = "proj")]
            Self::Proj(proj) => proj.transform_point(x, y)?,
            Self::AngularUnit { radians_per_unit } => (
                (x * radians_per_unit).to_degrees(),
                (y * radians_per_unit).to_degrees(),
            ),
        };
        if lon.is_finite() && lat.is_finite() {
            Ok((lon, lat))
        } else {
            Err(TransformError::NonFinite { x, y })
        }
    }

    /// Transforme toutes les coordonnées d'une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> std::result::Result<Geometry, TransformError> {
        geom.try_map_coords(|c| {
            let (x, y) = self.transform_point(c.x, c.y)?;
            Ok(Coord { x, y })
        })
    }

    /// Retourne une description du backend utilisé
    pub fn description(&self) -> String {
        match self {
            Self::Lite(lite) => format!("inverse projection ({})", lite.projection.name()),
            #[cfg(feature = "proj")]
            Self::Proj(_) => "proj (PROJ library)".to_string(),
            Self::AngularUnit { radians_per_unit } => {
                format!("angular unit ({} rad/unit)", radians_per_unit)
            }
        }
    }
}

/// Résout la transformation d'un système projeté vers son système géographique de base
///
/// Essaie d'abord les projections inverses en Rust pur, puis PROJ si disponible.
pub fn resolve_to_geographic(crs: &ProjectedCrs) -> Result<GeographicTransform> {
    if let Some(lite) = ReprojectorLite::new(crs) {
        return Ok(GeographicTransform::Lite(lite));
    }

    #[cfg(feature = "proj")]
    {
        let proj = ProjReprojector::new(crs)?;
        return Ok(GeographicTransform::Proj(proj));
    }

    #[cfg(not(feature = "proj"))]
    Err(PlanimetryError::TransformUnavailable {
        crs: crs.name.clone(),
        reason: format!(
            "projection method {:?} is not supported without PROJ (build with --features proj)",
            crs.projection.method
        ),
    })
}

/// Transformation des coordonnées d'un système géographique en degrés,
/// `None` s'il est déjà exprimé en degrés
pub fn geographic_unit_transform(crs: &GeodeticCrs) -> Option<GeographicTransform> {
    if wkt::is_degree(crs.angular_unit) {
        None
    } else {
        Some(GeographicTransform::AngularUnit {
            radians_per_unit: crs.angular_unit,
        })
    }
}
