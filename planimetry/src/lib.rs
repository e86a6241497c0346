//! # planimetry
//!
//! Périmètre et surface géodésiques de features vectorielles sur l'ellipsoïde
//! de référence de leur système de coordonnées.
//!
//! ## Features
//!
//! - Classification des systèmes de référence (WKT1, WKT2, registre EPSG embarqué)
//! - Transformation vers le système géographique de base (Lambert, UTM, Mercator en
//!   Rust pur, PROJ en option avec la feature `proj`)
//! - Calcul géodésique exact (solveur inverse `geographiclib-rs`)
//! - Enrichissement des features avec `length_m` et `area_m2`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use planimetry::{earth_of, CoordinateReferenceSystem, Planimeter};
//!
//! let crs = CoordinateReferenceSystem::from_epsg(4326)?;
//! let planimeter = Planimeter::new(earth_of(&crs)?);
//!
//! let result = planimeter.polygon_planimetry(&polygon);
//! println!("Surface: {} m², périmètre: {} m", result.area, result.perimeter);
//! ```

pub mod crs;
pub mod ellipsoid;
pub mod error;
pub mod feature;
pub mod planimeter;
pub mod schema;
pub mod transform;

pub use crs::{classify, CoordinateReferenceSystem, CrsType, GeodeticCrs, ProjectedCrs};
pub use ellipsoid::{earth_of, has_ellipsoid, Ellipsoid};
pub use error::{PlanimetryError, Result};
pub use feature::{
    EnrichedFeature, Feature, FeatureProcessor, GeometryKind, Processed, TransformPolicy,
};
pub use planimeter::{Planimeter, PlanimetryResult, RingPlanimetry};
pub use schema::{FieldCollector, OutputSchema};
pub use transform::{geographic_unit_transform, resolve_to_geographic, GeographicTransform};

/// Transformation vers les coordonnées géographiques requise par un système
///
/// `None` pour un système géographique déjà en degrés.
pub fn transform_for(crs: &CoordinateReferenceSystem) -> Result<Option<GeographicTransform>> {
    match crs {
        CoordinateReferenceSystem::Projected(p) => resolve_to_geographic(p).map(Some),
        CoordinateReferenceSystem::Geographic(g) | CoordinateReferenceSystem::Geodetic(g) => {
            Ok(geographic_unit_transform(g))
        }
        other => Err(PlanimetryError::UnsupportedCrs {
            name: other.name().to_string(),
            category: classify(other),
        }),
    }
}

/// Prépare le traitement d'un jeu de données: ellipsoïde, transformation, calculateur
pub fn processor_for(
    crs: &CoordinateReferenceSystem,
    kind: GeometryKind,
    policy: TransformPolicy,
) -> Result<FeatureProcessor> {
    let ellipsoid = earth_of(crs)?;
    let transform = transform_for(crs)?;
    Ok(FeatureProcessor::new(
        kind,
        Planimeter::new(ellipsoid),
        transform,
        policy,
    ))
}
