//! Reprojection avec PROJ
//!
//! Ce module est disponible uniquement avec le feature `proj`.

use proj::Proj;

use super::TransformError;
use crate::crs::ProjectedCrs;
use crate::error::{PlanimetryError, Result};

/// Reprojection d'un système projeté vers son système géographique de base
pub struct ProjReprojector {
    proj: Proj,
    source: String,
    target: String,
}

impl std::fmt::Debug for ProjReprojector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjReprojector")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish()
    }
}

/// Identifiant compris par PROJ: code EPSG si connu, sinon la définition WKT
fn proj_identifier(epsg: Option<u32>, definition: Option<&str>) -> Option<String> {
    epsg.map(|code| format!("EPSG:{}", code))
        .or_else(|| definition.map(str::to_string))
}

impl ProjReprojector {
    pub fn new(crs: &ProjectedCrs) -> Result<Self> {
        let unavailable = |reason: String| PlanimetryError::TransformUnavailable {
            crs: crs.name.clone(),
            reason,
        };

        let source = proj_identifier(crs.epsg, crs.definition.as_deref())
            .ok_or_else(|| unavailable("no EPSG code nor WKT definition".into()))?;
        let target = proj_identifier(crs.base.epsg, crs.base.definition.as_deref())
            .ok_or_else(|| unavailable("base geographic CRS has no definition".into()))?;

        let proj = Proj::new_known_crs(&source, &target, None)
            .map_err(|e| unavailable(format!("PROJ: {}", e)))?;

        Ok(Self {
            proj,
            source,
            target,
        })
    }

    /// Transforme un point en (longitude, latitude) en degrés
    pub fn transform_point(&self, x: f64, y: f64) -> std::result::Result<(f64, f64), TransformError> {
        self.proj
            .convert((x, y))
            .map_err(|e| TransformError::Proj(e.to_string()))
    }
}
