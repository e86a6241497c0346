//! Projections Mercator
//!
//! - Mercator ellipsoïdal (1SP: facteur d'échelle, 2SP: parallèle standard)
//! - Pseudo-Mercator (EPSG:3857), sphérique de rayon a, utilisé par
//!   Google Maps, OpenStreetMap, etc.

use super::lambert::latitude_from_isometric;
use super::Geographic;
use crate::crs::ProjectionParameters;
use crate::ellipsoid::Ellipsoid;

/// Mercator ellipsoïdal
#[derive(Debug, Clone)]
pub struct Mercator {
    e: f64,
    /// a · k0
    scaled_radius: f64,
    lon0: f64,
    x0: f64,
    y0: f64,
}

impl Mercator {
    /// Variante 1SP: facteur d'échelle à l'équateur
    pub fn one_parallel(ellipsoid: &Ellipsoid, params: &ProjectionParameters) -> Self {
        Self::with_scale(ellipsoid, params, params.scale_factor)
    }

    /// Variante 2SP: échelle vraie sur le parallèle standard
    pub fn two_parallels(ellipsoid: &Ellipsoid, params: &ProjectionParameters) -> Self {
        let lat1 = params.standard_parallel_1.unwrap_or(0.0).to_radians();
        let k0 = lat1.cos() / (1.0 - ellipsoid.e2() * lat1.sin().powi(2)).sqrt();
        Self::with_scale(ellipsoid, params, k0)
    }

    fn with_scale(ellipsoid: &Ellipsoid, params: &ProjectionParameters, k0: f64) -> Self {
        Self {
            e: ellipsoid.e(),
            scaled_radius: ellipsoid.semi_major_axis() * k0,
            lon0: params.central_meridian.to_radians(),
            x0: params.false_easting,
            y0: params.false_northing,
        }
    }

    /// Coordonnées projetées (mètres) → géographiques
    pub fn inverse(&self, x: f64, y: f64) -> Geographic {
        let lon = self.lon0 + (x - self.x0) / self.scaled_radius;
        let iso_lat = (y - self.y0) / self.scaled_radius;
        Geographic::new(lon, latitude_from_isometric(iso_lat, self.e))
    }
}

/// Pseudo-Mercator (sphère de rayon équatorial)
#[derive(Debug, Clone)]
pub struct PseudoMercator {
    radius: f64,
    lon0: f64,
    x0: f64,
    y0: f64,
}

impl PseudoMercator {
    pub fn new(ellipsoid: &Ellipsoid, params: &ProjectionParameters) -> Self {
        Self {
            radius: ellipsoid.semi_major_axis(),
            lon0: params.central_meridian.to_radians(),
            x0: params.false_easting,
            y0: params.false_northing,
        }
    }

    /// Coordonnées projetées (mètres) → géographiques
    pub fn inverse(&self, x: f64, y: f64) -> Geographic {
        // Longitude = x / R
        let lon = self.lon0 + (x - self.x0) / self.radius;

        // Latitude = 2 * atan(exp(y/R)) - π/2
        let lat = 2.0 * ((y - self.y0) / self.radius).exp().atan() - std::f64::consts::FRAC_PI_2;

        Geographic::new(lon, lat)
    }
}
