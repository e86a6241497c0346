//! Projection Mercator transverse (UTM et dérivées)
//!
//! Développement en série de Snyder, précis au millimètre dans la
//! largeur d'un fuseau UTM.

use super::Geographic;
use crate::crs::ProjectionParameters;
use crate::ellipsoid::Ellipsoid;

/// Constantes d'une projection Mercator transverse
#[derive(Debug, Clone)]
pub struct TransverseMercator {
    a: f64,
    e2: f64,
    ep2: f64,
    /// Facteur d'échelle sur le méridien central
    k0: f64,
    lon0: f64,
    /// Arc de méridien à la latitude d'origine
    m0: f64,
    x0: f64,
    y0: f64,
}

/// Arc de méridien depuis l'équateur
fn meridian_arc(lat: f64, a: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    a * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

impl TransverseMercator {
    pub fn new(ellipsoid: &Ellipsoid, params: &ProjectionParameters) -> Self {
        let a = ellipsoid.semi_major_axis();
        let e2 = ellipsoid.e2();
        Self {
            a,
            e2,
            ep2: ellipsoid.ep2(),
            k0: params.scale_factor,
            lon0: params.central_meridian.to_radians(),
            m0: meridian_arc(params.latitude_of_origin.to_radians(), a, e2),
            x0: params.false_easting,
            y0: params.false_northing,
        }
    }

    /// Coordonnées projetées (mètres) → géographiques
    pub fn inverse(&self, x: f64, y: f64) -> Geographic {
        let (a, e2, ep2, k0) = (self.a, self.e2, self.ep2, self.k0);

        // Coordonnées réduites
        let x = x - self.x0;
        let y = y - self.y0;

        // Calcul du footprint latitude
        let m = self.m0 + y / k0;
        let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));

        // Coefficients pour la série
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        // Calculs intermédiaires
        let sin_phi1 = phi1.sin();
        let cos_phi1 = phi1.cos();
        let tan_phi1 = phi1.tan();

        let n1 = a / (1.0 - e2 * sin_phi1.powi(2)).sqrt();
        let t1 = tan_phi1.powi(2);
        let c1 = ep2 * cos_phi1.powi(2);
        let r1 = a * (1.0 - e2) / (1.0 - e2 * sin_phi1.powi(2)).powf(1.5);
        let d = x / (n1 * k0);

        let lat = phi1
            - (n1 * tan_phi1 / r1)
                * (d.powi(2) / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1.powi(2) - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1.powi(2)
                        - 252.0 * ep2
                        - 3.0 * c1.powi(2))
                        * d.powi(6)
                        / 720.0);

        let lon = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1.powi(2) + 8.0 * ep2 + 24.0 * t1.powi(2))
                    * d.powi(5)
                    / 120.0)
                / cos_phi1;

        Geographic::new(lon, lat)
    }
}
