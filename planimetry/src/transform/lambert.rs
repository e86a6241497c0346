//! Projection conique conforme de Lambert
//!
//! Variantes 1SP (parallèle d'origine + facteur d'échelle) et 2SP
//! (deux parallèles standards, éventuellement confondus).

use super::Geographic;
use crate::crs::ProjectionParameters;
use crate::ellipsoid::Ellipsoid;

/// Constantes d'une projection conique conforme
#[derive(Debug, Clone)]
pub struct LambertConic {
    /// Première excentricité
    e: f64,
    /// Exposant de la projection
    n: f64,
    /// Constante C
    c: f64,
    /// Rayon à l'origine
    r0: f64,
    lon0: f64,
    x0: f64,
    y0: f64,
}

/// Calcule la latitude isométrique
pub(super) fn isometric_latitude(lat: f64, e: f64) -> f64 {
    let sin_lat = lat.sin();
    let term = ((1.0 - e * sin_lat) / (1.0 + e * sin_lat)).powf(e / 2.0);
    ((std::f64::consts::FRAC_PI_4 + lat / 2.0).tan() * term).ln()
}

/// Calcule la latitude depuis la latitude isométrique (itératif)
pub(super) fn latitude_from_isometric(iso_lat: f64, e: f64) -> f64 {
    let mut lat = 2.0 * iso_lat.exp().atan() - std::f64::consts::FRAC_PI_2;

    for _ in 0..20 {
        let sin_lat = lat.sin();
        let term = ((1.0 + e * sin_lat) / (1.0 - e * sin_lat)).powf(e / 2.0);
        let new_lat = 2.0 * (iso_lat.exp() * term).atan() - std::f64::consts::FRAC_PI_2;

        if (new_lat - lat).abs() < 1e-12 {
            return new_lat;
        }
        lat = new_lat;
    }
    lat
}

/// Calcule le grand normal (rayon de courbure dans le plan vertical)
pub(super) fn grande_normale(lat: f64, a: f64, e2: f64) -> f64 {
    a / (1.0 - e2 * lat.sin().powi(2)).sqrt()
}

impl LambertConic {
    /// Variante à deux parallèles standards (Lambert 93, CC42-CC50)
    ///
    /// Un seul parallèle renseigné, ou deux parallèles égaux, donne le cas
    /// tangent, où le facteur d'échelle s'applique (forme ESRI du 1SP).
    pub fn two_parallels(ellipsoid: &Ellipsoid, params: &ProjectionParameters) -> Self {
        let a = ellipsoid.semi_major_axis();
        let e = ellipsoid.e();
        let e2 = ellipsoid.e2();
        let lat0 = params.latitude_of_origin.to_radians();
        let lat1 = params
            .standard_parallel_1
            .unwrap_or(params.latitude_of_origin)
            .to_radians();
        let lat2 = params
            .standard_parallel_2
            .map(f64::to_radians)
            .unwrap_or(lat1);

        let n1 = grande_normale(lat1, a, e2);
        let iso_lat1 = isometric_latitude(lat1, e);

        let (n, k0) = if (lat1 - lat2).abs() < 1e-12 {
            (lat1.sin(), params.scale_factor)
        } else {
            let n2 = grande_normale(lat2, a, e2);
            let iso_lat2 = isometric_latitude(lat2, e);
            let n = ((n1 * lat1.cos()).ln() - (n2 * lat2.cos()).ln()) / (iso_lat2 - iso_lat1);
            (n, 1.0)
        };

        let c = k0 * (n1 * lat1.cos() / n) * (n * iso_lat1).exp();
        Self::with_constants(e, n, c, lat0, params)
    }

    /// Variante à un parallèle (facteur d'échelle sur le parallèle d'origine)
    pub fn one_parallel(ellipsoid: &Ellipsoid, params: &ProjectionParameters) -> Self {
        let a = ellipsoid.semi_major_axis();
        let e = ellipsoid.e();
        let lat0 = params.latitude_of_origin.to_radians();

        let n = lat0.sin();
        let n0 = grande_normale(lat0, a, ellipsoid.e2());
        let c = params.scale_factor * n0 * lat0.cos() / n * (n * isometric_latitude(lat0, e)).exp();
        Self::with_constants(e, n, c, lat0, params)
    }

    fn with_constants(e: f64, n: f64, c: f64, lat0: f64, params: &ProjectionParameters) -> Self {
        // Rayon à l'origine
        let r0 = c * (-n * isometric_latitude(lat0, e)).exp();
        Self {
            e,
            n,
            c,
            r0,
            lon0: params.central_meridian.to_radians(),
            x0: params.false_easting,
            y0: params.false_northing,
        }
    }

    /// Coordonnées projetées (mètres) → géographiques
    pub fn inverse(&self, x: f64, y: f64) -> Geographic {
        let sign = self.n.signum();

        // Coordonnées centrées
        let dx = x - self.x0;
        let dy = self.r0 - (y - self.y0);

        // Rayon et angle
        let r = sign * (dx.powi(2) + dy.powi(2)).sqrt();
        let gamma = (sign * dx).atan2(sign * dy);

        // Latitude isométrique
        let iso_lat = -(r / self.c).ln() / self.n;

        Geographic::new(
            self.lon0 + gamma / self.n,
            latitude_from_isometric(iso_lat, self.e),
        )
    }

    /// Coordonnées géographiques → projetées (mètres)
    pub fn forward(&self, geo: Geographic) -> (f64, f64) {
        let r = self.c * (-self.n * isometric_latitude(geo.lat, self.e)).exp();
        let gamma = self.n * (geo.lon - self.lon0);
        (
            self.x0 + r * gamma.sin(),
            self.y0 + self.r0 - r * gamma.cos(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lambert93() -> LambertConic {
        LambertConic::two_parallels(
            &Ellipsoid::GRS80,
            &ProjectionParameters {
                latitude_of_origin: 46.5,
                central_meridian: 3.0,
                standard_parallel_1: Some(49.0),
                standard_parallel_2: Some(44.0),
                scale_factor: 1.0,
                false_easting: 700000.0,
                false_northing: 6600000.0,
            },
        )
    }

    #[test]
    fn test_paris() {
        // Tour Eiffel approximativement
        let (lon, lat) = lambert93().inverse(648237.0, 6862107.0).to_degrees();

        // Tour Eiffel: 2.2945°E, 48.8584°N
        assert!((lon - 2.2945).abs() < 0.01, "lon={}", lon);
        assert!((lat - 48.8584).abs() < 0.01, "lat={}", lat);
    }

    #[test]
    fn test_marseille() {
        // Vieux-Port approximativement
        let (lon, lat) = lambert93().inverse(893193.0, 6245829.0).to_degrees();

        // Marseille: 5.37°E, 43.30°N
        assert!((lon - 5.37).abs() < 0.1, "lon={}", lon);
        assert!((lat - 43.30).abs() < 0.1, "lat={}", lat);
    }

    #[test]
    fn test_origin() {
        let (lon, lat) = lambert93().inverse(700000.0, 6600000.0).to_degrees();
        assert!((lon - 3.0).abs() < 1e-9);
        assert!((lat - 46.5).abs() < 1e-9);
    }

    #[test]
    fn test_forward_inverse_consistency() {
        let proj = lambert93();
        let (x, y) = proj.forward(Geographic::from_degrees(-1.55, 47.21));
        let (lon, lat) = proj.inverse(x, y).to_degrees();
        assert!((lon - (-1.55)).abs() < 1e-9, "lon={}", lon);
        assert!((lat - 47.21).abs() < 1e-9, "lat={}", lat);
    }

    #[test]
    fn test_one_parallel_matches_tangent_cone() {
        let params = ProjectionParameters {
            latitude_of_origin: 46.8,
            central_meridian: 2.337229,
            standard_parallel_1: None,
            standard_parallel_2: None,
            scale_factor: 1.0,
            false_easting: 600000.0,
            false_northing: 2200000.0,
        };
        let clarke = Ellipsoid::from_inverse_flattening(6378249.2, 293.4660212936269).unwrap();
        let one = LambertConic::one_parallel(&clarke, &params);
        let tangent = LambertConic::two_parallels(&clarke, &params);

        let (lon1, lat1) = one.inverse(632000.0, 2430000.0).to_degrees();
        let (lon2, lat2) = tangent.inverse(632000.0, 2430000.0).to_degrees();
        assert!((lon1 - lon2).abs() < 1e-12);
        assert!((lat1 - lat2).abs() < 1e-12);
    }

    #[test]
    fn test_tangent_cone_applies_scale_factor() {
        // Lambert II étendu, paramètres en degrés
        let params = ProjectionParameters {
            latitude_of_origin: 46.8,
            central_meridian: 2.337229166666667,
            standard_parallel_1: Some(46.8),
            standard_parallel_2: None,
            scale_factor: 0.99987742,
            false_easting: 600000.0,
            false_northing: 2200000.0,
        };
        let clarke = Ellipsoid::from_inverse_flattening(6378249.2, 293.4660212936269).unwrap();
        let one = LambertConic::one_parallel(&clarke, &params);
        let tangent = LambertConic::two_parallels(&clarke, &params);

        for (x, y) in [(600000.0, 2200000.0), (632000.0, 2430000.0), (480000.0, 1900000.0)] {
            let (lon1, lat1) = one.inverse(x, y).to_degrees();
            let (lon2, lat2) = tangent.inverse(x, y).to_degrees();
            assert!((lon1 - lon2).abs() < 1e-12, "lon {} vs {}", lon1, lon2);
            assert!((lat1 - lat2).abs() < 1e-12, "lat {} vs {}", lat1, lat2);
        }
    }

    #[test]
    fn test_southern_cone() {
        // Cône austral (n < 0)
        let proj = LambertConic::two_parallels(
            &Ellipsoid::WGS84,
            &ProjectionParameters {
                latitude_of_origin: -32.0,
                central_meridian: 135.0,
                standard_parallel_1: Some(-28.0),
                standard_parallel_2: Some(-36.0),
                scale_factor: 1.0,
                false_easting: 0.0,
                false_northing: 0.0,
            },
        );
        let (x, y) = proj.forward(Geographic::from_degrees(138.6, -34.93));
        let (lon, lat) = proj.inverse(x, y).to_degrees();
        assert!((lon - 138.6).abs() < 1e-9, "lon={}", lon);
        assert!((lat - (-34.93)).abs() < 1e-9, "lat={}", lat);
    }
}
