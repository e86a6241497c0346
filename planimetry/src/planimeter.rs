//! Calcul géodésique du périmètre et de la surface
//!
//! Chaque arête d'un anneau est résolue par le problème géodésique inverse
//! (distance `s12` et surface `S12` entre la géodésique et l'équateur).
//! Les surfaces élémentaires sont sommées puis réduites modulo la surface
//! totale de l'ellipsoïde, en tenant compte des passages du premier méridien.

use geo::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use geographiclib_rs::{Geodesic, InverseGeodesic};
use tracing::warn;

use crate::ellipsoid::Ellipsoid;

/// Résultat pour un anneau, avant normalisation du signe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingPlanimetry {
    /// Périmètre en mètres
    pub perimeter: f64,
    /// Surface signée en m² (positive dans le sens anti-horaire)
    pub signed_area: f64,
}

impl RingPlanimetry {
    const EMPTY: Self = Self {
        perimeter: 0.0,
        signed_area: 0.0,
    };
}

/// Périmètre et surface d'un polygone ou multi-polygone
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlanimetryResult {
    /// Somme des périmètres de tous les anneaux (m)
    pub perimeter: f64,
    /// Surface extérieure moins les trous (m²)
    pub area: f64,
}

impl PlanimetryResult {
    /// Surface nette négative (trous plus grands que l'extérieur)
    pub fn is_anomalous(&self) -> bool {
        self.area < 0.0
    }
}

impl std::ops::Add for PlanimetryResult {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            perimeter: self.perimeter + other.perimeter,
            area: self.area + other.area,
        }
    }
}

/// Somme compensée (Neumaier) pour limiter l'erreur d'arrondi sur les grands anneaux
#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    compensation: f64,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Reste IEEE: résultat dans [-y/2, y/2]
fn remainder(x: f64, y: f64) -> f64 {
    let r = x % y;
    if r.abs() > y / 2.0 {
        r - y.copysign(r)
    } else {
        r
    }
}

/// Longitude ramenée dans (-180, 180]
fn normalize_longitude(lon: f64) -> f64 {
    let lon = remainder(lon, 360.0);
    if lon == -180.0 {
        180.0
    } else {
        lon
    }
}

/// Passage du premier méridien: +1 vers l'est, -1 vers l'ouest
fn transit(lon1: f64, lon2: f64) -> i32 {
    let lon12 = normalize_longitude(lon2 - lon1);
    let lon1 = normalize_longitude(lon1);
    let lon2 = normalize_longitude(lon2);
    if lon12 > 0.0 && ((lon1 < 0.0 && lon2 >= 0.0) || (lon1 > 0.0 && lon2 == 0.0)) {
        1
    } else if lon12 < 0.0 && lon1 >= 0.0 && lon2 < 0.0 {
        -1
    } else {
        0
    }
}

/// Calculateur de planimétrie lié à un ellipsoïde
pub struct Planimeter {
    ellipsoid: Ellipsoid,
    geodesic: Geodesic,
    /// Surface totale de l'ellipsoïde
    total_area: f64,
}

impl std::fmt::Debug for Planimeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planimeter")
            .field("ellipsoid", &self.ellipsoid)
            .finish()
    }
}

impl Planimeter {
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self {
            geodesic: Geodesic::new(ellipsoid.semi_major_axis(), ellipsoid.flattening()),
            total_area: ellipsoid.surface_area(),
            ellipsoid,
        }
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    /// Périmètre et surface signée d'un anneau (longitude, latitude en degrés)
    ///
    /// Avec `closed`, l'arête du dernier au premier sommet est ajoutée. Sinon
    /// seule la longueur de la ligne ouverte est calculée et la surface vaut 0.
    pub fn ring_planimetry(&self, ring: &LineString, closed: bool) -> RingPlanimetry {
        let mut vertices: &[Coord] = &ring.0;
        // Sommet de fermeture explicite: l'arête de fermeture le remplace
        if closed && vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices = &vertices[..vertices.len() - 1];
        }

        let Some(first) = vertices.first() else {
            return RingPlanimetry::EMPTY;
        };
        if vertices.iter().all(|v| v == first) {
            return RingPlanimetry::EMPTY;
        }

        let mut perimeter = Accumulator::default();
        let mut area = Accumulator::default();
        let mut crossings = 0;

        let closing = closed.then(|| (vertices[vertices.len() - 1], *first));
        let edges = vertices
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            .chain(closing);

        for (from, to) in edges {
            let (s12, _azi1, _azi2, _m12, _mm12, _mm21, area12, _a12): (
                f64,
                f64,
                f64,
                f64,
                f64,
                f64,
                f64,
                f64,
            ) = self.geodesic.inverse(from.y, from.x, to.y, to.x);
            perimeter.add(s12);
            if closed {
                area.add(area12);
                crossings += transit(from.x, to.x);
            }
        }

        let signed_area = if closed {
            self.reduce_area(area.value(), crossings)
        } else {
            0.0
        };

        RingPlanimetry {
            perimeter: perimeter.value(),
            signed_area,
        }
    }

    /// Ramène la somme des surfaces élémentaires à la surface enclose
    fn reduce_area(&self, area: f64, crossings: i32) -> f64 {
        let half = self.total_area / 2.0;
        let mut area = remainder(area, self.total_area);
        if crossings % 2 != 0 {
            area += if area < 0.0 { half } else { -half };
        }
        // La somme est orientée dans le sens horaire
        area = -area;
        if area > half {
            area -= self.total_area;
        } else if area <= -half {
            area += self.total_area;
        }
        area
    }

    /// Surface de l'extérieur moins celle des trous, périmètre de tous les anneaux
    pub fn polygon_planimetry(&self, polygon: &Polygon) -> PlanimetryResult {
        let outer = self.ring_planimetry(polygon.exterior(), true);
        let mut result = PlanimetryResult {
            perimeter: outer.perimeter,
            area: outer.signed_area.abs(),
        };

        for hole in polygon.interiors() {
            let ring = self.ring_planimetry(hole, true);
            result.perimeter += ring.perimeter;
            result.area -= ring.signed_area.abs();
        }

        if result.is_anomalous() {
            warn!(
                area_m2 = result.area,
                holes = polygon.interiors().len(),
                "Polygon holes exceed outer ring, negative net area"
            );
        }
        result
    }

    /// Somme sur les polygones
    pub fn multi_polygon_planimetry(&self, multi: &MultiPolygon) -> PlanimetryResult {
        multi
            .0
            .iter()
            .map(|p| self.polygon_planimetry(p))
            .fold(PlanimetryResult::default(), |acc, r| acc + r)
    }

    /// Longueur géodésique totale des lignes (m)
    pub fn multi_line_planimetry(&self, multi: &MultiLineString) -> f64 {
        multi
            .0
            .iter()
            .map(|line| self.ring_planimetry(line, false).perimeter)
            .sum()
    }
}
