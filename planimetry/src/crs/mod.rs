//! Systèmes de référence de coordonnées
//!
//! Chaque système est une variante d'énumération portant uniquement les champs
//! utiles au calcul: datum (ellipsoïde) pour les systèmes géodésiques, système
//! de base et paramètres de projection pour les systèmes projetés.

mod epsg;
pub mod wkt;

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::ellipsoid::Ellipsoid;
use crate::error::{PlanimetryError, Result};

pub use epsg::{definition as epsg_definition, is_supported as is_supported_epsg};

/// Catégorie de système de référence (ensemble fermé)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrsType {
    Compound,
    Derived,
    Engineering,
    GeneralDerived,
    Geocentric,
    Geodetic,
    Geographic,
    Image,
    Projected,
    Temporal,
    Vertical,
}

impl CrsType {
    /// Ordre de priorité du classement
    pub const PRIORITY: [CrsType; 11] = [
        CrsType::Compound,
        CrsType::Derived,
        CrsType::Engineering,
        CrsType::GeneralDerived,
        CrsType::Geocentric,
        CrsType::Geodetic,
        CrsType::Geographic,
        CrsType::Image,
        CrsType::Projected,
        CrsType::Temporal,
        CrsType::Vertical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrsType::Compound => "Compound",
            CrsType::Derived => "Derived",
            CrsType::Engineering => "Engineering",
            CrsType::GeneralDerived => "GeneralDerived",
            CrsType::Geocentric => "Geocentric",
            CrsType::Geodetic => "Geodetic",
            CrsType::Geographic => "Geographic",
            CrsType::Image => "Image",
            CrsType::Projected => "Projected",
            CrsType::Temporal => "Temporal",
            CrsType::Vertical => "Vertical",
        }
    }
}

impl fmt::Display for CrsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Datum géodésique
#[derive(Debug, Clone, PartialEq)]
pub struct Datum {
    pub name: String,
    pub ellipsoid_name: String,
    pub ellipsoid: Ellipsoid,
}

/// Système géodésique (géographique, géodésique ou géocentrique)
#[derive(Debug, Clone, PartialEq)]
pub struct GeodeticCrs {
    pub name: String,
    pub datum: Datum,
    /// Radians par unité angulaire des coordonnées
    pub angular_unit: f64,
    pub epsg: Option<u32>,
    /// Texte WKT d'origine, si connu
    pub definition: Option<String>,
}

/// Système projeté
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedCrs {
    pub name: String,
    /// Système géographique de base
    pub base: GeodeticCrs,
    pub projection: Projection,
    /// Mètres par unité linéaire des coordonnées
    pub linear_unit: f64,
    pub epsg: Option<u32>,
    pub definition: Option<String>,
}

/// Méthode et paramètres de projection
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub method: ProjectionMethod,
    pub parameters: ProjectionParameters,
}

/// Méthodes de projection reconnues
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionMethod {
    LambertConformalConic1SP,
    LambertConformalConic2SP,
    TransverseMercator,
    Mercator1SP,
    Mercator2SP,
    /// Web Mercator (EPSG:3857), sphérique
    PseudoMercator,
    Other(String),
}

impl ProjectionMethod {
    /// Reconnaît un nom de méthode WKT1 (OGC/ESRI) ou WKT2 (EPSG)
    pub fn from_name(name: &str) -> Self {
        let key = wkt::normalize(name);
        if key.contains("pseudomercator") || key.contains("auxiliarysphere") {
            ProjectionMethod::PseudoMercator
        } else if key.contains("lambert") && key.contains("conic") {
            if key.contains("1sp") {
                ProjectionMethod::LambertConformalConic1SP
            } else {
                ProjectionMethod::LambertConformalConic2SP
            }
        } else if key.contains("transversemercator") || key.contains("gausskruger") {
            ProjectionMethod::TransverseMercator
        } else if key.contains("mercator") {
            if key.contains("2sp") || key.contains("variantb") {
                ProjectionMethod::Mercator2SP
            } else {
                ProjectionMethod::Mercator1SP
            }
        } else {
            ProjectionMethod::Other(name.to_string())
        }
    }
}

/// Paramètres de projection (angles en degrés, longueurs en mètres)
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionParameters {
    pub latitude_of_origin: f64,
    pub central_meridian: f64,
    pub standard_parallel_1: Option<f64>,
    pub standard_parallel_2: Option<f64>,
    pub scale_factor: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl Default for ProjectionParameters {
    fn default() -> Self {
        Self {
            latitude_of_origin: 0.0,
            central_meridian: 0.0,
            standard_parallel_1: None,
            standard_parallel_2: None,
            scale_factor: 1.0,
            false_easting: 0.0,
            false_northing: 0.0,
        }
    }
}

/// Système de référence de coordonnées
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateReferenceSystem {
    Compound {
        name: String,
        components: Vec<CoordinateReferenceSystem>,
    },
    Derived {
        name: String,
        base: Box<CoordinateReferenceSystem>,
    },
    Engineering {
        name: String,
    },
    GeneralDerived {
        name: String,
        base: Option<Box<CoordinateReferenceSystem>>,
    },
    Geocentric(GeodeticCrs),
    Geodetic(GeodeticCrs),
    Geographic(GeodeticCrs),
    Image {
        name: String,
    },
    Projected(ProjectedCrs),
    Temporal {
        name: String,
    },
    Vertical {
        name: String,
    },
    /// Définition non reconnue (mot-clé WKT inconnu)
    Unrecognized {
        keyword: String,
        name: String,
    },
}

/// Classe un système de référence (None si non reconnu)
pub fn classify(crs: &CoordinateReferenceSystem) -> Option<CrsType> {
    CrsType::PRIORITY
        .into_iter()
        .find(|category| crs.is_member_of(*category))
}

impl CoordinateReferenceSystem {
    fn is_member_of(&self, category: CrsType) -> bool {
        use CoordinateReferenceSystem as C;
        matches!(
            (self, category),
            (C::Compound { .. }, CrsType::Compound)
                | (C::Derived { .. }, CrsType::Derived)
                | (C::Engineering { .. }, CrsType::Engineering)
                | (C::GeneralDerived { .. }, CrsType::GeneralDerived)
                | (C::Geocentric(_), CrsType::Geocentric)
                | (C::Geodetic(_), CrsType::Geodetic)
                | (C::Geographic(_), CrsType::Geographic)
                | (C::Image { .. }, CrsType::Image)
                | (C::Projected(_), CrsType::Projected)
                | (C::Temporal { .. }, CrsType::Temporal)
                | (C::Vertical { .. }, CrsType::Vertical)
        )
    }

    /// Nom du système
    pub fn name(&self) -> &str {
        use CoordinateReferenceSystem as C;
        match self {
            C::Compound { name, .. }
            | C::Derived { name, .. }
            | C::Engineering { name }
            | C::GeneralDerived { name, .. }
            | C::Image { name }
            | C::Temporal { name }
            | C::Vertical { name }
            | C::Unrecognized { name, .. } => name,
            C::Geocentric(g) | C::Geodetic(g) | C::Geographic(g) => &g.name,
            C::Projected(p) => &p.name,
        }
    }

    /// Code EPSG si connu
    pub fn epsg(&self) -> Option<u32> {
        match self {
            CoordinateReferenceSystem::Geocentric(g)
            | CoordinateReferenceSystem::Geodetic(g)
            | CoordinateReferenceSystem::Geographic(g) => g.epsg,
            CoordinateReferenceSystem::Projected(p) => p.epsg,
            _ => None,
        }
    }

    /// Texte WKT d'origine, si le système vient d'une définition WKT
    pub fn definition(&self) -> Option<&str> {
        match self {
            CoordinateReferenceSystem::Geocentric(g)
            | CoordinateReferenceSystem::Geodetic(g)
            | CoordinateReferenceSystem::Geographic(g) => g.definition.as_deref(),
            CoordinateReferenceSystem::Projected(p) => p.definition.as_deref(),
            _ => None,
        }
    }

    /// Parse une définition WKT1 ou WKT2
    pub fn from_wkt(wkt: &str) -> Result<Self> {
        wkt::parse(wkt)
    }

    /// Construit depuis le registre EPSG embarqué
    pub fn from_epsg(code: u32) -> Result<Self> {
        let definition = epsg::definition(code).ok_or(PlanimetryError::UnknownEpsg(code))?;
        Self::from_wkt(&definition)
    }

    /// OGC:CRS84 (WGS84, longitude/latitude), système par défaut du GeoJSON
    pub fn crs84() -> Self {
        CoordinateReferenceSystem::Geographic(GeodeticCrs {
            name: "WGS 84 (CRS84)".to_string(),
            datum: Datum {
                name: "World Geodetic System 1984".to_string(),
                ellipsoid_name: "WGS 84".to_string(),
                ellipsoid: Ellipsoid::WGS84,
            },
            angular_unit: std::f64::consts::PI / 180.0,
            epsg: None,
            definition: None,
        })
    }

    /// Résout un identifiant: `EPSG:2154`, `urn:ogc:def:crs:EPSG::2154`,
    /// `OGC:CRS84` ou un texte WKT
    pub fn from_identifier(identifier: &str) -> Result<Self> {
        static EPSG_RE: OnceLock<Regex> = OnceLock::new();
        static CRS84_RE: OnceLock<Regex> = OnceLock::new();

        let id = identifier.trim();
        let epsg_re = EPSG_RE.get_or_init(|| {
            Regex::new(r"(?i)^(?:EPSG:|urn:ogc:def:crs:EPSG:[^:]*:|https?://www\.opengis\.net/def/crs/EPSG/[^/]+/)(\d+)$")
                .expect("valid EPSG regex")
        });
        let crs84_re = CRS84_RE.get_or_init(|| {
            Regex::new(r"(?i)^(?:OGC:)?CRS:?84$|^urn:ogc:def:crs:OGC:1\.3:CRS84$|^https?://www\.opengis\.net/def/crs/OGC/1\.3/CRS84$")
                .expect("valid CRS84 regex")
        });

        if let Some(caps) = epsg_re.captures(id) {
            let code: u32 = caps[1]
                .parse()
                .map_err(|_| PlanimetryError::UnknownIdentifier(id.to_string()))?;
            return Self::from_epsg(code);
        }
        if crs84_re.is_match(id) {
            return Ok(Self::crs84());
        }
        if id.contains('[') {
            return Self::from_wkt(id);
        }
        Err(PlanimetryError::UnknownIdentifier(id.to_string()))
    }
}

impl fmt::Display for CoordinateReferenceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.epsg(), classify(self)) {
            (Some(code), Some(c)) => write!(f, "{} (EPSG:{}, {})", self.name(), code, c),
            (None, Some(c)) => write!(f, "{} ({})", self.name(), c),
            (_, None) => write!(f, "{} (unclassified)", self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_each_variant() {
        let cases = [
            (CoordinateReferenceSystem::from_epsg(4326).unwrap(), Some(CrsType::Geographic)),
            (CoordinateReferenceSystem::from_epsg(4978).unwrap(), Some(CrsType::Geocentric)),
            (CoordinateReferenceSystem::from_epsg(2154).unwrap(), Some(CrsType::Projected)),
            (CoordinateReferenceSystem::from_epsg(5773).unwrap(), Some(CrsType::Vertical)),
            (
                CoordinateReferenceSystem::Image { name: "img".into() },
                Some(CrsType::Image),
            ),
            (
                CoordinateReferenceSystem::Temporal { name: "t".into() },
                Some(CrsType::Temporal),
            ),
            (
                CoordinateReferenceSystem::Unrecognized {
                    keyword: "FOO".into(),
                    name: "x".into(),
                },
                None,
            ),
        ];
        for (crs, expected) in cases {
            assert_eq!(classify(&crs), expected, "{}", crs.name());
        }
    }

    #[test]
    fn test_compound_wins_over_components() {
        let crs = CoordinateReferenceSystem::Compound {
            name: "3D".into(),
            components: vec![
                CoordinateReferenceSystem::from_epsg(2154).unwrap(),
                CoordinateReferenceSystem::from_epsg(5773).unwrap(),
            ],
        };
        assert_eq!(classify(&crs), Some(CrsType::Compound));
    }

    #[test]
    fn test_priority_order_is_complete() {
        let mut seen = std::collections::HashSet::new();
        for c in CrsType::PRIORITY {
            assert!(seen.insert(c));
        }
        assert_eq!(seen.len(), 11);
        assert_eq!(CrsType::PRIORITY[0], CrsType::Compound);
        assert_eq!(CrsType::PRIORITY[10], CrsType::Vertical);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(
            ProjectionMethod::from_name("Lambert_Conformal_Conic_1SP"),
            ProjectionMethod::LambertConformalConic1SP
        );
        assert_eq!(
            ProjectionMethod::from_name("Lambert Conic Conformal (2SP)"),
            ProjectionMethod::LambertConformalConic2SP
        );
        assert_eq!(
            ProjectionMethod::from_name("Transverse Mercator"),
            ProjectionMethod::TransverseMercator
        );
        assert_eq!(
            ProjectionMethod::from_name("Popular Visualisation Pseudo Mercator"),
            ProjectionMethod::PseudoMercator
        );
        assert_eq!(
            ProjectionMethod::from_name("Mercator (variant B)"),
            ProjectionMethod::Mercator2SP
        );
        assert!(matches!(
            ProjectionMethod::from_name("Polar_Stereographic"),
            ProjectionMethod::Other(_)
        ));
    }

    #[test]
    fn test_from_identifier() {
        let crs = CoordinateReferenceSystem::from_identifier("EPSG:2154").unwrap();
        assert_eq!(crs.epsg(), Some(2154));

        let crs = CoordinateReferenceSystem::from_identifier("urn:ogc:def:crs:EPSG::32631").unwrap();
        assert_eq!(crs.epsg(), Some(32631));

        let crs = CoordinateReferenceSystem::from_identifier("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap();
        assert_eq!(classify(&crs), Some(CrsType::Geographic));

        assert!(matches!(
            CoordinateReferenceSystem::from_identifier("EPSG:999999"),
            Err(PlanimetryError::UnknownEpsg(999999))
        ));
        assert!(CoordinateReferenceSystem::from_identifier("not a crs").is_err());
    }

    #[test]
    fn test_display() {
        let crs = CoordinateReferenceSystem::from_epsg(2154).unwrap();
        assert_eq!(crs.to_string(), "RGF93 / Lambert-93 (EPSG:2154, Projected)");
    }
}
