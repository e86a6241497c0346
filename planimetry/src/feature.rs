//! Features et calcul des attributs dérivés

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use geo::{CoordsIter, Geometry, MultiLineString, MultiPolygon};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{PlanimetryError, Result};
use crate::planimeter::Planimeter;
use crate::schema::{first_free_name, OutputSchema};
use crate::transform::GeographicTransform;

/// Type de géométrie d'un jeu de données
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    MultiLineString,
    MultiPolygon,
}

impl GeometryKind {
    /// Type de jeu de données correspondant à une géométrie
    ///
    /// Les formes simples sont promues vers leur forme multiple.
    /// `None` pour les collections hétérogènes.
    pub fn of(geometry: &Geometry) -> Option<Self> {
        match geometry {
            Geometry::Point(_) | Geometry::MultiPoint(_) => Some(Self::Point),
            Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
                Some(Self::MultiLineString)
            }
            Geometry::Polygon(_)
            | Geometry::MultiPolygon(_)
            | Geometry::Rect(_)
            | Geometry::Triangle(_) => Some(Self::MultiPolygon),
            Geometry::GeometryCollection(_) => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Point => "POINT",
            Self::MultiLineString => "MULTILINESTRING",
            Self::MultiPolygon => "MULTIPOLYGON",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GeometryKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "point" | "multipoint" => Ok(Self::Point),
            "line" | "linestring" | "multilinestring" => Ok(Self::MultiLineString),
            "polygon" | "multipolygon" => Ok(Self::MultiPolygon),
            other => Err(format!(
                "unknown geometry kind '{}' (expected point, linestring or polygon)",
                other
            )),
        }
    }
}

/// Nom WKT d'une géométrie, pour les messages d'erreur
pub fn geometry_type_name(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "POINT",
        Geometry::Line(_) => "LINE",
        Geometry::LineString(_) => "LINESTRING",
        Geometry::Polygon(_) => "POLYGON",
        Geometry::MultiPoint(_) => "MULTIPOINT",
        Geometry::MultiLineString(_) => "MULTILINESTRING",
        Geometry::MultiPolygon(_) => "MULTIPOLYGON",
        Geometry::GeometryCollection(_) => "GEOMETRYCOLLECTION",
        Geometry::Rect(_) => "RECT",
        Geometry::Triangle(_) => "TRIANGLE",
    }
}

/// Comportement en cas d'échec de transformation d'une feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformPolicy {
    /// Interrompt tout le jeu de données
    #[default]
    Abort,
    /// Ignore la feature et continue
    Skip,
}

impl FromStr for TransformPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown policy '{}' (expected abort or skip)", other)),
        }
    }
}

impl fmt::Display for TransformPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Abort => "abort",
            Self::Skip => "skip",
        })
    }
}

/// Une feature source: attributs ordonnés et géométrie
#[derive(Debug, Clone, Default)]
pub struct Feature {
    /// Position dans le jeu de données (0-based)
    pub index: u64,

    /// Identifiant de la feature, si présent
    pub id: Option<String>,

    /// Attributs (ordre d'insertion conservé)
    pub properties: Map<String, Value>,

    /// Géométrie, absente pour une feature sans géométrie
    pub geometry: Option<Geometry>,
}

impl Feature {
    /// Libellé pour les logs et erreurs
    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("#{}", self.index),
        }
    }
}

/// Valeurs calculées pour une feature
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedValues {
    /// Longueur ou périmètre géodésique (m)
    pub length_m: Option<f64>,
    /// Surface géodésique (m²)
    pub area_m2: Option<f64>,
}

/// Feature enrichie prête à être écrite
///
/// La géométrie est celle d'origine: la sortie reste dans le système source.
#[derive(Debug, Clone)]
pub struct EnrichedFeature {
    pub index: u64,
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: Option<Geometry>,
    pub derived: DerivedValues,
    /// Surface nette négative
    pub anomalous: bool,
}

impl EnrichedFeature {
    /// Attributs d'origine suivis des champs dérivés nommés par le schéma
    ///
    /// Les champs dérivés sont toujours écrits. Un attribut source portant le
    /// nom d'un champ dérivé (absent du schéma) est renommé, jamais écrasé.
    pub fn properties(&self, schema: &OutputSchema) -> Map<String, Value> {
        let derived: Vec<(&str, Option<f64>)> = [
            (schema.length_field(), self.derived.length_m),
            (schema.area_field(), self.derived.area_m2),
        ]
        .into_iter()
        .filter_map(|(name, value)| name.map(|n| (n, value)))
        .collect();
        let is_derived = |name: &str| derived.iter().any(|(n, _)| *n == name);

        let mut properties = Map::with_capacity(self.properties.len() + derived.len());
        for (key, value) in &self.properties {
            if !is_derived(key) {
                properties.insert(key.clone(), value.clone());
                continue;
            }
            let renamed = first_free_name(key, |name| {
                is_derived(name)
                    || self.properties.contains_key(name)
                    || properties.contains_key(name)
                    || schema.has_source_field(name)
            });
            warn!(
                feature = self.index,
                field = %key,
                renamed = %renamed,
                "Attribute collides with derived field, renamed"
            );
            properties.insert(renamed, value.clone());
        }
        for (name, value) in derived {
            properties.insert(name.to_string(), value.map_or(Value::Null, Value::from));
        }
        properties
    }

    /// Taille estimée de la forme sérialisée (octets)
    pub fn size_estimate(&self) -> usize {
        let attributes = serde_json::to_string(&self.properties)
            .map(|s| s.len())
            .unwrap_or_default();
        let coordinates = self
            .geometry
            .as_ref()
            .map_or(0, |g| g.coords_count() * 40);
        attributes + coordinates + 64
    }
}

/// Résultat du traitement d'une feature
#[derive(Debug)]
pub enum Processed {
    Enriched(EnrichedFeature),
    /// Feature ignorée (politique `Skip`)
    Skipped { feature: String, reason: String },
}

/// Traitement des features d'un jeu de données
#[derive(Debug)]
pub struct FeatureProcessor {
    kind: GeometryKind,
    planimeter: Planimeter,
    transform: Option<GeographicTransform>,
    policy: TransformPolicy,
}

impl FeatureProcessor {
    pub fn new(
        kind: GeometryKind,
        planimeter: Planimeter,
        transform: Option<GeographicTransform>,
        policy: TransformPolicy,
    ) -> Self {
        Self {
            kind,
            planimeter,
            transform,
            policy,
        }
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    pub fn planimeter(&self) -> &Planimeter {
        &self.planimeter
    }

    /// Transformation vers les coordonnées géographiques, si nécessaire
    pub fn transform(&self) -> Option<&GeographicTransform> {
        self.transform.as_ref()
    }

    pub fn policy(&self) -> TransformPolicy {
        self.policy
    }

    /// Calcule les attributs dérivés d'une feature
    pub fn process(&self, feature: Feature) -> Result<Processed> {
        let Some(geometry) = &feature.geometry else {
            debug!(feature = feature.index, "Feature without geometry");
            return Ok(Processed::Enriched(self.enrich(feature, DerivedValues::default(), false)));
        };

        if GeometryKind::of(geometry) != Some(self.kind) {
            return Err(PlanimetryError::GeometryMismatch {
                expected: self.kind.name(),
                found: geometry_type_name(geometry),
            });
        }

        let geographic = match &self.transform {
            None => Cow::Borrowed(geometry),
            Some(transform) => match transform.transform_geometry(geometry) {
                Ok(g) => Cow::Owned(g),
                Err(e) => {
                    let error = PlanimetryError::transform_failure(feature.label(), e.to_string());
                    return match self.policy {
                        TransformPolicy::Abort => Err(error),
                        TransformPolicy::Skip => {
                            warn!(feature = %feature.label(), error = %e, "Skipping feature");
                            Ok(Processed::Skipped {
                                feature: feature.label(),
                                reason: e.to_string(),
                            })
                        }
                    };
                }
            },
        };

        let (derived, anomalous) = match self.kind {
            GeometryKind::MultiLineString => {
                let length = self.planimeter.multi_line_planimetry(&to_multi_line(&geographic));
                (
                    DerivedValues {
                        length_m: Some(length),
                        area_m2: None,
                    },
                    false,
                )
            }
            GeometryKind::MultiPolygon => {
                let result = self
                    .planimeter
                    .multi_polygon_planimetry(&to_multi_polygon(&geographic));
                if result.is_anomalous() {
                    warn!(feature = %feature.label(), area_m2 = result.area, "Negative net area");
                }
                (
                    DerivedValues {
                        length_m: Some(result.perimeter),
                        area_m2: Some(result.area),
                    },
                    result.is_anomalous(),
                )
            }
            GeometryKind::Point => (DerivedValues::default(), false),
        };

        Ok(Processed::Enriched(self.enrich(feature, derived, anomalous)))
    }

    fn enrich(&self, feature: Feature, derived: DerivedValues, anomalous: bool) -> EnrichedFeature {
        EnrichedFeature {
            index: feature.index,
            id: feature.id,
            properties: feature.properties,
            geometry: feature.geometry,
            derived,
            anomalous,
        }
    }
}

/// Promotion vers MultiLineString (le type a été vérifié)
fn to_multi_line(geometry: &Geometry) -> MultiLineString {
    match geometry {
        Geometry::MultiLineString(mls) => mls.clone(),
        Geometry::LineString(ls) => MultiLineString::new(vec![ls.clone()]),
        Geometry::Line(line) => MultiLineString::new(vec![(*line).into()]),
        _ => MultiLineString::new(vec![]),
    }
}

/// Promotion vers MultiPolygon (le type a été vérifié)
fn to_multi_polygon(geometry: &Geometry) -> MultiPolygon {
    match geometry {
        Geometry::MultiPolygon(mp) => mp.clone(),
        Geometry::Polygon(p) => MultiPolygon::new(vec![p.clone()]),
        Geometry::Rect(r) => MultiPolygon::new(vec![r.to_polygon()]),
        Geometry::Triangle(t) => MultiPolygon::new(vec![t.to_polygon()]),
        _ => MultiPolygon::new(vec![]),
    }
}
