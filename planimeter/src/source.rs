//! Lecture en flux d'un jeu de données GeoJSON
//!
//! Le système de référence vient, par ordre de priorité:
//! - de l'option `--crs` (identifiant ou chemin vers un `.prj`)
//! - du fichier `.prj` à côté de l'entrée
//! - du membre `crs` de l'en-tête GeoJSON
//! - sinon OGC:CRS84, le défaut GeoJSON

use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use geo::{BoundingRect, Rect};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use planimetry::{CoordinateReferenceSystem, Feature, FieldCollector, GeometryKind};

type FeatureIter = Box<dyn Iterator<Item = geojson::Result<geojson::Feature>>>;

/// Taille lue au début du fichier pour trouver le membre `crs`
const HEADER_PROBE_BYTES: u64 = 64 * 1024;

/// Provenance du système de référence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrsOrigin {
    Explicit,
    Sidecar,
    Header,
    Default,
}

impl fmt::Display for CrsOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Explicit => "explicit",
            Self::Sidecar => ".prj sidecar",
            Self::Header => "GeoJSON crs member",
            Self::Default => "GeoJSON default (CRS84)",
        })
    }
}

/// Emprise des coordonnées source
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    fn from_rect(rect: Rect) -> Self {
        Self {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// Jeu de données source: système de référence, type de géométrie et features
pub struct DatasetSource {
    path: PathBuf,
    crs: CoordinateReferenceSystem,
    crs_origin: CrsOrigin,
    kind: GeometryKind,
    /// Features lues pour déterminer le type, pas encore rendues
    peeked: VecDeque<Feature>,
    features: FeatureIter,
    next_index: u64,
    extent: Option<Extent>,
}

impl fmt::Debug for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetSource")
            .field("path", &self.path)
            .field("crs", &self.crs.name())
            .field("crs_origin", &self.crs_origin)
            .field("kind", &self.kind)
            .field("next_index", &self.next_index)
            .finish()
    }
}

impl DatasetSource {
    /// Ouvre le jeu de données
    ///
    /// Sans type imposé, le type est celui de la première feature ayant une
    /// géométrie (`Point` si aucune n'en a).
    pub fn open(path: &Path, crs: Option<&str>, kind: Option<GeometryKind>) -> Result<Self> {
        let (crs, crs_origin) = resolve_crs(path, crs)?;
        info!(
            path = %path.display(),
            crs = crs.name(),
            origin = %crs_origin,
            "Coordinate reference system"
        );

        let file =
            File::open(path).context(format!("Failed to open input: {}", path.display()))?;
        let reader = geojson::FeatureReader::from_reader(BufReader::new(file));

        let mut source = Self {
            path: path.to_path_buf(),
            crs,
            crs_origin,
            kind: kind.unwrap_or(GeometryKind::Point),
            peeked: VecDeque::new(),
            features: Box::new(reader.features()),
            next_index: 0,
            extent: None,
        };

        if kind.is_none() {
            source.kind = source.detect_kind()?;
            debug!(kind = %source.kind, "Geometry kind detected from first feature");
        }

        Ok(source)
    }

    fn detect_kind(&mut self) -> Result<GeometryKind> {
        while let Some(feature) = self.read_next()? {
            let detected = feature.geometry.as_ref().map(|g| {
                GeometryKind::of(g).with_context(|| {
                    format!(
                        "Cannot infer geometry kind from feature {}, use --kind",
                        feature.label()
                    )
                })
            });
            self.peeked.push_back(feature);
            if let Some(kind) = detected {
                return kind;
            }
        }
        warn!("No feature with geometry, dataset treated as points");
        Ok(GeometryKind::Point)
    }

    fn read_next(&mut self) -> Result<Option<Feature>> {
        let Some(next) = self.features.next() else {
            return Ok(None);
        };
        let index = self.next_index;
        self.next_index += 1;

        let feature = next.with_context(|| {
            format!("Failed to read feature #{} from {}", index, self.path.display())
        })?;
        let feature = convert_feature(index, feature)?;

        if let Some(rect) = feature.geometry.as_ref().and_then(|g| g.bounding_rect()) {
            let extent = Extent::from_rect(rect);
            self.extent = Some(match self.extent {
                Some(current) => current.merge(extent),
                None => extent,
            });
        }
        Ok(Some(feature))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn crs(&self) -> &CoordinateReferenceSystem {
        &self.crs
    }

    pub fn crs_origin(&self) -> CrsOrigin {
        self.crs_origin
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    /// Emprise des features lues jusqu'ici
    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }

    /// Nombre de features lues jusqu'ici
    pub fn features_read(&self) -> u64 {
        self.next_index
    }

    /// Noms d'attributs de toutes les features, dans l'ordre de première
    /// apparition
    ///
    /// Relit le fichier depuis le début, sans toucher au flux en cours.
    pub fn scan_fields(&self) -> Result<Vec<String>> {
        let file = File::open(&self.path)
            .context(format!("Failed to open input: {}", self.path.display()))?;
        let reader = geojson::FeatureReader::from_reader(BufReader::new(file));

        let mut fields = FieldCollector::default();
        let mut scanned = 0u64;
        for feature in reader.features() {
            let feature = feature.with_context(|| {
                format!("Failed to read feature #{} from {}", scanned, self.path.display())
            })?;
            if let Some(properties) = &feature.properties {
                fields.add(properties);
            }
            scanned += 1;
        }

        let fields = fields.into_fields();
        debug!(features = scanned, fields = fields.len(), "Attribute names scanned");
        Ok(fields)
    }
}

impl Iterator for DatasetSource {
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(feature) = self.peeked.pop_front() {
            return Some(Ok(feature));
        }
        self.read_next().transpose()
    }
}

/// Convertit une feature GeoJSON
fn convert_feature(index: u64, feature: geojson::Feature) -> Result<Feature> {
    let id = feature.id.map(|id| match id {
        geojson::feature::Id::String(s) => s,
        geojson::feature::Id::Number(n) => n.to_string(),
    });

    let geometry = feature
        .geometry
        .map(geo::Geometry::<f64>::try_from)
        .transpose()
        .with_context(|| format!("Invalid geometry in feature #{}", index))?;

    Ok(Feature {
        index,
        id,
        properties: feature.properties.unwrap_or_default(),
        geometry,
    })
}

/// Détermine le système de référence de la source
pub fn resolve_crs(
    input: &Path,
    explicit: Option<&str>,
) -> Result<(CoordinateReferenceSystem, CrsOrigin)> {
    if let Some(value) = explicit {
        let as_path = Path::new(value);
        let crs = if as_path.is_file() {
            read_prj(as_path)?
        } else {
            CoordinateReferenceSystem::from_identifier(value)
                .with_context(|| format!("Invalid --crs value: {}", value))?
        };
        return Ok((crs, CrsOrigin::Explicit));
    }

    let sidecar = input.with_extension("prj");
    if sidecar.is_file() {
        return Ok((read_prj(&sidecar)?, CrsOrigin::Sidecar));
    }

    if let Some(name) = header_crs_name(input)? {
        let crs = CoordinateReferenceSystem::from_identifier(&name)
            .with_context(|| format!("Unsupported crs member in {}: {}", input.display(), name))?;
        return Ok((crs, CrsOrigin::Header));
    }

    Ok((CoordinateReferenceSystem::crs84(), CrsOrigin::Default))
}

fn read_prj(path: &Path) -> Result<CoordinateReferenceSystem> {
    let wkt = std::fs::read_to_string(path)
        .context(format!("Failed to read projection file: {}", path.display()))?;
    CoordinateReferenceSystem::from_wkt(wkt.trim())
        .with_context(|| format!("Invalid WKT in {}", path.display()))
}

/// Nom du membre `crs` (forme `{"type":"name"}`) au début du fichier
fn header_crs_name(path: &Path) -> Result<Option<String>> {
    static CRS_MEMBER: OnceLock<Regex> = OnceLock::new();
    let re = CRS_MEMBER.get_or_init(|| {
        Regex::new(r#""crs"\s*:\s*\{\s*"type"\s*:\s*"name"\s*,\s*"properties"\s*:\s*\{\s*"name"\s*:\s*"([^"]+)""#)
            .expect("valid regex")
    });

    let file = File::open(path).context(format!("Failed to open input: {}", path.display()))?;
    let mut head = Vec::new();
    file.take(HEADER_PROBE_BYTES)
        .read_to_end(&mut head)
        .context(format!("Failed to read input: {}", path.display()))?;
    let head = String::from_utf8_lossy(&head);

    // Le membre doit précéder le tableau des features
    let before_features = head.find(r#""features""#).map_or(&head[..], |i| &head[..i]);
    Ok(re
        .captures(before_features)
        .map(|c| c[1].to_string()))
}
