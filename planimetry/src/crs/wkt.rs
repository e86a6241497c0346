//! Parser WKT (WKT1 OGC/ESRI et WKT2 ISO 19162)
//!
//! Le texte est d'abord découpé en arbre générique `KEYWORD[arg, arg, ...]`,
//! puis converti en [`CoordinateReferenceSystem`].

use std::ops::Range;

use super::{
    CoordinateReferenceSystem, Datum, GeodeticCrs, ProjectedCrs, Projection, ProjectionMethod,
    ProjectionParameters,
};
use crate::ellipsoid::Ellipsoid;
use crate::error::{PlanimetryError, Result};

/// Radians par degré (facteur ANGLEUNIT["degree", ...])
const DEGREE: f64 = 0.0174532925199433;

/// Noeud WKT: mot-clé et arguments
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub keyword: String,
    pub args: Vec<Value>,
    /// Position du noeud dans le texte source
    pub span: Range<usize>,
}

/// Argument d'un noeud WKT
#[derive(Debug, Clone)]
pub(crate) enum Value {
    Node(Node),
    Text(String),
    Number(f64),
    /// Mot nu (ex: `ellipsoidal`, `north`)
    Word(String),
}

impl Node {
    fn is(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.keyword.eq_ignore_ascii_case(k))
    }

    fn children(&self) -> impl Iterator<Item = &Node> {
        self.args.iter().filter_map(|a| match a {
            Value::Node(n) => Some(n),
            _ => None,
        })
    }

    fn child(&self, keywords: &[&str]) -> Option<&Node> {
        self.children().find(|n| n.is(keywords))
    }

    fn name(&self) -> String {
        match self.args.first() {
            Some(Value::Text(s)) => s.clone(),
            _ => String::new(),
        }
    }

    fn number(&self, index: usize) -> Option<f64> {
        let mut numbers = self.args.iter().filter_map(|a| match a {
            Value::Number(n) => Some(*n),
            _ => None,
        });
        numbers.nth(index)
    }

    fn word(&self, index: usize) -> Option<&str> {
        match self.args.get(index) {
            Some(Value::Word(w)) | Some(Value::Text(w)) => Some(w.as_str()),
            _ => None,
        }
    }

    /// Code EPSG depuis AUTHORITY["EPSG","2154"] ou ID["EPSG",2154]
    fn epsg(&self) -> Option<u32> {
        let id = self.children().filter(|n| n.is(&["AUTHORITY", "ID"])).last()?;
        let authority = id.name();
        if !authority.eq_ignore_ascii_case("EPSG") {
            return None;
        }
        match id.args.get(1)? {
            Value::Number(n) if *n >= 0.0 => Some(*n as u32),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Facteur de conversion d'unité porté par un noeud enfant
    fn unit_factor(&self, keywords: &[&str]) -> Option<f64> {
        self.child(keywords).and_then(|u| u.number(0))
    }
}

/// Profondeur maximale d'imbrication des noeuds
const MAX_DEPTH: usize = 32;

/// Analyseur syntaxique récursif descendant
struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            depth: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> PlanimetryError {
        PlanimetryError::invalid_wkt(reason, self.pos)
    }

    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn identifier(&mut self) -> &'a str {
        let start = self.pos;
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_alphanumeric() || self.bytes[self.pos] == b'_')
        {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn node(&mut self) -> Result<Node> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {} levels", MAX_DEPTH)));
        }
        self.depth += 1;
        let node = self.node_contents();
        self.depth -= 1;
        node
    }

    fn node_contents(&mut self) -> Result<Node> {
        self.skip_ws();
        let start = self.pos;
        let keyword = self.identifier();
        if keyword.is_empty() {
            return Err(self.error("expected keyword"));
        }
        self.skip_ws();
        let close = match self.peek() {
            Some(b'[') => b']',
            Some(b'(') => b')',
            _ => return Err(self.error(format!("expected '[' after {}", keyword))),
        };
        self.pos += 1;

        let mut args = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(c) if c == close => {
                    self.pos += 1;
                    break;
                }
                Some(b',') if !args.is_empty() => {
                    self.pos += 1;
                    continue;
                }
                Some(_) => args.push(self.value()?),
                None => return Err(self.error(format!("unterminated {}", keyword))),
            }
        }

        Ok(Node {
            keyword: keyword.to_string(),
            args,
            span: start..self.pos,
        })
    }

    fn value(&mut self) -> Result<Value> {
        match self.peek() {
            Some(b'"') => self.text().map(Value::Text),
            Some(c) if c == b'-' || c == b'+' || c == b'.' || c.is_ascii_digit() => {
                self.number().map(Value::Number)
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let mark = self.pos;
                let word = self.identifier();
                self.skip_ws();
                if matches!(self.peek(), Some(b'[') | Some(b'(')) {
                    self.pos = mark;
                    self.node().map(Value::Node)
                } else {
                    Ok(Value::Word(word.to_string()))
                }
            }
            _ => Err(self.error("unexpected character")),
        }
    }

    fn text(&mut self) -> Result<String> {
        // Guillemet doublé = guillemet littéral
        self.pos += 1;
        let mut out = String::new();
        loop {
            let rest = &self.input[self.pos..];
            let Some(quote) = rest.find('"') else {
                return Err(self.error("unterminated string"));
            };
            out.push_str(&rest[..quote]);
            self.pos += quote + 1;
            if self.peek() == Some(b'"') {
                out.push('"');
                self.pos += 1;
            } else {
                return Ok(out);
            }
        }
    }

    fn number(&mut self) -> Result<f64> {
        let start = self.pos;
        while self.pos < self.bytes.len()
            && matches!(self.bytes[self.pos], b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E')
        {
            self.pos += 1;
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| PlanimetryError::invalid_wkt("invalid number", start))
    }
}

/// Découpe un texte WKT en arbre
pub(crate) fn parse_tree(input: &str) -> Result<Node> {
    let mut parser = Parser::new(input);
    let node = parser.node()?;
    parser.skip_ws();
    if parser.pos != input.len() {
        return Err(parser.error("trailing characters"));
    }
    Ok(node)
}

/// Convertit un texte WKT en système de référence
pub fn parse(input: &str) -> Result<CoordinateReferenceSystem> {
    let input = input.trim_start_matches('\u{feff}').trim();
    let root = parse_tree(input)?;
    to_crs(&root, input)
}

const GEOGRAPHIC: &[&str] = &["GEOGCS", "GEOGCRS", "GEOGRAPHICCRS", "BASEGEOGCRS"];
const GEODETIC: &[&str] = &["GEODCRS", "GEODETICCRS", "BASEGEODCRS"];
const PROJECTED: &[&str] = &["PROJCS", "PROJCRS", "PROJECTEDCRS", "BASEPROJCRS"];

fn to_crs(node: &Node, source: &str) -> Result<CoordinateReferenceSystem> {
    let name = node.name();
    let crs = if node.is(&["COMPD_CS", "COMPOUNDCRS"]) {
        let components = node
            .children()
            .filter(|c| is_crs_keyword(c))
            .map(|c| to_crs(c, source))
            .collect::<Result<Vec<_>>>()?;
        CoordinateReferenceSystem::Compound { name, components }
    } else if node.is(&["BOUNDCRS"]) {
        // BOUNDCRS[SOURCECRS[...], TARGETCRS[...], ABRIDGEDTRANSFORMATION[...]]
        let inner = node
            .child(&["SOURCECRS"])
            .and_then(|s| s.children().find(|c| is_crs_keyword(c)))
            .ok_or_else(|| PlanimetryError::invalid_wkt("BOUNDCRS without SOURCECRS", node.span.start))?;
        return to_crs(inner, source);
    } else if node.is(&["FITTED_CS", "DERIVEDPROJCRS"]) {
        let base = node
            .children()
            .find(|c| is_crs_keyword(c) || c.is(&["BASEPROJCRS"]))
            .map(|c| to_crs(c, source))
            .transpose()?
            .map(Box::new);
        CoordinateReferenceSystem::GeneralDerived { name, base }
    } else if node.is(PROJECTED) {
        CoordinateReferenceSystem::Projected(projected(node, source)?)
    } else if (node.is(GEOGRAPHIC) || node.is(GEODETIC))
        && node.child(&["DERIVINGCONVERSION"]).is_some()
    {
        CoordinateReferenceSystem::Derived {
            name,
            base: Box::new(base_of_derived(node, source)?),
        }
    } else if node.is(GEOGRAPHIC) || node.is(GEODETIC) {
        let geodetic = geodetic(node, source)?;
        if node.is(GEODETIC) && coordinate_system(node) == Some("cartesian") {
            CoordinateReferenceSystem::Geocentric(geodetic)
        } else if node.is(GEODETIC) {
            CoordinateReferenceSystem::Geodetic(geodetic)
        } else {
            CoordinateReferenceSystem::Geographic(geodetic)
        }
    } else if node.is(&["GEOCCS"]) {
        CoordinateReferenceSystem::Geocentric(geodetic(node, source)?)
    } else if node.is(&["VERT_CS", "VERTCRS", "VERTICALCRS"]) {
        CoordinateReferenceSystem::Vertical { name }
    } else if node.is(&["LOCAL_CS", "ENGCRS", "ENGINEERINGCRS"]) {
        CoordinateReferenceSystem::Engineering { name }
    } else if node.is(&["IMAGECRS"]) {
        CoordinateReferenceSystem::Image { name }
    } else if node.is(&["TIMECRS", "TEMPORALCRS"]) {
        CoordinateReferenceSystem::Temporal { name }
    } else {
        CoordinateReferenceSystem::Unrecognized {
            keyword: node.keyword.clone(),
            name,
        }
    };
    Ok(crs)
}

fn is_crs_keyword(node: &Node) -> bool {
    node.is(GEOGRAPHIC)
        || node.is(GEODETIC)
        || node.is(PROJECTED)
        || node.is(&[
            "COMPD_CS",
            "COMPOUNDCRS",
            "GEOCCS",
            "VERT_CS",
            "VERTCRS",
            "VERTICALCRS",
            "LOCAL_CS",
            "ENGCRS",
            "ENGINEERINGCRS",
            "IMAGECRS",
            "TIMECRS",
            "TEMPORALCRS",
            "FITTED_CS",
            "DERIVEDPROJCRS",
            "BOUNDCRS",
        ])
}

/// Type de CS WKT2 (`CS[ellipsoidal,2]`, `CS[Cartesian,3]`) en minuscules
fn coordinate_system(node: &Node) -> Option<&'static str> {
    let cs = node.child(&["CS"])?;
    let kind = cs.word(0)?;
    if kind.eq_ignore_ascii_case("cartesian") {
        Some("cartesian")
    } else if kind.eq_ignore_ascii_case("ellipsoidal") {
        Some("ellipsoidal")
    } else {
        None
    }
}

fn base_of_derived(node: &Node, source: &str) -> Result<CoordinateReferenceSystem> {
    match node.child(&["BASEGEOGCRS", "BASEGEODCRS"]) {
        Some(base) => Ok(CoordinateReferenceSystem::Geographic(geodetic(base, source)?)),
        None => Ok(CoordinateReferenceSystem::Geographic(geodetic(node, source)?)),
    }
}

fn geodetic(node: &Node, source: &str) -> Result<GeodeticCrs> {
    let datum_node = node
        .child(&["DATUM", "GEODETICDATUM", "TRF", "ENSEMBLE"])
        .ok_or_else(|| PlanimetryError::invalid_wkt("missing DATUM", node.span.start))?;
    let spheroid = datum_node
        .child(&["SPHEROID", "ELLIPSOID"])
        .or_else(|| node.child(&["SPHEROID", "ELLIPSOID"]))
        .ok_or_else(|| PlanimetryError::invalid_wkt("missing SPHEROID", datum_node.span.start))?;

    let length_unit = spheroid.unit_factor(&["LENGTHUNIT", "UNIT"]).unwrap_or(1.0);
    let (a, inv_f) = match (spheroid.number(0), spheroid.number(1)) {
        (Some(a), Some(inv_f)) => (a * length_unit, inv_f),
        _ => {
            return Err(PlanimetryError::invalid_wkt(
                "SPHEROID needs semi-major axis and inverse flattening",
                spheroid.span.start,
            ))
        }
    };

    let angular_unit = node
        .unit_factor(&["UNIT", "ANGLEUNIT"])
        .or_else(|| {
            node.children()
                .filter(|c| c.is(&["AXIS"]))
                .find_map(|axis| axis.unit_factor(&["ANGLEUNIT", "UNIT"]))
        })
        .unwrap_or(DEGREE);

    Ok(GeodeticCrs {
        name: node.name(),
        datum: Datum {
            name: datum_node.name(),
            ellipsoid_name: spheroid.name(),
            ellipsoid: Ellipsoid::from_inverse_flattening(a, inv_f)?,
        },
        angular_unit,
        epsg: node.epsg(),
        definition: Some(source[node.span.clone()].to_string()),
    })
}

fn projected(node: &Node, source: &str) -> Result<ProjectedCrs> {
    let base_node = node
        .child(&["GEOGCS", "BASEGEOGCRS", "BASEGEODCRS", "GEOGCRS", "GEODCRS"])
        .ok_or_else(|| PlanimetryError::invalid_wkt("projected CRS without base", node.span.start))?;
    let base = geodetic(base_node, source)?;

    // WKT1: PROJECTION + PARAMETER au niveau PROJCS
    // WKT2: CONVERSION[METHOD, PARAMETER...]
    let conversion = node.child(&["CONVERSION"]).unwrap_or(node);
    let method_name = conversion
        .child(&["PROJECTION", "METHOD"])
        .map(|m| m.name())
        .unwrap_or_default();

    let linear_unit = node
        .unit_factor(&["UNIT", "LENGTHUNIT"])
        .or_else(|| {
            node.children()
                .filter(|c| c.is(&["AXIS"]))
                .find_map(|axis| axis.unit_factor(&["LENGTHUNIT", "UNIT"]))
        })
        .unwrap_or(1.0);

    let mut parameters = ProjectionParameters::default();
    for param in conversion.children().filter(|c| c.is(&["PARAMETER"])) {
        let Some(raw) = param.number(0) else { continue };
        let key = normalize(&param.name());
        // WKT1: angles dans l'unité du GEOGCS, longueurs dans l'unité du PROJCS
        let angle = || {
            let factor = param
                .unit_factor(&["ANGLEUNIT", "UNIT"])
                .unwrap_or(base.angular_unit);
            to_degrees(raw, factor)
        };
        let length = || raw * param.unit_factor(&["LENGTHUNIT", "UNIT"]).unwrap_or(linear_unit);
        match key.as_str() {
            "latitudeoforigin" | "latitudeoffalseorigin" | "latitudeofnaturalorigin"
            | "latitudeofcenter" | "latitudeofprojectioncentre" => {
                parameters.latitude_of_origin = angle()
            }
            "centralmeridian" | "longitudeoforigin" | "longitudeoffalseorigin"
            | "longitudeofnaturalorigin" | "longitudeofcenter" | "longitudeofprojectioncentre" => {
                parameters.central_meridian = angle()
            }
            "standardparallel1" | "latitudeof1ststandardparallel" => {
                parameters.standard_parallel_1 = Some(angle())
            }
            "standardparallel2" | "latitudeof2ndstandardparallel" => {
                parameters.standard_parallel_2 = Some(angle())
            }
            "scalefactor" | "scalefactoratnaturalorigin" => parameters.scale_factor = raw,
            "falseeasting" | "eastingatfalseorigin" => parameters.false_easting = length(),
            "falsenorthing" | "northingatfalseorigin" => parameters.false_northing = length(),
            _ => {}
        }
    }

    Ok(ProjectedCrs {
        name: node.name(),
        base,
        projection: Projection {
            method: ProjectionMethod::from_name(&method_name),
            parameters,
        },
        linear_unit,
        epsg: node.epsg(),
        definition: Some(source[node.span.clone()].to_string()),
    })
}

/// Convertit une valeur angulaire en degrés selon le facteur d'unité (radians/unité)
pub(crate) fn to_degrees(value: f64, factor: f64) -> f64 {
    if is_degree(factor) {
        value
    } else {
        (value * factor).to_degrees()
    }
}

/// Vérifie si un facteur d'unité angulaire correspond au degré
pub(crate) fn is_degree(factor: f64) -> bool {
    (factor - DEGREE).abs() < 1e-12
}

/// Normalise un nom WKT: minuscules, alphanumériques uniquement
pub(crate) fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::{classify, CrsType};

    const LAMBERT93_WKT1: &str = r#"PROJCS["RGF93 / Lambert-93",GEOGCS["RGF93",DATUM["Reseau_Geodesique_Francais_1993",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6171"]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4171"]],PROJECTION["Lambert_Conformal_Conic_2SP"],PARAMETER["standard_parallel_1",49],PARAMETER["standard_parallel_2",44],PARAMETER["latitude_of_origin",46.5],PARAMETER["central_meridian",3],PARAMETER["false_easting",700000],PARAMETER["false_northing",6600000],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AUTHORITY["EPSG","2154"]]"#;

    const UTM32N_WKT2: &str = r#"PROJCRS["ETRS89 / UTM zone 32N",
    BASEGEOGCRS["ETRS89",
        DATUM["European Terrestrial Reference System 1989",
            ELLIPSOID["GRS 1980",6378137,298.257222101,LENGTHUNIT["metre",1]]],
        PRIMEM["Greenwich",0,ANGLEUNIT["degree",0.0174532925199433]],
        ID["EPSG",4258]],
    CONVERSION["UTM zone 32N",
        METHOD["Transverse Mercator",ID["EPSG",9807]],
        PARAMETER["Latitude of natural origin",0,ANGLEUNIT["degree",0.0174532925199433]],
        PARAMETER["Longitude of natural origin",9,ANGLEUNIT["degree",0.0174532925199433]],
        PARAMETER["Scale factor at natural origin",0.9996,SCALEUNIT["unity",1]],
        PARAMETER["False easting",500000,LENGTHUNIT["metre",1]],
        PARAMETER["False northing",0,LENGTHUNIT["metre",1]]],
    CS[Cartesian,2],
        AXIS["(E)",east,ORDER[1],LENGTHUNIT["metre",1]],
        AXIS["(N)",north,ORDER[2],LENGTHUNIT["metre",1]],
    ID["EPSG",25832]]"#;

    #[test]
    fn test_parse_tree_nested() {
        let node = parse_tree(r#"A["x",B[1,-2.5e3],word]"#).unwrap();
        assert_eq!(node.keyword, "A");
        assert_eq!(node.args.len(), 3);
        let b = node.child(&["B"]).unwrap();
        assert_eq!(b.number(1), Some(-2500.0));
        assert_eq!(node.word(2), Some("word"));
    }

    #[test]
    fn test_parse_tree_doubled_quotes() {
        let node = parse_tree(r#"X["say ""hi"""]"#).unwrap();
        assert_eq!(node.name(), r#"say "hi""#);
    }

    #[test]
    fn test_parse_tree_errors() {
        assert!(parse_tree("GEOGCS[\"x\"").is_err());
        assert!(parse_tree("[1]").is_err());
        assert!(parse_tree("A[1] trailing").is_err());
    }

    #[test]
    fn test_parse_tree_nesting_limit() {
        let nested = |depth: usize| format!("{}1{}", "A[".repeat(depth), "]".repeat(depth));
        assert!(parse_tree(&nested(MAX_DEPTH)).is_ok());

        let deep = nested(100_000);
        let err = parse_tree(&deep).unwrap_err();
        assert!(matches!(err, PlanimetryError::InvalidWkt { .. }), "{}", err);
        assert!(err.to_string().contains("nesting"));
        assert!(parse(&deep).is_err());
    }

    #[test]
    fn test_wkt1_lambert93() {
        let crs = parse(LAMBERT93_WKT1).unwrap();
        assert_eq!(classify(&crs), Some(CrsType::Projected));
        let CoordinateReferenceSystem::Projected(p) = crs else {
            panic!("Expected projected CRS");
        };
        assert_eq!(p.epsg, Some(2154));
        assert_eq!(p.base.epsg, Some(4171));
        assert_eq!(p.base.datum.ellipsoid, Ellipsoid::GRS80);
        assert_eq!(p.projection.method, ProjectionMethod::LambertConformalConic2SP);
        assert_eq!(p.projection.parameters.standard_parallel_1, Some(49.0));
        assert_eq!(p.projection.parameters.latitude_of_origin, 46.5);
        assert_eq!(p.projection.parameters.false_northing, 6600000.0);
        assert!(p.base.definition.as_deref().unwrap().starts_with("GEOGCS[\"RGF93\""));
    }

    #[test]
    fn test_wkt2_utm() {
        let crs = parse(UTM32N_WKT2).unwrap();
        let CoordinateReferenceSystem::Projected(p) = crs else {
            panic!("Expected projected CRS");
        };
        assert_eq!(p.epsg, Some(25832));
        assert_eq!(p.projection.method, ProjectionMethod::TransverseMercator);
        assert!((p.projection.parameters.central_meridian - 9.0).abs() < 1e-9);
        assert_eq!(p.projection.parameters.scale_factor, 0.9996);
        assert_eq!(p.linear_unit, 1.0);
    }

    #[test]
    fn test_wkt2_geodetic_cartesian_is_geocentric() {
        let wkt = r#"GEODCRS["WGS 84",DATUM["World Geodetic System 1984",ELLIPSOID["WGS 84",6378137,298.257223563]],CS[Cartesian,3],ID["EPSG",4978]]"#;
        assert_eq!(classify(&parse(wkt).unwrap()), Some(CrsType::Geocentric));
    }

    #[test]
    fn test_wkt2_geodetic_ellipsoidal() {
        let wkt = r#"GEODCRS["WGS 84",DATUM["World Geodetic System 1984",ELLIPSOID["WGS 84",6378137,298.257223563]],CS[ellipsoidal,2]]"#;
        assert_eq!(classify(&parse(wkt).unwrap()), Some(CrsType::Geodetic));
    }

    #[test]
    fn test_wkt2_ensemble_datum() {
        let wkt = r#"GEOGCRS["WGS 84",ENSEMBLE["World Geodetic System 1984 ensemble",MEMBER["World Geodetic System 1984 (G730)"],ELLIPSOID["WGS 84",6378137,298.257223563,LENGTHUNIT["metre",1]],ENSEMBLEACCURACY[2.0]],CS[ellipsoidal,2],ID["EPSG",4326]]"#;
        let crs = parse(wkt).unwrap();
        let CoordinateReferenceSystem::Geographic(g) = crs else {
            panic!("Expected geographic CRS");
        };
        assert_eq!(g.datum.ellipsoid, Ellipsoid::WGS84);
        assert_eq!(g.epsg, Some(4326));
    }

    #[test]
    fn test_compound_and_vertical() {
        let wkt = r#"COMPD_CS["RGF93 + NGF",GEOGCS["RGF93",DATUM["RGF93",SPHEROID["GRS 1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]],VERT_CS["NGF-IGN69",VERT_DATUM["NGF",2005],UNIT["metre",1]]]"#;
        let crs = parse(wkt).unwrap();
        assert_eq!(classify(&crs), Some(CrsType::Compound));
        let CoordinateReferenceSystem::Compound { components, .. } = crs else {
            panic!("Expected compound CRS");
        };
        assert_eq!(components.len(), 2);
        assert_eq!(classify(&components[1]), Some(CrsType::Vertical));
    }

    #[test]
    fn test_local_cs_is_engineering() {
        let crs = parse(r#"LOCAL_CS["Site grid",LOCAL_DATUM["site",0],UNIT["metre",1]]"#).unwrap();
        assert_eq!(classify(&crs), Some(CrsType::Engineering));
    }

    #[test]
    fn test_unknown_keyword_is_unclassified() {
        let crs = parse(r#"PARAMETRICCRS["WMO standard atmosphere"]"#).unwrap();
        assert_eq!(classify(&crs), None);
    }

    #[test]
    fn test_us_survey_foot_unit() {
        let wkt = r#"PROJCS["NAD83 / Colorado Central (ftUS)",GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic_2SP"],PARAMETER["standard_parallel_1",39.75],PARAMETER["standard_parallel_2",38.45],PARAMETER["latitude_of_origin",37.8333333333333],PARAMETER["central_meridian",-105.5],PARAMETER["false_easting",3000000],PARAMETER["false_northing",1000000],UNIT["US survey foot",0.304800609601219]]"#;
        let CoordinateReferenceSystem::Projected(p) = parse(wkt).unwrap() else {
            panic!("Expected projected CRS");
        };
        assert!((p.linear_unit - 0.304800609601219).abs() < 1e-15);
        // false easting converti en mètres
        assert!((p.projection.parameters.false_easting - 914401.8288).abs() < 1e-3);
    }
}
