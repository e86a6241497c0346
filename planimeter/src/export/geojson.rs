//! Sortie GeoJSON en flux (FeatureCollection écrite lot par lot)
//!
//! Chaque lot est sérialisé en mémoire, ajouté au fichier puis synchronisé
//! sur disque. En cas d'échec, le fichier est tronqué à sa longueur d'avant
//! le lot.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use tracing::{debug, warn};

use planimetry::{CoordinateReferenceSystem, EnrichedFeature, OutputSchema};

use super::{BatchSink, SinkError};

/// FeatureCollection GeoJSON écrite de façon transactionnelle
#[derive(Debug)]
pub struct GeoJsonSink {
    path: PathBuf,
    file: File,
    schema: OutputSchema,
    /// Longueur validée du fichier
    committed_len: u64,
    features: u64,
    finished: bool,
}

impl GeoJsonSink {
    /// Crée le fichier et écrit l'en-tête
    ///
    /// Le membre `crs` est renseigné quand le code EPSG de la source est connu.
    /// Sinon, hors CRS84, la définition WKT est écrite dans un `.prj` à côté
    /// de la sortie.
    pub fn create(
        path: &Path,
        schema: OutputSchema,
        crs: &CoordinateReferenceSystem,
    ) -> Result<Self, SinkError> {
        let epsg = crs.epsg();
        if epsg.is_none() && *crs != CoordinateReferenceSystem::crs84() {
            declare_crs_sidecar(path, crs)?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| SinkError::io(path, e))?;

        let header = header(epsg);
        file.write_all(header.as_bytes())
            .and_then(|_| file.sync_data())
            .map_err(|e| SinkError::io(path, e))?;

        debug!(path = %path.display(), epsg = ?epsg, "GeoJSON output created");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            schema,
            committed_len: header.len() as u64,
            features: 0,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ramène le fichier à sa dernière longueur validée
    fn rollback(&mut self) {
        let result = self
            .file
            .set_len(self.committed_len)
            .and_then(|_| self.file.seek(SeekFrom::Start(self.committed_len)).map(|_| ()));
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "Failed to truncate GeoJSON output");
        }
    }

    fn append(&mut self, buffer: &[u8]) -> std::io::Result<()> {
        self.file.write_all(buffer)?;
        self.file.flush()?;
        self.file.sync_data()
    }
}

impl BatchSink for GeoJsonSink {
    async fn write_batch(&mut self, batch: &[EnrichedFeature]) -> Result<(), SinkError> {
        if self.finished {
            return Err(SinkError::Finished);
        }

        let mut buffer = Vec::with_capacity(batch.iter().map(EnrichedFeature::size_estimate).sum());
        for (i, feature) in batch.iter().enumerate() {
            if self.features + i as u64 > 0 {
                buffer.push(b',');
            }
            write_feature(&mut buffer, feature, &self.schema)?;
        }

        if let Err(e) = self.append(&buffer) {
            self.rollback();
            return Err(SinkError::io(&self.path, e));
        }

        self.committed_len += buffer.len() as u64;
        self.features += batch.len() as u64;
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        if self.finished {
            return Err(SinkError::Finished);
        }
        if let Err(e) = self.append(b"]}") {
            self.rollback();
            return Err(SinkError::io(&self.path, e));
        }
        self.committed_len += 2;
        self.finished = true;
        debug!(path = %self.path.display(), features = self.features, "GeoJSON output finished");
        Ok(())
    }
}

/// `.prj` portant la définition WKT d'un système sans code EPSG
fn declare_crs_sidecar(path: &Path, crs: &CoordinateReferenceSystem) -> Result<(), SinkError> {
    let Some(wkt) = crs.definition() else {
        warn!(
            crs = crs.name(),
            "Source CRS has neither EPSG code nor WKT definition, output CRS is undeclared"
        );
        return Ok(());
    };
    let prj = path.with_extension("prj");
    std::fs::write(&prj, wkt).map_err(|e| SinkError::io(&prj, e))?;
    warn!(
        crs = crs.name(),
        prj = %prj.display(),
        "Source CRS has no EPSG code, declared in a .prj sidecar instead of the crs member"
    );
    Ok(())
}

fn header(epsg: Option<u32>) -> String {
    match epsg {
        Some(code) => format!(
            r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:EPSG::{}"}}}},"features":["#,
            code
        ),
        None => r#"{"type":"FeatureCollection","features":["#.to_string(),
    }
}

/// Écrit une feature en GeoJSON
fn write_feature(
    buffer: &mut Vec<u8>,
    feature: &EnrichedFeature,
    schema: &OutputSchema,
) -> Result<(), SinkError> {
    buffer.extend_from_slice(br#"{"type":"Feature","#);
    if let Some(id) = &feature.id {
        buffer.extend_from_slice(format!(r#""id":"{}","#, escape_json(id)).as_bytes());
    }

    buffer.extend_from_slice(br#""geometry":"#);
    match &feature.geometry {
        Some(geometry) => {
            let mut geom_writer = GeoJsonWriter::new(&mut *buffer);
            geometry
                .process_geom(&mut geom_writer)
                .map_err(|e| SinkError::Encoding {
                    feature: feature_label(feature),
                    reason: e.to_string(),
                })?;
        }
        None => buffer.extend_from_slice(b"null"),
    }

    buffer.extend_from_slice(br#","properties":"#);
    serde_json::to_writer(&mut *buffer, &feature.properties(schema)).map_err(|e| {
        SinkError::Encoding {
            feature: feature_label(feature),
            reason: e.to_string(),
        }
    })?;
    buffer.push(b'}');

    Ok(())
}

fn feature_label(feature: &EnrichedFeature) -> String {
    feature
        .id
        .clone()
        .unwrap_or_else(|| format!("#{}", feature.index))
}

/// Échappe une chaîne pour JSON
fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Geometry};
    use planimetry::feature::DerivedValues;
    use planimetry::GeometryKind;
    use serde_json::{json, Map, Value};

    fn schema() -> OutputSchema {
        OutputSchema::new(GeometryKind::MultiPolygon, ["nom"])
    }

    fn feature(index: u64, id: Option<&str>) -> EnrichedFeature {
        let mut properties = Map::new();
        properties.insert("nom".to_string(), json!(format!("parcelle \"{}\"", index)));
        EnrichedFeature {
            index,
            id: id.map(str::to_string),
            properties,
            geometry: Some(Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
            ])),
            derived: DerivedValues {
                length_m: Some(12.5),
                area_m2: Some(3.25),
            },
            anomalous: false,
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("planimeter_{}_{}.geojson", name, std::process::id()))
    }

    fn lambert93() -> CoordinateReferenceSystem {
        CoordinateReferenceSystem::from_epsg(2154).unwrap()
    }

    fn read_json(path: &Path) -> Value {
        let content = std::fs::read_to_string(path).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    fn test_write_feature() {
        let mut buffer = Vec::new();
        write_feature(&mut buffer, &feature(7, Some("AB-12")), &schema()).unwrap();

        let value: Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["id"], "AB-12");
        assert_eq!(value["geometry"]["type"], "Polygon");
        assert_eq!(value["properties"]["nom"], "parcelle \"7\"");
        assert_eq!(value["properties"]["length_m"], 12.5);
        assert_eq!(value["properties"]["area_m2"], 3.25);
    }

    #[test]
    fn test_write_feature_without_geometry_or_id() {
        let mut f = feature(1, None);
        f.geometry = None;
        let mut buffer = Vec::new();
        write_feature(&mut buffer, &f, &schema()).unwrap();

        let value: Value = serde_json::from_slice(&buffer).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["geometry"], Value::Null);
    }

    #[test]
    fn test_escape_json() {
        assert_eq!(escape_json("hello"), "hello");
        assert_eq!(escape_json("hello\"world"), "hello\\\"world");
        assert_eq!(escape_json("line\nbreak"), "line\\nbreak");
    }

    #[tokio::test]
    async fn test_batches_form_valid_collection() {
        let path = temp_path("batches");
        let mut sink = GeoJsonSink::create(&path, schema(), &lambert93()).unwrap();

        sink.write_batch(&[feature(0, Some("a")), feature(1, Some("b"))])
            .await
            .unwrap();
        sink.write_batch(&[feature(2, Some("c"))]).await.unwrap();
        sink.finish().await.unwrap();

        let value = read_json(&path);
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::2154");
        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[2]["id"], "c");

        assert!(matches!(sink.finish().await, Err(SinkError::Finished)));
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_empty_collection_without_crs() {
        let path = temp_path("empty");
        let mut sink = GeoJsonSink::create(&path, schema(), &CoordinateReferenceSystem::crs84()).unwrap();
        sink.finish().await.unwrap();

        let value = read_json(&path);
        assert!(value.get("crs").is_none());
        assert_eq!(value["features"].as_array().unwrap().len(), 0);
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_rollback_restores_committed_length() {
        let path = temp_path("rollback");
        let mut sink = GeoJsonSink::create(&path, schema(), &CoordinateReferenceSystem::crs84()).unwrap();
        sink.write_batch(&[feature(0, None)]).await.unwrap();
        let committed = std::fs::metadata(&path).unwrap().len();

        // Écriture partielle simulée
        sink.file.write_all(b",{\"type\":\"Feat").unwrap();
        sink.rollback();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), committed);

        sink.write_batch(&[feature(1, None)]).await.unwrap();
        sink.finish().await.unwrap();
        let value = read_json(&path);
        assert_eq!(value["features"].as_array().unwrap().len(), 2);
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_crs_without_epsg_declared_in_prj() {
        let wkt = r#"PROJCS["Local Lambert",GEOGCS["GRS80 based",DATUM["unknown",SPHEROID["GRS 1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic_2SP"],PARAMETER["standard_parallel_1",49],PARAMETER["standard_parallel_2",44],PARAMETER["latitude_of_origin",46.5],PARAMETER["central_meridian",3],PARAMETER["false_easting",700000],PARAMETER["false_northing",6600000],UNIT["metre",1]]"#;
        let crs = CoordinateReferenceSystem::from_wkt(wkt).unwrap();
        assert_eq!(crs.epsg(), None);

        let path = temp_path("local_crs");
        let mut sink = GeoJsonSink::create(&path, schema(), &crs).unwrap();
        sink.finish().await.unwrap();

        assert!(read_json(&path).get("crs").is_none());
        let prj = path.with_extension("prj");
        let declared = std::fs::read_to_string(&prj).unwrap();
        assert_eq!(CoordinateReferenceSystem::from_wkt(&declared).unwrap(), crs);
        std::fs::remove_file(&path).ok();
        std::fs::remove_file(&prj).ok();
    }

    #[tokio::test]
    async fn test_crs84_needs_no_declaration() {
        let path = temp_path("crs84_default");
        let mut sink = GeoJsonSink::create(&path, schema(), &CoordinateReferenceSystem::crs84()).unwrap();
        sink.finish().await.unwrap();
        assert!(!path.with_extension("prj").exists());
        std::fs::remove_file(&path).ok();
    }
}
