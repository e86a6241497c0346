//! Exécution d'un calcul sur un jeu de données
//!
//! Source → classification → transformation → ellipsoïde → schéma (noms
//! d'attributs lus sur tout le fichier) → sortie → boucle (traitement, ajout
//! au lot) → fermeture du writer.
//! Les erreurs de système de référence surviennent avant la création
//! de la sortie.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};

use planimetry::{
    classify, earth_of, has_ellipsoid, processor_for, transform_for, CoordinateReferenceSystem,
    FeatureProcessor, GeometryKind, OutputSchema, Processed, TransformPolicy,
};

use crate::export::pool::{create_pool, test_connection, DatabaseConfig};
use crate::export::{BatchSink, BatchedWriter, GeoJsonSink, PostgisSink, PostgisTarget};
use crate::report::{EllipsoidReport, RunReport};
use crate::source::{CrsOrigin, DatasetSource, Extent};

/// Destination des features enrichies
#[derive(Debug, Clone)]
pub enum OutputTarget {
    GeoJson(PathBuf),
    Postgis {
        database: DatabaseConfig,
        schema: String,
        table: String,
        drop_table: bool,
    },
}

impl OutputTarget {
    fn describe(&self) -> String {
        match self {
            Self::GeoJson(path) => path.display().to_string(),
            Self::Postgis {
                database,
                schema,
                table,
                ..
            } => format!(
                "postgresql://{}@{}:{}/{} {}.{}",
                database.user, database.host, database.port, database.dbname, schema, table
            ),
        }
    }
}

/// Paramètres d'une exécution
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub output: OutputTarget,
    pub crs: Option<String>,
    pub kind: Option<GeometryKind>,
    pub policy: TransformPolicy,
    pub batch_bytes: usize,
}

/// Calcule les attributs dérivés de toutes les features et les écrit
pub async fn run(options: &RunOptions) -> Result<RunReport> {
    let start = Instant::now();
    let mut report = RunReport::new(&options.input, options.output.describe());

    let mut source = DatasetSource::open(&options.input, options.crs.as_deref(), options.kind)?;
    let processor = prepare(&source, options.policy, &mut report)?;

    // Schéma sur toutes les features: colonnes et collisions de noms
    let schema = OutputSchema::new(source.kind(), source.scan_fields()?);
    report.fields = schema.fields().map(str::to_string).collect();

    match &options.output {
        OutputTarget::GeoJson(path) => {
            let sink = GeoJsonSink::create(path, schema, source.crs())
                .context("Failed to create GeoJSON output")?;
            process_all(&mut source, &processor, sink, options.batch_bytes, &mut report).await?;
        }
        OutputTarget::Postgis {
            database,
            schema: pg_schema,
            table,
            drop_table,
        } => {
            let pool = create_pool(database).await?;
            test_connection(&pool).await?;
            let target = PostgisTarget {
                schema: pg_schema.clone(),
                table: table.clone(),
                srid: source.crs().epsg().unwrap_or(0),
                drop_existing: *drop_table,
            };
            if target.srid == 0 {
                warn!("Source CRS has no EPSG code, geometries stored with SRID 0");
            }
            let sink = PostgisSink::create(pool, target, schema)
                .await
                .context("Failed to prepare PostGIS table")?;
            process_all(&mut source, &processor, sink, options.batch_bytes, &mut report).await?;
        }
    }

    report.features_read = source.features_read();
    report.extent = source.extent();
    if let Some(extent) = &report.extent {
        info!(extent = %extent, "Source extent");
    }
    report.set_duration(start.elapsed());
    report.finalize();

    info!(
        written = report.features_written,
        skipped = report.features_skipped,
        anomalies = report.anomalies.len(),
        duration_secs = report.duration_secs,
        "Run complete"
    );
    Ok(report)
}

/// Classe le système de la source et construit le processeur
fn prepare(
    source: &DatasetSource,
    policy: TransformPolicy,
    report: &mut RunReport,
) -> Result<FeatureProcessor> {
    let crs = source.crs();
    let category = classify(crs);
    info!(
        crs = crs.name(),
        category = ?category,
        kind = %source.kind(),
        "Preparing dataset"
    );

    let processor = processor_for(crs, source.kind(), policy)
        .with_context(|| format!("Cannot compute planimetry in {}", crs.name()))?;

    let ellipsoid = processor.planimeter().ellipsoid();
    report.crs = crs.name().to_string();
    report.crs_origin = source.crs_origin().to_string();
    report.crs_category = category.map(|c| c.to_string());
    report.epsg = crs.epsg();
    report.ellipsoid = EllipsoidReport {
        semi_major_axis: ellipsoid.semi_major_axis(),
        flattening: ellipsoid.flattening(),
    };
    report.transform = processor.transform().map(|t| t.description());
    report.geometry_kind = source.kind().to_string();
    report.transform_policy = processor.policy().to_string();

    Ok(processor)
}

/// Boucle principale: traitement puis ajout au writer
async fn process_all<S: BatchSink>(
    source: &mut DatasetSource,
    processor: &FeatureProcessor,
    sink: S,
    batch_bytes: usize,
    report: &mut RunReport,
) -> Result<()> {
    let writer = BatchedWriter::new(sink, batch_bytes);

    for feature in source.by_ref() {
        let feature = feature?;
        let label = feature.label();
        match processor
            .process(feature)
            .with_context(|| format!("Failed to process feature {}", label))?
        {
            Processed::Enriched(enriched) => {
                report.record_feature(&enriched);
                writer.add(enriched).await?;
            }
            Processed::Skipped { feature, reason } => report.record_skip(feature, reason),
        }
    }

    let stats = writer.close().await?;
    report.record_writer(stats);
    Ok(())
}

/// Description d'un jeu de données sans calcul
#[derive(Debug, Clone)]
pub struct Inspection {
    pub crs: String,
    pub crs_origin: CrsOrigin,
    pub category: Option<String>,
    pub epsg: Option<u32>,
    pub ellipsoid: Option<EllipsoidReport>,
    pub transform: Option<String>,
    pub computable: bool,
    pub kind: GeometryKind,
    pub features: u64,
    pub extent: Option<Extent>,
}

/// Lit tout le jeu de données et décrit son système, son type et son emprise
pub fn inspect(
    input: &std::path::Path,
    crs: Option<&str>,
    kind: Option<GeometryKind>,
) -> Result<Inspection> {
    let mut source = DatasetSource::open(input, crs, kind)?;
    let system: &CoordinateReferenceSystem = source.crs();
    let category = classify(system);
    let computable = category.is_some_and(has_ellipsoid);

    let ellipsoid = earth_of(system).ok().map(|e| EllipsoidReport {
        semi_major_axis: e.semi_major_axis(),
        flattening: e.flattening(),
    });
    let transform = if computable {
        match transform_for(system) {
            Ok(t) => Some(t.map_or_else(|| "none".to_string(), |t| t.description())),
            Err(e) => Some(format!("unavailable: {}", e)),
        }
    } else {
        None
    };

    let mut inspection = Inspection {
        crs: system.name().to_string(),
        crs_origin: source.crs_origin(),
        category: category.map(|c| c.to_string()),
        epsg: system.epsg(),
        ellipsoid,
        transform,
        computable,
        kind: source.kind(),
        features: 0,
        extent: None,
    };

    for feature in source.by_ref() {
        feature?;
    }
    inspection.features = source.features_read();
    inspection.extent = source.extent();
    Ok(inspection)
}
