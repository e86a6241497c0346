//! Définition et implémentation des commandes CLI
//!
//! - `compute`: GeoJSON → GeoJSON enrichi
//! - `to-postgis`: GeoJSON → table PostGIS enrichie
//! - `inspect`: description du jeu de données, sans écriture

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;

use planimetry::{GeometryKind, TransformPolicy};
use planimeter::export::pool::{DatabaseConfig, DatabaseOverrides};
use planimeter::{inspect, run, OutputTarget, RunConfig, RunOptions, RunReport};

#[derive(Subcommand)]
pub enum Commands {
    /// Compute geodesic length and area, write an enriched GeoJSON file
    Compute {
        /// Input GeoJSON FeatureCollection
        input: PathBuf,

        /// Output GeoJSON file
        output: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Compute geodesic length and area, write into a PostGIS table
    ToPostgis {
        /// Input GeoJSON FeatureCollection
        input: PathBuf,

        /// Target table
        #[arg(long)]
        table: String,

        /// Target PostgreSQL schema
        #[arg(long, default_value = "public")]
        schema: String,

        /// Drop the target table before writing
        #[arg(long)]
        drop_table: bool,

        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Describe the dataset: reference system, ellipsoid, geometry kind, extent
    Inspect {
        /// Input GeoJSON FeatureCollection
        input: PathBuf,

        /// Source CRS (EPSG:n, URN, WKT or path to a .prj file)
        #[arg(long)]
        crs: Option<String>,

        /// Dataset geometry kind (point, linestring, polygon)
        #[arg(long)]
        kind: Option<GeometryKind>,
    },
}

/// Options communes aux commandes de calcul
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Source CRS (EPSG:n, URN, WKT or path to a .prj file)
    #[arg(long)]
    pub crs: Option<String>,

    /// Dataset geometry kind (point, linestring, polygon)
    #[arg(long)]
    pub kind: Option<GeometryKind>,

    /// Batch size threshold in bytes (défaut : env PLANIMETER_BATCH_BYTES / 50 MiB)
    #[arg(long)]
    pub batch_bytes: Option<usize>,

    /// Behaviour when a feature cannot be transformed: abort, skip
    #[arg(long)]
    pub on_transform_error: Option<TransformPolicy>,

    /// JSON config file with run defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the run report to this JSON file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Options de connexion PostgreSQL
#[derive(Args, Debug, Clone, Default)]
pub struct DbArgs {
    /// PostgreSQL host (défaut : env PGHOST / localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// PostgreSQL database name (défaut : env PGDATABASE / postgres)
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env PGUSER / postgres)
    #[arg(long)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env PGPASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// PostgreSQL port (défaut : env PGPORT / 5432)
    #[arg(long)]
    pub port: Option<u16>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long)]
    pub ssl: Option<String>,
}

impl From<DbArgs> for DatabaseOverrides {
    fn from(args: DbArgs) -> Self {
        Self {
            host: args.host,
            database: args.database,
            user: args.user,
            password: args.password,
            port: args.port,
            ssl: args.ssl,
        }
    }
}

/// Options résolues et chemin du rapport
fn resolve_options(
    input: &Path,
    output: OutputTarget,
    args: RunArgs,
) -> Result<(RunOptions, Option<PathBuf>)> {
    let config = RunConfig::load_optional(args.config.as_deref())?;
    let options = RunOptions {
        input: input.to_path_buf(),
        output,
        crs: config.crs(args.crs),
        kind: config.kind(args.kind)?,
        policy: config.policy(args.on_transform_error)?,
        batch_bytes: config.batch_bytes(args.batch_bytes)?,
    };
    Ok((options, config.report(args.report)))
}

async fn execute(options: RunOptions, report_path: Option<PathBuf>) -> Result<RunReport> {
    info!(
        input = %options.input.display(),
        policy = %options.policy,
        batch_bytes = options.batch_bytes,
        "Starting run"
    );

    let report = run(&options).await?;
    report.display();

    if let Some(path) = report_path {
        report.save_to_file(&path)?;
        println!("Report saved to {}", path.display());
    }
    Ok(report)
}

/// Exécute la commande compute
pub async fn cmd_compute(input: &Path, output: &Path, args: RunArgs) -> Result<()> {
    let (options, report_path) =
        resolve_options(input, OutputTarget::GeoJson(output.to_path_buf()), args)?;
    execute(options, report_path).await?;
    Ok(())
}

/// Exécute la commande to-postgis
pub async fn cmd_to_postgis(
    input: &Path,
    table: String,
    schema: String,
    drop_table: bool,
    args: RunArgs,
    db: DbArgs,
) -> Result<()> {
    let mut database = DatabaseConfig::from_env();
    database.apply_overrides(db.into())?;
    println!(
        "Database: {}@{}:{}/{} (SSL: {})",
        database.user, database.host, database.port, database.dbname, database.ssl_mode
    );

    let output = OutputTarget::Postgis {
        database,
        schema,
        table,
        drop_table,
    };
    let (options, report_path) = resolve_options(input, output, args)?;
    execute(options, report_path).await?;
    Ok(())
}

/// Exécute la commande inspect
pub fn cmd_inspect(input: &Path, crs: Option<&str>, kind: Option<GeometryKind>) -> Result<()> {
    let inspection = inspect(input, crs, kind)?;

    println!("=== {} ===", input.display());
    println!(
        "CRS: {} ({})",
        inspection.crs,
        inspection.category.as_deref().unwrap_or("unclassified")
    );
    println!("CRS origin: {}", inspection.crs_origin);
    if let Some(epsg) = inspection.epsg {
        println!("EPSG: {}", epsg);
    }
    match &inspection.ellipsoid {
        Some(e) => println!("Ellipsoid: a = {} m, f = {}", e.semi_major_axis, e.flattening),
        None => println!("Ellipsoid: none"),
    }
    if let Some(transform) = &inspection.transform {
        println!("Transform: {}", transform);
    }
    println!("Planimetry: {}", if inspection.computable { "supported" } else { "unsupported" });
    println!("Geometry kind: {}", inspection.kind);
    println!("Features: {}", inspection.features);
    match &inspection.extent {
        Some(extent) => println!("Extent: {}", extent),
        None => println!("Extent: empty"),
    }
    Ok(())
}
