//! # planimeter
//!
//! Ajoute la longueur et la surface géodésiques aux features d'un jeu de
//! données GeoJSON, dans le système de référence de la source.
//!
//! ## Features
//!
//! - Lecture GeoJSON en flux, système de référence depuis `--crs`, `.prj` ou l'en-tête
//! - Calcul sur l'ellipsoïde du système source (crate `planimetry`)
//! - Écriture par lots transactionnels vers GeoJSON ou PostGIS
//! - Rapport d'exécution JSON
//!
//! ## Usage CLI
//!
//! ```bash
//! # Calcul vers un fichier GeoJSON
//! planimeter compute parcelles.geojson parcelles_surface.geojson --crs EPSG:2154
//!
//! # Calcul vers PostGIS
//! planimeter to-postgis parcelles.geojson --table parcelles --schema cadastre
//!
//! # Description du jeu de données
//! planimeter inspect parcelles.geojson
//! ```

pub mod config;
pub mod export;
pub mod report;
pub mod run;
pub mod source;

pub use config::RunConfig;
pub use export::pool::{create_pool, DatabaseConfig};
pub use report::{RunReport, RunStatus};
pub use run::{inspect, run, Inspection, OutputTarget, RunOptions};
