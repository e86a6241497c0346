//! Rapport d'exécution
//!
//! Résumé d'un calcul: système de référence, compteurs, anomalies,
//! features ignorées et emprise. Affichable sur la console ou
//! sauvegardé en JSON.

use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use planimetry::EnrichedFeature;

use crate::export::WriterStats;
use crate::source::Extent;

/// Statut final d'une exécution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Toutes les features écrites
    #[default]
    Success,
    /// Des features ont été ignorées
    PartialSuccess,
}

/// Feature ignorée (politique `skip`)
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFeature {
    pub feature: String,
    pub reason: String,
}

/// Feature dont la surface nette est négative
#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub feature: String,
    pub area_m2: f64,
}

/// Ellipsoïde utilisé pour le calcul
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EllipsoidReport {
    pub semi_major_axis: f64,
    pub flattening: f64,
}

/// Rapport d'une exécution
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub input: String,
    pub output: String,
    pub crs: String,
    pub crs_origin: String,
    pub crs_category: Option<String>,
    pub epsg: Option<u32>,
    pub ellipsoid: EllipsoidReport,
    pub transform: Option<String>,
    pub geometry_kind: String,
    pub transform_policy: String,
    pub fields: Vec<String>,

    pub status: RunStatus,
    pub features_read: u64,
    pub features_written: usize,
    pub features_skipped: usize,
    pub features_without_geometry: usize,
    pub batches_committed: usize,
    pub bytes_accrued: usize,
    pub total_length_m: f64,
    pub total_area_m2: f64,

    pub anomalies: Vec<Anomaly>,
    pub skipped: Vec<SkippedFeature>,
    pub extent: Option<Extent>,
    pub duration_secs: f64,
}

impl RunReport {
    pub fn new(input: &Path, output: impl Into<String>) -> Self {
        Self {
            input: input.display().to_string(),
            output: output.into(),
            ..Default::default()
        }
    }

    /// Enregistre une feature enrichie avant son écriture
    pub fn record_feature(&mut self, feature: &EnrichedFeature) {
        if feature.geometry.is_none() {
            self.features_without_geometry += 1;
        }
        self.total_length_m += feature.derived.length_m.unwrap_or_default();
        self.total_area_m2 += feature.derived.area_m2.unwrap_or_default();
        if feature.anomalous {
            self.anomalies.push(Anomaly {
                feature: feature
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("#{}", feature.index)),
                area_m2: feature.derived.area_m2.unwrap_or_default(),
            });
        }
    }

    /// Enregistre une feature ignorée
    pub fn record_skip(&mut self, feature: String, reason: String) {
        self.features_skipped += 1;
        self.skipped.push(SkippedFeature { feature, reason });
    }

    /// Reporte les compteurs du writer
    pub fn record_writer(&mut self, stats: WriterStats) {
        self.features_written = stats.features_written;
        self.batches_committed = stats.batches_committed;
        self.bytes_accrued = stats.bytes_accrued;
    }

    /// Définit la durée de l'exécution
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        self.status = if self.features_skipped > 0 {
            RunStatus::PartialSuccess
        } else {
            RunStatus::Success
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("PLANIMETRY REPORT - {}", self.input);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);
        println!("Output: {}", self.output);

        println!("\n--- REFERENCE SYSTEM ---");
        println!(
            "CRS: {} ({}, {})",
            self.crs,
            self.crs_category.as_deref().unwrap_or("unclassified"),
            self.crs_origin
        );
        println!(
            "Ellipsoid: a = {} m, f = {}",
            self.ellipsoid.semi_major_axis, self.ellipsoid.flattening
        );
        if let Some(transform) = &self.transform {
            println!("Transform: {}", transform);
        }
        if let Some(extent) = &self.extent {
            println!("Extent: {}", extent);
        }

        println!("\n--- SUMMARY ---");
        println!(
            "Features: {} read, {} written, {} skipped, {} without geometry",
            self.features_read,
            self.features_written,
            self.features_skipped,
            self.features_without_geometry
        );
        println!("Batches: {}", self.batches_committed);
        println!("Geometry: {}", self.geometry_kind);
        println!(
            "Total length: {:.3} m, total area: {:.3} m²",
            self.total_length_m, self.total_area_m2
        );

        if !self.anomalies.is_empty() {
            println!("\n--- NEGATIVE AREAS ({}) ---", self.anomalies.len());
            for a in self.anomalies.iter().take(10) {
                println!("  {}: {:.3} m²", a.feature, a.area_m2);
            }
            if self.anomalies.len() > 10 {
                println!("  ... and {} more", self.anomalies.len() - 10);
            }
        }

        if !self.skipped.is_empty() {
            println!("\n--- SKIPPED ({}) ---", self.skipped.len());
            for s in self.skipped.iter().take(20) {
                println!("  {}: {}", s.feature, s.reason);
            }
            if self.skipped.len() > 20 {
                println!("  ... and {} more", self.skipped.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .context(format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} written, {} skipped, {} anomalies",
            self.input,
            self.features_written,
            self.features_skipped,
            self.anomalies.len()
        )
    }
}
