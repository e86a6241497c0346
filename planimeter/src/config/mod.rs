//! Configuration d'exécution
//!
//! Priorité: ligne de commande, puis variable d'environnement
//! (`PLANIMETER_BATCH_BYTES`), puis fichier JSON, puis valeurs par défaut.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use planimetry::{GeometryKind, TransformPolicy};

use crate::export::writer::DEFAULT_BATCH_BYTES;

/// Variable d'environnement du seuil de lot
pub const BATCH_BYTES_ENV: &str = "PLANIMETER_BATCH_BYTES";

/// Valeurs par défaut d'une exécution, lues depuis un fichier JSON
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Seuil de taille d'un lot (octets)
    pub batch_bytes: Option<usize>,

    /// Politique en cas d'échec de transformation (abort, skip)
    pub on_transform_error: Option<String>,

    /// Système de référence de la source (identifiant ou chemin .prj)
    pub crs: Option<String>,

    /// Type de géométrie du jeu de données
    pub kind: Option<String>,

    /// Chemin du rapport JSON
    pub report: Option<PathBuf>,
}

impl RunConfig {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Charge le fichier s'il est donné, sinon la configuration vide
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        path.map(Self::load).transpose().map(Option::unwrap_or_default)
    }

    /// Seuil de lot effectif
    pub fn batch_bytes(&self, cli: Option<usize>) -> Result<usize> {
        self.batch_bytes_with_env(cli, std::env::var(BATCH_BYTES_ENV).ok())
    }

    fn batch_bytes_with_env(&self, cli: Option<usize>, env: Option<String>) -> Result<usize> {
        let from_env = env
            .map(|v| {
                v.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid {}: '{}'", BATCH_BYTES_ENV, v))
            })
            .transpose()?;

        let bytes = cli
            .or(from_env)
            .or(self.batch_bytes)
            .unwrap_or(DEFAULT_BATCH_BYTES);
        if bytes == 0 {
            anyhow::bail!("Batch threshold must be greater than 0");
        }
        Ok(bytes)
    }

    /// Politique de transformation effective
    pub fn policy(&self, cli: Option<TransformPolicy>) -> Result<TransformPolicy> {
        match (cli, &self.on_transform_error) {
            (Some(policy), _) => Ok(policy),
            (None, Some(value)) => value.parse().map_err(anyhow::Error::msg),
            (None, None) => Ok(TransformPolicy::default()),
        }
    }

    /// Type de géométrie imposé, s'il y en a un
    pub fn kind(&self, cli: Option<GeometryKind>) -> Result<Option<GeometryKind>> {
        match (cli, &self.kind) {
            (Some(kind), _) => Ok(Some(kind)),
            (None, Some(value)) => value.parse().map(Some).map_err(anyhow::Error::msg),
            (None, None) => Ok(None),
        }
    }

    /// Système de référence imposé, s'il y en a un
    pub fn crs(&self, cli: Option<String>) -> Option<String> {
        cli.or_else(|| self.crs.clone())
    }

    /// Chemin du rapport, s'il y en a un
    pub fn report(&self, cli: Option<PathBuf>) -> Option<PathBuf> {
        cli.or_else(|| self.report.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: &str) -> RunConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_default_batch_bytes() {
        let c = RunConfig::default();
        assert_eq!(c.batch_bytes_with_env(None, None).unwrap(), 52_428_800);
    }

    #[test]
    fn test_batch_bytes_priority() {
        let c = config(r#"{"batch_bytes": 1000}"#);
        assert_eq!(c.batch_bytes_with_env(None, None).unwrap(), 1000);
        assert_eq!(c.batch_bytes_with_env(None, Some("2000".into())).unwrap(), 2000);
        assert_eq!(c.batch_bytes_with_env(Some(3000), Some("2000".into())).unwrap(), 3000);
    }

    #[test]
    fn test_invalid_batch_bytes() {
        let c = RunConfig::default();
        assert!(c.batch_bytes_with_env(None, Some("lots".into())).is_err());
        assert!(c.batch_bytes_with_env(Some(0), None).is_err());
    }

    #[test]
    fn test_policy_and_kind() {
        let c = config(r#"{"on_transform_error": "skip", "kind": "polygon"}"#);
        assert_eq!(c.policy(None).unwrap(), TransformPolicy::Skip);
        assert_eq!(c.policy(Some(TransformPolicy::Abort)).unwrap(), TransformPolicy::Abort);
        assert_eq!(c.kind(None).unwrap(), Some(GeometryKind::MultiPolygon));

        let bad = config(r#"{"on_transform_error": "retry"}"#);
        assert!(bad.policy(None).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_json::from_str::<RunConfig>(r#"{"batch_size": 10}"#).is_err());
    }

    #[test]
    fn test_load_optional() {
        assert!(RunConfig::load_optional(None).unwrap().batch_bytes.is_none());

        let path = std::env::temp_dir().join(format!("planimeter_config_{}.json", std::process::id()));
        std::fs::write(&path, r#"{"crs": "EPSG:2154", "report": "report.json"}"#).unwrap();
        let c = RunConfig::load_optional(Some(&path)).unwrap();
        assert_eq!(c.crs(None).as_deref(), Some("EPSG:2154"));
        assert_eq!(c.report(None), Some(PathBuf::from("report.json")));
        std::fs::remove_file(&path).ok();
    }
}
