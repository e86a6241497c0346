//! Types d'erreurs pour le crate planimetry

use thiserror::Error;

use crate::crs::CrsType;

/// Erreurs pouvant survenir lors du calcul de planimétrie
#[derive(Debug, Error)]
pub enum PlanimetryError {
    /// Système de référence non classé ou sans calcul géodésique possible
    #[error("Unsupported coordinate reference system '{name}' ({})", describe_category(.category))]
    UnsupportedCrs {
        name: String,
        category: Option<CrsType>,
    },

    /// Aucune transformation vers le système géographique de base
    #[error("Cannot transform '{crs}' to geographic coordinates: {reason}")]
    TransformUnavailable { crs: String, reason: String },

    /// Échec de transformation d'une géométrie
    #[error("Cannot transform geometry of feature {feature}: {reason}")]
    TransformFailure { feature: String, reason: String },

    /// Géométrie incompatible avec le type du jeu de données
    #[error("Geometry mismatch: dataset is {expected}, feature has {found}")]
    GeometryMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Définition WKT invalide
    #[error("Invalid WKT at offset {offset}: {reason}")]
    InvalidWkt { reason: String, offset: usize },

    /// Code EPSG absent du registre embarqué
    #[error("Unknown EPSG code: {0}")]
    UnknownEpsg(u32),

    /// Identifiant de CRS non reconnu
    #[error("Unrecognized CRS identifier: {0}")]
    UnknownIdentifier(String),

    /// Paramètres d'ellipsoïde hors domaine
    #[error("Invalid ellipsoid (a = {semi_major_axis}, f = {flattening})")]
    InvalidEllipsoid {
        semi_major_axis: f64,
        flattening: f64,
    },
}

fn describe_category(category: &Option<CrsType>) -> String {
    match category {
        Some(c) => format!("category {c}"),
        None => "unclassified".to_string(),
    }
}

impl PlanimetryError {
    /// Crée une erreur de WKT invalide avec position
    pub fn invalid_wkt(reason: impl Into<String>, offset: usize) -> Self {
        Self::InvalidWkt {
            reason: reason.into(),
            offset,
        }
    }

    /// Crée une erreur de transformation pour une feature
    pub fn transform_failure(feature: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TransformFailure {
            feature: feature.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlanimetryError>;
