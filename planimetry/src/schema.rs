//! Schéma de sortie: champs source + champs dérivés

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::warn;

use crate::feature::{Feature, GeometryKind};

/// Nom du champ longueur / périmètre
pub const LENGTH_FIELD: &str = "length_m";
/// Nom du champ surface
pub const AREA_FIELD: &str = "area_m2";

/// Champs d'un jeu de données de sortie
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    kind: GeometryKind,
    source_fields: Vec<String>,
    length_field: Option<String>,
    area_field: Option<String>,
}

impl OutputSchema {
    /// Construit le schéma; un champ dérivé en collision avec un champ source
    /// prend le premier nom libre (`length_m_1`, `length_m_2`, ...)
    pub fn new<I, S>(kind: GeometryKind, source_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source_fields: Vec<String> = source_fields.into_iter().map(Into::into).collect();

        let length_field = match kind {
            GeometryKind::Point => None,
            GeometryKind::MultiLineString | GeometryKind::MultiPolygon => {
                Some(free_name(LENGTH_FIELD, &source_fields, &[]))
            }
        };
        let area_field = match kind {
            GeometryKind::MultiPolygon => {
                let taken: Vec<String> = length_field.iter().cloned().collect();
                Some(free_name(AREA_FIELD, &source_fields, &taken))
            }
            _ => None,
        };

        Self {
            kind,
            source_fields,
            length_field,
            area_field,
        }
    }

    /// Schéma depuis les attributs de toutes les features, dans l'ordre
    /// de première apparition
    pub fn from_features<'a, I>(kind: GeometryKind, features: I) -> Self
    where
        I: IntoIterator<Item = &'a Feature>,
    {
        let mut fields = FieldCollector::default();
        for feature in features {
            fields.add(&feature.properties);
        }
        Self::new(kind, fields.into_fields())
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    pub fn source_fields(&self) -> &[String] {
        &self.source_fields
    }

    pub fn has_source_field(&self, name: &str) -> bool {
        self.source_fields.iter().any(|f| f == name)
    }

    pub fn length_field(&self) -> Option<&str> {
        self.length_field.as_deref()
    }

    pub fn area_field(&self) -> Option<&str> {
        self.area_field.as_deref()
    }

    /// Champs dérivés, dans l'ordre d'écriture
    pub fn derived_fields(&self) -> impl Iterator<Item = &str> {
        self.length_field().into_iter().chain(self.area_field())
    }

    /// Tous les champs: source puis dérivés
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.source_fields
            .iter()
            .map(String::as_str)
            .chain(self.derived_fields())
    }
}

/// Noms d'attributs dans l'ordre de première apparition
#[derive(Debug, Default)]
pub struct FieldCollector {
    fields: Vec<String>,
    seen: HashSet<String>,
}

impl FieldCollector {
    pub fn add(&mut self, properties: &Map<String, Value>) {
        for key in properties.keys() {
            if !self.seen.contains(key) {
                self.seen.insert(key.clone());
                self.fields.push(key.clone());
            }
        }
    }

    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }
}

/// `base`, sinon `base_1`, `base_2`, ... selon le premier nom libre
pub(crate) fn first_free_name(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|i| format!("{}_{}", base, i))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

fn free_name(base: &str, source_fields: &[String], taken: &[String]) -> String {
    let name = first_free_name(base, |name| {
        source_fields.iter().any(|f| f == name) || taken.iter().any(|f| f == name)
    });
    if name != base {
        warn!(field = base, renamed = %name, "Derived field name already used by source attribute");
    }
    name
}
