//! Sortie PostgreSQL/PostGIS
//!
//! La table cible est créée depuis le schéma de sortie: attributs en `TEXT`,
//! champs dérivés en `DOUBLE PRECISION`, géométrie dans le SRID source.
//! Chaque lot est une transaction `COPY ... FROM STDIN`.

use deadpool_postgres::{Object, Pool, Transaction};
use futures::SinkExt;
use geozero::wkt::WktWriter;
use geozero::GeozeroGeometry;
use serde_json::Value;
use tracing::{debug, info, warn};

use planimetry::{EnrichedFeature, OutputSchema};

use super::{BatchSink, SinkError};

/// Table cible
#[derive(Debug, Clone)]
pub struct PostgisTarget {
    pub schema: String,
    pub table: String,
    pub srid: u32,
    pub drop_existing: bool,
}

impl PostgisTarget {
    fn qualified_name(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

/// Sortie PostGIS transactionnelle
pub struct PostgisSink {
    pool: Pool,
    target: PostgisTarget,
    schema: OutputSchema,
    copy_sql: String,
}

impl std::fmt::Debug for PostgisSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgisSink")
            .field("target", &self.target)
            .field("copy_sql", &self.copy_sql)
            .finish()
    }
}

impl PostgisSink {
    /// Prépare le schéma et la table cible
    pub async fn create(
        pool: Pool,
        target: PostgisTarget,
        schema: OutputSchema,
    ) -> Result<Self, SinkError> {
        let client = pool.get().await?;

        client
            .execute(
                &format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&target.schema)),
                &[],
            )
            .await?;

        ensure_postgis(&client).await?;

        if target.drop_existing {
            client
                .execute(
                    &format!("DROP TABLE IF EXISTS {} CASCADE", target.qualified_name()),
                    &[],
                )
                .await?;
        }

        let sql = create_table_sql(&target, &schema);
        debug!(sql = %sql, "Creating output table");
        client.execute(&sql, &[]).await?;

        info!(
            table = %target.qualified_name(),
            srid = target.srid,
            "PostGIS output table ready"
        );

        let copy_sql = copy_sql(&target, &schema);
        Ok(Self {
            pool,
            target,
            schema,
            copy_sql,
        })
    }

    async fn copy_batch(
        &self,
        tx: &Transaction<'_>,
        batch: &[EnrichedFeature],
    ) -> Result<u64, SinkError> {
        let copy_in = tx.copy_in(&self.copy_sql).await?;
        let mut pinned = std::pin::pin!(copy_in);

        for feature in batch {
            let row = csv_row(feature, &self.schema, self.target.srid)?;
            pinned.as_mut().send(bytes::Bytes::from(row)).await?;
        }

        Ok(pinned.as_mut().finish().await?)
    }
}

impl BatchSink for PostgisSink {
    async fn write_batch(&mut self, batch: &[EnrichedFeature]) -> Result<(), SinkError> {
        let mut client: Object = self.pool.get().await?;
        let tx = client.transaction().await?;

        match self.copy_batch(&tx, batch).await {
            Ok(rows) => {
                tx.commit().await?;
                debug!(rows, table = %self.target.table, "Batch copied");
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        let client = self.pool.get().await?;
        client
            .execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} USING GIST (geometry)",
                    quote_ident(&format!("{}_geometry_idx", self.target.table)),
                    self.target.qualified_name()
                ),
                &[],
            )
            .await?;
        client
            .execute(&format!("ANALYZE {}", self.target.qualified_name()), &[])
            .await?;
        Ok(())
    }
}

/// Active PostGIS si besoin; dégrade gracieusement si l'extension existe
/// déjà sans droit de la (re)créer
async fn ensure_postgis(client: &Object) -> Result<(), SinkError> {
    if let Err(e) = client
        .execute("CREATE EXTENSION IF NOT EXISTS postgis", &[])
        .await
    {
        warn!("CREATE EXTENSION postgis failed (will check if already installed): {e}");
        let exists = client
            .query_opt("SELECT 1 FROM pg_extension WHERE extname = 'postgis'", &[])
            .await?
            .is_some();
        if !exists {
            return Err(SinkError::Database(e));
        }
    }
    Ok(())
}

fn create_table_sql(target: &PostgisTarget, schema: &OutputSchema) -> String {
    let mut columns = vec!["fid BIGINT NOT NULL".to_string(), "id TEXT".to_string()];
    columns.extend(
        schema
            .source_fields()
            .iter()
            .map(|name| format!("{} TEXT", quote_ident(name))),
    );
    columns.extend(
        schema
            .derived_fields()
            .map(|name| format!("{} DOUBLE PRECISION", quote_ident(name))),
    );
    columns.push(format!("geometry geometry(Geometry, {})", target.srid));

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        target.qualified_name(),
        columns.join(", ")
    )
}

fn copy_sql(target: &PostgisTarget, schema: &OutputSchema) -> String {
    let mut columns = vec!["fid".to_string(), "id".to_string()];
    columns.extend(schema.fields().map(quote_ident));
    columns.push("geometry".to_string());

    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv, DELIMITER '|', NULL '\\N')",
        target.qualified_name(),
        columns.join(", ")
    )
}

/// Ligne CSV: fid|id|attributs...|dérivés...|EWKT
///
/// Un attribut hors schéma est une erreur: aucune valeur n'est perdue en silence.
fn csv_row(
    feature: &EnrichedFeature,
    schema: &OutputSchema,
    srid: u32,
) -> Result<String, SinkError> {
    if let Some(extra) = feature
        .properties
        .keys()
        .find(|key| !schema.has_source_field(key))
    {
        return Err(SinkError::Encoding {
            feature: feature.index.to_string(),
            reason: format!("attribute '{}' is not a column of the output table", extra),
        });
    }

    let mut fields: Vec<String> = Vec::with_capacity(schema.source_fields().len() + 5);
    fields.push(feature.index.to_string());
    fields.push(feature.id.as_deref().map_or_else(null, escape_csv));

    for name in schema.source_fields() {
        fields.push(match feature.properties.get(name) {
            None | Some(Value::Null) => null(),
            Some(Value::String(s)) => escape_csv(s),
            Some(other) => escape_csv(&other.to_string()),
        });
    }

    let derived = [
        (schema.length_field(), feature.derived.length_m),
        (schema.area_field(), feature.derived.area_m2),
    ];
    for (_, value) in derived.iter().filter(|(name, _)| name.is_some()) {
        fields.push(value.filter(|v| v.is_finite()).map_or_else(null, |v| v.to_string()));
    }

    fields.push(match &feature.geometry {
        None => null(),
        Some(geometry) => {
            let mut wkt_buf = Vec::new();
            {
                let mut writer = WktWriter::new(&mut wkt_buf);
                geometry
                    .process_geom(&mut writer)
                    .map_err(|e| SinkError::Encoding {
                        feature: feature.index.to_string(),
                        reason: e.to_string(),
                    })?;
            }
            // Format EWKT: SRID=epsg;WKT
            escape_csv(&format!("SRID={};{}", srid, String::from_utf8_lossy(&wkt_buf)))
        }
    });

    let mut row = fields.join("|");
    row.push('\n');
    Ok(row)
}

fn null() -> String {
    "\\N".to_string()
}

/// Valeur CSV entre guillemets (guillemets doublés)
fn escape_csv(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Identifiant SQL entre guillemets
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
