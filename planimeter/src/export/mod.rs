//! Sorties transactionnelles des features enrichies

pub mod geojson;
pub mod memory;
pub mod pool;
pub mod postgres;
pub mod writer;

use std::future::Future;
use std::path::PathBuf;

use planimetry::EnrichedFeature;
use thiserror::Error;

pub use geojson::GeoJsonSink;
pub use memory::MemorySink;
pub use postgres::{PostgisSink, PostgisTarget};
pub use writer::{BatchedWriter, WriterError, WriterStats};

/// Erreurs des sorties
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot encode geometry of feature {feature}: {reason}")]
    Encoding { feature: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Output already finished")]
    Finished,

    #[error("Batch rejected: {0}")]
    Rejected(String),
}

impl SinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Destination transactionnelle des lots
///
/// `write_batch` ajoute tout le lot ou rien: en cas d'erreur, la sortie
/// est ramenée à son état avant le lot.
pub trait BatchSink {
    /// Écrit et valide un lot
    fn write_batch(
        &mut self,
        batch: &[EnrichedFeature],
    ) -> impl Future<Output = Result<(), SinkError>>;

    /// Finalise la sortie après le dernier lot
    fn finish(&mut self) -> impl Future<Output = Result<(), SinkError>>;
}
