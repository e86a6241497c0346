//! Écriture par lots à seuil de taille
//!
//! Les features s'accumulent en mémoire jusqu'à ce que leur taille estimée
//! atteigne le seuil; le lot est alors écrit en une transaction par la sortie.
//! Un lot en échec n'est pas réessayé: il est perdu et l'erreur remonte.
//!
//! Aucune écriture n'a lieu à la destruction: `close` doit être appelé
//! explicitement pour écrire le dernier lot partiel et finaliser la sortie.

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace};

use planimetry::EnrichedFeature;

use super::{BatchSink, SinkError};

/// Seuil par défaut d'un lot (50 Mio)
pub const DEFAULT_BATCH_BYTES: usize = 50 * 1024 * 1024;

/// Erreurs du writer
#[derive(Debug, Error)]
pub enum WriterError {
    /// Lot rejeté par la sortie (lot abandonné)
    #[error("Failed to write batch of {batch_len} features: {source}")]
    WriteFailure {
        batch_len: usize,
        #[source]
        source: SinkError,
    },

    /// Finalisation de la sortie impossible
    #[error("Failed to finalize output: {0}")]
    Finish(#[source] SinkError),
}

/// Compteurs des lots validés
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriterStats {
    pub features_written: usize,
    pub batches_committed: usize,
    pub bytes_accrued: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Accumulating,
    Flushing,
}

struct Inner<S> {
    sink: S,
    state: WriterState,
    batch: Vec<EnrichedFeature>,
    accrued: usize,
    stats: WriterStats,
}

impl<S: BatchSink> Inner<S> {
    async fn flush(&mut self) -> Result<(), WriterError> {
        if self.batch.is_empty() {
            return Ok(());
        }

        trace!("Accumulating -> Flushing");
        self.state = WriterState::Flushing;
        let batch = std::mem::take(&mut self.batch);
        let bytes = std::mem::take(&mut self.accrued);

        let result = self.sink.write_batch(&batch).await;

        self.state = WriterState::Accumulating;
        trace!("Flushing -> Accumulating");

        match result {
            Ok(()) => {
                self.stats.features_written += batch.len();
                self.stats.batches_committed += 1;
                self.stats.bytes_accrued += bytes;
                debug!(
                    batch = self.stats.batches_committed,
                    features = batch.len(),
                    bytes,
                    "Batch committed"
                );
                Ok(())
            }
            Err(source) => {
                error!(
                    features = batch.len(),
                    error = %source,
                    "Batch write failed, batch discarded"
                );
                Err(WriterError::WriteFailure {
                    batch_len: batch.len(),
                    source,
                })
            }
        }
    }
}

/// Writer par lots au-dessus d'une sortie transactionnelle
///
/// Tout l'état est derrière un seul verrou: le test du seuil et l'écriture
/// du lot forment une section critique, `flush` ne s'exécute jamais en
/// parallèle d'un `add`.
pub struct BatchedWriter<S: BatchSink> {
    inner: Mutex<Inner<S>>,
    threshold: usize,
}

impl<S: BatchSink> BatchedWriter<S> {
    pub fn new(sink: S, threshold_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sink,
                state: WriterState::Accumulating,
                batch: Vec::new(),
                accrued: 0,
                stats: WriterStats::default(),
            }),
            threshold: threshold_bytes.max(1),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Ajoute une feature; écrit le lot si le seuil est atteint
    pub async fn add(&self, feature: EnrichedFeature) -> Result<(), WriterError> {
        let mut inner = self.inner.lock().await;
        debug_assert_eq!(inner.state, WriterState::Accumulating);

        inner.accrued += feature.size_estimate();
        inner.batch.push(feature);

        if inner.accrued >= self.threshold {
            inner.flush().await?;
        }
        Ok(())
    }

    /// Écrit le lot en cours
    pub async fn flush(&self) -> Result<(), WriterError> {
        self.inner.lock().await.flush().await
    }

    /// Nombre de features en attente
    pub async fn pending(&self) -> usize {
        self.inner.lock().await.batch.len()
    }

    /// Écrit le dernier lot et finalise la sortie
    pub async fn close(self) -> Result<WriterStats, WriterError> {
        let mut inner = self.inner.lock().await;
        inner.flush().await?;
        inner.sink.finish().await.map_err(WriterError::Finish)?;

        let stats = inner.stats;
        drop(inner);

        info!(
            features = stats.features_written,
            batches = stats.batches_committed,
            "Output closed"
        );
        Ok(stats)
    }
}

impl<S: BatchSink> Drop for BatchedWriter<S> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if !inner.batch.is_empty() {
            error!(
                pending = inner.batch.len(),
                "Writer dropped without close, pending features are lost"
            );
        }
    }
}
