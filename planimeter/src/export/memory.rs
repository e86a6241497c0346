//! Sortie en mémoire, pour les tests et benchmarks

use std::sync::{Arc, Mutex};

use planimetry::EnrichedFeature;

use super::{BatchSink, SinkError};

#[derive(Debug, Default)]
struct MemoryState {
    batches: Vec<Vec<EnrichedFeature>>,
    attempts: usize,
    fail_at: Option<usize>,
    finished: bool,
}

/// Conserve les lots validés
///
/// Les clones partagent le même stockage: un clone reste consultable après
/// que le writer a consommé l'original.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sortie qui rejette la tentative d'écriture numéro `attempt` (0-based)
    pub fn failing_at(attempt: usize) -> Self {
        let sink = Self::default();
        sink.lock().fail_at = Some(attempt);
        sink
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // Un test qui panique en tenant le verrou ne doit pas masquer les suivants
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Lots validés, dans l'ordre
    pub fn batches(&self) -> Vec<Vec<EnrichedFeature>> {
        self.lock().batches.clone()
    }

    /// Nombre de features validées
    pub fn records(&self) -> usize {
        self.lock().batches.iter().map(Vec::len).sum()
    }

    /// Index des features validées, dans l'ordre d'écriture
    pub fn indices(&self) -> Vec<u64> {
        self.lock()
            .batches
            .iter()
            .flatten()
            .map(|f| f.index)
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }
}

impl BatchSink for MemorySink {
    async fn write_batch(&mut self, batch: &[EnrichedFeature]) -> Result<(), SinkError> {
        let mut state = self.lock();
        if state.finished {
            return Err(SinkError::Finished);
        }
        let attempt = state.attempts;
        state.attempts += 1;
        if state.fail_at == Some(attempt) {
            return Err(SinkError::Rejected(format!("injected failure on attempt {}", attempt)));
        }
        state.batches.push(batch.to_vec());
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        let mut state = self.lock();
        if state.finished {
            return Err(SinkError::Finished);
        }
        state.finished = true;
        Ok(())
    }
}
