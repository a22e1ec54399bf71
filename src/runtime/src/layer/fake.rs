//! Scriptable in-memory layer store that records every call.

use parking_lot::Mutex;
use rootprep_core::error::{ProvisionError, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{LayerState, LayerStore};

/// A recorded layer store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreCall {
    Extract {
        archive: PathBuf,
        layer_id: String,
        parents: Vec<String>,
    },
    State(String),
    Delete(String),
}

/// Layer store double.
///
/// Unless scripted otherwise, `state` reports `Valid` for layers this store
/// has extracted and `Absent` for everything else.
#[derive(Default)]
pub(crate) struct FakeLayerStore {
    calls: Mutex<Vec<StoreCall>>,
    extracted: Mutex<HashSet<String>>,
    state_calls: Mutex<usize>,
    extract_calls: Mutex<usize>,
    state_returns: Mutex<HashMap<usize, LayerState>>,
    state_errors: Mutex<HashMap<usize, ProvisionError>>,
    extract_errors: Mutex<HashMap<usize, ProvisionError>>,
    cancel_on_extract: Mutex<Option<(usize, Arc<AtomicBool>)>>,
}

impl FakeLayerStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make the `n`th `state` call (0-based) report `state`.
    pub(crate) fn state_returns_on_call(&self, n: usize, state: LayerState) {
        self.state_returns.lock().insert(n, state);
    }

    /// Make the `n`th `state` call (0-based) fail with `err`.
    pub(crate) fn state_fails_on_call(&self, n: usize, err: ProvisionError) {
        self.state_errors.lock().insert(n, err);
    }

    /// Make the `n`th `extract` call (0-based) fail with `err`.
    pub(crate) fn extract_fails_on_call(&self, n: usize, err: ProvisionError) {
        self.extract_errors.lock().insert(n, err);
    }

    /// Set `flag` while serving the `n`th `extract` call (0-based).
    pub(crate) fn cancel_on_extract(&self, n: usize, flag: Arc<AtomicBool>) {
        *self.cancel_on_extract.lock() = Some((n, flag));
    }

    /// Forget recorded calls, keeping extracted layers.
    pub(crate) fn reset_calls(&self) {
        self.calls.lock().clear();
        *self.state_calls.lock() = 0;
        *self.extract_calls.lock() = 0;
    }

    pub(crate) fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Recorded extract calls as `(archive, layer_id, parents)`.
    pub(crate) fn extract_args(&self) -> Vec<(PathBuf, String, Vec<String>)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                StoreCall::Extract {
                    archive,
                    layer_id,
                    parents,
                } => Some((archive.clone(), layer_id.clone(), parents.clone())),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn delete_args(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                StoreCall::Delete(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn extract_count(&self) -> usize {
        self.extract_args().len()
    }

    pub(crate) fn delete_count(&self) -> usize {
        self.delete_args().len()
    }
}

impl LayerStore for FakeLayerStore {
    fn extract(&self, archive: &Path, layer_id: &str, parents: &[String]) -> Result<()> {
        self.calls.lock().push(StoreCall::Extract {
            archive: archive.to_path_buf(),
            layer_id: layer_id.to_string(),
            parents: parents.to_vec(),
        });

        let n = {
            let mut count = self.extract_calls.lock();
            let n = *count;
            *count += 1;
            n
        };
        if let Some((_, flag)) = self
            .cancel_on_extract
            .lock()
            .as_ref()
            .filter(|(at, _)| *at == n)
        {
            flag.store(true, Ordering::SeqCst);
        }
        if let Some(err) = self.extract_errors.lock().remove(&n) {
            return Err(err);
        }

        self.extracted.lock().insert(layer_id.to_string());
        Ok(())
    }

    fn state(&self, layer_id: &str) -> Result<LayerState> {
        self.calls.lock().push(StoreCall::State(layer_id.to_string()));

        let n = {
            let mut count = self.state_calls.lock();
            let n = *count;
            *count += 1;
            n
        };
        if let Some(err) = self.state_errors.lock().remove(&n) {
            return Err(err);
        }
        if let Some(state) = self.state_returns.lock().get(&n) {
            return Ok(*state);
        }

        if self.extracted.lock().contains(layer_id) {
            Ok(LayerState::Valid)
        } else {
            Ok(LayerState::Absent)
        }
    }

    fn delete(&self, layer_id: &str) -> Result<()> {
        self.calls.lock().push(StoreCall::Delete(layer_id.to_string()));
        self.extracted.lock().remove(layer_id);
        Ok(())
    }
}
