//! Persisted [`PatternField`] snapshots.
//!
//! Two on-disk shapes are accepted, both JSON:
//!
//! - **with metadata**: `{ "state_dict": {...}, "cppn_config": { "input_dim", "hidden_dim",
//!   "num_layers" }, "prompt"?, "best_similarity"? }`
//! - **bare**: the parameter map alone (legacy). The architecture must then come from the caller.
//!
//! Parsing resolves either shape into a [`Checkpoint`] once; every later step goes through the
//! same construction path.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::Context as _;

use crate::field::pattern::{Architecture, FieldOptions, PatternField};
use crate::foundation::error::{VizError, VizResult};

/// One named parameter tensor.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TensorSnapshot {
    /// Tensor shape (`[out, in]` for weights, `[out]` for biases).
    pub shape: Vec<usize>,
    /// Row-major values.
    pub values: Vec<f32>,
}

impl TensorSnapshot {
    fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Parameter name to tensor mapping.
pub type ParameterMap = BTreeMap<String, TensorSnapshot>;

/// Optional provenance recorded by the offline tuner.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CheckpointInfo {
    /// Text prompt the weights were tuned towards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Best similarity score reached during tuning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_similarity: Option<f64>,
}

/// A parsed snapshot.
#[derive(Clone, Debug, PartialEq)]
pub enum Checkpoint {
    /// Snapshot carrying its own architecture.
    WithMetadata {
        /// Declared architecture.
        architecture: Architecture,
        /// Parameter values.
        parameters: ParameterMap,
        /// Provenance.
        info: CheckpointInfo,
    },
    /// Parameter values only; the architecture is supplied by the caller.
    Bare {
        /// Parameter values.
        parameters: ParameterMap,
        /// Provenance (present when a wrapper without `cppn_config` was read).
        info: CheckpointInfo,
    },
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RawCheckpoint {
    Wrapped {
        state_dict: ParameterMap,
        #[serde(default)]
        cppn_config: Option<Architecture>,
        #[serde(default)]
        prompt: Option<String>,
        #[serde(default)]
        best_similarity: Option<f64>,
    },
    Bare(ParameterMap),
}

#[derive(serde::Serialize)]
struct SavedCheckpoint<'a> {
    state_dict: ParameterMap,
    cppn_config: Architecture,
    #[serde(flatten)]
    info: &'a CheckpointInfo,
}

impl Checkpoint {
    /// Parse a checkpoint from JSON.
    pub fn from_reader(r: impl Read) -> VizResult<Self> {
        let raw: RawCheckpoint = serde_json::from_reader(r)
            .map_err(|e| VizError::serde(format!("parse weight snapshot: {e}")))?;
        Ok(match raw {
            RawCheckpoint::Wrapped {
                state_dict,
                cppn_config,
                prompt,
                best_similarity,
            } => {
                let info = CheckpointInfo {
                    prompt,
                    best_similarity,
                };
                match cppn_config {
                    Some(architecture) => Self::WithMetadata {
                        architecture,
                        parameters: state_dict,
                        info,
                    },
                    None => Self::Bare {
                        parameters: state_dict,
                        info,
                    },
                }
            }
            RawCheckpoint::Bare(parameters) => Self::Bare {
                parameters,
                info: CheckpointInfo::default(),
            },
        })
    }

    /// Whether the snapshot declares its own architecture.
    pub fn has_metadata(&self) -> bool {
        matches!(self, Self::WithMetadata { .. })
    }

    /// Parameter values.
    pub fn parameters(&self) -> &ParameterMap {
        match self {
            Self::WithMetadata { parameters, .. } | Self::Bare { parameters, .. } => parameters,
        }
    }

    /// Provenance.
    pub fn info(&self) -> &CheckpointInfo {
        match self {
            Self::WithMetadata { info, .. } | Self::Bare { info, .. } => info,
        }
    }

    /// Resolve the architecture to build: declared metadata wins over `fallback`.
    pub fn architecture(&self, fallback: Option<Architecture>) -> VizResult<Architecture> {
        let arch = match self {
            Self::WithMetadata { architecture, .. } => *architecture,
            Self::Bare { .. } => fallback.ok_or_else(|| {
                VizError::config(
                    "weight snapshot has no architecture metadata and none was supplied",
                )
            })?,
        };
        arch.validate()?;
        Ok(arch)
    }

    /// Build a field with the resolved architecture and load the snapshot's values into it.
    pub fn into_field(
        self,
        fallback: Option<Architecture>,
        opts: &FieldOptions,
    ) -> VizResult<PatternField> {
        let arch = self.architecture(fallback)?;
        if self.has_metadata() {
            tracing::info!(
                layers = arch.num_layers,
                hidden_dim = arch.hidden_dim,
                "using architecture from snapshot metadata"
            );
        } else {
            tracing::warn!(
                layers = arch.num_layers,
                hidden_dim = arch.hidden_dim,
                "snapshot has no architecture metadata; using caller-supplied architecture"
            );
        }
        if let Some(prompt) = self.info().prompt.as_deref() {
            tracing::info!(%prompt, "snapshot tuned for prompt");
        }
        if let Some(score) = self.info().best_similarity {
            tracing::info!(score, "snapshot similarity score");
        }

        let mut field = PatternField::new(arch, opts)?;
        load_parameters(&mut field, self.parameters())?;
        Ok(field)
    }
}

/// Reads and writes [`PatternField`] snapshots on disk.
pub struct WeightStore;

impl WeightStore {
    /// Read a snapshot from `path`.
    pub fn load(path: impl AsRef<Path>) -> VizResult<Checkpoint> {
        let path = path.as_ref();
        let f = File::open(path)
            .with_context(|| format!("open weight snapshot '{}'", path.display()))?;
        Checkpoint::from_reader(BufReader::new(f))
    }

    /// Write `field` with architecture metadata to `path`.
    pub fn save(
        field: &PatternField,
        info: &CheckpointInfo,
        path: impl AsRef<Path>,
    ) -> VizResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create snapshot directory '{}'", parent.display()))?;
        }
        let f = File::create(path)
            .with_context(|| format!("create weight snapshot '{}'", path.display()))?;
        let mut w = BufWriter::new(f);
        Self::to_writer(field, info, &mut w)?;
        w.flush()
            .with_context(|| format!("flush weight snapshot '{}'", path.display()))?;
        Ok(())
    }

    /// Serialize `field` with architecture metadata as JSON.
    pub fn to_writer(field: &PatternField, info: &CheckpointInfo, w: impl Write) -> VizResult<()> {
        let saved = SavedCheckpoint {
            state_dict: snapshot_parameters(field),
            cppn_config: field.architecture(),
            info,
        };
        serde_json::to_writer(w, &saved)
            .map_err(|e| VizError::serde(format!("write weight snapshot: {e}")))
    }
}

fn layer_names(num_layers: usize) -> Vec<String> {
    (0..num_layers)
        .map(|i| format!("layers.{i}"))
        .chain(std::iter::once("output_layer".to_string()))
        .collect()
}

/// Copy every parameter of `field` into a named map.
pub fn snapshot_parameters(field: &PatternField) -> ParameterMap {
    let names = layer_names(field.num_layers());
    let layers = field
        .hidden_layers()
        .iter()
        .chain(std::iter::once(field.output_layer()));

    let mut map = ParameterMap::new();
    for (name, layer) in names.into_iter().zip(layers) {
        map.insert(
            format!("{name}.weight"),
            TensorSnapshot {
                shape: vec![layer.out_dim(), layer.in_dim()],
                values: layer.weight().to_vec(),
            },
        );
        map.insert(
            format!("{name}.bias"),
            TensorSnapshot {
                shape: vec![layer.out_dim()],
                values: layer.bias().to_vec(),
            },
        );
    }
    map
}

/// Overwrite `field`'s values from `params`.
///
/// Every expected tensor must be present with the exact shape the field declares and with
/// `product(shape)` values; unknown names are rejected. Nothing is written unless all checks pass.
pub fn load_parameters(field: &mut PatternField, params: &ParameterMap) -> VizResult<()> {
    let names = layer_names(field.num_layers());
    let shapes = field.architecture().layer_shapes();

    let mut expected = Vec::with_capacity(names.len() * 2);
    for (name, &(out, inp)) in names.iter().zip(&shapes) {
        expected.push((format!("{name}.weight"), vec![out, inp]));
        expected.push((format!("{name}.bias"), vec![out]));
    }

    for (name, shape) in &expected {
        let t = params
            .get(name)
            .ok_or_else(|| VizError::config(format!("weight snapshot is missing '{name}'")))?;
        if &t.shape != shape {
            return Err(VizError::config(format!(
                "weight snapshot '{name}' has shape {:?}, architecture expects {shape:?}",
                t.shape
            )));
        }
        if t.values.len() != t.element_count() {
            return Err(VizError::config(format!(
                "weight snapshot '{name}' declares shape {:?} but holds {} values",
                t.shape,
                t.values.len()
            )));
        }
    }
    let unexpected: Vec<&str> = params
        .keys()
        .filter(|k| !expected.iter().any(|(n, _)| n == *k))
        .map(String::as_str)
        .collect();
    if !unexpected.is_empty() {
        return Err(VizError::config(format!(
            "weight snapshot has unexpected parameters: {}",
            unexpected.join(", ")
        )));
    }

    for (layer, name) in field.layers_mut().zip(&names) {
        let w = &params[&format!("{name}.weight")];
        let b = &params[&format!("{name}.bias")];
        layer.weight_mut().copy_from_slice(&w.values);
        layer.bias_mut().copy_from_slice(&b.values);
    }
    field.mark_changed();
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/field/store.rs"]
mod tests;
