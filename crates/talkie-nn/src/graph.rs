//! Graph backend: ONNX-shaped models on NPU or CPU via `ort`. Uses the
//! `Session::builder().with_execution_providers([...]).commit_from_file()`
//! pattern, generalized to a generic set-input/infer/get-output
//! contract instead of a fixed encoder/decoder pair.

use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Arc;
use talkie_foundation::NnError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Npu,
}

/// Reference-counted runtime core shared across every model the
/// process loads. `ort`'s environment is itself process-global; this
/// wrapper just gives call sites something explicit to hold and clone
/// rather than relying on global init order.
#[derive(Clone)]
pub struct NnRuntimeCore {
    inner: Arc<()>,
}

impl NnRuntimeCore {
    pub fn new() -> Self {
        Self { inner: Arc::new(()) }
    }

    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl Default for NnRuntimeCore {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GraphModel {
    session: Session,
    #[allow(dead_code)]
    core: NnRuntimeCore,
}

impl GraphModel {
    /// Loads an ONNX model. On `Device::Npu`, sets the NPU compiler
    /// property to `PLUGIN` before compiling; falls back to CPU if the
    /// NPU execution provider can't be constructed. On any failure the
    /// partially built session builder is dropped, releasing
    /// everything it had initialized.
    pub fn load(path: &Path, device: Device, core: NnRuntimeCore) -> Result<Self, NnError> {
        let session = match device {
            Device::Cpu => Self::build_cpu(path)?,
            Device::Npu => match Self::build_npu(path) {
                Ok(session) => session,
                Err(err) => {
                    tracing::warn!(%err, "NPU execution provider unavailable, falling back to CPU");
                    Self::build_cpu(path)?
                }
            },
        };

        Ok(Self { session, core })
    }

    fn build_cpu(path: &Path) -> Result<Session, NnError> {
        Session::builder()
            .map_err(|e| NnError::LoadFailed(e.to_string()))?
            .with_execution_providers([ort::ep::CPU::default().build()])
            .map_err(|e| NnError::LoadFailed(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| NnError::LoadFailed(format!("{}: {e}", path.display())))
    }

    /// NPU compiler property set to `PLUGIN`. The concrete
    /// execution-provider type (OpenVINO-style NPU plugin) is
    /// best-effort; this is the shape the `ort` 2.x EP builder API
    /// uses for provider-specific options.
    fn build_npu(path: &Path) -> Result<Session, NnError> {
        Session::builder()
            .map_err(|e| NnError::LoadFailed(e.to_string()))?
            .with_execution_providers([ort::ep::OpenVINO::default()
                .with_device_type("NPU")
                .with_compiler_property("PERFORMANCE_HINT", "PLUGIN")
                .build()])
            .map_err(|e| NnError::DeviceUnavailable(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| NnError::LoadFailed(format!("{}: {e}", path.display())))
    }

    pub fn create_request(&self) -> InferRequest {
        InferRequest::new()
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }
}

/// One inference call against a `GraphModel`. Inputs are accumulated
/// by index, then `infer` runs the session and returns outputs keyed
/// the same way.
pub struct InferRequest {
    inputs: Vec<(usize, Vec<i64>, Vec<i64>)>, // (index, shape, flat data)
}

impl InferRequest {
    fn new() -> Self {
        Self { inputs: Vec::new() }
    }

    pub fn set_input(&mut self, index: usize, shape: Vec<i64>, int64_sequence: Vec<i64>) {
        self.inputs.push((index, shape, int64_sequence));
    }

    pub fn infer(self, model: &GraphModel) -> Result<Vec<InferOutput>, NnError> {
        let session = model.session();
        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();

        let mut values = Vec::with_capacity(self.inputs.len());
        for (index, shape, data) in &self.inputs {
            let name = input_names
                .get(*index)
                .cloned()
                .ok_or_else(|| NnError::ShapeMismatch {
                    expected: format!("input index < {}", input_names.len()),
                    actual: format!("index {index}"),
                })?;
            let shape_usize: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            let value = Value::from_array((shape_usize, data.clone()))
                .map_err(|e| NnError::Backend {
                    status: "invalid_input".into(),
                    message: e.to_string(),
                })?;
            values.push((name, value));
        }

        let outputs = session
            .run(values)
            .map_err(|e| NnError::Backend {
                status: "inference_failed".into(),
                message: e.to_string(),
            })?;

        let mut result = Vec::with_capacity(outputs.len());
        for (_, output) in outputs.iter() {
            let (shape, data) = output
                .try_extract_tensor::<f32>()
                .map_err(|e| NnError::ShapeMismatch {
                    expected: "f32 tensor".into(),
                    actual: e.to_string(),
                })?;
            result.push(InferOutput {
                shape: shape.iter().map(|&d| d as usize).collect(),
                data: data.to_vec(),
            });
        }
        Ok(result)
    }
}

pub struct InferOutput {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_core_is_shareable() {
        let core = NnRuntimeCore::new();
        let clone = core.clone();
        assert!(clone.strong_count() >= 2);
    }
}
