use std::path::{Path, PathBuf};

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use hf_hub::api::sync::ApiBuilder;
use tracing::debug;

use super::error::{DownloadHFModelError, LoadConfigError, LoadSafeTensorError};

/// Load a json config file into some deserializable struct
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LoadConfigError> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// memmap is unsafe because the file can be modified during or after
/// the file is read.
pub fn load_safetensors<'a, P: AsRef<Path>>(
    paths: &[P],
    dtype: DType,
    device: &Device,
) -> Result<VarBuilder<'a>, LoadSafeTensorError> {
    Ok(unsafe { VarBuilder::from_mmaped_safetensors(paths, dtype, device) }?)
}

/// Download a file from a HuggingFace model repo, or return the cached copy.
pub fn download_hf_hub_file(
    model_id: &str,
    filename: &str,
    progress: bool,
) -> Result<PathBuf, DownloadHFModelError> {
    let api = ApiBuilder::new().with_progress(progress).build()?;
    let model_repo = api.model(model_id.to_string());
    let filepath = model_repo.get(filename)?;
    debug!(model_id, filename, path = %filepath.display(), "fetched hub file");
    Ok(filepath)
}
