use std::fmt;

use candle_core::Device;
use tracing::{debug, info};

use crate::{
    batch::SentenceBatch,
    config::{ModelConfig, SentenceBertConfig},
    dense::{Dense, DenseConfig},
    error::{EmbedError, SentenceTransformerBuilderError},
    models::bert::DTYPE,
    normalize::Normalize,
    pooling::Pooler,
    provider::EmbeddingProvider,
    transformer::Transformer,
    utils::{download_hf_hub_file, load_config, load_safetensors},
};

const DEFAULT_WITH_SAFETENSORS: bool = false;
const DEFAULT_WITH_NORMALIZE: bool = false;
const DEFAULT_WITH_PROGRESS: bool = false;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Which {
    AllMiniLML6v2,
    AllMiniLML12v2,
    ParaphraseMiniLML6v2,
    ParaphraseMultilingualMiniLML12v2,
    LaBSE,
}

impl fmt::Display for Which {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Which::AllMiniLML6v2 => write!(f, "sentence-transformers/all-MiniLM-L6-v2"),
            Which::AllMiniLML12v2 => write!(f, "sentence-transformers/all-MiniLM-L12-v2"),
            Which::ParaphraseMiniLML6v2 => {
                write!(f, "sentence-transformers/paraphrase-MiniLM-L6-v2")
            }
            Which::ParaphraseMultilingualMiniLML12v2 => {
                write!(
                    f,
                    "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2"
                )
            }
            Which::LaBSE => write!(f, "sentence-transformers/LaBSE"),
        }
    }
}

pub struct SentenceTransformerBuilder {
    model_id: String,
    with_safetensors: bool,
    with_normalization: bool,
    with_progress: bool,
    device: Option<Device>,
    pooling_path: Option<String>,
    dense_paths: Vec<String>,
}

impl SentenceTransformerBuilder {
    pub fn new(model_id: impl AsRef<str>) -> Self {
        Self {
            model_id: model_id.as_ref().to_string(),
            with_safetensors: DEFAULT_WITH_SAFETENSORS,
            with_normalization: DEFAULT_WITH_NORMALIZE,
            with_progress: DEFAULT_WITH_PROGRESS,
            device: None,
            pooling_path: None,
            dense_paths: vec![],
        }
    }

    /// Preconfigured builder for one of the known hub models. Only the device
    /// is left to set.
    pub fn with_sentence_transformer(model: &Which) -> Self {
        match model {
            Which::LaBSE => Self::new(model.to_string())
                .with_safetensors()
                .with_normalization()
                .with_pooling("1_Pooling")
                .with_dense("2_Dense"),
            Which::ParaphraseMultilingualMiniLML12v2 | Which::ParaphraseMiniLML6v2 => {
                Self::new(model.to_string())
                    .with_safetensors()
                    .with_pooling("1_Pooling")
            }
            Which::AllMiniLML6v2 | Which::AllMiniLML12v2 => Self::new(model.to_string())
                .with_safetensors()
                .with_normalization()
                .with_pooling("1_Pooling"),
        }
    }

    /// Load `model.safetensors` files instead of `pytorch_model.bin` checkpoints.
    pub fn with_safetensors(mut self) -> Self {
        self.with_safetensors = true;
        self
    }

    pub fn with_normalization(mut self) -> Self {
        self.with_normalization = true;
        self
    }

    /// Show a progress bar while hub files are downloaded.
    pub fn with_progress(mut self) -> Self {
        self.with_progress = true;
        self
    }

    pub fn with_device(mut self, device: &Device) -> Self {
        self.device = Some(device.clone());
        self
    }

    /// Folder on the hub that contains the pooling layer `config.json`.
    pub fn with_pooling(mut self, pooling_path: impl AsRef<str>) -> Self {
        self.pooling_path = Some(pooling_path.as_ref().to_string());
        self
    }

    /// Folder on the hub holding a dense layer. Layers are applied in the
    /// order they are added.
    pub fn with_dense(mut self, dense_path: impl AsRef<str>) -> Self {
        self.dense_paths.push(dense_path.as_ref().to_string());
        self
    }

    fn download(&self, filename: &str) -> Result<std::path::PathBuf, SentenceTransformerBuilderError> {
        Ok(download_hf_hub_file(&self.model_id, filename, self.with_progress)?)
    }

    fn load_weights<'a>(
        &self,
        folder: Option<&str>,
        device: &Device,
    ) -> Result<candle_nn::VarBuilder<'a>, SentenceTransformerBuilderError> {
        let filename = if self.with_safetensors {
            "model.safetensors"
        } else {
            "pytorch_model.bin"
        };
        let filename = match folder {
            Some(folder) => format!("{folder}/{filename}"),
            None => filename.to_string(),
        };

        let weights_filename = self.download(&filename)?;
        let vb = if self.with_safetensors {
            load_safetensors(&[weights_filename], DTYPE, device)?
        } else {
            candle_nn::VarBuilder::from_pth(&weights_filename, DTYPE, device)?
        };
        Ok(vb)
    }

    pub fn build(self) -> Result<SentenceTransformer, SentenceTransformerBuilderError> {
        // Device must be specified
        let device = self
            .device
            .clone()
            .ok_or(SentenceTransformerBuilderError::DeviceNotSpecified)?;

        // The pooling method must also be specified
        let pooling_path = self
            .pooling_path
            .as_deref()
            .ok_or(SentenceTransformerBuilderError::PoolingMethodNotSpecified)?;

        info!(model_id = %self.model_id, ?device, "loading sentence transformer");

        // load the model's hf_hub repo config
        let config_filename = self.download("config.json")?;
        let model_config = load_config::<ModelConfig>(&config_filename)?;

        // Load the sbert config
        let sbert_config_filename = self.download("sentence_bert_config.json")?;
        let sbert_config = load_config::<SentenceBertConfig>(&sbert_config_filename)?;

        // Load the transformer
        let vb = self.load_weights(None, &device)?;
        let tokenizer_filename = self.download("tokenizer.json")?;
        let transformer =
            Transformer::load(vb, &config_filename, &tokenizer_filename, &sbert_config)?;

        // load the pooler
        let pooling_config_filename = self.download(&format!("{pooling_path}/config.json"))?;
        let pooler = Pooler::from_config_file(&pooling_config_filename)?;

        // Load the dense layers
        let mut dense_layers = vec![];
        for dense_path in self.dense_paths.iter() {
            let dense_config_filename = self.download(&format!("{dense_path}/config.json"))?;
            let dense_config = load_config::<DenseConfig>(&dense_config_filename)?;
            let dense_vb = self.load_weights(Some(dense_path), &device)?;
            dense_layers.push(Dense::from_config(dense_vb, dense_config)?);
        }

        // normalize
        let normalize = self.with_normalization.then_some(Normalize);

        debug!(
            model_type = ?model_config.model_type,
            hidden_size = ?model_config.hidden_size,
            max_seq_length = sbert_config.max_seq_length,
            pooling = ?pooler.strategies(),
            dense_layers = dense_layers.len(),
            normalize = normalize.is_some(),
            "sentence transformer modules"
        );
        info!(model_id = %self.model_id, "sentence transformer ready");

        Ok(SentenceTransformer {
            model_id: self.model_id,
            model_config,
            transformer,
            pooler,
            dense_layers,
            normalize,
        })
    }
}

/// A sentence-transformers pipeline: transformer, pooling, optional dense
/// layers and optional L2 normalization.
pub struct SentenceTransformer {
    model_id: String,
    model_config: ModelConfig,
    transformer: Transformer,
    pooler: Pooler,
    dense_layers: Vec<Dense>,
    normalize: Option<Normalize>,
}

impl SentenceTransformer {
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn model_config(&self) -> &ModelConfig {
        &self.model_config
    }

    /// Embed every sentence of the batch with a single forward pass.
    /// Embedding `i` belongs to sentence `i`.
    pub fn embed(&self, batch: &SentenceBatch) -> Result<Vec<Vec<f32>>, EmbedError> {
        let tokens = self.transformer.tokenize(batch)?;

        // transformer
        let mut embeddings = self.transformer.forward(&tokens)?;

        // pool
        embeddings = self.pooler.pool(&embeddings, &tokens.attention_mask)?;

        // dense
        for dense in self.dense_layers.iter() {
            embeddings = dense.forward(&embeddings)?;
        }

        // norm
        if let Some(norm) = &self.normalize {
            embeddings = norm.forward(&embeddings)?;
        }

        Ok(embeddings.to_vec2::<f32>()?)
    }
}

impl EmbeddingProvider for SentenceTransformer {
    type Error = EmbedError;

    fn embed(&self, batch: &SentenceBatch) -> Result<Vec<Vec<f32>>, Self::Error> {
        SentenceTransformer::embed(self, batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn which_renders_hub_repo_id() {
        assert_eq!(
            Which::AllMiniLML6v2.to_string(),
            "sentence-transformers/all-MiniLM-L6-v2"
        );
        assert_eq!(Which::LaBSE.to_string(), "sentence-transformers/LaBSE");
    }

    #[test]
    fn presets_pick_modules() {
        let labse = SentenceTransformerBuilder::with_sentence_transformer(&Which::LaBSE);
        assert!(labse.with_safetensors && labse.with_normalization);
        assert_eq!(labse.pooling_path.as_deref(), Some("1_Pooling"));
        assert_eq!(labse.dense_paths, vec!["2_Dense".to_string()]);

        let paraphrase =
            SentenceTransformerBuilder::with_sentence_transformer(&Which::ParaphraseMiniLML6v2);
        assert!(!paraphrase.with_normalization);
        assert!(paraphrase.dense_paths.is_empty());
    }

    #[test]
    fn build_requires_device() {
        let result = SentenceTransformerBuilder::with_sentence_transformer(&Which::AllMiniLML6v2)
            .build();
        assert!(matches!(
            result,
            Err(SentenceTransformerBuilderError::DeviceNotSpecified)
        ));
    }

    #[test]
    fn build_requires_pooling() {
        let result = SentenceTransformerBuilder::new("sentence-transformers/all-MiniLM-L6-v2")
            .with_device(&Device::Cpu)
            .build();
        assert!(matches!(
            result,
            Err(SentenceTransformerBuilderError::PoolingMethodNotSpecified)
        ));
    }
}
