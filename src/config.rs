use serde::Deserialize;

/// The subset of a hub repo's `config.json` the embedding stack reads
/// directly. Architecture-specific fields are parsed by the model itself.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(rename = "_name_or_path")]
    pub name_or_path: Option<String>,
    pub architectures: Option<Vec<String>>,
    pub hidden_size: Option<usize>,
    pub max_position_embeddings: Option<usize>,
    pub model_type: Option<String>,
    pub pad_token_id: Option<usize>,
    pub vocab_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentenceBertConfig {
    pub max_seq_length: usize,
    #[serde(default)]
    pub do_lower_case: bool,
}
