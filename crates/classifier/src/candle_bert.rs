//! Candle sequence classifier
//!
//! Loads a fine-tuned BERT or ELECTRA checkpoint (safetensors) plus its
//! tokenizer and label map from a local directory or a HuggingFace Hub repo.
//!
//! Heads:
//! - BERT: CLS → pooler dense → tanh → `classifier`
//! - ELECTRA: CLS → `classifier.dense` → GELU → `classifier.out_proj`
//!
//! LoRA adapters must be merged into the base weights before export.

use std::path::{Path, PathBuf};

use anyhow::{Context, Error as E, Result};
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::{Tokenizer, TruncationParams};

use aicc_config::{ClassifierArchitecture, ClassifierConfig};

use crate::backend::ClassifierBackend;
use crate::label_map::LabelMap;
use crate::ClassifierError;

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";
const LABEL_MAP_FILE: &str = "label_map.json";

struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
    label_map: PathBuf,
}

enum ClassificationHead {
    Bert { pooler: Linear, classifier: Linear },
    Electra { dense: Linear, out_proj: Linear },
}

impl ClassificationHead {
    fn load(
        architecture: ClassifierArchitecture,
        vb: &VarBuilder,
        hidden_size: usize,
        num_labels: usize,
    ) -> Result<Self> {
        match architecture {
            ClassifierArchitecture::Bert => Ok(Self::Bert {
                pooler: candle_nn::linear(hidden_size, hidden_size, vb.pp("bert.pooler.dense"))?,
                classifier: candle_nn::linear(hidden_size, num_labels, vb.pp("classifier"))?,
            }),
            ClassifierArchitecture::Electra => Ok(Self::Electra {
                dense: candle_nn::linear(hidden_size, hidden_size, vb.pp("classifier.dense"))?,
                out_proj: candle_nn::linear(hidden_size, num_labels, vb.pp("classifier.out_proj"))?,
            }),
        }
    }

    /// `cls` is the first-token hidden state, shape (batch, hidden)
    fn forward(&self, cls: &Tensor) -> Result<Tensor> {
        let logits = match self {
            Self::Bert { pooler, classifier } => {
                let pooled = pooler.forward(cls)?.tanh()?;
                classifier.forward(&pooled)?
            }
            Self::Electra { dense, out_proj } => {
                let hidden = dense.forward(cls)?.gelu_erf()?;
                out_proj.forward(&hidden)?
            }
        };
        Ok(logits)
    }
}

/// Fine-tuned encoder with a sequence classification head
pub struct CandleSequenceClassifier {
    encoder: BertModel,
    head: ClassificationHead,
    tokenizer: Tokenizer,
    device: Device,
    name: String,
}

impl CandleSequenceClassifier {
    /// Load model and label map described by `config`
    pub fn load(config: &ClassifierConfig) -> std::result::Result<(Self, LabelMap), ClassifierError> {
        let files = resolve_model_files(&config.model_dir)
            .map_err(|e| ClassifierError::ModelLoad(format!("{:#}", e)))?;
        let labels = LabelMap::load(&files.label_map)?;
        let model = Self::load_files(&files, config, labels.len())
            .map_err(|e| ClassifierError::ModelLoad(format!("{:#}", e)))?;
        Ok((model, labels))
    }

    fn load_files(files: &ModelFiles, config: &ClassifierConfig, num_labels: usize) -> Result<Self> {
        let device = if config.use_cpu {
            Device::Cpu
        } else {
            Device::cuda_if_available(0)?
        };

        let raw_config = std::fs::read_to_string(&files.config)
            .with_context(|| format!("reading {}", files.config.display()))?;
        let model_config: Config = serde_json::from_str(&raw_config)?;
        check_embedding_size(&raw_config, model_config.hidden_size)?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer).map_err(E::msg)?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_sequence_length,
                ..Default::default()
            }))
            .map_err(E::msg)?;
        tokenizer.with_padding(None);

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], DType::F32, &device)?
        };

        let prefix = match config.architecture {
            ClassifierArchitecture::Bert => "bert",
            ClassifierArchitecture::Electra => "electra",
        };
        let encoder = BertModel::load(vb.pp(prefix), &model_config)?;
        let head = ClassificationHead::load(
            config.architecture,
            &vb,
            model_config.hidden_size,
            num_labels,
        )?;

        Ok(Self {
            encoder,
            head,
            tokenizer,
            device,
            name: format!("{}:{}", prefix, config.model_dir),
        })
    }

    fn forward(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self.tokenizer.encode(text, true).map_err(E::msg)?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .encoder
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let cls = hidden.i((.., 0))?;
        let logits = self.head.forward(&cls)?;

        Ok(logits.squeeze(0)?.to_dtype(DType::F32)?.to_vec1::<f32>()?)
    }
}

impl ClassifierBackend for CandleSequenceClassifier {
    fn logits(&self, text: &str) -> std::result::Result<Vec<f32>, ClassifierError> {
        self.forward(text)
            .map_err(|e| ClassifierError::Inference(format!("{:#}", e)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// ELECTRA-small style checkpoints project embeddings; only equal sizes are supported
fn check_embedding_size(raw_config: &str, hidden_size: usize) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(raw_config)?;
    if let Some(embedding_size) = value.get("embedding_size").and_then(|v| v.as_u64()) {
        if embedding_size as usize != hidden_size {
            anyhow::bail!(
                "embedding_size {} differs from hidden_size {}",
                embedding_size,
                hidden_size
            );
        }
    }
    Ok(())
}

/// Resolve model files (local directory or HuggingFace Hub)
fn resolve_model_files(model_dir: &str) -> Result<ModelFiles> {
    let dir = Path::new(model_dir);
    if dir.exists() {
        let files = ModelFiles {
            config: dir.join(CONFIG_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            weights: dir.join(WEIGHTS_FILE),
            label_map: dir.join(LABEL_MAP_FILE),
        };
        for path in [&files.config, &files.tokenizer, &files.weights, &files.label_map] {
            if !path.exists() {
                anyhow::bail!("missing model file {}", path.display());
            }
        }
        return Ok(files);
    }

    tracing::info!(repo = %model_dir, "Model directory not found locally, fetching from HuggingFace Hub");
    let repo = Repo::with_revision(model_dir.to_string(), RepoType::Model, "main".to_string());
    let api = Api::new()?.repo(repo);

    Ok(ModelFiles {
        config: api.get(CONFIG_FILE)?,
        tokenizer: api.get(TOKENIZER_FILE)?,
        weights: api.get(WEIGHTS_FILE)?,
        label_map: api.get(LABEL_MAP_FILE)?,
    })
}
