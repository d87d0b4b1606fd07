//! Model loading shared by the Candle-based scorers

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use hf_hub::{api::sync::Api, Repo, RepoType};
use removetube_core::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::info;

use crate::config::{DeviceType, LocalModelConfig};

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const SAFETENSORS_FILE: &str = "model.safetensors";
const PYTORCH_FILE: &str = "pytorch_model.bin";

/// Map a Candle/tokenizer failure into a model error with context
pub(crate) fn model_err<E: std::fmt::Display>(context: &'static str) -> impl Fn(E) -> Error {
    move |e| Error::model(format!("{}: {}", context, e))
}

/// Files making up a BERT-family checkpoint
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    /// Locate the checkpoint locally or download it from the Hugging Face Hub
    pub fn resolve(config: &LocalModelConfig) -> Result<Self> {
        match &config.local_dir {
            Some(dir) => Self::from_dir(dir),
            None => Self::download(&config.repo_id, &config.revision),
        }
    }

    fn from_dir(dir: &Path) -> Result<Self> {
        let existing = |name: &str| -> Result<PathBuf> {
            let path = dir.join(name);
            if path.exists() {
                Ok(path)
            } else {
                Err(Error::config(format!("model file not found: {:?}", path)))
            }
        };

        let weights = existing(SAFETENSORS_FILE).or_else(|_| existing(PYTORCH_FILE))?;

        Ok(Self {
            config: existing(CONFIG_FILE)?,
            tokenizer: existing(TOKENIZER_FILE)?,
            weights,
        })
    }

    fn download(repo_id: &str, revision: &str) -> Result<Self> {
        info!(repo_id, revision, "Fetching model from Hugging Face Hub");

        let api = Api::new()
            .map_err(|e| Error::config(format!("failed to initialize HF API: {}", e)))?;
        let repo = api.repo(Repo::with_revision(
            repo_id.to_string(),
            RepoType::Model,
            revision.to_string(),
        ));

        let fetch = |name: &str| {
            repo.get(name)
                .map_err(|e| Error::config(format!("failed to download {} from {}: {}", name, repo_id, e)))
        };

        let weights = fetch(SAFETENSORS_FILE).or_else(|_| fetch(PYTORCH_FILE))?;

        Ok(Self {
            config: fetch(CONFIG_FILE)?,
            tokenizer: fetch(TOKENIZER_FILE)?,
            weights,
        })
    }

    /// Parse `config.json` into any serde type
    pub fn read_config<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = std::fs::read_to_string(&self.config)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Open the weights, memory-mapping safetensors
    pub fn var_builder(&self, device: &Device) -> Result<VarBuilder<'static>> {
        let is_safetensors = self
            .weights
            .extension()
            .is_some_and(|ext| ext == "safetensors");

        if is_safetensors {
            // SAFETY: the file is not modified while mapped
            unsafe {
                VarBuilder::from_mmaped_safetensors(&[&self.weights], DType::F32, device)
                    .map_err(model_err("failed to load safetensors"))
            }
        } else {
            VarBuilder::from_pth(&self.weights, DType::F32, device)
                .map_err(model_err("failed to load PyTorch weights"))
        }
    }
}

/// Create Candle device from device type
pub fn create_device(device_type: DeviceType) -> Result<Device> {
    match device_type {
        DeviceType::Cpu => Ok(Device::Cpu),
        DeviceType::Cuda(idx) => Device::new_cuda(idx).map_err(model_err("failed to create CUDA device")),
        DeviceType::Metal(idx) => Device::new_metal(idx).map_err(model_err("failed to create Metal device")),
    }
}

/// Load a tokenizer padded to the longest sequence of a batch and truncated to `max_length`
pub fn load_tokenizer(path: &Path, max_length: usize) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path).map_err(model_err("failed to load tokenizer"))?;

    let pad_token = "[PAD]".to_string();
    let pad_id = tokenizer.token_to_id(&pad_token).unwrap_or(0);
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        pad_id,
        pad_token,
        ..Default::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(model_err("failed to configure truncation"))?;

    Ok(tokenizer)
}

/// Padded batch ready for a BERT forward pass
pub struct BatchInputs {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

impl BatchInputs {
    /// Stack equally padded encodings into `[batch, seq_len]` tensors
    pub fn new(encodings: &[Encoding], device: &Device) -> Result<Self> {
        let stack = |rows: Vec<&[u32]>| -> Result<Tensor> {
            let rows = rows
                .into_iter()
                .map(|row| Tensor::new(row, device))
                .collect::<candle_core::Result<Vec<_>>>()
                .map_err(model_err("failed to create input tensor"))?;
            Tensor::stack(&rows, 0).map_err(model_err("failed to stack batch"))
        };

        Ok(Self {
            input_ids: stack(encodings.iter().map(|e| e.get_ids()).collect())?,
            token_type_ids: stack(encodings.iter().map(|e| e.get_type_ids()).collect())?,
            attention_mask: stack(encodings.iter().map(|e| e.get_attention_mask()).collect())?,
        })
    }
}
