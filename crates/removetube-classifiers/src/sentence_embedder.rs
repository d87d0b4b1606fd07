//! BERT sentence embedder (mean pooling, L2-normalized)

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use removetube_core::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::config::LocalModelConfig;
use crate::embedding::TextEmbedder;
use crate::model_loader::{create_device, load_tokenizer, model_err, BatchInputs, ModelFiles};

struct EmbedderInner {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl EmbedderInner {
    fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts, true)
            .map_err(model_err("tokenization failed"))?;
        let batch = BatchInputs::new(&encodings, &self.device)?;

        let hidden = self
            .model
            .forward(&batch.input_ids, &batch.token_type_ids, Some(&batch.attention_mask))
            .map_err(model_err("model forward pass failed"))?;

        let pooled = mean_pool(&hidden, &batch.attention_mask)
            .and_then(|t| normalize_l2(&t))
            .map_err(model_err("pooling failed"))?;

        pooled
            .to_vec2::<f32>()
            .map_err(model_err("failed to read embeddings"))
    }
}

/// Average token states over the attention mask
fn mean_pool(hidden: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask = attention_mask.to_dtype(DType::F32)?;
    let summed = hidden.broadcast_mul(&mask.unsqueeze(2)?)?.sum(1)?;
    let counts = mask.sum_keepdim(1)?;
    summed.broadcast_div(&counts)
}

fn normalize_l2(v: &Tensor) -> candle_core::Result<Tensor> {
    let norm = v.sqr()?.sum_keepdim(1)?.sqrt()?;
    v.broadcast_div(&norm)
}

/// Sentence-transformers style embedder running a BERT encoder with Candle.
///
/// Inference runs on the blocking thread pool.
#[derive(Clone)]
pub struct BertSentenceEmbedder {
    inner: Arc<EmbedderInner>,
    name: String,
}

impl BertSentenceEmbedder {
    /// Load weights, tokenizer and config; downloads from the Hub when needed
    pub fn load(config: &LocalModelConfig) -> Result<Self> {
        let start = Instant::now();
        let files = ModelFiles::resolve(config)?;
        let device = create_device(config.device)?;

        let bert_config: BertConfig = files.read_config()?;
        let vb = files.var_builder(&device)?;
        let model = if vb.contains_tensor("bert.embeddings.word_embeddings.weight") {
            BertModel::load(vb.pp("bert"), &bert_config)
        } else {
            BertModel::load(vb, &bert_config)
        }
        .map_err(model_err("failed to load BERT model"))?;

        let tokenizer = load_tokenizer(&files.tokenizer, config.max_length)?;

        info!(
            model = %config.repo_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded sentence embedder"
        );

        Ok(Self {
            inner: Arc::new(EmbedderInner {
                model,
                tokenizer,
                device,
            }),
            name: config.repo_id.clone(),
        })
    }
}

#[async_trait]
impl TextEmbedder for BertSentenceEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let inner = Arc::clone(&self.inner);
        let texts = texts.to_vec();
        let count = texts.len();

        let embeddings = tokio::task::spawn_blocking(move || inner.embed(texts))
            .await
            .map_err(|e| Error::internal(format!("embedding task failed: {}", e)))??;

        debug!(count, "Embedded texts in {}us", start.elapsed().as_micros());
        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
