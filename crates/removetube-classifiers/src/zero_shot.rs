//! Local zero-shot scorer backed by a BERT NLI model

use async_trait::async_trait;
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use removetube_core::{Error, Method, Result, TopicScore};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::config::ZeroShotBackendConfig;
use crate::model_loader::{create_device, load_tokenizer, model_err, BatchInputs, ModelFiles};
use crate::scorer::{hypothesis, SemanticScorer, TopicSet};

/// Label map from a sequence-classification `config.json`
#[derive(Debug, Default, Deserialize)]
struct LabelConfig {
    #[serde(default)]
    id2label: HashMap<String, String>,
}

/// Column of the entailment logit: the label named "entail..." or the configured fallback
fn entailment_index(id2label: &HashMap<String, String>, fallback: Option<usize>) -> Result<usize> {
    let from_labels = id2label.iter().find_map(|(id, label)| {
        if label.to_lowercase().starts_with("entail") {
            id.parse::<usize>().ok()
        } else {
            None
        }
    });

    from_labels.or(fallback).ok_or_else(|| {
        Error::config("model has no 'entailment' label; set zero_shot.entailment_index")
    })
}

/// BERT encoder + pooler + classification head
struct NliModel {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
}

impl NliModel {
    fn load(vb: VarBuilder, config: &BertConfig, num_labels: usize) -> candle_core::Result<Self> {
        let encoder = if vb.contains_tensor("bert.embeddings.word_embeddings.weight") {
            vb.pp("bert")
        } else {
            vb.clone()
        };

        let bert = BertModel::load(encoder.clone(), config)?;
        let pooler = candle_nn::linear(config.hidden_size, config.hidden_size, encoder.pp("pooler.dense"))?;
        let classifier = candle_nn::linear(config.hidden_size, num_labels, vb.pp("classifier"))?;

        Ok(Self {
            bert,
            pooler,
            classifier,
        })
    }

    /// Logits `[batch, num_labels]`
    fn forward(&self, batch: &BatchInputs) -> candle_core::Result<Tensor> {
        let hidden = self.bert.forward(
            &batch.input_ids,
            &batch.token_type_ids,
            Some(&batch.attention_mask),
        )?;
        let cls = hidden.i((.., 0, ..))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        self.classifier.forward(&pooled)
    }
}

struct ZeroShotInner {
    model: NliModel,
    tokenizer: Tokenizer,
    device: Device,
    entailment: usize,
}

impl ZeroShotInner {
    /// Entailment probability per hypothesis, normalized across all hypotheses
    fn score(&self, content: String, hypotheses: Vec<String>) -> Result<Vec<f32>> {
        if hypotheses.is_empty() {
            return Ok(Vec::new());
        }

        let pairs: Vec<(String, String)> = hypotheses
            .into_iter()
            .map(|h| (content.clone(), h))
            .collect();

        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(model_err("tokenization failed"))?;
        let batch = BatchInputs::new(&encodings, &self.device)?;

        let logits = self
            .model
            .forward(&batch)
            .map_err(model_err("model forward pass failed"))?;

        let entailment = logits
            .i((.., self.entailment))
            .and_then(|t| candle_nn::ops::softmax(&t, 0))
            .map_err(model_err("failed to normalize entailment logits"))?;

        entailment
            .to_vec1::<f32>()
            .map_err(model_err("failed to read scores"))
    }
}

/// Zero-shot topic scorer: every topic becomes an NLI hypothesis against the content
#[derive(Clone)]
pub struct ZeroShotScorer {
    inner: Arc<ZeroShotInner>,
    name: String,
    hypothesis_template: String,
}

impl ZeroShotScorer {
    /// Load the NLI checkpoint described by `config`
    pub fn load(config: &ZeroShotBackendConfig) -> Result<Self> {
        let start = Instant::now();
        let model_config = &config.model;

        let files = ModelFiles::resolve(model_config)?;
        let device = create_device(model_config.device)?;

        let bert_config: BertConfig = files.read_config()?;
        let labels: LabelConfig = files.read_config()?;
        // MNLI heads have three labels when the config does not list them
        let num_labels = match labels.id2label.len() {
            0 => 3,
            n => n,
        };
        let entailment = entailment_index(&labels.id2label, config.entailment_index)?;
        if entailment >= num_labels {
            return Err(Error::config(format!(
                "entailment index {} out of range for {} labels",
                entailment, num_labels
            )));
        }

        let vb = files.var_builder(&device)?;
        let model = NliModel::load(vb, &bert_config, num_labels)
            .map_err(model_err("failed to load NLI model"))?;
        let tokenizer = load_tokenizer(&files.tokenizer, model_config.max_length)?;

        info!(
            model = %model_config.repo_id,
            num_labels,
            entailment,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded zero-shot model"
        );

        Ok(Self {
            inner: Arc::new(ZeroShotInner {
                model,
                tokenizer,
                device,
                entailment,
            }),
            name: model_config.repo_id.clone(),
            hypothesis_template: config.hypothesis_template.clone(),
        })
    }
}

#[async_trait]
impl SemanticScorer for ZeroShotScorer {
    async fn score(&self, content: &str, topics: &TopicSet<'_>) -> Result<Vec<TopicScore>> {
        let start = Instant::now();
        let names = topics.names();
        let hypotheses: Vec<String> = names
            .iter()
            .map(|t| hypothesis(&self.hypothesis_template, t))
            .collect();

        let inner = Arc::clone(&self.inner);
        let content = content.to_string();
        let probabilities = tokio::task::spawn_blocking(move || inner.score(content, hypotheses))
            .await
            .map_err(|e| Error::internal(format!("zero-shot task failed: {}", e)))??;

        debug!(
            topics = names.len(),
            "Zero-shot scoring in {}us",
            start.elapsed().as_micros()
        );

        Ok(names
            .iter()
            .zip(probabilities)
            .map(|(name, p)| TopicScore::new(name.clone(), p))
            .collect())
    }

    fn method(&self) -> Method {
        Method::ZeroShot
    }

    fn name(&self) -> &str {
        &self.name
    }
}
