//! GGUF llama model session backed by candle.
//!
//! One model context shared by all requests; completions serialize on the
//! session lock and run on the blocking pool so the HTTP executor stays
//! responsive during generation.

use std::fs::File;
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use candle::quantized::gguf_file;
use candle::{Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama::ModelWeights;
use rand::{thread_rng, Rng};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::error::{ConfigError, InferenceError};
use crate::inference::CompletionEngine;
use crate::prompt::truncate_at_stop;

static COMPUTE_POOL: OnceLock<()> = OnceLock::new();

/// Size the global CPU compute pool once; the first session to load wins and
/// later calls keep the existing pool.
fn configure_compute_pool(threads: usize) {
    COMPUTE_POOL.get_or_init(|| {
        if let Err(err) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            debug!(error = %err, "compute pool already initialized");
        }
    });
}

#[cfg(feature = "cuda")]
fn init_device() -> Result<Device, ConfigError> {
    Device::new_cuda(0).map_err(ConfigError::ModelLoad)
}

#[cfg(not(feature = "cuda"))]
fn init_device() -> Result<Device, ConfigError> {
    Ok(Device::Cpu)
}

#[derive(Debug)]
pub struct LlamaSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    model: Mutex<ModelWeights>,
    tokenizer: Tokenizer,
    device: Device,
    eos_token: u32,
    context_length: usize,
    temperature: f64,
}

impl LlamaSession {
    /// Load the GGUF weights and tokenizer named by `cfg`. Fails before any
    /// engine work if either file is missing.
    pub fn load(cfg: &ModelConfig) -> Result<Self, ConfigError> {
        if !cfg.model_path.exists() {
            return Err(ConfigError::MissingModel(cfg.model_path.clone()));
        }
        if !cfg.tokenizer_path.exists() {
            return Err(ConfigError::MissingTokenizer(cfg.tokenizer_path.clone()));
        }

        configure_compute_pool(cfg.threads);
        let device = init_device()?;

        let mut file = File::open(&cfg.model_path)
            .map_err(|e| ConfigError::ModelLoad(candle::Error::from(e)))?;
        let content = gguf_file::Content::read(&mut file)
            .map_err(|e| ConfigError::ModelLoad(e.with_path(&cfg.model_path)))?;
        let model = ModelWeights::from_gguf(content, &mut file, &device)
            .map_err(ConfigError::ModelLoad)?;

        let tokenizer = Tokenizer::from_file(&cfg.tokenizer_path)
            .map_err(|e| ConfigError::TokenizerLoad(e.to_string()))?;
        let eos_token = tokenizer
            .token_to_id("<eos>")
            .or_else(|| tokenizer.token_to_id("</s>"))
            .unwrap_or(u32::MAX);

        info!(
            model = %cfg.model_path.display(),
            ctx = cfg.context_length,
            threads = cfg.threads,
            temperature = cfg.temperature,
            "model session ready"
        );

        Ok(Self {
            inner: Arc::new(SessionInner {
                model: Mutex::new(model),
                tokenizer,
                device,
                eos_token,
                context_length: cfg.context_length,
                temperature: cfg.temperature,
            }),
        })
    }
}

#[async_trait]
impl CompletionEngine for LlamaSession {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: usize,
        stop: &[&str],
    ) -> Result<String, InferenceError> {
        let inner = Arc::clone(&self.inner);
        let prompt = prompt.to_owned();
        let stop: Vec<String> = stop.iter().map(|s| s.to_string()).collect();
        // CPU-bound loop, keep it off the async executor.
        tokio::task::spawn_blocking(move || inner.run(&prompt, max_tokens, &stop)).await?
    }
}

/// Token allowance for one completion: the caller's cap, shrunk to whatever
/// context remains after the prompt. A prompt that already fills the context
/// cannot generate anything and is an overflow.
fn generation_budget(
    context_length: usize,
    prompt_tokens: usize,
    max_tokens: usize,
) -> Result<usize, InferenceError> {
    let remaining = context_length.saturating_sub(prompt_tokens);
    if remaining == 0 {
        return Err(InferenceError::ContextOverflow {
            prompt_tokens,
            context_length,
        });
    }
    Ok(max_tokens.min(remaining))
}

impl SessionInner {
    fn run(
        &self,
        prompt: &str,
        max_tokens: usize,
        stop: &[String],
    ) -> Result<String, InferenceError> {
        let enc = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| InferenceError::Tokenizer(e.to_string()))?;
        let prompt_tokens = enc.get_ids().to_vec();

        let to_sample =
            generation_budget(self.context_length, prompt_tokens.len(), max_tokens)?;

        let mut model = self.model.lock().map_err(|_| InferenceError::LockPoisoned)?;
        let mut logits_processor =
            LogitsProcessor::new(thread_rng().gen(), Some(self.temperature), None);

        // Whole prompt in one pass, then one token at a time. index_pos 0
        // starts a fresh sequence: the layer caches reset themselves.
        let input = Tensor::new(prompt_tokens.as_slice(), &self.device)?.unsqueeze(0)?;
        let logits = model.forward(&input, 0)?.squeeze(0)?;
        let mut next_token = logits_processor.sample(&logits)?;

        let mut generated: Vec<u32> = Vec::new();
        let mut text = String::new();

        for index in 0..to_sample {
            if next_token == self.eos_token {
                break;
            }
            generated.push(next_token);

            // Re-decode the whole tail each step so a stop sequence split
            // across several tokens is caught as soon as it completes.
            text = self
                .tokenizer
                .decode(&generated, false)
                .map_err(|e| InferenceError::Tokenizer(e.to_string()))?;
            if stop.iter().any(|seq| text.contains(seq.as_str())) {
                break;
            }

            let input = Tensor::new(&[next_token], &self.device)?.unsqueeze(0)?;
            let logits = model
                .forward(&input, prompt_tokens.len() + index)?
                .squeeze(0)?;
            next_token = logits_processor.sample(&logits)?;
        }

        debug!(
            prompt_tokens = prompt_tokens.len(),
            generated = generated.len(),
            "completion finished"
        );

        let stops: Vec<&str> = stop.iter().map(String::as_str).collect();
        Ok(truncate_at_stop(&text, &stops).to_string())
    }
}
