//! Per-file work: decode, render, write next to the input

use crate::audio::{decoder_from_config, Decoder};
use crate::error::ItemError;
use crate::render::{Renderer, SpectrogramRenderer};
use crate::types::{InputFile, OutputCollision};
use specgen_common::config::Config;
use specgen_common::Error as CommonError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Decoder and renderer shared by all workers
#[derive(Clone)]
pub struct SpectrogramPipeline {
    decoder: Arc<dyn Decoder>,
    renderer: Arc<dyn Renderer>,
    image_extension: String,
}

impl SpectrogramPipeline {
    pub fn new(
        decoder: Arc<dyn Decoder>,
        renderer: Arc<dyn Renderer>,
        image_extension: impl Into<String>,
    ) -> Self {
        Self {
            decoder,
            renderer,
            image_extension: image_extension.into(),
        }
    }

    /// Build the configured decoder and renderer
    pub fn from_config(config: &Config) -> Result<Self, CommonError> {
        let renderer = SpectrogramRenderer::from_config(&config.render)
            .map_err(|e| CommonError::InvalidInput(e.to_string()))?;

        Ok(Self::new(
            decoder_from_config(&config.decoder),
            Arc::new(renderer),
            config.render.image_extension.clone(),
        ))
    }

    /// Split `files` into inputs to process and inputs whose image path is taken
    ///
    /// The first input (in the given order) to map to an image path keeps it.
    pub fn claim_outputs(&self, files: Vec<InputFile>) -> (Vec<InputFile>, Vec<OutputCollision>) {
        let mut owners: HashMap<PathBuf, InputFile> = HashMap::with_capacity(files.len());
        let mut claimed = Vec::with_capacity(files.len());
        let mut collisions = Vec::new();

        for item in files {
            let output = item.output_path(&self.image_extension);
            match owners.get(&output) {
                Some(owner) => collisions.push(OutputCollision {
                    claimed_by: owner.clone(),
                    item,
                    output,
                }),
                None => {
                    owners.insert(output, item.clone());
                    claimed.push(item);
                }
            }
        }

        (claimed, collisions)
    }

    /// Process one file, returning the written image path
    ///
    /// The waveform is dropped before returning, on success and on failure.
    pub fn process(&self, item: &InputFile) -> Result<PathBuf, ItemError> {
        let start = Instant::now();
        let output = item.output_path(&self.image_extension);

        let waveform = self.decoder.decode(item.path())?;
        let decoded_in = start.elapsed();

        self.renderer.render(&waveform, &output)?;

        tracing::debug!(
            input = %item,
            output = %output.display(),
            samples = waveform.len(),
            duration_seconds = format!("{:.2}", waveform.duration_seconds()),
            decode_ms = decoded_in.as_millis() as u64,
            total_ms = start.elapsed().as_millis() as u64,
            "Spectrogram generated"
        );

        Ok(output)
    }
}
