//! Extract, transform, load

use crate::config::EtlConfig;
use crate::error::Result;
use crate::extract::Extractor;
use crate::http::Transport;
use crate::load::Loader;
use crate::record::Record;
use crate::transform::Transformer;
use tracing::info;

/// What a completed run did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineSummary {
    pub extracted: usize,
    pub batches_posted: usize,
    pub records_posted: usize,
}

/// Runs the three stages in sequence
pub struct Pipeline<T> {
    extractor: Extractor<T>,
    transformer: Transformer,
    loader: Loader<T>,
}

impl<T: Transport> Pipeline<T> {
    pub fn new(extractor: Extractor<T>, transformer: Transformer, loader: Loader<T>) -> Self {
        Self {
            extractor,
            transformer,
            loader,
        }
    }

    /// Build every stage from one config, sharing `transport`
    pub fn from_config(transport: T, config: &EtlConfig) -> Self
    where
        T: Clone,
    {
        Self::new(
            Extractor::from_config(transport.clone(), config),
            Transformer::new(),
            Loader::from_config(transport, config),
        )
    }

    /// Run the whole pipeline once
    ///
    /// Extraction never fails outright; a delivery error is returned as-is.
    pub async fn run(&self) -> Result<PipelineSummary> {
        info!("Fetching all animals...");
        let animals = self.extractor.fetch_all().await;
        info!("Fetched {} animals", animals.len());

        info!("Transforming animals...");
        let extracted = animals.len();
        let transformed: Vec<Record> = animals
            .into_iter()
            .map(|animal| self.transformer.transform(animal))
            .collect();

        info!("Posting animals in batches...");
        let batches_posted = self.loader.post_all(&transformed).await?;

        info!("ETL completed successfully!");
        Ok(PipelineSummary {
            extracted,
            batches_posted,
            records_posted: transformed.len(),
        })
    }
}
