//! Animal ETL Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Pulls animal records from a paginated source API, normalizes them, and
//! posts them in batches to a destination endpoint.
//!
//! # Overview
//!
//! - **Extract**: walk the listing pages and fetch each animal's detail
//!   ([`extract::Extractor`])
//! - **Transform**: split `friends` into a list and convert `born_at` to UTC
//!   ([`transform::Transformer`])
//! - **Load**: post fixed-size batches as JSON arrays ([`load::Loader`])
//!
//! Every HTTP call goes through [`retry::RetryPolicy`], which retries
//! transport failures and 500/502/503/504 responses with exponential backoff.
//!
//! # Example
//!
//! ```no_run
//! use animal_etl::{EtlConfig, Pipeline, ReqwestTransport};
//!
//! # async fn run() -> animal_etl::Result<()> {
//! let config = EtlConfig::new(
//!     "http://localhost:3123/animals/v1/animals",
//!     "http://localhost:3123/animals/v1/home",
//! );
//! let summary = Pipeline::from_config(ReqwestTransport::new()?, &config).run().await?;
//! println!("posted {} animals", summary.records_posted);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod load;
pub mod pipeline;
pub mod record;
pub mod retry;
pub mod transform;

#[cfg(test)]
mod test_support;

pub use config::{ConfigOverrides, EtlConfig};
pub use error::{EtlError, Result};
pub use extract::Extractor;
pub use http::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use load::Loader;
pub use pipeline::{Pipeline, PipelineSummary};
pub use record::Record;
pub use retry::RetryPolicy;
pub use transform::Transformer;
