//! Tiered comparison of a source object against its copy.
//!
//! A `Strategy` is an ordered list of stages. Each stage either reaches a
//! verdict or passes the pair on to the next, more expensive stage; the first
//! conclusive verdict wins. Errors raised by a stage become a `Failed` outcome
//! carrying the error message, so one bad object never stops a sweep.

mod stages;

use crate::checksum::DigestAlgorithm;
use crate::error::CheckError;
use crate::report::Outcome;
use crate::store::{ObjectInfo, ObjectStore};

pub use stages::{DigestStage, SizeStage, TagStage};

/// Both sides of one comparison, metadata already fetched.
pub struct ObjectPair<'a> {
    pub source: &'a ObjectInfo,
    pub dest: &'a ObjectInfo,
    pub source_store: &'a dyn ObjectStore,
    pub dest_store: &'a dyn ObjectStore,
}

/// Result of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Conclusive(Outcome),
    /// Nothing decided; hand the pair to the next stage.
    Continue,
}

pub trait Stage {
    fn name(&self) -> &'static str;

    fn check(&self, pair: &ObjectPair<'_>) -> Result<Verdict, CheckError>;
}

pub struct Strategy {
    stages: Vec<Box<dyn Stage>>,
    fallback: Outcome,
}

impl Strategy {
    /// Tag, then size, then content digest. Used for copy validation.
    pub fn tiered(algorithm: DigestAlgorithm, chunk_bytes: usize) -> Self {
        Self {
            stages: vec![
                Box::new(TagStage),
                Box::new(SizeStage),
                Box::new(DigestStage::new(algorithm, chunk_bytes)),
            ],
            fallback: Outcome::failed("inconclusive"),
        }
    }

    /// Tag comparison only; anything but equal tags fails.
    pub fn tags_only() -> Self {
        Self {
            stages: vec![Box::new(TagStage)],
            fallback: Outcome::failed("tags differ"),
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn evaluate(&self, pair: &ObjectPair<'_>) -> Outcome {
        for stage in &self.stages {
            match stage.check(pair) {
                Ok(Verdict::Conclusive(outcome)) => {
                    tracing::debug!(
                        key = %pair.source.key,
                        stage = stage.name(),
                        status = %outcome.status,
                        reason = %outcome.reason,
                        "conclusive"
                    );
                    return outcome;
                }
                Ok(Verdict::Continue) => {
                    tracing::trace!(key = %pair.source.key, stage = stage.name(), "pass through");
                }
                Err(e) => {
                    tracing::warn!(key = %pair.source.key, stage = stage.name(), error = %e, "stage failed");
                    return Outcome::failed(e.to_string());
                }
            }
        }
        self.fallback.clone()
    }
}
