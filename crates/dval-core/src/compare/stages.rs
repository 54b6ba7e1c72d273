use std::io::{BufWriter, Write};

use super::{ObjectPair, Stage, Verdict};
use crate::checksum::{DigestAlgorithm, DigestSink};
use crate::error::CheckError;
use crate::report::Outcome;
use crate::store::ObjectStore;

/// Equal provider tags prove equality. Missing tags decide nothing.
pub struct TagStage;

impl Stage for TagStage {
    fn name(&self) -> &'static str {
        "tag"
    }

    fn check(&self, pair: &ObjectPair<'_>) -> Result<Verdict, CheckError> {
        match (&pair.source.tag, &pair.dest.tag) {
            (Some(a), Some(b)) if a == b => Ok(Verdict::Conclusive(Outcome::succeeded("tags match"))),
            _ => Ok(Verdict::Continue),
        }
    }
}

/// Different sizes prove inequality.
pub struct SizeStage;

impl Stage for SizeStage {
    fn name(&self) -> &'static str {
        "size"
    }

    fn check(&self, pair: &ObjectPair<'_>) -> Result<Verdict, CheckError> {
        if pair.source.size != pair.dest.size {
            Ok(Verdict::Conclusive(Outcome::failed("size mismatch")))
        } else {
            Ok(Verdict::Continue)
        }
    }
}

/// Streams both objects through a digest in fixed-size chunks.
pub struct DigestStage {
    algorithm: DigestAlgorithm,
    chunk_bytes: usize,
}

impl DigestStage {
    pub fn new(algorithm: DigestAlgorithm, chunk_bytes: usize) -> Self {
        Self {
            algorithm,
            chunk_bytes: chunk_bytes.max(1),
        }
    }

    fn digest(&self, store: &dyn ObjectStore, key: &str) -> Result<String, CheckError> {
        let mut sink = BufWriter::with_capacity(self.chunk_bytes, DigestSink::new(self.algorithm));
        store.stream(key, &mut sink)?;
        sink.flush()?;
        let sink = sink.into_inner().map_err(|e| CheckError::Io(e.into_error()))?;
        tracing::trace!(bucket = store.bucket(), key, bytes = sink.bytes(), "digested");
        Ok(sink.finalize_hex())
    }
}

impl Stage for DigestStage {
    fn name(&self) -> &'static str {
        "digest"
    }

    fn check(&self, pair: &ObjectPair<'_>) -> Result<Verdict, CheckError> {
        let a = self.digest(pair.source_store, &pair.source.key)?;
        let b = self.digest(pair.dest_store, &pair.dest.key)?;
        let outcome = if a == b {
            Outcome::succeeded("digests match")
        } else {
            tracing::debug!(key = %pair.source.key, source = %a, dest = %b, algorithm = %self.algorithm, "digest mismatch");
            Outcome::failed("digests differ")
        };
        Ok(Verdict::Conclusive(outcome))
    }
}
