//! MATCH file manifest validation.
//!
//! Each manifest row names a sequencing file for a ciphered patient. The file
//! must be the one MATCH records for that patient and type, and its content as
//! served by MATCH must have the manifest MD5. Optionally the copy in our own
//! storage is checked as well.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::checksum::{DigestAlgorithm, DigestSink};
use crate::error::CheckError;
use crate::location::{basename, S3Location};
use crate::manifest::ManifestRow;
use crate::match_api::{FileType, MatchApi, SimpleCipher};
use crate::report::{ReportRow, ReportWriter};
use crate::store::Buckets;
use crate::sweep::{run_sweep, SweepProgress};

use super::log_check;

pub const FILE_NAME: &str = "file_name";
pub const MD5: &str = "md5sum";
pub const PSN: &str = "patientSequenceNumber";
pub const FILE_TYPE: &str = "file_type";
pub const FILE_LOCATION: &str = "file_locations";
pub const REPORT_PREFIX: &str = "match-manifest-validation";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestCheckRow {
    pub file_name: String,
    #[serde(rename = "patientSequenceNumber")]
    pub psn: String,
    pub file_type: String,
    #[serde(rename = "Patient correct")]
    pub patient_correct: bool,
    #[serde(rename = "MATCH MD5 correct")]
    pub match_md5_correct: bool,
    /// Only set when storage checks are enabled and the row has a location.
    #[serde(rename = "File exists")]
    pub file_exists: Option<bool>,
    #[serde(rename = "MD5 correct")]
    pub md5_correct: Option<bool>,
    #[serde(rename = "Validation_result")]
    pub passed: bool,
    pub reason: String,
}

impl ReportRow for ManifestCheckRow {
    const HEADERS: &'static [&'static str] = &[
        "file_name",
        "patientSequenceNumber",
        "file_type",
        "Patient correct",
        "MATCH MD5 correct",
        "File exists",
        "MD5 correct",
        "Validation_result",
        "reason",
    ];

    fn succeeded(&self) -> bool {
        self.passed
    }
}

/// Files seen per patient and type, for the file count rule.
#[derive(Debug, Default)]
pub struct PatientFiles {
    patients: BTreeMap<String, BTreeMap<FileType, BTreeMap<String, usize>>>,
}

impl PatientFiles {
    pub fn record(&mut self, psn: &str, file_type: FileType, file_name: &str) {
        *self
            .patients
            .entry(psn.to_string())
            .or_default()
            .entry(file_type)
            .or_default()
            .entry(file_name.to_string())
            .or_default() += 1;
    }

    pub fn patient_count(&self) -> usize {
        self.patients.len()
    }

    /// Every patient must have exactly one file of each type, each listed once.
    /// Returns one message per deviation; empty means the rule holds.
    pub fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (psn, types) in &self.patients {
            for t in FileType::ALL {
                match types.get(&t) {
                    None => out.push(format!("patient {}: no {} file", psn, t.as_str())),
                    Some(files) => {
                        if files.len() > 1 {
                            let names: Vec<&str> = files.keys().map(String::as_str).collect();
                            out.push(format!(
                                "patient {}: {} {} files: {}",
                                psn,
                                files.len(),
                                t.as_str(),
                                names.join(", ")
                            ));
                        }
                        for (name, n) in files {
                            if *n > 1 {
                                out.push(format!("patient {}: {} listed {} times", psn, name, n));
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

pub struct ManifestValidator<'a, A: MatchApi> {
    api: &'a mut A,
    cipher: SimpleCipher,
    storage: Option<&'a mut Buckets>,
    files: PatientFiles,
}

impl<'a, A: MatchApi> ManifestValidator<'a, A> {
    /// `storage` enables the `File exists` and `MD5 correct` checks.
    pub fn new(api: &'a mut A, cipher: SimpleCipher, storage: Option<&'a mut Buckets>) -> Self {
        Self {
            api,
            cipher,
            storage,
            files: PatientFiles::default(),
        }
    }

    pub fn files(&self) -> &PatientFiles {
        &self.files
    }

    pub fn check(&mut self, row: &ManifestRow) -> ManifestCheckRow {
        let mut out = ManifestCheckRow {
            file_name: row.get_opt(FILE_NAME).unwrap_or("").to_string(),
            psn: row.get_opt(PSN).unwrap_or("").to_string(),
            file_type: row.get_opt(FILE_TYPE).unwrap_or("").to_string(),
            ..Default::default()
        };
        let mut reasons = Vec::new();
        if let Err(e) = self.check_match(row, &mut out, &mut reasons) {
            reasons.push(e.to_string());
        }
        if self.storage.is_some() {
            if let Some(location) = row.get_opt(FILE_LOCATION) {
                self.check_storage(row, location, &mut out, &mut reasons);
            }
        }
        out.passed = out.patient_correct
            && out.match_md5_correct
            && out.file_exists.unwrap_or(true)
            && out.md5_correct.unwrap_or(true);
        out.reason = reasons.join("; ");
        log_check(&format!("{} ({})", out.file_name, out.psn), out.passed);
        out
    }

    fn check_match(
        &mut self,
        row: &ManifestRow,
        out: &mut ManifestCheckRow,
        reasons: &mut Vec<String>,
    ) -> Result<(), CheckError> {
        let file_name = row.get(FILE_NAME)?;
        let expected_md5 = row.get(MD5)?;
        let raw_type = row.get(FILE_TYPE)?;
        let file_type = FileType::parse(raw_type).ok_or_else(|| {
            CheckError::MalformedInput(format!("row {}: unknown file type {:?}", row.index + 1, raw_type))
        })?;
        let psn = self
            .cipher
            .decipher(row.get(PSN)?)
            .map_err(|e| CheckError::MalformedInput(format!("row {}: {}", row.index + 1, e)))?;
        self.files.record(&psn, file_type, file_name);

        let patient = match self.api.patient(&psn)? {
            Some(p) => p,
            None => {
                reasons.push(format!("patient {} not found in MATCH", psn));
                return Ok(());
            }
        };
        let s3_path = patient
            .file_paths(file_type)
            .into_iter()
            .find(|p| basename(p).as_deref() == Some(file_name))
            .map(str::to_string);
        let s3_path = match s3_path {
            Some(p) => p,
            None => {
                reasons.push(format!("no {} file {} for patient {}", raw_type, file_name, psn));
                return Ok(());
            }
        };
        out.patient_correct = true;

        let signed = self.api.signed_download_url(&psn, &s3_path)?;
        let mut sink = DigestSink::new(DigestAlgorithm::Md5);
        self.api.download(&signed, &mut sink)?;
        let md5 = sink.finalize_hex();
        out.match_md5_correct = md5.eq_ignore_ascii_case(expected_md5);
        if !out.match_md5_correct {
            reasons.push(format!("MATCH MD5 {} differs from manifest", md5));
        }
        Ok(())
    }

    fn check_storage(
        &mut self,
        row: &ManifestRow,
        location: &str,
        out: &mut ManifestCheckRow,
        reasons: &mut Vec<String>,
    ) {
        let Some(buckets) = self.storage.as_deref_mut() else {
            return;
        };
        let result = (|| -> Result<(), CheckError> {
            let loc = S3Location::parse(location)?;
            let store = buckets.get(&loc.bucket)?;
            match store.head(&loc.key) {
                Ok(_) => out.file_exists = Some(true),
                Err(CheckError::NotFound(_)) => {
                    out.file_exists = Some(false);
                    out.md5_correct = Some(false);
                    reasons.push(format!("{} does not exist", location));
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
            log_check(&format!("{} exists", location), true);
            let mut sink = DigestSink::new(DigestAlgorithm::Md5);
            store.stream(&loc.key, &mut sink)?;
            let md5 = sink.finalize_hex();
            let ok = row.get_opt(MD5).is_some_and(|m| md5.eq_ignore_ascii_case(m));
            out.md5_correct = Some(ok);
            log_check(&format!("{} MD5", location), ok);
            if !ok {
                reasons.push(format!("stored MD5 {} differs from manifest", md5));
            }
            Ok(())
        })();
        if let Err(e) = result {
            out.file_exists.get_or_insert(false);
            out.md5_correct = Some(false);
            reasons.push(e.to_string());
        }
    }
}

/// Result of a manifest validation run.
#[derive(Debug)]
pub struct ManifestSummary {
    pub progress: SweepProgress,
    pub patients: usize,
    /// Deviations from the per-patient file count rule.
    pub count_problems: Vec<String>,
}

pub fn validate_manifest<A: MatchApi, W: Write>(
    rows: &[ManifestRow],
    validator: &mut ManifestValidator<'_, A>,
    report: &mut ReportWriter<ManifestCheckRow, W>,
    progress_every: usize,
) -> Result<ManifestSummary> {
    let progress = run_sweep(
        "match-manifest",
        rows.iter().collect(),
        report,
        |row: &ManifestRow| validator.check(row),
        progress_every,
    )?;

    let count_problems = validator.files().problems();
    for p in &count_problems {
        tracing::error!("{}", p);
    }
    if count_problems.is_empty() {
        log_check("Patient file count", true);
    } else {
        tracing::error!("Patient file count failed!");
    }
    Ok(ManifestSummary {
        progress,
        patients: validator.files().patient_count(),
        count_problems,
    })
}
