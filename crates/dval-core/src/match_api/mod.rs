//! NCI-MATCH API client, CTDC case listing and the patient id cipher.

mod cipher;
mod ctdc;
mod types;

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::json;

use crate::error::CheckError;
use crate::http::HttpClient;

pub use cipher::{CipherError, SimpleCipher};
pub use ctdc::{fetch_case_overview, CASE_OVERVIEW_QUERY};
pub use types::{
    compare_versions, latest_version, AssignmentRecord, Biopsy, CaseOverview, Disease, Drug,
    FileType, NextGenerationSequence, Patient, SummaryReport, TreatmentArm,
};

/// What the MATCH validators need from the MATCH API.
pub trait MatchApi {
    /// Patient metadata, `None` when MATCH answers 404 for the patient.
    fn patient(&mut self, psn: &str) -> Result<Option<Rc<Patient>>, CheckError>;

    /// Every stored version of a treatment arm.
    fn treatment_arm(&self, arm_id: &str) -> Result<Vec<TreatmentArm>, CheckError>;

    /// Short-lived download URL for a file MATCH tracks for `psn`.
    fn signed_download_url(&self, psn: &str, s3_url: &str) -> Result<String, CheckError>;

    /// Stream a signed URL into `sink`; no MATCH credentials are sent.
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64, CheckError>;
}

#[derive(Deserialize)]
struct SignedUrl {
    download_url: String,
}

/// Blocking MATCH client. Patient documents are cached for the client's lifetime.
pub struct MatchClient {
    base_url: String,
    api: HttpClient,
    plain: HttpClient,
    patients: HashMap<String, Rc<Patient>>,
}

impl MatchClient {
    /// `token` is sent verbatim as the `Authorization` header.
    pub fn new(base_url: &str, token: &str, http: HttpClient) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api: http.clone().with_header("Authorization", token),
            plain: http,
            patients: HashMap::new(),
        }
    }

    fn url(&self, parts: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for p in parts {
            url.push('/');
            url.push_str(p);
        }
        url
    }

    pub fn cached_patients(&self) -> usize {
        self.patients.len()
    }
}

impl MatchApi for MatchClient {
    fn patient(&mut self, psn: &str) -> Result<Option<Rc<Patient>>, CheckError> {
        if let Some(p) = self.patients.get(psn) {
            return Ok(Some(Rc::clone(p)));
        }
        let url = self.url(&["patients", psn]);
        match self.api.get_json::<Patient>(&url) {
            Ok(p) => {
                let p = Rc::new(p);
                self.patients.insert(psn.to_string(), Rc::clone(&p));
                Ok(Some(p))
            }
            Err(CheckError::NotFound(_)) => {
                tracing::warn!(psn, "patient not found in MATCH");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn treatment_arm(&self, arm_id: &str) -> Result<Vec<TreatmentArm>, CheckError> {
        self.api.get_json(&self.url(&["treatment_arms", arm_id]))
    }

    fn signed_download_url(&self, psn: &str, s3_url: &str) -> Result<String, CheckError> {
        let url = self.url(&["patients", psn, "download_url"]);
        let signed: SignedUrl = self.api.post_json(&url, &json!({ "s3_url": s3_url }))?;
        Ok(signed.download_url)
    }

    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64, CheckError> {
        self.plain.get_into(url, sink)
    }
}
