//! CTDC case metadata cross-checked against MATCH.
//!
//! The MATCH side is summarised first: for each configured treatment arm, the
//! latest arm version gives the assigned patients and the arm drug. Every CTDC
//! case is then compared field by field with that roster and with the MATCH
//! patient record. Finally the set of cases must equal the set of assigned
//! patients.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::error::CheckError;
use crate::match_api::{latest_version, CaseOverview, MatchApi, Patient, SimpleCipher};
use crate::report::{ReportRow, ReportWriter};
use crate::sweep::{run_sweep, SweepProgress};

use super::log_check;

pub const ARM_PREFIX: &str = "EAY131-";
pub const CASE_PREFIX: &str = "CTDC-";
pub const TRIAL_CODE: &str = "NCI-MATCH";
pub const REPORT_PREFIX: &str = "Metadata_Validation_Result";

/// Arm id as CTDC spells it (`EAY131-Z1D` becomes `Z1D`).
pub fn ctdc_arm_id(arm_id: &str) -> &str {
    arm_id.strip_prefix(ARM_PREFIX).unwrap_or(arm_id)
}

/// Assigned patients and their arm drug, per CTDC arm id.
#[derive(Debug, Default, Clone)]
pub struct ArmRoster {
    arms: Vec<String>,
    patients: BTreeMap<String, BTreeMap<String, String>>,
}

impl ArmRoster {
    /// Fetch every arm in `arms` (MATCH ids). Any arm failing to load is fatal.
    pub fn load<A: MatchApi>(api: &A, arms: &[String]) -> Result<Self> {
        let mut roster = Self {
            arms: arms.to_vec(),
            patients: BTreeMap::new(),
        };
        for arm_id in arms {
            let versions = api
                .treatment_arm(arm_id)
                .with_context(|| format!("retrieve treatment arm {}", arm_id))?;
            let arm = latest_version(versions)
                .with_context(|| format!("MATCH returned no versions of arm {}", arm_id))?;

            let drug = match arm.treatment_arm_drugs.as_slice() {
                [only] => only.name.clone().unwrap_or_default(),
                drugs => {
                    tracing::error!("Arm {} has {} drugs!", arm_id, drugs.len());
                    String::new()
                }
            };
            let assigned: BTreeMap<String, String> = arm
                .summary_report
                .assignment_records
                .iter()
                .filter(|r| r.slot() > 0)
                .filter_map(|r| r.psn())
                .map(|psn| (psn, drug.clone()))
                .collect();
            tracing::info!(arm = %arm_id, patients = assigned.len(), drug = %drug, "arm loaded");
            roster.patients.insert(ctdc_arm_id(arm_id).to_string(), assigned);
        }
        Ok(roster)
    }

    pub fn insert(&mut self, ctdc_arm: &str, psn: &str, drug: &str) {
        self.patients
            .entry(ctdc_arm.to_string())
            .or_default()
            .insert(psn.to_string(), drug.to_string());
    }

    /// Drug for `psn` in `arm`, `None` if the patient is not assigned there.
    pub fn drug(&self, arm: &str, psn: &str) -> Option<&str> {
        self.patients.get(arm)?.get(psn).map(String::as_str)
    }

    pub fn all_patients(&self) -> BTreeSet<&str> {
        self.patients
            .values()
            .flat_map(|p| p.keys().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataRow {
    pub case_id: String,
    #[serde(rename = "Validation_result")]
    pub passed: bool,
    #[serde(rename = "Trial correct")]
    pub trial: bool,
    #[serde(rename = "Arm correct")]
    pub arm: bool,
    #[serde(rename = "Arm drug correct")]
    pub arm_drug: bool,
    #[serde(rename = "Diagnosis correct")]
    pub diagnosis: bool,
    #[serde(rename = "Gender correct")]
    pub gender: bool,
    #[serde(rename = "Race correct")]
    pub race: bool,
    #[serde(rename = "Ethnicity correct")]
    pub ethnicity: bool,
}

impl ReportRow for MetadataRow {
    const HEADERS: &'static [&'static str] = &[
        "case_id",
        "Validation_result",
        "Trial correct",
        "Arm correct",
        "Arm drug correct",
        "Diagnosis correct",
        "Gender correct",
        "Race correct",
        "Ethnicity correct",
    ];

    fn succeeded(&self) -> bool {
        self.passed
    }
}

fn same(actual: Option<&str>, expected: Option<&str>) -> bool {
    actual.is_some() && actual == expected
}

pub struct MetadataValidator<'a, A: MatchApi> {
    api: &'a mut A,
    cipher: SimpleCipher,
    roster: &'a ArmRoster,
    cases: BTreeSet<String>,
}

impl<'a, A: MatchApi> MetadataValidator<'a, A> {
    pub fn new(api: &'a mut A, cipher: SimpleCipher, roster: &'a ArmRoster) -> Self {
        Self {
            api,
            cipher,
            roster,
            cases: BTreeSet::new(),
        }
    }

    fn psn(&self, case_id: &str) -> Result<String, CheckError> {
        let raw = case_id.strip_prefix(CASE_PREFIX).unwrap_or(case_id);
        self.cipher
            .decipher(raw)
            .map_err(|e| CheckError::MalformedInput(format!("case {:?}: {}", case_id, e)))
    }

    pub fn check(&mut self, case: &CaseOverview) -> MetadataRow {
        let case_id = case.case_id.clone().unwrap_or_default();
        let mut row = MetadataRow {
            case_id: case_id.clone(),
            trial: case.clinical_trial_code.as_deref() == Some(TRIAL_CODE),
            ..Default::default()
        };

        let psn = match self.psn(&case_id) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("{}", e);
                log_check(&format!("case {}", case_id), false);
                return row;
            }
        };
        self.cases.insert(psn.clone());

        let arm_id = case.arm_id.as_deref().unwrap_or("");
        let roster_drug = self.roster.drug(arm_id, &psn);
        row.arm = roster_drug.is_some();
        row.arm_drug = roster_drug.is_some() && case.arm_drug.as_deref() == roster_drug;

        match self.api.patient(&psn) {
            Ok(Some(patient)) => self.check_patient(case, &patient, &mut row),
            Ok(None) => tracing::error!(case = %case_id, psn = %psn, "patient not found in MATCH"),
            Err(e) => tracing::error!(case = %case_id, psn = %psn, "patient lookup failed: {}", e),
        }

        row.passed = row.trial
            && row.arm
            && row.arm_drug
            && row.diagnosis
            && row.gender
            && row.race
            && row.ethnicity;
        log_check(&format!("case {}({})", case_id, psn), row.passed);
        row
    }

    fn check_patient(&self, case: &CaseOverview, patient: &Patient, row: &mut MetadataRow) {
        row.diagnosis = same(case.disease.as_deref(), patient.primary_disease());
        row.gender = same(case.gender.as_deref(), patient.gender.as_deref());
        row.race = same(case.race.as_deref(), patient.primary_race());
        row.ethnicity = same(case.ethnicity.as_deref(), patient.ethnicity.as_deref());
    }

    /// Deciphered patient ids of every case checked so far.
    pub fn cases(&self) -> &BTreeSet<String> {
        &self.cases
    }
}

/// Cases and arm patients must be the same set. One message per discrepancy.
pub fn validate_patient_count(roster: &ArmRoster, cases: &BTreeSet<String>) -> Vec<String> {
    let assigned = roster.all_patients();
    let mut problems = Vec::new();
    for psn in cases {
        if !assigned.contains(psn.as_str()) {
            problems.push(format!(
                "Patient \"{}\" is not a valid patient in given arms: {:?}",
                psn, roster.arms
            ));
        }
    }
    for psn in &assigned {
        if !cases.contains(*psn) {
            problems.push(format!("Patient \"{}\" is missing in the manifest!", psn));
        }
    }
    problems
}

#[derive(Debug)]
pub struct MetadataSummary {
    pub progress: SweepProgress,
    pub count_problems: Vec<String>,
    pub running_secs: f64,
}

pub fn validate_metadata<A: MatchApi, W: Write>(
    cases: Vec<CaseOverview>,
    validator: &mut MetadataValidator<'_, A>,
    report: &mut ReportWriter<MetadataRow, W>,
    progress_every: usize,
) -> Result<MetadataSummary> {
    let started = Instant::now();
    let progress = run_sweep(
        "match-metadata",
        cases,
        report,
        |case| validator.check(&case),
        progress_every,
    )?;

    let count_problems = validate_patient_count(validator.roster, validator.cases());
    for p in &count_problems {
        tracing::error!("{}", p);
    }
    if count_problems.is_empty() {
        log_check("Patient count", true);
    } else {
        tracing::error!("Validate patient count failed!");
    }

    let running_secs = started.elapsed().as_secs_f64();
    tracing::info!("Running time: {:.2} seconds", running_secs);
    tracing::info!(
        "Cases processed: {}, validation succeeded: {}",
        progress.processed,
        progress.succeeded
    );
    Ok(MetadataSummary {
        progress,
        count_problems,
        running_secs,
    })
}
