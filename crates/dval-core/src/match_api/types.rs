//! MATCH and CTDC payloads. Only the fields the validators read are modelled;
//! everything is optional because neither API guarantees presence.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Patient {
    pub patient_sequence_number: Option<String>,
    pub biopsies: Vec<Biopsy>,
    pub diseases: Vec<Disease>,
    pub gender: Option<String>,
    pub races: Vec<String>,
    pub ethnicity: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Biopsy {
    pub biopsy_type: Option<String>,
    pub next_generation_sequences: Vec<NextGenerationSequence>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NextGenerationSequence {
    pub status: Option<String>,
    pub ion_reporter_results: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Disease {
    pub ctep_term: Option<String>,
}

/// Sequenced file kinds a MATCH manifest lists per patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileType {
    DnaBam,
    RnaBam,
    Vcf,
    DnaBai,
    RnaBai,
}

impl FileType {
    pub const ALL: [FileType; 5] = [
        FileType::DnaBam,
        FileType::RnaBam,
        FileType::Vcf,
        FileType::DnaBai,
        FileType::RnaBai,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DNABam" => Some(FileType::DnaBam),
            "RNABam" => Some(FileType::RnaBam),
            "VCF" => Some(FileType::Vcf),
            "DNABai" => Some(FileType::DnaBai),
            "RNABai" => Some(FileType::RnaBai),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::DnaBam => "DNABam",
            FileType::RnaBam => "RNABam",
            FileType::Vcf => "VCF",
            FileType::DnaBai => "DNABai",
            FileType::RnaBai => "RNABai",
        }
    }

    /// Key under `ionReporterResults` holding this file's S3 path.
    pub fn ion_reporter_field(&self) -> &'static str {
        match self {
            FileType::DnaBam => "dnaBamFilePath",
            FileType::RnaBam => "rnaBamFilePath",
            FileType::Vcf => "vcfFilePath",
            FileType::DnaBai => "dnaBaiFilePath",
            FileType::RnaBai => "rnaBaiFilePath",
        }
    }
}

impl Patient {
    /// S3 paths recorded for `file_type` in confirmed sequencing runs of
    /// standard biopsies, in document order.
    pub fn file_paths(&self, file_type: FileType) -> Vec<&str> {
        self.biopsies
            .iter()
            .filter(|b| b.biopsy_type.as_deref() == Some("STANDARD"))
            .flat_map(|b| b.next_generation_sequences.iter())
            .filter(|s| s.status.as_deref() == Some("CONFIRMED"))
            .filter_map(|s| s.ion_reporter_results.as_ref()?.get(file_type.ion_reporter_field()))
            .filter_map(Value::as_str)
            .collect()
    }

    pub fn primary_disease(&self) -> Option<&str> {
        self.diseases.first().and_then(|d| d.ctep_term.as_deref())
    }

    pub fn primary_race(&self) -> Option<&str> {
        self.races.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreatmentArm {
    pub treatment_arm_id: Option<String>,
    pub version: Option<Value>,
    pub summary_report: SummaryReport,
    pub treatment_arm_drugs: Vec<Drug>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryReport {
    pub assignment_records: Vec<AssignmentRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssignmentRecord {
    pub patient_sequence_number: Option<Value>,
    pub slot: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Drug {
    pub name: Option<String>,
}

impl AssignmentRecord {
    /// Slot number; accepts JSON numbers and numeric strings, -1 when absent.
    pub fn slot(&self) -> i64 {
        match &self.slot {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(-1),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(-1),
            _ => -1,
        }
    }

    pub fn psn(&self) -> Option<String> {
        match &self.patient_sequence_number {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Order arm versions: numbers numerically, otherwise by their string form.
pub fn compare_versions(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => version_text(a).cmp(&version_text(b)),
    }
}

fn version_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Latest version among the arm documents MATCH returned.
pub fn latest_version(arms: Vec<TreatmentArm>) -> Option<TreatmentArm> {
    let mut latest: Option<TreatmentArm> = None;
    for arm in arms {
        let newer = match (&latest, &arm.version) {
            (None, _) => true,
            (Some(cur), Some(v)) => match &cur.version {
                Some(cv) => compare_versions(v, cv) == Ordering::Greater,
                None => true,
            },
            (Some(_), None) => false,
        };
        if newer {
            latest = Some(arm);
        }
    }
    latest
}

/// One case as the CTDC API presents it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CaseOverview {
    pub case_id: Option<String>,
    pub clinical_trial_code: Option<String>,
    pub clinical_trial_id: Option<String>,
    pub arm_id: Option<String>,
    pub arm_drug: Option<String>,
    pub disease: Option<String>,
    pub gender: Option<String>,
    pub race: Option<String>,
    pub ethnicity: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patient() -> Patient {
        serde_json::from_value(json!({
            "patientSequenceNumber": "10368",
            "gender": "FEMALE",
            "ethnicity": "NOT_HISPANIC",
            "races": ["WHITE", "ASIAN"],
            "diseases": [{"ctepTerm": "Adenocarcinoma"}, {"ctepTerm": "Other"}],
            "biopsies": [
                {"biopsyType": "CONTROL", "nextGenerationSequences": [
                    {"status": "CONFIRMED", "ionReporterResults": {"vcfFilePath": "s3://b/control.vcf"}}
                ]},
                {"biopsyType": "STANDARD", "nextGenerationSequences": [
                    {"status": "REJECTED", "ionReporterResults": {"vcfFilePath": "s3://b/rejected.vcf"}},
                    {"status": "CONFIRMED", "ionReporterResults": {
                        "vcfFilePath": "s3://b/MSN1/good.vcf",
                        "dnaBamFilePath": "s3://b/MSN1/dna.bam",
                        "rnaBaiFilePath": null
                    }}
                ]}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn file_paths_only_from_confirmed_standard() {
        let p = patient();
        assert_eq!(p.file_paths(FileType::Vcf), vec!["s3://b/MSN1/good.vcf"]);
        assert_eq!(p.file_paths(FileType::DnaBam), vec!["s3://b/MSN1/dna.bam"]);
        assert!(p.file_paths(FileType::RnaBai).is_empty());
        assert!(p.file_paths(FileType::RnaBam).is_empty());
    }

    #[test]
    fn primary_fields() {
        let p = patient();
        assert_eq!(p.primary_disease(), Some("Adenocarcinoma"));
        assert_eq!(p.primary_race(), Some("WHITE"));
        assert!(Patient::default().primary_race().is_none());
    }

    #[test]
    fn file_type_names() {
        for t in FileType::ALL {
            assert_eq!(FileType::parse(t.as_str()), Some(t));
        }
        assert_eq!(FileType::parse("dnabam"), None);
    }

    #[test]
    fn slot_accepts_numbers_and_strings() {
        let r: AssignmentRecord = serde_json::from_value(json!({"slot": "3"})).unwrap();
        assert_eq!(r.slot(), 3);
        let r: AssignmentRecord = serde_json::from_value(json!({"slot": 0, "patientSequenceNumber": 42})).unwrap();
        assert_eq!(r.slot(), 0);
        assert_eq!(r.psn().as_deref(), Some("42"));
        assert_eq!(AssignmentRecord::default().slot(), -1);
    }

    #[test]
    fn latest_version_numeric_and_string() {
        let arms: Vec<TreatmentArm> = serde_json::from_value(json!([
            {"version": 2}, {"version": 10}, {"version": 9}
        ]))
        .unwrap();
        assert_eq!(latest_version(arms).unwrap().version, Some(json!(10)));

        let arms: Vec<TreatmentArm> = serde_json::from_value(json!([
            {"version": "2016-01-01"}, {"version": "2017-05-30"}, {}
        ]))
        .unwrap();
        assert_eq!(latest_version(arms).unwrap().version, Some(json!("2017-05-30")));
        assert!(latest_version(Vec::new()).is_none());
    }
}
