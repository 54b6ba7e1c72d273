//! Copy the files of a case list out of a flat directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::manifest::Manifest;

pub const PATIENT_ID: &str = "patient_id";

#[derive(Debug, Default)]
pub struct PickSummary {
    /// File names copied per patient id, in case-file order of first appearance.
    pub files: Vec<(String, Vec<String>)>,
    pub copied: usize,
}

impl PickSummary {
    pub fn patients_with_files(&self) -> usize {
        self.files.iter().filter(|(_, f)| !f.is_empty()).count()
    }
}

/// Read patient ids from the `patient_id` column of a TSV case file.
pub fn read_patient_ids(case_file: &Path) -> Result<Vec<String>> {
    let manifest = Manifest::read_tsv(case_file)?;
    let mut ids: Vec<String> = Vec::new();
    for row in &manifest.rows {
        if let Some(id) = row.get_opt(PATIENT_ID) {
            if !ids.iter().any(|i| i == id) {
                ids.push(id.to_string());
            }
        }
    }
    if ids.is_empty() {
        bail!("No patient ids found in file: \"{}\"", case_file.display());
    }
    Ok(ids)
}

/// Regular files directly inside `dir`, sorted. Unreadable entries are errors.
fn files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry.with_context(|| format!("read entry in {}", dir.display()))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Copy every regular file in `source` whose name contains one of `ids` into
/// `dest`. A file goes to the first id (in list order) it matches.
pub fn pick_files(ids: &[String], source: &Path, dest: &Path) -> Result<PickSummary> {
    if !source.is_dir() {
        bail!("{} is not a folder!", source.display());
    }
    if dest.exists() && !dest.is_dir() {
        bail!("{} is not a folder!", dest.display());
    }
    if !dest.exists() {
        fs::create_dir_all(dest).with_context(|| format!("Can't create folder: {}", dest.display()))?;
        tracing::info!("Dest folder \"{}\" created!", dest.display());
    }

    let entries = files_in(source)?;

    let mut by_patient: BTreeMap<&str, Vec<String>> = ids.iter().map(|i| (i.as_str(), Vec::new())).collect();
    let mut copied = 0;
    for path in entries {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(id) = ids.iter().find(|id| name.contains(id.as_str())) {
            tracing::info!("Copying file {}", name);
            fs::copy(&path, dest.join(name))
                .with_context(|| format!("copy {} to {}", path.display(), dest.display()))?;
            if let Some(files) = by_patient.get_mut(id.as_str()) {
                files.push(name.to_string());
            }
            copied += 1;
        }
    }

    let files = ids
        .iter()
        .map(|id| (id.clone(), by_patient.remove(id.as_str()).unwrap_or_default()))
        .collect();
    let summary = PickSummary { files, copied };
    tracing::info!(
        "{} files picked for {} patients!",
        summary.copied,
        summary.patients_with_files()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), name.as_bytes()).unwrap();
    }

    #[test]
    fn files_in_is_sorted_and_skips_folders() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "b.bam");
        touch(tmp.path(), "a.vcf");
        fs::create_dir(tmp.path().join("a_dir")).unwrap();

        let names: Vec<_> = files_in(tmp.path())
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.vcf", "b.bam"]);

        let err = files_in(&tmp.path().join("missing")).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn copies_matching_files_first_id_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir(&src).unwrap();
        touch(&src, "MSN100_dna.bam");
        touch(&src, "MSN100_MSN200.vcf");
        touch(&src, "MSN200_rna.bam");
        touch(&src, "unrelated.txt");
        fs::create_dir(src.join("MSN100_dir")).unwrap();

        let dest = tmp.path().join("out/nested");
        let ids = vec!["MSN100".to_string(), "MSN200".to_string(), "MSN300".to_string()];
        let summary = pick_files(&ids, &src, &dest).unwrap();

        assert_eq!(summary.copied, 3);
        assert_eq!(summary.patients_with_files(), 2);
        assert_eq!(summary.files[0].1, vec!["MSN100_MSN200.vcf", "MSN100_dna.bam"]);
        assert_eq!(summary.files[1].1, vec!["MSN200_rna.bam"]);
        assert!(summary.files[2].1.is_empty());
        assert!(dest.join("MSN200_rna.bam").is_file());
        assert!(!dest.join("unrelated.txt").exists());
    }

    #[test]
    fn rejects_bad_folders() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("plain");
        touch(tmp.path(), "plain");
        let ids = vec!["X".to_string()];
        assert!(pick_files(&ids, &file, tmp.path()).is_err());
        assert!(pick_files(&ids, tmp.path(), &file).is_err());
    }

    #[test]
    fn case_file_needs_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let empty = tmp.path().join("cases.tsv");
        fs::write(&empty, "patient_id\tarm\n").unwrap();
        assert!(read_patient_ids(&empty).is_err());

        let cases = tmp.path().join("cases2.tsv");
        fs::write(&cases, "patient_id\tarm\nMSN1\tA\nMSN2\tB\nMSN1\tC\n").unwrap();
        assert_eq!(read_patient_ids(&cases).unwrap(), vec!["MSN1", "MSN2"]);
    }
}
