//! `dval pick-files`: copy files belonging to listed cases.

use std::path::Path;

use anyhow::Result;
use dval_core::validators::pick_files::{pick_files, read_patient_ids};

pub fn run_pick_files(case_file: &Path, source: &Path, dest: &Path) -> Result<()> {
    let ids = read_patient_ids(case_file)?;
    let summary = pick_files(&ids, source, dest)?;
    for (id, files) in &summary.files {
        if files.is_empty() {
            println!("{}: No files found", id);
        } else {
            println!("{}: {:?}", id, files);
        }
    }
    println!(
        "{} files picked for {} patients!",
        summary.copied,
        summary.patients_with_files()
    );
    Ok(())
}
