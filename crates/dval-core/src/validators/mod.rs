//! One module per validator. Each builds its work list, runs the shared sweep
//! and returns a summary the CLI prints.

pub mod copy;
pub mod indexd;
pub mod integrity;
pub mod match_manifest;
pub mod match_metadata;
pub mod pick_files;

/// Render a boolean check the way MATCH reports print it.
pub(crate) fn yes_no(ok: bool) -> &'static str {
    if ok {
        "Succeeded!"
    } else {
        "Failed!"
    }
}

/// Log one named check result: info on success, error on failure.
pub(crate) fn log_check(what: &str, ok: bool) {
    if ok {
        tracing::info!("Validating {}: {}", what, yes_no(ok));
    } else {
        tracing::error!("Validating {}: {}", what, yes_no(ok));
    }
}
