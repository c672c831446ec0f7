//! EdgeWorker bundle preparation
//!
//! The worker source carries two constants that are rewritten per
//! deployment before `main.js` and `bundle.json` are packed into a gzipped
//! tarball.

use flate2::Compression;
use flate2::write::GzEncoder;
use regex::{NoExpand, Regex};

use crate::error::WorkflowError;

pub const TOKEN_CONSTANT: &str = "HARPPER_TOKEN";
pub const BASE_URL_CONSTANT: &str = "SUBREQUEST_BASE_URL";

/// Result of rewriting the worker source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedScript {
    pub content: String,
    /// Constants that were not found in the source
    pub missing: Vec<&'static str>,
}

/// Sets `const <name> = '<value>';` for the token and sub-request base URL.
pub fn patch_main_js(source: &str, token: &str, base_url: &str) -> Result<PatchedScript, WorkflowError> {
    let mut content = source.to_string();
    let mut missing = Vec::new();

    for (name, value) in [(TOKEN_CONSTANT, token), (BASE_URL_CONSTANT, base_url)] {
        let pattern = Regex::new(&format!(r"const {name}\s*=\s*'.*?';"))
            .map_err(|e| WorkflowError::Bundle(e.to_string()))?;
        if !pattern.is_match(&content) {
            missing.push(name);
            continue;
        }
        let replacement = format!("const {name} = '{value}';");
        content = pattern
            .replace_all(&content, NoExpand(&replacement))
            .into_owned();
    }

    Ok(PatchedScript { content, missing })
}

/// Gzipped tarball with `main.js` and `bundle.json` at its root.
pub fn build_bundle(main_js: &[u8], bundle_json: &[u8]) -> Result<Vec<u8>, WorkflowError> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut archive = tar::Builder::new(encoder);

    for (name, data) in [("main.js", main_js), ("bundle.json", bundle_json)] {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_cksum();
        archive
            .append_data(&mut header, name, data)
            .map_err(|e| WorkflowError::Bundle(format!("adding {name}: {e}")))?;
    }

    archive
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .map_err(|e| WorkflowError::Bundle(e.to_string()))
}
