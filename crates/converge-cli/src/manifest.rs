//! Manifest loading.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use converge_control::{AppSpec, ReconciliationRequest};

use crate::cli::ApplyArgs;

/// Read an application manifest from a JSON file.
pub fn load(path: &Path) -> anyhow::Result<AppSpec> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let spec = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse manifest {}", path.display()))?;
    Ok(spec)
}

/// Build the reconciliation request from `apply` arguments.
pub fn request(args: &ApplyArgs) -> anyhow::Result<ReconciliationRequest> {
    if args.manifest.is_none() && args.id.is_none() {
        bail!("either --manifest or --id is required");
    }

    let mut spec = match &args.manifest {
        Some(path) => load(path)?,
        None => AppSpec::default(),
    };
    if let Some(id) = &args.id {
        spec.id.clone_from(id);
    }

    let mut request = ReconciliationRequest::new(spec, args.state).with_force(args.force);
    request.wait_timeout_seconds = args.wait_timeout;
    Ok(request)
}
