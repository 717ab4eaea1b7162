use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

/// Splits a `name=value` argument. A missing `=` yields an empty value.
pub fn parse_pair(input: &str) -> Result<(String, String)> {
    let (name, value) = input.split_once('=').unwrap_or((input, ""));
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("parameter name cannot be empty in {input:?}"));
    }
    Ok((name.to_string(), value.to_string()))
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {:?}", parent))?;
        }
    }
    Ok(())
}
