//! Embeds the runtime artifacts deployed by `scoperun`.
//!
//! Native build output is taken from `$SCOPE_ARTIFACT_DIR` when set; anything
//! missing there falls back to the bundled `assets/` directory. A library that
//! exists in neither place is embedded as an empty file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

const ARTIFACTS: &[&str] = &["ldscope", "libscope.so", "scope.yml", "scope_protocol.yml"];

fn modified_secs(path: &Path) -> u64 {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-env-changed=SCOPE_ARTIFACT_DIR");
    println!("cargo:rerun-if-changed=assets");

    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let native_dir = std::env::var_os("SCOPE_ARTIFACT_DIR").map(PathBuf::from);
    let assets_dir = manifest_dir.join("assets");

    let mut table = String::from("pub(crate) const EMBEDDED: &[(&str, &[u8], u64)] = &[\n");
    for name in ARTIFACTS {
        let source = native_dir
            .as_ref()
            .map(|dir| dir.join(name))
            .filter(|p| p.is_file())
            .or_else(|| Some(assets_dir.join(name)).filter(|p| p.is_file()));

        let embedded = out_dir.join(name);
        let secs = match &source {
            Some(path) => {
                println!("cargo:rerun-if-changed={}", path.display());
                fs::copy(path, &embedded)?;
                modified_secs(path)
            }
            None => {
                println!("cargo:warning=no {name} found, embedding an empty file");
                fs::write(&embedded, b"")?;
                0
            }
        };

        table.push_str(&format!(
            "    ({name:?}, include_bytes!(concat!(env!(\"OUT_DIR\"), \"/{name}\")), {secs}),\n"
        ));
    }
    table.push_str("];\n");

    fs::write(out_dir.join("embedded_artifacts.rs"), table)?;
    Ok(())
}
