//! Compiled artifact access.
//!
//! Artifacts are produced by an external build (Hardhat layout): one
//! `<Name>.json` file per contract under the artifacts directory, a sibling
//! `<Name>.dbg.json` pointing to the build-info file holding the compiler input.

use std::path::{Path, PathBuf};

use alloy_core::{json_abi::JsonAbi, primitives::Bytes};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// Creation bytecode and ABI of a compiled contract.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    /// Path of the source file the contract was compiled from.
    #[serde(default)]
    pub source_name: String,
    pub abi: Value,
    pub bytecode: Bytes,
}

impl Artifact {
    /// Fully qualified name as expected by source verifiers: `<source>:<Name>`.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// Parse the ABI into its typed form.
    pub fn json_abi(&self) -> Result<JsonAbi> {
        serde_json::from_value(self.abi.clone())
            .with_context(|| format!("Failed to parse ABI of {}", self.contract_name))
    }
}

/// Compiler version and standard JSON input used to build a contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_long_version: String,
    pub input: Value,
}

/// Read-only access to compiled artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Read the artifact for `contract_name`.
    fn read_artifact(&self, contract_name: &str) -> Result<Artifact>;
}

/// [`ArtifactStore`] backed by a Hardhat `artifacts/` directory.
#[derive(Debug, Clone)]
pub struct HardhatArtifacts {
    root: PathBuf,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: PathBuf,
}

impl HardhatArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Locate `<Name>.json`, skipping the build-info directory.
    fn find(&self, contract_name: &str) -> Result<PathBuf> {
        if !self.root.is_dir() {
            anyhow::bail!("Artifacts directory not found: {}", self.root.display());
        }

        let file_name = format!("{contract_name}.json");
        let mut matches = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let entries = std::fs::read_dir(&dir)
                .with_context(|| format!("Failed to read directory {}", dir.display()))?;
            for entry in entries {
                let path = entry?.path();
                if path.is_dir() {
                    if path.file_name().is_some_and(|name| name != "build-info") {
                        pending.push(path);
                    }
                } else if path.file_name().is_some_and(|name| *name == *file_name) {
                    matches.push(path);
                }
            }
        }

        match matches.len() {
            0 => anyhow::bail!(
                "Artifact for {} not found in {}",
                contract_name,
                self.root.display()
            ),
            1 => Ok(matches.remove(0)),
            _ => {
                matches.sort();
                anyhow::bail!(
                    "Multiple artifacts named {} found: {}",
                    contract_name,
                    matches
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }

    /// Load the build-info referenced by the contract's `.dbg.json` file.
    pub fn read_build_info(&self, contract_name: &str) -> Result<BuildInfo> {
        let artifact_path = self.find(contract_name)?;
        let debug_path = artifact_path.with_file_name(format!("{contract_name}.dbg.json"));

        let content = std::fs::read_to_string(&debug_path)
            .with_context(|| format!("Failed to read {}", debug_path.display()))?;
        let debug: DebugFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", debug_path.display()))?;

        let parent = debug_path
            .parent()
            .context("Debug file path must have a parent directory")?;
        let build_info_path = parent.join(debug.build_info);

        let content = std::fs::read_to_string(&build_info_path)
            .with_context(|| format!("Failed to read {}", build_info_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse build info {}", build_info_path.display()))
    }
}

impl ArtifactStore for HardhatArtifacts {
    fn read_artifact(&self, contract_name: &str) -> Result<Artifact> {
        let path = self.find(contract_name)?;
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let artifact: Artifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact {}", path.display()))?;

        if artifact.bytecode.is_empty() {
            anyhow::bail!(
                "Artifact {} has no creation bytecode (abstract contract or interface?)",
                contract_name
            );
        }

        tracing::debug!(
            contract = %contract_name,
            path = %path.display(),
            bytecode_len = artifact.bytecode.len(),
            "Artifact loaded"
        );

        Ok(artifact)
    }
}
