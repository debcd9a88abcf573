//! End-to-end bundling pipeline.
//!
//! Wires the resolver, cache, graph, and inliner together for one run, then
//! applies the optional post-passes: docstring stripping and release-mode
//! import consolidation. Output is built fully in memory; nothing is
//! written unless the whole run succeeds.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::{
    config::Config, docstrings, graph::ModuleGraph, inliner::Inliner, parser::ModuleCache,
    postprocess, resolver::ModuleResolver,
};

#[derive(Debug)]
pub struct BundleOrchestrator {
    config: Config,
}

impl BundleOrchestrator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Bundle `entry` and return the output text.
    pub fn bundle(&self, entry: &Path) -> Result<String> {
        let entry = entry
            .canonicalize()
            .with_context(|| format!("entry file not found: {}", entry.display()))?;
        info!("Bundling {}", entry.display());

        let mut resolver = ModuleResolver::new(self.config.clone());
        resolver.set_entry_file(&entry);
        let mut cache = ModuleCache::new();
        let mut graph = ModuleGraph::new();

        let mut bundled = Inliner::new(&mut resolver, &mut cache, &mut graph, &self.config)
            .inline_entry(&entry)?;

        if self.config.strip_docstrings {
            debug!("Stripping docstrings from the bundled output");
            bundled = docstrings::strip_from_text(&entry, bundled)?;
        }
        if self.config.release {
            debug!("Consolidating imports into a header block");
            bundled = postprocess::consolidate_from_text(&entry, bundled)?;
        }

        let type_only = graph.iter().filter(|node| node.type_checking_only).count();
        if type_only > 0 {
            debug!("{type_only} modules stay behind TYPE_CHECKING guards");
        }
        info!(
            "Inlined {} modules into {}",
            graph.module_count().saturating_sub(1),
            entry.display()
        );
        Ok(bundled)
    }

    /// Bundle `entry` and write the result to `output`, creating parent
    /// directories as needed.
    pub fn bundle_to_file(&self, entry: &Path, output: &Path) -> Result<()> {
        let bundled = self.bundle(entry)?;
        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(output, bundled)
            .with_context(|| format!("failed to write {}", output.display()))?;
        info!("Bundle written to {}", output.display());
        Ok(())
    }
}
