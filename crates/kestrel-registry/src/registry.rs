//! The live tool registry.
//!
//! `ToolRegistry` implements the `Registry` trait from kestrel-core.
//!
//! Refresh algorithm:
//!
//! 1. Load the privileged baseline unit first.
//! 2. Scan the tools directory with `ScanRules` and load every candidate in
//!    sorted order. A later unit declaring an existing name overrides it.
//! 3. Swap the new descriptor set in. On any load failure the previous set
//!    is kept and the error is returned.
//!
//! Dispatch is the one place tool failures become data: lookup misses,
//! binding errors, body errors and panics all come back as `ExecutionResult`.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use kestrel_contracts::{
    call::{Arguments, Dispatched, ExecutionResult},
    error::KestrelResult,
    schema::InvocationSchema,
};
use kestrel_core::traits::Registry;

use crate::{
    loader::{LoadedUnit, ToolDescriptor, UnitLoader},
    scan::{scan, ScanRules},
};

/// Where the privileged baseline unit comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaselineUnit {
    /// A manifest compiled into the binary.
    Embedded { name: String, source: String },
    /// A manifest file on disk, loaded under its file stem.
    File(PathBuf),
    /// No baseline: RECOVER falls back to an empty tool set.
    None,
}

/// Static registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Directory scanned on every refresh. `None` registers the baseline only.
    pub tools_dir: Option<PathBuf>,
    pub baseline: BaselineUnit,
    pub scan: ScanRules,
}

/// An ordered name → descriptor map.
#[derive(Debug, Clone, Default)]
struct DescriptorSet {
    order: Vec<String>,
    by_name: HashMap<String, ToolDescriptor>,
}

impl DescriptorSet {
    fn extend(&mut self, unit: LoadedUnit) {
        for descriptor in unit.tools {
            let name = descriptor.name.clone();
            match self.by_name.insert(name.clone(), descriptor) {
                Some(previous) => warn!(
                    tool = %name,
                    replaced_unit = %previous.unit,
                    unit = %unit.name,
                    origin = %unit.origin,
                    "tool name declared again, later unit wins"
                ),
                None => self.order.push(name),
            }
        }
    }

    fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.order.iter().filter_map(|name| self.by_name.get(name))
    }
}

/// The registry the orchestration loop refreshes and dispatches through.
pub struct ToolRegistry {
    config: RegistryConfig,
    loader: UnitLoader,
    descriptors: DescriptorSet,
}

impl ToolRegistry {
    /// An empty registry. Nothing is loaded until the first `refresh`.
    pub fn new(config: RegistryConfig, loader: UnitLoader) -> Self {
        Self {
            config,
            loader,
            descriptors: DescriptorSet::default(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn loader(&self) -> &UnitLoader {
        &self.loader
    }

    /// Current descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.descriptors.iter()
    }

    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.descriptors.by_name.get(name)
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.descriptors.order.iter().map(String::as_str).collect()
    }

    fn baseline_path(&self) -> Option<&Path> {
        match &self.config.baseline {
            BaselineUnit::File(path) => Some(path),
            _ => None,
        }
    }

    fn load_baseline(&self) -> KestrelResult<Option<LoadedUnit>> {
        match &self.config.baseline {
            BaselineUnit::Embedded { name, source } => self
                .loader
                .load_unit_source(Some(name), &format!("<embedded:{name}>"), source)
                .map(Some),
            BaselineUnit::File(path) => {
                let stem = path.file_stem().and_then(|s| s.to_str());
                self.loader.load_unit(path, stem).map(Some)
            }
            BaselineUnit::None => Ok(None),
        }
    }

    fn build_full_set(&self) -> KestrelResult<DescriptorSet> {
        let mut set = DescriptorSet::default();
        if let Some(unit) = self.load_baseline()? {
            set.extend(unit);
        }

        if let Some(dir) = &self.config.tools_dir {
            for path in scan(dir, &self.config.scan, self.baseline_path())? {
                set.extend(self.loader.load_unit(&path, None)?);
            }
        }
        Ok(set)
    }
}

impl Registry for ToolRegistry {
    fn refresh(&mut self) -> KestrelResult<()> {
        let set = self.build_full_set().inspect_err(|e| {
            error!(error = %e, "registry refresh failed, keeping previous tool set");
        })?;

        debug!(tools = set.order.len(), "registry refreshed");
        self.descriptors = set;
        Ok(())
    }

    fn reset_to_baseline(&mut self) -> KestrelResult<()> {
        match self.load_baseline() {
            Ok(unit) => {
                let mut set = DescriptorSet::default();
                if let Some(unit) = unit {
                    set.extend(unit);
                }
                info!(tools = set.order.len(), "registry reset to baseline");
                self.descriptors = set;
                Ok(())
            }
            Err(e) => {
                self.descriptors = DescriptorSet::default();
                Err(e)
            }
        }
    }

    fn list_schemas(&self) -> Vec<InvocationSchema> {
        self.descriptors.iter().map(|d| d.schema.clone()).collect()
    }

    fn dispatch(&self, name: &str, arguments: &Arguments) -> Dispatched {
        let Some(descriptor) = self.descriptors.by_name.get(name) else {
            warn!(tool = %name, "dispatch for unregistered tool");
            return ExecutionResult::not_found(name).into();
        };

        let bound = match descriptor.binder.bind(arguments) {
            Ok(bound) => bound,
            Err(e) => {
                debug!(tool = %name, error = %e, "arguments rejected");
                return ExecutionResult::tool_error(e.to_string()).into();
            }
        };

        debug!(tool = %name, unit = %descriptor.unit, "invoking tool");
        match panic::catch_unwind(AssertUnwindSafe(|| descriptor.tool.invoke(&bound))) {
            Ok(Ok(output)) => ExecutionResult::from(output).into(),
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "tool failed");
                Dispatched::body_failure(e.to_string())
            }
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic payload".to_string());
                error!(tool = %name, reason = %reason, "tool panicked");
                Dispatched::body_failure(format!("tool '{name}' panicked: {reason}"))
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
