//! Command handlers for CLI subcommands

use crate::cli::{BindArgs, CheckArgs, OutputFormat};
use crate::error::{Error, Result};
use colored::Colorize;
use dtobind_core::{
    Binder, BinderConfig, MappingSource, TypeRegistry, Value, XmlBeanInspector,
};
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Load the binder configuration, applying environment overrides
pub fn load_config(path: Option<&Path>) -> Result<BinderConfig> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(Error::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            info!(path = %path.display(), "Loading binder configuration");
            BinderConfig::from_file(path)?
        }
        None => BinderConfig::default(),
    };
    Ok(config.merge_with_env()?)
}

/// Inspect every DTO a mapping document describes and report each outcome
#[instrument(skip(config, out), fields(mapping = %args.mapping.display()))]
pub fn handle_check(
    args: CheckArgs,
    config: &BinderConfig,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    if !args.mapping.exists() {
        return Err(Error::FileNotFound { path: args.mapping });
    }
    let inspector = XmlBeanInspector::from_file(&args.mapping)?;
    let types: Vec<String> = inspector.document().type_names().map(str::to_string).collect();
    debug!(count = types.len(), "Mapping document parsed");

    // Inspect lazily so every type is reported, not just the first failure.
    let config = BinderConfig {
        eager_xml_inspection: false,
        ..config.clone()
    };
    let binder = Binder::builder(TypeRegistry::new())
        .inspector(inspector)
        .config(config)
        .build()?;

    let mut failed = 0;
    let mut report = Vec::with_capacity(types.len());
    for type_name in &types {
        match binder.metadata(type_name) {
            Ok(metadata) => {
                let layout = if metadata.is_immutable() { "immutable" } else { "mutable" };
                let fields = metadata.fields().len();
                if format == OutputFormat::Human {
                    writeln!(
                        out,
                        "{} {} ({}, {} fields)",
                        "ok".green().bold(),
                        type_name,
                        layout,
                        fields
                    )?;
                }
                report.push(json!({
                    "type": type_name,
                    "ok": true,
                    "layout": layout,
                    "fields": fields,
                }));
            }
            Err(e) => {
                failed += 1;
                warn!(type_name = %type_name, error = %e, "Inspection failed");
                if format == OutputFormat::Human {
                    writeln!(out, "{} {}: {}", "failed".red().bold(), type_name, e)?;
                }
                report.push(json!({
                    "type": type_name,
                    "ok": false,
                    "error": e.to_string(),
                }));
            }
        }
    }

    if format == OutputFormat::Json {
        writeln!(out, "{}", serde_json::to_string(&report)?)?;
    }
    if failed > 0 {
        return Err(Error::CheckFailed {
            failed,
            total: types.len(),
        });
    }
    Ok(())
}

/// Bind JSON source documents into the target DTO and print it as JSON
#[instrument(skip(config, out), fields(target = %args.target))]
pub fn handle_bind(
    args: BindArgs,
    config: &BinderConfig,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(mapping) = args.mapping {
        if !mapping.exists() {
            return Err(Error::FileNotFound { path: mapping });
        }
        config = config.with_mapping(MappingSource::XmlFile(mapping));
    }
    if args.no_make_up {
        config = config.with_make_up_intermediates(false);
    }
    if matches!(config.mapping, MappingSource::Attributes) {
        return Err(Error::config(
            "bind needs an XML mapping: source documents carry no type descriptors",
        ));
    }

    let sources = args
        .sources
        .iter()
        .map(PathBuf::as_path)
        .map(read_source)
        .collect::<Result<Vec<_>>>()?;

    let binder = Binder::builder(TypeRegistry::new()).config(config).build()?;
    let bound = if args.each {
        binder.bind_list(&args.target, &sources)?
    } else {
        binder.bind(&args.target, &sources)?
    };
    info!(sources = sources.len(), "Binding complete");

    let rendered = match format {
        OutputFormat::Human => serde_json::to_string_pretty(&bound.to_json())?,
        OutputFormat::Json => serde_json::to_string(&bound.to_json())?,
    };
    writeln!(out, "{}", rendered)?;
    Ok(())
}

fn read_source(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = content.len(), "Source document read");
    let json: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| Error::InvalidSource {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Value::from_json(&json))
}
