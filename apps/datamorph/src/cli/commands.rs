//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Tables are read and written as JSON; everything between is datamorph-core.

use super::{ModelKind, RunOptions};
use crate::config::AppConfig;
use crate::error::AppError;
use datamorph_core::{
    Analysis, ConceptEntity, ConceptualModel, ConceptualTable, ConceptualToPhysical,
    DataModelError, IssueList, NotationParser, PhysicalModel, PhysicalTable,
    PhysicalToConceptual, PlatformSchema, Validator,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE LIMITS
// =============================================================================

/// Maximum size of an input table (100 MB).
///
/// This prevents memory exhaustion from malicious or accidental large files.
const MAX_INPUT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate an input path: it must resolve to an existing regular file no
/// larger than [`MAX_INPUT_FILE_SIZE`].
fn validate_input_path(path: &Path) -> Result<PathBuf, DataModelError> {
    let canonical = path.canonicalize().map_err(|e| {
        DataModelError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(DataModelError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| DataModelError::Io(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > MAX_INPUT_FILE_SIZE {
        return Err(DataModelError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_INPUT_FILE_SIZE
        )));
    }
    Ok(canonical)
}

/// Validate an output path: its parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, DataModelError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        DataModelError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(DataModelError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| DataModelError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DataModelError> {
    let validated = validate_input_path(path)?;
    let contents = std::fs::read(&validated)
        .map_err(|e| DataModelError::Io(format!("Read file: {}", e)))?;
    serde_json::from_slice(&contents).map_err(|e| {
        DataModelError::Serialization(format!("Invalid table '{}': {}", path.display(), e))
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), DataModelError> {
    let validated = validate_output_path(path)?;
    let contents = serde_json::to_vec_pretty(value)
        .map_err(|e| DataModelError::Serialization(format!("Encode table: {}", e)))?;
    std::fs::write(&validated, contents)
        .map_err(|e| DataModelError::Io(format!("Write file: {}", e)))
}

// =============================================================================
// MODEL LOADING
// =============================================================================

/// Read a conceptual table into a model. Malformed rows land in `issues`.
pub fn load_conceptual(path: &Path, issues: &mut IssueList) -> Result<ConceptualModel, AppError> {
    let table: ConceptualTable = read_json(path)?;
    let parser = NotationParser::new().map_err(DataModelError::from)?;
    Ok(table.read(&parser, issues))
}

/// Read a physical table into a model. Malformed rows land in `issues`.
pub fn load_physical(path: &Path, issues: &mut IssueList) -> Result<PhysicalModel, AppError> {
    let table: PhysicalTable = read_json(path)?;
    let parser = NotationParser::new().map_err(DataModelError::from)?;
    Ok(table.read(&parser, issues))
}

// =============================================================================
// ISSUE REPORTING
// =============================================================================

fn print_issues(issues: &IssueList) {
    for issue in issues.iter() {
        println!("  {}", issue);
    }
}

/// In strict mode, any error issue fails the command. Issues not yet shown
/// by the caller are printed before failing.
fn check_strict(issues: &IssueList, options: RunOptions, shown: bool) -> Result<(), AppError> {
    let errors = issues.errors().count();
    if !options.strict || errors == 0 {
        return Ok(());
    }
    if !shown {
        if options.json_mode {
            print_json(&serde_json::json!({ "issues": issues }));
        } else {
            print_issues(issues);
        }
    }
    Err(AppError::Strict { errors })
}

fn pair((a, b): &(ConceptEntity, ConceptEntity)) -> [String; 2] {
    [a.to_string(), b.to_string()]
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// LOWER COMMAND
// =============================================================================

/// Lower a conceptual table and write the physical table.
pub fn cmd_lower(
    config: &AppConfig,
    options: RunOptions,
    input: &Path,
    output: &Path,
) -> Result<(), AppError> {
    tracing::info!("Lowering {:?} into {:?}", input, output);

    let mut issues = IssueList::new();
    let conceptual = load_conceptual(input, &mut issues)?;
    Validator::conceptual_default().run(&conceptual, &mut issues);

    let platform = match &config.platform {
        Some(path) => {
            let mut platform_issues = IssueList::new();
            let model = load_physical(path, &mut platform_issues)?;
            issues.extend(platform_issues.into_vec());
            Some(PlatformSchema::new(model))
        }
        None => None,
    };

    let mut converter = ConceptualToPhysical::new(config.conversion.clone());
    if let Some(platform) = &platform {
        converter = converter.with_platform(platform);
    }
    let converted = converter.convert(&conceptual, &mut issues)?;
    check_strict(&issues, options, false)?;

    write_json(output, &PhysicalTable::from_model(&converted.physical))?;

    let physical = &converted.physical;
    if options.json_mode {
        print_json(&serde_json::json!({
            "input": input.to_string_lossy(),
            "output": output.to_string_lossy(),
            "views": physical.views.len(),
            "containers": physical.containers.len(),
            "properties": physical.properties.len(),
            "edge_types": physical.nodes.len(),
            "links": converted.links.len(),
            "issues": issues,
        }));
        return Ok(());
    }

    println!("Lowered {} concepts", conceptual.concepts.len());
    println!("  Views:      {}", physical.views.len());
    println!("  Containers: {}", physical.containers.len());
    println!("  Properties: {}", physical.properties.len());
    println!("  Edge types: {}", physical.nodes.len());
    if !issues.is_empty() {
        println!("Issues ({}):", issues.len());
        print_issues(&issues);
    }
    Ok(())
}

// =============================================================================
// LIFT COMMAND
// =============================================================================

/// Lift a physical table and write the conceptual table.
pub fn cmd_lift(options: RunOptions, input: &Path, output: &Path) -> Result<(), AppError> {
    tracing::info!("Lifting {:?} into {:?}", input, output);

    let mut issues = IssueList::new();
    let physical = load_physical(input, &mut issues)?;
    Validator::physical_default().run(&physical, &mut issues);

    let converted = PhysicalToConceptual::new().convert(&physical, &mut issues)?;
    check_strict(&issues, options, false)?;

    write_json(output, &ConceptualTable::from_model(&converted.conceptual))?;

    let conceptual = &converted.conceptual;
    if options.json_mode {
        print_json(&serde_json::json!({
            "input": input.to_string_lossy(),
            "output": output.to_string_lossy(),
            "concepts": conceptual.concepts.len(),
            "properties": conceptual.properties.len(),
            "links": converted.links.len(),
            "issues": issues,
        }));
        return Ok(());
    }

    println!("Lifted {} views", physical.views.len());
    println!("  Concepts:   {}", conceptual.concepts.len());
    println!("  Properties: {}", conceptual.properties.len());
    if !issues.is_empty() {
        println!("Issues ({}):", issues.len());
        print_issues(&issues);
    }
    Ok(())
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Run the default validation passes over a table.
pub fn cmd_validate(options: RunOptions, input: &Path, model: ModelKind) -> Result<(), AppError> {
    let mut issues = IssueList::new();
    let passes = match model {
        ModelKind::Conceptual => {
            let conceptual = load_conceptual(input, &mut issues)?;
            let validator = Validator::conceptual_default();
            validator.run(&conceptual, &mut issues);
            validator.len()
        }
        ModelKind::Physical => {
            let physical = load_physical(input, &mut issues)?;
            let validator = Validator::physical_default();
            validator.run(&physical, &mut issues);
            validator.len()
        }
    };

    if options.json_mode {
        print_json(&serde_json::json!({
            "input": input.to_string_lossy(),
            "passes": passes,
            "errors": issues.errors().count(),
            "warnings": issues.warnings().count(),
            "issues": issues,
        }));
    } else {
        println!("Validation of {:?}", input);
        println!("=================");
        println!("Passes:   {}", passes);
        println!("Errors:   {}", issues.errors().count());
        println!("Warnings: {}", issues.warnings().count());
        print_issues(&issues);
    }

    check_strict(&issues, options, true)
}

// =============================================================================
// ANALYZE COMMAND
// =============================================================================

/// Report inheritance, linkage and edge classes of a conceptual table.
pub fn cmd_analyze(config: &AppConfig, options: RunOptions, input: &Path) -> Result<(), AppError> {
    let mut issues = IssueList::new();
    let conceptual = load_conceptual(input, &mut issues)?;
    let analysis = Analysis::new(&conceptual);
    let conversion = &config.conversion;

    let ancestors = analysis.ancestors_by_node()?;
    let linkage = analysis.linkage(false)?;
    let symmetric = analysis.symmetric_pairs()?;
    let edge_classes =
        analysis.edge_classes(&conversion.start_node_property, &conversion.end_node_property);
    let undefined_parents = analysis.undefined_parents();
    let undefined_targets = analysis.undefined_targets();

    if options.json_mode {
        let ancestors: serde_json::Map<String, serde_json::Value> = ancestors
            .iter()
            .map(|(node, chain)| {
                let chain: Vec<String> = chain.iter().map(ToString::to_string).collect();
                (node.to_string(), serde_json::json!(chain))
            })
            .collect();
        let linkage: Vec<serde_json::Value> = linkage
            .iter()
            .map(|link| {
                serde_json::json!({
                    "source": link.source.to_string(),
                    "property": link.property,
                    "target": link.target.to_string(),
                    "max_count": link.max_count,
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "input": input.to_string_lossy(),
            "ancestors": ancestors,
            "linkage": linkage,
            "symmetric_pairs": symmetric.iter().map(pair).collect::<Vec<_>>(),
            "edge_classes": edge_classes.keys().map(ToString::to_string).collect::<Vec<_>>(),
            "undefined_parents": undefined_parents.iter().map(pair).collect::<Vec<_>>(),
            "undefined_targets": undefined_targets.iter().map(pair).collect::<Vec<_>>(),
            "issues": issues,
        }));
        return check_strict(&issues, options, true);
    }

    println!("Analysis of {:?}", input);
    println!("===============");
    println!("Concepts:        {}", conceptual.concepts.len());
    println!("Properties:      {}", conceptual.properties.len());
    println!("Links:           {}", linkage.len());
    println!("Symmetric pairs: {}", symmetric.len());
    println!("Edge classes:    {}", edge_classes.len());
    println!();
    println!("Inheritance:");
    for (node, chain) in ancestors {
        if chain.is_empty() {
            continue;
        }
        let chain: Vec<String> = chain.iter().map(ToString::to_string).collect();
        println!("  {} -> {}", node, chain.join(" -> "));
    }
    for (node, class) in &edge_classes {
        let end = |side: &Option<ConceptEntity>| {
            side.as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "?".to_string())
        };
        println!("  edge class {}: {} -> {}", node, end(&class.start), end(&class.end));
    }
    for (child, parent) in &undefined_parents {
        println!("  {} implements undefined {}", child, parent);
    }
    for (owner, target) in &undefined_targets {
        println!("  {} points at undefined {}", owner, target);
    }
    if !issues.is_empty() {
        println!("Issues ({}):", issues.len());
        print_issues(&issues);
    }
    check_strict(&issues, options, true)
}

// =============================================================================
// CONFIG COMMAND
// =============================================================================

/// Print the effective configuration.
pub fn cmd_config(config: &AppConfig, options: RunOptions) -> Result<(), AppError> {
    let conversion = &config.conversion;
    if options.json_mode {
        print_json(&serde_json::json!({
            "conversion": conversion,
            "platform": config.platform.as_ref().map(|p| p.to_string_lossy()),
        }));
        return Ok(());
    }

    println!("Datamorph Configuration");
    println!("=======================");
    println!("Max properties per container: {}", conversion.max_properties_per_container);
    println!("Max identifier length:        {}", conversion.max_identifier_length);
    println!("Start node property:          {}", conversion.start_node_property);
    println!("End node property:            {}", conversion.end_node_property);
    println!("Infer inverse connections:    {}", conversion.infer_inverse_connections);
    match &config.platform {
        Some(path) => println!("Platform schema:              {}", path.display()),
        None => println!("Platform schema:              (none)"),
    }
    Ok(())
}
