//! # CLI Command Implementations
//!
//! Each command loads the working bundle from disk, applies engine
//! operations, and saves the new snapshot back. The working copy is the
//! exported bundle document itself; there is no other persistence.

use crate::api;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use workbench_core::{Bundle, BundleDocument, ObjectId, TypeSchema, WorkbenchError};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for loaded documents (matches the engine's
/// pre-parse limit).
const MAX_LOAD_FILE_SIZE: u64 = workbench_core::primitives::MAX_DOCUMENT_SIZE as u64;

/// Maximum file size for a TOML schema file (1 MB).
const MAX_SCHEMA_FILE_SIZE: u64 = 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), WorkbenchError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| WorkbenchError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(WorkbenchError::InvalidDocument(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input file path.
///
/// Canonicalizes the path (resolving symlinks and "..") and ensures it
/// names a regular file, preventing traversal to unintended locations.
fn validate_file_path(path: &Path) -> Result<PathBuf, WorkbenchError> {
    let canonical = path.canonicalize().map_err(|e| {
        WorkbenchError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(WorkbenchError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, WorkbenchError> {
    let parent = path.parent().unwrap_or(Path::new("."));

    let canonical_parent = parent.canonicalize().map_err(|e| {
        WorkbenchError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(WorkbenchError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| WorkbenchError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SCHEMA LOADING
// =============================================================================

/// Shape of the optional TOML schema file:
///
/// ```toml
/// [schema]
/// domain_types = ["threat-actor", "malware"]
/// observable_types = ["ipv4-addr", "domain-name"]
/// ```
#[derive(Debug, Deserialize)]
struct SchemaFile {
    schema: SchemaLists,
}

#[derive(Debug, Deserialize)]
struct SchemaLists {
    #[serde(default)]
    domain_types: Vec<String>,
    #[serde(default)]
    observable_types: Vec<String>,
}

/// Load the injected type schema from a TOML file, or fall back to the
/// built-in lists.
pub fn load_schema(path: Option<&Path>) -> Result<TypeSchema, WorkbenchError> {
    let Some(path) = path else {
        return Ok(TypeSchema::builtin());
    };

    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_SCHEMA_FILE_SIZE)?;

    let contents = std::fs::read_to_string(&validated)
        .map_err(|e| WorkbenchError::IoError(format!("Read schema file: {}", e)))?;
    let file: SchemaFile = toml::from_str(&contents)
        .map_err(|e| WorkbenchError::SerializationError(format!("Parse schema file: {}", e)))?;

    tracing::info!(
        domain_types = file.schema.domain_types.len(),
        observable_types = file.schema.observable_types.len(),
        "Loaded type schema from {:?}",
        validated
    );
    Ok(TypeSchema::new(
        file.schema.domain_types,
        file.schema.observable_types,
    ))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    bundle_path: &Path,
    schema: &TypeSchema,
    host: &str,
    port: u16,
) -> Result<(), WorkbenchError> {
    let bundle = load_or_create_bundle(bundle_path, schema)?;

    println!("Workbench Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:   {}", host);
    println!("  Port:   {}", port);
    println!("  Bundle: {:?}", bundle_path);
    println!();
    println!("Endpoints:");
    println!("  GET  /health        - Health check");
    println!("  GET  /status        - Bundle status");
    println!("  POST /objects       - Upsert an entity");
    println!("  POST /relationships - Upsert a relationship");
    println!("  POST /containers    - Upsert a container");
    println!("  POST /delete        - Cascade-delete objects");
    println!("  POST /retype        - Retype an observable");
    println!("  POST /markings      - Apply markings to a selection");
    println!("  POST /context       - Reconcile an anchor's context");
    println!("  POST /load          - Merge an external document");
    println!("  POST /export        - Export the bundle document");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, bundle, schema.clone()).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show bundle status.
pub fn cmd_status(
    bundle_path: &Path,
    schema: &TypeSchema,
    json_mode: bool,
) -> Result<(), WorkbenchError> {
    let bundle = load_or_create_bundle(bundle_path, schema)?;
    let counts = bundle.counts();

    if json_mode {
        let output = serde_json::json!({
            "bundle": bundle_path.to_string_lossy(),
            "domain_objects": counts.domain_objects,
            "observables": counts.observables,
            "relationships": counts.relationships,
            "containers": counts.containers,
            "total": counts.total()
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Workbench Bundle Status");
    println!("=======================");
    println!("Bundle: {:?}", bundle_path);
    println!();
    println!("Domain Objects: {}", counts.domain_objects);
    println!("Observables:    {}", counts.observables);
    println!("Relationships:  {}", counts.relationships);
    println!("Containers:     {}", counts.containers);
    println!("Total:          {}", counts.total());

    Ok(())
}

// =============================================================================
// LIST COMMAND
// =============================================================================

/// List objects of one category.
pub fn cmd_list(
    bundle_path: &Path,
    schema: &TypeSchema,
    json_mode: bool,
    category: &str,
) -> Result<(), WorkbenchError> {
    let bundle = load_or_create_bundle(bundle_path, schema)?;

    let rows: Vec<(String, String, String)> = match category {
        "domain" => bundle
            .domain_objects()
            .iter()
            .map(|o| {
                (
                    o.common.id.to_string(),
                    o.common.type_name.clone(),
                    o.name.clone().unwrap_or_default(),
                )
            })
            .collect(),
        "observable" => bundle
            .observables()
            .iter()
            .map(|o| {
                (
                    o.common.id.to_string(),
                    o.common.type_name.clone(),
                    o.value.clone().unwrap_or_default(),
                )
            })
            .collect(),
        "relationship" => bundle
            .relationships()
            .iter()
            .map(|o| {
                (
                    o.common.id.to_string(),
                    o.relationship_type.clone(),
                    format!("{} -> {}", o.source_ref, o.target_ref),
                )
            })
            .collect(),
        "container" => bundle
            .containers()
            .iter()
            .map(|o| {
                (
                    o.common.id.to_string(),
                    o.common.type_name.clone(),
                    format!("{} members", o.object_refs.len()),
                )
            })
            .collect(),
        _ => {
            return Err(WorkbenchError::InvalidDocument(format!(
                "Unknown category: {}. Use: domain, observable, relationship, container",
                category
            )));
        }
    };

    if json_mode {
        let output: Vec<serde_json::Value> = rows
            .iter()
            .map(|(id, type_name, detail)| {
                serde_json::json!({"id": id, "type": type_name, "detail": detail})
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    if rows.is_empty() {
        println!("No {} objects", category);
        return Ok(());
    }
    for (id, type_name, detail) in &rows {
        println!("{}  [{}]  {}", id, type_name, detail);
    }
    Ok(())
}

// =============================================================================
// LOAD COMMAND
// =============================================================================

/// Classify and merge an external bundle document into the working copy.
pub fn cmd_load(
    bundle_path: &Path,
    schema: &TypeSchema,
    _json_mode: bool,
    file: &Path,
) -> Result<(), WorkbenchError> {
    tracing::info!("Loading document from {:?}", file);

    let mut bundle = load_or_create_bundle(bundle_path, schema)?;

    let validated = validate_file_path(file)?;
    validate_file_size(&validated, MAX_LOAD_FILE_SIZE)?;
    let contents = std::fs::read(&validated)
        .map_err(|e| WorkbenchError::IoError(format!("Read file: {}", e)))?;
    let document = BundleDocument::from_json_slice(&contents)?;
    let incoming = document.objects.len();

    let skipped = bundle.merge_document(document, schema);
    save_bundle(&bundle, bundle_path)?;

    println!("Merged {} objects ({} skipped)", incoming - skipped, skipped);
    println!("Bundle now has {} objects", bundle.len());

    Ok(())
}

// =============================================================================
// DELETE COMMAND
// =============================================================================

/// Delete objects by id, cascading through references.
pub fn cmd_delete(
    bundle_path: &Path,
    schema: &TypeSchema,
    _json_mode: bool,
    ids: &[String],
) -> Result<(), WorkbenchError> {
    let mut bundle = load_or_create_bundle(bundle_path, schema)?;
    let before = bundle.len();

    let targets: BTreeSet<ObjectId> = ids.iter().map(ObjectId::new).collect();
    bundle.delete_objects(&targets);
    save_bundle(&bundle, bundle_path)?;

    println!(
        "Deleted {} objects ({} requested, cascades included)",
        before - bundle.len(),
        targets.len()
    );

    Ok(())
}

// =============================================================================
// RETYPE COMMAND
// =============================================================================

/// Change an observable's concrete type.
pub fn cmd_retype(
    bundle_path: &Path,
    schema: &TypeSchema,
    _json_mode: bool,
    id: &str,
    new_type: &str,
) -> Result<(), WorkbenchError> {
    let mut bundle = load_or_create_bundle(bundle_path, schema)?;

    match bundle.retype_observable(&ObjectId::new(id), new_type) {
        Some(new_id) => {
            save_bundle(&bundle, bundle_path)?;
            println!("Retyped {} -> {}", id, new_id);
            Ok(())
        }
        None => Err(WorkbenchError::InvalidDocument(format!(
            "No observable with id {}",
            id
        ))),
    }
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export the bundle document to a file.
pub fn cmd_export(
    bundle_path: &Path,
    schema: &TypeSchema,
    output: &Path,
) -> Result<(), WorkbenchError> {
    let validated_output = validate_output_path(output)?;

    let bundle = load_or_create_bundle(bundle_path, schema)?;
    let document = bundle.to_document();
    let data = document.to_json_vec()?;

    std::fs::write(&validated_output, &data)
        .map_err(|e| WorkbenchError::IoError(format!("Write file: {}", e)))?;

    println!(
        "Exported {} objects ({} bytes) to {:?}",
        document.objects.len(),
        data.len(),
        validated_output
    );

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty working bundle.
pub fn cmd_init(bundle_path: &Path, force: bool) -> Result<(), WorkbenchError> {
    if bundle_path.exists() && !force {
        return Err(WorkbenchError::IoError(
            "Bundle file already exists. Use --force to overwrite.".to_string(),
        ));
    }

    let bundle = Bundle::new();
    save_bundle(&bundle, bundle_path)?;
    println!("Initialized new working bundle at {:?}", bundle_path);

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load the working bundle from disk, or start empty when the file does
/// not exist yet.
pub fn load_or_create_bundle(
    bundle_path: &Path,
    schema: &TypeSchema,
) -> Result<Bundle, WorkbenchError> {
    if !bundle_path.exists() {
        return Ok(Bundle::new());
    }

    validate_file_size(bundle_path, MAX_LOAD_FILE_SIZE)?;
    let data = std::fs::read(bundle_path)
        .map_err(|e| WorkbenchError::IoError(format!("Read bundle: {}", e)))?;
    let document = BundleDocument::from_json_slice(&data)?;

    let (bundle, skipped) = Bundle::from_document(document, schema);
    if skipped > 0 {
        tracing::warn!("Skipped {} unclassifiable objects on load", skipped);
    }
    Ok(bundle)
}

/// Save the bundle snapshot to the working path.
pub fn save_bundle(bundle: &Bundle, bundle_path: &Path) -> Result<(), WorkbenchError> {
    let data = bundle.to_document().to_json_vec()?;
    std::fs::write(bundle_path, &data)
        .map_err(|e| WorkbenchError::IoError(format!("Write bundle: {}", e)))?;
    Ok(())
}
