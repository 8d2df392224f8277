//! @ai:module:intent Own the per-run state and sequence transformation and generation
//! @ai:module:layer application
//! @ai:module:public_api Engine, RunPlan, RunSummary, FileReport
//! @ai:module:depends_on config, extensions, table, transform, generate, job, error
//!
//! An `Engine` replaces process-wide registries: construction initializes
//! an empty extension registry and annotation table, `reset` clears them,
//! and dropping the engine releases everything. Files must be transformed
//! in the caller's order because later files can use extensions declared
//! by earlier ones.

use crate::annotation::Annotation;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::extensions::ExtensionRegistry;
use crate::generate::{include_guard_for, read_extension_lines, MetadataGenerator};
use crate::job::FilePair;
use crate::table::{AnnotationTable, TableSnapshot};
use crate::transform::{TransformContext, TransformStats, Transformer};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// @ai:intent Everything one invocation needs: declarations in, artifacts out, files to rewrite
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub extensions: PathBuf,
    pub declarations: PathBuf,
    pub data: PathBuf,
    pub pairs: Vec<FilePair>,
    pub manifest: Option<PathBuf>,
}

/// @ai:intent Outcome of transforming one file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub stats: TransformStats,
}

/// @ai:intent Outcome of a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub extensions_loaded: usize,
    pub files: Vec<FileReport>,
    pub annotations: Vec<Annotation>,
}

/// @ai:intent Engine context holding configuration, extension registry and annotation table
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    extensions: ExtensionRegistry,
    table: AnnotationTable,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// @ai:intent Create an engine with empty registries sized by the config
    pub fn new(config: EngineConfig) -> Self {
        Self {
            extensions: ExtensionRegistry::new(config.limits.max_extensions),
            table: AnnotationTable::new(config.limits.max_annotations),
            config,
        }
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    pub fn table(&self) -> &AnnotationTable {
        &self.table
    }

    /// @ai:intent Drop every extension and annotation collected so far
    pub fn reset(&mut self) {
        self.extensions.clear();
        self.table.clear();
    }

    /// @ai:intent Register the extensions declared in a file, best effort
    /// @ai:effects fs:read
    pub fn load_extensions(&mut self, path: &Path) -> usize {
        self.extensions.load(path)
    }

    /// @ai:intent Transform in-memory source text, growing the registries
    /// @ai:effects state:write
    pub fn transform_source(&mut self, source: &Path, input: &str) -> Result<(String, TransformStats)> {
        let mut ctx = TransformContext {
            config: &self.config,
            extensions: &mut self.extensions,
            table: &mut self.table,
        };
        let mut out = Vec::with_capacity(input.len());
        let stats = Transformer::new(&mut ctx, source).run(input, &mut out)?;
        let rewritten = String::from_utf8_lossy(&out).into_owned();
        Ok((rewritten, stats))
    }

    /// @ai:intent Transform one file on disk into its output path
    /// @ai:pre input exists and is readable
    /// @ai:effects fs:read, fs:write
    pub fn process_file(&mut self, input: &Path, output: &Path) -> Result<TransformStats> {
        let bytes = std::fs::read(input).map_err(|e| Error::FileRead {
            path: input.to_path_buf(),
            source: e,
        })?;
        let (content, encoding) = decode_source(bytes);
        if encoding == SourceEncoding::Latin1 {
            tracing::debug!("{} is not UTF-8, reading it byte for byte", input.display());
        }

        let (rewritten, stats) = self.transform_source(input, &content)?;
        write_file(output, encode_source(rewritten, encoding))?;

        tracing::info!(
            "Transformed {} -> {} ({} annotations, {} guards)",
            input.display(),
            output.display(),
            stats.annotations_recorded,
            stats.guards_emitted
        );
        Ok(stats)
    }

    /// @ai:intent Copy the live table into the flat form generators consume
    /// @ai:effects pure
    pub fn snapshot(&self) -> TableSnapshot {
        self.table.snapshot()
    }

    /// @ai:intent Write the declarations header, re-reading extension lines from `extensions`
    /// @ai:effects fs:read, fs:write
    pub fn generate_declarations(&self, extensions: &Path, output: &Path) -> Result<()> {
        let extension_lines = read_extension_lines(extensions)?;
        let snapshot = self.snapshot();
        let header = MetadataGenerator::new(&snapshot, self.config.limits.max_args)
            .declarations(&extension_lines, &include_guard_for(output));
        write_file(output, &header)?;
        tracing::info!("Wrote declarations to {}", output.display());
        Ok(())
    }

    /// @ai:intent Write the data source; it includes `declarations` by file name
    /// @ai:effects fs:write
    pub fn generate_data(&self, declarations: &Path, output: &Path) -> Result<()> {
        let header_name = declarations
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("annotations.h");
        let snapshot = self.snapshot();
        let data = MetadataGenerator::new(&snapshot, self.config.limits.max_args).data(header_name);
        write_file(output, &data)?;
        tracing::info!(
            "Wrote {} annotation records to {}",
            snapshot.count,
            output.display()
        );
        Ok(())
    }

    /// @ai:intent Write the table as a JSON manifest for runtime loading
    /// @ai:effects fs:write
    pub fn write_manifest(&self, output: &Path) -> Result<()> {
        let snapshot = self.snapshot();
        let json = MetadataGenerator::new(&snapshot, self.config.limits.max_args).manifest()?;
        write_file(output, &json)?;
        tracing::info!("Wrote manifest to {}", output.display());
        Ok(())
    }

    /// @ai:intent Run the whole pipeline: load extensions, transform in order, generate artifacts
    /// @ai:post stops at the first fatal error; files already written stay in place
    /// @ai:effects fs:read, fs:write
    pub fn run(&mut self, plan: &RunPlan) -> Result<RunSummary> {
        let mut summary = RunSummary {
            extensions_loaded: self.load_extensions(&plan.extensions),
            ..Default::default()
        };

        for pair in &plan.pairs {
            for file in pair.expand() {
                let stats = self.process_file(&file.input, &file.output)?;
                summary.files.push(FileReport {
                    input: file.input,
                    output: file.output,
                    stats,
                });
            }
        }

        self.generate_declarations(&plan.extensions, &plan.declarations)?;
        self.generate_data(&plan.declarations, &plan.data)?;
        if let Some(manifest) = &plan.manifest {
            self.write_manifest(manifest)?;
        }

        summary.annotations = self.snapshot().annotations;
        Ok(summary)
    }
}

/// How a source file's bytes were mapped to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceEncoding {
    Utf8,
    /// One char per byte, so every byte survives the round trip.
    Latin1,
}

/// @ai:intent Decode source bytes, falling back to one char per byte when they are not UTF-8
/// @ai:effects pure
fn decode_source(bytes: Vec<u8>) -> (String, SourceEncoding) {
    match String::from_utf8(bytes) {
        Ok(text) => (text, SourceEncoding::Utf8),
        Err(e) => (
            e.into_bytes().into_iter().map(char::from).collect(),
            SourceEncoding::Latin1,
        ),
    }
}

/// @ai:intent Turn rewritten text back into bytes in the encoding it was read with
/// @ai:effects pure
fn encode_source(text: String, encoding: SourceEncoding) -> Vec<u8> {
    match encoding {
        SourceEncoding::Utf8 => text.into_bytes(),
        SourceEncoding::Latin1 => text
            .chars()
            .map(|c| u8::try_from(c).unwrap_or(b'?'))
            .collect(),
    }
}

/// @ai:intent Write a file, creating its parent directory first
/// @ai:effects fs:write
fn write_file(path: &Path, content: impl AsRef<[u8]>) -> Result<()> {
    let to_error = |e| Error::FileWrite {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(to_error)?;
    }
    std::fs::write(path, content).map_err(to_error)
}
