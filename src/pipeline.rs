use crate::catalog::{Program, ShaderCatalog, ShaderSource};
use crate::compile::CompilerOracle;
use crate::config::{PipelineConfig, ShaderStage};
use crate::error::{BuildError, OutputError};
use crate::programs::parse_program_list;
use crate::template::{OutputTemplates, ShaderPreprocessor};
use std::collections::HashMap;
use std::path::PathBuf;

/// Result of rendering one output template.
#[derive(Debug)]
pub struct OutputReport {
    pub template: String,
    pub path: PathBuf,
    pub result: Result<(), OutputError>,
}

impl OutputReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything a successful build produced.
///
/// A build succeeds when no fatal error occurred; individual outputs may still
/// have failed.
#[derive(Debug)]
pub struct BuildReport {
    pub catalog: ShaderCatalog,
    pub outputs: Vec<OutputReport>,
}

impl BuildReport {
    pub fn failed_outputs(&self) -> impl Iterator<Item = &OutputReport> {
        self.outputs.iter().filter(|output| !output.is_ok())
    }

    pub fn all_outputs_ok(&self) -> bool {
        self.outputs.iter().all(OutputReport::is_ok)
    }
}

/// Runs one full build: scan, preprocess, link, generate.
///
/// A fresh catalog is assembled for every call. Fatal errors abort the build
/// before any output is rendered; failures of single output templates are
/// collected in the report.
///
/// # Errors
///
/// Returns an error if:
/// - The input or template folder cannot be listed, or a source cannot be read
/// - A shader fails to preprocess
/// - A processed shader cannot be written
/// - The program list is malformed or references an unknown shader
/// - A shader fails to compile or a program fails to link
pub fn run_build<O: CompilerOracle>(
    config: &PipelineConfig,
    oracle: &mut O,
) -> Result<BuildReport, BuildError> {
    log::info!("Building shaders from {}", config.input_dir.display());

    let mut catalog = ShaderCatalog::new();

    let entries = scan_input(config)?;
    let preprocessor = ShaderPreprocessor::new(&config.input_dir);
    for (name, stage) in entries {
        log::info!("- {:<9} {}", format!("{}:", stage.label()), name);
        let path = config.input_dir.join(&name);
        let raw = std::fs::read_to_string(&path).map_err(|source| BuildError::io(&path, source))?;
        let rendered = preprocessor
            .render(&name, stage, &raw)
            .map_err(|source| BuildError::Preprocess {
                file: name.clone(),
                source,
            })?;
        catalog.insert_shader(ShaderSource::new(name, stage, raw, rendered));
    }

    if let Some(dir) = &config.processed_dir {
        write_processed(dir, &catalog)?;
    }

    link_programs(config, &mut catalog, oracle)?;

    let outputs = generate_outputs(config, &catalog)?;

    log::info!(
        "Build finished: {} shaders, {} programs, {} outputs",
        catalog.shaders().len(),
        catalog.programs().len(),
        outputs.len()
    );

    Ok(BuildReport { catalog, outputs })
}

/// Lists classified shader files of the input folder (non-recursive), sorted by name.
fn scan_input(config: &PipelineConfig) -> Result<Vec<(String, ShaderStage)>, BuildError> {
    let dir = &config.input_dir;
    let listing = std::fs::read_dir(dir).map_err(|source| BuildError::io(dir, source))?;

    let mut entries = Vec::new();
    for entry in listing {
        let entry = entry.map_err(|source| BuildError::io(dir, source))?;
        let is_file = entry
            .file_type()
            .map_err(|source| BuildError::io(entry.path(), source))?
            .is_file();
        if !is_file {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            log::debug!("Skipping non UTF-8 file name {:?}", entry.file_name());
            continue;
        };
        if let Some(stage) = config.stages.classify(&name) {
            entries.push((name, stage));
        }
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

fn write_processed(dir: &std::path::Path, catalog: &ShaderCatalog) -> Result<(), BuildError> {
    std::fs::create_dir_all(dir).map_err(|source| BuildError::ProcessedWrite {
        path: dir.to_path_buf(),
        source,
    })?;
    for shader in catalog.shaders() {
        let path = dir.join(shader.name());
        std::fs::write(&path, shader.source())
            .map_err(|source| BuildError::ProcessedWrite { path, source })?;
    }
    Ok(())
}

fn link_programs<O: CompilerOracle>(
    config: &PipelineConfig,
    catalog: &mut ShaderCatalog,
    oracle: &mut O,
) -> Result<(), BuildError> {
    let Some(path) = &config.program_file else {
        return Ok(());
    };

    let text = std::fs::read_to_string(path).map_err(|source| BuildError::io(path, source))?;
    let decls = parse_program_list(&text).map_err(|err| BuildError::ProgramList {
        path: path.clone(),
        line: err.line,
        reason: err.reason,
    })?;

    // Each shader compiles at most once per build, however many programs use it.
    let mut compiled: HashMap<String, O::Unit> = HashMap::new();

    for decl in decls {
        if catalog.program(&decl.name).is_some() {
            return Err(BuildError::DuplicateProgram { name: decl.name });
        }

        for shader_name in &decl.shaders {
            if catalog.shader(shader_name).is_none() {
                return Err(BuildError::UnknownShaderReference {
                    program: decl.name.clone(),
                    shader: shader_name.clone(),
                });
            }
        }

        for shader_name in &decl.shaders {
            if compiled.contains_key(shader_name) {
                continue;
            }
            let Some(shader) = catalog.shader(shader_name) else {
                continue;
            };
            log::debug!("Compiling {} ({})", shader_name, shader.stage());
            let unit = oracle
                .compile(shader.stage(), shader.source())
                .map_err(|source| BuildError::Compile {
                    shader: shader_name.clone(),
                    source,
                })?;
            compiled.insert(shader_name.clone(), unit);
        }

        let units: Vec<&O::Unit> = decl
            .shaders
            .iter()
            .filter_map(|name| compiled.get(name))
            .collect();
        let linked = oracle
            .link(&decl.name, &units)
            .map_err(|source| BuildError::Link {
                program: decl.name.clone(),
                source,
            })?;
        let uniforms = oracle.active_uniforms(&linked);

        log::info!("- Program:  {} ({} uniforms)", decl.name, uniforms.len());
        for uniform in &uniforms {
            log::debug!("    {} {}[{}]", uniform.type_tag, uniform.name, uniform.size);
        }

        catalog.insert_program(Program::new(decl.name, decl.shaders, uniforms));
    }

    Ok(())
}

fn generate_outputs(
    config: &PipelineConfig,
    catalog: &ShaderCatalog,
) -> Result<Vec<OutputReport>, BuildError> {
    let templates = OutputTemplates::new(&config.template_dir);
    let names = templates
        .discover()
        .map_err(|source| BuildError::io(&config.template_dir, source))?;

    std::fs::create_dir_all(&config.output_dir)
        .map_err(|source| BuildError::io(&config.output_dir, source))?;

    let mut outputs = Vec::with_capacity(names.len());
    for template in names {
        let path = config.output_dir.join(&template);
        let result = templates
            .render(&template, catalog)
            .map_err(OutputError::from)
            .and_then(|text| std::fs::write(&path, text).map_err(OutputError::from));

        if let Err(err) = &result {
            log::warn!("Output '{}' failed: {}", template, err);
        }
        outputs.push(OutputReport {
            template,
            path,
            result,
        });
    }
    Ok(outputs)
}
