use crate::DEFAULT_TEMP_SUFFIX;
use crate::config::{PipelineConfig, ShaderStage, StageTable, absolute};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Builder for configuring a pipeline without a JSON file.
///
/// Provides an interface for setting the folders a build reads from and writes
/// to, the file suffixes that classify shader stages, and watch behaviour.
///
/// # Example
///
/// ```rust,no_run
/// use shader_forge::{NagaCompiler, PipelineConfig, run_once};
///
/// let config = PipelineConfig::builder("assets/shaders", "assets/templates", "generated")
///     .program_file("assets/programs.txt")
///     .processed_dir("generated/processed")
///     .vertex_extension(".vert")
///     .fragment_extension(".frag")
///     .build()
///     .expect("invalid configuration");
///
/// let report = run_once(&config, || Ok(NagaCompiler::new()))
///     .expect("shader build failed");
/// println!("{} outputs", report.outputs.len());
/// ```
pub struct PipelineConfigBuilder {
    input_dir: PathBuf,
    template_dir: PathBuf,
    output_dir: PathBuf,
    processed_dir: Option<PathBuf>,
    program_file: Option<PathBuf>,
    temp_suffix: String,
    stages: StageTable,
}

impl PipelineConfigBuilder {
    /// Creates a new builder with no stage extensions and the default
    /// temporary-file marker.
    ///
    /// # Arguments
    ///
    /// * `input_dir` - Folder scanned for shader sources
    /// * `template_dir` - Folder holding output templates
    /// * `output_dir` - Folder receiving rendered outputs
    pub fn new(
        input_dir: impl AsRef<Path>,
        template_dir: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_path_buf(),
            template_dir: template_dir.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
            processed_dir: None,
            program_file: None,
            temp_suffix: DEFAULT_TEMP_SUFFIX.to_string(),
            stages: StageTable::default(),
        }
    }

    /// Mirrors every preprocessed shader into `dir`.
    pub fn processed_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.processed_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Sets the program-definition list linked by each build.
    pub fn program_file(mut self, path: impl AsRef<Path>) -> Self {
        self.program_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the marker suffix of editor scratch files ignored by the watcher.
    pub fn temp_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.temp_suffix = suffix.into();
        self
    }

    /// Adds a file suffix classifying sources as `stage`.
    ///
    /// # Arguments
    ///
    /// * `stage` - Stage the suffix maps to
    /// * `suffix` - Suffix including the dot (e.g., ".vert")
    pub fn extension(mut self, stage: ShaderStage, suffix: impl Into<String>) -> Self {
        self.stages.extensions_mut(stage).push(suffix.into());
        self
    }

    pub fn vertex_extension(self, suffix: impl Into<String>) -> Self {
        self.extension(ShaderStage::Vertex, suffix)
    }

    pub fn fragment_extension(self, suffix: impl Into<String>) -> Self {
        self.extension(ShaderStage::Fragment, suffix)
    }

    pub fn geometry_extension(self, suffix: impl Into<String>) -> Self {
        self.extension(ShaderStage::Geometry, suffix)
    }

    /// Builds the configuration with the configured settings.
    ///
    /// Relative folders are made absolute against the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if an extension list contains an empty suffix.
    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        self.stages.validate()?;
        Ok(PipelineConfig {
            input_dir: absolute(&self.input_dir),
            template_dir: absolute(&self.template_dir),
            output_dir: absolute(&self.output_dir),
            processed_dir: self.processed_dir.as_deref().map(absolute),
            program_file: self.program_file.as_deref().map(absolute),
            temp_suffix: self.temp_suffix,
            stages: self.stages,
        })
    }
}

impl PipelineConfig {
    /// Creates a builder for assembling a configuration in code.
    pub fn builder(
        input_dir: impl AsRef<Path>,
        template_dir: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> PipelineConfigBuilder {
        PipelineConfigBuilder::new(input_dir, template_dir, output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_extensions_per_stage() {
        let config = PipelineConfig::builder("in", "tpl", "out")
            .vertex_extension(".vert")
            .vertex_extension(".vertex")
            .fragment_extension(".frag")
            .temp_suffix(".swp")
            .build()
            .unwrap();

        assert_eq!(
            config.stages.extensions(ShaderStage::Vertex),
            [".vert".to_string(), ".vertex".to_string()]
        );
        assert!(config.stages.extensions(ShaderStage::Geometry).is_empty());
        assert_eq!(config.temp_suffix, ".swp");
        assert_eq!(config.processed_dir, None);
    }

    #[test]
    fn empty_suffix_is_rejected() {
        let err = PipelineConfig::builder("in", "tpl", "out")
            .vertex_extension("")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EmptyExtension {
                stage: ShaderStage::Vertex
            }
        ));
    }

    #[test]
    fn relative_folders_become_absolute() {
        let cwd = std::env::current_dir().unwrap();
        let config = PipelineConfig::builder("in", "tpl", "tpl/out")
            .processed_dir("processed")
            .build()
            .unwrap();
        assert_eq!(config.input_dir, cwd.join("in"));
        assert_eq!(config.output_dir, cwd.join("tpl/out"));
        assert_eq!(config.processed_dir, Some(cwd.join("processed")));
    }
}
