use crate::DEFAULT_TEMP_SUFFIX;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// Pipeline role of a shader source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
}

impl ShaderStage {
    /// Classification order used when a file name matches several extension sets.
    pub const LOOKUP_ORDER: [ShaderStage; 3] = [
        ShaderStage::Vertex,
        ShaderStage::Fragment,
        ShaderStage::Geometry,
    ];

    /// The OpenGL enumerant name for this stage, e.g. `GL_VERTEX_SHADER`.
    ///
    /// Generated code sees the stage in this form.
    pub fn gl_name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "GL_VERTEX_SHADER",
            ShaderStage::Fragment => "GL_FRAGMENT_SHADER",
            ShaderStage::Geometry => "GL_GEOMETRY_SHADER",
        }
    }

    /// Capitalised stage name used in log lines and error messages.
    pub fn label(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "Vertex",
            ShaderStage::Fragment => "Fragment",
            ShaderStage::Geometry => "Geometry",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.gl_name())
    }
}

impl Serialize for ShaderStage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.gl_name())
    }
}

/// Stage to file-suffix lookup, resolved once when the configuration is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageTable {
    vertex: Vec<String>,
    fragment: Vec<String>,
    geometry: Vec<String>,
}

impl StageTable {
    pub fn new(vertex: Vec<String>, fragment: Vec<String>, geometry: Vec<String>) -> Self {
        Self {
            vertex,
            fragment,
            geometry,
        }
    }

    /// Suffixes classifying a file as `stage`, in configured order.
    pub fn extensions(&self, stage: ShaderStage) -> &[String] {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
            ShaderStage::Geometry => &self.geometry,
        }
    }

    pub(crate) fn extensions_mut(&mut self, stage: ShaderStage) -> &mut Vec<String> {
        match stage {
            ShaderStage::Vertex => &mut self.vertex,
            ShaderStage::Fragment => &mut self.fragment,
            ShaderStage::Geometry => &mut self.geometry,
        }
    }

    /// Returns the stage of the first extension set (vertex, fragment, geometry)
    /// containing a suffix of `file_name`.
    pub fn classify(&self, file_name: &str) -> Option<ShaderStage> {
        ShaderStage::LOOKUP_ORDER.into_iter().find(|stage| {
            self.extensions(*stage)
                .iter()
                .any(|suffix| file_name.ends_with(suffix.as_str()))
        })
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for stage in ShaderStage::LOOKUP_ORDER {
            if self.extensions(stage).iter().any(|suffix| suffix.is_empty()) {
                return Err(ConfigError::EmptyExtension { stage });
            }
        }
        Ok(())
    }
}

/// Fully resolved configuration for one pipeline.
///
/// Every build run and every watcher reads the same immutable instance, usually
/// shared as `Arc<PipelineConfig>`. All paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub template_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Rendered shader sources are mirrored here when set.
    pub processed_dir: Option<PathBuf>,
    /// Program-definition list. No programs are linked when unset.
    pub program_file: Option<PathBuf>,
    /// Watched paths ending with this marker are editor scratch files.
    pub temp_suffix: String,
    pub stages: StageTable,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "Input folder")]
    input_folder: PathBuf,
    #[serde(rename = "Template folder")]
    template_folder: PathBuf,
    #[serde(rename = "Output folder")]
    output_folder: PathBuf,
    #[serde(rename = "Processed shaders folder", default)]
    processed_folder: Option<PathBuf>,
    #[serde(rename = "Program file", default)]
    program_file: Option<PathBuf>,
    #[serde(rename = "Vertex extensions")]
    vertex_extensions: Vec<String>,
    #[serde(rename = "Fragment extensions")]
    fragment_extensions: Vec<String>,
    #[serde(rename = "Geometry extensions")]
    geometry_extensions: Vec<String>,
    #[serde(rename = "Temporary suffix", default = "default_temp_suffix")]
    temp_suffix: String,
}

fn default_temp_suffix() -> String {
    DEFAULT_TEMP_SUFFIX.to_string()
}

impl PipelineConfig {
    /// Loads a JSON configuration file.
    ///
    /// Relative folders in the file are resolved against the directory that
    /// contains it, then made absolute.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The JSON is malformed or a required key is missing
    /// - An extension list contains an empty suffix
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_json(&text, base).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parses configuration JSON, resolving relative folders against `base`.
    /// A relative `base` is taken from the current directory.
    pub fn from_json(text: &str, base: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;

        let config = Self {
            input_dir: resolve(base, file.input_folder),
            template_dir: resolve(base, file.template_folder),
            output_dir: resolve(base, file.output_folder),
            processed_dir: file.processed_folder.map(|p| resolve(base, p)),
            program_file: file.program_file.map(|p| resolve(base, p)),
            temp_suffix: file.temp_suffix,
            stages: StageTable::new(
                file.vertex_extensions,
                file.fragment_extensions,
                file.geometry_extensions,
            ),
        };
        config.stages.validate()?;
        Ok(config)
    }

    /// Checks a watched path against the temporary-file marker.
    pub fn is_temporary(&self, path: &Path) -> bool {
        !self.temp_suffix.is_empty()
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(self.temp_suffix.as_str()))
    }
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        absolute(&base.join(path))
    }
}

/// Absolute form of `path` without touching the filesystem, so folders that
/// do not exist yet still compare equal to notification paths.
pub(crate) fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
