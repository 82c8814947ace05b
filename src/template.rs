//! minijinja environments for the two template passes of a build.
//!
//! | Pass | Loader root | Context |
//! |------|-------------|---------|
//! | [`ShaderPreprocessor`] | input folder | `shader`, `stage` |
//! | [`OutputTemplates`]    | template folder | `collection` (the catalog) |

use crate::catalog::ShaderCatalog;
use crate::config::ShaderStage;
use minijinja::{AutoEscape, Environment, Error, context, path_loader};
use std::path::{Path, PathBuf};

/// Renders shader sources so they can share includes and macros.
pub struct ShaderPreprocessor {
    env: Environment<'static>,
}

impl ShaderPreprocessor {
    /// `{% include %}` and `{% import %}` resolve against `input_dir`.
    pub fn new(input_dir: &Path) -> Self {
        let mut env = Environment::new();
        env.set_loader(path_loader(input_dir.to_path_buf()));
        env.set_auto_escape_callback(|_| AutoEscape::None);
        Self { env }
    }

    /// Renders `raw` as a template named after the shader file.
    pub fn render(&self, name: &str, stage: ShaderStage, raw: &str) -> Result<String, Error> {
        self.env.render_named_str(
            name,
            raw,
            context! { shader => name, stage => stage.gl_name() },
        )
    }
}

/// The output templates of one template folder.
pub struct OutputTemplates {
    env: Environment<'static>,
    dir: PathBuf,
}

impl OutputTemplates {
    pub fn new(template_dir: &Path) -> Self {
        let mut env = Environment::new();
        env.set_loader(path_loader(template_dir.to_path_buf()));
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        Self {
            env,
            dir: template_dir.to_path_buf(),
        }
    }

    /// Lists template file names, sorted so output order is stable.
    pub fn discover(&self) -> std::io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => log::warn!("Skipping template with non UTF-8 name {:?}", name),
            }
        }
        names.sort();
        Ok(names)
    }

    /// Renders `template` with the catalog exposed as `collection`.
    pub fn render(&self, template: &str, catalog: &ShaderCatalog) -> Result<String, Error> {
        self.env
            .get_template(template)?
            .render(context! { collection => catalog })
    }
}
