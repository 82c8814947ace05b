//! Build-scoped store of shader and program entities.
//!
//! Both collections iterate in insertion order. Generated files depend on that
//! order, so it must only ever follow discovery and declaration order.

use crate::compile::UniformInfo;
use crate::config::ShaderStage;
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};
use std::collections::HashMap;

/// A shader file after template preprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    name: String,
    stage: ShaderStage,
    raw: String,
    source: String,
    source_repr: String,
}

impl ShaderSource {
    pub fn new(name: impl Into<String>, stage: ShaderStage, raw: String, rendered: String) -> Self {
        let source_repr = escape_for_embedding(&rendered);
        Self {
            name: name.into(),
            stage,
            raw,
            source: rendered,
            source_repr,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Text as read from disk.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Text after preprocessing; this is what gets compiled.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The rendered text as a double-quoted, escaped string literal.
    pub fn source_repr(&self) -> &str {
        &self.source_repr
    }
}

impl Serialize for ShaderSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ShaderSource", 4)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("type", &self.stage)?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field("source_repr", &self.source_repr)?;
        state.end()
    }
}

fn escape_for_embedding(text: &str) -> String {
    // Serializing a &str cannot fail.
    serde_json::to_string(text).unwrap_or_default()
}

/// An active uniform of a linked program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Uniform {
    name: String,
    size: u32,
    #[serde(rename = "type")]
    type_tag: String,
    #[serde(skip)]
    program: String,
}

impl Uniform {
    fn from_info(info: UniformInfo, program: &str) -> Self {
        Self {
            name: info.name,
            size: info.size,
            type_tag: info.type_tag,
            program: program.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Array length, 1 for non-arrays.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

/// A linked program with its reflected uniforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Program {
    name: String,
    shaders: Vec<String>,
    uniforms: Vec<Uniform>,
}

impl Program {
    /// Assembles a program from a successful link. Uniforms keep the order
    /// the compiler reported them in.
    pub fn new(name: impl Into<String>, shaders: Vec<String>, uniforms: Vec<UniformInfo>) -> Self {
        let name = name.into();
        let uniforms = uniforms
            .into_iter()
            .map(|info| Uniform::from_info(info, &name))
            .collect();
        Self {
            name,
            shaders,
            uniforms,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shader names in attach order.
    pub fn shaders(&self) -> &[String] {
        &self.shaders
    }

    pub fn uniforms(&self) -> &[Uniform] {
        &self.uniforms
    }
}

/// Insertion-ordered name to entity mapping.
#[derive(Debug, Clone)]
struct Ordered<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> Ordered<T> {
    fn insert(&mut self, name: &str, item: T) -> Option<T> {
        match self.index.get(name) {
            Some(&slot) => Some(std::mem::replace(&mut self.items[slot], item)),
            None => {
                self.index.insert(name.to_string(), self.items.len());
                self.items.push(item);
                None
            }
        }
    }

    fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&slot| &self.items[slot])
    }
}

/// Shaders and programs discovered by one build.
#[derive(Debug, Clone, Default)]
pub struct ShaderCatalog {
    shaders: Ordered<ShaderSource>,
    programs: Ordered<Program>,
}

impl ShaderCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a shader, replacing (in place) any shader with the same name.
    pub fn insert_shader(&mut self, shader: ShaderSource) -> Option<ShaderSource> {
        let name = shader.name.clone();
        self.shaders.insert(&name, shader)
    }

    /// Adds a program, replacing (in place) any program with the same name.
    pub fn insert_program(&mut self, program: Program) -> Option<Program> {
        let name = program.name.clone();
        self.programs.insert(&name, program)
    }

    pub fn shader(&self, name: &str) -> Option<&ShaderSource> {
        self.shaders.get(name)
    }

    pub fn program(&self, name: &str) -> Option<&Program> {
        self.programs.get(name)
    }

    /// Shaders in discovery order.
    pub fn shaders(&self) -> &[ShaderSource] {
        &self.shaders.items
    }

    /// Programs in declaration order.
    pub fn programs(&self) -> &[Program] {
        &self.programs.items
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.items.is_empty() && self.programs.items.is_empty()
    }
}

impl Serialize for ShaderCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ShaderCatalog", 2)?;
        state.serialize_field("shaders", self.shaders())?;
        state.serialize_field("programs", self.programs())?;
        state.end()
    }
}
