use crate::config::ShaderStage;
use crate::glsl_compat::to_naga_glsl;
use naga::front::glsl::{Frontend, Options};
use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};
use naga::{
    AddressSpace, Arena, ArraySize, Expression, GlobalVariable, Handle, ImageClass, ImageDimension,
    Module, ScalarKind, TypeInner,
};
use std::collections::HashSet;
use thiserror::Error;

/// A uniform reported by the compiler for a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformInfo {
    pub name: String,
    /// Array length, 1 for non-arrays.
    pub size: u32,
    /// GLSL type name, e.g. `mat4` or `sampler2D`.
    pub type_tag: String,
}

impl UniformInfo {
    pub fn new(name: impl Into<String>, size: u32, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            type_tag: type_tag.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("compiler context unavailable: {0}")]
    Unavailable(String),

    #[error("{stage} compilation failed:\n{message}")]
    Compile { stage: ShaderStage, message: String },

    #[error("{message}")]
    Link { message: String },
}

/// A shader compiler bound to the thread that created it.
///
/// All methods take `&mut self`: an oracle has exactly one owner, and builds are
/// serialised through it. Implementations wrapping a GPU driver context are not
/// expected to be `Send`.
///
/// # Example
///
/// ```rust,no_run
/// use shader_forge::{CompilerOracle, NagaCompiler, ShaderStage};
///
/// let mut compiler = NagaCompiler::new();
/// let vs = compiler
///     .compile(ShaderStage::Vertex, "#version 450\nvoid main() { gl_Position = vec4(0.0); }")
///     .expect("vertex shader");
/// let program = compiler.link("fullscreen", &[&vs]).expect("link");
/// for uniform in compiler.active_uniforms(&program) {
///     println!("{} {}[{}]", uniform.type_tag, uniform.name, uniform.size);
/// }
/// ```
pub trait CompilerOracle {
    /// A compiled, validated shader stage.
    type Unit;
    /// A program built from linked units.
    type Linked;

    fn compile(&mut self, stage: ShaderStage, source: &str) -> Result<Self::Unit, CompileError>;

    /// Links units in attach order.
    fn link(&mut self, name: &str, units: &[&Self::Unit]) -> Result<Self::Linked, CompileError>;

    /// Uniforms actually used by the program, in the compiler's order.
    fn active_uniforms(&mut self, program: &Self::Linked) -> Vec<UniformInfo>;
}

/// Compiler oracle backed by naga's GLSL front-end and validator.
///
/// Desktop-GL sources (`#version 330 core`, loose `uniform` declarations,
/// varyings without locations) are rewritten into the Vulkan-style dialect
/// naga parses before compiling, so default-block uniforms are reflected by
/// their plain names. naga has no geometry stage, so geometry sources are
/// reported as compile errors.
pub struct NagaCompiler {
    frontend: Frontend,
    validator: Validator,
}

/// A validated naga module reduced to what linking needs.
#[derive(Debug, Clone)]
pub struct NagaUnit {
    stage: ShaderStage,
    uniforms: Vec<UniformInfo>,
}

impl NagaUnit {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
}

#[derive(Debug, Clone)]
pub struct NagaProgram {
    name: String,
    uniforms: Vec<UniformInfo>,
}

impl NagaProgram {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for NagaCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl NagaCompiler {
    pub fn new() -> Self {
        Self {
            frontend: Frontend::default(),
            validator: Validator::new(ValidationFlags::all(), Capabilities::all()),
        }
    }
}

impl CompilerOracle for NagaCompiler {
    type Unit = NagaUnit;
    type Linked = NagaProgram;

    fn compile(&mut self, stage: ShaderStage, source: &str) -> Result<NagaUnit, CompileError> {
        let naga_stage = match stage {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
            ShaderStage::Geometry => {
                return Err(CompileError::Compile {
                    stage,
                    message: "geometry shaders are not supported by the naga compiler".into(),
                });
            }
        };

        let source = to_naga_glsl(source);
        let module = self
            .frontend
            .parse(&Options::from(naga_stage), &source)
            .map_err(|errors| CompileError::Compile {
                stage,
                message: errors.emit_to_string(&source),
            })?;

        let info = self
            .validator
            .validate(&module)
            .map_err(|error| CompileError::Compile {
                stage,
                message: error.emit_to_string(&source),
            })?;

        Ok(NagaUnit {
            stage,
            uniforms: reflect_uniforms(&module, &info),
        })
    }

    fn link(&mut self, name: &str, units: &[&NagaUnit]) -> Result<NagaProgram, CompileError> {
        if units.is_empty() {
            return Err(CompileError::Link {
                message: "no shaders attached".into(),
            });
        }

        let mut uniforms: Vec<UniformInfo> = Vec::new();
        for (position, unit) in units.iter().enumerate() {
            if units[..position].iter().any(|other| other.stage == unit.stage) {
                return Err(CompileError::Link {
                    message: format!("more than one {} shader attached", unit.stage.label()),
                });
            }

            for uniform in &unit.uniforms {
                match uniforms.iter().find(|u| u.name == uniform.name) {
                    Some(existing) if existing != uniform => {
                        return Err(CompileError::Link {
                            message: format!(
                                "uniform '{}' declared as {}[{}] and {}[{}]",
                                uniform.name,
                                existing.type_tag,
                                existing.size,
                                uniform.type_tag,
                                uniform.size
                            ),
                        });
                    }
                    Some(_) => {}
                    None => uniforms.push(uniform.clone()),
                }
            }
        }

        Ok(NagaProgram {
            name: name.to_string(),
            uniforms,
        })
    }

    fn active_uniforms(&mut self, program: &NagaProgram) -> Vec<UniformInfo> {
        program.uniforms.clone()
    }
}

/// Collects the uniform globals read by the module's entry point.
fn reflect_uniforms(module: &Module, info: &ModuleInfo) -> Vec<UniformInfo> {
    if module.entry_points.is_empty() {
        return Vec::new();
    }
    let usage = info.get_entry_point(0);
    let accessed = accessed_members(module);

    let mut uniforms = Vec::new();
    for (handle, var) in module.global_variables.iter() {
        if !matches!(
            var.space,
            AddressSpace::Uniform | AddressSpace::Handle | AddressSpace::PushConstant
        ) {
            continue;
        }
        if usage[handle].is_empty() {
            continue;
        }

        match &module.types[var.ty].inner {
            // Members of a uniform block are reported individually, as GL
            // does. Unless the block is only used as a whole, members that
            // are never read stay inactive.
            TypeInner::Struct { members, .. } => {
                let whole = !(0..members.len() as u32).any(|i| accessed.contains(&(handle, i)));
                for (index, member) in members.iter().enumerate() {
                    if !whole && !accessed.contains(&(handle, index as u32)) {
                        continue;
                    }
                    let Some(name) = &member.name else { continue };
                    let (size, type_tag) = describe(module, member.ty);
                    uniforms.push(UniformInfo::new(name.clone(), size, type_tag));
                }
            }
            _ => {
                let Some(name) = &var.name else { continue };
                let (size, type_tag) = describe(module, var.ty);
                uniforms.push(UniformInfo::new(name.clone(), size, type_tag));
            }
        }
    }
    uniforms
}

/// Block members loaded anywhere in the module, as (global, member index).
///
/// The GLSL front-end creates a member access for every block member in every
/// function up front, so only accesses that end in a load count.
fn accessed_members(module: &Module) -> HashSet<(Handle<GlobalVariable>, u32)> {
    let functions = module
        .functions
        .iter()
        .map(|(_, function)| function)
        .chain(module.entry_points.iter().map(|entry| &entry.function));

    let mut accessed = HashSet::new();
    for function in functions {
        for (_, expression) in function.expressions.iter() {
            if let Expression::Load { pointer } = *expression {
                accessed.extend(loaded_member(&function.expressions, pointer));
            }
        }
    }
    accessed
}

fn loaded_member(
    expressions: &Arena<Expression>,
    mut pointer: Handle<Expression>,
) -> Option<(Handle<GlobalVariable>, u32)> {
    loop {
        match expressions[pointer] {
            Expression::AccessIndex { base, index } => {
                if let Expression::GlobalVariable(global) = expressions[base] {
                    return Some((global, index));
                }
                pointer = base;
            }
            Expression::Access { base, .. } => pointer = base,
            _ => return None,
        }
    }
}

fn describe(module: &Module, ty: Handle<naga::Type>) -> (u32, String) {
    match &module.types[ty].inner {
        TypeInner::Array { base, size, .. } => {
            let count = match size {
                ArraySize::Constant(count) => count.get(),
                _ => 1,
            };
            (count, glsl_type_name(module, *base))
        }
        _ => (1, glsl_type_name(module, ty)),
    }
}

fn glsl_type_name(module: &Module, ty: Handle<naga::Type>) -> String {
    match &module.types[ty].inner {
        TypeInner::Scalar(scalar) => match (scalar.kind, scalar.width) {
            (ScalarKind::Float, 8) => "double".into(),
            (ScalarKind::Float, _) => "float".into(),
            (ScalarKind::Sint, _) => "int".into(),
            (ScalarKind::Uint, _) => "uint".into(),
            (ScalarKind::Bool, _) => "bool".into(),
            _ => "unknown".into(),
        },
        TypeInner::Vector { size, scalar } => {
            format!("{}vec{}", vector_prefix(scalar.kind, scalar.width), *size as u8)
        }
        TypeInner::Matrix {
            columns,
            rows,
            scalar,
        } => {
            let prefix = if scalar.width == 8 { "d" } else { "" };
            let (columns, rows) = (*columns as u8, *rows as u8);
            if columns == rows {
                format!("{prefix}mat{columns}")
            } else {
                format!("{prefix}mat{columns}x{rows}")
            }
        }
        TypeInner::Image {
            dim,
            arrayed,
            class,
        } => {
            let dim = match dim {
                ImageDimension::D1 => "1D",
                ImageDimension::D2 => "2D",
                ImageDimension::D3 => "3D",
                ImageDimension::Cube => "Cube",
            };
            let array = if *arrayed { "Array" } else { "" };
            match class {
                ImageClass::Sampled { kind, multi } => {
                    let ms = if *multi { "MS" } else { "" };
                    format!("{}sampler{dim}{ms}{array}", sampler_prefix(*kind))
                }
                ImageClass::Depth { .. } => format!("sampler{dim}{array}Shadow"),
                ImageClass::Storage { .. } => format!("image{dim}{array}"),
            }
        }
        TypeInner::Sampler { comparison } => {
            let name = if *comparison { "samplerShadow" } else { "sampler" };
            name.into()
        }
        TypeInner::Struct { .. } => module.types[ty]
            .name
            .clone()
            .unwrap_or_else(|| "struct".into()),
        _ => "unknown".into(),
    }
}

fn vector_prefix(kind: ScalarKind, width: u8) -> &'static str {
    match (kind, width) {
        (ScalarKind::Float, 8) => "d",
        (ScalarKind::Float, _) => "",
        (ScalarKind::Sint, _) => "i",
        (ScalarKind::Uint, _) => "u",
        (ScalarKind::Bool, _) => "b",
        _ => "",
    }
}

fn sampler_prefix(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Sint => "i",
        ScalarKind::Uint => "u",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "#version 450
layout(location = 0) in vec3 pos;

layout(set = 0, binding = 0) uniform Camera {
    mat4 view_projection;
};

void main() {
    gl_Position = view_projection * vec4(pos, 1.0);
}
";

    const FRAGMENT: &str = "#version 450
layout(location = 0) out vec4 frag_color;

void main() {
    frag_color = vec4(1.0);
}
";

    #[test]
    fn compiles_and_reflects_block_members() {
        let mut compiler = NagaCompiler::new();
        let vs = compiler.compile(ShaderStage::Vertex, VERTEX).unwrap();
        let fs = compiler.compile(ShaderStage::Fragment, FRAGMENT).unwrap();
        let program = compiler.link("basic", &[&vs, &fs]).unwrap();

        let uniforms = compiler.active_uniforms(&program);
        assert_eq!(uniforms, vec![UniformInfo::new("view_projection", 1, "mat4")]);
    }

    #[test]
    fn syntax_error_reports_stage() {
        let mut compiler = NagaCompiler::new();
        let err = compiler
            .compile(ShaderStage::Fragment, "#version 450\nvoid main() { this is not glsl }")
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Compile {
                stage: ShaderStage::Fragment,
                ..
            }
        ));
    }

    #[test]
    fn geometry_stage_is_rejected() {
        let mut compiler = NagaCompiler::new();
        let err = compiler.compile(ShaderStage::Geometry, VERTEX).unwrap_err();
        assert!(matches!(err, CompileError::Compile { .. }));
    }

    #[test]
    fn link_rejects_duplicate_stage() {
        let mut compiler = NagaCompiler::new();
        let fs = compiler.compile(ShaderStage::Fragment, FRAGMENT).unwrap();
        let err = compiler.link("twice", &[&fs, &fs]).unwrap_err();
        assert!(matches!(err, CompileError::Link { .. }));
    }

    #[test]
    fn link_rejects_conflicting_uniform_types() {
        let mut compiler = NagaCompiler::new();
        let a = NagaUnit {
            stage: ShaderStage::Vertex,
            uniforms: vec![UniformInfo::new("tint", 1, "vec3")],
        };
        let b = NagaUnit {
            stage: ShaderStage::Fragment,
            uniforms: vec![UniformInfo::new("tint", 1, "vec4")],
        };
        assert!(compiler.link("p", &[&a, &b]).is_err());
    }

    #[test]
    fn link_merges_shared_uniforms_in_attach_order() {
        let mut compiler = NagaCompiler::new();
        let a = NagaUnit {
            stage: ShaderStage::Vertex,
            uniforms: vec![UniformInfo::new("model", 1, "mat4"), UniformInfo::new("time", 1, "float")],
        };
        let b = NagaUnit {
            stage: ShaderStage::Fragment,
            uniforms: vec![UniformInfo::new("time", 1, "float"), UniformInfo::new("color", 1, "vec4")],
        };
        let program = compiler.link("p", &[&a, &b]).unwrap();
        let names: Vec<_> = compiler
            .active_uniforms(&program)
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, ["model", "time", "color"]);
    }

    #[test]
    fn link_requires_units() {
        let mut compiler = NagaCompiler::new();
        assert!(compiler.link("empty", &[]).is_err());
    }

    const GL_VERTEX: &str = "#version 330 core
layout (location = 0) in vec3 pos;

uniform mat4 model;
uniform mat4 view;
uniform mat4 projection;

void main()
{
    gl_Position = projection * view * model * vec4(pos, 1.0);
}";

    const GL_FRAGMENT: &str = "#version 330 core
out vec4 FragColor;

uniform vec4 color;

void main()
{
    FragColor = color;
}";

    #[test]
    fn gl_default_block_uniforms_compile_and_link() {
        let mut compiler = NagaCompiler::new();
        let vs = compiler.compile(ShaderStage::Vertex, GL_VERTEX).unwrap();
        let fs = compiler.compile(ShaderStage::Fragment, GL_FRAGMENT).unwrap();
        let program = compiler.link("basic", &[&vs, &fs]).unwrap();

        assert_eq!(
            compiler.active_uniforms(&program),
            vec![
                UniformInfo::new("model", 1, "mat4"),
                UniformInfo::new("view", 1, "mat4"),
                UniformInfo::new("projection", 1, "mat4"),
                UniformInfo::new("color", 1, "vec4"),
            ]
        );
    }

    #[test]
    fn unread_default_block_uniforms_are_inactive() {
        let source = "#version 330 core
out vec4 FragColor;
uniform vec4 color;
uniform float unused;
void main()
{
    FragColor = color;
}";
        let mut compiler = NagaCompiler::new();
        let fs = compiler.compile(ShaderStage::Fragment, source).unwrap();
        let program = compiler.link("tint", &[&fs]).unwrap();

        assert_eq!(
            compiler.active_uniforms(&program),
            vec![UniformInfo::new("color", 1, "vec4")]
        );
    }

    #[test]
    fn gl_varyings_without_locations_link() {
        let vertex = "#version 330 core
layout (location = 0) in vec3 pos;
layout (location = 1) in vec3 col;
out vec3 color;
void main()
{
    gl_Position = vec4(pos, 1.0);
    color = col;
}";
        let fragment = "#version 330 core
out vec4 FragColor;
in vec3 color;
void main()
{
    FragColor = vec4(color, 1.0);
}";
        let mut compiler = NagaCompiler::new();
        let vs = compiler.compile(ShaderStage::Vertex, vertex).unwrap();
        let fs = compiler.compile(ShaderStage::Fragment, fragment).unwrap();
        let program = compiler.link("colorful", &[&vs, &fs]).unwrap();

        assert!(compiler.active_uniforms(&program).is_empty());
    }

    #[test]
    fn errors_point_at_author_lines() {
        let source = "#version 330 core
uniform mat4 model;
uniform mat4 view;
void main()
{
    gl_Position = model * undefined_thing;
}";
        let mut compiler = NagaCompiler::new();
        let CompileError::Compile { message, .. } =
            compiler.compile(ShaderStage::Vertex, source).unwrap_err()
        else {
            panic!("expected a compile error");
        };
        assert!(message.contains("undefined_thing"));
        assert!(message.contains(":6:"));
    }
}
