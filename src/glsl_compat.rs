//! Rewrites desktop-GL style GLSL into the dialect naga's GLSL front-end
//! accepts.
//!
//! - `#version` becomes `450 core` (prepended when missing).
//! - Loose `uniform` declarations of plain types move into a single block
//!   named [`DEFAULT_BLOCK`]. That block, opaque uniforms and blocks without a
//!   binding each get the next free binding in set 0.
//! - Top-level `in`/`out` declarations without a location get the next free
//!   location for their direction.
//!
//! Only single-line top-level declarations are rewritten. Every other line is
//! passed through, and the line count is kept so diagnostics still point at
//! the author's lines.

/// Name of the block holding the former default-block uniforms.
pub(crate) const DEFAULT_BLOCK: &str = "_DefaultUniforms";

const TARGET_VERSION: &str = "#version 450 core";

const AUX_QUALIFIERS: [&str; 7] = [
    "flat",
    "smooth",
    "noperspective",
    "centroid",
    "sample",
    "invariant",
    "precise",
];

const PRECISION_QUALIFIERS: [&str; 3] = ["lowp", "mediump", "highp"];

const OPAQUE_PREFIXES: [&str; 9] = [
    "sampler",
    "isampler",
    "usampler",
    "image",
    "iimage",
    "uimage",
    "texture",
    "itexture",
    "utexture",
];

pub(crate) fn to_naga_glsl(source: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let mut inputs = Slots::reserved(&lines, "in", "location");
    let mut outputs = Slots::reserved(&lines, "out", "location");
    let mut bindings = Slots::reserved(&lines, "uniform", "binding");

    let mut rewritten: Vec<String> = Vec::with_capacity(lines.len() + 1);
    let mut members: Vec<&str> = Vec::new();
    let mut block: Option<(usize, u32)> = None;
    let mut has_version = false;
    let mut in_comment = false;

    for &line in &lines {
        let trimmed = line.trim();
        let commented = in_comment;
        in_comment = still_in_comment(trimmed, in_comment);
        if commented {
            rewritten.push(line.to_string());
            continue;
        }

        if trimmed.starts_with("#version") {
            has_version = true;
            rewritten.push(TARGET_VERSION.to_string());
            continue;
        }

        let code = strip_line_comment(trimmed);
        let Some(decl) = Declaration::parse(code) else {
            rewritten.push(line.to_string());
            continue;
        };
        let indent = &line[..line.len() - line.trim_start().len()];

        let replacement = match decl.storage {
            "uniform" if decl.is_loose_uniform() => {
                if block.is_none() {
                    block = Some((rewritten.len(), bindings.claim(1)));
                }
                members.push(decl.rest["uniform".len()..].trim_start());
                String::new()
            }
            "uniform" if !decl.has_key("binding") => {
                let binding = bindings.claim(1);
                decl.with_layout(indent, &format!("set = 0, binding = {binding}"))
            }
            "in" | "out" if decl.is_variable() && !decl.has_key("location") => {
                let slots = if decl.storage == "in" {
                    &mut inputs
                } else {
                    &mut outputs
                };
                let location = slots.claim(decl.location_span());
                decl.with_layout(indent, &format!("location = {location}"))
            }
            _ => line.to_string(),
        };
        rewritten.push(replacement);
    }

    if let Some((at, binding)) = block {
        rewritten[at] = format!(
            "layout(set = 0, binding = {binding}) uniform {DEFAULT_BLOCK} {{ {} }};",
            members.join(" ")
        );
    }

    let mut out = String::with_capacity(source.len() + 128);
    if !has_version {
        out.push_str(TARGET_VERSION);
        out.push('\n');
    }
    out.push_str(&rewritten.join("\n"));
    out.push('\n');
    out
}

/// A top-level declaration split into its layout qualifiers and the rest.
struct Declaration<'a> {
    layout: Option<&'a str>,
    /// Everything after the layout, starting at the first qualifier.
    rest: &'a str,
    storage: &'a str,
    ty: Option<&'a str>,
}

impl<'a> Declaration<'a> {
    fn parse(code: &'a str) -> Option<Self> {
        let (layout, rest) = match code.strip_prefix("layout") {
            Some(after) => {
                let inner = after.trim_start().strip_prefix('(')?;
                let close = inner.find(')')?;
                (Some(inner[..close].trim()), inner[close + 1..].trim_start())
            }
            None => (None, code),
        };

        let mut words = rest
            .split(|c: char| c.is_whitespace() || c == ';' || c == '[')
            .filter(|word| !word.is_empty())
            .skip_while(|word| AUX_QUALIFIERS.contains(word));
        let storage = words.next()?;
        if !matches!(storage, "uniform" | "in" | "out") {
            return None;
        }
        let ty = words.find(|word| !PRECISION_QUALIFIERS.contains(word));

        Some(Self {
            layout,
            rest,
            storage,
            ty,
        })
    }

    fn has_key(&self, key: &str) -> bool {
        self.layout.is_some_and(|layout| {
            layout
                .split(',')
                .any(|item| item.split('=').next().is_some_and(|k| k.trim() == key))
        })
    }

    fn key_value(&self, key: &str) -> Option<u32> {
        self.layout?.split(',').find_map(|item| {
            let (k, v) = item.split_once('=')?;
            (k.trim() == key).then(|| v.trim().parse().ok())?
        })
    }

    /// A single-line declaration with a type and a name, not a block.
    fn is_variable(&self) -> bool {
        self.ty.is_some() && self.rest.ends_with(';') && !self.rest.contains('{')
    }

    fn is_loose_uniform(&self) -> bool {
        self.layout.is_none()
            && self.is_variable()
            && self
                .ty
                .is_some_and(|ty| !OPAQUE_PREFIXES.iter().any(|prefix| ty.starts_with(*prefix)))
    }

    /// Locations used by the declared variable: matrix columns times array length.
    fn location_span(&self) -> u32 {
        let columns = self
            .ty
            .and_then(|ty| ty.trim_start_matches('d').strip_prefix("mat"))
            .and_then(|dims| dims.chars().next())
            .and_then(|c| c.to_digit(10))
            .unwrap_or(1);
        let elements = self
            .rest
            .split_once('[')
            .and_then(|(_, after)| after.split_once(']'))
            .and_then(|(len, _)| len.trim().parse().ok())
            .unwrap_or(1);
        columns * elements
    }

    fn with_layout(&self, indent: &str, extra: &str) -> String {
        match self.layout {
            Some(existing) if !existing.is_empty() => {
                format!("{indent}layout({existing}, {extra}) {}", self.rest)
            }
            _ => format!("{indent}layout({extra}) {}", self.rest),
        }
    }
}

/// Locations of one direction, or uniform bindings, already in use.
struct Slots {
    taken: Vec<u32>,
}

impl Slots {
    fn reserved(lines: &[&str], storage: &str, key: &str) -> Self {
        let mut taken = Vec::new();
        for line in lines {
            let Some(decl) = Declaration::parse(strip_line_comment(line.trim())) else {
                continue;
            };
            if decl.storage != storage {
                continue;
            }
            if let Some(start) = decl.key_value(key) {
                let span = if key == "location" {
                    decl.location_span()
                } else {
                    1
                };
                taken.extend(start..start + span);
            }
        }
        Self { taken }
    }

    fn claim(&mut self, span: u32) -> u32 {
        let mut start = 0;
        while (start..start + span).any(|location| self.taken.contains(&location)) {
            start += 1;
        }
        self.taken.extend(start..start + span);
        start
    }
}

fn strip_line_comment(code: &str) -> &str {
    code.split_once("//").map_or(code, |(before, _)| before).trim_end()
}

/// Whether a `/* */` comment is still open after `line`.
fn still_in_comment(line: &str, mut open: bool) -> bool {
    let mut rest = line;
    loop {
        if open {
            match rest.find("*/") {
                Some(end) => {
                    open = false;
                    rest = &rest[end + 2..];
                }
                None => return true,
            }
        } else {
            let code = rest.split_once("//").map_or(rest, |(before, _)| before);
            match code.find("/*") {
                Some(start) => {
                    open = true;
                    rest = &code[start + 2..];
                }
                None => return false,
            }
        }
    }
}
