/// One `name : shader, shader, ...` line of the program-definition list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramDecl {
    pub name: String,
    pub shaders: Vec<String>,
    /// 1-based line in the source text.
    pub line: usize,
}

/// A malformed program-definition line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramListError {
    pub line: usize,
    pub reason: String,
}

/// Parses a program-definition list, keeping declaration order.
///
/// Blank lines and `#` comments are skipped. Whitespace around names is ignored.
pub fn parse_program_list(text: &str) -> Result<Vec<ProgramDecl>, ProgramListError> {
    let mut decls = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fail = |reason: &str| ProgramListError {
            line,
            reason: reason.to_string(),
        };

        let (name, body) = trimmed
            .split_once(':')
            .ok_or_else(|| fail("expected `name : shader, ...`"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(fail("missing program name"));
        }

        let shaders: Vec<String> = body.split(',').map(|s| s.trim().to_string()).collect();
        if shaders.iter().any(String::is_empty) {
            return Err(fail("empty shader name"));
        }

        decls.push(ProgramDecl {
            name: name.to_string(),
            shaders,
            line,
        });
    }

    Ok(decls)
}
