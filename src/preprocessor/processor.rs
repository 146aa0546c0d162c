//! The Processor expands one top-level file (and everything it imports)
//! into plain assembly text.
//!
//! A Processor is a single run: it owns the scope stack, the set of files
//! already imported and the accumulated output.
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::directive::{reassemble, Directive, Emit, Recognizer};
use super::error::{CompilationError, DirectiveError, Error};
use super::scope::{self, parse_function_flags, ScopeFlag, ScopeFrame, ScopeKind, ScopeStack};
use super::Config;

/// Jump used when a directive does not name its own.
const DEFAULT_JUMP: &str = "jmp";

/// Where the line being expanded came from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SourcePosition {
    pub file: PathBuf,
    pub line: usize,
}

impl SourcePosition {
    fn error(&self, err: DirectiveError) -> CompilationError {
        CompilationError { file: self.file.clone(), line: self.line, message: err.message }
    }
}

pub struct Processor {
    config: Config,
    recognizer: Recognizer,
    scopes: ScopeStack,
    imported: HashSet<PathBuf>,
    out: Vec<String>,
}

impl Processor {
    pub fn new(config: Config) -> Result<Self, Error> {
        let recognizer = Recognizer::new(&config)?;
        Ok(Processor { config, recognizer, scopes: ScopeStack::new(), imported: HashSet::new(), out: Vec::new() })
    }

    /// Expands `path` into the output. Files that were already imported
    /// during this run are replaced by a skip marker.
    pub fn process_file(&mut self, path: &Path) -> Result<(), Error> {
        let path = fs::canonicalize(path).map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
        if self.imported.contains(&path) {
            debug!("skipping already imported file `{}`", path.display());
            let marker = self.marker("Skipping", &path);
            self.out.push(marker);
            return Ok(());
        }

        let source = fs::read_to_string(&path).map_err(|source| Error::Io { path: path.clone(), source })?;
        self.process_source(&path, &source)
    }

    /// Expands `source` as if it were the contents of `path`. Imports are
    /// resolved relative to the directory of `path`.
    pub fn process_source(&mut self, path: &Path, source: &str) -> Result<(), Error> {
        let top_level = self.imported.is_empty();
        self.imported.insert(path.to_path_buf());

        if !top_level {
            debug!("importing `{}`", path.display());
            let marker = self.marker("Begin import", path);
            self.out.push(marker);
        }

        let mut pos = SourcePosition { file: path.to_path_buf(), line: 0 };
        for (index, line) in source.lines().enumerate() {
            pos.line = index + 1;
            self.process_line(line, &pos)?;
        }

        if !self.scopes.is_empty() {
            let open: Vec<String> = self.scopes.frames().iter().map(|frame| frame.to_string()).collect();
            return Err(pos.error(DirectiveError::new(format!(
                "File ends with unclosed contexts:\n{}",
                open.join("\n")
            )))
            .into());
        }

        if !top_level {
            let marker = self.marker("End import", path);
            self.out.push(marker);
        }
        Ok(())
    }

    /// Consumes the processor, returning the output text.
    pub fn finish(self) -> String {
        let mut text = self.out.join("\n");
        text.push('\n');
        text
    }

    pub fn lines(&self) -> &[String] {
        &self.out
    }

    fn process_line(&mut self, line: &str, pos: &SourcePosition) -> Result<(), Error> {
        let matched = match self.recognizer.recognize(line) {
            Some(matched) => matched,
            None => {
                self.out.push(line.to_owned());
                return Ok(());
            }
        };

        let emitted = self.handle(&matched.directive, pos)?;

        let lines = reassemble(&matched, emitted, &self.config.indent);
        self.out.extend(lines);
        Ok(())
    }

    fn import(&mut self, path: &str, pos: &SourcePosition) -> Result<(), Error> {
        if !self.scopes.is_empty() {
            return Err(pos.error(DirectiveError::new("Imports can only happen at the top level.")).into());
        }
        let dir = pos.file.parent().unwrap_or_else(|| Path::new(""));
        self.process_file(&dir.join(path))
    }

    fn handle(&mut self, directive: &Directive, pos: &SourcePosition) -> Result<Vec<Emit>, Error> {
        let expanded = match directive {
            Directive::Import { path } => return self.import(path, pos).map(|()| Vec::new()),
            Directive::FunctionOpen { name, flags } => self.function_open(name, flags.as_deref()),
            Directive::LoopOpen { name, skip } => Ok(self.loop_open(name, *skip)),
            Directive::End => self.end(),
            Directive::MakeLabel { name } => Ok(vec![Emit::Label(self.user_label(name))]),
            Directive::JumpToLabel { jump, name } => {
                Ok(vec![Emit::Text(format!("{} {}", jump, self.user_label(name)))])
            }
            Directive::Return { jump, .. } => self.ret(jump.as_deref()),
            Directive::Next { jump, name } => {
                self.loop_jump("next", jump.as_deref(), name.as_deref(), scope::loop_begin_label)
            }
            Directive::Break { jump, name } => {
                self.loop_jump("break", jump.as_deref(), name.as_deref(), scope::loop_end_label)
            }
        };
        expanded.map_err(|e| pos.error(e).into())
    }

    fn function_open(&mut self, name: &str, flags: Option<&str>) -> Result<Vec<Emit>, DirectiveError> {
        if !self.scopes.is_empty() {
            return Err(DirectiveError::new("Functions can only be defined at the top level."));
        }
        let frame = ScopeFrame::function(name, parse_function_flags(flags.unwrap_or(""))?);

        let mut out = vec![Emit::Label(name.to_owned())];
        out.extend(frame.saved_registers().map(|(push, _)| Emit::Instruction(push.to_owned())));
        self.scopes.push(frame);
        Ok(out)
    }

    fn loop_open(&mut self, name: &str, skip: bool) -> Vec<Emit> {
        let frame = ScopeFrame::new_loop(name, skip);
        let skips = frame.has(ScopeFlag::Skip);
        self.scopes.push(frame);
        let label = self.scopes.mangled();

        let mut out = vec![Emit::Label(scope::loop_begin_label(&label))];
        if skips {
            out.push(Emit::Instruction(format!("{} {}", DEFAULT_JUMP, scope::loop_end_label(&label))));
        }
        out
    }

    fn end(&mut self) -> Result<Vec<Emit>, DirectiveError> {
        let label = self.scopes.mangled();
        let frame = match self.scopes.pop() {
            Some(frame) => frame,
            None => return Err(DirectiveError::new("Cannot call end outside of function or loop.")),
        };

        match frame.kind {
            ScopeKind::Loop => Ok(vec![
                Emit::Instruction(format!("{} {}", DEFAULT_JUMP, scope::loop_begin_label(&label))),
                Emit::Label(scope::loop_end_label(&label)),
            ]),
            ScopeKind::Function => {
                let mut out = vec![Emit::Label(scope::return_label(&frame.name))];
                out.extend(frame.saved_registers().rev().map(|(_, pull)| Emit::Instruction(pull.to_owned())));
                out.push(Emit::Instruction("rts".to_owned()));
                Ok(out)
            }
        }
    }

    fn user_label(&self, name: &str) -> String {
        format!("{}{}", self.scopes.label_prefix(), name)
    }

    fn ret(&self, jump: Option<&str>) -> Result<Vec<Emit>, DirectiveError> {
        let function = match self.scopes.function() {
            Some(function) => function,
            None => return Err(DirectiveError::new("Cannot call return outside of a function.")),
        };
        let jump = jump.unwrap_or(DEFAULT_JUMP);
        Ok(vec![Emit::Text(format!("{} {}", jump, scope::return_label(&function.name)))])
    }

    fn loop_jump(
        &self,
        what: &str,
        jump: Option<&str>,
        name: Option<&str>,
        target: fn(&str) -> String,
    ) -> Result<Vec<Emit>, DirectiveError> {
        match self.scopes.innermost() {
            Some(frame) if frame.kind == ScopeKind::Loop => {}
            _ => return Err(DirectiveError::new(format!("Cannot call {} outside of a loop.", what))),
        }

        let label = match name {
            None => self.scopes.mangled(),
            Some(name) => match self.scopes.mangled_through_loop(name) {
                Some(label) => label,
                None => return Err(DirectiveError::new(format!("Cannot find loop label {}", name))),
            },
        };
        let jump = jump.unwrap_or(DEFAULT_JUMP);
        Ok(vec![Emit::Text(format!("{} {}", jump, target(&label)))])
    }

    fn marker(&self, what: &str, path: &Path) -> String {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        format!("{}---- {}: {}", self.config.comment, what, name)
    }
}
