//! Recognizes directive lines.
//!
//! Every pattern is anchored at both ends of the line and captures the
//! leading whitespace and the trailing comment so the expansion can be put
//! back in place. Lines that match nothing are not directives.
use regex::{Captures, Regex};

use super::Config;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Directive {
    Import { path: String },
    FunctionOpen { name: String, flags: Option<String> },
    LoopOpen { name: String, skip: bool },
    End,
    MakeLabel { name: String },
    JumpToLabel { jump: String, name: String },
    Return { jump: Option<String>, value: Option<String> },
    Next { jump: Option<String>, name: Option<String> },
    Break { jump: Option<String>, name: Option<String> },
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum DirectiveKind {
    Import,
    FunctionOpen,
    LoopOpen,
    End,
    Return,
    Next,
    Break,
    MakeLabel,
    JumpToLabel,
}

/// A recognized line, split around its directive.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DirectiveLine<'a> {
    pub leading: &'a str,
    pub directive: Directive,
    pub trailing: &'a str,
}

/// One line produced by a directive handler.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Emit {
    /// A label definition. Always written flush left.
    Label(String),
    /// A generated instruction, indented by the configured indent.
    Instruction(String),
    /// Text that keeps the indentation of the directive line.
    Text(String),
}

const JUMP_INSTR: &str = r"(?:(?P<jump>[a-z]{3})\s+)";
const NAME: &str = r"(?P<name>[a-z_]+)";

pub struct Recognizer {
    patterns: Vec<(DirectiveKind, Regex)>,
}

impl Recognizer {
    pub fn new(config: &Config) -> Result<Self, regex::Error> {
        use DirectiveKind::*;

        let marker = config.marker.map(|c| regex::escape(&c.to_string())).unwrap_or_default();
        let comment = regex::escape(&config.comment.to_string());
        // The value of `return` runs up to the comment.
        let value = format!(r"[^{}]+?", comment);

        let bodies = vec![
            (Import,       format!(r#"{m}import\s+"(?P<path>[^"]+)""#, m = marker)),
            (FunctionOpen, format!(r"{m}fn(?:\s*\[(?P<flags>[\x20a-z_-]+)\])?\s+{n}\s*\{{", m = marker, n = NAME)),
            (LoopOpen,     format!(r"{m}(?:loop|(?P<skip>skip))\s+{n}\s*\{{", m = marker, n = NAME)),
            (End,          r"\}".to_owned()),
            (Return,       format!(r"{j}?{m}return(?:\s+(?P<value>{v}))?", j = JUMP_INSTR, m = marker, v = value)),
            (Next,         format!(r"{j}?{m}next(?:\s+{n})?", j = JUMP_INSTR, m = marker, n = NAME)),
            (Break,        format!(r"{j}?{m}break(?:\s+{n})?", j = JUMP_INSTR, m = marker, n = NAME)),
            (MakeLabel,    format!(r"{m}label\s+{n}", m = marker, n = NAME)),
            (JumpToLabel,  format!(r"{j}{m}label\s+{n}", j = JUMP_INSTR, m = marker, n = NAME)),
        ];

        let mut patterns = Vec::with_capacity(bodies.len());
        for (kind, body) in bodies {
            let full = format!(r"(?i)^(?P<leading>\s*){}(?P<trailing>\s*(?:{}.*)?)$", body, comment);
            patterns.push((kind, Regex::new(&full)?));
        }

        Ok(Recognizer { patterns })
    }

    /// Tries the patterns in order and returns the first match.
    pub fn recognize<'a>(&self, line: &'a str) -> Option<DirectiveLine<'a>> {
        for (kind, re) in &self.patterns {
            if let Some(caps) = re.captures(line) {
                let leading = caps.name("leading").map_or("", |m| m.as_str());
                let trailing = caps.name("trailing").map_or("", |m| m.as_str());
                return Some(DirectiveLine { leading, directive: directive(*kind, &caps), trailing });
            }
        }
        None
    }
}

fn field(caps: &Captures, name: &str) -> Option<String> {
    caps.name(name).map(|m| m.as_str().trim().to_owned()).filter(|s| !s.is_empty())
}

fn required(caps: &Captures, name: &str) -> String {
    field(caps, name).unwrap_or_default()
}

fn directive(kind: DirectiveKind, caps: &Captures) -> Directive {
    match kind {
        DirectiveKind::Import => Directive::Import { path: required(caps, "path") },
        DirectiveKind::FunctionOpen => Directive::FunctionOpen {
            name: required(caps, "name"),
            flags: field(caps, "flags"),
        },
        DirectiveKind::LoopOpen => Directive::LoopOpen {
            name: required(caps, "name"),
            skip: caps.name("skip").is_some(),
        },
        DirectiveKind::End => Directive::End,
        DirectiveKind::Return => Directive::Return { jump: field(caps, "jump"), value: field(caps, "value") },
        DirectiveKind::Next => Directive::Next { jump: field(caps, "jump"), name: field(caps, "name") },
        DirectiveKind::Break => Directive::Break { jump: field(caps, "jump"), name: field(caps, "name") },
        DirectiveKind::MakeLabel => Directive::MakeLabel { name: required(caps, "name") },
        DirectiveKind::JumpToLabel => Directive::JumpToLabel {
            jump: required(caps, "jump"),
            name: required(caps, "name"),
        },
    }
}

/// Puts an expansion back in the place of its directive line.
///
/// Labels go to column 0, everything else gets the directive's leading
/// whitespace. The trailing comment stays on the first emitted line, or on
/// a line of its own when the directive expands to nothing.
pub fn reassemble(line: &DirectiveLine, emitted: Vec<Emit>, indent: &str) -> Vec<String> {
    let mut out: Vec<String> = emitted
        .into_iter()
        .map(|emit| match emit {
            Emit::Label(name) => format!("{}:", name),
            Emit::Instruction(text) => format!("{}{}{}", line.leading, indent, text),
            Emit::Text(text) => format!("{}{}", line.leading, text),
        })
        .collect();

    match out.first_mut() {
        Some(first) => first.push_str(line.trailing),
        None if !line.trailing.trim().is_empty() => {
            out.push(format!("{}{}", line.leading, line.trailing.trim_start()))
        }
        None => {}
    }
    out
}
