//! The scope stack tracks which `fn` and `loop` blocks are open while a
//! file is being expanded, and derives every synthesized label from it.
//!
//! Labels are built from the path of frame names, outermost first:
//!
//! ```nasm
//! fn [sva] draw {          ; draw:
//!     loop rows {          ; .draw_rows__loop_begin:
//!         skip cols {      ; .draw_rows_cols__loop_begin:
//!             break rows   ;     jmp .draw_rows__loop_end
//!         }                ; .draw_rows_cols__loop_end:
//!     }                    ; .draw_rows__loop_end:
//! }                        ; .draw__return:
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::error::DirectiveError;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ScopeKind {
    Function,
    Loop,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScopeKind::Function => write!(f, "function"),
            ScopeKind::Loop => write!(f, "loop"),
        }
    }
}

/// Behaviour switches of a frame. The save flags are only valid on
/// functions and `Skip` only on loops.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum ScopeFlag {
    SaveA,
    SaveX,
    SaveY,
    Skip,
}

impl FromStr for ScopeFlag {
    type Err = DirectiveError;

    /// Parses a function flag token. `skip` is spelled as a keyword,
    /// never as a flag, so it is not accepted here.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.to_ascii_lowercase().as_str() {
            "save-a" | "sva" => Ok(ScopeFlag::SaveA),
            "save-x" | "svx" => Ok(ScopeFlag::SaveX),
            "save-y" | "svy" => Ok(ScopeFlag::SaveY),
            _ => Err(DirectiveError::new(format!("Unknown function flag: {}", token))),
        }
    }
}

impl ScopeFlag {
    /// Register push/pull mnemonics for the save flags.
    pub fn save_instructions(&self) -> Option<(&'static str, &'static str)> {
        match self {
            ScopeFlag::SaveA => Some(("pha", "pla")),
            ScopeFlag::SaveX => Some(("phx", "plx")),
            ScopeFlag::SaveY => Some(("phy", "ply")),
            ScopeFlag::Skip => None,
        }
    }
}

/// Parses the space separated text between the brackets of `fn [...]`.
pub fn parse_function_flags(text: &str) -> Result<BTreeSet<ScopeFlag>, DirectiveError> {
    text.split_whitespace().map(ScopeFlag::from_str).collect()
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ScopeFrame {
    pub kind: ScopeKind,
    pub name: String,
    pub flags: BTreeSet<ScopeFlag>,
}

impl ScopeFrame {
    pub fn function(name: &str, flags: BTreeSet<ScopeFlag>) -> Self {
        ScopeFrame { kind: ScopeKind::Function, name: name.to_owned(), flags }
    }

    pub fn new_loop(name: &str, skip: bool) -> Self {
        let mut flags = BTreeSet::new();
        if skip {
            flags.insert(ScopeFlag::Skip);
        }
        ScopeFrame { kind: ScopeKind::Loop, name: name.to_owned(), flags }
    }

    pub fn has(&self, flag: ScopeFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Save flags in register order (A, X, Y).
    pub fn saved_registers(&self) -> impl DoubleEndedIterator<Item = (&'static str, &'static str)> + '_ {
        self.flags.iter().filter_map(|flag| flag.save_instructions())
    }
}

impl fmt::Display for ScopeFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// Outermost frame first. Only the open/end handlers push and pop.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack { frames: Vec::new() }
    }

    pub fn push(&mut self, frame: ScopeFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<ScopeFrame> {
        self.frames.pop()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[ScopeFrame] {
        &self.frames
    }

    pub fn innermost(&self) -> Option<&ScopeFrame> {
        self.frames.last()
    }

    /// The enclosing function, which can only ever sit at the bottom.
    pub fn function(&self) -> Option<&ScopeFrame> {
        self.frames.first().filter(|frame| frame.kind == ScopeKind::Function)
    }

    /// Mangled label of the whole stack.
    pub fn mangled(&self) -> String {
        mangle(&self.frames)
    }

    /// Mangled label of the stack cut just after the outermost loop called
    /// `name`, or `None` when no such loop is open.
    pub fn mangled_through_loop(&self, name: &str) -> Option<String> {
        self.frames
            .iter()
            .position(|frame| frame.kind == ScopeKind::Loop && frame.name == name)
            .map(|idx| mangle(&self.frames[..=idx]))
    }

    /// Namespace for user labels: `.<function>__` inside a function and
    /// nothing at the top level.
    pub fn label_prefix(&self) -> String {
        match self.function() {
            Some(function) => format!(".{}__", function.name),
            None => String::new(),
        }
    }
}

/// `.` followed by the frame names joined with `_`.
pub fn mangle(frames: &[ScopeFrame]) -> String {
    let names: Vec<&str> = frames.iter().map(|frame| frame.name.as_str()).collect();
    format!(".{}", names.join("_"))
}

pub fn loop_begin_label(mangled: &str) -> String {
    format!("{}__loop_begin", mangled)
}

pub fn loop_end_label(mangled: &str) -> String {
    format!("{}__loop_end", mangled)
}

pub fn return_label(function: &str) -> String {
    format!(".{}__return", function)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(frames: Vec<ScopeFrame>) -> ScopeStack {
        let mut stack = ScopeStack::new();
        for frame in frames {
            stack.push(frame);
        }
        stack
    }

    #[test]
    fn test_parse_function_flags() {
        let flags = parse_function_flags("save-a save-y").unwrap();
        assert_eq!(flags.into_iter().collect::<Vec<_>>(), vec![ScopeFlag::SaveA, ScopeFlag::SaveY]);

        let flags = parse_function_flags("SVY  svx SVA").unwrap();
        assert_eq!(flags.into_iter().collect::<Vec<_>>(), vec![ScopeFlag::SaveA, ScopeFlag::SaveX, ScopeFlag::SaveY]);

        assert!(parse_function_flags("").unwrap().is_empty());
        assert_eq!(
            parse_function_flags("save-a save-z"),
            Err(DirectiveError::new("Unknown function flag: save-z"))
        );
        assert!(parse_function_flags("skip").is_err());
    }

    #[test]
    fn test_saved_registers_order() {
        let flags = parse_function_flags("save-y save-a").unwrap();
        let frame = ScopeFrame::function("f", flags);
        let push: Vec<_> = frame.saved_registers().map(|(push, _)| push).collect();
        let pull: Vec<_> = frame.saved_registers().rev().map(|(_, pull)| pull).collect();
        assert_eq!(push, vec!["pha", "phy"]);
        assert_eq!(pull, vec!["ply", "pla"]);
    }

    #[test]
    fn test_mangle() {
        let s = stack(vec![
            ScopeFrame::function("draw", BTreeSet::new()),
            ScopeFrame::new_loop("rows", false),
            ScopeFrame::new_loop("cols", true),
        ]);
        assert_eq!(s.mangled(), ".draw_rows_cols");
        assert_eq!(loop_begin_label(&s.mangled()), ".draw_rows_cols__loop_begin");
        assert_eq!(loop_end_label(&s.mangled()), ".draw_rows_cols__loop_end");
        assert_eq!(s.label_prefix(), ".draw__");
        assert_eq!(s.function().map(|f| f.name.as_str()), Some("draw"));
        assert_eq!(s.innermost().map(|f| f.has(ScopeFlag::Skip)), Some(true));

        let top = stack(vec![ScopeFrame::new_loop("main", false)]);
        assert_eq!(top.mangled(), ".main");
        assert_eq!(top.label_prefix(), "");
        assert!(top.function().is_none());
    }

    #[test]
    fn test_mangled_through_loop() {
        let s = stack(vec![
            ScopeFrame::function("outer", BTreeSet::new()),
            ScopeFrame::new_loop("outer", false),
            ScopeFrame::new_loop("inner", false),
        ]);
        // The function frame is never a loop target even if the names collide.
        assert_eq!(s.mangled_through_loop("outer"), Some(".outer_outer".to_owned()));
        assert_eq!(s.mangled_through_loop("inner"), Some(".outer_outer_inner".to_owned()));
        assert_eq!(s.mangled_through_loop("missing"), None);
    }

    #[test]
    fn test_frame_display() {
        assert_eq!(ScopeFrame::new_loop("rows", true).to_string(), "loop rows");
        assert_eq!(ScopeFrame::function("draw", BTreeSet::new()).to_string(), "function draw");
    }
}
