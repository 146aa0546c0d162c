//! The Preprocessor module expands structured directives (`fn`, `loop`,
//! `break`, `import`, ...) into plain assembly for a downstream assembler.
//!
//! It works line by line: the directive recognizer classifies each line,
//! a handler expands it against the scope stack, and the processor drives
//! the whole thing through every imported file.

pub mod directive;
pub mod error;
pub mod processor;
pub mod scope;

use std::path::Path;

pub use error::{CompilationError, DirectiveError, Error};
pub use processor::Processor;

/// Settings fixed for a whole run.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Config {
    /// Character required in front of directive keywords, e.g. `!loop`.
    pub marker: Option<char>,
    /// Indentation of generated instructions.
    pub indent: String,
    /// Start of an end-of-line comment.
    pub comment: char,
}

impl Default for Config {
    fn default() -> Self {
        Config { marker: None, indent: "    ".to_owned(), comment: ';' }
    }
}

/// Expands `path` and everything it imports, returning the output text.
pub fn preprocess(path: &Path, config: Config) -> Result<String, Error> {
    let mut processor = Processor::new(config)?;
    processor.process_file(path)?;
    info!("expanded `{}` into {} line(s)", path.display(), processor.lines().len());
    Ok(processor.finish())
}
