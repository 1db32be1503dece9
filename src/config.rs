pub const PROMPT: &str = "> ";

// shown while a block or string is still open
pub const CONTINUATION_PROMPT: &str = "| ";

pub const HISTORY_FILE: &str = ".lox_history";

// exit codes for file mode
pub const EXIT_COMPILE_ERROR: i32 = 65;
pub const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Follow runtime errors with a one-line suggestion.
    pub show_hints: bool,
    pub dump_tokens: bool,
    pub dump_ast: bool,
}
