//! The marker protocol embedded in model replies.
//!
//! Replies are plain text with two kinds of marker regions:
//!
//! ````text
//! [SCRIPT_BLOCK: title="Kill Brick (v1.0)", description="Kills on touch"]
//! ```lua
//! ...
//! ```
//! [/SCRIPT_BLOCK]
//! [SUGGESTIONS]Add VFX|Add sound[/SUGGESTIONS]
//! ````
//!
//! Parsing always works on the whole text received so far and tolerates a
//! cut at any byte offset.

mod parser;
mod script;
mod suggestions;

pub use parser::{
    ParsedMessage, SCRIPT_BLOCK_END, SCRIPT_BLOCK_START, ScriptBlock, Segment,
    parse_message,
};
pub use script::{ScriptDescriptor, extract_code};
pub use suggestions::{
    SUGGESTION_DELIMITER, SUGGESTIONS_END, SUGGESTIONS_START,
    extract_suggestions, split_suggestions,
};
