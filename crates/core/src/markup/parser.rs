use super::script::{ScriptDescriptor, extract_code};
use super::suggestions::{extract_suggestions, strip_suggestion_regions};

/// Opens a script block; the attribute list follows up to the closing `]`.
pub const SCRIPT_BLOCK_START: &str = "[SCRIPT_BLOCK:";
/// Closes a script block.
pub const SCRIPT_BLOCK_END: &str = "[/SCRIPT_BLOCK]";

/// One displayable unit of an assistant reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Plain text between script blocks, trimmed.
    Prose(String),
    /// A script block, possibly still arriving.
    ScriptBlock(ScriptBlock),
}

/// A `[SCRIPT_BLOCK: ...] ... [/SCRIPT_BLOCK]` region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptBlock {
    /// The `title` attribute. Empty while the header is still arriving.
    pub title: String,
    /// The `description` attribute. Empty while the header is still
    /// arriving.
    pub description: String,
    /// Everything between the header and the end marker (or the end of
    /// the available text), untouched. A partly arrived end marker is not
    /// part of it.
    pub body: String,
    /// Whether the end marker has arrived.
    pub complete: bool,
}

impl ScriptBlock {
    /// Returns the body with fences stripped.
    #[inline]
    pub fn code(&self) -> String {
        extract_code(&self.body)
    }

    /// Returns the script for viewing, or `None` while the block is still
    /// arriving.
    pub fn descriptor(&self) -> Option<ScriptDescriptor> {
        self.complete.then(|| ScriptDescriptor {
            title: self.title.clone(),
            description: self.description.clone(),
            code: self.code(),
        })
    }
}

/// The result of parsing the full text of a reply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedMessage {
    /// Segments in the order they appear in the text.
    pub segments: Vec<Segment>,
    /// Prompts of the first closed suggestion region, `None` if there is
    /// no closed region yet.
    pub suggestions: Option<Vec<String>>,
}

impl ParsedMessage {
    /// Iterates over the script blocks of the message.
    pub fn script_blocks(&self) -> impl Iterator<Item = &ScriptBlock> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::ScriptBlock(block) => Some(block),
            Segment::Prose(_) => None,
        })
    }
}

/// Parses the complete current text of a reply.
///
/// The text may be cut at any byte offset; markers that have not fully
/// arrived yet degrade to prose or to an incomplete block, and are picked
/// up by a later call on the longer text. Parsing identical text always
/// yields identical results, and growing the text only ever changes the
/// last segment.
pub fn parse_message(text: &str) -> ParsedMessage {
    let suggestions = extract_suggestions(text);
    let cleaned = strip_suggestion_regions(text);

    let mut segments = Vec::new();
    let mut rest = cleaned.trim();
    while !rest.is_empty() {
        let Some(start) = rest.find(SCRIPT_BLOCK_START) else {
            push_prose(&mut segments, rest);
            break;
        };
        push_prose(&mut segments, &rest[..start]);

        let candidate = &rest[start..];
        let (candidate, remaining) = match candidate.find(SCRIPT_BLOCK_END) {
            Some(idx) => candidate.split_at(idx + SCRIPT_BLOCK_END.len()),
            None => (candidate, ""),
        };
        segments.push(parse_candidate(candidate));
        rest = remaining;
    }

    ParsedMessage {
        segments,
        suggestions,
    }
}

fn push_prose(segments: &mut Vec<Segment>, fragment: &str) {
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        segments.push(Segment::Prose(fragment.to_owned()));
    }
}

fn parse_candidate(candidate: &str) -> Segment {
    let inner = &candidate[SCRIPT_BLOCK_START.len()..];
    let (inner, complete) = match inner.strip_suffix(SCRIPT_BLOCK_END) {
        Some(inner) => (inner, true),
        None => (inner, false),
    };

    let Some((header, body)) = split_header(inner) else {
        if complete {
            // The end marker arrived but the header never closed.
            return Segment::Prose(candidate.to_owned());
        }
        // The header is still streaming in.
        let attributes = Attributes::parse(inner);
        return Segment::ScriptBlock(ScriptBlock {
            title: attributes.title.unwrap_or_default(),
            description: attributes.description.unwrap_or_default(),
            body: String::new(),
            complete: false,
        });
    };

    let body = if complete {
        body
    } else {
        strip_partial_end(body)
    };
    let attributes = Attributes::parse(header);
    match (attributes.title, attributes.description) {
        (Some(title), Some(description)) => {
            Segment::ScriptBlock(ScriptBlock {
                title,
                description,
                body: body.to_owned(),
                complete,
            })
        }
        // A closed header without the required attributes is shown as
        // written.
        _ => Segment::Prose(candidate.trim().to_owned()),
    }
}

/// Drops a trailing fragment of the end marker that is still arriving.
fn strip_partial_end(body: &str) -> &str {
    (1..SCRIPT_BLOCK_END.len())
        .rev()
        .find(|&len| body.ends_with(&SCRIPT_BLOCK_END[..len]))
        .map_or(body, |len| &body[..body.len() - len])
}

/// Splits at the first `]` that is not inside a quoted value.
fn split_header(inner: &str) -> Option<(&str, &str)> {
    let mut in_quotes = false;
    for (idx, ch) in inner.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ']' if !in_quotes => {
                return Some((&inner[..idx], &inner[idx + 1..]));
            }
            _ => {}
        }
    }
    None
}

#[derive(Default)]
struct Attributes {
    title: Option<String>,
    description: Option<String>,
}

impl Attributes {
    /// Parses `key="value"` pairs separated by commas or whitespace.
    /// Parsing stops at the first malformed or unterminated pair, keeping
    /// what was read so far.
    fn parse(header: &str) -> Self {
        let mut attributes = Self::default();
        let mut rest = header;
        loop {
            rest = rest
                .trim_start_matches(|c: char| c == ',' || c.is_whitespace());
            let Some((key, after_key)) = rest.split_once('=') else {
                break;
            };
            let Some(after_quote) = after_key.trim_start().strip_prefix('"')
            else {
                break;
            };
            let Some((value, after_value)) = after_quote.split_once('"') else {
                break;
            };
            match key.trim() {
                "title" => attributes.title = Some(value.to_owned()),
                "description" => {
                    attributes.description = Some(value.to_owned())
                }
                other => trace!("ignoring script block attribute {other:?}"),
            }
            rest = after_value;
        }
        attributes
    }
}
