use serde::{Deserialize, Serialize};

const FENCE: &str = "```";
const SCRIPT_FENCE_TAGS: [&str; 2] = ["lua", "luau"];

/// A finished script picked from a reply, ready to be viewed or handed to
/// an external runtime.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptDescriptor {
    /// Title including the version, like `Kill Brick (v1.0)`.
    pub title: String,
    /// One-sentence summary of what the script does.
    pub description: String,
    /// The script source without any fences.
    pub code: String,
}

/// Normalizes the raw body of a script block into plain source code.
///
/// A fence tagged `lua` or `luau` wins: only its interior is returned, and
/// an unterminated one yields everything after its header line. Without
/// such a fence, a leading fence line and a trailing fence are stripped if
/// present. No syntax checks are made.
pub fn extract_code(body: &str) -> String {
    let body = body.trim();
    if let Some(code) = script_fence_interior(body) {
        return tidy(code).to_owned();
    }

    let mut code = body;
    if code.starts_with(FENCE) {
        code = match code.find('\n') {
            Some(idx) => &code[idx + 1..],
            // Only the opening fence has arrived.
            None => "",
        };
    }
    if let Some(stripped) = code.strip_suffix(FENCE) {
        code = stripped;
    }
    tidy(code).to_owned()
}

fn script_fence_interior(body: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(offset) = body[search_from..].find(FENCE) {
        let fence_start = search_from + offset;
        let info_start = fence_start + FENCE.len();
        let line_end = info_start + body[info_start..].find('\n')?;
        let tag = body[info_start..line_end].trim();

        if SCRIPT_FENCE_TAGS
            .iter()
            .any(|known| tag.eq_ignore_ascii_case(known))
        {
            let code_start = line_end + 1;
            let code = match body[code_start..].find(FENCE) {
                Some(len) => &body[code_start..code_start + len],
                None => &body[code_start..],
            };
            return Some(code);
        }
        search_from = line_end;
    }
    None
}

/// Drops blank lines around the code while keeping the indentation of
/// its first line.
fn tidy(code: &str) -> &str {
    let code = code.trim_end();
    let Some(first_visible) = code.find(|c: char| !c.is_whitespace()) else {
        return "";
    };
    let line_start = code[..first_visible].rfind('\n').map_or(0, |i| i + 1);
    &code[line_start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_and_bare() {
        assert_eq!(extract_code("```lua\nprint(1)\n```"), "print(1)");
        assert_eq!(extract_code("print(1)"), "print(1)");
        assert_eq!(extract_code("\n  ```Luau\nprint(1)\n```\n"), "print(1)");
    }

    #[test]
    fn test_prose_around_fence() {
        let body = "Here you go:\n```lua\nlocal x = 1\n```\nEnjoy!";
        assert_eq!(extract_code(body), "local x = 1");
    }

    #[test]
    fn test_generic_fence() {
        assert_eq!(extract_code("```\nprint(1)\n```"), "print(1)");
        assert_eq!(extract_code("```python\nprint(1)\n```"), "print(1)");
    }

    #[test]
    fn test_keeps_indentation() {
        let body = "```lua\n\n\tif ok then\n\t\treturn\n\tend\n```";
        assert_eq!(extract_code(body), "\tif ok then\n\t\treturn\n\tend");
    }

    #[test]
    fn test_truncated_bodies() {
        assert_eq!(extract_code("```lua\nlocal part = "), "local part =");
        assert_eq!(extract_code("```lu"), "");
        assert_eq!(extract_code("```lua\nprint(1)\n``"), "print(1)\n``");
        assert_eq!(extract_code(""), "");
    }
}
