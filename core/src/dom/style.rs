//! Inline `style` attribute helpers and CSS value parsing.

/// Iterate `(property, value)` pairs of a declaration block.
///
/// Property names are lowercased; values are trimmed and lose `!important`.
pub fn declarations(block: &str) -> impl Iterator<Item = (String, &str)> {
    block.split(';').filter_map(|decl| {
        let (property, value) = decl.split_once(':')?;
        let property = property.trim().to_ascii_lowercase();
        if property.is_empty() {
            return None;
        }
        let value = value.trim();
        let value = value.strip_suffix("!important").map_or(value, str::trim_end);
        Some((property, value))
    })
}

/// Last value declared for `property` (later declarations win, as in CSS).
pub fn declaration<'a>(block: &'a str, property: &str) -> Option<&'a str> {
    declarations(block)
        .filter(|(name, _)| name.eq_ignore_ascii_case(property))
        .map(|(_, value)| value)
        .last()
}

/// Set `property` to `value` (or remove it) inside a declaration block.
///
/// Only the affected declaration is touched; every other byte of the block
/// keeps its original spelling. Removing a declaration this function
/// appended restores the block it started from.
pub fn with_declaration(block: &str, property: &str, value: Option<&str>) -> String {
    match value {
        Some(value) => set_declaration(block, property, value),
        None => {
            let mut out = block.to_string();
            while let Some(range) = removal_range(&out, property) {
                out.replace_range(range, "");
            }
            out
        }
    }
}

fn set_declaration(block: &str, property: &str, value: &str) -> String {
    if declaration(block, property) == Some(value) {
        return block.to_string();
    }
    let last = segments(block)
        .into_iter()
        .filter(|&(start, end)| declares(&block[start..end], property))
        .last();
    if let Some((start, end)) = last {
        // Splice the new value over the old one, keeping the surrounding spacing.
        let colon = block[start..end].find(':').map_or(start, |i| start + i);
        let raw = &block[colon + 1..end];
        let lead = raw.len() - raw.trim_start().len();
        let trail = raw.len() - raw.trim_end().len();
        let value_start = colon + 1 + lead;
        let value_end = (end - trail).max(value_start);
        return format!("{}{}{}", &block[..value_start], value, &block[value_end..]);
    }

    let property = property.to_ascii_lowercase();
    if block.trim().is_empty() {
        format!("{property}: {value}")
    } else if block.trim_end().ends_with(';') {
        format!("{block} {property}: {value};")
    } else {
        format!("{block}; {property}: {value}")
    }
}

/// Byte range covering the first `property` declaration and one separator.
fn removal_range(block: &str, property: &str) -> Option<std::ops::Range<usize>> {
    let segments = segments(block);
    let index = segments
        .iter()
        .position(|&(start, end)| declares(&block[start..end], property))?;
    let (start, end) = segments[index];
    Some(match (index.checked_sub(1), segments.get(index + 1)) {
        // Take the `;` in front of it.
        (Some(previous), _) => segments[previous].1..end,
        // First declaration: take the `;` after it and the spacing that follows.
        (None, Some(&(next_start, next_end))) => {
            let next = &block[next_start..next_end];
            start..next_start + (next.len() - next.trim_start().len())
        }
        (None, None) => start..end,
    })
}

/// `(start, end)` byte ranges of the `;`-separated segments of a block.
fn segments(block: &str) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in block.char_indices() {
        if c == ';' {
            out.push((start, i));
            start = i + 1;
        }
    }
    out.push((start, block.len()));
    out
}

fn declares(segment: &str, property: &str) -> bool {
    segment
        .split_once(':')
        .is_some_and(|(name, _)| name.trim().eq_ignore_ascii_case(property))
}

/// Parse a finite CSS number.
pub fn number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse `NN%` into a fraction (`85%` → `0.85`).
pub fn percentage(value: &str) -> Option<f64> {
    let digits = value.trim().strip_suffix('%')?;
    number(digits).map(|n| n / 100.0)
}

/// Parse `NNpx` (or a bare number) into pixels.
pub fn pixels(value: &str) -> Option<f64> {
    let value = value.trim();
    number(value.strip_suffix("px").unwrap_or(value))
}

/// Split `name(a, b, c)` into its name and arguments.
pub fn function_call(value: &str) -> Option<(&str, Vec<&str>)> {
    let value = value.trim();
    let open = value.find('(')?;
    let inner = value[open + 1..].strip_suffix(')')?;
    let name = value[..open].trim();
    let args = inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|arg| !arg.is_empty())
        .collect();
    Some((name, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_lookup() {
        let block = "width: 85%; Transform: scaleX(0.5) !important;width:90%";
        assert_eq!(declaration(block, "width"), Some("90%"));
        assert_eq!(declaration(block, "transform"), Some("scaleX(0.5)"));
        assert_eq!(declaration(block, "height"), None);
    }

    #[test]
    fn test_with_declaration() {
        assert_eq!(
            with_declaration("color: red", "position", Some("relative")),
            "color: red; position: relative"
        );
        assert_eq!(
            with_declaration("position: relative; color: red", "position", None),
            "color: red"
        );
        assert_eq!(with_declaration("position: relative", "position", None), "");
        // Untouched blocks keep their original spelling
        assert_eq!(with_declaration("color:red;", "position", None), "color:red;");
        assert_eq!(
            with_declaration("color:red;position:static", "position", Some("relative")),
            "color:red;position:relative"
        );
    }

    #[test]
    fn test_set_then_remove_restores_block() {
        for original in ["color:red", "color:red;", "  color :  red ;  margin:0", "Color: Red !important"] {
            let set = with_declaration(original, "position", Some("relative"));
            assert_eq!(declaration(&set, "position"), Some("relative"));
            assert_eq!(with_declaration(&set, "position", None), original);
        }
        assert_eq!(with_declaration("position: relative; color:red", "position", None), "color:red");
        assert_eq!(with_declaration("a:1; position: x; b:2", "position", None), "a:1; b:2");
    }

    #[test]
    fn test_values() {
        assert_eq!(percentage("85%"), Some(0.85));
        assert_eq!(percentage(" 12.5 % "), Some(0.125));
        assert_eq!(percentage("85px"), None);
        assert_eq!(percentage("NaN%"), None);
        assert_eq!(pixels("120px"), Some(120.0));
        assert_eq!(pixels("120"), Some(120.0));
        assert_eq!(pixels("auto"), None);
    }

    #[test]
    fn test_function_call() {
        assert_eq!(function_call("scaleX(0.4)"), Some(("scaleX", vec!["0.4"])));
        assert_eq!(
            function_call("matrix(0.5, 0, 0, 1, 0, 0)"),
            Some(("matrix", vec!["0.5", "0", "0", "1", "0", "0"]))
        );
        assert_eq!(function_call("none"), None);
    }
}
