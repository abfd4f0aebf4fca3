//! Reader and writer for `key=value` properties text.
//!
//! The reader accepts the escapes and layout of Java `.properties` files
//! (comments, `:` or whitespace separators, line continuations, `\uXXXX`).
//! The writer emits one `key=value` line per entry in the order given.

/// Parses properties text into entries, in file order. A key repeated later
/// in the file appears twice; callers inserting into a map keep the last.
pub fn parse(input: &str) -> Vec<(String, String)> {
    logical_lines(input)
        .iter()
        .map(|line| split_entry(line))
        .collect()
}

/// Renders entries as properties text with a single comment header line.
pub fn render<'a, I>(header: &str, entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = String::new();
    if !header.is_empty() {
        out.push_str("# ");
        out.push_str(header);
        out.push('\n');
    }
    for (key, value) in entries {
        out.push_str(&escape_key(key));
        out.push('=');
        out.push_str(&escape_value(value));
        out.push('\n');
    }
    out
}

pub fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '=' | ':' | '#' | '!' | ' ' => {
                out.push('\\');
                out.push(c);
            }
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            ' ' if i == 0 => out.push_str("\\ "),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

fn logical_lines(input: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut continuing = false;

    for raw in input.lines() {
        let line = raw.trim_start();
        if !continuing && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }
        if ends_with_odd_backslashes(line) {
            current.push_str(&line[..line.len() - 1]);
            continuing = true;
        } else {
            current.push_str(line);
            lines.push(std::mem::take(&mut current));
            continuing = false;
        }
    }
    if continuing && !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn ends_with_odd_backslashes(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (String, String) {
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();
    let mut key_end = len;
    let mut value_start = len;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                value_start = i + 1;
                break;
            }
            c if c.is_whitespace() => {
                key_end = i;
                let mut j = i;
                while j < len && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < len && (chars[j] == '=' || chars[j] == ':') {
                    j += 1;
                }
                value_start = j;
                break;
            }
            _ => {}
        }
    }

    while value_start < len && chars[value_start].is_whitespace() {
        value_start += 1;
    }

    (unescape(&chars[..key_end]), unescape(&chars[value_start.min(len)..]))
}

fn unescape(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if c != '\\' || i == chars.len() {
            out.push(c);
            continue;
        }
        let escaped = chars[i];
        i += 1;
        match escaped {
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            'f' => out.push('\u{000C}'),
            'u' => {
                let hex: String = chars[i..chars.len().min(i + 4)].iter().collect();
                match u32::from_str_radix(&hex, 16).ok().filter(|_| hex.len() == 4) {
                    Some(code) => {
                        out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                        i += 4;
                    }
                    None => out.push('u'),
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_java_written_file() {
        let input = "#urls of the applications to monitor\n\
                     #Mon Jan 01 10:00:00 CET 2024\n\
                     recipe=http\\://recipe1\\:8080/myapp\n\
                     production = http://prod1:8080/myapp,http://prod2:8080/myapp\n\
                     aggregation:recipe,production\n";
        let entries = parse(input);
        assert_eq!(
            entries,
            vec![
                ("recipe".to_string(), "http://recipe1:8080/myapp".to_string()),
                (
                    "production".to_string(),
                    "http://prod1:8080/myapp,http://prod2:8080/myapp".to_string()
                ),
                ("aggregation".to_string(), "recipe,production".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_continuation_and_unicode() {
        let input = "group = a,\\\n    b,\\\n    c\nname\\u00e9=x\n! bang comment\n";
        let entries = parse(input);
        assert_eq!(entries[0], ("group".to_string(), "a,b,c".to_string()));
        assert_eq!(entries[1], ("nameé".to_string(), "x".to_string()));
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_escaped_key_characters_survive() {
        let text = render("header", [("my app=1", "v")]);
        assert_eq!(text, "# header\nmy\\ app\\=1=v\n");
        assert_eq!(parse(&text), vec![("my app=1".to_string(), "v".to_string())]);
    }

    #[test]
    fn test_key_without_value() {
        assert_eq!(parse("lonely\n"), vec![("lonely".to_string(), String::new())]);
    }
}
