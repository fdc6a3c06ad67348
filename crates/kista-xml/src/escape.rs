#![forbid(unsafe_code)]

//! Character escaping shared by the writer, `Chunk` capture and canonical
//! output. The replacement sets are the ones Canonical XML prescribes.

#[derive(Clone, Copy)]
enum Context {
    Text,
    Attribute,
    ProcessingInstruction,
}

fn replacement(ch: char, ctx: Context) -> Option<&'static str> {
    match (ch, ctx) {
        ('\r', _) => Some("&#xD;"),
        (_, Context::ProcessingInstruction) => None,
        ('&', _) => Some("&amp;"),
        ('<', _) => Some("&lt;"),
        ('>', Context::Text) => Some("&gt;"),
        ('"', Context::Attribute) => Some("&quot;"),
        ('\t', Context::Attribute) => Some("&#x9;"),
        ('\n', Context::Attribute) => Some("&#xA;"),
        _ => None,
    }
}

fn escape(s: &str, ctx: Context) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match replacement(ch, ctx) {
            Some(r) => out.push_str(r),
            None => out.push(ch),
        }
    }
    out
}

/// Escape text node content.
pub fn escape_text(s: &str) -> String {
    escape(s, Context::Text)
}

/// Escape an attribute value. `>` is left as is.
pub fn escape_attr(s: &str) -> String {
    escape(s, Context::Attribute)
}

/// Escape processing instruction data: only `\r`.
pub fn escape_pi(s: &str) -> String {
    escape(s, Context::ProcessingInstruction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text() {
        assert_eq!(escape_text("plain"), "plain");
        assert_eq!(escape_text("1 < 2 && 3 > 2"), "1 &lt; 2 &amp;&amp; 3 &gt; 2");
        assert_eq!(escape_text("a\"b\tc\n"), "a\"b\tc\n");
        assert_eq!(escape_text("x\r"), "x&#xD;");
    }

    #[test]
    fn test_attribute() {
        assert_eq!(escape_attr("x>y"), "x>y");
        assert_eq!(escape_attr(r#"say "hi" & <go>"#), "say &quot;hi&quot; &amp; &lt;go>");
        assert_eq!(escape_attr("\t\n\r"), "&#x9;&#xA;&#xD;");
    }

    #[test]
    fn test_processing_instruction() {
        assert_eq!(escape_pi("a<b&c\r"), "a<b&c&#xD;");
    }
}
