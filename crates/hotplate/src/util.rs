//! helpers for inline documents

/// Strip the indentation shared by all non-blank lines
///
/// Lets tests and doc examples indent inline YAML with the surrounding code.
pub fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut dedented = String::with_capacity(text.len());
    for line in text.lines() {
        if line.trim().is_empty() {
            dedented.push('\n');
            continue;
        }
        dedented.push_str(&line[indent..]);
        dedented.push('\n');
    }
    dedented
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dedent_keeps_relative_indentation() {
        let text = "
            a:
              b: 1

            c: 2
        ";
        assert_eq!(dedent(text), "\na:\n  b: 1\n\nc: 2\n\n");
    }

    #[test]
    fn dedent_unindented() {
        assert_eq!(dedent("a: 1\nb: 2"), "a: 1\nb: 2\n");
    }
}
