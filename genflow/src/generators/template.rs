//! Markdown entry layout shared by the aggregated artifacts.

/// Layout of one per-file entry: `{prefix} {path}:\n{body}\n\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryTemplate {
    prefix: &'static str,
    headed: bool,
}

impl EntryTemplate {
    /// Creates a template whose headers start with `prefix`.
    #[must_use]
    pub const fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            headed: false,
        }
    }

    /// Documents open with a project heading; its header line is never
    /// treated as an entry, even when a path equals the project name.
    #[must_use]
    pub const fn headed(self) -> Self {
        Self {
            headed: true,
            ..self
        }
    }

    /// The header line introducing `name`, newline included.
    #[must_use]
    pub fn header(&self, name: &str) -> String {
        format!("{} {}:\n", self.prefix, name)
    }

    /// Renders one entry.
    #[must_use]
    pub fn render(&self, name: &str, body: &str) -> String {
        format!("{}{}\n\n", self.header(name), body)
    }

    /// Renders the project heading, which uses the entry layout with the
    /// project name in place of a path.
    #[must_use]
    pub fn heading(&self, project: &str, body: &str) -> String {
        self.render(project, body)
    }

    /// Replaces the body of the entry for `path`, keeping every other entry
    /// byte-for-byte. Returns `None` if the document has no such entry.
    #[must_use]
    pub fn replace(&self, document: &str, path: &str, body: &str) -> Option<String> {
        let header = self.header(path);
        let from = if self.headed {
            document.find('\n').map_or(document.len(), |idx| idx + 1)
        } else {
            0
        };
        let start = find_line_start(document, &header, from)?;
        let body_start = start + header.len();

        let next_entry = format!("\n\n{} ", self.prefix);
        let body_end = document[body_start..]
            .find(&next_entry)
            .map(|offset| body_start + offset)
            .unwrap_or_else(|| {
                if document[body_start..].ends_with("\n\n") {
                    document.len() - 2
                } else {
                    document.len()
                }
            });

        let mut updated = String::with_capacity(document.len() + body.len());
        updated.push_str(&document[..body_start]);
        updated.push_str(body);
        updated.push_str(&document[body_end..]);
        Some(updated)
    }

    /// Replaces the entry for `path`, or appends it if missing.
    #[must_use]
    pub fn upsert(&self, document: &str, path: &str, body: &str) -> String {
        self.replace(document, path, body)
            .unwrap_or_else(|| format!("{document}{}", self.render(path, body)))
    }
}

/// Finds `needle` at the start of a line, at or after `from`.
fn find_line_start(haystack: &str, needle: &str, mut from: usize) -> Option<usize> {
    while let Some(offset) = haystack[from..].find(needle) {
        let idx = from + offset;
        if idx == 0 || haystack[..idx].ends_with('\n') {
            return Some(idx);
        }
        from = idx + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ENTRY: EntryTemplate = EntryTemplate::new("# Summary for");

    fn document() -> String {
        let mut doc = ENTRY.heading("widgets", "");
        doc.push_str(&ENTRY.render("src/a.rs", "pending"));
        doc.push_str(&ENTRY.render("src/b.rs", "pending"));
        doc.push_str(&ENTRY.render("src/c.rs", "pending"));
        doc
    }

    #[test]
    fn test_render() {
        assert_eq!(ENTRY.render("a.rs", "body"), "# Summary for a.rs:\nbody\n\n");
        assert_eq!(ENTRY.heading("widgets", ""), "# Summary for widgets:\n\n\n");
    }

    #[test]
    fn test_replace_middle_entry_only() {
        let updated = ENTRY.replace(&document(), "src/b.rs", "Parses input.").unwrap();
        assert_eq!(
            updated,
            document().replace(
                "# Summary for src/b.rs:\npending",
                "# Summary for src/b.rs:\nParses input."
            )
        );
    }

    #[test]
    fn test_replace_last_entry_keeps_terminator() {
        let updated = ENTRY.replace(&document(), "src/c.rs", "multi\nline").unwrap();
        assert!(updated.ends_with("# Summary for src/c.rs:\nmulti\nline\n\n"));
        assert!(updated.contains("# Summary for src/a.rs:\npending\n\n"));
    }

    #[test]
    fn test_replace_empty_body() {
        let doc = format!("{}{}", ENTRY.render("a.rs", ""), ENTRY.render("b.rs", ""));
        let updated = ENTRY.replace(&doc, "a.rs", "filled").unwrap();
        assert_eq!(
            updated,
            format!("{}{}", ENTRY.render("a.rs", "filled"), ENTRY.render("b.rs", ""))
        );
    }

    #[test]
    fn test_heading_is_not_an_entry() {
        let entry = ENTRY.headed();
        let doc = format!(
            "{}{}",
            entry.heading("widgets", "https://github.com/acme/widgets"),
            entry.render("src/a.rs", "")
        );

        let updated = entry.upsert(&doc, "widgets", "binary");
        assert!(updated.starts_with("# Summary for widgets:\nhttps://github.com/acme/widgets\n\n"));
        assert!(updated.ends_with("# Summary for widgets:\nbinary\n\n"));

        let again = entry.upsert(&updated, "widgets", "rebuilt");
        assert_eq!(again, updated.replace("binary", "rebuilt"));
    }

    #[test]
    fn test_replace_matches_whole_header_only() {
        let doc = ENTRY.render("lib/src/a.rs", "x");
        assert_eq!(ENTRY.replace(&doc, "src/a.rs", "y"), None);
        assert_eq!(
            ENTRY.upsert(&doc, "src/a.rs", "y"),
            format!("{doc}{}", ENTRY.render("src/a.rs", "y"))
        );
    }
}
