//! Reference resolution
//!
//! SSH configuration stored in the vault may name other vault items in
//! `Include` and `IdentityFile` directives. Those names are rewritten to
//! the paths the named items are written to.
//!
//! Scanning splits each line into spans without looking at the catalog;
//! resolution then swaps the token span of directives whose token names a
//! catalog item and reassembles the line. Everything else is copied
//! byte-for-byte.

use bw_ssh_core::Paths;
use regex::Regex;
use std::sync::LazyLock;

use crate::catalog::Catalog;

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([ \t]*)((?i:include|identityfile))([ \t]+)(["']?)([^ \t"'].*?)(["']?)([ \t\r]*)$"#)
        .expect("valid directive regex")
});

/// A scanned line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// Anything that is not a directive, terminator included
    Text(&'a str),
    Directive(Directive<'a>),
}

impl<'a> Line<'a> {
    /// The original bytes of the line
    pub fn source(&self) -> &'a str {
        match self {
            Line::Text(source) => *source,
            Line::Directive(directive) => directive.source,
        }
    }
}

/// An `Include` / `IdentityFile` line split into spans
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive<'a> {
    pub source: &'a str,
    pub indent: &'a str,
    pub keyword: &'a str,
    pub separator: &'a str,
    pub open_quote: &'a str,
    pub token: &'a str,
    pub close_quote: &'a str,
    pub trailing: &'a str,
    pub terminator: &'a str,
}

impl Directive<'_> {
    /// Append the directive to `out` with `token` in place of the original
    fn render_with(&self, token: &str, out: &mut String) {
        for span in [
            self.indent,
            self.keyword,
            self.separator,
            self.open_quote,
            token,
            self.close_quote,
            self.trailing,
            self.terminator,
        ] {
            out.push_str(span);
        }
    }
}

/// Split a single line (terminator included) into spans
pub fn scan_line(source: &str) -> Line<'_> {
    let (body, terminator) = match source.strip_suffix('\n') {
        Some(body) => (body, "\n"),
        None => (source, ""),
    };

    let Some(caps) = DIRECTIVE_RE.captures(body) else {
        return Line::Text(source);
    };
    let span = |i: usize| caps.get(i).map_or("", |m| m.as_str());

    // `"B'` and `B"` are not quoted tokens
    if span(4) != span(6) {
        return Line::Text(source);
    }

    Line::Directive(Directive {
        source,
        indent: span(1),
        keyword: span(2),
        separator: span(3),
        open_quote: span(4),
        token: span(5),
        close_quote: span(6),
        trailing: span(7),
        terminator,
    })
}

/// Scan multi-line content
pub fn scan(content: &str) -> impl Iterator<Item = Line<'_>> {
    content.split_inclusive('\n').map(scan_line)
}

/// Rewrite directives that name catalog items into those items' paths
pub fn resolve(content: &str, catalog: &Catalog, paths: &Paths) -> String {
    let mut out = String::with_capacity(content.len());

    for line in scan(content) {
        match line {
            Line::Directive(directive) if catalog.contains(directive.token) => {
                let target = paths.target(directive.token);
                directive.render_with(&target.to_string_lossy(), &mut out);
            }
            other => out.push_str(other.source()),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Item;

    fn catalog(names: &[&str]) -> Catalog {
        names.iter().map(|name| Item::new(*name, "")).collect()
    }

    fn paths() -> Paths {
        Paths::with_home("/home/alice")
    }

    #[test]
    fn test_scan_quoted_directive() {
        let Line::Directive(d) = scan_line("  IdentityFile \"id_work\"  \n") else {
            panic!("Expected directive");
        };
        assert_eq!(d.indent, "  ");
        assert_eq!(d.keyword, "IdentityFile");
        assert_eq!(d.open_quote, "\"");
        assert_eq!(d.token, "id_work");
        assert_eq!(d.close_quote, "\"");
        assert_eq!(d.trailing, "  ");
        assert_eq!(d.terminator, "\n");
    }

    #[test]
    fn test_scan_keyword_case_insensitive() {
        for line in ["include conf.d", "INCLUDE conf.d", "identityfile k", "IdentityFILE k"] {
            assert!(matches!(scan_line(line), Line::Directive(_)), "{line}");
        }
    }

    #[test]
    fn test_scan_keyword_is_whole_word() {
        for line in [
            "Includes conf.d",
            "NoInclude conf.d",
            "IdentityFileX k",
            "IdentitiesOnly yes",
            "Host identityfile",
            "IdentityFile",
            "IdentityFile   ",
            "IdentityFile \"\"",
        ] {
            assert!(matches!(scan_line(line), Line::Text(_)), "{line}");
        }
    }

    #[test]
    fn test_resolves_quoted_reference() {
        let content = "Host work\n  IdentityFile \"B\"\n";
        let resolved = resolve(content, &catalog(&["A", "B"]), &paths());
        assert_eq!(resolved, "Host work\n  IdentityFile \"/home/alice/.ssh/B\"\n");
        assert!(!resolved.contains("\"B\""));
    }

    #[test]
    fn test_resolves_unquoted_and_single_quoted() {
        let content = "Include extra\nIdentityFile 'id_home'";
        let resolved = resolve(content, &catalog(&["extra", "id_home"]), &paths());
        assert_eq!(
            resolved,
            "Include /home/alice/.ssh/extra\nIdentityFile '/home/alice/.ssh/id_home'"
        );
    }

    #[test]
    fn test_tilde_item_resolves_to_home() {
        let resolved = resolve("Include ~/.ssh/shared", &catalog(&["~/.ssh/shared"]), &paths());
        assert_eq!(resolved, "Include /home/alice/.ssh/shared");
    }

    #[test]
    fn test_absolute_item_resolves_under_root() {
        let resolved = resolve("IdentityFile /etc/x\n", &catalog(&["/etc/x"]), &paths());
        assert_eq!(resolved, "IdentityFile /home/alice/.ssh/etc/x\n");
    }

    #[test]
    fn test_mismatched_quotes_left_unchanged() {
        for line in ["IdentityFile \"B'", "IdentityFile B\"", "Include 'B\""] {
            assert!(matches!(scan_line(line), Line::Text(_)), "{line}");
        }

        let content = "Host a\n  IdentityFile \"B'\n  IdentityFile B\"\n";
        assert_eq!(resolve(content, &catalog(&["B", "B'", "B\""]), &paths()), content);
    }

    #[test]
    fn test_unknown_reference_unchanged() {
        let content = "Host *\r\n\tIdentityFile  ~/.ssh/id_rsa \r\nInclude b\n";
        let resolved = resolve(content, &catalog(&["B"]), &paths());
        assert_eq!(resolved, content);
    }

    #[test]
    fn test_crlf_terminators_preserved() {
        let content = "IdentityFile sub\r\nUser git\r\n";
        let resolved = resolve(content, &catalog(&["sub"]), &paths());
        assert_eq!(resolved, "IdentityFile /home/alice/.ssh/sub\r\nUser git\r\n");
    }

    #[test]
    fn test_empty_content() {
        assert_eq!(resolve("", &catalog(&["a"]), &paths()), "");
    }
}
