use ahash::HashSet;
use once_cell::sync::Lazy;

/// Words the tokenizer treats as keywords or literals, plus bindings with special meaning
/// (`eval`, `arguments`). None of these may be produced as a replacement identifier.
pub static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
  HashSet::from_iter([
    "arguments",
    "as",
    "async",
    "await",
    "break",
    "case",
    "catch",
    "class",
    "const",
    "constructor",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "eval",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "from",
    "function",
    "get",
    "if",
    "implements",
    "import",
    "in",
    "instanceof",
    "interface",
    "let",
    "new",
    "null",
    "of",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "set",
    "static",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "yield",
  ])
});

pub fn is_keyword(name: &str) -> bool {
  KEYWORDS.contains(name)
}

#[cfg(test)]
mod tests {
  use super::is_keyword;

  #[test]
  fn test_short_keywords() {
    for kw in ["do", "if", "in", "of", "as"] {
      assert!(is_keyword(kw), "{kw} should be reserved");
    }
    assert!(!is_keyword("a"));
    assert!(!is_keyword("Do"));
  }
}
