use ahash::HashSet;
use tree_js::keywords::is_keyword;

/// Original name to replacement name for one scope.
pub type Translation = ahash::HashMap<String, String>;

/// Assigns a short name to each of `names`, in iteration order. Candidates that are keywords or
/// appear in `reserved` are skipped; every assignment is distinct from the others.
pub fn allocate<'a>(
  names: impl IntoIterator<Item = &'a String>,
  reserved: &HashSet<String>,
) -> Vec<(String, String)> {
  let mut generator = NameGenerator::default();
  names
    .into_iter()
    .map(|name| {
      let replacement = generator.next_name(reserved);
      tracing::trace!(target: "symbol_js::mangle", %name, %replacement, "translate");
      (name.clone(), replacement)
    })
    .collect()
}

/// Enumerates `a, b, …, Z, ba, bb, …` by encoding a counter in base 52 over the ASCII letters.
#[derive(Default)]
pub struct NameGenerator {
  counter: usize,
}

impl NameGenerator {
  const ALPHABET: &'static [u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

  pub fn next_name(&mut self, reserved: &HashSet<String>) -> String {
    loop {
      let name = Self::encode(self.counter);
      self.counter += 1;
      if !is_keyword(&name) && !reserved.contains(&name) {
        return name;
      }
    }
  }

  fn encode(mut n: usize) -> String {
    let base = Self::ALPHABET.len();
    let mut digits = Vec::new();
    loop {
      digits.push(Self::ALPHABET[n % base] as char);
      n /= base;
      if n == 0 {
        break;
      }
    }
    digits.iter().rev().collect()
  }
}
