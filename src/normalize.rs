//! Implicit multiplication for calculator notation, e.g. `2x` → `2*x`.
//!
//! This is a purely textual rewrite over characters, not tokens. It cannot tell
//! `log10(` from `10` followed by a parenthesis, and `1e5` becomes `1*e5`.
//! Saved expressions depend on exactly this behavior.

/// Whether `*` belongs between two adjacent characters.
fn should_insert_mul(current: char, next: char) -> bool {
    match (current, next) {
        // 2x, 2(x)
        (c, n) if c.is_ascii_digit() => n.is_ascii_alphabetic() || n == '(',
        // (a)2, (a)x, (a)(b)
        (')', n) => n.is_ascii_digit() || n.is_ascii_alphabetic() || n == '(',
        _ => false,
    }
}

/// Strip all whitespace, then insert explicit `*` between a digit and a
/// following letter or `(`, and between `)` and a following digit, letter or
/// `(`.
///
/// Idempotent: normalized output has no remaining insertion points.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 2);
    let mut previous: Option<char> = None;
    for c in input.chars().filter(|c| !c.is_whitespace()) {
        if let Some(p) = previous {
            if should_insert_mul(p, c) {
                out.push('*');
            }
        }
        out.push(c);
        previous = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};

    #[test]
    fn inserts_multiplication() {
        assert_eq!(normalize("2x"), "2*x");
        assert_eq!(normalize("(x+1)2"), "(x+1)*2");
        assert_eq!(normalize("2(x+1)"), "2*(x+1)");
        assert_eq!(normalize("(x+1)(x-1)"), "(x+1)*(x-1)");
        assert_eq!(normalize("3 x ^ 2 + 2 x"), "3*x^2+2*x");
        assert_eq!(normalize("(x)sin(x)"), "(x)*sin(x)");
    }

    #[test]
    fn textual_quirks_are_kept() {
        assert_eq!(normalize("1e5"), "1*e5");
        assert_eq!(normalize("log10(x)"), "log10*(x)");
        assert_eq!(normalize("x2"), "x2");
        assert_eq!(normalize("sin(x)"), "sin(x)");
    }

    #[test]
    fn idempotent() {
        fn prop(input: String) -> TestResult {
            let once = normalize(&input);
            TestResult::from_bool(normalize(&once) == once)
        }
        QuickCheck::new()
            .tests(500)
            .quickcheck(prop as fn(String) -> TestResult);
    }

    #[test]
    fn idempotent_on_calculator_alphabet() {
        fn prop(picks: Vec<u8>) -> bool {
            const ALPHABET: &[u8] = b"0123456789xyz()+-*/^ .e";
            let input: String = picks
                .iter()
                .map(|p| ALPHABET[*p as usize % ALPHABET.len()] as char)
                .collect();
            let once = normalize(&input);
            normalize(&once) == once
        }
        QuickCheck::new()
            .tests(500)
            .quickcheck(prop as fn(Vec<u8>) -> bool);
    }
}
