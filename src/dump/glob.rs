//! Table-name glob matching: `*` (any substring) and `?` (one character)
//! only, per spec.md §4.A — not full shell globbing, which is why this is
//! hand-rolled instead of pulled from the `glob` crate (that crate targets
//! filesystem path expansion and doesn't expose this narrower grammar over
//! plain strings).

/// Match `text` against a glob `pattern` built only from literal characters,
/// `*`, and `?`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    match_from(&p, 0, &t, 0)
}

fn match_from(p: &[char], pi: usize, t: &[char], ti: usize) -> bool {
    let mut pi = pi;
    let mut ti = ti;
    let mut star_pi: Option<usize> = None;
    let mut star_ti = 0usize;

    loop {
        if pi < p.len() {
            match p[pi] {
                '?' if ti < t.len() => {
                    pi += 1;
                    ti += 1;
                    continue;
                }
                '*' => {
                    star_pi = Some(pi);
                    star_ti = ti;
                    pi += 1;
                    continue;
                }
                c if ti < t.len() && c == t[ti] => {
                    pi += 1;
                    ti += 1;
                    continue;
                }
                _ => {}
            }
        } else if ti == t.len() {
            return true;
        }

        if let Some(sp) = star_pi {
            pi = sp + 1;
            star_ti += 1;
            ti = star_ti;
            if ti > t.len() {
                return false;
            }
        } else {
            return false;
        }
    }
}

/// A table name matches a glob list if it matches at least one pattern.
pub fn matches_any(patterns: &[String], text: &str) -> bool {
    patterns.iter().any(|p| glob_match(p, text))
}
