use crate::entry::FileEntry;

/// Semicolon-separated wildcard pattern set, e.g. `"*.wav; *.aif"`.
///
/// Matching is case-insensitive against the whole base name. `*` matches any
/// run of characters (including none), `?` exactly one. An empty set matches
/// everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobFilter {
    patterns: Vec<Vec<char>>,
    source: String,
}

impl GlobFilter {
    /// Parses a pattern set. Blank segments are ignored.
    pub fn parse(set: &str) -> Self {
        let patterns = set
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| p.to_lowercase().chars().collect())
            .collect();
        Self {
            patterns,
            source: set.trim().to_string(),
        }
    }

    /// The pattern set exactly as it was parsed (trimmed).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether no pattern is set.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Number of patterns in the set.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether `name` matches any pattern.
    pub fn matches(&self, name: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let name: Vec<char> = name.to_lowercase().chars().collect();
        self.patterns.iter().any(|p| wildcard_match(p, &name))
    }

    /// Like [`matches`](Self::matches), but directories always pass.
    pub fn matches_entry(&self, entry: &FileEntry) -> bool {
        entry.is_dir() || self.matches(entry.base_name())
    }
}

fn wildcard_match(p: &[char], t: &[char]) -> bool {
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star_pi: Option<usize> = None;
    let mut star_ti = 0usize;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
            continue;
        }
        if pi < p.len() && p[pi] == '*' {
            star_pi = Some(pi);
            pi += 1;
            star_ti = ti;
            continue;
        }
        if let Some(sp) = star_pi {
            pi = sp + 1;
            star_ti += 1;
            ti = star_ti;
            continue;
        }
        return false;
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
