/// Child-name filter in `Node.getNodes(namePattern)` syntax: globs joined by
/// `|`, where `*` matches any run of characters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamePattern {
    globs: Vec<String>,
}

impl NamePattern {
    pub fn any() -> Self {
        Self {
            globs: vec!["*".to_string()],
        }
    }

    pub fn parse(pattern: &str) -> Self {
        let globs: Vec<String> = pattern
            .split('|')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect();
        if globs.is_empty() {
            return Self::any();
        }
        Self { globs }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.globs.iter().any(|glob| glob_matches(glob, name))
    }
}

impl Default for NamePattern {
    fn default() -> Self {
        Self::any()
    }
}

impl std::fmt::Display for NamePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.globs.join("|"))
    }
}

fn glob_matches(glob: &str, name: &str) -> bool {
    let pattern: Vec<char> = glob.chars().collect();
    let text: Vec<char> = name.chars().collect();

    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut resume = 0usize;

    while t < text.len() {
        if p < pattern.len() && pattern[p] != '*' && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            resume = t;
            p += 1;
        } else if let Some(s) = star {
            p = s + 1;
            resume += 1;
            t = resume;
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
