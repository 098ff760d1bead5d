//! Law query normalisation.
//!
//! Users type laws the way they are cited: "4940", "4940/2022",
//! "ν. 4940/2022", or a fragment of the title. The Parliament API wants either
//! a bare law number (`lawnum`) or free text (`freetext`), so the citation is
//! reduced to one of the two before dispatch.

use serde::{Deserialize, Serialize};

/// A normalised user query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LawQuery {
    /// Bare law number, digits only.
    Number(String),
    /// Free-text title fragment.
    Title(String),
}

impl LawQuery {
    /// Normalise raw user input. Returns `None` for blank input.
    ///
    /// 1. Trim and strip a trailing `/year` suffix (`/22`, `/2022`).
    /// 2. Strip a leading citation prefix (`ν.`, `N.`) when what follows is numeric.
    /// 3. All-digit remainder → [`Number`](Self::Number), anything else → [`Title`](Self::Title).
    pub fn parse(input: &str) -> Option<Self> {
        let s = strip_year_suffix(input.trim());
        if s.is_empty() {
            return None;
        }

        let bare = strip_citation_prefix(s);
        if !bare.is_empty() && bare.chars().all(|c| c.is_ascii_digit()) {
            return Some(Self::Number(bare.to_string()));
        }

        Some(Self::Title(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Number(s) | Self::Title(s) => s,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Number(_))
    }
}

impl std::fmt::Display for LawQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "4940/2022" → "4940". Slashes not followed by a 2–4 digit year are kept,
/// so directive citations inside titles ("Οδηγία 2019/1152/ΕΕ") survive.
pub fn strip_year_suffix(s: &str) -> &str {
    let s = s.trim();
    match s.rsplit_once('/') {
        Some((head, year))
            if (2..=4).contains(&year.trim().len())
                && year.trim().chars().all(|c| c.is_ascii_digit())
                && head.trim().chars().last().is_some_and(|c| c.is_ascii_digit()) =>
        {
            head.trim()
        }
        _ => s,
    }
}

fn strip_citation_prefix(s: &str) -> &str {
    for prefix in ["ν.", "Ν.", "n.", "N."] {
        if let Some(rest) = s.strip_prefix(prefix) {
            return rest.trim_start();
        }
    }
    s
}
