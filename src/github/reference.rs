//! Repository reference parsing
//!
//! Accepts the URL shapes people paste:
//! - `https://github.com/owner/repo`
//! - `github.com/owner/repo.git`
//! - `https://www.github.com/owner/repo/tree/branch`
//! - `https://github.com/owner/repo/blob/branch/path/to/file`

use std::fmt;

use crate::error::{Error, Result};

const GITHUB_HOST: &str = "github.com";

/// A parsed repository reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoReference {
    pub owner: String,
    /// Repository name with any trailing `.git` removed
    pub repo: String,
    /// Branch named in the reference, if any
    pub branch: Option<String>,
}

impl RepoReference {
    /// Parse a free-form repository reference.
    ///
    /// Fails with [`Error::MalformedReference`] when owner or repo cannot be isolated.
    pub fn parse(input: &str) -> Result<Self> {
        let malformed = || Error::MalformedReference(input.to_string());

        let trimmed = input.trim();
        let without_scheme = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed);
        let without_www = without_scheme
            .strip_prefix("www.")
            .unwrap_or(without_scheme);

        let path = without_www
            .strip_prefix(GITHUB_HOST)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(malformed)?;

        // Query strings and fragments never carry owner/repo/branch
        let path = path.split(['?', '#']).next().unwrap_or_default();

        let mut segments = path.split('/');
        let owner = segments.next().filter(|s| !s.is_empty()).ok_or_else(malformed)?;
        let repo = segments
            .next()
            .map(|s| s.strip_suffix(".git").unwrap_or(s))
            .filter(|s| !s.is_empty())
            .ok_or_else(malformed)?;

        let branch = match (segments.next(), segments.next()) {
            (Some("tree" | "blob"), Some(branch)) if !branch.is_empty() => {
                Some(branch.to_string())
            }
            _ => None,
        };

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch,
        })
    }
}

impl fmt::Display for RepoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.branch {
            Some(branch) => write!(f, "{}/{}@{}", self.owner, self.repo, branch),
            None => write!(f, "{}/{}", self.owner, self.repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> RepoReference {
        RepoReference::parse(input).unwrap()
    }

    #[test]
    fn test_plain_https_url() {
        let r = parse("https://github.com/acme/widgets");
        assert_eq!(r.owner, "acme");
        assert_eq!(r.repo, "widgets");
        assert_eq!(r.branch, None);
    }

    #[test]
    fn test_tree_branch() {
        let r = parse("https://github.com/acme/widgets/tree/dev");
        assert_eq!(r.branch.as_deref(), Some("dev"));
    }

    #[test]
    fn test_blob_branch_with_file_path() {
        let r = parse("https://github.com/acme/widgets/blob/release/docs/README.md");
        assert_eq!(r.repo, "widgets");
        assert_eq!(r.branch.as_deref(), Some("release"));
    }

    #[test]
    fn test_no_scheme_and_www() {
        assert_eq!(parse("github.com/acme/widgets"), parse("https://github.com/acme/widgets"));
        assert_eq!(
            parse("http://www.github.com/acme/widgets"),
            parse("https://github.com/acme/widgets")
        );
    }

    #[test]
    fn test_strips_dot_git() {
        let r = parse("https://github.com/acme/widgets.git");
        assert_eq!(r.repo, "widgets");
    }

    #[test]
    fn test_trailing_slash_and_query() {
        let r = parse("https://github.com/acme/widgets/?tab=readme#usage");
        assert_eq!(r.repo, "widgets");
        assert_eq!(r.branch, None);
    }

    #[test]
    fn test_other_subpaths_have_no_branch() {
        let r = parse("https://github.com/acme/widgets/issues/12");
        assert_eq!(r.branch, None);
        let r = parse("https://github.com/acme/widgets/tree/");
        assert_eq!(r.branch, None);
    }

    #[test]
    fn test_malformed_references() {
        for input in [
            "",
            "acme/widgets",
            "https://gitlab.com/acme/widgets",
            "https://github.com/",
            "https://github.com/acme",
            "https://github.com/acme/",
            "https://github.com//widgets",
            "https://github.com/acme/.git",
        ] {
            match RepoReference::parse(input) {
                Err(Error::MalformedReference(s)) => assert_eq!(s, input),
                other => panic!("expected MalformedReference for {input:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let input = "www.github.com/acme/widgets/tree/main";
        assert_eq!(parse(input), parse(input));
    }

    #[test]
    fn test_display() {
        assert_eq!(parse("github.com/acme/widgets").to_string(), "acme/widgets");
        assert_eq!(
            parse("github.com/acme/widgets/tree/dev").to_string(),
            "acme/widgets@dev"
        );
    }
}
