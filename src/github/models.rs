//! Wire shapes consumed from the GitHub REST API

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};

/// Response of `GET /repos/{owner}/{repo}/readme`
#[derive(Debug, Clone, Deserialize)]
pub struct ReadmeResponse {
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub encoding: String,
}

impl ReadmeResponse {
    /// Decoded document text. Base64 payloads are decoded after stripping all whitespace.
    pub fn decoded(&self) -> Result<String, String> {
        if self.encoding == "base64" {
            decode_base64(&self.content)
        } else {
            Ok(self.content.clone())
        }
    }
}

/// Decode standard base64 that may contain line breaks or other whitespace
pub fn decode_base64(input: &str) -> Result<String, String> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

/// Response of `GET /repos/{owner}/{repo}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub full_name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub topics: Vec<String>,

    #[serde(default)]
    pub stargazers_count: u64,

    #[serde(default)]
    pub forks_count: u64,
}

impl RepoMetadata {
    /// Minimal human-readable summary used when no README exists
    pub fn summary(&self) -> String {
        let title = if self.full_name.is_empty() {
            &self.name
        } else {
            &self.full_name
        };

        let mut out = format!("# {}\n\n", title);
        if let Some(description) = self.description.as_deref().filter(|d| !d.is_empty()) {
            out.push_str(description);
            out.push_str("\n\n");
        }
        out.push_str(&format!("- Name: {}\n", self.name));
        out.push_str(&format!(
            "- Language: {}\n",
            self.language.as_deref().unwrap_or("unknown")
        ));
        out.push_str(&format!("- Stars: {}\n", self.stargazers_count));
        out.push_str(&format!("- Forks: {}\n", self.forks_count));
        if !self.topics.is_empty() {
            out.push_str(&format!("- Topics: {}\n", self.topics.join(", ")));
        }
        out
    }
}
