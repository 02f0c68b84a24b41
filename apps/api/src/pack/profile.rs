//! Résumé profile payload shape (spec §3 "Resume Profile").
//!
//! `resume_profiles.profile_json` is a free-form JSON blob; this gives the
//! pack generator a typed, defaulted view over it instead of poking at
//! `serde_json::Value` throughout.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProfileBasics {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProfileData {
    #[serde(default)]
    pub basics: ProfileBasics,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl ProfileData {
    pub fn parse(profile_json: &Value) -> Self {
        serde_json::from_value(profile_json.clone()).unwrap_or_default()
    }

    /// All free text the profile carries, lower-cased, for keyword-coverage checks.
    pub fn combined_text_lower(&self) -> String {
        let mut parts = vec![self.summary.to_lowercase()];
        for entry in &self.experience {
            parts.push(entry.title.to_lowercase());
            parts.push(entry.company.to_lowercase());
            for bullet in &entry.bullets {
                parts.push(bullet.to_lowercase());
            }
        }
        for skill in &self.skills {
            parts.push(skill.to_lowercase());
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_profile() {
        let v = serde_json::json!({
            "basics": {"name": "Jo Rivera", "email": "jo@example.com"},
            "summary": "Backend engineer.",
            "skills": ["rust", "postgres"],
        });
        let profile = ProfileData::parse(&v);
        assert_eq!(profile.basics.name, "Jo Rivera");
        assert_eq!(profile.skills, vec!["rust", "postgres"]);
        assert!(profile.experience.is_empty());
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let profile = ProfileData::parse(&serde_json::json!({}));
        assert_eq!(profile.basics.name, "");
        assert!(profile.skills.is_empty());
    }
}
