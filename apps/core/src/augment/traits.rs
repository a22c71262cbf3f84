use async_trait::async_trait;
use serde::Serialize;

use crate::brain::intent::IntentResult;
use crate::error::AppError;
use crate::models::{MicrobiomeProfile, UserProfile};

/// Everything an augmenter may use to produce its reply.
#[derive(Debug, Clone, Serialize)]
pub struct AugmentRequest {
    pub session_id: String,
    pub message: String,
    /// The already-resolved intent; kept by the caller whatever the outcome.
    pub intent: IntentResult,
    /// Deterministic reply the caller falls back to.
    pub composed: String,
    pub user_profile: Option<UserProfile>,
    pub microbiome: Option<MicrobiomeProfile>,
}

impl AugmentRequest {
    /// System instructions embedding the caller's profiles as JSON.
    pub fn system_prompt(&self) -> String {
        let user = self
            .user_profile
            .as_ref()
            .and_then(|p| serde_json::to_string(p).ok())
            .unwrap_or_else(|| "Not available".to_string());
        let microbiome = self
            .microbiome
            .as_ref()
            .and_then(|m| serde_json::to_string(m).ok())
            .unwrap_or_else(|| "Not available".to_string());

        format!(
            "You are a specialized microbiome health assistant. You have access to the user's \
             microbiome data and should provide personalized, science-based advice about gut \
             health, probiotics, diet, and microbiome optimization.\n\n\
             User Profile: {}\n\
             Microbiome Data: {}\n\n\
             Provide helpful, accurate, and personalized responses about gut health. Always \
             mention specific microbiome insights when relevant.",
            user, microbiome
        )
    }
}

/// Pluggable reply augmentation capability.
///
/// Implementations may call remote services; any error makes the caller keep
/// the composed reply.
#[async_trait]
pub trait Augmenter: Send + Sync {
    async fn augment(&self, request: &AugmentRequest) -> Result<String, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::intent::Intent;
    use std::collections::BTreeSet;

    fn request(user_profile: Option<UserProfile>) -> AugmentRequest {
        AugmentRequest {
            session_id: "s1".to_string(),
            message: "hi".to_string(),
            intent: IntentResult::rule_based(Intent::Hello),
            composed: "hello".to_string(),
            user_profile,
            microbiome: None,
        }
    }

    #[test]
    fn test_system_prompt_without_profiles() {
        let prompt = request(None).system_prompt();
        assert!(prompt.contains("User Profile: Not available"));
        assert!(prompt.contains("Microbiome Data: Not available"));
    }

    #[test]
    fn test_system_prompt_embeds_profile_json() {
        let profile = UserProfile {
            diet: Some("vegan".to_string()),
            allergies: BTreeSet::from(["dairy".to_string()]),
            ..Default::default()
        };
        let prompt = request(Some(profile)).system_prompt();
        assert!(prompt.contains(r#""diet":"vegan""#));
        assert!(prompt.contains(r#""allergies":["dairy"]"#));
    }
}
