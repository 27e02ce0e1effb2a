//! Meal analysis capability.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::MealAnalysis;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Describe the meal or attach a photo")]
    NoInput,

    #[error("Analysis request failed: {0}")]
    Request(String),

    #[error("No response from the analysis model")]
    EmptyResponse,

    #[error("Could not understand the analysis response: {0}")]
    InvalidResponse(String),
}

/// A photo of the meal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl MealImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Guesses the MIME type from a file extension, defaulting to JPEG.
    pub fn mime_for_extension(ext: &str) -> &'static str {
        match ext.to_ascii_lowercase().as_str() {
            "png" => "image/png",
            "webp" => "image/webp",
            "heic" => "image/heic",
            "heif" => "image/heif",
            "gif" => "image/gif",
            _ => "image/jpeg",
        }
    }
}

/// Estimates a meal's macros from a description and/or a photo.
///
/// Failures are returned as-is; callers never retry on their own.
#[async_trait]
pub trait MealAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        text: &str,
        image: Option<&MealImage>,
    ) -> Result<MealAnalysis, AnalysisError>;
}

/// Rejects a request that has neither text nor image.
pub fn check_input(text: &str, image: Option<&MealImage>) -> Result<(), AnalysisError> {
    let has_image = image.is_some_and(|i| !i.bytes.is_empty());
    if text.trim().is_empty() && !has_image {
        return Err(AnalysisError::NoInput);
    }
    Ok(())
}

/// Parses the model's JSON answer, rejecting negative or non-finite values.
pub fn parse_analysis(json: &str) -> Result<MealAnalysis, AnalysisError> {
    if json.trim().is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }
    let analysis: MealAnalysis =
        serde_json::from_str(json).map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;
    if let Some(field) = analysis.macros.invalid_field() {
        return Err(AnalysisError::InvalidResponse(format!(
            "`{}` must be a non-negative number",
            field
        )));
    }
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_input() {
        assert!(matches!(check_input("  ", None), Err(AnalysisError::NoInput)));
        assert!(check_input("banana", None).is_ok());

        let image = MealImage::new(vec![0xff, 0xd8], "image/jpeg");
        assert!(check_input("", Some(&image)).is_ok());

        let empty = MealImage::new(Vec::new(), "image/jpeg");
        assert!(check_input("", Some(&empty)).is_err());
    }

    #[test]
    fn test_parse_analysis() {
        let json = r#"{"calories": 800, "protein": 45, "carbs": 70, "fat": 30, "fiber": 8,
                       "summary": "Turkey Dinner", "foodItems": ["turkey", "potatoes"]}"#;
        let analysis = parse_analysis(json).unwrap();
        assert_eq!(analysis.macros.calories, 800.0);
        assert_eq!(analysis.summary, "Turkey Dinner");
        assert_eq!(analysis.food_items.len(), 2);
    }

    #[test]
    fn test_parse_analysis_rejects_negative() {
        let json = r#"{"calories": -5, "protein": 1, "carbs": 1, "fat": 1, "fiber": 1,
                       "summary": "x", "foodItems": []}"#;
        let err = parse_analysis(json).unwrap_err();
        assert!(err.to_string().contains("calories"));
    }

    #[test]
    fn test_parse_analysis_empty_and_garbage() {
        assert!(matches!(parse_analysis(""), Err(AnalysisError::EmptyResponse)));
        assert!(matches!(
            parse_analysis("Sure! Here is"),
            Err(AnalysisError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(MealImage::mime_for_extension("PNG"), "image/png");
        assert_eq!(MealImage::mime_for_extension("jpg"), "image/jpeg");
        assert_eq!(MealImage::mime_for_extension("unknown"), "image/jpeg");
    }
}
