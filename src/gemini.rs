//! Meal analysis through the Gemini `generateContent` REST API.

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};

use nutrilog_core::analysis::{check_input, parse_analysis};
use nutrilog_core::{AnalysisError, MealAnalysis, MealAnalyzer, MealImage};

const SYSTEM_PROMPT: &str = "\
You are an expert nutritionist. Estimate nutritional values from a natural language \
description and/or a photo of food.

Rules:
1. If the user states a calorie total (e.g. \"800kcal turkey dinner\", \"800kc\", \"800 cals\"), \
keep that total exactly and estimate protein, carbs, fat and fiber from the kind of food.
2. Treat \"kc\", \"cals\" and \"cal\" as kcal.
3. If quantities are given (e.g. \"2 apples\"), use standard nutritional data.
4. If vague (e.g. \"handful of raisins\"), assume an average serving.
5. Be conservative but realistic.
6. \"summary\" is a 3-5 word title for the meal (e.g. \"Turkey Dinner\", \"Snack: Apples & Raisins\").
7. \"foodItems\" lists the identified ingredients.
8. Estimate dietary fiber carefully.";

pub struct GeminiAnalyzer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiAnalyzer {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(&self.model),
            urlencoding::encode(&self.api_key)
        )
    }
}

#[async_trait]
impl MealAnalyzer for GeminiAnalyzer {
    async fn analyze(
        &self,
        text: &str,
        image: Option<&MealImage>,
    ) -> Result<MealAnalysis, AnalysisError> {
        check_input(text, image)?;
        tracing::debug!("Requesting analysis from {}", self.model);

        let response = self
            .client
            .post(self.url())
            .json(&request_body(text, image))
            .send()
            .await
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("Unknown error")
                .to_string();
            return Err(AnalysisError::Request(format!("{} ({})", message, status)));
        }

        let text = response_text(&body).ok_or(AnalysisError::EmptyResponse)?;
        parse_analysis(text)
    }
}

fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "calories": { "type": "NUMBER", "description": "Total energy in kcal" },
            "protein": { "type": "NUMBER", "description": "Total protein in grams" },
            "carbs": { "type": "NUMBER", "description": "Total carbohydrates in grams" },
            "fat": { "type": "NUMBER", "description": "Total fat in grams" },
            "fiber": { "type": "NUMBER", "description": "Total dietary fiber in grams" },
            "summary": { "type": "STRING", "description": "A short display title for this entry" },
            "foodItems": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of identified food components"
            }
        },
        "required": ["calories", "protein", "carbs", "fat", "fiber", "summary", "foodItems"]
    })
}

fn request_body(text: &str, image: Option<&MealImage>) -> Value {
    let mut parts = Vec::new();
    if let Some(image) = image.filter(|i| !i.bytes.is_empty()) {
        parts.push(json!({
            "inlineData": {
                "mimeType": image.mime_type,
                "data": base64::engine::general_purpose::STANDARD.encode(&image.bytes),
            }
        }));
    }
    let prompt = if text.trim().is_empty() {
        "Analyze this meal."
    } else {
        text
    };
    parts.push(json!({ "text": prompt }));

    json!({
        "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema(),
        }
    })
}

/// Text of the first candidate's first part.
fn response_text(body: &Value) -> Option<&str> {
    body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .filter(|t| !t.trim().is_empty())
}
