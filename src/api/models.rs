use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TextPart {
    pub text: String,
}

#[derive(Serialize, Clone)]
pub struct InstructionBlock {
    pub parts: Vec<TextPart>,
}

#[derive(Serialize, Clone)]
pub struct ContentBlock {
    pub role: String,
    pub parts: Vec<TextPart>,
}

#[derive(Serialize)]
pub struct GenerateRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<InstructionBlock>,
    pub contents: Vec<ContentBlock>,
}

impl GenerateRequest {
    /// Builds the single-turn request payload: an optional persona
    /// instruction plus the user's text as the sole content block.
    pub fn new(persona: Option<&str>, user_text: &str) -> Self {
        Self {
            system_instruction: persona.map(|instruction| InstructionBlock {
                parts: vec![TextPart {
                    text: instruction.to_string(),
                }],
            }),
            contents: vec![ContentBlock {
                role: "user".to_string(),
                parts: vec![TextPart {
                    text: user_text.to_string(),
                }],
            }],
        }
    }
}

#[derive(Deserialize, Default)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Option<Vec<TextPart>>,
}
