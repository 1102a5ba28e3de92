use serde::Serialize;

/// Scores strictly above this are malignant.
const MALIGNANT_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Malignant,
    Benign,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Malignant => "malignant",
            Label::Benign => "benign",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    pub label: Label,
    pub confidence: f32,
}

/// Maps the raw model score to the predicted class and its probability.
pub fn render(score: f32) -> Verdict {
    if score > MALIGNANT_THRESHOLD {
        Verdict {
            label: Label::Malignant,
            confidence: score,
        }
    } else {
        Verdict {
            label: Label::Benign,
            confidence: 1.0 - score,
        }
    }
}

impl Verdict {
    pub fn is_malignant(&self) -> bool {
        self.label == Label::Malignant
    }

    pub fn confidence_percent(&self) -> String {
        format!("{:.2}%", self.confidence * 100.0)
    }

    pub fn headline(&self) -> &'static str {
        match self.label {
            Label::Malignant => "Analysis Complete: Malignant Detected",
            Label::Benign => "Analysis Complete: Benign Detected",
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self.label {
            Label::Malignant => "The AI detected cellular patterns that are cancerous.",
            Label::Benign => {
                "The AI detected normal cellular patterns. No cancer was detected in this specific image."
            }
        }
    }

    /// Only malignant results carry a reminder to see a clinician.
    pub fn advice(&self) -> Option<&'static str> {
        match self.label {
            Label::Malignant => Some(
                "Please remember this is an AI tool, not a doctor. Consult with an oncologist or medical professional for a clinical diagnosis.",
            ),
            Label::Benign => None,
        }
    }
}
