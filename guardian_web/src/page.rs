use guardian_inference::Verdict;
use minijinja::Environment;
use serde::Serialize;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

#[derive(Debug, Serialize)]
pub struct Quote {
    pub text: &'static str,
    pub author: &'static str,
}

static QUOTES: [Quote; 3] = [
    Quote {
        text: "Courage doesn't always roar. Sometimes courage is the quiet voice at the end of the day saying, 'I will try again tomorrow.'",
        author: "Mary Anne Radmacher",
    },
    Quote {
        text: "There is a crack in everything. That's how the light gets in.",
        author: "Leonard Cohen",
    },
    Quote {
        text: "The human spirit is stronger than anything that can happen to it.",
        author: "C.C. Scott",
    },
];

#[derive(Debug, Serialize)]
pub struct ResultView {
    pub malignant: bool,
    pub headline: &'static str,
    pub confidence_percent: String,
    pub explanation: &'static str,
    pub advice: Option<&'static str>,
}

impl From<&Verdict> for ResultView {
    fn from(verdict: &Verdict) -> Self {
        Self {
            malignant: verdict.is_malignant(),
            headline: verdict.headline(),
            confidence_percent: verdict.confidence_percent(),
            explanation: verdict.explanation(),
            advice: verdict.advice(),
        }
    }
}

/// Everything the single page can show. The upload form is only rendered
/// when `model_error` is empty.
#[derive(Debug, Serialize, Default)]
pub struct PageView {
    pub model_error: Option<String>,
    pub preview: Option<String>,
    pub result: Option<ResultView>,
    pub error: Option<String>,
}

#[derive(Serialize)]
struct PageContext<'a> {
    #[serde(flatten)]
    view: &'a PageView,
    quotes: &'static [Quote],
}

pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("index.html", INDEX_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render(&self, view: &PageView) -> Result<String, minijinja::Error> {
        let context = PageContext {
            view,
            quotes: &QUOTES,
        };
        self.env.get_template("index.html")?.render(context)
    }
}

/// Inline `data:` URI so the uploaded slide can be previewed without storing it.
pub fn preview_data_uri(image_data: &[u8]) -> Option<String> {
    use base64::{engine::general_purpose, Engine as _};

    let format = image::guess_format(image_data).ok()?;
    Some(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        general_purpose::STANDARD.encode(image_data)
    ))
}
