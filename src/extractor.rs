//! Script text to ordered semantic actions.
//!
//! The model-assisted pass goes first. When it yields nothing, a fixed set of
//! patterns recovers what it can from the raw text.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::brain::{TextGenerator, first_balanced_span};
use crate::types::{ActionType, SemanticAction};

/// Which strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Llm,
    Fallback,
}

/// Actions pulled from one script, tagged with the strategy that found them.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub actions: Vec<SemanticAction>,
    pub strategy: Strategy,
}

static GOTO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:page\.goto|driver\.get)\(\s*"([^"]+)"\s*\)"#).expect("valid goto pattern")
});
static TEXT_FIELDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\btext_fields\w*\s*=\s*\{([^}]+)\}").expect("valid text fields pattern")
});
static DROPDOWNS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\bdropdowns\w*\s*=\s*\{([^}]+)\}").expect("valid dropdowns pattern")
});
static FILE_UPLOADS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\bfile_uploads\w*\s*=\s*\{([^}]+)\}").expect("valid uploads pattern")
});
static PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)":\s*"([^"]+)""#).expect("valid pair pattern"));
static TEMPLATED_FILL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"page\.fill\(f"([^"]+)",\s*f"([^"]+)"\)"#).expect("valid fill pattern")
});
static TEMPLATED_SELECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"page\.select_option\(f"([^"]+)",\s*"([^"]+)"\)"#).expect("valid select pattern")
});
static CLICK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"page\.click\("([^"]+)"\)"#).expect("valid click pattern"));
static HOVER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"page\.hover\("([^"]+)"\)"#).expect("valid hover pattern"));

fn extraction_prompt(script: &str) -> String {
    format!(
        r##"Analyze this Playwright test script and extract all the actions in a structured format.

Script:
{script}

Extract each action with:
1. Action type (goto, fill, click, select_option, upload, hover, etc.)
2. Selector (CSS selector, ID, etc.)
3. Value (if applicable)
4. Description

Return ONLY a JSON array with this format:
[
    {{
        "action": "goto",
        "selector": "",
        "value": "https://example.com/onboarding/complex",
        "description": "Navigate to onboarding page"
    }},
    {{
        "action": "fill",
        "selector": "#firstName",
        "value": "Gul",
        "description": "Fill first name field"
    }}
]"##
    )
}

/// The first literal navigation target in the script, if any.
pub fn first_navigation_url(script: &str) -> Option<&str> {
    GOTO_RE
        .captures(script)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub struct ActionExtractor {
    llm: Option<Arc<dyn TextGenerator>>,
}

impl ActionExtractor {
    pub fn new(llm: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { llm }
    }

    pub fn offline() -> Self {
        Self { llm: None }
    }

    /// Model first, patterns when the model comes back empty.
    pub async fn extract(&self, script: &str) -> Extraction {
        let actions = self.attempt_llm(script).await;
        if !actions.is_empty() {
            info!(count = actions.len(), "Extracted actions with LLM");
            return Extraction {
                actions,
                strategy: Strategy::Llm,
            };
        }

        let actions = self.attempt_fallback(script);
        info!(count = actions.len(), "Extracted actions with pattern fallback");
        Extraction {
            actions,
            strategy: Strategy::Fallback,
        }
    }

    /// Asks the model for an action array. Any failure is an empty list.
    pub async fn attempt_llm(&self, script: &str) -> Vec<SemanticAction> {
        let Some(llm) = &self.llm else {
            return Vec::new();
        };

        let reply = match llm.generate(&extraction_prompt(script)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "LLM extraction unavailable");
                return Vec::new();
            }
        };

        let Some(span) = first_balanced_span(&reply, '[', ']') else {
            debug!("LLM extraction reply held no JSON array");
            return Vec::new();
        };

        match serde_json::from_str::<Vec<SemanticAction>>(span) {
            Ok(actions) => actions,
            Err(e) => {
                debug!(error = %e, "LLM extraction reply did not decode");
                Vec::new()
            }
        }
    }

    pub fn attempt_fallback(&self, script: &str) -> Vec<SemanticAction> {
        fallback_parse(script)
    }
}

/// Pattern-based recovery of actions from raw script text.
///
/// Every rule runs, in a fixed order, appending to one list. Output follows
/// rule order first and source order within a rule, so interleaved clicks and
/// fills do not come back in chronological order.
pub fn fallback_parse(script: &str) -> Vec<SemanticAction> {
    let mut actions = Vec::new();

    if let Some(url) = first_navigation_url(script) {
        actions.push(SemanticAction::new(
            ActionType::Goto,
            "",
            url,
            "Navigate to page",
        ));
    }

    for (selector, value) in block_pairs(&TEXT_FIELDS_RE, script) {
        let description = format!("Fill {}", selector);
        actions.push(SemanticAction::new(
            ActionType::Fill,
            selector,
            value,
            description,
        ));
    }

    for (selector, option) in block_pairs(&DROPDOWNS_RE, script) {
        let description = format!("Select {} in {}", option, selector);
        actions.push(SemanticAction::new(
            ActionType::SelectOption,
            selector,
            option,
            description,
        ));
    }

    for (selector, file_path) in block_pairs(&FILE_UPLOADS_RE, script) {
        let description = format!("Upload file to {}", selector);
        actions.push(SemanticAction::new(
            ActionType::Upload,
            selector,
            file_path,
            description,
        ));
    }

    for caps in TEMPLATED_FILL_RE.captures_iter(script) {
        let (selector, value) = (&caps[1], &caps[2]);
        actions.push(SemanticAction::new(
            ActionType::Fill,
            selector,
            value,
            format!("Fill {}", selector),
        ));
    }

    for caps in TEMPLATED_SELECT_RE.captures_iter(script) {
        let (selector, option) = (&caps[1], &caps[2]);
        actions.push(SemanticAction::new(
            ActionType::SelectOption,
            selector,
            option,
            format!("Select {} in {}", option, selector),
        ));
    }

    for caps in CLICK_RE.captures_iter(script) {
        let selector = &caps[1];
        actions.push(SemanticAction::new(
            ActionType::Click,
            selector,
            "",
            format!("Click {}", selector),
        ));
    }

    for caps in HOVER_RE.captures_iter(script) {
        let selector = &caps[1];
        actions.push(SemanticAction::new(
            ActionType::Hover,
            selector,
            "",
            format!("Hover {}", selector),
        ));
    }

    debug!(count = actions.len(), "Pattern fallback finished");
    actions
}

/// `"key": "value"` pairs from every block the pattern introduces.
fn block_pairs<'a>(block: &Regex, script: &'a str) -> Vec<(&'a str, &'a str)> {
    block
        .captures_iter(script)
        .filter_map(|caps| caps.get(1))
        .flat_map(|body| {
            PAIR_RE.captures_iter(body.as_str()).filter_map(|pair| {
                let key = pair.get(1)?.as_str();
                let value = pair.get(2)?.as_str();
                Some((key, value))
            })
        })
        .collect()
}
