use derive_more::Display;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, EnumIter};

pub use strum::EnumCount;

/// Art-historical styles the ensemble is trained on.
///
/// Declaration order is the alphabetical order of the identifiers, which is
/// also the index order of the style models' output vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, strum_macros::EnumCount, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum StyleClass {
    ArtNouveau,
    Baroque,
    Expressionism,
    Impressionism,
    PostImpressionism,
    Realism,
    Renaissance,
    Romanticism,
    Surrealism,
    UkiyoE,
}

impl StyleClass {
    pub fn all() -> impl Iterator<Item = StyleClass> {
        Self::iter()
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::iter().nth(index)
    }

    pub fn identifier(&self) -> &'static str {
        match self {
            StyleClass::ArtNouveau => "art_nouveau",
            StyleClass::Baroque => "baroque",
            StyleClass::Expressionism => "expressionism",
            StyleClass::Impressionism => "impressionism",
            StyleClass::PostImpressionism => "post_impressionism",
            StyleClass::Realism => "realism",
            StyleClass::Renaissance => "renaissance",
            StyleClass::Romanticism => "romanticism",
            StyleClass::Surrealism => "surrealism",
            StyleClass::UkiyoE => "ukiyo_e",
        }
    }

    /// Human readable label, e.g. `post_impressionism` -> `Post Impressionism`.
    pub fn label(&self) -> String {
        title_case(self.identifier())
    }
}

fn title_case(identifier: &str) -> String {
    identifier
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticityClass {
    AiGenerated,
    HumanCreated,
}

impl AuthenticityClass {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(AuthenticityClass::AiGenerated),
            1 => Some(AuthenticityClass::HumanCreated),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AuthenticityClass::AiGenerated => "AI Generated",
            AuthenticityClass::HumanCreated => "Human Created",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AuthenticityResult {
    pub prediction: String,
    pub confidence: f32,
    pub is_human: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StylePrediction {
    pub style: String,
    pub confidence: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StyleResult {
    pub predicted_style: String,
    pub confidence: f32,
    pub top_3_predictions: Vec<StylePrediction>,
}

/// A branch could not run because the models it needs were never loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AvailabilityError {
    #[display(fmt = "Authenticity model not available")]
    AuthenticityModelMissing,
    #[display(fmt = "Style models not available")]
    StyleModelsMissing,
    #[display(fmt = "Only one style model available - need both for ensemble prediction")]
    IncompleteStyleEnsemble,
}

/// Outcome of one analysis branch.
///
/// Both error variants serialize as `{"error": "..."}`; a successful branch
/// serializes as the result itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Branch<T> {
    Ready(T),
    Unavailable(AvailabilityError),
    Failed(String),
}

impl<T> Branch<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Branch::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            Branch::Ready(_) => None,
            Branch::Unavailable(e) => Some(e.to_string()),
            Branch::Failed(message) => Some(message.clone()),
        }
    }
}

impl<T: Serialize> Serialize for Branch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Branch::Ready(value) => value.serialize(serializer),
            Branch::Unavailable(_) | Branch::Failed(_) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", &self.error_message())?;
                map.end()
            }
        }
    }
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct AnalysisResult {
    pub authenticity: Option<Branch<AuthenticityResult>>,
    pub style: Option<Branch<StyleResult>>,
    pub error: Option<String>,
}

impl AnalysisResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            authenticity: None,
            style: None,
            error: Some(message.into()),
        }
    }
}
