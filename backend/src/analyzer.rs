use std::path::Path;

use image::DynamicImage;
use shared::{
    AnalysisResult, AuthenticityClass, AuthenticityResult, AvailabilityError, Branch, EnumCount,
    StyleClass, StylePrediction, StyleResult,
};

use crate::inference::preprocess::{self, Recipe};
use crate::inference::{InferenceError, InferenceModel, ModelRegistry, ModelSlot};

const TOP_K: usize = 3;

pub struct ArtAnalyzer {
    registry: ModelRegistry,
}

impl ArtAnalyzer {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn analyze_path(&self, path: &Path) -> AnalysisResult {
        if !path.exists() {
            return AnalysisResult::failed("Image file not found");
        }
        match image::open(path) {
            Ok(image) => self.analyze(&image),
            Err(e) => decode_failure(e),
        }
    }

    pub fn analyze_bytes(&self, bytes: &[u8]) -> AnalysisResult {
        match image::load_from_memory(bytes) {
            Ok(image) => self.analyze(&image),
            Err(e) => decode_failure(e),
        }
    }

    /// Runs both branches. A failure in one never affects the other.
    pub fn analyze(&self, image: &DynamicImage) -> AnalysisResult {
        log::info!("Starting analysis of {}x{} image", image.width(), image.height());
        let result = AnalysisResult {
            authenticity: Some(self.authenticity_branch(image)),
            style: Some(self.style_branch(image)),
            error: None,
        };
        log::info!("Analysis complete");
        result
    }

    fn authenticity_branch(&self, image: &DynamicImage) -> Branch<AuthenticityResult> {
        let Some(model) = self.registry.model(ModelSlot::Authenticity) else {
            log::info!("Authenticity model not available");
            return Branch::Unavailable(AvailabilityError::AuthenticityModelMissing);
        };

        log::info!("Running authenticity analysis...");
        match predict_authenticity(model, image) {
            Ok(result) => {
                log::info!("Authenticity result: {} ({:.2}%)", result.prediction, result.confidence);
                Branch::Ready(result)
            }
            Err(e) => {
                log::error!("Authenticity analysis failed: {}", e);
                Branch::Failed(e.to_string())
            }
        }
    }

    fn style_branch(&self, image: &DynamicImage) -> Branch<StyleResult> {
        let effnet = self.registry.model(ModelSlot::StyleEffNet);
        let convnext = self.registry.model(ModelSlot::StyleConvNext);

        match (effnet, convnext) {
            (Some(effnet), Some(convnext)) => {
                log::info!("Running style analysis...");
                match predict_style(effnet, convnext, image) {
                    Ok(result) => {
                        log::info!("Style result: {} ({:.2}%)", result.predicted_style, result.confidence);
                        Branch::Ready(result)
                    }
                    Err(e) => {
                        log::error!("Style analysis failed: {}", e);
                        Branch::Failed(e.to_string())
                    }
                }
            }
            (Some(_), None) | (None, Some(_)) => {
                log::warn!("Incomplete style models - need both EfficientNet and ConvNeXt");
                Branch::Unavailable(AvailabilityError::IncompleteStyleEnsemble)
            }
            (None, None) => {
                log::info!("Style models not available");
                Branch::Unavailable(AvailabilityError::StyleModelsMissing)
            }
        }
    }
}

fn decode_failure(err: image::ImageError) -> AnalysisResult {
    let message = format!("Error during analysis: {}", err);
    log::error!("{}", message);
    AnalysisResult::failed(message)
}

fn run(model: &dyn InferenceModel, recipe: &Recipe, image: &DynamicImage) -> Result<Vec<f32>, InferenceError> {
    let input = recipe.apply(image);
    model.predict(&input)
}

fn predict_authenticity(model: &dyn InferenceModel, image: &DynamicImage) -> Result<AuthenticityResult, InferenceError> {
    let output = run(model, &preprocess::AUTHENTICITY, image)?;
    let probability = *output.first().ok_or(InferenceError::ShapeMismatch {
        expected: 1,
        actual: 0,
    })?;
    authenticity_from_probability(probability)
}

fn predict_style(
    effnet: &dyn InferenceModel,
    convnext: &dyn InferenceModel,
    image: &DynamicImage,
) -> Result<StyleResult, InferenceError> {
    let effnet_scores = expect_style_scores(run(effnet, &preprocess::STYLE_EFFNET, image)?)?;
    let convnext_scores = expect_style_scores(run(convnext, &preprocess::STYLE_CONVNEXT, image)?)?;
    let scores = ensemble(&effnet_scores, &convnext_scores)?;
    style_from_scores(&scores)
}

fn expect_style_scores(scores: Vec<f32>) -> Result<Vec<f32>, InferenceError> {
    if scores.len() != StyleClass::COUNT {
        return Err(InferenceError::ShapeMismatch {
            expected: StyleClass::COUNT,
            actual: scores.len(),
        });
    }
    if let Some(index) = scores.iter().position(|s| !s.is_finite()) {
        return Err(InferenceError::Model(format!(
            "style output {} is not a number: {}",
            index, scores[index]
        )));
    }
    Ok(scores)
}

/// `p` is the model's probability of "Human Created". Confidence is the
/// probability mass of whichever class wins, so it never drops below 50.
pub fn authenticity_from_probability(p: f32) -> Result<AuthenticityResult, InferenceError> {
    if !p.is_finite() {
        return Err(InferenceError::Model(format!("authenticity output is not a number: {p}")));
    }
    let p = p.clamp(0.0, 1.0);
    // Half rounds to even like numpy, so exactly 0.5 is "AI Generated".
    let index = p.round_ties_even() as usize;
    let class = AuthenticityClass::from_index(index).ok_or(InferenceError::ShapeMismatch {
        expected: 2,
        actual: index + 1,
    })?;
    let is_human = class == AuthenticityClass::HumanCreated;
    let confidence = if is_human { p * 100.0 } else { (1.0 - p) * 100.0 };

    Ok(AuthenticityResult {
        prediction: class.label().to_string(),
        confidence,
        is_human,
    })
}

/// Unweighted elementwise mean of two probability vectors.
pub fn ensemble(a: &[f32], b: &[f32]) -> Result<Vec<f32>, InferenceError> {
    if a.len() != b.len() {
        return Err(InferenceError::ShapeMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| (x + y) / 2.0).collect())
}

/// Indices of `scores` from highest to lowest. The sort is stable, so equal
/// scores keep ascending index order.
pub fn ranked_indices(scores: &[f32]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&i, &j| scores[j].total_cmp(&scores[i]));
    indices
}

pub fn style_from_scores(scores: &[f32]) -> Result<StyleResult, InferenceError> {
    let scores = expect_style_scores(scores.to_vec())?;
    let prediction = |index: usize| -> Result<StylePrediction, InferenceError> {
        let class = StyleClass::from_index(index).ok_or(InferenceError::ShapeMismatch {
            expected: StyleClass::COUNT,
            actual: index + 1,
        })?;
        Ok(StylePrediction {
            style: class.label(),
            confidence: scores[index] * 100.0,
        })
    };

    let top = ranked_indices(&scores)
        .into_iter()
        .take(TOP_K)
        .map(prediction)
        .collect::<Result<Vec<_>, _>>()?;
    let best = top.first().cloned().ok_or(InferenceError::ShapeMismatch {
        expected: StyleClass::COUNT,
        actual: 0,
    })?;

    Ok(StyleResult {
        predicted_style: best.style,
        confidence: best.confidence,
        top_3_predictions: top,
    })
}
