//! Template-correlation scorers backed by a [`TemplateBank`].

use crate::bank::{Angle, TemplateBank};
use crate::kernel::scalar::{ZnccMaskedScalar, ZnccUnmaskedScalar};
use crate::kernel::Kernel;
use crate::score::{Label, OrientationScorer, Region, ScoreResult, ViewScorer};
use crate::util::{DiceMatchError, DiceMatchResult, Unscored};
use crate::ImageView;

/// Default floor on image-window variance below which a placement is flat.
pub const DEFAULT_MIN_VAR_I: f32 = 1e-3;

/// Scores `(label, angle)` pairs by masked ZNCC of the rotated template
/// against a grayscale probe.
///
/// Confidence is the correlation peak over all placements, clamped into
/// `[0, 1]`; the region is the placement of that peak.
pub struct ZnccOrientationScorer<'a> {
    bank: &'a TemplateBank,
    image: ImageView<'a, u8>,
    min_var_i: f32,
}

impl<'a> ZnccOrientationScorer<'a> {
    /// Binds a bank to a single-channel probe.
    pub fn new(bank: &'a TemplateBank, image: ImageView<'a, u8>) -> DiceMatchResult<Self> {
        if image.channels() != 1 {
            return Err(DiceMatchError::UnsupportedChannels {
                expected: 1,
                got: image.channels(),
            });
        }
        Ok(Self {
            bank,
            image,
            min_var_i: DEFAULT_MIN_VAR_I,
        })
    }

    /// Overrides the flat-window variance floor.
    pub fn with_min_var_i(mut self, min_var_i: f32) -> Self {
        self.min_var_i = min_var_i;
        self
    }
}

impl OrientationScorer for ZnccOrientationScorer<'_> {
    fn labels(&self) -> Vec<Label> {
        self.bank.labels()
    }

    fn score(&self, label: Label, angle: Angle) -> Result<ScoreResult, Unscored> {
        let plan = self
            .bank
            .rotated(label, angle)
            .ok_or(Unscored::MissingTemplate {
                label: label.get(),
                angle_deg: angle.degrees(),
            })?;
        if plan.width() > self.image.width() || plan.height() > self.image.height() {
            return Err(Unscored::DegenerateGeometry("template larger than probe"));
        }
        let peak = ZnccMaskedScalar::scan_best(self.image, plan, self.min_var_i)
            .ok_or(Unscored::FlatImage)?;
        Ok(ScoreResult {
            label,
            confidence: peak.score.clamp(0.0, 1.0),
            region: Some(Region {
                x: peak.x,
                y: peak.y,
                width: plan.width(),
                height: plan.height(),
            }),
        })
    }
}

/// Classifies a view by correlating it with every label's upright template.
///
/// This is the correlation backend dressed as a [`ViewScorer`], so the
/// transform cascade can run without an external trained model. Color views
/// are converted to grayscale first.
pub struct TemplateClassifier<'a> {
    bank: &'a TemplateBank,
    min_var_i: f32,
}

impl<'a> TemplateClassifier<'a> {
    pub fn new(bank: &'a TemplateBank) -> Self {
        Self {
            bank,
            min_var_i: DEFAULT_MIN_VAR_I,
        }
    }
}

impl ViewScorer for TemplateClassifier<'_> {
    fn score(&self, view: ImageView<'_, u8>) -> Result<ScoreResult, Unscored> {
        let gray;
        let view = if view.channels() == 1 {
            view
        } else {
            gray = view.to_owned_image().to_gray();
            gray.view()
        };

        let mut best: Option<ScoreResult> = None;
        for label in self.bank.labels() {
            let Some(plan) = self.bank.upright(label) else {
                continue;
            };
            let Some(peak) = ZnccUnmaskedScalar::scan_best(view, plan, self.min_var_i) else {
                continue;
            };
            let confidence = peak.score.clamp(0.0, 1.0);
            if best.map_or(true, |b| confidence > b.confidence) {
                best = Some(ScoreResult {
                    label,
                    confidence,
                    region: Some(Region {
                        x: peak.x,
                        y: peak.y,
                        width: plan.width(),
                        height: plan.height(),
                    }),
                });
            }
        }
        best.ok_or(Unscored::FlatImage)
    }
}
