//! Per-label template banks pre-rotated onto the fine angle grid.
//!
//! Building every rotation up front amortizes the cost across all probes.
//! A slot stays empty when its rotation could not be planned (for example a
//! template too small to keep variance after rotation) or when a pre-rotated
//! set omitted that angle; searches treat an empty slot as unscored.

mod angles;

pub use angles::{Angle, AngleGrid};

use crate::score::Label;
use crate::template::rotate::rotate_u8_bilinear_masked;
use crate::template::{MaskedTemplatePlan, Template, TemplatePlan};
use crate::trace::trace_warn;
use crate::util::{DiceMatchError, DiceMatchResult};
use std::collections::BTreeMap;

struct LabelBank {
    upright: Option<TemplatePlan>,
    slots: Vec<Option<MaskedTemplatePlan>>,
}

/// Rotated template plans for every label, keyed in ascending label order.
pub struct TemplateBank {
    grid: AngleGrid,
    fill_value: u8,
    labels: BTreeMap<Label, LabelBank>,
}

impl TemplateBank {
    /// Creates an empty bank over `grid`. `fill_value` fills the corners
    /// uncovered by rotation; those pixels are masked out of correlation.
    pub fn new(grid: AngleGrid, fill_value: u8) -> Self {
        Self {
            grid,
            fill_value,
            labels: BTreeMap::new(),
        }
    }

    /// Rotates `template` onto every grid angle and registers it.
    pub fn insert_template(&mut self, label: Label, template: &Template) -> DiceMatchResult<()> {
        self.ensure_new(label)?;
        let upright = TemplatePlan::from_view(template.view())?;
        let slots = self
            .grid
            .angles()
            .iter()
            .map(|angle| {
                let (img, mask) = rotate_u8_bilinear_masked(
                    template.view(),
                    f32::from(angle.degrees()),
                    self.fill_value,
                );
                match MaskedTemplatePlan::from_view_mask(img.view(), &mask) {
                    Ok(plan) => Some(plan),
                    Err(_err) => {
                        trace_warn!(
                            "rotation_unplannable",
                            label = label.get(),
                            angle = angle.degrees()
                        );
                        None
                    }
                }
            })
            .collect();
        self.labels.insert(
            label,
            LabelBank {
                upright: Some(upright),
                slots,
            },
        );
        Ok(())
    }

    /// Registers templates that were rotated ahead of time.
    ///
    /// Angles off the grid are rejected; grid angles without an entry stay
    /// empty. The 0° entry, when present, also serves as the upright plan.
    pub fn insert_rotations<I>(&mut self, label: Label, rotations: I) -> DiceMatchResult<()>
    where
        I: IntoIterator<Item = (Angle, Template)>,
    {
        self.ensure_new(label)?;
        let mut slots: Vec<Option<MaskedTemplatePlan>> = vec![None; self.grid.len()];
        let mut upright = None;
        for (angle, template) in rotations {
            let idx = self
                .grid
                .index_of(angle)
                .ok_or(DiceMatchError::InvalidConfig {
                    reason: "pre-rotated template angle is not on the angle grid",
                })?;
            let mask = vec![1u8; template.width() * template.height()];
            slots[idx] = Some(MaskedTemplatePlan::from_view_mask(template.view(), &mask)?);
            if angle == Angle::ZERO {
                upright = Some(TemplatePlan::from_view(template.view())?);
            }
        }
        self.labels.insert(label, LabelBank { upright, slots });
        Ok(())
    }

    fn ensure_new(&self, label: Label) -> DiceMatchResult<()> {
        if self.labels.contains_key(&label) {
            return Err(DiceMatchError::DuplicateLabel { label: label.get() });
        }
        Ok(())
    }

    /// Registered labels in ascending order.
    pub fn labels(&self) -> Vec<Label> {
        self.labels.keys().copied().collect()
    }

    /// Returns the grid the bank was rotated onto.
    pub fn grid(&self) -> &AngleGrid {
        &self.grid
    }

    /// Returns the number of registered labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if no label is registered.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rotated plan for `label` at `angle`, if that slot is populated.
    pub fn rotated(&self, label: Label, angle: Angle) -> Option<&MaskedTemplatePlan> {
        let idx = self.grid.index_of(angle)?;
        self.labels.get(&label)?.slots.get(idx)?.as_ref()
    }

    /// Unrotated plan for `label`, if one is available.
    pub fn upright(&self, label: Label) -> Option<&TemplatePlan> {
        self.labels.get(&label)?.upright.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{Angle, AngleGrid, TemplateBank};
    use crate::score::Label;
    use crate::template::Template;
    use crate::util::DiceMatchError;

    fn template() -> Template {
        let data = (0..16 * 16).map(|i| ((i * 37) % 251) as u8).collect();
        Template::new(data, 16, 16).unwrap()
    }

    #[test]
    fn insert_template_fills_every_slot() {
        let mut bank = TemplateBank::new(AngleGrid::new(90).unwrap(), 0);
        let label = Label::new(3).unwrap();
        bank.insert_template(label, &template()).unwrap();
        for deg in [0, 90, 180, 270] {
            assert!(bank.rotated(label, Angle::new(deg)).is_some());
        }
        assert!(bank.rotated(label, Angle::new(45)).is_none());
        assert!(bank.upright(label).is_some());
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let mut bank = TemplateBank::new(AngleGrid::new(90).unwrap(), 0);
        let label = Label::new(1).unwrap();
        bank.insert_template(label, &template()).unwrap();
        let err = bank.insert_template(label, &template()).unwrap_err();
        assert_eq!(err, DiceMatchError::DuplicateLabel { label: 1 });
    }

    #[test]
    fn partial_rotation_set_leaves_gaps() {
        let mut bank = TemplateBank::new(AngleGrid::new(90).unwrap(), 0);
        let label = Label::new(2).unwrap();
        bank.insert_rotations(label, [(Angle::new(90), template())])
            .unwrap();
        assert!(bank.rotated(label, Angle::new(90)).is_some());
        assert!(bank.rotated(label, Angle::ZERO).is_none());
        assert!(bank.upright(label).is_none());
    }
}
