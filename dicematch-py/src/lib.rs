//! Python bindings for the dicematch die-face recognition library.
//!
//! Exposes the template bank, the coarse-to-fine orientation search and the
//! transform cascade. The cascade accepts either a template bank or any
//! Python callable as its scorer.

use std::collections::BTreeMap;

use numpy::ndarray::{Array2, Array3};
use numpy::{IntoPyArray, PyReadonlyArray2, PyReadonlyArrayDyn, PyUntypedArrayMethods};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use dicematch::bank::AngleGrid;
use dicematch::{
    CascadeConfig as RustCascadeConfig, CascadeOutcome as RustCascadeOutcome, CascadeSearch,
    CoarseFineSearch, Corner, Decision as RustDecision, DecisionPolicy, DiceMatchError, ImageView,
    Label, OrientationConfig as RustOrientationConfig, OrientationMatch as RustOrientationMatch,
    OwnedImage, Region, ScoreResult, Template, TemplateBank as RustTemplateBank,
    TemplateClassifier, Unscored, ZnccOrientationScorer,
};

fn to_py_err(err: DiceMatchError) -> PyErr {
    PyRuntimeError::new_err(err.to_string())
}

fn region_tuple(region: Option<Region>) -> Option<(usize, usize, usize, usize)> {
    region.map(|r| (r.x, r.y, r.width, r.height))
}

/// Borrows a 2D (gray) or 3D (height, width, channels) uint8 array.
fn image_view<'a>(array: &'a PyReadonlyArrayDyn<'_, u8>) -> PyResult<ImageView<'a, u8>> {
    let data = array.as_slice()?;
    match *array.shape() {
        [height, width] => ImageView::from_slice(data, width, height).map_err(to_py_err),
        [height, width, channels] => {
            ImageView::from_interleaved(data, width, height, channels).map_err(to_py_err)
        }
        _ => Err(PyValueError::new_err(
            "image must have shape (height, width) or (height, width, channels)",
        )),
    }
}

fn image_to_array<'py>(py: Python<'py>, image: OwnedImage) -> PyResult<Bound<'py, PyAny>> {
    let (height, width, channels) = (image.height(), image.width(), image.channels());
    let data = image.into_data();
    let shape_err = |e: numpy::ndarray::ShapeError| PyValueError::new_err(e.to_string());
    if channels == 1 {
        let array = Array2::from_shape_vec((height, width), data).map_err(shape_err)?;
        Ok(array.into_pyarray(py).into_any())
    } else {
        let array = Array3::from_shape_vec((height, width, channels), data).map_err(shape_err)?;
        Ok(array.into_pyarray(py).into_any())
    }
}

fn parse_corner(name: &str) -> PyResult<Corner> {
    match name.to_lowercase().as_str() {
        "tl" => Ok(Corner::TopLeft),
        "tr" => Ok(Corner::TopRight),
        "bl" => Ok(Corner::BottomLeft),
        "br" => Ok(Corner::BottomRight),
        _ => Err(PyValueError::new_err(
            "corner must be one of 'tl', 'tr', 'bl', 'br'",
        )),
    }
}

/// Reads a scorer return value: `(label, confidence)` or a class
/// probability vector whose index `i` maps to label `i + 1`.
fn read_score(out: &Bound<'_, PyAny>) -> Result<ScoreResult, Unscored> {
    if let Ok((id, confidence)) = out.extract::<(u16, f32)>() {
        let label =
            Label::new(id).ok_or_else(|| Unscored::ScorerFailure("label 0 is reserved".into()))?;
        return Ok(ScoreResult::new(label, confidence));
    }
    let probs: Vec<f32> = out
        .extract()
        .map_err(|e| Unscored::ScorerFailure(e.to_string()))?;
    ScoreResult::from_probabilities(&probs)
        .ok_or_else(|| Unscored::ScorerFailure("empty or non-finite probabilities".into()))
}

/// Accept/reject verdict for a search result.
#[pyclass]
#[derive(Clone)]
pub struct Decision {
    inner: RustDecision,
}

#[pymethods]
impl Decision {
    /// Recognized side id, or None.
    #[getter]
    fn label(&self) -> Option<u16> {
        self.inner.label().map(Label::get)
    }

    #[getter]
    fn recognized(&self) -> bool {
        self.inner.is_recognized()
    }

    #[getter]
    fn confidence(&self) -> f32 {
        match self.inner {
            RustDecision::Recognized { confidence, .. } => confidence,
            RustDecision::Unrecognized { best_confidence } => best_confidence,
        }
    }

    fn __repr__(&self) -> String {
        format!("Decision({})", self.inner)
    }
}

fn decide(result: &ScoreResult, acceptance_threshold: f32) -> PyResult<Decision> {
    let policy = DecisionPolicy::new(acceptance_threshold).map_err(to_py_err)?;
    Ok(Decision {
        inner: policy.decide(result),
    })
}

/// Orientation search parameters.
#[pyclass]
#[derive(Clone)]
pub struct OrientationConfig {
    inner: RustOrientationConfig,
}

#[pymethods]
impl OrientationConfig {
    /// Create a new OrientationConfig.
    ///
    /// Args:
    ///     angle_step_deg: Fine angular step, also the bank's rotation step (default: 10)
    ///     coarse_step_deg: Coarse angular step (default: 30)
    ///     fine_half_range_deg: Half-width of the refinement window (default: 20)
    ///     early_exit_threshold: Coarse confidence that skips refinement (default: 0.95)
    ///     fill_value: Fill for pixels uncovered by template rotation (default: 0)
    ///     min_var_i: Image window variance floor (default: 1e-3)
    #[new]
    #[pyo3(signature = (
        angle_step_deg = 10,
        coarse_step_deg = 30,
        fine_half_range_deg = 20,
        early_exit_threshold = 0.95,
        fill_value = 0,
        min_var_i = 1e-3
    ))]
    fn new(
        angle_step_deg: u16,
        coarse_step_deg: u16,
        fine_half_range_deg: u16,
        early_exit_threshold: f32,
        fill_value: u8,
        min_var_i: f32,
    ) -> PyResult<Self> {
        let inner = RustOrientationConfig {
            angle_step_deg,
            coarse_step_deg,
            fine_half_range_deg,
            early_exit_threshold,
            fill_value,
            min_var_i,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(to_py_err)
    }

    fn __repr__(&self) -> String {
        format!(
            "OrientationConfig(angle_step_deg={}, coarse_step_deg={}, fine_half_range_deg={}, early_exit_threshold={})",
            self.inner.angle_step_deg,
            self.inner.coarse_step_deg,
            self.inner.fine_half_range_deg,
            self.inner.early_exit_threshold
        )
    }
}

/// Transform cascade parameters.
#[pyclass]
#[derive(Clone)]
pub struct CascadeConfig {
    inner: RustCascadeConfig,
}

#[pymethods]
impl CascadeConfig {
    /// Create a new CascadeConfig. Omitted grids keep their defaults.
    ///
    /// Args:
    ///     confidence_threshold: Confidence that accepts immediately (default: 0.88)
    ///     margin: Required improvement over the running best (default: 0.06)
    ///     contrast_gains: Gain values, outer loop of the brightness/contrast grid
    ///     brightness_offsets: Offset values, inner loop of the grid
    ///     skew_magnitudes: Skew sizes in pixels, non-zero
    ///     corners: Subset of 'tl', 'tr', 'bl', 'br' in enumeration order
    ///     inversion_luminance_cutoff: Inversion runs above this mean luminance (default: 170)
    ///     fill_value: Fill for pixels uncovered by a skew (default: 255)
    #[new]
    #[pyo3(signature = (
        confidence_threshold = 0.88,
        margin = 0.06,
        contrast_gains = None,
        brightness_offsets = None,
        skew_magnitudes = None,
        corners = None,
        inversion_luminance_cutoff = 170.0,
        fill_value = 255
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        confidence_threshold: f32,
        margin: f32,
        contrast_gains: Option<Vec<f32>>,
        brightness_offsets: Option<Vec<f32>>,
        skew_magnitudes: Option<Vec<i32>>,
        corners: Option<Vec<String>>,
        inversion_luminance_cutoff: f32,
        fill_value: u8,
    ) -> PyResult<Self> {
        let defaults = RustCascadeConfig::default();
        let corners = match corners {
            Some(names) => names
                .iter()
                .map(|n| parse_corner(n))
                .collect::<PyResult<Vec<_>>>()?,
            None => defaults.corners,
        };
        let inner = RustCascadeConfig {
            confidence_threshold,
            margin,
            contrast_gains: contrast_gains.unwrap_or(defaults.contrast_gains),
            brightness_offsets: brightness_offsets.unwrap_or(defaults.brightness_offsets),
            skew_magnitudes: skew_magnitudes.unwrap_or(defaults.skew_magnitudes),
            corners,
            inversion_luminance_cutoff,
            fill_value,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(to_py_err)
    }

    fn __repr__(&self) -> String {
        format!(
            "CascadeConfig(confidence_threshold={}, margin={}, gains={}, offsets={}, skews={}, corners={})",
            self.inner.confidence_threshold,
            self.inner.margin,
            self.inner.contrast_gains.len(),
            self.inner.brightness_offsets.len(),
            self.inner.skew_magnitudes.len(),
            self.inner.corners.len()
        )
    }
}

/// Result of an orientation search.
#[pyclass]
#[derive(Clone)]
pub struct OrientationMatch {
    inner: RustOrientationMatch,
}

#[pymethods]
impl OrientationMatch {
    #[getter]
    fn label(&self) -> u16 {
        self.inner.label.get()
    }

    #[getter]
    fn angle_deg(&self) -> u16 {
        self.inner.angle.degrees()
    }

    #[getter]
    fn confidence(&self) -> f32 {
        self.inner.confidence
    }

    /// Located die as (x, y, width, height), or None.
    #[getter]
    fn region(&self) -> Option<(usize, usize, usize, usize)> {
        region_tuple(self.inner.region)
    }

    /// One of 'early_exit', 'refined', 'out_of_budget'.
    #[getter]
    fn termination(&self) -> &'static str {
        self.inner.termination.as_str()
    }

    #[getter]
    fn evaluations(&self) -> usize {
        self.inner.stats.evaluations
    }

    #[getter]
    fn unscored(&self) -> usize {
        self.inner.stats.unscored
    }

    /// Apply the acceptance threshold to this result.
    #[pyo3(signature = (acceptance_threshold = 0.7))]
    fn decide(&self, acceptance_threshold: f32) -> PyResult<Decision> {
        decide(&self.inner.result(), acceptance_threshold)
    }

    fn __repr__(&self) -> String {
        format!(
            "OrientationMatch(label={}, angle_deg={}, confidence={:.4}, termination='{}')",
            self.inner.label.get(),
            self.inner.angle.degrees(),
            self.inner.confidence,
            self.inner.termination.as_str()
        )
    }
}

/// Result of a cascade search.
#[pyclass]
pub struct CascadeMatch {
    inner: RustCascadeOutcome,
}

#[pymethods]
impl CascadeMatch {
    #[getter]
    fn label(&self) -> u16 {
        self.inner.label.get()
    }

    #[getter]
    fn confidence(&self) -> f32 {
        self.inner.confidence
    }

    #[getter]
    fn region(&self) -> Option<(usize, usize, usize, usize)> {
        region_tuple(self.inner.region)
    }

    /// Winning transform, e.g. 'identity' or 'skew(tl,10px)'.
    #[getter]
    fn candidate(&self) -> String {
        self.inner.candidate.to_string()
    }

    /// The transformed image that produced the winning score.
    #[getter]
    fn view<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        image_to_array(py, self.inner.view.clone())
    }

    /// One of 'accepted', 'exhausted', 'out_of_budget'.
    #[getter]
    fn termination(&self) -> &'static str {
        self.inner.termination.as_str()
    }

    #[getter]
    fn evaluations(&self) -> usize {
        self.inner.stats.evaluations
    }

    #[getter]
    fn unscored(&self) -> usize {
        self.inner.stats.unscored
    }

    #[pyo3(signature = (acceptance_threshold = 0.7))]
    fn decide(&self, acceptance_threshold: f32) -> PyResult<Decision> {
        decide(&self.inner.result(), acceptance_threshold)
    }

    fn __repr__(&self) -> String {
        format!(
            "CascadeMatch(label={}, confidence={:.4}, candidate='{}', termination='{}')",
            self.inner.label.get(),
            self.inner.confidence,
            self.inner.candidate,
            self.inner.termination.as_str()
        )
    }
}

/// Upright templates per die side, pre-rotated over the angle grid.
#[pyclass]
pub struct TemplateBank {
    inner: RustTemplateBank,
    config: RustOrientationConfig,
}

#[pymethods]
impl TemplateBank {
    /// Build a bank from upright templates.
    ///
    /// Args:
    ///     templates: dict mapping side id (>= 1) to a 2D uint8 array
    ///     config: OrientationConfig; its angle step and fill value shape the bank
    #[new]
    #[pyo3(signature = (templates, config = None))]
    fn new(
        templates: BTreeMap<u16, PyReadonlyArray2<'_, u8>>,
        config: Option<OrientationConfig>,
    ) -> PyResult<Self> {
        let config = config.map(|c| c.inner).unwrap_or_default();
        config.validate().map_err(to_py_err)?;
        let grid = AngleGrid::new(config.angle_step_deg).map_err(to_py_err)?;
        let mut inner = RustTemplateBank::new(grid, config.fill_value);
        for (id, pixels) in &templates {
            let label =
                Label::new(*id).ok_or_else(|| PyValueError::new_err("side ids start at 1"))?;
            let shape = pixels.shape();
            let template = Template::new(pixels.as_slice()?.to_vec(), shape[1], shape[0])
                .map_err(to_py_err)?;
            inner.insert_template(label, &template).map_err(to_py_err)?;
        }
        Ok(Self { inner, config })
    }

    /// Side ids held by the bank, ascending.
    fn labels(&self) -> Vec<u16> {
        self.inner.labels().into_iter().map(Label::get).collect()
    }

    /// Run the coarse-to-fine orientation search against a gray probe.
    ///
    /// Args:
    ///     image: 2D uint8 array at least as large as the templates
    ///     parallel: Score each pass on the rayon pool (default: False)
    #[pyo3(signature = (image, parallel = false))]
    fn search(&self, image: PyReadonlyArrayDyn<'_, u8>, parallel: bool) -> PyResult<OrientationMatch> {
        let view = image_view(&image)?;
        if view.channels() != 1 {
            return Err(PyValueError::new_err("orientation search needs a 2D gray image"));
        }
        let search = CoarseFineSearch::new(self.config.clone()).map_err(to_py_err)?;
        let scorer = ZnccOrientationScorer::new(&self.inner, view)
            .map_err(to_py_err)?
            .with_min_var_i(self.config.min_var_i);
        let inner = if parallel {
            search.run_par(&scorer)
        } else {
            search.run(&scorer)
        }
        .map_err(to_py_err)?;
        Ok(OrientationMatch { inner })
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "TemplateBank(labels={:?}, angle_step_deg={})",
            self.labels(),
            self.config.angle_step_deg
        )
    }
}

/// Run the coarse-to-fine orientation search; same as `bank.search(...)`.
#[pyfunction]
#[pyo3(signature = (bank, image, parallel = false))]
fn orientation_search(
    bank: PyRef<'_, TemplateBank>,
    image: PyReadonlyArrayDyn<'_, u8>,
    parallel: bool,
) -> PyResult<OrientationMatch> {
    bank.search(image, parallel)
}

/// Run the transform cascade over an image.
///
/// The scorer is either a TemplateBank (correlation against its upright
/// templates) or a callable taking a uint8 array and returning
/// `(label, confidence)` or a class-probability sequence. Exceptions raised
/// by the callable mark that transform as unscored.
///
/// Args:
///     image: 2D gray or 3D (height, width, channels) uint8 array
///     scorer: TemplateBank or callable
///     config: CascadeConfig (default: CascadeConfig())
///     parallel: Score batches on the rayon pool; TemplateBank scorers only
///
/// Returns:
///     CascadeMatch for the best transform
#[pyfunction]
#[pyo3(signature = (image, scorer, config = None, parallel = false))]
fn cascade_search(
    py: Python<'_>,
    image: PyReadonlyArrayDyn<'_, u8>,
    scorer: &Bound<'_, PyAny>,
    config: Option<CascadeConfig>,
    parallel: bool,
) -> PyResult<CascadeMatch> {
    let view = image_view(&image)?;
    let search =
        CascadeSearch::new(config.map(|c| c.inner).unwrap_or_default()).map_err(to_py_err)?;

    if let Ok(bank) = scorer.extract::<PyRef<'_, TemplateBank>>() {
        let classifier = TemplateClassifier::new(&bank.inner);
        let inner = if parallel {
            search.run_par(view, &classifier)
        } else {
            search.run(view, &classifier)
        }
        .map_err(to_py_err)?;
        return Ok(CascadeMatch { inner });
    }

    if !scorer.is_callable() {
        return Err(PyValueError::new_err(
            "scorer must be a TemplateBank or a callable",
        ));
    }
    if parallel {
        return Err(PyValueError::new_err(
            "parallel cascade needs a TemplateBank scorer",
        ));
    }
    let call = |candidate: ImageView<'_, u8>| -> Result<ScoreResult, Unscored> {
        let array = image_to_array(py, candidate.to_owned_image())
            .map_err(|e| Unscored::ScorerFailure(e.to_string()))?;
        let out = scorer
            .call1((array,))
            .map_err(|e| Unscored::ScorerFailure(e.to_string()))?;
        read_score(&out)
    };
    let inner = search.run(view, &call).map_err(to_py_err)?;
    Ok(CascadeMatch { inner })
}

/// Python module for dicematch die-face recognition.
#[pymodule]
fn _dicematch(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<OrientationConfig>()?;
    m.add_class::<CascadeConfig>()?;
    m.add_class::<TemplateBank>()?;
    m.add_class::<OrientationMatch>()?;
    m.add_class::<CascadeMatch>()?;
    m.add_class::<Decision>()?;
    m.add_function(wrap_pyfunction!(orientation_search, m)?)?;
    m.add_function(wrap_pyfunction!(cascade_search, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
