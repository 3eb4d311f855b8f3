//! Structure layers: chained gradient-magnitude fields, each reduced to a
//! single global value through an averaging pyramid.

use tracing::{info, warn};

use crate::error::{Capacity, CoreError};
use crate::field::{Addressing, DoubleBuffer, Field};
use crate::types::{LayerParams, MAX_LAYERS};
use crate::view::FieldView;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub usize);

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `gain * |grad|` of `source` with central differences, clamped to `[0, 1]`.
///
/// Neighbors are always read clamp-to-edge, whatever the source field's own
/// addressing, so the domain border never produces gradients from wrapped
/// cells. `source` and `out` both hold `side * side` cells.
pub(crate) fn gradient_magnitude(source: &[f32], side: usize, gain: f32, out: &mut [f32]) {
    let clamp = Addressing::ClampToEdge;
    for row in 0..side {
        let up = clamp.step(row, -1, side) * side;
        let down = clamp.step(row, 1, side) * side;
        let here = row * side;
        for col in 0..side {
            let west = source[here + clamp.step(col, -1, side)];
            let east = source[here + clamp.step(col, 1, side)];
            let south = source[up + col];
            let north = source[down + col];

            let dx = (east - west) * 0.5;
            let dy = (north - south) * 0.5;
            out[here + col] = ((dx * dx + dy * dy).sqrt() * gain).clamp(0.0, 1.0);
        }
    }
}

/// Average 2x2 blocks of a `side * side` grid into `dst`.
fn downsample(src: &[f32], side: usize, dst: &mut [f32]) {
    let half = side / 2;
    for row in 0..half {
        for col in 0..half {
            let i = 2 * row * side + 2 * col;
            dst[row * half + col] = (src[i] + src[i + 1] + src[i + side] + src[i + side + 1]) * 0.25;
        }
    }
}

/// Successive power-of-two reductions of a square field, ending at one cell.
/// Levels are allocated once and reused on every rebuild.
#[derive(Clone, Debug)]
pub struct Pyramid {
    side: usize,
    levels: Vec<Vec<f32>>,
    apex: f32,
}

impl Pyramid {
    pub fn new(side: usize) -> Result<Self, CoreError> {
        if !side.is_power_of_two() {
            return Err(CoreError::InvalidConfig("pyramid side must be a power of two"));
        }
        let mut levels = Vec::new();
        let mut s = side / 2;
        while s >= 1 {
            levels.push(vec![0.0; s * s]);
            s /= 2;
        }
        Ok(Self {
            side,
            levels,
            apex: 0.0,
        })
    }

    /// Reduce `finest`, which must hold exactly `side * side` values.
    pub fn rebuild(&mut self, finest: &[f32]) -> Result<(), CoreError> {
        let expected = self.side * self.side;
        if finest.len() != expected {
            return Err(CoreError::DataLength {
                expected,
                actual: finest.len(),
            });
        }
        self.fold(finest);
        Ok(())
    }

    /// `rebuild` for callers that own a buffer of the right size.
    fn fold(&mut self, finest: &[f32]) {
        let mut side = self.side;
        for k in 0..self.levels.len() {
            let (done, todo) = self.levels.split_at_mut(k);
            let src = done.last().map(Vec::as_slice).unwrap_or(finest);
            downsample(src, side, &mut todo[0]);
            side /= 2;
        }
        self.apex = match self.levels.last() {
            Some(top) => top[0],
            None => finest[0],
        };
    }

    /// Number of levels below the finest one (`log2(side)`).
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Level `k` of the pyramid; level 1 is the first halving.
    pub fn level(&self, k: usize) -> Option<&[f32]> {
        k.checked_sub(1)
            .and_then(|i| self.levels.get(i))
            .map(Vec::as_slice)
    }

    /// The single cell at the top: the mean of the last rebuilt field.
    pub fn apex(&self) -> f32 {
        self.apex
    }
}

/// Spatial mean of a field channel. Power-of-two sides go through the
/// averaging pyramid; any other side is summed directly.
pub fn reduce(view: FieldView<'_>) -> f32 {
    let values = view.values();
    match Pyramid::new(view.side()) {
        Ok(mut pyramid) => {
            pyramid.fold(values);
            pyramid.apex()
        }
        Err(_) if values.is_empty() => 0.0,
        Err(_) => {
            let sum: f64 = values.iter().map(|&v| f64::from(v)).sum();
            (sum / values.len() as f64) as f32
        }
    }
}

#[derive(Clone, Debug)]
pub struct StructureLayer {
    id: LayerId,
    params: LayerParams,
    buffers: DoubleBuffer,
    pyramid: Pyramid,
    global_value: f32,
}

impl StructureLayer {
    fn new(id: LayerId, params: LayerParams, side: usize) -> Result<Self, CoreError> {
        Ok(Self {
            id,
            params,
            buffers: DoubleBuffer::new(Field::new(side, 1, Addressing::ClampToEdge)),
            pyramid: Pyramid::new(side)?,
            global_value: 0.0,
        })
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn params(&self) -> &LayerParams {
        &self.params
    }

    /// Finest-resolution output.
    pub fn field(&self) -> &Field {
        self.buffers.current()
    }

    /// Last reduced value, in `[0, 1]`. Stale while the pipeline is idle
    /// (cascade mode).
    pub fn global_value(&self) -> f32 {
        self.global_value
    }

    /// `A (from a gradient)` for the first layer, `B (from A)` and so on.
    pub fn label(&self) -> String {
        match self.id.0 {
            0 => "A (from a gradient)".to_owned(),
            n => format!("{} (from {})", layer_letter(n), layer_letter(n - 1)),
        }
    }

    fn compute(&mut self, source: &[f32]) {
        let gain = self.params.gain;
        let (current, next) = self.buffers.split();
        gradient_magnitude(source, current.side(), gain, next.channel_mut(0));
        self.buffers.swap();
        self.pyramid.fold(self.buffers.current().channel(0));
        self.global_value = self.pyramid.apex().clamp(0.0, 1.0);
    }

    fn clear(&mut self) {
        self.buffers.seed_with(|field| field.fill(0, 0.0));
        self.pyramid.fold(self.buffers.current().channel(0));
        self.global_value = 0.0;
    }
}

fn layer_letter(index: usize) -> char {
    char::from(b'A' + index as u8)
}

/// The chain of structure layers, bounded by [`MAX_LAYERS`].
#[derive(Clone, Debug)]
pub struct StructurePipeline {
    side: usize,
    layers: Vec<StructureLayer>,
}

impl StructurePipeline {
    /// A pipeline with the first layer already in place. `side` must be a
    /// power of two.
    pub fn new(side: usize) -> Result<Self, CoreError> {
        let mut layers = Vec::with_capacity(MAX_LAYERS);
        layers.push(StructureLayer::new(LayerId(0), LayerParams::for_layer(0), side)?);
        Ok(Self { side, layers })
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[StructureLayer] {
        &self.layers
    }

    pub fn get(&self, id: LayerId) -> Option<&StructureLayer> {
        self.layers.get(id.0)
    }

    pub fn last_id(&self) -> LayerId {
        LayerId(self.layers.len().saturating_sub(1))
    }

    pub fn add_layer(&mut self, params: LayerParams) -> Result<LayerId, CoreError> {
        if self.layers.len() >= MAX_LAYERS {
            warn!(max = MAX_LAYERS, "structure layer capacity reached, add rejected");
            return Err(CoreError::CapacityExceeded {
                kind: Capacity::Layers,
                max: MAX_LAYERS,
            });
        }
        let id = LayerId(self.layers.len());
        self.layers.push(StructureLayer::new(id, params, self.side)?);
        info!(layer = id.0, gain = params.gain, "structure layer added");
        Ok(id)
    }

    pub fn params_mut(&mut self, id: LayerId) -> Result<&mut LayerParams, CoreError> {
        self.layers
            .get_mut(id.0)
            .map(|layer| &mut layer.params)
            .ok_or(CoreError::UnknownLayer(id))
    }

    /// Recompute every layer in order: layer 0 from `source`, each later
    /// layer from the freshly computed output of the one before.
    pub fn compute(&mut self, source: &[f32]) {
        for i in 0..self.layers.len() {
            let (below, above) = self.layers.split_at_mut(i);
            let input = match below.last() {
                Some(prev) => prev.field().channel(0),
                None => source,
            };
            above[0].compute(input);
        }
    }

    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            layer.clear();
        }
    }
}
