//! Convolution, transposed convolution, pooling and activation layers.
//!
//! All layers work on `(batch, channels, height, width)` arrays, with the
//! same shape arithmetic and weight layout as the usual deep-learning
//! frameworks:
//! - Conv2d weight: `(out, in, k, k)`; out = (H + 2p - k) / s + 1
//! - ConvTranspose2d weight: `(in, out, k, k)`; out = (H - 1) * s - 2p + k
//! - MaxPool2d (no padding): out = (H - k) / s + 1

use super::ModelError;
use ndarray::{Array1, Array4};
use rand::distributions::Uniform;
use rand::Rng;

fn check_channels(layer: &'static str, expected: usize, x: &Array4<f64>) -> Result<(), ModelError> {
    let found = x.dim().1;
    if found != expected {
        return Err(ModelError::ChannelMismatch {
            layer,
            expected,
            found,
        });
    }
    Ok(())
}

/// 2-D convolution with square kernel, symmetric zero padding.
#[derive(Debug, Clone)]
pub struct Conv2d {
    pub weight: Array4<f64>,
    pub bias: Array1<f64>,
    pub stride: usize,
    pub padding: usize,
}

impl Conv2d {
    pub fn new<R: Rng>(
        rng: &mut R,
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: usize,
    ) -> Self {
        let fan_in = in_channels * kernel * kernel;
        let bound = 1.0 / (fan_in.max(1) as f64).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let weight = Array4::from_shape_fn((out_channels, in_channels, kernel, kernel), |_| {
            rng.sample(&dist)
        });
        let bias = Array1::from_shape_fn(out_channels, |_| rng.sample(&dist));
        Self {
            weight,
            bias,
            stride: stride.max(1),
            padding,
        }
    }

    pub fn in_channels(&self) -> usize {
        self.weight.dim().1
    }

    pub fn out_channels(&self) -> usize {
        self.weight.dim().0
    }

    fn kernel(&self) -> usize {
        self.weight.dim().2
    }

    fn output_len(&self, input: usize) -> Option<usize> {
        let padded = input + 2 * self.padding;
        let k = self.kernel();
        (padded >= k).then(|| (padded - k) / self.stride + 1)
    }

    pub fn forward(&self, x: &Array4<f64>) -> Result<Array4<f64>, ModelError> {
        check_channels("conv2d", self.in_channels(), x)?;
        let (batch, in_ch, h, w) = x.dim();
        let (oh, ow) = match (self.output_len(h), self.output_len(w)) {
            (Some(oh), Some(ow)) if oh > 0 && ow > 0 => (oh, ow),
            _ => return Err(ModelError::SpatialCollapse { layer: "conv2d", height: h, width: w }),
        };

        let k = self.kernel();
        let p = self.padding as isize;
        let mut out = Array4::<f64>::zeros((batch, self.out_channels(), oh, ow));

        for b in 0..batch {
            for o in 0..self.out_channels() {
                for i in 0..oh {
                    for j in 0..ow {
                        let mut acc = self.bias[o];
                        for c in 0..in_ch {
                            for ki in 0..k {
                                let yi = (i * self.stride + ki) as isize - p;
                                if yi < 0 || yi >= h as isize {
                                    continue;
                                }
                                for kj in 0..k {
                                    let xj = (j * self.stride + kj) as isize - p;
                                    if xj < 0 || xj >= w as isize {
                                        continue;
                                    }
                                    acc += self.weight[[o, c, ki, kj]]
                                        * x[[b, c, yi as usize, xj as usize]];
                                }
                            }
                        }
                        out[[b, o, i, j]] = acc;
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Transposed 2-D convolution (the gradient of Conv2d w.r.t. its input).
#[derive(Debug, Clone)]
pub struct ConvTranspose2d {
    pub weight: Array4<f64>,
    pub bias: Array1<f64>,
    pub stride: usize,
    pub padding: usize,
}

impl ConvTranspose2d {
    pub fn new<R: Rng>(
        rng: &mut R,
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: usize,
    ) -> Self {
        let fan_in = out_channels * kernel * kernel;
        let bound = 1.0 / (fan_in.max(1) as f64).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let weight = Array4::from_shape_fn((in_channels, out_channels, kernel, kernel), |_| {
            rng.sample(&dist)
        });
        let bias = Array1::from_shape_fn(out_channels, |_| rng.sample(&dist));
        Self {
            weight,
            bias,
            stride: stride.max(1),
            padding,
        }
    }

    pub fn in_channels(&self) -> usize {
        self.weight.dim().0
    }

    pub fn out_channels(&self) -> usize {
        self.weight.dim().1
    }

    fn kernel(&self) -> usize {
        self.weight.dim().2
    }

    fn output_len(&self, input: usize) -> Option<usize> {
        if input == 0 {
            return None;
        }
        let full = (input - 1) * self.stride + self.kernel();
        full.checked_sub(2 * self.padding).filter(|n| *n > 0)
    }

    pub fn forward(&self, x: &Array4<f64>) -> Result<Array4<f64>, ModelError> {
        check_channels("conv_transpose2d", self.in_channels(), x)?;
        let (batch, in_ch, h, w) = x.dim();
        let (oh, ow) = match (self.output_len(h), self.output_len(w)) {
            (Some(oh), Some(ow)) => (oh, ow),
            _ => {
                return Err(ModelError::SpatialCollapse {
                    layer: "conv_transpose2d",
                    height: h,
                    width: w,
                })
            }
        };

        let k = self.kernel();
        let p = self.padding as isize;
        let out_ch = self.out_channels();
        let mut out = Array4::<f64>::zeros((batch, out_ch, oh, ow));

        for b in 0..batch {
            for o in 0..out_ch {
                out.slice_mut(ndarray::s![b, o, .., ..]).fill(self.bias[o]);
            }
            for c in 0..in_ch {
                for i in 0..h {
                    for j in 0..w {
                        let v = x[[b, c, i, j]];
                        for ki in 0..k {
                            let yi = (i * self.stride + ki) as isize - p;
                            if yi < 0 || yi >= oh as isize {
                                continue;
                            }
                            for kj in 0..k {
                                let xj = (j * self.stride + kj) as isize - p;
                                if xj < 0 || xj >= ow as isize {
                                    continue;
                                }
                                for o in 0..out_ch {
                                    out[[b, o, yi as usize, xj as usize]] +=
                                        v * self.weight[[c, o, ki, kj]];
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Max pooling over square windows, no padding. NaN propagates.
#[derive(Debug, Clone, Copy)]
pub struct MaxPool2d {
    pub kernel: usize,
    pub stride: usize,
}

impl MaxPool2d {
    pub fn new(kernel: usize, stride: usize) -> Self {
        Self {
            kernel: kernel.max(1),
            stride: stride.max(1),
        }
    }

    fn output_len(&self, input: usize) -> Option<usize> {
        (input >= self.kernel).then(|| (input - self.kernel) / self.stride + 1)
    }

    pub fn forward(&self, x: &Array4<f64>) -> Result<Array4<f64>, ModelError> {
        let (batch, channels, h, w) = x.dim();
        let (oh, ow) = match (self.output_len(h), self.output_len(w)) {
            (Some(oh), Some(ow)) => (oh, ow),
            _ => return Err(ModelError::SpatialCollapse { layer: "max_pool2d", height: h, width: w }),
        };

        let mut out = Array4::<f64>::zeros((batch, channels, oh, ow));
        for b in 0..batch {
            for c in 0..channels {
                for i in 0..oh {
                    for j in 0..ow {
                        let mut best = f64::NEG_INFINITY;
                        for ki in 0..self.kernel {
                            for kj in 0..self.kernel {
                                let v = x[[b, c, i * self.stride + ki, j * self.stride + kj]];
                                // NaN wins, once seen it stays.
                                if v.is_nan() || v > best {
                                    best = v;
                                }
                            }
                        }
                        out[[b, c, i, j]] = best;
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Elementwise activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// max(0, x), NaN stays NaN
    ReLU,
    /// Bounded to [-1, 1].
    Tanh,
}

impl Activation {
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::ReLU if x.is_nan() => x,
            Activation::ReLU => x.max(0.0),
            Activation::Tanh => x.tanh(),
        }
    }

    pub fn forward(&self, x: &Array4<f64>) -> Array4<f64> {
        x.mapv(|v| self.apply(v))
    }
}

/// One stage of a sequential network.
#[derive(Debug, Clone)]
pub enum Layer {
    Conv(Conv2d),
    ConvTranspose(ConvTranspose2d),
    MaxPool(MaxPool2d),
    Activation(Activation),
}

impl Layer {
    pub fn forward(&self, x: &Array4<f64>) -> Result<Array4<f64>, ModelError> {
        match self {
            Layer::Conv(l) => l.forward(x),
            Layer::ConvTranspose(l) => l.forward(x),
            Layer::MaxPool(l) => l.forward(x),
            Layer::Activation(a) => Ok(a.forward(x)),
        }
    }

    /// Trainable weights plus biases.
    pub fn parameter_count(&self) -> usize {
        match self {
            Layer::Conv(l) => l.weight.len() + l.bias.len(),
            Layer::ConvTranspose(l) => l.weight.len() + l.bias.len(),
            Layer::MaxPool(_) | Layer::Activation(_) => 0,
        }
    }
}

/// Layers applied in order.
#[derive(Debug, Clone, Default)]
pub struct Sequential {
    pub layers: Vec<Layer>,
}

impl Sequential {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    pub fn forward(&self, x: &Array4<f64>) -> Result<Array4<f64>, ModelError> {
        let mut out = x.clone();
        for layer in &self.layers {
            out = layer.forward(&out)?;
        }
        Ok(out)
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Layer::parameter_count).sum()
    }
}
