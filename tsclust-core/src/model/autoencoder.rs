//! Fixed convolutional autoencoder over windowed image datasets.
//!
//! Channels are companies (14 of them), height is the window index and width
//! is the position inside a window. Every convolution uses a 1x1 kernel, so
//! the network mixes companies at each cell; the 2x2 stride-1 pools are the
//! only spatial operators.
//!
//! | stage   | layer                              | shape for (B, 14, H, W) |
//! |---------|------------------------------------|-------------------------|
//! | encoder | Conv2d(14, 7, k=1, s=1, p=1), ReLU | (B, 7, H+2, W+2)        |
//! |         | MaxPool2d(k=2, s=1)                | (B, 7, H+1, W+1)        |
//! |         | Conv2d(7, 2, k=1, s=1, p=1), ReLU  | (B, 2, H+3, W+3)        |
//! |         | MaxPool2d(k=2, s=1)                | (B, 2, H+2, W+2)        |
//! | decoder | ConvTranspose2d(2, 7, k=1), ReLU   | (B, 7, H+2, W+2)        |
//! |         | ConvTranspose2d(7, 14, k=1, p=1)   | (B, 14, H, W)           |
//! |         | Tanh                               | (B, 14, H, W)           |
//!
//! There is no training loop here; weights come from a seeded initializer and
//! can be replaced through the public layer fields.

use super::layers::{Activation, Conv2d, ConvTranspose2d, Layer, MaxPool2d, Sequential};
use super::ModelError;
use ndarray::Array4;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Input channels (companies) the architecture expects.
pub const INPUT_CHANNELS: usize = 14;
/// Channels of the latent representation.
pub const LATENT_CHANNELS: usize = 2;
const HIDDEN_CHANNELS: usize = 7;

#[derive(Debug, Clone)]
pub struct ConvAutoencoder {
    pub encoder: Sequential,
    pub decoder: Sequential,
}

impl ConvAutoencoder {
    /// Build with weights drawn from `StdRng::seed_from_u64(seed)`.
    pub fn new(seed: u64) -> Self {
        Self::with_rng(&mut StdRng::seed_from_u64(seed))
    }

    pub fn with_rng<R: Rng>(rng: &mut R) -> Self {
        let encoder = Sequential::new(vec![
            Layer::Conv(Conv2d::new(rng, INPUT_CHANNELS, HIDDEN_CHANNELS, 1, 1, 1)),
            Layer::Activation(Activation::ReLU),
            Layer::MaxPool(MaxPool2d::new(2, 1)),
            Layer::Conv(Conv2d::new(rng, HIDDEN_CHANNELS, LATENT_CHANNELS, 1, 1, 1)),
            Layer::Activation(Activation::ReLU),
            Layer::MaxPool(MaxPool2d::new(2, 1)),
        ]);
        let decoder = Sequential::new(vec![
            Layer::ConvTranspose(ConvTranspose2d::new(rng, LATENT_CHANNELS, HIDDEN_CHANNELS, 1, 1, 0)),
            Layer::Activation(Activation::ReLU),
            Layer::ConvTranspose(ConvTranspose2d::new(rng, HIDDEN_CHANNELS, INPUT_CHANNELS, 1, 1, 1)),
            Layer::Activation(Activation::Tanh),
        ]);
        Self { encoder, decoder }
    }

    /// Encoder only: `(B, 14, H, W)` to `(B, 2, H+2, W+2)`.
    pub fn encode(&self, x: &Array4<f64>) -> Result<Array4<f64>, ModelError> {
        check_input(x)?;
        self.encoder.forward(x)
    }

    /// Encode then decode: `(B, 14, H, W)` to `(B, 14, H, W)` in [-1, 1].
    pub fn forward(&self, x: &Array4<f64>) -> Result<Array4<f64>, ModelError> {
        let latent = self.encode(x)?;
        self.decoder.forward(&latent)
    }

    /// Mean squared error between `x` and its reconstruction.
    pub fn reconstruction_error(&self, x: &Array4<f64>) -> Result<f64, ModelError> {
        let out = self.forward(x)?;
        let diff = &out - x;
        Ok(diff.mapv(|d| d * d).mean().unwrap_or(0.0))
    }

    pub fn parameter_count(&self) -> usize {
        self.encoder.parameter_count() + self.decoder.parameter_count()
    }
}

fn check_input(x: &Array4<f64>) -> Result<(), ModelError> {
    let (batch, channels, height, width) = x.dim();
    if channels != INPUT_CHANNELS {
        return Err(ModelError::ChannelMismatch {
            layer: "input",
            expected: INPUT_CHANNELS,
            found: channels,
        });
    }
    if batch == 0 || height == 0 || width == 0 {
        return Err(ModelError::EmptyInput {
            shape: [batch, channels, height, width],
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(batch: usize, h: usize, w: usize) -> Array4<f64> {
        Array4::from_shape_fn((batch, INPUT_CHANNELS, h, w), |(b, c, i, j)| {
            ((b + c + i + j) % 7) as f64 / 7.0
        })
    }

    #[test]
    fn forward_reproduces_input_shape() {
        let model = ConvAutoencoder::new(42);
        let x = input(2, 15, 7);
        let out = model.forward(&x).unwrap();
        assert_eq!(out.dim(), x.dim());
        assert!(out.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn latent_shape() {
        let model = ConvAutoencoder::new(42);
        let latent = model.encode(&input(1, 15, 7)).unwrap();
        assert_eq!(latent.dim(), (1, LATENT_CHANNELS, 17, 9));
        // ReLU then max-pool keeps the latent non-negative.
        assert!(latent.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn single_cell_input_works() {
        let model = ConvAutoencoder::new(1);
        let out = model.forward(&input(1, 1, 1)).unwrap();
        assert_eq!(out.dim(), (1, INPUT_CHANNELS, 1, 1));
    }

    #[test]
    fn wrong_channel_count_is_rejected() {
        let model = ConvAutoencoder::new(42);
        let x = Array4::<f64>::zeros((1, 3, 5, 7));
        assert!(matches!(
            model.forward(&x),
            Err(ModelError::ChannelMismatch { expected: 14, found: 3, .. })
        ));
    }

    #[test]
    fn empty_input_is_rejected() {
        let model = ConvAutoencoder::new(42);
        let x = Array4::<f64>::zeros((1, INPUT_CHANNELS, 0, 7));
        assert!(matches!(model.encode(&x), Err(ModelError::EmptyInput { .. })));
    }

    #[test]
    fn same_seed_same_output() {
        let x = input(1, 4, 7);
        let a = ConvAutoencoder::new(9).forward(&x).unwrap();
        let b = ConvAutoencoder::new(9).forward(&x).unwrap();
        let c = ConvAutoencoder::new(10).forward(&x).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn missing_values_reach_the_output() {
        let model = ConvAutoencoder::new(42);
        let mut x = input(1, 5, 7);
        x[[0, 3, 2, 2]] = f64::NAN;

        let latent = model.encode(&x).unwrap();
        assert!(latent.iter().any(|v| v.is_nan()));

        let out = model.forward(&x).unwrap();
        assert!(out[[0, 0, 2, 2]].is_nan());
        assert!(!out[[0, 0, 0, 0]].is_nan());
    }

    #[test]
    fn parameter_count_matches_architecture() {
        // conv 14*7+7, conv 7*2+2, deconv 2*7+7, deconv 7*14+14
        let model = ConvAutoencoder::new(0);
        assert_eq!(model.parameter_count(), 105 + 16 + 21 + 112);
    }

    #[test]
    fn reconstruction_error_is_finite() {
        let model = ConvAutoencoder::new(3);
        let err = model.reconstruction_error(&input(1, 3, 7)).unwrap();
        assert!(err.is_finite());
        assert!(err >= 0.0);
    }
}
