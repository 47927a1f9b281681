//! Convolutional autoencoder for windowed image datasets.

pub mod autoencoder;
pub mod layers;

pub use autoencoder::{ConvAutoencoder, INPUT_CHANNELS, LATENT_CHANNELS};
pub use layers::{Activation, Conv2d, ConvTranspose2d, Layer, MaxPool2d, Sequential};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{layer}: expected {expected} input channels, found {found}")]
    ChannelMismatch {
        layer: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{layer}: a {height}x{width} input leaves no output cells")]
    SpatialCollapse {
        layer: &'static str,
        height: usize,
        width: usize,
    },

    #[error("empty input of shape {shape:?}")]
    EmptyInput { shape: [usize; 4] },
}
