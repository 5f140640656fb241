//! The SM CNN network and its parameters.
//!
//! - [`ModelConfig`] holds the structural hyperparameters.
//! - [`ModelParameters`] holds the shape-checked learned tensors; [`ModelLoader`] reads and
//!   writes them.
//! - [`SmCnn`] runs the forward pass with swappable [`Activation`] and [`Regularizer`]
//!   strategies.

/// Bounded nonlinearities.
pub mod activation;
/// Convolution + max-pool tower.
pub mod branch;
/// Structural hyperparameters.
pub mod config;
mod error;
/// Input tensor wrappers.
pub mod input;
/// Model directory I/O.
pub mod loader;
/// The forward pass.
pub mod network;
/// Learned tensors.
pub mod params;
/// Dropout and execution mode.
pub mod regularizer;

#[cfg(test)]
mod tests;

pub use activation::{Activation, Softsign, Tanh};
pub use branch::{BranchTrace, ConvolutionBranch};
pub use config::{ActivationKind, ModelConfig};
pub use error::{ModelError, ModelResult};
pub use input::{AuxFeatures, TokenMatrix};
pub use loader::ModelLoader;
pub use network::{ScoreTrace, SmCnn};
pub use params::{LayerWeights, ModelParameters};
pub use regularizer::{Dropout, ExecutionMode, NoRegularization, Regularizer};
