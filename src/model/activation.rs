//! Bounded element-wise nonlinearities (range `(-1, 1)`).

use candle_core::{Result, Tensor};

/// Element-wise nonlinearity applied after convolution and after the projection layer.
pub trait Activation: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn apply(&self, xs: &Tensor) -> Result<Tensor>;
}

/// Hyperbolic tangent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tanh;

impl Activation for Tanh {
    fn name(&self) -> &'static str {
        "tanh"
    }

    fn apply(&self, xs: &Tensor) -> Result<Tensor> {
        xs.tanh()
    }
}

/// `x / (1 + |x|)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Softsign;

impl Activation for Softsign {
    fn name(&self) -> &'static str {
        "softsign"
    }

    fn apply(&self, xs: &Tensor) -> Result<Tensor> {
        let denom = (xs.abs()? + 1.0)?;
        xs.div(&denom)
    }
}
