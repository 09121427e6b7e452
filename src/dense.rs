use candle_core::Tensor;
use candle_nn::{linear_b, Linear, Module, VarBuilder};
use serde::Deserialize;

use crate::{activation::Activation, error::DenseError};

pub struct Dense {
    linear: Linear,
    activation: Activation,
}

impl Dense {
    /// Create a `Dense` layer from a `DenseConfig`; weights live under `linear`.
    pub fn from_config(vb: VarBuilder, config: DenseConfig) -> Result<Dense, DenseError> {
        Ok(Self {
            linear: linear_b(
                config.in_features,
                config.out_features,
                config.bias,
                vb.pp("linear"),
            )?,
            activation: config.activation_function,
        })
    }

    pub fn forward(&self, xs: &Tensor) -> Result<Tensor, DenseError> {
        Ok(xs.apply(&self.linear)?.apply(&self.activation)?)
    }
}

#[derive(Debug, Deserialize)]
pub struct DenseConfig {
    pub in_features: usize,
    pub out_features: usize,
    pub bias: bool,
    pub activation_function: Activation,
}
