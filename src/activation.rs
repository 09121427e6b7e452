use candle_core::{Result, Tensor};
use candle_nn::Module;
use serde::Deserialize;

/// Activations named either by their torch class (dense layer configs) or by
/// the HF `hidden_act` string (transformer configs).
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    #[serde(alias = "tanh")]
    #[serde(alias = "torch.nn.modules.activation.Tanh")]
    Tanh,

    #[serde(alias = "identity")]
    #[serde(alias = "torch.nn.modules.linear.Identity")]
    Identity,

    #[serde(alias = "gelu")]
    #[serde(alias = "torch.nn.modules.activation.GELU")]
    Gelu,

    #[serde(alias = "gelu_new")]
    #[serde(alias = "gelu_pytorch_tanh")]
    GeluApproximate,

    #[serde(alias = "relu")]
    #[serde(alias = "torch.nn.modules.activation.ReLU")]
    Relu,
}

impl Module for Activation {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        match self {
            Activation::Tanh => xs.tanh(),
            Activation::Identity => Ok(xs.clone()),
            Activation::Gelu => xs.gelu_erf(),
            Activation::GeluApproximate => xs.gelu(),
            Activation::Relu => xs.relu(),
        }
    }
}
