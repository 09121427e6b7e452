use anyhow::Result;
use sentence_similarity::{
    compare_to_reference, samples, SentenceTransformerBuilder, Which,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    #[cfg(feature = "cuda")]
    let device = candle_core::Device::new_cuda(0)?;
    #[cfg(not(feature = "cuda"))]
    let device = candle_core::Device::Cpu;

    let inputs = samples::INTERNET;

    // the model is dropped at the end of this block, before anything is printed
    let report = {
        let model = SentenceTransformerBuilder::with_sentence_transformer(&Which::AllMiniLML6v2)
            .with_progress()
            .with_device(&device)
            .build()?;

        compare_to_reference(&model, inputs)?
    };

    print!("{report}");

    Ok(())
}
