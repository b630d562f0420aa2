pub mod aliases;
pub mod normalize;
pub mod synthesize;

pub use normalize::Normalizer;
pub use synthesize::Synthesizer;
