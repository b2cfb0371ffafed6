mod gemini;

pub use gemini::GeminiVision;
