pub mod client;
pub mod gemini;
pub mod medic;

pub use client::{Diagnosis, DiagnosisClient, DiagnosisError, parse_diagnosis, strip_code_fences};
pub use gemini::GeminiClient;
pub use medic::{ErrorMedic, VettedDiagnosis};
