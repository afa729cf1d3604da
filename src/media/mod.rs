//! Работа с аудио: буферы, WAV, пост-обработка пауз и сборка результата

pub mod assembler;
pub mod silence;
pub mod wav;
pub mod waveform;

pub use assembler::{concatenate, output_file_name, sanitize_excerpt, write_output};
pub use silence::{detect_silence_regions, rescale, RescaleOutcome, SilenceRegion};
pub use wav::{decode_wav, encode_wav, write_wav};
pub use waveform::Waveform;
