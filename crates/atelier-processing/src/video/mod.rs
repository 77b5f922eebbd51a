pub mod ffmpeg;

pub use ffmpeg::FfmpegService;
