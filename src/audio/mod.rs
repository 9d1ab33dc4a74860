pub mod channel;
pub mod mel_spectrogram;
pub mod wav;

pub use channel::ChannelExtractor;
pub use mel_spectrogram::{FilterNorm, LogScale, MelScale, MelSpecParams, MelSpectrogram};
pub use wav::{load_wav, AudioClip};

/// Start offsets of every full `frame_len` window that fits in `total` samples
/// when advancing by `stride`
pub fn window_offsets(total: usize, frame_len: usize, stride: usize) -> impl Iterator<Item = usize> {
    let count = if frame_len == 0 || stride == 0 || total < frame_len {
        0
    } else {
        (total - frame_len) / stride + 1
    };
    (0..count).map(move |i| i * stride)
}
