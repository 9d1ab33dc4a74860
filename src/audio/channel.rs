use crate::error::{EdgeError, Result};

/// Extracts a specific channel from interleaved multi-channel audio
#[derive(Debug, Clone)]
pub struct ChannelExtractor {
    target_channel: usize,
    total_channels: usize,
}

impl ChannelExtractor {
    pub fn new(target_channel: usize, total_channels: usize) -> Result<Self> {
        if total_channels == 0 || target_channel >= total_channels {
            return Err(EdgeError::InvalidInput(format!(
                "Target channel {} is out of range for {} channels",
                target_channel, total_channels
            )));
        }

        Ok(Self {
            target_channel,
            total_channels,
        })
    }

    /// Extract the target channel from interleaved 16-bit samples
    pub fn extract_channel(&self, interleaved_samples: &[i16]) -> Vec<i16> {
        if self.total_channels == 1 {
            return interleaved_samples.to_vec();
        }
        interleaved_samples
            .iter()
            .skip(self.target_channel)
            .step_by(self.total_channels)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_extractor_creation() {
        assert!(ChannelExtractor::new(0, 2).is_ok());
        assert!(ChannelExtractor::new(2, 2).is_err());
        assert!(ChannelExtractor::new(0, 0).is_err());
    }

    #[test]
    fn test_channel_extraction() {
        let interleaved = [1i16, 2, 3, 4, 5, 6];
        let left = ChannelExtractor::new(0, 2).unwrap();
        let right = ChannelExtractor::new(1, 2).unwrap();
        assert_eq!(left.extract_channel(&interleaved), vec![1, 3, 5]);
        assert_eq!(right.extract_channel(&interleaved), vec![2, 4, 6]);
    }

    #[test]
    fn test_mono_passthrough() {
        let extractor = ChannelExtractor::new(0, 1).unwrap();
        assert_eq!(extractor.extract_channel(&[7, 8, 9]), vec![7, 8, 9]);
    }
}
