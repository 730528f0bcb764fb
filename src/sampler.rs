use std::sync::Arc;
use tokio::time::{Duration, sleep};

use crate::mixer_client::{MixerApi, TransportError};
use crate::protocol::{AudioInput, MixerState, TitleInput, VideoInput};

struct Accumulator {
    name: String,
    key: String,
    left: f64,
    right: f64,
    seen: u32,
}

/// Queries the mixer and turns its documents into typed inputs.
pub struct StateSampler<M: MixerApi> {
    mixer: Arc<M>,
}

impl<M: MixerApi> StateSampler<M> {
    pub fn new(mixer: Arc<M>) -> Self {
        Self { mixer }
    }

    async fn fetch_state(&self) -> Result<MixerState, TransportError> {
        let xml = self.mixer.query_state().await?;
        MixerState::parse(&xml)
    }

    /// Average the audio meters over `duration_secs * samples_per_second` polls.
    ///
    /// An input must show up in every poll to be reported. Results keep the
    /// order of the first poll.
    pub async fn sample_audio(
        &self,
        duration_secs: u32,
        samples_per_second: u32,
    ) -> Result<Vec<AudioInput>, TransportError> {
        let sample_count = duration_secs.saturating_mul(samples_per_second);
        if sample_count == 0 {
            return Ok(Vec::new());
        }
        let interval = Duration::from_micros(1_000_000 / samples_per_second as u64);

        let mut acc: Vec<Accumulator> = Vec::new();
        for _ in 0..sample_count {
            let state = self.fetch_state().await?;
            for reading in state.audio {
                match acc.iter_mut().find(|a| a.key == reading.key) {
                    Some(a) => {
                        a.left += reading.left;
                        a.right += reading.right;
                        a.seen += 1;
                    }
                    None => acc.push(Accumulator {
                        name: reading.name,
                        key: reading.key,
                        left: reading.left,
                        right: reading.right,
                        seen: 1,
                    }),
                }
            }
            sleep(interval).await;
        }

        Ok(acc
            .into_iter()
            .filter(|a| a.seen == sample_count)
            .map(|a| AudioInput {
                volume: average_volume(a.left, a.right, sample_count),
                name: a.name,
                key: a.key,
            })
            .collect())
    }

    pub async fn fetch_video_inputs(&self) -> Result<Vec<VideoInput>, TransportError> {
        Ok(self.fetch_state().await?.video)
    }

    pub async fn fetch_title_inputs(&self) -> Result<Vec<TitleInput>, TransportError> {
        Ok(self.fetch_state().await?.titles)
    }

    pub async fn fetch_on_air_overlay_numbers(&self) -> Result<Vec<u32>, TransportError> {
        Ok(self.fetch_state().await?.on_air_overlays)
    }
}

/// (Σleft + Σright) / 2 / n, rounded to two decimals.
pub fn average_volume(sum_left: f64, sum_right: f64, sample_count: u32) -> f64 {
    let avg = (sum_left + sum_right) / 2.0 / sample_count as f64;
    round_2dp(avg)
}

/// Half away from zero on the decimal value, so 1.005 becomes 1.01 even
/// though its binary form sits just below the midpoint. The scaled value is
/// first cut to 15 significant digits to drop that representation error.
fn round_2dp(value: f64) -> f64 {
    let scaled = value * 100.0;
    let pre_rounded = format!("{:.14e}", scaled).parse::<f64>().unwrap_or(scaled);
    pre_rounded.round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer_client::fake::FakeMixer;

    fn audio_xml(inputs: &[(&str, &str, f64, f64)]) -> String {
        let mut xml = String::from("<vmix><inputs>");
        for (key, title, l, r) in inputs {
            xml.push_str(&format!(
                r#"<input key="{}" number="1" type="Audio" title="{}" meterF1="{}" meterF2="{}"/>"#,
                key, title, l, r
            ));
        }
        xml.push_str("</inputs><overlays/></vmix>");
        xml
    }

    #[test]
    fn average_is_rounded_to_two_decimals() {
        assert_eq!(average_volume(0.3, 0.1, 2), 0.1);
        assert_eq!(average_volume(1.0, 0.0, 3), 0.17);
        assert_eq!(average_volume(0.0, 0.0, 5), 0.0);
    }

    #[test]
    fn decimal_midpoint_rounds_up() {
        assert_eq!(average_volume(2.01, 0.0, 1), 1.01);
        assert_eq!(average_volume(0.25, 0.0, 10), 0.01);
        assert_eq!(average_volume(0.0449, 0.0449, 1), 0.04);
    }

    #[tokio::test(start_paused = true)]
    async fn averages_across_samples() {
        let fake = FakeMixer::default();
        fake.push_state(&audio_xml(&[("a", "Mic A", 0.2, 0.4), ("b", "Mic B", 0.0, 0.0)]));
        fake.push_state(&audio_xml(&[("a", "Mic A", 0.4, 0.2), ("b", "Mic B", 0.1, 0.1)]));
        let sampler = StateSampler::new(Arc::new(fake));

        let audio = sampler.sample_audio(1, 2).await.unwrap();

        assert_eq!(audio.len(), 2);
        assert_eq!(audio[0].name, "Mic_A");
        assert_eq!(audio[0].volume, 0.3);
        assert_eq!(audio[1].key, "b");
        assert_eq!(audio[1].volume, 0.05);
    }

    #[tokio::test(start_paused = true)]
    async fn sample_order_does_not_change_average() {
        let forward = FakeMixer::default();
        let backward = FakeMixer::default();
        let levels = [(0.9, 0.1), (0.05, 0.3), (0.4, 0.4)];
        for (l, r) in levels {
            forward.push_state(&audio_xml(&[("a", "Mic", l, r)]));
        }
        for (l, r) in levels.iter().rev() {
            backward.push_state(&audio_xml(&[("a", "Mic", *l, *r)]));
        }

        let a = StateSampler::new(Arc::new(forward)).sample_audio(1, 3).await.unwrap();
        let b = StateSampler::new(Arc::new(backward)).sample_audio(1, 3).await.unwrap();
        assert_eq!(a[0].volume, b[0].volume);
    }

    #[tokio::test(start_paused = true)]
    async fn drops_input_missing_from_a_sample() {
        let fake = FakeMixer::default();
        fake.push_state(&audio_xml(&[("a", "Mic A", 0.2, 0.2), ("b", "Mic B", 0.5, 0.5)]));
        fake.push_state(&audio_xml(&[("a", "Mic A", 0.2, 0.2)]));
        let sampler = StateSampler::new(Arc::new(fake));

        let audio = sampler.sample_audio(1, 2).await.unwrap();

        assert_eq!(audio.len(), 1);
        assert_eq!(audio[0].key, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_poll_fails_the_whole_window() {
        let fake = FakeMixer::default();
        fake.push_state(&audio_xml(&[("a", "Mic A", 0.2, 0.2)]));
        fake.push_failure("connection reset");
        let sampler = StateSampler::new(Arc::new(fake));

        assert!(sampler.sample_audio(1, 2).await.is_err());
    }

    #[tokio::test]
    async fn single_shot_queries() {
        let fake = FakeMixer::with_state(crate::protocol::SAMPLE_XML);
        let sampler = StateSampler::new(Arc::new(fake));

        assert_eq!(sampler.fetch_video_inputs().await.unwrap().len(), 2);
        assert_eq!(sampler.fetch_title_inputs().await.unwrap()[0].name, "NowPlaying");
        assert_eq!(sampler.fetch_on_air_overlay_numbers().await.unwrap(), vec![5]);
    }
}
