use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{Duration, sleep};

use crate::config::Config;
use crate::decision::{DecisionParams, Snapshot, SwitchDecision, decide};
use crate::mixer_client::{MixerApi, TransportError};
use crate::overlay::OverlayState;
use crate::sampler::StateSampler;

/// Owns the overlay timers and drives one sample -> decide -> command cycle
/// per iteration.
pub struct Switcher<M: MixerApi> {
    config: Config,
    mixer: Arc<M>,
    sampler: StateSampler<M>,
    overlay_state: OverlayState,
}

impl<M: MixerApi> Switcher<M> {
    pub fn new(config: Config, mixer: Arc<M>) -> Self {
        Self {
            sampler: StateSampler::new(mixer.clone()),
            overlay_state: OverlayState::new(Instant::now()),
            config,
            mixer,
        }
    }

    /// 主循环，直到进程被终止
    pub async fn run(&mut self) {
        let mut iteration: u64 = 0;
        loop {
            iteration += 1;
            let delay = self.next_delay();

            match self.run_iteration().await {
                Ok(decision) => {
                    if let Some(camera) = &decision.camera {
                        log::info!("[{}] On air: {}", iteration, camera);
                    }
                }
                Err(e) => {
                    log::warn!("[{}] Skipping iteration: {}", iteration, e);
                }
            }

            sleep(delay).await;
        }
    }

    fn next_delay(&self) -> Duration {
        let secs = rand::rng()
            .random_range(self.config.switch_delay_min_secs..=self.config.switch_delay_max_secs);
        Duration::from_secs(secs)
    }

    async fn snapshot(&self) -> Result<Snapshot, TransportError> {
        let video = self.sampler.fetch_video_inputs().await?;
        let audio = self
            .sampler
            .sample_audio(self.config.sample_duration_secs, self.config.samples_per_second)
            .await?;
        let titles = self.sampler.fetch_title_inputs().await?;
        let on_air_overlays = self.sampler.fetch_on_air_overlay_numbers().await?;
        log::debug!(
            "State: {} video, {} audio, {} titles, overlays on air {:?}",
            video.len(),
            audio.len(),
            titles.len(),
            on_air_overlays
        );
        Ok(Snapshot {
            video,
            audio,
            titles,
            on_air_overlays,
        })
    }

    /// Run one cycle. Transport failures abort the cycle before any command is
    /// sent; a failed command is logged and does not stop the other one.
    pub async fn run_iteration(&mut self) -> Result<SwitchDecision, TransportError> {
        let snapshot = self.snapshot().await?;
        let params = DecisionParams::from_config(&self.config);
        let decision = decide(&snapshot, &params, &mut self.overlay_state, Instant::now());

        if decision.playout_active {
            log::info!("Playout active, going wide");
        }

        for command in decision.video.iter().chain(decision.overlay.iter()) {
            log::info!("Sending {} -> {}", command.action.as_str(), command.key);
            if let Err(e) = self.mixer.send_command(command.action, &command.key).await {
                log::error!("Failed to send {}: {}", command.action.as_str(), e);
            }
        }

        Ok(decision)
    }
}
