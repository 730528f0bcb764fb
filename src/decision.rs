use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::mixer_client::MixerAction;
use crate::overlay::{OverlayCommand, OverlayState};
use crate::protocol::{AudioInput, TitleInput, VideoInput};

/// Everything the engine needs to know about the mixer for one iteration.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub video: Vec<VideoInput>,
    pub audio: Vec<AudioInput>,
    pub titles: Vec<TitleInput>,
    pub on_air_overlays: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct DecisionParams<'a> {
    pub playout_inputs: &'a [String],
    pub ignore_inputs: &'a [String],
    pub playout_threshold: f64,
    pub wide_camera: &'a str,
    pub mic_camera_map: &'a HashMap<String, String>,
    pub now_playing_overlay: &'a str,
    pub on_air: Duration,
    pub show_times: u32,
}

impl<'a> DecisionParams<'a> {
    pub fn from_config(config: &'a Config) -> Self {
        Self {
            playout_inputs: &config.playout_inputs,
            ignore_inputs: &config.ignore_inputs,
            playout_threshold: config.playout_threshold,
            wide_camera: &config.wide_camera,
            mic_camera_map: &config.mic_camera_map,
            now_playing_overlay: &config.now_playing_overlay,
            on_air: config.now_playing_on_air,
            show_times: config.now_playing_show_times,
        }
    }
}

/// A single command for the mixer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub action: MixerAction,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwitchDecision {
    pub video: Option<Command>,
    pub overlay: Option<Command>,
    pub playout_active: bool,
    /// Name of the camera chosen, for logging.
    pub camera: Option<String>,
}

enum Target<'a> {
    Wide,
    Mic { mic: &'a str, camera: &'a str },
}

pub fn decide(
    snapshot: &Snapshot,
    params: &DecisionParams,
    overlay_state: &mut OverlayState,
    now: Instant,
) -> SwitchDecision {
    let audio: Vec<&AudioInput> = snapshot
        .audio
        .iter()
        .filter(|a| !params.ignore_inputs.contains(&a.name))
        .collect();
    if audio.is_empty() {
        return SwitchDecision::default();
    }

    // 按配置顺序遍历，多个同时超过阈值时以最后一个为准
    let mut playout_active = false;
    for name in params.playout_inputs {
        match audio.iter().find(|a| &a.name == name) {
            Some(input) if input.volume > params.playout_threshold => {
                log::debug!("Playout input {} ({}) at {:.2}", input.name, input.key, input.volume);
                playout_active = true;
            }
            Some(_) => {}
            None => log::warn!("Playout input {} not found in audio inputs", name),
        }
    }

    let target = if playout_active {
        Target::Wide
    } else {
        // 相同音量时取先出现的输入
        let loudest = audio
            .iter()
            .copied()
            .reduce(|best, a| if a.volume > best.volume { a } else { best });
        let Some(loudest) = loudest else {
            return SwitchDecision::default();
        };
        match params.mic_camera_map.get(&loudest.name) {
            Some(camera) => Target::Mic {
                mic: &loudest.name,
                camera,
            },
            None => {
                log::debug!("Loudest input {} has no camera mapping", loudest.name);
                return SwitchDecision {
                    playout_active,
                    ..Default::default()
                };
            }
        }
    };

    let (camera, force_hide) = match target {
        Target::Wide => (params.wide_camera, false),
        Target::Mic { mic, camera } => {
            log::debug!("Loudest input {} maps to {}", mic, camera);
            (camera, true)
        }
    };

    let camera_key = snapshot
        .video
        .iter()
        .find(|v| v.name == camera)
        .map(|v| v.key.clone());
    if camera_key.is_none() {
        log::warn!("Camera {} not found in video inputs, skipping switch", camera);
    }

    let caption = snapshot
        .titles
        .iter()
        .find(|t| t.name == params.now_playing_overlay);
    if caption.is_none() {
        log::debug!("Overlay {} not present", params.now_playing_overlay);
    }
    let overlay = overlay_state
        .evaluate(
            caption,
            &snapshot.on_air_overlays,
            now,
            params.on_air,
            params.show_times,
            force_hide,
        )
        .zip(caption)
        .map(|(cmd, caption)| Command {
            action: match cmd {
                OverlayCommand::Show => MixerAction::OverlayIn,
                OverlayCommand::Hide => MixerAction::OverlayOut,
            },
            key: caption.key.clone(),
        });

    SwitchDecision {
        camera: camera_key.as_ref().map(|_| camera.to_string()),
        video: camera_key.map(|key| Command {
            action: MixerAction::Cut,
            key,
        }),
        overlay,
        playout_active,
    }
}
