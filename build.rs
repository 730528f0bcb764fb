use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Deserialize)]
struct Config {
    mixer: Mixer,
    sampling: Sampling,
    switching: Switching,
    now_playing: NowPlaying,
    #[serde(default)]
    mic_camera_map: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct Mixer {
    api_url: String,
    user_agent: String,
    request_timeout_ms: u64,
}

#[derive(Deserialize)]
struct Sampling {
    samples_per_second: u32,
    duration_secs: u32,
}

#[derive(Deserialize)]
struct Switching {
    delay_min_secs: u64,
    delay_max_secs: u64,
    playout_inputs: Vec<String>,
    #[serde(default)]
    ignore_inputs: Vec<String>,
    playout_threshold: f64,
    wide_camera: String,
}

#[derive(Deserialize)]
struct NowPlaying {
    overlay: String,
    on_air_duration_secs: u64,
    show_times: u32,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    // 调音台 API
    println!("cargo:rustc-env=MIXER_API_URL={}", config.mixer.api_url);
    println!("cargo:rustc-env=MIXER_USER_AGENT={}", config.mixer.user_agent);
    println!("cargo:rustc-env=MIXER_REQUEST_TIMEOUT_MS={}", config.mixer.request_timeout_ms);

    // 采样
    println!("cargo:rustc-env=SAMPLES_PER_SECOND={}", config.sampling.samples_per_second);
    println!("cargo:rustc-env=SAMPLE_DURATION_SECS={}", config.sampling.duration_secs);

    // 切换
    println!("cargo:rustc-env=SWITCH_DELAY_MIN_SECS={}", config.switching.delay_min_secs);
    println!("cargo:rustc-env=SWITCH_DELAY_MAX_SECS={}", config.switching.delay_max_secs);
    println!("cargo:rustc-env=PLAYOUT_INPUTS={}", config.switching.playout_inputs.join(","));
    println!("cargo:rustc-env=IGNORE_INPUTS={}", config.switching.ignore_inputs.join(","));
    println!("cargo:rustc-env=PLAYOUT_THRESHOLD={}", config.switching.playout_threshold);
    println!("cargo:rustc-env=WIDE_CAMERA={}", config.switching.wide_camera);

    // Now Playing 字幕
    println!("cargo:rustc-env=NOW_PLAYING_OVERLAY={}", config.now_playing.overlay);
    println!("cargo:rustc-env=NOW_PLAYING_ON_AIR_SECS={}", config.now_playing.on_air_duration_secs);
    println!("cargo:rustc-env=NOW_PLAYING_SHOW_TIMES={}", config.now_playing.show_times);

    // 麦克风 -> 摄像机映射，格式 mic=camera,mic=camera
    let map = config
        .mic_camera_map
        .iter()
        .map(|(mic, camera)| format!("{}={}", mic, camera))
        .collect::<Vec<_>>()
        .join(",");
    println!("cargo:rustc-env=MIC_CAMERA_MAP={}", map);
}
