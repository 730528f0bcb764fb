use anyhow::{Context, bail};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Upper bound for the caption on-air time, keeps timer arithmetic in range.
pub const MAX_ON_AIR_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    // 调音台 API
    pub api_url: &'static str,
    pub user_agent: &'static str,
    pub request_timeout: Duration,

    // 音量采样
    pub samples_per_second: u32,
    pub sample_duration_secs: u32,

    // 切换参数
    pub switch_delay_min_secs: u64,
    pub switch_delay_max_secs: u64,
    pub playout_inputs: Vec<String>,
    pub ignore_inputs: Vec<String>,
    pub playout_threshold: f64,
    pub wide_camera: String,

    // Now Playing 字幕
    pub now_playing_overlay: String,
    pub now_playing_on_air: Duration,
    pub now_playing_show_times: u32,

    pub mic_camera_map: HashMap<String, String>,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> anyhow::Result<Self> {
        let config = Self {
            api_url: env!("MIXER_API_URL"),
            user_agent: env!("MIXER_USER_AGENT"),
            request_timeout: Duration::from_millis(
                env!("MIXER_REQUEST_TIMEOUT_MS")
                    .parse()
                    .context("Failed to parse MIXER_REQUEST_TIMEOUT_MS")?,
            ),

            samples_per_second: env!("SAMPLES_PER_SECOND")
                .parse()
                .context("Failed to parse SAMPLES_PER_SECOND")?,
            sample_duration_secs: env!("SAMPLE_DURATION_SECS")
                .parse()
                .context("Failed to parse SAMPLE_DURATION_SECS")?,

            switch_delay_min_secs: env!("SWITCH_DELAY_MIN_SECS")
                .parse()
                .context("Failed to parse SWITCH_DELAY_MIN_SECS")?,
            switch_delay_max_secs: env!("SWITCH_DELAY_MAX_SECS")
                .parse()
                .context("Failed to parse SWITCH_DELAY_MAX_SECS")?,
            playout_inputs: parse_list(env!("PLAYOUT_INPUTS")),
            ignore_inputs: parse_list(env!("IGNORE_INPUTS")),
            playout_threshold: env!("PLAYOUT_THRESHOLD")
                .parse()
                .context("Failed to parse PLAYOUT_THRESHOLD")?,
            wide_camera: env!("WIDE_CAMERA").to_string(),

            now_playing_overlay: env!("NOW_PLAYING_OVERLAY").to_string(),
            now_playing_on_air: Duration::from_secs(
                env!("NOW_PLAYING_ON_AIR_SECS")
                    .parse()
                    .context("Failed to parse NOW_PLAYING_ON_AIR_SECS")?,
            ),
            now_playing_show_times: env!("NOW_PLAYING_SHOW_TIMES")
                .parse()
                .context("Failed to parse NOW_PLAYING_SHOW_TIMES")?,

            mic_camera_map: parse_mapping(env!("MIC_CAMERA_MAP"))?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        Url::parse(self.api_url).with_context(|| format!("Invalid mixer API url: {}", self.api_url))?;
        if self.samples_per_second == 0 {
            bail!("samples_per_second must be greater than zero");
        }
        if self.sample_duration_secs == 0 {
            bail!("duration_secs must be greater than zero");
        }
        if self
            .sample_duration_secs
            .checked_mul(self.samples_per_second)
            .is_none()
        {
            bail!(
                "duration_secs ({}) * samples_per_second ({}) overflows",
                self.sample_duration_secs,
                self.samples_per_second
            );
        }
        if self.now_playing_on_air > Duration::from_secs(MAX_ON_AIR_SECS) {
            bail!(
                "on_air_duration_secs must be at most {} seconds",
                MAX_ON_AIR_SECS
            );
        }
        if self.switch_delay_min_secs > self.switch_delay_max_secs {
            bail!(
                "delay_min_secs ({}) is greater than delay_max_secs ({})",
                self.switch_delay_min_secs,
                self.switch_delay_max_secs
            );
        }
        if !self.playout_threshold.is_finite() {
            bail!("playout_threshold must be a finite number");
        }
        Ok(())
    }
}

/// `a,b,c` -> ["a", "b", "c"]，忽略空项
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `mic=camera,mic=camera` -> HashMap
pub fn parse_mapping(raw: &str) -> anyhow::Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for pair in parse_list(raw) {
        let Some((mic, camera)) = pair.split_once('=') else {
            bail!("Malformed mic_camera_map entry: {}", pair);
        };
        map.insert(mic.trim().to_string(), camera.trim().to_string());
    }
    Ok(map)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        api_url: "http://127.0.0.1:8088/api",
        user_agent: "test",
        request_timeout: Duration::from_millis(500),
        samples_per_second: 5,
        sample_duration_secs: 1,
        switch_delay_min_secs: 2,
        switch_delay_max_secs: 5,
        playout_inputs: vec!["PlayoutSys".to_string()],
        ignore_inputs: vec!["Service_1".to_string()],
        playout_threshold: 0.1,
        wide_camera: "Wide".to_string(),
        now_playing_overlay: "NowPlaying".to_string(),
        now_playing_on_air: Duration::from_secs(30),
        now_playing_show_times: 2,
        mic_camera_map: HashMap::from([
            ("MicA".to_string(), "CamX".to_string()),
            ("MicB".to_string(), "CamY".to_string()),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_skips_blank_entries() {
        assert_eq!(parse_list("a, b,,c "), vec!["a", "b", "c"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn mapping_parses_pairs() {
        let map = parse_mapping("Guest_Mic_1=Guest_1_and_2,Announcer_Mic = Announcer").unwrap();
        assert_eq!(map.get("Guest_Mic_1").map(String::as_str), Some("Guest_1_and_2"));
        assert_eq!(map.get("Announcer_Mic").map(String::as_str), Some("Announcer"));
    }

    #[test]
    fn mapping_rejects_missing_separator() {
        assert!(parse_mapping("Guest_Mic_1").is_err());
    }

    #[test]
    fn validate_rejects_inverted_delay_range() {
        let mut config = test_config();
        config.switch_delay_min_secs = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_sample_rate() {
        let mut config = test_config();
        config.samples_per_second = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_sample_count_overflow() {
        let mut config = test_config();
        config.sample_duration_secs = u32::MAX;
        config.samples_per_second = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_huge_on_air_duration() {
        let mut config = test_config();
        config.now_playing_on_air = Duration::from_secs(u64::MAX);
        assert!(config.validate().is_err());

        config.now_playing_on_air = Duration::from_secs(MAX_ON_AIR_SECS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(test_config().validate().is_ok());
    }
}
