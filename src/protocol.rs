use roxmltree::{Document, Node};

use crate::mixer_client::TransportError;

/// Capture 类型的输入（摄像机）
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInput {
    pub name: String,
    pub key: String,
}

/// Audio 类型的输入，volume 为采样窗口内的平均电平
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInput {
    pub name: String,
    pub key: String,
    pub volume: f64,
}

/// Xaml 类型的输入（字幕），text_data 为 (title, artist)
#[derive(Debug, Clone, PartialEq)]
pub struct TitleInput {
    pub name: String,
    pub key: String,
    pub number: u32,
    pub text_data: (String, String),
}

impl TitleInput {
    pub fn song_key(&self) -> String {
        format!("{}_{}", self.text_data.0, self.text_data.1)
    }
}

/// 单次电平读数
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReading {
    pub name: String,
    pub key: String,
    pub left: f64,
    pub right: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MixerState {
    pub video: Vec<VideoInput>,
    pub audio: Vec<MeterReading>,
    pub titles: Vec<TitleInput>,
    pub on_air_overlays: Vec<u32>,
}

/// Input names use underscores in place of spaces everywhere in this crate.
pub fn normalize_name(title: &str) -> String {
    title.replace(' ', "_")
}

impl MixerState {
    /// Parse the mixer's `/api` XML document.
    pub fn parse(xml: &str) -> Result<Self, TransportError> {
        let doc = Document::parse(xml)?;
        let root = doc.root_element();
        if root.tag_name().name() != "vmix" {
            return Err(TransportError::Shape(format!(
                "unexpected root element <{}>",
                root.tag_name().name()
            )));
        }

        let mut state = MixerState::default();

        let inputs = child(root, "inputs")
            .ok_or_else(|| TransportError::Shape("missing <inputs>".to_string()))?;
        for input in inputs.children().filter(|n| n.has_tag_name("input")) {
            match input.attribute("type") {
                Some("Capture") => state.video.push(VideoInput {
                    name: normalize_name(required(input, "title")?),
                    key: required(input, "key")?.to_string(),
                }),
                Some("Audio") => state.audio.push(MeterReading {
                    name: normalize_name(required(input, "title")?),
                    key: required(input, "key")?.to_string(),
                    left: parse_attr(input, "meterF1")?,
                    right: parse_attr(input, "meterF2")?,
                }),
                Some("Xaml") => state.titles.push(parse_title(input)?),
                _ => {}
            }
        }

        // 空的 overlay 表示该通道未使用
        if let Some(overlays) = child(root, "overlays") {
            for overlay in overlays.children().filter(|n| n.has_tag_name("overlay")) {
                let text = overlay.text().map(str::trim).unwrap_or("");
                if text.is_empty() {
                    continue;
                }
                let number = text.parse::<u32>().map_err(|_| {
                    TransportError::Shape(format!("overlay holds non-numeric input '{}'", text))
                })?;
                state.on_air_overlays.push(number);
            }
        }

        Ok(state)
    }
}

fn parse_title(input: Node) -> Result<TitleInput, TransportError> {
    let mut texts = input
        .children()
        .filter(|n| n.has_tag_name("text"))
        .map(|n| n.text().unwrap_or("").to_string());
    let title = texts.next().unwrap_or_default();
    let artist = texts.next().unwrap_or_default();

    Ok(TitleInput {
        name: normalize_name(required(input, "title")?),
        key: required(input, "key")?.to_string(),
        number: parse_attr(input, "number")?,
        text_data: (title, artist),
    })
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn required<'a>(node: Node<'a, '_>, attr: &str) -> Result<&'a str, TransportError> {
    node.attribute(attr).ok_or_else(|| {
        TransportError::Shape(format!(
            "<{}> is missing attribute '{}'",
            node.tag_name().name(),
            attr
        ))
    })
}

fn parse_attr<T: std::str::FromStr>(node: Node, attr: &str) -> Result<T, TransportError> {
    let raw = required(node, attr)?;
    raw.trim().parse::<T>().map_err(|_| {
        TransportError::Shape(format!("attribute '{}' has unparseable value '{}'", attr, raw))
    })
}

#[cfg(test)]
pub(crate) const SAMPLE_XML: &str = r#"<vmix>
  <version>24.0.0.72</version>
  <inputs>
    <input key="cam-wide" number="1" type="Capture" title="Wide" state="Running">Wide</input>
    <input key="cam-x" number="2" type="Capture" title="Cam X">Cam X</input>
    <input key="mic-a" number="3" type="Audio" title="Mic A" meterF1="0.2" meterF2="0.4">Mic A</input>
    <input key="playout" number="4" type="Audio" title="PlayoutSys" meterF1="0" meterF2="0">PlayoutSys</input>
    <input key="np" number="5" type="Xaml" title="NowPlaying">NowPlaying
      <text index="0" name="Title.Text">Song</text>
      <text index="1" name="Artist.Text">Band</text>
    </input>
    <input key="clip" number="6" type="Video" title="Intro">Intro</input>
  </inputs>
  <overlays>
    <overlay number="1">5</overlay>
    <overlay number="2" />
    <overlay number="3"></overlay>
  </overlays>
</vmix>"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inputs_by_type() {
        let state = MixerState::parse(SAMPLE_XML).unwrap();

        assert_eq!(state.video.len(), 2);
        assert_eq!(state.video[1].name, "Cam_X");
        assert_eq!(state.video[1].key, "cam-x");

        assert_eq!(state.audio.len(), 2);
        assert_eq!(state.audio[0].name, "Mic_A");
        assert_eq!(state.audio[0].left, 0.2);
        assert_eq!(state.audio[0].right, 0.4);

        let title = &state.titles[0];
        assert_eq!(title.name, "NowPlaying");
        assert_eq!(title.number, 5);
        assert_eq!(title.text_data, ("Song".to_string(), "Band".to_string()));
        assert_eq!(title.song_key(), "Song_Band");
    }

    #[test]
    fn collects_only_occupied_overlays() {
        let state = MixerState::parse(SAMPLE_XML).unwrap();
        assert_eq!(state.on_air_overlays, vec![5]);
    }

    #[test]
    fn title_without_text_has_empty_song() {
        let xml = r#"<vmix><inputs>
            <input key="np" number="2" type="Xaml" title="NowPlaying"/>
        </inputs></vmix>"#;
        let state = MixerState::parse(xml).unwrap();
        assert_eq!(state.titles[0].song_key(), "_");
    }

    #[test]
    fn rejects_bad_meter_value() {
        let xml = r#"<vmix><inputs>
            <input key="m" number="1" type="Audio" title="Mic" meterF1="loud" meterF2="0"/>
        </inputs></vmix>"#;
        assert!(matches!(MixerState::parse(xml), Err(TransportError::Shape(_))));
    }

    #[test]
    fn rejects_missing_key() {
        let xml = r#"<vmix><inputs><input type="Capture" title="Cam"/></inputs></vmix>"#;
        assert!(matches!(MixerState::parse(xml), Err(TransportError::Shape(_))));
    }

    #[test]
    fn rejects_wrong_root_and_garbage() {
        assert!(matches!(
            MixerState::parse("<html></html>"),
            Err(TransportError::Shape(_))
        ));
        assert!(matches!(MixerState::parse("not xml"), Err(TransportError::Xml(_))));
    }
}
