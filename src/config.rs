use anyhow::{anyhow, Context, Result};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

/// How the camera feed reaches the screen during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VideoMode {
    /// The platform composites the camera image behind the XR layer.
    #[default]
    Passthrough,
    /// A `getUserMedia` stream is attached to a video element behind the canvas.
    CameraStream,
}

/// Feature negotiation for the AR session request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub video: VideoMode,
    pub require_hit_test: bool,
    pub dom_overlay: bool,
    pub light_estimation: bool,
    /// Element id used as the DOM overlay root; `None` means `document.body`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_root: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            video: VideoMode::Passthrough,
            require_hit_test: true,
            dom_overlay: true,
            light_estimation: true,
            overlay_root: None,
        }
    }
}

/// One placeable model in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub path: String,
    /// Uniform scale applied to every placed copy.
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl ModelEntry {
    pub fn new(name: impl Into<String>, path: impl Into<String>, scale: f32) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            scale,
            thumbnail: None,
        }
    }
}

/// Complete viewer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    pub session: SessionConfig,
    pub models: Vec<ModelEntry>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let models = [
            ("Dylan armchair", "models/dylan_armchair_yolk_yellow.glb", 0.01),
            ("Ivan armchair", "models/ivan_armchair_mineral_blue.glb", 0.01),
            ("Marble coffee table", "models/marble_coffee_table.glb", 0.005),
            (
                "Flippa coffee table",
                "models/flippa_functional_coffee_table_w._storagewalnut.glb",
                0.01,
            ),
            (
                "Frame armchair",
                "models/frame_armchairpetrol_velvet_with_gold_frame.glb",
                0.01,
            ),
            (
                "Elnaz side tables",
                "models/elnaz_nesting_side_tables_brass__green_marble.glb",
                0.01,
            ),
        ]
        .into_iter()
        .map(|(name, path, scale)| ModelEntry::new(name, path, scale))
        .collect();

        Self {
            session: SessionConfig::default(),
            models,
        }
    }
}

impl ViewerConfig {
    /// Parses the XML configuration shipped alongside the web bundle.
    ///
    /// Missing `<session>` settings fall back to [`SessionConfig::default`].
    /// A document without any `<model>` entries is rejected.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid viewer XML")?;
        let root = document.root_element();
        if !root.has_tag_name("viewer") {
            return Err(anyhow!(
                "expected <viewer> root element, found <{}>",
                root.tag_name().name()
            ));
        }

        let mut session = SessionConfig::default();
        if let Some(node) = root.children().find(|n| n.has_tag_name("session")) {
            if let Some(video) = optional_text(&node, "video") {
                session.video = parse_video_mode(&video)?;
            }
            if let Some(hit_test) = optional_text(&node, "hit-test") {
                session.require_hit_test = match hit_test.as_str() {
                    "required" => true,
                    "optional" => false,
                    other => return Err(anyhow!("unknown hit-test mode `{other}`")),
                };
            }
            session.dom_overlay = parse_bool(optional_text(&node, "dom-overlay"), true)?;
            session.light_estimation =
                parse_bool(optional_text(&node, "light-estimation"), true)?;
            session.overlay_root = optional_text(&node, "overlay-root");
        }

        let mut models = Vec::new();
        for (index, node) in root
            .children()
            .filter(|n| n.has_tag_name("model"))
            .enumerate()
        {
            let path = required_text(&node, "path")
                .with_context(|| format!("model #{index} is incomplete"))?;
            let name = optional_text(&node, "name").unwrap_or_else(|| path.clone());
            let scale = parse_f32(optional_text(&node, "scale"), default_scale())
                .with_context(|| format!("model `{name}` has an invalid scale"))?;
            if scale <= 0.0 {
                return Err(anyhow!("model `{name}` must have a positive scale"));
            }
            models.push(ModelEntry {
                name,
                path,
                scale,
                thumbnail: optional_text(&node, "thumbnail"),
            });
        }

        if models.is_empty() {
            return Err(anyhow!("viewer configuration lists no models"));
        }

        Ok(Self { session, models })
    }
}

fn default_scale() -> f32 {
    1.0
}

fn parse_video_mode(value: &str) -> Result<VideoMode> {
    match value {
        "passthrough" => Ok(VideoMode::Passthrough),
        "camera-stream" => Ok(VideoMode::CameraStream),
        other => Err(anyhow!("unknown video mode `{other}`")),
    }
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_bool(value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref() {
        None => Ok(default),
        Some("true" | "yes" | "1") => Ok(true),
        Some("false" | "no" | "0") => Ok(false),
        Some(other) => Err(anyhow!("expected a boolean, found `{other}`")),
    }
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    const SAMPLE: &str = r#"
    <viewer>
        <session>
            <video>camera-stream</video>
            <hit-test>optional</hit-test>
            <light-estimation>false</light-estimation>
        </session>
        <model>
            <name>Chair</name>
            <path>models/chair.glb</path>
            <scale>0.01</scale>
            <thumbnail>thumbs/chair.png</thumbnail>
        </model>
        <model>
            <path>models/table.glb</path>
        </model>
    </viewer>
    "#;

    static PARSED: Lazy<ViewerConfig> =
        Lazy::new(|| ViewerConfig::from_xml(SAMPLE).expect("sample config parses"));

    #[test]
    fn parse_reads_session_settings() {
        let session = &PARSED.session;
        assert_eq!(session.video, VideoMode::CameraStream);
        assert!(!session.require_hit_test);
        assert!(session.dom_overlay);
        assert!(!session.light_estimation);
        assert_eq!(session.overlay_root, None);
    }

    #[test]
    fn parse_reads_models_with_defaults() {
        assert_eq!(PARSED.models.len(), 2);
        let chair = &PARSED.models[0];
        assert_eq!(chair.name, "Chair");
        assert!((chair.scale - 0.01).abs() < f32::EPSILON);
        assert_eq!(chair.thumbnail.as_deref(), Some("thumbs/chair.png"));

        let table = &PARSED.models[1];
        assert_eq!(table.name, "models/table.glb");
        assert_eq!(table.scale, 1.0);
    }

    #[test]
    fn default_catalog_matches_furniture_set() {
        let config = ViewerConfig::default();
        let scales: Vec<f32> = config.models.iter().map(|m| m.scale).collect();
        assert_eq!(scales, vec![0.01, 0.01, 0.005, 0.01, 0.01, 0.01]);
        assert!(config.session.require_hit_test);
        assert_eq!(config.session.video, VideoMode::Passthrough);
    }

    #[test]
    fn missing_path_is_an_error() {
        let bad = "<viewer><model><name>Chair</name></model></viewer>";
        assert!(ViewerConfig::from_xml(bad).is_err());
    }

    #[test]
    fn empty_catalog_is_an_error() {
        assert!(ViewerConfig::from_xml("<viewer><session/></viewer>").is_err());
    }

    #[test]
    fn unknown_video_mode_is_an_error() {
        let bad = r#"<viewer>
            <session><video>hologram</video></session>
            <model><path>a.glb</path></model>
        </viewer>"#;
        assert!(ViewerConfig::from_xml(bad).is_err());
    }
}
