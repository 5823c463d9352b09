use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{EventError, EventResult};

const BUILTIN_TEMPLATES: [(&str, &str); 3] = [
    (
        super::SESSION_UPDATE,
        include_str!("../../../templates/session-update.json"),
    ),
    (
        super::INPUT_AUDIO_APPEND,
        include_str!("../../../templates/input_audio_buffer-append.json"),
    ),
    (super::MEDIA, include_str!("../../../templates/media.json")),
];

/// Immutable set of named message templates.
///
/// Shared across calls behind an `Arc`; rendering only reads.
#[derive(Debug, Clone)]
pub struct EventTemplates {
    templates: HashMap<String, Value>,
}

impl EventTemplates {
    /// Build a template set from already parsed values.
    ///
    /// Fails if the set is empty or any template is not a JSON object.
    pub fn from_values<I>(templates: I) -> EventResult<Self>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut map = HashMap::new();
        for (name, value) in templates {
            if !value.is_object() {
                return Err(EventError::TemplateLoad {
                    origin: name,
                    reason: "template must be a JSON object".to_string(),
                });
            }
            map.insert(name, value);
        }

        if map.is_empty() {
            return Err(EventError::TemplateLoad {
                origin: "<inline>".to_string(),
                reason: "template set is empty".to_string(),
            });
        }

        Ok(Self { templates: map })
    }

    /// Templates compiled into the binary.
    pub fn builtin() -> EventResult<Self> {
        let mut parsed = Vec::with_capacity(BUILTIN_TEMPLATES.len());
        for (name, source) in BUILTIN_TEMPLATES {
            let value: Value =
                serde_json::from_str(source).map_err(|e| EventError::TemplateLoad {
                    origin: format!("builtin:{name}"),
                    reason: e.to_string(),
                })?;
            parsed.push((name.to_string(), value));
        }
        Self::from_values(parsed)
    }

    /// Load every `.json`, `.yaml` and `.yml` file in a directory.
    ///
    /// Template names are the file stems. Other files are skipped. Any
    /// unreadable or malformed file fails the whole load.
    pub fn load_from_directory(dir: &Path) -> EventResult<Self> {
        let origin = dir.display().to_string();
        if !dir.is_dir() {
            return Err(EventError::TemplateLoad {
                origin,
                reason: "not a directory".to_string(),
            });
        }

        let entries = std::fs::read_dir(dir).map_err(|e| EventError::TemplateLoad {
            origin: origin.clone(),
            reason: e.to_string(),
        })?;

        let mut parsed: Vec<(String, Value)> = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| EventError::TemplateLoad {
                    origin: origin.clone(),
                    reason: e.to_string(),
                })?
                .path();

            let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !matches!(extension, "json" | "yaml" | "yml") {
                debug!(path = %path.display(), "Skipping non-template file");
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let file_origin = path.display().to_string();
            let contents =
                std::fs::read_to_string(&path).map_err(|e| EventError::TemplateLoad {
                    origin: file_origin.clone(),
                    reason: e.to_string(),
                })?;

            let parsed_value: Result<Value, String> = if extension == "json" {
                serde_json::from_str(&contents).map_err(|e| e.to_string())
            } else {
                serde_yaml::from_str(&contents).map_err(|e| e.to_string())
            };
            let value = parsed_value.map_err(|reason| EventError::TemplateLoad {
                origin: file_origin.clone(),
                reason,
            })?;

            if parsed.iter().any(|(existing, _)| existing == name) {
                return Err(EventError::TemplateLoad {
                    origin: file_origin,
                    reason: format!("duplicate template name '{name}'"),
                });
            }
            parsed.push((name.to_string(), value));
        }

        if parsed.is_empty() {
            return Err(EventError::TemplateLoad {
                origin,
                reason: "no templates found".to_string(),
            });
        }

        let templates = Self::from_values(parsed)?;
        info!(directory = %dir.display(), count = templates.len(), "Loaded event templates");
        Ok(templates)
    }

    /// Load from `dir` when given, otherwise use the built-in set.
    pub fn load(dir: Option<&Path>) -> EventResult<Self> {
        match dir {
            Some(dir) => Self::load_from_directory(dir),
            None => Self::builtin(),
        }
    }

    /// Fail unless every named template is present.
    pub fn require(&self, names: &[&str]) -> EventResult<()> {
        match names.iter().find(|name| !self.contains(name)) {
            Some(missing) => Err(EventError::UnknownEvent((*missing).to_string())),
            None => Ok(()),
        }
    }

    /// Render a template to a JSON string.
    ///
    /// Every key in the template, at any depth, whose name matches a
    /// substitution is replaced by that value. Substituted values are not
    /// searched again. Substitutions that match nothing are ignored.
    pub fn render(&self, name: &str, substitutions: &[(&str, Value)]) -> EventResult<String> {
        let value = self.render_value(name, substitutions)?;
        serde_json::to_string(&value).map_err(|e| EventError::Serialize {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Render a template without serializing it.
    pub fn render_value(&self, name: &str, substitutions: &[(&str, Value)]) -> EventResult<Value> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| EventError::UnknownEvent(name.to_string()))?;

        let mut rendered = template.clone();
        substitute(&mut rendered, substitutions);
        Ok(rendered)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Template names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn substitute(value: &mut Value, substitutions: &[(&str, Value)]) {
    match value {
        Value::Object(map) => substitute_object(map, substitutions),
        Value::Array(items) => {
            for item in items {
                substitute(item, substitutions);
            }
        }
        _ => {}
    }
}

fn substitute_object(map: &mut Map<String, Value>, substitutions: &[(&str, Value)]) {
    for (key, slot) in map.iter_mut() {
        match substitutions.iter().find(|(name, _)| *name == key.as_str()) {
            Some((_, replacement)) => *slot = replacement.clone(),
            None => substitute(slot, substitutions),
        }
    }
}
