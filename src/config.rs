use std::{collections::BTreeMap, path::Path};

use json::JsonValue;
use tracing::{info, warn};

use crate::{
    datatypes::ParamMap,
    error::LegscopeError,
    legs::{LegKind, LegModel, Linkage},
    simulator::Simulator,
};

pub const DEFAULT_CONFIG_FILE: &str = "best_legs_config.json";
pub const OFFSET_S1_KEY: &str = "Offset_S1_Deg";
pub const OFFSET_S2_KEY: &str = "Offset_S2_Deg";

/// Stored settings for one leg variant
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariantConfig {
    pub parameters: ParamMap,
    pub offset_s1_deg: Option<f64>,
    pub offset_s2_deg: Option<f64>,
    /// Score recorded by the optimizer
    pub ellipse_width: Option<f64>,
    pub area: Option<f64>,
}

impl VariantConfig {
    /// Snapshot of a model's current parameters and offsets
    pub fn from_model(model: &LegModel) -> VariantConfig {
        let (offset_t1, offset_t2) = model.offsets();
        let with_offsets = model.has_offset_controls();

        VariantConfig {
            parameters: model.parameters().values(),
            offset_s1_deg: with_offsets.then(|| offset_t1.to_degrees()),
            offset_s2_deg: with_offsets.then(|| offset_t2.to_degrees()),
            ellipse_width: None,
            area: None,
        }
    }
}

/// Persisted leg configurations keyed by variant
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LegConfigFile {
    pub variants: BTreeMap<LegKind, VariantConfig>,
}

fn as_number(value: &JsonValue, context: &str) -> Result<f64, LegscopeError> {
    match value.as_f64() {
        Some(v) => Ok(v),
        None => Err(LegscopeError::Config(format!(
            "Expected a number for {context}, found {value}"
        ))),
    }
}

/// Parses one variant entry
///
/// # Arguments
/// * `name` - The variant key, used in error messages
/// * `entry` - The entry's json object
fn parse_variant(name: &str, entry: &JsonValue) -> Result<VariantConfig, LegscopeError> {
    if !entry.has_key("parameters") {
        return Err(LegscopeError::Config(format!(
            "Variant {name} is missing parameters field"
        )));
    }
    if !entry["parameters"].is_object() {
        return Err(LegscopeError::Config(format!(
            "Variant {name} parameters must be an object"
        )));
    }

    let mut config = VariantConfig::default();

    for (key, value) in entry["parameters"].entries() {
        let number = as_number(value, &format!("{name}.{key}"))?;
        match key {
            OFFSET_S1_KEY => config.offset_s1_deg = Some(number),
            OFFSET_S2_KEY => config.offset_s2_deg = Some(number),
            _ => {
                config.parameters.insert(key.to_string(), number);
            }
        }
    }

    if entry.has_key("ellipse_width") {
        config.ellipse_width = Some(as_number(&entry["ellipse_width"], &format!("{name}.ellipse_width"))?);
    }
    if entry.has_key("area") {
        config.area = Some(as_number(&entry["area"], &format!("{name}.area"))?);
    }

    Ok(config)
}

impl LegConfigFile {
    /// Parses a configuration document
    ///
    /// Unknown variant keys are skipped with a warning.
    pub fn parse(contents: &str) -> Result<LegConfigFile, LegscopeError> {
        let document = match json::parse(contents) {
            Ok(d) => d,
            Err(err) => {
                return Err(LegscopeError::Config(format!(
                    "Error in config json: {err}"
                )))
            }
        };

        if !document.is_object() {
            return Err(LegscopeError::Config(
                "Config json must be an object keyed by variant".to_owned(),
            ));
        }

        let mut file = LegConfigFile::default();
        for (name, entry) in document.entries() {
            let kind = match LegKind::from_name(name) {
                Ok(kind) => kind,
                Err(_) => {
                    warn!("skipping config for unknown variant {name}");
                    continue;
                }
            };
            file.variants.insert(kind, parse_variant(name, entry)?);
        }

        Ok(file)
    }

    /// Loads a configuration file from disk
    pub fn load(path: &Path) -> Result<LegConfigFile, LegscopeError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(err) => {
                return Err(LegscopeError::Config(format!(
                    "Unable to open config file {}: {err}",
                    path.display()
                )))
            }
        };

        let file = LegConfigFile::parse(&contents)?;
        info!(
            "loaded {} leg configurations from {}",
            file.variants.len(),
            path.display()
        );
        Ok(file)
    }

    /// Loads `path` if it exists, otherwise starts empty
    pub fn load_or_default(path: &Path) -> Result<LegConfigFile, LegscopeError> {
        if path.exists() {
            LegConfigFile::load(path)
        } else {
            Ok(LegConfigFile::default())
        }
    }

    pub fn get(&self, kind: LegKind) -> Option<&VariantConfig> {
        self.variants.get(&kind)
    }

    pub fn insert(&mut self, kind: LegKind, config: VariantConfig) {
        self.variants.insert(kind, config);
    }

    pub fn to_json(&self) -> JsonValue {
        let mut document = JsonValue::new_object();

        for (kind, config) in &self.variants {
            let mut parameters = JsonValue::new_object();
            for (key, value) in &config.parameters {
                parameters[key.as_str()] = (*value).into();
            }
            if let Some(offset) = config.offset_s1_deg {
                parameters[OFFSET_S1_KEY] = offset.into();
            }
            if let Some(offset) = config.offset_s2_deg {
                parameters[OFFSET_S2_KEY] = offset.into();
            }

            let mut entry = JsonValue::new_object();
            entry["parameters"] = parameters;
            if let Some(width) = config.ellipse_width {
                entry["ellipse_width"] = width.into();
            }
            if let Some(area) = config.area {
                entry["area"] = area.into();
            }

            document[kind.identifier()] = entry;
        }

        document
    }

    pub fn save(&self, path: &Path) -> Result<(), LegscopeError> {
        if let Err(err) = std::fs::write(path, self.to_json().pretty(4)) {
            return Err(LegscopeError::Config(format!(
                "Failed to write {}: {err}",
                path.display()
            )));
        }

        info!("wrote {} leg configurations to {}", self.variants.len(), path.display());
        Ok(())
    }
}

/// Pushes a stored configuration into a model
///
/// Stored values are laid over the model's current parameters, so partial
/// entries keep the defaults for anything they omit. Offsets that are not
/// stored reset to zero, and variants without offset controls always run
/// with zero offsets.
pub fn apply_variant_config(model: &mut LegModel, config: &VariantConfig) -> Result<(), LegscopeError> {
    let known = model.parameters().names();
    for key in config.parameters.keys() {
        if !known.contains(&key.as_str()) {
            warn!("{}: ignoring unknown parameter {key}", model.display_name());
        }
    }

    let mut merged = model.parameters().values();
    merged.extend(config.parameters.iter().map(|(k, v)| (k.clone(), *v)));
    model.update_params(&merged)?;

    let stored = (config.offset_s1_deg, config.offset_s2_deg);
    if model.has_offset_controls() {
        model.set_offsets(
            stored.0.unwrap_or(0.0).to_radians(),
            stored.1.unwrap_or(0.0).to_radians(),
        );
    } else {
        if stored.0.is_some() || stored.1.is_some() {
            warn!("{}: ignoring stored servo offsets", model.display_name());
        }
        model.set_offsets(0.0, 0.0);
    }

    Ok(())
}

/// Parses a `name=value` parameter override
///
/// The split happens at the last `=`, so names may contain anything but
/// the value must be a number.
pub fn parse_override(text: &str) -> Result<(String, f64), LegscopeError> {
    let Some((name, value)) = text.rsplit_once('=') else {
        return Err(LegscopeError::Input(format!(
            "Override '{text}' must look like name=value"
        )));
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(LegscopeError::Input(format!(
            "Override '{text}' has an empty name"
        )));
    }

    match value.trim().parse::<f64>() {
        Ok(v) => Ok((name.to_string(), v)),
        Err(_) => Err(LegscopeError::Input(format!(
            "Override '{text}' has a non-numeric value"
        ))),
    }
}

/// Applies individual overrides on top of a model's current state
///
/// `Offset_S1_Deg` and `Offset_S2_Deg` move only the offset they name, and
/// are ignored with a warning on variants without offset controls. Unknown
/// parameter names are rejected.
pub fn apply_overrides(model: &mut LegModel, overrides: &[(String, f64)]) -> Result<(), LegscopeError> {
    let mut params = model.parameters().values();
    let with_offsets = model.has_offset_controls();
    let (mut offset_t1, mut offset_t2) = if with_offsets {
        model.offsets()
    } else {
        (0.0, 0.0)
    };

    for (name, value) in overrides {
        match name.as_str() {
            OFFSET_S1_KEY | OFFSET_S2_KEY if !with_offsets => {
                warn!("{}: ignoring {name}, the variant has no offsets", model.display_name());
            }
            OFFSET_S1_KEY => offset_t1 = value.to_radians(),
            OFFSET_S2_KEY => offset_t2 = value.to_radians(),
            _ if params.contains_key(name) => {
                params.insert(name.clone(), *value);
            }
            _ => {
                return Err(LegscopeError::Input(format!(
                    "{} has no parameter '{name}'",
                    model.display_name()
                )))
            }
        }
    }

    model.update_params(&params)?;
    model.set_offsets(offset_t1, offset_t2);
    Ok(())
}

/// Applies every stored variant to the simulator's models
pub fn apply_config(simulator: &mut Simulator, file: &LegConfigFile) -> Result<(), LegscopeError> {
    for (kind, config) in &file.variants {
        info!("applying stored configuration for {}", kind.display_name());
        apply_variant_config(simulator.model_for_mut(*kind), config)?;
    }
    Ok(())
}
