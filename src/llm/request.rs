//! Per-request completion configuration
//!
//! Every optional knob is a three-state [`Setting`]: left unset (the service
//! default applies), explicitly cleared, or set to a value. The distinction
//! matters when merging a per-call override onto a base configuration:
//! "the caller did not mention temperature" and "the caller reset
//! temperature to the service default" are different instructions.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// A request knob that is unset, explicitly cleared, or set to a value
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Setting<T> {
    /// Not mentioned; the service default applies and the field is omitted
    #[default]
    Unset,
    /// Explicitly reset; serialized as `null`
    Cleared,
    /// Explicit value
    Value(T),
}

impl<T> Setting<T> {
    /// Check whether this knob was left unset
    pub fn is_unset(&self) -> bool {
        matches!(self, Setting::Unset)
    }

    /// Get the explicit value, if any
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Setting::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Take `self` unless unset, falling back to `base`
    fn or(self, base: Self) -> Self {
        match self {
            Setting::Unset => base,
            explicit => explicit,
        }
    }
}

impl<T: Serialize> Setting<T> {
    /// The JSON form of this knob, or `None` when it should be omitted
    fn to_json(&self) -> Option<Value> {
        match self {
            Setting::Unset => None,
            Setting::Cleared => Some(Value::Null),
            Setting::Value(v) => serde_json::to_value(v).ok(),
        }
    }
}

/// Tunable parameters for one completion call
///
/// `model` is the only required field; everything else defaults to unset.
/// Messages, tools, and tool choice are handled by the orchestration layer,
/// not here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestConfig {
    pub model: String,
    pub temperature: Setting<f64>,
    pub top_p: Setting<f64>,
    pub max_tokens: Setting<u32>,
    pub reasoning_effort: Setting<String>,
    pub stop: Setting<Vec<String>>,
    pub seed: Setting<i64>,
    pub presence_penalty: Setting<f64>,
    pub frequency_penalty: Setting<f64>,
    pub logit_bias: Setting<HashMap<String, i32>>,
}

impl RequestConfig {
    /// Create a configuration with only the model set
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Setting::Value(temperature);
        self
    }

    /// Set nucleus sampling
    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Setting::Value(top_p);
        self
    }

    /// Set the completion token cap
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Setting::Value(max_tokens);
        self
    }

    /// Set a deterministic sampling seed
    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Setting::Value(seed);
        self
    }

    /// Merge a per-call override onto this base configuration
    ///
    /// Per field, an override that was explicitly supplied (value or clear)
    /// wins; unset override fields fall back to the base. The override's
    /// model always wins.
    pub fn merged(&self, overrides: &RequestConfig) -> RequestConfig {
        let base = self.clone();
        let overrides = overrides.clone();
        RequestConfig {
            model: overrides.model,
            temperature: overrides.temperature.or(base.temperature),
            top_p: overrides.top_p.or(base.top_p),
            max_tokens: overrides.max_tokens.or(base.max_tokens),
            reasoning_effort: overrides.reasoning_effort.or(base.reasoning_effort),
            stop: overrides.stop.or(base.stop),
            seed: overrides.seed.or(base.seed),
            presence_penalty: overrides.presence_penalty.or(base.presence_penalty),
            frequency_penalty: overrides.frequency_penalty.or(base.frequency_penalty),
            logit_bias: overrides.logit_bias.or(base.logit_bias),
        }
    }

    /// Write the model and every non-unset knob into a request body
    pub(crate) fn apply_to(&self, body: &mut Map<String, Value>) {
        body.insert("model".to_string(), Value::String(self.model.clone()));

        let knobs: [(&str, Option<Value>); 9] = [
            ("temperature", self.temperature.to_json()),
            ("top_p", self.top_p.to_json()),
            ("max_tokens", self.max_tokens.to_json()),
            ("reasoning_effort", self.reasoning_effort.to_json()),
            ("stop", self.stop.to_json()),
            ("seed", self.seed.to_json()),
            ("presence_penalty", self.presence_penalty.to_json()),
            ("frequency_penalty", self.frequency_penalty.to_json()),
            ("logit_bias", self.logit_bias.to_json()),
        ];

        for (key, value) in knobs {
            if let Some(value) = value {
                body.insert(key.to_string(), value);
            }
        }
    }
}
