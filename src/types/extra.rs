//! Typed access to the open-ended "extra parameters" side-channel.
//!
//! Every lookup goes through [`ExtraParams`]; a missing or wrong-typed key is
//! reported as absent and never panics.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Logical provider-specific fields that live in the side-channel.
///
/// Each key owns an ordered candidate list: the canonical camelCase spelling
/// first, then the legacy snake_case one where the provider accepted both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    SafetySettings,
    CachedContent,
    Labels,
    TopK,
    PersonGeneration,
    Language,
    EnhancePrompt,
    AddWatermark,
    SampleImageSize,
    AspectRatio,
    FileUri,
    MaskMode,
    Dilation,
    MaskClasses,
    EditMode,
    GuidanceScale,
    BaseSteps,
    IncludeRaiReason,
    IncludeSafetyAttributes,
    StorageUri,
}

impl ParamKey {
    /// Candidate keys in lookup priority order.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_bridge::types::ParamKey;
    ///
    /// assert_eq!(ParamKey::SafetySettings.candidates(), &["safetySettings", "safety_settings"]);
    /// ```
    pub const fn candidates(self) -> &'static [&'static str] {
        match self {
            ParamKey::SafetySettings => &["safetySettings", "safety_settings"],
            ParamKey::CachedContent => &["cachedContent", "cached_content"],
            ParamKey::Labels => &["labels"],
            ParamKey::TopK => &["topK", "top_k"],
            ParamKey::PersonGeneration => &["personGeneration", "person_generation"],
            ParamKey::Language => &["language"],
            ParamKey::EnhancePrompt => &["enhancePrompt", "enhance_prompt"],
            ParamKey::AddWatermark => &["addWatermark", "add_watermark"],
            ParamKey::SampleImageSize => &["sampleImageSize", "sample_image_size"],
            ParamKey::AspectRatio => &["aspectRatio", "aspect_ratio"],
            ParamKey::FileUri => &["file_uri", "fileUri"],
            ParamKey::MaskMode => &["maskMode", "mask_mode"],
            ParamKey::Dilation => &["dilation"],
            ParamKey::MaskClasses => &["maskClasses", "mask_classes"],
            ParamKey::EditMode => &["editMode", "edit_mode"],
            ParamKey::GuidanceScale => &["guidanceScale", "guidance_scale"],
            ParamKey::BaseSteps => &["baseSteps", "base_steps"],
            ParamKey::IncludeRaiReason => &["includeRaiReason", "include_rai_reason"],
            ParamKey::IncludeSafetyAttributes => {
                &["includeSafetyAttributes", "include_safety_attributes"]
            }
            ParamKey::StorageUri => &["storageUri", "storage_uri"],
        }
    }

    /// Key written when the translator produces this field itself.
    pub const fn canonical(self) -> &'static str {
        self.candidates()[0]
    }
}

/// Open-ended key/value parameters with no canonical slot in the unified model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraParams(HashMap<String, Value>);

impl ExtraParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Inserts a raw value under an arbitrary key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Stores a value under the canonical key of `key`.
    pub fn set(&mut self, key: ParamKey, value: Value) {
        self.0.insert(key.canonical().to_string(), value);
    }

    /// Raw access by literal key.
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// First present candidate of `key`, canonical spelling first.
    pub fn get(&self, key: ParamKey) -> Option<&Value> {
        key.candidates()
            .iter()
            .find_map(|candidate| self.0.get(*candidate))
    }

    /// Whether any candidate spelling of `key` is present.
    pub fn contains(&self, key: ParamKey) -> bool {
        self.get(key).is_some()
    }

    /// String value of `key`, or `None` when absent or not a string.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_bridge::types::{ExtraParams, ParamKey};
    /// use serde_json::json;
    ///
    /// let mut extra = ExtraParams::new();
    /// extra.insert("cached_content", json!("cachedContents/abc"));
    /// assert_eq!(extra.get_str(ParamKey::CachedContent), Some("cachedContents/abc"));
    ///
    /// extra.insert("cachedContent", json!(42));
    /// assert_eq!(extra.get_str(ParamKey::CachedContent), None);
    /// ```
    pub fn get_str(&self, key: ParamKey) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: ParamKey) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, key: ParamKey) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: ParamKey) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Object value of `key`.
    pub fn get_map(&self, key: ParamKey) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }

    /// Object of string values; entries with non-string values are skipped.
    pub fn get_string_map(&self, key: ParamKey) -> Option<HashMap<String, String>> {
        self.get_map(key).map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
    }

    /// Deserializes the value of `key` into `T`; `None` when absent or mistyped.
    pub fn get_as<T: DeserializeOwned>(&self, key: ParamKey) -> Option<T> {
        self.get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Removes every candidate spelling of `key`, returning the highest-priority value.
    pub fn take(&mut self, key: ParamKey) -> Option<Value> {
        let mut found = None;
        for candidate in key.candidates() {
            if let Some(value) = self.0.remove(*candidate) {
                if found.is_none() {
                    found = Some(value);
                }
            }
        }
        found
    }

    /// Deserializes `key` and removes it on success.
    ///
    /// A mistyped value stays in place so it can still be forwarded verbatim.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_bridge::types::{ExtraParams, ParamKey};
    /// use serde_json::json;
    ///
    /// let mut extra = ExtraParams::new();
    /// extra.insert("addWatermark", json!("yes"));
    /// assert_eq!(extra.take_as::<bool>(ParamKey::AddWatermark), None);
    /// assert!(extra.contains(ParamKey::AddWatermark));
    /// ```
    pub fn take_as<T: DeserializeOwned>(&mut self, key: ParamKey) -> Option<T> {
        let decoded = self.get_as(key)?;
        self.take(key);
        Some(decoded)
    }

    /// Takes the string entries of an object-valued `key`.
    ///
    /// Non-string entries are dropped. When no string entry survives the key is
    /// left untouched and `None` is returned.
    pub fn take_string_map(&mut self, key: ParamKey) -> Option<HashMap<String, String>> {
        let map = self.get_string_map(key).filter(|map| !map.is_empty())?;
        self.take(key);
        Some(map)
    }

    /// Integer array of `key`; floats are truncated and other items skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_bridge::types::{ExtraParams, ParamKey};
    /// use serde_json::json;
    ///
    /// let mut extra = ExtraParams::new();
    /// extra.insert("maskClasses", json!([1, 2.9, "x", 4]));
    /// assert_eq!(extra.get_i64_array(ParamKey::MaskClasses), Some(vec![1, 2, 4]));
    /// ```
    pub fn get_i64_array(&self, key: ParamKey) -> Option<Vec<i64>> {
        self.get(key).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_i64().or_else(|| item.as_f64().map(|f| f as i64)))
                .collect()
        })
    }

    /// Iterates raw entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> HashMap<String, Value> {
        self.0
    }
}

impl From<HashMap<String, Value>> for ExtraParams {
    fn from(map: HashMap<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for ExtraParams {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
