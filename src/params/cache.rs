use std::collections::{BTreeMap, HashMap};

use crate::{
    foundation::{
        core::ParamId,
        error::{ArkError, ArkResult},
        logging::report_contract_violation,
    },
    params::parameter::Parameter,
};

/// First id handed out to a never-seen string id.
pub const DEFAULT_STARTING_ID: i32 = 10_000;

/// Durable string key/value storage. The backend's `data/*` endpoints implement it.
pub trait DataStore {
    fn get_data(&self, key: &str) -> ArkResult<String>;
    fn set_data(&self, key: &str, value: &str) -> ArkResult<()>;
    fn delete_data(&self, key: &str) -> ArkResult<()>;
}

/// Persisted string-id → parameter map with stable int id assignment.
///
/// Int ids are reserved the moment they are handed out and never reused, so a string id keeps
/// its host handle for as long as the stored document survives.
#[derive(Debug)]
pub struct ParamCache {
    cache_id: String,
    next_id: i32,
    raw: BTreeMap<String, serde_json::Value>,
    id_to_string: HashMap<ParamId, String>,
    string_to_id: HashMap<String, ParamId>,
}

impl ParamCache {
    pub fn new(cache_id: impl Into<String>) -> Self {
        Self {
            cache_id: cache_id.into(),
            next_id: DEFAULT_STARTING_ID,
            raw: BTreeMap::new(),
            id_to_string: HashMap::new(),
            string_to_id: HashMap::new(),
        }
    }

    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    pub fn initialized(&self) -> bool {
        !self.raw.is_empty()
    }

    /// Loads the stored document. Any failure leaves the cache empty ("no prior cache").
    #[tracing::instrument(skip(self, store), fields(cache_id = %self.cache_id))]
    pub fn init(&mut self, store: &dyn DataStore) {
        let text = match store.get_data(&self.cache_id) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "no parameter cache loaded");
                return;
            }
        };
        if let Err(err) = self.load_document(&text) {
            tracing::warn!(error = %err, "ignoring unreadable parameter cache");
            self.raw.clear();
            self.id_to_string.clear();
            self.string_to_id.clear();
            return;
        }
        tracing::info!(entries = self.raw.len(), "parameter cache loaded");
    }

    fn load_document(&mut self, text: &str) -> ArkResult<()> {
        let doc: serde_json::Value = serde_json::from_str(text)?;
        let entries = doc
            .get("parameters")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| ArkError::schema("parameter cache has no 'parameters' array"))?;

        for entry in entries {
            let string_id = entry.get("stringId").and_then(serde_json::Value::as_str);
            let id = entry
                .get("id")
                .and_then(serde_json::Value::as_i64)
                .and_then(|v| i32::try_from(v).ok());
            let (Some(string_id), Some(id)) = (string_id, id) else {
                tracing::warn!(%entry, "skipping cache entry without id/stringId");
                continue;
            };
            let id = ParamId(id);
            self.raw.insert(string_id.to_string(), entry.clone());
            self.id_to_string.insert(id, string_id.to_string());
            self.string_to_id.insert(string_id.to_string(), id);
        }
        Ok(())
    }

    /// Returns the id mapped to `string_id`, reserving a fresh one if it has none yet.
    pub fn id_for_string_id(&mut self, string_id: &str) -> ParamId {
        if let Some(id) = self.string_to_id.get(string_id) {
            return *id;
        }
        while self.id_to_string.contains_key(&ParamId(self.next_id)) {
            self.next_id += 1;
        }
        let id = ParamId(self.next_id);
        self.next_id += 1;
        self.id_to_string.insert(id, string_id.to_string());
        self.string_to_id.insert(string_id.to_string(), id);
        id
    }

    pub fn has_param(&self, string_id: &str) -> bool {
        self.raw.contains_key(string_id)
    }

    pub fn get_param(&self, string_id: &str) -> Option<Parameter> {
        let raw = self.raw.get(string_id)?;
        match Parameter::from_value(raw.clone()) {
            Ok(p) => Some(p),
            Err(err) => {
                tracing::warn!(string_id, error = %err, "cached parameter does not decode");
                None
            }
        }
    }

    pub fn add_param(&mut self, param: &Parameter) {
        if let Some(existing) = self.string_to_id.get(&param.string_id)
            && *existing != param.id
        {
            report_contract_violation(&format!(
                "param '{}' re-added with id {} (was {})",
                param.string_id, param.id, existing
            ));
        }
        let raw = match serde_json::to_value(param) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::error!(string_id = %param.string_id, error = %err, "param does not encode");
                return;
            }
        };
        self.raw.insert(param.string_id.clone(), raw);
        self.id_to_string.insert(param.id, param.string_id.clone());
        self.string_to_id.insert(param.string_id.clone(), param.id);
    }

    /// Stored JSON by string id, in stable key order.
    pub fn param_map(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.raw
    }

    pub fn to_document(&self) -> String {
        let parameters: Vec<serde_json::Value> = self.raw.values().cloned().collect();
        serde_json::json!({ "parameters": parameters }).to_string()
    }

    #[tracing::instrument(skip(self, store), fields(cache_id = %self.cache_id))]
    pub fn save(&self, store: &dyn DataStore) -> ArkResult<()> {
        store.set_data(&self.cache_id, &self.to_document())?;
        tracing::debug!(entries = self.raw.len(), "parameter cache saved");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/params/cache.rs"]
mod tests;
