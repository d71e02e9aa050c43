/// A named, independently lockable partition of a page's graphics.
///
/// Layers own no graphics; pages bucket graphic ids by layer name. That makes
/// the name load-bearing: renames go through the document so every bucket is
/// re-keyed.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    pub name: String,
    pub locked: bool,
    pub visible: bool,
    pub printable: bool,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locked: false,
            visible: true,
            printable: true,
        }
    }

    /// Plain key/value capture of the layer's state, for undo.
    pub fn snapshot(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert("name".into(), serde_json::Value::from(self.name.clone()));
        map.insert("locked".into(), serde_json::Value::from(self.locked));
        map.insert("visible".into(), serde_json::Value::from(self.visible));
        map.insert("printable".into(), serde_json::Value::from(self.printable));
        map
    }

    /// Restore from a snapshot, defaulting any missing key.
    pub fn restore(&mut self, snapshot: &serde_json::Map<String, serde_json::Value>) {
        self.name = snapshot
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("Unnamed")
            .to_string();
        self.locked = snapshot
            .get("locked")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        self.visible = snapshot
            .get("visible")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        self.printable = snapshot
            .get("printable")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/layer.rs"]
mod tests;
