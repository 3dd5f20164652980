//! Maps entity kind+id to a template image path plus OCR aliases.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::{HeroDataSet, ItemDataSet, SynergyDataSet};
use crate::error::TemplateError;

/// Tagged union of recognizable entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Hero,
    Item,
    Synergy,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Item => "item",
            Self::Synergy => "synergy",
        }
    }
}

fn normalize_alias(s: &str) -> String {
    s.trim().to_lowercase()
}

/// `(kind, id, template_path, ocr_aliases)`.
#[derive(Debug, Clone)]
pub struct TemplateEntry {
    pub kind: EntityKind,
    pub id: String,
    pub template_path: PathBuf,
    pub ocr_aliases: Vec<String>,
}

impl TemplateEntry {
    pub fn new(kind: EntityKind, id: impl Into<String>, template_path: impl Into<PathBuf>) -> Self {
        let id = id.into();
        Self {
            kind,
            ocr_aliases: vec![id.clone()],
            id,
            template_path: template_path.into(),
        }
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.ocr_aliases = aliases;
        self
    }

    pub fn full_path(&self, template_root: &Path) -> PathBuf {
        template_root.join(&self.template_path)
    }

    fn key(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.id)
    }
}

fn similarity(a: &str, b: &str) -> f64 {
    // Fraction of shared characters over the longer string's length; not
    // true edit distance.
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let b_chars: Vec<char> = b.chars().collect();
    let mut remaining = b_chars.clone();
    let mut shared = 0usize;
    for c in a.chars() {
        if let Some(pos) = remaining.iter().position(|&x| x == c) {
            remaining.remove(pos);
            shared += 1;
        }
    }
    shared as f64 / max_len as f64
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ManifestEntry {
    template: String,
    #[serde(default)]
    ocr_variants: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Manifest {
    version: String,
    #[serde(default)]
    heroes: HashMap<String, ManifestEntry>,
    #[serde(default)]
    items: HashMap<String, ManifestEntry>,
    #[serde(default)]
    synergies: HashMap<String, ManifestEntry>,
}

/// Registered templates indexed for id and fuzzy-OCR lookup.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    entries: HashMap<String, TemplateEntry>,
    ocr_index: HashMap<String, String>,
    by_type: HashMap<EntityKind, Vec<String>>,
    version: String,
}

pub struct ValidationReport {
    pub existing: Vec<String>,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RegistryStats {
    pub total_entries: usize,
    pub per_kind: HashMap<EntityKind, usize>,
    pub ocr_alias_count: usize,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: TemplateEntry) {
        let key = entry.key();
        for alias in &entry.ocr_aliases {
            self.ocr_index.insert(normalize_alias(alias), key.clone());
        }
        self.by_type.entry(entry.kind).or_default().push(entry.id.clone());
        self.entries.insert(key, entry);
    }

    pub fn get_template_path(&self, kind: EntityKind, id: &str) -> Option<&Path> {
        self.entries
            .get(&format!("{}:{}", kind.as_str(), id))
            .map(|e| e.template_path.as_path())
    }

    pub fn get_entry(&self, kind: EntityKind, id: &str) -> Option<&TemplateEntry> {
        self.entries.get(&format!("{}:{}", kind.as_str(), id))
    }

    pub fn list_ids(&self, kind: EntityKind) -> Vec<String> {
        self.by_type.get(&kind).cloned().unwrap_or_default()
    }

    /// Exact lookup after normalization (trim + lowercase).
    pub fn lookup_by_ocr(&self, text: &str) -> Option<(EntityKind, String)> {
        let key = self.ocr_index.get(&normalize_alias(text))?;
        self.entries.get(key).map(|e| (e.kind, e.id.clone()))
    }

    /// Fuzzy lookup: exact first, else best similarity >= threshold,
    /// ties broken by first-seen insertion order.
    pub fn lookup_by_ocr_fuzzy(&self, text: &str, threshold: f64) -> Option<(EntityKind, String)> {
        if let Some(hit) = self.lookup_by_ocr(text) {
            return Some(hit);
        }
        let norm = normalize_alias(text);
        let mut best: Option<(f64, &String)> = None;
        for (alias, key) in &self.ocr_index {
            let score = similarity(&norm, alias);
            if score >= threshold {
                match &best {
                    Some((best_score, _)) if score <= *best_score => {}
                    _ => best = Some((score, key)),
                }
            }
        }
        best.and_then(|(_, key)| self.entries.get(key).map(|e| (e.kind, e.id.clone())))
    }

    pub fn load_from_manifest(&mut self, path: &Path) -> Result<usize, TemplateError> {
        let text = std::fs::read_to_string(path).map_err(|e| TemplateError::Io(e.to_string()))?;
        let manifest: Manifest =
            serde_json::from_str(&text).map_err(|e| TemplateError::Decode(e.to_string()))?;
        self.version = manifest.version;
        let mut count = 0;
        for (kind, map) in [
            (EntityKind::Hero, manifest.heroes),
            (EntityKind::Item, manifest.items),
            (EntityKind::Synergy, manifest.synergies),
        ] {
            for (id, entry) in map {
                let aliases = entry.ocr_variants.unwrap_or_else(|| vec![id.clone()]);
                self.register(TemplateEntry::new(kind, id, entry.template).with_aliases(aliases));
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn save_manifest(&self, path: &Path) -> Result<(), TemplateError> {
        let mut manifest = Manifest {
            version: self.version.clone(),
            ..Default::default()
        };
        for entry in self.entries.values() {
            let me = ManifestEntry {
                template: entry.template_path.to_string_lossy().into_owned(),
                ocr_variants: Some(entry.ocr_aliases.clone()),
            };
            match entry.kind {
                EntityKind::Hero => manifest.heroes.insert(entry.id.clone(), me),
                EntityKind::Item => manifest.items.insert(entry.id.clone(), me),
                EntityKind::Synergy => manifest.synergies.insert(entry.id.clone(), me),
            };
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TemplateError::Io(e.to_string()))?;
        }
        let text = serde_json::to_string_pretty(&manifest).map_err(|e| TemplateError::Decode(e.to_string()))?;
        std::fs::write(path, text).map_err(|e| TemplateError::Io(e.to_string()))
    }

    /// Populates the registry by convention from static game-data JSON
    /// files rather than a manifest: each id's template path is derived
    /// as `{kind}/{subcategory}/{id}.png`, with aliases defaulting to
    /// the id itself. Heroes have no subcategory grouping in the data
    /// files, so `subcategory` is fixed at `"base"`; items split into
    /// `base`/`combined` per their source list; synergies have none.
    pub fn load_from_game_data(
        &mut self,
        heroes: &HeroDataSet,
        items: &ItemDataSet,
        synergies: &SynergyDataSet,
    ) -> usize {
        let mut count = 0;
        for hero in heroes {
            let path = format!("hero/base/{}.png", hero.name);
            self.register(TemplateEntry::new(EntityKind::Hero, hero.name.clone(), path));
            count += 1;
        }
        for item in &items.base_items {
            let path = format!("item/base/{}.png", item.name);
            self.register(TemplateEntry::new(EntityKind::Item, item.name.clone(), path));
            count += 1;
        }
        for item in &items.combined_items {
            let path = format!("item/combined/{}.png", item.name);
            self.register(TemplateEntry::new(EntityKind::Item, item.name.clone(), path));
            count += 1;
        }
        for name in synergies.synergies.keys() {
            let path = format!("synergy/{}.png", name);
            self.register(TemplateEntry::new(EntityKind::Synergy, name.clone(), path));
            count += 1;
        }
        count
    }

    /// Counts of registered entries and OCR aliases per kind, plus any
    /// aliases that collided (last-writer-wins) across distinct
    /// `(kind,id)` pairs — surfaced as a warning, not a hard failure.
    pub fn get_stats(&self) -> RegistryStats {
        let mut per_kind = HashMap::new();
        for kind in [EntityKind::Hero, EntityKind::Item, EntityKind::Synergy] {
            per_kind.insert(kind, self.list_ids(kind).len());
        }
        RegistryStats {
            total_entries: self.entries.len(),
            per_kind,
            ocr_alias_count: self.ocr_index.len(),
        }
    }

    pub fn validate(&self, template_root: &Path) -> ValidationReport {
        let mut existing = Vec::new();
        let mut missing = Vec::new();
        for entry in self.entries.values() {
            if entry.full_path(template_root).exists() {
                existing.push(entry.key());
            } else {
                missing.push(entry.key());
            }
        }
        ValidationReport { existing, missing }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Human-readable report of missing templates, grouped by kind,
    /// capped at 5 entries per kind.
    pub fn missing_templates_report(&self, template_root: &Path) -> String {
        let report = self.validate(template_root);
        if report.missing.is_empty() {
            return "all templates present".to_string();
        }
        let mut grouped: HashMap<&str, Vec<&str>> = HashMap::new();
        for key in &report.missing {
            if let Some((kind, id)) = key.split_once(':') {
                grouped.entry(kind).or_default().push(id);
            }
        }
        let mut lines = Vec::new();
        for (kind, ids) in grouped {
            let shown: Vec<&str> = ids.iter().take(5).copied().collect();
            let suffix = if ids.len() > 5 { format!(" (+{} more)", ids.len() - 5) } else { String::new() };
            lines.push(format!("{}: {}{}", kind, shown.join(", "), suffix));
        }
        lines.sort();
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocr_lookup_is_case_and_whitespace_insensitive() {
        let mut reg = TemplateRegistry::new();
        reg.register(
            TemplateEntry::new(EntityKind::Hero, "ahri", "heroes/base/ahri.png")
                .with_aliases(vec!["Ahri".to_string(), " 阿狸 ".to_string()]),
        );
        assert_eq!(reg.lookup_by_ocr("  ahri  "), Some((EntityKind::Hero, "ahri".to_string())));
        assert_eq!(reg.lookup_by_ocr("阿狸"), Some((EntityKind::Hero, "ahri".to_string())));
        assert_eq!(reg.lookup_by_ocr("nonexistent"), None);
    }

    #[test]
    fn fuzzy_lookup_respects_threshold() {
        let mut reg = TemplateRegistry::new();
        reg.register(TemplateEntry::new(EntityKind::Hero, "ahri", "heroes/base/ahri.png"));
        assert!(reg.lookup_by_ocr_fuzzy("ahr", 0.5).is_some());
        assert!(reg.lookup_by_ocr_fuzzy("zzzzzzzz", 0.8).is_none());
    }

    #[test]
    fn manifest_roundtrip() {
        let dir = std::env::temp_dir().join(format!("jinchanchan-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("registry.json");

        let mut reg = TemplateRegistry::new();
        reg.version = "S13".to_string();
        reg.register(
            TemplateEntry::new(EntityKind::Hero, "ahri", "heroes/base/ahri.png")
                .with_aliases(vec!["ahri".to_string(), "foxgirl".to_string()]),
        );
        reg.save_manifest(&path).unwrap();

        let mut loaded = TemplateRegistry::new();
        let count = loaded.load_from_manifest(&path).unwrap();
        assert_eq!(count, 1);
        assert_eq!(loaded.lookup_by_ocr("foxgirl"), Some((EntityKind::Hero, "ahri".to_string())));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_from_game_data_derives_conventional_paths() {
        use crate::data::{HeroData, ItemData, ItemDataSet, SynergyData, SynergyDataSet};

        let heroes = vec![HeroData { name: "ahri".to_string(), cost: 4, synergies: vec![] }];
        let items = ItemDataSet {
            base_items: vec![ItemData { name: "bf_sword".to_string(), components: vec![], description: String::new() }],
            combined_items: vec![ItemData { name: "infinity_edge".to_string(), components: vec![], description: String::new() }],
        };
        let mut synergies_map = HashMap::new();
        synergies_map.insert("star_guardian".to_string(), SynergyData { breakpoints: vec![2, 4], description: String::new() });
        let synergies = SynergyDataSet { synergies: synergies_map };

        let mut reg = TemplateRegistry::new();
        let count = reg.load_from_game_data(&heroes, &items, &synergies);
        assert_eq!(count, 3);
        assert_eq!(
            reg.get_template_path(EntityKind::Hero, "ahri").unwrap().to_str().unwrap(),
            "hero/base/ahri.png"
        );
        assert_eq!(
            reg.get_template_path(EntityKind::Item, "infinity_edge").unwrap().to_str().unwrap(),
            "item/combined/infinity_edge.png"
        );
        assert_eq!(
            reg.get_template_path(EntityKind::Synergy, "star_guardian").unwrap().to_str().unwrap(),
            "synergy/star_guardian.png"
        );
    }

    #[test]
    fn get_stats_counts_entries_per_kind() {
        let mut reg = TemplateRegistry::new();
        reg.register(TemplateEntry::new(EntityKind::Hero, "ahri", "hero/base/ahri.png").with_aliases(vec!["ahri".to_string(), "foxgirl".to_string()]));
        reg.register(TemplateEntry::new(EntityKind::Item, "bf_sword", "item/base/bf_sword.png"));
        let stats = reg.get_stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.per_kind[&EntityKind::Hero], 1);
        assert_eq!(stats.per_kind[&EntityKind::Item], 1);
        assert_eq!(stats.ocr_alias_count, 3);
    }

    #[test]
    fn missing_ocr_variants_defaults_to_id() {
        let dir = std::env::temp_dir().join(format!("jinchanchan-test2-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("registry.json");
        std::fs::write(
            &path,
            r#"{"version":"S13","heroes":{"ahri":{"template":"heroes/base/ahri.png"}},"items":{},"synergies":{}}"#,
        )
        .unwrap();

        let mut reg = TemplateRegistry::new();
        reg.load_from_manifest(&path).unwrap();
        assert_eq!(reg.lookup_by_ocr("ahri"), Some((EntityKind::Hero, "ahri".to_string())));

        std::fs::remove_dir_all(&dir).ok();
    }
}
