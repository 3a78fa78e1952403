//! NLEM 2022 formulary grounding
//!
//! CSV 中每一行生成一段文本，查询时按词项重叠打分（IDF 加权），返回前 k 段。

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::{MediRemindError, Result};

const STOP_WORDS: [&str; 8] = ["and", "the", "of", "for", "with", "in", "or", "to"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormularyEntry {
    pub drug_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub indication: String,
    #[serde(default)]
    pub dosage_form: String,
}

impl FormularyEntry {
    /// Schedule H / H1 处方药
    pub fn requires_prescription(&self) -> bool {
        let schedule = self.schedule.to_ascii_uppercase();
        let schedule = schedule.trim_start_matches("SCHEDULE").trim();
        matches!(schedule, "H" | "H1")
    }

    pub fn document(&self) -> String {
        let mut doc = format!(
            "Drug: {}. Category: {}. Schedule: {}. Indication: {}. Dosage Form: {}.",
            self.drug_name, self.category, self.schedule, self.indication, self.dosage_form
        );
        if self.requires_prescription() {
            doc.push_str(" WARNING: Schedule H/H1 Drug - Requires Prescription.");
        }
        doc
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
}

#[derive(Debug, Default)]
pub struct Formulary {
    documents: Vec<String>,
    term_counts: Vec<HashMap<String, usize>>,
    idf: HashMap<String, f64>,
}

impl Formulary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: &[FormularyEntry]) -> Self {
        let documents: Vec<String> = entries.iter().map(FormularyEntry::document).collect();

        let term_counts: Vec<HashMap<String, usize>> = documents
            .iter()
            .map(|doc| {
                let mut counts = HashMap::new();
                for term in tokenize(doc) {
                    *counts.entry(term).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for counts in &term_counts {
            for term in counts.keys() {
                *doc_freq.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f64;
        let idf = doc_freq
            .into_iter()
            .map(|(term, df)| (term.to_string(), ((n + 1.0) / (df as f64 + 1.0)).ln() + 1.0))
            .collect();

        Self {
            documents,
            term_counts,
            idf,
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut entries = Vec::new();
        for (line, record) in csv_reader.deserialize::<FormularyEntry>().enumerate() {
            match record {
                Ok(entry) if !entry.drug_name.is_empty() => entries.push(entry),
                Ok(_) => debug!("Skipping formulary row {} without drug name", line + 2),
                Err(e) => warn!("Skipping malformed formulary row {}: {}", line + 2, e),
            }
        }

        Ok(Self::from_entries(&entries))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            MediRemindError::file_operation(format!(
                "Cannot open formulary {}: {}",
                path.display(),
                e
            ))
        })?;
        let formulary = Self::from_reader(file)?;
        info!(
            "Loaded {} formulary entries from {}",
            formulary.len(),
            path.display()
        );
        Ok(formulary)
    }

    /// 文件缺失或无法解析时返回空索引
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("Formulary grounding disabled: {}", e);
            Self::empty()
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// 与 `text` 相关度最高的前 `k` 段文本，无任何词项重叠时为空
    pub fn query(&self, text: &str, k: usize) -> Vec<&str> {
        if k == 0 || self.is_empty() {
            return Vec::new();
        }

        let query_terms: HashSet<String> = tokenize(text).collect();
        let mut scored: Vec<(usize, f64)> = self
            .term_counts
            .iter()
            .enumerate()
            .filter_map(|(idx, counts)| {
                let score: f64 = query_terms
                    .iter()
                    .filter_map(|term| {
                        let tf = *counts.get(term)? as f64;
                        Some(self.idf.get(term).copied().unwrap_or(1.0) * (1.0 + tf.ln()))
                    })
                    .sum();
                (score > 0.0).then_some((idx, score))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored
            .into_iter()
            .take(k)
            .map(|(idx, _)| self.documents[idx].as_str())
            .collect()
    }

    /// 查询结果按行拼接
    pub fn context_for(&self, text: &str, k: usize) -> String {
        self.query(text, k).join("\n")
    }
}
