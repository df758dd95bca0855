//! Optional local reference data.
//!
//! Three best-effort sources, all tolerated if absent or malformed:
//! a securities-master CSV (symbol, name, type columns), an ETF
//! canonical-name→symbol JSON map, and an alias JSON map carrying explicit
//! symbols and/or extra query-expansion terms. A small built-in canon
//! covers the names that trip up fuzzy search most often; the JSON files
//! carry the bulk. A token-postings index over all rows supports the
//! local-first fast path.

use std::collections::HashMap;
use std::path::Path;

use lazy_static::lazy_static;
use log::{info, warn};
use serde::Deserialize;

use crate::models::{rank_candidates, AssetKind, Candidate};
use crate::normalize::scoring::{fuzzy_score, Scorer};
use crate::normalize::{expected_kind, simplify_name, tokenize, GENERIC_WORDS, STOPWORDS};

lazy_static! {
    /// Common internationally-listed names that plain fuzzy search ranks
    /// poorly. Kept small; JSON files carry most coverage.
    static ref CANON_COMMON: HashMap<&'static str, &'static str> = [
        ("royal bank", "RY"),
        ("shell", "SHEL"),
        ("sony", "SONY"),
        ("toyota motor corp", "TM"),
        ("hsbc holdings", "HSBC"),
        ("tencent holdings", "TCEHY"),
        ("bhp group", "BHP"),
        ("rio tinto", "RIO"),
        ("nestle", "NSRGY"),
        ("novo nordisk", "NVO"),
        ("taiwan semiconductor mfg", "TSM"),
        ("asml holding", "ASML"),
        ("sap se", "SAP"),
        ("totalenergies", "TTE"),
        ("petrobras", "PBR"),
        ("santander", "SAN"),
        ("nintendo", "NTDOY"),
        ("lvmh", "LVMUY"),
        ("roche holding", "RHHBY"),
        ("unilever", "UL"),
        ("astrazeneca", "AZN"),
        ("canadian national railway", "CNI"),
        ("palantir technologies", "PLTR"),
        ("coca cola", "KO"),
        ("johnson johnson", "JNJ"),
        ("air canada", "AC.TO"),
        ("berkshire hathaway classb", "BRK.B"),
    ]
    .into_iter()
    .collect();

    static ref ETF_CANON_BUILTIN: HashMap<&'static str, &'static str> = [
        ("spdr s p 500 etf trust", "SPY"),
        ("vanguard s p 500 etf", "VOO"),
        ("vanguard sp 500 etf", "VOO"),
        ("ishares core s p 500 etf", "IVV"),
        ("invesco qqq trust", "QQQ"),
        ("ishares russell 2000 etf", "IWM"),
        ("vanguard total stock market etf", "VTI"),
        ("schwab u s broad market etf", "SCHB"),
        ("ishares msci eafe etf", "EFA"),
        ("ishares msci emerging markets etf", "EEM"),
        ("ishares 20 year treasury bond etf", "TLT"),
        ("spdr gold trust", "GLD"),
        ("vaneck gold miners etf", "GDX"),
        ("ishares i boxx investment grade corporate bond etf", "LQD"),
        ("ishares i boxx high yield corporate bond etf", "HYG"),
        ("technology select sector spdr fund", "XLK"),
        ("financial select sector spdr fund", "XLF"),
    ]
    .into_iter()
    .collect();
}

/// Alias file entry: either a bare symbol string or a table with explicit
/// symbols and/or query-expansion terms.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAlias {
    Symbol(String),
    Table {
        #[serde(default)]
        symbols: Vec<String>,
        #[serde(default)]
        expand: Vec<String>,
    },
}

#[derive(Clone, Debug)]
struct MasterRow {
    symbol: String,
    name: String,
    kind: AssetKind,
}

/// CSV row shape for the securities master; capitalized header variants
/// are accepted via aliases.
#[derive(Debug, Deserialize)]
struct RawMasterRow {
    #[serde(alias = "Symbol", default)]
    symbol: String,
    #[serde(alias = "Name", default)]
    name: String,
    #[serde(alias = "Type", default)]
    r#type: String,
}

/// All local reference data, loaded once at resolver construction.
pub struct LocalReference {
    master: Vec<MasterRow>,
    etf_canon_ext: HashMap<String, String>,
    alias_symbols: HashMap<String, Vec<String>>,
    alias_expansions: HashMap<String, Vec<String>>,
    /// Rows behind the fast index: master plus every canon entry.
    index_rows: Vec<MasterRow>,
    /// Distinctive token → indices into `index_rows`.
    postings: HashMap<String, Vec<usize>>,
}

impl LocalReference {
    /// Load everything best-effort. Missing files are informational;
    /// malformed files are warnings. The engine works API-only without any
    /// of them.
    pub fn load(master_path: &Path, etf_canon_path: &Path, aliases_path: &Path) -> Self {
        let master = Self::load_master(master_path);
        let etf_canon_ext = Self::load_etf_canon(etf_canon_path);
        let (alias_symbols, alias_expansions) = Self::load_aliases(aliases_path);

        let mut index_rows = master.clone();
        for (name, symbol) in CANON_COMMON.iter() {
            index_rows.push(MasterRow {
                symbol: symbol.to_string(),
                name: name.to_string(),
                kind: AssetKind::CommonStock,
            });
        }
        for (name, symbol) in ETF_CANON_BUILTIN.iter() {
            index_rows.push(MasterRow {
                symbol: symbol.to_string(),
                name: name.to_string(),
                kind: AssetKind::Etf,
            });
        }
        for (name, symbol) in &etf_canon_ext {
            index_rows.push(MasterRow {
                symbol: symbol.clone(),
                name: name.clone(),
                kind: AssetKind::Etf,
            });
        }

        let mut postings: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in index_rows.iter().enumerate() {
            let mut tokens = tokenize(&row.name);
            tokens.sort();
            tokens.dedup();
            for t in tokens {
                if STOPWORDS.contains(t.as_str()) || GENERIC_WORDS.contains(t.as_str()) {
                    continue;
                }
                postings.entry(t).or_default().push(i);
            }
        }

        Self {
            master,
            etf_canon_ext,
            alias_symbols,
            alias_expansions,
            index_rows,
            postings,
        }
    }

    /// Empty reference data (API-only operation).
    pub fn empty() -> Self {
        Self::load(Path::new(""), Path::new(""), Path::new(""))
    }

    fn load_master(path: &Path) -> Vec<MasterRow> {
        if path.as_os_str().is_empty() {
            return Vec::new();
        }
        if !path.exists() {
            info!("Local securities master not found at {} (optional)", path.display());
            return Vec::new();
        }
        let mut reader = match csv::Reader::from_path(path) {
            Ok(r) => r,
            Err(e) => {
                warn!("Failed to open securities master {}: {}", path.display(), e);
                return Vec::new();
            }
        };
        let mut rows = Vec::new();
        for record in reader.deserialize::<RawMasterRow>() {
            match record {
                Ok(raw) => {
                    let symbol = raw.symbol.trim().to_uppercase();
                    let name = raw.name.trim().to_string();
                    if symbol.is_empty() || name.is_empty() {
                        continue;
                    }
                    let kind = if raw.r#type.trim().is_empty() {
                        AssetKind::CommonStock
                    } else {
                        AssetKind::from_provider_type(&raw.r#type)
                    };
                    rows.push(MasterRow { symbol, name, kind });
                }
                Err(e) => {
                    warn!("Skipping bad row in {}: {}", path.display(), e);
                }
            }
        }
        info!("Loaded securities master {} with {} rows", path.display(), rows.len());
        rows
    }

    fn load_etf_canon(path: &Path) -> HashMap<String, String> {
        if path.as_os_str().is_empty() || !path.exists() {
            return HashMap::new();
        }
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed reading ETF canon {}: {}", path.display(), e);
                return HashMap::new();
            }
        };
        match serde_json::from_str::<HashMap<String, String>>(&raw) {
            Ok(map) => map
                .into_iter()
                .map(|(k, v)| (simplify_name(&k), v.to_uppercase()))
                .collect(),
            Err(e) => {
                warn!("Failed parsing ETF canon {}: {}", path.display(), e);
                HashMap::new()
            }
        }
    }

    fn load_aliases(path: &Path) -> (HashMap<String, Vec<String>>, HashMap<String, Vec<String>>) {
        let mut symbols = HashMap::new();
        let mut expansions = HashMap::new();
        if path.as_os_str().is_empty() || !path.exists() {
            return (symbols, expansions);
        }
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed reading aliases {}: {}", path.display(), e);
                return (symbols, expansions);
            }
        };
        let parsed: HashMap<String, RawAlias> = match serde_json::from_str(&raw) {
            Ok(m) => m,
            Err(e) => {
                warn!("Failed parsing aliases {}: {}", path.display(), e);
                return (symbols, expansions);
            }
        };
        for (name, alias) in parsed {
            let key = simplify_name(&name);
            match alias {
                RawAlias::Symbol(sym) => {
                    symbols.insert(key, vec![sym.to_uppercase()]);
                }
                RawAlias::Table {
                    symbols: syms,
                    expand,
                } => {
                    if !syms.is_empty() {
                        symbols.insert(
                            key.clone(),
                            syms.into_iter().map(|s| s.to_uppercase()).collect(),
                        );
                    }
                    if !expand.is_empty() {
                        expansions.insert(key, expand);
                    }
                }
            }
        }
        (symbols, expansions)
    }

    /// Query-expansion terms for the variant generator; active regardless
    /// of whether local candidate maps are enabled.
    pub fn alias_expansions(&self) -> &HashMap<String, Vec<String>> {
        &self.alias_expansions
    }

    /// Canonical candidates for a name: alias symbols, then external and
    /// built-in ETF canon, then the built-in common canon.
    pub fn canonical_candidates(&self, name: &str, use_local_maps: bool) -> Vec<Candidate> {
        if !use_local_maps {
            return Vec::new();
        }
        let key = simplify_name(name);

        if let Some(symbols) = self.alias_symbols.get(&key) {
            let mut out: Vec<Candidate> = symbols
                .iter()
                .map(|s| Candidate::new(s, name, AssetKind::CommonStock, 0.99, "Alias"))
                .collect();
            rank_candidates(&mut out);
            return out;
        }
        if let Some(symbol) = self.etf_canon_ext.get(&key) {
            return vec![Candidate::new(symbol, name, AssetKind::Etf, 0.99, "CanonETF")];
        }
        if let Some(symbol) = ETF_CANON_BUILTIN.get(key.as_str()) {
            return vec![Candidate::new(*symbol, name, AssetKind::Etf, 0.98, "CanonETF")];
        }
        if let Some(symbol) = CANON_COMMON.get(key.as_str()) {
            return vec![Candidate::new(*symbol, name, AssetKind::CommonStock, 0.98, "Canon")];
        }
        Vec::new()
    }

    /// Fuzzy candidates from the securities master.
    pub fn master_candidates(&self, name: &str, scorer: &Scorer, top_k: usize) -> Vec<Candidate> {
        if self.master.is_empty() {
            return Vec::new();
        }
        let simplified = simplify_name(name);
        let expected = expected_kind(name);
        let mut out: Vec<Candidate> = self
            .master
            .iter()
            .map(|row| {
                let base = fuzzy_score(name, &row.name);
                let score = scorer.apply_biases(
                    &row.symbol,
                    base,
                    &simplified,
                    row.kind,
                    expected,
                    name,
                    &row.name,
                );
                Candidate::new(&row.symbol, &row.name, row.kind, score, "Local")
            })
            .collect();
        rank_candidates(&mut out);
        out.retain(|c| c.score >= 0.55);
        out.truncate(top_k);
        out
    }

    /// Token-postings lookup over master plus canon rows, for the
    /// local-first fast path.
    pub fn fast_candidates(&self, name: &str, scorer: &Scorer, top_k: usize) -> Vec<Candidate> {
        let tokens: Vec<String> = tokenize(name)
            .into_iter()
            .filter(|t| !STOPWORDS.contains(t.as_str()) && !GENERIC_WORDS.contains(t.as_str()))
            .collect();
        if tokens.is_empty() {
            return Vec::new();
        }
        let mut indices: Vec<usize> = tokens
            .iter()
            .filter_map(|t| self.postings.get(t))
            .flatten()
            .copied()
            .collect();
        indices.sort_unstable();
        indices.dedup();
        if indices.is_empty() {
            return Vec::new();
        }

        let simplified = simplify_name(name);
        let expected = expected_kind(name);
        let mut out: Vec<Candidate> = indices
            .into_iter()
            .map(|i| {
                let row = &self.index_rows[i];
                let base = fuzzy_score(name, &row.name);
                let score = scorer.apply_biases(
                    &row.symbol,
                    base,
                    &simplified,
                    row.kind,
                    expected,
                    name,
                    &row.name,
                );
                Candidate::new(&row.symbol, &row.name, row.kind, score, "LocalFast")
            })
            .collect();
        rank_candidates(&mut out);
        out.truncate(top_k);
        out
    }
}
