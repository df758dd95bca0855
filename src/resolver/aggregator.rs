//! Candidate aggregation and the resolution service.
//!
//! [`SymbolResolver`] owns the whole pipeline: durable-store short-circuit,
//! canonical early-accepts, provider fan-out, merge-best combination,
//! company-family collapse, the second refinement pass for weak or foreign
//! top hits, a bounded memo over finished searches, and the batch API.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use super::decision;
use super::local_data::LocalReference;
use super::store::ResolutionStore;
use crate::config::ResolverConfig;
use crate::models::{
    rank_candidates, Candidate, Resolution, SearchMeta, SearchOptions,
};
use crate::normalize::scoring::Scorer;
use crate::normalize::variants::{sanitize_query, variants_for_name};
use crate::normalize::{company_family_key, expected_kind, simplify_name, NON_US_SUFFIXES};
use crate::provider::{gather_candidates, FinnhubProvider, PolygonProvider, SearchProvider};
use crate::transport::ResilientClient;

lazy_static! {
    static ref CORP_TAIL_RE: Regex = Regex::new(r"\b(plc|sa|ag|nv|se)\b").unwrap();
}

/// When family scores are within this margin, a domestic-shaped symbol
/// wins over a higher-scored foreign one.
const FAMILY_US_MARGIN: f64 = 0.04;

/// Second pass fires when the top collapsed candidate scores below this.
const SECOND_PASS_WEAK_SCORE: f64 = 0.88;

/// The name→symbol resolution engine.
///
/// Construct one per process and share it; every piece of internal state
/// (per-host controls, caches, the durable store) is designed for
/// concurrent use.
pub struct SymbolResolver {
    config: ResolverConfig,
    client: ResilientClient,
    providers: Vec<Arc<dyn SearchProvider>>,
    local: LocalReference,
    store: ResolutionStore,
    scorer: Scorer,
    memo: DashMap<(String, bool), Vec<Candidate>>,
    memo_order: Mutex<VecDeque<(String, bool)>>,
}

impl SymbolResolver {
    pub fn new(config: ResolverConfig) -> Self {
        let client = ResilientClient::new(&config);

        let mut providers: Vec<Arc<dyn SearchProvider>> = Vec::new();
        providers.push(Arc::new(FinnhubProvider::new(config.finnhub_api_key.clone())));
        if config.enable_polygon {
            providers.push(Arc::new(PolygonProvider::new(
                config.polygon_api_key.clone(),
                config.prefer_otc,
            )));
        }

        let local = LocalReference::load(
            &config.master_path,
            &config.etf_canon_path,
            &config.aliases_path,
        );
        let store = ResolutionStore::open(
            &config.store_dir,
            config.store_read,
            config.store_write,
            config.store_clear_on_start,
        );
        let scorer = Scorer {
            prefer_us_listings: config.prefer_us_listings,
            prefer_otc: config.prefer_otc,
        };

        Self {
            config,
            client,
            providers,
            local,
            store,
            scorer,
            memo: DashMap::new(),
            memo_order: Mutex::new(VecDeque::new()),
        }
    }

    /// The durable resolution store.
    pub fn store(&self) -> &ResolutionStore {
        &self.store
    }

    /// Engine configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Deterministic ranked candidates for a name. Providers-first; local
    /// maps participate only when enabled. Results are memoized per
    /// (name, use_local_maps) so a repeated search never re-queries the
    /// network while the memo entry lives.
    pub async fn search_candidates(
        &self,
        name: &str,
        options: &SearchOptions,
    ) -> Vec<Candidate> {
        let name = name.trim();
        if name.is_empty() {
            return Vec::new();
        }
        let use_locals = options
            .use_local_maps
            .unwrap_or(self.config.use_local_maps_default);
        let key = (name.to_string(), use_locals);

        if let Some(hit) = self.memo.get(&key) {
            return hit.clone();
        }

        let result = self.search_impl(name, use_locals).await;
        self.memoize(key, result.clone());
        result
    }

    /// Like [`search_candidates`](Self::search_candidates), with audit
    /// metadata: the variants attempted and the measured latency.
    pub async fn search_with_meta(
        &self,
        name: &str,
        options: &SearchOptions,
    ) -> (Vec<Candidate>, SearchMeta) {
        let started = Instant::now();
        let candidates = self.search_candidates(name, options).await;
        let meta = SearchMeta {
            search_variants: variants_for_name(
                name,
                self.local.alias_expansions(),
                self.config.max_variants,
            ),
            api_latency_ms: started.elapsed().as_millis() as u64,
            use_local_maps: options
                .use_local_maps
                .unwrap_or(self.config.use_local_maps_default),
            resolver_version: env!("CARGO_PKG_VERSION").to_string(),
            resolved_at: Utc::now(),
        };
        (candidates, meta)
    }

    /// Apply the selection policy to a ranked candidate list. Acceptances
    /// are persisted to the durable store.
    pub fn choose_symbol(&self, name: &str, candidates: &[Candidate]) -> Resolution {
        decision::choose_symbol(name, candidates, &self.store)
    }

    /// Search and choose in one step.
    pub async fn resolve_one(
        &self,
        name: &str,
        options: &SearchOptions,
    ) -> (Resolution, SearchMeta, Vec<Candidate>) {
        let (candidates, meta) = self.search_with_meta(name, options).await;
        let resolution = self.choose_symbol(name, &candidates);
        (resolution, meta, candidates)
    }

    /// Resolve a batch of names on a bounded worker pool. Input order does
    /// not constrain completion order; results land in the map as each
    /// resolution finishes. Duplicate and blank names are dropped first.
    pub async fn resolve_many(
        &self,
        names: &[String],
        options: &SearchOptions,
    ) -> HashMap<String, Resolution> {
        let use_locals = options
            .use_local_maps
            .unwrap_or(self.config.use_local_maps_default);

        let mut unique: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for n in names {
            let n = n.trim();
            if !n.is_empty() && seen.insert(n.to_string()) {
                unique.push(n.to_string());
            }
        }

        let mut out: HashMap<String, Resolution> = HashMap::new();

        if use_locals && self.config.local_first {
            for n in &unique {
                if let Some(symbol) = self.store.get(n) {
                    out.insert(n.clone(), Resolution::accepted(symbol, "cache"));
                    continue;
                }
                let fast = self
                    .local
                    .fast_candidates(n, &self.scorer, self.config.top_k);
                if let Some(best) = fast.first() {
                    if best.score >= self.config.local_accept_score {
                        self.store.put(n, &best.symbol);
                        out.insert(n.clone(), Resolution::accepted(&best.symbol, "local_fast"));
                    }
                }
            }
        }

        let pending: Vec<String> = unique
            .into_iter()
            .filter(|n| !out.contains_key(n))
            .collect();
        if pending.is_empty() {
            return out;
        }

        let opts = SearchOptions {
            use_local_maps: Some(use_locals),
        };
        let resolved: Vec<(String, Resolution)> = stream::iter(pending)
            .map(|name| async move {
                let (resolution, _meta, _cands) = self.resolve_one(&name, &opts).await;
                (name, resolution)
            })
            .buffer_unordered(self.config.batch_workers.max(1))
            .collect()
            .await;

        out.extend(resolved);
        out
    }

    fn memoize(&self, key: (String, bool), value: Vec<Candidate>) {
        let mut order = self
            .memo_order
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !self.memo.contains_key(&key) {
            order.push_back(key.clone());
        }
        self.memo.insert(key, value);
        while order.len() > self.config.candidate_cache_size.max(1) {
            if let Some(oldest) = order.pop_front() {
                self.memo.remove(&oldest);
            }
        }
    }

    async fn search_impl(&self, name: &str, use_locals: bool) -> Vec<Candidate> {
        // Durable-store hit: a single synthetic full-confidence candidate,
        // no providers touched.
        if let Some(symbol) = self.store.get(name) {
            return vec![Candidate::new(
                symbol,
                name,
                expected_kind(name),
                1.0,
                "Cache",
            )];
        }

        // Canonical early-accept only when locals are enabled.
        let canon = self.local.canonical_candidates(name, use_locals);
        if use_locals && canon.first().is_some_and(|c| c.score >= 0.96) {
            let mut out = canon;
            rank_candidates(&mut out);
            out.truncate(self.config.top_k);
            return out;
        }

        let api_candidates = self.query_providers(name).await;

        // Optional local fast accept, preserved in its historical position
        // after the provider round.
        if use_locals && self.config.local_first {
            let fast = self
                .local
                .fast_candidates(name, &self.scorer, self.config.top_k);
            if let Some(best) = fast.first() {
                if best.score >= self.config.local_accept_score {
                    return vec![fast.into_iter().next().unwrap()];
                }
            }
        }

        let mut local_candidates: Vec<Vec<Candidate>> = Vec::new();
        if use_locals {
            if !canon.is_empty() {
                local_candidates.push(canon);
            }
            let master = self
                .local
                .master_candidates(name, &self.scorer, self.config.top_k);
            if !master.is_empty() {
                local_candidates.push(master);
            }
        }

        let mut lists = vec![api_candidates];
        lists.extend(local_candidates);
        let merged = merge_best(lists);
        let mut collapsed = collapse_families(merged, &self.scorer);
        rank_candidates(&mut collapsed);

        if self.needs_second_pass(&collapsed) {
            collapsed = self.second_pass(name, collapsed).await;
        }

        collapsed.truncate(self.config.top_k);
        collapsed
    }

    /// Fan out to the configured providers. In parallel mode both run
    /// concurrently; in sequential mode the secondary is consulted only
    /// when the primary result is unconvincing.
    async fn query_providers(&self, name: &str) -> Vec<Candidate> {
        let configured: Vec<&Arc<dyn SearchProvider>> = self
            .providers
            .iter()
            .filter(|p| p.is_configured())
            .collect();
        if configured.is_empty() {
            return Vec::new();
        }

        if self.config.parallel_providers {
            let futures = configured.iter().map(|p| {
                gather_candidates(
                    p.as_ref(),
                    &self.client,
                    name,
                    p.id(),
                    &self.config,
                    self.local.alias_expansions(),
                )
            });
            let lists = join_all(futures).await;
            merge_best(lists)
        } else {
            let mut merged: Vec<Candidate> = Vec::new();
            for p in configured {
                let batch = gather_candidates(
                    p.as_ref(),
                    &self.client,
                    name,
                    p.id(),
                    &self.config,
                    self.local.alias_expansions(),
                )
                .await;
                merged = merge_best(vec![merged, batch]);
                if !self.should_query_more(name, &merged) {
                    break;
                }
            }
            merged
        }
    }

    /// In sequential provider mode: is the current best still unconvincing
    /// enough to justify the next provider call?
    fn should_query_more(&self, name: &str, merged: &[Candidate]) -> bool {
        let Some(top) = merged.first() else {
            return true;
        };
        if expected_kind(name).is_etf() {
            !(top.kind.is_etf() && top.score >= 0.94)
        } else {
            !(self.scorer.is_domestic_symbol(&top.symbol) && top.score >= 0.95)
        }
    }

    fn needs_second_pass(&self, collapsed: &[Candidate]) -> bool {
        if !self.config.second_pass_enabled || !self.config.prefer_us_listings {
            return false;
        }
        let Some(top) = collapsed.first() else {
            return false;
        };
        let foreignish = NON_US_SUFFIXES.iter().any(|s| top.symbol.ends_with(s));
        foreignish || top.score < SECOND_PASS_WEAK_SCORE
    }

    /// Re-query both adapters with simplified/domestic-stem forms of the
    /// top family representatives, then merge and re-collapse.
    async fn second_pass(&self, name: &str, first_pass: Vec<Candidate>) -> Vec<Candidate> {
        let mut representatives = collapse_families(first_pass.clone(), &self.scorer);
        rank_candidates(&mut representatives);
        representatives.truncate(self.config.second_pass_top_k);

        let queries = self.second_pass_queries(&representatives);
        debug!("Second pass for '{}': {:?}", name, queries);

        let mut additional: Vec<Candidate> = Vec::new();
        for query in queries {
            for p in self.providers.iter().filter(|p| p.is_configured()) {
                let tag = format!("{}2", p.id());
                let batch = gather_candidates(
                    p.as_ref(),
                    &self.client,
                    &query,
                    &tag,
                    &self.config,
                    self.local.alias_expansions(),
                )
                .await;
                additional = merge_best(vec![additional, batch]);
            }
            if let Some(best) = additional.first() {
                if self.scorer.is_domestic_symbol(&best.symbol)
                    && best.score >= self.config.early_exit_score
                {
                    break;
                }
            }
        }

        let merged = merge_best(vec![first_pass, additional]);
        let mut collapsed = collapse_families(merged, &self.scorer);
        rank_candidates(&mut collapsed);
        collapsed.truncate(self.config.top_k);
        collapsed
    }

    /// Derive second-pass query strings from family representatives: the
    /// raw display name, a corporate-tail-trimmed simplified form, and the
    /// domestic stem of any foreign-suffixed symbol.
    fn second_pass_queries(&self, representatives: &[Candidate]) -> Vec<String> {
        let mut queries: Vec<String> = Vec::new();
        let mut push = |q: String| {
            if !q.is_empty() && !queries.contains(&q) {
                queries.push(q);
            }
        };

        for rep in representatives {
            let base = rep.display_name.clone();
            let trimmed = CORP_TAIL_RE
                .replace_all(&simplify_name(&base), " ")
                .trim()
                .to_string();
            push(sanitize_query(&base));
            push(sanitize_query(&trimmed));
            for suffix in NON_US_SUFFIXES {
                if let Some(stem) = rep.symbol.strip_suffix(suffix) {
                    if !stem.is_empty() {
                        push(sanitize_query(stem));
                    }
                    break;
                }
            }
        }

        queries.truncate(self.config.max_second_pass_queries);
        queries
    }
}

/// Combine candidate lists by symbol, keeping the highest score seen for
/// each symbol regardless of source. Output is ranked.
pub fn merge_best(lists: Vec<Vec<Candidate>>) -> Vec<Candidate> {
    let mut best: HashMap<String, Candidate> = HashMap::new();
    for list in lists {
        for c in list {
            match best.get(&c.symbol) {
                Some(existing) if existing.score >= c.score => {}
                _ => {
                    best.insert(c.symbol.clone(), c);
                }
            }
        }
    }
    let mut out: Vec<Candidate> = best.into_values().collect();
    rank_candidates(&mut out);
    out
}

/// Collapse duplicate listings of one issuer into a single representative
/// per company family. Within a family, a domestic-shaped symbol beats a
/// foreign one when their scores are within [`FAMILY_US_MARGIN`].
pub fn collapse_families(candidates: Vec<Candidate>, scorer: &Scorer) -> Vec<Candidate> {
    let mut families: HashMap<String, Vec<Candidate>> = HashMap::new();
    for c in candidates {
        let key_source = if c.display_name.is_empty() {
            c.symbol.clone()
        } else {
            c.display_name.clone()
        };
        families
            .entry(company_family_key(&key_source))
            .or_default()
            .push(c);
    }

    families
        .into_values()
        .map(|mut members| {
            rank_candidates(&mut members);
            let mut best_index = 0;
            for (i, c) in members.iter().enumerate().skip(1) {
                if (c.score - members[best_index].score).abs() <= FAMILY_US_MARGIN
                    && scorer.is_domestic_symbol(&c.symbol)
                    && !scorer.is_domestic_symbol(&members[best_index].symbol)
                {
                    best_index = i;
                }
            }
            members.swap_remove(best_index)
        })
        .collect()
}
