use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::config::MemoryConfig;
use crate::db::DatabaseBackend;
use crate::error::{FactbaseError, Result};
use crate::intelligence::utils::{cosine_similarity, significant_words, words};
use crate::models::{ConflictGroup, ConflictMember, EntryType, MemoryEntry, ScopeId};

/// Words taken from the closest member when the group shares no content words.
const TOPIC_FALLBACK_WORDS: usize = 6;

/// An undirected similarity edge between two node indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub a: usize,
    pub b: usize,
    pub similarity: f32,
}

/// Connected components over `node_count` nodes, each sorted, ordered by
/// their smallest node.
pub fn connected_components(node_count: usize, edges: &[Edge]) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..node_count).collect();

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for edge in edges {
        if edge.a >= node_count || edge.b >= node_count {
            continue;
        }
        let ra = find(&mut parent, edge.a);
        let rb = find(&mut parent, edge.b);
        if ra != rb {
            parent[ra.max(rb)] = ra.min(rb);
        }
    }

    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for node in 0..node_count {
        let root = find(&mut parent, node);
        groups.entry(root).or_default().push(node);
    }

    let mut components: Vec<Vec<usize>> = groups.into_values().collect();
    components.sort_by_key(|c| c[0]);
    components
}

/// Mean similarity of the edges whose both ends lie in `component`.
fn mean_edge_similarity(component: &[usize], edges: &[Edge]) -> f32 {
    let inside: Vec<f32> = edges
        .iter()
        .filter(|e| component.contains(&e.a) && component.contains(&e.b))
        .map(|e| e.similarity)
        .collect();
    if inside.is_empty() {
        return 0.0;
    }
    inside.iter().sum::<f32>() / inside.len() as f32
}

/// Content words shared by every text, or the leading words of `closest`.
pub fn group_topic(texts: &[&str], closest: &str) -> String {
    let mut shared: Option<BTreeSet<String>> = None;
    for text in texts {
        let content = significant_words(text);
        shared = Some(match shared {
            None => content,
            Some(acc) => acc.intersection(&content).cloned().collect(),
        });
    }

    match shared {
        Some(common) if !common.is_empty() => common.into_iter().collect::<Vec<_>>().join(" "),
        _ => words(closest)
            .into_iter()
            .take(TOPIC_FALLBACK_WORDS)
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Finds entries that plausibly describe the same fact.
///
/// Only the top-K neighbourhood of a candidate is examined; the graph is
/// never built over the whole scope for a single candidate.
pub struct ConflictDetector {
    db: Arc<dyn DatabaseBackend>,
    conflict_threshold: f32,
    neighbor_threshold: f32,
    top_k: usize,
}

impl ConflictDetector {
    pub fn new(db: Arc<dyn DatabaseBackend>, config: &MemoryConfig) -> Self {
        Self {
            db,
            conflict_threshold: config.conflict_threshold,
            neighbor_threshold: config.neighbor_threshold,
            top_k: config.conflict_top_k.max(1),
        }
    }

    pub fn conflict_threshold(&self) -> f32 {
        self.conflict_threshold
    }

    /// The conflict group around a candidate, or nothing when the candidate
    /// has no edge at or above the conflict threshold. Only fact entries are
    /// considered; conversation segments are never members.
    #[tracing::instrument(skip(self, scope, vector, text), fields(scope_id = %scope))]
    pub async fn detect(
        &self,
        scope: &ScopeId,
        vector: &[f32],
        text: &str,
    ) -> Result<Vec<ConflictGroup>> {
        let neighbours = self
            .db
            .query(
                scope,
                vector,
                self.neighbor_threshold,
                self.top_k,
                Some(EntryType::FACTS.as_slice()),
            )
            .await?;

        if neighbours.is_empty() {
            return Ok(Vec::new());
        }

        // Node 0 is the candidate; node i + 1 is neighbours[i]
        let mut edges = Vec::new();
        for (i, n) in neighbours.iter().enumerate() {
            if n.similarity >= self.conflict_threshold {
                edges.push(Edge {
                    a: 0,
                    b: i + 1,
                    similarity: n.similarity,
                });
            }
            for (j, m) in neighbours.iter().enumerate().skip(i + 1) {
                let similarity = cosine_similarity(&n.entry.vector, &m.entry.vector);
                if similarity >= self.conflict_threshold {
                    edges.push(Edge {
                        a: i + 1,
                        b: j + 1,
                        similarity,
                    });
                }
            }
        }

        let components = connected_components(neighbours.len() + 1, &edges);
        let Some(component) = components.into_iter().find(|c| c.contains(&0)) else {
            return Ok(Vec::new());
        };
        if component.len() < 2 {
            tracing::debug!(neighbours = neighbours.len(), "No conflicting neighbours");
            return Ok(Vec::new());
        }

        let mut members: Vec<ConflictMember> = component
            .iter()
            .filter(|&&node| node != 0)
            .map(|&node| {
                let scored = &neighbours[node - 1];
                ConflictMember {
                    entry: scored.entry.clone(),
                    similarity: Some(scored.similarity),
                }
            })
            .collect();
        members.sort_by(|a, b| {
            b.similarity
                .unwrap_or(0.0)
                .total_cmp(&a.similarity.unwrap_or(0.0))
        });

        let mut texts: Vec<&str> = vec![text];
        texts.extend(members.iter().map(|m| m.entry.text.as_str()));
        let topic = group_topic(&texts, &members[0].entry.text);

        let group = ConflictGroup {
            topic,
            pairwise_similarity: mean_edge_similarity(&component, &edges),
            members,
        };

        tracing::info!(
            members = group.len(),
            topic = %group.topic,
            similarity = group.pairwise_similarity,
            "Conflict group detected"
        );

        Ok(vec![group])
    }

    /// Every group of two or more current entries in a scope that are
    /// connected by similarity at or above `threshold`.
    #[tracing::instrument(skip(self, scope), fields(scope_id = %scope))]
    pub async fn scan(&self, scope: &ScopeId, threshold: f32) -> Result<Vec<ConflictGroup>> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(FactbaseError::Validation(format!(
                "threshold must be between 0 and 1, got {threshold}"
            )));
        }

        let entries = self.db.list_current(scope).await?;
        let index: HashMap<&str, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.as_str(), i))
            .collect();

        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            if entry.vector.is_empty() {
                continue;
            }
            // The entry itself is returned too, so ask for one extra
            let neighbours = self
                .db
                .query(scope, &entry.vector, threshold, self.top_k + 1, None)
                .await?;
            for n in neighbours {
                let Some(&j) = index.get(n.entry.id.as_str()) else {
                    continue;
                };
                if j != i && seen.insert((i.min(j), i.max(j))) {
                    edges.push(Edge {
                        a: i.min(j),
                        b: i.max(j),
                        similarity: n.similarity,
                    });
                }
            }
        }

        let groups: Vec<ConflictGroup> = connected_components(entries.len(), &edges)
            .into_iter()
            .filter(|c| c.len() >= 2)
            .map(|component| build_scan_group(&component, &entries, &edges))
            .collect();

        tracing::info!(entries = entries.len(), groups = groups.len(), "Scope scan complete");
        Ok(groups)
    }
}

fn build_scan_group(component: &[usize], entries: &[MemoryEntry], edges: &[Edge]) -> ConflictGroup {
    let members: Vec<ConflictMember> = component
        .iter()
        .map(|&i| ConflictMember {
            entry: entries[i].clone(),
            similarity: None,
        })
        .collect();

    // Fall back to the entry with the strongest edge
    let strongest = edges
        .iter()
        .filter(|e| component.contains(&e.a))
        .max_by(|x, y| x.similarity.total_cmp(&y.similarity))
        .map(|e| e.a)
        .unwrap_or(component[0]);

    let texts: Vec<&str> = members.iter().map(|m| m.entry.text.as_str()).collect();
    ConflictGroup {
        topic: group_topic(&texts, &entries[strongest].text),
        pairwise_similarity: mean_edge_similarity(component, edges),
        members,
    }
}
