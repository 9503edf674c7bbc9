use mmrag_core::{MmragError, MmragResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Position value marking "no neighbor" in a search result.
pub const NO_MATCH: i64 = -1;

/// Distance metric used by an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Squared Euclidean distance; smaller is closer.
    #[default]
    #[serde(rename = "L2", alias = "l2")]
    L2,
    /// Inner product; larger is closer.
    #[serde(rename = "IP", alias = "ip")]
    InnerProduct,
}

impl Metric {
    /// Raw distance (L2) or similarity (IP) between two vectors.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::L2 => l2_squared(a, b),
            Metric::InnerProduct => a.iter().zip(b.iter()).map(|(x, y)| x * y).sum(),
        }
    }

    /// Ordering of two raw values, best first.
    pub fn compare(&self, a: f32, b: f32) -> Ordering {
        match self {
            Metric::L2 => a.total_cmp(&b),
            Metric::InnerProduct => b.total_cmp(&a),
        }
    }

    /// Raw value carried by sentinel neighbors.
    pub fn worst(&self) -> f32 {
        match self {
            Metric::L2 => f32::INFINITY,
            Metric::InnerProduct => f32::NEG_INFINITY,
        }
    }

    /// Map a raw value to a similarity score in `(0, 1]`.
    ///
    /// L2 uses `1 / (1 + d)`. IP applies the same transform to the cosine
    /// distance `1 - ip` of unit vectors, with `ip` clamped to `[-1, 1]`,
    /// which bounds the score to `[1/3, 1]`.
    pub fn score(&self, raw: f32) -> f32 {
        match self {
            Metric::L2 => 1.0 / (1.0 + raw.max(0.0)),
            Metric::InnerProduct => 1.0 / (1.0 + (1.0 - raw.clamp(-1.0, 1.0))),
        }
    }

    /// Name used in config files and snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::L2 => "L2",
            Metric::InnerProduct => "IP",
        }
    }
}

fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// One entry of a k-NN result: raw distance and position in the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Raw metric value; see [`Metric::score`] for the normalized form.
    pub distance: f32,
    /// Insertion position, or [`NO_MATCH`] when fewer vectors exist than requested.
    pub position: i64,
}

impl Neighbor {
    fn sentinel(metric: Metric) -> Self {
        Self {
            distance: metric.worst(),
            position: NO_MATCH,
        }
    }

    /// False for padding entries.
    pub fn is_match(&self) -> bool {
        self.position >= 0
    }
}

/// Pick the `k` best candidates and pad with sentinels up to `k`.
fn select_top_k(
    metric: Metric,
    candidates: impl Iterator<Item = (usize, f32)>,
    k: usize,
) -> Vec<Neighbor> {
    let mut scored: Vec<(usize, f32)> = candidates.collect();
    scored.sort_by(|a, b| metric.compare(a.1, b.1).then(a.0.cmp(&b.0)));
    scored.truncate(k);

    let mut neighbors: Vec<Neighbor> = scored
        .into_iter()
        .map(|(position, distance)| Neighbor {
            distance,
            position: position as i64,
        })
        .collect();
    neighbors.resize(k, Neighbor::sentinel(metric));
    neighbors
}

fn check_dimension(dimension: usize, vector: &[f32]) -> MmragResult<()> {
    if vector.len() != dimension {
        return Err(MmragError::Index(format!(
            "vector has dimension {} but index expects {dimension}",
            vector.len()
        )));
    }
    Ok(())
}

/// Exact index: brute-force scan over contiguous storage.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    metric: Metric,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Empty index for vectors of `dimension` components.
    pub fn new(dimension: usize, metric: Metric) -> Self {
        Self {
            dimension,
            metric,
            data: Vec::new(),
        }
    }

    pub(crate) fn from_raw(dimension: usize, metric: Metric, data: Vec<f32>) -> Self {
        Self {
            dimension,
            metric,
            data,
        }
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.data.len().checked_div(self.dimension).unwrap_or(0)
    }

    /// Whether no vector has been added.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append vectors in order. Either all are appended or none.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> MmragResult<()> {
        for v in vectors {
            check_dimension(self.dimension, v)?;
        }
        self.data.reserve(vectors.len() * self.dimension);
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    /// The `k` nearest vectors, closest first, padded with sentinels.
    pub fn search(&self, query: &[f32], k: usize) -> MmragResult<Vec<Neighbor>> {
        check_dimension(self.dimension, query)?;
        let candidates = self
            .vectors()
            .enumerate()
            .map(|(i, v)| (i, self.metric.distance(query, v)));
        Ok(select_top_k(self.metric, candidates, k))
    }

    /// Stored vectors in position order.
    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension.max(1))
    }

    pub(crate) fn raw(&self) -> &[f32] {
        &self.data
    }
}

/// Inverted-file index: vectors are bucketed by nearest centroid and a query
/// only scans the `probe_count` closest buckets.
///
/// Centroids come from k-means over a training sample; `add` fails with
/// [`MmragError::IndexNotTrained`] until [`IvfIndex::train`] succeeded.
#[derive(Debug, Clone)]
pub struct IvfIndex {
    dimension: usize,
    metric: Metric,
    partition_count: usize,
    probe_count: usize,
    training_iterations: usize,
    centroids: Vec<f32>,
    data: Vec<f32>,
    assignments: Vec<u32>,
    lists: Vec<Vec<usize>>,
}

impl IvfIndex {
    /// Untrained index. `probe_count` is clamped to `1..=partition_count`.
    pub fn new(
        dimension: usize,
        metric: Metric,
        partition_count: usize,
        probe_count: usize,
        training_iterations: usize,
    ) -> Self {
        Self {
            dimension,
            metric,
            partition_count,
            probe_count: probe_count.clamp(1, partition_count.max(1)),
            training_iterations: training_iterations.max(1),
            centroids: Vec::new(),
            data: Vec::new(),
            assignments: Vec::new(),
            lists: Vec::new(),
        }
    }

    /// Rebuild a trained index from persisted parts.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        dimension: usize,
        metric: Metric,
        partition_count: usize,
        probe_count: usize,
        training_iterations: usize,
        centroids: Vec<f32>,
        data: Vec<f32>,
        assignments: Vec<u32>,
    ) -> MmragResult<Self> {
        if centroids.len() != partition_count * dimension {
            return Err(MmragError::Index(format!(
                "expected {} centroid values, found {}",
                partition_count * dimension,
                centroids.len()
            )));
        }
        let mut lists = vec![Vec::new(); partition_count];
        for (position, &partition) in assignments.iter().enumerate() {
            let list = lists.get_mut(partition as usize).ok_or_else(|| {
                MmragError::Index(format!(
                    "vector {position} assigned to unknown partition {partition}"
                ))
            })?;
            list.push(position);
        }
        let mut index = Self::new(
            dimension,
            metric,
            partition_count,
            probe_count,
            training_iterations,
        );
        index.centroids = centroids;
        index.data = data;
        index.assignments = assignments;
        index.lists = lists;
        if index.assignments.len() != index.len() {
            return Err(MmragError::Index(format!(
                "{} partition assignments for {} vectors",
                index.assignments.len(),
                index.len()
            )));
        }
        Ok(index)
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.data.len().checked_div(self.dimension).unwrap_or(0)
    }

    /// Whether no vector has been added.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether centroids exist. Vectors can only be added once trained.
    pub fn is_trained(&self) -> bool {
        !self.centroids.is_empty()
    }

    /// Number of partitions (centroids).
    pub fn partition_count(&self) -> usize {
        self.partition_count
    }

    /// Partitions scanned per query.
    pub fn probe_count(&self) -> usize {
        self.probe_count
    }

    pub(crate) fn training_iterations(&self) -> usize {
        self.training_iterations
    }

    /// Run k-means over `samples` to place the partition centroids.
    ///
    /// Initial centroids are evenly spaced samples, so training is
    /// deterministic for a given sample order.
    pub fn train(&mut self, samples: &[Vec<f32>]) -> MmragResult<()> {
        if self.partition_count == 0 {
            return Err(MmragError::Index(
                "partitioned index needs partition_count > 0".to_string(),
            ));
        }
        if samples.len() < self.partition_count {
            return Err(MmragError::IndexNotTrained(format!(
                "{} training vectors for {} partitions",
                samples.len(),
                self.partition_count
            )));
        }
        for s in samples {
            check_dimension(self.dimension, s)?;
        }

        let k = self.partition_count;
        let d = self.dimension;
        let mut centroids: Vec<f32> = Vec::with_capacity(k * d);
        for i in 0..k {
            centroids.extend_from_slice(&samples[i * samples.len() / k]);
        }

        let mut assignment = vec![usize::MAX; samples.len()];
        for _ in 0..self.training_iterations {
            let mut changed = false;
            for (i, s) in samples.iter().enumerate() {
                let nearest = nearest_centroid(&centroids, d, s);
                if assignment[i] != nearest {
                    assignment[i] = nearest;
                    changed = true;
                }
            }
            if !changed {
                break;
            }

            let mut sums = vec![0.0f32; k * d];
            let mut counts = vec![0usize; k];
            for (s, &c) in samples.iter().zip(assignment.iter()) {
                counts[c] += 1;
                for (acc, x) in sums[c * d..(c + 1) * d].iter_mut().zip(s.iter()) {
                    *acc += x;
                }
            }
            for c in 0..k {
                // Empty clusters keep their previous centroid
                if counts[c] == 0 {
                    continue;
                }
                let n = counts[c] as f32;
                for (dst, acc) in centroids[c * d..(c + 1) * d]
                    .iter_mut()
                    .zip(sums[c * d..(c + 1) * d].iter())
                {
                    *dst = acc / n;
                }
            }
        }

        self.centroids = centroids;
        // Retraining re-buckets anything already stored
        self.assignments = self
            .data
            .chunks_exact(d)
            .map(|v| nearest_centroid(&self.centroids, d, v) as u32)
            .collect();
        self.lists = vec![Vec::new(); k];
        for (position, &partition) in self.assignments.iter().enumerate() {
            self.lists[partition as usize].push(position);
        }
        Ok(())
    }

    /// Append vectors in order, bucketing each by its nearest centroid.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> MmragResult<()> {
        if !self.is_trained() {
            return Err(MmragError::IndexNotTrained(
                "train the partitioned index before adding vectors".to_string(),
            ));
        }
        for v in vectors {
            check_dimension(self.dimension, v)?;
        }
        for v in vectors {
            let position = self.len();
            let partition = nearest_centroid(&self.centroids, self.dimension, v);
            self.data.extend_from_slice(v);
            self.assignments.push(partition as u32);
            self.lists[partition].push(position);
        }
        Ok(())
    }

    /// Approximate k-NN over the `probe_count` nearest partitions.
    pub fn search(&self, query: &[f32], k: usize) -> MmragResult<Vec<Neighbor>> {
        check_dimension(self.dimension, query)?;
        if !self.is_trained() {
            return Ok(select_top_k(self.metric, std::iter::empty(), k));
        }

        let d = self.dimension;
        let mut partitions: Vec<(usize, f32)> = self
            .centroids
            .chunks_exact(d)
            .enumerate()
            .map(|(c, centroid)| (c, l2_squared(query, centroid)))
            .collect();
        partitions.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        let candidates = partitions
            .iter()
            .take(self.probe_count)
            .flat_map(|(c, _)| self.lists[*c].iter().copied())
            .map(|position| {
                let v = &self.data[position * d..(position + 1) * d];
                (position, self.metric.distance(query, v))
            });
        Ok(select_top_k(self.metric, candidates, k))
    }

    pub(crate) fn raw(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn centroids(&self) -> &[f32] {
        &self.centroids
    }

    pub(crate) fn assignments(&self) -> &[u32] {
        &self.assignments
    }
}

fn nearest_centroid(centroids: &[f32], dimension: usize, v: &[f32]) -> usize {
    centroids
        .chunks_exact(dimension)
        .enumerate()
        .map(|(c, centroid)| (c, l2_squared(v, centroid)))
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(c, _)| c)
        .unwrap_or(0)
}

/// Which index layout is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Exact brute-force scan.
    Flat,
    /// Inverted file over k-means partitions.
    Partitioned,
}

/// The vector index held by a document store.
#[derive(Debug, Clone)]
pub enum VectorIndex {
    /// Exact index, used below the migration threshold.
    Flat(FlatIndex),
    /// Partitioned index.
    Partitioned(IvfIndex),
}

impl VectorIndex {
    /// Layout currently in use.
    pub fn kind(&self) -> IndexKind {
        match self {
            VectorIndex::Flat(_) => IndexKind::Flat,
            VectorIndex::Partitioned(_) => IndexKind::Partitioned,
        }
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        match self {
            VectorIndex::Flat(i) => i.dimension,
            VectorIndex::Partitioned(i) => i.dimension,
        }
    }

    /// Distance metric.
    pub fn metric(&self) -> Metric {
        match self {
            VectorIndex::Flat(i) => i.metric,
            VectorIndex::Partitioned(i) => i.metric,
        }
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        match self {
            VectorIndex::Flat(i) => i.len(),
            VectorIndex::Partitioned(i) => i.len(),
        }
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors to whichever layout is active.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> MmragResult<()> {
        match self {
            VectorIndex::Flat(i) => i.add(vectors),
            VectorIndex::Partitioned(i) => i.add(vectors),
        }
    }

    /// Up to `k` neighbors, best first, padded with sentinels to length `k`.
    pub fn search(&self, query: &[f32], k: usize) -> MmragResult<Vec<Neighbor>> {
        match self {
            VectorIndex::Flat(i) => i.search(query, k),
            VectorIndex::Partitioned(i) => i.search(query, k),
        }
    }
}
